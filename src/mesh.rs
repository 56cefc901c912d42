//! 地域メッシュコード（JIS X0410）の計算。
//!
//! 1文字の変数名は「地域メッシュ統計の特質・沿革」p12
//! (<https://www.stat.go.jp/data/mesh/pdf/gaiyo1.pdf>) の導出に合わせている。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::SemidynaError;

/// 経緯度から導出した各次数の地域メッシュコード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshCode {
    first: u32,
    secondary: u32,
    standard: u32,
    half: u32,
    quarter: u64,
}

impl MeshCode {
    /// 経緯度（10進法の度単位）からメッシュコードを計算する。
    ///
    /// 地域メッシュで表現できるのは経度100〜180度、緯度0〜66.66度の範囲のみで、
    /// 範囲外は[`SemidynaError::GridBoundary`]となる。
    pub fn from_lonlat(lon: Decimal, lat: Decimal) -> Result<Self, SemidynaError> {
        let sixty = Decimal::from(60);
        if lon < Decimal::from(100)
            || lon >= Decimal::from(180)
            || lat < Decimal::ZERO
            || lat * sixty >= Decimal::from(4000)
        {
            return Err(SemidynaError::GridBoundary { lon, lat });
        }

        // 緯度方向
        let (p, a) = divmod(lat * sixty, Decimal::from(40));
        let (q, b) = divmod(a, Decimal::from(5));
        let (r, c) = divmod(b * sixty, Decimal::from(30));
        let (s, _d) = divmod(c, Decimal::from(15));
        let (t, _e) = divmod(b, Decimal::new(75, 1));

        // 経度方向
        let i = lon.floor();
        let f = lon - i;
        let u = i - Decimal::from(100);
        let (v, g) = divmod(f * sixty, Decimal::new(75, 1));
        let (w, h) = divmod(g * sixty, Decimal::from(45));
        let (x, j) = divmod(h, Decimal::new(225, 1));
        let (y, _j) = divmod(j, Decimal::new(1125, 2));

        let p = digit(p, lon, lat)?;
        let q = digit(q, lon, lat)?;
        let r = digit(r, lon, lat)?;
        let s = digit(s, lon, lat)?;
        let t = digit(t, lon, lat)?;
        let u = digit(u, lon, lat)?;
        let v = digit(v, lon, lat)?;
        let w = digit(w, lon, lat)?;
        let x = digit(x, lon, lat)?;
        let y = digit(y, lon, lat)?;

        let first = p * 100 + u;
        let secondary = first * 100 + q * 10 + v;
        let standard = secondary * 100 + r * 10 + w;
        let m = s * 2 + x + 1;
        let n = t * 2 + y + 1;
        let half = standard * 10 + m;
        let quarter = u64::from(half) * 10 + u64::from(n);

        Ok(Self {
            first,
            secondary,
            standard,
            half,
            quarter,
        })
    }

    /// 第1次メッシュコード（4桁）
    pub fn first(&self) -> u32 {
        self.first
    }

    /// 第2次メッシュコード（6桁）
    pub fn secondary(&self) -> u32 {
        self.secondary
    }

    /// 基準地域メッシュコード（8桁）
    pub fn standard(&self) -> u32 {
        self.standard
    }

    /// 2分の1地域メッシュコード（9桁）
    pub fn half(&self) -> u32 {
        self.half
    }

    /// 4分の1地域メッシュコード（10桁）
    pub fn quarter(&self) -> u64 {
        self.quarter
    }

    pub fn standard_string(&self) -> String {
        format!("{:08}", self.standard)
    }
}

fn divmod(value: Decimal, modulus: Decimal) -> (Decimal, Decimal) {
    let quotient = (value / modulus).floor();
    (quotient, value - quotient * modulus)
}

fn digit(value: Decimal, lon: Decimal, lat: Decimal) -> Result<u32, SemidynaError> {
    value
        .to_u32()
        .ok_or(SemidynaError::GridBoundary { lon, lat })
}
