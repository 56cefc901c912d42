use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 補間セルの経度方向の幅（秒）
pub const MESH_CELL_LON_SEC: u32 = 225;
/// 補間セルの緯度方向の幅（秒）
pub const MESH_CELL_LAT_SEC: u32 = 150;

/// 1度あたりの秒数
pub(crate) fn sec_per_degree() -> Decimal {
    Decimal::from(3600)
}

/// 測地座標（10進法の度単位、標高はメートル）
#[derive(Debug, Clone, PartialEq)]
pub struct GeodeticPoint {
    pub lon: Decimal,
    pub lat: Decimal,
    pub altitude: Option<Decimal>,
}

impl GeodeticPoint {
    pub fn new(lon: Decimal, lat: Decimal) -> Self {
        Self {
            lon,
            lat,
            altitude: None,
        }
    }

    pub fn with_altitude(lon: Decimal, lat: Decimal, altitude: Decimal) -> Self {
        Self {
            lon,
            lat,
            altitude: Some(altitude),
        }
    }
}

/// 観測時期。補正パラメーターファイルの年度選択にのみ使用する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(NaiveDate);

impl Epoch {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// 年度を返す。年度の開始月が4月なので、1月から3月は前年扱い
    pub fn fiscal_year(&self) -> i32 {
        if self.0.month() < 4 {
            self.0.year() - 1
        } else {
            self.0.year()
        }
    }
}

impl From<NaiveDate> for Epoch {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<NaiveDateTime> for Epoch {
    // 時刻はファイル選択に影響しないため日付のみ保持する
    fn from(datetime: NaiveDateTime) -> Self {
        Self(datetime.date())
    }
}

/// 補正の方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrectionDirection {
    /// 今期から元期への補正。公開パラメーターは元期から今期への値なので符号を反転する
    #[default]
    CurrentToOrigin,
    /// 元期から今期への補正。公開パラメーターをそのまま適用する
    OriginToCurrent,
}

/// メッシュごとの補正値。delta_x/delta_yは秒、delta_zはメートル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionVector {
    /// 東西（経度）方向の補正値（秒）
    pub delta_x: Decimal,
    /// 南北（緯度）方向の補正値（秒）
    pub delta_y: Decimal,
    /// 鉛直方向の補正値（m）
    pub delta_z: Decimal,
}

impl CorrectionVector {
    pub fn negated(self) -> Self {
        Self {
            delta_x: -self.delta_x,
            delta_y: -self.delta_y,
            delta_z: -self.delta_z,
        }
    }
}

/// 補間セルの1隅。位置は秒単位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshCorner {
    pub lon_sec: Decimal,
    pub lat_sec: Decimal,
    pub mesh_code: u32,
}

/// 補間セルの4隅
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshCorners {
    pub lower_left: MeshCorner,
    pub lower_right: MeshCorner,
    pub upper_left: MeshCorner,
    pub upper_right: MeshCorner,
}

/// 1点の補正結果
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionResult {
    Corrected {
        lon: Decimal,
        lat: Decimal,
        altitude: Option<Decimal>,
    },
    /// 4隅のメッシュコードが揃わず補正できなかった
    Unavailable,
}

impl CorrectionResult {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Corrected { .. })
    }

    /// 浮動小数点への変換は出力境界でのみ行う
    pub fn as_f64(&self) -> Option<(f64, f64)> {
        match self {
            Self::Corrected { lon, lat, .. } => Some((lon.to_f64()?, lat.to_f64()?)),
            Self::Unavailable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_year_starts_in_april() {
        let cases = [
            (NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), 2024),
            (NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), 2024),
            (NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 2024),
            (NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(), 2024),
            (NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), 2025),
        ];
        for (date, expected) in cases {
            assert_eq!(Epoch::new(date).fiscal_year(), expected, "{date}");
        }
    }

    #[test]
    fn test_epoch_from_datetime_ignores_time_of_day() {
        let datetime = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(Epoch::from(datetime).fiscal_year(), 2023);
    }

    #[test]
    fn test_correction_vector_negation() {
        let vector = CorrectionVector {
            delta_x: Decimal::new(5708, 5),
            delta_y: Decimal::new(-4167, 5),
            delta_z: Decimal::new(5603, 5),
        };
        let negated = vector.negated();
        assert_eq!(negated.delta_x, -vector.delta_x);
        assert_eq!(negated.delta_y, -vector.delta_y);
        assert_eq!(negated.delta_z, -vector.delta_z);
        assert_eq!(negated.negated(), vector);
    }

    #[test]
    fn test_unavailable_result_has_no_float_view() {
        assert!(CorrectionResult::Unavailable.as_f64().is_none());
        assert!(!CorrectionResult::Unavailable.is_available());
    }
}
