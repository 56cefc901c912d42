//! セミダイナミック補正の実行。単点の補正と、連続する点のメッシュセル
//! 再利用を活かした一括補正を提供する。

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::SemidynaError;
use crate::interpolate::{apply_delta, bilinear_delta};
use crate::locator::mesh_corners;
use crate::mesh::MeshCode;
use crate::model::{
    CorrectionDirection, CorrectionResult, CorrectionVector, Epoch, GeodeticPoint,
};
use crate::parameter::{ParameterCache, ParameterStore, ParameterTable};

/// セミダイナミック補正のオーケストレーター。
///
/// パラメーターテーブルのキャッシュを明示的に保持し、同じ年度の補正では
/// ファイルを再読込しない。測量トラバースのように空間的に固まった入力を
/// 想定し、一括補正では直前の点とメッシュコードが変わらない限り補正値を
/// そのまま再利用する。
#[derive(Debug)]
pub struct SemiDynamic {
    store: ParameterStore,
    cache: ParameterCache,
}

impl SemiDynamic {
    pub fn new(store: ParameterStore) -> Self {
        Self {
            store,
            cache: ParameterCache::new(),
        }
    }

    /// 1点を補正する。対象範囲外やテーブルに無いメッシュはその点だけ
    /// [`CorrectionResult::Unavailable`]になる
    pub fn correct_point(
        &mut self,
        point: &GeodeticPoint,
        epoch: Epoch,
        direction: CorrectionDirection,
    ) -> Result<CorrectionResult, SemidynaError> {
        let table = self.cache.table_for(&self.store, epoch)?;
        Ok(match compute_delta(point, table, direction)? {
            Some(delta) => apply_delta(point, &delta),
            None => CorrectionResult::Unavailable,
        })
    }

    /// 点列を入力順のまま補正する。
    ///
    /// 各点でその点自身の基準地域メッシュコードを求め、直前の点と同じで
    /// あれば直前の補正値をそのまま使い、変わった場合（および先頭の点）は
    /// 隅の再計算と補間をやり直す。同一コードのままセル境界をまたぐ点は
    /// 直前の値で近似される（性能と引き換えの仕様）。
    pub fn correct_batch(
        &mut self,
        points: &[GeodeticPoint],
        epoch: Epoch,
        direction: CorrectionDirection,
    ) -> Result<Vec<CorrectionResult>, SemidynaError> {
        let table = self.cache.table_for(&self.store, epoch)?;
        let mut results = Vec::with_capacity(points.len());
        let mut previous: Option<(u32, CorrectionVector)> = None;
        for point in points {
            let mesh_code = match MeshCode::from_lonlat(point.lon, point.lat) {
                Ok(code) => Some(code.standard()),
                Err(SemidynaError::GridBoundary { .. }) => None,
                Err(error) => return Err(error),
            };
            let delta = match (mesh_code, previous) {
                (Some(code), Some((previous_code, previous_delta))) if code == previous_code => {
                    debug!("Reusing correction vector for mesh code {}", code);
                    Some(previous_delta)
                }
                (Some(code), _) => match compute_delta(point, table, direction)? {
                    Some(delta) => {
                        previous = Some((code, delta));
                        Some(delta)
                    }
                    None => {
                        previous = None;
                        None
                    }
                },
                (None, _) => {
                    warn!(
                        "Point (lon: {}, lat: {}) is outside the mesh grid",
                        point.lon, point.lat
                    );
                    previous = None;
                    None
                }
            };
            results.push(match delta {
                Some(delta) => apply_delta(point, &delta),
                None => CorrectionResult::Unavailable,
            });
        }
        Ok(results)
    }

    /// 経度・緯度（・標高）を個別のスライスで受け取る一括補正。
    /// 長さが揃っていない入力はファイルI/Oより前に検証エラーにする
    pub fn correct_slices(
        &mut self,
        lon: &[Decimal],
        lat: &[Decimal],
        altitude: Option<&[Decimal]>,
        epoch: Epoch,
        direction: CorrectionDirection,
    ) -> Result<Vec<CorrectionResult>, SemidynaError> {
        if lon.len() != lat.len() {
            return Err(SemidynaError::Validation(format!(
                "longitude and latitude must have the same length (lon: {}, lat: {})",
                lon.len(),
                lat.len()
            )));
        }
        if let Some(altitude) = altitude {
            if altitude.len() != lon.len() {
                return Err(SemidynaError::Validation(format!(
                    "altitude must have the same length as longitude (altitude: {}, lon: {})",
                    altitude.len(),
                    lon.len()
                )));
            }
        }
        let points: Vec<GeodeticPoint> = lon
            .iter()
            .zip(lat.iter())
            .enumerate()
            .map(|(index, (&lon, &lat))| GeodeticPoint {
                lon,
                lat,
                altitude: altitude.map(|altitude| altitude[index]),
            })
            .collect();
        self.correct_batch(&points, epoch, direction)
    }
}

/// 1点分の補正値を計算する。対象範囲外（GridBoundary）とテーブル欠落
/// （MeshNotFound）はその点の補正不能としてNoneを返し、それ以外の
/// エラーはそのまま伝播する
fn compute_delta(
    point: &GeodeticPoint,
    table: &ParameterTable,
    direction: CorrectionDirection,
) -> Result<Option<CorrectionVector>, SemidynaError> {
    let corners = match mesh_corners(point.lon, point.lat) {
        Ok(corners) => corners,
        Err(SemidynaError::GridBoundary { lon, lat }) => {
            warn!("Point (lon: {}, lat: {}) is outside the mesh grid", lon, lat);
            return Ok(None);
        }
        Err(error) => return Err(error),
    };
    match bilinear_delta(point.lon, point.lat, &corners, table, direction) {
        Ok(delta) => Ok(Some(delta)),
        Err(SemidynaError::MeshNotFound(code)) => {
            warn!("Mesh code {} has no entry in the parameter table", code);
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
