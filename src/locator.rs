//! クエリ地点を囲む補間セルの4隅を求める。

use rust_decimal::Decimal;

use crate::error::SemidynaError;
use crate::mesh::MeshCode;
use crate::model::{sec_per_degree, MeshCorner, MeshCorners, MESH_CELL_LAT_SEC, MESH_CELL_LON_SEC};

/// 経緯度（10進法の度単位）から補間セルの4隅を計算する。
///
/// 経緯度を秒に変換して小数第1位で丸め、セル幅（経度225秒×緯度150秒）の
/// 倍数に切り下げた位置がlower_left。残りの3隅はセル幅分ずらして求める。
/// いずれかの隅でメッシュコードが解決できない場合は呼び出し全体が
/// [`SemidynaError::GridBoundary`]で失敗する。
pub fn mesh_corners(lon: Decimal, lat: Decimal) -> Result<MeshCorners, SemidynaError> {
    let lon_param = Decimal::from(MESH_CELL_LON_SEC);
    let lat_param = Decimal::from(MESH_CELL_LAT_SEC);

    let lon_sec = (lon * sec_per_degree()).round_dp(1);
    let lat_sec = (lat * sec_per_degree()).round_dp(1);
    let lower_left_lon = (lon_sec / lon_param).floor() * lon_param;
    let lower_left_lat = (lat_sec / lat_param).floor() * lat_param;

    Ok(MeshCorners {
        lower_left: corner_at(lower_left_lon, lower_left_lat)?,
        lower_right: corner_at(lower_left_lon + lon_param, lower_left_lat)?,
        upper_left: corner_at(lower_left_lon, lower_left_lat + lat_param)?,
        upper_right: corner_at(lower_left_lon + lon_param, lower_left_lat + lat_param)?,
    })
}

fn corner_at(lon_sec: Decimal, lat_sec: Decimal) -> Result<MeshCorner, SemidynaError> {
    let code = MeshCode::from_lonlat(lon_sec / sec_per_degree(), lat_sec / sec_per_degree())?;
    Ok(MeshCorner {
        lon_sec,
        lat_sec,
        mesh_code: code.standard(),
    })
}
