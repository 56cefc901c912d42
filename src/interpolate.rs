//! 4隅の補正値からのバイリニア補間と、補正値の座標への適用。

use rust_decimal::Decimal;

use crate::error::SemidynaError;
use crate::model::{
    sec_per_degree, CorrectionDirection, CorrectionResult, CorrectionVector, GeodeticPoint,
    MeshCorners,
};
use crate::parameter::ParameterTable;

/// クエリ地点の補正値をバイリニア補間で求める。
///
/// セル内の正規化座標をx_norm（経度方向）・y_norm（緯度方向）として、
/// 公開されている補間式
/// `(1-y)(1-x)*ll + y(1-x)*lr + y*x*ur + (1-y)x*ul`
/// をdelta_x・delta_y・delta_zの各成分に適用する。計算はすべてDecimalで行う。
pub fn bilinear_delta(
    lon: Decimal,
    lat: Decimal,
    corners: &MeshCorners,
    table: &ParameterTable,
    direction: CorrectionDirection,
) -> Result<CorrectionVector, SemidynaError> {
    let lon_sec = lon * sec_per_degree();
    let lat_sec = lat * sec_per_degree();

    let lower_left = &corners.lower_left;
    let lower_right = &corners.lower_right;
    let upper_left = &corners.upper_left;
    let upper_right = &corners.upper_right;

    let x_norm = (lon_sec - lower_left.lon_sec) / (lower_right.lon_sec - lower_left.lon_sec);
    let y_norm = (lat_sec - lower_left.lat_sec) / (upper_left.lat_sec - lower_left.lat_sec);
    // セルは小数第1位に丸めた秒位置から決まるため、セル境界の直下の点は
    // 丸めで隣のセルに入り、丸め前の正規化座標がわずかに[0, 1]を外れ得る。
    // 検証は隅の導出に使った丸め後の位置に対して行う
    let x_check =
        (lon_sec.round_dp(1) - lower_left.lon_sec) / (lower_right.lon_sec - lower_left.lon_sec);
    let y_check =
        (lat_sec.round_dp(1) - lower_left.lat_sec) / (upper_left.lat_sec - lower_left.lat_sec);
    debug_assert!(
        Decimal::ZERO <= x_check && x_check <= Decimal::ONE,
        "rounded x_norm {x_check} out of [0, 1]"
    );
    debug_assert!(
        Decimal::ZERO <= y_check && y_check <= Decimal::ONE,
        "rounded y_norm {y_check} out of [0, 1]"
    );

    let ll = table.get(lower_left.mesh_code)?;
    let lr = table.get(lower_right.mesh_code)?;
    let ul = table.get(upper_left.mesh_code)?;
    let ur = table.get(upper_right.mesh_code)?;

    let weigh = |ll_v: Decimal, lr_v: Decimal, ur_v: Decimal, ul_v: Decimal| {
        let one = Decimal::ONE;
        (one - y_norm) * (one - x_norm) * ll_v
            + y_norm * (one - x_norm) * lr_v
            + y_norm * x_norm * ur_v
            + (one - y_norm) * x_norm * ul_v
    };

    let vector = CorrectionVector {
        delta_x: weigh(ll.delta_x, lr.delta_x, ur.delta_x, ul.delta_x),
        delta_y: weigh(ll.delta_y, lr.delta_y, ur.delta_y, ul.delta_y),
        delta_z: weigh(ll.delta_z, lr.delta_z, ur.delta_z, ul.delta_z),
    };

    // 公開パラメーターは元期から今期への値なので、今期から元期へは符号を反転する
    match direction {
        CorrectionDirection::CurrentToOrigin => Ok(vector.negated()),
        CorrectionDirection::OriginToCurrent => Ok(vector),
    }
}

/// 補正値を座標に適用する。delta_x/delta_yは秒単位なので3600で割って
/// 度に変換する。標高は鉛直成分がある場合のみ補正される
pub fn apply_delta(point: &GeodeticPoint, delta: &CorrectionVector) -> CorrectionResult {
    CorrectionResult::Corrected {
        lon: point.lon + delta.delta_x / sec_per_degree(),
        lat: point.lat + delta.delta_y / sec_per_degree(),
        altitude: point.altitude.map(|altitude| altitude + delta.delta_z),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::model::MeshCorner;

    // lower_leftを(505575, 146100)秒に置いたセル。
    // コードは実ファイルの隣接4メッシュと同じ並びにしてある
    fn corners() -> MeshCorners {
        MeshCorners {
            lower_left: MeshCorner {
                lon_sec: dec!(505575),
                lat_sec: dec!(146100),
                mesh_code: 60407305,
            },
            lower_right: MeshCorner {
                lon_sec: dec!(505800),
                lat_sec: dec!(146100),
                mesh_code: 60407400,
            },
            upper_left: MeshCorner {
                lon_sec: dec!(505575),
                lat_sec: dec!(146250),
                mesh_code: 60407355,
            },
            upper_right: MeshCorner {
                lon_sec: dec!(505800),
                lat_sec: dec!(146250),
                mesh_code: 60407450,
            },
        }
    }

    fn table_with(
        ll: CorrectionVector,
        lr: CorrectionVector,
        ul: CorrectionVector,
        ur: CorrectionVector,
    ) -> ParameterTable {
        let mut rows = HashMap::new();
        rows.insert(60407305, ll);
        rows.insert(60407400, lr);
        rows.insert(60407355, ul);
        rows.insert(60407450, ur);
        ParameterTable::new(2024, rows)
    }

    fn vector(delta_x: Decimal, delta_y: Decimal) -> CorrectionVector {
        CorrectionVector {
            delta_x,
            delta_y,
            delta_z: Decimal::ZERO,
        }
    }

    #[test]
    fn test_interpolation_with_exact_weights() {
        // lower_leftから経度56.25秒・緯度37.5秒の地点はx_norm=y_norm=0.25
        let lon = dec!(505631.25) / dec!(3600);
        let lat = dec!(146137.5) / dec!(3600);
        let table = table_with(
            vector(dec!(0.1), dec!(1)),
            vector(dec!(0.2), dec!(2)),
            vector(dec!(0.4), dec!(4)),
            vector(dec!(0.3), dec!(3)),
        );

        let delta = bilinear_delta(
            lon,
            lat,
            &corners(),
            &table,
            CorrectionDirection::OriginToCurrent,
        )
        .unwrap();
        // 重みは ll=0.5625, lr=0.1875, ur=0.0625, ul=0.1875
        assert_eq!(delta.delta_x, dec!(0.1875));
        assert_eq!(delta.delta_y, dec!(1.875));
    }

    #[test]
    fn test_uniform_corners_interpolate_to_the_shared_vector() {
        let shared = CorrectionVector {
            delta_x: dec!(0.04167),
            delta_y: dec!(-0.05708),
            delta_z: dec!(0.05603),
        };
        let table = table_with(shared, shared, shared, shared);
        let lon = dec!(140.463488);
        let lat = dec!(40.608410);

        let delta = bilinear_delta(
            lon,
            lat,
            &corners(),
            &table,
            CorrectionDirection::OriginToCurrent,
        )
        .unwrap();
        assert_eq!(delta.delta_x, shared.delta_x);
        assert_eq!(delta.delta_y, shared.delta_y);
        assert_eq!(delta.delta_z, shared.delta_z);
    }

    #[test]
    fn test_direction_negates_the_vector() {
        let table = table_with(
            vector(dec!(0.1), dec!(1)),
            vector(dec!(0.2), dec!(2)),
            vector(dec!(0.4), dec!(4)),
            vector(dec!(0.3), dec!(3)),
        );
        let lon = dec!(505631.25) / dec!(3600);
        let lat = dec!(146137.5) / dec!(3600);

        let forward = bilinear_delta(
            lon,
            lat,
            &corners(),
            &table,
            CorrectionDirection::OriginToCurrent,
        )
        .unwrap();
        let inverse = bilinear_delta(
            lon,
            lat,
            &corners(),
            &table,
            CorrectionDirection::CurrentToOrigin,
        )
        .unwrap();
        assert_eq!(inverse, forward.negated());
    }

    #[test]
    fn test_point_rounded_onto_the_cell_edge_does_not_panic() {
        // セル境界の直下の点。丸め前の秒位置はlower_leftをわずかに下回るが、
        // 小数第1位への丸めでこのセルに属する
        let lon = dec!(140.43749990); // 505574.99964秒 → 505575.0秒
        let lat = dec!(40.58333330); // 146099.99988秒 → 146100.0秒
        let table = table_with(
            vector(dec!(0.1), dec!(1)),
            vector(dec!(0.2), dec!(2)),
            vector(dec!(0.4), dec!(4)),
            vector(dec!(0.3), dec!(3)),
        );

        let delta = bilinear_delta(
            lon,
            lat,
            &corners(),
            &table,
            CorrectionDirection::OriginToCurrent,
        );
        assert!(delta.is_ok());
    }

    #[test]
    fn test_missing_corner_propagates_mesh_not_found() {
        let mut rows = HashMap::new();
        rows.insert(60407305, vector(dec!(0.1), dec!(1)));
        let table = ParameterTable::new(2024, rows);

        let result = bilinear_delta(
            dec!(140.463488),
            dec!(40.608410),
            &corners(),
            &table,
            CorrectionDirection::CurrentToOrigin,
        );
        assert!(matches!(result, Err(SemidynaError::MeshNotFound(_))));
    }

    #[test]
    fn test_apply_then_apply_negated_restores_the_point() {
        let point = GeodeticPoint::with_altitude(dec!(140.463488), dec!(40.608410), dec!(12.3));
        // 秒から度への変換（3600での除算）が10進で割り切れる値を選んである
        let delta = CorrectionVector {
            delta_x: dec!(0.04167),
            delta_y: dec!(-0.05706),
            delta_z: dec!(0.05603),
        };

        let corrected = apply_delta(&point, &delta);
        let CorrectionResult::Corrected { lon, lat, altitude } = corrected else {
            panic!("expected a corrected result");
        };
        let intermediate = GeodeticPoint {
            lon,
            lat,
            altitude,
        };
        let restored = apply_delta(&intermediate, &delta.negated());
        let CorrectionResult::Corrected { lon, lat, altitude } = restored else {
            panic!("expected a corrected result");
        };
        assert_eq!(lon, point.lon);
        assert_eq!(lat, point.lat);
        assert_eq!(altitude, point.altitude);
    }

    #[test]
    fn test_altitude_is_untouched_without_vertical_component() {
        let point = GeodeticPoint::with_altitude(dec!(139.6917), dec!(35.6895), dec!(10.0));
        let delta = vector(dec!(0.1), dec!(0.2));
        let CorrectionResult::Corrected { altitude, .. } = apply_delta(&point, &delta) else {
            panic!("expected a corrected result");
        };
        assert_eq!(altitude, Some(dec!(10.0)));
    }
}
