use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

/// セミダイナミック補正で発生するエラー
#[derive(Debug, Error)]
pub enum SemidynaError {
    /// 年度に一致するパラメーターファイルが見つからない
    #[error("no semi-dynamic parameter file for fiscal year {fiscal_year} in {dir:?}")]
    ParameterFileNotFound { fiscal_year: i32, dir: PathBuf },

    /// 年度に一致するパラメーターファイルが複数存在する（設定エラー）
    #[error("multiple semi-dynamic parameter files match fiscal year {fiscal_year}: {files:?}")]
    ParameterFileAmbiguous {
        fiscal_year: i32,
        files: Vec<PathBuf>,
    },

    /// すべてのエンコーディングでデコードに失敗した
    #[error("failed to decode {path:?} with any attempted encoding ({})", .encodings.join(", "))]
    Encoding {
        path: PathBuf,
        encodings: Vec<String>,
    },

    /// メッシュコードがパラメーターテーブルに存在しない
    #[error("mesh code {0} not found in the correction parameter table")]
    MeshNotFound(u32),

    /// 地域メッシュの対象範囲外の座標
    #[error("point (lon: {lon}, lat: {lat}) is outside the addressable mesh grid")]
    GridBoundary { lon: Decimal, lat: Decimal },

    /// 入力の検証に失敗した
    #[error("{0}")]
    Validation(String),

    /// パラメーターファイルの内容が不正
    #[error("failed to parse parameter file {path:?} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
