//! セミダイナミック補正パラメーターファイルの探索・読み込み・索引付け。
//!
//! パラメーターファイルは年度ごとに1つのプレーンテキストで、先頭15行の
//! ヘッダー情報に続いて16行目が列名、17行目以降がメッシュコードをキーと
//! するデータ行になっている。配布時期によってエンコーディングが揺れる
//! ため、UTF-8とレガシーな日本語エンコーディングを順に試す。

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::SemidynaError;
use crate::model::{CorrectionVector, Epoch};

/// ヘッダー行より前に置かれている行数
const PREAMBLE_LINES: usize = 15;

/// デコードを試すエンコーディングの順序
static ENCODINGS: [&Encoding; 3] = [UTF_8, SHIFT_JIS, EUC_JP];

/// 年度ごとの補正値テーブル。構築後は読み取り専用
#[derive(Debug, Clone)]
pub struct ParameterTable {
    fiscal_year: i32,
    rows: HashMap<u32, CorrectionVector>,
}

impl ParameterTable {
    pub fn new(fiscal_year: i32, rows: HashMap<u32, CorrectionVector>) -> Self {
        Self { fiscal_year, rows }
    }

    pub fn fiscal_year(&self) -> i32 {
        self.fiscal_year
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// メッシュコードに対応する補正値を返す。存在しない場合は
    /// ゼロベクトルを返さず[`SemidynaError::MeshNotFound`]で失敗する
    pub fn get(&self, mesh_code: u32) -> Result<&CorrectionVector, SemidynaError> {
        self.rows
            .get(&mesh_code)
            .ok_or(SemidynaError::MeshNotFound(mesh_code))
    }
}

/// パラメーターファイルの置き場所
#[derive(Debug, Clone)]
pub struct ParameterStore {
    dir: PathBuf,
}

impl ParameterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 観測時期の年度に対応するパラメーターファイルを探す。
    /// 候補が0件でも2件以上でも設定エラーとして失敗する
    pub fn file_for_epoch(&self, epoch: Epoch) -> Result<PathBuf, SemidynaError> {
        let fiscal_year = epoch.fiscal_year();
        let year_token = fiscal_year.to_string();
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("par") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.contains(&year_token) {
                candidates.push(path);
            }
        }
        candidates.sort();
        match candidates.len() {
            1 => Ok(candidates.remove(0)),
            0 => Err(SemidynaError::ParameterFileNotFound {
                fiscal_year,
                dir: self.dir.clone(),
            }),
            _ => Err(SemidynaError::ParameterFileAmbiguous {
                fiscal_year,
                files: candidates,
            }),
        }
    }

    /// パラメーターファイルを読み込んでメッシュコード索引のテーブルを作る
    pub fn load_table(
        &self,
        path: &Path,
        fiscal_year: i32,
    ) -> Result<ParameterTable, SemidynaError> {
        let bytes = fs::read(path)?;
        let (text, encoding) =
            decode_parameter_bytes(&bytes).ok_or_else(|| SemidynaError::Encoding {
                path: path.to_path_buf(),
                encodings: ENCODINGS.iter().map(|enc| enc.name().to_string()).collect(),
            })?;
        debug!("Decoded {:?} as {}", path, encoding);
        let table = parse_table(&text, path, fiscal_year)?;
        info!(
            "Loaded {} correction parameters for fiscal year {} from {:?}",
            table.len(),
            fiscal_year,
            path
        );
        Ok(table)
    }
}

/// 年度からテーブルへの明示的なキャッシュ。年度ごとに1度だけ読み込み、
/// 以後は読み取り専用で共有する
#[derive(Debug, Default)]
pub struct ParameterCache {
    tables: HashMap<i32, ParameterTable>,
}

impl ParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_for(
        &mut self,
        store: &ParameterStore,
        epoch: Epoch,
    ) -> Result<&ParameterTable, SemidynaError> {
        match self.tables.entry(epoch.fiscal_year()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = store.file_for_epoch(epoch)?;
                let table = store.load_table(&path, epoch.fiscal_year())?;
                Ok(entry.insert(table))
            }
        }
    }
}

fn decode_parameter_bytes(bytes: &[u8]) -> Option<(String, &'static str)> {
    for encoding in ENCODINGS {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Some((text.into_owned(), encoding.name()));
        }
    }
    None
}

/// 1トークンの解釈結果。小数点を含めばDecimal、含まなければ整数、
/// どちらにも変換できないものはラベルとして保持する
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Integer(i64),
    Number(Decimal),
    Label(String),
}

impl Token {
    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Token::Integer(value) => Some(Decimal::from(*value)),
            Token::Number(value) => Some(*value),
            Token::Label(_) => None,
        }
    }
}

fn clean_line(line: &str) -> Vec<Token> {
    line.split_whitespace()
        .map(|token| {
            if token.contains('.') {
                Decimal::from_str(token)
                    .map(Token::Number)
                    .unwrap_or_else(|_| Token::Label(token.to_string()))
            } else {
                token
                    .parse::<i64>()
                    .map(Token::Integer)
                    .unwrap_or_else(|_| Token::Label(token.to_string()))
            }
        })
        .collect()
}

/// ヘッダー行から各列の位置を決める。配布元の列名（dB/dL/dH）を
/// delta_y（南北）・delta_x（東西）・delta_z（鉛直）に読み替える
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    mesh_code: usize,
    delta_y: usize,
    delta_x: usize,
    delta_z: Option<usize>,
}

fn column_layout(header: &[Token]) -> ColumnLayout {
    let mut mesh_code = None;
    let mut delta_y = None;
    let mut delta_x = None;
    let mut delta_z = None;
    for (index, token) in header.iter().enumerate() {
        let Token::Label(label) = token else { continue };
        let label = label.to_ascii_lowercase();
        if label.contains("mesh") {
            mesh_code = Some(index);
        } else if label.starts_with("db") {
            delta_y = Some(index);
        } else if label.starts_with("dl") {
            delta_x = Some(index);
        } else if label.starts_with("dh") {
            delta_z = Some(index);
        }
    }
    // ラベルで特定できない場合は配布ファイルの列順（コード, dB, dL, dH）に従う
    ColumnLayout {
        mesh_code: mesh_code.unwrap_or(0),
        delta_y: delta_y.unwrap_or(1),
        delta_x: delta_x.unwrap_or(2),
        delta_z,
    }
}

fn parse_table(
    text: &str,
    path: &Path,
    fiscal_year: i32,
) -> Result<ParameterTable, SemidynaError> {
    let mut lines = text.lines().skip(PREAMBLE_LINES);
    let header_line = lines.next().ok_or_else(|| SemidynaError::Parse {
        path: path.to_path_buf(),
        line: PREAMBLE_LINES + 1,
        reason: "missing header line".to_string(),
    })?;
    let layout = column_layout(&clean_line(header_line));

    let mut rows = HashMap::new();
    for (offset, line) in lines.enumerate() {
        let line_number = PREAMBLE_LINES + 2 + offset;
        let tokens = clean_line(line);
        if tokens.is_empty() {
            continue;
        }
        let (mesh_code, vector) = parse_row(&tokens, layout).map_err(|reason| {
            SemidynaError::Parse {
                path: path.to_path_buf(),
                line: line_number,
                reason,
            }
        })?;
        rows.insert(mesh_code, vector);
    }
    Ok(ParameterTable::new(fiscal_year, rows))
}

fn parse_row(tokens: &[Token], layout: ColumnLayout) -> Result<(u32, CorrectionVector), String> {
    let mesh_code = match tokens.get(layout.mesh_code) {
        Some(Token::Integer(value)) => {
            u32::try_from(*value).map_err(|_| format!("mesh code {value} out of range"))?
        }
        Some(token) => return Err(format!("mesh code column is not an integer: {token:?}")),
        None => return Err("missing mesh code column".to_string()),
    };
    let delta_y = numeric_column(tokens, layout.delta_y, "delta_y")?;
    let delta_x = numeric_column(tokens, layout.delta_x, "delta_x")?;
    // 鉛直成分の列を持たないファイルもある
    let delta_z = match layout.delta_z {
        Some(index) => numeric_column(tokens, index, "delta_z")?,
        None => Decimal::ZERO,
    };
    Ok((
        mesh_code,
        CorrectionVector {
            delta_x,
            delta_y,
            delta_z,
        },
    ))
}

fn numeric_column(tokens: &[Token], index: usize, name: &str) -> Result<Decimal, String> {
    tokens
        .get(index)
        .and_then(Token::as_decimal)
        .ok_or_else(|| format!("column {name} is missing or not numeric"))
}
