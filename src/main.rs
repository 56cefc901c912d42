use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;
use tracing::{info, warn};

use japan_semidyna::{
    CorrectionDirection, CorrectionResult, Epoch, GeodeticPoint, ParameterStore, SemiDynamic,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 補正パラメーターファイル（*.par）を置いたディレクトリ
    #[arg(short, long, value_name = "DIR")]
    params: PathBuf,

    /// 観測日（YYYY-MM-DD形式、年度の選択に使用）
    #[arg(short, long, value_name = "DATE")]
    date: String,

    /// 経度（10進法の度単位）
    #[arg(long)]
    lon: Option<String>,

    /// 緯度（10進法の度単位）
    #[arg(long)]
    lat: Option<String>,

    /// 標高（メートル）
    #[arg(long)]
    altitude: Option<String>,

    /// lon,lat[,altitude] 形式のCSVファイルを一括補正する
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// 元期から今期への補正を行う（デフォルトは今期から元期）
    #[arg(long)]
    forward: bool,
}

fn main() -> Result<()> {
    // ログの初期化
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let date = NaiveDate::parse_from_str(&args.date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}", args.date))?;
    let epoch = Epoch::new(date);
    let direction = if args.forward {
        CorrectionDirection::OriginToCurrent
    } else {
        CorrectionDirection::CurrentToOrigin
    };

    let mut semidyna = SemiDynamic::new(ParameterStore::new(&args.params));

    if let Some(input) = &args.input {
        // CSVファイルの一括補正
        info!("Processing input file: {:?}", input);
        let points = read_points(input)?;
        info!("Read {} points", points.len());
        let results = semidyna.correct_batch(&points, epoch, direction)?;
        for result in &results {
            print_result(result);
        }
        let unavailable = results.iter().filter(|r| !r.is_available()).count();
        if unavailable > 0 {
            warn!("{} of {} points could not be corrected", unavailable, results.len());
        }
    } else {
        // 単点の補正
        let (Some(lon), Some(lat)) = (&args.lon, &args.lat) else {
            anyhow::bail!("Either --input or both --lon and --lat are required");
        };
        let lon = parse_decimal(lon).context("Invalid longitude")?;
        let lat = parse_decimal(lat).context("Invalid latitude")?;
        let point = match &args.altitude {
            Some(altitude) => GeodeticPoint::with_altitude(
                lon,
                lat,
                parse_decimal(altitude).context("Invalid altitude")?,
            ),
            None => GeodeticPoint::new(lon, lat),
        };
        let result = semidyna.correct_point(&point, epoch, direction)?;
        print_result(&result);
    }

    Ok(())
}

/// 文字列から直接Decimalを構築する。floatを経由すると2進数の丸め誤差が
/// 混入するため、必ずテキストから変換する
fn parse_decimal(text: &str) -> Result<Decimal> {
    Decimal::from_str(text.trim()).with_context(|| format!("Failed to parse decimal: {text}"))
}

fn read_points(path: &PathBuf) -> Result<Vec<GeodeticPoint>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    let mut points = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 2 {
            anyhow::bail!("Line {}: expected lon,lat[,altitude]", index + 1);
        }
        let lon = parse_decimal(fields[0]).with_context(|| format!("Line {}", index + 1))?;
        let lat = parse_decimal(fields[1]).with_context(|| format!("Line {}", index + 1))?;
        let point = match fields.get(2) {
            Some(altitude) => GeodeticPoint::with_altitude(
                lon,
                lat,
                parse_decimal(altitude).with_context(|| format!("Line {}", index + 1))?,
            ),
            None => GeodeticPoint::new(lon, lat),
        };
        points.push(point);
    }
    Ok(points)
}

fn print_result(result: &CorrectionResult) {
    match result {
        CorrectionResult::Corrected { lon, lat, altitude } => match altitude {
            Some(altitude) => println!("{},{},{}", lon, lat, altitude),
            None => println!("{},{}", lon, lat),
        },
        CorrectionResult::Unavailable => println!("unavailable"),
    }
}
