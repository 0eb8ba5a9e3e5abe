use crate::error::BacktestError;
use chrono::{DateTime, Utc};
use core_types::PriceUpdate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// One row of a tick file.
#[derive(Debug, Deserialize)]
struct TickRow {
    timestamp: DateTime<Utc>,
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
}

/// Loads a `timestamp,symbol,price` CSV file (RFC 3339 timestamps, with a header row).
pub fn load_ticks(path: impl AsRef<Path>) -> Result<Vec<PriceUpdate>, BacktestError> {
    let path = path.as_ref();
    let reader = csv::Reader::from_path(path)?;
    let ticks = collect_ticks(reader)?;
    tracing::info!(path = %path.display(), ticks = ticks.len(), "Loaded tick data");
    Ok(ticks)
}

/// Reads ticks from any CSV source. Rows sharing a timestamp are merged into one
/// `PriceUpdate`; the result is ordered by time regardless of row order.
pub fn read_ticks<R: Read>(source: R) -> Result<Vec<PriceUpdate>, BacktestError> {
    collect_ticks(csv::Reader::from_reader(source))
}

fn collect_ticks<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<PriceUpdate>, BacktestError> {
    let mut by_time: BTreeMap<DateTime<Utc>, PriceUpdate> = BTreeMap::new();

    for (line, result) in reader.deserialize::<TickRow>().enumerate() {
        let row = result?;
        if row.price <= Decimal::ZERO {
            return Err(BacktestError::InvalidData(format!(
                "row {}: non-positive price {} for {}",
                line + 1,
                row.price,
                row.symbol
            )));
        }
        by_time
            .entry(row.timestamp)
            .or_insert_with(|| PriceUpdate::new(row.timestamp))
            .prices
            .insert(row.symbol, row.price);
    }

    Ok(by_time.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const SAMPLE: &str = "timestamp,symbol,price
2024-01-01T00:01:00Z,ETHUSDT,2300.5
2024-01-01T00:00:00Z,BTCUSDT,42000
2024-01-01T00:00:00Z,ETHUSDT,2301
2024-01-01T00:01:00Z,BTCUSDT,42010.25
";

    #[test]
    fn rows_are_grouped_by_timestamp_and_sorted() {
        let ticks = read_ticks(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ticks.len(), 2);
        assert!(ticks[0].timestamp < ticks[1].timestamp);
        assert_eq!(ticks[0].price("BTCUSDT"), Some(dec!(42000)));
        assert_eq!(ticks[0].price("ETHUSDT"), Some(dec!(2301)));
        assert_eq!(ticks[1].price("BTCUSDT"), Some(dec!(42010.25)));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let data = "timestamp,symbol,price\n2024-01-01T00:00:00Z,BTCUSDT,0\n";
        assert!(matches!(read_ticks(data.as_bytes()), Err(BacktestError::InvalidData(_))));
    }

    #[test]
    fn malformed_timestamp_is_a_csv_error() {
        let data = "timestamp,symbol,price\nyesterday,BTCUSDT,1\n";
        assert!(matches!(read_ticks(data.as_bytes()), Err(BacktestError::Csv(_))));
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ticks = load_ticks(file.path()).unwrap();
        assert_eq!(ticks.len(), 2);
    }
}
