// CSV exporter for raw telemetry: the interchange artifact handed to users
// and read back by the curve builder CLI

use std::path::Path;

use log::info;

use crate::errors::ParabolicaError;
use crate::telemetry::{Sample, SampleSequence};

const CSV_HEADER: [&str; 5] = ["Time", "X", "Y", "Z", "Speed"];

/// Serialize a sample sequence in raw source units, one row per sample.
///
/// Column order is fixed (`Time,X,Y,Z,Speed`), decimals use `.`, a missing
/// elevation is written as `0.00` and a missing speed as an empty field. Rows
/// are never skipped.
pub fn write_csv(path: &Path, seq: &SampleSequence) -> Result<(), ParabolicaError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for sample in seq.iter() {
        writer.write_record(&[
            format!("{:.3}", sample.time),
            format!("{:.2}", sample.x),
            format!("{:.2}", sample.y),
            format!("{:.2}", sample.z_or_flat()),
            sample.speed.map(|s| format!("{:.2}", s)).unwrap_or_default(),
        ])?;
    }
    writer.flush().map_err(|e| ParabolicaError::CsvWriteError {
        source: csv::Error::from(e),
    })?;
    info!("Wrote {} telemetry rows to {:?}", seq.len(), path);
    Ok(())
}

/// Parse a telemetry CSV written by [`write_csv`].
///
/// The header row is mandatory and `Time` must be non-decreasing row to row;
/// anything else is a parse error rather than a silently dropped row.
pub fn read_csv(path: &Path) -> Result<SampleSequence, ParabolicaError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ParabolicaError::CsvParseError {
        description: format!("{}: {}", path.display(), e),
    })?;

    let headers = reader
        .headers()
        .map_err(|e| ParabolicaError::CsvParseError {
            description: format!("missing header row: {}", e),
        })?
        .clone();
    if headers.iter().ne(CSV_HEADER) {
        return Err(ParabolicaError::CsvParseError {
            description: format!(
                "unexpected header {:?}, expected {:?}",
                headers.iter().collect::<Vec<_>>(),
                CSV_HEADER
            ),
        });
    }

    let mut samples = Vec::new();
    let mut previous_time = f64::NEG_INFINITY;
    for (row_no, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ParabolicaError::CsvParseError {
            description: format!("row {}: {}", row_no + 2, e),
        })?;
        let sample = parse_row(&record, row_no + 2)?;
        if sample.time < previous_time {
            return Err(ParabolicaError::CsvParseError {
                description: format!(
                    "row {}: Time went backwards ({} after {})",
                    row_no + 2,
                    sample.time,
                    previous_time
                ),
            });
        }
        previous_time = sample.time;
        samples.push(sample);
    }

    SampleSequence::new(samples)
}

fn parse_row(record: &csv::StringRecord, row_no: usize) -> Result<Sample, ParabolicaError> {
    let field = |idx: usize| -> Result<&str, ParabolicaError> {
        record.get(idx).ok_or(ParabolicaError::CsvParseError {
            description: format!("row {}: missing column {}", row_no, CSV_HEADER[idx]),
        })
    };
    let number = |idx: usize| -> Result<f64, ParabolicaError> {
        field(idx)?
            .parse::<f64>()
            .map_err(|e| ParabolicaError::CsvParseError {
                description: format!("row {}: bad {} value: {}", row_no, CSV_HEADER[idx], e),
            })
    };

    let speed_field = field(4)?;
    let speed = if speed_field.is_empty() {
        None
    } else {
        Some(number(4)?)
    };

    Ok(Sample {
        time: number(0)?,
        x: number(1)?,
        y: number(2)?,
        z: Some(number(3)?),
        speed,
    })
}
