//! Result tables stored as JSON Lines.

use crate::{EvalError, EvalResult};
use data_contracts::evaluation::{EvaluationRecord, ScoredRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> EvalResult<()> {
    let io_err = |source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    for (i, record) in records.iter().enumerate() {
        serde_json::to_writer(&mut writer, record).map_err(|source| EvalError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}

/// Blank lines are skipped.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> EvalResult<Vec<T>> {
    let io_err = |source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| EvalError::Json {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn scored_records(records: &[EvaluationRecord]) -> Vec<ScoredRecord> {
    records.iter().cloned().map(ScoredRecord::from).collect()
}
