use super::QuantityRow;
use crate::error::ExportError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct QuantityDocument<'a> {
    elements: usize,
    /// Cubic metres.
    total_volume: f64,
    rows: &'a [QuantityRow],
}

pub fn export_json<P: AsRef<Path>>(rows: &[QuantityRow], path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let document = QuantityDocument {
        elements: rows.len(),
        total_volume: rows.iter().map(|r| r.volume).sum(),
        rows,
    };

    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}
