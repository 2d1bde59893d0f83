use super::QuantityRow;
use crate::error::ExportError;
use std::fs::File;
use std::path::Path;

pub fn export_csv<P: AsRef<Path>>(rows: &[QuantityRow], path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(["Model", "Element", "Global ID", "Type", "Name", "Volume (m3)"])?;

    for row in rows {
        writer.write_record([
            &row.model,
            &format!("#{}", row.element),
            &row.global_id,
            &row.entity_type,
            &row.name,
            &format!("{:.6}", row.volume),
        ])?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    Ok(())
}
