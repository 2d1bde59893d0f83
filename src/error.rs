//! Error types for the IFC quantity tool.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing IFC files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors raised by the volume measurement service.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// The element has no shape representation in the measured context.
    #[error("element #{element} has no '{representation}' geometry")]
    NoGeometry { element: u64, representation: String },

    /// The geometry item type is not supported.
    #[error("unsupported geometry #{id} ({entity_type})")]
    Unsupported { id: u64, entity_type: String },

    /// A referenced entity is missing or has unexpected attributes.
    #[error("malformed geometry #{id}: {message}")]
    Malformed { id: u64, message: String },
}

/// Errors raised by the property-management service.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// A referenced entity does not exist in the model.
    #[error("entity #{id} not found in model")]
    MissingEntity { id: u64 },

    /// The referenced entity is not a property set.
    #[error("entity #{id} is {entity_type}, not IFCPROPERTYSET")]
    NotAPropertySet { id: u64, entity_type: String },

    /// The raw model payload could not be serialized back to IFC.
    #[error("failed to serialize model: {source}")]
    Serialize {
        #[from]
        source: ParseError,
    },
}

/// Errors that abort a volume annotation pass.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// Measuring an element failed.
    #[error("measuring element #{element} of model '{model}' failed: {source}")]
    Measure {
        model: String,
        element: u64,
        source: MeasureError,
    },

    /// Writing the volume property failed.
    #[error("writing volume of element #{element} in model '{model}' failed: {source}")]
    Property {
        model: String,
        element: u64,
        source: PropertyError,
    },
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },

    /// Failed to read a file selected for import.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The download sink rejected the file.
    #[error("failed to deliver '{file_name}': {source}")]
    Download {
        file_name: String,
        source: std::io::Error,
    },

    /// Failed to serialize a model to IFC.
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file.
    #[error("failed to read config '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for the expected layout.
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
