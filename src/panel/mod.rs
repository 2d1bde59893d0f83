//! Model selection and IFC export/import round trips.

pub mod download;

use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::model::{IfcModel, ModelEntry, ModelRegistry};
use crate::properties::{IfcPropertiesManager, PropertyManager};

pub use download::{DirectoryDownloads, Download, DownloadSink, IFC_MIME};

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// Nothing was selected; nothing happened.
    NoSelection,
    /// The selected id is no longer in the registry.
    ModelNotFound(String),
    Downloaded(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Downloaded(PathBuf),
    Failed(String),
}

/// Holds the model chosen for export. Failures are logged and reported
/// through the returned outcome, never raised.
pub struct ExportPanel<P = IfcPropertiesManager> {
    properties: P,
    selected: Option<String>,
    status: Option<String>,
}

impl ExportPanel {
    #[must_use]
    pub fn new() -> Self {
        Self::with_properties(IfcPropertiesManager::new())
    }
}

impl Default for ExportPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PropertyManager> ExportPanel<P> {
    pub fn with_properties(properties: P) -> Self {
        Self {
            properties,
            selected: None,
            status: None,
        }
    }

    /// Current `(id, name)` pairs; call again whenever the registry's
    /// revision changes.
    #[must_use]
    pub fn list_models(&self, registry: &ModelRegistry) -> Vec<ModelEntry> {
        registry.entries()
    }

    /// Records `id` as the export target if the registry knows it.
    pub fn select(&mut self, registry: &ModelRegistry, id: &str) -> bool {
        if registry.get(id).is_none() {
            return false;
        }
        self.selected = Some(id.to_string());
        true
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Message describing the last export or import.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    #[must_use]
    pub fn properties(&self) -> &P {
        &self.properties
    }

    /// Writes the selected model, with its changes, to `model_{id}.ifc`.
    pub fn export_selected(
        &mut self,
        registry: &ModelRegistry,
        sink: &mut dyn DownloadSink,
    ) -> ExportOutcome {
        let Some(id) = self.selected.clone() else {
            return ExportOutcome::NoSelection;
        };

        let Some(model) = registry.get(&id) else {
            tracing::error!(model = %id, "model not found");
            self.status = Some(format!("Model with ID {id} not found."));
            return ExportOutcome::ModelNotFound(id);
        };

        match self.export_model(model, sink) {
            Ok(path) => {
                tracing::info!(model = %id, path = %path.display(), "model exported");
                self.status = Some(format!("Exported {}", path.display()));
                ExportOutcome::Downloaded(path)
            }
            Err(e) => {
                tracing::error!(model = %id, error = %e, "model export failed");
                self.status = Some(format!("Export failed: {e}"));
                ExportOutcome::Failed(e.to_string())
            }
        }
    }

    fn export_model(
        &self,
        model: &IfcModel,
        sink: &mut dyn DownloadSink,
    ) -> Result<PathBuf, ExportError> {
        let bytes = self.properties.save_to_ifc(model, &model.data)?;
        deliver(sink, format!("model_{}.ifc", model.id), bytes)
    }

    /// Round-trips an IFC file from disk through an empty model container
    /// and hands the result back under the original file name.
    pub fn import_file(&mut self, path: &Path, sink: &mut dyn DownloadSink) -> ImportOutcome {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match std::fs::read(path) {
            Ok(bytes) => self.import_bytes(&file_name, &bytes, sink),
            Err(source) => {
                let e = ExportError::FileRead {
                    path: path.to_path_buf(),
                    source,
                };
                self.import_failed(&file_name, &e)
            }
        }
    }

    pub fn import_bytes(
        &mut self,
        file_name: &str,
        bytes: &[u8],
        sink: &mut dyn DownloadSink,
    ) -> ImportOutcome {
        let container = IfcModel::empty(file_name);

        let result = self
            .properties
            .save_to_ifc(&container, bytes)
            .map_err(ExportError::from)
            .and_then(|processed| deliver(sink, file_name.to_string(), processed));

        match result {
            Ok(path) => {
                tracing::info!(file = file_name, path = %path.display(), "IFC file processed");
                self.status = Some(format!("Processed {file_name}"));
                ImportOutcome::Downloaded(path)
            }
            Err(e) => self.import_failed(file_name, &e),
        }
    }

    fn import_failed(&mut self, file_name: &str, error: &ExportError) -> ImportOutcome {
        tracing::error!(file = file_name, error = %error, "IFC file import failed");
        self.status = Some(format!("Import failed: {error}"));
        ImportOutcome::Failed(error.to_string())
    }
}

fn deliver(
    sink: &mut dyn DownloadSink,
    file_name: String,
    bytes: Vec<u8>,
) -> Result<PathBuf, ExportError> {
    sink.deliver(Download {
        file_name: file_name.clone(),
        mime: IFC_MIME,
        bytes,
    })
    .map_err(|source| ExportError::Download { file_name, source })
}
