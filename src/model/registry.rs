use std::path::Path;

use serde::Serialize;

use super::IfcModel;
use crate::error::ParseError;
use crate::parser::ifc::load_ifc_file;

/// An entry of the live model list: `(id, display name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub id: String,
    pub name: String,
}

/// Loaded models in load order.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<IfcModel>,
    revision: u64,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model and returns its id. A model with the same id is replaced.
    pub fn insert(&mut self, model: IfcModel) -> String {
        let id = model.id.clone();
        match self.models.iter_mut().find(|m| m.id == id) {
            Some(existing) => *existing = model,
            None => self.models.push(model),
        }
        self.revision += 1;
        tracing::info!(model = %id, "model registered");
        id
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<String, ParseError> {
        let model = load_ifc_file(path)?;
        Ok(self.insert(model))
    }

    pub fn remove(&mut self, id: &str) -> Option<IfcModel> {
        let index = self.models.iter().position(|m| m.id == id)?;
        self.revision += 1;
        Some(self.models.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&IfcModel> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut IfcModel> {
        self.models.iter_mut().find(|m| m.id == id)
    }

    /// Resolves a model id or fragment id to the id of the owning model.
    #[must_use]
    pub fn resolve_group(&self, key: &str) -> Option<String> {
        if self.get(key).is_some() {
            return Some(key.to_string());
        }
        let (model_id, _) = key.rsplit_once('#')?;
        let model = self.get(model_id)?;
        model.fragment(key).map(|_| model.id.clone())
    }

    #[must_use]
    pub fn entries(&self) -> Vec<ModelEntry> {
        self.models
            .iter()
            .map(|m| ModelEntry {
                id: m.id.clone(),
                name: m.name.clone(),
            })
            .collect()
    }

    /// Incremented on every change to the set of models.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = &IfcModel> {
        self.models.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
