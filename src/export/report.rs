use serde::Serialize;

use crate::annotator::{AnnotationReport, AnnotatorSettings};
use crate::model::{IfcModel, ModelRegistry};

/// One element's volume, as written to CSV and JSON reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityRow {
    pub model: String,
    pub element: u64,
    pub global_id: String,
    pub entity_type: String,
    pub name: String,
    /// Cubic metres.
    pub volume: f64,
}

fn row(model: &IfcModel, element: u64, volume: f64) -> QuantityRow {
    let info = model.elements.get(&element);
    QuantityRow {
        model: model.name.clone(),
        element,
        global_id: info.map(|e| e.global_id.clone()).unwrap_or_default(),
        entity_type: info
            .map(|e| e.entity_type.clone())
            .or_else(|| model.entity(element).map(|e| e.entity_type.clone()))
            .unwrap_or_default(),
        name: info.map(|e| e.name.clone()).unwrap_or_default(),
        volume,
    }
}

/// Rows for the elements annotated in one pass.
#[must_use]
pub fn report_rows(registry: &ModelRegistry, report: &AnnotationReport) -> Vec<QuantityRow> {
    report
        .annotated
        .iter()
        .filter_map(|a| registry.get(&a.model).map(|m| row(m, a.element, a.volume)))
        .collect()
}

/// Rows for every element of a model carrying a stored volume.
#[must_use]
pub fn quantity_rows(model: &IfcModel, settings: &AnnotatorSettings) -> Vec<QuantityRow> {
    model
        .elements
        .keys()
        .filter_map(|&id| {
            model
                .numeric_property(id, &settings.pset_name, &settings.property_name)
                .map(|volume| row(model, id, volume))
        })
        .collect()
}
