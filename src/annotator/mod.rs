//! Volume annotation of selected elements.
//!
//! [`VolumeAnnotator::compute`] measures each selected element, writes the
//! volume into the element's `CalculatedQuantities` property set and
//! remembers the element in a [`ProcessedRegistry`] so repeated selections
//! do not annotate it again unless forced.

pub mod processed;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, PropertyError};
use crate::geometry::{MeasureContext, StepVolumeMeasurement, VolumeMeasurement};
use crate::model::{IfcModel, ModelRegistry};
use crate::properties::{IfcPropertiesManager, PropertyManager};
use crate::relations::RelationKind;

pub use processed::ProcessedRegistry;

/// Model or fragment id to the element ids to annotate.
pub type Selection = BTreeMap<String, BTreeSet<u64>>;

/// Every fragment of every loaded model, keyed by fragment id.
#[must_use]
pub fn whole_registry(models: &ModelRegistry) -> Selection {
    models
        .iter()
        .flat_map(|m| m.fragments.iter())
        .map(|f| (f.id.clone(), f.element_ids.iter().copied().collect()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorSettings {
    pub pset_name: String,
    pub property_name: String,
    /// IFC measure type the value is written as.
    pub value_type: String,
    /// Bound on the number of models whose processed elements are kept.
    pub max_cached_models: Option<usize>,
}

impl Default for AnnotatorSettings {
    fn default() -> Self {
        Self {
            pset_name: "CalculatedQuantities".to_string(),
            property_name: "Volume".to_string(),
            value_type: "IfcReal".to_string(),
            max_cached_models: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedElement {
    pub model: String,
    pub element: u64,
    /// Cubic metres.
    pub volume: f64,
    pub pset: u64,
    pub property: u64,
}

/// What one `compute` call did.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AnnotationReport {
    pub annotated: Vec<AnnotatedElement>,
    /// Elements passed over because they were already processed.
    pub skipped: usize,
    /// Selection keys that matched no loaded model or fragment.
    pub unresolved: Vec<String>,
    /// Elements a batch run could not measure.
    pub failed: Vec<FailedElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedElement {
    pub model: String,
    pub element: u64,
    pub reason: String,
}

impl AnnotationReport {
    #[must_use]
    pub fn attachments(&self) -> usize {
        self.annotated.len()
    }

    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.annotated.iter().map(|a| a.volume).sum()
    }
}

pub struct VolumeAnnotator<M = StepVolumeMeasurement, P = IfcPropertiesManager> {
    measurement: M,
    properties: P,
    processed: ProcessedRegistry,
    settings: AnnotatorSettings,
}

impl VolumeAnnotator {
    #[must_use]
    pub fn new(settings: AnnotatorSettings) -> Self {
        Self::with_services(
            StepVolumeMeasurement::default(),
            IfcPropertiesManager::new(),
            settings,
        )
    }
}

impl<M: VolumeMeasurement, P: PropertyManager> VolumeAnnotator<M, P> {
    pub fn with_services(measurement: M, properties: P, settings: AnnotatorSettings) -> Self {
        let processed = settings
            .max_cached_models
            .map_or_else(ProcessedRegistry::new, ProcessedRegistry::with_max_models);
        Self {
            measurement,
            properties,
            processed,
            settings,
        }
    }

    /// Replaces the processed-element registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ProcessedRegistry) -> Self {
        self.processed = registry;
        self
    }

    #[must_use]
    pub fn processed(&self) -> &ProcessedRegistry {
        &self.processed
    }

    pub fn processed_mut(&mut self) -> &mut ProcessedRegistry {
        &mut self.processed
    }

    #[must_use]
    pub fn settings(&self) -> &AnnotatorSettings {
        &self.settings
    }

    #[must_use]
    pub fn properties(&self) -> &P {
        &self.properties
    }

    #[must_use]
    pub fn measurement(&self) -> &M {
        &self.measurement
    }

    /// Annotates every selected element with its volume.
    ///
    /// Elements recorded as processed are skipped unless `force` is set;
    /// forced elements are measured again and their volume property is
    /// replaced. Selection keys that resolve to no model are reported in
    /// [`AnnotationReport::unresolved`].
    ///
    /// # Errors
    ///
    /// The first measurement or property failure aborts the call. Elements
    /// annotated before the failure keep their properties.
    pub fn compute(
        &mut self,
        models: &mut ModelRegistry,
        context: &MeasureContext,
        selection: &Selection,
        force: bool,
    ) -> Result<AnnotationReport, AnnotateError> {
        self.run(models, context, selection, force, false)
    }

    /// Like [`compute`](Self::compute), but an element that cannot be
    /// measured is recorded in [`AnnotationReport::failed`] and left
    /// unprocessed while the rest of the selection carries on.
    ///
    /// # Errors
    ///
    /// Property failures still abort the call.
    pub fn compute_batch(
        &mut self,
        models: &mut ModelRegistry,
        context: &MeasureContext,
        selection: &Selection,
        force: bool,
    ) -> Result<AnnotationReport, AnnotateError> {
        self.run(models, context, selection, force, true)
    }

    fn run(
        &mut self,
        models: &mut ModelRegistry,
        context: &MeasureContext,
        selection: &Selection,
        force: bool,
        keep_going: bool,
    ) -> Result<AnnotationReport, AnnotateError> {
        self.measurement.set_context(context.clone());
        let mut report = AnnotationReport::default();

        for (key, element_ids) in selection {
            let Some(model) = models
                .resolve_group(key)
                .and_then(|model_id| models.get_mut(&model_id))
            else {
                tracing::warn!(key = %key, "selection does not match a loaded model");
                report.unresolved.push(key.clone());
                continue;
            };

            self.processed.ensure_model(&model.id);

            for &element in element_ids {
                if !force && self.processed.contains(&model.id, element) {
                    report.skipped += 1;
                    continue;
                }

                let annotated = match self.annotate_element(model, element) {
                    Ok(annotated) => annotated,
                    Err(AnnotateError::Measure { model: model_id, source, .. }) if keep_going => {
                        tracing::warn!(model = %model_id, element, error = %source, "element not measured");
                        report.failed.push(FailedElement {
                            model: model_id,
                            element,
                            reason: source.to_string(),
                        });
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                self.processed.mark(&model.id, element);
                report.annotated.push(annotated);
            }
        }

        tracing::info!(
            annotated = report.annotated.len(),
            skipped = report.skipped,
            unresolved = report.unresolved.len(),
            failed = report.failed.len(),
            force,
            "volume annotation finished"
        );

        Ok(report)
    }

    fn annotate_element(
        &mut self,
        model: &mut IfcModel,
        element: u64,
    ) -> Result<AnnotatedElement, AnnotateError> {
        let model_id = model.id.clone();
        let property_error = |source: PropertyError| AnnotateError::Property {
            model: model_id.clone(),
            element,
            source,
        };

        let geometry = model.geometry_map(&[element]);
        let volume = self
            .measurement
            .volume_from_geometry(model, &geometry)
            .map_err(|source| AnnotateError::Measure {
                model: model_id.clone(),
                element,
                source,
            })?;

        let settings = &self.settings;
        let pset = self
            .properties
            .ensure_pset(model, element, &settings.pset_name)
            .map_err(property_error)?;
        let property = self
            .properties
            .new_single_numeric_property(
                model,
                &settings.value_type,
                &settings.property_name,
                volume,
            )
            .map_err(property_error)?;
        self.properties
            .add_prop_to_pset(model, pset, property)
            .map_err(property_error)?;
        self.properties
            .add_element_to_pset(model, pset, element)
            .map_err(property_error)?;

        let relations = model
            .relations
            .entity_relations_mut(element, RelationKind::IsDefinedBy);
        if !relations.contains(&pset) {
            relations.push(pset);
        }

        tracing::debug!(model = %model_id, element, volume, pset, property, "volume attached");

        Ok(AnnotatedElement {
            model: model_id,
            element,
            volume,
            pset,
            property,
        })
    }
}
