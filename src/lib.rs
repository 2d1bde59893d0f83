//! # IFC Quantities
//!
//! Computes element volumes from IFC geometry and writes them back into the
//! model as properties, then exports the changed model as an IFC file.
//!
//! ## Features
//!
//! - Parse IFC files (IFC2x3 and IFC4 schemas)
//! - Measure solid volumes (extrusions, breps, face sets, CSG primitives)
//! - Attach each volume once per element, with an explicit recompute
//! - Export the selected model, or round-trip a file from disk
//! - Volume reports as CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::{BTreeMap, BTreeSet};
//!
//! use ifc_quantities::annotator::{AnnotatorSettings, VolumeAnnotator};
//! use ifc_quantities::geometry::MeasureContext;
//! use ifc_quantities::model::ModelRegistry;
//!
//! let mut registry = ModelRegistry::new();
//! let id = registry.load_file("model.ifc").expect("Failed to parse");
//!
//! let elements: BTreeSet<u64> = registry.get(&id).unwrap().elements.keys().copied().collect();
//! let selection = BTreeMap::from([(id, elements)]);
//!
//! let mut annotator = VolumeAnnotator::new(AnnotatorSettings::default());
//! let report = annotator
//!     .compute(&mut registry, &MeasureContext::default(), &selection, false)
//!     .expect("Failed to annotate");
//! println!("Total volume: {:.3} m3", report.total_volume());
//! ```

pub mod annotator;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod panel;
pub mod parser;
pub mod properties;
pub mod relations;
pub mod ui;
