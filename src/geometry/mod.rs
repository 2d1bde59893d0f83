//! Volume measurement over IFC shape representations.
//!
//! The measurement service works on a [`GeometryMap`] taken from a model
//! (element id to shape representation ids) and only looks at
//! representations whose identifier matches the current [`MeasureContext`].

pub mod measure;
pub mod profile;

use std::collections::BTreeMap;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::MeasureError;
use crate::model::IfcModel;
use crate::parser::step::{StepEntity, StepFile, StepValue};

pub use measure::StepVolumeMeasurement;
pub use profile::profile_area;

/// Element id to the ids of its `IFCSHAPEREPRESENTATION`s.
pub type GeometryMap = BTreeMap<u64, Vec<u64>>;

/// Context geometry is resolved in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureContext {
    /// Representation identifier to measure, usually `Body`.
    pub representation: String,
    /// Metres per model length unit; `None` uses the unit the model declares.
    pub length_scale: Option<f64>,
}

impl Default for MeasureContext {
    fn default() -> Self {
        Self {
            representation: "Body".to_string(),
            length_scale: None,
        }
    }
}

/// Computes volumes, in cubic metres, of the geometry in a map.
pub trait VolumeMeasurement {
    fn set_context(&mut self, context: MeasureContext);

    fn context(&self) -> &MeasureContext;

    fn volume_from_geometry(
        &self,
        model: &IfcModel,
        geometry: &GeometryMap,
    ) -> Result<f64, MeasureError>;
}

pub(crate) fn entity(step: &StepFile, id: u64) -> Result<&StepEntity, MeasureError> {
    step.get_entity(id).ok_or_else(|| MeasureError::Malformed {
        id,
        message: "referenced entity is missing".to_string(),
    })
}

pub(crate) fn required_f64(entity: &StepEntity, index: usize) -> Result<f64, MeasureError> {
    entity.f64_at(index).ok_or_else(|| MeasureError::Malformed {
        id: entity.id,
        message: format!("expected a number at attribute {index}"),
    })
}

pub(crate) fn required_ref(entity: &StepEntity, index: usize) -> Result<u64, MeasureError> {
    entity.reference_at(index).ok_or_else(|| MeasureError::Malformed {
        id: entity.id,
        message: format!("expected a reference at attribute {index}"),
    })
}

pub(crate) fn unsupported(entity: &StepEntity) -> MeasureError {
    MeasureError::Unsupported {
        id: entity.id,
        entity_type: entity.entity_type.clone(),
    }
}

fn coordinates(value: &StepValue) -> Vec<f64> {
    value
        .as_list()
        .map(|items| items.iter().filter_map(StepValue::as_f64).collect())
        .unwrap_or_default()
}

/// `IFCCARTESIANPOINT((x,y,z))` as a 3D vector; missing z reads as 0.
pub(crate) fn point3(step: &StepFile, id: u64) -> Result<Vector3<f64>, MeasureError> {
    let point = entity(step, id)?;
    let coords = point.value(0).map(coordinates).unwrap_or_default();
    vector3(&coords).ok_or_else(|| MeasureError::Malformed {
        id,
        message: "point needs at least two coordinates".to_string(),
    })
}

pub(crate) fn point2(step: &StepFile, id: u64) -> Result<Vector2<f64>, MeasureError> {
    let p = point3(step, id)?;
    Ok(Vector2::new(p.x, p.y))
}

/// Coordinate tuples of an `IFCCARTESIANPOINTLIST2D/3D`.
pub(crate) fn point_list(list: &StepEntity) -> Vec<Vector3<f64>> {
    list.value(0)
        .and_then(StepValue::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| vector3(&coordinates(item)))
                .collect()
        })
        .unwrap_or_default()
}

fn vector3(coords: &[f64]) -> Option<Vector3<f64>> {
    match coords {
        [x, y] => Some(Vector3::new(*x, *y, 0.0)),
        [x, y, z, ..] => Some(Vector3::new(*x, *y, *z)),
        _ => None,
    }
}

/// Absolute area of a closed polygon (shoelace formula).
pub(crate) fn polygon_area(points: &[Vector2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.0
}

/// Signed volume contribution of a planar polygon, fan-triangulated from its
/// first vertex. Summed over a closed surface this gives the enclosed volume.
pub(crate) fn signed_polygon_volume(points: &[Vector3<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let origin = points[0];
    points[1..]
        .windows(2)
        .map(|pair| origin.dot(&pair[0].cross(&pair[1])) / 6.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace_handles_either_winding() {
        let square = [
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
        ];
        let mut reversed = square;
        reversed.reverse();

        assert!((polygon_area(&square) - 4.0).abs() < 1e-9);
        assert!((polygon_area(&reversed) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn unit_tetrahedron_volume() {
        let o = Vector3::new(0.0, 0.0, 0.0);
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        let z = Vector3::new(0.0, 0.0, 1.0);
        let faces = [[o, y, x], [o, x, z], [o, z, y], [x, y, z]];

        let volume: f64 = faces.iter().map(|f| signed_polygon_volume(f.as_slice())).sum();
        assert!((volume.abs() - 1.0 / 6.0).abs() < 1e-9);
    }
}
