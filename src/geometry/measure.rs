use std::f64::consts::PI;

use nalgebra::Vector3;

use super::profile::{curve_points, profile_area};
use super::{
    entity, point3, point_list, required_f64, required_ref, signed_polygon_volume, unsupported,
    GeometryMap, MeasureContext, VolumeMeasurement,
};
use crate::error::MeasureError;
use crate::model::IfcModel;
use crate::parser::step::{StepFile, StepValue};

// Mapped items and CSG trees may nest; deeper trees are treated as cycles
const MAX_NESTING: usize = 16;

const HALF_SPACES: &[&str] = &[
    "IFCHALFSPACESOLID",
    "IFCBOXEDHALFSPACE",
    "IFCPOLYGONALBOUNDEDHALFSPACE",
];

/// Measures volumes directly from the STEP geometry of a model.
///
/// Boolean results are approximated: differences subtract bounded second
/// operands and ignore half-space clippings, unions add.
#[derive(Debug, Default, Clone)]
pub struct StepVolumeMeasurement {
    context: MeasureContext,
}

impl StepVolumeMeasurement {
    #[must_use]
    pub fn new(context: MeasureContext) -> Self {
        Self { context }
    }

    fn item_volume(&self, step: &StepFile, id: u64, depth: usize) -> Result<f64, MeasureError> {
        let item = entity(step, id)?;
        if depth > MAX_NESTING {
            return Err(MeasureError::Malformed {
                id,
                message: "geometry nests too deeply".to_string(),
            });
        }

        let volume = match item.entity_type.as_str() {
            // SweptArea, Position, ExtrudedDirection, Depth
            "IFCEXTRUDEDAREASOLID" => {
                let area = profile_area(step, required_ref(item, 0)?)?;
                area * required_f64(item, 3)? * extrusion_factor(step, required_ref(item, 2)?)?
            }
            // ..., EndSweptArea
            "IFCEXTRUDEDAREASOLIDTAPERED" => {
                let start = profile_area(step, required_ref(item, 0)?)?;
                let end = profile_area(step, required_ref(item, 4)?)?;
                let height =
                    required_f64(item, 3)? * extrusion_factor(step, required_ref(item, 2)?)?;
                height * (start + end + (start * end).sqrt()) / 3.0
            }
            "IFCFACETEDBREP" => {
                shell_volume(step, required_ref(item, 0)?)?.abs()
            }
            // Outer, Voids
            "IFCFACETEDBREPWITHVOIDS" => {
                let mut volume = shell_volume(step, required_ref(item, 0)?)?.abs();
                for void in item.references_at(1) {
                    volume -= shell_volume(step, void)?.abs();
                }
                volume.max(0.0)
            }
            "IFCSHELLBASEDSURFACEMODEL" => {
                let mut volume = 0.0;
                for shell in item.references_at(0) {
                    volume += shell_volume(step, shell)?.abs();
                }
                volume
            }
            "IFCTRIANGULATEDFACESET" => triangulated_volume(step, item.id)?,
            "IFCPOLYGONALFACESET" => polygonal_volume(step, item.id)?,
            // Directrix, Radius, InnerRadius, StartParam, EndParam
            "IFCSWEPTDISKSOLID" => {
                let radius = required_f64(item, 1)?;
                let inner = item.f64_at(2).unwrap_or(0.0);
                let length = directrix_length(step, required_ref(item, 0)?)?;
                PI * (radius * radius - inner * inner) * length
            }
            // MappingSource, MappingTarget
            "IFCMAPPEDITEM" => {
                let source = entity(step, required_ref(item, 0)?)?;
                let representation = entity(step, required_ref(source, 1)?)?;
                let mut volume = 0.0;
                for mapped in representation.references_at(3) {
                    volume += self.item_volume(step, mapped, depth + 1)?;
                }
                volume * mapping_scale(step, item.reference_at(1))?
            }
            // TreeRootExpression
            "IFCCSGSOLID" => self.item_volume(step, required_ref(item, 0)?, depth + 1)?,
            // Operator, FirstOperand, SecondOperand
            "IFCBOOLEANRESULT" | "IFCBOOLEANCLIPPINGRESULT" => {
                let first = self.item_volume(step, required_ref(item, 1)?, depth + 1)?;
                let second_id = required_ref(item, 2)?;
                let second_entity = entity(step, second_id)?;
                if HALF_SPACES.contains(&second_entity.entity_type.as_str()) {
                    tracing::debug!(id, "ignoring half-space operand");
                    return Ok(first);
                }
                let second = self.item_volume(step, second_id, depth + 1)?;
                match item.value(0) {
                    Some(StepValue::Enum(op)) if op == "UNION" => first + second,
                    Some(StepValue::Enum(op)) if op == "INTERSECTION" => first.min(second),
                    _ => (first - second).max(0.0),
                }
            }
            // CSG primitives; Position first
            "IFCBLOCK" => required_f64(item, 1)? * required_f64(item, 2)? * required_f64(item, 3)?,
            "IFCRECTANGULARPYRAMID" => {
                required_f64(item, 1)? * required_f64(item, 2)? * required_f64(item, 3)? / 3.0
            }
            "IFCRIGHTCIRCULARCYLINDER" => {
                let (height, radius) = (required_f64(item, 1)?, required_f64(item, 2)?);
                PI * radius * radius * height
            }
            "IFCRIGHTCIRCULARCONE" => {
                let (height, radius) = (required_f64(item, 1)?, required_f64(item, 2)?);
                PI * radius * radius * height / 3.0
            }
            "IFCSPHERE" => {
                let radius = required_f64(item, 1)?;
                4.0 / 3.0 * PI * radius.powi(3)
            }
            _ => return Err(unsupported(item)),
        };

        Ok(volume)
    }
}

impl VolumeMeasurement for StepVolumeMeasurement {
    fn set_context(&mut self, context: MeasureContext) {
        self.context = context;
    }

    fn context(&self) -> &MeasureContext {
        &self.context
    }

    fn volume_from_geometry(
        &self,
        model: &IfcModel,
        geometry: &GeometryMap,
    ) -> Result<f64, MeasureError> {
        let step = &model.step;
        let mut total = 0.0;

        for (&element, representations) in geometry {
            let mut matched = false;

            for &representation_id in representations {
                let representation = entity(step, representation_id)?;
                // ContextOfItems, RepresentationIdentifier, RepresentationType, Items
                let in_context = representation
                    .str_at(1)
                    .is_some_and(|id| id.eq_ignore_ascii_case(&self.context.representation));
                if !in_context {
                    continue;
                }
                matched = true;

                for item in representation.references_at(3) {
                    total += self.item_volume(step, item, 0)?;
                }
            }

            if !matched {
                return Err(MeasureError::NoGeometry {
                    element,
                    representation: self.context.representation.clone(),
                });
            }
        }

        let scale = self.context.length_scale.unwrap_or(model.length_unit_scale);
        Ok(total * scale.powi(3))
    }
}

/// Height gained per unit of extrusion depth along the profile normal.
fn extrusion_factor(step: &StepFile, direction: u64) -> Result<f64, MeasureError> {
    let d = point3(step, direction)?;
    let length = d.norm();
    if length == 0.0 {
        return Err(MeasureError::Malformed {
            id: direction,
            message: "extrusion direction has zero length".to_string(),
        });
    }
    Ok((d.z / length).abs())
}

/// Signed volume enclosed by a closed or open shell of planar faces.
fn shell_volume(step: &StepFile, shell: u64) -> Result<f64, MeasureError> {
    let shell = entity(step, shell)?;
    let mut volume = 0.0;

    for face_id in shell.references_at(0) {
        let face = entity(step, face_id)?;
        for bound_id in face.references_at(0) {
            // Bound, Orientation
            let bound = entity(step, bound_id)?;
            let polyloop = entity(step, required_ref(bound, 0)?)?;
            if polyloop.entity_type != "IFCPOLYLOOP" {
                return Err(unsupported(polyloop));
            }
            let points = polyloop
                .references_at(0)
                .into_iter()
                .map(|p| point3(step, p))
                .collect::<Result<Vec<_>, _>>()?;
            let contribution = signed_polygon_volume(&points);
            if bound.value(1).and_then(StepValue::as_bool) == Some(false) {
                volume -= contribution;
            } else {
                volume += contribution;
            }
        }
    }

    Ok(volume)
}

fn indexed_points(
    coordinates: &[Vector3<f64>],
    indices: &StepValue,
    owner: u64,
) -> Result<Vec<Vector3<f64>>, MeasureError> {
    indices
        .as_list()
        .unwrap_or_default()
        .iter()
        .map(|index| {
            index
                .as_f64()
                .map(|i| i as usize)
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| coordinates.get(i))
                .copied()
                .ok_or_else(|| MeasureError::Malformed {
                    id: owner,
                    message: "coordinate index out of range".to_string(),
                })
        })
        .collect()
}

// Coordinates, Normals, Closed, CoordIndex, PnIndex
fn triangulated_volume(step: &StepFile, id: u64) -> Result<f64, MeasureError> {
    let face_set = entity(step, id)?;
    let coordinates = point_list(entity(step, required_ref(face_set, 0)?)?);

    let mut volume = 0.0;
    if let Some(triangles) = face_set.value(3).and_then(StepValue::as_list) {
        for triangle in triangles {
            volume += signed_polygon_volume(&indexed_points(&coordinates, triangle, id)?);
        }
    }
    Ok(volume.abs())
}

// Coordinates, Closed, Faces, PnIndex
fn polygonal_volume(step: &StepFile, id: u64) -> Result<f64, MeasureError> {
    let face_set = entity(step, id)?;
    let coordinates = point_list(entity(step, required_ref(face_set, 0)?)?);

    let mut volume = 0.0;
    for face_id in face_set.references_at(2) {
        // CoordIndex, InnerCoordIndices (with voids only)
        let face = entity(step, face_id)?;
        let outer = face.value(0).ok_or_else(|| MeasureError::Malformed {
            id: face_id,
            message: "face without coordinate indices".to_string(),
        })?;
        volume += signed_polygon_volume(&indexed_points(&coordinates, outer, face_id)?);

        if let Some(inner) = face.value(1).and_then(StepValue::as_list) {
            for hole in inner {
                volume += signed_polygon_volume(&indexed_points(&coordinates, hole, face_id)?);
            }
        }
    }
    Ok(volume.abs())
}

fn directrix_length(step: &StepFile, curve: u64) -> Result<f64, MeasureError> {
    let curve_entity = entity(step, curve)?;
    if curve_entity.entity_type == "IFCPOLYLINE" {
        let points = curve_entity
            .references_at(0)
            .into_iter()
            .map(|p| point3(step, p))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(points.windows(2).map(|w| (w[1] - w[0]).norm()).sum());
    }

    let points = curve_points(step, curve)?;
    Ok(points.windows(2).map(|w| (w[1] - w[0]).norm()).sum())
}

/// Volume factor of a mapping target's scale.
fn mapping_scale(step: &StepFile, target: Option<u64>) -> Result<f64, MeasureError> {
    let Some(target) = target else {
        return Ok(1.0);
    };
    // Axis1, Axis2, LocalOrigin, Scale, Axis3[, Scale2, Scale3]
    let operator = entity(step, target)?;
    let scale = operator.f64_at(3).unwrap_or(1.0);
    if operator.entity_type == "IFCCARTESIANTRANSFORMATIONOPERATOR3DNONUNIFORM" {
        let scale2 = operator.f64_at(5).unwrap_or(scale);
        let scale3 = operator.f64_at(6).unwrap_or(scale);
        return Ok((scale * scale2 * scale3).abs());
    }
    Ok(scale.abs().powi(3))
}
