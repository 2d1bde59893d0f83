use std::f64::consts::PI;

use nalgebra::Vector2;

use super::{entity, point2, point_list, polygon_area, required_f64, required_ref, unsupported};
use crate::error::MeasureError;
use crate::parser::step::{StepFile, StepValue};

/// Cross-section area of a profile definition, in model units squared.
pub fn profile_area(step: &StepFile, id: u64) -> Result<f64, MeasureError> {
    let profile = entity(step, id)?;

    // Parametric profiles: ProfileType, ProfileName, Position, then dimensions
    let area = match profile.entity_type.as_str() {
        "IFCRECTANGLEPROFILEDEF" => required_f64(profile, 3)? * required_f64(profile, 4)?,
        "IFCROUNDEDRECTANGLEPROFILEDEF" => {
            let (x, y) = (required_f64(profile, 3)?, required_f64(profile, 4)?);
            let r = profile.f64_at(5).unwrap_or(0.0);
            x * y - (4.0 - PI) * r * r
        }
        "IFCRECTANGLEHOLLOWPROFILEDEF" => {
            let (x, y) = (required_f64(profile, 3)?, required_f64(profile, 4)?);
            let t = required_f64(profile, 5)?;
            x * y - (x - 2.0 * t).max(0.0) * (y - 2.0 * t).max(0.0)
        }
        "IFCCIRCLEPROFILEDEF" => {
            let r = required_f64(profile, 3)?;
            PI * r * r
        }
        "IFCCIRCLEHOLLOWPROFILEDEF" => {
            let r = required_f64(profile, 3)?;
            let inner = (r - required_f64(profile, 4)?).max(0.0);
            PI * (r * r - inner * inner)
        }
        "IFCELLIPSEPROFILEDEF" => PI * required_f64(profile, 3)? * required_f64(profile, 4)?,
        "IFCISHAPEPROFILEDEF" => {
            let width = required_f64(profile, 3)?;
            let depth = required_f64(profile, 4)?;
            let web = required_f64(profile, 5)?;
            let flange = required_f64(profile, 6)?;
            2.0 * width * flange + (depth - 2.0 * flange).max(0.0) * web
        }
        "IFCARBITRARYCLOSEDPROFILEDEF" => curve_area(step, required_ref(profile, 2)?)?,
        "IFCARBITRARYPROFILEDEFWITHVOIDS" => {
            let outer = curve_area(step, required_ref(profile, 2)?)?;
            let mut voids = 0.0;
            for inner in profile.references_at(3) {
                voids += curve_area(step, inner)?;
            }
            outer - voids
        }
        // ProfileType, ProfileName, ParentProfile, Operator, Label
        "IFCDERIVEDPROFILEDEF" => {
            let parent = profile_area(step, required_ref(profile, 2)?)?;
            let operator = entity(step, required_ref(profile, 3)?)?;
            let scale = operator.f64_at(3).unwrap_or(1.0);
            let scale2 = if operator.entity_type == "IFCCARTESIANTRANSFORMATIONOPERATOR2DNONUNIFORM" {
                operator.f64_at(4).unwrap_or(scale)
            } else {
                scale
            };
            parent * scale * scale2
        }
        _ => return Err(unsupported(profile)),
    };

    Ok(area.max(0.0))
}

fn curve_area(step: &StepFile, id: u64) -> Result<f64, MeasureError> {
    Ok(polygon_area(&curve_points(step, id)?))
}

/// Vertices of a bounded planar curve. Arc segments of indexed poly curves
/// are taken by their defining points.
pub(crate) fn curve_points(step: &StepFile, id: u64) -> Result<Vec<Vector2<f64>>, MeasureError> {
    let curve = entity(step, id)?;

    match curve.entity_type.as_str() {
        "IFCPOLYLINE" => curve
            .references_at(0)
            .into_iter()
            .map(|p| point2(step, p))
            .collect(),
        // Points, Segments, SelfIntersect
        "IFCINDEXEDPOLYCURVE" => {
            let list = entity(step, required_ref(curve, 0)?)?;
            let points: Vec<Vector2<f64>> = point_list(list)
                .into_iter()
                .map(|p| Vector2::new(p.x, p.y))
                .collect();

            let segments = curve.value(1).and_then(StepValue::as_list);
            let Some(segments) = segments else {
                return Ok(points);
            };

            let mut indices: Vec<usize> = Vec::new();
            for segment in segments {
                let StepValue::Typed(_, inner) = segment else {
                    continue;
                };
                for index in inner.as_list().unwrap_or_default() {
                    let Some(i) = index.as_f64() else { continue };
                    let i = i as usize;
                    if indices.last() != Some(&i) {
                        indices.push(i);
                    }
                }
            }

            indices
                .into_iter()
                .map(|i| {
                    i.checked_sub(1)
                        .and_then(|i| points.get(i))
                        .copied()
                        .ok_or_else(|| MeasureError::Malformed {
                            id,
                            message: format!("segment index {i} out of range"),
                        })
                })
                .collect()
        }
        _ => Err(unsupported(curve)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(data: &str) -> StepFile {
        StepFile::parse(&format!("DATA;\n{data}\nENDSEC;")).unwrap()
    }

    #[test]
    fn rectangle_and_circle_areas() {
        let file = step(
            "#1=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,4.,0.2);\n\
             #2=IFCCIRCLEPROFILEDEF(.AREA.,$,$,0.5);",
        );
        assert!((profile_area(&file, 1).unwrap() - 0.8).abs() < 1e-9);
        assert!((profile_area(&file, 2).unwrap() - PI * 0.25).abs() < 1e-9);
    }

    #[test]
    fn polyline_profile_with_void() {
        let file = step(
            "#1=IFCCARTESIANPOINT((0.,0.));\n#2=IFCCARTESIANPOINT((4.,0.));\n\
             #3=IFCCARTESIANPOINT((4.,3.));\n#4=IFCCARTESIANPOINT((0.,3.));\n\
             #5=IFCPOLYLINE((#1,#2,#3,#4,#1));\n\
             #6=IFCCARTESIANPOINTLIST2D(((1.,1.),(2.,1.),(2.,2.),(1.,2.)));\n\
             #7=IFCINDEXEDPOLYCURVE(#6,(IFCLINEINDEX((1,2,3,4,1))),$);\n\
             #8=IFCARBITRARYPROFILEDEFWITHVOIDS(.AREA.,$,#5,(#7));",
        );
        assert!((profile_area(&file, 8).unwrap() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_profile_is_unsupported() {
        let file = step("#1=IFCTSHAPEPROFILEDEF(.AREA.,$,$,1.,1.,0.1,0.1,$,$,$,$,$);");
        assert!(matches!(
            profile_area(&file, 1),
            Err(MeasureError::Unsupported { id: 1, .. })
        ));
    }
}
