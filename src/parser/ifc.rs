use crate::error::ParseError;
use crate::model::{Element, Fragment, IfcModel};
use crate::parser::step::{StepEntity, StepFile, StepValue};
use crate::relations::{RelationIndex, RelationKind};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

// Maps element entities to the category their fragment is grouped under
const ELEMENT_CATEGORIES: &[(&str, &str)] = &[
    ("IFCWALL", "Walls"),
    ("IFCWALLSTANDARDCASE", "Walls"),
    ("IFCCURTAINWALL", "Walls"),
    ("IFCDOOR", "Doors"),
    ("IFCWINDOW", "Windows"),
    ("IFCSLAB", "Slabs"),
    ("IFCROOF", "Roofs"),
    ("IFCCOLUMN", "Columns"),
    ("IFCBEAM", "Beams"),
    ("IFCMEMBER", "Members"),
    ("IFCPLATE", "Plates"),
    ("IFCSTAIR", "Stairs"),
    ("IFCSTAIRFLIGHT", "Stairs"),
    ("IFCRAMP", "Ramps"),
    ("IFCRAILING", "Railings"),
    ("IFCCOVERING", "Coverings"),
    ("IFCFOOTING", "Foundations"),
    ("IFCPILE", "Foundations"),
    ("IFCFURNISHINGELEMENT", "Furniture"),
    ("IFCFURNITURE", "Furniture"),
    ("IFCFLOWTERMINAL", "Fixtures"),
    ("IFCSANITARYTERMINAL", "Fixtures"),
    ("IFCBUILDINGELEMENTPROXY", "Proxies"),
    ("IFCSPACE", "Spaces"),
];

// Spatial structure carries representations too, but is not measured
const SPATIAL_ENTITIES: &[&str] = &["IFCPROJECT", "IFCSITE", "IFCBUILDING", "IFCBUILDINGSTOREY"];

/// Conversion units may be defined in terms of other conversion units.
const MAX_UNIT_CHAIN: usize = 8;

const SI_PREFIXES: &[(&str, f64)] = &[
    ("EXA", 1e18),
    ("PETA", 1e15),
    ("TERA", 1e12),
    ("GIGA", 1e9),
    ("MEGA", 1e6),
    ("KILO", 1e3),
    ("HECTO", 1e2),
    ("DECA", 1e1),
    ("DECI", 1e-1),
    ("CENTI", 1e-2),
    ("MILLI", 1e-3),
    ("MICRO", 1e-6),
    ("NANO", 1e-9),
    ("PICO", 1e-12),
    ("FEMTO", 1e-15),
    ("ATTO", 1e-18),
];

/// Loads an IFC file into a model ready for measurement and annotation.
///
/// The model's display name is the file name; its raw bytes are kept so the
/// model can be written back with [`save_to_ifc`](crate::properties::PropertyManager::save_to_ifc).
///
/// # Errors
///
/// Returns [`ParseError::FileRead`] if the file cannot be read.
/// Returns [`ParseError::InvalidStep`] if the STEP format is malformed.
///
/// # Example
///
/// ```no_run
/// use ifc_quantities::parser::load_ifc_file;
///
/// let model = load_ifc_file("model.ifc")?;
/// for fragment in &model.fragments {
///     println!("{}: {} elements", fragment.category, fragment.element_ids.len());
/// }
/// # Ok::<(), ifc_quantities::error::ParseError>(())
/// ```
pub fn load_ifc_file<P: AsRef<Path>>(path: P) -> Result<IfcModel, ParseError> {
    let bytes = std::fs::read(&path).map_err(|source| ParseError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;

    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    model_from_bytes(&name, bytes)
}

/// Builds a model from raw IFC content. An empty `name` falls back to the
/// project name.
pub fn model_from_bytes(name: &str, bytes: Vec<u8>) -> Result<IfcModel, ParseError> {
    let step_file = StepFile::parse_bytes(&bytes)?;

    let project_name = extract_project_name(&step_file);
    let display_name = if name.is_empty() {
        project_name.clone()
    } else {
        name.to_string()
    };

    let mut model = IfcModel::empty(display_name);
    model.project_name = project_name;
    model.schema = step_file.schema_or_default().to_string();
    model.length_unit_scale = extract_length_unit_scale(&step_file);
    model.relations = RelationIndex::build(&step_file);
    model.elements = extract_elements(&step_file, &model.relations);
    model.fragments = build_fragments(&model.id, &model.elements);
    model.step = step_file;
    model.data = bytes;

    tracing::debug!(
        model = %model.id,
        name = %model.name,
        elements = model.elements.len(),
        fragments = model.fragments.len(),
        "model loaded"
    );

    Ok(model)
}

fn extract_project_name(step_file: &StepFile) -> String {
    step_file
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|e| e.str_at(2))
        .map_or_else(|| "Unknown Project".to_string(), str::to_string)
}

/// Metres per length unit declared by the model. Defaults to 1.0.
fn extract_length_unit_scale(step_file: &StepFile) -> f64 {
    // Prefer the project's unit assignment, then any length unit in the file
    let assigned: Vec<u64> = step_file
        .get_entities_by_type("IFCPROJECT")
        .first()
        .and_then(|p| p.reference_at(8))
        .and_then(|ua| step_file.get_entity(ua))
        .map(|ua| ua.references_at(0))
        .unwrap_or_default();

    let candidates = assigned
        .iter()
        .filter_map(|id| step_file.get_entity(*id))
        .chain(step_file.entities.values());

    for unit in candidates {
        if let Some(scale) = length_unit_scale(step_file, unit, 0) {
            return scale;
        }
    }

    1.0
}

fn length_unit_scale(step_file: &StepFile, unit: &StepEntity, depth: usize) -> Option<f64> {
    if depth > MAX_UNIT_CHAIN {
        tracing::warn!(unit = unit.id, "conversion unit chain too deep, ignoring");
        return None;
    }

    match unit.entity_type.as_str() {
        // IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.)
        "IFCSIUNIT" => {
            if !is_length_unit(unit.value(1)) {
                return None;
            }
            match unit.value(2) {
                Some(StepValue::Enum(prefix)) => SI_PREFIXES
                    .iter()
                    .find(|(name, _)| name == prefix)
                    .map(|(_, factor)| *factor),
                _ => Some(1.0),
            }
        }
        // IFCCONVERSIONBASEDUNIT(#dims,.LENGTHUNIT.,'FOOT',#measure)
        "IFCCONVERSIONBASEDUNIT" => {
            if !is_length_unit(unit.value(1)) {
                return None;
            }
            let measure = step_file.get_entity(unit.reference_at(3)?)?;
            let factor = measure.f64_at(0)?;
            let base = match measure.reference_at(1).and_then(|id| step_file.get_entity(id)) {
                // Chained conversions must resolve; a cycle drops the unit
                Some(base) if base.entity_type == "IFCCONVERSIONBASEDUNIT" => {
                    length_unit_scale(step_file, base, depth + 1)?
                }
                Some(base) => length_unit_scale(step_file, base, depth + 1).unwrap_or(1.0),
                None => 1.0,
            };
            Some(factor * base)
        }
        _ => None,
    }
}

fn is_length_unit(value: Option<&StepValue>) -> bool {
    matches!(value, Some(StepValue::Enum(kind)) if kind == "LENGTHUNIT")
}

fn category_for(entity_type: &str) -> Option<&'static str> {
    ELEMENT_CATEGORIES
        .iter()
        .find(|(e, _)| *e == entity_type)
        .map(|(_, name)| *name)
}

fn extract_elements(step_file: &StepFile, relations: &RelationIndex) -> BTreeMap<u64, Element> {
    let storey_names: HashMap<u64, String> = step_file
        .get_entities_by_type("IFCBUILDINGSTOREY")
        .iter()
        .map(|s| {
            let name = s
                .str_at(2)
                .map_or_else(|| format!("Storey #{}", s.id), str::to_string);
            (s.id, name)
        })
        .collect();

    let mut elements = BTreeMap::new();

    for entity in step_file.entities.values() {
        if SPATIAL_ENTITIES.contains(&entity.entity_type.as_str()) {
            continue;
        }

        // Index 6 = Representation on every IfcProduct
        let representation = entity.reference_at(6).filter(|id| {
            step_file
                .get_entity(*id)
                .is_some_and(|r| r.entity_type == "IFCPRODUCTDEFINITIONSHAPE")
        });

        let category = match (category_for(&entity.entity_type), representation) {
            (Some(category), _) => category,
            (None, Some(_)) => "Other",
            (None, None) => continue,
        };

        let storey = relations
            .get(entity.id, RelationKind::ContainedInStructure)
            .iter()
            .find_map(|id| storey_names.get(id).cloned());

        elements.insert(
            entity.id,
            Element {
                id: entity.id,
                // GlobalId is always the first attribute (index 0)
                global_id: entity.str_at(0).unwrap_or_default().to_string(),
                name: entity
                    .str_at(2)
                    .map_or_else(|| format!("{} #{}", entity.entity_type, entity.id), str::to_string),
                entity_type: entity.entity_type.clone(),
                category: category.to_string(),
                representation,
                storey,
            },
        );
    }

    elements
}

fn build_fragments(model_id: &str, elements: &BTreeMap<u64, Element>) -> Vec<Fragment> {
    let mut by_category: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for element in elements.values() {
        by_category
            .entry(element.category.as_str())
            .or_default()
            .push(element.id);
    }

    let mut fragments: Vec<Fragment> = by_category
        .into_iter()
        .map(|(category, element_ids)| Fragment {
            id: Fragment::fragment_id(model_id, category),
            model_id: model_id.to_string(),
            category: category.to_string(),
            element_ids,
        })
        .collect();

    // "Other" last, the rest alphabetically
    fragments.sort_by(|a, b| match (a.category == "Other", b.category == "Other") {
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        _ => a.category.cmp(&b.category),
    });

    fragments
}

/// Human-readable rendering of a property value.
pub(crate) fn format_step_value(value: &StepValue) -> String {
    match value {
        StepValue::String(s) => s.clone(),
        StepValue::Real(f) => format!("{f:.3}"),
        StepValue::Integer(i) => i.to_string(),
        StepValue::Boolean(b) => if *b { "Yes" } else { "No" }.to_string(),
        StepValue::Enum(e) => e.clone(),
        StepValue::Reference(id) => format!("#{id}"),
        StepValue::List(list) => list
            .iter()
            .map(format_step_value)
            .collect::<Vec<_>>()
            .join(", "),
        StepValue::Typed(_, inner) => format_step_value(inner),
        StepValue::Null => "-".to_string(),
        StepValue::Derived => "*".to_string(),
    }
}
