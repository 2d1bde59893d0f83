use super::{new_global_id, PropertyManager};
use crate::error::PropertyError;
use crate::model::IfcModel;
use crate::parser::step::{StepFile, StepValue};
use crate::relations::RelationKind;

const PROPERTY_SET: &str = "IFCPROPERTYSET";
const DEFINES_BY_PROPERTIES: &str = "IFCRELDEFINESBYPROPERTIES";

// IFCPROPERTYSET(GlobalId, OwnerHistory, Name, Description, HasProperties)
const PSET_NAME: usize = 2;
const PSET_PROPERTIES: usize = 4;

// IFCRELDEFINESBYPROPERTIES(..., RelatedObjects, RelatingPropertyDefinition)
const REL_OBJECTS: usize = 4;
const REL_DEFINITION: usize = 5;

/// Property manager writing straight into a model's STEP entities.
#[derive(Debug, Default, Clone, Copy)]
pub struct IfcPropertiesManager;

impl IfcPropertiesManager {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// IFC2x3 requires an owner history on rooted entities; reuse the model's.
fn owner_history(model: &IfcModel) -> StepValue {
    model
        .step
        .get_entities_by_type("IFCOWNERHISTORY")
        .first()
        .map_or(StepValue::Null, |e| StepValue::Reference(e.id))
}

fn references(ids: &[u64]) -> StepValue {
    StepValue::List(ids.iter().map(|id| StepValue::Reference(*id)).collect())
}

fn expect_pset(model: &IfcModel, pset: u64) -> Result<(), PropertyError> {
    let entity = model
        .entity(pset)
        .ok_or(PropertyError::MissingEntity { id: pset })?;
    if entity.entity_type != PROPERTY_SET {
        return Err(PropertyError::NotAPropertySet {
            id: pset,
            entity_type: entity.entity_type.clone(),
        });
    }
    Ok(())
}

/// Defining relations of a property set with their related objects.
fn defining_relations(model: &IfcModel, pset: u64) -> Vec<(u64, Vec<u64>)> {
    model
        .step
        .get_entities_by_type(DEFINES_BY_PROPERTIES)
        .into_iter()
        .filter(|rel| rel.reference_at(REL_DEFINITION) == Some(pset))
        .map(|rel| (rel.id, rel.references_at(REL_OBJECTS)))
        .collect()
}

fn set_value(model: &mut IfcModel, id: u64, index: usize, value: StepValue) {
    if let Some(entity) = model.entity_mut(id) {
        if entity.values.len() <= index {
            entity.values.resize(index + 1, StepValue::Null);
        }
        entity.values[index] = value;
    }
}

impl PropertyManager for IfcPropertiesManager {
    fn ensure_pset(
        &mut self,
        model: &mut IfcModel,
        element: u64,
        name: &str,
    ) -> Result<u64, PropertyError> {
        let existing = model
            .relations
            .get(element, RelationKind::IsDefinedBy)
            .iter()
            .copied()
            .find(|id| {
                model
                    .entity(*id)
                    .is_some_and(|e| e.entity_type == PROPERTY_SET && e.str_at(PSET_NAME) == Some(name))
            });
        let mut inherited = Vec::new();
        if let Some(id) = existing {
            let relations = defining_relations(model, id);
            let shared = relations
                .iter()
                .any(|(_, objects)| objects.iter().any(|object| *object != element));
            if !shared {
                return Ok(id);
            }

            // Other elements keep the shared set; this one gets its own copy
            for (rel, objects) in relations {
                if objects.contains(&element) {
                    let remaining: Vec<u64> =
                        objects.into_iter().filter(|object| *object != element).collect();
                    set_value(model, rel, REL_OBJECTS, references(&remaining));
                }
            }
            model
                .relations
                .entity_relations_mut(element, RelationKind::IsDefinedBy)
                .retain(|pset| *pset != id);
            inherited = model
                .entity(id)
                .map(|e| e.references_at(PSET_PROPERTIES))
                .unwrap_or_default();
            tracing::debug!(model = %model.id, element, shared = id, "detached from shared property set");
        }

        let owner = owner_history(model);
        let id = model.add_entity(
            PROPERTY_SET,
            vec![
                StepValue::String(new_global_id()),
                owner,
                StepValue::String(name.to_string()),
                StepValue::Null,
                references(&inherited),
            ],
        );
        tracing::debug!(model = %model.id, pset = id, name, "property set created");
        Ok(id)
    }

    fn new_single_numeric_property(
        &mut self,
        model: &mut IfcModel,
        value_type: &str,
        name: &str,
        value: f64,
    ) -> Result<u64, PropertyError> {
        // Name, Description, NominalValue, Unit
        Ok(model.add_entity(
            "IFCPROPERTYSINGLEVALUE",
            vec![
                StepValue::String(name.to_string()),
                StepValue::Null,
                StepValue::Typed(value_type.to_ascii_uppercase(), Box::new(StepValue::Real(value))),
                StepValue::Null,
            ],
        ))
    }

    fn add_prop_to_pset(
        &mut self,
        model: &mut IfcModel,
        pset: u64,
        property: u64,
    ) -> Result<(), PropertyError> {
        expect_pset(model, pset)?;
        let property_name = model
            .entity(property)
            .ok_or(PropertyError::MissingEntity { id: property })?
            .str_at(0)
            .map(str::to_string);

        let current = model
            .entity(pset)
            .map(|e| e.references_at(PSET_PROPERTIES))
            .unwrap_or_default();

        let replaced: Vec<u64> = current
            .iter()
            .copied()
            .filter(|id| *id != property)
            .filter(|id| {
                property_name.is_some()
                    && model.entity(*id).and_then(|e| e.str_at(0)) == property_name.as_deref()
            })
            .collect();

        if current.contains(&property) && replaced.is_empty() {
            return Ok(());
        }

        let mut updated: Vec<u64> = current
            .into_iter()
            .filter(|id| *id != property && !replaced.contains(id))
            .collect();
        updated.push(property);
        set_value(model, pset, PSET_PROPERTIES, references(&updated));

        for old in replaced {
            let still_used = model
                .step
                .get_entities_by_type(PROPERTY_SET)
                .iter()
                .any(|set| set.references_at(PSET_PROPERTIES).contains(&old));
            if !still_used {
                model.remove_entity(old);
            }
        }

        Ok(())
    }

    fn add_element_to_pset(
        &mut self,
        model: &mut IfcModel,
        pset: u64,
        element: u64,
    ) -> Result<(), PropertyError> {
        expect_pset(model, pset)?;
        if model.entity(element).is_none() {
            return Err(PropertyError::MissingEntity { id: element });
        }

        let relation = model
            .step
            .get_entities_by_type(DEFINES_BY_PROPERTIES)
            .into_iter()
            .find(|rel| rel.reference_at(REL_DEFINITION) == Some(pset))
            .map(|rel| (rel.id, rel.references_at(REL_OBJECTS)));

        match relation {
            Some((_, objects)) if objects.contains(&element) => {}
            Some((rel, mut objects)) => {
                objects.push(element);
                set_value(model, rel, REL_OBJECTS, references(&objects));
            }
            None => {
                let owner = owner_history(model);
                model.add_entity(
                    DEFINES_BY_PROPERTIES,
                    vec![
                        StepValue::String(new_global_id()),
                        owner,
                        StepValue::Null,
                        StepValue::Null,
                        references(&[element]),
                        StepValue::Reference(pset),
                    ],
                );
            }
        }

        Ok(())
    }

    fn save_to_ifc(&self, model: &IfcModel, raw: &[u8]) -> Result<Vec<u8>, PropertyError> {
        let mut base = StepFile::parse_bytes(raw)?;

        for id in model.removed_ids() {
            base.entities.remove(&id);
        }
        for entity in model.dirty_entities() {
            base.insert(entity.clone());
        }
        if base.schema.is_empty() {
            base.schema.clone_from(&model.schema);
        }

        Ok(base.to_step_string().into_bytes())
    }
}
