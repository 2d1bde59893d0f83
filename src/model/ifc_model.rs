use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use uuid::Uuid;

use super::{Element, Fragment};
use crate::geometry::GeometryMap;
use crate::parser::ifc::format_step_value;
use crate::parser::step::{StepEntity, StepFile, StepValue};
use crate::relations::{RelationIndex, RelationKind};

/// A loaded IFC model: the entity store plus the indexes built over it.
#[derive(Debug, Clone)]
pub struct IfcModel {
    /// Owning group identifier, unique per loaded instance.
    pub id: String,
    pub name: String,
    pub project_name: String,
    pub schema: String,
    /// Raw bytes the model was loaded from.
    pub data: Vec<u8>,
    pub step: StepFile,
    pub elements: BTreeMap<u64, Element>,
    pub fragments: Vec<Fragment>,
    pub relations: RelationIndex,
    /// Metres per model length unit.
    pub length_unit_scale: f64,
    dirty: BTreeSet<u64>,
    removed: BTreeSet<u64>,
}

/// A property set as seen from one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySetView {
    pub id: u64,
    pub name: String,
    pub properties: Vec<(String, String)>,
}

impl IfcModel {
    /// A minimal container with no entities.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            project_name: String::new(),
            schema: String::new(),
            data: Vec::new(),
            step: StepFile::default(),
            elements: BTreeMap::new(),
            fragments: Vec::new(),
            relations: RelationIndex::default(),
            length_unit_scale: 1.0,
            dirty: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn entity(&self, id: u64) -> Option<&StepEntity> {
        self.step.get_entity(id)
    }

    /// Mutable access that records the entity as changed since load.
    pub fn entity_mut(&mut self, id: u64) -> Option<&mut StepEntity> {
        let entity = self.step.get_entity_mut(id)?;
        entity.mark_modified();
        self.dirty.insert(id);
        Some(entity)
    }

    /// Appends a new entity with the next free id.
    pub fn add_entity(&mut self, entity_type: &str, values: Vec<StepValue>) -> u64 {
        let id = self.step.max_id() + 1;
        self.step.insert(StepEntity::new(id, entity_type, values));
        self.removed.remove(&id);
        self.dirty.insert(id);
        id
    }

    /// Deletes an entity; the deletion is carried into serialized output.
    pub fn remove_entity(&mut self, id: u64) -> Option<StepEntity> {
        let entity = self.step.entities.remove(&id)?;
        self.dirty.remove(&id);
        self.removed.insert(id);
        Some(entity)
    }

    pub fn removed_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.removed.iter().copied()
    }

    /// Entities created or changed since the model was loaded.
    pub fn dirty_entities(&self) -> impl Iterator<Item = &StepEntity> {
        self.dirty.iter().filter_map(|id| self.step.get_entity(*id))
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        !self.dirty.is_empty() || !self.removed.is_empty()
    }

    #[must_use]
    pub fn fragment(&self, fragment_id: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id == fragment_id)
    }

    /// Shape representations of the given elements, keyed by element id.
    /// Elements without a representation map to an empty list.
    #[must_use]
    pub fn geometry_map(&self, element_ids: &[u64]) -> GeometryMap {
        element_ids
            .iter()
            .map(|&id| {
                let representations = self
                    .elements
                    .get(&id)
                    .and_then(|e| e.representation)
                    .or_else(|| self.entity(id).and_then(|e| e.reference_at(6)))
                    .and_then(|shape| self.entity(shape))
                    .map(|shape| shape.references_at(2))
                    .unwrap_or_default();
                (id, representations)
            })
            .collect()
    }

    /// Property sets reachable through the element's `IsDefinedBy` list.
    #[must_use]
    pub fn property_sets(&self, element: u64) -> Vec<PropertySetView> {
        self.relations
            .get(element, RelationKind::IsDefinedBy)
            .iter()
            .filter_map(|&pset_id| {
                let pset = self.entity(pset_id)?;
                if pset.entity_type != "IFCPROPERTYSET" {
                    return None;
                }
                let properties = pset
                    .references_at(4)
                    .into_iter()
                    .filter_map(|prop_id| self.entity(prop_id))
                    .filter(|prop| prop.entity_type == "IFCPROPERTYSINGLEVALUE")
                    .filter_map(|prop| {
                        let name = prop.str_at(0)?.to_string();
                        let value = prop.value(2).map(format_step_value).unwrap_or_default();
                        Some((name, value))
                    })
                    .collect();
                Some(PropertySetView {
                    id: pset_id,
                    name: pset.str_at(2).unwrap_or_default().to_string(),
                    properties,
                })
            })
            .collect()
    }

    /// Latest numeric value of `property` in the element's `pset` sets.
    #[must_use]
    pub fn numeric_property(&self, element: u64, pset: &str, property: &str) -> Option<f64> {
        let mut latest: Option<(u64, f64)> = None;

        for &pset_id in self.relations.get(element, RelationKind::IsDefinedBy) {
            let Some(entity) = self.entity(pset_id) else {
                continue;
            };
            if entity.entity_type != "IFCPROPERTYSET" || entity.str_at(2) != Some(pset) {
                continue;
            }
            for prop_id in entity.references_at(4) {
                let Some(prop) = self.entity(prop_id) else {
                    continue;
                };
                if prop.str_at(0) != Some(property) {
                    continue;
                }
                if let Some(value) = prop.f64_at(2) {
                    if latest.is_none_or(|(id, _)| prop_id > id) {
                        latest = Some((prop_id, value));
                    }
                }
            }
        }

        latest.map(|(_, value)| value)
    }
}
