//! Inverse relation lists per element, built from the objectified
//! relationship entities of a model.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::parser::step::StepFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RelationKind {
    /// Property sets describing the element.
    IsDefinedBy,
    /// The element's type object.
    IsTypedBy,
    /// Spatial structure containing the element.
    ContainedInStructure,
}

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [
        RelationKind::IsDefinedBy,
        RelationKind::IsTypedBy,
        RelationKind::ContainedInStructure,
    ];

    /// Relationship entity the kind is read from. All three carry the
    /// related objects at index 4 and the relating object at index 5.
    #[must_use]
    pub fn relation_entity(self) -> &'static str {
        match self {
            RelationKind::IsDefinedBy => "IFCRELDEFINESBYPROPERTIES",
            RelationKind::IsTypedBy => "IFCRELDEFINESBYTYPE",
            RelationKind::ContainedInStructure => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::IsDefinedBy => "IsDefinedBy",
            RelationKind::IsTypedBy => "IsTypedBy",
            RelationKind::ContainedInStructure => "ContainedInStructure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default, Clone)]
pub struct RelationIndex {
    relations: HashMap<(u64, RelationKind), Vec<u64>>,
}

impl RelationIndex {
    #[must_use]
    pub fn build(step_file: &StepFile) -> Self {
        let mut index = Self::default();

        for kind in RelationKind::ALL {
            for rel in step_file.get_entities_by_type(kind.relation_entity()) {
                let Some(relating) = rel.reference_at(5) else {
                    continue;
                };
                for element in rel.references_at(4) {
                    index.entity_relations_mut(element, kind).push(relating);
                }
            }
        }

        index
    }

    /// Related record ids in insertion order; empty when none are known.
    #[must_use]
    pub fn get(&self, element: u64, kind: RelationKind) -> &[u64] {
        self.relations
            .get(&(element, kind))
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn get_entity_relations(&self, element: u64, kind: RelationKind) -> Option<&Vec<u64>> {
        self.relations.get(&(element, kind))
    }

    /// The element's relation list, created empty on first access.
    pub fn entity_relations_mut(&mut self, element: u64, kind: RelationKind) -> &mut Vec<u64> {
        self.relations.entry((element, kind)).or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relations_are_indexed_per_element() {
        let step = StepFile::parse(
            "DATA;\n\
             #10=IFCRELDEFINESBYPROPERTIES('a',$,$,$,(#1,#2),#20);\n\
             #11=IFCRELDEFINESBYPROPERTIES('b',$,$,$,(#1),#21);\n\
             #12=IFCRELCONTAINEDINSPATIALSTRUCTURE('c',$,$,$,(#1),#30);\n\
             ENDSEC;",
        )
        .unwrap();
        let index = RelationIndex::build(&step);

        assert_eq!(index.get(1, RelationKind::IsDefinedBy), &[20, 21]);
        assert_eq!(index.get(2, RelationKind::IsDefinedBy), &[20]);
        assert_eq!(index.get(1, RelationKind::ContainedInStructure), &[30]);
        assert!(index.get(2, RelationKind::IsTypedBy).is_empty());
    }

    #[test]
    fn missing_lists_are_created_on_demand() {
        let mut index = RelationIndex::default();
        assert!(index.get_entity_relations(7, RelationKind::IsDefinedBy).is_none());

        index.entity_relations_mut(7, RelationKind::IsDefinedBy).push(99);
        assert_eq!(index.get(7, RelationKind::IsDefinedBy), &[99]);
    }
}
