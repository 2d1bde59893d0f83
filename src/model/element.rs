use serde::Serialize;

/// A building element that can carry geometry and property sets.
#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub id: u64,
    pub global_id: String,
    pub name: String,
    pub entity_type: String,
    pub category: String,
    /// `IFCPRODUCTDEFINITIONSHAPE` the element is drawn with.
    pub representation: Option<u64>,
    pub storey: Option<String>,
}
