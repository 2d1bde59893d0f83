use serde::Serialize;

/// Elements of one category inside a model. A fragment id has the form
/// `{model_id}#{category}`; its owning group is the model.
#[derive(Debug, Clone, Serialize)]
pub struct Fragment {
    pub id: String,
    pub model_id: String,
    pub category: String,
    pub element_ids: Vec<u64>,
}

impl Fragment {
    #[must_use]
    pub fn fragment_id(model_id: &str, category: &str) -> String {
        format!("{model_id}#{category}")
    }
}
