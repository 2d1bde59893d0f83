use std::collections::{HashMap, HashSet, VecDeque};

/// Element ids already annotated, per owning model id.
///
/// Unbounded unless [`with_max_models`](Self::with_max_models) is set; then
/// the model tracked longest is evicted first and its elements are
/// recomputed the next time they are selected.
#[derive(Debug, Default, Clone)]
pub struct ProcessedRegistry {
    models: HashMap<String, HashSet<u64>>,
    order: VecDeque<String>,
    max_models: Option<usize>,
}

impl ProcessedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_models(max_models: usize) -> Self {
        Self {
            max_models: Some(max_models.max(1)),
            ..Self::default()
        }
    }

    /// Creates the empty set for `model` if it has none yet.
    pub fn ensure_model(&mut self, model: &str) -> &mut HashSet<u64> {
        if !self.models.contains_key(model) {
            self.order.push_back(model.to_string());
            self.models.insert(model.to_string(), HashSet::new());
            self.evict_overflow(model);
        }
        self.models.entry(model.to_string()).or_default()
    }

    fn evict_overflow(&mut self, keep: &str) {
        let Some(max) = self.max_models else {
            return;
        };
        while self.models.len() > max {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if oldest == keep {
                self.order.push_back(oldest);
                continue;
            }
            self.models.remove(&oldest);
            tracing::debug!(model = %oldest, "evicted processed elements");
        }
    }

    #[must_use]
    pub fn contains(&self, model: &str, element: u64) -> bool {
        self.models
            .get(model)
            .is_some_and(|elements| elements.contains(&element))
    }

    /// Records `element` as processed; returns `false` if it already was.
    pub fn mark(&mut self, model: &str, element: u64) -> bool {
        self.ensure_model(model).insert(element)
    }

    #[must_use]
    pub fn processed(&self, model: &str) -> Option<&HashSet<u64>> {
        self.models.get(model)
    }

    pub fn forget_model(&mut self, model: &str) -> Option<HashSet<u64>> {
        self.order.retain(|m| m != model);
        self.models.remove(model)
    }

    pub fn clear(&mut self) {
        self.models.clear();
        self.order.clear();
    }

    /// Number of models tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.models.values().map(HashSet::len).sum()
    }
}
