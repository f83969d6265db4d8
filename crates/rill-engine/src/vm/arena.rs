//! Allocation arena
//!
//! Heap values created while executing are recorded here so they stay
//! alive until the embedder restores an earlier watermark. Native code
//! brackets work that may allocate with [`Arena::save`] / [`Arena::restore`].

use super::value::Value;

/// Stack of recently allocated heap values
#[derive(Debug, Default)]
pub struct Arena {
    values: Vec<Value>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly allocated value; immediates are ignored
    pub fn push(&mut self, value: &Value) {
        if value.is_heap() {
            self.values.push(value.clone());
        }
    }

    /// Current watermark
    pub fn save(&self) -> usize {
        self.values.len()
    }

    /// Release everything recorded after `index`
    pub fn restore(&mut self, index: usize) {
        self.values.truncate(index);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
