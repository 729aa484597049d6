#![allow(dead_code)]
//! In-memory fact store for tests.

use rustc_hash::FxHashMap;
use screenflow::facts::{ConcretePath, FactResult, FactStore};
use serde_json::Value;

/// Map-backed fact store with explicit completeness per fact and ordered
/// collection membership.
#[derive(Debug, Clone, Default)]
pub struct FakeFacts {
    facts: FxHashMap<String, FactResult>,
    collections: FxHashMap<String, Vec<String>>,
}

impl FakeFacts {
    pub fn new() -> Self {
        FakeFacts::default()
    }

    /// A complete fact.
    #[must_use]
    pub fn with_fact(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.facts
            .insert(path.to_owned(), FactResult::complete(value));
        self
    }

    /// A fact with a provisional value that is not yet complete.
    #[must_use]
    pub fn with_placeholder(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.facts
            .insert(path.to_owned(), FactResult::placeholder(value));
        self
    }

    /// An ordered collection of item ids.
    #[must_use]
    pub fn with_collection(mut self, path: &str, items: &[&str]) -> Self {
        self.collections.insert(
            path.to_owned(),
            items.iter().map(|item| (*item).to_owned()).collect(),
        );
        self
    }

    pub fn set(&mut self, path: &str, result: FactResult) {
        self.facts.insert(path.to_owned(), result);
    }
}

impl FactStore for FakeFacts {
    fn get(&self, path: &ConcretePath) -> FactResult {
        self.facts
            .get(path.as_str())
            .cloned()
            .unwrap_or_else(FactResult::incomplete)
    }

    fn collection_items(&self, collection: &ConcretePath) -> Vec<String> {
        self.collections
            .get(collection.as_str())
            .cloned()
            .unwrap_or_default()
    }
}
