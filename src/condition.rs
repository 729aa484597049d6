//! Condition operators and evaluation against a fact store.
//!
//! A condition pairs a fact path with one of eight operators. The operators
//! form a matrix over two axes: the polarity of the fact's value and how an
//! incomplete fact is treated. The plain `isTrue`/`isFalse` forms only look
//! at whether a value exists, so a placeholder (value present, not complete)
//! already satisfies them; the `-AndComplete` forms additionally demand
//! completeness and the `-OrIncomplete` forms pass whenever the fact is
//! still incomplete.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facts::{FactPath, FactStore};

/// How a condition interprets the fact at its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    /// Value present and truthy; placeholders count.
    #[default]
    IsTrue,
    IsTrueAndComplete,
    IsTrueOrIncomplete,
    /// Value present and falsy; placeholders count.
    IsFalse,
    IsFalseAndComplete,
    IsFalseOrIncomplete,
    IsComplete,
    IsIncomplete,
}

/// Wire form of a condition as it appears in flow declarations: either a
/// bare path string (implying `isTrue`) or an operator/path record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCondition {
    Path(String),
    Full {
        #[serde(default)]
        operator: ConditionOperator,
        condition: String,
    },
}

impl From<&str> for RawCondition {
    fn from(path: &str) -> Self {
        RawCondition::Path(path.to_owned())
    }
}

/// A resolved condition ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub operator: ConditionOperator,
    pub path: FactPath,
}

impl Condition {
    pub fn new(operator: ConditionOperator, path: impl Into<FactPath>) -> Self {
        Condition {
            operator,
            path: path.into(),
        }
    }

    /// Shorthand for the default `isTrue` operator.
    pub fn is_true(path: impl Into<FactPath>) -> Self {
        Condition::new(ConditionOperator::IsTrue, path)
    }

    /// Evaluate against `facts`, substituting `item` into an abstract path.
    pub fn evaluate(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<bool, ConditionError> {
        let path = self.path.concrete(item)?;
        let fact = facts.get(&path);
        use ConditionOperator::*;
        Ok(match self.operator {
            IsTrue => fact.has_value() && fact.is_truthy(),
            IsTrueAndComplete => fact.complete && fact.is_truthy(),
            IsTrueOrIncomplete => !fact.complete || fact.is_truthy(),
            IsFalse => fact.has_value() && !fact.is_truthy(),
            IsFalseAndComplete => fact.complete && !fact.is_truthy(),
            IsFalseOrIncomplete => !fact.complete || !fact.is_truthy(),
            IsComplete => fact.complete,
            IsIncomplete => !fact.complete,
        })
    }
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        match raw {
            RawCondition::Path(path) => Condition::is_true(path),
            RawCondition::Full {
                operator,
                condition,
            } => Condition::new(operator, condition),
        }
    }
}

impl From<&RawCondition> for Condition {
    fn from(raw: &RawCondition) -> Self {
        raw.clone().into()
    }
}

/// Conjunction over a condition list in declaration order, short-circuiting
/// on the first failure. An empty list passes.
pub fn evaluate_all<'a>(
    conditions: impl IntoIterator<Item = &'a Condition>,
    facts: &dyn FactStore,
    item: Option<&str>,
) -> Result<bool, ConditionError> {
    for condition in conditions {
        if !condition.evaluate(facts, item)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum ConditionError {
    #[error("condition reads an abstract path outside a collection context")]
    #[diagnostic(
        code(screenflow::condition::missing_collection_item),
        help("this condition's path contains `*`; evaluate it with the item id it applies to")
    )]
    MissingCollectionItem {
        #[source]
        source: crate::facts::AbstractPathError,
    },
}

impl From<crate::facts::AbstractPathError> for ConditionError {
    fn from(source: crate::facts::AbstractPathError) -> Self {
        ConditionError::MissingCollectionItem { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{ConcretePath, FactResult};
    use rustc_hash::FxHashMap;

    struct MapStore(FxHashMap<String, FactResult>);

    impl FactStore for MapStore {
        fn get(&self, path: &ConcretePath) -> FactResult {
            self.0
                .get(path.as_str())
                .cloned()
                .unwrap_or_else(FactResult::incomplete)
        }

        fn collection_items(&self, _collection: &ConcretePath) -> Vec<String> {
            vec![]
        }
    }

    fn store(entries: &[(&str, FactResult)]) -> MapStore {
        MapStore(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn is_true_accepts_placeholders() {
        let facts = store(&[("/a", FactResult::placeholder(true))]);
        let cond = Condition::is_true("/a");
        assert!(cond.evaluate(&facts, None).unwrap());
        let strict = Condition::new(ConditionOperator::IsTrueAndComplete, "/a");
        assert!(!strict.evaluate(&facts, None).unwrap());
    }

    #[test]
    fn or_incomplete_passes_on_missing_fact() {
        let facts = store(&[]);
        let cond = Condition::new(ConditionOperator::IsTrueOrIncomplete, "/missing");
        assert!(cond.evaluate(&facts, None).unwrap());
        let cond = Condition::new(ConditionOperator::IsFalseOrIncomplete, "/missing");
        assert!(cond.evaluate(&facts, None).unwrap());
    }

    #[test]
    fn is_false_requires_a_value() {
        let facts = store(&[]);
        let cond = Condition::new(ConditionOperator::IsFalse, "/missing");
        assert!(!cond.evaluate(&facts, None).unwrap());
        let facts = store(&[("/no", FactResult::complete(false))]);
        let cond = Condition::new(ConditionOperator::IsFalse, "/no");
        assert!(cond.evaluate(&facts, None).unwrap());
    }

    #[test]
    fn completeness_operators_ignore_value() {
        let facts = store(&[("/done", FactResult::complete(false))]);
        assert!(
            Condition::new(ConditionOperator::IsComplete, "/done")
                .evaluate(&facts, None)
                .unwrap()
        );
        assert!(
            Condition::new(ConditionOperator::IsIncomplete, "/other")
                .evaluate(&facts, None)
                .unwrap()
        );
    }

    #[test]
    fn abstract_path_without_item_surfaces_error() {
        let facts = store(&[]);
        let cond = Condition::is_true("/filers/*/isBlind");
        assert!(matches!(
            cond.evaluate(&facts, None),
            Err(ConditionError::MissingCollectionItem { .. })
        ));
        assert!(!cond.evaluate(&facts, Some("x")).unwrap());
    }

    #[test]
    fn evaluate_all_short_circuits_in_order() {
        let facts = store(&[("/a", FactResult::complete(false))]);
        let conds = vec![
            Condition::is_true("/a"),
            // would error if reached
            Condition::is_true("/filers/*/isBlind"),
        ];
        assert!(!evaluate_all(&conds, &facts, None).unwrap());
    }

    #[test]
    fn raw_condition_deserializes_both_forms() {
        let raw: RawCondition = serde_json::from_str("\"/isMarried\"").unwrap();
        let cond: Condition = raw.into();
        assert_eq!(cond.operator, ConditionOperator::IsTrue);

        let raw: RawCondition =
            serde_json::from_str(r#"{"operator": "isFalseAndComplete", "condition": "/x"}"#)
                .unwrap();
        let cond: Condition = raw.into();
        assert_eq!(cond.operator, ConditionOperator::IsFalseAndComplete);
        assert_eq!(cond.path.as_str(), "/x");
    }
}
