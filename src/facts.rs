//! Fact paths and the fact store abstraction.
//!
//! Every condition, collection context, and completeness check in a flow
//! ultimately reads a *fact*: a value stored under a slash-delimited path
//! such as `/filers/*/isBlind`. A `*` segment is a wildcard standing in for
//! a collection-item id; a path containing one is *abstract* and must be
//! made concrete before it can be looked up.
//!
//! The engine never owns fact data. Callers implement [`FactStore`] over
//! whatever backs their answers and hand it to the evaluator, router, and
//! progress helpers.

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Wildcard segment used in abstract fact paths.
pub const WILDCARD: &str = "*";

/// A fact path as written in flow declarations, possibly abstract.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactPath(String);

impl FactPath {
    pub fn new(path: impl Into<String>) -> Self {
        FactPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path contains a wildcard segment.
    pub fn is_abstract(&self) -> bool {
        self.0.contains(WILDCARD)
    }

    /// Substitute the wildcard segment with a collection-item id.
    ///
    /// Abstract paths require an id; concrete paths pass through untouched.
    pub fn concrete(&self, item: Option<&str>) -> Result<ConcretePath, AbstractPathError> {
        if !self.is_abstract() {
            return Ok(ConcretePath(self.0.clone()));
        }
        match item {
            Some(id) => Ok(ConcretePath(self.0.replacen(WILDCARD, id, 1))),
            None => Err(AbstractPathError {
                path: self.0.clone(),
            }),
        }
    }

    /// Like [`concrete`](Self::concrete), but an unresolvable wildcard is
    /// `None` instead of an error. Used where the engine walks past a
    /// collection scope it does not own, such as an inner loop encountered
    /// without its enclosing item.
    pub fn try_concrete(&self, item: Option<&str>) -> Option<ConcretePath> {
        self.concrete(item).ok()
    }
}

impl From<&str> for FactPath {
    fn from(path: &str) -> Self {
        FactPath::new(path)
    }
}

impl From<String> for FactPath {
    fn from(path: String) -> Self {
        FactPath::new(path)
    }
}

impl fmt::Display for FactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactPath({})", self.0)
    }
}

/// A fully resolved fact path with no remaining wildcard segments.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcretePath(String);

impl ConcretePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConcretePath({})", self.0)
    }
}

/// Raised when an abstract path is resolved without a collection-item id.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("abstract fact path {path} resolved without a collection-item id")]
#[diagnostic(
    code(screenflow::facts::abstract_path),
    help("paths containing `*` can only be read in a collection context; supply the item id")
)]
pub struct AbstractPathError {
    pub path: String,
}

/// Outcome of a single fact lookup.
///
/// `complete` and `value` vary independently: a placeholder fact carries a
/// value while remaining incomplete, and a fact the user has not touched has
/// neither.
#[derive(Debug, Clone, PartialEq)]
pub struct FactResult {
    pub complete: bool,
    pub value: Option<Value>,
}

impl FactResult {
    /// A fact the user has fully answered.
    pub fn complete(value: impl Into<Value>) -> Self {
        FactResult {
            complete: true,
            value: Some(value.into()),
        }
    }

    /// A provisional value that does not yet count as an answer.
    pub fn placeholder(value: impl Into<Value>) -> Self {
        FactResult {
            complete: false,
            value: Some(value.into()),
        }
    }

    /// No value at all.
    pub fn incomplete() -> Self {
        FactResult {
            complete: false,
            value: None,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Loose truthiness of the stored value; an absent value is falsy.
    pub fn is_truthy(&self) -> bool {
        match &self.value {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

/// Read access to fact data.
///
/// Implementations decide what "complete" means for their backing store; the
/// engine only interprets the [`FactResult`] it gets back.
pub trait FactStore {
    /// Look up a single fact.
    fn get(&self, path: &ConcretePath) -> FactResult;

    /// Ordered item ids of a collection fact, empty when the collection is
    /// missing or incomplete.
    fn collection_items(&self, collection: &ConcretePath) -> Vec<String>;
}
