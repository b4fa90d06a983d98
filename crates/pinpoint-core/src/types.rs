//! Common types shared between the cache, tracker and output modules.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Element Identity
// ============================================================================

/// Opaque identity of a live element, as handed out by the host's element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el_{}", self.0)
    }
}

// ============================================================================
// Source Matches
// ============================================================================

/// Whether a match is the type's declaration or a place it is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Definition,
    Instantiation,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Definition => write!(f, "definition"),
            MatchKind::Instantiation => write!(f, "instantiation"),
        }
    }
}

/// A resolved source location for a type name.
///
/// `confidence` is a ranking signal for comparing matches produced by one
/// query. It is not a probability and is not comparable across queries:
/// 1.0 unambiguous, 0.8 chain-disambiguated, 0.5 fallback-first, and
/// cross-file lookups add unbounded heuristic boosts on top of a base value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMatch {
    /// Cache path of the file (normalized, no leading `/`).
    pub path: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, chars).
    pub column: u32,
    /// Source text of the match (boundary or one-line snippet).
    pub code: String,
    pub confidence: f64,
    pub kind: MatchKind,
}

impl SourceMatch {
    pub fn new(
        path: impl Into<String>,
        line: u32,
        column: u32,
        code: impl Into<String>,
        confidence: f64,
        kind: MatchKind,
    ) -> Self {
        SourceMatch {
            path: path.into(),
            line,
            column,
            code: code.into(),
            confidence,
            kind,
        }
    }

    /// "path:line:column" form, as shown to users.
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.path, self.line, self.column)
    }
}
