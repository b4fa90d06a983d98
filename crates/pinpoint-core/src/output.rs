//! JSON response envelopes for the `pinpoint` command line.
//!
//! Every response carries `status` first and a `schema_version`, so callers
//! can branch on success before reading anything else. Field and array order
//! is deterministic: the same cache and query always print the same bytes.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::correlator::{AncestorChain, Occurrence};
use crate::error::{OutputErrorCode, PinpointError};
use crate::geometry::Point;
use crate::resolver::{Candidate, Selection};
use crate::types::SourceMatch;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, equal to the process exit code.
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &PinpointError) -> Self {
        let details = match err {
            PinpointError::SourceNotFound { path } => Some(serde_json::json!({ "path": path })),
            PinpointError::NoMatch { type_name } => {
                Some(serde_json::json!({ "type_name": type_name }))
            }
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(err: &PinpointError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for `locate`: the best construction site of a type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocateResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub type_name: String,
    /// Observed ancestor chain used for scoring, nearest first.
    pub ancestors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(rename = "match")]
    pub found: SourceMatch,
}

impl LocateResponse {
    pub fn new(
        type_name: impl Into<String>,
        ancestors: Vec<String>,
        hint: Option<String>,
        found: SourceMatch,
    ) -> Self {
        LocateResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            type_name: type_name.into(),
            ancestors,
            hint,
            found,
        }
    }
}

/// Response for `definitions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionsResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub name: String,
    /// Ordered by path, then position.
    pub definitions: Vec<SourceMatch>,
}

impl DefinitionsResponse {
    pub fn new(name: impl Into<String>, definitions: Vec<SourceMatch>) -> Self {
        DefinitionsResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            name: name.into(),
            definitions,
        }
    }
}

/// One occurrence with everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceInfo {
    pub line: u32,
    pub column: u32,
    pub start_offset: usize,
    pub end_offset: usize,
    /// False when the boundary was truncated at end of text.
    pub complete: bool,
    pub ancestors: AncestorChain,
    pub properties: BTreeMap<String, String>,
    pub code: String,
}

impl OccurrenceInfo {
    pub fn new(
        occurrence: &Occurrence,
        ancestors: AncestorChain,
        properties: BTreeMap<String, String>,
    ) -> Self {
        let boundary = &occurrence.boundary;
        OccurrenceInfo {
            line: occurrence.line,
            column: occurrence.column,
            start_offset: boundary.start_offset,
            end_offset: boundary.end_offset,
            complete: boundary.is_complete,
            ancestors,
            properties,
            code: boundary.code.clone(),
        }
    }
}

/// Response for `occurrences`: every construction site in one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrencesResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub path: String,
    pub type_name: String,
    /// In text order.
    pub occurrences: Vec<OccurrenceInfo>,
}

impl OccurrencesResponse {
    pub fn new(
        path: impl Into<String>,
        type_name: impl Into<String>,
        occurrences: Vec<OccurrenceInfo>,
    ) -> Self {
        OccurrencesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            path: path.into(),
            type_name: type_name.into(),
            occurrences,
        }
    }
}

/// Response for `resolve`: the selected element and the full ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub click: Point,
    pub selection: Selection,
    /// `"<TypeName>#<siblingIndex>"` of the selected element, when tracked.
    pub identity_key: Option<String>,
    /// Selectable candidates, best first.
    pub ranked: Vec<Candidate>,
}

impl ResolveResponse {
    pub fn new(
        click: Point,
        selection: Selection,
        identity_key: Option<String>,
        ranked: Vec<Candidate>,
    ) -> Self {
        ResolveResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            click,
            selection,
            identity_key,
            ranked,
        }
    }
}

// ============================================================================
// Emitting
// ============================================================================

/// Emit a response as pretty-printed JSON followed by a newline.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON (single line).
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
