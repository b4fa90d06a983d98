//! Source correlator: construction sites of a named type in raw source text.
//!
//! Given a source text and a type/constructor name, the correlator finds
//! every `Name(` construction site outside strings and comments, extracts its
//! balanced boundary, derives a heuristic ancestor chain by looking at the
//! call sites that precede it, and picks the occurrence whose derived chain
//! best agrees with an observed chain from the live element tree.
//!
//! All functions here are pure: they own nothing and never fail. An
//! unterminated construction yields a boundary that runs to end of text with
//! `is_complete == false`.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lexer::{call_sites, match_group, Delim, Lexer, Token};
use crate::text::offset_to_line_col;

/// Maximum number of names kept in a derived ancestor chain.
pub const ANCESTOR_CAP: usize = 10;

/// Argument names that denote nested sub-elements rather than leaf properties.
const NESTED_KEYS: &[&str] = &["child", "children"];

/// Ordered enclosing construct names, nearest first.
pub type AncestorChain = Vec<String>;

// ============================================================================
// Types
// ============================================================================

/// The balanced-bracket text span of one construction expression.
///
/// `code == content[start_offset..end_offset]` and the span starts at the
/// first byte of the construct name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// The construct name (e.g. "Padding").
    pub name: String,
    /// Start byte offset (inclusive), on the first byte of the name.
    pub start_offset: usize,
    /// End byte offset (exclusive).
    pub end_offset: usize,
    /// The source text of the span.
    pub code: String,
    /// False when the scan reached end of text before the group closed.
    pub is_complete: bool,
}

/// One located construction site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub type_name: String,
    /// Line of `boundary.start_offset` (1-indexed).
    pub line: u32,
    /// Column of `boundary.start_offset` (1-indexed, chars).
    pub column: u32,
    pub boundary: Boundary,
}

/// How `disambiguate_scored` arrived at its pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disambiguation {
    /// Exactly one occurrence existed.
    Unique,
    /// The ancestor chain scored this occurrence highest (score > 0).
    ByChain(f64),
    /// Nothing scored above zero; the first occurrence was taken.
    Fallback,
}

// ============================================================================
// Occurrences
// ============================================================================

/// Find every `type_name(` construction site in `text`, in text order.
///
/// Nested occurrences of the same name are reported independently; the outer
/// boundary contains the inner one.
pub fn find_occurrences(text: &str, type_name: &str) -> Vec<Occurrence> {
    if type_name.is_empty() {
        return Vec::new();
    }

    call_sites(text)
        .filter(|site| text[site.name.clone()] == *type_name)
        .filter_map(|site| {
            let group = match_group(text, site.open)?;
            let start = site.name.start;
            if !group.complete {
                warn!(
                    type_name,
                    start, "construction site is unterminated, boundary truncated at end of text"
                );
            }
            let (line, column) = offset_to_line_col(text, start);
            Some(Occurrence {
                type_name: type_name.to_string(),
                line,
                column,
                boundary: Boundary {
                    name: type_name.to_string(),
                    start_offset: start,
                    end_offset: group.end,
                    code: text[start..group.end].to_string(),
                    is_complete: group.complete,
                },
            })
        })
        .collect()
}

// ============================================================================
// Ancestor Chains
// ============================================================================

/// Derive the ancestor chain of `boundary` with the default cap.
pub fn ancestor_chain(text: &str, boundary: &Boundary) -> AncestorChain {
    ancestor_chain_with_cap(text, boundary.start_offset, ANCESTOR_CAP)
}

/// Derive an ancestor chain for the construct starting at `start`.
///
/// The chain is the names of the call sites preceding `start`, nearest first,
/// at most `cap` of them. This approximates lexical nesting without a parse:
/// a sibling call that merely precedes the target textually is reported too.
pub fn ancestor_chain_with_cap(text: &str, start: usize, cap: usize) -> AncestorChain {
    if cap == 0 {
        return Vec::new();
    }
    let prefix = &text[..floor_boundary(text, start)];

    let mut window: VecDeque<&str> = VecDeque::with_capacity(cap.min(ANCESTOR_CAP));
    for site in call_sites(prefix) {
        if window.len() == cap {
            window.pop_front();
        }
        window.push_back(&prefix[site.name]);
    }

    window.iter().rev().map(|name| name.to_string()).collect()
}

fn floor_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

// ============================================================================
// Disambiguation
// ============================================================================

/// Fraction of position-wise equal names between two chains.
///
/// Compares index by index over the shorter chain and divides by its length.
/// Returns 0 when either chain is empty.
pub fn chain_match_score(observed: &[String], derived: &[String]) -> f64 {
    let shortest = observed.len().min(derived.len());
    if shortest == 0 {
        return 0.0;
    }
    let equal = observed
        .iter()
        .zip(derived)
        .filter(|(a, b)| a == b)
        .count();
    equal as f64 / shortest as f64
}

/// Pick the occurrence whose derived ancestor chain best matches `observed`.
///
/// Ties resolve to the first occurrence in text order.
pub fn disambiguate<'o>(
    occurrences: &'o [Occurrence],
    observed: &[String],
    text: &str,
) -> Option<&'o Occurrence> {
    disambiguate_scored(occurrences, observed, text, ANCESTOR_CAP)
        .map(|(occurrence, _)| occurrence)
}

/// Like [`disambiguate`] with an explicit chain cap, also reporting how the
/// pick was made.
pub fn disambiguate_scored<'o>(
    occurrences: &'o [Occurrence],
    observed: &[String],
    text: &str,
    cap: usize,
) -> Option<(&'o Occurrence, Disambiguation)> {
    match occurrences {
        [] => None,
        [only] => Some((only, Disambiguation::Unique)),
        [first, ..] => {
            let mut best = first;
            let mut best_score = 0.0;
            for occurrence in occurrences {
                let derived =
                    ancestor_chain_with_cap(text, occurrence.boundary.start_offset, cap);
                let score = chain_match_score(observed, &derived);
                if score > best_score {
                    best = occurrence;
                    best_score = score;
                }
            }
            if best_score > 0.0 {
                Some((best, Disambiguation::ByChain(best_score)))
            } else {
                Some((best, Disambiguation::Fallback))
            }
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Extract top-level `identifier: value` arguments from a boundary.
///
/// Only arguments directly inside the boundary's own parenthesis group are
/// considered, values are trimmed source text, and `child`/`children` are
/// skipped.
pub fn properties_of(boundary: &Boundary) -> BTreeMap<String, String> {
    let code = boundary.code.as_str();
    let mut properties = BTreeMap::new();

    let mut stack: Vec<Delim> = Vec::new();
    let mut at_argument_start = false;
    let mut pending_key: Option<Range<usize>> = None;
    let mut value: Option<(Range<usize>, usize)> = None;

    let mut finish = |value: &mut Option<(Range<usize>, usize)>, end: usize| {
        if let Some((key, start)) = value.take() {
            let key = &code[key];
            if !NESTED_KEYS.contains(&key) {
                properties.insert(key.to_string(), code[start..end].trim().to_string());
            }
        }
    };

    for token in Lexer::new(code) {
        let top_level = stack.len() == 1;
        match token {
            Token::Open(delim, _) => {
                if stack.is_empty() && delim != Delim::Paren {
                    continue;
                }
                stack.push(delim);
                if stack.len() == 1 {
                    at_argument_start = true;
                    continue;
                }
            }
            Token::Close(delim, at) => {
                if stack.last() == Some(&delim) {
                    stack.pop();
                    if stack.is_empty() {
                        finish(&mut value, at);
                        break;
                    }
                }
            }
            Token::Punct(b',', at) if top_level => {
                finish(&mut value, at);
                at_argument_start = true;
                pending_key = None;
                continue;
            }
            Token::Ident(range) if top_level && at_argument_start => {
                pending_key = Some(range);
                at_argument_start = false;
                continue;
            }
            Token::Punct(b':', at) if top_level && value.is_none() => {
                if let Some(key) = pending_key.take() {
                    value = Some((key, at + 1));
                    continue;
                }
            }
            _ => {}
        }
        if top_level {
            at_argument_start = false;
            pending_key = None;
        }
    }

    properties
}

// ============================================================================
// Tests
// ============================================================================
