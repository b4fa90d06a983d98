//! Source cache: path-keyed source texts and cross-file match scoring.
//!
//! The cache exclusively owns every source text. Paths are normalized by
//! stripping a single leading `/` and looked up fuzzily:
//!
//! 1. exact normalized match
//! 2. `lib/` prefix retry (added when missing, dropped when present)
//! 3. suffix containment in either direction against every cached path,
//!    on whole `/` segments (first hit in path order wins)
//!
//! Files are kept in a `BTreeMap`, so every iteration (and therefore every
//! tie-break) follows sorted path order.
//!
//! The cache is a plain owned value with no interior locking; callers
//! serialize access (one instance per inspection session on the host's UI
//! thread).

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::{CacheConfig, PinpointConfig, ScanConfig};
use crate::correlator::{
    ancestor_chain_with_cap, chain_match_score, disambiguate_scored, find_occurrences,
    Disambiguation, Occurrence,
};
use crate::text::{line_at, offset_to_line_col, truncate_chars};
use crate::types::{MatchKind, SourceMatch};

/// Confidence when a file holds exactly one occurrence.
pub const CONFIDENCE_UNIQUE: f64 = 1.0;
/// Confidence when the ancestor chain picked the occurrence.
pub const CONFIDENCE_CHAIN: f64 = 0.8;
/// Confidence when nothing disambiguated and the first occurrence was taken.
pub const CONFIDENCE_FALLBACK: f64 = 0.5;

const LIB_PREFIX: &str = "lib/";

// ============================================================================
// Source Text
// ============================================================================

/// One cached file. Immutable once inserted; re-inserting the same path
/// replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceText {
    pub path: String,
    pub content: String,
}

/// Strip a single leading `/`.
pub fn normalize_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Whether `suffix` equals `path` or is a trailing run of its `/` segments.
fn ends_with_segments(path: &str, suffix: &str) -> bool {
    match path.strip_suffix(suffix) {
        Some(rest) => rest.is_empty() || rest.ends_with('/'),
        None => false,
    }
}

// ============================================================================
// Source Cache
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    files: BTreeMap<String, SourceText>,
    scan: ScanConfig,
    scoring: CacheConfig,
}

/// One instantiation candidate during cross-file scoring.
struct Candidate<'c> {
    content: &'c str,
    occurrence: Occurrence,
    found: SourceMatch,
}

impl SourceCache {
    /// Create an empty cache with default tunables.
    pub fn new() -> Self {
        SourceCache::default()
    }

    /// Create an empty cache using the scan and cache sections of `config`.
    pub fn with_config(config: &PinpointConfig) -> Self {
        SourceCache {
            files: BTreeMap::new(),
            scan: config.scan.clone(),
            scoring: config.cache.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Contents
    // ------------------------------------------------------------------------

    /// Insert or replace the text of `path`.
    pub fn add_source(&mut self, path: &str, content: impl Into<String>) {
        let path = normalize_path(path).to_string();
        let text = SourceText {
            path: path.clone(),
            content: content.into(),
        };
        if self.files.insert(path.clone(), text).is_some() {
            debug!("replaced source {}", path);
        } else {
            debug!("added source {}", path);
        }
    }

    /// Remove `path` (exact normalized match). Returns whether it was cached.
    pub fn remove_source(&mut self, path: &str) -> bool {
        let removed = self.files.remove(normalize_path(path)).is_some();
        if removed {
            debug!("removed source {}", normalize_path(path));
        }
        removed
    }

    /// Drop every cached file.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether `path` resolves to a cached file (fuzzy).
    pub fn contains(&self, path: &str) -> bool {
        self.resolve_path(path).is_some()
    }

    /// Cached paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Look up a cached file (fuzzy).
    pub fn get(&self, path: &str) -> Option<&SourceText> {
        self.resolve_path(path).and_then(|key| self.files.get(key))
    }

    /// Resolve a requested path to the key of a cached file.
    pub fn resolve_path(&self, path: &str) -> Option<&str> {
        let wanted = normalize_path(path);
        if wanted.is_empty() {
            return None;
        }
        if let Some((key, _)) = self.files.get_key_value(wanted) {
            return Some(key.as_str());
        }

        let retry = match wanted.strip_prefix(LIB_PREFIX) {
            Some(rest) => rest.to_string(),
            None => format!("{}{}", LIB_PREFIX, wanted),
        };
        if let Some((key, _)) = self.files.get_key_value(retry.as_str()) {
            debug!("resolved {} via lib/ retry to {}", wanted, key);
            return Some(key.as_str());
        }

        let hit = self
            .files
            .keys()
            .find(|key| ends_with_segments(key, wanted) || ends_with_segments(wanted, key));
        if let Some(key) = hit {
            debug!("resolved {} via containment to {}", wanted, key);
        }
        hit.map(String::as_str)
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Locate `type_name` inside one file, disambiguating with `ancestors`.
    ///
    /// Confidence is 1.0 for a sole occurrence, 0.8 when the ancestor chain
    /// picked the winner and 0.5 when the first occurrence was taken for lack
    /// of evidence. A truncated boundary halves it.
    pub fn find_in_file(
        &self,
        path: &str,
        type_name: &str,
        ancestors: Option<&[String]>,
    ) -> Option<SourceMatch> {
        let source = self.get(path)?;
        let occurrences = find_occurrences(&source.content, type_name);
        let (occurrence, how) = disambiguate_scored(
            &occurrences,
            ancestors.unwrap_or(&[]),
            &source.content,
            self.scan.ancestor_cap,
        )?;

        let mut confidence = match how {
            Disambiguation::Unique => CONFIDENCE_UNIQUE,
            Disambiguation::ByChain(_) => CONFIDENCE_CHAIN,
            Disambiguation::Fallback => CONFIDENCE_FALLBACK,
        };
        if !occurrence.boundary.is_complete {
            confidence /= 2.0;
        }

        Some(SourceMatch::new(
            source.path.clone(),
            occurrence.line,
            occurrence.column,
            occurrence.boundary.code.clone(),
            confidence,
            MatchKind::Instantiation,
        ))
    }

    /// Find the single most plausible construction site of `type_name`
    /// across every cached file.
    ///
    /// With exactly one candidate it is returned at base confidence. With
    /// several, each is boosted additively by path/keyword/chain/hint
    /// evidence and the highest score wins; ties keep the first in path and
    /// text order. Scores only rank candidates of this one call.
    pub fn find_best_match(
        &self,
        type_name: &str,
        ancestors: Option<&[String]>,
        location_hint: Option<&str>,
    ) -> Option<SourceMatch> {
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for source in self.files.values() {
            for occurrence in find_occurrences(&source.content, type_name) {
                let found = SourceMatch::new(
                    source.path.clone(),
                    occurrence.line,
                    occurrence.column,
                    occurrence.boundary.code.clone(),
                    self.scoring.base_confidence,
                    MatchKind::Instantiation,
                );
                candidates.push(Candidate {
                    content: &source.content,
                    occurrence,
                    found,
                });
            }
        }

        if candidates.len() <= 1 {
            if candidates.is_empty() {
                debug!("no occurrence of {} in {} files", type_name, self.len());
            }
            return candidates.pop().map(|candidate| candidate.found);
        }

        let hint_location = location_hint
            .and_then(parse_location_hint)
            .and_then(|(path, line)| Some((self.resolve_path(&path)?.to_string(), line)));

        let mut best: Option<SourceMatch> = None;
        for candidate in candidates {
            let mut found = candidate.found;
            found.confidence += self.path_boosts(&found, ancestors, location_hint);

            if let Some(chain) = ancestors.filter(|chain| !chain.is_empty()) {
                let derived = ancestor_chain_with_cap(
                    candidate.content,
                    candidate.occurrence.boundary.start_offset,
                    self.scan.ancestor_cap,
                );
                found.confidence += self.scoring.chain_boost * chain_match_score(chain, &derived);
            }

            if let Some((hint_path, hint_line)) = &hint_location {
                if *hint_path == found.path && *hint_line == found.line {
                    found.confidence += self.scoring.hint_line_boost;
                }
            }

            trace!(
                path = %found.path,
                line = found.line,
                score = found.confidence,
                "scored candidate for {}",
                type_name
            );

            let better = match &best {
                None => true,
                Some(current) => found.confidence > current.confidence,
            };
            if better {
                best = Some(found);
            }
        }

        if let Some(found) = &best {
            debug!(
                "best match for {} is {} ({:.2})",
                type_name,
                found.location(),
                found.confidence
            );
        }
        best
    }

    /// Additive path/keyword boosts for one candidate.
    fn path_boosts(
        &self,
        found: &SourceMatch,
        ancestors: Option<&[String]>,
        location_hint: Option<&str>,
    ) -> f64 {
        let scoring = &self.scoring;
        let path = found.path.to_lowercase();
        let mut boost = 0.0;

        if let Some(chain) = ancestors {
            let lowered: Vec<String> = chain.iter().map(|name| name.to_lowercase()).collect();
            let domain_hit = scoring.domain_keywords.iter().any(|keyword| {
                path.contains(keyword.as_str())
                    && lowered.iter().any(|name| name.contains(keyword.as_str()))
            });
            if domain_hit {
                boost += scoring.domain_boost;
            }
        }

        if let Some(hint) = location_hint {
            let hint = hint.to_lowercase();
            let location_hit = scoring
                .location_keywords
                .iter()
                .any(|keyword| hint.contains(keyword.as_str()) && path.contains(keyword.as_str()));
            if location_hit {
                boost += scoring.location_boost;
            }
        }

        if found.kind == MatchKind::Definition {
            boost += scoring.definition_boost;
        }

        let mut dirs = path.split('/').rev().skip(1);
        if dirs.any(|dir| scoring.widget_dirs.iter().any(|w| w == dir)) {
            boost += scoring.widget_dir_boost;
        }

        boost
    }

    /// Find every `class <name> extends` declaration across cached files.
    ///
    /// Each hit reports the position of the `class` keyword and the trimmed
    /// declaration line, capped in length.
    pub fn find_class_definitions(&self, name: &str) -> Vec<SourceMatch> {
        if name.is_empty() {
            return Vec::new();
        }
        let pattern = format!(r"\bclass\s+{}\s+extends\b", regex::escape(name));
        let regex = match Regex::new(&pattern) {
            Ok(regex) => regex,
            Err(err) => {
                warn!("cannot build definition pattern for {}: {}", name, err);
                return Vec::new();
            }
        };

        let mut definitions = Vec::new();
        for source in self.files.values() {
            for hit in regex.find_iter(&source.content) {
                let (line, column) = offset_to_line_col(&source.content, hit.start());
                let snippet = truncate_chars(
                    line_at(&source.content, hit.start()).trim(),
                    self.scan.snippet_max_chars,
                );
                definitions.push(SourceMatch::new(
                    source.path.clone(),
                    line,
                    column,
                    snippet,
                    CONFIDENCE_UNIQUE,
                    MatchKind::Definition,
                ));
            }
        }
        definitions
    }
}

/// Parse a creation-location hint of the form `path:line[:column]`.
///
/// A `file://` prefix is dropped and a `package:<name>/` prefix is mapped to
/// `lib/`. Returns `None` for hints that carry no line number.
fn parse_location_hint(hint: &str) -> Option<(String, u32)> {
    let hint = hint.trim();
    let hint = hint.strip_prefix("file://").unwrap_or(hint);

    let parts: Vec<&str> = hint.rsplitn(3, ':').collect();
    let (path, line) = match parts.as_slice() {
        [col, line, path] if col.parse::<u32>().is_ok() && line.parse::<u32>().is_ok() => {
            (*path, line.parse::<u32>().ok()?)
        }
        [last, rest @ ..] if last.parse::<u32>().is_ok() && !rest.is_empty() => {
            let (path, line) = hint.rsplit_once(':')?;
            (path, line.parse::<u32>().ok()?)
        }
        _ => return None,
    };

    let path = match path.strip_prefix("package:") {
        Some(rest) => format!("{}{}", LIB_PREFIX, rest.split_once('/')?.1),
        None => path.to_string(),
    };
    Some((path, line))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    mod paths {
        use super::*;

        fn cache() -> SourceCache {
            let mut cache = SourceCache::new();
            cache.add_source("/lib/widgets/editor_panel.dart", "Panel()");
            cache.add_source("test/helpers.dart", "Helper()");
            cache
        }

        #[test]
        fn leading_slash_is_stripped() {
            let cache = cache();
            assert_eq!(
                cache.paths().collect::<Vec<_>>(),
                vec!["lib/widgets/editor_panel.dart", "test/helpers.dart"]
            );
            assert_eq!(
                cache.resolve_path("/test/helpers.dart"),
                Some("test/helpers.dart")
            );
        }

        #[test]
        fn lib_prefix_retry() {
            let cache = cache();
            assert_eq!(
                cache.resolve_path("widgets/editor_panel.dart"),
                Some("lib/widgets/editor_panel.dart")
            );
        }

        #[test]
        fn suffix_containment_both_ways() {
            let cache = cache();
            assert_eq!(
                cache.resolve_path("editor_panel.dart"),
                Some("lib/widgets/editor_panel.dart")
            );
            assert_eq!(
                cache.resolve_path("/home/me/app/test/helpers.dart"),
                Some("test/helpers.dart")
            );
            assert_eq!(cache.resolve_path("missing.dart"), None);
            assert_eq!(cache.resolve_path("/"), None);
        }

        #[test]
        fn containment_respects_segment_boundaries() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/domain.dart", "Domain()");
            assert_eq!(cache.resolve_path("main.dart"), None);
            assert_eq!(cache.resolve_path("app/lib/domain.dart"), Some("lib/domain.dart"));
            assert_eq!(cache.resolve_path("app/xlib/domain.dart"), None);
            assert!(!cache.contains("ain.dart"));
        }

        #[test]
        fn reinsertion_replaces_text() {
            let mut cache = cache();
            cache.add_source("test/helpers.dart", "Other()");
            assert_eq!(cache.len(), 2);
            assert_eq!(cache.get("test/helpers.dart").unwrap().content, "Other()");
        }

        #[test]
        fn remove_source_is_exact() {
            let mut cache = cache();
            assert!(!cache.remove_source("helpers.dart"));
            assert!(cache.remove_source("/test/helpers.dart"));
            assert_eq!(cache.len(), 1);
            cache.clear();
            assert!(cache.is_empty());
        }
    }

    mod best_match {
        use super::*;

        #[test]
        fn single_occurrence_keeps_base_confidence() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/widgets/editor_panel.dart", "Column(children: [Avatar()])");
            cache.add_source("lib/main.dart", "runApp(App())");
            let found = cache
                .find_best_match("Avatar", Some(chain(&["EditorPanel"]).as_slice()), Some("panel"))
                .unwrap();
            assert_eq!(found.confidence, 0.9);
            assert_eq!(found.path, "lib/widgets/editor_panel.dart");
            assert_eq!(found.code, "Avatar()");
            assert_eq!(found.kind, MatchKind::Instantiation);
        }

        #[test]
        fn no_occurrence_is_none() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", "A()");
            assert!(cache.find_best_match("B", None, None).is_none());
        }

        #[test]
        fn domain_keyword_in_chain_and_path_wins() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/preview/view.dart", "Label('p')");
            cache.add_source("lib/terminal/view.dart", "Label('t')");
            let found = cache
                .find_best_match("Label", Some(chain(&["TerminalPane"]).as_slice()), None)
                .unwrap();
            assert_eq!(found.path, "lib/terminal/view.dart");
            assert!(found.confidence > 0.9);
        }

        #[test]
        fn widget_directory_boost() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/app.dart", "Badge()");
            cache.add_source("lib/widgets/badge_row.dart", "Badge()");
            let found = cache.find_best_match("Badge", None, None).unwrap();
            assert_eq!(found.path, "lib/widgets/badge_row.dart");
            assert!((found.confidence - 1.1).abs() < 1e-9);
        }

        #[test]
        fn location_keyword_boost() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a/home.dart", "Tile()");
            cache.add_source("lib/b/settings_screen.dart", "Tile()");
            let found = cache
                .find_best_match("Tile", None, Some("SettingsScreen"))
                .unwrap();
            assert_eq!(found.path, "lib/b/settings_screen.dart");
        }

        #[test]
        fn ties_keep_first_in_path_order() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/b.dart", "Dot()");
            cache.add_source("lib/a.dart", "Dot()\nDot()");
            let found = cache.find_best_match("Dot", None, None).unwrap();
            assert_eq!((found.path.as_str(), found.line), ("lib/a.dart", 1));
        }

        #[test]
        fn ancestor_chain_evidence_breaks_ties_within_a_file() {
            let mut cache = SourceCache::new();
            cache.add_source(
                "lib/a.dart",
                "Root(children: [Bar(child: Foo()), Baz(child: Foo())])",
            );
            let found = cache
                .find_best_match("Foo", Some(chain(&["Baz"]).as_slice()), None)
                .unwrap();
            assert!(found.column > 30);
        }

        #[test]
        fn line_hint_points_at_candidate() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", "Chip()\n\nChip()");
            let found = cache
                .find_best_match("Chip", None, Some("package:app/a.dart:3:1"))
                .unwrap();
            assert_eq!(found.line, 3);
        }
    }

    mod in_file {
        use super::*;

        const TWO_FOOS: &str = "Root(children: [Bar(child: Foo()), Baz(child: Foo())])";

        #[test]
        fn unique_occurrence_is_fully_confident() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", "Foo()");
            let found = cache.find_in_file("a.dart", "Foo", None).unwrap();
            assert_eq!(found.confidence, CONFIDENCE_UNIQUE);
        }

        #[test]
        fn chain_disambiguated_confidence() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", TWO_FOOS);
            let found = cache
                .find_in_file("lib/a.dart", "Foo", Some(chain(&["Bar", "Root"]).as_slice()))
                .unwrap();
            assert_eq!(found.confidence, CONFIDENCE_CHAIN);
            assert_eq!(found.column, 28);
        }

        #[test]
        fn fallback_confidence() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", TWO_FOOS);
            let found = cache.find_in_file("lib/a.dart", "Foo", None).unwrap();
            assert_eq!(found.confidence, CONFIDENCE_FALLBACK);
        }

        #[test]
        fn truncated_boundary_halves_confidence() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", "Foo(x: '");
            let found = cache.find_in_file("lib/a.dart", "Foo", None).unwrap();
            assert_eq!(found.confidence, CONFIDENCE_UNIQUE / 2.0);
        }

        #[test]
        fn unknown_file_is_none() {
            let cache = SourceCache::new();
            assert!(cache.find_in_file("lib/a.dart", "Foo", None).is_none());
        }
    }

    mod definitions {
        use super::*;

        #[test]
        fn finds_class_declarations() {
            let mut cache = SourceCache::new();
            cache.add_source(
                "lib/widgets/avatar.dart",
                "import 'x';\n\n  class Avatar extends StatelessWidget {\n}\n",
            );
            cache.add_source("lib/other.dart", "class AvatarRing extends Avatar {}");
            let found = cache.find_class_definitions("Avatar");
            assert_eq!(found.len(), 1);
            let def = &found[0];
            assert_eq!(def.path, "lib/widgets/avatar.dart");
            assert_eq!((def.line, def.column), (3, 3));
            assert_eq!(def.code, "class Avatar extends StatelessWidget {");
            assert_eq!(def.confidence, 1.0);
            assert_eq!(def.kind, MatchKind::Definition);
        }

        #[test]
        fn snippet_is_capped() {
            let mut cache = SourceCache::new();
            let long = format!("class Wide extends Base {{ {} }}", "x".repeat(300));
            cache.add_source("lib/wide.dart", long);
            let found = cache.find_class_definitions("Wide");
            assert_eq!(found[0].code.chars().count(), 120);
        }

        #[test]
        fn name_is_matched_literally() {
            let mut cache = SourceCache::new();
            cache.add_source("lib/a.dart", "class A extends B {}");
            assert!(cache.find_class_definitions("A.").is_empty());
            assert!(cache.find_class_definitions("").is_empty());
        }
    }

    mod hints {
        use super::*;

        #[test]
        fn parses_package_hint() {
            assert_eq!(
                parse_location_hint("package:app/widgets/a.dart:12:5"),
                Some(("lib/widgets/a.dart".to_string(), 12))
            );
        }

        #[test]
        fn parses_file_hint_without_column() {
            assert_eq!(
                parse_location_hint("file:///src/app/lib/a.dart:7"),
                Some(("/src/app/lib/a.dart".to_string(), 7))
            );
        }

        #[test]
        fn rejects_plain_words() {
            assert_eq!(parse_location_hint("SettingsScreen"), None);
            assert_eq!(parse_location_hint(""), None);
        }
    }
}
