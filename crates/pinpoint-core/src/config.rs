//! Configuration: tunables, vocabularies and their precedence.
//!
//! Every tunable has a built-in default. A project file (`pinpoint.json` in
//! the source root, or an explicit path) may override any of them; a few
//! scalars can also be set from the environment or the command line.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`PINPOINT_*`)
//! 3. Project file
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PinpointError, PinpointResult};

/// Name of the project configuration file looked up in the source root.
pub const PROJECT_CONFIG_FILE: &str = "pinpoint.json";

/// Largest accepted `scan.ancestor_cap`.
pub const MAX_ANCESTOR_CAP: usize = 1024;

pub const ENV_ANCESTOR_CAP: &str = "PINPOINT_ANCESTOR_CAP";
pub const ENV_BOUNDS_TOLERANCE: &str = "PINPOINT_BOUNDS_TOLERANCE";
pub const ENV_BASE_CONFIDENCE: &str = "PINPOINT_BASE_CONFIDENCE";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Sections
// ============================================================================

/// Source scanning limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum length of a derived ancestor chain.
    pub ancestor_cap: usize,
    /// Maximum length of a one-line definition snippet.
    pub snippet_max_chars: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            ancestor_cap: 10,
            snippet_max_chars: 120,
        }
    }
}

/// Cross-file scoring used by `SourceCache::find_best_match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Starting confidence of every instantiation candidate.
    pub base_confidence: f64,
    /// Domain-area keywords matched against both ancestor names and paths.
    pub domain_keywords: Vec<String>,
    /// Keywords matched against both the location hint and paths.
    pub location_keywords: Vec<String>,
    /// Conventional widget/screen directory names.
    pub widget_dirs: Vec<String>,
    pub domain_boost: f64,
    pub location_boost: f64,
    pub definition_boost: f64,
    pub widget_dir_boost: f64,
    /// Multiplied by the ancestor-chain match score of a candidate.
    pub chain_boost: f64,
    /// Added when a `path:line` location hint points at the candidate's line.
    pub hint_line_boost: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            base_confidence: 0.9,
            domain_keywords: strings(&[
                "editor", "preview", "terminal", "sidebar", "settings", "toolbar", "dialog",
            ]),
            location_keywords: strings(&["panel", "screen"]),
            widget_dirs: strings(&["widgets", "screens", "pages", "views", "components"]),
            domain_boost: 0.5,
            location_boost: 0.3,
            definition_boost: 0.3,
            widget_dir_boost: 0.2,
            chain_boost: 0.4,
            hint_line_boost: 0.6,
        }
    }
}

/// Spatial specificity scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Numerator of the area score (`area_numerator / (area + 1)`).
    pub area_numerator: f64,
    pub area_weight: f64,
    pub center_weight: f64,
    pub semantic_bonus: f64,
    /// Corner zone size as a fraction of the shorter side.
    pub corner_ratio: f64,
    pub corner_min: f64,
    pub corner_max: f64,
    /// Type names that get the semantic bonus.
    pub user_facing: Vec<String>,
    /// Type names that are never selectable.
    pub internal: Vec<String>,
    /// Type names starting with this prefix are never selectable.
    pub private_prefix: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            area_numerator: 10_000.0,
            area_weight: 0.5,
            center_weight: 0.3,
            semantic_bonus: 0.2,
            corner_ratio: 0.15,
            corner_min: 12.0,
            corner_max: 24.0,
            user_facing: strings(&[
                "Text",
                "RichText",
                "SelectableText",
                "Icon",
                "Image",
                "ElevatedButton",
                "TextButton",
                "OutlinedButton",
                "IconButton",
                "FloatingActionButton",
                "TextField",
                "TextFormField",
                "Checkbox",
                "Switch",
                "Radio",
                "Slider",
                "DropdownButton",
                "Chip",
                "Card",
                "ListTile",
                "AppBar",
                "Tooltip",
            ]),
            internal: strings(&[
                "RenderObjectToWidgetAdapter",
                "View",
                "RawView",
                "Semantics",
                "MergeSemantics",
                "ExcludeSemantics",
                "Builder",
                "StatefulBuilder",
                "LayoutBuilder",
                "MediaQuery",
                "Theme",
                "AnimatedTheme",
                "DefaultTextStyle",
                "IconTheme",
                "Listener",
                "RepaintBoundary",
                "KeyedSubtree",
                "Actions",
                "Shortcuts",
                "Focus",
                "FocusScope",
                "FocusTraversalGroup",
                "Overlay",
                "ScrollConfiguration",
                "NotificationListener",
                "PrimaryScrollController",
                "TickerMode",
                "Offstage",
            ]),
            private_prefix: "_".to_string(),
        }
    }
}

/// Instance tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Absolute tolerance for bounds-equality lookups, per edge.
    pub bounds_tolerance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            bounds_tolerance: 1.0,
        }
    }
}

/// All pinpoint tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinpointConfig {
    pub scan: ScanConfig,
    pub cache: CacheConfig,
    pub resolver: ResolverConfig,
    pub tracker: TrackerConfig,
}

impl PinpointConfig {
    /// Check invariants the algorithms rely on.
    pub fn validate(&self) -> PinpointResult<()> {
        if self.scan.ancestor_cap > MAX_ANCESTOR_CAP {
            return Err(PinpointError::config(format!(
                "scan.ancestor_cap must not exceed {}",
                MAX_ANCESTOR_CAP
            )));
        }
        let tolerance = self.tracker.bounds_tolerance;
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(PinpointError::config(
                "tracker.bounds_tolerance must be a non-negative number",
            ));
        }
        if !self.cache.base_confidence.is_finite() {
            return Err(PinpointError::config(
                "cache.base_confidence must be finite",
            ));
        }
        let (min, max) = (self.resolver.corner_min, self.resolver.corner_max);
        if min.is_nan() || max.is_nan() || min > max {
            return Err(PinpointError::config(
                "resolver.corner_min must not exceed resolver.corner_max",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From the project file.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit project file; replaces the `pinpoint.json` lookup.
    pub config_file: Option<PathBuf>,
    pub ancestor_cap: Option<usize>,
    pub bounds_tolerance: Option<f64>,
    pub base_confidence: Option<f64>,
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// Resolved configuration with precedence information for the overridable scalars.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The effective configuration.
    pub config: PinpointConfig,
    pub ancestor_cap: ConfigValue<usize>,
    pub bounds_tolerance: ConfigValue<f64>,
    pub base_confidence: ConfigValue<f64>,
}

impl ResolvedConfig {
    /// Resolve configuration from all sources, reading the process environment.
    pub fn resolve(root: Option<&Path>, overrides: &ConfigOverrides) -> PinpointResult<Self> {
        Self::resolve_with_env(root, overrides, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn resolve_with_env(
        root: Option<&Path>,
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> PinpointResult<Self> {
        let defaults = PinpointConfig::default();
        let mut resolved = ResolvedConfig {
            ancestor_cap: ConfigValue::new(defaults.scan.ancestor_cap, ConfigSource::Default),
            bounds_tolerance: ConfigValue::new(
                defaults.tracker.bounds_tolerance,
                ConfigSource::Default,
            ),
            base_confidence: ConfigValue::new(
                defaults.cache.base_confidence,
                ConfigSource::Default,
            ),
            config: defaults,
        };

        let project_file = match &overrides.config_file {
            Some(path) => Some(path.clone()),
            None => root
                .map(|root| root.join(PROJECT_CONFIG_FILE))
                .filter(|path| path.is_file()),
        };
        if let Some(path) = project_file {
            resolved.apply_project_file(&path)?;
        }

        resolved.apply_env(&env)?;
        resolved.apply_cli_overrides(overrides);

        resolved.config.scan.ancestor_cap = resolved.ancestor_cap.value;
        resolved.config.tracker.bounds_tolerance = resolved.bounds_tolerance.value;
        resolved.config.cache.base_confidence = resolved.base_confidence.value;
        resolved.config.validate()?;
        Ok(resolved)
    }

    fn apply_project_file(&mut self, path: &Path) -> PinpointResult<()> {
        debug!("loading project config from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| {
            PinpointError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            PinpointError::config(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        let config: PinpointConfig = serde_json::from_value(value.clone()).map_err(|e| {
            PinpointError::config(format!("invalid config in {}: {}", path.display(), e))
        })?;

        let present = |pointer: &str| value.pointer(pointer).is_some();
        if present("/scan/ancestor_cap") {
            self.ancestor_cap = self.ancestor_cap.clone().merge(ConfigValue::new(
                config.scan.ancestor_cap,
                ConfigSource::ProjectConfig,
            ));
        }
        if present("/tracker/bounds_tolerance") {
            self.bounds_tolerance = self.bounds_tolerance.clone().merge(ConfigValue::new(
                config.tracker.bounds_tolerance,
                ConfigSource::ProjectConfig,
            ));
        }
        if present("/cache/base_confidence") {
            self.base_confidence = self.base_confidence.clone().merge(ConfigValue::new(
                config.cache.base_confidence,
                ConfigSource::ProjectConfig,
            ));
        }
        self.config = config;
        Ok(())
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> PinpointResult<()> {
        if let Some(value) = parse_env::<usize>(env, ENV_ANCESTOR_CAP)? {
            self.ancestor_cap = self
                .ancestor_cap
                .clone()
                .merge(ConfigValue::new(value, ConfigSource::EnvVar));
        }
        if let Some(value) = parse_env::<f64>(env, ENV_BOUNDS_TOLERANCE)? {
            self.bounds_tolerance = self
                .bounds_tolerance
                .clone()
                .merge(ConfigValue::new(value, ConfigSource::EnvVar));
        }
        if let Some(value) = parse_env::<f64>(env, ENV_BASE_CONFIDENCE)? {
            self.base_confidence = self
                .base_confidence
                .clone()
                .merge(ConfigValue::new(value, ConfigSource::EnvVar));
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(value) = overrides.ancestor_cap {
            self.ancestor_cap = self
                .ancestor_cap
                .clone()
                .merge(ConfigValue::new(value, ConfigSource::CliFlag));
        }
        if let Some(value) = overrides.bounds_tolerance {
            self.bounds_tolerance = self
                .bounds_tolerance
                .clone()
                .merge(ConfigValue::new(value, ConfigSource::CliFlag));
        }
        if let Some(value) = overrides.base_confidence {
            self.base_confidence = self
                .base_confidence
                .clone()
                .merge(ConfigValue::new(value, ConfigSource::CliFlag));
        }
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> PinpointResult<Option<T>> {
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| PinpointError::config(format!("{} has invalid value '{}'", key, raw))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    mod defaults {
        use super::*;

        #[test]
        fn defaults_match_documented_values() {
            let config = PinpointConfig::default();
            assert_eq!(config.scan.ancestor_cap, 10);
            assert_eq!(config.scan.snippet_max_chars, 120);
            assert_eq!(config.cache.base_confidence, 0.9);
            assert_eq!(config.tracker.bounds_tolerance, 1.0);
            assert_eq!(config.resolver.corner_min, 12.0);
            assert_eq!(config.resolver.corner_max, 24.0);
            assert!(config.validate().is_ok());
        }

        #[test]
        fn partial_json_keeps_other_defaults() {
            let config: PinpointConfig =
                serde_json::from_str(r#"{"resolver": {"corner_min": 8.0}}"#).unwrap();
            assert_eq!(config.resolver.corner_min, 8.0);
            assert_eq!(config.resolver.corner_max, 24.0);
            assert_eq!(config.scan, ScanConfig::default());
        }

        #[test]
        fn validate_rejects_negative_tolerance() {
            let mut config = PinpointConfig::default();
            config.tracker.bounds_tolerance = -1.0;
            assert!(matches!(
                config.validate(),
                Err(PinpointError::Config { .. })
            ));
        }
    }

    mod precedence {
        use super::*;

        #[test]
        fn merge_prefers_higher_source() {
            let default = ConfigValue::new(1, ConfigSource::Default);
            let cli = ConfigValue::new(2, ConfigSource::CliFlag);
            assert_eq!(default.clone().merge(cli.clone()).value, 2);
            assert_eq!(cli.merge(default).value, 2);
        }

        #[test]
        fn no_sources_yields_defaults() {
            let resolved =
                ResolvedConfig::resolve_with_env(None, &ConfigOverrides::default(), no_env)
                    .unwrap();
            assert_eq!(resolved.ancestor_cap.source, ConfigSource::Default);
            assert_eq!(resolved.config, PinpointConfig::default());
        }

        #[test]
        fn project_file_then_env_then_cli() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(
                dir.path().join(PROJECT_CONFIG_FILE),
                r#"{"scan": {"ancestor_cap": 4}, "tracker": {"bounds_tolerance": 2.5}}"#,
            )
            .unwrap();

            let env = |key: &str| (key == ENV_BOUNDS_TOLERANCE).then(|| "3.0".to_string());
            let overrides = ConfigOverrides {
                base_confidence: Some(0.7),
                ..Default::default()
            };
            let resolved =
                ResolvedConfig::resolve_with_env(Some(dir.path()), &overrides, env).unwrap();

            assert_eq!(resolved.ancestor_cap.value, 4);
            assert_eq!(resolved.ancestor_cap.source, ConfigSource::ProjectConfig);
            assert_eq!(resolved.bounds_tolerance.value, 3.0);
            assert_eq!(resolved.bounds_tolerance.source, ConfigSource::EnvVar);
            assert_eq!(resolved.base_confidence.value, 0.7);
            assert_eq!(resolved.base_confidence.source, ConfigSource::CliFlag);
            assert_eq!(resolved.config.scan.ancestor_cap, 4);
            assert_eq!(resolved.config.tracker.bounds_tolerance, 3.0);
            assert_eq!(resolved.config.cache.base_confidence, 0.7);
        }

        #[test]
        fn bad_env_value_is_config_error() {
            let env = |key: &str| (key == ENV_ANCESTOR_CAP).then(|| "ten".to_string());
            let err = ResolvedConfig::resolve_with_env(None, &ConfigOverrides::default(), env)
                .unwrap_err();
            assert!(err.to_string().contains(ENV_ANCESTOR_CAP));
        }

        #[test]
        fn absurd_env_ancestor_cap_is_rejected() {
            let env =
                |key: &str| (key == ENV_ANCESTOR_CAP).then(|| "1000000000000".to_string());
            let err = ResolvedConfig::resolve_with_env(None, &ConfigOverrides::default(), env)
                .unwrap_err();
            assert!(matches!(err, PinpointError::Config { .. }));
            assert!(err.to_string().contains("scan.ancestor_cap"));
        }

        #[test]
        fn malformed_project_file_is_config_error() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join(PROJECT_CONFIG_FILE), "{ not json").unwrap();
            let err = ResolvedConfig::resolve_with_env(
                Some(dir.path()),
                &ConfigOverrides::default(),
                no_env,
            )
            .unwrap_err();
            assert!(matches!(err, PinpointError::Config { .. }));
        }
    }
}
