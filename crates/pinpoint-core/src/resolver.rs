//! Spatial specificity: which of the nested elements under a click was meant.
//!
//! A hit-test yields every element containing the click point, innermost
//! first. [`SpecificityResolver`] drops structural plumbing, scores the rest
//! by size, click proximity to center and a semantic bonus, and applies the
//! corner-zone rule: a click close to two adjacent edges of the top
//! candidate selects the runner-up (its container) instead.
//!
//! Scores are only meaningful for ranking within one call.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ResolverConfig;
use crate::geometry::{Point, Rect};
use crate::types::ElementId;

// ============================================================================
// Types
// ============================================================================

/// One entry of a hit-test path as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitEntry {
    pub id: ElementId,
    /// Bounds in global coordinates.
    pub bounds: Rect,
    pub type_name: String,
}

impl HitEntry {
    pub fn new(id: ElementId, bounds: Rect, type_name: impl Into<String>) -> Self {
        HitEntry {
            id,
            bounds,
            type_name: type_name.into(),
        }
    }
}

/// A scored, selectable hit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ElementId,
    pub bounds: Rect,
    pub type_name: String,
    pub score: f64,
}

/// Result of [`SpecificityResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub candidate: Candidate,
    /// The click sat in a corner of the top candidate and its container was
    /// chosen instead.
    pub corner_redirected: bool,
}

// ============================================================================
// Resolver
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SpecificityResolver {
    config: ResolverConfig,
}

impl SpecificityResolver {
    pub fn new(config: ResolverConfig) -> Self {
        SpecificityResolver { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Whether a type name is plumbing that is never user-selectable.
    pub fn is_internal(&self, type_name: &str) -> bool {
        let prefix = self.config.private_prefix.as_str();
        (!prefix.is_empty() && type_name.starts_with(prefix))
            || self.config.internal.iter().any(|name| name == type_name)
    }

    /// Specificity score of `bounds` for a global click point.
    pub fn score(&self, bounds: &Rect, type_name: &str, click: Point) -> f64 {
        let config = &self.config;

        let area = bounds.area();
        let area_score = if area > 0.0 {
            config.area_numerator / (area + 1.0)
        } else {
            0.0
        };

        let center = bounds.local_center();
        let center_dist = bounds.to_local(click).distance(center);
        let max_dist = Point::default().distance(center);
        let center_score = if max_dist > 0.0 {
            1.0 - (center_dist / max_dist).clamp(0.0, 1.0)
        } else {
            1.0
        };

        let semantic = if config.user_facing.iter().any(|name| name == type_name) {
            config.semantic_bonus
        } else {
            0.0
        };

        area_score * config.area_weight + center_score * config.center_weight + semantic
    }

    /// Score and rank the selectable entries of `hit_path`, best first.
    ///
    /// Equal scores keep hit-path order (innermost first).
    pub fn rank(&self, hit_path: &[HitEntry], click: Point) -> Vec<Candidate> {
        let mut ranked: Vec<Candidate> = hit_path
            .iter()
            .filter(|entry| {
                let skip = self.is_internal(&entry.type_name);
                if skip {
                    trace!("skipping internal {}", entry.type_name);
                }
                !skip
            })
            .map(|entry| Candidate {
                id: entry.id,
                bounds: entry.bounds,
                type_name: entry.type_name.clone(),
                score: self.score(&entry.bounds, &entry.type_name, click),
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Size of the corner zone of `bounds`.
    pub fn corner_zone(&self, bounds: &Rect) -> f64 {
        let config = &self.config;
        // An inverted min/max pair resolves to corner_max instead of panicking.
        (config.corner_ratio * bounds.width.min(bounds.height))
            .max(config.corner_min)
            .min(config.corner_max)
    }

    /// Whether `click` lies within the corner zone of two adjacent edges.
    pub fn in_corner(&self, bounds: &Rect, click: Point) -> bool {
        let zone = self.corner_zone(bounds);
        let local = bounds.to_local(click);
        let near = |distance: f64| (0.0..=zone).contains(&distance);

        let horizontal = near(local.x) || near(bounds.width - local.x);
        let vertical = near(local.y) || near(bounds.height - local.y);
        horizontal && vertical
    }

    /// Pick the element the click meant.
    ///
    /// Returns the top-ranked candidate, or the second-ranked one flagged as
    /// corner-redirected when the click sits in a corner of the top one. A
    /// sole candidate is returned whatever the corner zone says.
    pub fn resolve(&self, hit_path: &[HitEntry], click: Point) -> Option<Selection> {
        let mut ranked = self.rank(hit_path, click).into_iter();
        let top = ranked.next()?;

        let redirect = if self.in_corner(&top.bounds, click) {
            ranked.next()
        } else {
            None
        };

        let selection = match redirect {
            Some(container) => {
                debug!(
                    "corner click on {} redirected to {}",
                    top.type_name, container.type_name
                );
                Selection {
                    candidate: container,
                    corner_redirected: true,
                }
            }
            None => Selection {
                candidate: top,
                corner_redirected: false,
            },
        };
        debug!(
            id = %selection.candidate.id,
            score = selection.candidate.score,
            "selected {}",
            selection.candidate.type_name
        );
        Some(selection)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, bounds: Rect, type_name: &str) -> HitEntry {
        HitEntry::new(ElementId(id), bounds, type_name)
    }

    mod scoring {
        use super::*;

        #[test]
        fn zero_area_scores_no_area_points() {
            let resolver = SpecificityResolver::default();
            let line = Rect::new(0.0, 0.0, 0.0, 10.0);
            let score = resolver.score(&line, "Divider", Point::new(0.0, 5.0));
            assert!(score.is_finite());
            assert!(score <= 0.3);
        }

        #[test]
        fn center_click_scores_full_center_points() {
            let resolver = SpecificityResolver::default();
            let bounds = Rect::new(100.0, 100.0, 200.0, 200.0);
            let at_center = resolver.score(&bounds, "Box", Point::new(200.0, 200.0));
            let at_corner = resolver.score(&bounds, "Box", Point::new(100.0, 100.0));
            assert!((at_center - at_corner - 0.3).abs() < 1e-9);
        }

        #[test]
        fn user_facing_types_get_bonus() {
            let resolver = SpecificityResolver::default();
            let bounds = Rect::new(0.0, 0.0, 50.0, 50.0);
            let click = Point::new(25.0, 25.0);
            let text = resolver.score(&bounds, "Text", click);
            let padding = resolver.score(&bounds, "Padding", click);
            assert!((text - padding - 0.2).abs() < 1e-9);
        }

        #[test]
        fn internal_and_private_names_are_skipped() {
            let resolver = SpecificityResolver::default();
            assert!(resolver.is_internal("Semantics"));
            assert!(resolver.is_internal("_InkFeatures"));
            assert!(!resolver.is_internal("Padding"));
        }
    }

    mod ranking {
        use super::*;

        #[test]
        fn smaller_element_ranks_first() {
            let resolver = SpecificityResolver::default();
            let path = vec![
                entry(1, Rect::new(45.0, 45.0, 10.0, 10.0), "Padding"),
                entry(2, Rect::new(0.0, 0.0, 100.0, 100.0), "Container"),
            ];
            let ranked = resolver.rank(&path, Point::new(50.0, 50.0));
            assert_eq!(ranked[0].id, ElementId(1));
            assert!(ranked[0].score > ranked[1].score);
        }

        #[test]
        fn equal_scores_keep_hit_path_order() {
            let resolver = SpecificityResolver::default();
            let bounds = Rect::new(0.0, 0.0, 80.0, 80.0);
            let path = vec![entry(7, bounds, "Align"), entry(8, bounds, "Center")];
            let ranked = resolver.rank(&path, Point::new(40.0, 40.0));
            let ids: Vec<_> = ranked.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![ElementId(7), ElementId(8)]);
        }

        #[test]
        fn filtered_entries_never_rank() {
            let resolver = SpecificityResolver::default();
            let path = vec![
                entry(1, Rect::new(0.0, 0.0, 10.0, 10.0), "_Private"),
                entry(2, Rect::new(0.0, 0.0, 10.0, 10.0), "Listener"),
            ];
            assert!(resolver.rank(&path, Point::new(5.0, 5.0)).is_empty());
            assert!(resolver.resolve(&path, Point::new(5.0, 5.0)).is_none());
        }
    }

    mod corners {
        use super::*;

        #[test]
        fn zone_is_clamped() {
            let resolver = SpecificityResolver::default();
            assert_eq!(resolver.corner_zone(&Rect::new(0.0, 0.0, 10.0, 10.0)), 12.0);
            assert_eq!(resolver.corner_zone(&Rect::new(0.0, 0.0, 100.0, 400.0)), 15.0);
            assert_eq!(resolver.corner_zone(&Rect::new(0.0, 0.0, 1000.0, 1000.0)), 24.0);
        }

        #[test]
        fn inverted_bounds_do_not_panic() {
            let resolver = SpecificityResolver::new(ResolverConfig {
                corner_min: 30.0,
                corner_max: 24.0,
                ..ResolverConfig::default()
            });
            assert_eq!(resolver.corner_zone(&Rect::new(0.0, 0.0, 10.0, 10.0)), 24.0);
            let path = vec![
                entry(1, Rect::new(50.0, 50.0, 100.0, 100.0), "Text"),
                entry(2, Rect::new(0.0, 0.0, 400.0, 400.0), "Card"),
            ];
            let selection = resolver.resolve(&path, Point::new(55.0, 55.0)).unwrap();
            assert_eq!(selection.candidate.id, ElementId(2));
            assert!(selection.corner_redirected);
        }

        #[test]
        fn corner_needs_two_adjacent_edges() {
            let resolver = SpecificityResolver::default();
            let bounds = Rect::new(0.0, 0.0, 200.0, 200.0);
            assert!(resolver.in_corner(&bounds, Point::new(5.0, 5.0)));
            assert!(resolver.in_corner(&bounds, Point::new(195.0, 195.0)));
            assert!(resolver.in_corner(&bounds, Point::new(195.0, 3.0)));
            assert!(!resolver.in_corner(&bounds, Point::new(5.0, 100.0)));
            assert!(!resolver.in_corner(&bounds, Point::new(100.0, 100.0)));
        }

        #[test]
        fn corner_click_selects_container() {
            let resolver = SpecificityResolver::default();
            let path = vec![
                entry(1, Rect::new(50.0, 50.0, 100.0, 100.0), "Text"),
                entry(2, Rect::new(0.0, 0.0, 400.0, 400.0), "Card"),
            ];
            let selection = resolver.resolve(&path, Point::new(55.0, 55.0)).unwrap();
            assert_eq!(selection.candidate.id, ElementId(2));
            assert!(selection.corner_redirected);
        }

        #[test]
        fn sole_candidate_is_never_redirected() {
            let resolver = SpecificityResolver::default();
            let path = vec![entry(1, Rect::new(50.0, 50.0, 100.0, 100.0), "Text")];
            let selection = resolver.resolve(&path, Point::new(55.0, 55.0)).unwrap();
            assert_eq!(selection.candidate.id, ElementId(1));
            assert!(!selection.corner_redirected);
        }

        #[test]
        fn interior_click_keeps_top_candidate() {
            let resolver = SpecificityResolver::default();
            let path = vec![
                entry(1, Rect::new(50.0, 50.0, 100.0, 100.0), "Text"),
                entry(2, Rect::new(0.0, 0.0, 400.0, 400.0), "Card"),
            ];
            let selection = resolver.resolve(&path, Point::new(100.0, 100.0)).unwrap();
            assert_eq!(selection.candidate.id, ElementId(1));
            assert!(!selection.corner_redirected);
        }
    }
}
