//! Per-session sibling indices for elements sharing a type name.
//!
//! Registration order within one inspection session is the sibling index:
//! the third `Text` registered is `Text#2`. Instances can be looked up again
//! by identity, or by bounds within a tolerance when the host rebuilt the
//! element and its identity changed but its position did not.
//!
//! Bounds go stale as soon as the host re-lays-out, so every sweep over the
//! element tree starts from a cleared tracker ([`InstanceTracker::register_session`]
//! does this itself).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::TrackerConfig;
use crate::geometry::Rect;
use crate::types::ElementId;

// ============================================================================
// Element Walking
// ============================================================================

/// One live element as reported by the host's element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub type_name: String,
    pub id: ElementId,
    pub bounds: Rect,
}

impl ElementRecord {
    pub fn new(type_name: impl Into<String>, id: ElementId, bounds: Rect) -> Self {
        ElementRecord {
            type_name: type_name.into(),
            id,
            bounds,
        }
    }
}

/// Visits live elements in tree order.
pub trait ElementWalker {
    fn walk(&self, visit: &mut dyn FnMut(&ElementRecord));
}

impl ElementWalker for [ElementRecord] {
    fn walk(&self, visit: &mut dyn FnMut(&ElementRecord)) {
        for record in self {
            visit(record);
        }
    }
}

impl ElementWalker for Vec<ElementRecord> {
    fn walk(&self, visit: &mut dyn FnMut(&ElementRecord)) {
        self.as_slice().walk(visit);
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// How to find a previously registered instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstanceKey {
    /// Exact identity.
    Identity(ElementId),
    /// Bounds equal within the tracker's tolerance on all four edges.
    Bounds(Rect),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedInstance {
    pub id: ElementId,
    pub bounds: Rect,
    /// Session-wide registration counter at insertion.
    pub registration_order: usize,
}

#[derive(Debug, Clone)]
pub struct InstanceTracker {
    by_type: HashMap<String, Vec<TrackedInstance>>,
    next_order: usize,
    tolerance: f64,
}

impl Default for InstanceTracker {
    fn default() -> Self {
        InstanceTracker::new(&TrackerConfig::default())
    }
}

impl InstanceTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        InstanceTracker::with_tolerance(config.bounds_tolerance)
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        InstanceTracker {
            by_type: HashMap::new(),
            next_order: 0,
            tolerance,
        }
    }

    /// Forget every registered instance and reset the counter.
    pub fn clear(&mut self) {
        debug!("clearing {} tracked instances", self.len());
        self.by_type.clear();
        self.next_order = 0;
    }

    /// Number of registered instances across all types.
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Register an instance and return its sibling index.
    ///
    /// Re-registering a known identity keeps its index and refreshes its
    /// bounds.
    pub fn register(&mut self, type_name: &str, id: ElementId, bounds: Rect) -> usize {
        let siblings = self.by_type.entry(type_name.to_string()).or_default();
        if let Some(index) = siblings.iter().position(|known| known.id == id) {
            siblings[index].bounds = bounds;
            return index;
        }

        siblings.push(TrackedInstance {
            id,
            bounds,
            registration_order: self.next_order,
        });
        self.next_order += 1;
        let index = siblings.len() - 1;
        trace!("registered {}#{} as {}", type_name, index, id);
        index
    }

    /// Start a fresh session: clear, then register every element `walker`
    /// visits. Returns the number of instances tracked afterwards.
    pub fn register_session<W: ElementWalker + ?Sized>(&mut self, walker: &W) -> usize {
        self.clear();
        walker.walk(&mut |record: &ElementRecord| {
            self.register(&record.type_name, record.id, record.bounds);
        });
        debug!("session registered {} instances", self.len());
        self.len()
    }

    /// Sibling index of the instance matching `key`, if registered.
    pub fn sibling_index(&self, type_name: &str, key: &InstanceKey) -> Option<usize> {
        let siblings = self.by_type.get(type_name)?;
        match key {
            InstanceKey::Identity(id) => siblings.iter().position(|known| known.id == *id),
            InstanceKey::Bounds(bounds) => siblings
                .iter()
                .position(|known| known.bounds.approx_eq(bounds, self.tolerance)),
        }
    }

    /// `"<TypeName>#<siblingIndex>"` for the instance matching `key`.
    pub fn identity_key(&self, type_name: &str, key: &InstanceKey) -> Option<String> {
        self.sibling_index(type_name, key)
            .map(|index| format!("{}#{}", type_name, index))
    }

    /// Registered instances of `type_name` in sibling order.
    pub fn instances(&self, type_name: &str) -> &[TrackedInstance] {
        self.by_type
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
