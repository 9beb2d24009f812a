//! Engine configuration.
//!
//! Marker names must match what the template compiler emits. The defaults
//! are the ones the bundled compiler uses.

use crate::dom::ShadowMode;
use crate::reactive::DEFAULT_RERUN_LIMIT;

/// Configuration shared by every component created from one
/// [`ComponentDefinitions`](crate::engine::ComponentDefinitions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Event marker prefix. `data-on-click="3"` binds handler 3 to `click`.
    pub event_attr_prefix: String,
    /// Ref marker attribute. The value is the ref index.
    pub ref_attr: String,
    /// Prefix of the comment closing a region: `<!--x-->` ... `<!--//x-->`.
    pub region_end_prefix: String,
    /// Mode used when attaching a component's shadow root.
    pub shadow_mode: ShadowMode,
    /// Follow-up runs an effect may chain before it is stopped.
    ///
    /// The limit is per thread, not per definition set: building a
    /// [`ComponentDefinitions`](crate::engine::ComponentDefinitions) applies
    /// it to every effect on the thread, so the last one built wins.
    pub rerun_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_attr_prefix: "data-on".to_string(),
            ref_attr: "data-ref".to_string(),
            region_end_prefix: "//".to_string(),
            shadow_mode: ShadowMode::Open,
            rerun_limit: DEFAULT_RERUN_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_event_attr_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_attr_prefix = prefix.into();
        self
    }

    pub fn with_ref_attr(mut self, name: impl Into<String>) -> Self {
        self.ref_attr = name.into();
        self
    }

    pub fn with_region_end_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.region_end_prefix = prefix.into();
        self
    }

    pub fn with_shadow_mode(mut self, mode: ShadowMode) -> Self {
        self.shadow_mode = mode;
        self
    }

    pub fn with_rerun_limit(mut self, limit: u32) -> Self {
        self.rerun_limit = limit;
        self
    }

    /// Full marker attribute name for an event type (`data-on-click`).
    pub fn event_attr(&self, event_type: &str) -> String {
        format!("{}-{}", self.event_attr_prefix, event_type)
    }

    /// Event type encoded in a marker attribute name, if it is one.
    pub fn event_type_of<'a>(&self, attr_name: &'a str) -> Option<&'a str> {
        attr_name
            .strip_prefix(self.event_attr_prefix.as_str())?
            .strip_prefix('-')
            .filter(|event_type| !event_type.is_empty())
    }

    /// Comment value closing the region opened by `marker`.
    pub fn region_end(&self, marker: &str) -> String {
        format!("{}{}", self.region_end_prefix, marker)
    }
}
