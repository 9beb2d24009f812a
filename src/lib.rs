//! # spark-dom
//!
//! Fine-grained reactive binding engine for template-compiled web components.
//!
//! A template compiler turns markup into a DOM fragment with markers
//! (`data-on-click="3"`, `data-ref="0"`, `<!--t0-->...<!--//t0-->`) plus a
//! list of [`Binding`]s. This crate wires those markers to live state:
//! every binding becomes one effect that updates only the DOM it owns.
//!
//! ## Architecture
//!
//! ```text
//! Signal::set → Effect → update (untracked) → Dom
//!                  ↑
//!   setup_signals ─┘   setup_event_delegation → Router → EventRegistry
//! ```
//!
//! ## Modules
//!
//! - [`reactive`] - signals, effects, batching
//! - [`dom`] - the node arena the engine writes to, with event dispatch
//! - [`engine`] - component lifecycle, definitions, the handler registry
//! - [`events`] - event delegation and direct event binding
//! - [`primitives`] - binding dispatcher, list reconciler, ref resolver
//! - [`value`] - dynamic values flowing through bindings
//! - [`config`] - marker names and engine limits
//! - [`error`] - error types
//! - [`log`] - diagnostics reporting

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod events;
pub mod log;
pub mod primitives;
pub mod reactive;
pub mod value;

// Re-export commonly used items
pub use config::EngineConfig;
pub use error::{DomError, EngineError, Result};

pub use dom::{Dom, Event, EventPhase, ListenerOptions, NodeId, ShadowMode};

pub use engine::{
    current_component, mount_view, Component, ComponentDefinitions, EventRegistry, HandlerId,
    Propagation,
};

pub use events::{bind_events, bind_events_in_range, setup_event_delegation};

pub use primitives::{
    bind_signal_to_element, reconcile_arrays, setup_refs, setup_signals, Binding, Cleanup,
    CleanupList, ItemContext, ItemTemplate, RefMap, View,
};

pub use reactive::{batch, effect, signal, untrack, Effect, Signal};

pub use value::{ItemKey, KeyExtractor, Value};
