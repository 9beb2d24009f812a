//! Component engine - instances, definitions and the handler registry.
//!
//! - Registry: handler ids, per-component arenas, component id allocation
//! - Component: one instance with its root, props, cleanups and hooks
//! - Definitions: tag validation and deferred setup
//!
//! # Architecture
//!
//! ```text
//! ComponentDefinitions ──create──► Component ──owns──► CleanupList
//!         │                            │                  ├─ effect disposers
//!         └── Rc<EventRegistry> ◄──────┘                  └─ listener removals
//! ```

mod component;
mod define;
mod registry;

pub use component::{
    current_component, current_component_tag, with_current_component, Component, Hook, HookKind,
    Props, WeakComponent,
};
pub use define::{is_valid_tag_name, mount_view, ComponentDefinitions, SetupFn};
pub use registry::{ComponentId, EventHandler, EventRegistry, HandlerId, Propagation};
