//! Event wiring between templates and the handler registry.
//!
//! - [`delegation`] - one root listener per event type, resolved at dispatch
//! - [`direct`] - per-element listeners for markers outside delegation

pub mod delegation;
pub mod direct;

pub use delegation::{collect_event_attrs, setup_event_delegation, AttrRef};
pub use direct::{bind_events, bind_events_in_range, elements_in_range};
