//! Binding primitives - what turns a compiled view into live DOM.
//!
//! This module provides:
//! - [`bind`] - the binding dispatcher (`setup_signals`, `bind_signal_to_element`)
//! - [`text`] - text and expression regions between comment markers
//! - [`control_flow`] - the keyed list reconciler behind array bindings
//! - [`refs`] - one-shot ref resolution
//!
//! # Architecture
//!
//! Every binding becomes one effect. Its disposer goes into a
//! [`CleanupList`]: the component's own list for the mounted view, or the
//! list of a rendered item for bindings inside a list region. Disposing a
//! list item therefore releases exactly what it created.
//!
//! ```ignore
//! let view = View::new(fragment)
//!     .bind(Binding::attribute(title, "data-bind-0", "title"))
//!     .bind(Binding::array(items, "items", ItemTemplate::new(render_row)));
//! mount_view(&component, view)?;
//! ```

pub mod bind;
pub mod control_flow;
pub mod refs;
mod text;
mod types;

pub use bind::{bind_signal_to_element, setup_signals};
pub use control_flow::{reconcile_arrays, RenderedItem};
pub use refs::{collect_ref_attrs, setup_refs};
pub use types::*;
