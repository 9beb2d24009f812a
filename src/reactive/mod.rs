//! Reactive primitives - signals, effects, batching.
//!
//! No DOM knowledge lives here. Re-runs are synchronous and depth-first:
//! every changed write runs its subscribers before `set` returns, unless the
//! caller wraps the writes in [`batch`].
//!
//! ```ignore
//! use spark_dom::reactive::{effect, signal};
//!
//! let count = signal(0);
//! let count_clone = count.clone();
//! let e = effect(move || println!("count = {}", count_clone.get()));
//!
//! count.set(1); // prints "count = 1"
//! e.dispose();
//! count.set(2); // nothing
//! ```

mod batch;
mod effect;
mod signal;

pub use batch::{batch, is_batching};
pub use effect::{
    effect, live_effect_count, rerun_limit, set_rerun_limit, untrack, Effect, EffectId,
    EffectState, DEFAULT_RERUN_LIMIT,
};
pub use signal::{signal, signal_with_equals, Signal};
