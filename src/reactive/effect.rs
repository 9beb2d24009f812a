//! Effects - re-runnable units subscribed to the signals they read.
//!
//! Every run starts by unsubscribing from all sources of the previous run,
//! so the dependency set always matches exactly what the latest run read.
//!
//! Effects live in a thread-local arena until disposed. Signals only keep
//! weak references to their subscribers.
//!
//! # Re-entrancy
//!
//! An effect notified while it is running does not recurse. It moves to
//! [`EffectState::Suppressed`] and runs once more after the current run
//! returns. Chains of follow-up runs are capped by the rerun limit; hitting
//! it stops the effect for this notification and reports an error.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::log::{report, LogLevel};
use crate::primitives::Cleanup;

use super::batch;

/// Follow-up runs allowed for one notification before the effect is stopped.
pub const DEFAULT_RERUN_LIMIT: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

/// Run state of an effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectState {
    /// Not running.
    #[default]
    Idle,
    /// Currently executing its function.
    Running,
    /// Notified while running; one follow-up run is pending.
    Suppressed,
}

/// Something an effect can be subscribed to.
pub(crate) trait Source {
    fn unsubscribe(&self, effect: EffectId);
}

pub(crate) struct EffectInner {
    id: EffectId,
    run_fn: RefCell<Option<Box<dyn FnMut()>>>,
    sources: RefCell<Vec<Weak<dyn Source>>>,
    state: Cell<EffectState>,
    disposed: Cell<bool>,
    runs: Cell<u64>,
}

// =============================================================================
// Runtime State
// =============================================================================

thread_local! {
    /// Arena owning every live effect.
    static EFFECTS: RefCell<HashMap<EffectId, Rc<EffectInner>>> = RefCell::new(HashMap::new());

    /// Stack of effects currently running. `None` entries come from `untrack`.
    static ACTIVE: RefCell<Vec<Option<Rc<EffectInner>>>> = const { RefCell::new(Vec::new()) };

    static NEXT_EFFECT_ID: Cell<u64> = const { Cell::new(0) };

    static RERUN_LIMIT: Cell<u32> = const { Cell::new(DEFAULT_RERUN_LIMIT) };
}

/// The effect that reads should subscribe, if any.
pub(crate) fn active_effect() -> Option<Rc<EffectInner>> {
    ACTIVE.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Set the follow-up run cap for effects on this thread.
pub fn set_rerun_limit(limit: u32) {
    RERUN_LIMIT.with(|l| l.set(limit));
}

pub fn rerun_limit() -> u32 {
    RERUN_LIMIT.with(|l| l.get())
}

/// Number of effects created and not yet disposed on this thread.
pub fn live_effect_count() -> usize {
    EFFECTS.with(|arena| arena.borrow().len())
}

/// Run `f` without subscribing the running effect to anything it reads.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    ACTIVE.with(|stack| stack.borrow_mut().push(None));
    let _guard = PopActive;
    f()
}

struct PopActive;

impl Drop for PopActive {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run notified effects now, or queue them when inside a batch.
pub(crate) fn schedule(effects: Vec<Rc<EffectInner>>) {
    if batch::is_batching() {
        batch::enqueue(effects);
        return;
    }
    for effect in effects {
        effect.run();
    }
}

// =============================================================================
// Effect Internals
// =============================================================================

impl EffectInner {
    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn add_source(&self, source: Weak<dyn Source>) {
        self.sources.borrow_mut().push(source);
    }

    pub(crate) fn run(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }
        match self.state.get() {
            EffectState::Running => {
                self.state.set(EffectState::Suppressed);
                return;
            }
            EffectState::Suppressed => return,
            EffectState::Idle => {}
        }

        let limit = rerun_limit();
        let mut reruns = 0u32;
        loop {
            self.execute();
            if self.disposed.get() || self.state.get() != EffectState::Suppressed {
                break;
            }
            if reruns >= limit {
                self.state.set(EffectState::Idle);
                report(
                    LogLevel::Error,
                    "effect rerun limit exceeded, possible dependency cycle",
                    (self.id, limit),
                );
                break;
            }
            reruns += 1;
        }
    }

    fn execute(self: &Rc<Self>) {
        self.clear_sources();

        let Some(f) = self.run_fn.borrow_mut().take() else {
            return;
        };

        self.state.set(EffectState::Running);
        self.runs.set(self.runs.get() + 1);
        ACTIVE.with(|stack| stack.borrow_mut().push(Some(self.clone())));

        let mut guard = RunGuard {
            effect: self,
            f: Some(f),
        };
        if let Some(f) = guard.f.as_mut() {
            f();
        }
    }

    fn clear_sources(&self) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(self.id);
            }
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.clear_sources();
        self.state.set(EffectState::Idle);

        // Captured values may dispose other effects when dropped, so nothing
        // stays borrowed while they go.
        let f = self.run_fn.borrow_mut().take();
        let owned = EFFECTS.with(|arena| arena.borrow_mut().remove(&self.id));
        drop(f);
        drop(owned);
    }
}

/// Restores runtime state after a run, including when the run panics.
struct RunGuard<'a> {
    effect: &'a Rc<EffectInner>,
    f: Option<Box<dyn FnMut()>>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });

        if self.effect.state.get() == EffectState::Running {
            self.effect.state.set(EffectState::Idle);
        }

        if !self.effect.disposed.get() {
            *self.effect.run_fn.borrow_mut() = self.f.take();
        }
    }
}

// =============================================================================
// Public Handle
// =============================================================================

/// Handle to an effect. Cloning shares the same effect.
///
/// Dropping the handle does not stop the effect; call [`Effect::dispose`].
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

/// Create an effect and run it immediately to collect its dependencies.
pub fn effect(f: impl FnMut() + 'static) -> Effect {
    let id = NEXT_EFFECT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        EffectId(id)
    });

    let inner = Rc::new(EffectInner {
        id,
        run_fn: RefCell::new(Some(Box::new(f))),
        sources: RefCell::new(Vec::new()),
        state: Cell::new(EffectState::Idle),
        disposed: Cell::new(false),
        runs: Cell::new(0),
    });

    EFFECTS.with(|arena| {
        arena.borrow_mut().insert(id, inner.clone());
    });

    inner.run();
    Effect { inner }
}

impl Effect {
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Unsubscribe from every source and drop the effect function.
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn state(&self) -> EffectState {
        self.inner.state.get()
    }

    /// How many times the effect function has executed.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Number of sources read during the latest run.
    pub fn source_count(&self) -> usize {
        self.inner.sources.borrow().len()
    }

    pub fn into_cleanup(self) -> Cleanup {
        Box::new(move || self.dispose())
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}
