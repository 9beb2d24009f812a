//! Explicit batching.
//!
//! Writes inside [`batch`] queue their subscribers instead of running them.
//! Each queued effect runs once when the outermost batch returns.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::effect::EffectInner;

thread_local! {
    static BATCH_DEPTH: Cell<u32> = const { Cell::new(0) };
    static PENDING: RefCell<Vec<Rc<EffectInner>>> = const { RefCell::new(Vec::new()) };
}

pub fn is_batching() -> bool {
    BATCH_DEPTH.with(|d| d.get() > 0)
}

pub(crate) fn enqueue(effects: Vec<Rc<EffectInner>>) {
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        for effect in effects {
            if !pending.iter().any(|queued| queued.id() == effect.id()) {
                pending.push(effect);
            }
        }
    });
}

/// Run `f`, deferring effect re-runs until it returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let result = {
        let _depth = BatchDepth::enter();
        f()
    };
    if !is_batching() {
        flush();
    }
    result
}

fn flush() {
    loop {
        let next = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        if next.is_empty() {
            break;
        }
        for effect in next {
            effect.run();
        }
    }
}

struct BatchDepth;

impl BatchDepth {
    fn enter() -> Self {
        BATCH_DEPTH.with(|d| d.set(d.get() + 1));
        Self
    }
}

impl Drop for BatchDepth {
    fn drop(&mut self) {
        BATCH_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
