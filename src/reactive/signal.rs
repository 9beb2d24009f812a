//! Signals - reactive value cells.
//!
//! Reading a signal while an effect runs subscribes that effect. Writing a
//! value that differs from the current one (under the signal's equality)
//! re-runs every subscriber, synchronously and in subscription order.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::{active_effect, schedule, EffectId, EffectInner, Source};

struct SignalInner<T> {
    value: RefCell<T>,
    equals: fn(&T, &T) -> bool,
    subscribers: RefCell<Vec<(EffectId, Weak<EffectInner>)>>,
}

impl<T> Source for SignalInner<T> {
    fn unsubscribe(&self, effect: EffectId) {
        self.subscribers.borrow_mut().retain(|(id, _)| *id != effect);
    }
}

/// A reactive value. Cloning shares the same cell.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

/// Create a signal compared with `PartialEq`.
pub fn signal<T: PartialEq + 'static>(initial: T) -> Signal<T> {
    signal_with_equals(initial, |a, b| a == b)
}

/// Create a signal with a custom equality check.
pub fn signal_with_equals<T: 'static>(initial: T, equals: fn(&T, &T) -> bool) -> Signal<T> {
    Signal {
        inner: Rc::new(SignalInner {
            value: RefCell::new(initial),
            equals,
            subscribers: RefCell::new(Vec::new()),
        }),
    }
}

impl<T: 'static> Signal<T> {
    /// Read the value, subscribing the running effect.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Borrow the value, subscribing the running effect.
    ///
    /// `f` must not write to this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Read the value without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Write a value. Subscribers re-run only when it changed.
    pub fn set(&self, value: T) {
        let changed = {
            let mut current = self.inner.value.borrow_mut();
            if (self.inner.equals)(&current, &value) {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Modify a copy of the value and write it back.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let mut next = self.peek();
        f(&mut next);
        self.set(next);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn track(&self) {
        let Some(effect) = active_effect() else {
            return;
        };

        let added = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            if subscribers.iter().any(|(id, _)| *id == effect.id()) {
                false
            } else {
                subscribers.push((effect.id(), Rc::downgrade(&effect)));
                true
            }
        };

        if added {
            let weak = Rc::downgrade(&self.inner);
            let source: Weak<dyn Source> = weak;
            effect.add_source(source);
        }
    }

    fn notify(&self) {
        let effects: Vec<Rc<EffectInner>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .filter_map(|(_, effect)| effect.upgrade())
            .collect();
        schedule(effects);
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.inner.value.borrow()).finish()
    }
}
