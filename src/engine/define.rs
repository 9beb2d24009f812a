//! Component definitions - tag registration and deferred setup.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::dom::Dom;
use crate::error::{EngineError, Result};
use crate::events::{collect_event_attrs, setup_event_delegation};
use crate::log::{report, LogLevel};
use crate::primitives::{collect_ref_attrs, setup_refs, setup_signals, View};
use crate::reactive::set_rerun_limit;

use super::component::{with_current_component, Component, HookKind};
use super::registry::EventRegistry;

/// Builds a component's view. Runs once per instance, inside the setup
/// microtask. Returning `None` mounts nothing.
pub type SetupFn = Rc<dyn Fn(&Component) -> Option<View>>;

/// Tag names: lowercase ASCII letter, then lowercase letters, digits or `-`.
pub fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// The set of defined component tags for one document.
pub struct ComponentDefinitions {
    dom: Dom,
    registry: Rc<EventRegistry>,
    config: Rc<EngineConfig>,
    setups: RefCell<HashMap<String, SetupFn>>,
}

impl ComponentDefinitions {
    pub fn new(dom: &Dom, config: EngineConfig) -> Self {
        Self::with_registry(dom, config, Rc::new(EventRegistry::new()))
    }

    /// Share a registry between several definition sets.
    ///
    /// Applies `config.rerun_limit` to the whole thread.
    pub fn with_registry(dom: &Dom, config: EngineConfig, registry: Rc<EventRegistry>) -> Self {
        set_rerun_limit(config.rerun_limit);
        Self {
            dom: dom.clone(),
            registry,
            config: Rc::new(config),
            setups: RefCell::new(HashMap::new()),
        }
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn registry(&self) -> &Rc<EventRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register `setup` under `tag`.
    ///
    /// Invalid names are reported at error level, duplicates at warn level.
    /// Both leave the existing definitions untouched.
    pub fn define<F>(&self, tag: &str, setup: F) -> Result<()>
    where
        F: Fn(&Component) -> Option<View> + 'static,
    {
        if !is_valid_tag_name(tag) {
            report(LogLevel::Error, &format!("Invalid tag name: {tag}"), tag);
            return Err(EngineError::InvalidTagName {
                tag: tag.to_string(),
            });
        }
        if self.is_defined(tag) {
            report(LogLevel::Warn, &format!("{tag} already registered"), tag);
            return Err(EngineError::AlreadyRegistered {
                tag: tag.to_string(),
            });
        }

        self.setups
            .borrow_mut()
            .insert(tag.to_string(), Rc::new(setup));
        tracing::debug!(tag, "component defined");
        Ok(())
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.setups.borrow().contains_key(tag)
    }

    /// Construct an instance of `tag`. Setup runs at the next microtask
    /// checkpoint, unless the instance is destroyed first.
    pub fn create(&self, tag: &str) -> Result<Component> {
        let setup = self
            .setups
            .borrow()
            .get(tag)
            .cloned()
            .ok_or_else(|| EngineError::UnknownComponent {
                tag: tag.to_string(),
            })?;

        let host = self.dom.create_element(tag);
        let component = Component::new(&self.dom, host, self.registry.clone(), self.config.clone())?;

        let weak = component.downgrade();
        self.dom.queue_microtask(move || {
            let Some(component) = weak.upgrade() else {
                return;
            };
            if component.is_destroyed() {
                tracing::debug!(id = %component.id(), "skipping setup of destroyed component");
                return;
            }
            initialize(&component, &setup);
        });

        Ok(component)
    }
}

impl fmt::Debug for ComponentDefinitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<String> = self.setups.borrow().keys().cloned().collect();
        tags.sort();
        f.debug_struct("ComponentDefinitions")
            .field("tags", &tags)
            .field("registry", &self.registry)
            .finish()
    }
}

fn initialize(component: &Component, setup: &SetupFn) {
    with_current_component(component, || {
        component.init_dispatch();

        if let Some(view) = setup(component) {
            if let Err(err) = mount_view(component, view) {
                report(LogLevel::Error, "failed to mount view", err);
            }
        }

        component.mark_initialized();
    });
    component.run_hooks(HookKind::BeforeMount);
}

/// Move `view` into the component's root and wire it up: event
/// delegation, signal bindings, then refs.
pub fn mount_view(component: &Component, view: View) -> Result<()> {
    let root = component.root()?;
    let dom = component.dom();
    let config = component.config();

    let event_attrs = collect_event_attrs(dom, view.fragment, config);
    let ref_attrs = collect_ref_attrs(dom, view.fragment, &config.ref_attr);

    dom.append_child(root, view.fragment)?;

    setup_event_delegation(component, &event_attrs)?;
    setup_signals(component, root, view.bindings, component.cleanups());
    setup_refs(dom, Some(ref_attrs.as_slice()), view.refs.as_ref());
    Ok(())
}
