//! Event dispatch
//!
//! Per-node event dispatchers with capture-then-bubble propagation along
//! the parent chain. Dispatchers are created lazily on first use.

use std::fmt;
use std::rc::Rc;

use crate::{Graph, NodeId, PropertyValue};

/// Propagation phase of an in-flight event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Capture,
    AtTarget,
    Bubble,
}

/// An event travelling through the graph.
pub struct GraphEvent {
    pub name: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub phase: EventPhase,
    /// Optional payload.
    pub detail: Option<PropertyValue>,
    propagation_stopped: bool,
}

impl GraphEvent {
    pub fn new(name: &str, target: NodeId) -> Self {
        Self {
            name: name.to_string(),
            target,
            current_target: target,
            phase: EventPhase::AtTarget,
            detail: None,
            propagation_stopped: false,
        }
    }

    pub fn with_detail(mut self, detail: PropertyValue) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Stop the event from reaching any further node.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Debug for GraphEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEvent")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("phase", &self.phase)
            .field("stopped", &self.propagation_stopped)
            .finish()
    }
}

/// Handler invoked with the in-flight event.
pub type EventHandler = Rc<dyn Fn(&mut GraphEvent)>;

/// Handler lists for one event name on one node.
#[derive(Default)]
pub struct EventDispatcher {
    capture: Vec<EventHandler>,
    bubble: Vec<EventHandler>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, handler: EventHandler) {
        self.bubble.push(handler);
    }

    pub fn add_capture_listener(&mut self, handler: EventHandler) {
        self.capture.push(handler);
    }

    /// Remove a previously registered handler (pointer identity).
    pub fn remove_listener(&mut self, handler: &EventHandler) -> bool {
        let before = self.capture.len() + self.bubble.len();
        self.capture.retain(|h| !Rc::ptr_eq(h, handler));
        self.bubble.retain(|h| !Rc::ptr_eq(h, handler));
        before != self.capture.len() + self.bubble.len()
    }

    pub fn remove_all_listeners(&mut self) {
        self.capture.clear();
        self.bubble.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.capture.is_empty() && self.bubble.is_empty()
    }

    fn handlers_for(&self, phase: EventPhase) -> Vec<EventHandler> {
        match phase {
            EventPhase::Capture => self.capture.clone(),
            EventPhase::Bubble => self.bubble.clone(),
            // At the target both lists run, capture handlers first.
            EventPhase::AtTarget => {
                let mut all = self.capture.clone();
                all.extend(self.bubble.iter().cloned());
                all
            }
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("capture", &self.capture.len())
            .field("bubble", &self.bubble.len())
            .finish()
    }
}

impl Graph {
    /// Attach a bubble-phase handler, creating the dispatcher lazily.
    pub fn on(&mut self, id: NodeId, event: &str, handler: EventHandler) {
        if let Some(node) = self.get_mut(id) {
            node.events
                .entry(event.to_string())
                .or_default()
                .add_listener(handler);
        }
    }

    /// Attach a capture-phase handler.
    pub fn on_capture(&mut self, id: NodeId, event: &str, handler: EventHandler) {
        if let Some(node) = self.get_mut(id) {
            node.events
                .entry(event.to_string())
                .or_default()
                .add_capture_listener(handler);
        }
    }

    /// Detach a handler. Returns whether anything was removed.
    pub fn off(&mut self, id: NodeId, event: &str, handler: &EventHandler) -> bool {
        match self.get_mut(id) {
            Some(node) => match node.events.get_mut(event) {
                Some(d) => d.remove_listener(handler),
                None => false,
            },
            None => false,
        }
    }

    /// Drop every handler for one event name on one node.
    pub fn clear_handlers(&mut self, id: NodeId, event: &str) {
        if let Some(node) = self.get_mut(id) {
            if let Some(d) = node.events.get_mut(event) {
                d.remove_all_listeners();
            }
        }
    }

    /// Dispatch an event at `target`: capture from the root down, fire at
    /// the target, then bubble back up. Propagation stops as soon as a
    /// handler calls `stop_propagation`.
    pub fn dispatch(&self, target: NodeId, event: &mut GraphEvent) {
        if self.get(target).is_none() {
            return;
        }
        // Path from root to target.
        let mut path = Vec::new();
        let mut cur = target;
        while !cur.is_none() {
            path.push(cur);
            cur = match self.get(cur) {
                Some(n) => n.parent,
                None => NodeId::NONE,
            };
        }
        path.reverse();

        // Capture phase: ancestors, root first.
        for &node in path.iter().take(path.len().saturating_sub(1)) {
            self.fire_phase(node, event, EventPhase::Capture);
            if event.is_propagation_stopped() {
                return;
            }
        }

        self.fire_phase(target, event, EventPhase::AtTarget);
        if event.is_propagation_stopped() {
            return;
        }

        // Bubble phase: ancestors, target's parent first.
        for &node in path.iter().rev().skip(1) {
            self.fire_phase(node, event, EventPhase::Bubble);
            if event.is_propagation_stopped() {
                return;
            }
        }
    }

    fn fire_phase(&self, id: NodeId, event: &mut GraphEvent, phase: EventPhase) {
        let handlers = match self.get(id).and_then(|n| n.events.get(&event.name)) {
            Some(d) => d.handlers_for(phase),
            None => return,
        };
        event.phase = phase;
        event.current_target = id;
        for h in handlers {
            h(event);
            if event.is_propagation_stopped() {
                return;
            }
        }
    }
}
