//! Event dispatcher for pub-sub of table events

use crate::state::events::TableEvent;
use tracing::{debug, info};

/// Trait for components that subscribe to table events
pub trait TableEventSubscriber {
    /// Handle a table event
    fn on_table_event(&mut self, event: &TableEvent);

    /// Get subscriber name for debugging
    fn name(&self) -> &str;
}

/// Closure-backed subscriber
pub struct FnSubscriber<F> {
    name: String,
    handler: F,
}

impl<F: FnMut(&TableEvent)> FnSubscriber<F> {
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F: FnMut(&TableEvent)> TableEventSubscriber for FnSubscriber<F> {
    fn on_table_event(&mut self, event: &TableEvent) {
        (self.handler)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Delivers published events to subscribers and keeps a short history
pub struct EventDispatcher {
    /// List of subscribers
    subscribers: Vec<Box<dyn TableEventSubscriber>>,

    /// Event history for debugging
    event_history: Vec<TableEvent>,

    /// Maximum event history size
    max_history: usize,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            event_history: Vec::new(),
            max_history: 100,
        }
    }

    /// Add a subscriber
    pub fn subscribe(&mut self, subscriber: Box<dyn TableEventSubscriber>) {
        info!(target: "table_view", "EventDispatcher: Adding subscriber: {}", subscriber.name());
        self.subscribers.push(subscriber);
    }

    /// Publish an event to every subscriber
    pub fn publish(&mut self, event: TableEvent) {
        debug!(target: "table_view", "EventDispatcher: Publishing {}: {:?}", event.kind(), event);

        for subscriber in &mut self.subscribers {
            subscriber.on_table_event(&event);
        }

        self.event_history.push(event);
        if self.event_history.len() > self.max_history {
            self.event_history.remove(0);
        }
    }

    /// Get event history for debugging
    pub fn event_history(&self) -> &[TableEvent] {
        &self.event_history
    }

    /// Take and clear the history
    pub fn drain_history(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.event_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribers_receive_events_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe(Box::new(FnSubscriber::new("recorder", move |e: &TableEvent| {
            sink.borrow_mut().push(e.clone())
        })));

        dispatcher.publish(TableEvent::ColumnClicked(2));
        dispatcher.publish(TableEvent::CurrentIndexChanged(None));

        assert_eq!(
            *seen.borrow(),
            vec![
                TableEvent::ColumnClicked(2),
                TableEvent::CurrentIndexChanged(None)
            ]
        );
        assert_eq!(dispatcher.event_history().len(), 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut dispatcher = EventDispatcher::new();
        for i in 0..150 {
            dispatcher.publish(TableEvent::ItemActivated(i));
        }
        assert_eq!(dispatcher.event_history().len(), 100);
        assert_eq!(dispatcher.event_history()[0], TableEvent::ItemActivated(50));
        assert_eq!(dispatcher.drain_history().len(), 100);
        assert!(dispatcher.event_history().is_empty());
    }
}
