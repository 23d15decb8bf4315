//! Outbound notifications from the engine to its host

use std::sync::{Arc, Weak};
use parking_lot::RwLock;

use crate::sync::HoverState;

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SplomEvent {
    /// Visual state changed; schedule a redraw
    RepaintNeeded,

    /// The shared selection changed
    SelectionChanged { selected: usize },

    /// The shared highlight set changed
    HighlightChanged,

    /// Matrix-wide hover moved
    HoverChanged(HoverState),

    /// The pan/zoom of the plot bound to `(x, y)` changed
    TransformChanged { x_column: usize, y_column: usize },

    /// A plot was maximized (`Some`) or the overlay was closed (`None`)
    MaximizedChanged { columns: Option<(usize, usize)> },

    /// The grid was rebuilt for a new table or visibility set
    LayoutChanged { visible_columns: usize },
}

/// Trait for components that need to respond to engine events
pub trait SplomObserver: Send + Sync {
    fn on_event(&self, event: &SplomEvent);
}

/// Observer list holding weak references to its subscribers
pub struct EventDispatcher {
    subscribers: Arc<RwLock<Vec<Weak<dyn SplomObserver>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a subscriber; it is dropped from the list once its last `Arc` goes away
    pub fn subscribe(&self, subscriber: Arc<dyn SplomObserver>) {
        self.subscribers.write().push(Arc::downgrade(&subscriber));
    }

    /// Notify all live subscribers
    pub fn emit(&self, event: &SplomEvent) {
        let mut subscribers = self.subscribers.write();

        // Remove any dead weak references
        subscribers.retain(|weak| weak.strong_count() > 0);

        for weak in subscribers.iter() {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_event(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<SplomEvent>>,
    }

    impl SplomObserver for Recorder {
        fn on_event(&self, event: &SplomEvent) {
            self.events.lock().push(event.clone());
        }
    }

    #[test]
    fn test_emit_reaches_live_subscribers() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.subscribe(recorder.clone());

        dispatcher.emit(&SplomEvent::RepaintNeeded);
        dispatcher.emit(&SplomEvent::SelectionChanged { selected: 3 });

        let events = recorder.events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], SplomEvent::SelectionChanged { selected: 3 });
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let dispatcher = EventDispatcher::new();
        {
            let recorder = Arc::new(Recorder::default());
            dispatcher.subscribe(recorder.clone());
            assert_eq!(dispatcher.subscriber_count(), 1);
        }
        dispatcher.emit(&SplomEvent::RepaintNeeded);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }
}
