use std::time::{Duration, Instant};

/// A one-shot debounce timer polled from the event loop
///
/// Triggering while pending restarts the wait, so a burst collapses into a
/// single firing. Cancellation is advisory: the timer still fires, but
/// reports that its effect must be suppressed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// The duration to wait after the last event before triggering
    delay: Duration,
    /// When the last event occurred
    last_event: Option<Instant>,
    /// Whether we have a pending trigger
    pending: bool,
    /// Whether the pending trigger was canceled
    canceled: bool,
}

/// Outcome of polling a due timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    /// Nothing due
    Idle,
    /// Due; publish the notification
    Publish,
    /// Due, but canceled before firing
    Suppressed,
}

impl Debouncer {
    /// Create a new debouncer with the specified delay in milliseconds
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            last_event: None,
            pending: false,
            canceled: false,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Register an event at a given instant, superseding any pending one
    pub fn trigger_at(&mut self, now: Instant) {
        self.last_event = Some(now);
        self.pending = true;
        self.canceled = false;
    }

    /// Mark the pending trigger so it fires without effect
    pub fn cancel(&mut self) {
        if self.pending {
            self.canceled = true;
        }
    }

    /// Poll the timer at `now`; a due timer is consumed
    pub fn poll(&mut self, now: Instant) -> Firing {
        if !self.pending {
            return Firing::Idle;
        }

        match self.last_event {
            Some(last) if now.saturating_duration_since(last) >= self.delay => {
                let canceled = self.canceled;
                self.reset();
                if canceled {
                    Firing::Suppressed
                } else {
                    Firing::Publish
                }
            }
            _ => Firing::Idle,
        }
    }

    /// Time left before a pending trigger fires, `None` when idle
    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        if !self.pending {
            return None;
        }

        self.last_event
            .map(|last| self.delay.saturating_sub(now.saturating_duration_since(last)))
    }

    /// Reset the debouncer, dropping any pending action
    pub fn reset(&mut self) {
        self.last_event = None;
        self.pending = false;
        self.canceled = false;
    }

    /// Check if there's a pending action
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Notification kinds that can be debounced; one timer each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    CurrentIndex,
    SelectedIndexes,
}

/// The per-kind debounce timers of one table
#[derive(Debug, Clone)]
pub struct DebounceTimers {
    current_index: Debouncer,
    selected_indexes: Debouncer,
}

impl DebounceTimers {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            current_index: Debouncer::new(delay_ms),
            selected_indexes: Debouncer::new(delay_ms),
        }
    }

    pub fn get(&self, kind: NotificationKind) -> &Debouncer {
        match kind {
            NotificationKind::CurrentIndex => &self.current_index,
            NotificationKind::SelectedIndexes => &self.selected_indexes,
        }
    }

    pub fn get_mut(&mut self, kind: NotificationKind) -> &mut Debouncer {
        match kind {
            NotificationKind::CurrentIndex => &mut self.current_index,
            NotificationKind::SelectedIndexes => &mut self.selected_indexes,
        }
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.current_index.set_delay(delay);
        self.selected_indexes.set_delay(delay);
    }

    pub fn schedule(&mut self, kind: NotificationKind, now: Instant) {
        self.get_mut(kind).trigger_at(now);
    }

    /// Poll both timers; returns the kinds whose notification must be published
    pub fn poll(&mut self, now: Instant) -> Vec<NotificationKind> {
        [NotificationKind::CurrentIndex, NotificationKind::SelectedIndexes]
            .into_iter()
            .filter(|&kind| self.get_mut(kind).poll(now) == Firing::Publish)
            .collect()
    }

    /// Earliest pending deadline, for sizing the event loop's poll timeout
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        [&self.current_index, &self.selected_indexes]
            .into_iter()
            .filter_map(|d| d.time_remaining_at(now))
            .min()
    }

    /// Drop both pending notifications
    pub fn reset(&mut self) {
        self.current_index.reset();
        self.selected_indexes.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_into_one_firing() {
        let start = Instant::now();
        let mut d = Debouncer::new(200);
        d.trigger_at(start);
        d.trigger_at(start + Duration::from_millis(50));
        d.trigger_at(start + Duration::from_millis(100));

        assert_eq!(d.poll(start + Duration::from_millis(250)), Firing::Idle);
        assert_eq!(d.poll(start + Duration::from_millis(300)), Firing::Publish);
        assert_eq!(d.poll(start + Duration::from_millis(600)), Firing::Idle);
    }

    #[test]
    fn test_cancel_suppresses_but_consumes() {
        let start = Instant::now();
        let mut d = Debouncer::new(100);
        d.trigger_at(start);
        d.cancel();
        assert!(d.is_pending());
        assert_eq!(d.poll(start + Duration::from_millis(100)), Firing::Suppressed);
        assert!(!d.is_pending());
    }

    #[test]
    fn test_retrigger_clears_cancel() {
        let start = Instant::now();
        let mut d = Debouncer::new(100);
        d.trigger_at(start);
        d.cancel();
        d.trigger_at(start + Duration::from_millis(10));
        assert_eq!(d.poll(start + Duration::from_millis(110)), Firing::Publish);
    }

    #[test]
    fn test_cancel_without_pending_is_noop() {
        let start = Instant::now();
        let mut d = Debouncer::new(100);
        d.cancel();
        d.trigger_at(start);
        assert_eq!(d.poll(start + Duration::from_millis(100)), Firing::Publish);
    }

    #[test]
    fn test_reset_drops_pending_timers() {
        let start = Instant::now();
        let mut timers = DebounceTimers::new(100);
        timers.schedule(NotificationKind::CurrentIndex, start);
        timers.schedule(NotificationKind::SelectedIndexes, start);
        timers.reset();

        assert_eq!(timers.next_deadline(start), None);
        assert!(timers.poll(start + Duration::from_millis(500)).is_empty());
    }

    #[test]
    fn test_timers_are_independent_per_kind() {
        let start = Instant::now();
        let mut timers = DebounceTimers::new(100);
        timers.schedule(NotificationKind::CurrentIndex, start);
        timers.schedule(
            NotificationKind::SelectedIndexes,
            start + Duration::from_millis(50),
        );

        assert_eq!(
            timers.next_deadline(start + Duration::from_millis(20)),
            Some(Duration::from_millis(80))
        );
        assert_eq!(
            timers.poll(start + Duration::from_millis(100)),
            vec![NotificationKind::CurrentIndex]
        );
        assert_eq!(
            timers.poll(start + Duration::from_millis(150)),
            vec![NotificationKind::SelectedIndexes]
        );
    }
}
