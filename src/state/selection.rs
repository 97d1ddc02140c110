//! Current item and selection state machine
//!
//! The controller owns `current_index` and the selected set. It pushes every
//! change into both panes, reconciles the cache against what the native
//! panes report, and publishes `CurrentIndexChanged` /
//! `SelectedIndexesChanged` either immediately or through the per-kind
//! debounce timers.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::debouncer::{DebounceTimers, NotificationKind};
use crate::error::NativeError;
use crate::state::dispatcher::EventDispatcher;
use crate::state::events::TableEvent;
use crate::ui::pane::{ItemState, ItemTarget, NativePane, PanePair};
use crate::ui::reentrancy::ReentrancyFlag;

/// How a current-index change is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Publication {
    /// Immediately without a delay, otherwise through the debounce timer
    Auto,
    /// Immediately, suppressing any pending delayed notification
    Immediate,
}

pub struct SelectionController {
    current: Option<usize>,
    /// Last value announced through `CurrentIndexChanged`
    published: Option<usize>,
    selected: Vec<usize>,
    multi_selection: bool,
    delay_ms: u64,
    timers: DebounceTimers,
    in_set_current_index: ReentrancyFlag,
    in_set_selected_indexes: ReentrancyFlag,
    /// Publish the next "all items" native change (blank click in multi mode)
    publish_next_sel_clear: bool,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SelectionController {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            current: None,
            published: None,
            selected: Vec::new(),
            multi_selection: false,
            delay_ms,
            timers: DebounceTimers::new(delay_ms),
            in_set_current_index: ReentrancyFlag::new(),
            in_set_selected_indexes: ReentrancyFlag::new(),
            publish_next_sel_clear: false,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Selected rows in the order they were last stored
    pub fn selected_indexes(&self) -> &[usize] {
        &self.selected
    }

    pub fn multi_selection(&self) -> bool {
        self.multi_selection
    }

    /// Switching multi-selection off drops the cached selection and
    /// announces the now empty set
    pub fn set_multi_selection(&mut self, events: &mut EventDispatcher, multi: bool, now: Instant) {
        self.multi_selection = multi;
        if !multi && !self.selected.is_empty() {
            self.selected.clear();
            self.publish_selected(events, now);
        }
    }

    pub fn item_state_changed_delay(&self) -> u64 {
        self.delay_ms
    }

    pub fn set_item_state_changed_delay(&mut self, delay_ms: u64) {
        self.delay_ms = delay_ms;
        self.timers.set_delay(Duration::from_millis(delay_ms));
    }

    /// Whether a delayed notification of `kind` is outstanding
    pub fn is_pending(&self, kind: NotificationKind) -> bool {
        self.timers.get(kind).is_pending()
    }

    /// Drop pending delayed notifications
    pub fn reset_timers(&mut self) {
        self.timers.reset();
    }

    /// Time until the next debounced notification fires
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.timers.next_deadline(now)
    }

    pub fn set_current_index<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        index: Option<usize>,
        now: Instant,
    ) -> Result<(), NativeError> {
        self.apply_current_index(panes, events, index, Publication::Auto, now)
    }

    fn apply_current_index<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        index: Option<usize>,
        publication: Publication,
        now: Instant,
    ) -> Result<(), NativeError> {
        let Some(_guard) = self.in_set_current_index.enter() else {
            trace!(target: "selection", "nested set_current_index({:?}) ignored", index);
            return Ok(());
        };

        if self.multi_selection {
            panes.try_each(|p| p.set_item_state(ItemTarget::All, ItemState::CLEAR))?;
        }

        match index {
            Some(row) => show_current(panes, row)?,
            None => {
                panes.try_each(|p| p.set_item_state(ItemTarget::All, ItemState::CLEAR))?;
            }
        }

        self.store_current(events, index, publication, now);

        if self.multi_selection {
            self.reconcile_from_native(panes, events, now);
        }

        Ok(())
    }

    fn store_current(
        &mut self,
        events: &mut EventDispatcher,
        index: Option<usize>,
        publication: Publication,
        now: Instant,
    ) {
        let previous = std::mem::replace(&mut self.current, index);
        if previous == index {
            return;
        }
        debug!(target: "selection", "current index {:?} -> {:?}", previous, index);
        match publication {
            Publication::Auto if index.is_some() && self.delay_ms > 0 => {
                self.timers.schedule(NotificationKind::CurrentIndex, now);
            }
            Publication::Auto | Publication::Immediate => {
                self.timers.get_mut(NotificationKind::CurrentIndex).cancel();
                self.publish_current(events);
            }
        }
    }

    fn publish_current(&mut self, events: &mut EventDispatcher) {
        self.published = self.current;
        events.publish(TableEvent::CurrentIndexChanged(self.current));
    }

    fn publish_selected(&mut self, events: &mut EventDispatcher, now: Instant) {
        if self.delay_ms > 0 {
            self.timers.schedule(NotificationKind::SelectedIndexes, now);
        } else {
            events.publish(TableEvent::SelectedIndexesChanged(self.selected.clone()));
        }
    }

    /// Replace the selection with exactly `indexes`, kept in the given order
    pub fn set_selected_indexes<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        indexes: &[usize],
        now: Instant,
    ) -> Result<(), NativeError> {
        let Some(_guard) = self.in_set_selected_indexes.enter() else {
            trace!(target: "selection", "nested set_selected_indexes ignored");
            return Ok(());
        };

        panes.try_each(|p| p.set_item_state(ItemTarget::All, ItemState::CLEAR))?;
        for &row in indexes {
            panes.try_each(|p| p.set_item_state(ItemTarget::Row(row), ItemState::CURRENT))?;
        }

        self.selected = indexes.to_vec();
        debug!(target: "selection", "selected indexes set to {:?}", self.selected);
        self.publish_selected(events, now);
        Ok(())
    }

    /// Re-read the selection from the normal pane and publish on a net change
    pub fn reconcile_from_native<P: NativePane>(
        &mut self,
        panes: &PanePair<P>,
        events: &mut EventDispatcher,
        now: Instant,
    ) {
        let native = panes.normal.selected_rows();
        if same_rows(&native, &self.selected) {
            trace!(target: "selection", "native selection unchanged");
            return;
        }
        debug!(target: "selection", "native selection {:?} -> {:?}", self.selected, native);
        self.selected = native;
        self.publish_selected(events, now);
    }

    /// Model reported an arbitrary row-count change
    pub fn on_rows_reset<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        now: Instant,
    ) -> Result<(), NativeError> {
        self.set_current_index(panes, events, None, now)?;
        if !self.selected.is_empty() {
            self.selected.clear();
            self.publish_selected(events, now);
        }
        Ok(())
    }

    pub fn on_rows_inserted<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        from: usize,
        to: usize,
        now: Instant,
    ) -> Result<(), NativeError> {
        self.remap_rows(panes, events, now, |i| shift_for_insert(i, from, to))
    }

    pub fn on_rows_removed<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        from: usize,
        to: usize,
        now: Instant,
    ) -> Result<(), NativeError> {
        self.remap_rows(panes, events, now, |i| shift_for_remove(i, from, to))
    }

    fn remap_rows<P, F>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        now: Instant,
        remap: F,
    ) -> Result<(), NativeError>
    where
        P: NativePane,
        F: Fn(usize) -> Option<usize>,
    {
        let current = self.current.and_then(&remap);
        if !self.multi_selection {
            if current != self.current {
                self.set_current_index(panes, events, current, now)?;
            }
            return Ok(());
        }

        let selected: Vec<usize> = self.selected.iter().filter_map(|&i| remap(i)).collect();
        let selection_changed = selected != self.selected;
        if current == self.current && !selection_changed {
            return Ok(());
        }

        // panes get the final current and selection before either is announced
        let (Some(_current_guard), Some(_selected_guard)) = (
            self.in_set_current_index.enter(),
            self.in_set_selected_indexes.enter(),
        ) else {
            trace!(target: "selection", "nested row remap ignored");
            return Ok(());
        };

        panes.try_each(|p| p.set_item_state(ItemTarget::All, ItemState::CLEAR))?;
        for &row in &selected {
            panes.try_each(|p| p.set_item_state(ItemTarget::Row(row), ItemState::SELECTED))?;
        }
        if let Some(row) = current {
            show_current(panes, row)?;
        }

        self.store_current(events, current, Publication::Auto, now);
        if selection_changed {
            debug!(target: "selection", "selected rows remapped {:?} -> {:?}", self.selected, selected);
            self.selected = selected;
            self.publish_selected(events, now);
        }
        Ok(())
    }

    /// Native notification that the state of `row` (or every row) changed
    pub fn on_item_changed<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        row: Option<usize>,
        selected_before: bool,
        selected_now: bool,
        now: Instant,
    ) -> Result<(), NativeError> {
        if row.is_none() && !self.publish_next_sel_clear {
            return Ok(());
        }
        self.publish_next_sel_clear = false;

        if let Some(row) = row {
            if selected_now && !selected_before {
                self.set_current_index(panes, events, Some(row), now)?;
            }
        }

        if selected_now != selected_before
            && self.multi_selection
            && !self.in_set_selected_indexes.is_active()
        {
            self.reconcile_from_native(panes, events, now);
        }
        Ok(())
    }

    /// A click landed on no item while multi-selection is on
    pub fn publish_next_selection_clear(&mut self) {
        self.publish_next_sel_clear = true;
    }

    /// Double click: flush a delayed current-index notification right away
    pub fn on_double_click(&mut self, events: &mut EventDispatcher) {
        if self.delay_ms > 0 && self.current != self.published {
            self.timers.get_mut(NotificationKind::CurrentIndex).cancel();
            self.publish_current(events);
        }
    }

    pub fn on_item_activate<P: NativePane>(
        &mut self,
        panes: &mut PanePair<P>,
        events: &mut EventDispatcher,
        row: usize,
        now: Instant,
    ) -> Result<(), NativeError> {
        if self.delay_ms > 0 {
            self.timers.get_mut(NotificationKind::CurrentIndex).cancel();
        }
        if self.current != Some(row) {
            self.apply_current_index(panes, events, Some(row), Publication::Immediate, now)?;
        }
        events.publish(TableEvent::ItemActivated(row));
        Ok(())
    }

    /// Fire due debounced notifications
    pub fn on_timer(&mut self, events: &mut EventDispatcher, now: Instant) {
        for kind in self.timers.poll(now) {
            match kind {
                NotificationKind::CurrentIndex => self.publish_current(events),
                NotificationKind::SelectedIndexes => {
                    events.publish(TableEvent::SelectedIndexesChanged(self.selected.clone()))
                }
            }
        }
    }
}

/// Mark `row` current in both panes and scroll it into view
fn show_current<P: NativePane>(panes: &mut PanePair<P>, row: usize) -> Result<(), NativeError> {
    panes.try_each(|p| p.set_item_state(ItemTarget::Row(row), ItemState::CURRENT))?;
    // a single request is sometimes ignored by the native control
    panes.try_each(|p| {
        p.ensure_visible(row)?;
        p.ensure_visible(row)
    })
}

/// Row index after rows `from..=to` were inserted
pub fn shift_for_insert(index: usize, from: usize, to: usize) -> Option<usize> {
    let span = to.saturating_sub(from) + 1;
    if from <= index {
        Some(index + span)
    } else {
        Some(index)
    }
}

/// Row index after rows `from..=to` were removed, `None` if it was removed
pub fn shift_for_remove(index: usize, from: usize, to: usize) -> Option<usize> {
    let span = to.saturating_sub(from) + 1;
    if (from..=to).contains(&index) {
        None
    } else if from < index {
        Some(index - span)
    } else {
        Some(index)
    }
}

/// Set comparison; native enumeration order is not meaningful
fn same_rows(a: &[usize], b: &[usize]) -> bool {
    let normalize = |rows: &[usize]| {
        let mut rows = rows.to_vec();
        rows.sort_unstable();
        rows.dedup();
        rows
    };
    normalize(a) == normalize(b)
}
