//! The select field
//!
//! [`SelectField`] owns one reactive graph and every piece of select state
//! built on it. Hosts feed it user input (keys, clicks, pointer motion, query
//! text, focus changes) and call [`SelectField::tick`] from their event loop
//! so timers fire and settled searches are applied. Renderers read the cells
//! listed in [`FieldCells`].
//!
//! Every public operation is one synchronous turn: lazy cells are flushed
//! before it returns.

use std::rc::Rc;
use std::time::Instant;

use fieldkit_core::{
    Clock, Derived, Observable, ReactiveGraph, ReadSignal, Signal, SubscribeOptions,
    SubscriptionId, SystemClock, TimerQueue,
};
use serde::Serialize;

use crate::config::{QueryInputPlacement, SelectConfig, SelectSettings};
use crate::error::Result;
use crate::navigation::{find_prefix_match, step_ordinal, transition, Key, NavAction, Navigator, Step};
use crate::option::{NativeOption, OptionDescriptor, OptionId, OptionRecord};
use crate::query::{QueryController, QueryMode};
use crate::registry::{OptionBindings, OptionList, OptionRegistry};
use crate::selection::SelectionStore;

/// The externally observed value of a field
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(Option<OptionRecord>),
    Multiple(Vec<OptionRecord>),
}

impl FieldValue {
    fn from_records(multiple: bool, records: Vec<OptionRecord>) -> Self {
        if multiple {
            FieldValue::Multiple(records)
        } else {
            FieldValue::Single(records.into_iter().next())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(record) => record.is_none(),
            FieldValue::Multiple(records) => records.is_empty(),
        }
    }

    pub fn ids(&self) -> Vec<OptionId> {
        match self {
            FieldValue::Single(record) => record.iter().map(|r| r.id.clone()).collect(),
            FieldValue::Multiple(records) => records.iter().map(|r| r.id.clone()).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Change,
    Open,
    Close,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldEvent {
    /// The selection changed; carries the new value
    Change(FieldValue),
    Open,
    Close,
}

/// Handle for removing an event listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(SubscriptionId);

/// Where the host should move keyboard focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusTarget {
    /// The field's trigger (the selected display)
    Trigger,
    QueryInput,
    OptionList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldTimer {
    TypeAheadReset,
    SearchDebounce,
}

/// Read-only cells for renderers
#[derive(Clone, Copy, Debug)]
pub struct FieldCells {
    pub options: ReadSignal<OptionList>,
    /// Registry ordinals of the options that pass the filter, in order
    pub filtered: Derived<Vec<usize>>,
    pub selected_ids: ReadSignal<Vec<OptionId>>,
    pub selected_options: ReadSignal<Vec<OptionRecord>>,
    pub is_open: ReadSignal<bool>,
    pub nav_index: ReadSignal<Option<usize>>,
    pub is_navigating: ReadSignal<bool>,
    pub filter_text: ReadSignal<String>,
    pub search_text: ReadSignal<String>,
    pub querying: ReadSignal<bool>,
    pub focused: ReadSignal<bool>,
    pub is_filled: Derived<bool>,
    pub display_text: Derived<String>,
}

pub struct SelectField {
    graph: ReactiveGraph,
    settings: SelectSettings,
    registry: OptionRegistry,
    selection: SelectionStore,
    navigator: Navigator,
    query: QueryController,
    bindings: OptionBindings,
    timers: TimerQueue<FieldTimer>,
    clock: Rc<dyn Clock>,
    focused: Signal<bool>,
    filtered: Derived<Vec<usize>>,
    is_filled: Derived<bool>,
    display_text: Derived<String>,
    focus_request: Option<FocusTarget>,
}

impl SelectField {
    /// Build a field on the system clock
    pub fn new(config: SelectConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Build a field on the given clock
    ///
    /// Fails on an invalid configuration; no field is built in that case.
    pub fn with_clock(config: SelectConfig, clock: impl Clock + 'static) -> Result<Self> {
        let mode = config.validate()?;
        let settings = config.settings;
        let multiple = settings.multiple;

        let mut graph = ReactiveGraph::new();
        let selection = SelectionStore::new(&mut graph, multiple);
        let navigator = Navigator::new(&mut graph);
        let query = QueryController::new(&mut graph, mode, settings.search_debounce());
        let registry = OptionRegistry::new(&mut graph);
        let focused = graph.create_signal(false);

        let bindings = OptionBindings {
            selected_ids: selection.ids(),
            nav_index: navigator.nav_index_signal(),
            filter_text: query.filter_text(),
            multiple,
        };

        let options = registry.options();
        let filter_text = query.filter_text();
        let filtered = graph.create_derived(&[options.into(), filter_text.into()], move |g| {
            let filter = g.get(filter_text).unwrap_or_default();
            g.with(options, |list| {
                list.iter()
                    .filter(|option| option.label_matches(&filter))
                    .map(|option| option.ordinal())
                    .collect::<Vec<usize>>()
            })
            .unwrap_or_default()
        })?;

        let selected_ids = selection.ids();
        let is_filled = graph.create_derived(&[selected_ids.into()], move |g| {
            g.with(selected_ids, |ids| !ids.is_empty()).unwrap_or(false)
        })?;

        let selected_options = selection.options();
        let display_text = graph.create_derived(&[selected_options.into()], move |g| {
            g.with(selected_options, |records| {
                records
                    .iter()
                    .map(|record| record.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
        })?;

        tracing::debug!(multiple, mode = ?query.mode(), "select field created");

        Ok(Self {
            graph,
            settings,
            registry,
            selection,
            navigator,
            query,
            bindings,
            timers: TimerQueue::new(),
            clock: Rc::new(clock),
            focused,
            filtered,
            is_filled,
            display_text,
            focus_request: None,
        })
    }

    /// Build a field from authored `<option>` elements
    pub fn from_native(config: SelectConfig, options: Vec<NativeOption>) -> Result<Self> {
        let mut field = Self::new(config)?;
        field.set_native_options(options)?;
        Ok(field)
    }

    pub fn settings(&self) -> &SelectSettings {
        &self.settings
    }

    pub fn is_multiple(&self) -> bool {
        self.settings.multiple
    }

    /// The graph the field's cells live in
    pub fn graph(&self) -> &ReactiveGraph {
        &self.graph
    }

    pub fn cells(&self) -> FieldCells {
        FieldCells {
            options: self.registry.options(),
            filtered: self.filtered,
            selected_ids: self.selection.ids(),
            selected_options: self.selection.options(),
            is_open: self.navigator.is_open(),
            nav_index: self.navigator.nav_index(),
            is_navigating: self.navigator.is_navigating(),
            filter_text: self.query.filter_text(),
            search_text: self.query.search_text(),
            querying: self.query.querying(),
            focused: self.focused.read_only(),
            is_filled: self.is_filled,
            display_text: self.display_text,
        }
    }

    // =========================================================================
    // VALUE
    // =========================================================================

    /// The current selection: one record or none in single mode, a list in
    /// multi mode
    pub fn get_value(&self) -> FieldValue {
        FieldValue::from_records(
            self.is_multiple(),
            self.selection.selected_options(&self.graph),
        )
    }

    /// Select the options whose value is in `values`, in registry order
    ///
    /// Single mode keeps the first match.
    pub fn set_value<S: AsRef<str>>(&mut self, values: &[S]) {
        let list = self.registry.snapshot(&self.graph);
        let ids: Vec<OptionId> = list
            .iter()
            .filter(|option| values.iter().any(|v| v.as_ref() == option.value()))
            .map(|option| option.id().clone())
            .collect();
        let changed = self.selection.replace(&mut self.graph, &list, &ids);
        self.after_selection_change(changed);
        self.graph.flush();
    }

    /// Replace the selection with the given options, matched by id
    ///
    /// Descriptors without an id or with an unregistered one are ignored.
    pub fn set_selected_options(&mut self, options: &[OptionDescriptor]) {
        let list = self.registry.snapshot(&self.graph);
        let ids = options.iter().filter_map(|descriptor| descriptor.id.as_ref());
        let changed = self.selection.replace(&mut self.graph, &list, ids);
        self.after_selection_change(changed);
        self.graph.flush();
    }

    pub fn select(&mut self, id: impl Into<OptionId>) -> bool {
        let list = self.registry.snapshot(&self.graph);
        let changed = self.selection.select(&mut self.graph, &list, &id.into());
        self.after_selection_change(changed);
        self.graph.flush();
        changed
    }

    pub fn deselect(&mut self, id: impl Into<OptionId>) -> bool {
        let changed = self.selection.deselect(&mut self.graph, &id.into());
        self.after_selection_change(changed);
        self.graph.flush();
        changed
    }

    pub fn toggle(&mut self, id: impl Into<OptionId>) -> bool {
        let list = self.registry.snapshot(&self.graph);
        let changed = self.selection.toggle(&mut self.graph, &list, &id.into());
        self.after_selection_change(changed);
        self.graph.flush();
        changed
    }

    pub fn deselect_all(&mut self) -> bool {
        let changed = self.selection.deselect_all(&mut self.graph);
        self.after_selection_change(changed);
        self.graph.flush();
        changed
    }

    /// Whether a "deselect all" control should be offered
    pub fn can_deselect_all(&self) -> bool {
        self.settings.allow_deselect || self.is_multiple()
    }

    // =========================================================================
    // OPTIONS
    // =========================================================================

    /// Copies of the registered options, in order
    pub fn get_options(&self) -> Vec<OptionRecord> {
        self.registry.records(&self.graph)
    }

    /// Replace every option
    ///
    /// Selected ids that are no longer registered are dropped, then
    /// descriptors marked `selected` are selected in order.
    pub fn set_options(&mut self, options: Vec<OptionDescriptor>) -> Result<()> {
        self.replace_options(options)?;
        self.graph.flush();
        Ok(())
    }

    /// Replace every option with authored `<option>` elements
    pub fn set_native_options(&mut self, options: Vec<NativeOption>) -> Result<()> {
        let default_selected = self.settings.default_selected;
        let descriptors = options
            .into_iter()
            .map(|native| native.into_descriptor(default_selected))
            .collect();
        self.set_options(descriptors)
    }

    fn replace_options(&mut self, options: Vec<OptionDescriptor>) -> Result<()> {
        let replacement = self
            .registry
            .set_options(&mut self.graph, &self.bindings, options)?;
        let list = self.registry.snapshot(&self.graph);
        self.selection.retain_registered(&mut self.graph, &list);
        for id in &replacement.preselected {
            self.selection.select(&mut self.graph, &list, id);
        }
        Ok(())
    }

    // =========================================================================
    // OPEN / CLOSE
    // =========================================================================

    pub fn is_open(&self) -> bool {
        self.graph.get(self.navigator.is_open()).unwrap_or(false)
    }

    pub fn open(&mut self) {
        self.open_dropdown();
        self.graph.flush();
    }

    /// Close the dropdown and give focus back to the trigger
    pub fn close(&mut self) {
        self.close_dropdown(true);
        self.graph.flush();
    }

    /// Pointer-down on the trigger
    pub fn toggle_open(&mut self) {
        if self.is_open() {
            self.close_dropdown(true);
        } else {
            self.open_dropdown();
        }
        self.graph.flush();
    }

    fn open_dropdown(&mut self) {
        if !self.navigator.open(&mut self.graph) {
            return;
        }
        self.focus_request = Some(match self.query.mode() {
            QueryMode::None => FocusTarget::OptionList,
            _ => FocusTarget::QueryInput,
        });
        tracing::debug!("dropdown opened");
    }

    fn close_dropdown(&mut self, restore_focus: bool) {
        if !self.navigator.close(&mut self.graph) {
            return;
        }
        if restore_focus {
            self.focus_request = Some(FocusTarget::Trigger);
        }
        if !self.is_multiple() {
            self.clear_query_text();
        }
        tracing::debug!(restore_focus, "dropdown closed");
    }

    /// Where the host should move focus, if anywhere. Cleared by reading.
    pub fn take_focus_request(&mut self) -> Option<FocusTarget> {
        self.focus_request.take()
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Handle a key press. Returns whether the key was used.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let action = transition(self.navigator.state(&self.graph), key);
        tracing::trace!(?key, ?action, "key");
        let handled = match action {
            NavAction::None => false,
            NavAction::Open => {
                self.open_dropdown();
                true
            }
            NavAction::Close => {
                self.close_dropdown(true);
                true
            }
            NavAction::Confirm => {
                self.confirm();
                true
            }
            NavAction::Move(step) => {
                self.move_highlight(step);
                true
            }
            NavAction::TypeAhead(c) => {
                self.type_ahead(c);
                true
            }
        };
        self.graph.flush();
        handled
    }

    /// Click on an option
    pub fn click_option(&mut self, id: impl Into<OptionId>) -> bool {
        let id = id.into();
        let list = self.registry.snapshot(&self.graph);
        let changed = if !self.is_multiple() && !self.settings.allow_deselect {
            self.selection.select(&mut self.graph, &list, &id)
        } else {
            self.selection.toggle(&mut self.graph, &list, &id)
        };
        self.after_selection_change(changed);
        if !self.is_multiple() {
            self.close_dropdown(true);
        }
        self.graph.flush();
        changed
    }

    /// Pointer motion over the option list
    pub fn pointer_moved(&mut self) {
        self.navigator.set_navigating(&mut self.graph, false);
        self.graph.flush();
    }

    /// Text typed into the query input
    pub fn set_query(&mut self, text: &str) {
        if let Some(debounce) = self.query.set_query(&mut self.graph, text) {
            let deadline = self.clock.now() + debounce;
            self.timers.arm(FieldTimer::SearchDebounce, deadline);
        }
        self.graph.flush();
    }

    /// Reset the query text, invalidating any in-flight search
    ///
    /// The current options are kept.
    pub fn clear_query(&mut self) {
        self.clear_query_text();
        self.graph.flush();
    }

    fn clear_query_text(&mut self) {
        self.timers.cancel(FieldTimer::SearchDebounce);
        self.query.clear(&mut self.graph);
    }

    /// Report focus changes of the field. Losing focus closes the dropdown
    /// without moving focus.
    pub fn set_focused(&mut self, focused: bool) {
        self.graph.set(self.focused, focused);
        if !focused {
            self.close_dropdown(false);
        }
        self.graph.flush();
    }

    pub fn is_focused(&self) -> bool {
        self.graph.get(self.focused).unwrap_or(false)
    }

    /// Fire due timers and apply settled searches
    pub fn tick(&mut self) -> Result<()> {
        let now = self.clock.now();
        for timer in self.timers.take_due(now) {
            match timer {
                FieldTimer::TypeAheadReset => self.navigator.reset_type_ahead(),
                FieldTimer::SearchDebounce => self.query.dispatch(&self.graph),
            }
        }
        if let Some(options) = self.query.drain(&mut self.graph) {
            self.replace_options(options)?;
        }
        self.graph.flush();
        Ok(())
    }

    /// When [`tick`](Self::tick) next has timer work to do
    ///
    /// Search results do not show up here; see
    /// [`has_settled_search`](Self::has_settled_search) and
    /// [`settled`](Self::settled).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Whether a search outcome is waiting for [`tick`](Self::tick)
    pub fn has_settled_search(&mut self) -> bool {
        self.query.poll_settled()
    }

    /// Wait for the next search outcome and apply it
    ///
    /// Returns right away when no search is in flight. Timers are not waited
    /// for; hosts combine this with [`next_deadline`](Self::next_deadline).
    pub async fn settled(&mut self) -> Result<()> {
        self.query.wait_settled().await;
        self.tick()
    }

    fn confirm(&mut self) {
        if !self.is_multiple() {
            self.close_dropdown(true);
            return;
        }
        let Some(ordinal) = self.navigator.current_index(&self.graph) else {
            return;
        };
        let list = self.registry.snapshot(&self.graph);
        let Some(id) = list.get(ordinal).map(|option| option.id().clone()) else {
            return;
        };
        let changed = self.selection.toggle(&mut self.graph, &list, &id);
        self.after_selection_change(changed);
    }

    fn move_highlight(&mut self, step: Step) {
        self.navigator.set_navigating(&mut self.graph, true);
        let list = self.registry.snapshot(&self.graph);
        let filtered = self.filtered_ordinals();

        let highlighted = if self.is_multiple() {
            self.navigator.current_index(&self.graph)
        } else {
            None
        };
        let anchor = highlighted.or_else(|| {
            self.selection
                .selected_ids(&self.graph)
                .last()
                .and_then(|id| list.ordinal_of(id))
        });

        if let Some(target) = step_ordinal(&filtered, anchor, step) {
            self.highlight_or_select(&list, target);
        }
    }

    fn type_ahead(&mut self, c: char) {
        if self.is_multiple() {
            self.open_dropdown();
        }
        self.navigator.set_navigating(&mut self.graph, true);
        let buffer = self.navigator.type_char(c);
        let deadline = self.clock.now() + self.settings.type_ahead_reset();
        self.timers.arm(FieldTimer::TypeAheadReset, deadline);

        let list = self.registry.snapshot(&self.graph);
        let filtered = self.filtered_ordinals();
        match find_prefix_match(&list, &filtered, &buffer) {
            Some(ordinal) => self.highlight_or_select(&list, ordinal),
            None => tracing::trace!(buffer = %buffer, "type-ahead matched nothing"),
        }
    }

    /// Multi mode moves the highlight, single mode selects right away
    fn highlight_or_select(&mut self, list: &OptionList, ordinal: usize) {
        if self.is_multiple() {
            self.navigator.set_index(&mut self.graph, Some(ordinal));
            return;
        }
        if let Some(id) = list.get(ordinal).map(|option| option.id().clone()) {
            let changed = self.selection.select(&mut self.graph, list, &id);
            self.after_selection_change(changed);
        }
    }

    fn filtered_ordinals(&mut self) -> Vec<usize> {
        self.graph.get_derived(self.filtered).unwrap_or_default()
    }

    /// Multi mode clears the query after every user-driven selection change
    fn after_selection_change(&mut self, changed: bool) {
        if changed && self.is_multiple() {
            self.clear_query_text();
        }
    }

    // =========================================================================
    // PRESENTATION
    // =========================================================================

    pub fn is_filled(&self) -> bool {
        self.graph.peek_derived(self.is_filled).unwrap_or(false)
    }

    /// Selected labels, comma separated
    pub fn display_text(&self) -> String {
        self.graph.peek_derived(self.display_text).unwrap_or_default()
    }

    /// Number to show next to the display text, if any
    pub fn count_badge(&self) -> Option<usize> {
        let count = self.selection.len(&self.graph);
        (self.settings.count && count > 1).then_some(count)
    }

    /// Where the renderer should put the query input, if the field has one
    pub fn query_input_placement(&self) -> Option<QueryInputPlacement> {
        match self.query.mode() {
            QueryMode::None => None,
            _ => Some(self.settings.query_input_placement),
        }
    }

    /// Placeholder of the query input, if the field has one
    pub fn query_placeholder(&self) -> Option<&str> {
        let texts = &self.settings.texts;
        match self.query.mode() {
            QueryMode::None => None,
            QueryMode::Filter => Some(texts.filter_placeholder.as_str()),
            QueryMode::Search(_) => Some(texts.search_placeholder.as_str()),
        }
    }

    /// Message to show in place of an empty option list
    pub fn empty_message(&self) -> Option<&str> {
        let visible = self
            .graph
            .peek_derived(self.filtered)
            .map_or(0, |ordinals| ordinals.len());
        if visible > 0 {
            return None;
        }

        let texts = &self.settings.texts;
        let message: &String = match self.query.mode() {
            QueryMode::Search(_) => {
                let query = self.graph.get(self.query.search_text()).unwrap_or_default();
                if query.is_empty() {
                    &texts.search_query_empty
                } else {
                    &texts.search_no_match
                }
            }
            QueryMode::Filter => {
                let filter = self.graph.get(self.query.filter_text()).unwrap_or_default();
                if filter.is_empty() {
                    &texts.no_options
                } else {
                    &texts.filter_no_match
                }
            }
            QueryMode::None => &texts.no_options,
        };
        Some(message.as_str())
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Listen for selection changes, opening or closing
    ///
    /// Listeners only see actual changes; registering does not invoke them.
    pub fn on<F>(&mut self, kind: EventKind, mut listener: F) -> Result<ListenerId>
    where
        F: FnMut(&FieldEvent) + 'static,
    {
        let options = SubscribeOptions { auto_run: false };
        let id = match kind {
            EventKind::Change => {
                let multiple = self.is_multiple();
                let records = self.selection.options();
                self.graph.subscribe_with(
                    self.selection.ids(),
                    options,
                    move |graph: &mut ReactiveGraph, _: &Vec<OptionId>, _: &Vec<OptionId>| {
                        let records = graph.get(records).unwrap_or_default();
                        let value = FieldValue::from_records(multiple, records);
                        listener(&FieldEvent::Change(value));
                    },
                )?
            }
            EventKind::Open | EventKind::Close => {
                let wants_open = kind == EventKind::Open;
                let event = if wants_open { FieldEvent::Open } else { FieldEvent::Close };
                self.graph.subscribe_with(
                    self.navigator.is_open(),
                    options,
                    move |_: &mut ReactiveGraph, open: &bool, _: &bool| {
                        if *open == wants_open {
                            listener(&event);
                        }
                    },
                )?
            }
        };
        Ok(ListenerId(id))
    }

    /// Remove a listener. Removing it twice is a no-op.
    pub fn off(&mut self, listener: ListenerId) -> bool {
        self.graph.unsubscribe(listener.0)
    }

    /// Watch any of the field's cells, starting with its current value
    pub fn watch<T, C, F>(&mut self, cell: C, mut f: F) -> Result<ListenerId>
    where
        T: 'static,
        C: Observable<T>,
        F: FnMut(&T) + 'static,
    {
        let id = self
            .graph
            .subscribe(cell, move |_: &mut ReactiveGraph, new: &T, _: &T| f(new))?;
        Ok(ListenerId(id))
    }

    /// Tear the field down
    ///
    /// Every cell and listener is dropped and searches still in flight are
    /// ignored when they resolve.
    pub fn destroy(mut self) {
        self.timers.clear();
        self.query.teardown(&mut self.graph);
        self.navigator.teardown(&mut self.graph);
        self.registry.teardown(&mut self.graph);
        self.selection.teardown(&mut self.graph);
        self.graph.clear();
        tracing::debug!("select field destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn fruits() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor::new("apple", "Apple").id(1),
            OptionDescriptor::new("banana", "Banana").id(2),
            OptionDescriptor::new("cherry", "Cherry").id(3),
        ]
    }

    fn field(config: SelectConfig) -> SelectField {
        let mut field = SelectField::new(config).unwrap();
        field.set_options(fruits()).unwrap();
        field
    }

    #[test]
    fn test_invalid_config_builds_nothing() {
        let config = SelectConfig::new().type_ahead_reset(std::time::Duration::ZERO);
        assert!(SelectField::new(config).is_err());
    }

    #[test]
    fn test_filtered_follows_filter_text() {
        let mut field = field(SelectConfig::new().filterable(true));
        field.set_query("an");

        let filtered = field.graph().peek_derived(field.cells().filtered);
        assert_eq!(filtered, Some(vec![1]));
        assert!(!field.graph().has_pending());
    }

    #[test]
    fn test_is_filled_and_display_text() {
        let mut field = field(SelectConfig::new().multiple(true));
        assert!(!field.is_filled());

        field.select(3);
        field.select(1);
        assert!(field.is_filled());
        assert_eq!(field.display_text(), "Cherry, Apple");
        assert_eq!(field.count_badge(), Some(2));
    }

    #[test]
    fn test_count_badge_can_be_disabled() {
        let mut field = field(SelectConfig::new().multiple(true).count(false));
        field.select(1);
        field.select(2);
        assert_eq!(field.count_badge(), None);
    }

    #[test]
    fn test_open_requests_focus_for_the_option_list() {
        let mut field = field(SelectConfig::new());
        field.open();
        assert_eq!(field.take_focus_request(), Some(FocusTarget::OptionList));
        assert_eq!(field.take_focus_request(), None);

        field.close();
        assert_eq!(field.take_focus_request(), Some(FocusTarget::Trigger));
    }

    #[test]
    fn test_query_input_placement_needs_a_query_mode() {
        let plain = field(SelectConfig::new().query_input_placement(QueryInputPlacement::Dropdown));
        assert_eq!(plain.query_input_placement(), None);

        let filterable = field(SelectConfig::new().filterable(true));
        assert_eq!(filterable.query_input_placement(), Some(QueryInputPlacement::Root));

        let dropdown = field(
            SelectConfig::new()
                .filterable(true)
                .query_input_placement(QueryInputPlacement::Dropdown),
        );
        assert_eq!(dropdown.query_input_placement(), Some(QueryInputPlacement::Dropdown));
    }

    #[test]
    fn test_losing_focus_closes_without_restoring_focus() {
        let mut field = field(SelectConfig::new().filterable(true));
        field.set_focused(true);
        field.open();
        field.take_focus_request();

        field.set_focused(false);
        assert!(!field.is_open());
        assert!(!field.is_focused());
        assert_eq!(field.take_focus_request(), None);
    }

    #[test]
    fn test_watch_runs_immediately() {
        let mut field = field(SelectConfig::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let is_open = field.cells().is_open;

        field.watch(is_open, move |open: &bool| sink.borrow_mut().push(*open)).unwrap();
        field.open();

        assert_eq!(*seen.borrow(), vec![false, true]);
    }
}
