//! Keyboard navigation
//!
//! The open/closed state machine is a pure table ([`transition`]) from a
//! [`NavState`] and a [`Key`] to a [`NavAction`]; the field carries out the
//! action. Arrow movement and type-ahead work on ordinals of the *filtered*
//! sequence, so filtered-out options are skipped without leaving the
//! registry.

use fieldkit_core::{ReactiveGraph, ReadSignal, Signal};

use crate::option::normalize;
use crate::registry::OptionList;

/// A key press, as far as the field cares
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    ArrowUp,
    ArrowDown,
    Escape,
    Tab,
    /// A printable, non-space character
    Char(char),
    Other,
}

impl Key {
    /// Map a DOM-style key name (`"ArrowDown"`, `" "`, `"a"`, ...)
    pub fn from_name(name: &str) -> Self {
        match name {
            " " | "Space" | "Spacebar" => Key::Space,
            "Enter" => Key::Enter,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_control() && !c.is_whitespace() => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavState {
    Closed,
    Open,
}

/// Direction of an arrow step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

/// What the field has to do in response to a key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    /// Not handled
    None,
    Open,
    /// Close and give focus back to the trigger
    Close,
    /// Enter/Space while open: close (single) or toggle the highlight (multi)
    Confirm,
    Move(Step),
    TypeAhead(char),
}

/// The keyboard transition table
pub fn transition(state: NavState, key: Key) -> NavAction {
    match (state, key) {
        (NavState::Closed, Key::Space | Key::Enter | Key::ArrowUp | Key::ArrowDown) => {
            NavAction::Open
        }
        (NavState::Closed, Key::Escape | Key::Tab) => NavAction::None,
        (NavState::Open, Key::Space | Key::Enter) => NavAction::Confirm,
        (NavState::Open, Key::ArrowUp) => NavAction::Move(Step::Previous),
        (NavState::Open, Key::ArrowDown) => NavAction::Move(Step::Next),
        (NavState::Open, Key::Escape | Key::Tab) => NavAction::Close,
        (_, Key::Char(c)) => NavAction::TypeAhead(c),
        (_, Key::Other) => NavAction::None,
    }
}

/// The registry ordinal an arrow step lands on
///
/// `current` is the registry ordinal to step from. If it is not part of the
/// filtered sequence (or there is none) the first filtered option is chosen;
/// otherwise the step wraps around both ends.
pub fn step_ordinal(filtered: &[usize], current: Option<usize>, step: Step) -> Option<usize> {
    if filtered.is_empty() {
        return None;
    }
    let last = filtered.len() - 1;
    let position = current.and_then(|ordinal| filtered.iter().position(|o| *o == ordinal));
    let next = match (position, step) {
        (None, _) => 0,
        (Some(0), Step::Previous) => last,
        (Some(p), Step::Previous) => p - 1,
        (Some(p), Step::Next) if p == last => 0,
        (Some(p), Step::Next) => p + 1,
    };
    filtered.get(next).copied()
}

/// First filtered option whose normalized label starts with `query`
pub fn find_prefix_match(list: &OptionList, filtered: &[usize], query: &str) -> Option<usize> {
    let query = normalize(query);
    if query.is_empty() {
        return None;
    }
    filtered.iter().copied().find(|ordinal| {
        list.get(*ordinal)
            .is_some_and(|option| option.normalized_label().starts_with(&query))
    })
}

/// Characters typed in quick succession
#[derive(Debug, Default)]
pub struct TypeAhead {
    buffer: String,
}

impl TypeAhead {
    pub fn push(&mut self, c: char) -> &str {
        self.buffer.push(c);
        &self.buffer
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Navigation state cells
pub struct Navigator {
    is_open: Signal<bool>,
    nav_index: Signal<Option<usize>>,
    is_navigating: Signal<bool>,
    type_ahead: TypeAhead,
}

impl Navigator {
    pub fn new(graph: &mut ReactiveGraph) -> Self {
        Self {
            is_open: graph.create_signal(false),
            nav_index: graph.create_signal(None),
            is_navigating: graph.create_signal(false),
            type_ahead: TypeAhead::default(),
        }
    }

    pub fn state(&self, graph: &ReactiveGraph) -> NavState {
        if graph.get(self.is_open).unwrap_or(false) {
            NavState::Open
        } else {
            NavState::Closed
        }
    }

    pub fn is_open(&self) -> ReadSignal<bool> {
        self.is_open.read_only()
    }

    pub fn is_navigating(&self) -> ReadSignal<bool> {
        self.is_navigating.read_only()
    }

    pub fn nav_index(&self) -> ReadSignal<Option<usize>> {
        self.nav_index.read_only()
    }

    /// The writable nav index, for the registry to reset on replacement
    pub(crate) fn nav_index_signal(&self) -> Signal<Option<usize>> {
        self.nav_index
    }

    pub fn current_index(&self, graph: &ReactiveGraph) -> Option<usize> {
        graph.get(self.nav_index).flatten()
    }

    pub fn open(&self, graph: &mut ReactiveGraph) -> bool {
        graph.set(self.is_open, true)
    }

    pub fn close(&self, graph: &mut ReactiveGraph) -> bool {
        graph.set(self.is_open, false)
    }

    pub fn set_index(&self, graph: &mut ReactiveGraph, ordinal: Option<usize>) -> bool {
        graph.set(self.nav_index, ordinal)
    }

    pub fn set_navigating(&self, graph: &mut ReactiveGraph, navigating: bool) -> bool {
        graph.set(self.is_navigating, navigating)
    }

    /// Add a character to the type-ahead buffer and return the whole buffer
    pub fn type_char(&mut self, c: char) -> String {
        self.type_ahead.push(c).to_string()
    }

    pub fn type_ahead(&self) -> &str {
        self.type_ahead.as_str()
    }

    pub fn reset_type_ahead(&mut self) {
        tracing::trace!(buffer = self.type_ahead.as_str(), "type-ahead buffer reset");
        self.type_ahead.reset();
    }

    pub fn teardown(&mut self, graph: &mut ReactiveGraph) {
        graph.dispose_signal(self.is_open);
        graph.dispose_signal(self.nav_index);
        graph.dispose_signal(self.is_navigating);
        self.type_ahead.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{OptionDescriptor, OptionId};
    use crate::registry::{OptionBindings, OptionRegistry};

    #[test]
    fn test_closed_keys_open() {
        for key in [Key::Space, Key::Enter, Key::ArrowUp, Key::ArrowDown] {
            assert_eq!(transition(NavState::Closed, key), NavAction::Open);
        }
        assert_eq!(transition(NavState::Closed, Key::Escape), NavAction::None);
        assert_eq!(transition(NavState::Closed, Key::Tab), NavAction::None);
    }

    #[test]
    fn test_open_keys() {
        assert_eq!(transition(NavState::Open, Key::Enter), NavAction::Confirm);
        assert_eq!(transition(NavState::Open, Key::Space), NavAction::Confirm);
        assert_eq!(
            transition(NavState::Open, Key::ArrowUp),
            NavAction::Move(Step::Previous)
        );
        assert_eq!(
            transition(NavState::Open, Key::ArrowDown),
            NavAction::Move(Step::Next)
        );
        assert_eq!(transition(NavState::Open, Key::Escape), NavAction::Close);
        assert_eq!(transition(NavState::Open, Key::Tab), NavAction::Close);
    }

    #[test]
    fn test_printable_keys_type_ahead_in_both_states() {
        assert_eq!(
            transition(NavState::Closed, Key::Char('b')),
            NavAction::TypeAhead('b')
        );
        assert_eq!(
            transition(NavState::Open, Key::Char('b')),
            NavAction::TypeAhead('b')
        );
        assert_eq!(transition(NavState::Open, Key::Other), NavAction::None);
    }

    #[test]
    fn test_key_from_name() {
        assert_eq!(Key::from_name(" "), Key::Space);
        assert_eq!(Key::from_name("ArrowDown"), Key::ArrowDown);
        assert_eq!(Key::from_name("é"), Key::Char('é'));
        assert_eq!(Key::from_name("Shift"), Key::Other);
        assert_eq!(Key::from_name("F1"), Key::Other);
    }

    #[test]
    fn test_step_wraps_around() {
        let filtered = [0, 1, 2];
        assert_eq!(step_ordinal(&filtered, Some(2), Step::Next), Some(0));
        assert_eq!(step_ordinal(&filtered, Some(0), Step::Previous), Some(2));
        assert_eq!(step_ordinal(&filtered, Some(0), Step::Next), Some(1));
        assert_eq!(step_ordinal(&filtered, Some(2), Step::Previous), Some(1));
    }

    #[test]
    fn test_step_skips_filtered_out_options() {
        // registry ordinals 1 and 3 are filtered out
        let filtered = [0, 2, 4];
        assert_eq!(step_ordinal(&filtered, Some(0), Step::Next), Some(2));
        assert_eq!(step_ordinal(&filtered, Some(4), Step::Next), Some(0));
        // stepping from a hidden option starts over at the first visible one
        assert_eq!(step_ordinal(&filtered, Some(3), Step::Next), Some(0));
        assert_eq!(step_ordinal(&filtered, None, Step::Previous), Some(0));
        assert_eq!(step_ordinal(&[], None, Step::Next), None);
    }

    #[test]
    fn test_prefix_match() {
        let mut graph = ReactiveGraph::new();
        let selected_ids = graph.create_signal(Vec::<OptionId>::new());
        let filter_text = graph.create_signal(String::new());
        let navigator = Navigator::new(&mut graph);
        let bindings = OptionBindings {
            selected_ids: selected_ids.read_only(),
            nav_index: navigator.nav_index_signal(),
            filter_text: filter_text.read_only(),
            multiple: true,
        };
        let mut registry = OptionRegistry::new(&mut graph);
        registry
            .set_options(
                &mut graph,
                &bindings,
                vec![
                    OptionDescriptor::new("apple", "Apple"),
                    OptionDescriptor::new("banana", "Banana"),
                    OptionDescriptor::new("blueberry", "Blueberry"),
                    OptionDescriptor::new("eclair", "Éclair"),
                ],
            )
            .unwrap();
        let list = registry.snapshot(&graph);
        let all = [0, 1, 2, 3];

        assert_eq!(find_prefix_match(&list, &all, "b"), Some(1));
        assert_eq!(find_prefix_match(&list, &all, "BL"), Some(2));
        assert_eq!(find_prefix_match(&list, &all, "ec"), Some(3));
        assert_eq!(find_prefix_match(&list, &all, "x"), None);
        // only the filtered sequence is searched
        assert_eq!(find_prefix_match(&list, &[0, 2], "b"), Some(2));
    }

    #[test]
    fn test_type_ahead_buffer() {
        let mut graph = ReactiveGraph::new();
        let mut navigator = Navigator::new(&mut graph);

        assert_eq!(navigator.type_char('b'), "b");
        assert_eq!(navigator.type_char('a'), "ba");
        navigator.reset_type_ahead();
        assert_eq!(navigator.type_ahead(), "");
    }
}
