//! Option registry
//!
//! The canonical ordered option set of one field. The sequence lives in a
//! signal holding an [`OptionList`]: an insertion-ordered map, so id → ordinal
//! and ordinal → option are both O(1). The list is only ever replaced
//! wholesale, and each replacement is a new generation.

use std::rc::Rc;

use fieldkit_core::{ReactiveGraph, ReadSignal, Recompute, Signal};
use indexmap::IndexMap;

use crate::error::Result;
use crate::option::{label_matches, normalize, IdGenerator, OptionDescriptor, OptionId, OptionRecord, SelectOption};

/// An immutable snapshot of the registry's options
///
/// Two lists are equal only if they are the same snapshot, so replacing the
/// options always notifies, even with identical content.
#[derive(Clone, Debug, Default)]
pub struct OptionList(Rc<IndexMap<OptionId, Rc<SelectOption>>>);

impl PartialEq for OptionList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl OptionList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Option at a registry ordinal
    pub fn get(&self, ordinal: usize) -> Option<&Rc<SelectOption>> {
        self.0.get_index(ordinal).map(|(_, option)| option)
    }

    pub fn by_id(&self, id: &OptionId) -> Option<&Rc<SelectOption>> {
        self.0.get(id)
    }

    pub fn ordinal_of(&self, id: &OptionId) -> Option<usize> {
        self.0.get_index_of(id)
    }

    pub fn contains(&self, id: &OptionId) -> bool {
        self.0.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<SelectOption>> {
        self.0.values()
    }

    /// Plain copies of every option, in order
    pub fn records(&self) -> Vec<OptionRecord> {
        self.iter().map(|option| option.record.clone()).collect()
    }
}

/// Shared cells the per-option flags are computed from
#[derive(Clone, Copy, Debug)]
pub struct OptionBindings {
    pub selected_ids: ReadSignal<Vec<OptionId>>,
    pub nav_index: Signal<Option<usize>>,
    pub filter_text: ReadSignal<String>,
    pub multiple: bool,
}

/// What a replacement did
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Replacement {
    /// Ids of descriptors that asked to be selected, in order
    pub preselected: Vec<OptionId>,
    /// Descriptors dropped because their id was already taken
    pub duplicates: usize,
}

/// The canonical ordered option set
pub struct OptionRegistry {
    options: Signal<OptionList>,
    ids: IdGenerator,
    generation: u64,
}

impl OptionRegistry {
    pub fn new(graph: &mut ReactiveGraph) -> Self {
        Self {
            options: graph.create_signal(OptionList::default()),
            ids: IdGenerator::new(),
            generation: 0,
        }
    }

    /// Read-only view of the option list
    pub fn options(&self) -> ReadSignal<OptionList> {
        self.options.read_only()
    }

    pub fn snapshot(&self, graph: &ReactiveGraph) -> OptionList {
        graph.get(self.options).unwrap_or_default()
    }

    /// Number of wholesale replacements so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lookup_by_id(&self, graph: &ReactiveGraph, id: &OptionId) -> Option<Rc<SelectOption>> {
        graph.with(self.options, |list| list.by_id(id).cloned()).flatten()
    }

    pub fn ordinal_of(&self, graph: &ReactiveGraph, id: &OptionId) -> Option<usize> {
        graph.with(self.options, |list| list.ordinal_of(id)).flatten()
    }

    pub fn records(&self, graph: &ReactiveGraph) -> Vec<OptionRecord> {
        graph.with(self.options, OptionList::records).unwrap_or_default()
    }

    /// Replace the whole option sequence
    ///
    /// Options without an id get a generated one; a repeated id keeps the
    /// first occurrence and drops the later one with a warning. The previous
    /// generation's option flags are disposed and the navigation index is
    /// reset.
    pub fn set_options(
        &mut self,
        graph: &mut ReactiveGraph,
        bindings: &OptionBindings,
        descriptors: Vec<OptionDescriptor>,
    ) -> Result<Replacement> {
        let mut entries: IndexMap<OptionId, Rc<SelectOption>> =
            IndexMap::with_capacity(descriptors.len());
        let mut replacement = Replacement::default();

        for descriptor in descriptors {
            let id = match descriptor.id {
                Some(id) => id,
                None => self.ids.next_id(),
            };
            if entries.contains_key(&id) {
                tracing::warn!(%id, "an option with the same id already exists, skipping it");
                replacement.duplicates += 1;
                continue;
            }

            let label = if descriptor.label.is_empty() {
                descriptor.value.clone()
            } else {
                descriptor.label
            };
            let record = OptionRecord {
                id: id.clone(),
                label,
                html_label: descriptor.html_label,
                value: descriptor.value,
                data: descriptor.data,
            };
            let option = build_option(graph, bindings, record, entries.len())?;

            if descriptor.selected {
                replacement.preselected.push(id.clone());
            }
            entries.insert(id, Rc::new(option));
        }

        let previous = self.snapshot(graph);
        graph.set(self.options, OptionList(Rc::new(entries)));
        for option in previous.iter() {
            graph.dispose_derived(option.selected);
            graph.dispose_derived(option.active);
            graph.dispose_derived(option.matches_filter);
        }
        graph.set(bindings.nav_index, None);
        self.generation += 1;

        tracing::debug!(
            generation = self.generation,
            count = self.snapshot(graph).len(),
            duplicates = replacement.duplicates,
            "options replaced"
        );
        Ok(replacement)
    }

    /// Dispose the option flags and forget generated ids
    pub fn teardown(&mut self, graph: &mut ReactiveGraph) {
        for option in self.snapshot(graph).iter() {
            graph.dispose_derived(option.selected);
            graph.dispose_derived(option.active);
            graph.dispose_derived(option.matches_filter);
        }
        graph.dispose_signal(self.options);
        self.ids.reset();
    }
}

fn build_option(
    graph: &mut ReactiveGraph,
    bindings: &OptionBindings,
    record: OptionRecord,
    ordinal: usize,
) -> Result<SelectOption> {
    let normalized_label = normalize(&record.label);

    let id = record.id.clone();
    let selected_ids = bindings.selected_ids;
    let selected = graph.create_derived(&[selected_ids.into()], move |g| {
        g.with(selected_ids, |ids| ids.contains(&id)).unwrap_or(false)
    })?;

    let nav_index = bindings.nav_index;
    let multiple = bindings.multiple;
    let active = graph.create_derived(&[nav_index.into()], move |g| {
        multiple && g.get(nav_index).flatten() == Some(ordinal)
    })?;

    let label = normalized_label.clone();
    let filter_text = bindings.filter_text;
    // Recomputed once per turn however often the filter text changes
    let matches_filter = graph.create_derived_with(Recompute::Lazy, &[filter_text.into()], move |g| {
        g.with(filter_text, |filter| label_matches(&label, filter))
            .unwrap_or(true)
    })?;

    Ok(SelectOption {
        record,
        ordinal,
        normalized_label,
        selected,
        active,
        matches_filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        graph: ReactiveGraph,
        registry: OptionRegistry,
        bindings: OptionBindings,
        selected_ids: Signal<Vec<OptionId>>,
        filter_text: Signal<String>,
    }

    fn fixture(multiple: bool) -> Fixture {
        let mut graph = ReactiveGraph::new();
        let selected_ids = graph.create_signal(Vec::<OptionId>::new());
        let nav_index = graph.create_signal(None::<usize>);
        let filter_text = graph.create_signal(String::new());
        let registry = OptionRegistry::new(&mut graph);
        Fixture {
            graph,
            registry,
            bindings: OptionBindings {
                selected_ids: selected_ids.read_only(),
                nav_index,
                filter_text: filter_text.read_only(),
                multiple,
            },
            selected_ids,
            filter_text,
        }
    }

    fn fruits() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor::new("apple", "Apple").id(1),
            OptionDescriptor::new("banana", "Banana").id(2),
            OptionDescriptor::new("cherry", "Cherry").id(3),
        ]
    }

    #[test]
    fn test_lookup_is_bidirectional() {
        let mut f = fixture(false);
        f.registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();

        let list = f.registry.snapshot(&f.graph);
        assert_eq!(list.len(), 3);
        assert_eq!(f.registry.ordinal_of(&f.graph, &OptionId::from(2)), Some(1));
        assert_eq!(list.get(2).map(|o| o.label()), Some("Cherry"));
        assert_eq!(
            f.registry
                .lookup_by_id(&f.graph, &OptionId::from(1))
                .map(|o| o.value().to_string()),
            Some("apple".to_string())
        );
        assert!(f.registry.lookup_by_id(&f.graph, &OptionId::from(9)).is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first_occurrence() {
        let mut f = fixture(false);
        let mut options = fruits();
        options.push(OptionDescriptor::new("apricot", "Apricot").id(1));

        let replacement = f
            .registry
            .set_options(&mut f.graph, &f.bindings, options)
            .unwrap();

        assert_eq!(replacement.duplicates, 1);
        let records = f.registry.records(&f.graph);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].label, "Apple");
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let mut f = fixture(false);
        f.registry
            .set_options(
                &mut f.graph,
                &f.bindings,
                vec![
                    OptionDescriptor::new("a", "A"),
                    OptionDescriptor::new("b", ""),
                ],
            )
            .unwrap();

        let records = f.registry.records(&f.graph);
        assert_eq!(records[0].id, OptionId::from("_select_option_0"));
        assert_eq!(records[1].id, OptionId::from("_select_option_1"));
        assert_eq!(records[1].label, "b");
    }

    #[test]
    fn test_replacing_twice_keeps_ordinals() {
        let mut f = fixture(false);
        f.registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();
        let first: Vec<_> = f
            .registry
            .snapshot(&f.graph)
            .iter()
            .map(|o| (o.id().clone(), o.ordinal()))
            .collect();

        let replacement = f
            .registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();
        let second: Vec<_> = f
            .registry
            .snapshot(&f.graph)
            .iter()
            .map(|o| (o.id().clone(), o.ordinal()))
            .collect();

        assert_eq!(replacement.duplicates, 0);
        assert_eq!(first, second);
        assert_eq!(f.registry.generation(), 2);
    }

    #[test]
    fn test_replacement_resets_nav_index_and_disposes_flags() {
        let mut f = fixture(true);
        f.registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();
        let old = f.registry.snapshot(&f.graph);
        f.graph.set(f.bindings.nav_index, Some(1));
        assert_eq!(f.graph.get_derived(old.get(1).unwrap().active()), Some(true));

        f.registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();

        assert_eq!(f.graph.get(f.bindings.nav_index), Some(None));
        assert_eq!(f.graph.get_derived(old.get(1).unwrap().active()), None);
    }

    #[test]
    fn test_option_flags_follow_shared_state() {
        let mut f = fixture(false);
        f.registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();
        let list = f.registry.snapshot(&f.graph);
        let banana = list.by_id(&OptionId::from(2)).unwrap().clone();

        f.graph.set(f.selected_ids, vec![OptionId::from(2)]);
        assert_eq!(f.graph.get_derived(banana.selected()), Some(true));

        f.graph.set(f.filter_text, "ch".to_string());
        assert_eq!(f.graph.get_derived(banana.matches_filter()), Some(false));

        // Single-select never highlights through the nav index
        f.graph.set(f.bindings.nav_index, Some(1));
        assert_eq!(f.graph.get_derived(banana.active()), Some(false));
    }

    #[test]
    fn test_filter_flags_recompute_lazily() {
        let mut f = fixture(true);
        f.registry
            .set_options(&mut f.graph, &f.bindings, fruits())
            .unwrap();
        let list = f.registry.snapshot(&f.graph);
        let cherry = list.by_id(&OptionId::from(3)).unwrap().clone();
        assert_eq!(f.graph.recompute_policy(cherry.matches_filter()), Some(Recompute::Lazy));

        f.graph.set(f.filter_text, "c".to_string());
        f.graph.set(f.filter_text, "ba".to_string());
        assert!(f.graph.is_pending(cherry.matches_filter()));
        assert_eq!(f.graph.peek_derived(cherry.matches_filter()), Some(true));

        f.graph.flush();
        assert!(!f.graph.is_pending(cherry.matches_filter()));
        assert_eq!(f.graph.peek_derived(cherry.matches_filter()), Some(false));
    }

    #[test]
    fn test_preselected_descriptors_are_reported() {
        let mut f = fixture(true);
        let mut options = fruits();
        options[2].selected = true;
        options[0].selected = true;

        let replacement = f
            .registry
            .set_options(&mut f.graph, &f.bindings, options)
            .unwrap();
        assert_eq!(
            replacement.preselected,
            vec![OptionId::from(1), OptionId::from(3)]
        );
    }
}
