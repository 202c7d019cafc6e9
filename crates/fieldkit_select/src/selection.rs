//! Selection store
//!
//! Selected ids in selection order, plus a parallel list of option records
//! so listeners can be handed the selected options without a registry
//! lookup. Both signals are always written together, records first, so
//! anything observing the ids can read matching records.
//!
//! Unknown ids are ignored rather than rejected: options may be replaced
//! while a user gesture is still in flight.

use fieldkit_core::{ReactiveGraph, ReadSignal, Signal};

use crate::option::{OptionId, OptionRecord};
use crate::registry::OptionList;

pub struct SelectionStore {
    ids: Signal<Vec<OptionId>>,
    options: Signal<Vec<OptionRecord>>,
    multiple: bool,
}

impl SelectionStore {
    pub fn new(graph: &mut ReactiveGraph, multiple: bool) -> Self {
        Self {
            ids: graph.create_signal(Vec::new()),
            options: graph.create_signal(Vec::new()),
            multiple,
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Read-only view of the selected ids
    pub fn ids(&self) -> ReadSignal<Vec<OptionId>> {
        self.ids.read_only()
    }

    /// Read-only view of the selected option records
    pub fn options(&self) -> ReadSignal<Vec<OptionRecord>> {
        self.options.read_only()
    }

    pub fn selected_ids(&self, graph: &ReactiveGraph) -> Vec<OptionId> {
        graph.get(self.ids).unwrap_or_default()
    }

    pub fn selected_options(&self, graph: &ReactiveGraph) -> Vec<OptionRecord> {
        graph.get(self.options).unwrap_or_default()
    }

    pub fn is_selected(&self, graph: &ReactiveGraph, id: &OptionId) -> bool {
        graph.with(self.ids, |ids| ids.contains(id)).unwrap_or(false)
    }

    pub fn len(&self, graph: &ReactiveGraph) -> usize {
        graph.with(self.ids, Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self, graph: &ReactiveGraph) -> bool {
        self.len(graph) == 0
    }

    /// Select an option
    ///
    /// Single-select replaces the selection, multi-select appends. A no-op
    /// when the id is already selected or not registered.
    pub fn select(&self, graph: &mut ReactiveGraph, list: &OptionList, id: &OptionId) -> bool {
        if self.is_selected(graph, id) {
            return false;
        }
        let Some(option) = list.by_id(id) else {
            tracing::trace!(%id, "ignoring selection of unknown option");
            return false;
        };

        let (mut ids, mut records) = if self.multiple {
            (self.selected_ids(graph), self.selected_options(graph))
        } else {
            (Vec::new(), Vec::new())
        };
        ids.push(id.clone());
        records.push(option.record().clone());
        self.write(graph, ids, records)
    }

    /// Deselect an option. A no-op when it is not selected.
    pub fn deselect(&self, graph: &mut ReactiveGraph, id: &OptionId) -> bool {
        if !self.is_selected(graph, id) {
            return false;
        }
        let mut ids = self.selected_ids(graph);
        let mut records = self.selected_options(graph);
        ids.retain(|selected| selected != id);
        records.retain(|record| &record.id != id);
        self.write(graph, ids, records)
    }

    pub fn toggle(&self, graph: &mut ReactiveGraph, list: &OptionList, id: &OptionId) -> bool {
        if self.is_selected(graph, id) {
            self.deselect(graph, id)
        } else {
            self.select(graph, list, id)
        }
    }

    pub fn deselect_all(&self, graph: &mut ReactiveGraph) -> bool {
        self.write(graph, Vec::new(), Vec::new())
    }

    /// Replace the selection with the registered options among `ids`
    ///
    /// Duplicates and unknown ids are skipped. Single-select keeps the first
    /// match only.
    pub fn replace<'a>(
        &self,
        graph: &mut ReactiveGraph,
        list: &OptionList,
        ids: impl IntoIterator<Item = &'a OptionId>,
    ) -> bool {
        let mut next_ids: Vec<OptionId> = Vec::new();
        let mut records = Vec::new();
        for id in ids {
            if next_ids.contains(id) {
                continue;
            }
            if let Some(option) = list.by_id(id) {
                next_ids.push(id.clone());
                records.push(option.record().clone());
                if !self.multiple {
                    break;
                }
            }
        }
        self.write(graph, next_ids, records)
    }

    /// Drop selected ids that are no longer registered and refresh the
    /// records of the ones that are. Returns how many were dropped.
    pub fn retain_registered(&self, graph: &mut ReactiveGraph, list: &OptionList) -> usize {
        let current = self.selected_ids(graph);
        let (kept, records): (Vec<_>, Vec<_>) = current
            .iter()
            .filter_map(|id| list.by_id(id).map(|option| (id.clone(), option.record().clone())))
            .unzip();
        let dropped = current.len() - kept.len();
        if dropped > 0 {
            tracing::debug!(dropped, "selection pruned after options were replaced");
        }
        self.write(graph, kept, records);
        dropped
    }

    pub fn teardown(&self, graph: &mut ReactiveGraph) {
        graph.dispose_signal(self.ids);
        graph.dispose_signal(self.options);
    }

    fn write(&self, graph: &mut ReactiveGraph, ids: Vec<OptionId>, records: Vec<OptionRecord>) -> bool {
        let records_changed = graph.set(self.options, records);
        let ids_changed = graph.set(self.ids, ids);
        records_changed || ids_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionDescriptor;
    use crate::registry::{OptionBindings, OptionRegistry};

    struct Fixture {
        graph: ReactiveGraph,
        store: SelectionStore,
        registry: OptionRegistry,
        bindings: OptionBindings,
    }

    fn fruits() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor::new("apple", "Apple").id(1),
            OptionDescriptor::new("banana", "Banana").id(2),
            OptionDescriptor::new("cherry", "Cherry").id(3),
        ]
    }

    fn fixture(multiple: bool) -> Fixture {
        let mut graph = ReactiveGraph::new();
        let store = SelectionStore::new(&mut graph, multiple);
        let nav_index = graph.create_signal(None::<usize>);
        let filter_text = graph.create_signal(String::new());
        let bindings = OptionBindings {
            selected_ids: store.ids(),
            nav_index,
            filter_text: filter_text.read_only(),
            multiple,
        };
        let mut registry = OptionRegistry::new(&mut graph);
        registry.set_options(&mut graph, &bindings, fruits()).unwrap();
        Fixture {
            graph,
            store,
            registry,
            bindings,
        }
    }

    fn setup(multiple: bool) -> (ReactiveGraph, SelectionStore, OptionList) {
        let f = fixture(multiple);
        let list = f.registry.snapshot(&f.graph);
        (f.graph, f.store, list)
    }

    fn id(n: i64) -> OptionId {
        OptionId::from(n)
    }

    #[test]
    fn test_single_select_replaces() {
        let (mut graph, store, list) = setup(false);

        assert!(store.select(&mut graph, &list, &id(2)));
        assert_eq!(store.selected_ids(&graph), vec![id(2)]);

        assert!(store.select(&mut graph, &list, &id(1)));
        assert_eq!(store.selected_ids(&graph), vec![id(1)]);
        assert_eq!(store.selected_options(&graph)[0].label, "Apple");
    }

    #[test]
    fn test_single_select_never_exceeds_one() {
        let (mut graph, store, list) = setup(false);

        for n in [1, 3, 2, 2, 9, 1] {
            store.select(&mut graph, &list, &id(n));
            assert!(store.len(&graph) <= 1);
        }
        assert_eq!(store.selected_ids(&graph), vec![id(1)]);
    }

    #[test]
    fn test_multi_select_appends_without_duplicates() {
        let (mut graph, store, list) = setup(true);

        store.select(&mut graph, &list, &id(3));
        store.select(&mut graph, &list, &id(1));
        assert!(!store.select(&mut graph, &list, &id(3)));

        assert_eq!(store.selected_ids(&graph), vec![id(3), id(1)]);
    }

    #[test]
    fn test_toggle_sequence() {
        let (mut graph, store, list) = setup(true);

        store.toggle(&mut graph, &list, &id(1));
        store.toggle(&mut graph, &list, &id(2));
        store.toggle(&mut graph, &list, &id(1));
        store.toggle(&mut graph, &list, &id(3));
        store.deselect(&mut graph, &id(2));

        assert_eq!(store.selected_ids(&graph), vec![id(3)]);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let (mut graph, store, list) = setup(true);

        assert!(!store.select(&mut graph, &list, &id(42)));
        assert!(!store.deselect(&mut graph, &id(42)));
        assert!(!store.toggle(&mut graph, &list, &OptionId::from("nope")));
        assert!(store.is_empty(&graph));
    }

    #[test]
    fn test_deselect_all() {
        let (mut graph, store, list) = setup(true);
        store.select(&mut graph, &list, &id(1));
        store.select(&mut graph, &list, &id(2));

        assert!(store.deselect_all(&mut graph));
        assert!(!store.deselect_all(&mut graph));
        assert!(store.selected_options(&graph).is_empty());
    }

    #[test]
    fn test_replace_keeps_first_in_single_mode() {
        let (mut graph, store, list) = setup(false);
        store.replace(&mut graph, &list, &[id(9), id(3), id(1)]);
        assert_eq!(store.selected_ids(&graph), vec![id(3)]);

        let (mut graph, store, list) = setup(true);
        store.replace(&mut graph, &list, &[id(3), id(9), id(1), id(3)]);
        assert_eq!(store.selected_ids(&graph), vec![id(3), id(1)]);
    }

    #[test]
    fn test_retain_registered_prunes_missing_ids() {
        let mut f = fixture(true);
        let list = f.registry.snapshot(&f.graph);
        f.store.select(&mut f.graph, &list, &id(1));
        f.store.select(&mut f.graph, &list, &id(3));

        f.registry
            .set_options(
                &mut f.graph,
                &f.bindings,
                vec![
                    OptionDescriptor::new("apple", "Green apple").id(1),
                    OptionDescriptor::new("banana", "Banana").id(2),
                ],
            )
            .unwrap();
        let list = f.registry.snapshot(&f.graph);

        assert_eq!(f.store.retain_registered(&mut f.graph, &list), 1);
        assert_eq!(f.store.selected_ids(&f.graph), vec![id(1)]);
        assert_eq!(f.store.selected_options(&f.graph)[0].label, "Green apple");

        assert_eq!(f.store.retain_registered(&mut f.graph, &OptionList::default()), 1);
        assert!(f.store.is_empty(&f.graph));
    }
}
