//! Reactive cells with explicit dependencies
//!
//! The graph owns every cell; callers hold cheap, copyable typed handles.
//!
//! - [`Signal<T>`] is a mutable cell. `set` with a value equal to the current
//!   one is a no-op; otherwise every subscriber is notified synchronously, in
//!   subscription order, with `(new, old)`. A `set` made from inside a
//!   callback is delivered to callbacks after the current notification
//!   finishes, so every subscriber sees every change in order.
//! - [`Derived<T>`] is computed from an explicit list of dependencies and is
//!   recomputed either eagerly (the moment a dependency notifies) or lazily
//!   (queued, coalesced, and recomputed on [`ReactiveGraph::flush`] or on the
//!   next read, whichever comes first).
//! - [`ReadSignal<T>`] is a read-only view of a signal. It can be read and
//!   subscribed to but never written.
//!
//! ```rust
//! use fieldkit_core::reactive::{ReactiveGraph, Recompute};
//!
//! let mut graph = ReactiveGraph::new();
//! let first = graph.create_signal(2i32);
//! let second = graph.create_signal(3i32);
//!
//! let product = graph
//!     .create_derived(&[first.into(), second.into()], move |g| {
//!         g.get(first).unwrap_or(0) * g.get(second).unwrap_or(0)
//!     })
//!     .unwrap();
//! assert_eq!(graph.recompute_policy(product), Some(Recompute::Lazy));
//!
//! graph.set(first, 4);
//! graph.set(second, 5);
//! // the pending recompute is forced by the read
//! assert_eq!(graph.get_derived(product), Some(20));
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{ReactiveError, Result};

new_key_type! {
    /// Unique identifier for a signal
    pub struct SignalId;
    /// Unique identifier for a derived value
    pub struct DerivedId;
    /// Unique identifier for a subscription callback
    pub struct SubscriptionId;
}

/// A cell a derived value or a subscription can depend on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dependency {
    Signal(SignalId),
    Derived(DerivedId),
}

/// Anything that can be notified when a cell changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Subscriber {
    Derived(DerivedId),
    Callback(SubscriptionId),
}

/// When a derived value recomputes after a dependency change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recompute {
    /// Recompute synchronously inside the dependency's notification
    Eager,
    /// Queue the recompute until the next flush or read
    Lazy,
}

impl Recompute {
    /// Lazy when more than one dependency can change in the same turn
    pub fn default_for(dependency_count: usize) -> Self {
        if dependency_count > 1 {
            Recompute::Lazy
        } else {
            Recompute::Eager
        }
    }
}

/// Options for [`ReactiveGraph::subscribe_with`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Invoke the callback once with the current value right away
    pub auto_run: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { auto_run: true }
    }
}

// =============================================================================
// HANDLES
// =============================================================================

/// A mutable reactive cell handle (cheap to copy)
pub struct Signal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

/// A read-only view of a signal
pub struct ReadSignal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

/// A derived value handle
pub struct Derived<T> {
    id: DerivedId,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! impl_handle {
    ($handle:ident, $id:ident) => {
        impl<T> Clone for $handle<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $handle<T> {}

        impl<T> PartialEq for $handle<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $handle<T> {}

        impl<T> fmt::Debug for $handle<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($handle)).field(&self.id).finish()
            }
        }

        impl<T> $handle<T> {
            fn from_key(id: $id) -> Self {
                Self {
                    id,
                    _marker: PhantomData,
                }
            }

            /// Get the cell's internal ID
            pub fn id(&self) -> $id {
                self.id
            }
        }
    };
}

impl_handle!(Signal, SignalId);
impl_handle!(ReadSignal, SignalId);
impl_handle!(Derived, DerivedId);

impl<T> Signal<T> {
    /// A view of this signal that can only be read and subscribed to
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal::from_key(self.id)
    }
}

/// Handles whose value lives in a signal node
pub trait SignalHandle<T>: Copy {
    fn signal_id(&self) -> SignalId;
}

impl<T> SignalHandle<T> for Signal<T> {
    fn signal_id(&self) -> SignalId {
        self.id
    }
}

impl<T> SignalHandle<T> for ReadSignal<T> {
    fn signal_id(&self) -> SignalId {
        self.id
    }
}

/// Any cell of value type `T` that can be subscribed to or depended on
pub trait Observable<T>: Copy {
    fn dependency(&self) -> Dependency;
}

impl<T> Observable<T> for Signal<T> {
    fn dependency(&self) -> Dependency {
        Dependency::Signal(self.id)
    }
}

impl<T> Observable<T> for ReadSignal<T> {
    fn dependency(&self) -> Dependency {
        Dependency::Signal(self.id)
    }
}

impl<T> Observable<T> for Derived<T> {
    fn dependency(&self) -> Dependency {
        Dependency::Derived(self.id)
    }
}

impl<T> From<Signal<T>> for Dependency {
    fn from(signal: Signal<T>) -> Self {
        Dependency::Signal(signal.id)
    }
}

impl<T> From<ReadSignal<T>> for Dependency {
    fn from(signal: ReadSignal<T>) -> Self {
        Dependency::Signal(signal.id)
    }
}

impl<T> From<Derived<T>> for Dependency {
    fn from(derived: Derived<T>) -> Self {
        Dependency::Derived(derived.id)
    }
}

// =============================================================================
// NODES
// =============================================================================

type Value = Rc<dyn Any>;
type EqFn = fn(&dyn Any, &dyn Any) -> bool;
type ComputeFn = Rc<dyn Fn(&ReactiveGraph) -> Value>;
type Callback = Box<dyn FnMut(&mut ReactiveGraph, &dyn Any, &dyn Any)>;

fn value_eq<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

struct SignalNode {
    value: Value,
    eq: EqFn,
    version: u64,
    subscribers: SmallVec<[Subscriber; 4]>,
}

struct DerivedNode {
    value: Value,
    eq: EqFn,
    compute: ComputeFn,
    dependencies: SmallVec<[Dependency; 4]>,
    policy: Recompute,
    /// Queued for a lazy recompute
    pending: bool,
    subscribers: SmallVec<[Subscriber; 4]>,
}

/// Callback notifications raised while another callback was running
struct Delivery {
    callbacks: SmallVec<[SubscriptionId; 4]>,
    new: Value,
    old: Value,
}

struct SubscriptionNode {
    source: Dependency,
    /// Taken out while the callback runs so it is never re-entered
    callback: Option<Callback>,
}

/// The reactive graph that owns all cells and subscriptions
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalNode>,
    derived: SlotMap<DerivedId, DerivedNode>,
    subscriptions: SlotMap<SubscriptionId, SubscriptionNode>,
    /// Lazy derived values waiting for a recompute
    pending: VecDeque<DerivedId>,
    /// Deferred callback notifications, delivered in FIFO order
    deliveries: VecDeque<Delivery>,
    notify_depth: usize,
    callbacks_running: usize,
    draining: bool,
    /// Bumped on every value change
    global_version: u64,
}

impl ReactiveGraph {
    /// Create a new reactive graph
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            derived: SlotMap::with_key(),
            subscriptions: SlotMap::with_key(),
            pending: VecDeque::new(),
            deliveries: VecDeque::new(),
            notify_depth: 0,
            callbacks_running: 0,
            draining: false,
            global_version: 0,
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Create a new signal with an initial value
    pub fn create_signal<T: PartialEq + 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalNode {
            value: Rc::new(initial),
            eq: value_eq::<T>,
            version: 0,
            subscribers: SmallVec::new(),
        });
        Signal::from_key(id)
    }

    /// Get the current value of a signal
    pub fn get<T: Clone + 'static>(&self, signal: impl SignalHandle<T>) -> Option<T> {
        self.with(signal, T::clone)
    }

    /// Borrow the current value of a signal
    pub fn with<T: 'static, R>(
        &self,
        signal: impl SignalHandle<T>,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        self.signals
            .get(signal.signal_id())
            .and_then(|node| node.value.downcast_ref::<T>())
            .map(f)
    }

    /// Set the value of a signal
    ///
    /// Returns `false` (and notifies nobody) when the value is equal to the
    /// current one or the signal no longer exists.
    pub fn set<T: 'static>(&mut self, signal: Signal<T>, value: T) -> bool {
        let Some(node) = self.signals.get_mut(signal.id) else {
            return false;
        };
        let value: Value = Rc::new(value);
        if (node.eq)(&*node.value, &*value) {
            return false;
        }

        let old = std::mem::replace(&mut node.value, Rc::clone(&value));
        node.version += 1;
        let subscribers = node.subscribers.clone();
        self.global_version += 1;

        self.notify(&subscribers, &value, &old);
        true
    }

    /// Update a signal in place using a function
    pub fn update<T: Clone + 'static>(&mut self, signal: Signal<T>, f: impl FnOnce(&mut T)) -> bool {
        let Some(mut current) = self.get(signal) else {
            return false;
        };
        f(&mut current);
        self.set(signal, current)
    }

    /// Get the version of a signal (for change detection)
    pub fn signal_version(&self, id: SignalId) -> Option<u64> {
        self.signals.get(id).map(|n| n.version)
    }

    // =========================================================================
    // DERIVED VALUES
    // =========================================================================

    /// Create a derived value with the default policy for its dependency count
    pub fn create_derived<T, F>(&mut self, dependencies: &[Dependency], compute: F) -> Result<Derived<T>>
    where
        T: Clone + PartialEq + 'static,
        F: Fn(&ReactiveGraph) -> T + 'static,
    {
        self.create_derived_with(Recompute::default_for(dependencies.len()), dependencies, compute)
    }

    /// Create a derived value with an explicit recompute policy
    ///
    /// The value is computed once right away. `compute` must only read the
    /// declared dependencies; those are guaranteed to be current whenever it
    /// runs.
    pub fn create_derived_with<T, F>(
        &mut self,
        policy: Recompute,
        dependencies: &[Dependency],
        compute: F,
    ) -> Result<Derived<T>>
    where
        T: Clone + PartialEq + 'static,
        F: Fn(&ReactiveGraph) -> T + 'static,
    {
        if dependencies.is_empty() {
            return Err(ReactiveError::EmptyDependencies);
        }
        if let Some(missing) = dependencies.iter().find(|dep| !self.contains(**dep)) {
            return Err(ReactiveError::UnknownDependency(*missing));
        }

        for dep in dependencies {
            if let Dependency::Derived(id) = dep {
                self.refresh(*id);
            }
        }

        let compute_boxed: ComputeFn = Rc::new(move |graph: &ReactiveGraph| -> Value {
            Rc::new(compute(graph))
        });
        let value = compute_boxed(self);

        let id = self.derived.insert(DerivedNode {
            value,
            eq: value_eq::<T>,
            compute: compute_boxed,
            dependencies: dependencies.iter().copied().collect(),
            policy,
            pending: false,
            subscribers: SmallVec::new(),
        });
        for dep in dependencies {
            self.add_subscriber(*dep, Subscriber::Derived(id));
        }

        tracing::trace!(?id, ?policy, deps = dependencies.len(), "derived cell created");
        Ok(Derived::from_key(id))
    }

    /// Get the value of a derived, recomputing first if one is pending
    pub fn get_derived<T: Clone + 'static>(&mut self, derived: Derived<T>) -> Option<T> {
        self.refresh(derived.id);
        self.peek_derived(derived)
    }

    /// Get the value of a derived as of its last recompute
    ///
    /// Inside a compute function the declared dependencies are always
    /// current, so this is the way to read derived dependencies there.
    pub fn peek_derived<T: Clone + 'static>(&self, derived: Derived<T>) -> Option<T> {
        self.derived
            .get(derived.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// The recompute policy of a derived value
    pub fn recompute_policy<T>(&self, derived: Derived<T>) -> Option<Recompute> {
        self.derived.get(derived.id).map(|node| node.policy)
    }

    /// Whether a lazy recompute is queued for this derived value
    pub fn is_pending<T>(&self, derived: Derived<T>) -> bool {
        self.derived.get(derived.id).is_some_and(|node| node.pending)
    }

    /// Run every queued lazy recompute
    ///
    /// This is the end-of-turn point. Recomputes queued while flushing are
    /// processed in the same call. Returns the number of recomputes run.
    pub fn flush(&mut self) -> usize {
        let mut ran = 0;
        while let Some(id) = self.pending.pop_front() {
            if self.derived.get(id).is_some_and(|node| node.pending) {
                self.recompute(id);
                ran += 1;
            }
        }
        ran
    }

    /// Whether any lazy recompute is waiting for a flush
    pub fn has_pending(&self) -> bool {
        self.pending
            .iter()
            .any(|id| self.derived.get(*id).is_some_and(|node| node.pending))
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe to a cell, invoking `f` once right away with the current value
    pub fn subscribe<T, C, F>(&mut self, cell: C, f: F) -> Result<SubscriptionId>
    where
        T: 'static,
        C: Observable<T>,
        F: FnMut(&mut ReactiveGraph, &T, &T) + 'static,
    {
        self.subscribe_with(cell, SubscribeOptions::default(), f)
    }

    /// Subscribe to a cell
    ///
    /// The callback receives `(new, old)`. Subscriptions added while a
    /// notification is running are not invoked for that notification, and a
    /// callback is never re-entered while it is running.
    pub fn subscribe_with<T, C, F>(
        &mut self,
        cell: C,
        options: SubscribeOptions,
        mut f: F,
    ) -> Result<SubscriptionId>
    where
        T: 'static,
        C: Observable<T>,
        F: FnMut(&mut ReactiveGraph, &T, &T) + 'static,
    {
        let source = cell.dependency();
        if !self.contains(source) {
            return Err(ReactiveError::UnknownCell(source));
        }

        let callback: Callback = Box::new(move |graph, new, old| {
            if let (Some(new), Some(old)) = (new.downcast_ref::<T>(), old.downcast_ref::<T>()) {
                f(graph, new, old);
            }
        });
        let id = self.subscriptions.insert(SubscriptionNode {
            source,
            callback: Some(callback),
        });
        self.add_subscriber(source, Subscriber::Callback(id));

        if options.auto_run {
            if let Dependency::Derived(derived) = source {
                self.refresh(derived);
            }
            if let Some(current) = self.current_value(source) {
                self.run_callback(id, &current, &current);
            }
        }
        Ok(id)
    }

    /// Remove a subscription. Unsubscribing twice is a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(node) = self.subscriptions.remove(id) else {
            return false;
        };
        self.remove_subscriber(node.source, Subscriber::Callback(id));
        true
    }

    // =========================================================================
    // TEARDOWN
    // =========================================================================

    /// Remove a signal and every subscription callback attached to it
    pub fn dispose_signal<T>(&mut self, signal: Signal<T>) -> bool {
        let Some(node) = self.signals.remove(signal.id) else {
            return false;
        };
        self.drop_callbacks(&node.subscribers);
        true
    }

    /// Remove a derived value, detaching it from its dependencies
    pub fn dispose_derived<T>(&mut self, derived: Derived<T>) -> bool {
        let Some(node) = self.derived.remove(derived.id) else {
            return false;
        };
        for dep in &node.dependencies {
            self.remove_subscriber(*dep, Subscriber::Derived(derived.id));
        }
        self.drop_callbacks(&node.subscribers);
        self.pending.retain(|id| *id != derived.id);
        true
    }

    /// Drop every cell and subscription
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.derived.clear();
        self.signals.clear();
        self.pending.clear();
        self.deliveries.clear();
    }

    /// Get statistics about the reactive graph
    pub fn stats(&self) -> ReactiveStats {
        ReactiveStats {
            signal_count: self.signals.len(),
            derived_count: self.derived.len(),
            subscription_count: self.subscriptions.len(),
            pending_recomputes: self
                .derived
                .values()
                .filter(|node| node.pending)
                .count(),
            global_version: self.global_version,
        }
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn contains(&self, dep: Dependency) -> bool {
        match dep {
            Dependency::Signal(id) => self.signals.contains_key(id),
            Dependency::Derived(id) => self.derived.contains_key(id),
        }
    }

    fn current_value(&self, dep: Dependency) -> Option<Value> {
        match dep {
            Dependency::Signal(id) => self.signals.get(id).map(|n| Rc::clone(&n.value)),
            Dependency::Derived(id) => self.derived.get(id).map(|n| Rc::clone(&n.value)),
        }
    }

    fn add_subscriber(&mut self, dep: Dependency, sub: Subscriber) {
        let subscribers = match dep {
            Dependency::Signal(id) => self.signals.get_mut(id).map(|n| &mut n.subscribers),
            Dependency::Derived(id) => self.derived.get_mut(id).map(|n| &mut n.subscribers),
        };
        if let Some(subscribers) = subscribers {
            if !subscribers.contains(&sub) {
                subscribers.push(sub);
            }
        }
    }

    fn remove_subscriber(&mut self, dep: Dependency, sub: Subscriber) {
        let subscribers = match dep {
            Dependency::Signal(id) => self.signals.get_mut(id).map(|n| &mut n.subscribers),
            Dependency::Derived(id) => self.derived.get_mut(id).map(|n| &mut n.subscribers),
        };
        if let Some(subscribers) = subscribers {
            subscribers.retain(|s| *s != sub);
        }
    }

    fn drop_callbacks(&mut self, subscribers: &[Subscriber]) {
        for sub in subscribers {
            if let Subscriber::Callback(id) = sub {
                self.subscriptions.remove(*id);
            }
        }
    }

    /// Notify a snapshot of subscribers
    ///
    /// Derived subscribers are always updated right away. Callbacks are run in
    /// place unless another callback is running; then they are queued behind
    /// the notification in progress.
    fn notify(&mut self, subscribers: &[Subscriber], new: &Value, old: &Value) {
        self.notify_depth += 1;
        if self.callbacks_running > 0 {
            let mut callbacks = SmallVec::new();
            for sub in subscribers {
                match *sub {
                    Subscriber::Derived(id) => self.dependency_changed(id),
                    Subscriber::Callback(id) => callbacks.push(id),
                }
            }
            if !callbacks.is_empty() {
                self.deliveries.push_back(Delivery {
                    callbacks,
                    new: Rc::clone(new),
                    old: Rc::clone(old),
                });
            }
        } else {
            for sub in subscribers {
                match *sub {
                    Subscriber::Derived(id) => self.dependency_changed(id),
                    Subscriber::Callback(id) => self.run_callback(id, new, old),
                }
            }
        }
        self.notify_depth -= 1;
        self.drain_deliveries();
    }

    /// Deliver queued notifications once nothing else is being notified
    fn drain_deliveries(&mut self) {
        if self.draining || self.notify_depth > 0 || self.callbacks_running > 0 {
            return;
        }
        self.draining = true;
        while let Some(delivery) = self.deliveries.pop_front() {
            for id in delivery.callbacks {
                self.run_callback(id, &delivery.new, &delivery.old);
            }
        }
        self.draining = false;
    }

    fn run_callback(&mut self, id: SubscriptionId, new: &Value, old: &Value) {
        let Some(mut callback) = self
            .subscriptions
            .get_mut(id)
            .and_then(|node| node.callback.take())
        else {
            return;
        };

        self.callbacks_running += 1;
        callback(self, &**new, &**old);
        self.callbacks_running -= 1;

        // The callback may have unsubscribed itself
        if let Some(node) = self.subscriptions.get_mut(id) {
            node.callback = Some(callback);
        }
        self.drain_deliveries();
    }

    fn dependency_changed(&mut self, id: DerivedId) {
        let Some(node) = self.derived.get_mut(id) else {
            return;
        };
        match node.policy {
            Recompute::Eager => self.recompute(id),
            Recompute::Lazy => {
                if !node.pending {
                    node.pending = true;
                    self.pending.push_back(id);
                }
            }
        }
    }

    /// Bring a derived value up to date
    ///
    /// Derived dependencies are refreshed first, since recomputing them may
    /// queue this value. Then a queued recompute is run.
    fn refresh(&mut self, id: DerivedId) {
        let Some(node) = self.derived.get(id) else {
            return;
        };
        let upstream: SmallVec<[DerivedId; 4]> = node
            .dependencies
            .iter()
            .filter_map(|dep| match dep {
                Dependency::Derived(dep_id) => Some(*dep_id),
                Dependency::Signal(_) => None,
            })
            .collect();
        for dep_id in upstream {
            self.refresh(dep_id);
        }
        if self.derived.get(id).is_some_and(|node| node.pending) {
            self.recompute(id);
        }
    }

    fn recompute(&mut self, id: DerivedId) {
        let Some(node) = self.derived.get(id) else {
            return;
        };
        let compute = Rc::clone(&node.compute);
        let dependencies = node.dependencies.clone();

        for dep in dependencies {
            if let Dependency::Derived(dep_id) = dep {
                self.refresh(dep_id);
            }
        }

        // Refreshing a dependency may have queued this value again
        let Some(node) = self.derived.get_mut(id) else {
            return;
        };
        node.pending = false;
        let value = compute(self);

        let Some(node) = self.derived.get_mut(id) else {
            return;
        };
        if (node.eq)(&*node.value, &*value) {
            return;
        }
        let old = std::mem::replace(&mut node.value, Rc::clone(&value));
        let subscribers = node.subscribers.clone();
        self.global_version += 1;

        self.notify(&subscribers, &value, &old);
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the reactive graph
#[derive(Debug, Clone)]
pub struct ReactiveStats {
    pub signal_count: usize,
    pub derived_count: usize,
    pub subscription_count: usize,
    pub pending_recomputes: usize,
    pub global_version: u64,
}
