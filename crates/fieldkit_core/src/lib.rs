//! Fieldkit Core Runtime
//!
//! This crate provides the foundational primitives the fieldkit widgets are
//! built on:
//!
//! - **Reactive Cells**: mutable signals with `(new, old)` change notification
//! - **Derived Cells**: values computed from an explicit dependency list,
//!   recomputed eagerly or lazily (coalesced until the next flush)
//! - **Timers**: host-driven keyed deadlines over a swappable clock
//!
//! # Example
//!
//! ```rust
//! use fieldkit_core::reactive::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//!
//! // Create a signal
//! let count = graph.create_signal(0i32);
//!
//! // Create a derived value
//! let doubled = graph
//!     .create_derived(&[count.into()], move |g| g.get(count).unwrap_or(0) * 2)
//!     .unwrap();
//!
//! // Watch it
//! graph
//!     .subscribe(doubled, |_, new, old| println!("doubled: {old} -> {new}"))
//!     .unwrap();
//!
//! // Update the signal
//! graph.set(count, 5);
//! assert_eq!(graph.get_derived(doubled), Some(10));
//! ```

pub mod error;
pub mod reactive;
pub mod timer;

pub use error::{ReactiveError, Result};
pub use reactive::{
    Dependency, Derived, DerivedId, Observable, ReactiveGraph, ReactiveStats, ReadSignal,
    Recompute, Signal, SignalHandle, SignalId, SubscribeOptions, SubscriptionId,
};
pub use timer::{Clock, ManualClock, SystemClock, TimerQueue};
