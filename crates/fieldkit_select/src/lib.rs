//! # Fieldkit Select
//!
//! Select-field state built on the `fieldkit_core` reactive graph: an ordered
//! option registry, single or multi selection, keyboard navigation with
//! type-ahead, and client-side filtering or debounced provider search.
//!
//! Rendering is left to the host. A [`SelectField`] takes user input through
//! its methods and exposes everything a renderer needs as read-only cells.
//!
//! ## Example
//!
//! ```rust
//! use fieldkit_select::prelude::*;
//!
//! let mut field = SelectField::new(SelectConfig::new().multiple(true)).unwrap();
//! field
//!     .set_options(vec![
//!         OptionDescriptor::new("apple", "Apple").id(1),
//!         OptionDescriptor::new("banana", "Banana").id(2),
//!     ])
//!     .unwrap();
//!
//! field.on(EventKind::Change, |event| println!("{event:?}")).unwrap();
//!
//! // Typing "ba" highlights Banana without selecting it
//! field.handle_key(Key::Char('b'));
//! field.handle_key(Key::Char('a'));
//! assert_eq!(field.graph().get(field.cells().nav_index), Some(Some(1)));
//!
//! // Enter toggles the highlighted option
//! field.handle_key(Key::Enter);
//! assert_eq!(field.get_value().ids(), vec![OptionId::from(2)]);
//! ```
//!
//! ## Search
//!
//! Searchable fields take a [`SearchProvider`]. Providers get a
//! [`SearchResponder`] they may resolve right away or from another task; the
//! host calls [`SelectField::tick`] to fire the debounce and apply results.

pub mod config;
pub mod error;
pub mod field;
pub mod navigation;
pub mod option;
pub mod query;
pub mod registry;
pub mod selection;

pub use config::{QueryInputPlacement, SelectConfig, SelectSettings, Texts};
pub use error::{FieldError, Result, SearchError};
pub use field::{EventKind, FieldCells, FieldEvent, FieldValue, FocusTarget, ListenerId, SelectField};
pub use navigation::{Key, NavAction, NavState, Step};
pub use option::{NativeOption, OptionDescriptor, OptionId, OptionRecord, SelectOption};
pub use query::{sync_search, QueryMode, SearchOutcome, SearchProvider, SearchResponder};
pub use registry::OptionList;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{SelectConfig, SelectSettings};
    pub use crate::field::{EventKind, FieldEvent, FieldValue, FocusTarget, SelectField};
    pub use crate::navigation::Key;
    pub use crate::option::{NativeOption, OptionDescriptor, OptionId, OptionRecord};
    pub use crate::query::{sync_search, SearchProvider, SearchResponder};
    pub use crate::error::{FieldError, SearchError};
}
