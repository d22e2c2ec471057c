//! Editing session for Mailblocks templates.
//!
//! [`EditorStore`] is the single mutation point; observers subscribe to its
//! [`ChangeBus`]. Saved widgets and template persistence live alongside.

pub mod bus;
pub mod library;
pub mod persistence;
pub mod store;

pub use bus::{ChangeBus, StoreEvent, SubscriptionId};
pub use library::{LibraryError, SavedWidget, WidgetLibrary};
pub use persistence::{MemoryRepository, RepositoryError, TemplateRecord, TemplateRepository};
pub use store::{EditorAction, EditorConfig, EditorStore, EditorTab, Theme};
