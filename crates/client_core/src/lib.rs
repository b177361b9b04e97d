//! Host layer for the project pages: repositories, the project snapshot,
//! partitioned grids, confirmations, form rules and the UI command bridge.

pub mod banner;
pub mod bridge;
pub mod error;
pub mod events;
pub mod form;
pub mod host;
pub mod repository;
pub mod shortcuts;
pub mod store;

pub use banner::{DismissalBackend, DismissalStore, FileDismissals, MemoryDismissals};
pub use error::RepositoryError;
pub use events::{ConfirmAction, HostEvent, Notice, NoticeLevel, PendingConfirmation};
pub use form::{Catalog, FormErrors, FormField, ProjectForm};
pub use host::{ProjectsHost, SubmitError};
pub use repository::{CatalogRepository, ProjectRepository};
pub use shortcuts::{CommandPalette, KeyBinding, KeyEvent, ShortcutRegistry, Subscription};
pub use store::{Partition, ProjectStore};
