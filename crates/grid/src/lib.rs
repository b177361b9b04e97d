//! Project grid view-model: sorting, filtering, pagination, column visibility
//! and derived urgency over an immutable snapshot of project rows.
//!
//! Nothing here performs I/O or fails. Invalid input (unknown sort fields,
//! out-of-range pages, attempts to hide the actions column) is clamped or
//! ignored.

pub mod columns;
pub mod controller;
pub mod sort;
pub mod urgency;

pub use columns::{ColumnDescriptor, ColumnId, SortIndicator};
pub use controller::{
    GridActions, GridController, GridDefaults, GridView, GridViewState, PaginationState,
    RowAction, RowActionKind, RowCapabilities, RowPresentation,
};
pub use sort::{SortDirection, SortField};
pub use urgency::{derive_urgency, UrgencyBand};
