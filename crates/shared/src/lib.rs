//! Domain records, ids and DTOs shared by the grid, storage and host layers.

pub mod dates;
pub mod domain;
pub mod error;
pub mod protocol;
