//! Command queue between a UI thread and a worker that owns the host.

pub mod commands;
pub mod orchestration;
pub mod runtime;

pub use commands::HostCommand;
pub use orchestration::dispatch_host_command;
pub use runtime::launch;
