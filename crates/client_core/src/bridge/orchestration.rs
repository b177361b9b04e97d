//! Dispatch helpers from UI actions to the host command queue.

use crossbeam_channel::{Sender, TrySendError};

use super::commands::HostCommand;

/// Queues `cmd` without blocking. Failures are reported through `status`.
pub fn dispatch_host_command(cmd_tx: &Sender<HostCommand>, cmd: HostCommand, status: &mut String) {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->host command"),
        Err(TrySendError::Full(_)) => {
            *status = "Command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Host worker disconnected; restart the application".to_string();
        }
    }
}
