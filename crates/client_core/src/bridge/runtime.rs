//! Worker thread that owns the host and a single-threaded tokio runtime.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use super::commands::HostCommand;
use crate::{
    host::ProjectsHost,
    repository::{CatalogRepository, ProjectRepository},
};

/// Processes commands in arrival order until every sender is dropped.
pub fn launch<R>(mut host: ProjectsHost<R>, cmd_rx: Receiver<HostCommand>) -> JoinHandle<()>
where
    R: ProjectRepository + CatalogRepository + 'static,
{
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build host runtime: {err}");
                return;
            }
        };

        while let Ok(cmd) = cmd_rx.recv() {
            let cmd_name = cmd.name();
            tracing::debug!(command = cmd_name, "processing host command");
            runtime.block_on(process(&mut host, cmd));
        }
        tracing::debug!("host command queue closed");
    })
}

/// Outcomes reach the UI as host events, so results are dropped here.
async fn process<R>(host: &mut ProjectsHost<R>, cmd: HostCommand)
where
    R: ProjectRepository + CatalogRepository,
{
    match cmd {
        HostCommand::Refresh => {
            let _ = host.refresh().await;
        }
        HostCommand::LoadCatalog => {
            let _ = host.load_catalog().await;
        }
        HostCommand::RowAction(action) => {
            let _ = host.handle_row_action(action);
        }
        HostCommand::Confirm => {
            let _ = host.confirm().await;
        }
        HostCommand::Cancel => {
            host.cancel();
        }
        HostCommand::Submit(form) => {
            let _ = host.submit(&form).await;
        }
        HostCommand::Delete { project_id } => {
            let _ = host.delete(project_id).await;
        }
        HostCommand::MarkCompleted { project_id } => {
            let _ = host.mark_completed(project_id).await;
        }
    }
}
