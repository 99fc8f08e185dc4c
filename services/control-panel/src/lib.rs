//! Control panel - native client for Polypheny-Control
//!
//! Logs in to a Polypheny-Control server, follows its push socket and drives
//! the dashboard state from the messages it receives.

pub mod ansi;
pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod io;
pub mod message;
pub mod output;
pub mod session;
pub mod settings;
pub mod socket;
pub mod view;

pub use api::{ControlAction, ControlApi};
pub use auth::{basic_auth_header, LoginPage, Navigation};
pub use config::{load_config, Config};
pub use dashboard::{Command, ControllerHandle, DashboardController};
pub use error::{ControlPanelError, Result};
pub use message::{decode_frame, ClientId, ServerEvent, Status};
pub use session::Session;
pub use view::{Button, View};

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Follow the server's push socket until Ctrl-C or until the connection is
/// gone for good, logging every event
pub async fn run(config: Config) -> Result<()> {
    let session = Session::from_config(&config)?;
    let mut events = session.subscribe();
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    session.open().await?;
    tracing::info!("Following {} (press Ctrl+C to stop)", config.server.socket_url());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = session.closed() => break,
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.shutdown().await;
    tracing::info!("Session closed");
    Ok(())
}

fn log_event(event: &ServerEvent) {
    match event {
        ServerEvent::ClientId(id) => tracing::info!("Client id: {}", id),
        ServerEvent::Status(status) => tracing::info!("Status: {}", status),
        ServerEvent::BenchmarkerConnected(connected) => {
            tracing::info!("Benchmarker connected: {}", connected)
        }
        ServerEvent::OtherInstances(count) => {
            if *count > 0 {
                tracing::warn!("{} other Polypheny instances running on this host", count);
            }
        }
        ServerEvent::Version(v) => tracing::info!(
            "PDB: {} @ {} ({} behind), PUI: {} @ {} ({} behind)",
            v.pdb_branch,
            v.pdb_commit,
            v.pdb_behind,
            v.pui_branch,
            v.pui_commit,
            v.pui_behind
        ),
        ServerEvent::Output { panel, text } => {
            for line in text.lines() {
                tracing::info!("[{}] {}", panel.topic(), line);
            }
        }
    }
}
