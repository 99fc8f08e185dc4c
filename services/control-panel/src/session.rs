//! Runtime wiring of a dashboard session
//!
//! A [`Session`] owns the push connection, feeds every frame through the
//! [`DashboardController`] and executes the commands it returns against the
//! REST API. Commands triggered by server frames run on their own tasks so a
//! slow request never stalls the socket.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ControlApi;
use crate::auth::basic_auth_header;
use crate::config::{ClientType, Config, ReconnectConfig};
use crate::dashboard::{Command, ControllerHandle, DashboardController};
use crate::error::{ControlPanelError, Result};
use crate::io::ReqwestHttpClient;
use crate::message::{decode_frame, ClientId, OutputPanel, ServerEvent};
use crate::output::is_routine_gradle_line;
use crate::settings::ConfigRecord;
use crate::socket::{ConnectionFactory, FrameReader, WebSocketConnectionFactory};
use crate::view::Button;

const EVENT_CHANNEL_CAPACITY: usize = 256;

struct Shared {
    controller: ControllerHandle,
    api: ControlApi,
    factory: Arc<dyn ConnectionFactory>,
    socket_url: String,
    client_type: ClientType,
    reconnect: ReconnectConfig,
    events: broadcast::Sender<ServerEvent>,
}

/// A connected dashboard
pub struct Session {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    finished: CancellationToken,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(config: &Config, api: ControlApi, factory: Arc<dyn ConnectionFactory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Shared {
            controller: DashboardController::new(config).into_handle(),
            api,
            factory,
            socket_url: config.server.socket_url(),
            client_type: config.client_type,
            reconnect: config.reconnect.clone(),
            events,
        };

        Self {
            shared: Arc::new(shared),
            cancel: CancellationToken::new(),
            finished: CancellationToken::new(),
            reader: Mutex::new(None),
        }
    }

    /// Session talking to the server named in `config` over reqwest and
    /// tokio-tungstenite
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Arc::new(ReqwestHttpClient::new()?);
        let mut api = ControlApi::new(config.server.base_url(), http);
        let mut factory = WebSocketConnectionFactory::new();
        if let Some((username, password)) = config.credentials.pair() {
            api = api.with_credentials(username, password);
            factory = factory.with_authorization(basic_auth_header(username, password));
        }
        Ok(Self::new(config, api, Arc::new(factory)))
    }

    pub fn controller(&self) -> ControllerHandle {
        self.shared.controller.clone()
    }

    pub fn api(&self) -> &ControlApi {
        &self.shared.api
    }

    /// Receive every decoded server event
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.shared.events.subscribe()
    }

    /// Log in, load the footer version, connect the push socket and start
    /// reading
    pub async fn open(&self) -> Result<()> {
        self.shared.api.login().await?;

        let client_id = self.shared.controller.read().await.client_id();
        match self.shared.api.control_version(client_id).await {
            Ok(version) => {
                self.shared
                    .controller
                    .write()
                    .await
                    .set_control_version(&version);
            }
            Err(e) => tracing::warn!("Failed to fetch control version: {}", e),
        }

        let reader = self.shared.factory.connect(&self.shared.socket_url).await?;
        tracing::info!("Connected to {}", self.shared.socket_url);

        let handle = spawn_reader_task(
            reader,
            self.shared.clone(),
            self.cancel.clone(),
            self.finished.clone(),
        );
        *self.reader.lock().await = Some(handle);
        Ok(())
    }

    /// Wait until the server assigned a client id
    ///
    /// Fails as soon as the connection ends without one, or after `timeout`.
    pub async fn wait_for_client_id(&self, timeout: Duration) -> Result<ClientId> {
        let mut events = self.subscribe();
        let current = self.shared.controller.read().await.client_id();
        if current != ClientId::default() {
            return Ok(current);
        }

        let assigned = async {
            loop {
                match events.recv().await {
                    Ok(ServerEvent::ClientId(id)) => return Some(id),
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return None,
                }
            }
        };

        tokio::select! {
            biased;
            id = assigned => id.ok_or_else(closed_before_client_id),
            _ = self.closed() => Err(closed_before_client_id()),
            _ = tokio::time::sleep(timeout) => Err(ControlPanelError::WebSocket(format!(
                "no client id received within {:?}",
                timeout
            ))),
        }
    }

    /// Press a dashboard button and run the resulting requests to completion
    pub async fn press(&self, button: Button) {
        let commands = self.shared.controller.write().await.press(button);
        for command in commands {
            execute(&self.shared, command).await;
        }
    }

    /// Resolves once the reader task ended and will not reconnect
    pub async fn closed(&self) {
        self.finished.cancelled().await;
    }

    /// Stop reading and wait for the reader task to finish
    pub async fn shutdown(&self) {
        tracing::debug!("Shutting down session");
        self.cancel.cancel();
        if let Some(handle) = self.reader.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Reader task failed: {}", e);
            }
        }
    }
}

fn closed_before_client_id() -> ControlPanelError {
    ControlPanelError::WebSocket("connection closed before a client id arrived".to_string())
}

/// Hand every line of output to `sink` until `done` is cancelled and no
/// output arrived for `quiet`
///
/// Routine Gradle progress lines of an update are dropped.
pub async fn forward_output<F>(
    mut events: broadcast::Receiver<ServerEvent>,
    done: CancellationToken,
    quiet: Duration,
    mut sink: F,
) where
    F: FnMut(OutputPanel, &str) + Send,
{
    loop {
        let event = if done.is_cancelled() {
            match tokio::time::timeout(quiet, events.recv()).await {
                Ok(event) => event,
                Err(_) => break,
            }
        } else {
            tokio::select! {
                event = events.recv() => event,
                _ = done.cancelled() => continue,
            }
        };

        match event {
            Ok(ServerEvent::Output { panel, text }) => {
                for line in text.lines() {
                    if panel == OutputPanel::Update && is_routine_gradle_line(line) {
                        continue;
                    }
                    sink(panel, line);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Output lagged, skipped {} messages", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn spawn_reader_task(
    mut reader: Box<dyn FrameReader>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    finished: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            read_frames(reader.as_mut(), &shared, &cancel).await;
            if cancel.is_cancelled() {
                break;
            }

            shared.controller.write().await.disconnected();
            if !shared.reconnect.enabled {
                break;
            }
            match reconnect(&shared, &cancel).await {
                Some(next) => reader = next,
                None => break,
            }
        }
        tracing::debug!("Reader task finished");
        finished.cancel();
    })
}

async fn read_frames(
    reader: &mut dyn FrameReader,
    shared: &Arc<Shared>,
    cancel: &CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = reader.next_frame() => frame,
        };

        match frame {
            Ok(Some(frame)) => process_frame(shared, &frame).await,
            Ok(None) => {
                tracing::info!("Server closed the connection");
                return;
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                return;
            }
        }
    }
}

async fn reconnect(shared: &Shared, cancel: &CancellationToken) -> Option<Box<dyn FrameReader>> {
    let interval = Duration::from_secs(shared.reconnect.interval_seconds);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Reconnection cancelled");
                return None;
            }
        }

        tracing::info!("Reconnecting to {} (attempt {})", shared.socket_url, attempt);
        match shared.factory.connect(&shared.socket_url).await {
            Ok(reader) => {
                tracing::info!("Reconnected to {}", shared.socket_url);
                return Some(reader);
            }
            Err(e) => tracing::debug!("Reconnection attempt {} failed: {}", attempt, e),
        }
    }
}

async fn process_frame(shared: &Arc<Shared>, frame: &str) {
    tracing::debug!("Received frame: {}", frame);
    let events = match decode_frame(frame) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!("Ignoring malformed frame: {}", e);
            return;
        }
    };

    let commands: Vec<Command> = {
        let mut controller = shared.controller.write().await;
        events
            .iter()
            .cloned()
            .flat_map(|event| controller.apply(event))
            .collect()
    };

    for event in events {
        // No subscribers is fine
        let _ = shared.events.send(event);
    }

    for command in commands {
        let shared = shared.clone();
        tokio::spawn(async move {
            execute(&shared, command).await;
        });
    }
}

async fn execute(shared: &Shared, command: Command) {
    let client_id = shared.controller.read().await.client_id();
    match command {
        Command::RegisterClientType => {
            if let Err(e) = shared.api.set_client_type(client_id, shared.client_type).await {
                tracing::warn!("Failed to register client type: {}", e);
            }
        }
        Command::Send(action) => {
            if let Err(e) = shared.api.send(action, client_id).await {
                tracing::warn!("{:?} request failed: {}", action, e);
            }
            shared.controller.write().await.request_finished();
        }
        Command::LoadSettings => match load_settings(&shared.api, client_id).await {
            Ok((pdb, pui, record)) => {
                shared
                    .controller
                    .write()
                    .await
                    .settings_loaded(pdb, pui, &record);
            }
            Err(e) => tracing::warn!("Failed to load settings: {}", e),
        },
        Command::SaveSettings(data) => {
            if let Err(e) = shared.api.set_config(client_id, &data).await {
                tracing::warn!("Failed to save settings: {}", e);
            }
        }
    }
}

/// Branch lists and configuration, fetched one after the other
async fn load_settings(
    api: &ControlApi,
    client_id: ClientId,
) -> Result<(Vec<String>, Vec<String>, ConfigRecord)> {
    let pdb = api.pdb_branches(client_id).await?;
    let pui = api.pui_branches(client_id).await?;
    let record = api.get_config(client_id).await?;
    Ok((pdb, pui, record))
}
