//! Dashboard controller
//!
//! Holds everything the dashboard shows and turns server events and button
//! presses into state changes plus a list of [`Command`]s for the session to
//! execute. The controller itself never performs I/O.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::ControlAction;
use crate::config::Config;
use crate::error::Result;
use crate::message::{decode_frame, ClientId, OutputPanel, ServerEvent, Status, VersionInfo};
use crate::output::{OutputBuffer, OutputPanels};
use crate::settings::{ConfigRecord, FormData, SettingsForm};
use crate::view::{Button, View};

/// Shown while other Polypheny instances run on the same host
pub const OTHER_INSTANCES_WARNING: &str =
    "There are other running instances of Polypheny on this host!";

const BEHIND_STYLE: &str = "color: #a90005; font-weight: 900";

/// Per-connection state that requests depend on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppContext {
    /// Id assigned by the server; `0` until the first message arrives
    pub client_id: ClientId,
    /// Last status reported by the server
    pub status: Option<Status>,
}

/// Which of the start/stop toggle buttons is visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PowerButton {
    #[default]
    Start,
    Stop,
}

/// Page background colour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Background {
    #[default]
    Normal,
    /// A benchmarker client is connected to the server
    Benchmarker,
    /// The push socket closed
    Disconnected,
}

impl Background {
    pub fn css(&self) -> &'static str {
        match self {
            Background::Normal => "#3B83C8",
            Background::Benchmarker => "#e5983d",
            Background::Disconnected => "gray",
        }
    }
}

/// Side effect requested by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Announce the client type for the id just received
    RegisterClientType,
    /// Fire a control request; report back via `request_finished`
    Send(ControlAction),
    /// Fetch branch lists and configuration, then call `settings_loaded`
    LoadSettings,
    /// Post the serialised settings form
    SaveSettings(FormData),
}

/// State of the dashboard
#[derive(Debug)]
pub struct DashboardController {
    context: AppContext,
    view: View,
    panels: OutputPanels,
    power_button: PowerButton,
    update_back_enabled: bool,
    pending_requests: usize,
    status_text: String,
    version_html: String,
    control_version: Option<String>,
    background: Background,
    error_header: Option<String>,
    settings: SettingsForm,
}

/// Shared handle used by the session and its tasks
pub type ControllerHandle = Arc<RwLock<DashboardController>>;

impl DashboardController {
    pub fn new(config: &Config) -> Self {
        Self {
            context: AppContext::default(),
            view: View::default(),
            panels: OutputPanels::new(config.output.max_lines),
            power_button: PowerButton::default(),
            update_back_enabled: true,
            pending_requests: 0,
            status_text: String::new(),
            version_html: String::new(),
            control_version: None,
            background: Background::default(),
            error_header: None,
            settings: SettingsForm::new(config.settings_form.clone()),
        }
    }

    pub fn into_handle(self) -> ControllerHandle {
        Arc::new(RwLock::new(self))
    }

    /// Decode a WebSocket frame and apply each of its events in order
    pub fn handle_frame(&mut self, frame: &str) -> Result<Vec<Command>> {
        let events = decode_frame(frame)?;
        tracing::trace!("Frame decoded into {} events", events.len());
        Ok(events
            .into_iter()
            .flat_map(|event| self.apply(event))
            .collect())
    }

    pub fn apply(&mut self, event: ServerEvent) -> Vec<Command> {
        match event {
            ServerEvent::ClientId(id) => {
                tracing::debug!("Received client id {}", id);
                self.context.client_id = id;
                return vec![Command::RegisterClientType];
            }
            ServerEvent::Status(status) => self.apply_status(status),
            ServerEvent::BenchmarkerConnected(connected) => {
                self.background = if connected {
                    Background::Benchmarker
                } else {
                    Background::Normal
                };
            }
            ServerEvent::OtherInstances(count) => {
                self.error_header = (count > 0).then(|| OTHER_INSTANCES_WARNING.to_string());
            }
            ServerEvent::Version(version) => {
                self.version_html = render_version(&version);
            }
            ServerEvent::Output { panel, text } => {
                let polyfier_mode = self.context.status == Some(Status::Polyfier);
                if panel == OutputPanel::Log && polyfier_mode {
                    self.panels.polyfier_log_mut().append(&text);
                } else {
                    self.panels.get_mut(panel).append(&text);
                }
            }
        }
        Vec::new()
    }

    fn apply_status(&mut self, status: Status) {
        match &status {
            Status::Running => {
                self.power_button = PowerButton::Stop;
                self.update_back_enabled = true;
            }
            Status::Idling => {
                self.power_button = PowerButton::Start;
                self.update_back_enabled = true;
            }
            Status::Updating | Status::Unrecognized(_) => {
                self.update_back_enabled = false;
            }
            Status::Polyfier => {}
        }

        let next = self.view.on_status(&status);
        if next != self.view {
            tracing::debug!("Status {} moves view {:?} -> {:?}", status, self.view, next);
            self.view = next;
        }
        self.status_text = format!("Status: {}", status);
        self.context.status = Some(status);
    }

    /// Press a button; buttons not on the visible page are ignored
    pub fn press(&mut self, button: Button) -> Vec<Command> {
        if button == Button::Back && !self.back_enabled() {
            tracing::debug!("Back button is disabled on {:?}", self.view);
            return Vec::new();
        }

        let Some(next) = self.view.on_button(button, self.context.status.as_ref()) else {
            tracing::debug!("Button {:?} is not on page {:?}", button, self.view);
            return Vec::new();
        };
        tracing::debug!("Button {:?}: {:?} -> {:?}", button, self.view, next);
        self.view = next;

        let mut commands = Vec::new();
        match button {
            Button::Update => self.update_back_enabled = false,
            Button::Settings => commands.push(Command::LoadSettings),
            Button::SaveSettings => {
                commands.push(Command::SaveSettings(self.settings.to_form_data()))
            }
            _ => {}
        }
        if let Some(action) = button.action() {
            self.pending_requests += 1;
            commands.push(Command::Send(action));
        }
        commands
    }

    /// A request issued via [`Command::Send`] completed, successfully or not
    pub fn request_finished(&mut self) {
        self.pending_requests = self.pending_requests.saturating_sub(1);
    }

    /// Branch lists and configuration arrived; shows the settings page
    pub fn settings_loaded(&mut self, pdb: Vec<String>, pui: Vec<String>, record: &ConfigRecord) {
        self.settings.set_branches(pdb, pui);
        self.settings.populate(record);
        if self.view == View::SettingsLoading {
            self.view = View::Settings;
        } else {
            tracing::debug!("Settings arrived after leaving the loading page");
        }
    }

    /// The push socket closed
    pub fn disconnected(&mut self) {
        tracing::info!("Connection to Polypheny-Control closed");
        self.background = Background::Disconnected;
    }

    pub fn set_control_version(&mut self, version: &str) {
        self.control_version = Some(format!("v{}", version));
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn client_id(&self) -> ClientId {
        self.context.client_id
    }

    pub fn status(&self) -> Option<&Status> {
        self.context.status.as_ref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn power_button(&self) -> PowerButton {
        self.power_button
    }

    /// Back buttons are disabled while a control request is in flight, and
    /// on the update page while an update runs
    pub fn back_enabled(&self) -> bool {
        self.pending_requests == 0 && (self.view != View::Update || self.update_back_enabled)
    }

    /// Footer status text, e.g. `Status: running`
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Footer version line as HTML
    pub fn version_html(&self) -> &str {
        &self.version_html
    }

    /// Footer control version, e.g. `v1.2.0`
    pub fn control_version(&self) -> Option<&str> {
        self.control_version.as_deref()
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn error_header(&self) -> Option<&str> {
        self.error_header.as_deref()
    }

    pub fn panels(&self) -> &OutputPanels {
        &self.panels
    }

    pub fn panel(&self, panel: OutputPanel) -> &OutputBuffer {
        self.panels.get(panel)
    }

    pub fn settings(&self) -> &SettingsForm {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsForm {
        &mut self.settings
    }
}

fn render_version(version: &VersionInfo) -> String {
    let pdb = version_line("PDB", &version.pdb_branch, &version.pdb_commit, version.pdb_behind);
    let pui = version_line("PUI", &version.pui_branch, &version.pui_commit, version.pui_behind);
    format!("{} <br> {}", pdb, pui)
}

fn version_line(label: &str, branch: &str, commit: &str, behind: u64) -> String {
    let short: String = commit.chars().take(7).collect();
    let line = format!("{}: {} @ {}", label, branch, short);
    if behind > 0 {
        format!("<span style='{}'>{}</span>", BEHIND_STYLE, line)
    } else {
        line
    }
}
