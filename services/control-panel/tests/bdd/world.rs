//! BDD test world for the control panel

use control_panel::auth::LoginPage;
use control_panel::settings::{FormData, SettingsForm};
use control_panel::{Command, DashboardController};
use cucumber::World;

#[derive(Debug, Default, World)]
pub struct ControlPanelWorld {
    // Login testing
    pub login_page: Option<LoginPage>,
    pub login_result: Option<bool>,
    pub session_result: Option<bool>,

    // Dashboard testing
    pub controller: Option<DashboardController>,
    pub commands: Vec<Command>,
    pub frame_result: Option<control_panel::Result<()>>,

    // Settings testing
    pub settings: Option<SettingsForm>,
    pub form_data: Option<FormData>,
}
