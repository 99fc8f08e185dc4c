//! Page state machine of the dashboard
//!
//! Exactly one page is visible at a time. Pages change either because a
//! button was pressed or because the server reported a new status; both are
//! handled by the transition functions on [`View`].

use serde::{Deserialize, Serialize};

use crate::api::ControlAction;
use crate::message::Status;

/// Visible page of the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    #[default]
    Dashboard,
    Log,
    Update,
    /// Settings requested, branch lists and configuration still loading
    SettingsLoading,
    Settings,
    /// Confirmation page for purging the Polypheny home folder
    PurgeConfirm,
    Polyfier,
    PolyfierRunning,
    PolyfierStopConfirm,
}

/// Buttons of the toolbar and the individual pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Start,
    Stop,
    Restart,
    Update,
    Log,
    Polyfier,
    Settings,
    PurgeHomeFolder,
    ConfirmPurge,
    ShowSettings,
    Back,
    SaveSettings,
    PolyfierStart,
    PolyfierStop,
    PolyfierStopBack,
    PolyfierStopForcefully,
    PolyfierStopGracefully,
}

impl Button {
    /// Control request triggered by this button, if any
    pub fn action(&self) -> Option<ControlAction> {
        match self {
            Button::Start => Some(ControlAction::Start),
            Button::Stop => Some(ControlAction::Stop),
            Button::Restart => Some(ControlAction::Restart),
            Button::Update => Some(ControlAction::Update),
            Button::ConfirmPurge => Some(ControlAction::PurgePolyphenyFolder),
            Button::PolyfierStart => Some(ControlAction::PolyfierStart),
            Button::PolyfierStopForcefully => Some(ControlAction::PolyfierStopForcefully),
            Button::PolyfierStopGracefully => Some(ControlAction::PolyfierStopGracefully),
            _ => None,
        }
    }
}

impl View {
    /// Page after pressing `button`; `None` if the button is not on this page
    pub fn on_button(self, button: Button, status: Option<&Status>) -> Option<View> {
        use Button as B;
        use View as V;

        match (self, button) {
            (V::Dashboard, B::Start | B::Stop | B::Restart | B::Log) => Some(V::Log),
            (V::Dashboard, B::Update) => Some(V::Update),
            (V::Dashboard, B::Polyfier) => Some(V::Polyfier),
            (V::Dashboard, B::Settings) => Some(V::SettingsLoading),

            (V::Settings, B::PurgeHomeFolder) => Some(V::PurgeConfirm),
            (V::Settings, B::SaveSettings) => Some(V::Settings),
            (V::PurgeConfirm, B::ConfirmPurge | B::ShowSettings) => Some(V::Settings),

            (
                V::Log | V::Update | V::Polyfier | V::SettingsLoading | V::Settings | V::PurgeConfirm,
                B::Back,
            ) => Some(V::Dashboard),

            (V::Polyfier, B::PolyfierStart) => Some(V::Polyfier),
            (V::PolyfierRunning, B::PolyfierStop) => Some(V::PolyfierStopConfirm),
            (V::PolyfierStopConfirm, B::PolyfierStopBack) => {
                if status == Some(&Status::Polyfier) {
                    Some(V::PolyfierRunning)
                } else {
                    Some(V::Dashboard)
                }
            }
            (V::PolyfierStopConfirm, B::PolyfierStopForcefully | B::PolyfierStopGracefully) => {
                Some(V::PolyfierRunning)
            }

            _ => None,
        }
    }

    /// Page after the server reported `status`
    pub fn on_status(self, status: &Status) -> View {
        match status {
            Status::Polyfier => {
                if self == View::PolyfierStopConfirm {
                    self
                } else {
                    View::PolyfierRunning
                }
            }
            Status::Running | Status::Idling => {
                if self == View::PolyfierRunning {
                    View::Dashboard
                } else {
                    self
                }
            }
            Status::Updating | Status::Unrecognized(_) => View::Update,
        }
    }
}
