//! BDD step definitions for the control panel

pub mod dashboard_steps;
pub mod login_steps;
pub mod settings_steps;
