//! BDD step definitions for the dashboard feature

use cucumber::{given, then, when};
use serde_json::json;

use control_panel::dashboard::PowerButton;
use control_panel::message::OutputPanel;
use control_panel::{Button, ClientId, Command, Config, DashboardController};

use crate::world::ControlPanelWorld;

fn button_named(name: &str) -> Button {
    match name {
        "Start" => Button::Start,
        "Stop" => Button::Stop,
        "Restart" => Button::Restart,
        "Update" => Button::Update,
        "Log" => Button::Log,
        "Polyfier" => Button::Polyfier,
        "Settings" => Button::Settings,
        "Back" => Button::Back,
        "PolyfierStart" => Button::PolyfierStart,
        "PolyfierStop" => Button::PolyfierStop,
        "PolyfierStopBack" => Button::PolyfierStopBack,
        other => panic!("unknown button: {other}"),
    }
}

fn controller(world: &mut ControlPanelWorld) -> &mut DashboardController {
    world.controller.as_mut().expect("dashboard not set")
}

fn receive(world: &mut ControlPanelWorld, frame: &str) {
    let result = controller(world).handle_frame(frame);
    world.frame_result = Some(result.map(|commands| world.commands.extend(commands)));
}

#[given("a dashboard")]
fn a_dashboard(world: &mut ControlPanelWorld) {
    world.controller = Some(DashboardController::new(&Config::default()));
}

#[given(expr = "a dashboard keeping {int} lines of output")]
fn a_dashboard_with_limit(world: &mut ControlPanelWorld, max_lines: usize) {
    let mut config = Config::default();
    config.output.max_lines = max_lines;
    world.controller = Some(DashboardController::new(&config));
}

#[given(expr = "the server sent {string}")]
fn server_sent(world: &mut ControlPanelWorld, frame: String) {
    receive(world, &frame);
    world.commands.clear();
}

#[when(expr = "the server sends {string}")]
fn server_sends(world: &mut ControlPanelWorld, frame: String) {
    receive(world, &frame);
}

#[when(expr = "the server sends {int} log lines")]
fn server_sends_log_lines(world: &mut ControlPanelWorld, count: usize) {
    for i in 1..=count {
        let frame = json!({ "logOutput": format!("line {}", i) }).to_string();
        receive(world, &frame);
    }
}

#[when(expr = "I press {word}")]
fn press(world: &mut ControlPanelWorld, name: String) {
    let commands = controller(world).press(button_named(&name));
    world.commands.extend(commands);
}

#[when("the control request finishes")]
fn request_finishes(world: &mut ControlPanelWorld) {
    controller(world).request_finished();
}

#[then(expr = "the {word} button is visible")]
fn power_button_visible(world: &mut ControlPanelWorld, name: String) {
    let expected = match name.as_str() {
        "start" => PowerButton::Start,
        "stop" => PowerButton::Stop,
        other => panic!("unknown power button: {other}"),
    };
    assert_eq!(controller(world).power_button(), expected);
}

#[then(expr = "the footer reads {string}")]
fn footer_reads(world: &mut ControlPanelWorld, text: String) {
    assert_eq!(controller(world).status_text(), text);
}

#[then(expr = "the client id is {int}")]
fn client_id_is(world: &mut ControlPanelWorld, id: u64) {
    assert_eq!(controller(world).client_id(), ClientId(id));
}

#[then("the client type is registered")]
fn client_type_registered(world: &mut ControlPanelWorld) {
    assert!(world.commands.contains(&Command::RegisterClientType));
}

#[then(expr = "a {string} request is sent")]
fn request_sent(world: &mut ControlPanelWorld, path: String) {
    let sent = world
        .commands
        .iter()
        .any(|c| matches!(c, Command::Send(action) if action.path() == path));
    assert!(sent, "no {path} request in {:?}", world.commands);
}

#[then("no request is sent")]
fn no_request_sent(world: &mut ControlPanelWorld) {
    assert!(world.commands.is_empty(), "{:?}", world.commands);
}

#[then(expr = "the log panel holds {int} lines")]
fn log_panel_holds(world: &mut ControlPanelWorld, count: usize) {
    assert_eq!(controller(world).panel(OutputPanel::Log).len(), count);
}

#[then(expr = "the polyfier log holds {int} lines")]
fn polyfier_log_holds(world: &mut ControlPanelWorld, count: usize) {
    assert_eq!(controller(world).panels().polyfier_log().len(), count);
}

#[then(expr = "the first log line is {string}")]
fn first_log_line(world: &mut ControlPanelWorld, line: String) {
    let first = controller(world).panel(OutputPanel::Log).lines().next();
    assert_eq!(first, Some(line.as_str()));
}

#[then(expr = "the page is {word}")]
fn page_is(world: &mut ControlPanelWorld, name: String) {
    assert_eq!(format!("{:?}", controller(world).view()), name);
}

#[then("the back button is disabled")]
fn back_disabled(world: &mut ControlPanelWorld) {
    assert!(!controller(world).back_enabled());
}

#[then("the back button is enabled")]
fn back_enabled(world: &mut ControlPanelWorld) {
    assert!(controller(world).back_enabled());
}

#[then(expr = "the background colour is {string}")]
fn background_is(world: &mut ControlPanelWorld, css: String) {
    assert_eq!(controller(world).background().css(), css);
}

#[then("the other instances warning is shown")]
fn warning_shown(world: &mut ControlPanelWorld) {
    assert!(controller(world).error_header().is_some());
}

#[then("the other instances warning is hidden")]
fn warning_hidden(world: &mut ControlPanelWorld) {
    assert_eq!(controller(world).error_header(), None);
}

#[then("the frame is rejected")]
fn frame_rejected(world: &mut ControlPanelWorld) {
    assert!(
        matches!(world.frame_result, Some(Err(_))),
        "{:?}",
        world.frame_result
    );
}
