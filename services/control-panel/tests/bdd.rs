//! BDD test entry point for the control panel

#[path = "bdd/world.rs"]
mod world;

#[path = "bdd/steps/mod.rs"]
mod steps;

use cucumber::World as _;
use world::ControlPanelWorld;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    ControlPanelWorld::run("tests/features").await;
}
