//! BDD step definitions for the login feature

use std::sync::Arc;

use cucumber::{given, then, when};

use control_panel::auth::{basic_auth_header, LoginPage, Navigation};
use control_panel::io::{HttpClient, HttpResponse};

use crate::world::ControlPanelWorld;

const BASE_URL: &str = "http://localhost:8070/";

/// Answers the login probe and the session check like Polypheny-Control
struct FakeControlServer {
    authorization: String,
    session_status: u16,
    session_body: String,
}

impl FakeControlServer {
    fn accepting(username: &str, password: &str) -> Self {
        Self {
            authorization: basic_auth_header(username, password),
            session_status: 401,
            session_body: String::new(),
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for FakeControlServer {
    async fn get(&self, url: &str, _query: &[(&str, &str)]) -> control_panel::Result<HttpResponse> {
        if url.ends_with("session/is_authenticated") {
            return Ok(HttpResponse {
                status: self.session_status,
                body: self.session_body.clone(),
            });
        }
        Ok(HttpResponse {
            status: 404,
            body: String::new(),
        })
    }

    async fn get_with_auth(
        &self,
        _url: &str,
        authorization: &str,
    ) -> control_panel::Result<HttpResponse> {
        let status = if authorization == self.authorization {
            200
        } else {
            403
        };
        Ok(HttpResponse {
            status,
            body: String::new(),
        })
    }

    async fn post_form(
        &self,
        _url: &str,
        _params: &[(&str, &str)],
    ) -> control_panel::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: "true".to_string(),
        })
    }
}

#[given(expr = "a control server accepting user {string} with password {string}")]
fn server_accepting(world: &mut ControlPanelWorld, username: String, password: String) {
    let server = FakeControlServer::accepting(&username, &password);
    world.login_page = Some(LoginPage::new(BASE_URL, Arc::new(server)));
}

#[given(expr = "a control server whose session check answers {int} with {string}")]
fn server_session_check(world: &mut ControlPanelWorld, status: u16, body: String) {
    let server = FakeControlServer {
        session_status: status,
        session_body: body,
        ..FakeControlServer::accepting("admin", "admin")
    };
    world.login_page = Some(LoginPage::new(BASE_URL, Arc::new(server)));
}

#[when(expr = "I log in as {string} with password {string}")]
async fn log_in(world: &mut ControlPanelWorld, username: String, password: String) {
    let page = world.login_page.as_mut().expect("login page not set");
    world.login_result = Some(page.login(&username, &password).await);
}

#[when("the login page checks the session")]
async fn check_session(world: &mut ControlPanelWorld) {
    let page = world.login_page.as_mut().expect("login page not set");
    world.session_result = Some(page.check_authentication().await);
}

#[then("the login succeeds")]
fn login_succeeds(world: &mut ControlPanelWorld) {
    assert_eq!(world.login_result, Some(true));
}

#[then("the login fails")]
fn login_fails(world: &mut ControlPanelWorld) {
    assert_eq!(world.login_result, Some(false));
}

#[then("the browser navigates to the dashboard")]
fn navigates_to_dashboard(world: &mut ControlPanelWorld) {
    let page = world.login_page.as_ref().expect("login page not set");
    assert_eq!(
        page.location(),
        Some(&Navigation::Root(BASE_URL.to_string()))
    );
}

#[then("the browser stays on the login page")]
fn stays_on_login(world: &mut ControlPanelWorld) {
    let page = world.login_page.as_ref().expect("login page not set");
    assert_eq!(page.location(), None);
}

#[then("the invalid credentials message is shown")]
fn invalid_shown(world: &mut ControlPanelWorld) {
    let page = world.login_page.as_ref().expect("login page not set");
    assert!(page.invalid_visible());
}

#[then("the invalid credentials message is hidden")]
fn invalid_hidden(world: &mut ControlPanelWorld) {
    let page = world.login_page.as_ref().expect("login page not set");
    assert!(!page.invalid_visible());
}

#[then(expr = "the session check reports {word}")]
fn session_reports(world: &mut ControlPanelWorld, outcome: String) {
    let expected = match outcome.as_str() {
        "authenticated" => true,
        "anonymous" => false,
        other => panic!("unknown session outcome: {other}"),
    };
    assert_eq!(world.session_result, Some(expected));
}
