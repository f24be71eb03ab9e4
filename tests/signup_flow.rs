#![allow(clippy::unwrap_used)]

use anyhow::Result;
use enroll::flow::{Navigator, Notifier, Phase, Route, SignUpScreen, SubmitOutcome, VerifyOutcome};
use enroll::provider::{HttpProvider, MemoryTokenCache, ProviderConfig, TokenCache};
use secrecy::SecretString;
use serde_json::json;
use std::{
    net::TcpListener,
    sync::{Arc, Mutex},
    time::Duration,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

#[derive(Default)]
struct Sinks {
    alerts: Mutex<Vec<(String, String)>>,
    routes: Mutex<Vec<Route>>,
}

impl Notifier for Sinks {
    fn notify(&self, title: &str, message: &str) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

impl Navigator for Sinks {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

struct Harness {
    screen: SignUpScreen,
    sinks: Arc<Sinks>,
    cache: Arc<MemoryTokenCache>,
}

async fn harness(server: &MockServer) -> Result<Harness> {
    Mock::given(method("GET"))
        .and(path("/v1/environment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "display_name": "enroll-it"
        })))
        .mount(server)
        .await;

    let config = ProviderConfig::new(
        SecretString::from("pk_test_integration"),
        Some(&server.uri()),
        Duration::from_secs(2),
    )?;
    let cache = Arc::new(MemoryTokenCache::default());
    let provider = HttpProvider::new(config, cache.clone())?;
    provider.load().await?;

    let sinks = Arc::new(Sinks::default());
    let screen = SignUpScreen::new(Arc::new(provider), sinks.clone(), sinks.clone());
    screen.form().set_name("Ada Lovelace");
    screen.form().set_email("ada@example.com");
    screen.form().set_password("pw123456");

    Ok(Harness {
        screen,
        sinks,
        cache,
    })
}

async fn mount_sign_up(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups"))
        .and(body_json(json!({
            "email_address": "ada@example.com",
            "password": "pw123456"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sua_1",
            "status": "missing_requirements"
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups/sua_1/prepare_verification"))
        .and(body_json(json!({ "strategy": "email_code" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "sua_1" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sign_up_verify_and_go_home() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_sign_up(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups/sua_1/attempt_verification"))
        .and(body_json(json!({ "strategy": "email_code", "code": "00000" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sua_1",
            "status": "complete",
            "created_session_id": "sess_1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/client/sessions/sess_1/touch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "sess_1" })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server).await?;

    assert_eq!(h.screen.submit().await, Ok(SubmitOutcome::CodeSent));
    assert_eq!(h.screen.verification().phase(), Phase::Pending);

    assert_eq!(h.screen.verify("00000").await, Ok(VerifyOutcome::Verified));
    assert_eq!(h.screen.verification().phase(), Phase::Success);
    assert_eq!(
        h.cache.get("__session").await?,
        Some("sess_1".to_string())
    );

    h.screen.acknowledge()?;
    assert_eq!(*h.sinks.routes.lock().unwrap(), vec![Route::Home]);
    assert!(h.sinks.alerts.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn wrong_code_leaves_verification_failed() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_sign_up(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups/sua_1/attempt_verification"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sua_1",
            "status": "needs_more_info"
        })))
        .mount(&server)
        .await;

    let h = harness(&server).await?;
    h.screen.submit().await?;

    assert_eq!(
        h.screen.verify("11111").await,
        Ok(VerifyOutcome::Failed("verification failed".to_string()))
    );
    let state = h.screen.verification().snapshot();
    assert_eq!(state.phase(), Phase::Failed);
    assert_eq!(state.error(), "verification failed");
    assert_eq!(state.code(), "11111");
    assert!(h.sinks.routes.lock().unwrap().is_empty());
    assert_eq!(h.cache.get("__session").await?, None);
    Ok(())
}

#[tokio::test]
async fn rejected_code_shows_provider_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    mount_sign_up(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups/sua_1/attempt_verification"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{
                "code": "form_code_incorrect",
                "message": "Incorrect code",
                "long_message": "The verification code you entered is incorrect."
            }]
        })))
        .mount(&server)
        .await;

    let h = harness(&server).await?;
    h.screen.submit().await?;

    assert_eq!(
        h.screen.verify("12345").await,
        Ok(VerifyOutcome::Failed(
            "The verification code you entered is incorrect.".to_string()
        ))
    );
    assert_eq!(h.screen.verification().phase(), Phase::Failed);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_notified() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": [{
                "code": "form_identifier_exists",
                "message": "That email address is taken.",
                "long_message": "That email address is taken. Please try another."
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server).await?;

    assert_eq!(
        h.screen.submit().await,
        Ok(SubmitOutcome::Rejected(
            "That email address is taken. Please try another.".to_string()
        ))
    );
    assert_eq!(h.screen.verification().phase(), Phase::Default);
    assert_eq!(
        *h.sinks.alerts.lock().unwrap(),
        vec![(
            "Error".to_string(),
            "That email address is taken. Please try another.".to_string()
        )]
    );
    Ok(())
}

#[tokio::test]
async fn server_failure_uses_generic_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/client/sign_ups"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let h = harness(&server).await?;

    assert_eq!(
        h.screen.submit().await,
        Ok(SubmitOutcome::Rejected(
            "Something went wrong. Please try again.".to_string()
        ))
    );
    assert_eq!(h.screen.verification().phase(), Phase::Default);
    Ok(())
}
