//! Login and registration flows against a mock backend.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokenkeep_core::{
    ApiClient, ApiError, Config, Entry, FormValues, LoginFlow, LoginForm, NoticeKind, Notifier,
    Redirect, RegistrationFlow, RegistrationForm, RegistrationMode, StorageScope, SubmitError,
    Token, TokenStore, ValidationError,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<(String, NoticeKind)>>);

impl RecordingNotifier {
    fn notices(&self) -> Vec<(String, NoticeKind)> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        self.0.lock().unwrap().push((message.to_string(), kind));
    }
}

fn config(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        ..Config::default()
    }
}

fn login_flow(server: &MockServer, store: TokenStore) -> (LoginFlow, Arc<RecordingNotifier>) {
    let config = config(server);
    let api = ApiClient::new(&config.base_url, config.request_timeout()).unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let flow = LoginFlow::new(api, store, notifier.clone(), &config);
    (flow, notifier)
}

fn registration_flow(
    server: &MockServer,
    store: TokenStore,
    mode: RegistrationMode,
) -> (RegistrationFlow, Arc<RecordingNotifier>) {
    let config = Config {
        registration_mode: mode,
        ..config(server)
    };
    let api = ApiClient::new(&config.base_url, config.request_timeout()).unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let flow = RegistrationFlow::new(api, store, notifier.clone(), &config);
    (flow, notifier)
}

fn registration_form() -> FormValues {
    FormValues::new()
        .with("username", "jdoe")
        .with("firstname", "John")
        .with("date", "1990-04-02")
        .with("email", "john@doe.fr")
        .with("phonenumber", "0601020304")
        .with("address", "rue de la Paix")
        .with("postalcode", "75002")
        .with("city", "Paris")
        .with("password", "secret1")
        .with("confirmPassword", "secret1")
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_remember_me_stores_durable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"email": "a@b.co", "password": "x"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    let (flow, notifier) = login_flow(&server, store.clone());

    let redirect = flow.submit(LoginForm::new("a@b.co", "x", true)).await.unwrap();

    assert_eq!(redirect, Redirect::after("/index.html", Duration::from_millis(1000)));
    assert_eq!(store.get(StorageScope::Durable).unwrap(), Some(Token::new("abc")));
    assert_eq!(store.get(StorageScope::Ephemeral).unwrap(), None);
    assert_eq!(
        notifier.notices(),
        vec![("Login successful!".to_string(), NoticeKind::Success)]
    );
}

#[tokio::test]
async fn test_login_without_remember_me_stores_ephemeral() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    let (flow, _) = login_flow(&server, store.clone());

    let form = FormValues::new()
        .with("email", " a@b.co ")
        .with("password", "x");
    flow.submit_form(&form).await.unwrap();

    assert_eq!(store.get(StorageScope::Durable).unwrap(), None);
    assert_eq!(store.get(StorageScope::Ephemeral).unwrap(), Some(Token::new("abc")));
    assert!(store.is_present());
}

#[tokio::test]
async fn test_login_rejected_leaves_store_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Identifiants invalides"))
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    store.save(&Token::new("previous"), false).unwrap();
    let (flow, notifier) = login_flow(&server, store.clone());

    let err = flow.submit(LoginForm::new("a@b.co", "wrong", true)).await.unwrap_err();

    assert!(matches!(err, SubmitError::Api(ApiError::Unauthorized(_))));
    assert_eq!(store.get(StorageScope::Durable).unwrap(), None);
    assert_eq!(store.get(StorageScope::Ephemeral).unwrap(), Some(Token::new("previous")));
    assert_eq!(
        notifier.notices(),
        vec![(
            "Login failed. Check your credentials.".to_string(),
            NoticeKind::Error
        )]
    );

    // A failed submission does not leave the form locked
    let retry = flow.submit(LoginForm::new("a@b.co", "wrong", true)).await.unwrap_err();
    assert!(matches!(retry, SubmitError::Api(ApiError::Unauthorized(_))));
}

#[tokio::test]
async fn test_login_malformed_response_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    let (flow, notifier) = login_flow(&server, store.clone());

    let err = flow.submit(LoginForm::new("a@b.co", "x", true)).await.unwrap_err();
    assert!(matches!(err, SubmitError::Api(ApiError::InvalidResponse(_))));
    assert!(!store.is_present());
    assert_eq!(notifier.notices()[0].1, NoticeKind::Error);
}

#[tokio::test]
async fn test_login_response_without_token_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"token": null, "message": "?"})),
        )
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    let (flow, _) = login_flow(&server, store.clone());

    let err = flow.submit(LoginForm::new("a@b.co", "x", false)).await.unwrap_err();
    assert!(matches!(err, SubmitError::Api(ApiError::InvalidResponse(_))));
    assert!(!store.is_present());
}

#[tokio::test]
async fn test_invalid_email_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .expect(0)
        .mount(&server)
        .await;

    let (flow, notifier) = login_flow(&server, TokenStore::in_memory());

    for email in ["nobody", "a.b.co", "a@bco", "a@b."] {
        let err = flow.submit(LoginForm::new(email, "x", true)).await.unwrap_err();
        assert!(matches!(err, SubmitError::Validation(ValidationError::InvalidEmail)));
    }
    assert_eq!(notifier.notices().len(), 4);
}

#[tokio::test]
async fn test_overlapping_login_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "abc"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let (flow, _) = login_flow(&server, TokenStore::in_memory());

    let (first, second) = futures::join!(
        flow.submit(LoginForm::new("a@b.co", "x", true)),
        flow.submit(LoginForm::new("a@b.co", "x", true)),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(SubmitError::Busy)));

    assert!(flow.start() != Entry::ShowForm);

    // The guard is released once the first submission completes
    let third = flow.submit(LoginForm::new("a@b.co", "x", false)).await;
    assert!(third.is_ok());
}

#[tokio::test]
async fn test_logout_after_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc"})))
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    let (flow, _) = login_flow(&server, store.clone());

    flow.submit(LoginForm::new("a@b.co", "x", true)).await.unwrap();
    assert!(matches!(flow.start(), Entry::AlreadyAuthenticated(_)));

    flow.logout().unwrap();
    assert!(!store.is_present());
    assert_eq!(flow.start(), Entry::ShowForm);
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_self_service_registration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .and(body_json(json!({
            "username": "jdoe",
            "firstname": "John",
            "date": "1990-04-02",
            "email": "john@doe.fr",
            "phonenumber": "0601020304",
            "address": "rue de la Paix",
            "postalcode": "75002",
            "city": "Paris",
            "password": "secret1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    let (flow, notifier) = registration_flow(&server, store.clone(), RegistrationMode::SelfService);

    let redirect = flow.submit_form(&registration_form()).await.unwrap();

    assert_eq!(redirect.target, "/index.html");
    assert_eq!(redirect.delay, Duration::from_millis(1000));
    assert!(!store.is_present());
    assert_eq!(notifier.notices()[0].1, NoticeKind::Success);
}

#[tokio::test]
async fn test_registration_mismatch_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (flow, notifier) =
        registration_flow(&server, TokenStore::in_memory(), RegistrationMode::SelfService);

    let form = RegistrationForm {
        password: "secret1".to_string(),
        confirm_password: "secret2".to_string(),
        ..RegistrationForm::default()
    };
    let err = flow.submit(form).await.unwrap_err();

    assert!(matches!(err, SubmitError::Validation(ValidationError::PasswordMismatch)));
    assert_eq!(
        notifier.notices(),
        vec![("Passwords do not match.".to_string(), NoticeKind::Error)]
    );
}

#[tokio::test]
async fn test_registration_failure_reports_backend_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Email déjà utilisé"))
        .mount(&server)
        .await;

    let (flow, notifier) =
        registration_flow(&server, TokenStore::in_memory(), RegistrationMode::SelfService);

    let err = flow.submit_form(&registration_form()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Api(ApiError::Rejected { status: 400, .. })));
    assert_eq!(
        notifier.notices(),
        vec![("Email déjà utilisé".to_string(), NoticeKind::Error)]
    );
}

#[tokio::test]
async fn test_registration_failure_without_body_is_generic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/register"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (flow, notifier) =
        registration_flow(&server, TokenStore::in_memory(), RegistrationMode::SelfService);

    flow.submit_form(&registration_form()).await.unwrap_err();
    assert_eq!(
        notifier.notices(),
        vec![(
            "Registration failed. Check your information.".to_string(),
            NoticeKind::Error
        )]
    );
}

#[tokio::test]
async fn test_authenticated_registration_sends_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Utilisateur créé"))
        .expect(1)
        .mount(&server)
        .await;

    let store = TokenStore::in_memory();
    store.save(&Token::new("abc"), false).unwrap();
    let (flow, notifier) =
        registration_flow(&server, store.clone(), RegistrationMode::Authenticated);

    flow.submit_form(&registration_form()).await.unwrap();
    assert_eq!(notifier.notices()[0].1, NoticeKind::Success);
    assert_eq!(store.get(StorageScope::Ephemeral).unwrap(), Some(Token::new("abc")));
}

#[tokio::test]
async fn test_authenticated_registration_without_token_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (flow, _) =
        registration_flow(&server, TokenStore::in_memory(), RegistrationMode::Authenticated);

    let err = flow.submit_form(&registration_form()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Validation(ValidationError::MissingToken)));
}
