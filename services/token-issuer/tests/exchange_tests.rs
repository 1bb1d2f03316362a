//! Token exchange end to end: pipeline, grant handlers and signing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use test_utils::fixtures::certificate_bundle;
use test_utils::Curve;
use token_issuer::auth::{is_impersonator, ImpersonationCheck, IMPERSONATOR_ROLE};
use token_issuer::certificates::{parse_certificate_bundle, CertificateManager};
use token_issuer::identity::{claims, Claim, ClaimsIdentity, ClaimsPrincipal, Destination, MemoryDirectory};
use token_issuer::jwt::{AccessTokenValidator, TokenValidator};
use token_issuer::{Config, GrantRequest, IssuerError, RejectionKind, TokenServer};
use uuid::Uuid;

struct Setup {
    config: Config,
    manager: Arc<CertificateManager>,
    directory: Arc<MemoryDirectory>,
    server: TokenServer,
}

async fn setup(config: Config) -> Setup {
    let manager = Arc::new(CertificateManager::new());
    install(&manager, &["signing-1"]).await;
    let directory = Arc::new(MemoryDirectory::new());
    let server = TokenServer::new(&config, manager.clone(), directory.clone()).unwrap();
    Setup {
        config,
        manager,
        directory,
        server,
    }
}

async fn install(manager: &CertificateManager, kids: &[&str]) {
    let credentials: Vec<_> = kids
        .iter()
        .map(|kid| {
            Some(parse_certificate_bundle(kid, &certificate_bundle(Curve::P256).to_bytes()).unwrap())
        })
        .collect();
    manager.update_credentials(credentials).await.unwrap();
}

#[tokio::test]
async fn client_credentials_issues_access_and_identity_tokens() {
    let s = setup(Config::default()).await;
    let client = Uuid::new_v4();
    s.directory.set_application_roles(client, ["Service"]).await;

    let response = s
        .server
        .exchange(GrantRequest::client_credentials(client.to_string()).with_scope("api"))
        .await
        .unwrap();

    assert_eq!(response.token_type, "Bearer");
    assert_eq!(response.expires_in, 3600);
    assert_eq!(response.scope, "api openid");
    assert!(response.id_token.is_some());

    let claims = s.server.validator().validate_claims(&response.access_token).unwrap();
    assert_eq!(claims.iss, s.config.issuer_str());
    assert_eq!(claims.aud, vec![s.config.audience.clone()]);
    assert_eq!(claims.sub, client.to_string());
    assert_eq!(claims.name.as_deref(), Some(client.to_string().as_str()));
    assert_eq!(claims.role.as_deref(), Some(r#"["Service"]"#));
    assert_eq!(claims.client_id.as_deref(), Some(client.to_string().as_str()));
    assert_eq!(claims.scopes(), vec!["api", "openid"]);
}

#[tokio::test]
async fn identity_token_skipped_without_openid() {
    let config = Config {
        default_scopes: Vec::new(),
        ..Config::default()
    };
    let s = setup(config).await;

    let response = s
        .server
        .exchange(GrantRequest::client_credentials(Uuid::new_v4().to_string()).with_scope("api"))
        .await
        .unwrap();

    assert_eq!(response.scope, "api");
    assert!(response.id_token.is_none());
}

#[tokio::test]
async fn tokens_signed_with_active_key() {
    let s = setup(Config::default()).await;
    install(&s.manager, &["signing-2", "signing-1"]).await;

    let response = s
        .server
        .exchange(GrantRequest::client_credentials(Uuid::new_v4().to_string()))
        .await
        .unwrap();

    let header = jsonwebtoken::decode_header(&response.access_token).unwrap();
    assert_eq!(header.kid.as_deref(), Some("signing-2"));
    assert_eq!(header.alg, jsonwebtoken::Algorithm::ES256);
}

#[tokio::test]
async fn missing_client_id_rejected_unless_anonymous_allowed() {
    let strict = setup(Config::default()).await;
    let rejection = strict
        .server
        .exchange(GrantRequest::new("client_credentials"))
        .await
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::InvalidClient);

    let lenient = setup(Config {
        accept_anonymous_clients: true,
        ..Config::default()
    })
    .await;
    let rejection = lenient
        .server
        .exchange(GrantRequest::new("client_credentials"))
        .await
        .unwrap_err();
    // admitted by the pipeline, refused by the exchange
    assert_eq!(rejection.kind, RejectionKind::InvalidGrant);
}

async fn caller_token(s: &Setup, roles: &[&str]) -> String {
    let caller = Uuid::new_v4();
    s.directory.set_application_roles(caller, roles.iter().copied()).await;
    s.server
        .exchange(GrantRequest::client_credentials(caller.to_string()))
        .await
        .unwrap()
        .access_token
}

#[tokio::test]
async fn impersonation_yields_target_identity() {
    let s = setup(Config::default()).await;
    let token = caller_token(&s, &[IMPERSONATOR_ROLE]).await;
    let target = Uuid::new_v4();
    s.directory.set_user(target, Some("carol"), ["Reader"]).await;

    let response = s
        .server
        .exchange(GrantRequest::impersonation(token, target.to_string()))
        .await
        .unwrap();

    let claims = s.server.validator().validate_claims(&response.access_token).unwrap();
    assert_eq!(claims.sub, target.to_string());
    assert_eq!(claims.name.as_deref(), Some("carol"));
    assert_eq!(claims.role.as_deref(), Some(r#"["Reader"]"#));
    assert_eq!(claims.client_id, None);
}

#[tokio::test]
async fn impersonation_without_role_rejected() {
    let s = setup(Config::default()).await;
    let token = caller_token(&s, &["Reader"]).await;

    let rejection = s
        .server
        .exchange(GrantRequest::impersonation(token, Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::UnauthorizedClient);
}

struct CountingValidator {
    inner: TokenValidator,
    calls: AtomicUsize,
}

#[async_trait]
impl AccessTokenValidator for CountingValidator {
    async fn validate(&self, token: &str) -> Result<ClaimsPrincipal, IssuerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.validate(token).await
    }
}

fn counting_server(s: &Setup, check: ImpersonationCheck) -> (TokenServer, Arc<CountingValidator>) {
    let counter = Arc::new(CountingValidator {
        inner: TokenValidator::new(
            s.manager.clone(),
            s.config.issuer_str(),
            s.config.audience.clone(),
        ),
        calls: AtomicUsize::new(0),
    });
    let server = TokenServer::with_access_validator(
        &s.config,
        s.manager.clone(),
        s.directory.clone(),
        counter.clone(),
        check,
    )
    .unwrap();
    (server, counter)
}

#[tokio::test]
async fn impersonation_validates_presented_token_once() {
    let s = setup(Config::default()).await;
    let token = caller_token(&s, &[IMPERSONATOR_ROLE]).await;
    let (server, counter) = counting_server(&s, Arc::new(is_impersonator));

    server
        .exchange(GrantRequest::impersonation(token, Uuid::new_v4().to_string()))
        .await
        .unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn custom_impersonation_check_gates_pipeline_and_exchange_alike() {
    let s = setup(Config::default()).await;
    let token = caller_token(&s, &[IMPERSONATOR_ROLE]).await;
    let (server, counter) = counting_server(&s, Arc::new(|_: &ClaimsPrincipal| false));

    let rejection = server
        .exchange(GrantRequest::impersonation(token, Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::UnauthorizedClient);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn impersonation_with_foreign_token_rejected() {
    let s = setup(Config::default()).await;
    let other = setup(Config::default()).await;
    let token = caller_token(&other, &[IMPERSONATOR_ROLE]).await;

    let rejection = s
        .server
        .exchange(GrantRequest::impersonation(token, Uuid::new_v4().to_string()))
        .await
        .unwrap_err();
    assert_eq!(rejection.kind, RejectionKind::InvalidGrant);
}

#[tokio::test]
async fn impersonation_survives_key_rotation() {
    let s = setup(Config::default()).await;
    let token = caller_token(&s, &[IMPERSONATOR_ROLE]).await;

    let old = s.manager.find("signing-1").unwrap();
    let new = parse_certificate_bundle("signing-2", &certificate_bundle(Curve::P384).to_bytes())
        .unwrap();
    s.manager
        .update_credentials([Some(new), Some((*old).clone())])
        .await
        .unwrap();

    let response = s
        .server
        .exchange(GrantRequest::impersonation(token, Uuid::new_v4().to_string()))
        .await
        .unwrap();
    let header = jsonwebtoken::decode_header(&response.access_token).unwrap();
    assert_eq!(header.kid.as_deref(), Some("signing-2"));
}

#[tokio::test]
async fn encoded_token_is_accepted_for_impersonation() {
    let s = setup(Config::default()).await;
    let identity = ClaimsIdentity::new("test")
        .with_claim(Claim::new(claims::SUBJECT, "ops").with_destinations(&[Destination::AccessToken]))
        .with_claim(
            Claim::new(claims::ROLE, format!(r#"["{IMPERSONATOR_ROLE}"]"#))
                .with_destinations(&[Destination::AccessToken]),
        );
    let token = s
        .server
        .auth()
        .utils()
        .encode_token(&ClaimsPrincipal::new(identity))
        .unwrap();

    let response = s
        .server
        .exchange(GrantRequest::impersonation(token, Uuid::new_v4().to_string()))
        .await;
    assert!(response.is_ok());
}
