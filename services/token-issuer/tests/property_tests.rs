//! Property-based tests for the token issuer.
//!
//! These tests verify universal properties across all inputs using proptest.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use test_utils::generators::{
    client_id_strategy, other_grant_type_strategy, role_list_strategy, scope_strategy,
    scope_string_strategy,
};
use token_issuer::auth::utils::{negotiate_scopes, role_claim_value};
use token_issuer::auth::{AuthService, AuthUtils, IMPERSONATION_GRANT, OPENID_SCOPE};
use token_issuer::certificates::CertificateManager;
use token_issuer::identity::claims::ROLE;
use token_issuer::identity::{Destination, MemoryDirectory};
use token_issuer::jwt::TokenValidator;
use token_issuer::pipeline::{ClientIdValidator, GrantRequest, RequestHandler, TokenRequestContext};
use token_issuer::{Config, IssuerError};
use uuid::Uuid;

fn service(directory: Arc<MemoryDirectory>) -> AuthService {
    let config = Config::default();
    let manager = Arc::new(CertificateManager::new());
    let validator = Arc::new(TokenValidator::new(
        manager.clone(),
        config.issuer_str(),
        config.audience.clone(),
    ));
    let utils = Arc::new(AuthUtils::new(&config, directory, manager));
    AuthService::new(utils, validator)
}

// Property: Granted scopes contain the mandatory defaults
// *For any* presented scope string and default scope set, the negotiated
// scopes contain every default and every requested scope exactly once.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_scopes_superset_of_defaults(
        requested in prop::option::of(scope_string_strategy()),
        extra_defaults in prop::collection::vec(scope_strategy(), 0..3),
    ) {
        let mut defaults = vec![OPENID_SCOPE.to_string()];
        defaults.extend(extra_defaults);

        let granted = negotiate_scopes(requested.as_deref(), &defaults);
        let unique: BTreeSet<&String> = granted.iter().collect();
        prop_assert_eq!(unique.len(), granted.len());

        for scope in &defaults {
            prop_assert!(granted.contains(scope), "missing default {}", scope);
        }
        for scope in requested.as_deref().unwrap_or_default().split_whitespace() {
            prop_assert!(granted.iter().any(|g| g == scope), "missing requested {}", scope);
        }
    }

    #[test]
    fn prop_role_claim_round_trips(roles in role_list_strategy()) {
        let value = role_claim_value(&roles).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&value).unwrap();
        prop_assert_eq!(parsed, roles);
    }
}

// Property: Client credentials identity shape
// *For any* client id and role list, the ticket's subject and name equal the
// client id and the role claim is a JSON array of exactly the directory roles.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_client_identity_shape(
        client_id in client_id_strategy(),
        roles in role_list_strategy(),
        scope in prop::option::of(scope_string_strategy()),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let directory = Arc::new(MemoryDirectory::new());
            let id = Uuid::parse_str(&client_id).unwrap();
            directory.set_application_roles(id, roles.clone()).await;
            let service = service(directory);

            let mut request = GrantRequest::client_credentials(client_id.clone());
            request.scope = scope;
            let ticket = service.client_exchange(&request).await.unwrap();
            let identity = ticket.principal().identity().unwrap();

            prop_assert_eq!(identity.subject(), Some(client_id.as_str()));
            prop_assert_eq!(identity.name(), Some(client_id.as_str()));

            let role = identity.find_first(ROLE).unwrap();
            let encoded: Vec<String> = serde_json::from_str(role.value()).unwrap();
            prop_assert_eq!(&encoded, &roles);

            for claim in identity.claims().iter().filter(|c| c.claim_type() != ROLE) {
                prop_assert!(claim.has_destination(Destination::AccessToken));
                prop_assert!(claim.has_destination(Destination::IdentityToken));
            }
            prop_assert!(ticket.has_scope(OPENID_SCOPE));
            Ok(())
        })?;
    }

    #[test]
    fn prop_wrong_grant_never_builds_claims(
        grant_type in other_grant_type_strategy(),
        client_id in client_id_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let directory = Arc::new(MemoryDirectory::new());
            let service = service(directory.clone());

            let request = GrantRequest::new(grant_type).with_client_id(client_id);
            let result = service.client_exchange(&request).await;

            prop_assert!(matches!(result, Err(IssuerError::InvalidGrant(_))));
            prop_assert_eq!(directory.lookups(), 0);
            Ok(())
        })?;
    }
}

// Property: Client id admission
// *For any* grant type, client id presence and anonymous setting, the
// validator rejects exactly when the client id is missing, the grant is not
// impersonation and anonymous clients are disallowed.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_client_id_validator_decision(
        grant_type in prop_oneof![
            Just(IMPERSONATION_GRANT.to_string()),
            Just("client_credentials".to_string()),
            other_grant_type_strategy(),
        ],
        client_id in prop::option::of(client_id_strategy()),
        accept_anonymous in any::<bool>(),
    ) {
        let missing = client_id.is_none();
        let is_impersonation = grant_type == IMPERSONATION_GRANT;

        let mut request = GrantRequest::new(grant_type);
        request.client_id = client_id;
        let mut context = TokenRequestContext::new(request);

        tokio_test::block_on(ClientIdValidator::new(accept_anonymous).handle(&mut context));

        let expected = missing && !is_impersonation && !accept_anonymous;
        prop_assert_eq!(context.is_rejected(), expected);
    }
}
