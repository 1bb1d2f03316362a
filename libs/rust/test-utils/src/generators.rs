//! Shared proptest generators.
//!
//! Reusable strategies for the values that flow through token requests and
//! certificate rotation.

use proptest::prelude::*;

/// Generate application client ids (canonical hyphenated UUIDs).
pub fn client_id_strategy() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|bits| uuid::Uuid::from_u128(bits).to_string())
}

/// Generate single scope tokens.
pub fn scope_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("openid".to_string()),
        Just("profile".to_string()),
        Just("offline_access".to_string()),
        "[a-z]{3,12}(:[a-z]{3,8})?",
    ]
}

/// Generate a presented `scope` parameter: zero or more scopes separated by
/// arbitrary runs of spaces.
pub fn scope_string_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec((scope_strategy(), " {1,3}"), 0..6).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(scope, sep)| format!("{scope}{sep}"))
            .collect::<String>()
    })
}

/// Generate role names.
pub fn role_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Impersonator".to_string()),
        Just("Admin".to_string()),
        Just("Reader".to_string()),
        "[A-Z][a-zA-Z]{2,15}",
    ]
}

/// Generate role lists without duplicates.
pub fn role_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(role_strategy(), 0..5).prop_map(|set| set.into_iter().collect())
}

/// Generate certificate content hashes (hex encoded SHA-256).
pub fn certificate_hash_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{64}"
}

/// Generate grant types that are neither client credentials nor impersonation.
pub fn other_grant_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("authorization_code".to_string()),
        Just("refresh_token".to_string()),
        Just("password".to_string()),
        Just("urn:ietf:params:oauth:grant-type:device_code".to_string()),
        "[a-z_]{4,20}".prop_filter("reserved grant type", |g| {
            g != "client_credentials" && g != "impersonation"
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_client_ids_parse_as_uuid() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let id = client_id_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(uuid::Uuid::parse_str(&id).is_ok());
        }
    }

    #[test]
    fn test_role_lists_are_unique() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let roles = role_list_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            let mut deduped = roles.clone();
            deduped.dedup();
            assert_eq!(roles, deduped);
        }
    }
}
