// crates/arre-server/src/auth.rs
// ============================================================================
// Module: Principal Resolution
// Description: Resolves an inbound HTTP request to an arre_core::Principal
//              under whichever AuthConfig the deployment selected.
// Purpose: Keep `spec.md` §9's admin-capability check decoupled from the
//          specific credential mechanism a deployment uses.
// Dependencies: arre-core, axum
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use arre_core::Principal;
use axum::http::HeaderMap;

use crate::config::AuthConfig;
use crate::error::ApiError;

/// Resolves the caller's [`Principal`] from `headers` under `auth`.
///
/// # Errors
///
/// Returns [`ApiError::Unauthenticated`] when a bearer token is required
/// and missing or not recognized, and when a trusted-principal header is
/// required and absent.
pub fn resolve_principal(headers: &HeaderMap, auth: &AuthConfig) -> Result<Principal, ApiError> {
    match auth {
        AuthConfig::None => Ok(Principal::admin("local")),
        AuthConfig::BearerToken { tokens } => {
            let presented = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;
            tokens
                .iter()
                .find(|entry| entry.token == presented)
                .map(|entry| {
                    if entry.is_admin {
                        Principal::admin(&entry.principal_id)
                    } else {
                        Principal::non_admin(&entry.principal_id)
                    }
                })
                .ok_or(ApiError::Unauthenticated)
        }
        AuthConfig::TrustedPrincipalHeader {
            header_name,
            admin_principal_ids,
        } => {
            let principal_id = headers
                .get(header_name.as_str())
                .and_then(|value| value.to_str().ok())
                .ok_or(ApiError::Unauthenticated)?;
            if admin_principal_ids.iter().any(|id| id == principal_id) {
                Ok(Principal::admin(principal_id))
            } else {
                Ok(Principal::non_admin(principal_id))
            }
        }
    }
}

/// Extracts the raw token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::config::BearerTokenEntry;

    #[test]
    fn no_auth_resolves_to_a_local_admin() {
        let principal = resolve_principal(&HeaderMap::new(), &AuthConfig::None).unwrap();
        assert!(principal.is_admin);
    }

    #[test]
    fn bearer_token_rejects_unknown_tokens() {
        let auth = AuthConfig::BearerToken {
            tokens: vec![BearerTokenEntry {
                token: "secret".to_string(),
                principal_id: "svc".to_string(),
                is_admin: false,
            }],
        };
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        assert!(matches!(resolve_principal(&headers, &auth), Err(ApiError::Unauthenticated)));
    }

    #[test]
    fn bearer_token_resolves_admin_flag_from_matched_entry() {
        let auth = AuthConfig::BearerToken {
            tokens: vec![BearerTokenEntry {
                token: "secret".to_string(),
                principal_id: "svc".to_string(),
                is_admin: true,
            }],
        };
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        let principal = resolve_principal(&headers, &auth).unwrap();
        assert_eq!(principal.id, "svc");
        assert!(principal.is_admin);
    }

    #[test]
    fn trusted_header_resolves_admin_from_allowlist() {
        let auth = AuthConfig::TrustedPrincipalHeader {
            header_name: "x-principal".to_string(),
            admin_principal_ids: vec!["root".to_string()],
        };
        let mut headers = HeaderMap::new();
        headers.insert("x-principal", HeaderValue::from_static("root"));
        let principal = resolve_principal(&headers, &auth).unwrap();
        assert!(principal.is_admin);
    }
}
