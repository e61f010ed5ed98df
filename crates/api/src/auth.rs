//! Caller identity extraction.
//!
//! Authentication happens upstream. A trusted proxy forwards the resolved
//! identity in two headers:
//! - `x-user-id`: the numeric user id
//! - `x-user-role`: comma-separated roles; `admin` grants admin rights

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::UserId;
use domain::Caller;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor yielding the authenticated [`Caller`].
///
/// Rejects the request with 401 when the identity is missing or malformed.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers).map(Authenticated)
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
    let user_id: i64 = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;

    let is_admin = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|roles| roles.split(',').any(|role| role.trim() == "admin"));

    Ok(Caller {
        user_id: UserId::new(user_id),
        is_admin,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_customer_identity() {
        let caller = caller_from_headers(&headers(&[(USER_ID_HEADER, "42")])).unwrap();
        assert_eq!(caller, Caller::customer(UserId::new(42)));
    }

    #[test]
    fn test_admin_role_among_others() {
        let caller = caller_from_headers(&headers(&[
            (USER_ID_HEADER, "7"),
            (USER_ROLE_HEADER, "customer, admin"),
        ]))
        .unwrap();
        assert!(caller.is_admin);
    }

    #[test]
    fn test_missing_or_bad_id_is_rejected() {
        assert!(matches!(
            caller_from_headers(&headers(&[])),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            caller_from_headers(&headers(&[(USER_ID_HEADER, "abc")])),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            caller_from_headers(&headers(&[(USER_ID_HEADER, "0")])),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
