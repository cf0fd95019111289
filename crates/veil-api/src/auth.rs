//! # Authentication & Authorization Middleware
//!
//! Bearer tokens carry the caller's role and marketplace user id:
//!
//! ```text
//! Bearer {role}:{user_id}:{secret}      role ∈ {user, admin}
//! ```
//!
//! The secret is compared in constant time against `AUTH_SECRET`. When no
//! secret is configured the secret segment is not checked, but the role and
//! user id are still parsed so every handler has a real [`CallerIdentity`].
//! A request without a token in that mode acts as [`DEV_ADMIN`].

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use veil_core::UserId;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Identity used for unauthenticated requests when auth is disabled.
pub const DEV_ADMIN: &str = "dev-admin";

// ── Role ────────────────────────────────────────────────────────────────────

/// Ordered by privilege: `User < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Buyers and sellers.
    User,
    /// Moderators and operators.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated caller, injected by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub role: Role,
    pub user_id: UserId,
}

impl CallerIdentity {
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// 403 unless the caller has at least `minimum`.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Injected into request extensions. `Debug` redacts the secret.
#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison. A length mismatch still performs a dummy
/// comparison so timing does not reveal the expected length.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse `{role}:{user_id}:{secret}`. With `expected_secret == None` the
/// secret segment is accepted as-is.
pub fn parse_bearer_token(
    provided: &str,
    expected_secret: Option<&str>,
) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    let [role_str, user_str, secret] = parts.as_slice() else {
        return Err("invalid token format, expected {role}:{user_id}:{secret}".into());
    };

    if let Some(expected) = expected_secret {
        if !constant_time_token_eq(secret, expected) {
            return Err("invalid bearer token".into());
        }
    }

    let role = match *role_str {
        "user" => Role::User,
        "admin" => Role::Admin,
        other => return Err(format!("unknown role: {other}")),
    };
    let user_id = user_str.trim();
    if user_id.is_empty() {
        return Err("token carries no user id".into());
    }

    Ok(CallerIdentity {
        role,
        user_id: UserId::new(user_id),
    })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the caller from the `Authorization` header and insert a
/// [`CallerIdentity`] into the request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let secret = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.secret.clone());

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let identity = match (header_value, secret.as_deref()) {
        (Some(value), expected) => match value.strip_prefix("Bearer ") {
            Some(token) => parse_bearer_token(token, expected),
            None => Err("authorization header must use Bearer scheme".to_string()),
        },
        (None, Some(_)) => Err("missing authorization header".to_string()),
        (None, None) => Ok(CallerIdentity {
            role: Role::Admin,
            user_id: UserId::new(DEV_ADMIN),
        }),
    };

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed");
            unauthorized_response(&msg)
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(secret: Option<&str>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move {
                    format!("{}:{}", caller.role.as_str(), caller.user_id)
                }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig {
                secret: secret.map(str::to_string),
            }))
    }

    async fn call(app: Router, auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn parses_user_token() {
        let id = parse_bearer_token("user:buyer-7:s3cret", Some("s3cret")).unwrap();
        assert_eq!(id.role, Role::User);
        assert_eq!(id.user_id, UserId::new("buyer-7"));
    }

    #[test]
    fn rejects_wrong_secret_and_bad_shapes() {
        assert!(parse_bearer_token("admin:a:nope", Some("s3cret")).is_err());
        assert!(parse_bearer_token("s3cret", Some("s3cret")).is_err());
        assert!(parse_bearer_token("root:a:s3cret", Some("s3cret")).is_err());
        assert!(parse_bearer_token("user::s3cret", Some("s3cret")).is_err());
    }

    #[test]
    fn secret_may_contain_colons() {
        let id = parse_bearer_token("admin:mod-1:a:b:c", Some("a:b:c")).unwrap();
        assert_eq!(id.role, Role::Admin);
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Admin > Role::User);
        let caller = CallerIdentity {
            role: Role::User,
            user_id: UserId::new("u"),
        };
        assert!(require_role(&caller, Role::Admin).is_err());
        assert!(require_role(&caller, Role::User).is_ok());
    }

    #[test]
    fn auth_config_debug_redacts() {
        let debug = format!(
            "{:?}",
            AuthConfig {
                secret: Some("topsecret".into())
            }
        );
        assert!(!debug.contains("topsecret"));
    }

    #[tokio::test]
    async fn missing_header_rejected_when_secret_set() {
        let (status, _) = call(test_app(Some("s3cret")), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn basic_scheme_rejected() {
        let (status, _) = call(test_app(Some("s3cret")), Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let (status, body) =
            call(test_app(Some("s3cret")), Some("Bearer user:seller-2:s3cret")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user:seller-2");
    }

    #[tokio::test]
    async fn disabled_auth_defaults_to_dev_admin() {
        let (status, body) = call(test_app(None), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("admin:{DEV_ADMIN}"));
    }

    #[tokio::test]
    async fn disabled_auth_still_honours_token_identity() {
        let (status, body) = call(test_app(None), Some("Bearer user:buyer-1:anything")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user:buyer-1");
    }
}
