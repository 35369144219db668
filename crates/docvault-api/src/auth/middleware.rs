use crate::auth::models::{CallerContext, JwtClaims, UserRole};
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use docvault_core::AppError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthState {
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    fn decode_token(&self, token: &str) -> Result<CallerContext, AppError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        let role = match data.claims.role.as_str() {
            "admin" => UserRole::Admin,
            "member" => UserRole::Member,
            other => {
                return Err(AppError::Unauthorized(format!(
                    "Unknown role '{}' in token",
                    other
                )))
            }
        };

        Ok(CallerContext {
            user_id: data.claims.sub,
            role,
        })
    }
}

/// Bearer-token authentication. On success the caller identity lands in
/// request extensions for handlers to extract.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(header) => header,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    let caller = match auth_state.decode_token(token) {
        Ok(caller) => caller,
        Err(e) => {
            tracing::debug!(error = %e, "Authentication failed");
            return HttpAppError(e).into_response();
        }
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "test-secret-at-least-32-characters!!";

    fn token_for(role: &str, exp_offset_secs: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            sub: Uuid::new_v4(),
            role: role.to_string(),
            exp: now + exp_offset_secs,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_member_token_decodes() {
        let auth = AuthState::new(SECRET);
        let caller = auth.decode_token(&token_for("member", 3600)).unwrap();
        assert_eq!(caller.role, UserRole::Member);
        assert!(!caller.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = AuthState::new(SECRET);
        assert!(auth.decode_token(&token_for("member", -3600)).is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let auth = AuthState::new(SECRET);
        assert!(auth.decode_token(&token_for("superuser", 3600)).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let auth = AuthState::new("another-secret-also-32-characters!!!");
        assert!(auth.decode_token(&token_for("member", 3600)).is_err());
    }
}
