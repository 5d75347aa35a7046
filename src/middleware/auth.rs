use crate::models::auth::{Claims, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use std::sync::Arc;

/// Decode and validate an HS256 token signed with `secret`.
pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
        }),
    )
}

pub async fn auth_middleware(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header format"))?;

    let token = auth_str.strip_prefix("Bearer ").ok_or_else(|| {
        unauthorized("Invalid Authorization header format. Expected 'Bearer <token>'")
    })?;

    let claims = verify_jwt_token(token, &state.jwt_secret).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        unauthorized("Invalid or expired token")
    })?;

    if claims.user_id().is_none() {
        tracing::warn!("JWT subject is not a user id: {}", claims.sub);
        return Err(unauthorized("Invalid or expired token"));
    }

    // Handlers read the caller from the request extensions.
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(secret: &str, exp: usize) -> String {
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            username: "editor".into(),
            email: "editor@example.com".into(),
            is_superuser: false,
            is_staff: false,
            exp,
            iat: chrono::Utc::now().timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        let claims = verify_jwt_token(&token_for("secret", exp), "secret").unwrap();
        assert_eq!(claims.username, "editor");
        assert!(claims.user_id().is_some());
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
        assert!(verify_jwt_token(&token_for("other", exp), "secret").is_err());

        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        assert!(verify_jwt_token(&token_for("secret", expired), "secret").is_err());
    }
}
