use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized)?;
        let claims = state.jwt.verify(bearer.token())?;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<String>) -> Result<AuthUser, AppError> {
        let state = AppState::for_tests();
        let mut builder = Request::builder().uri("/api/v1/me");
        if let Some(value) = header {
            builder = builder.header("authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn test_valid_bearer_token() {
        let state = AppState::for_tests();
        let user_id = Uuid::new_v4();
        let token = state.jwt.issue(user_id, "ada@example.com").unwrap();
        let user = extract(Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_wrong_scheme_is_unauthorized() {
        assert!(matches!(
            extract(Some("Basic YWRhOnB3".to_string())).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_forged_token_is_unauthorized() {
        assert!(matches!(
            extract(Some("Bearer abc.def.ghi".to_string())).await,
            Err(AppError::Unauthorized)
        ));
    }
}
