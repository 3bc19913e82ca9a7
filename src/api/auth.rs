use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
const USER_ID_COOKIE: &str = "user_id";

/// Caller identity as established by the front proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthedUser {
    pub user_id: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let user_id = from_header
            .or_else(|| {
                parts
                    .headers
                    .get_all(header::COOKIE)
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .find_map(|cookies| cookie_value(cookies, USER_ID_COOKIE))
            })
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthedUser { user_id })
    }
}

fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<AuthedUser, AppError> {
        let (mut parts, _) = request.into_parts();
        AuthedUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_identity() {
        let request = Request::builder().header("X-User-Id", "alice").body(()).unwrap();
        assert_eq!(extract(request).await.unwrap().user_id, "alice");
    }

    #[tokio::test]
    async fn test_cookie_identity() {
        let request = Request::builder()
            .header(header::COOKIE, "theme=dark; user_id=bob")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().user_id, "bob");
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(AppError::Unauthorized)));
    }
}
