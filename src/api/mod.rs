use crate::core::auth::{CurrentUser, Role};
use crate::core::services::AuditMeta;
use crate::error::AppError;
use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::{Json, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::str::FromStr;
use uuid::Uuid;

pub mod admin;
pub mod contact;
pub mod history;
pub mod reviews;

const X_USER_ID: &str = "X-User-ID";
const X_USER_ROLE: &str = "X-User-Role";
const X_USER_NAME: &str = "X-User-Name";

/// Every public and admin route, without state or layers.
pub fn router() -> Router {
    Router::new()
        .nest("/contact", contact::router())
        .nest("/history", history::router())
        .nest("/reviews", reviews::router())
        .nest("/admin", admin::router())
}

/// The admin identified by the session layer in front of this service.
#[derive(Debug)]
pub struct ExtractUser(pub CurrentUser);

/// Header value as text. Raw UTF-8 is accepted so that Korean display names pass through.
fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for ExtractUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, AppError> {
        let id = header(&parts.headers, X_USER_ID)
            .and_then(|id| Uuid::from_str(id).ok())
            .ok_or(AppError::Unauthorized)?;

        let role = header(&parts.headers, X_USER_ROLE)
            .and_then(|role| Role::from_str(role).ok())
            .ok_or(AppError::Forbidden("권한이 없습니다"))?;

        let name = header(&parts.headers, X_USER_NAME).map(str::to_owned);

        Ok(ExtractUser(CurrentUser { id, role, name }))
    }
}

/// Client address, user agent and referrer of the request.
#[derive(Debug)]
pub struct ClientMeta(pub AuditMeta);

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        let headers = &parts.headers;

        // First hop of the proxy chain is the client.
        let ip_address = header(headers, "x-forwarded-for")
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .or_else(|| header(headers, "x-real-ip"))
            .map(str::to_owned);

        Ok(ClientMeta(AuditMeta {
            ip_address,
            user_agent: header(headers, "user-agent").map(str::to_owned),
            referrer: header(headers, "referer").map(str::to_owned),
        }))
    }
}

/// `Json` whose rejections use the app's error body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, AppError> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|rejection| {
                AppError::BadRequest(format!(
                    "요청 형식이 올바르지 않습니다: {}",
                    rejection.body_text()
                ))
            })
    }
}

/// `Path` whose rejections use the app's error body.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, AppError> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|_| AppError::BadRequest("잘못된 경로입니다".to_owned()))
    }
}

/// Success envelope shared by every endpoint.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            message: None,
            data,
        })
    }

    pub fn with_message(message: &'static str, data: T) -> Json<ApiResponse<T>> {
        Json(ApiResponse {
            success: true,
            message: Some(message),
            data,
        })
    }
}

/// Blank query values count as absent.
pub fn query_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Numeric query value; anything unparsable counts as absent.
pub fn query_number<T: FromStr>(value: Option<String>) -> Option<T> {
    query_value(value).and_then(|v| v.parse().ok())
}
