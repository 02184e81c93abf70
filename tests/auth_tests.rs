//! Unit tests for the request extractors

use axum::extract::FromRequestParts;
use axum::http::{HeaderValue, Request, StatusCode};
use carehome_api::api::{ClientMeta, ExtractUser};
use carehome_api::core::auth::Role;
use uuid::Uuid;

#[tokio::test]
async fn test_extract_user_valid_headers() {
    let user_id = Uuid::new_v4();
    let req = Request::builder()
        .header("X-User-ID", user_id.to_string())
        .header("X-User-Role", "super_admin")
        .header("X-User-Name", "김관리")
        .body(())
        .unwrap();

    let (mut parts, _) = req.into_parts();
    let ExtractUser(user) = ExtractUser::from_request_parts(&mut parts, &())
        .await
        .unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(user.role, Role::SuperAdmin);
    assert_eq!(user.display_name(), "김관리");
}

#[tokio::test]
async fn test_extract_user_without_name_uses_id() {
    let user_id = Uuid::new_v4();
    let req = Request::builder()
        .header("X-User-ID", user_id.to_string())
        .header("X-User-Role", "STAFF")
        .body(())
        .unwrap();

    let (mut parts, _) = req.into_parts();
    let ExtractUser(user) = ExtractUser::from_request_parts(&mut parts, &())
        .await
        .unwrap();

    assert_eq!(user.name, None);
    assert_eq!(user.display_name(), user_id.to_string());
}

#[tokio::test]
async fn test_extract_user_missing_header() {
    let req = Request::builder().body(()).unwrap();

    let (mut parts, _) = req.into_parts();
    let result = ExtractUser::from_request_parts(&mut parts, &()).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extract_user_invalid_uuid() {
    let req = Request::builder()
        .header("X-User-ID", "not-a-uuid")
        .header("X-User-Role", "ADMIN")
        .body(())
        .unwrap();

    let (mut parts, _) = req.into_parts();
    let result = ExtractUser::from_request_parts(&mut parts, &()).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extract_user_invalid_utf8() {
    let mut req = Request::builder().body(()).unwrap();
    req.headers_mut()
        .insert("X-User-ID", HeaderValue::from_bytes(&[0xFF, 0xFE]).unwrap());

    let (mut parts, _) = req.into_parts();
    let result = ExtractUser::from_request_parts(&mut parts, &()).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extract_user_unknown_role() {
    for role in [None, Some("GUEST")] {
        let mut req = Request::builder().header("X-User-ID", Uuid::new_v4().to_string());
        if let Some(role) = role {
            req = req.header("X-User-Role", role);
        }

        let (mut parts, _) = req.body(()).unwrap().into_parts();
        let result = ExtractUser::from_request_parts(&mut parts, &()).await;

        assert_eq!(result.unwrap_err().status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_client_meta_prefers_first_forwarded_hop() {
    let req = Request::builder()
        .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .header("X-Real-IP", "10.0.0.1")
        .header("User-Agent", "Mozilla/5.0")
        .header("Referer", "https://example.com/contact")
        .body(())
        .unwrap();

    let (mut parts, _) = req.into_parts();
    let ClientMeta(meta) = ClientMeta::from_request_parts(&mut parts, &())
        .await
        .unwrap();

    assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(meta.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(meta.referrer.as_deref(), Some("https://example.com/contact"));
}

#[tokio::test]
async fn test_client_meta_falls_back_to_real_ip() {
    let req = Request::builder()
        .header("X-Real-IP", "198.51.100.2")
        .body(())
        .unwrap();

    let (mut parts, _) = req.into_parts();
    let ClientMeta(meta) = ClientMeta::from_request_parts(&mut parts, &())
        .await
        .unwrap();

    assert_eq!(meta.ip_address.as_deref(), Some("198.51.100.2"));
    assert_eq!(meta.user_agent, None);
}
