//! Admin console endpoints. Every handler requires an [`ExtractUser`](crate::api::ExtractUser).

use axum::Router;
use serde::Serialize;
use uuid::Uuid;

pub mod contacts;
pub mod dashboard;
pub mod history;
pub mod residents;
pub mod reviews;
pub mod staff;

pub fn router() -> Router {
    Router::new()
        .nest("/contacts", contacts::router())
        .nest("/history", history::router())
        .nest("/reviews", reviews::router())
        .nest("/residents", residents::router())
        .nest("/staff", staff::router())
        .nest("/dashboard", dashboard::router())
}

pub const DELETED: &str = "삭제되었습니다";

#[derive(Serialize, Debug)]
pub struct Deleted {
    pub id: Uuid,
}
