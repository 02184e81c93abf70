//! Public history feed

use crate::api::history::schemas::{HistoryList, HistoryQuery, PostDetail};
use crate::api::{ApiResponse, query_number, query_value};
use crate::core::history::HistoryMeta;
use crate::core::traits::HistoryService;
use crate::error::AppResult;
use crate::infrastructure::entities::{HistoryCategory, HistoryFilter};
use axum::extract::{Path, Query};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_history))
        .route("/:slug", get(view_post))
}

/// Unknown categories (including `ALL`) do not filter.
pub fn parse_category(raw: Option<String>) -> Option<HistoryCategory> {
    query_value(raw)?.parse().ok()
}

async fn list_history(
    Inject(history_service): Inject<dyn HistoryService>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Response> {
    if query_value(query.meta).as_deref() == Some("true") {
        let meta: HistoryMeta = history_service.meta().await?;
        return Ok(ApiResponse::ok(meta).into_response());
    }

    let posts = history_service
        .list_published(HistoryFilter {
            category: parse_category(query.category),
            year: query_number(query.year),
            month: query_number(query.month),
            search: query_value(query.search),
            tag: query_value(query.tag),
        })
        .await?;

    Ok(Json(HistoryList {
        success: true,
        count: posts.len(),
        data: posts.into_iter().map(schemas::HistoryPost::from).collect(),
    })
    .into_response())
}

async fn view_post(
    Inject(history_service): Inject<dyn HistoryService>,
    Path(slug): Path<String>,
) -> AppResult<Json<ApiResponse<PostDetail>>> {
    let view = history_service.view_post(&slug).await?;

    Ok(ApiResponse::ok(PostDetail {
        post: view.post.into(),
        related_posts: view.related_posts.into_iter().map(Into::into).collect(),
    }))
}

pub mod schemas {
    use crate::infrastructure::entities::{self, HistoryCategory};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Raw query string; values are parsed leniently by the handler.
    #[derive(Deserialize, Debug, Default)]
    pub struct HistoryQuery {
        pub category: Option<String>,
        pub year: Option<String>,
        pub month: Option<String>,
        pub search: Option<String>,
        pub tag: Option<String>,
        pub meta: Option<String>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct HistoryPost {
        pub id: Uuid,
        pub title: String,
        pub slug: String,
        pub category: HistoryCategory,
        pub content: String,
        pub excerpt: String,
        pub thumbnail: Option<String>,
        pub tags: Vec<String>,
        pub author: String,
        pub is_published: bool,
        pub published_at: Option<DateTime<Utc>>,
        pub view_count: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::HistoryPost> for HistoryPost {
        fn from(post: entities::HistoryPost) -> Self {
            HistoryPost {
                id: post.id,
                title: post.title,
                slug: post.slug,
                category: post.category,
                content: post.content,
                excerpt: post.excerpt,
                thumbnail: post.thumbnail,
                tags: post.tags.0,
                author: post.author,
                is_published: post.is_published,
                published_at: post.published_at,
                view_count: post.view_count,
                created_at: post.created_at,
                updated_at: post.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct HistoryList {
        pub success: bool,
        pub data: Vec<HistoryPost>,
        pub count: usize,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct PostDetail {
        pub post: HistoryPost,
        pub related_posts: Vec<HistoryPost>,
    }
}
