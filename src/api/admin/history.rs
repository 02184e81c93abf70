//! History post management

use crate::api::admin::history::schemas::{CreatePost, UpdatePost};
use crate::api::admin::{DELETED, Deleted};
use crate::api::history::schemas::HistoryPost;
use crate::api::{ApiJson, ApiPath, ApiResponse, ExtractUser};
use crate::core::traits::HistoryService;
use crate::error::AppResult;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/:id", get(get_post).put(update_post).delete(delete_post))
}

/// Drafts included, newest first.
async fn list_posts(
    Inject(history_service): Inject<dyn HistoryService>,
    ExtractUser(user): ExtractUser,
) -> AppResult<Json<ApiResponse<Vec<HistoryPost>>>> {
    let posts = history_service.list_posts(&user).await?;

    Ok(ApiResponse::ok(
        posts.into_iter().map(HistoryPost::from).collect(),
    ))
}

async fn get_post(
    Inject(history_service): Inject<dyn HistoryService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<HistoryPost>>> {
    let post = history_service.get_post(&user, id).await?;

    Ok(ApiResponse::ok(post.into()))
}

async fn create_post(
    Inject(history_service): Inject<dyn HistoryService>,
    ExtractUser(user): ExtractUser,
    ApiJson(create): ApiJson<CreatePost>,
) -> AppResult<(StatusCode, Json<ApiResponse<HistoryPost>>)> {
    let post = history_service.create_post(&user, create.into()).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("게시물이 등록되었습니다", post.into()),
    ))
}

async fn update_post(
    Inject(history_service): Inject<dyn HistoryService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdatePost>,
) -> AppResult<Json<ApiResponse<HistoryPost>>> {
    let post = history_service.update_post(&user, id, update.into()).await?;

    Ok(ApiResponse::with_message("저장되었습니다", post.into()))
}

async fn delete_post(
    Inject(history_service): Inject<dyn HistoryService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    history_service.delete_post(&user, id).await?;

    Ok(ApiResponse::with_message(DELETED, Deleted { id }))
}

pub mod schemas {
    use crate::core::history::{PostDraft, PostPatch};
    use crate::infrastructure::entities::HistoryCategory;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub struct CreatePost {
        pub title: Option<String>,
        pub slug: Option<String>,
        pub category: Option<HistoryCategory>,
        pub content: Option<String>,
        pub excerpt: Option<String>,
        pub thumbnail: Option<String>,
        pub tags: Vec<String>,
        pub author: Option<String>,
        pub is_published: bool,
    }

    impl From<CreatePost> for PostDraft {
        fn from(create: CreatePost) -> Self {
            PostDraft {
                title: create.title,
                slug: create.slug,
                category: create.category,
                content: create.content,
                excerpt: create.excerpt,
                thumbnail: create.thumbnail,
                tags: create.tags,
                author: create.author,
                is_published: create.is_published,
            }
        }
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub struct UpdatePost {
        pub title: Option<String>,
        pub slug: Option<String>,
        pub category: Option<HistoryCategory>,
        pub content: Option<String>,
        pub excerpt: Option<String>,
        pub thumbnail: Option<String>,
        pub tags: Option<Vec<String>>,
        pub author: Option<String>,
        pub is_published: Option<bool>,
    }

    impl From<UpdatePost> for PostPatch {
        fn from(update: UpdatePost) -> Self {
            PostPatch {
                title: update.title,
                slug: update.slug,
                category: update.category,
                content: update.content,
                excerpt: update.excerpt,
                thumbnail: update.thumbnail,
                tags: update.tags,
                author: update.author,
                is_published: update.is_published,
            }
        }
    }
}
