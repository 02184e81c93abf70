//! History posts: the public news feed and its CMS side.

use crate::core::auth::{Capability, CurrentUser};
use crate::core::traits::HistoryService;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::infrastructure::entities::{HistoryCategory, HistoryFilter, HistoryPost};
use crate::infrastructure::traits::HistoryRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::info;
use regex::Regex;
use serde::Serialize;
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use uuid::Uuid;

pub const EXCERPT_CHARS: usize = 150;
pub const DEFAULT_AUTHOR: &str = "관리자";
const RELATED_POSTS: u32 = 3;
const SLUG_TAKEN: &str = "이미 사용 중인 슬러그입니다";

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Plain-text lead: tags stripped, cut at 150 characters.
pub fn derive_excerpt(content: &str) -> String {
    MARKUP
        .replace_all(content, "")
        .trim()
        .chars()
        .take(EXCERPT_CHARS)
        .collect()
}

/// URL-safe slug from a title. Titles without any ASCII letters or digits get a random one.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        random_slug()
    } else {
        slug.to_owned()
    }
}

fn random_slug() -> String {
    format!("post-{}", &Uuid::new_v4().simple().to_string()[..8])
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG.is_match(slug)
}

/// Sets `is_published`; the first publication stamps `published_at`, which is never cleared.
pub fn apply_publish(post: &mut HistoryPost, is_published: bool, now: DateTime<Utc>) {
    post.is_published = is_published;
    if is_published && post.published_at.is_none() {
        post.published_at = Some(now);
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());

    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_owned());
        }
    }

    normalized
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// A new post as submitted by an admin.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
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

/// Partial update. Absent fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub category: Option<HistoryCategory>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    /// An empty string removes the thumbnail.
    pub thumbnail: Option<String>,
    pub tags: Option<Vec<String>>,
    pub author: Option<String>,
    pub is_published: Option<bool>,
}

/// Facets of the published feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMeta {
    pub category_counts: BTreeMap<HistoryCategory, i64>,
    pub years: Vec<i32>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostView {
    pub post: HistoryPost,
    pub related_posts: Vec<HistoryPost>,
}

#[injectable(HistoryService)]
pub struct CmsHistoryService {
    posts: Ref<dyn HistoryRepository>,
}

impl CmsHistoryService {
    async fn require_post(&self, id: Uuid) -> AppResult<HistoryPost> {
        self.posts
            .find_post(id)
            .await?
            .ok_or(AppError::NotFound("게시물"))
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> AppResult<()> {
        if self.posts.slug_exists(slug, except).await? {
            return Err(AppError::Conflict(SLUG_TAKEN.to_owned()));
        }
        Ok(())
    }

    fn checked_slug(slug: String, errors: &mut FieldErrors) -> String {
        let slug = slug.trim().to_owned();
        if !is_valid_slug(&slug) {
            errors.insert(
                "slug",
                "슬러그는 영문 소문자, 숫자, 하이픈만 사용할 수 있습니다".to_owned(),
            );
        }
        slug
    }
}

#[async_trait]
impl HistoryService for CmsHistoryService {
    async fn list_published(&self, filter: HistoryFilter) -> AppResult<Vec<HistoryPost>> {
        if filter.month.is_some_and(|month| !(1..=12).contains(&month)) {
            return Err(AppError::BadRequest("월은 1에서 12 사이여야 합니다".to_owned()));
        }

        Ok(self.posts.list_published(&filter).await?)
    }

    async fn meta(&self) -> AppResult<HistoryMeta> {
        let mut category_counts: BTreeMap<HistoryCategory, i64> =
            HistoryCategory::ALL.into_iter().map(|c| (c, 0)).collect();
        category_counts.extend(self.posts.category_counts().await?);

        Ok(HistoryMeta {
            category_counts,
            years: self.posts.published_years().await?,
            tags: self.posts.published_tags().await?,
        })
    }

    async fn view_post(&self, slug: &str) -> AppResult<PostView> {
        let post = self
            .posts
            .find_post_by_slug(slug)
            .await?
            .ok_or(AppError::NotFound("게시물"))?;

        if !post.is_published {
            return Err(AppError::Forbidden("비공개 게시물입니다"));
        }

        let post = self
            .posts
            .record_view(post.id)
            .await?
            .ok_or(AppError::NotFound("게시물"))?;
        let related_posts = self
            .posts
            .related_posts(post.category, &post.slug, RELATED_POSTS)
            .await?;

        Ok(PostView {
            post,
            related_posts,
        })
    }

    async fn list_posts(&self, user: &CurrentUser) -> AppResult<Vec<HistoryPost>> {
        user.require(Capability::ManageHistory)?;

        Ok(self.posts.list_all().await?)
    }

    async fn get_post(&self, user: &CurrentUser, id: Uuid) -> AppResult<HistoryPost> {
        user.require(Capability::ManageHistory)?;

        self.require_post(id).await
    }

    async fn create_post(&self, user: &CurrentUser, draft: PostDraft) -> AppResult<HistoryPost> {
        user.require(Capability::ManageHistory)?;

        let mut errors = FieldErrors::new();
        let title = non_blank(draft.title);
        let content = non_blank(draft.content);
        for (field, missing) in [
            ("title", title.is_none()),
            ("category", draft.category.is_none()),
            ("content", content.is_none()),
        ] {
            if missing {
                errors.insert(field, "제목, 카테고리, 내용은 필수입니다".to_owned());
            }
        }
        let slug = non_blank(draft.slug).map(|slug| Self::checked_slug(slug, &mut errors));

        let (Some(title), Some(category), Some(content)) = (title, draft.category, content) else {
            return Err(AppError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let slug = match slug {
            Some(slug) => {
                self.ensure_slug_free(&slug, None).await?;
                slug
            }
            None => {
                let derived = slugify(&title);
                if self.posts.slug_exists(&derived, None).await? {
                    format!("{derived}-{}", &Uuid::new_v4().simple().to_string()[..6])
                } else {
                    derived
                }
            }
        };

        let now = Utc::now();
        let mut post = HistoryPost {
            id: Uuid::new_v4(),
            excerpt: non_blank(draft.excerpt).unwrap_or_else(|| derive_excerpt(&content)),
            title,
            slug,
            category,
            content,
            thumbnail: non_blank(draft.thumbnail),
            tags: Json(normalize_tags(draft.tags)),
            author: non_blank(draft.author).unwrap_or_else(|| DEFAULT_AUTHOR.to_owned()),
            is_published: false,
            published_at: None,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        apply_publish(&mut post, draft.is_published, now);

        let created = self
            .posts
            .create_post(post)
            .await
            .map_err(|e| AppError::from_write(e, SLUG_TAKEN))?;

        info!("history post {} ({}) created by {}", created.id, created.slug, user.id);
        Ok(created)
    }

    async fn update_post(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: PostPatch,
    ) -> AppResult<HistoryPost> {
        user.require(Capability::ManageHistory)?;

        let mut post = self.require_post(id).await?;
        let mut errors = FieldErrors::new();

        if let Some(title) = patch.title {
            match non_blank(Some(title)) {
                Some(title) => post.title = title,
                None => {
                    errors.insert("title", "제목을 입력해주세요".to_owned());
                }
            }
        }

        if let Some(content) = patch.content {
            match non_blank(Some(content)) {
                Some(content) => {
                    if patch.excerpt.is_none() {
                        post.excerpt = derive_excerpt(&content);
                    }
                    post.content = content;
                }
                None => {
                    errors.insert("content", "내용을 입력해주세요".to_owned());
                }
            }
        }

        let slug = patch.slug.map(|slug| Self::checked_slug(slug, &mut errors));

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        if let Some(slug) = slug {
            if slug != post.slug {
                self.ensure_slug_free(&slug, Some(id)).await?;
                post.slug = slug;
            }
        }

        if let Some(excerpt) = patch.excerpt {
            post.excerpt = non_blank(Some(excerpt)).unwrap_or_else(|| derive_excerpt(&post.content));
        }
        if let Some(category) = patch.category {
            post.category = category;
        }
        if let Some(thumbnail) = patch.thumbnail {
            post.thumbnail = non_blank(Some(thumbnail));
        }
        if let Some(tags) = patch.tags {
            post.tags = Json(normalize_tags(tags));
        }
        if let Some(author) = patch.author {
            post.author = non_blank(Some(author)).unwrap_or_else(|| DEFAULT_AUTHOR.to_owned());
        }

        let now = Utc::now();
        if let Some(is_published) = patch.is_published {
            apply_publish(&mut post, is_published, now);
        }
        post.updated_at = now;

        let updated = self
            .posts
            .update_post(&post)
            .await
            .map_err(|e| AppError::from_write(e, SLUG_TAKEN))?
            .ok_or(AppError::NotFound("게시물"))?;

        info!("history post {id} updated by {}", user.id);
        Ok(updated)
    }

    async fn delete_post(&self, user: &CurrentUser, id: Uuid) -> AppResult<()> {
        user.require(Capability::DeleteHistory)?;

        if !self.posts.delete_post(id).await? {
            return Err(AppError::NotFound("게시물"));
        }

        info!("history post {id} deleted by {}", user.id);
        Ok(())
    }
}
