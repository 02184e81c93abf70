//! DB Repository abstractions

use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::entities::{
    Channel, Delivery, DeliveryStatus, HistoryCategory, HistoryFilter, HistoryPost, Inquiry,
    InquiryFilter, InquiryStatus, Page, PageRequest, Resident, ResidentStatus, Review,
    SortOrder, StaffMember, StaffStatus,
};
use crate::infrastructure::traits::{
    DbResult, DeliveryRepository, HistoryRepository, InquiryRepository, ResidentRepository,
    ReviewRepository, StaffRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use di::{Ref, injectable};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

const RETRYABLE_STATUSES: &str = "('PENDING', 'FAILED_TRANSIENT', 'FAILED_CONFIGURATION')";
const FAILED_STATUSES: &str = "('FAILED_TRANSIENT', 'FAILED_CONFIGURATION', 'FAILED_PERMANENT')";

/// Stored next to a row and matched with `instr`. SQLite's `lower()` only folds ASCII, so
/// both the column and the needle are folded here.
fn search_text<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_search(builder: &mut QueryBuilder<'_, Sqlite>, search: Option<&str>) {
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND instr(search_text, ")
            .push_bind(search.to_lowercase())
            .push(") > 0");
    }
}

#[injectable(InquiryRepository)]
pub struct DbInquiryRepository {
    connection: Ref<DatabaseConnection>,
}

fn push_inquiry_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &InquiryFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }

    push_search(builder, filter.search.as_deref());
}

#[async_trait]
impl InquiryRepository for DbInquiryRepository {
    async fn create_inquiry(&self, inquiry: Inquiry, channels: &[Channel]) -> DbResult<Inquiry> {
        let mut tx = self.connection.begin().await?;

        let searchable = search_text([
            inquiry.name.as_str(),
            inquiry.email.as_deref().unwrap_or_default(),
            inquiry.phone.as_str(),
            inquiry.message.as_str(),
        ]);

        let created: Inquiry = sqlx::query_as(
            "INSERT INTO inquiries (id, name, phone, email, inquiry_type, message, status, reply, replied_at, replied_by, ip_address, user_agent, referrer, search_text, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(inquiry.id)
        .bind(inquiry.name)
        .bind(inquiry.phone)
        .bind(inquiry.email)
        .bind(inquiry.inquiry_type)
        .bind(inquiry.message)
        .bind(inquiry.status)
        .bind(inquiry.reply)
        .bind(inquiry.replied_at)
        .bind(inquiry.replied_by)
        .bind(inquiry.ip_address)
        .bind(inquiry.user_agent)
        .bind(inquiry.referrer)
        .bind(searchable)
        .bind(inquiry.created_at)
        .bind(inquiry.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        for channel in channels {
            sqlx::query(
                "INSERT INTO notification_deliveries (inquiry_id, channel, status, attempts, created_at, updated_at) VALUES (?, ?, 'PENDING', 0, ?, ?)",
            )
            .bind(created.id)
            .bind(*channel)
            .bind(created.created_at)
            .bind(created.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn find_inquiry(&self, id: Uuid) -> DbResult<Option<Inquiry>> {
        sqlx::query_as("SELECT * FROM inquiries WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        page: PageRequest,
    ) -> DbResult<Page<Inquiry>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM inquiries");
        push_inquiry_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&**self.connection)
            .await?;

        let mut select = QueryBuilder::new("SELECT * FROM inquiries");
        push_inquiry_filter(&mut select, filter);
        select.push(match filter.sort {
            SortOrder::Newest => " ORDER BY datetime(created_at) DESC, rowid DESC",
            SortOrder::Oldest => " ORDER BY datetime(created_at) ASC, rowid ASC",
        });
        select
            .push(" LIMIT ")
            .push_bind(page.page_size as i64)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items = select
            .build_query_as::<Inquiry>()
            .fetch_all(&**self.connection)
            .await?;

        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total,
        })
    }

    async fn update_inquiry(
        &self,
        inquiry: &Inquiry,
        expected_updated_at: DateTime<Utc>,
        enqueue: Option<Channel>,
    ) -> DbResult<Option<Inquiry>> {
        let mut tx = self.connection.begin().await?;

        let updated: Option<Inquiry> = sqlx::query_as(
            "UPDATE inquiries SET status = ?, reply = ?, replied_at = ?, replied_by = ?, updated_at = ? WHERE id = ? AND updated_at = ? RETURNING *",
        )
        .bind(inquiry.status)
        .bind(&inquiry.reply)
        .bind(inquiry.replied_at)
        .bind(&inquiry.replied_by)
        .bind(inquiry.updated_at)
        .bind(inquiry.id)
        .bind(expected_updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        if let (Some(updated), Some(channel)) = (&updated, enqueue) {
            sqlx::query(
                "INSERT INTO notification_deliveries (inquiry_id, channel, status, attempts, created_at, updated_at) VALUES (?, ?, 'PENDING', 0, ?, ?) ON CONFLICT (inquiry_id, channel) DO NOTHING",
            )
            .bind(updated.id)
            .bind(channel)
            .bind(updated.updated_at)
            .bind(updated.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_inquiry(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM inquiries WHERE id = ?")
            .bind(id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_inquiries_by_status(&self) -> DbResult<Vec<(InquiryStatus, i64)>> {
        sqlx::query_as("SELECT status, COUNT(*) FROM inquiries GROUP BY status")
            .fetch_all(&**self.connection)
            .await
    }
}

#[injectable(DeliveryRepository)]
pub struct DbDeliveryRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl DeliveryRepository for DbDeliveryRepository {
    async fn list_deliveries(&self, inquiry_id: Uuid) -> DbResult<Vec<Delivery>> {
        sqlx::query_as(
            "SELECT * FROM notification_deliveries WHERE inquiry_id = ? ORDER BY datetime(created_at) ASC, channel ASC",
        )
        .bind(inquiry_id)
        .fetch_all(&**self.connection)
        .await
    }

    async fn claim_delivery(
        &self,
        inquiry_id: Uuid,
        channel: Channel,
        max_attempts: u32,
        stale_before: DateTime<Utc>,
    ) -> DbResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            "UPDATE notification_deliveries SET status = 'SENDING', attempts = attempts + 1, last_attempt_at = ?, updated_at = ? WHERE inquiry_id = ? AND channel = ? AND attempts < ? AND (status IN {RETRYABLE_STATUSES} OR (status = 'SENDING' AND last_attempt_at < ?))"
        ))
        .bind(now)
        .bind(now)
        .bind(inquiry_id)
        .bind(channel)
        .bind(max_attempts as i64)
        .bind(stale_before)
        .execute(&**self.connection)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_delivery(
        &self,
        inquiry_id: Uuid,
        channel: Channel,
        status: DeliveryStatus,
        detail: Option<String>,
        provider_message_id: Option<String>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE notification_deliveries SET status = ?, last_error = ?, provider_message_id = coalesce(?, provider_message_id), updated_at = ? WHERE inquiry_id = ? AND channel = ?",
        )
        .bind(status)
        .bind(detail)
        .bind(provider_message_id)
        .bind(Utc::now())
        .bind(inquiry_id)
        .bind(channel)
        .execute(&**self.connection)
        .await?;

        Ok(())
    }

    async fn expire_exhausted_deliveries(
        &self,
        max_attempts: u32,
        stale_before: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE notification_deliveries SET status = 'FAILED_TRANSIENT', last_error = 'interrupted during the final attempt', updated_at = ? WHERE status = 'SENDING' AND attempts >= ? AND last_attempt_at < ?",
        )
        .bind(Utc::now())
        .bind(max_attempts as i64)
        .bind(stale_before)
        .execute(&**self.connection)
        .await?;

        Ok(result.rows_affected())
    }

    async fn due_inquiries(
        &self,
        max_attempts: u32,
        stale_before: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<Uuid>> {
        sqlx::query_scalar(&format!(
            "SELECT inquiry_id FROM notification_deliveries WHERE attempts < ? AND (status IN {RETRYABLE_STATUSES} OR (status = 'SENDING' AND last_attempt_at < ?)) GROUP BY inquiry_id ORDER BY MIN(datetime(created_at)) ASC LIMIT ?"
        ))
        .bind(max_attempts as i64)
        .bind(stale_before)
        .bind(limit as i64)
        .fetch_all(&**self.connection)
        .await
    }

    async fn reset_failed_deliveries(&self, inquiry_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(&format!(
            "UPDATE notification_deliveries SET status = 'PENDING', attempts = 0, last_error = NULL, updated_at = ? WHERE inquiry_id = ? AND status IN {FAILED_STATUSES}"
        ))
        .bind(Utc::now())
        .bind(inquiry_id)
        .execute(&**self.connection)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_failed_deliveries(&self) -> DbResult<i64> {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notification_deliveries WHERE status IN {FAILED_STATUSES}"
        ))
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(HistoryRepository)]
pub struct DbHistoryRepository {
    connection: Ref<DatabaseConnection>,
}

fn push_history_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &HistoryFilter) {
    builder.push(" WHERE is_published = 1");

    if let Some(category) = filter.category {
        builder.push(" AND category = ").push_bind(category);
    }

    if let Some(year) = filter.year {
        builder
            .push(" AND substr(published_at, 1, 4) = ")
            .push_bind(format!("{year:04}"));
    }

    if let Some(month) = filter.month {
        builder
            .push(" AND substr(published_at, 6, 2) = ")
            .push_bind(format!("{month:02}"));
    }

    push_search(builder, filter.search.as_deref());

    if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder
            .push(" AND EXISTS (SELECT 1 FROM json_each(history_posts.tags) WHERE json_each.value = ")
            .push_bind(tag.to_owned())
            .push(")");
    }
}

#[async_trait]
impl HistoryRepository for DbHistoryRepository {
    async fn list_published(&self, filter: &HistoryFilter) -> DbResult<Vec<HistoryPost>> {
        let mut select = QueryBuilder::new("SELECT * FROM history_posts");
        push_history_filter(&mut select, filter);
        select.push(" ORDER BY datetime(published_at) DESC, rowid DESC");

        select
            .build_query_as::<HistoryPost>()
            .fetch_all(&**self.connection)
            .await
    }

    async fn list_all(&self) -> DbResult<Vec<HistoryPost>> {
        sqlx::query_as("SELECT * FROM history_posts ORDER BY datetime(created_at) DESC, rowid DESC")
            .fetch_all(&**self.connection)
            .await
    }

    async fn find_post(&self, id: Uuid) -> DbResult<Option<HistoryPost>> {
        sqlx::query_as("SELECT * FROM history_posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn find_post_by_slug(&self, slug: &str) -> DbResult<Option<HistoryPost>> {
        sqlx::query_as("SELECT * FROM history_posts WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM history_posts WHERE slug = ? AND (? IS NULL OR id <> ?)",
        )
        .bind(slug)
        .bind(except)
        .bind(except)
        .fetch_one(&**self.connection)
        .await?;

        Ok(count > 0)
    }

    async fn create_post(&self, post: HistoryPost) -> DbResult<HistoryPost> {
        let searchable = search_text([
            post.title.as_str(),
            post.excerpt.as_str(),
            post.content.as_str(),
        ]);

        sqlx::query_as(
            "INSERT INTO history_posts (id, title, slug, category, content, excerpt, thumbnail, tags, author, is_published, published_at, view_count, search_text, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(post.id)
        .bind(post.title)
        .bind(post.slug)
        .bind(post.category)
        .bind(post.content)
        .bind(post.excerpt)
        .bind(post.thumbnail)
        .bind(post.tags)
        .bind(post.author)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(post.view_count)
        .bind(searchable)
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn update_post(&self, post: &HistoryPost) -> DbResult<Option<HistoryPost>> {
        sqlx::query_as(
            "UPDATE history_posts SET title = ?, slug = ?, category = ?, content = ?, excerpt = ?, thumbnail = ?, tags = ?, author = ?, is_published = ?, published_at = ?, search_text = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.category)
        .bind(&post.content)
        .bind(&post.excerpt)
        .bind(&post.thumbnail)
        .bind(post.tags.clone())
        .bind(&post.author)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(search_text([
            post.title.as_str(),
            post.excerpt.as_str(),
            post.content.as_str(),
        ]))
        .bind(post.updated_at)
        .bind(post.id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_post(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM history_posts WHERE id = ?")
            .bind(id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_view(&self, id: Uuid) -> DbResult<Option<HistoryPost>> {
        sqlx::query_as(
            "UPDATE history_posts SET view_count = view_count + 1 WHERE id = ? RETURNING *",
        )
        .bind(id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn related_posts(
        &self,
        category: HistoryCategory,
        exclude_slug: &str,
        limit: u32,
    ) -> DbResult<Vec<HistoryPost>> {
        sqlx::query_as(
            "SELECT * FROM history_posts WHERE is_published = 1 AND category = ? AND slug <> ? ORDER BY datetime(published_at) DESC, rowid DESC LIMIT ?",
        )
        .bind(category)
        .bind(exclude_slug)
        .bind(limit as i64)
        .fetch_all(&**self.connection)
        .await
    }

    async fn category_counts(&self) -> DbResult<Vec<(HistoryCategory, i64)>> {
        sqlx::query_as(
            "SELECT category, COUNT(*) FROM history_posts WHERE is_published = 1 GROUP BY category",
        )
        .fetch_all(&**self.connection)
        .await
    }

    async fn published_years(&self) -> DbResult<Vec<i32>> {
        let years: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT CAST(substr(published_at, 1, 4) AS INTEGER) AS year FROM history_posts WHERE is_published = 1 AND published_at IS NOT NULL ORDER BY year DESC",
        )
        .fetch_all(&**self.connection)
        .await?;

        Ok(years.into_iter().map(|year| year as i32).collect())
    }

    async fn published_tags(&self) -> DbResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT json_each.value FROM history_posts, json_each(history_posts.tags) WHERE history_posts.is_published = 1 ORDER BY json_each.value ASC",
        )
        .fetch_all(&**self.connection)
        .await
    }
}

#[injectable(ReviewRepository)]
pub struct DbReviewRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ReviewRepository for DbReviewRepository {
    async fn list_reviews(&self, approved: Option<bool>) -> DbResult<Vec<Review>> {
        sqlx::query_as(
            "SELECT * FROM reviews WHERE (? IS NULL OR is_approved = ?) ORDER BY is_featured DESC, datetime(coalesce(approved_at, created_at)) DESC, rowid DESC",
        )
        .bind(approved)
        .bind(approved)
        .fetch_all(&**self.connection)
        .await
    }

    async fn find_review(&self, id: Uuid) -> DbResult<Option<Review>> {
        sqlx::query_as("SELECT * FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_review(&self, review: Review) -> DbResult<Review> {
        sqlx::query_as(
            "INSERT INTO reviews (id, author_name, resident_name, rating, content, is_approved, is_featured, approved_at, approved_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(review.id)
        .bind(review.author_name)
        .bind(review.resident_name)
        .bind(review.rating)
        .bind(review.content)
        .bind(review.is_approved)
        .bind(review.is_featured)
        .bind(review.approved_at)
        .bind(review.approved_by)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn update_review(&self, review: &Review) -> DbResult<Option<Review>> {
        sqlx::query_as(
            "UPDATE reviews SET rating = ?, content = ?, is_approved = ?, is_featured = ?, approved_at = ?, approved_by = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(review.rating)
        .bind(&review.content)
        .bind(review.is_approved)
        .bind(review.is_featured)
        .bind(review.approved_at)
        .bind(&review.approved_by)
        .bind(review.updated_at)
        .bind(review.id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_review(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_reviews(&self, approved: bool) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE is_approved = ?")
            .bind(approved)
            .fetch_one(&**self.connection)
            .await
    }
}

#[injectable(ResidentRepository)]
pub struct DbResidentRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl ResidentRepository for DbResidentRepository {
    async fn list_residents(&self, status: Option<ResidentStatus>) -> DbResult<Vec<Resident>> {
        sqlx::query_as(
            "SELECT * FROM residents WHERE (? IS NULL OR status = ?) ORDER BY datetime(created_at) DESC, rowid DESC",
        )
        .bind(status)
        .bind(status)
        .fetch_all(&**self.connection)
        .await
    }

    async fn find_resident(&self, id: Uuid) -> DbResult<Option<Resident>> {
        sqlx::query_as("SELECT * FROM residents WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_resident(&self, resident: Resident) -> DbResult<Resident> {
        sqlx::query_as(
            "INSERT INTO residents (id, name, birth_date, gender, admission_date, room_number, grade, emergency_contact, emergency_phone, status, notes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(resident.id)
        .bind(resident.name)
        .bind(resident.birth_date)
        .bind(resident.gender)
        .bind(resident.admission_date)
        .bind(resident.room_number)
        .bind(resident.grade)
        .bind(resident.emergency_contact)
        .bind(resident.emergency_phone)
        .bind(resident.status)
        .bind(resident.notes)
        .bind(resident.created_at)
        .bind(resident.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn update_resident(&self, resident: &Resident) -> DbResult<Option<Resident>> {
        sqlx::query_as(
            "UPDATE residents SET name = ?, birth_date = ?, gender = ?, admission_date = ?, room_number = ?, grade = ?, emergency_contact = ?, emergency_phone = ?, status = ?, notes = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&resident.name)
        .bind(resident.birth_date)
        .bind(resident.gender)
        .bind(resident.admission_date)
        .bind(&resident.room_number)
        .bind(&resident.grade)
        .bind(&resident.emergency_contact)
        .bind(&resident.emergency_phone)
        .bind(resident.status)
        .bind(&resident.notes)
        .bind(resident.updated_at)
        .bind(resident.id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn delete_resident(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM residents WHERE id = ?")
            .bind(id)
            .execute(&**self.connection)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_residents(&self, status: Option<ResidentStatus>) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM residents WHERE (? IS NULL OR status = ?)")
            .bind(status)
            .bind(status)
            .fetch_one(&**self.connection)
            .await
    }

    async fn count_admitted_on(&self, day: NaiveDate) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM residents WHERE date(admission_date) = date(?)")
            .bind(day)
            .fetch_one(&**self.connection)
            .await
    }

    async fn count_admitted_in_month(&self, day: NaiveDate) -> DbResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM residents WHERE strftime('%Y-%m', admission_date) = strftime('%Y-%m', ?)",
        )
        .bind(day)
        .fetch_one(&**self.connection)
        .await
    }
}

#[injectable(StaffRepository)]
pub struct DbStaffRepository {
    connection: Ref<DatabaseConnection>,
}

#[async_trait]
impl StaffRepository for DbStaffRepository {
    async fn list_staff(&self, status: Option<StaffStatus>) -> DbResult<Vec<StaffMember>> {
        sqlx::query_as(
            "SELECT * FROM staff WHERE (? IS NULL OR status = ?) ORDER BY name ASC, rowid ASC",
        )
        .bind(status)
        .bind(status)
        .fetch_all(&**self.connection)
        .await
    }

    async fn find_staff(&self, id: Uuid) -> DbResult<Option<StaffMember>> {
        sqlx::query_as("SELECT * FROM staff WHERE id = ?")
            .bind(id)
            .fetch_optional(&**self.connection)
            .await
    }

    async fn create_staff(&self, member: StaffMember) -> DbResult<StaffMember> {
        sqlx::query_as(
            "INSERT INTO staff (id, name, role, department, phone, email, hire_date, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(member.id)
        .bind(member.name)
        .bind(member.role)
        .bind(member.department)
        .bind(member.phone)
        .bind(member.email)
        .bind(member.hire_date)
        .bind(member.status)
        .bind(member.created_at)
        .bind(member.updated_at)
        .fetch_one(&**self.connection)
        .await
    }

    async fn update_staff(&self, member: &StaffMember) -> DbResult<Option<StaffMember>> {
        sqlx::query_as(
            "UPDATE staff SET name = ?, role = ?, department = ?, phone = ?, email = ?, hire_date = ?, status = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(&member.name)
        .bind(&member.role)
        .bind(&member.department)
        .bind(&member.phone)
        .bind(&member.email)
        .bind(member.hire_date)
        .bind(member.status)
        .bind(member.updated_at)
        .bind(member.id)
        .fetch_optional(&**self.connection)
        .await
    }

    async fn count_staff(&self, status: Option<StaffStatus>) -> DbResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM staff WHERE (? IS NULL OR status = ?)")
            .bind(status)
            .bind(status)
            .fetch_one(&**self.connection)
            .await
    }
}
