use crate::api::admin::staff::schemas::{ListQuery, NewStaffMember, StaffMember, UpdateStaffMember};
use crate::api::{ApiJson, ApiPath, ApiResponse, ExtractUser};
use crate::core::residents::{StaffDraft, StaffPatch};
use crate::core::traits::StaffService;
use crate::error::{AppError, AppResult};
use crate::infrastructure::entities::StaffStatus;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_staff).post(hire_staff))
        .route("/:id", get(get_staff).put(update_staff))
}

async fn list_staff(
    Inject(staff_service): Inject<dyn StaffService>,
    ExtractUser(user): ExtractUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<StaffMember>>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) if raw.eq_ignore_ascii_case("ALL") => None,
        Some(raw) => Some(
            raw.parse::<StaffStatus>()
                .map_err(|_| AppError::BadRequest(format!("알 수 없는 상태입니다: {raw}")))?,
        ),
    };

    let staff = staff_service.list_staff(&user, status).await?;

    Ok(ApiResponse::ok(staff.into_iter().map(StaffMember::from).collect()))
}

async fn get_staff(
    Inject(staff_service): Inject<dyn StaffService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<StaffMember>>> {
    let member = staff_service.get_staff(&user, id).await?;

    Ok(ApiResponse::ok(member.into()))
}

async fn hire_staff(
    Inject(staff_service): Inject<dyn StaffService>,
    ExtractUser(user): ExtractUser,
    ApiJson(member): ApiJson<NewStaffMember>,
) -> AppResult<(StatusCode, Json<ApiResponse<StaffMember>>)> {
    let created = staff_service
        .hire_staff(
            &user,
            StaffDraft {
                name: member.name,
                role: member.role,
                department: member.department,
                phone: member.phone,
                email: member.email,
                hire_date: member.hire_date,
                status: member.status,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("직원이 등록되었습니다", created.into()),
    ))
}

async fn update_staff(
    Inject(staff_service): Inject<dyn StaffService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateStaffMember>,
) -> AppResult<Json<ApiResponse<StaffMember>>> {
    let member = staff_service
        .update_staff(
            &user,
            id,
            StaffPatch {
                name: update.name,
                role: update.role,
                department: update.department,
                phone: update.phone,
                email: update.email,
                hire_date: update.hire_date,
                status: update.status,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("저장되었습니다", member.into()))
}

pub mod schemas {
    use crate::infrastructure::entities::{self, StaffStatus};
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    pub struct ListQuery {
        pub status: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub struct NewStaffMember {
        pub name: Option<String>,
        pub role: Option<String>,
        pub department: Option<String>,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub hire_date: Option<NaiveDate>,
        pub status: Option<StaffStatus>,
    }

    pub type UpdateStaffMember = NewStaffMember;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct StaffMember {
        pub id: Uuid,
        pub name: String,
        pub role: String,
        pub department: String,
        pub phone: String,
        pub email: Option<String>,
        pub hire_date: NaiveDate,
        pub status: StaffStatus,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::StaffMember> for StaffMember {
        fn from(member: entities::StaffMember) -> Self {
            StaffMember {
                id: member.id,
                name: member.name,
                role: member.role,
                department: member.department,
                phone: member.phone,
                email: member.email,
                hire_date: member.hire_date,
                status: member.status,
                created_at: member.created_at,
                updated_at: member.updated_at,
            }
        }
    }
}
