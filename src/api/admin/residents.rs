use crate::api::admin::residents::schemas::{ListQuery, NewResident, Resident, UpdateResident};
use crate::api::admin::{DELETED, Deleted};
use crate::api::{ApiJson, ApiPath, ApiResponse, ExtractUser};
use crate::core::residents::{ResidentDraft, ResidentPatch};
use crate::core::traits::ResidentService;
use crate::error::{AppError, AppResult};
use crate::infrastructure::entities::ResidentStatus;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_residents).post(admit_resident))
        .route(
            "/:id",
            get(get_resident).put(update_resident).delete(delete_resident),
        )
}

fn parse_status(raw: Option<String>) -> AppResult<Option<ResidentStatus>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) if raw.eq_ignore_ascii_case("ALL") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("알 수 없는 상태입니다: {raw}"))),
    }
}

async fn list_residents(
    Inject(resident_service): Inject<dyn ResidentService>,
    ExtractUser(user): ExtractUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Resident>>>> {
    let residents = resident_service
        .list_residents(&user, parse_status(query.status)?)
        .await?;

    Ok(ApiResponse::ok(
        residents.into_iter().map(Resident::from).collect(),
    ))
}

async fn get_resident(
    Inject(resident_service): Inject<dyn ResidentService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Resident>>> {
    let resident = resident_service.get_resident(&user, id).await?;

    Ok(ApiResponse::ok(resident.into()))
}

async fn admit_resident(
    Inject(resident_service): Inject<dyn ResidentService>,
    ExtractUser(user): ExtractUser,
    ApiJson(resident): ApiJson<NewResident>,
) -> AppResult<(StatusCode, Json<ApiResponse<Resident>>)> {
    let created = resident_service
        .admit_resident(
            &user,
            ResidentDraft {
                name: resident.name,
                birth_date: resident.birth_date,
                gender: resident.gender,
                admission_date: resident.admission_date,
                room_number: resident.room_number,
                grade: resident.grade,
                emergency_contact: resident.emergency_contact,
                emergency_phone: resident.emergency_phone,
                status: resident.status,
                notes: resident.notes,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("입소자가 등록되었습니다", created.into()),
    ))
}

async fn update_resident(
    Inject(resident_service): Inject<dyn ResidentService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateResident>,
) -> AppResult<Json<ApiResponse<Resident>>> {
    let resident = resident_service
        .update_resident(
            &user,
            id,
            ResidentPatch {
                name: update.name,
                birth_date: update.birth_date,
                gender: update.gender,
                admission_date: update.admission_date,
                room_number: update.room_number,
                grade: update.grade,
                emergency_contact: update.emergency_contact,
                emergency_phone: update.emergency_phone,
                status: update.status,
                notes: update.notes,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("저장되었습니다", resident.into()))
}

async fn delete_resident(
    Inject(resident_service): Inject<dyn ResidentService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    resident_service.delete_resident(&user, id).await?;

    Ok(ApiResponse::with_message(DELETED, Deleted { id }))
}

pub mod schemas {
    use crate::infrastructure::entities::{self, Gender, ResidentStatus};
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    pub struct ListQuery {
        pub status: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub struct NewResident {
        pub name: Option<String>,
        pub birth_date: Option<NaiveDate>,
        pub gender: Option<Gender>,
        pub admission_date: Option<NaiveDate>,
        pub room_number: Option<String>,
        pub grade: Option<String>,
        pub emergency_contact: Option<String>,
        pub emergency_phone: Option<String>,
        pub status: Option<ResidentStatus>,
        pub notes: Option<String>,
    }

    /// Same shape as [`NewResident`]; absent fields are left unchanged.
    pub type UpdateResident = NewResident;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Resident {
        pub id: Uuid,
        pub name: String,
        pub birth_date: NaiveDate,
        pub gender: Gender,
        pub admission_date: NaiveDate,
        pub room_number: String,
        pub grade: String,
        pub emergency_contact: String,
        pub emergency_phone: String,
        pub status: ResidentStatus,
        pub notes: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Resident> for Resident {
        fn from(resident: entities::Resident) -> Self {
            Resident {
                id: resident.id,
                name: resident.name,
                birth_date: resident.birth_date,
                gender: resident.gender,
                admission_date: resident.admission_date,
                room_number: resident.room_number,
                grade: resident.grade,
                emergency_contact: resident.emergency_contact,
                emergency_phone: resident.emergency_phone,
                status: resident.status,
                notes: resident.notes,
                created_at: resident.created_at,
                updated_at: resident.updated_at,
            }
        }
    }
}
