//! Residents and employees of the home, as kept by the admin console.

use crate::core::auth::{Capability, CurrentUser};
use crate::core::traits::{ResidentService, StaffService};
use crate::core::validation::{EMAIL, check_length, reject};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::infrastructure::entities::{
    Gender, Resident, ResidentStatus, StaffMember, StaffStatus,
};
use crate::infrastructure::traits::{ResidentRepository, StaffRepository};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use di::{Ref, injectable};
use log::info;
use uuid::Uuid;

const REQUIRED: &str = "필수 입력 항목입니다";
const GRADES: [&str; 5] = ["1", "2", "3", "4", "5"];

fn required<T>(errors: &mut FieldErrors, field: &'static str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        reject(errors, field, REQUIRED);
    }
    value
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// A new resident as entered at admission.
#[derive(Debug, Clone, Default)]
pub struct ResidentDraft {
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

/// Partial update. Absent fields stay as they are.
#[derive(Debug, Clone, Default)]
pub struct ResidentPatch {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub admission_date: Option<NaiveDate>,
    pub room_number: Option<String>,
    pub grade: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub status: Option<ResidentStatus>,
    /// An empty string clears the notes.
    pub notes: Option<String>,
}

/// Field rules every stored resident satisfies.
pub fn check_resident(resident: &Resident) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    check_length(
        &mut errors,
        "name",
        &resident.name,
        1,
        100,
        REQUIRED,
        "이름은 100자 이하로 입력해주세요",
    );
    check_length(
        &mut errors,
        "roomNumber",
        &resident.room_number,
        1,
        20,
        REQUIRED,
        "호실은 20자 이하로 입력해주세요",
    );
    if !GRADES.contains(&resident.grade.as_str()) {
        reject(&mut errors, "grade", "장기요양등급은 1에서 5 사이여야 합니다");
    }
    check_length(
        &mut errors,
        "emergencyContact",
        &resident.emergency_contact,
        1,
        100,
        REQUIRED,
        "보호자 이름은 100자 이하로 입력해주세요",
    );
    check_length(
        &mut errors,
        "emergencyPhone",
        &resident.emergency_phone,
        1,
        40,
        REQUIRED,
        "보호자 연락처는 40자 이하로 입력해주세요",
    );
    if resident.admission_date < resident.birth_date {
        reject(
            &mut errors,
            "admissionDate",
            "입소일은 생년월일 이후여야 합니다",
        );
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn apply_resident_patch(current: &Resident, patch: ResidentPatch) -> Resident {
    let mut next = current.clone();

    if let Some(name) = patch.name {
        next.name = name.trim().to_owned();
    }
    if let Some(birth_date) = patch.birth_date {
        next.birth_date = birth_date;
    }
    if let Some(gender) = patch.gender {
        next.gender = gender;
    }
    if let Some(admission_date) = patch.admission_date {
        next.admission_date = admission_date;
    }
    if let Some(room_number) = patch.room_number {
        next.room_number = room_number.trim().to_owned();
    }
    if let Some(grade) = patch.grade {
        next.grade = grade.trim().to_owned();
    }
    if let Some(contact) = patch.emergency_contact {
        next.emergency_contact = contact.trim().to_owned();
    }
    if let Some(phone) = patch.emergency_phone {
        next.emergency_phone = phone.trim().to_owned();
    }
    if let Some(status) = patch.status {
        next.status = status;
    }
    if let Some(notes) = patch.notes {
        next.notes = text(Some(notes));
    }

    next
}

#[injectable(ResidentService)]
pub struct ResidentDirectoryService {
    residents: Ref<dyn ResidentRepository>,
}

impl ResidentDirectoryService {
    async fn require_resident(&self, id: Uuid) -> AppResult<Resident> {
        self.residents
            .find_resident(id)
            .await?
            .ok_or(AppError::NotFound("입소자"))
    }
}

#[async_trait]
impl ResidentService for ResidentDirectoryService {
    async fn list_residents(
        &self,
        user: &CurrentUser,
        status: Option<ResidentStatus>,
    ) -> AppResult<Vec<Resident>> {
        user.require(Capability::ManageResidents)?;

        Ok(self.residents.list_residents(status).await?)
    }

    async fn get_resident(&self, user: &CurrentUser, id: Uuid) -> AppResult<Resident> {
        user.require(Capability::ManageResidents)?;

        self.require_resident(id).await
    }

    async fn admit_resident(&self, user: &CurrentUser, draft: ResidentDraft) -> AppResult<Resident> {
        user.require(Capability::ManageResidents)?;

        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", text(draft.name));
        let birth_date = required(&mut errors, "birthDate", draft.birth_date);
        let gender = required(&mut errors, "gender", draft.gender);
        let admission_date = required(&mut errors, "admissionDate", draft.admission_date);
        let room_number = required(&mut errors, "roomNumber", text(draft.room_number));
        let grade = required(&mut errors, "grade", text(draft.grade));
        let emergency_contact =
            required(&mut errors, "emergencyContact", text(draft.emergency_contact));
        let emergency_phone = required(&mut errors, "emergencyPhone", text(draft.emergency_phone));

        let (
            Some(name),
            Some(birth_date),
            Some(gender),
            Some(admission_date),
            Some(room_number),
            Some(grade),
            Some(emergency_contact),
            Some(emergency_phone),
        ) = (
            name,
            birth_date,
            gender,
            admission_date,
            room_number,
            grade,
            emergency_contact,
            emergency_phone,
        )
        else {
            return Err(AppError::Validation(errors));
        };

        let now = Utc::now();
        let resident = Resident {
            id: Uuid::new_v4(),
            name,
            birth_date,
            gender,
            admission_date,
            room_number,
            grade,
            emergency_contact,
            emergency_phone,
            status: draft.status.unwrap_or_default(),
            notes: text(draft.notes),
            created_at: now,
            updated_at: now,
        };
        check_resident(&resident).map_err(AppError::Validation)?;

        let created = self.residents.create_resident(resident).await?;

        info!("resident {} admitted to room {} by {}", created.id, created.room_number, user.id);
        Ok(created)
    }

    async fn update_resident(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: ResidentPatch,
    ) -> AppResult<Resident> {
        user.require(Capability::ManageResidents)?;

        let current = self.require_resident(id).await?;
        let mut next = apply_resident_patch(&current, patch);
        if next == current {
            return Ok(current);
        }
        check_resident(&next).map_err(AppError::Validation)?;
        next.updated_at = Utc::now();

        let updated = self
            .residents
            .update_resident(&next)
            .await?
            .ok_or(AppError::NotFound("입소자"))?;

        info!("resident {id} updated by {}", user.id);
        Ok(updated)
    }

    async fn delete_resident(&self, user: &CurrentUser, id: Uuid) -> AppResult<()> {
        user.require(Capability::DeleteResidents)?;

        if !self.residents.delete_resident(id).await? {
            return Err(AppError::NotFound("입소자"));
        }

        info!("resident {id} deleted by {}", user.id);
        Ok(())
    }
}

/// A new employee record.
#[derive(Debug, Clone, Default)]
pub struct StaffDraft {
    pub name: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<StaffStatus>,
}

/// Partial update. An empty email removes it.
#[derive(Debug, Clone, Default)]
pub struct StaffPatch {
    pub name: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<StaffStatus>,
}

pub fn check_staff(member: &StaffMember) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    check_length(&mut errors, "name", &member.name, 1, 100, REQUIRED, "이름은 100자 이하로 입력해주세요");
    check_length(&mut errors, "role", &member.role, 1, 50, REQUIRED, "직책은 50자 이하로 입력해주세요");
    check_length(
        &mut errors,
        "department",
        &member.department,
        1,
        50,
        REQUIRED,
        "부서는 50자 이하로 입력해주세요",
    );
    check_length(&mut errors, "phone", &member.phone, 1, 40, REQUIRED, "연락처는 40자 이하로 입력해주세요");
    if member.email.as_deref().is_some_and(|email| !EMAIL.is_match(email)) {
        reject(&mut errors, "email", "올바른 이메일 형식이 아닙니다");
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[injectable(StaffService)]
pub struct StaffDirectoryService {
    staff: Ref<dyn StaffRepository>,
}

impl StaffDirectoryService {
    async fn require_member(&self, id: Uuid) -> AppResult<StaffMember> {
        self.staff
            .find_staff(id)
            .await?
            .ok_or(AppError::NotFound("직원"))
    }
}

#[async_trait]
impl StaffService for StaffDirectoryService {
    async fn list_staff(
        &self,
        user: &CurrentUser,
        status: Option<StaffStatus>,
    ) -> AppResult<Vec<StaffMember>> {
        user.require(Capability::ManageStaff)?;

        Ok(self.staff.list_staff(status).await?)
    }

    async fn get_staff(&self, user: &CurrentUser, id: Uuid) -> AppResult<StaffMember> {
        user.require(Capability::ManageStaff)?;

        self.require_member(id).await
    }

    async fn hire_staff(&self, user: &CurrentUser, draft: StaffDraft) -> AppResult<StaffMember> {
        user.require(Capability::ManageStaff)?;

        let mut errors = FieldErrors::new();
        let name = required(&mut errors, "name", text(draft.name));
        let role = required(&mut errors, "role", text(draft.role));
        let department = required(&mut errors, "department", text(draft.department));
        let phone = required(&mut errors, "phone", text(draft.phone));
        let hire_date = required(&mut errors, "hireDate", draft.hire_date);

        let (Some(name), Some(role), Some(department), Some(phone), Some(hire_date)) =
            (name, role, department, phone, hire_date)
        else {
            return Err(AppError::Validation(errors));
        };

        let now = Utc::now();
        let member = StaffMember {
            id: Uuid::new_v4(),
            name,
            role,
            department,
            phone,
            email: text(draft.email).map(|email| email.to_lowercase()),
            hire_date,
            status: draft.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        check_staff(&member).map_err(AppError::Validation)?;

        let created = self.staff.create_staff(member).await?;

        info!("staff member {} ({}) registered by {}", created.id, created.role, user.id);
        Ok(created)
    }

    async fn update_staff(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: StaffPatch,
    ) -> AppResult<StaffMember> {
        user.require(Capability::ManageStaff)?;

        let current = self.require_member(id).await?;
        let mut next = current.clone();
        if let Some(name) = patch.name {
            next.name = name.trim().to_owned();
        }
        if let Some(role) = patch.role {
            next.role = role.trim().to_owned();
        }
        if let Some(department) = patch.department {
            next.department = department.trim().to_owned();
        }
        if let Some(phone) = patch.phone {
            next.phone = phone.trim().to_owned();
        }
        if let Some(email) = patch.email {
            next.email = text(Some(email)).map(|email| email.to_lowercase());
        }
        if let Some(hire_date) = patch.hire_date {
            next.hire_date = hire_date;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }

        if next == current {
            return Ok(current);
        }
        check_staff(&next).map_err(AppError::Validation)?;
        next.updated_at = Utc::now();

        let updated = self
            .staff
            .update_staff(&next)
            .await?
            .ok_or(AppError::NotFound("직원"))?;

        info!("staff member {id} updated by {}", user.id);
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resident() -> Resident {
        let now = Utc::now();
        Resident {
            id: Uuid::new_v4(),
            name: "박순자".to_owned(),
            birth_date: date(1938, 3, 2),
            gender: Gender::Female,
            admission_date: date(2024, 5, 1),
            room_number: "201".to_owned(),
            grade: "3".to_owned(),
            emergency_contact: "박민수".to_owned(),
            emergency_phone: "010-2222-3333".to_owned(),
            status: ResidentStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_resident_passes() {
        assert_eq!(check_resident(&resident()), Ok(()));
    }

    #[test]
    fn grade_and_dates_are_checked() {
        let mut invalid = resident();
        invalid.grade = "6".to_owned();
        invalid.admission_date = date(1930, 1, 1);
        invalid.room_number = String::new();

        let errors = check_resident(&invalid).unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["admissionDate", "grade", "roomNumber"]
        );
    }

    #[test]
    fn patch_trims_and_clears_notes() {
        let mut current = resident();
        current.notes = Some("당뇨 식단".to_owned());

        let next = apply_resident_patch(
            &current,
            ResidentPatch {
                room_number: Some(" 305 ".to_owned()),
                status: Some(ResidentStatus::Hospitalized),
                notes: Some("  ".to_owned()),
                ..ResidentPatch::default()
            },
        );

        assert_eq!(next.room_number, "305");
        assert_eq!(next.status, ResidentStatus::Hospitalized);
        assert_eq!(next.notes, None);
        assert_eq!(next.name, current.name);
    }

    #[test]
    fn staff_email_must_be_well_formed() {
        let now = Utc::now();
        let mut member = StaffMember {
            id: Uuid::new_v4(),
            name: "최간호".to_owned(),
            role: "간호사".to_owned(),
            department: "간호팀".to_owned(),
            phone: "010-4444-5555".to_owned(),
            email: Some("nurse@example.com".to_owned()),
            hire_date: date(2023, 9, 1),
            status: StaffStatus::Active,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(check_staff(&member), Ok(()));

        member.email = Some("nurse".to_owned());
        assert!(check_staff(&member).unwrap_err().contains_key("email"));
    }
}
