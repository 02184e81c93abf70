//! Contact form checks and normalization.
//!
//! `validate` never fails on user input in any way other than the per-field error map, and
//! `sanitize` is total: everything that reaches it has already been validated.

use crate::error::FieldErrors;
use crate::infrastructure::entities::InquiryType;
use regex::Regex;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::sync::LazyLock;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^01\d-?\d{3,4}-?\d{4}$").expect("valid phone regex"));

pub(crate) static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

const MALFORMED: &str = "입력 형식이 올바르지 않습니다";

/// One posted value. A value of the wrong JSON type is kept as `Malformed` so that it is
/// reported on its field like any other violation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormField<T> {
    Value(T),
    Malformed(IgnoredAny),
}

impl<T> From<T> for FormField<T> {
    fn from(value: T) -> Self {
        FormField::Value(value)
    }
}

/// The form as posted. Everything is optional so that missing fields become field errors
/// instead of a rejected body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactSubmission {
    pub name: Option<FormField<String>>,
    pub phone: Option<FormField<String>>,
    pub email: Option<FormField<String>>,
    pub inquiry_type: Option<FormField<String>>,
    pub message: Option<FormField<String>>,
    pub privacy_agreed: Option<FormField<bool>>,
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInquiry {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub inquiry_type: InquiryType,
    pub message: String,
}

/// Keeps the first violation reported for a field.
pub(crate) fn reject(errors: &mut FieldErrors, field: &'static str, message: &str) {
    errors.entry(field).or_insert_with(|| message.to_owned());
}

/// The posted value, or `None` when absent or of the wrong type. The latter is reported.
fn posted<'a, T>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &'a Option<FormField<T>>,
) -> Option<&'a T> {
    match value {
        None => None,
        Some(FormField::Value(value)) => Some(value),
        Some(FormField::Malformed(_)) => {
            reject(errors, field, MALFORMED);
            None
        }
    }
}

pub(crate) fn check_length(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
    too_short: &str,
    too_long: &str,
) {
    let length = value.trim().chars().count();

    if length < min {
        reject(errors, field, too_short);
    } else if length > max {
        reject(errors, field, too_long);
    }
}

pub fn validate(submission: &ContactSubmission) -> Result<NewInquiry, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = posted(&mut errors, "name", &submission.name).map_or("", String::as_str);
    check_length(
        &mut errors,
        "name",
        name,
        2,
        50,
        "이름은 2자 이상 입력해주세요",
        "이름은 50자 이하로 입력해주세요",
    );

    let phone = posted(&mut errors, "phone", &submission.phone)
        .map_or("", String::as_str)
        .trim();
    if !PHONE.is_match(phone) {
        reject(
            &mut errors,
            "phone",
            "올바른 연락처 형식이 아닙니다 (예: 010-1234-5678)",
        );
    }

    let email = posted(&mut errors, "email", &submission.email)
        .map(|email| email.trim())
        .filter(|email| !email.is_empty());
    if let Some(email) = email {
        if !EMAIL.is_match(email) {
            reject(&mut errors, "email", "올바른 이메일 형식이 아닙니다");
        }
    }

    let inquiry_type = match posted(&mut errors, "inquiryType", &submission.inquiry_type)
        .map(|kind| kind.trim())
        .filter(|kind| !kind.is_empty())
    {
        None => InquiryType::default(),
        Some(label) => label.parse().unwrap_or_else(|_| {
            reject(&mut errors, "inquiryType", "문의 유형을 선택해주세요");
            InquiryType::default()
        }),
    };

    let message = posted(&mut errors, "message", &submission.message).map_or("", String::as_str);
    check_length(
        &mut errors,
        "message",
        message,
        10,
        1000,
        "문의 내용을 10자 이상 입력해주세요",
        "문의 내용은 1000자 이하로 입력해주세요",
    );

    if posted(&mut errors, "privacyAgreed", &submission.privacy_agreed) != Some(&true) {
        reject(
            &mut errors,
            "privacyAgreed",
            "개인정보 수집 및 이용에 동의해주세요",
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewInquiry {
        name: name.to_owned(),
        phone: phone.to_owned(),
        email: email.map(str::to_owned),
        inquiry_type,
        message: message.to_owned(),
    })
}

pub fn sanitize(inquiry: NewInquiry) -> NewInquiry {
    NewInquiry {
        name: inquiry.name.trim().to_owned(),
        phone: inquiry.phone.chars().filter(char::is_ascii_digit).collect(),
        email: inquiry
            .email
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty()),
        inquiry_type: inquiry.inquiry_type,
        message: inquiry.message.trim().to_owned(),
    }
}

/// A family review as posted on the public site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewSubmission {
    pub author_name: Option<FormField<String>>,
    pub resident_name: Option<FormField<String>>,
    pub rating: Option<FormField<i64>>,
    pub content: Option<FormField<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub author_name: String,
    pub resident_name: Option<String>,
    pub rating: i64,
    pub content: String,
}

/// Validates and trims a posted review in one pass.
pub fn validate_review(submission: &ReviewSubmission) -> Result<NewReview, FieldErrors> {
    let mut errors = FieldErrors::new();

    let author_name = posted(&mut errors, "authorName", &submission.author_name)
        .map_or("", String::as_str)
        .trim();
    check_length(
        &mut errors,
        "authorName",
        author_name,
        1,
        100,
        "작성자 이름을 입력해주세요",
        "작성자 이름은 100자 이하로 입력해주세요",
    );

    let resident_name = posted(&mut errors, "residentName", &submission.resident_name)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty());
    if resident_name.is_some_and(|name| name.chars().count() > 100) {
        reject(
            &mut errors,
            "residentName",
            "어르신 성함은 100자 이하로 입력해주세요",
        );
    }

    let rating = posted(&mut errors, "rating", &submission.rating).copied();
    if !rating.is_some_and(|rating| (1..=5).contains(&rating)) {
        reject(&mut errors, "rating", "평점은 1에서 5 사이여야 합니다");
    }

    let content = posted(&mut errors, "content", &submission.content)
        .map_or("", String::as_str)
        .trim();
    check_length(
        &mut errors,
        "content",
        content,
        1,
        2000,
        "후기 내용을 입력해주세요",
        "후기 내용은 2000자 이하로 입력해주세요",
    );

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewReview {
        author_name: author_name.to_owned(),
        resident_name: resident_name.map(str::to_owned),
        rating: rating.unwrap_or_default(),
        content: content.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: Some("김영희".to_owned().into()),
            phone: Some("010-1234-5678".to_owned().into()),
            email: Some("".to_owned().into()),
            inquiry_type: Some("기타".to_owned().into()),
            message: Some("상담 부탁드립니다 감사합니다".to_owned().into()),
            privacy_agreed: Some(true.into()),
        }
    }

    #[test]
    fn accepts_valid_submission_with_blank_email() {
        let inquiry = validate(&submission()).unwrap();
        assert_eq!(inquiry.email, None);
        assert_eq!(inquiry.inquiry_type, InquiryType::Other);
    }

    #[test]
    fn short_message_is_rejected_regardless_of_other_fields() {
        for other_fields_valid in [true, false] {
            let mut raw = if other_fields_valid {
                submission()
            } else {
                ContactSubmission::default()
            };
            raw.message = Some("짧아요".to_owned().into());

            let errors = validate(&raw).unwrap_err();
            assert_eq!(errors["message"], "문의 내용을 10자 이상 입력해주세요");
        }
    }

    #[test]
    fn collects_one_error_per_field() {
        let errors = validate(&ContactSubmission {
            name: Some(" 김 ".to_owned().into()),
            phone: Some("02-123-4567".to_owned().into()),
            email: Some("not-an-email".to_owned().into()),
            inquiry_type: Some("견적".to_owned().into()),
            message: Some("가".repeat(1001).into()),
            privacy_agreed: Some(false.into()),
        })
        .unwrap_err();

        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["email", "inquiryType", "message", "name", "phone", "privacyAgreed"]
        );
        assert_eq!(errors["message"], "문의 내용은 1000자 이하로 입력해주세요");
    }

    #[test]
    fn wrongly_typed_values_are_field_errors() {
        let raw: ContactSubmission = serde_json::from_str(
            r#"{"name": 42, "phone": "010-1234-5678", "message": "상담 부탁드립니다 감사합니다", "privacyAgreed": "true"}"#,
        )
        .unwrap();

        let errors = validate(&raw).unwrap_err();
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["name", "privacyAgreed"]
        );
        assert_eq!(errors["name"], MALFORMED);
        assert_eq!(errors["privacyAgreed"], MALFORMED);
    }

    #[test]
    fn missing_type_defaults_to_other() {
        let mut raw = submission();
        raw.inquiry_type = Some("  ".to_owned().into());
        assert_eq!(validate(&raw).unwrap().inquiry_type, InquiryType::Other);

        raw.inquiry_type = None;
        assert_eq!(validate(&raw).unwrap().inquiry_type, InquiryType::Other);
    }

    #[test]
    fn phone_accepts_ten_or_eleven_digits() {
        for phone in ["010-1234-5678", "01012345678", "011-123-4567", "0161234567"] {
            assert!(PHONE.is_match(phone), "{phone}");
        }
        for phone in ["02-1234-5678", "010-12-5678", "010-12345-678", "1012345678"] {
            assert!(!PHONE.is_match(phone), "{phone}");
        }
    }

    #[test]
    fn sanitize_normalizes_and_is_idempotent() {
        let mut raw = submission();
        raw.name = Some("  김영희 ".to_owned().into());
        raw.email = Some(" Family@Example.COM ".to_owned().into());

        let once = sanitize(validate(&raw).unwrap());
        assert_eq!(once.phone, "01012345678");
        assert_eq!(once.name, "김영희");
        assert_eq!(once.email.as_deref(), Some("family@example.com"));
        assert_eq!(sanitize(once.clone()), once);
    }

    #[test]
    fn review_needs_author_rating_and_content() {
        let errors = validate_review(&ReviewSubmission {
            author_name: Some("  ".to_owned().into()),
            resident_name: None,
            rating: Some(FormField::Value(6)),
            content: None,
        })
        .unwrap_err();

        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec!["authorName", "content", "rating"]
        );
    }

    #[test]
    fn review_is_trimmed() {
        let review = validate_review(&ReviewSubmission {
            author_name: Some(" 이철수 ".to_owned().into()),
            resident_name: Some(" ".to_owned().into()),
            rating: Some(FormField::Value(5)),
            content: Some(" 어머니가 편안하게 지내십니다 ".to_owned().into()),
        })
        .unwrap();

        assert_eq!(review.author_name, "이철수");
        assert_eq!(review.resident_name, None);
        assert_eq!(review.content, "어머니가 편안하게 지내십니다");
    }
}
