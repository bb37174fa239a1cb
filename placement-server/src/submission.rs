//! Submission request schema and boundary validation
//!
//! `SubmissionRequest` mirrors the JSON posted by the registration form with
//! every field optional, so that absent and blank fields are reported
//! together instead of failing on the first one. `validate` turns it into a
//! normalized, fully typed `ProfileSubmission` before any store access.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use placement_common::Gender;

use crate::error::ApiError;

pub const MISSING_FIELDS_MESSAGE: &str = "All required fields must be provided";
pub const INVALID_FIELDS_MESSAGE: &str = "Invalid field values";

/// Numeric field that may arrive as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(serde_json::Number),
    Text(String),
}

impl NumericField {
    fn is_blank(&self) -> bool {
        matches!(self, NumericField::Text(s) if s.trim().is_empty())
    }

    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            NumericField::Number(n) => n.as_f64()?,
            NumericField::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            NumericField::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            NumericField::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }
}

/// Raw body of `POST /placement/submit`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub full_name: Option<String>,
    pub father_name: Option<String>,
    pub registration_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub alternate_phone: Option<String>,
    pub guardian_phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub branch: Option<String>,
    pub college: Option<String>,
    pub batch: Option<String>,
    pub current_cgpa: Option<NumericField>,
    pub active_backlogs: Option<NumericField>,
    pub national_id: Option<String>,
    pub secondary_percentage: Option<String>,
    pub secondary_institute: Option<String>,
    pub secondary_board: Option<String>,
    pub higher_secondary_percentage: Option<String>,
    pub higher_secondary_institute: Option<String>,
    pub higher_secondary_board: Option<String>,
    pub resume_link: Option<String>,
    pub linkedin_profile: Option<String>,
    pub portfolio_link: Option<String>,
}

/// The three natural identifiers a submission is matched on, normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    pub registration_number: String,
    pub email: String,
    pub national_id: String,
}

/// Validated and normalized submission
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSubmission {
    pub full_name: String,
    pub father_name: String,
    pub registration_number: String,
    pub email: String,
    pub phone: String,
    pub alternate_phone: String,
    pub guardian_phone: Option<String>,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub branch: String,
    pub college: String,
    pub batch: String,
    pub current_cgpa: f64,
    pub active_backlogs: i64,
    pub national_id: String,
    pub secondary_percentage: String,
    pub secondary_institute: String,
    pub secondary_board: String,
    pub higher_secondary_percentage: String,
    pub higher_secondary_institute: String,
    pub higher_secondary_board: String,
    pub resume_link: Option<String>,
    pub linkedin_profile: Option<String>,
    pub portfolio_link: Option<String>,
}

impl ProfileSubmission {
    pub fn identity(&self) -> IdentityKeys {
        IdentityKeys {
            registration_number: self.registration_number.clone(),
            email: self.email.clone(),
            national_id: self.national_id.clone(),
        }
    }
}

pub fn normalize_registration_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_national_id(value: &str) -> bool {
    value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_plausible_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept)
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn optional(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

impl SubmissionRequest {
    /// Check and normalize the request
    ///
    /// Absent or blank required fields fail first, as one aggregate error;
    /// malformed values are then reported together.
    pub fn validate(&self) -> Result<ProfileSubmission, ApiError> {
        let required: [(&str, &Option<String>); 18] = [
            ("fullName", &self.full_name),
            ("fatherName", &self.father_name),
            ("registrationNumber", &self.registration_number),
            ("email", &self.email),
            ("phone", &self.phone),
            ("alternatePhone", &self.alternate_phone),
            ("gender", &self.gender),
            ("dateOfBirth", &self.date_of_birth),
            ("branch", &self.branch),
            ("college", &self.college),
            ("batch", &self.batch),
            ("nationalId", &self.national_id),
            ("secondaryPercentage", &self.secondary_percentage),
            ("secondaryInstitute", &self.secondary_institute),
            ("secondaryBoard", &self.secondary_board),
            ("higherSecondaryPercentage", &self.higher_secondary_percentage),
            ("higherSecondaryInstitute", &self.higher_secondary_institute),
            ("higherSecondaryBoard", &self.higher_secondary_board),
        ];

        let mut missing: Vec<String> = Vec::new();
        for (name, value) in required {
            if present(value).is_none() {
                missing.push(name.to_string());
            }
        }
        match &self.current_cgpa {
            Some(cgpa) if !cgpa.is_blank() => {}
            _ => missing.push("currentCgpa".to_string()),
        }
        if !missing.is_empty() {
            return Err(ApiError::validation(MISSING_FIELDS_MESSAGE, missing));
        }

        let text = |value: &Option<String>| present(value).unwrap_or_default().to_string();
        let mut invalid: Vec<String> = Vec::new();

        let gender = match text(&self.gender).parse::<Gender>() {
            Ok(g) => Some(g),
            Err(e) => {
                invalid.push(e);
                None
            }
        };

        let date_of_birth = parse_date(&text(&self.date_of_birth));
        if date_of_birth.is_none() {
            invalid.push("dateOfBirth must be a date in YYYY-MM-DD format".to_string());
        }

        let current_cgpa = self.current_cgpa.as_ref().and_then(NumericField::as_f64);
        match current_cgpa {
            Some(v) if (0.0..=10.0).contains(&v) => {}
            Some(_) => invalid.push("currentCgpa must be between 0 and 10".to_string()),
            None => invalid.push("currentCgpa must be a number".to_string()),
        }

        let active_backlogs = match &self.active_backlogs {
            None => Some(0),
            Some(field) if field.is_blank() => Some(0),
            Some(field) => field.as_i64(),
        };
        match active_backlogs {
            Some(v) if v >= 0 => {}
            Some(_) => invalid.push("activeBacklogs must not be negative".to_string()),
            None => invalid.push("activeBacklogs must be a whole number".to_string()),
        }

        let national_id = text(&self.national_id);
        if !is_valid_national_id(&national_id) {
            invalid.push("nationalId must be exactly 12 digits".to_string());
        }

        let email = normalize_email(&text(&self.email));
        if !is_plausible_email(&email) {
            invalid.push("email is not a valid address".to_string());
        }

        match (gender, date_of_birth, current_cgpa, active_backlogs) {
            (Some(gender), Some(date_of_birth), Some(current_cgpa), Some(active_backlogs))
                if invalid.is_empty() =>
            {
                Ok(ProfileSubmission {
                    full_name: text(&self.full_name),
                    father_name: text(&self.father_name),
                    registration_number: normalize_registration_number(&text(
                        &self.registration_number,
                    )),
                    email,
                    phone: text(&self.phone),
                    alternate_phone: text(&self.alternate_phone),
                    guardian_phone: optional(&self.guardian_phone),
                    gender,
                    date_of_birth,
                    branch: text(&self.branch),
                    college: text(&self.college),
                    batch: text(&self.batch),
                    current_cgpa,
                    active_backlogs,
                    national_id,
                    secondary_percentage: text(&self.secondary_percentage),
                    secondary_institute: text(&self.secondary_institute),
                    secondary_board: text(&self.secondary_board),
                    higher_secondary_percentage: text(&self.higher_secondary_percentage),
                    higher_secondary_institute: text(&self.higher_secondary_institute),
                    higher_secondary_board: text(&self.higher_secondary_board),
                    resume_link: optional(&self.resume_link),
                    linkedin_profile: optional(&self.linkedin_profile),
                    portfolio_link: optional(&self.portfolio_link),
                })
            }
            _ => Err(ApiError::validation(INVALID_FIELDS_MESSAGE, invalid)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> SubmissionRequest {
        serde_json::from_value(body).unwrap()
    }

    fn valid_body() -> serde_json::Value {
        json!({
            "fullName": "  Asha Kumari ",
            "fatherName": "Ramesh Kumar",
            "registrationNumber": " 21105128007 ",
            "email": " Asha.Kumari@Example.COM ",
            "phone": "9876543210",
            "alternatePhone": "9123456780",
            "gender": "Female",
            "dateOfBirth": "2003-04-15",
            "branch": "EEE",
            "college": "NCE_Chandi",
            "batch": "2021-2025",
            "currentCgpa": "8.42",
            "activeBacklogs": 0,
            "nationalId": "123412341234",
            "secondaryPercentage": "91.2",
            "secondaryInstitute": "DAV Public School",
            "secondaryBoard": "CBSE",
            "higherSecondaryPercentage": "84.0",
            "higherSecondaryInstitute": "Science College",
            "higherSecondaryBoard": "BSEB",
            "linkedinProfile": "   "
        })
    }

    fn expect_validation(err: ApiError) -> (String, Vec<String>) {
        match err {
            ApiError::Validation { message, errors } => (message, errors),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_submission_is_normalized() {
        let submission = request(valid_body()).validate().unwrap();
        assert_eq!(submission.full_name, "Asha Kumari");
        assert_eq!(submission.registration_number, "21105128007");
        assert_eq!(submission.email, "asha.kumari@example.com");
        assert_eq!(submission.gender, Gender::Female);
        assert_eq!(submission.date_of_birth, NaiveDate::from_ymd_opt(2003, 4, 15).unwrap());
        assert!((submission.current_cgpa - 8.42).abs() < f64::EPSILON);
        assert_eq!(submission.active_backlogs, 0);
        assert_eq!(submission.linkedin_profile, None);
        assert_eq!(submission.guardian_phone, None);
    }

    #[test]
    fn test_missing_fields_reported_together() {
        let mut body = valid_body();
        body["email"] = json!("   ");
        body.as_object_mut().unwrap().remove("nationalId");
        body.as_object_mut().unwrap().remove("currentCgpa");

        let (message, errors) = expect_validation(request(body).validate().unwrap_err());
        assert_eq!(message, MISSING_FIELDS_MESSAGE);
        assert_eq!(errors, vec!["email", "nationalId", "currentCgpa"]);
    }

    #[test]
    fn test_missing_check_runs_before_format_checks() {
        let mut body = valid_body();
        body["fullName"] = json!("");
        body["nationalId"] = json!("123");
        let (message, errors) = expect_validation(request(body).validate().unwrap_err());
        assert_eq!(message, MISSING_FIELDS_MESSAGE);
        assert_eq!(errors, vec!["fullName"]);
    }

    #[test]
    fn test_invalid_values_reported_together() {
        let mut body = valid_body();
        body["gender"] = json!("female");
        body["currentCgpa"] = json!(11);
        body["activeBacklogs"] = json!("-1");
        body["nationalId"] = json!("1234 5678 9012");
        body["dateOfBirth"] = json!("15/04/2003");

        let (message, errors) = expect_validation(request(body).validate().unwrap_err());
        assert_eq!(message, INVALID_FIELDS_MESSAGE);
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("currentCgpa")));
        assert!(errors.iter().any(|e| e.contains("nationalId")));
    }

    #[test]
    fn test_cgpa_must_parse() {
        let mut body = valid_body();
        body["currentCgpa"] = json!("eight");
        let (_, errors) = expect_validation(request(body).validate().unwrap_err());
        assert_eq!(errors, vec!["currentCgpa must be a number"]);
    }

    #[test]
    fn test_cgpa_bounds_inclusive() {
        for cgpa in [json!(0), json!(10), json!("10.0")] {
            let mut body = valid_body();
            body["currentCgpa"] = cgpa;
            assert!(request(body).validate().is_ok());
        }
    }

    #[test]
    fn test_backlogs_default_and_numeric_string() {
        let mut body = valid_body();
        body.as_object_mut().unwrap().remove("activeBacklogs");
        assert_eq!(request(body).validate().unwrap().active_backlogs, 0);

        let mut body = valid_body();
        body["activeBacklogs"] = json!("2");
        assert_eq!(request(body).validate().unwrap().active_backlogs, 2);

        let mut body = valid_body();
        body["activeBacklogs"] = json!(1.5);
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_date_of_birth_accepts_timestamp() {
        let mut body = valid_body();
        body["dateOfBirth"] = json!("2003-04-15T00:00:00.000Z");
        let submission = request(body).validate().unwrap();
        assert_eq!(submission.date_of_birth, NaiveDate::from_ymd_opt(2003, 4, 15).unwrap());
    }

    #[test]
    fn test_identity_keys() {
        let keys = request(valid_body()).validate().unwrap().identity();
        assert_eq!(keys.registration_number, "21105128007");
        assert_eq!(keys.email, "asha.kumari@example.com");
        assert_eq!(keys.national_id, "123412341234");
    }
}
