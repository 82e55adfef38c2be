use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{ApplicationFields, ApplicationForm};

const NAME_MAX_CHARS: usize = 255;
const CONTACT_MAX_CHARS: usize = 20;

/// Every field that failed validation, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "invalid application form ({joined})")
    }
}

impl std::error::Error for ValidationErrors {}

/// Check a submitted form against the enrollment rules, relative to `today`.
pub fn validate_form(
    form: &ApplicationForm,
    today: NaiveDate,
) -> Result<ApplicationFields, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let student_name = required_text(
        &mut errors,
        "student_name",
        &form.student_name,
        Some(NAME_MAX_CHARS),
    );
    let full_address = required_text(&mut errors, "full_address", &form.full_address, None);
    let previous_school = required_text(
        &mut errors,
        "previous_school",
        &form.previous_school,
        Some(NAME_MAX_CHARS),
    );
    let parent_name = required_text(
        &mut errors,
        "parent_name",
        &form.parent_name,
        Some(NAME_MAX_CHARS),
    );
    let parent_contact = required_text(
        &mut errors,
        "parent_contact",
        &form.parent_contact,
        Some(CONTACT_MAX_CHARS),
    );
    let birth_date = birth_date(&mut errors, &form.birth_date, today);

    let (
        Some(student_name),
        Some(birth_date),
        Some(full_address),
        Some(previous_school),
        Some(parent_name),
        Some(parent_contact),
    ) = (
        student_name,
        birth_date,
        full_address,
        previous_school,
        parent_name,
        parent_contact,
    )
    else {
        return Err(errors);
    };

    Ok(ApplicationFields {
        student_name,
        birth_date,
        full_address,
        previous_school,
        parent_name,
        parent_contact,
    })
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    raw: &str,
    max_chars: Option<usize>,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(field, "is required");
        return None;
    }

    if let Some(max) = max_chars {
        if value.chars().count() > max {
            errors.push(field, format!("must be at most {max} characters"));
            return None;
        }
    }

    Some(value.to_string())
}

fn birth_date(errors: &mut ValidationErrors, raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push("birth_date", "is required");
        return None;
    }

    let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => {
            errors.push("birth_date", "must be a valid date (YYYY-MM-DD)");
            return None;
        }
    };

    if date >= today {
        errors.push("birth_date", "must be before today");
        return None;
    }

    Some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn form() -> ApplicationForm {
        ApplicationForm {
            student_name: "  John Doe ".to_string(),
            birth_date: "2010-01-01".to_string(),
            full_address: "123 Main Street, Jakarta".to_string(),
            previous_school: "SD Negeri 1".to_string(),
            parent_name: "Jane Doe".to_string(),
            parent_contact: "081234567890".to_string(),
        }
    }

    #[test]
    fn accepts_complete_form_and_trims_values() {
        let fields = validate_form(&form(), today()).expect("form is valid");
        assert_eq!(fields.student_name, "John Doe");
        assert_eq!(
            fields.birth_date,
            NaiveDate::from_ymd_opt(2010, 1, 1).expect("valid")
        );
    }

    #[test]
    fn reports_every_missing_field() {
        let errors = validate_form(&ApplicationForm::default(), today()).expect_err("empty form");
        for field in [
            "student_name",
            "birth_date",
            "full_address",
            "previous_school",
            "parent_name",
            "parent_contact",
        ] {
            assert_eq!(errors.get(field), Some("is required"), "{field}");
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut form = form();
        form.parent_name = "   ".to_string();
        let errors = validate_form(&form, today()).expect_err("blank parent");
        assert_eq!(errors.get("parent_name"), Some("is required"));
        assert_eq!(errors.fields().count(), 1);
    }

    #[test]
    fn birth_date_must_be_strictly_in_the_past() {
        let mut form = form();
        form.birth_date = today().format("%Y-%m-%d").to_string();
        let errors = validate_form(&form, today()).expect_err("today is not before today");
        assert_eq!(errors.get("birth_date"), Some("must be before today"));

        form.birth_date = "2025-05-31".to_string();
        assert!(validate_form(&form, today()).is_ok());
    }

    #[test]
    fn birth_date_must_be_a_calendar_date() {
        let mut form = form();
        form.birth_date = "2010-02-30".to_string();
        let errors = validate_form(&form, today()).expect_err("invalid day");
        assert!(errors
            .get("birth_date")
            .unwrap_or_default()
            .contains("valid date"));
    }

    #[test]
    fn enforces_length_limits() {
        let mut form = form();
        form.parent_contact = "0".repeat(21);
        form.student_name = "x".repeat(256);
        form.full_address = "y".repeat(2_000);
        let errors = validate_form(&form, today()).expect_err("too long");
        assert!(errors.get("parent_contact").is_some());
        assert!(errors.get("student_name").is_some());
        assert!(errors.get("full_address").is_none());
    }
}
