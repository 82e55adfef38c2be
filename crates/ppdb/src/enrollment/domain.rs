use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned identifier for an enrollment application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an authenticated user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account role carried by every requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Applicant,
    Admin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "applicant" => Some(Role::Applicant),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated identity on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: UserId,
    pub role: Role,
}

impl Requester {
    pub const fn applicant(user_id: i64) -> Self {
        Self {
            user_id: UserId(user_id),
            role: Role::Applicant,
        }
    }

    pub const fn admin(user_id: i64) -> Self {
        Self {
            user_id: UserId(user_id),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_applicant(&self) -> bool {
        self.role == Role::Applicant
    }
}

/// Review state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Presentation attributes derived from a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPresentation {
    pub status: ApplicationStatus,
    pub code: &'static str,
    pub label: &'static str,
    pub badge_color: &'static str,
}

static STATUS_TABLE: [StatusPresentation; 3] = [
    StatusPresentation {
        status: ApplicationStatus::Pending,
        code: "pending",
        label: "awaiting verification",
        badge_color: "bg-yellow-100 text-yellow-800",
    },
    StatusPresentation {
        status: ApplicationStatus::Accepted,
        code: "accepted",
        label: "accepted",
        badge_color: "bg-green-100 text-green-800",
    },
    StatusPresentation {
        status: ApplicationStatus::Rejected,
        code: "rejected",
        label: "rejected",
        badge_color: "bg-red-100 text-red-800",
    },
];

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    fn presentation(self) -> &'static StatusPresentation {
        match self {
            ApplicationStatus::Pending => &STATUS_TABLE[0],
            ApplicationStatus::Accepted => &STATUS_TABLE[1],
            ApplicationStatus::Rejected => &STATUS_TABLE[2],
        }
    }

    pub fn as_str(self) -> &'static str {
        self.presentation().code
    }

    pub fn label(self) -> &'static str {
        self.presentation().label
    }

    pub fn badge_color(self) -> &'static str {
        self.presentation().badge_color
    }

    /// Finalized applications can no longer be edited by their owner.
    pub const fn is_final(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        STATUS_TABLE
            .iter()
            .find(|entry| entry.code == raw)
            .map(|entry| entry.status)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw form content exactly as the applicant submitted it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub student_name: String,
    pub birth_date: String,
    pub full_address: String,
    pub previous_school: String,
    pub parent_name: String,
    pub parent_contact: String,
}

/// Form content after validation; only this type reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationFields {
    pub student_name: String,
    pub birth_date: NaiveDate,
    pub full_address: String,
    pub previous_school: String,
    pub parent_name: String,
    pub parent_contact: String,
}

/// Insert payload handed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub user_id: UserId,
    pub fields: ApplicationFields,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

/// Persisted enrollment application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    #[serde(flatten)]
    pub fields: ApplicationFields,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Per-status totals for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub accepted: u64,
    pub rejected: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: ApplicationStatus, count: u64) {
        match status {
            ApplicationStatus::Pending => self.pending += count,
            ApplicationStatus::Accepted => self.accepted += count,
            ApplicationStatus::Rejected => self.rejected += count,
        }
        self.total += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_covers_every_status() {
        for status in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::Pending.label(), "awaiting verification");
        assert_eq!(ApplicationStatus::Accepted.label(), "accepted");
        assert_eq!(ApplicationStatus::Rejected.label(), "rejected");
        assert_eq!(
            ApplicationStatus::Rejected.badge_color(),
            "bg-red-100 text-red-800"
        );
    }

    #[test]
    fn unknown_status_codes_do_not_parse() {
        assert_eq!(ApplicationStatus::parse("approved"), None);
        assert_eq!(ApplicationStatus::parse("PENDING"), None);
        assert_eq!(ApplicationStatus::parse(""), None);
    }

    #[test]
    fn only_pending_is_editable() {
        assert!(!ApplicationStatus::Pending.is_final());
        assert!(ApplicationStatus::Accepted.is_final());
        assert!(ApplicationStatus::Rejected.is_final());
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("applicant"), Some(Role::Applicant));
        assert_eq!(Role::parse("teacher"), None);
    }

    #[test]
    fn status_counts_accumulate_total() {
        let mut counts = StatusCounts::default();
        counts.record(ApplicationStatus::Pending, 3);
        counts.record(ApplicationStatus::Rejected, 1);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.accepted, 0);
    }
}
