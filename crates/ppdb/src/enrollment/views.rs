use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{Application, ApplicationId, ApplicationStatus, StatusCounts, UserId};
use super::repository::Page;
use super::service::Dashboard;

/// Full application payload with derived status presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub student_name: String,
    pub birth_date: NaiveDate,
    pub full_address: String,
    pub previous_school: String,
    pub parent_name: String,
    pub parent_contact: String,
    pub status: ApplicationStatus,
    pub status_display: &'static str,
    pub status_badge_color: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationView {
    fn from(application: Application) -> Self {
        let Application {
            id,
            user_id,
            fields,
            status,
            created_at,
            updated_at,
        } = application;

        Self {
            id,
            user_id,
            student_name: fields.student_name,
            birth_date: fields.birth_date,
            full_address: fields.full_address,
            previous_school: fields.previous_school,
            parent_name: fields.parent_name,
            parent_contact: fields.parent_contact,
            status,
            status_display: status.label(),
            status_badge_color: status.badge_color(),
            created_at,
            updated_at,
        }
    }
}

/// Compact card shown on the applicant dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub student_name: String,
    pub status: ApplicationStatus,
    pub status_display: &'static str,
    pub status_badge_color: &'static str,
    pub created_at: DateTime<Utc>,
}

impl From<Application> for ApplicationSummary {
    fn from(application: Application) -> Self {
        Self {
            id: application.id,
            student_name: application.fields.student_name,
            status: application.status,
            status_display: application.status.label(),
            status_badge_color: application.status.badge_color(),
            created_at: application.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DashboardView {
    Admin { stats: StatusCounts },
    Applicant { application: Option<ApplicationSummary> },
}

impl From<Dashboard> for DashboardView {
    fn from(dashboard: Dashboard) -> Self {
        match dashboard {
            Dashboard::Admin(stats) => DashboardView::Admin { stats },
            Dashboard::Applicant(application) => DashboardView::Applicant {
                application: application.map(ApplicationSummary::from),
            },
        }
    }
}

pub fn page_view(page: Page<Application>) -> Page<ApplicationView> {
    page.map(ApplicationView::from)
}
