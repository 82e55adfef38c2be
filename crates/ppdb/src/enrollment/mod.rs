//! Enrollment application lifecycle: intake by applicants, review by admins.
//!
//! An applicant owns at most one application. Content stays editable by its owner
//! while the application is pending; admins may set any status at any time.

pub mod access;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use access::{permits, Capability};
pub use domain::{
    Application, ApplicationFields, ApplicationForm, ApplicationId, ApplicationStatus,
    NewApplication, Requester, Role, StatusCounts, UserId,
};
pub use repository::{ApplicationRepository, Page, PageRequest, RepositoryError};
pub use router::{application_router, USER_ID_HEADER, USER_ROLE_HEADER};
pub use service::{Clock, Dashboard, EnrollmentError, EnrollmentService, ListQuery, SystemClock};
pub use sqlite::SqliteApplicationRepository;
pub use validation::{validate_form, ValidationErrors};
pub use views::{ApplicationSummary, ApplicationView, DashboardView};
