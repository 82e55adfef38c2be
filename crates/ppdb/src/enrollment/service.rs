use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::config::ListingConfig;

use super::access::{permits, Capability};
use super::domain::{
    Application, ApplicationForm, ApplicationId, ApplicationStatus, NewApplication, Requester,
    StatusCounts,
};
use super::repository::{ApplicationRepository, Page, PageRequest, RepositoryError};
use super::validation::{validate_form, ValidationErrors};

/// Time source for timestamps and the "before today" birth date rule.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&Local).date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Admin listing parameters as they arrive from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub status: Option<String>,
}

/// Role-specific dashboard content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dashboard {
    Admin(StatusCounts),
    Applicant(Option<Application>),
}

/// Lifecycle manager for enrollment applications: intake, review, and status changes.
pub struct EnrollmentService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    listing: ListingConfig,
}

impl<R> EnrollmentService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(repository: Arc<R>, listing: ListingConfig) -> Self {
        Self::with_clock(repository, listing, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, listing: ListingConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            listing,
        }
    }

    /// Submit the requester's one and only application.
    pub fn create(
        &self,
        requester: &Requester,
        form: ApplicationForm,
    ) -> Result<Application, EnrollmentError> {
        self.require(requester, Capability::Submit)?;

        if let Some(existing) = self.repository.fetch_by_user(requester.user_id)? {
            warn!(
                user_id = %requester.user_id,
                application_id = %existing.id,
                "duplicate application refused"
            );
            return Err(EnrollmentError::AlreadyExists(existing.id));
        }

        let fields = validate_form(&form, self.clock.today())?;
        let stored = self
            .repository
            .insert(NewApplication {
                user_id: requester.user_id,
                fields,
                status: ApplicationStatus::Pending,
                created_at: self.clock.now(),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => self.duplicate_for(requester),
                other => EnrollmentError::Repository(other),
            })?;

        info!(
            user_id = %stored.user_id,
            application_id = %stored.id,
            "application submitted"
        );
        Ok(stored)
    }

    /// Fetch an application the requester is allowed to see.
    pub fn get(
        &self,
        id: ApplicationId,
        requester: &Requester,
    ) -> Result<Application, EnrollmentError> {
        let application = self.load(id)?;
        self.require(requester, Capability::View(&application))?;
        Ok(application)
    }

    /// Overwrite the six content fields while the application is still pending.
    pub fn edit(
        &self,
        id: ApplicationId,
        requester: &Requester,
        form: ApplicationForm,
    ) -> Result<Application, EnrollmentError> {
        let application = self.load(id)?;
        if application.status.is_final() {
            return Err(EnrollmentError::Locked(application.status));
        }
        self.require(requester, Capability::EditContent(&application))?;

        let fields = validate_form(&form, self.clock.today())?;
        let updated = self
            .repository
            .update_pending_fields(id, fields, self.clock.now())
            .map_err(|err| match err {
                RepositoryError::Locked => self.locked_after_race(id),
                RepositoryError::NotFound => EnrollmentError::NotFound(id),
                other => EnrollmentError::Repository(other),
            })?;

        info!(application_id = %id, user_id = %requester.user_id, "application edited");
        Ok(updated)
    }

    /// Set any of the three statuses. Repeating the current status is allowed.
    pub fn set_status(
        &self,
        id: ApplicationId,
        requester: &Requester,
        new_status: &str,
    ) -> Result<Application, EnrollmentError> {
        self.require(requester, Capability::SetStatus)?;
        let status = parse_status(new_status)?;

        let updated = self
            .repository
            .update_status(id, status, self.clock.now())
            .map_err(|err| match err {
                RepositoryError::NotFound => EnrollmentError::NotFound(id),
                other => EnrollmentError::Repository(other),
            })?;

        info!(
            application_id = %id,
            admin_id = %requester.user_id,
            status = %status,
            "application status updated"
        );
        Ok(updated)
    }

    /// Newest applications first, one page at a time.
    pub fn list(
        &self,
        requester: &Requester,
        query: ListQuery,
    ) -> Result<Page<Application>, EnrollmentError> {
        self.require(requester, Capability::ListAll)?;
        let status = query.status.as_deref().map(parse_status).transpose()?;
        let request = PageRequest {
            page: query.page.unwrap_or(1).max(1),
            per_page: self.listing.page_size,
            status,
        };
        Ok(self.repository.list(&request)?)
    }

    /// The requester's own application, if they have submitted one.
    pub fn my_application(&self, requester: &Requester) -> Result<Application, EnrollmentError> {
        self.require(requester, Capability::ViewOwn)?;
        self.repository
            .fetch_by_user(requester.user_id)?
            .ok_or(EnrollmentError::NoApplicationForUser)
    }

    pub fn dashboard(&self, requester: &Requester) -> Result<Dashboard, EnrollmentError> {
        if permits(requester, Capability::ViewStatistics) {
            return Ok(Dashboard::Admin(self.repository.status_counts()?));
        }
        self.require(requester, Capability::ViewOwn)?;
        Ok(Dashboard::Applicant(
            self.repository.fetch_by_user(requester.user_id)?,
        ))
    }

    fn load(&self, id: ApplicationId) -> Result<Application, EnrollmentError> {
        self.repository
            .fetch(id)?
            .ok_or(EnrollmentError::NotFound(id))
    }

    fn require(
        &self,
        requester: &Requester,
        capability: Capability<'_>,
    ) -> Result<(), EnrollmentError> {
        if permits(requester, capability) {
            Ok(())
        } else {
            warn!(
                user_id = %requester.user_id,
                role = requester.role.as_str(),
                capability = capability.name(),
                "access denied"
            );
            Err(EnrollmentError::Forbidden)
        }
    }

    fn duplicate_for(&self, requester: &Requester) -> EnrollmentError {
        match self.repository.fetch_by_user(requester.user_id) {
            Ok(Some(existing)) => EnrollmentError::AlreadyExists(existing.id),
            Ok(None) => EnrollmentError::Repository(RepositoryError::Conflict),
            Err(err) => EnrollmentError::Repository(err),
        }
    }

    fn locked_after_race(&self, id: ApplicationId) -> EnrollmentError {
        match self.repository.fetch(id) {
            Ok(Some(current)) => EnrollmentError::Locked(current.status),
            Ok(None) => EnrollmentError::NotFound(id),
            Err(err) => EnrollmentError::Repository(err),
        }
    }
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, EnrollmentError> {
    ApplicationStatus::parse(raw).ok_or_else(|| EnrollmentError::InvalidStatus(raw.to_string()))
}

/// Error raised by the enrollment service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("user already has application {0}")]
    AlreadyExists(ApplicationId),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("no application submitted yet")]
    NoApplicationForUser,
    #[error("not permitted")]
    Forbidden,
    #[error("application is already {0} and can no longer be changed")]
    Locked(ApplicationStatus),
    #[error("status must be one of pending, accepted, rejected (got '{0}')")]
    InvalidStatus(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
