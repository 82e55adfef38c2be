use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationFields, ApplicationId, ApplicationStatus, NewApplication,
    StatusCounts, UserId,
};

/// One page of the admin listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub status: Option<ApplicationStatus>,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// Slice of applications plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let per_page = u64::from(request.per_page.max(1));
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            data,
            page: request.page,
            per_page: request.per_page,
            total,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}

/// Storage abstraction so the lifecycle service can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    /// Must reject a second application for the same user with `Conflict`.
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError>;
    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn fetch_by_user(&self, user_id: UserId) -> Result<Option<Application>, RepositoryError>;
    /// Overwrite content fields only while the row is still pending; a finalized
    /// row yields `Locked`.
    fn update_pending_fields(
        &self,
        id: ApplicationId,
        fields: ApplicationFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError>;
    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError>;
    /// Newest first.
    fn list(&self, request: &PageRequest) -> Result<Page<Application>, RepositoryError>;
    fn status_counts(&self) -> Result<StatusCounts, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record is no longer pending")]
    Locked,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
