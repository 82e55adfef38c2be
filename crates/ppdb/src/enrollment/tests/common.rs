use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::ListingConfig;
use crate::enrollment::domain::{
    Application, ApplicationFields, ApplicationForm, ApplicationId, ApplicationStatus,
    NewApplication, Requester, StatusCounts, UserId,
};
use crate::enrollment::repository::{
    ApplicationRepository, Page, PageRequest, RepositoryError,
};
use crate::enrollment::service::{Clock, EnrollmentService};
use crate::enrollment::{application_router, SqliteApplicationRepository};

pub(super) const APPLICANT: Requester = Requester::applicant(1);
pub(super) const OTHER_APPLICANT: Requester = Requester::applicant(2);
pub(super) const ADMIN: Requester = Requester::admin(900);

pub(super) fn form() -> ApplicationForm {
    ApplicationForm {
        student_name: "John Doe".to_string(),
        birth_date: "2010-01-01".to_string(),
        full_address: "123 Main Street, Jakarta".to_string(),
        previous_school: "SD Negeri 1".to_string(),
        parent_name: "Jane Doe".to_string(),
        parent_contact: "081234567890".to_string(),
    }
}

pub(super) fn edited_form() -> ApplicationForm {
    ApplicationForm {
        student_name: "Johnny Doe".to_string(),
        full_address: "45 Jalan Sudirman, Bandung".to_string(),
        ..form()
    }
}

/// Clock that advances one minute on every reading.
pub(super) struct SteppingClock {
    start: DateTime<Utc>,
    ticks: Mutex<i64>,
}

impl SteppingClock {
    pub(super) fn new() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2025, 6, 1, 8, 0, 0)
                .single()
                .expect("valid start"),
            ticks: Mutex::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut ticks = self.ticks.lock().expect("clock mutex poisoned");
        *ticks += 1;
        self.start + Duration::minutes(*ticks)
    }

    fn today(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

pub(super) fn build_service() -> (
    EnrollmentService<MemoryRepository>,
    Arc<MemoryRepository>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let service = EnrollmentService::with_clock(
        repository.clone(),
        ListingConfig { page_size: 2 },
        Arc::new(SteppingClock::new()),
    );
    (service, repository)
}

pub(super) fn build_sqlite_service() -> EnrollmentService<SqliteApplicationRepository> {
    let repository =
        Arc::new(SqliteApplicationRepository::in_memory().expect("in-memory database opens"));
    EnrollmentService::with_clock(
        repository,
        ListingConfig::default(),
        Arc::new(SteppingClock::new()),
    )
}

pub(super) fn router_with_service<R>(service: EnrollmentService<R>) -> axum::Router
where
    R: ApplicationRepository + 'static,
{
    application_router(Arc::new(service))
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) records: Mutex<Vec<Application>>,
}

impl MemoryRepository {
    pub(super) fn snapshot(&self, id: ApplicationId) -> Option<Application> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .iter()
            .find(|app| app.id == id)
            .cloned()
    }

    pub(super) fn count_for(&self, user_id: UserId) -> usize {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .iter()
            .filter(|app| app.user_id == user_id)
            .count()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|app| app.user_id == application.user_id) {
            return Err(RepositoryError::Conflict);
        }
        let record = Application {
            id: ApplicationId(guard.len() as i64 + 1),
            user_id: application.user_id,
            fields: application.fields,
            status: application.status,
            created_at: application.created_at,
            updated_at: application.created_at,
        };
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.snapshot(id))
    }

    fn fetch_by_user(&self, user_id: UserId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|app| app.user_id == user_id).cloned())
    }

    fn update_pending_fields(
        &self,
        id: ApplicationId,
        fields: ApplicationFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|app| app.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if record.status != ApplicationStatus::Pending {
            return Err(RepositoryError::Locked);
        }
        record.fields = fields;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard
            .iter_mut()
            .find(|app| app.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = status;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    fn list(&self, request: &PageRequest) -> Result<Page<Application>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut matching: Vec<_> = guard
            .iter()
            .filter(|app| request.status.map_or(true, |status| app.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.per_page as usize)
            .collect();
        Ok(Page::new(data, request, total))
    }

    fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut counts = StatusCounts::default();
        for app in guard.iter() {
            counts.record(app.status, 1);
        }
        Ok(counts)
    }
}

/// Store that answers reads from a fixed pending record but refuses the
/// conditional write, as if an admin decided in between.
pub(super) struct DecidedMidEditRepository {
    pub(super) inner: MemoryRepository,
    pub(super) decided_as: ApplicationStatus,
}

impl ApplicationRepository for DecidedMidEditRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        self.inner.insert(application)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn fetch_by_user(&self, user_id: UserId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_by_user(user_id)
    }

    fn update_pending_fields(
        &self,
        id: ApplicationId,
        _fields: ApplicationFields,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        self.inner.update_status(id, self.decided_as, updated_at)?;
        Err(RepositoryError::Locked)
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        self.inner.update_status(id, status, updated_at)
    }

    fn list(&self, request: &PageRequest) -> Result<Page<Application>, RepositoryError> {
        self.inner.list(request)
    }

    fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        self.inner.status_counts()
    }
}

/// Store that accepts the existence check but loses the insert race.
pub(super) struct RacingInsertRepository {
    pub(super) winner: Mutex<Option<Application>>,
}

impl ApplicationRepository for RacingInsertRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let mut winner = self.winner.lock().expect("repository mutex poisoned");
        *winner = Some(Application {
            id: ApplicationId(41),
            user_id: application.user_id,
            fields: application.fields,
            status: ApplicationStatus::Pending,
            created_at: application.created_at,
            updated_at: application.created_at,
        });
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(None)
    }

    fn fetch_by_user(&self, _user_id: UserId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.winner.lock().expect("repository mutex poisoned").clone())
    }

    fn update_pending_fields(
        &self,
        _id: ApplicationId,
        _fields: ApplicationFields,
        _updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn update_status(
        &self,
        _id: ApplicationId,
        _status: ApplicationStatus,
        _updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn list(&self, request: &PageRequest) -> Result<Page<Application>, RepositoryError> {
        Ok(Page::new(Vec::new(), request, 0))
    }

    fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        Ok(StatusCounts::default())
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: NewApplication) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_by_user(&self, _user_id: UserId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_pending_fields(
        &self,
        _id: ApplicationId,
        _fields: ApplicationFields,
        _updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_status(
        &self,
        _id: ApplicationId,
        _status: ApplicationStatus,
        _updated_at: DateTime<Utc>,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _request: &PageRequest) -> Result<Page<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn status_counts(&self) -> Result<StatusCounts, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
