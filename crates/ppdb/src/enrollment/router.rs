use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::domain::{ApplicationForm, ApplicationId, Requester, Role, UserId};
use super::repository::{ApplicationRepository, RepositoryError};
use super::service::{EnrollmentError, EnrollmentService, ListQuery};
use super::validation::ValidationErrors;
use super::views::{page_view, ApplicationView, DashboardView};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Router builder exposing the enrollment endpoints.
pub fn application_router<R>(service: Arc<EnrollmentService<R>>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route(
            "/applications",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route(
            "/applications/:application_id",
            get(show_handler::<R>).put(edit_handler::<R>),
        )
        .route(
            "/admin/applications/:application_id",
            put(status_handler::<R>),
        )
        .route("/my-application", get(my_application_handler::<R>))
        .route("/dashboard", get(dashboard_handler::<R>))
        .with_state(service)
}

fn rejection(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

/// Identity headers are set by the authenticating gateway in front of this service.
#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        requester_from_headers(&parts.headers).ok_or_else(|| {
            rejection(
                StatusCode::UNAUTHORIZED,
                "missing or invalid requester identity",
            )
        })
    }
}

fn requester_from_headers(headers: &HeaderMap) -> Option<Requester> {
    let user_id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()?;
    let role = Role::parse(headers.get(USER_ROLE_HEADER)?.to_str().ok()?)?;
    Some(Requester {
        user_id: UserId(user_id),
        role,
    })
}

/// `:application_id` segment; anything but an integer is rejected as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ApplicationPath(pub(crate) ApplicationId);

#[async_trait]
impl<S> FromRequestParts<S> for ApplicationPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|err| rejection(err.status(), err.body_text()))?;
        raw.parse::<i64>()
            .map(|id| ApplicationPath(ApplicationId(id)))
            .map_err(|_| {
                rejection(
                    StatusCode::BAD_REQUEST,
                    format!("application id must be an integer, got '{raw}'"),
                )
            })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListParams {
    pub(crate) page: Option<u32>,
    pub(crate) status: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ListParams
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<ListParams>::from_request_parts(parts, state)
            .await
            .map(|Query(params)| params)
            .map_err(|err| rejection(err.status(), err.body_text()))
    }
}

/// Submission body. Missing or null fields come through empty and are
/// reported by form validation. Non-string values are field errors here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormBody(pub(crate) ApplicationForm);

#[async_trait]
impl<S> FromRequest<S> for FormBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let object = json_object(req, state).await?;
        form_from_object(&object)
            .map(FormBody)
            .map_err(|errors| EnrollmentError::Validation(errors).into_response())
    }
}

/// Admin decision body. A non-string `status` is passed on verbatim so the
/// service reports it as an unknown status after the role check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StatusUpdate {
    pub(crate) status: String,
}

#[async_trait]
impl<S> FromRequest<S> for StatusUpdate
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let object = json_object(req, state).await?;
        let status = match object.get("status") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(status)) => status.clone(),
            Some(other) => other.to_string(),
        };
        Ok(StatusUpdate { status })
    }
}

async fn json_object<S>(req: Request, state: &S) -> Result<Map<String, Value>, Response>
where
    S: Send + Sync,
{
    let Json(body) = Json::<Value>::from_request(req, state)
        .await
        .map_err(|err| rejection(err.status(), err.body_text()))?;
    match body {
        Value::Object(object) => Ok(object),
        _ => Err(rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            "request body must be a JSON object",
        )),
    }
}

pub(crate) fn form_from_object(
    object: &Map<String, Value>,
) -> Result<ApplicationForm, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut text = |field: &'static str| match object.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(value)) => value.clone(),
        Some(_) => {
            errors.push(field, "must be a string");
            String::new()
        }
    };
    let form = ApplicationForm {
        student_name: text("student_name"),
        birth_date: text("birth_date"),
        full_address: text("full_address"),
        previous_school: text("previous_school"),
        parent_name: text("parent_name"),
        parent_contact: text("parent_contact"),
    };
    if errors.is_empty() {
        Ok(form)
    } else {
        Err(errors)
    }
}

/// Runs a store-backed service call on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, EnrollmentError>
where
    F: FnOnce() -> Result<T, EnrollmentError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.unwrap_or_else(|err| {
        Err(EnrollmentError::Repository(RepositoryError::Unavailable(
            format!("storage task failed: {err}"),
        )))
    })
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
    FormBody(form): FormBody,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match blocking(move || service.create(&requester, form)).await {
        Ok(application) => (
            StatusCode::CREATED,
            Json(ApplicationView::from(application)),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn show_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
    ApplicationPath(id): ApplicationPath,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match blocking(move || service.get(id, &requester)).await {
        Ok(application) => Json(ApplicationView::from(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn edit_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
    ApplicationPath(id): ApplicationPath,
    FormBody(form): FormBody,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match blocking(move || service.edit(id, &requester, form)).await {
        Ok(application) => Json(ApplicationView::from(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
    ApplicationPath(id): ApplicationPath,
    update: StatusUpdate,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match blocking(move || service.set_status(id, &requester, &update.status)).await {
        Ok(application) => Json(ApplicationView::from(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
    params: ListParams,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let query = ListQuery {
        page: params.page,
        status: params.status,
    };
    match blocking(move || service.list(&requester, query)).await {
        Ok(page) => Json(page_view(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn my_application_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match blocking(move || service.my_application(&requester)).await {
        Ok(application) => Json(ApplicationView::from(application)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn dashboard_handler<R>(
    State(service): State<Arc<EnrollmentService<R>>>,
    requester: Requester,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match blocking(move || service.dashboard(&requester)).await {
        Ok(dashboard) => Json(DashboardView::from(dashboard)).into_response(),
        Err(err) => err.into_response(),
    }
}

impl EnrollmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EnrollmentError::Validation(_) | EnrollmentError::InvalidStatus(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EnrollmentError::AlreadyExists(_)
            | EnrollmentError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            EnrollmentError::NotFound(_)
            | EnrollmentError::NoApplicationForUser
            | EnrollmentError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            EnrollmentError::Forbidden => StatusCode::FORBIDDEN,
            EnrollmentError::Locked(_) | EnrollmentError::Repository(RepositoryError::Locked) => {
                StatusCode::LOCKED
            }
            EnrollmentError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for EnrollmentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = match &self {
            EnrollmentError::Validation(errors) => json!({
                "error": "the submitted form is invalid",
                "fields": errors,
            }),
            EnrollmentError::AlreadyExists(existing) => json!({
                "error": self.to_string(),
                "application_id": existing,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(payload)).into_response()
    }
}
