use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::validation::validate_form;
use crate::config::FormConfig;
use crate::http::server::AppState;
use crate::storage::{
    export_filename, submissions_csv, FormPolicy, StorageError, SubmissionPage, SubmissionQuery,
};

/// Errors returned by the admin API, rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("Form not found")]
    FormNotFound,

    #[error("No submissions to export")]
    NothingToExport,

    #[error("Invalid form definition")]
    Invalid(Vec<String>),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AdminError::Unauthorized => (StatusCode::UNAUTHORIZED, serde_json::json!(self.to_string())),
            AdminError::FormNotFound | AdminError::Storage(StorageError::UnknownForm(_)) => {
                (StatusCode::NOT_FOUND, serde_json::json!("Form not found"))
            }
            AdminError::NothingToExport => (StatusCode::NOT_FOUND, serde_json::json!(self.to_string())),
            AdminError::Invalid(problems) => (StatusCode::UNPROCESSABLE_ENTITY, serde_json::json!(problems)),
            AdminError::Storage(e) => {
                tracing::error!(error = %e, "Admin storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!("Internal server error"))
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub forms: usize,
    pub tracked_rate_limit_keys: usize,
    pub submissions_per_minute: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormSummary {
    #[serde(flatten)]
    pub form: FormPolicy,
    pub submission_count: usize,
}

/// Body of `POST /admin/forms`. The public id is always generated.
#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    pub name: String,
    #[serde(default)]
    pub allowed_origins: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub email_notifications: Option<bool>,
    #[serde(default)]
    pub notification_email: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CreateFormRequest {
    fn into_form_config(self, public_id: String) -> FormConfig {
        let defaults = FormConfig::default();
        FormConfig {
            public_id,
            name: self.name,
            allowed_origins: self.allowed_origins.unwrap_or(defaults.allowed_origins),
            redirect_url: self.redirect_url,
            email_notifications: self.email_notifications.unwrap_or(defaults.email_notifications),
            notification_email: self.notification_email,
            is_active: self.is_active.unwrap_or(defaults.is_active),
        }
    }
}

/// Body of `PUT /admin/forms/{id}`. Absent fields keep their current value;
/// `redirect_url` and `notification_email` may be cleared with `null`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateFormRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub allowed_origins: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub redirect_url: Option<Option<String>>,
    #[serde(default)]
    pub email_notifications: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub notification_email: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Distinguishes an explicit `null` from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateFormRequest {
    fn apply(self, form: &mut FormConfig) {
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(origins) = self.allowed_origins {
            form.allowed_origins = origins;
        }
        if let Some(redirect_url) = self.redirect_url {
            form.redirect_url = redirect_url;
        }
        if let Some(enabled) = self.email_notifications {
            form.email_notifications = enabled;
        }
        if let Some(email) = self.notification_email {
            form.notification_email = email;
        }
        if let Some(active) = self.is_active {
            form.is_active = active;
        }
    }
}

fn check_form(form: &FormConfig) -> Result<(), AdminError> {
    let mut errors = Vec::new();
    validate_form(&mut errors, "form", form);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AdminError::Invalid(errors.iter().map(ToString::to_string).collect()))
    }
}

fn existing_form(state: &AppState, form_id: u64) -> Result<FormPolicy, AdminError> {
    state
        .repository
        .find_form(form_id)?
        .ok_or(AdminError::FormNotFound)
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<SystemStatus>, AdminError> {
    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        forms: state.repository.list_forms()?.len(),
        tracked_rate_limit_keys: state.limiter.tracked_keys(),
        submissions_per_minute: state.limiter.limit(),
    }))
}

pub async fn list_forms(State(state): State<AppState>) -> Result<Json<Vec<FormSummary>>, AdminError> {
    let forms = state.repository.list_forms()?;
    let mut summaries = Vec::with_capacity(forms.len());
    for form in forms {
        let submission_count = state.repository.count_submissions(form.id)?;
        summaries.push(FormSummary {
            form,
            submission_count,
        });
    }
    Ok(Json(summaries))
}

pub async fn create_form(
    State(state): State<AppState>,
    Json(request): Json<CreateFormRequest>,
) -> Result<(StatusCode, Json<FormPolicy>), AdminError> {
    let form = request.into_form_config(Uuid::new_v4().simple().to_string());
    check_form(&form)?;

    let policy = state.repository.upsert_form(&form)?;
    tracing::info!(form = %policy.public_id, id = policy.id, name = %policy.name, "Form created");
    Ok((StatusCode::CREATED, Json(policy)))
}

pub async fn list_submissions(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
    Query(query): Query<SubmissionQuery>,
) -> Result<Json<SubmissionPage>, AdminError> {
    existing_form(&state, form_id)?;
    let page = state.repository.list_submissions(form_id, &query.normalized())?;
    Ok(Json(page))
}

pub async fn update_form(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
    Json(request): Json<UpdateFormRequest>,
) -> Result<Json<FormSummary>, AdminError> {
    let mut settings = existing_form(&state, form_id)?.settings();
    request.apply(&mut settings);
    check_form(&settings)?;

    let form = state.repository.update_form(form_id, &settings)?;
    let submission_count = state.repository.count_submissions(form_id)?;
    tracing::info!(form = %form.public_id, id = form.id, active = form.is_active, "Form updated");
    Ok(Json(FormSummary {
        form,
        submission_count,
    }))
}

pub async fn delete_form(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
) -> Result<StatusCode, AdminError> {
    state.repository.delete_form(form_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(form_id): Path<u64>,
) -> Result<Response, AdminError> {
    let form = existing_form(&state, form_id)?;
    let records = state.repository.export_submissions(form_id)?;
    if records.is_empty() {
        return Err(AdminError::NothingToExport);
    }
    let body = submissions_csv(&records)?;

    let disposition = format!("attachment; filename=\"{}\"", export_filename(&form));
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    tracing::info!(form = %form.public_id, rows = records.len(), "Submissions exported");
    Ok(response)
}
