//! Submission intake pipeline.
//!
//! # Data Flow
//! ```text
//! POST /f/{public_id}
//!     → ResolveForm     (404, no CORS: policy unknown)
//!     → CORS headers    (security::cors, attached from here on)
//!     → CheckActive     (403)
//!     → CheckRateLimit  (429)
//!     → ParsePayload    (400, http::payload)
//!     → Classify        (security::spam, never fails)
//!     → EmptySubmission (400 unless flagged as spam)
//!     → Persist         (one atomic insert; 500 on storage failure)
//!     → NotifyAsync     (detached, best-effort)
//!     → Respond         (http::response::negotiate)
//! ```
//!
//! # Design Decisions
//! - First failing step short-circuits into a JSON error reply
//! - Spam is persisted but never triggers a notification
//! - Collaborators (repository, limiter, notifier) are injected

pub mod error;

pub use error::IntakeError;

use axum::http::HeaderMap;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

use crate::http::payload;
use crate::http::response::{negotiate, ResponseDescriptor};
use crate::notifier::{spawn_notification, Notifier};
use crate::observability::metrics;
use crate::security::{classify, resolve_cors_headers, Classified, RateLimiter};
use crate::storage::{FormPolicy, NewSubmission, Repository};

/// Everything the pipeline needs from one public submission request.
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub public_id: String,
    pub origin: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub client_address: String,
    pub body: Bytes,
    pub received_at: Instant,
}

/// A persisted submission, as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub submission_id: u64,
    pub is_spam: bool,
}

/// The intake orchestrator.
pub struct IntakeService {
    repository: Arc<dyn Repository>,
    limiter: Arc<RateLimiter>,
    notifier: Arc<dyn Notifier>,
}

impl IntakeService {
    pub fn new(
        repository: Arc<dyn Repository>,
        limiter: Arc<RateLimiter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            limiter,
            notifier,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Answer a CORS pre-flight for a form.
    pub fn preflight(&self, public_id: &str, origin: Option<&str>) -> ResponseDescriptor {
        match self.resolve_form(public_id) {
            Ok(form) => ResponseDescriptor::empty(resolve_cors_headers(&form.allowed_origins, origin)),
            Err(e) => reject(public_id, e, HeaderMap::new()),
        }
    }

    /// Run one submission through the pipeline and decide the reply.
    pub async fn submit(&self, request: IntakeRequest) -> ResponseDescriptor {
        let form = match self.resolve_form(&request.public_id) {
            Ok(form) => form,
            Err(e) => return reject(&request.public_id, e, HeaderMap::new()),
        };
        let cors = resolve_cors_headers(&form.allowed_origins, request.origin.as_deref());
        let accept = request.accept.clone();

        match self.accept(&form, request).await {
            Ok(accepted) => {
                metrics::record_submission(if accepted.is_spam { "spam" } else { "accepted" });
                negotiate(accept.as_deref(), form.redirect_url.as_deref(), cors)
            }
            Err(e) => reject(&form.public_id, e, cors),
        }
    }

    fn resolve_form(&self, public_id: &str) -> Result<FormPolicy, IntakeError> {
        self.repository
            .find_form_by_public_id(public_id)?
            .ok_or(IntakeError::NotFound)
    }

    async fn accept(&self, form: &FormPolicy, request: IntakeRequest) -> Result<Accepted, IntakeError> {
        if !form.is_active {
            return Err(IntakeError::Forbidden);
        }

        if !self
            .limiter
            .admit(&form.public_id, &request.client_address, request.received_at)
        {
            metrics::record_rate_limited();
            return Err(IntakeError::RateLimited);
        }

        let fields = payload::parse(request.content_type.as_deref(), request.body).await?;
        let Classified { fields, is_spam } = classify(fields);
        if fields.is_empty() && !is_spam {
            return Err(IntakeError::EmptySubmission);
        }

        let notice = if is_spam {
            None
        } else {
            form.notification_target()
                .map(|to| (to.to_string(), fields.clone()))
        };

        let field_count = fields.len();
        let submission_id = self.repository.insert_submission(NewSubmission {
            form_id: form.id,
            fields,
            client_address: request.client_address.clone(),
            is_spam,
        })?;

        tracing::info!(
            form = %form.public_id,
            submission_id,
            client = %request.client_address,
            fields = field_count,
            is_spam,
            "Submission stored"
        );

        if let Some((destination, fields)) = notice {
            spawn_notification(self.notifier.clone(), destination, form.name.clone(), fields);
        }

        Ok(Accepted {
            submission_id,
            is_spam,
        })
    }
}

fn reject(public_id: &str, error: IntakeError, cors: HeaderMap) -> ResponseDescriptor {
    match &error {
        IntakeError::Storage(e) => {
            tracing::error!(form = %public_id, error = %e, "Submission storage failed");
        }
        IntakeError::RateLimited => {
            tracing::warn!(form = %public_id, "Submission rate limited");
        }
        other => {
            tracing::debug!(form = %public_id, reason = %other, "Submission rejected");
        }
    }
    metrics::record_submission(error.outcome());
    ResponseDescriptor::error(error.status(), &error.detail(), cors)
}
