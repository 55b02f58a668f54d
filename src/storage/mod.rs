//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! intake pipeline
//!     → find_form_by_public_id (read FormPolicy)
//!     → insert_submission (one atomic write per submission)
//!
//! admin API
//!     → list_forms / upsert_form / update_form / delete_form
//!     → list_submissions (paged) / export_submissions → export.rs (CSV)
//! ```
//!
//! # Design Decisions
//! - Repository is a trait so intake never depends on a concrete backend
//! - Submissions are immutable once written
//! - Spam is stored but excluded from default listings and counts

pub mod export;
pub mod memory;
pub mod types;

pub use export::{export_filename, submissions_csv};
pub use memory::MemoryRepository;
pub use types::{
    FieldValue, Fields, FormPolicy, NewSubmission, StorageError, SubmissionPage,
    SubmissionQuery, SubmissionRecord,
};

use crate::config::FormConfig;

/// Persistence collaborator for forms and submissions.
pub trait Repository: Send + Sync {
    /// Look up a form by its public routing token.
    fn find_form_by_public_id(&self, public_id: &str) -> Result<Option<FormPolicy>, StorageError>;

    /// Persist a submission and return its id.
    fn insert_submission(&self, submission: NewSubmission) -> Result<u64, StorageError>;

    /// Create a form, or update the mutable settings of the form with the same public id.
    fn upsert_form(&self, form: &FormConfig) -> Result<FormPolicy, StorageError>;

    /// Look up a form by its numeric id.
    fn find_form(&self, form_id: u64) -> Result<Option<FormPolicy>, StorageError>;

    /// Replace the editable settings of an existing form. The id, public id
    /// and creation time never change.
    fn update_form(&self, form_id: u64, form: &FormConfig) -> Result<FormPolicy, StorageError>;

    /// Remove a form, its public route and all of its submissions.
    fn delete_form(&self, form_id: u64) -> Result<(), StorageError>;

    /// All forms, newest first.
    fn list_forms(&self) -> Result<Vec<FormPolicy>, StorageError>;

    /// Page through one form's submissions, newest first.
    fn list_submissions(
        &self,
        form_id: u64,
        query: &SubmissionQuery,
    ) -> Result<SubmissionPage, StorageError>;

    /// Every non-spam submission of a form, newest first.
    fn export_submissions(&self, form_id: u64) -> Result<Vec<SubmissionRecord>, StorageError>;

    /// Number of non-spam submissions for a form.
    fn count_submissions(&self, form_id: u64) -> Result<usize, StorageError>;
}
