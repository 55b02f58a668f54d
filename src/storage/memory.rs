//! In-memory repository with optional JSON snapshot persistence.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;

use crate::config::FormConfig;
use crate::storage::types::{
    FormPolicy, NewSubmission, StorageError, SubmissionPage, SubmissionQuery, SubmissionRecord,
};
use crate::storage::Repository;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    forms: Vec<FormPolicy>,
    submissions: Vec<SubmissionRecord>,
}

/// A thread-safe repository backed by `DashMap`s.
pub struct MemoryRepository {
    forms: DashMap<u64, FormPolicy>,
    /// public id -> form id
    routes: DashMap<String, u64>,
    /// form id -> submissions in insertion order
    submissions: DashMap<u64, Vec<SubmissionRecord>>,
    next_form_id: AtomicU64,
    next_submission_id: AtomicU64,
    snapshot_path: Option<PathBuf>,
}

impl MemoryRepository {
    /// Create a new empty repository.
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            forms: DashMap::new(),
            routes: DashMap::new(),
            submissions: DashMap::new(),
            next_form_id: AtomicU64::new(1),
            next_submission_id: AtomicU64::new(1),
            snapshot_path,
        }
    }

    /// Load from the snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> Result<Self, StorageError> {
        let repo = Self::new(Some(path.to_path_buf()));
        if !path.exists() {
            return Ok(repo);
        }

        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;

        let mut max_form = 0;
        for form in snapshot.forms {
            max_form = max_form.max(form.id);
            repo.routes.insert(form.public_id.clone(), form.id);
            repo.forms.insert(form.id, form);
        }

        let mut max_submission = 0;
        let count = snapshot.submissions.len();
        for record in snapshot.submissions {
            max_submission = max_submission.max(record.id);
            repo.submissions.entry(record.form_id).or_default().push(record);
        }

        repo.next_form_id.store(max_form + 1, Ordering::SeqCst);
        repo.next_submission_id.store(max_submission + 1, Ordering::SeqCst);

        tracing::info!(forms = repo.forms.len(), submissions = count, path = ?path, "Loaded storage snapshot");
        Ok(repo)
    }

    /// Write the snapshot file, if one is configured.
    pub fn save_to_file(&self) -> Result<(), StorageError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let mut forms: Vec<FormPolicy> = self.forms.iter().map(|r| r.value().clone()).collect();
        forms.sort_by_key(|f| f.id);
        let mut submissions: Vec<SubmissionRecord> = self
            .submissions
            .iter()
            .flat_map(|r| r.value().clone())
            .collect();
        submissions.sort_by_key(|s| s.id);

        // Written beside the target and renamed over it, so a failed write
        // never leaves a truncated snapshot behind.
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        let snapshot = Snapshot { forms, submissions };
        {
            let mut writer = BufWriter::new(&mut staged);
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;

        tracing::info!(
            forms = snapshot.forms.len(),
            submissions = snapshot.submissions.len(),
            path = ?path,
            "Saved storage snapshot"
        );
        Ok(())
    }

    /// Number of registered forms.
    pub fn form_count(&self) -> usize {
        self.forms.len()
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Repository for MemoryRepository {
    fn find_form_by_public_id(&self, public_id: &str) -> Result<Option<FormPolicy>, StorageError> {
        let Some(id) = self.routes.get(public_id).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.forms.get(&id).map(|r| r.value().clone()))
    }

    fn insert_submission(&self, submission: NewSubmission) -> Result<u64, StorageError> {
        // Held until the record is in place so a concurrent delete cannot
        // leave an orphaned submission behind.
        let Some(_form) = self.forms.get(&submission.form_id) else {
            return Err(StorageError::UnknownForm(submission.form_id));
        };

        let id = self.next_submission_id.fetch_add(1, Ordering::SeqCst);
        let record = SubmissionRecord {
            id,
            form_id: submission.form_id,
            fields: submission.fields,
            client_address: submission.client_address,
            is_spam: submission.is_spam,
            created_at: Utc::now(),
        };
        self.submissions.entry(record.form_id).or_default().push(record);
        Ok(id)
    }

    fn upsert_form(&self, form: &FormConfig) -> Result<FormPolicy, StorageError> {
        let existing = self.routes.get(&form.public_id).map(|r| *r.value());

        let policy = match existing.and_then(|id| self.forms.get(&id).map(|r| r.value().clone())) {
            Some(current) => FormPolicy {
                name: form.name.clone(),
                is_active: form.is_active,
                allowed_origins: form.allowed_origins.clone(),
                redirect_url: form.redirect_url.clone(),
                notification_email: form.notification_email.clone(),
                email_notifications: form.email_notifications,
                ..current
            },
            None => FormPolicy {
                id: self.next_form_id.fetch_add(1, Ordering::SeqCst),
                public_id: form.public_id.clone(),
                name: form.name.clone(),
                is_active: form.is_active,
                allowed_origins: form.allowed_origins.clone(),
                redirect_url: form.redirect_url.clone(),
                notification_email: form.notification_email.clone(),
                email_notifications: form.email_notifications,
                created_at: Utc::now(),
            },
        };

        self.forms.insert(policy.id, policy.clone());
        self.routes.insert(policy.public_id.clone(), policy.id);
        Ok(policy)
    }

    fn find_form(&self, form_id: u64) -> Result<Option<FormPolicy>, StorageError> {
        Ok(self.forms.get(&form_id).map(|r| r.value().clone()))
    }

    fn update_form(&self, form_id: u64, form: &FormConfig) -> Result<FormPolicy, StorageError> {
        let mut entry = self
            .forms
            .get_mut(&form_id)
            .ok_or(StorageError::UnknownForm(form_id))?;

        let policy = entry.value_mut();
        policy.name = form.name.clone();
        policy.is_active = form.is_active;
        policy.allowed_origins = form.allowed_origins.clone();
        policy.redirect_url = form.redirect_url.clone();
        policy.notification_email = form.notification_email.clone();
        policy.email_notifications = form.email_notifications;
        Ok(policy.clone())
    }

    fn delete_form(&self, form_id: u64) -> Result<(), StorageError> {
        let (_, form) = self
            .forms
            .remove(&form_id)
            .ok_or(StorageError::UnknownForm(form_id))?;
        self.routes.remove(&form.public_id);
        let removed = self
            .submissions
            .remove(&form_id)
            .map(|(_, records)| records.len())
            .unwrap_or(0);

        tracing::info!(form = %form.public_id, id = form_id, submissions = removed, "Form deleted");
        Ok(())
    }

    fn list_forms(&self) -> Result<Vec<FormPolicy>, StorageError> {
        let mut forms: Vec<FormPolicy> = self.forms.iter().map(|r| r.value().clone()).collect();
        forms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(forms)
    }

    fn list_submissions(
        &self,
        form_id: u64,
        query: &SubmissionQuery,
    ) -> Result<SubmissionPage, StorageError> {
        if !self.forms.contains_key(&form_id) {
            return Err(StorageError::UnknownForm(form_id));
        }
        let query = query.clone().normalized();

        let mut matching: Vec<SubmissionRecord> = self
            .submissions
            .get(&form_id)
            .map(|r| {
                r.value()
                    .iter()
                    .filter(|s| query.include_spam || !s.is_spam)
                    .filter(|s| query.search.as_deref().map_or(true, |needle| s.matches(needle)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matching.len();
        let submissions = matching
            .into_iter()
            .skip(query.page.saturating_sub(1).saturating_mul(query.per_page))
            .take(query.per_page)
            .collect();

        Ok(SubmissionPage {
            submissions,
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    fn export_submissions(&self, form_id: u64) -> Result<Vec<SubmissionRecord>, StorageError> {
        if !self.forms.contains_key(&form_id) {
            return Err(StorageError::UnknownForm(form_id));
        }
        let mut records: Vec<SubmissionRecord> = self
            .submissions
            .get(&form_id)
            .map(|r| r.value().iter().filter(|s| !s.is_spam).cloned().collect())
            .unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    fn count_submissions(&self, form_id: u64) -> Result<usize, StorageError> {
        Ok(self
            .submissions
            .get(&form_id)
            .map(|r| r.value().iter().filter(|s| !s.is_spam).count())
            .unwrap_or(0))
    }
}
