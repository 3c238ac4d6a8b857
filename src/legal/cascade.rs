//! Multi-entity operations.
//!
//! Creating a case writes a case and its chat. Uploading writes a blob, a
//! document and a counter per file. Deleting a case removes its documents
//! and chat too. Each of these runs under a [`CascadeJournal`]: every
//! completed step is recorded, and when a later step fails the recorded
//! steps are undone in reverse order before the error is returned.
//!
//! Blobs orphaned by a delete are removed only after the record deletes have
//! committed, and their removal is best-effort.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use tokio::sync::Mutex;

use crate::blob::BlobStore;
use crate::error::ServiceError;
use crate::legal::documents::NewDocument;
use crate::legal::{
    Case, Chat, Document, Repositories, batch_upload_key, single_upload_key,
};

/// Tracing target journal events are emitted under.
pub const JOURNAL_TARGET: &str = "casedesk::journal";

/// One completed step of a multi-entity operation.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    CaseCreated { case_id: String },
    ChatCreated { case_id: String },
    BlobWritten { key: String },
    DocumentCreated { document_id: String },
    FileCounted { case_id: String },
    CaseDeleted(Case),
    ChatDeleted(Chat),
    DocumentDeleted(Document),
}

#[derive(Debug)]
pub struct CascadeJournal {
    operation: &'static str,
    entries: Vec<JournalEntry>,
}

impl CascadeJournal {
    pub fn begin(operation: &'static str) -> Self {
        tracing::debug!(target: JOURNAL_TARGET, "{}: begin", operation);
        Self {
            operation,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: JournalEntry) {
        tracing::debug!(
            target: JOURNAL_TARGET,
            "{}: step {} {:?}",
            self.operation,
            self.entries.len() + 1,
            entry
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    fn commit(self) {
        tracing::info!(
            target: JOURNAL_TARGET,
            "{}: committed {} step(s)",
            self.operation,
            self.entries.len()
        );
    }

    /// Undo every recorded step, newest first. Steps that cannot be undone
    /// are logged with their full record for manual repair.
    async fn roll_back(self, repos: &Repositories, blobs: &dyn BlobStore) {
        tracing::warn!(
            target: JOURNAL_TARGET,
            "{}: rolling back {} step(s)",
            self.operation,
            self.entries.len()
        );
        let mut stranded = 0;
        for entry in self.entries.iter().rev() {
            if let Err(e) = undo(entry, repos, blobs).await {
                tracing::error!(
                    target: JOURNAL_TARGET,
                    "{}: could not undo {:?}: {}",
                    self.operation,
                    entry,
                    e
                );
                stranded += 1;
            }
        }
        if stranded > 0 {
            tracing::error!(
                target: JOURNAL_TARGET,
                "{}: {} step(s) left in place after rollback",
                self.operation,
                stranded
            );
        }
    }
}

async fn undo(
    entry: &JournalEntry,
    repos: &Repositories,
    blobs: &dyn BlobStore,
) -> Result<(), ServiceError> {
    match entry {
        JournalEntry::CaseCreated { case_id } => {
            repos.cases.delete(case_id).await?;
        }
        JournalEntry::ChatCreated { case_id } => {
            repos.chats.delete(case_id).await?;
        }
        JournalEntry::BlobWritten { key } => blobs.delete_object(key).await?,
        JournalEntry::DocumentCreated { document_id } => {
            repos.documents.delete(document_id).await?;
        }
        JournalEntry::FileCounted { case_id } => {
            repos.cases.increment_file_count(case_id, -1).await?;
        }
        JournalEntry::CaseDeleted(case) => repos.cases.restore(case).await?,
        JournalEntry::ChatDeleted(chat) => repos.chats.restore(chat).await?,
        JournalEntry::DocumentDeleted(document) => repos.documents.restore(document).await?,
    }
    Ok(())
}

/// A file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// How blob keys are derived for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyNaming {
    /// `<case_id>/<file name>`; re-uploading a name replaces the blob and
    /// reuses its document.
    Single,
    /// `<case_id>/<timestamp><file name>`; every upload is a new document.
    Batch,
}

pub struct CascadeCoordinator {
    repos: Arc<Repositories>,
    blobs: Arc<dyn BlobStore>,
    /// Serializes the lookup-then-register step of single uploads, whose
    /// keys are deterministic. Only guards uploads within this process.
    single_uploads: Mutex<()>,
}

impl CascadeCoordinator {
    pub fn new(repos: Arc<Repositories>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repos,
            blobs,
            single_uploads: Mutex::new(()),
        }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Create a case and its chat.
    pub async fn create_case(&self, input: Case) -> Result<Case, ServiceError> {
        if !input.blank_fields().is_empty() {
            return Err(ServiceError::InvalidInput(
                "All fields must be filled out".to_string(),
            ));
        }
        let mut journal = CascadeJournal::begin("create_case");
        match self.create_case_steps(input, &mut journal).await {
            Ok(case) => {
                journal.commit();
                tracing::info!("Created case {} for user {}", case.id, case.user_id);
                Ok(case)
            }
            Err(e) => {
                journal.roll_back(&self.repos, self.blobs.as_ref()).await;
                Err(e)
            }
        }
    }

    async fn create_case_steps(
        &self,
        input: Case,
        journal: &mut CascadeJournal,
    ) -> Result<Case, ServiceError> {
        let case = self.repos.cases.create(input).await?;
        journal.record(JournalEntry::CaseCreated {
            case_id: case.id.clone(),
        });
        self.repos.chats.create(&case.id, &case.user_id).await?;
        journal.record(JournalEntry::ChatCreated {
            case_id: case.id.clone(),
        });
        Ok(case)
    }

    /// Store files for an existing case and record a document for each.
    ///
    /// All-or-nothing: if any file fails, blobs, documents and counter
    /// increments from earlier files in the request are undone.
    pub async fn upload_documents(
        &self,
        case_id: &str,
        files: Vec<UploadedFile>,
        naming: KeyNaming,
    ) -> Result<Vec<Document>, ServiceError> {
        if case_id.is_empty() {
            return Err(ServiceError::InvalidInput("Case ID is required".to_string()));
        }
        if files.is_empty() {
            return Err(ServiceError::InvalidInput("No files uploaded".to_string()));
        }
        if self.repos.cases.get_by_id(case_id).await?.is_none() {
            return Err(ServiceError::NotFound("Case"));
        }

        let mut journal = CascadeJournal::begin("upload_documents");
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            match self.upload_one(case_id, file, naming, &mut journal).await {
                Ok(document) => documents.push(document),
                Err(e) => {
                    journal.roll_back(&self.repos, self.blobs.as_ref()).await;
                    return Err(e);
                }
            }
        }
        journal.commit();
        tracing::info!("Uploaded {} document(s) to case {}", documents.len(), case_id);
        Ok(documents)
    }

    async fn upload_one(
        &self,
        case_id: &str,
        file: UploadedFile,
        naming: KeyNaming,
        journal: &mut CascadeJournal,
    ) -> Result<Document, ServiceError> {
        let _registering = match naming {
            KeyNaming::Single => Some(self.single_uploads.lock().await),
            KeyNaming::Batch => None,
        };
        let now = Utc::now();
        let (key, date) = match naming {
            KeyNaming::Single => (
                single_upload_key(case_id, &file.file_name),
                now.to_rfc3339(),
            ),
            KeyNaming::Batch => {
                let timestamp = now.to_rfc3339_opts(SecondsFormat::Nanos, true);
                (
                    batch_upload_key(case_id, &timestamp, &file.file_name),
                    timestamp,
                )
            }
        };

        let existing = match naming {
            KeyNaming::Single => {
                self.repos
                    .documents
                    .get_by_file_url(&self.blobs.url_for(&key))
                    .await?
            }
            KeyNaming::Batch => None,
        };

        let file_url = self
            .blobs
            .put_object(&key, file.body, &file.content_type)
            .await?;
        if let Some(document) = existing {
            tracing::info!("Replaced blob {} for document {}", key, document.id);
            return Ok(document);
        }
        journal.record(JournalEntry::BlobWritten { key: key.clone() });

        let document = self
            .repos
            .documents
            .create(NewDocument {
                file_name: key,
                case_id: case_id.to_string(),
                date,
                file_url,
            })
            .await?;
        journal.record(JournalEntry::DocumentCreated {
            document_id: document.id.clone(),
        });

        if self.repos.cases.increment_file_count(case_id, 1).await?.is_none() {
            return Err(ServiceError::NotFound("Case"));
        }
        journal.record(JournalEntry::FileCounted {
            case_id: case_id.to_string(),
        });
        Ok(document)
    }

    /// Delete a case with its chat and documents. `None` if there was no
    /// such case.
    pub async fn delete_case(&self, case_id: &str) -> Result<Option<Case>, ServiceError> {
        let Some(case) = self.repos.cases.get_by_id(case_id).await? else {
            return Ok(None);
        };
        let mut journal = CascadeJournal::begin("delete_case");
        let mut orphaned = Vec::new();
        if let Err(e) = self.delete_case_steps(&case, &mut journal, &mut orphaned).await {
            journal.roll_back(&self.repos, self.blobs.as_ref()).await;
            return Err(e);
        }
        journal.commit();
        self.remove_blobs(orphaned).await;
        tracing::info!("Deleted case {}", case.id);
        Ok(Some(case))
    }

    /// Delete every case a user owns, cascading like [`Self::delete_case`].
    pub async fn delete_user_cases(&self, user_id: &str) -> Result<Vec<Case>, ServiceError> {
        let cases = self.repos.cases.get_by_user(user_id).await?;
        let mut journal = CascadeJournal::begin("delete_user_cases");
        let mut orphaned = Vec::new();
        for case in &cases {
            if let Err(e) = self.delete_case_steps(case, &mut journal, &mut orphaned).await {
                journal.roll_back(&self.repos, self.blobs.as_ref()).await;
                return Err(e);
            }
        }
        journal.commit();
        self.remove_blobs(orphaned).await;
        tracing::info!("Deleted {} case(s) of user {}", cases.len(), user_id);
        Ok(cases)
    }

    async fn delete_case_steps(
        &self,
        case: &Case,
        journal: &mut CascadeJournal,
        orphaned: &mut Vec<String>,
    ) -> Result<(), ServiceError> {
        self.delete_documents_steps(&case.id, journal, orphaned)
            .await?;
        if let Some(chat) = self.repos.chats.delete(&case.id).await? {
            journal.record(JournalEntry::ChatDeleted(chat));
        }
        if let Some(removed) = self.repos.cases.delete(&case.id).await? {
            journal.record(JournalEntry::CaseDeleted(removed));
        }
        Ok(())
    }

    /// Delete every document of a case. The case and its file counter are
    /// left as they are.
    pub async fn delete_case_documents(
        &self,
        case_id: &str,
    ) -> Result<Vec<Document>, ServiceError> {
        let mut journal = CascadeJournal::begin("delete_case_documents");
        let mut orphaned = Vec::new();
        let removed = match self
            .delete_documents_steps(case_id, &mut journal, &mut orphaned)
            .await
        {
            Ok(removed) => removed,
            Err(e) => {
                journal.roll_back(&self.repos, self.blobs.as_ref()).await;
                return Err(e);
            }
        };
        journal.commit();
        self.remove_blobs(orphaned).await;
        Ok(removed)
    }

    async fn delete_documents_steps(
        &self,
        case_id: &str,
        journal: &mut CascadeJournal,
        orphaned: &mut Vec<String>,
    ) -> Result<Vec<Document>, ServiceError> {
        let mut removed = Vec::new();
        for document in self.repos.documents.get_by_case(case_id).await? {
            if let Some(document) = self.repos.documents.delete(&document.id).await? {
                orphaned.push(document.file_name.clone());
                journal.record(JournalEntry::DocumentDeleted(document.clone()));
                removed.push(document);
            }
        }
        Ok(removed)
    }

    /// Delete one document record, then its blob.
    pub async fn delete_document(&self, id: &str) -> Result<Option<Document>, ServiceError> {
        let removed = self.repos.documents.delete(id).await?;
        if let Some(document) = &removed {
            self.remove_blobs(vec![document.file_name.clone()]).await;
        }
        Ok(removed)
    }

    async fn remove_blobs(&self, keys: Vec<String>) {
        for key in keys {
            if let Err(e) = self.blobs.delete_object(&key).await {
                tracing::warn!("Failed to remove blob {}: {}", key, e);
            }
        }
    }
}
