//! Document lifecycle orchestration.
//!
//! The upload pipeline runs validate → quota → store → persist. Bytes only
//! reach the object store after validation and the quota check have both
//! passed, and a metadata failure after the bytes are written triggers a
//! compensating delete so the two stores cannot silently diverge. When even
//! the compensating delete fails, the orphaned key is recorded in the audit
//! trail for a later reconciliation sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use docvault_core::constants::{
    ACCESS_URL_TTL_SECS, MAX_DESCRIPTION_CHARS, MAX_TAGS, MAX_TAG_CHARS,
};
use docvault_core::models::{
    AccessGrant, AuditAction, AuditEvent, AuditOutcome, Disposition, Document, DocumentFilter,
    DocumentUpdate, Pagination,
};
use docvault_core::AppError;
use docvault_db::{CategoryStore, DocumentStore};
use docvault_inspect::filename::sanitize_filename;
use docvault_inspect::ContentValidator;
use docvault_storage::{keys, Storage};
use uuid::Uuid;

use crate::auth::CallerContext;
use crate::error::storage_error_to_app;
use crate::services::audit::AuditSink;
use crate::services::quota::QuotaTracker;

use super::types::{UploadRequest, UploadStage};

pub struct DocumentService {
    validator: Arc<ContentValidator>,
    storage: Arc<dyn Storage>,
    documents: Arc<dyn DocumentStore>,
    categories: Arc<dyn CategoryStore>,
    quota: QuotaTracker,
    audit: Arc<dyn AuditSink>,
    max_file_size_bytes: u64,
}

impl DocumentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        validator: Arc<ContentValidator>,
        storage: Arc<dyn Storage>,
        documents: Arc<dyn DocumentStore>,
        categories: Arc<dyn CategoryStore>,
        quota: QuotaTracker,
        audit: Arc<dyn AuditSink>,
        max_file_size_bytes: u64,
    ) -> Self {
        Self {
            validator,
            storage,
            documents,
            categories,
            quota,
            audit,
            max_file_size_bytes,
        }
    }

    /// Run the full upload pipeline for one document.
    #[tracing::instrument(skip(self, request), fields(filename = %request.original_filename, size = request.data.len()))]
    pub async fn upload(
        &self,
        caller: &CallerContext,
        request: UploadRequest,
    ) -> Result<Document, AppError> {
        let file_size = request.data.len() as u64;
        if file_size > self.max_file_size_bytes {
            let reason = format!(
                "{} bytes exceeds limit of {} bytes",
                file_size, self.max_file_size_bytes
            );
            self.audit.record(
                AuditEvent::new(AuditAction::Upload, AuditOutcome::Rejected, caller.user_id)
                    .detail(reason.clone()),
            );
            return Err(AppError::PayloadTooLarge(reason));
        }

        tracing::debug!(stage = %UploadStage::Validating, "Upload pipeline started");

        validate_description(&request.description)?;
        let tags = normalize_tags(request.tags)?;

        if let Some(category_id) = request.category_id {
            if self.categories.get(category_id).await?.is_none() {
                return Err(AppError::InvalidInput(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }

        let report = self
            .validator
            .inspect(
                &request.data,
                &request.original_filename,
                &request.content_type,
            )
            .await;

        if !report.is_accepted() {
            self.audit.record(
                AuditEvent::new(AuditAction::Upload, AuditOutcome::Rejected, caller.user_id)
                    .detail(report.rejections.join("; ")),
            );
            return Err(AppError::ValidationRejected {
                reasons: report.rejections,
            });
        }

        // Quota is checked strictly before any byte reaches the object
        // store, so an over-quota upload leaves nothing to clean up. Every
        // refused attempt still lands in the audit trail.
        if let Err(err) = self
            .quota
            .ensure_fits(caller.user_id, file_size as i64)
            .await
        {
            let outcome = if matches!(err, AppError::QuotaExceeded { .. }) {
                AuditOutcome::Rejected
            } else {
                AuditOutcome::Failed
            };
            self.audit.record(
                AuditEvent::new(AuditAction::Upload, outcome, caller.user_id)
                    .detail(err.to_string()),
            );
            return Err(err);
        }

        tracing::debug!(stage = %UploadStage::Storing, "Validation passed, writing object");

        let safe_original = sanitize_filename(&request.original_filename);
        let object_name = keys::object_filename(&safe_original);

        let storage_key = self
            .storage
            .put(
                caller.user_id,
                &object_name,
                &request.content_type,
                request.data,
            )
            .await
            .map_err(|e| {
                self.audit.record(
                    AuditEvent::new(AuditAction::Upload, AuditOutcome::Failed, caller.user_id)
                        .detail(format!("object store write failed: {}", e)),
                );
                storage_error_to_app(e)
            })?;

        tracing::debug!(stage = %UploadStage::Persisting, storage_key = %storage_key, "Object stored, persisting metadata");

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            filename: object_name,
            original_filename: safe_original,
            content_type: request.content_type,
            file_size: file_size as i64,
            storage_key: storage_key.clone(),
            category_id: request.category_id,
            owner_id: caller.user_id,
            description: request.description,
            tags,
            security: report.to_security_metadata(),
            uploaded_at: now,
            updated_at: now,
        };

        let document = match self.documents.create(document).await {
            Ok(document) => document,
            Err(persist_err) => {
                return Err(self
                    .compensate_failed_persist(caller.user_id, &storage_key, persist_err)
                    .await);
            }
        };

        tracing::info!(
            stage = %UploadStage::Complete,
            document_id = %document.id,
            storage_key = %document.storage_key,
            size_bytes = document.file_size,
            warnings = document.security.warnings.len(),
            "Document uploaded"
        );

        self.audit.record(
            AuditEvent::new(AuditAction::Upload, AuditOutcome::Success, caller.user_id)
                .document(document.id)
                .storage_key(&document.storage_key),
        );

        Ok(document)
    }

    /// Undo the object write after a metadata failure. The delete is awaited,
    /// not spawned: until it finishes (or is recorded as an orphan) the
    /// upload is not allowed to report failure.
    async fn compensate_failed_persist(
        &self,
        user_id: Uuid,
        storage_key: &str,
        persist_err: AppError,
    ) -> AppError {
        tracing::error!(
            error = %persist_err,
            storage_key = %storage_key,
            "Metadata persistence failed, deleting stored object"
        );

        match self.storage.delete(storage_key).await {
            Ok(()) => {
                self.audit.record(
                    AuditEvent::new(AuditAction::Upload, AuditOutcome::Failed, user_id)
                        .storage_key(storage_key)
                        .detail(format!(
                            "metadata persistence failed, object removed: {}",
                            persist_err
                        )),
                );
            }
            Err(delete_err) => {
                tracing::error!(
                    error = %delete_err,
                    storage_key = %storage_key,
                    "Compensating delete failed, object is orphaned"
                );
                self.audit.record(
                    AuditEvent::new(AuditAction::Upload, AuditOutcome::Orphaned, user_id)
                        .storage_key(storage_key)
                        .detail(format!(
                            "persist failed ({}), compensating delete failed ({})",
                            persist_err, delete_err
                        )),
                );
            }
        }

        AppError::PersistenceFailed("could not persist document metadata".to_string())
    }

    /// Fetch one document, enforcing ownership.
    pub async fn get(&self, caller: &CallerContext, id: Uuid) -> Result<Document, AppError> {
        let document = self
            .documents
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
        self.authorize(caller, &document)?;
        Ok(document)
    }

    /// Owner-scoped listing. Admins may pass a filter that spans owners;
    /// everyone else is pinned to their own documents regardless of filter.
    pub async fn list(
        &self,
        caller: &CallerContext,
        mut filter: DocumentFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Document>, i64), AppError> {
        if !caller.is_admin() {
            filter.owner_id = Some(caller.user_id);
        }
        self.documents.list(&filter, pagination).await
    }

    pub async fn update(
        &self,
        caller: &CallerContext,
        id: Uuid,
        mut update: DocumentUpdate,
    ) -> Result<Document, AppError> {
        let document = self.get(caller, id).await?;

        if let Some(ref filename) = update.original_filename {
            if filename.trim().is_empty() {
                return Err(AppError::InvalidInput("Filename cannot be empty".to_string()));
            }
        }
        if let Some(Some(ref description)) = update.description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(AppError::InvalidInput(format!(
                    "Description exceeds {} characters",
                    MAX_DESCRIPTION_CHARS
                )));
            }
        }
        if let Some(tags) = update.tags.take() {
            update.tags = Some(normalize_tags(tags)?);
        }
        if let Some(Some(category_id)) = update.category_id {
            if self.categories.get(category_id).await?.is_none() {
                return Err(AppError::InvalidInput(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }

        self.documents.update_metadata(document.id, update).await
    }

    /// Issue a short-lived access URL for the document's bytes.
    ///
    /// The object's existence is verified first: a metadata row whose object
    /// has vanished yields `DocumentGone` rather than a signed URL pointing
    /// at nothing.
    pub async fn access_url(
        &self,
        caller: &CallerContext,
        id: Uuid,
        disposition: Disposition,
    ) -> Result<AccessGrant, AppError> {
        let document = self.get(caller, id).await?;

        let exists = self
            .storage
            .exists(&document.storage_key)
            .await
            .map_err(storage_error_to_app)?;
        if !exists {
            tracing::error!(
                document_id = %document.id,
                storage_key = %document.storage_key,
                "Metadata row references a missing object"
            );
            self.audit.record(
                AuditEvent::new(AuditAction::Download, AuditOutcome::Failed, caller.user_id)
                    .document(document.id)
                    .storage_key(&document.storage_key)
                    .detail("object missing behind live metadata row"),
            );
            return Err(AppError::DocumentGone(document.id));
        }

        let ttl = Duration::from_secs(ACCESS_URL_TTL_SECS);
        let url = self
            .storage
            .presigned_get_url(
                &document.storage_key,
                disposition,
                &document.original_filename,
                ttl,
            )
            .await
            .map_err(storage_error_to_app)?;

        self.audit.record(
            AuditEvent::new(AuditAction::Download, AuditOutcome::Success, caller.user_id)
                .document(document.id)
                .storage_key(&document.storage_key),
        );

        Ok(AccessGrant {
            url,
            disposition,
            expires_at: Utc::now() + chrono::Duration::seconds(ACCESS_URL_TTL_SECS as i64),
        })
    }

    /// Delete a document, object first.
    ///
    /// Removing the bytes before the row means a failure in between leaves a
    /// row pointing at nothing, which reads surface as `DocumentGone`; the
    /// reverse order would leak unreferenced bytes with no record. The
    /// object delete is idempotent, so retrying the metadata half is safe.
    pub async fn delete(&self, caller: &CallerContext, id: Uuid) -> Result<(), AppError> {
        let document = self.get(caller, id).await?;

        if let Err(e) = self.storage.delete(&document.storage_key).await {
            self.audit.record(
                AuditEvent::new(AuditAction::Delete, AuditOutcome::Failed, caller.user_id)
                    .document(document.id)
                    .storage_key(&document.storage_key)
                    .detail(format!("object delete failed: {}", e)),
            );
            return Err(storage_error_to_app(e));
        }

        if let Err(e) = self.documents.delete(document.id).await {
            self.audit.record(
                AuditEvent::new(AuditAction::Delete, AuditOutcome::Failed, caller.user_id)
                    .document(document.id)
                    .storage_key(&document.storage_key)
                    .detail(format!("metadata delete failed after object removal: {}", e)),
            );
            return Err(e);
        }

        self.audit.record(
            AuditEvent::new(AuditAction::Delete, AuditOutcome::Success, caller.user_id)
                .document(document.id)
                .storage_key(&document.storage_key),
        );

        tracing::info!(document_id = %document.id, "Document deleted");
        Ok(())
    }

    fn authorize(&self, caller: &CallerContext, document: &Document) -> Result<(), AppError> {
        if caller.is_admin() || document.owner_id == caller.user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Document belongs to another user".to_string(),
            ))
        }
    }
}

fn validate_description(description: &Option<String>) -> Result<(), AppError> {
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AppError::InvalidInput(format!(
                "Description exceeds {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
    }
    Ok(())
}

/// Trim, drop empties, deduplicate, and bound tag count and length.
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, AppError> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_CHARS {
            return Err(AppError::InvalidInput(format!(
                "Tag '{}' exceeds {} characters",
                tag, MAX_TAG_CHARS
            )));
        }
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    if normalized.len() > MAX_TAGS {
        return Err(AppError::InvalidInput(format!(
            "At most {} tags are allowed",
            MAX_TAGS
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use async_trait::async_trait;
    use docvault_core::models::{Category, CreateCategory};
    use docvault_storage::{StorageError, StorageResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ----- test doubles -----

    /// Shared call log so tests can assert cross-component ordering.
    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct MockStorage {
        calls: CallLog,
        fail_put: bool,
        fail_delete: bool,
        object_exists: bool,
        puts: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
    }

    impl MockStorage {
        fn new(calls: CallLog) -> Self {
            Self {
                calls,
                fail_put: false,
                fail_delete: false,
                object_exists: true,
                puts: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Storage for MockStorage {
        async fn put(
            &self,
            owner_id: Uuid,
            filename: &str,
            _content_type: &str,
            _data: Vec<u8>,
        ) -> StorageResult<String> {
            self.calls.lock().unwrap().push("storage.put");
            if self.fail_put {
                return Err(StorageError::Unavailable("connect timeout".to_string()));
            }
            let key = keys::generate_storage_key(owner_id, filename);
            self.puts.lock().unwrap().push(key.clone());
            Ok(key)
        }

        async fn presigned_get_url(
            &self,
            storage_key: &str,
            _disposition: Disposition,
            _original_filename: &str,
            _expires_in: Duration,
        ) -> StorageResult<String> {
            Ok(format!("https://example.test/{}?signed", storage_key))
        }

        async fn delete(&self, storage_key: &str) -> StorageResult<()> {
            self.calls.lock().unwrap().push("storage.delete");
            if self.fail_delete {
                return Err(StorageError::Unavailable("connect timeout".to_string()));
            }
            self.deletes.lock().unwrap().push(storage_key.to_string());
            Ok(())
        }

        async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
            Ok(self.object_exists)
        }

        async fn content_length(&self, _storage_key: &str) -> StorageResult<u64> {
            Ok(0)
        }
    }

    struct MockDocumentStore {
        calls: CallLog,
        fail_create: bool,
        used_bytes: i64,
        docs: Mutex<HashMap<Uuid, Document>>,
    }

    impl MockDocumentStore {
        fn new(calls: CallLog) -> Self {
            Self {
                calls,
                fail_create: false,
                used_bytes: 0,
                docs: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for MockDocumentStore {
        async fn create(&self, document: Document) -> Result<Document, AppError> {
            self.calls.lock().unwrap().push("documents.create");
            if self.fail_create {
                return Err(AppError::Internal("insert failed".to_string()));
            }
            self.docs
                .lock()
                .unwrap()
                .insert(document.id, document.clone());
            Ok(document)
        }

        async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
            Ok(self.docs.lock().unwrap().get(&id).cloned())
        }

        async fn update_metadata(
            &self,
            id: Uuid,
            update: DocumentUpdate,
        ) -> Result<Document, AppError> {
            let mut docs = self.docs.lock().unwrap();
            let doc = docs
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))?;
            if let Some(filename) = update.original_filename {
                doc.original_filename = filename;
            }
            if let Some(category) = update.category_id {
                doc.category_id = category;
            }
            if let Some(description) = update.description {
                doc.description = description;
            }
            if let Some(tags) = update.tags {
                doc.tags = tags;
            }
            Ok(doc.clone())
        }

        async fn delete(&self, id: Uuid) -> Result<(), AppError> {
            self.calls.lock().unwrap().push("documents.delete");
            self.docs
                .lock()
                .unwrap()
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", id)))
        }

        async fn list(
            &self,
            filter: &DocumentFilter,
            _pagination: Pagination,
        ) -> Result<(Vec<Document>, i64), AppError> {
            let docs: Vec<Document> = self
                .docs
                .lock()
                .unwrap()
                .values()
                .filter(|d| filter.owner_id.map(|o| d.owner_id == o).unwrap_or(true))
                .cloned()
                .collect();
            let total = docs.len() as i64;
            Ok((docs, total))
        }

        async fn usage(&self, _owner_id: Uuid) -> Result<(i64, i64), AppError> {
            self.calls.lock().unwrap().push("documents.usage");
            Ok((self.used_bytes, 0))
        }
    }

    struct MockCategoryStore {
        known: Vec<Uuid>,
    }

    #[async_trait]
    impl CategoryStore for MockCategoryStore {
        async fn create(&self, _category: CreateCategory) -> Result<Category, AppError> {
            unimplemented!("not used in these tests")
        }

        async fn get(&self, id: Uuid) -> Result<Option<Category>, AppError> {
            Ok(self.known.contains(&id).then(|| Category {
                id,
                name: "reports".to_string(),
                description: None,
                created_at: Utc::now(),
            }))
        }

        async fn list(&self) -> Result<Vec<Category>, AppError> {
            Ok(vec![])
        }

        async fn delete(&self, _id: Uuid) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingAuditSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    impl AuditSink for RecordingAuditSink {
        fn record(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    // ----- fixture -----

    const MAX_SIZE: u64 = 50 * 1024 * 1024;
    const QUOTA: i64 = 500 * 1024 * 1024;

    struct Fixture {
        service: DocumentService,
        storage: Arc<MockStorage>,
        documents: Arc<MockDocumentStore>,
        audit: Arc<RecordingAuditSink>,
        calls: CallLog,
        category_id: Uuid,
    }

    fn fixture_with(
        configure_storage: impl FnOnce(&mut MockStorage),
        configure_documents: impl FnOnce(&mut MockDocumentStore),
    ) -> Fixture {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let mut storage = MockStorage::new(calls.clone());
        configure_storage(&mut storage);
        let mut documents = MockDocumentStore::new(calls.clone());
        configure_documents(&mut documents);

        let storage = Arc::new(storage);
        let documents = Arc::new(documents);
        let audit = Arc::new(RecordingAuditSink::default());
        let category_id = Uuid::new_v4();
        let categories = Arc::new(MockCategoryStore {
            known: vec![category_id],
        });
        let quota = QuotaTracker::new(documents.clone(), QUOTA);

        let service = DocumentService::new(
            Arc::new(ContentValidator::without_scanner()),
            storage.clone(),
            documents.clone(),
            categories,
            quota,
            audit.clone(),
            MAX_SIZE,
        );

        Fixture {
            service,
            storage,
            documents,
            audit,
            calls,
            category_id,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| {}, |_| {})
    }

    fn member() -> CallerContext {
        CallerContext {
            user_id: Uuid::new_v4(),
            role: UserRole::Member,
        }
    }

    fn pdf_upload() -> UploadRequest {
        let mut data = b"%PDF-1.7\n".to_vec();
        data.extend_from_slice(&[b'x'; 128]);
        UploadRequest {
            data,
            original_filename: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            category_id: None,
            description: Some("annual report".to_string()),
            tags: vec!["finance".to_string()],
        }
    }

    fn audit_outcomes(audit: &RecordingAuditSink) -> Vec<AuditOutcome> {
        audit.events.lock().unwrap().iter().map(|e| e.outcome).collect()
    }

    // ----- upload pipeline -----

    #[tokio::test]
    async fn successful_upload_persists_metadata_and_audits() {
        let fx = fixture();
        let caller = member();

        let document = fx.service.upload(&caller, pdf_upload()).await.unwrap();

        assert_eq!(document.owner_id, caller.user_id);
        assert_eq!(document.file_size, 137);
        assert!(document
            .storage_key
            .starts_with(&format!("documents/{}/", caller.user_id)));
        assert!(document.filename.ends_with(".pdf"));
        assert_ne!(document.filename, "report.pdf");
        assert!(fx.documents.docs.lock().unwrap().contains_key(&document.id));
        assert_eq!(audit_outcomes(&fx.audit), vec![AuditOutcome::Success]);
    }

    #[tokio::test]
    async fn rejected_content_never_reaches_storage() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.data = b"MZ\x90\x00followed by program bytes".to_vec();

        let err = fx.service.upload(&member(), request).await.unwrap_err();

        assert!(matches!(err, AppError::ValidationRejected { .. }));
        assert!(fx.storage.puts.lock().unwrap().is_empty());
        assert_eq!(audit_outcomes(&fx.audit), vec![AuditOutcome::Rejected]);
        let calls = fx.calls.lock().unwrap();
        assert!(!calls.contains(&"storage.put"));
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.data = Vec::new();

        let err = fx.service.upload(&member(), request).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationRejected { .. }));
    }

    #[tokio::test]
    async fn oversized_payload_fails_before_any_side_effect() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.data = vec![b'a'; (MAX_SIZE + 1) as usize];

        let err = fx.service.upload(&member(), request).await.unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(fx.calls.lock().unwrap().is_empty());
        assert_eq!(audit_outcomes(&fx.audit), vec![AuditOutcome::Rejected]);
    }

    #[tokio::test]
    async fn over_quota_upload_is_refused_without_storing() {
        let fx = fixture_with(|_| {}, |docs| docs.used_bytes = QUOTA - 10);
        let err = fx.service.upload(&member(), pdf_upload()).await.unwrap_err();

        match err {
            AppError::QuotaExceeded {
                used,
                limit,
                requested,
            } => {
                assert_eq!(used, QUOTA - 10);
                assert_eq!(limit, QUOTA);
                assert_eq!(requested, 137);
            }
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
        assert!(fx.storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn quota_rejected_upload_is_audited() {
        let fx = fixture_with(|_| {}, |docs| docs.used_bytes = QUOTA);
        let err = fx.service.upload(&member(), pdf_upload()).await.unwrap_err();

        assert!(matches!(err, AppError::QuotaExceeded { .. }));
        assert_eq!(audit_outcomes(&fx.audit), vec![AuditOutcome::Rejected]);
        let events = fx.audit.events.lock().unwrap();
        assert!(events[0]
            .detail
            .as_deref()
            .unwrap_or("")
            .contains("Quota exceeded"));
    }

    #[tokio::test]
    async fn quota_is_checked_before_object_write() {
        let fx = fixture();
        fx.service.upload(&member(), pdf_upload()).await.unwrap();

        let calls = fx.calls.lock().unwrap();
        let usage_pos = calls.iter().position(|c| *c == "documents.usage").unwrap();
        let put_pos = calls.iter().position(|c| *c == "storage.put").unwrap();
        assert!(usage_pos < put_pos, "calls: {:?}", *calls);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_up_front() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.category_id = Some(Uuid::new_v4());

        let err = fx.service.upload(&member(), request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(fx.storage.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn known_category_is_accepted() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.category_id = Some(fx.category_id);

        let document = fx.service.upload(&member(), request).await.unwrap();
        assert_eq!(document.category_id, Some(fx.category_id));
    }

    #[tokio::test]
    async fn storage_outage_surfaces_as_retryable() {
        let fx = fixture_with(|storage| storage.fail_put = true, |_| {});
        let err = fx.service.upload(&member(), pdf_upload()).await.unwrap_err();

        assert!(matches!(err, AppError::StorageUnavailable(_)));
        assert_eq!(audit_outcomes(&fx.audit), vec![AuditOutcome::Failed]);
    }

    // ----- persist-failure compensation -----

    #[tokio::test]
    async fn persist_failure_triggers_compensating_delete_of_same_key() {
        let fx = fixture_with(|_| {}, |docs| docs.fail_create = true);
        let err = fx.service.upload(&member(), pdf_upload()).await.unwrap_err();

        assert!(matches!(err, AppError::PersistenceFailed(_)));
        let puts = fx.storage.puts.lock().unwrap();
        let deletes = fx.storage.deletes.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(*deletes, *puts);
        assert_eq!(audit_outcomes(&fx.audit), vec![AuditOutcome::Failed]);
    }

    #[tokio::test]
    async fn failed_compensation_records_orphan() {
        let fx = fixture_with(
            |storage| storage.fail_delete = true,
            |docs| docs.fail_create = true,
        );
        let err = fx.service.upload(&member(), pdf_upload()).await.unwrap_err();

        assert!(matches!(err, AppError::PersistenceFailed(_)));
        let events = fx.audit.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Orphaned);
        assert!(events[0].storage_key.is_some());
    }

    // ----- retrieval and access -----

    #[tokio::test]
    async fn non_owner_cannot_read_and_admin_can() {
        let fx = fixture();
        let owner = member();
        let document = fx.service.upload(&owner, pdf_upload()).await.unwrap();

        let stranger = member();
        let err = fx.service.get(&stranger, document.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = CallerContext {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        assert!(fx.service.get(&admin, document.id).await.is_ok());
    }

    #[tokio::test]
    async fn list_is_pinned_to_caller_for_members() {
        let fx = fixture();
        let alice = member();
        let bob = member();
        fx.service.upload(&alice, pdf_upload()).await.unwrap();
        fx.service.upload(&bob, pdf_upload()).await.unwrap();

        let (docs, total) = fx
            .service
            .list(&alice, DocumentFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(docs[0].owner_id, alice.user_id);
    }

    #[tokio::test]
    async fn access_url_carries_disposition_and_expiry() {
        let fx = fixture();
        let caller = member();
        let document = fx.service.upload(&caller, pdf_upload()).await.unwrap();

        let grant = fx
            .service
            .access_url(&caller, document.id, Disposition::Inline)
            .await
            .unwrap();

        assert!(grant.url.contains(&document.storage_key));
        assert_eq!(grant.disposition, Disposition::Inline);
        assert!(grant.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn missing_object_behind_live_row_reads_as_gone() {
        let fx = fixture_with(|storage| storage.object_exists = false, |_| {});
        let caller = member();
        let document = fx.service.upload(&caller, pdf_upload()).await.unwrap();

        let err = fx
            .service
            .access_url(&caller, document.id, Disposition::Attachment)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DocumentGone(id) if id == document.id));
        let outcomes = audit_outcomes(&fx.audit);
        assert_eq!(outcomes.last(), Some(&AuditOutcome::Failed));
    }

    // ----- delete -----

    #[tokio::test]
    async fn delete_removes_object_before_metadata() {
        let fx = fixture();
        let caller = member();
        let document = fx.service.upload(&caller, pdf_upload()).await.unwrap();

        fx.service.delete(&caller, document.id).await.unwrap();

        assert!(fx.documents.docs.lock().unwrap().is_empty());
        let calls = fx.calls.lock().unwrap();
        let object_pos = calls.iter().rposition(|c| *c == "storage.delete").unwrap();
        let row_pos = calls.iter().rposition(|c| *c == "documents.delete").unwrap();
        assert!(object_pos < row_pos, "calls: {:?}", *calls);
    }

    #[tokio::test]
    async fn delete_succeeds_when_object_is_already_missing() {
        let fx = fixture_with(|storage| storage.object_exists = false, |_| {});
        let caller = member();
        let document = fx.service.upload(&caller, pdf_upload()).await.unwrap();

        fx.service.delete(&caller, document.id).await.unwrap();

        assert!(fx.documents.docs.lock().unwrap().is_empty());
        let outcomes = audit_outcomes(&fx.audit);
        assert_eq!(outcomes.last(), Some(&AuditOutcome::Success));
    }

    #[tokio::test]
    async fn delete_is_owner_only() {
        let fx = fixture();
        let owner = member();
        let document = fx.service.upload(&owner, pdf_upload()).await.unwrap();

        let err = fx.service.delete(&member(), document.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(!fx.documents.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_metadata_when_object_delete_fails() {
        let fx = fixture();
        let caller = member();
        let document = fx.service.upload(&caller, pdf_upload()).await.unwrap();

        fx.storage.calls.lock().unwrap().clear();
        // Flip the storage into failure mode for the delete path.
        let fx2 = fixture_with(|storage| storage.fail_delete = true, |_| {});
        let caller2 = member();
        let doc2 = fx2.service.upload(&caller2, pdf_upload()).await.unwrap();
        let err = fx2.service.delete(&caller2, doc2.id).await.unwrap_err();

        assert!(matches!(err, AppError::StorageUnavailable(_)));
        assert!(fx2.documents.docs.lock().unwrap().contains_key(&doc2.id));

        // First fixture can still delete normally.
        fx.service.delete(&caller, document.id).await.unwrap();
    }

    // ----- metadata validation -----

    #[tokio::test]
    async fn tag_normalization_dedupes_and_bounds() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.tags = vec![
            " finance ".to_string(),
            "finance".to_string(),
            String::new(),
            "q3".to_string(),
        ];

        let document = fx.service.upload(&member(), request).await.unwrap();
        assert_eq!(document.tags, vec!["finance", "q3"]);
    }

    #[tokio::test]
    async fn too_many_tags_rejected() {
        let fx = fixture();
        let mut request = pdf_upload();
        request.tags = (0..MAX_TAGS + 1).map(|i| format!("tag{}", i)).collect();

        let err = fx.service.upload(&member(), request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_clears_category_with_explicit_null() {
        let fx = fixture();
        let caller = member();
        let mut request = pdf_upload();
        request.category_id = Some(fx.category_id);
        let document = fx.service.upload(&caller, request).await.unwrap();

        let update = DocumentUpdate {
            category_id: Some(None),
            ..Default::default()
        };
        let updated = fx.service.update(&caller, document.id, update).await.unwrap();
        assert_eq!(updated.category_id, None);
    }
}
