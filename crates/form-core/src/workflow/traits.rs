//! Persistence traits consumed by the submission pipeline
//!
//! Storage is implemented elsewhere (see `store`); the pipeline only relies on
//! these operations. Every method is async so implementations may do I/O.

use async_trait::async_trait;
use crate::error::Result;
use crate::types::FormTemplate;
use super::submission_types::{FormSequence, NewSubmittedForm, SubmittedForm, SubmittedFormId, SubmittedFormUpdate};

/// Read access to saved templates; the pipeline never mutates them
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn find_by_id(&self, template_id: &str) -> Result<Option<FormTemplate>>;
}

/// Durable per-template counters
///
/// Implementations do not need to be atomic across calls: `SequenceStore`
/// serializes read-compute-write per template.
#[async_trait]
pub trait SequenceRepository: Send + Sync {
    async fn find_by_template_id(&self, template_id: &str) -> Result<Option<FormSequence>>;

    async fn create(&self, template_id: &str, last_number: u64) -> Result<FormSequence>;

    /// Fails with `Persistence` if the sequence does not exist
    async fn update(&self, template_id: &str, last_number: u64) -> Result<FormSequence>;

    /// Drop the counter; the next allocation starts again from `startFrom`
    async fn delete(&self, template_id: &str) -> Result<()>;
}

/// Saved submissions
#[async_trait]
pub trait SubmittedFormRepository: Send + Sync {
    async fn create(&self, data: NewSubmittedForm) -> Result<SubmittedForm>;

    async fn find_by_id(&self, id: &SubmittedFormId) -> Result<Option<SubmittedForm>>;

    /// Newest first
    async fn find_by_template_id(&self, template_id: &str) -> Result<Vec<SubmittedForm>>;

    /// Newest first
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<SubmittedForm>>;

    /// Fails with `SubmissionNotFound` if the record does not exist
    async fn update(&self, id: &SubmittedFormId, update: SubmittedFormUpdate) -> Result<SubmittedForm>;
}
