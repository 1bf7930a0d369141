//! Submission workflow: records, repository seams and use cases

pub mod context;
pub mod orchestrator;
pub mod retry;
pub mod submission_types;
pub mod traits;

pub use context::PipelineContext;
pub use orchestrator::{validate_required, DeliveryOutcome, SubmissionOrchestrator};
pub use retry::{RetryService, RetrySweep};
pub use submission_types::*;
pub use traits::{SequenceRepository, SubmittedFormRepository, TemplateRepository};
