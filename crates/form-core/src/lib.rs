//! Form Pipeline Core Library
//!
//! Submission pipeline for saved form templates: folio numbering, mapping of
//! field values onto an external JSON contract, HTTP delivery and retry of
//! failed deliveries.

pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod paths;
pub mod services;
pub mod store;
pub mod types;
pub mod workflow;

// Re-export main types for easy access
pub use config::AppConfig;
pub use error::{FormsError, Result};

pub use clients::{DeliveryClient, DeliveryTarget, HttpDeliveryClient};
pub use services::SequenceStore;
pub use store::{JsonFileStore, MemoryStore};
pub use types::{
    ApiConfiguration, Authentication, DataFormat, FolioFormat, FolioSource, FormTemplate, HttpMethod,
    NumerationConfig, Transform,
};

pub use workflow::{
    ApiStatus,
    DeliveryOutcome,
    FormSequence,
    PipelineContext,
    RetryService,
    RetrySweep,
    SubmissionOrchestrator,
    SubmittedForm,
    SubmittedFormId,
};
