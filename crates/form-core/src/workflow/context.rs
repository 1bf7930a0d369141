//! Explicit application context shared by the submission use cases

use std::sync::Arc;

use crate::clients::{DeliveryClient, HttpDeliveryClient};
use crate::config::AppConfig;
use crate::error::{FormsError, Result};
use crate::services::SequenceStore;
use crate::store::JsonFileStore;
use crate::types::FormTemplate;

use super::traits::{SequenceRepository, SubmittedFormRepository, TemplateRepository};

/// Collaborators of the pipeline, built once and handed to the use cases
pub struct PipelineContext {
    pub templates: Arc<dyn TemplateRepository>,
    pub submissions: Arc<dyn SubmittedFormRepository>,
    pub sequences: SequenceStore,
    pub delivery: Arc<dyn DeliveryClient>,
}

impl PipelineContext {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        sequences: Arc<dyn SequenceRepository>,
        submissions: Arc<dyn SubmittedFormRepository>,
        delivery: Arc<dyn DeliveryClient>,
    ) -> Self {
        Self {
            templates,
            submissions,
            sequences: SequenceStore::new(sequences),
            delivery,
        }
    }

    /// Use one store for templates, sequences and submissions
    pub fn with_store<S>(store: Arc<S>, delivery: Arc<dyn DeliveryClient>) -> Self
    where
        S: TemplateRepository + SequenceRepository + SubmittedFormRepository + 'static,
    {
        Self::new(store.clone(), store.clone(), store, delivery)
    }

    /// File store under `storage.data_dir` and the HTTP delivery client
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(JsonFileStore::new(&config.storage.data_dir)?);
        let delivery = Arc::new(HttpDeliveryClient::new(&config.delivery)?);

        log::info!("Pipeline context ready (data dir {})", config.storage.data_dir.display());
        Ok(Self::with_store(store, delivery))
    }

    /// Fetch a template and check its configuration invariants
    pub async fn load_template(&self, template_id: &str) -> Result<FormTemplate> {
        let template = self
            .templates
            .find_by_id(template_id)
            .await?
            .ok_or_else(|| FormsError::TemplateNotFound(template_id.to_string()))?;

        template.validate()?;
        Ok(template)
    }
}
