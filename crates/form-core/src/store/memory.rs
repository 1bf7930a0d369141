//! In-process repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{FormsError, Result};
use crate::types::FormTemplate;
use crate::workflow::submission_types::{
    FormSequence, NewSubmittedForm, SubmittedForm, SubmittedFormId, SubmittedFormUpdate,
};
use crate::workflow::traits::{SequenceRepository, SubmittedFormRepository, TemplateRepository};

/// Keeps templates, sequences and submissions in memory
#[derive(Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<String, FormTemplate>>,
    sequences: RwLock<HashMap<String, FormSequence>>,
    submissions: RwLock<HashMap<SubmittedFormId, SubmittedForm>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a template, replacing any previous version
    pub async fn save_template(&self, template: FormTemplate) -> Result<()> {
        template.validate()?;
        self.templates.write().await.insert(template.id.clone(), template);
        Ok(())
    }

    /// Remove a template together with its sequence
    pub async fn delete_template(&self, template_id: &str) -> Result<bool> {
        let removed = self.templates.write().await.remove(template_id).is_some();
        SequenceRepository::delete(self, template_id).await?;
        Ok(removed)
    }
}

fn newest_first(mut forms: Vec<SubmittedForm>) -> Vec<SubmittedForm> {
    forms.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    forms
}

#[async_trait]
impl TemplateRepository for MemoryStore {
    async fn find_by_id(&self, template_id: &str) -> Result<Option<FormTemplate>> {
        Ok(self.templates.read().await.get(template_id).cloned())
    }
}

#[async_trait]
impl SequenceRepository for MemoryStore {
    async fn find_by_template_id(&self, template_id: &str) -> Result<Option<FormSequence>> {
        Ok(self.sequences.read().await.get(template_id).cloned())
    }

    async fn create(&self, template_id: &str, last_number: u64) -> Result<FormSequence> {
        let sequence = FormSequence::new(template_id, last_number);
        self.sequences
            .write()
            .await
            .insert(template_id.to_string(), sequence.clone());
        Ok(sequence)
    }

    async fn update(&self, template_id: &str, last_number: u64) -> Result<FormSequence> {
        let mut sequences = self.sequences.write().await;
        let sequence = sequences
            .get_mut(template_id)
            .ok_or_else(|| FormsError::Persistence(format!("No sequence for template {}", template_id)))?;

        sequence.last_number = last_number;
        sequence.last_used = Utc::now();
        Ok(sequence.clone())
    }

    async fn delete(&self, template_id: &str) -> Result<()> {
        self.sequences.write().await.remove(template_id);
        Ok(())
    }
}

#[async_trait]
impl SubmittedFormRepository for MemoryStore {
    async fn create(&self, data: NewSubmittedForm) -> Result<SubmittedForm> {
        let form = data.into_record(SubmittedFormId::new());
        self.submissions.write().await.insert(form.id.clone(), form.clone());
        Ok(form)
    }

    async fn find_by_id(&self, id: &SubmittedFormId) -> Result<Option<SubmittedForm>> {
        Ok(self.submissions.read().await.get(id).cloned())
    }

    async fn find_by_template_id(&self, template_id: &str) -> Result<Vec<SubmittedForm>> {
        let submissions = self.submissions.read().await;
        Ok(newest_first(
            submissions
                .values()
                .filter(|f| f.template_id == template_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<SubmittedForm>> {
        let submissions = self.submissions.read().await;
        Ok(newest_first(
            submissions
                .values()
                .filter(|f| f.submitted_by == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn update(&self, id: &SubmittedFormId, update: SubmittedFormUpdate) -> Result<SubmittedForm> {
        let mut submissions = self.submissions.write().await;
        let form = submissions
            .get_mut(id)
            .ok_or_else(|| FormsError::SubmissionNotFound(id.to_string()))?;

        update.apply_to(form);
        Ok(form.clone())
    }
}
