//! JSON-file repository: one file per record under the data root
//! Writes go to a temporary file first and are renamed into place

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FormsError, Result};
use crate::paths::{self, StoreLayout};
use crate::types::FormTemplate;
use crate::workflow::submission_types::{
    FormSequence, NewSubmittedForm, SubmittedForm, SubmittedFormId, SubmittedFormUpdate,
};
use crate::workflow::traits::{SequenceRepository, SubmittedFormRepository, TemplateRepository};

pub struct JsonFileStore {
    layout: StoreLayout,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let layout = StoreLayout::new(root);

        for dir in [layout.templates_dir(), layout.sequences_dir(), layout.submissions_dir()] {
            fs::create_dir_all(&dir)?;
        }

        log::debug!("Opened file store at {}", layout.root().display());
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Validate and store a template, replacing any previous version
    pub fn save_template(&self, template: &FormTemplate) -> Result<()> {
        template.validate()?;
        write_record(&self.layout.template_file(&template.id)?, template)?;
        log::info!("Saved template {} ({})", template.id, template.name);
        Ok(())
    }

    /// Remove a template together with its sequence
    pub fn delete_template(&self, template_id: &str) -> Result<bool> {
        let removed = remove_record(&self.layout.template_file(template_id)?)?;
        self.remove_sequence(template_id)?;

        if removed {
            log::info!("Deleted template {} and its sequence", template_id);
        }
        Ok(removed)
    }

    fn remove_sequence(&self, template_id: &str) -> Result<bool> {
        remove_record(&self.layout.sequence_file(template_id)?)
    }

    pub fn list_templates(&self) -> Result<Vec<FormTemplate>> {
        list_records(&self.layout.templates_dir())
    }

    fn submissions_where<F>(&self, predicate: F) -> Result<Vec<SubmittedForm>>
    where
        F: Fn(&SubmittedForm) -> bool,
    {
        let mut forms: Vec<SubmittedForm> = list_records(&self.layout.submissions_dir())?
            .into_iter()
            .filter(|f| predicate(f))
            .collect();

        forms.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(forms)
    }
}

/// Serialize `record` next to `path`, then rename over it
fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| FormsError::Persistence(format!("Failed to serialize {}: {}", path.display(), e)))?;

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, json)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()))
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| FormsError::Persistence(format!("Failed to read {}: {}", path.display(), e)))
}

fn remove_record(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn list_records<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut records = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !paths::is_record_file(&path) {
            continue;
        }

        match read_record(&path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping unreadable record {}: {}", path.display(), e),
        }
    }

    Ok(records)
}

#[async_trait]
impl TemplateRepository for JsonFileStore {
    async fn find_by_id(&self, template_id: &str) -> Result<Option<FormTemplate>> {
        read_record(&self.layout.template_file(template_id)?)
    }
}

#[async_trait]
impl SequenceRepository for JsonFileStore {
    async fn find_by_template_id(&self, template_id: &str) -> Result<Option<FormSequence>> {
        read_record(&self.layout.sequence_file(template_id)?)
    }

    async fn create(&self, template_id: &str, last_number: u64) -> Result<FormSequence> {
        let sequence = FormSequence::new(template_id, last_number);
        write_record(&self.layout.sequence_file(template_id)?, &sequence)?;
        Ok(sequence)
    }

    async fn update(&self, template_id: &str, last_number: u64) -> Result<FormSequence> {
        let path = self.layout.sequence_file(template_id)?;
        let mut sequence: FormSequence = read_record(&path)?
            .ok_or_else(|| FormsError::Persistence(format!("No sequence for template {}", template_id)))?;

        sequence.last_number = last_number;
        sequence.last_used = Utc::now();
        write_record(&path, &sequence)?;
        Ok(sequence)
    }

    async fn delete(&self, template_id: &str) -> Result<()> {
        self.remove_sequence(template_id)?;
        Ok(())
    }
}

#[async_trait]
impl SubmittedFormRepository for JsonFileStore {
    async fn create(&self, data: NewSubmittedForm) -> Result<SubmittedForm> {
        let form = data.into_record(SubmittedFormId::new());
        write_record(&self.layout.submission_file(form.id.as_str())?, &form)?;
        Ok(form)
    }

    async fn find_by_id(&self, id: &SubmittedFormId) -> Result<Option<SubmittedForm>> {
        read_record(&self.layout.submission_file(id.as_str())?)
    }

    async fn find_by_template_id(&self, template_id: &str) -> Result<Vec<SubmittedForm>> {
        self.submissions_where(|f| f.template_id == template_id)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<SubmittedForm>> {
        self.submissions_where(|f| f.submitted_by == user_id)
    }

    async fn update(&self, id: &SubmittedFormId, update: SubmittedFormUpdate) -> Result<SubmittedForm> {
        let path = self.layout.submission_file(id.as_str())?;
        let mut form: SubmittedForm =
            read_record(&path)?.ok_or_else(|| FormsError::SubmissionNotFound(id.to_string()))?;

        update.apply_to(&mut form);
        write_record(&path, &form)?;
        Ok(form)
    }
}
