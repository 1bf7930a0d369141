//! Submission orchestrator: folio, local save, delivery and reconciliation

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use form_types::{FieldValues, FolioPreview, SubmitFormRequest, SubmitFormResult};

use super::context::PipelineContext;
use super::submission_types::{ApiStatus, NewSubmittedForm, SubmittedForm, SubmittedFormUpdate};
use crate::clients::DeliveryTarget;
use crate::error::{FormsError, Result};
use crate::services::{extract_folio, folio_generator, map_to_payload, PayloadContext};
use crate::types::{is_empty_value, ApiConfiguration, FolioApiConfig, FolioSource, FormTemplate, NumerationConfig};

/// How a delivery attempt ended once the saved record has been updated
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered { response: Value, form_number: String },
    Failed { error: String, retryable: bool },
}

/// Entry point for form submissions and folio lookups
pub struct SubmissionOrchestrator {
    context: Arc<PipelineContext>,
}

impl SubmissionOrchestrator {
    pub fn new(context: Arc<PipelineContext>) -> Self {
        Self { context }
    }

    /// Submit a filled-in form; errors are folded into the result
    pub async fn submit_form(&self, request: SubmitFormRequest) -> SubmitFormResult {
        let template_id = request.template_id.clone();

        match self.process_submission(request).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Submission for template {} failed: {}", template_id, e);
                SubmitFormResult::failed(e.to_string())
            }
        }
    }

    async fn process_submission(&self, request: SubmitFormRequest) -> Result<SubmitFormResult> {
        log::info!("Processing submission for template {} by {}", request.template_id, request.user_id);

        let template = self.context.load_template(&request.template_id).await?;
        let api = template.active_api();
        let mut values = request.values;

        // Checked before a folio is issued so a rejected submission never consumes a number
        let validate = template
            .api_configuration
            .as_ref()
            .map(|a| a.before_send.validate_required)
            .unwrap_or(false);
        if validate {
            validate_required(&template, &values)?;
        }

        let mut form_number = String::new();
        if let Some(numeration) = template.active_numeration() {
            if let Some(folio) = self.issue_folio(&template.id, numeration).await? {
                log::info!("Issued folio {} for template {}", folio, template.id);
                if !numeration.field_id.is_empty() {
                    values.insert(numeration.field_id.clone(), Value::String(folio.clone()));
                }
                form_number = folio;
            }
        }

        let form = self
            .context
            .submissions
            .create(NewSubmittedForm {
                template_id: template.id.clone(),
                submitted_by: request.user_id,
                submitter_email: request.user_email,
                form_number: form_number.clone(),
                field_values: values,
                api_status: api.map(|_| ApiStatus::Pending),
                submitted_at: Utc::now(),
            })
            .await?;

        log::info!("Saved submission {} for template {}", form.id, template.id);

        let Some(api) = api else {
            return Ok(SubmitFormResult {
                success: true,
                form_number: Some(form_number),
                submitted_form_id: Some(form.id.to_string()),
                ..SubmitFormResult::default()
            });
        };

        let outcome = deliver_submission(&self.context, &template, api, &form).await?;

        Ok(match outcome {
            DeliveryOutcome::Delivered { response, form_number } => SubmitFormResult {
                success: true,
                form_number: Some(form_number),
                api_response: Some(response),
                error: None,
                submitted_form_id: Some(form.id.to_string()),
            },
            DeliveryOutcome::Failed { error, retryable: true } => SubmitFormResult {
                success: true,
                form_number: Some(form_number),
                api_response: None,
                error: Some(format!("Saved locally; delivery to the API failed: {}", error)),
                submitted_form_id: Some(form.id.to_string()),
            },
            DeliveryOutcome::Failed { error, retryable: false } => {
                SubmitFormResult::failed(format!("Delivery to the API failed: {}", error))
            }
        })
    }

    /// Folio issued before saving; `None` when the save API decides it
    async fn issue_folio(&self, template_id: &str, numeration: &NumerationConfig) -> Result<Option<String>> {
        match &numeration.source {
            FolioSource::Local => {
                let today = Utc::now().date_naive();
                let folio = self
                    .context
                    .sequences
                    .allocate(template_id, numeration.start_from, |sequence| {
                        folio_generator::generate(numeration, sequence, today)
                    })
                    .await?;
                Ok(Some(folio))
            }
            FolioSource::ExternalApi(folio_api) => self.fetch_folio(folio_api).await.map(Some),
            FolioSource::ApiResponse { .. } => {
                log::info!("Folio for template {} will be read from the API response", template_id);
                Ok(None)
            }
        }
    }

    async fn fetch_folio(&self, folio_api: &FolioApiConfig) -> Result<String> {
        let response = self
            .context
            .delivery
            .send(&DeliveryTarget::from(folio_api), None)
            .await?;

        extract_folio(&response, &folio_api.response_path)
    }

    /// Folio the next local submission would get; never advances the sequence
    pub async fn preview_next_folio(&self, template_id: &str) -> FolioPreview {
        match self.next_local_folio(template_id).await {
            Ok(folio) => FolioPreview::found(folio),
            Err(e) => {
                log::warn!("Folio preview for template {} failed: {}", template_id, e);
                FolioPreview::failed(e.to_string())
            }
        }
    }

    async fn next_local_folio(&self, template_id: &str) -> Result<String> {
        let template = self.context.load_template(template_id).await?;
        let numeration = enabled_numeration(&template)?;

        match &numeration.source {
            FolioSource::Local => {
                let next = self
                    .context
                    .sequences
                    .peek_next(&template.id, numeration.start_from)
                    .await?;
                Ok(folio_generator::format_folio(numeration, next, Utc::now().date_naive()))
            }
            FolioSource::ExternalApi(_) => Err(FormsError::FolioGeneration(
                "folio is issued by the folio API and cannot be previewed".to_string(),
            )),
            FolioSource::ApiResponse { .. } => Err(FormsError::FolioGeneration(
                "folio is assigned by the save API after delivery".to_string(),
            )),
        }
    }

    /// Ask the template's folio API for a folio; the local sequence is untouched
    pub async fn folio_from_external_api(&self, template_id: &str) -> FolioPreview {
        match self.external_folio(template_id).await {
            Ok(folio) => {
                log::info!("Folio API returned {} for template {}", folio, template_id);
                FolioPreview::found(folio)
            }
            Err(e) => {
                log::warn!("Folio API lookup for template {} failed: {}", template_id, e);
                FolioPreview::failed(e.to_string())
            }
        }
    }

    async fn external_folio(&self, template_id: &str) -> Result<String> {
        let template = self.context.load_template(template_id).await?;

        match &enabled_numeration(&template)?.source {
            FolioSource::ExternalApi(folio_api) => self.fetch_folio(folio_api).await,
            _ => Err(FormsError::FolioGeneration(
                "template does not use a folio API".to_string(),
            )),
        }
    }
}

fn enabled_numeration(template: &FormTemplate) -> Result<&NumerationConfig> {
    template
        .active_numeration()
        .ok_or_else(|| FormsError::FolioGeneration(format!("numeration is not enabled for template {}", template.id)))
}

/// Every required template field and required mapping must have a value
///
/// The numeration target field is skipped: the pipeline fills it.
pub fn validate_required(template: &FormTemplate, values: &FieldValues) -> Result<()> {
    let folio_field = template.active_numeration().map(|n| n.field_id.as_str());

    let required_ids = template
        .fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.id.as_str())
        .chain(
            template
                .field_mappings
                .iter()
                .filter(|m| m.required)
                .map(|m| m.field_id.as_str()),
        );

    for field_id in required_ids {
        if Some(field_id) == folio_field {
            continue;
        }
        if is_empty_value(values.get(field_id)) {
            return Err(FormsError::Validation(format!(
                "Field \"{}\" is required",
                template.field_display_name(field_id)
            )));
        }
    }

    Ok(())
}

/// Map the stored values, deliver them and record the outcome on the saved form
///
/// Only a failure to update the record is returned as `Err`.
pub(crate) async fn deliver_submission(
    context: &PipelineContext,
    template: &FormTemplate,
    api: &ApiConfiguration,
    form: &SubmittedForm,
) -> Result<DeliveryOutcome> {
    let payload = map_to_payload(
        template,
        &form.field_values,
        &PayloadContext {
            form_number: &form.form_number,
            submitted_by: &form.submitter_email,
            submitted_at: form.submitted_at,
        },
    );

    log::info!("Delivering submission {} to {}", form.id, api.endpoint);

    match context.delivery.send(&DeliveryTarget::from(api), Some(&payload)).await {
        Ok(response) => {
            let form_number = resolve_form_number(template, form, &response);
            let update = SubmittedFormUpdate::delivered(response.clone(), Some(form_number.clone()));
            context.submissions.update(&form.id, update).await?;

            log::info!("Submission {} delivered with folio {:?}", form.id, form_number);
            Ok(DeliveryOutcome::Delivered { response, form_number })
        }
        Err(e) => {
            let retryable = match form.api_status {
                Some(ApiStatus::Error { retryable }) => retryable,
                _ => api.on_error.retryable,
            };
            let error = e.to_string();
            context
                .submissions
                .update(&form.id, SubmittedFormUpdate::delivery_failed(error.clone(), retryable))
                .await?;

            log::warn!("Delivery of submission {} failed (retryable: {}): {}", form.id, retryable, error);
            Ok(DeliveryOutcome::Failed { error, retryable })
        }
    }
}

/// Folio to keep after a successful delivery
///
/// An issued folio never changes. In api-response mode an empty folio is read
/// from the response; extraction failures are logged and leave it empty.
fn resolve_form_number(template: &FormTemplate, form: &SubmittedForm, response: &Value) -> String {
    let folio_path = match template.active_numeration().map(|n| &n.source) {
        Some(FolioSource::ApiResponse { folio_path }) if form.form_number.is_empty() => folio_path,
        _ => return form.form_number.clone(),
    };

    match extract_folio(response, folio_path) {
        Ok(folio) => {
            log::info!("Folio {} read from the API response of submission {}", folio, form.id);
            folio
        }
        Err(e) => {
            log::warn!("Submission {} saved without folio: {}", form.id, e);
            form.form_number.clone()
        }
    }
}
