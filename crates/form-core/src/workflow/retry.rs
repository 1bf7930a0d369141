//! Retry delivery of saved submissions whose first delivery failed

use std::sync::Arc;

use form_types::RetryResult;

use super::context::PipelineContext;
use super::orchestrator::{deliver_submission, DeliveryOutcome};
use super::submission_types::{ApiStatus, SubmittedForm, SubmittedFormId};
use crate::error::{FormsError, Result};

/// Summary of a bulk retry over one template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrySweep {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Re-delivers stored field values; never issues a new folio
pub struct RetryService {
    context: Arc<PipelineContext>,
}

impl RetryService {
    pub fn new(context: Arc<PipelineContext>) -> Self {
        Self { context }
    }

    pub async fn retry_submission(&self, id: &SubmittedFormId) -> RetryResult {
        match self.try_retry(id).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Retry of submission {} failed: {}", id, e);
                RetryResult::failed(e.to_string())
            }
        }
    }

    async fn try_retry(&self, id: &SubmittedFormId) -> Result<RetryResult> {
        let form = self
            .context
            .submissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| FormsError::SubmissionNotFound(id.to_string()))?;

        self.retry_form(&form).await
    }

    async fn retry_form(&self, form: &SubmittedForm) -> Result<RetryResult> {
        match form.api_status {
            Some(ApiStatus::Error { retryable: true }) => {}
            Some(ApiStatus::Error { retryable: false }) => {
                return Err(FormsError::NotRetryable(format!(
                    "submission {} failed permanently",
                    form.id
                )))
            }
            _ => {
                return Err(FormsError::NotRetryable(format!(
                    "submission {} has no failed delivery",
                    form.id
                )))
            }
        }

        let template = self.context.load_template(&form.template_id).await?;
        let api = template.active_api().ok_or_else(|| {
            FormsError::NotRetryable(format!("API delivery is disabled for template {}", template.id))
        })?;

        log::info!("Retrying delivery of submission {} (folio {:?})", form.id, form.form_number);

        Ok(match deliver_submission(&self.context, &template, api, form).await? {
            DeliveryOutcome::Delivered { response, .. } => RetryResult::delivered(response),
            DeliveryOutcome::Failed { error, .. } => RetryResult::failed(error),
        })
    }

    /// Retry every retryable failed submission of a template once, oldest first
    pub async fn retry_failed(&self, template_id: &str) -> Result<RetrySweep> {
        let mut pending: Vec<SubmittedForm> = self
            .context
            .submissions
            .find_by_template_id(template_id)
            .await?
            .into_iter()
            .filter(|f| f.api_status.map(|s| s.is_retryable()).unwrap_or(false))
            .collect();
        pending.reverse();

        let mut sweep = RetrySweep::default();
        for form in &pending {
            sweep.attempted += 1;
            match self.retry_form(form).await {
                Ok(result) if result.success => sweep.delivered += 1,
                Ok(result) => {
                    sweep.failed += 1;
                    log::warn!("Submission {} still failing: {:?}", form.id, result.error);
                }
                Err(e) => {
                    sweep.failed += 1;
                    log::error!("Retry of submission {} aborted: {}", form.id, e);
                }
            }
        }

        log::info!(
            "Retry sweep for template {}: {} attempted, {} delivered, {} failed",
            template_id,
            sweep.attempted,
            sweep.delivered,
            sweep.failed
        );
        Ok(sweep)
    }
}
