//! Strongly typed submission records
//! Delivery status is an explicit state, retry eligibility travels with it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use form_types::FieldValues;

/// Strongly typed SubmittedFormId
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmittedFormId(String);

impl SubmittedFormId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubmittedFormId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmittedFormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery status of a submission towards the external save API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiStatus {
    /// Saved locally, delivery not finished yet
    Pending,
    /// Delivered; terminal
    Success,
    /// Delivery failed; `retryable` is fixed at failure time
    Error { retryable: bool },
}

impl ApiStatus {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Error { retryable: true })
    }
}

/// Per-template counter of the last issued local sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSequence {
    pub template_id: String,
    pub last_number: u64,
    pub last_used: DateTime<Utc>,
}

impl FormSequence {
    pub fn new(template_id: &str, last_number: u64) -> Self {
        Self {
            template_id: template_id.to_string(),
            last_number,
            last_used: Utc::now(),
        }
    }
}

/// A saved submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedForm {
    pub id: SubmittedFormId,
    pub template_id: String,
    pub submitted_by: String,
    /// Kept so a retry emits the same payload metadata as the first attempt
    #[serde(default)]
    pub submitter_email: String,
    pub form_number: String,
    pub field_values: FieldValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_status: Option<ApiStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_error: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Data for creating a submission record
#[derive(Debug, Clone)]
pub struct NewSubmittedForm {
    pub template_id: String,
    pub submitted_by: String,
    pub submitter_email: String,
    pub form_number: String,
    pub field_values: FieldValues,
    pub api_status: Option<ApiStatus>,
    pub submitted_at: DateTime<Utc>,
}

impl NewSubmittedForm {
    pub fn into_record(self, id: SubmittedFormId) -> SubmittedForm {
        SubmittedForm {
            id,
            template_id: self.template_id,
            submitted_by: self.submitted_by,
            submitter_email: self.submitter_email,
            form_number: self.form_number,
            field_values: self.field_values,
            api_response: None,
            api_status: self.api_status,
            api_error: None,
            submitted_at: self.submitted_at,
        }
    }
}

/// Partial update of a submission; `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct SubmittedFormUpdate {
    pub form_number: Option<String>,
    pub api_response: Option<Value>,
    pub api_status: Option<ApiStatus>,
    /// `Some(None)` clears a previous error
    pub api_error: Option<Option<String>>,
}

impl SubmittedFormUpdate {
    /// Delivery succeeded
    pub fn delivered(api_response: Value, form_number: Option<String>) -> Self {
        Self {
            form_number,
            api_response: Some(api_response),
            api_status: Some(ApiStatus::Success),
            api_error: Some(None),
        }
    }

    /// Delivery failed
    pub fn delivery_failed(error: String, retryable: bool) -> Self {
        Self {
            api_status: Some(ApiStatus::Error { retryable }),
            api_error: Some(Some(error)),
            ..Self::default()
        }
    }

    pub fn apply_to(self, form: &mut SubmittedForm) {
        if let Some(form_number) = self.form_number {
            form.form_number = form_number;
        }
        if let Some(api_response) = self.api_response {
            form.api_response = Some(api_response);
        }
        if let Some(api_status) = self.api_status {
            form.api_status = Some(api_status);
        }
        if let Some(api_error) = self.api_error {
            form.api_error = api_error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_status_wire_shape() {
        let status = ApiStatus::Error { retryable: true };
        let value = serde_json::to_value(status).unwrap();

        assert_eq!(value, json!({"status": "error", "retryable": true}));
        assert_eq!(serde_json::from_value::<ApiStatus>(json!({"status": "pending"})).unwrap(), ApiStatus::Pending);
    }

    #[test]
    fn test_only_retryable_errors_are_retryable() {
        assert!(ApiStatus::Error { retryable: true }.is_retryable());
        assert!(!ApiStatus::Error { retryable: false }.is_retryable());
        assert!(!ApiStatus::Success.is_retryable());
    }

    #[test]
    fn test_update_clears_error_on_delivery() {
        let mut form = NewSubmittedForm {
            template_id: "tpl".to_string(),
            submitted_by: "user".to_string(),
            submitter_email: "user@example.com".to_string(),
            form_number: "001".to_string(),
            field_values: FieldValues::new(),
            api_status: Some(ApiStatus::Pending),
            submitted_at: Utc::now(),
        }
        .into_record(SubmittedFormId::new());

        SubmittedFormUpdate::delivery_failed("HTTP 500: boom".to_string(), true).apply_to(&mut form);
        assert_eq!(form.api_status, Some(ApiStatus::Error { retryable: true }));
        assert_eq!(form.api_error.as_deref(), Some("HTTP 500: boom"));

        SubmittedFormUpdate::delivered(json!({"ok": true}), None).apply_to(&mut form);
        assert_eq!(form.api_status, Some(ApiStatus::Success));
        assert_eq!(form.api_error, None);
        assert_eq!(form.form_number, "001");
    }
}
