//! Shared request/result types for the form submission pipeline
//!
//! These are the shapes exchanged with the UI or any other calling process.
//! They serialize in camelCase so the desktop front-end can consume them as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field values keyed by field id (table cells use `{table}_{column}_row{n}` keys)
pub type FieldValues = Map<String, Value>;

/// Input for a form submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormRequest {
    pub template_id: String,
    pub user_id: String,
    pub user_email: String,
    #[serde(default)]
    pub values: FieldValues,
}

impl SubmitFormRequest {
    pub fn new(template_id: &str, user_id: &str, user_email: &str, values: FieldValues) -> Self {
        Self {
            template_id: template_id.to_string(),
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            values,
        }
    }
}

/// Result of a form submission
///
/// `success == true` always means the submission is durably saved locally,
/// regardless of whether external delivery succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_form_id: Option<String>,
}

impl SubmitFormResult {
    /// Submission rejected or failed without a usable saved record
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Result of retrying the delivery of a saved submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_response: Option<Value>,
}

impl RetryResult {
    pub fn delivered(api_response: Value) -> Self {
        Self {
            success: true,
            error: None,
            api_response: Some(api_response),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            api_response: None,
        }
    }
}

/// Folio obtained without submitting (preview or external folio API)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolioPreview {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FolioPreview {
    pub fn found(form_number: String) -> Self {
        Self {
            success: true,
            form_number: Some(form_number),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            form_number: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_request_from_camel_case() {
        let request: SubmitFormRequest = serde_json::from_value(json!({
            "templateId": "tpl-1",
            "userId": "user-1",
            "userEmail": "ana@example.com",
            "values": {"name": "Ana"}
        }))
        .unwrap();

        assert_eq!(request.template_id, "tpl-1");
        assert_eq!(request.user_email, "ana@example.com");
        assert_eq!(request.values["name"], "Ana");
    }

    #[test]
    fn test_failed_result_omits_empty_fields() {
        let result = SubmitFormResult::failed("template not found");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value, json!({"success": false, "error": "template not found"}));
    }
}
