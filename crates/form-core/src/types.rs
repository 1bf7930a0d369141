//! Template configuration types consumed by the submission pipeline
//!
//! The JSON shape follows what the template editor stores (camelCase). Where
//! the stored shape is loose, raw structs are converted with `TryFrom` so the
//! rest of the pipeline only ever sees valid, strongly typed configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{FormsError, Result};

/// A saved form template, as far as the submission pipeline is concerned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FormField>,

    #[serde(default)]
    pub tables: Vec<TableDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_configuration: Option<ApiConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeration_config: Option<NumerationConfig>,

    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,

    #[serde(default)]
    pub table_mappings: Vec<TableMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub id: String,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    pub id: String,
    #[serde(default)]
    pub header: String,
}

/// HTTP verbs accepted by the save API and the folio API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_save_method() -> HttpMethod {
    HttpMethod::Post
}

fn default_folio_method() -> HttpMethod {
    HttpMethod::Get
}

/// Authentication scheme for an external endpoint
///
/// Credentials may be left blank; no header is sent until they are filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Authentication {
    #[default]
    None,
    Bearer {
        #[serde(default)]
        token: String,
    },
    ApiKey {
        #[serde(rename = "apiKey", default)]
        api_key: String,
        #[serde(rename = "apiKeyHeader", default)]
        header: String,
    },
    Basic {
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },
}

/// Shape of the JSON payload sent to the save API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Structured,
    Flat,
    /// Selectable, but currently emitted with the structured shape
    Custom,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeSend {
    #[serde(default)]
    pub validate_required: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnError {
    #[serde(default)]
    pub retryable: bool,
}

/// Save API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_save_method")]
    pub method: HttpMethod,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub authentication: Authentication,

    #[serde(default)]
    pub data_format: DataFormat,

    #[serde(default)]
    pub before_send: BeforeSend,

    #[serde(default)]
    pub on_error: OnError,

    /// Milliseconds; the pipeline default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// How the folio string is laid out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolioFormat {
    /// `prefix + seq + suffix`
    Sequential,
    /// `prefix + YYYYMMDD + "-" + seq + suffix`
    DateBased,
    /// Pattern with `{prefix}`, `{suffix}`, `{seq}` and `{date}` placeholders
    Custom { pattern: String },
}

/// Dedicated folio API used when the folio is issued externally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolioApiConfig {
    pub endpoint: String,
    pub method: HttpMethod,
    pub headers: BTreeMap<String, String>,
    pub authentication: Authentication,
    pub timeout_ms: Option<u64>,
    /// Dot path of the folio inside the folio API response
    pub response_path: String,
}

/// Where the folio of a submission comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolioSource {
    /// Generated from the local per-template sequence
    Local,
    /// Fetched from a dedicated folio API before saving
    ExternalApi(FolioApiConfig),
    /// Read from the save API response after delivery
    ApiResponse { folio_path: String },
}

/// Folio numbering configuration of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNumerationConfig", into = "RawNumerationConfig")]
pub struct NumerationConfig {
    pub enabled: bool,
    pub source: FolioSource,
    pub format: FolioFormat,
    pub prefix: String,
    pub suffix: String,
    pub padding: usize,
    /// Field that receives the folio
    pub field_id: String,
    pub start_from: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawFolioSource {
    #[default]
    Local,
    Api,
    ApiResponse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawFolioKind {
    #[default]
    Sequential,
    DateBased,
    Custom,
}

/// Stored shape of `numerationConfig`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNumerationConfig {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    source: RawFolioSource,
    #[serde(rename = "type", default)]
    kind: RawFolioKind,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    padding: usize,
    #[serde(default)]
    field_id: String,
    #[serde(default)]
    start_from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_authentication: Option<Authentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_response_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_response_folio_path: Option<String>,
}

fn non_empty(value: Option<String>, what: &str) -> std::result::Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("{} is required", what)),
    }
}

impl TryFrom<RawNumerationConfig> for NumerationConfig {
    type Error = String;

    fn try_from(raw: RawNumerationConfig) -> std::result::Result<Self, Self::Error> {
        let source = match raw.source {
            RawFolioSource::Local => FolioSource::Local,
            RawFolioSource::Api => {
                let method = raw.api_method.unwrap_or_else(default_folio_method);
                if !matches!(method, HttpMethod::Get | HttpMethod::Post) {
                    return Err(format!("folio API method must be GET or POST, got {}", method));
                }
                FolioSource::ExternalApi(FolioApiConfig {
                    endpoint: non_empty(raw.api_endpoint, "apiEndpoint")?,
                    method,
                    headers: raw.api_headers.unwrap_or_default(),
                    authentication: raw.api_authentication.unwrap_or_default(),
                    timeout_ms: raw.api_timeout,
                    response_path: non_empty(raw.api_response_path, "apiResponsePath")?,
                })
            }
            RawFolioSource::ApiResponse => FolioSource::ApiResponse {
                folio_path: non_empty(raw.api_response_folio_path, "apiResponseFolioPath")?,
            },
        };

        let format = match raw.kind {
            RawFolioKind::Sequential => FolioFormat::Sequential,
            RawFolioKind::DateBased => FolioFormat::DateBased,
            RawFolioKind::Custom => FolioFormat::Custom {
                pattern: non_empty(raw.custom_pattern, "customPattern")?,
            },
        };

        Ok(Self {
            enabled: raw.enabled,
            source,
            format,
            prefix: raw.prefix.unwrap_or_default(),
            suffix: raw.suffix.unwrap_or_default(),
            padding: raw.padding,
            field_id: raw.field_id,
            start_from: raw.start_from.unwrap_or(0),
        })
    }
}

impl From<NumerationConfig> for RawNumerationConfig {
    fn from(config: NumerationConfig) -> Self {
        let mut raw = RawNumerationConfig {
            enabled: config.enabled,
            prefix: Some(config.prefix),
            suffix: Some(config.suffix),
            padding: config.padding,
            field_id: config.field_id,
            start_from: Some(config.start_from),
            ..Default::default()
        };

        match config.format {
            FolioFormat::Sequential => raw.kind = RawFolioKind::Sequential,
            FolioFormat::DateBased => raw.kind = RawFolioKind::DateBased,
            FolioFormat::Custom { pattern } => {
                raw.kind = RawFolioKind::Custom;
                raw.custom_pattern = Some(pattern);
            }
        }

        match config.source {
            FolioSource::Local => raw.source = RawFolioSource::Local,
            FolioSource::ExternalApi(api) => {
                raw.source = RawFolioSource::Api;
                raw.api_endpoint = Some(api.endpoint);
                raw.api_method = Some(api.method);
                raw.api_headers = Some(api.headers);
                raw.api_authentication = Some(api.authentication);
                raw.api_timeout = api.timeout_ms;
                raw.api_response_path = Some(api.response_path);
            }
            FolioSource::ApiResponse { folio_path } => {
                raw.source = RawFolioSource::ApiResponse;
                raw.api_response_folio_path = Some(folio_path);
            }
        }

        raw
    }
}

/// String transform applied to a mapped value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Trim,
}

impl Transform {
    /// Apply the transform; anything but `None` coerces the value to a string
    pub fn apply(self, value: Value) -> Value {
        let text = match self {
            Self::None => return value,
            _ => coerce_to_string(&value),
        };

        Value::String(match self {
            Self::Uppercase => text.to_uppercase(),
            Self::Lowercase => text.to_lowercase(),
            Self::Trim => text.trim().to_string(),
            Self::None => text,
        })
    }
}

/// String form of a JSON value (strings unquoted)
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A value counts as empty when missing, null or the empty string
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub field_id: String,
    pub api_key: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub column_id: String,
    pub api_key: String,
    #[serde(default)]
    pub transform: Transform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMapping {
    pub table_id: String,
    pub api_key: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
}

/// Keys the flat payload shape writes next to the mapped fields
pub const FLAT_RESERVED_KEYS: [&str; 3] = ["folio", "submittedBy", "submittedAt"];

impl FormTemplate {
    /// Numeration config, only when enabled
    pub fn active_numeration(&self) -> Option<&NumerationConfig> {
        self.numeration_config.as_ref().filter(|n| n.enabled)
    }

    /// Save API config, only when enabled
    pub fn active_api(&self) -> Option<&ApiConfiguration> {
        self.api_configuration.as_ref().filter(|a| a.enabled)
    }

    pub fn table(&self, table_id: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    /// Display name of a field, falling back to its id
    pub fn field_display_name<'a>(&'a self, field_id: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.id == field_id)
            .map(|f| f.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(field_id)
    }

    /// Check the cross-field invariants that serde alone cannot express
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FormsError::InvalidTemplate(format!("{}: {}", self.id, msg)));

        if let Some(api) = self.active_api() {
            if api.endpoint.trim().is_empty() {
                return invalid("enabled API configuration has no endpoint".to_string());
            }
            if api.method == HttpMethod::Get {
                return invalid("save API method must be POST, PUT or PATCH".to_string());
            }
        }

        if let Some(numeration) = self.active_numeration() {
            if matches!(numeration.source, FolioSource::ApiResponse { .. }) && self.active_api().is_none() {
                return invalid("folio source api-response requires an enabled API configuration".to_string());
            }
        }

        let mut field_ids = HashSet::new();
        let mut field_keys = HashSet::new();
        for mapping in &self.field_mappings {
            if !field_ids.insert(mapping.field_id.as_str()) {
                return invalid(format!("field {} is mapped more than once", mapping.field_id));
            }
            if !field_keys.insert(mapping.api_key.as_str()) {
                return invalid(format!("API key {} is used by more than one field", mapping.api_key));
            }
        }

        let mut table_keys = HashSet::new();
        for table in self.table_mappings.iter().filter(|t| t.enabled) {
            if !table_keys.insert(table.api_key.as_str()) {
                return invalid(format!("API key {} is used by more than one table", table.api_key));
            }

            let mut column_keys = HashSet::new();
            for column in &table.column_mappings {
                if !column_keys.insert(column.api_key.as_str()) {
                    return invalid(format!(
                        "API key {} is used by more than one column of table {}",
                        column.api_key, table.table_id
                    ));
                }
            }
        }

        let flat = self
            .active_api()
            .map(|api| api.data_format == DataFormat::Flat)
            .unwrap_or(false);

        if flat {
            for key in &field_keys {
                let items_collision = table_keys.iter().any(|t| format!("{}_items", t) == *key);
                if FLAT_RESERVED_KEYS.contains(key) || items_collision {
                    return invalid(format!("API key {} collides with a key of the flat payload", key));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numeration(value: Value) -> std::result::Result<NumerationConfig, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_local_numeration_defaults() {
        let config = numeration(json!({
            "enabled": true,
            "type": "sequential",
            "padding": 5,
            "fieldId": "folio"
        }))
        .unwrap();

        assert_eq!(config.source, FolioSource::Local);
        assert_eq!(config.format, FolioFormat::Sequential);
        assert_eq!(config.prefix, "");
        assert_eq!(config.start_from, 0);
    }

    #[test]
    fn test_api_source_requires_endpoint_and_path() {
        let missing_path = numeration(json!({
            "enabled": true,
            "source": "api",
            "type": "sequential",
            "padding": 3,
            "fieldId": "folio",
            "apiEndpoint": "https://folios.example.com/next"
        }));
        assert!(missing_path.is_err());

        let config = numeration(json!({
            "enabled": true,
            "source": "api",
            "type": "sequential",
            "padding": 3,
            "fieldId": "folio",
            "apiEndpoint": "https://folios.example.com/next",
            "apiResponsePath": "data.folio",
            "apiAuthentication": {"type": "bearer", "token": "t0k"}
        }))
        .unwrap();

        match config.source {
            FolioSource::ExternalApi(api) => {
                assert_eq!(api.method, HttpMethod::Get);
                assert_eq!(api.response_path, "data.folio");
                assert_eq!(api.authentication, Authentication::Bearer { token: "t0k".to_string() });
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_api_response_source_requires_folio_path() {
        let result = numeration(json!({
            "enabled": true,
            "source": "api-response",
            "type": "sequential",
            "padding": 3,
            "fieldId": "folio"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_type_requires_pattern() {
        let result = numeration(json!({
            "enabled": true,
            "type": "custom",
            "padding": 3,
            "fieldId": "folio"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_numeration_survives_serialization() {
        let config = numeration(json!({
            "enabled": true,
            "source": "api-response",
            "type": "custom",
            "customPattern": "{prefix}{seq}",
            "prefix": "ORD-",
            "padding": 4,
            "fieldId": "folio",
            "apiResponseFolioPath": "data.folio"
        }))
        .unwrap();

        let stored = serde_json::to_value(&config).unwrap();
        assert_eq!(stored["source"], "api-response");
        assert_eq!(stored["type"], "custom");

        let reloaded: NumerationConfig = serde_json::from_value(stored).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_transform_coerces_to_string() {
        assert_eq!(Transform::Uppercase.apply(json!("n/a")), json!("N/A"));
        assert_eq!(Transform::Trim.apply(json!("  x ")), json!("x"));
        assert_eq!(Transform::Lowercase.apply(json!(42)), json!("42"));
        assert_eq!(Transform::None.apply(json!(42)), json!(42));
    }

    #[test]
    fn test_authentication_wire_shape() {
        let auth: Authentication = serde_json::from_value(json!({
            "type": "apikey",
            "apiKey": "secret",
            "apiKeyHeader": "X-API-Key"
        }))
        .unwrap();

        assert_eq!(
            auth,
            Authentication::ApiKey {
                api_key: "secret".to_string(),
                header: "X-API-Key".to_string()
            }
        );
    }

    fn template(value: Value) -> FormTemplate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_rejects_duplicate_api_keys() {
        let tpl = template(json!({
            "id": "tpl",
            "name": "Order",
            "fieldMappings": [
                {"fieldId": "a", "apiKey": "name"},
                {"fieldId": "b", "apiKey": "name"}
            ]
        }));

        let err = tpl.validate().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_validate_rejects_api_response_without_api() {
        let tpl = template(json!({
            "id": "tpl",
            "name": "Order",
            "numerationConfig": {
                "enabled": true,
                "source": "api-response",
                "type": "sequential",
                "padding": 0,
                "fieldId": "folio",
                "apiResponseFolioPath": "folio"
            }
        }));

        assert!(matches!(tpl.validate(), Err(FormsError::InvalidTemplate(_))));
    }

    #[test]
    fn test_validate_rejects_reserved_flat_keys() {
        let tpl = template(json!({
            "id": "tpl",
            "name": "Order",
            "apiConfiguration": {
                "enabled": true,
                "endpoint": "https://api.example.com/orders",
                "dataFormat": "flat"
            },
            "fieldMappings": [{"fieldId": "n", "apiKey": "folio"}]
        }));

        assert!(tpl.validate().is_err());
    }

    #[test]
    fn test_field_display_name_falls_back_to_id() {
        let tpl = template(json!({
            "id": "tpl",
            "name": "Order",
            "fields": [{"id": "customer", "name": "Customer", "required": true}]
        }));

        assert_eq!(tpl.field_display_name("customer"), "Customer");
        assert_eq!(tpl.field_display_name("unknown"), "unknown");
    }
}
