//! Translate submitted field values into the save API's JSON contract

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use form_types::FieldValues;

use crate::constants::table_cell_key;
use crate::types::{is_empty_value, DataFormat, FormTemplate, TableMapping, Transform};

/// Submission metadata carried into the payload
#[derive(Debug, Clone)]
pub struct PayloadContext<'a> {
    /// Empty while the folio is still to be decided by the save API
    pub form_number: &'a str,
    pub submitted_by: &'a str,
    pub submitted_at: DateTime<Utc>,
}

/// Build the outgoing payload in the template's configured shape
pub fn map_to_payload(template: &FormTemplate, values: &FieldValues, context: &PayloadContext<'_>) -> Value {
    let fields = map_fields(template, values);
    let tables = map_tables(template, values);
    let submitted_at = context.submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    let format = template
        .api_configuration
        .as_ref()
        .map(|api| api.data_format)
        .unwrap_or_default();

    match format {
        DataFormat::Flat => {
            let mut flat = fields;
            for (key, rows) in tables {
                flat.insert(format!("{}_items", key), rows);
            }
            // Metadata last: unmapped field ids must not replace it
            flat.insert("folio".to_string(), json!(context.form_number));
            flat.insert("submittedBy".to_string(), json!(context.submitted_by));
            flat.insert("submittedAt".to_string(), json!(submitted_at));
            Value::Object(flat)
        }
        // Custom has no templating of its own yet and ships the structured shape
        DataFormat::Structured | DataFormat::Custom => json!({
            "metadata": {
                "formNumber": context.form_number,
                "templateId": template.id,
                "templateName": template.name,
                "submittedBy": context.submitted_by,
                "submittedAt": submitted_at,
            },
            "fields": fields,
            "tables": tables,
        }),
    }
}

/// Mapped fields; identity when the template defines no field mappings
pub fn map_fields(template: &FormTemplate, values: &FieldValues) -> Map<String, Value> {
    if template.field_mappings.is_empty() {
        return values.clone();
    }

    let mut mapped = Map::new();
    for mapping in &template.field_mappings {
        let value = match values.get(&mapping.field_id) {
            current if is_empty_value(current) && mapping.default_value.is_some() => {
                mapping.default_value.clone()
            }
            current => current.cloned(),
        };

        // Absent with no default: key omitted
        if let Some(value) = value {
            mapped.insert(mapping.api_key.clone(), transform_present(mapping.transform, value));
        }
    }
    mapped
}

/// Rows of every enabled table mapping, keyed by the table's API key
pub fn map_tables(template: &FormTemplate, values: &FieldValues) -> Map<String, Value> {
    template
        .table_mappings
        .iter()
        .filter(|mapping| mapping.enabled && template.table(&mapping.table_id).is_some())
        .map(|mapping| (mapping.api_key.clone(), Value::Array(collect_rows(mapping, values))))
        .collect()
}

/// Scan `row0, row1, ...` until the first row with no populated cell
fn collect_rows(mapping: &TableMapping, values: &FieldValues) -> Vec<Value> {
    let mut rows = Vec::new();

    for row_index in 0.. {
        let mut row = Map::new();
        let mut has_data = false;

        for column in &mapping.column_mappings {
            let cell = values.get(&table_cell_key(&mapping.table_id, &column.column_id, row_index));
            let value = if is_empty_value(cell) {
                Value::String(String::new())
            } else {
                has_data = true;
                cell.cloned().map(|v| column.transform.apply(v)).unwrap_or_default()
            };
            row.insert(column.api_key.clone(), value);
        }

        if !has_data {
            break;
        }
        rows.push(Value::Object(row));
    }

    rows
}

fn transform_present(transform: Transform, value: Value) -> Value {
    if value.is_null() {
        value
    } else {
        transform.apply(value)
    }
}
