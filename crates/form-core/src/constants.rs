/// Pipeline constants

/// Timeout applied to external API calls when the template does not set one
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Body substituted for a 2xx response whose body is empty or not JSON
pub const SUCCESS_FALLBACK_STATUS: &str = "success";

/// Build the synthetic value key of a table cell
pub fn table_cell_key(table_id: &str, column_id: &str, row: usize) -> String {
    format!("{}_{}_row{}", table_id, column_id, row)
}
