//! Folio formatting for locally numbered templates

use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::types::{FolioFormat, NumerationConfig};
use crate::workflow::submission_types::FormSequence;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{(prefix|suffix|seq|date)\}").expect("placeholder pattern is valid")
    })
}

/// Zero-fill `number` to `width` digits; wider numbers are kept whole
pub fn zero_pad(number: u64, width: usize) -> String {
    format!("{:0>width$}", number, width = width)
}

/// `YYYYMMDD`
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Values substituted into a custom pattern
#[derive(Debug, Clone)]
pub struct PatternVars<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
    pub seq: &'a str,
    pub date: &'a str,
}

/// Replace every `{prefix}`, `{suffix}`, `{seq}` and `{date}` in `pattern`
///
/// Substituted text is not re-scanned, so a prefix containing `{seq}` stays literal.
pub fn apply_custom_pattern(pattern: &str, vars: &PatternVars<'_>) -> String {
    placeholder_regex()
        .replace_all(pattern, |caps: &Captures<'_>| match &caps[1] {
            "prefix" => vars.prefix.to_string(),
            "suffix" => vars.suffix.to_string(),
            "seq" => vars.seq.to_string(),
            _ => vars.date.to_string(),
        })
        .into_owned()
}

/// Render the folio for sequence number `number` on `date`
pub fn format_folio(config: &NumerationConfig, number: u64, date: NaiveDate) -> String {
    let seq = zero_pad(number, config.padding);

    match &config.format {
        FolioFormat::Sequential => format!("{}{}{}", config.prefix, seq, config.suffix),
        FolioFormat::DateBased => format!(
            "{}{}-{}{}",
            config.prefix,
            date_stamp(date),
            seq,
            config.suffix
        ),
        FolioFormat::Custom { pattern } => apply_custom_pattern(
            pattern,
            &PatternVars {
                prefix: &config.prefix,
                suffix: &config.suffix,
                seq: &seq,
                date: &date_stamp(date),
            },
        ),
    }
}

/// Next folio after `sequence`, with the number the sequence must advance to
pub fn generate(config: &NumerationConfig, sequence: &FormSequence, date: NaiveDate) -> (String, u64) {
    let next_number = sequence.last_number + 1;
    (format_folio(config, next_number, date), next_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FolioSource;

    fn config(format: FolioFormat, prefix: &str, suffix: &str, padding: usize) -> NumerationConfig {
        NumerationConfig {
            enabled: true,
            source: FolioSource::Local,
            format,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            padding,
            field_id: "folio".to_string(),
            start_from: 0,
        }
    }

    fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad(7, 5), "00007");
        assert_eq!(zero_pad(123456, 5), "123456");
        assert_eq!(zero_pad(3, 0), "3");
    }

    #[test]
    fn test_custom_pattern_substitution() {
        let vars = PatternVars {
            prefix: "INV-",
            suffix: "",
            seq: "00042",
            date: "20240101",
        };

        assert_eq!(apply_custom_pattern("{prefix}{date}-{seq}{suffix}", &vars), "INV-20240101-00042");
    }

    #[test]
    fn test_custom_pattern_replaces_every_occurrence() {
        let vars = PatternVars {
            prefix: "A",
            suffix: "Z",
            seq: "7",
            date: "20240101",
        };

        assert_eq!(apply_custom_pattern("{seq}/{seq}-{unknown}{suffix}", &vars), "7/7-{unknown}Z");
    }

    #[test]
    fn test_sequential_and_date_based_formats() {
        let sequential = config(FolioFormat::Sequential, "INV-", "-MX", 4);
        assert_eq!(format_folio(&sequential, 12, new_year()), "INV-0012-MX");

        let dated = config(FolioFormat::DateBased, "F", "", 3);
        assert_eq!(format_folio(&dated, 5, new_year()), "F20240101-005");
    }

    #[test]
    fn test_generate_advances_by_one() {
        let cfg = config(FolioFormat::Sequential, "", "", 3);
        let sequence = FormSequence::new("tpl", 41);

        let (folio, next) = generate(&cfg, &sequence, new_year());
        assert_eq!(folio, "042");
        assert_eq!(next, 42);
    }
}
