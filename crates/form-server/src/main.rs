//! Command line front-end for the form submission pipeline
//!
//! Every command prints its result as pretty JSON on stdout.

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use form_core::{
    AppConfig, FormTemplate, JsonFileStore, PipelineContext, RetryService, SubmissionOrchestrator,
    SubmittedFormId,
};
use form_types::{FieldValues, SubmitFormRequest};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("form-pipeline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Form submission pipeline: folio numbering, payload mapping and API delivery")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config/forms.json")
                .global(true),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Override storage.data_dir from the configuration")
                .global(true),
        )
        .subcommand(
            Command::new("submit")
                .about("Submit field values for a template")
                .arg(template_arg())
                .arg(Arg::new("user-id").long("user-id").value_name("ID").required(true))
                .arg(Arg::new("user-email").long("user-email").value_name("EMAIL").required(true))
                .arg(
                    Arg::new("values")
                        .long("values")
                        .value_name("FILE")
                        .help("JSON object of field values keyed by field id")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("retry")
                .about("Retry delivery of a failed submission")
                .arg(Arg::new("id").long("id").value_name("SUBMISSION_ID").required(true)),
        )
        .subcommand(
            Command::new("retry-failed")
                .about("Retry every retryable failed submission of a template")
                .arg(template_arg()),
        )
        .subcommand(
            Command::new("preview-folio")
                .about("Show the next local folio without consuming it")
                .arg(template_arg()),
        )
        .subcommand(
            Command::new("fetch-folio")
                .about("Request a folio from the template's folio API")
                .arg(template_arg()),
        )
        .subcommand(
            Command::new("import-template")
                .about("Validate and store a template JSON file")
                .arg(Arg::new("file").long("file").value_name("FILE").required(true)),
        )
}

fn template_arg() -> Arg {
    Arg::new("template-id")
        .long("template-id")
        .value_name("ID")
        .required(true)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a String> {
    matches
        .get_one::<String>(name)
        .with_context(|| format!("missing --{}", name))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();

    let config_path = required(&matches, "config")?;
    let mut config = AppConfig::from_file(config_path)?;
    if let Some(data_dir) = matches.get_one::<String>("data-dir") {
        config.storage.data_dir = data_dir.into();
        config.validate()?;
    }
    log::info!("Loaded configuration from {}", config_path);
    log::info!("Using data directory: {}", config.storage.data_dir.display());

    let (command, args) = matches.subcommand().context("no command given")?;

    if command == "import-template" {
        let file = required(args, "file")?;
        let template: FormTemplate = read_json(Path::new(file))?;
        let store = JsonFileStore::new(&config.storage.data_dir)?;
        store.save_template(&template)?;
        return print_json(&serde_json::json!({ "success": true, "templateId": template.id }));
    }

    let context = Arc::new(PipelineContext::from_config(&config)?);
    let orchestrator = SubmissionOrchestrator::new(context.clone());
    let retry = RetryService::new(context);

    match command {
        "submit" => {
            let values: FieldValues = read_json(Path::new(required(args, "values")?))?;
            let request = SubmitFormRequest::new(
                required(args, "template-id")?,
                required(args, "user-id")?,
                required(args, "user-email")?,
                values,
            );
            print_json(&orchestrator.submit_form(request).await)
        }
        "retry" => {
            let id = SubmittedFormId::from_string(required(args, "id")?);
            print_json(&retry.retry_submission(&id).await)
        }
        "retry-failed" => {
            let sweep = retry.retry_failed(required(args, "template-id")?).await?;
            print_json(&serde_json::json!({
                "attempted": sweep.attempted,
                "delivered": sweep.delivered,
                "failed": sweep.failed,
            }))
        }
        "preview-folio" => print_json(&orchestrator.preview_next_folio(required(args, "template-id")?).await),
        "fetch-folio" => print_json(&orchestrator.folio_from_external_api(required(args, "template-id")?).await),
        other => anyhow::bail!("unknown command {}", other),
    }
}
