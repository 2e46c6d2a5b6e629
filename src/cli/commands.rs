use crate::{
    cli::args::{ListArgs, OutputFormat, RunArgs, SchemaArgs, ValidateArgs},
    core::{
        run_step, ConfigLoader, ConfigValidator, ExecutionContext, HelperRegistry,
        HelperSettings, InMemoryConnector, StepRequest,
    },
    Result,
};
use anyhow::{anyhow, Context};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Print the registered helper catalog.
pub fn list(args: ListArgs) -> Result<()> {
    let registry = HelperRegistry::with_builtins();
    let infos = registry.list_helper_info();
    let mut stdout = std::io::stdout().lock();
    match args.format {
        OutputFormat::Json => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&infos)?)?;
        }
        OutputFormat::Text => {
            let width = infos
                .iter()
                .map(|info| info.metadata.helper_type.len())
                .max()
                .unwrap_or(0);
            for info in &infos {
                writeln!(
                    stdout,
                    "{:<width$}  {:<11} {}",
                    info.metadata.helper_type,
                    info.metadata.category,
                    info.metadata.description,
                    width = width
                )?;
            }
        }
    }
    Ok(())
}

/// Print one helper's config schema as pretty JSON.
pub fn schema(args: SchemaArgs) -> Result<()> {
    let registry = HelperRegistry::with_builtins();
    let helper = registry.new_helper(&args.helper_type)?;
    let schema = helper.config_schema().to_json();
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

/// Validate a step config; errors (non-zero exit) with the field-specific message.
pub fn validate(args: ValidateArgs) -> Result<()> {
    let registry = HelperRegistry::with_builtins();
    let helper = registry.new_helper(&args.helper_type)?;
    let config = read_config(&args.config)?;
    match helper.validate_config(&config) {
        Ok(()) => {
            println!("config for {} is valid", args.helper_type);
            Ok(())
        }
        Err(err) => {
            let field = err.field().map(str::to_string);
            let mut message = format!("invalid config for {}: {}", args.helper_type, err.message);
            if let Some(field) = field {
                message.push_str(&format!(" (field: {})", field));
            }
            Err(anyhow!(message))
        }
    }
}

/// Run one step against a fixture-backed CRM and print the helper output.
pub async fn run(args: RunArgs, workspace: &Path) -> Result<()> {
    let config = ConfigLoader::load_from_workspace(workspace)?;
    ConfigValidator::validate(&config)?;

    let fixture_text = fs::read_to_string(&args.fixture)
        .with_context(|| format!("failed to read fixture {}", args.fixture.display()))?;
    let fixture: Value = serde_json::from_str(&fixture_text)
        .with_context(|| format!("fixture {} is not valid JSON", args.fixture.display()))?;
    let connector = InMemoryConnector::from_fixture(fixture)
        .with_context(|| format!("fixture {} has an unexpected shape", args.fixture.display()))?;
    if connector.contact(&args.contact).is_none() {
        tracing::warn!(contact_id = %args.contact, "contact is not present in the fixture");
    }

    let step_config = read_config(&args.config)?;
    let request = StepRequest::new(args.helper_type.clone(), args.contact.clone(), step_config);

    let mut ctx = ExecutionContext::new(Arc::new(HelperSettings::from_config(&config)));
    if let Some(execution_id) = &args.execution_id {
        ctx = ctx.with_execution_id(execution_id.clone());
    }
    let step_timeout = args
        .timeout
        .unwrap_or_else(|| config.execution.step_timeout());

    let registry = HelperRegistry::with_builtins();
    let result = run_step(&registry, &request, &connector, &ctx, step_timeout).await;

    let output = match &result {
        Ok(output) => output,
        Err(failure) => &failure.output,
    };
    println!("{}", serde_json::to_string_pretty(output)?);
    if args.show_contact {
        if let Some(contact) = connector.contact(&args.contact) {
            println!("{}", serde_json::to_string_pretty(&contact)?);
        }
    }

    match result {
        Ok(_) => Ok(()),
        Err(failure) => Err(anyhow!(
            "{} failed [{}]: {}",
            args.helper_type,
            failure.error.code,
            failure.error.message
        )),
    }
}

/// Parse `--config`: inline JSON, or `@path` to a JSON file. Must be an object.
fn read_config(raw: &str) -> Result<Map<String, Value>> {
    let text = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?,
        None => raw.to_string(),
    };
    let value: Value = serde_json::from_str(&text).context("config is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("config must be a JSON object")),
    }
}
