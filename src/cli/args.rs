use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct ListArgs {
    /// Output format for the catalog
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct SchemaArgs {
    /// Helper type to describe (for example `math_it`)
    #[arg(value_name = "TYPE")]
    pub helper_type: String,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Helper type the config belongs to
    #[arg(value_name = "TYPE")]
    pub helper_type: String,

    /// Step config as inline JSON, or @path to a JSON file
    #[arg(long, value_name = "JSON|@FILE")]
    pub config: String,
}

#[derive(Args)]
pub struct RunArgs {
    /// Helper type to execute
    #[arg(value_name = "TYPE")]
    pub helper_type: String,

    /// Step config as inline JSON, or @path to a JSON file
    #[arg(long, value_name = "JSON|@FILE")]
    pub config: String,

    /// JSON fixture seeding the in-memory CRM (contacts, tags, metadata)
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// Contact the step runs against
    #[arg(long, value_name = "ID")]
    pub contact: String,

    /// Correlation id recorded on every log line (default: generated)
    #[arg(long, value_name = "ID")]
    pub execution_id: Option<String>,

    /// Override execution.step_timeout (for example `500ms`, `2m`)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Print the final contact record after the step
    #[arg(long)]
    pub show_contact: bool,
}
