pub mod args;
pub mod commands;

pub use args::{ListArgs, OutputFormat, RunArgs, SchemaArgs, ValidateArgs};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "crm-helpers")]
#[command(version = crate::VERSION)]
#[command(about = "Run and inspect CRM automation helpers")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: list helpers, read a schema, validate a step config, then run it against a fixture."
)]
pub struct Args {
    /// Directory holding helpers.toml (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "List registered helpers",
        long_about = "List prints every registered helper type with its category and description, in registration order.",
        after_help = "Example:\n    crm-helpers list --format json"
    )]
    List(ListArgs),
    #[command(
        about = "Print a helper's config schema",
        after_help = "Example:\n    crm-helpers schema math_it"
    )]
    Schema(SchemaArgs),
    #[command(
        about = "Check a step config without touching a CRM",
        long_about = "Validate runs the helper's config checks and exits non-zero with a field-specific message when the config is rejected.",
        after_help = "Example:\n    crm-helpers validate tag_it --config '{\"action\":\"apply\",\"tag_ids\":[\"t1\"]}'"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Execute one helper step against a fixture CRM",
        long_about = "Run seeds an in-memory CRM from a JSON fixture, executes the step for one contact and prints the helper output as JSON.",
        after_help = "Example:\n    crm-helpers run math_it --config @step.json --fixture crm.json --contact c1"
    )]
    Run(RunArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = args.workspace_root();
    match args.command {
        Command::List(list_args) => commands::list(list_args),
        Command::Schema(schema_args) => commands::schema(schema_args),
        Command::Validate(validate_args) => commands::validate(validate_args),
        Command::Run(run_args) => commands::run(run_args, &workspace).await,
    }
}
