use crate::core::config::{loader::CONFIG_FILE_NAME, ConfigLoader, LoggingSection};
use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::anyhow;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";

/// Resolved logging configuration after reading helpers.toml and env overrides.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    pub enable_file: bool,
    pub console_output: Option<ConsoleOutput>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: DEFAULT_LEVEL.to_string(),
            enable_file: false,
            console_output: None,
        }
    }
}

impl LoggingConfig {
    /// Precedence: defaults, then the `[logging]` section of helpers.toml, then env.
    pub fn load(workspace_root: Option<&Path>) -> Result<Self> {
        let mut config = LoggingConfig::default();
        if let Some(workspace) = workspace_root {
            if let Some(file) = ConfigLoader::load_from_file(&workspace.join(CONFIG_FILE_NAME))? {
                config.apply(&file.logging)?;
            }
        }
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, section: &LoggingSection) -> Result<()> {
        if let Some(log_dir) = &section.log_dir {
            self.log_dir = Some(log_dir.clone());
        }
        if let Some(default_level) = &section.default_level {
            self.default_level = default_level.clone();
        }
        if let Some(enable_file) = section.enable_file {
            self.enable_file = enable_file;
        }
        if let Some(console_output) = &section.console_output {
            let parsed = ConsoleOutput::from_str(console_output).map_err(|e| anyhow!(e))?;
            self.console_output = Some(parsed);
        }
        Ok(())
    }

    /// `CRM_HELPERS_LOG_DIR` points the file sink somewhere and switches it on.
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = env::var("CRM_HELPERS_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.log_dir = Some(PathBuf::from(dir.trim()));
                self.enable_file = true;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("logging.default_level must be a valid tracing directive"))?;
        Ok(())
    }
}
