use crate::error::CliError;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

pub const SOURCE_URL_VAR: &str = "DBSYNC_SOURCE_URL";
pub const DESTINATION_URL_VAR: &str = "DBSYNC_DESTINATION_URL";

/// Environment variable manager that loads from system and .env files
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    /// Starts from the process environment.
    pub fn from_system() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// `~/.dbsync/.env`, read when no `--env-file` is given and it exists.
    pub fn default_file() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".dbsync").join(".env"))
    }

    /// Load variables from a .env file. File entries override earlier ones.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// An explicit flag wins over the variable `var`.
    pub fn resolve_url(
        &self,
        flag: Option<&str>,
        role: &'static str,
        var: &'static str,
    ) -> Result<String, CliError> {
        flag.or_else(|| self.get(var))
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .ok_or(CliError::MissingConnection { role, var })
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars
                .insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        value.to_string()
    }
}
