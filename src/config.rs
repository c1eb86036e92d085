use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt, str::FromStr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/meta/gateway.db";
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: String,
    pub database_url: String,
    /// Superuser password; `None` disables the `admin` login.
    pub admin_password: Option<String>,
    /// Send the diagnostic header on error responses.
    pub diagnostics: bool,
    pub max_body_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Bucket-scoped object storage gateway")]
pub struct Args {
    /// Host to bind to (overrides GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Root directory for object content (overrides GATEWAY_DATA_DIR)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Database URL (overrides GATEWAY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Omit the diagnostic header from error responses (overrides GATEWAY_DIAGNOSTICS)
    #[arg(long)]
    pub no_diagnostics: bool,

    /// Largest accepted request body (overrides GATEWAY_MAX_BODY_BYTES)
    #[arg(long)]
    pub max_body_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::from_sources(args, |name| env::var(name))?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values looked up through `lookup`, then defaults.
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let string_or = |name: &str, default: &str| -> Result<String> {
            match lookup(name) {
                Ok(value) => Ok(value),
                Err(env::VarError::NotPresent) => Ok(default.to_string()),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        let env_host = string_or("GATEWAY_HOST", DEFAULT_HOST)?;
        let env_port = parsed_or(&lookup, "GATEWAY_PORT", DEFAULT_PORT)?;
        let env_data_dir = string_or("GATEWAY_DATA_DIR", DEFAULT_DATA_DIR)?;
        let env_db = string_or("GATEWAY_DATABASE_URL", DEFAULT_DATABASE_URL)?;
        let env_diagnostics = parsed_or(&lookup, "GATEWAY_DIAGNOSTICS", true)?;
        let env_max_body = parsed_or(&lookup, "GATEWAY_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?;

        let admin_password = match lookup("GATEWAY_ADMIN_PASSWORD") {
            Ok(value) if value.is_empty() => None,
            Ok(value) => Some(value),
            Err(env::VarError::NotPresent) => None,
            Err(err) => return Err(err).context("reading GATEWAY_ADMIN_PASSWORD"),
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            data_dir: args.data_dir.unwrap_or(env_data_dir),
            database_url: args.database_url.unwrap_or(env_db),
            admin_password,
            diagnostics: !args.no_diagnostics && env_diagnostics,
            max_body_bytes: args.max_body_bytes.unwrap_or(env_max_body),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("database_url", &self.database_url)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "***"),
            )
            .field("diagnostics", &self.diagnostics)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(argv: &[&str], vars: &[(&str, &str)]) -> Result<AppConfig> {
        let args = Args::try_parse_from(std::iter::once("bucket-gateway").chain(argv.iter().copied()))?;
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_sources(args, |name| {
            vars.get(name).cloned().ok_or(env::VarError::NotPresent)
        })
    }

    #[test]
    fn defaults_apply_without_args_or_env() {
        let cfg = load(&[], &[]).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:8080");
        assert_eq!(cfg.data_dir, DEFAULT_DATA_DIR);
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.admin_password, None);
        assert!(cfg.diagnostics);
        assert_eq!(cfg.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn args_override_env() {
        let cfg = load(
            &["--port", "9000", "--data-dir", "/srv/gw", "--no-diagnostics"],
            &[
                ("GATEWAY_PORT", "7000"),
                ("GATEWAY_HOST", "127.0.0.1"),
                ("GATEWAY_DATA_DIR", "/env/dir"),
            ],
        )
        .unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.data_dir, "/srv/gw");
        assert!(!cfg.diagnostics);
    }

    #[test]
    fn env_can_disable_diagnostics_and_set_admin() {
        let cfg = load(
            &[],
            &[("GATEWAY_DIAGNOSTICS", "false"), ("GATEWAY_ADMIN_PASSWORD", "hunter2")],
        )
        .unwrap();
        assert!(!cfg.diagnostics);
        assert_eq!(cfg.admin_password.as_deref(), Some("hunter2"));
        assert!(!format!("{:?}", cfg).contains("hunter2"));
    }

    #[test]
    fn empty_admin_password_counts_as_unset() {
        let cfg = load(&[], &[("GATEWAY_ADMIN_PASSWORD", "")]).unwrap();
        assert_eq!(cfg.admin_password, None);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(load(&[], &[("GATEWAY_PORT", "eighty")]).is_err());
        assert!(load(&[], &[("GATEWAY_DIAGNOSTICS", "maybe")]).is_err());
        assert!(load(&[], &[("GATEWAY_MAX_BODY_BYTES", "-1")]).is_err());
    }
}
