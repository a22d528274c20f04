//! Command-line interface for esdump
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and CLI-over-env-over-file precedence
//! - Subcommand dispatch (version, config inspection)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;

/// Export an Elasticsearch index into size-rotated CSV files
#[derive(Parser, Debug)]
#[command(
    name = "esdump",
    version,
    about = "Bulk export of an index into size-rotated CSV files",
    long_about = "Exports the full contents of an index into a sequence of CSV files,
pulling documents through the scroll protocol and rolling output files once
they reach a target size. The column set is a fixed schema supplied up front."
)]
pub struct CliArgs {
    /// Store base URL
    ///
    /// Example: https://es.internal:9200
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Index to export (wildcards allowed, e.g. events-*)
    #[arg(short = 'i', long, value_name = "INDEX")]
    pub index: Option<String>,

    /// Username for basic authentication
    #[arg(short = 'u', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// CA certificate bundle (PEM) for TLS verification
    #[arg(long = "ca-cert", value_name = "FILE")]
    pub ca_cert: Option<PathBuf>,

    /// Documents per scroll page
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Output filename prefix; files are named {prefix}-{n}.csv
    #[arg(short = 'o', long, value_name = "PREFIX")]
    pub output_prefix: Option<String>,

    /// Target file size in megabytes before rotating
    #[arg(long, value_name = "MB")]
    pub target_size_mb: Option<u64>,

    /// Output columns, in order (comma-separated)
    #[arg(long, value_name = "COLS", value_delimiter = ',')]
    pub schema: Option<Vec<String>>,

    /// Fields kept as a single structured value through flattening
    #[arg(long = "preserve", value_name = "FIELDS", value_delimiter = ',')]
    pub preserve_fields: Option<Vec<String>>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Disable the interactive progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Quiet mode (minimal output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for esdump
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Show or validate configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Effective configuration after all overrides
    config: Config,
}

impl CliInterface {
    /// Parse arguments and assemble the effective configuration.
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let mut config = Config::load(args.config_file.as_deref())?;
        apply_overrides(&mut config, &args);
        Ok(Self { args, config })
    }

    #[cfg(test)]
    fn from_args(args: CliArgs, mut config: Config) -> Self {
        apply_overrides(&mut config, &args);
        Self { args, config }
    }

    /// Parsed arguments.
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the interactive progress bar should be shown.
    pub fn progress_bar_enabled(&self) -> bool {
        self.config.export.progress_bar && !self.args.no_progress && !self.args.quiet
    }

    /// Handle subcommands that short-circuit the export.
    ///
    /// Returns `true` when a subcommand ran and the process should exit.
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                println!("esdump {}", crate::VERSION);
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                if *show {
                    let rendered = toml::to_string_pretty(&self.config)
                        .map_err(|e| crate::error::EsdumpError::Generic(e.to_string()))?;
                    println!("{rendered}");
                }
                if *validate {
                    self.config.validate()?;
                    println!("Configuration is valid");
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Print the startup banner unless in quiet mode.
    pub fn print_banner(&self) {
        if !self.args.quiet {
            println!(
                "esdump {} — exporting '{}' from {}",
                crate::VERSION,
                self.config.export.index,
                self.config.connection.url
            );
        }
    }
}

/// Apply CLI flags on top of the loaded configuration.
fn apply_overrides(config: &mut Config, args: &CliArgs) {
    if let Some(ref url) = args.url {
        config.connection.url = url.clone();
    }
    if let Some(ref username) = args.username {
        config.connection.username = Some(username.clone());
    }
    if let Some(ref password) = args.password {
        config.connection.password = Some(password.clone());
    }
    if let Some(ref ca_cert) = args.ca_cert {
        config.connection.ca_cert = Some(ca_cert.clone());
    }
    if let Some(timeout) = args.timeout {
        config.connection.timeout = timeout;
    }
    if let Some(ref index) = args.index {
        config.export.index = index.clone();
    }
    if let Some(page_size) = args.page_size {
        config.export.page_size = page_size;
    }
    if let Some(ref prefix) = args.output_prefix {
        config.export.output_prefix = prefix.clone();
    }
    if let Some(target) = args.target_size_mb {
        config.export.target_size_mb = target;
    }
    if let Some(ref schema) = args.schema {
        config.export.schema = schema.clone();
    }
    if let Some(ref preserve) = args.preserve_fields {
        config.export.preserve_fields = preserve.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_args() {
        let args = CliArgs::try_parse_from([
            "esdump",
            "https://es.internal:9200",
            "-i",
            "events",
            "--schema",
            "a,b,c.x",
        ])
        .unwrap();
        assert_eq!(args.url.as_deref(), Some("https://es.internal:9200"));
        assert_eq!(args.index.as_deref(), Some("events"));
        assert_eq!(
            args.schema,
            Some(vec!["a".to_string(), "b".to_string(), "c.x".to_string()])
        );
    }

    #[test]
    fn test_cli_overrides_config_file_values() {
        let args = CliArgs::try_parse_from([
            "esdump",
            "-i",
            "events",
            "--page-size",
            "500",
            "--target-size-mb",
            "5",
        ])
        .unwrap();
        let mut config = Config::default();
        config.export.index = "from-file".to_string();
        config.export.page_size = 10_000;

        let cli = CliInterface::from_args(args, config);
        assert_eq!(cli.config().export.index, "events");
        assert_eq!(cli.config().export.page_size, 500);
        assert_eq!(cli.config().export.target_size_mb, 5);
        // Untouched values keep their loaded defaults
        assert_eq!(cli.config().export.output_prefix, "export");
    }

    #[test]
    fn test_quiet_disables_progress_bar() {
        let args = CliArgs::try_parse_from(["esdump", "-q"]).unwrap();
        let cli = CliInterface::from_args(args, Config::default());
        assert!(!cli.progress_bar_enabled());
    }

    #[test]
    fn test_version_subcommand_parses() {
        let args = CliArgs::try_parse_from(["esdump", "version"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Version)));
    }
}
