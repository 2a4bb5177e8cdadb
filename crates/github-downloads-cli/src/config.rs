//! Command-line configuration.
//!
//! ```text
//! Cli
//! ├── credentials: Credentials     # GitHub login and token
//! ├── downloads: DownloadsConfig   # Endpoints, timeout, user agent
//! └── command: Command             # list | upload | delete
//! ```
//!
//! Every flag outside the command can also be supplied through the
//! environment, e.g. `GITHUB_LOGIN` and `GITHUB_TOKEN`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use github_downloads::{Credentials, DEFAULT_CONTENT_TYPE, DownloadsConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::TRACING_TARGET_CONFIG;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "github-downloads")]
#[command(about = "List, upload and delete GitHub project downloads")]
#[command(version)]
pub struct Cli {
    /// Account credentials.
    #[clap(flatten)]
    pub credentials: Credentials,

    /// Service endpoints and HTTP settings.
    #[clap(flatten)]
    pub downloads: DownloadsConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// Operation to run.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the downloads of a project
    List {
        /// Project name
        project: String,

        /// Account owning the project (defaults to the login)
        #[arg(long)]
        account: Option<String>,
    },

    /// Upload a file to a project
    Upload {
        /// Project name
        project: String,

        /// File to upload
        file: PathBuf,

        /// Name to publish the file under (defaults to the file's name)
        #[arg(long)]
        name: Option<String>,

        /// MIME type of the file
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,

        /// Description shown on the downloads page
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Delete a download by id
    Delete {
        /// Project name
        project: String,

        /// Download id, as printed by `list`
        id: String,
    },
}

impl Cli {
    /// Loads the .env file (if enabled) and parses arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Events go to stderr so `list` output stays machine-readable.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Logs the effective configuration. The token is never logged.
    pub fn log_config(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            login = %self.credentials.login,
            github_url = %self.downloads.github_url,
            downloads_url = %self.downloads.downloads_url,
            storage_url = %self.downloads.storage_url,
            http_timeout = ?self.downloads.http_timeout,
            "configuration loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    const AUTH: [&str; 5] = ["github-downloads", "--github-login", "alice", "--github-token", "t0k"];

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(AUTH.iter().chain(args)).unwrap()
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let cli = parse(&["list", "tool", "--account", "bob"]);
        assert_eq!(cli.credentials.login, "alice");
        assert_eq!(cli.downloads.github_url, "https://github.com");

        let Command::List { project, account } = cli.command else {
            panic!("expected list");
        };
        assert_eq!(project, "tool");
        assert_eq!(account.as_deref(), Some("bob"));
    }

    #[test]
    fn test_parse_upload_defaults() {
        let cli = parse(&["upload", "tool", "dist/tool.zip"]);
        let Command::Upload {
            name,
            content_type,
            description,
            file,
            ..
        } = cli.command
        else {
            panic!("expected upload");
        };

        assert_eq!(file, PathBuf::from("dist/tool.zip"));
        assert_eq!(name, None);
        assert_eq!(content_type, "application/octet-stream");
        assert_eq!(description, "");
    }

    #[test]
    fn test_parse_delete() {
        let cli = parse(&["delete", "tool", "42"]);
        assert!(matches!(cli.command, Command::Delete { ref id, .. } if id == "42"));
    }
}
