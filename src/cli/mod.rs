use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// `DesignLens` - AI-assisted design review for screenshots and live pages.
#[derive(Parser, Debug)]
#[command(name = "designlens")]
#[command(version)]
#[command(about = "Score a UI design and get concrete fixes.", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway (audit + screenshot endpoints)
    Serve {
        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// Audit an image file, or a live page captured on the fly
    #[command(group(ArgGroup::new("source").required(true).args(["path", "url"])))]
    Audit {
        /// Image file to audit
        path: Option<PathBuf>,

        /// Capture this page and audit the screenshot
        #[arg(long)]
        url: Option<String>,

        /// Print the raw report JSON instead of the formatted view
        #[arg(long)]
        json: bool,
    },

    /// Capture a full-page screenshot of a URL
    Screenshot {
        url: String,

        /// Output file
        #[arg(short, long, default_value = "screenshot.png")]
        output: PathBuf,
    },

    /// Show the effective configuration
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn audit_requires_a_source() {
        assert!(Cli::try_parse_from(["designlens", "audit"]).is_err());
        assert!(
            Cli::try_parse_from(["designlens", "audit", "shot.png", "--url", "https://a.test"])
                .is_err()
        );
    }

    #[test]
    fn audit_accepts_url_with_json_flag() {
        let cli =
            Cli::try_parse_from(["designlens", "audit", "--url", "https://a.test", "--json"])
                .unwrap();
        match cli.command {
            Commands::Audit { path, url, json } => {
                assert!(path.is_none());
                assert_eq!(url.as_deref(), Some("https://a.test"));
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["designlens", "serve", "--port", "0", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { port: Some(0), host: None }));
    }
}
