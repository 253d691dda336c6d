use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "uta")]
#[command(
    version,
    about = "UI test automation harness - drive login flows, capture failure artifacts",
    long_about = "UI Test Automation (UTA)\n\nModes:\n- smoke: run the login flows (success + failure matrix) against the configured app and write an HTML report.\n- generate-storage-state: log in once and persist the authenticated cookies/storage for later runs.\n- check-config: load and validate the layered YAML configuration and print the effective settings.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        default_value = "configs",
        help = "Directory containing config.yaml and optional config_<env>.yaml overlays"
    )]
    pub config_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the login smoke suite against the configured application
    Smoke {
        #[arg(long, value_name = "BOOL", help = "Override browser.headless from the config")]
        headless: Option<bool>,

        #[arg(long, help = "Record a HAR file per case (same as UI_RECORD_HAR=1)")]
        record_har: bool,

        #[arg(long, help = "Record a GIF video per case (same as UI_RECORD_VIDEO=1)")]
        record_video: bool,

        #[arg(long, help = "Only run the login-success case, skip the failure matrix")]
        skip_negative: bool,
    },

    /// Log in once with the default account and persist the storage state
    GenerateStorageState {
        #[arg(
            long,
            short,
            value_name = "PATH",
            default_value = uta_lib::DEFAULT_STORAGE_STATE_PATH,
            help = "Where to write the snapshot consumed by authenticated contexts"
        )]
        output: PathBuf,
    },

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn smoke_defaults() {
        let cli = Cli::parse_from(["uta", "smoke"]);
        assert!(!cli.verbose);
        assert_eq!(cli.config_dir, Path::new("configs"));
        match cli.command {
            Commands::Smoke {
                headless,
                record_har,
                record_video,
                skip_negative,
            } => {
                assert!(headless.is_none());
                assert!(!record_har);
                assert!(!record_video);
                assert!(!skip_negative);
            }
            _ => panic!("expected smoke command"),
        }
    }

    #[test]
    fn smoke_respects_overrides() {
        let cli = Cli::parse_from([
            "uta",
            "--verbose",
            "--config-dir",
            "other-configs",
            "smoke",
            "--headless",
            "false",
            "--record-har",
            "--skip-negative",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config_dir, Path::new("other-configs"));
        match cli.command {
            Commands::Smoke {
                headless,
                record_har,
                skip_negative,
                ..
            } => {
                assert_eq!(headless, Some(false));
                assert!(record_har);
                assert!(skip_negative);
            }
            _ => panic!("expected smoke command"),
        }
    }

    #[test]
    fn generate_storage_state_has_default_output() {
        let cli = Cli::parse_from(["uta", "generate-storage-state"]);
        match cli.command {
            Commands::GenerateStorageState { output } => {
                assert_eq!(output, Path::new("artifacts/storage_state.json"));
            }
            _ => panic!("expected generate-storage-state command"),
        }
    }

    #[test]
    fn check_config_parses() {
        let cli = Cli::parse_from(["uta", "check-config"]);
        assert!(matches!(cli.command, Commands::CheckConfig));
    }
}
