//! CLI commands for scc.
//!
//! Manages installed extensions and the marketplace without opening the
//! editor: `scc extensions ...` and `scc config ...`.

pub mod extensions;
pub mod headless;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "scc")]
#[command(about = "Editor extension host", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage installed and marketplace extensions
    Extensions {
        #[command(subcommand)]
        action: ExtensionCommands,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ExtensionCommands {
    /// List installed extensions and their state
    List,

    /// Enable an installed extension
    Enable { id: String },

    /// Disable an installed extension
    Disable { id: String },

    /// Reload one extension, or all of them
    Reload { id: Option<String> },

    /// Remove an extension and its settings
    Uninstall { id: String },

    /// Browse the marketplace
    Catalog {
        /// Fuzzy search over name, description and tags
        #[arg(long)]
        search: Option<String>,

        /// Only show one category
        #[arg(long, default_value = "All")]
        category: String,
    },

    /// Install an extension from the marketplace
    Install { id: String },

    /// Show the metadata of a unit file without loading it
    Info { path: PathBuf },

    /// Show or change the settings of an extension
    Settings {
        id: String,
        key: Option<String>,
        /// New value, parsed as JSON and falling back to a plain string
        value: Option<String>,
        /// Forget the stored value of KEY so its default applies again
        #[arg(long, requires = "key", conflicts_with = "value")]
        reset: bool,
    },

    /// Trigger a menu or key binding action of an extension
    Run {
        id: String,
        action: String,
        /// Load this file as the buffer text first
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,

    /// Print the effective configuration
    Show,

    /// Write the default configuration if no config file exists
    Init,
}

/// Parse arguments, set up logging and run the command.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path);
    crate::logging::init(&config.logging.filter);

    match cli.command {
        Commands::Extensions { action } => extensions::run(action, &config),
        Commands::Config { action } => run_config(action, &config, &config_path),
    }
}

fn run_config(action: ConfigCommands, config: &Config, path: &std::path::Path) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => print!("{}", toml::to_string_pretty(config)?),
        ConfigCommands::Init => {
            if path.exists() {
                println!(
                    "{} Config already exists at {}",
                    console::style("!").yellow().bold(),
                    path.display()
                );
            } else {
                Config::default().save_to(path)?;
                println!(
                    "{} Wrote {}",
                    console::style("✓").green().bold(),
                    console::style(path.display()).dim()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extension_commands() {
        let cli = Cli::try_parse_from(["scc", "extensions", "catalog", "--search", "mini", "--category", "Tools"])
            .unwrap();
        match cli.command {
            Commands::Extensions {
                action: ExtensionCommands::Catalog { search, category },
            } => {
                assert_eq!(search.as_deref(), Some("mini"));
                assert_eq!(category, "Tools");
            }
            _ => panic!("expected catalog command"),
        }

        let cli = Cli::try_parse_from(["scc", "extensions", "reload"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Extensions {
                action: ExtensionCommands::Reload { id: None }
            }
        ));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["scc", "config", "show", "--config", "/tmp/scc.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/scc.toml")));
        assert!(matches!(cli.command, Commands::Config { action: ConfigCommands::Show }));
    }

    #[test]
    fn test_settings_arguments() {
        let cli = Cli::try_parse_from(["scc", "extensions", "settings", "file_backup", "max_backups", "3"]).unwrap();
        match cli.command {
            Commands::Extensions {
                action: ExtensionCommands::Settings { id, key, value, reset },
            } => {
                assert_eq!(id, "file_backup");
                assert_eq!(key.as_deref(), Some("max_backups"));
                assert_eq!(value.as_deref(), Some("3"));
                assert!(!reset);
            }
            _ => panic!("expected settings command"),
        }
    }

    #[test]
    fn test_settings_reset_arguments() {
        let cli = Cli::try_parse_from(["scc", "extensions", "settings", "file_backup", "max_backups", "--reset"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Extensions {
                action: ExtensionCommands::Settings { reset: true, value: None, .. }
            }
        ));

        assert!(Cli::try_parse_from(["scc", "extensions", "settings", "file_backup", "--reset"]).is_err());
        assert!(Cli::try_parse_from(["scc", "extensions", "settings", "file_backup", "max_backups", "3", "--reset"]).is_err());
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from(["scc", "extensions", "run", "word_count", "word-count.show", "--file", "notes.txt"])
            .unwrap();
        match cli.command {
            Commands::Extensions {
                action: ExtensionCommands::Run { id, action, file },
            } => {
                assert_eq!(id, "word_count");
                assert_eq!(action, "word-count.show");
                assert_eq!(file, Some(PathBuf::from("notes.txt")));
            }
            _ => panic!("expected run command"),
        }
    }
}
