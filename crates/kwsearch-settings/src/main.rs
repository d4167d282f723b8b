//! Keyword search settings command-line front end.
//!
//! Reads and edits the per-user keyword search configuration: the typed
//! feature settings, the raw `key=value` settings files, and the keyword
//! lists.
//!
//! # Usage
//!
//! ```text
//! kwsearch-settings [--config-dir DIR] [--context NAME] <COMMAND>
//!
//! Commands:
//!   show [--json]                      Effective settings and list summary
//!   get|set|unset|dump                 Raw access to one settings module
//!   skip-known <BOOL>                  Skip known files during ingest
//!   frequency <NAME>                   FAST, AVG, SLOW, SLOWEST or NONE
//!   scripts <NAME>...                  Replace the enabled script set
//!   option <NAME> <BOOL>               EXTRACT_UTF8 / EXTRACT_UTF16
//!   lists [--locked|--unlocked]        List keyword lists
//!   add-list / remove-list / copy-list Manage keyword lists
//!   add-keyword / remove-keyword       Edit a keyword list
//!   use-for-ingest / ingest-messages   Toggle list flags
//!   export <LIST> <PATH>               Write one list to a TOML file
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Description                         |
//! |-----------------------|-------------------------------------|
//! | `KWSEARCH_CONFIG_DIR` | Configuration directory             |
//! | `KWSEARCH_CONTEXT`    | Context name (default `General`)    |
//! | `RUST_LOG`            | Log filter (default `info`)         |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kwsearch_core::{ExtractOption, Keyword, KeywordList, KeywordType, Script, UpdateFrequency};
use kwsearch_settings::application::config_controller::ConfigController;
use kwsearch_settings::application::feature_settings::{FeatureSettings, SettingsSnapshot};
use kwsearch_settings::application::ports::KeyValueStore;
use kwsearch_settings::infrastructure::ingest::IngestRegistry;
use kwsearch_settings::infrastructure::storage::keyword_lists::TomlKeywordListStore;
use kwsearch_settings::infrastructure::storage::paths::{self, DEFAULT_CONTEXT};
use kwsearch_settings::infrastructure::storage::settings_store::SettingsRepository;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Keyword search configuration tool.
#[derive(Debug, Parser)]
#[command(
    name = "kwsearch-settings",
    about = "Inspect and edit keyword search settings and keyword lists",
    version
)]
struct Cli {
    /// Directory holding the settings and keyword list files.
    ///
    /// Defaults to the per-user configuration directory.
    #[arg(long, global = true, env = paths::CONFIG_DIR_ENV)]
    config_dir: Option<PathBuf>,

    /// Settings context; each context has its own set of files.
    #[arg(long, global = true, default_value = DEFAULT_CONTEXT, env = "KWSEARCH_CONTEXT")]
    context: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the effective settings and a summary of every keyword list.
    Show {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print one raw value from a settings module.
    Get { module: String, key: String },

    /// Write one raw value to a settings module.
    Set {
        module: String,
        key: String,
        value: String,
    },

    /// Delete one raw key from a settings module.
    Unset { module: String, key: String },

    /// Print every raw entry of a settings module.
    Dump { module: String },

    /// Skip files known to be good during ingest.
    SkipKnown {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Set how often keyword searches run during ingest.
    Frequency { frequency: UpdateFrequency },

    /// Replace the set of scripts used for string extraction.
    Scripts { scripts: Vec<Script> },

    /// Enable or disable one string extraction option.
    #[command(name = "option")]
    SetOption {
        option: ExtractOption,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// List keyword lists.
    Lists {
        /// Only built-in locked lists.
        #[arg(long, conflicts_with = "unlocked")]
        locked: bool,
        /// Only user lists.
        #[arg(long)]
        unlocked: bool,
    },

    /// Create an empty keyword list.
    AddList { name: String },

    /// Delete a keyword list.
    RemoveList { name: String },

    /// Copy a keyword list under a new name.
    CopyList { source: String, destination: String },

    /// Add a keyword to a list.
    AddKeyword {
        list: String,
        query: String,
        /// Treat the query as a regular expression.
        #[arg(long)]
        regex: bool,
        /// Match type for regex keywords, e.g. TSK_EMAIL.
        #[arg(long, requires = "regex")]
        kind: Option<KeywordType>,
    },

    /// Remove a keyword from a list.
    RemoveKeyword {
        list: String,
        query: String,
        #[arg(long)]
        regex: bool,
    },

    /// Include or exclude a list from ingest searches.
    UseForIngest {
        list: String,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Enable or disable ingest messages for hits on a list.
    IngestMessages {
        list: String,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Write one keyword list to a TOML file.
    Export { list: String, path: PathBuf },
}

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ListSummary {
    name: String,
    locked: bool,
    use_for_ingest: bool,
    ingest_messages: bool,
    keywords: usize,
}

impl ListSummary {
    fn of(list: &KeywordList) -> Self {
        Self {
            name: list.name().to_string(),
            locked: list.is_locked(),
            use_for_ingest: list.use_for_ingest(),
            ingest_messages: list.ingest_messages(),
            keywords: list.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    context: &'a str,
    config_dir: &'a Path,
    settings: SettingsSnapshot,
    lists: Vec<ListSummary>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = match cli.config_dir {
        Some(dir) => dir,
        None => paths::config_dir().context("resolving configuration directory")?,
    };
    let repository = SettingsRepository::new(dir);
    let context = cli.context.as_str();

    match cli.command {
        Command::Get { module, key } => {
            let store = repository.settings_store(&module, context);
            match store.get(&key) {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("{key} is not set in {module}-{context}"),
            }
        }
        Command::Set { module, key, value } => {
            repository.settings_store(&module, context).set(&key, &value);
        }
        Command::Unset { module, key } => {
            repository.settings_store(&module, context).remove(&key);
        }
        Command::Dump { module } => {
            for (key, value) in repository.settings_store(&module, context).get_all() {
                println!("{key}={value}");
            }
        }
        command => {
            let controller = open_controller(&repository, context);
            run_controller_command(&controller, &repository, context, command)?;
        }
    }
    Ok(())
}

fn open_controller(repository: &SettingsRepository, context: &str) -> ConfigController {
    let settings = FeatureSettings::new(repository, context);
    let registry = TomlKeywordListStore::new(repository.dir(), context);
    let controller = ConfigController::new(
        settings,
        Box::new(registry),
        Arc::new(IngestRegistry::new()),
    );
    controller.subscribe(|change| {
        info!(kind = change.kind().as_str(), ?change, "configuration changed");
    });
    controller
}

fn run_controller_command(
    controller: &ConfigController,
    repository: &SettingsRepository,
    context: &str,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Show { json } => {
            let output = ShowOutput {
                context,
                config_dir: repository.dir(),
                settings: controller.snapshot(),
                lists: controller
                    .keyword_lists()
                    .iter()
                    .map(|l| ListSummary::of(l))
                    .collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_show(&output);
            }
        }
        Command::SkipKnown { enabled } => controller.set_skip_known(enabled),
        Command::Frequency { frequency } => controller.set_update_frequency(frequency),
        Command::Scripts { scripts } => controller.set_string_extract_scripts(&scripts),
        Command::SetOption { option, enabled } => {
            controller.set_string_extract_option(option, enabled)
        }
        Command::Lists { locked, unlocked } => {
            let lists = if locked {
                controller.keyword_lists_filtered(true)
            } else if unlocked {
                controller.keyword_lists_filtered(false)
            } else {
                controller.keyword_lists()
            };
            for list in lists {
                print_list(&ListSummary::of(&list));
            }
        }
        Command::AddList { name } => {
            controller.add_keyword_list_with(&name, Vec::new())?;
        }
        Command::RemoveList { name } => controller.remove_keyword_list(&name)?,
        Command::CopyList {
            source,
            destination,
        } => {
            controller.copy_keyword_list(&source, &destination)?;
        }
        Command::AddKeyword {
            list,
            query,
            regex,
            kind,
        } => {
            controller.add_keyword(&list, Keyword::new(query, !regex, kind))?;
        }
        Command::RemoveKeyword { list, query, regex } => {
            controller.remove_keyword(&list, &query, !regex)?;
        }
        Command::UseForIngest { list, enabled } => {
            controller.set_use_for_ingest(&list, enabled)?;
        }
        Command::IngestMessages { list, enabled } => {
            controller.set_ingest_messages(&list, enabled)?;
        }
        Command::Export { list, path } => {
            controller
                .export_keyword_list(&list, &path)
                .with_context(|| format!("exporting {list} to {}", path.display()))?;
        }
        Command::Get { .. } | Command::Set { .. } | Command::Unset { .. } | Command::Dump { .. } => {
            unreachable!("raw store commands are handled before the controller is opened")
        }
    }
    Ok(())
}

fn print_show(output: &ShowOutput<'_>) {
    let settings = &output.settings;
    println!("context:          {}", output.context);
    println!("config dir:       {}", output.config_dir.display());
    println!("skip known:       {}", settings.skip_known);
    println!("update frequency: {}", settings.update_frequency);
    let scripts: Vec<String> = settings.scripts.iter().map(|s| s.label()).collect();
    println!("scripts:          {}", scripts.join(", "));
    for option in ExtractOption::ALL {
        println!(
            "{:<17} {}",
            format!("{option}:"),
            settings.extract_options.contains(option)
        );
    }
    println!();
    for list in &output.lists {
        print_list(list);
    }
}

fn print_list(list: &ListSummary) {
    println!(
        "{}\t{} keywords\tlocked={}\tingest={}\tmessages={}",
        list.name, list.keywords, list.locked, list.use_for_ingest, list.ingest_messages
    );
}
