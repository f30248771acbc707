//! Command-line definition

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lootbox_core::MintDiscipline;
use std::path::PathBuf;

pub(crate) const DEFAULT_CONFIG: &str = "lootbox.toml";

/// Parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub(crate) handle: String,
    pub(crate) asset_dir: PathBuf,
    pub(crate) metadata_dir: PathBuf,
    pub(crate) config: PathBuf,
    pub(crate) dry_run: bool,
    pub(crate) discipline: Option<MintDiscipline>,
    pub(crate) asset_ext: Option<String>,
    pub(crate) report_json: bool,
    pub(crate) log_json: bool,
}

pub(crate) fn command() -> Command {
    Command::new("lootbox-mint")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Publish loot box assets and metadata, then mint one token per record")
        .arg(
            Arg::new("handle")
                .required(true)
                .value_name("HANDLE")
                .help("Recipient handle, resolved through the configured recipient map"),
        )
        .arg(
            Arg::new("asset-dir")
                .required(true)
                .value_name("ASSET_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding <id>.<ext> image assets"),
        )
        .arg(
            Arg::new("metadata-dir")
                .required(true)
                .value_name("METADATA_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding <id>.json metadata records (rewritten in place)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .default_value(DEFAULT_CONFIG)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file; a missing file means defaults"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Run pre-flight checks only: no upload, no write, no transaction"),
        )
        .arg(
            Arg::new("discipline")
                .long("discipline")
                .value_name("DISCIPLINE")
                .value_parser(["confirm-then-continue", "submit-all-then-confirm"])
                .help("Override the mint confirmation discipline"),
        )
        .arg(
            Arg::new("asset-ext")
                .long("asset-ext")
                .value_name("EXT")
                .help("Override the asset file extension (default: gif)"),
        )
        .arg(
            Arg::new("report-json")
                .long("report-json")
                .action(ArgAction::SetTrue)
                .help("Print the run report as JSON on stdout"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
}

impl CliArgs {
    pub(crate) fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let discipline = matches
            .get_one::<String>("discipline")
            .map(|s| s.parse::<MintDiscipline>())
            .transpose()?;

        Ok(Self {
            handle: required::<String>(matches, "handle")?,
            asset_dir: required::<PathBuf>(matches, "asset-dir")?,
            metadata_dir: required::<PathBuf>(matches, "metadata-dir")?,
            config: required::<PathBuf>(matches, "config")?,
            dry_run: matches.get_flag("dry-run"),
            discipline,
            asset_ext: matches.get_one::<String>("asset-ext").cloned(),
            report_json: matches.get_flag("report-json"),
            log_json: matches.get_flag("log-json"),
        })
    }
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> anyhow::Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing argument <{id}>"))
}
