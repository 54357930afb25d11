/*!
 * Mixer CLI
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use mixer::{
    cli_style::{
        build_table, feature_table, format_bytes, pack_table, print_error, print_info,
        print_success, print_warning, section_header,
    },
    config::{LogLevel, MixConfig},
    error::{MixerError, Result, EXIT_SUCCESS},
    logging, Mix,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mixer")]
#[command(version, about = "Build format-gated update manifests, deltas and packs", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// State directory holding image/ and www/
    #[arg(long, value_name = "DIR", global = true)]
    state_dir: Option<PathBuf>,

    /// Manifest format to write
    #[arg(long, global = true)]
    format: Option<u32>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stderr
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads (0 = one per CPU)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every bundle manifest and the MoM for a version
    Build {
        /// Version to build
        #[arg(long = "version", value_name = "N")]
        version: u32,

        /// Oldest version clients may update from
        #[arg(long, value_name = "M")]
        min_version: Option<u32>,

        /// Bundle to build besides os-core (repeatable)
        #[arg(long = "bundle", value_name = "NAME")]
        bundles: Vec<String>,

        /// Fixed manifest timestamp (unix seconds)
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// Build packs between two published versions
    Pack {
        /// Bundle to pack (all bundles of the target version if omitted)
        #[arg(long)]
        bundle: Option<String>,

        /// Version the client has (0 for a full pack)
        #[arg(long)]
        from: u32,

        /// Version to update to
        #[arg(long)]
        to: u32,
    },

    /// Show which manifest features a format supports
    Formats,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            print_error(&e.to_string(), hint(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn hint(err: &MixerError) -> Option<&'static str> {
    match err {
        MixerError::BundleNotFound(_) => {
            Some("bundle trees live in <state-dir>/image/<version>/<bundle>")
        }
        MixerError::Config(_) => Some("check the configuration file and command line flags"),
        _ => None,
    }
}

/// File configuration with command line overrides applied
fn load_config(cli: &Cli) -> Result<MixConfig> {
    let mut config = match cli.config {
        Some(ref path) => MixConfig::from_file(path)?,
        None => MixConfig::default(),
    };

    if let Some(ref dir) = cli.state_dir {
        config.state_dir = dir.clone();
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config.verbose |= cli.verbose;

    if let Commands::Build {
        min_version,
        ref bundles,
        ..
    } = cli.command
    {
        if let Some(min_version) = min_version {
            config.min_version = min_version;
        }
        config.bundles.extend(bundles.iter().cloned());
    }

    config.validate()?;
    Ok(config)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "mixer", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Formats => {
            section_header(&format!("Format {}", config.format));
            println!("{}", feature_table(config.format));
            Ok(())
        }
        Commands::Build {
            version, timestamp, ..
        } => {
            logging::init_logging(&config)?;
            let mut mix = Mix::local(config)?;
            if let Some(timestamp) = timestamp {
                mix = mix.with_timestamp(timestamp);
            }

            let summary = mix.create_manifests(version)?;
            section_header(&format!("Version {}", version));
            println!("{}", build_table(&summary));
            if summary.changed.is_empty() {
                print_warning("no bundle changed, the MoM points at existing manifests");
            }
            print_success(&format!("Published version {}", version));
            Ok(())
        }
        Commands::Pack { bundle, from, to } => {
            logging::init_logging(&config)?;
            let mix = Mix::local(config)?;

            let packs = match bundle {
                Some(bundle) => vec![mix.create_pack(&bundle, from, to)?],
                None => mix.create_packs(from, to)?,
            };
            section_header(&format!("Packs {} -> {}", from, to));
            println!("{}", pack_table(&packs));

            let delta_bytes: u64 = packs
                .iter()
                .flat_map(|p| p.deltas())
                .map(|d| d.literal_len())
                .sum();
            print_info(&format!(
                "{} delta literal bytes across {} packs",
                format_bytes(delta_bytes),
                packs.len()
            ));
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}
