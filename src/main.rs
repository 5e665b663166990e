use clap::{Parser, Subcommand};
use normpic::config::{self, CliOverrides, Config, ConfigError};
use normpic::organize::{self, RunOptions};
use normpic::output;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Flags that override configuration values.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// Config file (default: $NORMPIC_CONFIG_PATH, else ./config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the original photos
    #[arg(long)]
    source: Option<PathBuf>,

    /// Directory receiving links and the manifest
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Collection name used as filename prefix
    #[arg(long)]
    collection: Option<String>,

    /// Reprocess every photo, ignoring the previous manifest
    #[arg(long)]
    force: bool,
}

impl ConfigArgs {
    fn load(&self) -> Result<Config, ConfigError> {
        let overrides = CliOverrides {
            collection_name: self.collection.clone(),
            source_dir: self.source.clone(),
            dest_dir: self.dest.clone(),
            force_reprocess: self.force,
        };
        config::load_config(self.config.as_deref(), &overrides, |key| {
            std::env::var(key).ok()
        })
    }
}

#[derive(Parser)]
#[command(name = "normpic")]
#[command(about = "Order, rename and link photo collections")]
#[command(long_about = "\
Order, rename and link photo collections

Photos in the source directory are ordered by capture time (bursts from one
camera stay together), given names like

  wedding-20241005T143045-r5a.jpg

and linked into the destination directory. A manifest.json next to the links
records where every name came from. Re-runs only touch files that changed.

Run 'normpic gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Print configuration and one line per photo
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Organize photos into the destination directory
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Plan names and write manifest.dryrun.json without creating links
        #[arg(long)]
        dry_run: bool,
    },
    /// Resolve and validate configuration without writing anything
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run { config, dry_run } => {
            let config = config.load()?;
            config.prepare_paths()?;
            if cli.verbose {
                output::print_config(&config);
            }

            let (events, printer) = if cli.verbose {
                let (tx, rx) = std::sync::mpsc::channel();
                let printer = std::thread::spawn(move || {
                    for event in rx {
                        for line in output::format_photo_event(&event) {
                            println!("{}", line);
                        }
                    }
                });
                (Some(tx), Some(printer))
            } else {
                (None, None)
            };

            let result = organize::organize(&config, &RunOptions { dry_run }, events);
            if let Some(printer) = printer {
                printer.join().map_err(|_| "output thread panicked")?;
            }
            let report = result?;
            output::print_run_output(&report, cli.verbose);
            report.into_result()?;
        }
        Command::Check { config } => {
            let config = config.load()?;
            config.check_source()?;
            output::print_config(&config);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
