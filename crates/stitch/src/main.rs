use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

use stitch::config::{Config, Options};
use stitch::orchestrator::BundleOrchestrator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source root to scan for modules
    #[arg(long)]
    src: Option<PathBuf>,

    /// Entry module, relative to the source root (e.g. ./main.js)
    #[arg(short, long)]
    entry: Option<String>,

    /// Output bundle path
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// File extension of source modules
    #[arg(long)]
    extension: Option<String>,

    /// Output bundled code to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let log_level = match cli.verbose {
        0 => "warn",  // Default: warnings and errors only
        1 => "info",  // -v: informational messages
        2 => "debug", // -vv: debug messages
        _ => "trace", // -vvv or more: trace messages
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    debug!(
        "Verbosity level: {} (log level: {})",
        cli.verbose, log_level
    );
    info!("Starting stitch module bundler");

    let overrides = Options {
        src: cli.src,
        entry: cli.entry,
        output: cli.output,
        extension: cli.extension,
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;
    debug!("Configuration: {:?}", config);

    let bundler = BundleOrchestrator::new(config);

    if cli.stdout {
        let bundled_code = bundler.bundle_to_string()?;
        print!("{}", bundled_code);
        info!("Bundle output to stdout");
    } else {
        let report = bundler.bundle()?;
        println!("WROTE {} size={}", report.output.display(), report.bytes);
        info!(
            "Bundled {} modules into {:?}",
            report.modules, report.output
        );
    }

    Ok(())
}
