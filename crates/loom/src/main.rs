//! Command-line entry point (`spec.md` §6, "documented for completeness").

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use loom::config::{Config, MangleMode};
use loom::orchestrator::Bundler;

/// Flatten an `import`/`export`-using module graph into a single source
/// file with no runtime loader.
#[derive(Debug, Parser)]
#[command(name = "loom", version, about)]
struct Cli {
    /// Entry module to bundle.
    entry: PathBuf,

    /// Write the bundle here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Strip incidental whitespace from the output.
    #[arg(long)]
    minify: bool,

    /// Always shorten every bundle-internal identifier.
    #[arg(long)]
    mangle: bool,

    /// Shorten identifiers only when `--minify` is also set.
    #[arg(long)]
    automangle: bool,

    /// Textual `NAME=VALUE` substitution, applied before parsing. Repeatable.
    #[arg(short = 'd', long = "define", value_parser = parse_define)]
    define: Vec<(String, String)>,
}

fn parse_define(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, found `{raw}`"))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = cli
        .entry
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = Config::load_from_dir(&root)?;

    if cli.minify {
        config.minify = true;
    }
    if cli.mangle {
        config.mangle = MangleMode::Mangle;
    } else if cli.automangle {
        config.mangle = MangleMode::Auto;
    }
    for (name, value) in cli.define {
        config.define.insert(name, value);
    }

    let bundler = Bundler::new(config);
    let output = bundler.bundle(&cli.entry)?;

    match cli.output {
        Some(path) => std::fs::write(&path, output)
            .map_err(|e| anyhow::anyhow!("{}: failed to write bundle: {e}", path.display()))?,
        None => print!("{output}"),
    }
    Ok(())
}
