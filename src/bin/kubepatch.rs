//! kubepatch - Kubernetes manifest patcher
//!
//! Injects common labels and applies conditional JSON Patch operations to a set
//! of manifests, then prints the result as a YAML stream.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use kubepatch::condition::parse_context_overrides;
use kubepatch::patchfile::SubstOptions;
use kubepatch::pipeline::{self, Options};

#[derive(Debug, Parser)]
#[command(name = "kubepatch", version, about = "Patch Kubernetes manifests")]
struct Cli {
    /// Manifest files, directories or glob patterns (comma separated). Use '-' for stdin.
    #[arg(short = 'f', long = "filename", required = true, num_args = 1.., value_delimiter = ',')]
    filenames: Vec<String>,

    /// Patch file to apply.
    #[arg(short = 'p', long = "patchfile")]
    patch_file: PathBuf,

    /// Recurse into directories.
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Substitute variables starting with these prefixes (comma separated).
    #[arg(long, value_delimiter = ',')]
    envsubst_prefixes: Vec<String>,

    /// Substitute these variables (comma separated).
    #[arg(long, value_delimiter = ',')]
    envsubst_vars: Vec<String>,

    /// Condition context overrides, e.g. ENV=prod,REGION=eu.
    #[arg(long)]
    context: Option<String>,

    /// Debug logging and reporting of skipped variables.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_options(self) -> Options {
        let non_empty = |v: Vec<String>| -> Vec<String> {
            v.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Options {
            filenames: self.filenames,
            patch_file: self.patch_file,
            recursive: self.recursive,
            subst: SubstOptions {
                allowed_vars: non_empty(self.envsubst_vars),
                allowed_prefixes: non_empty(self.envsubst_prefixes),
                verbose: self.verbose,
            },
            context: self
                .context
                .as_deref()
                .map(parse_context_overrides)
                .unwrap_or_default(),
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = match pipeline::run(&cli.into_options()) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|_| stdout.flush()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filenames_split_on_commas() {
        let cli = Cli::try_parse_from([
            "kubepatch", "-f", "a.yaml,b.yaml", "-f", "c", "-p", "p.yaml",
        ])
        .unwrap();
        assert_eq!(cli.filenames, vec!["a.yaml", "b.yaml", "c"]);
    }

    #[test]
    fn test_options_drop_blank_substitution_entries() {
        let cli = Cli::try_parse_from([
            "kubepatch",
            "-f",
            "-",
            "-p",
            "p.yaml",
            "--envsubst-prefixes",
            "IMAGE_, ,APP_",
            "--context",
            "ENV=prod",
        ])
        .unwrap();
        let opts = cli.into_options();
        assert_eq!(opts.filenames, vec!["-"]);
        assert_eq!(opts.subst.allowed_prefixes, vec!["IMAGE_", "APP_"]);
        assert_eq!(opts.context, vec![("ENV".to_string(), "prod".to_string())]);
    }
}
