//! databox CLI - run one analysis script against a dataset.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use databox::{Config, ExecutionRequest, Sandbox};

#[derive(Parser)]
#[command(name = "databox")]
#[command(author, version, about = "Sandboxed execution of analysis scripts over CSV datasets")]
struct Cli {
    /// Script to execute (or - for stdin)
    #[arg(short, long)]
    code: String,

    /// Path to the CSV dataset
    #[arg(short, long)]
    dataset: PathBuf,

    /// Storage root for chart artifacts (overrides DATABOX_STORAGE_ROOT)
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Wall-clock limit in seconds (overrides DATABOX_WALL_SECONDS)
    #[arg(long)]
    wall_seconds: Option<u64>,

    /// CPU limit in seconds (overrides DATABOX_CPU_SECONDS)
    #[arg(long)]
    cpu_seconds: Option<u64>,

    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "databox=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = if cli.code == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("failed to read script from stdin: {e}");
            return ExitCode::FAILURE;
        }
        buf
    } else {
        cli.code
    };

    let mut config = Config::from_env();
    if let Some(root) = cli.storage_root {
        config.storage_root = root;
    }
    if let Some(wall) = cli.wall_seconds {
        config.limits.wall_seconds = wall;
    }
    if let Some(cpu) = cli.cpu_seconds {
        config.limits.cpu_seconds = cpu;
    }

    let sandbox = Sandbox::new(config);
    let result = sandbox.execute(&ExecutionRequest {
        code,
        dataset_path: cli.dataset,
    });

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("failed to serialize result: {e}");
            return ExitCode::FAILURE;
        }
    }

    if result.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
