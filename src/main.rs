use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use foodmatch::{FoodMatchConfig, QueryHints, SearchOptions};
use tracing_subscriber::EnvFilter;

/// Match food descriptors against the nutrition stores of a YAML config.
#[derive(Parser, Debug)]
#[command(name = "foodmatch", version, about)]
struct Args {
    /// YAML configuration describing the normalizer, matcher and backends.
    config: PathBuf,

    /// Food descriptors to match, searched concurrently.
    #[arg(required = true)]
    descriptors: Vec<String>,

    /// Return up to N candidates per descriptor instead of the best match.
    #[arg(long, value_name = "N")]
    multi: Option<usize>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, env = "FOODMATCH_JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn options(&self) -> SearchOptions {
        match self.multi {
            Some(n) => SearchOptions::multi(n),
            None => SearchOptions::single(),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let engine = FoodMatchConfig::from_file(&args.config)?.build_engine()?;
    let options = args.options();
    let batch = args
        .descriptors
        .into_iter()
        .map(|d| (d, QueryHints::default()))
        .collect();
    for result in engine.search_batch(batch, options).await {
        let result = result?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.json_logs);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("foodmatch: {err}");
            ExitCode::FAILURE
        }
    }
}
