use crate::output;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use tracing::debug;

use algebra_service::{
    progress_channel, FileResultSink, FileTreeSource, LinearAlgebraEngine, PoolConfig,
    ResolutionEvent, ResultSink, TreeSource,
};

/// Resolve an expression document
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the expression document (.json, .yaml or .yml)
    pub input: PathBuf,

    /// Output document path (default: <input stem>.out.json)
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long, short = 'w', value_name = "N")]
    pub workers: Option<usize>,

    /// Seed for the per-worker fatigue multipliers
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Pool configuration file (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the worker report when done
    #[arg(long)]
    pub report: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let input = &args.input;

    if !input.exists() {
        color_eyre::eyre::bail!("Input file not found: {}", input.display());
    }

    let config = pool_config(&args)?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));
    let mut sink = FileResultSink::new(&output_path);

    // Parse the document
    output::status("Loading", &format!("{}", input.display()));
    let tree = match FileTreeSource::new(input).load() {
        Ok(tree) => tree,
        Err(e) => {
            let message = e.to_string();
            sink.accept(Err(message.clone()))?;
            output::failure(&format!("Parse error: {}", message));
            output::info(&format!("Error written to {}", output_path.display()));
            std::process::exit(1);
        }
    };

    debug!(?config, "starting engine");
    output::info(&format!("{} worker(s)", config.workers));

    // Create progress channel and engine
    let (tx, mut rx) = progress_channel();
    let Some(engine) = start_engine(&config, &mut sink)? else {
        output::info(&format!("Error written to {}", output_path.display()));
        std::process::exit(1);
    };
    let engine = engine.with_progress(tx);

    // Resolve on a blocking thread; dropping the engine closes the channel
    let exec_handle = tokio::task::spawn_blocking(move || {
        let result = engine.evaluate(&tree);
        let report = engine.worker_report();
        engine.shutdown();
        (result, report)
    });

    // Process events in the foreground
    while let Some(event) = rx.recv().await {
        match &event {
            ResolutionEvent::ResolutionStarted { total_operations } => {
                println!();
                output::header(&format!(
                    "Resolving '{}' ({} operations)",
                    input.display(),
                    total_operations
                ));
            }

            ResolutionEvent::NodeStarted {
                operator,
                rows,
                columns,
            } => {
                output::operation_header(operator.symbol(), *rows, *columns);
            }

            ResolutionEvent::BatchSubmitted { tasks, .. } => {
                output::dim(&format!("    {} row task(s) submitted", tasks));
            }

            ResolutionEvent::NodeCompleted {
                operator, duration, ..
            } => {
                output::dim_success(&format!(
                    "    Op '{}' OK ({:.2}ms)",
                    operator,
                    duration.as_secs_f64() * 1000.0
                ));
            }

            ResolutionEvent::Error { message } => {
                output::error(message);
            }

            ResolutionEvent::ResolutionCompleted { success, duration } => {
                println!();
                if *success {
                    output::success(&format!(
                        "Resolution completed in {:.2}ms",
                        duration.as_secs_f64() * 1000.0
                    ));
                } else {
                    output::failure(&format!(
                        "Resolution failed after {:.2}ms",
                        duration.as_secs_f64() * 1000.0
                    ));
                }
            }
        }
    }

    let (result, report) = exec_handle.await?;

    if args.report {
        eprintln!();
        eprintln!("{}", report);
    }

    let failed = result.is_err();
    if let Err(e) = &result {
        if e.is_validation() {
            output::failure("Expression rejected before any row task ran");
        } else {
            output::failure("Resolution aborted on the worker pool");
        }
    }
    sink.accept(result.map_err(|e| e.to_string()))
        .wrap_err_with(|| format!("Failed to write {}", output_path.display()))?;
    output::info(&format!("Output written to {}", output_path.display()));

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

/// Start the engine, or write the failure to `sink` and return `None`
fn start_engine(
    config: &PoolConfig,
    sink: &mut impl ResultSink,
) -> Result<Option<LinearAlgebraEngine>> {
    match LinearAlgebraEngine::new(config) {
        Ok(engine) => Ok(Some(engine)),
        Err(e) => {
            sink.accept(Err(e.to_string()))
                .wrap_err("Failed to write the error document")?;
            output::failure(&format!("Failed to start the worker pool: {}", e));
            Ok(None)
        }
    }
}

/// Pool configuration from `--config`, overridden by `--workers` and `--seed`
fn pool_config(args: &RunArgs) -> Result<PoolConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
            PoolConfig::from_yaml_str(&content)
                .wrap_err_with(|| format!("Invalid config {}", path.display()))?
        }
        None => PoolConfig::default(),
    };

    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

/// `<dir>/<stem>.out.json` next to the input document
fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("out.json")
}
