// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! funcbench CLI
//!
//! Drives a target serverless function with a configurable stream of
//! requests and optionally emits gem5 checkpoint markers around each call.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, ValueEnum};

use funcbench_core::{
    ConfigError, Driver, FunctionName, GeneratorKind, M5Ops, NoopHook, Port, RunConfig,
    SimulatorHook,
};

mod http;

use http::HttpFunctionClient;

/// funcbench - benchmarking invocation harness for serverless function backends
#[derive(Parser, Debug)]
#[command(name = "funcbench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Name of the function being invoked
    #[arg(long = "function-name", default_value = "helloworld")]
    function_name: String,

    /// The url to connect to
    #[arg(long, default_value = "0.0.0.0")]
    url: String,

    /// The port to connect to
    #[arg(long, default_value_t = 50051)]
    port: u16,

    /// Input to the function
    #[arg(long, default_value = "1")]
    input: String,

    /// Input generation strategy
    #[arg(long = "gen-type", value_enum, default_value_t = GenType::Unique)]
    gen_type: GenType,

    /// Lower bound for random/linear input generation
    #[arg(long = "lower-bound", default_value_t = 0, allow_hyphen_values = true)]
    lower_bound: i64,

    /// Upper bound for random/linear input generation
    #[arg(long = "upper-bound", default_value_t = 100, allow_hyphen_values = true)]
    upper_bound: i64,

    /// Which method of the function to invoke
    #[arg(long = "function-method", default_value = "0")]
    function_method: String,

    /// Number of measured invocations
    #[arg(short = 'n', long = "invocations", default_value_t = 10)]
    invocations: u64,

    /// Number of invocations for warming
    #[arg(short = 'w', long = "warmup", default_value_t = 0)]
    warmup: u64,

    /// Delay between consecutive requests (us)
    #[arg(long, default_value_t = 0)]
    delay: u64,

    /// Log to file instead of standard out
    #[arg(long)]
    logging: Option<PathBuf>,

    /// Enable m5 magic instructions
    #[arg(long = "m5ops")]
    m5ops: bool,

    /// Abort after this many consecutive failed invocations (0 = never)
    #[arg(long = "max-failures", default_value_t = 0)]
    max_failures: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// CLI-facing mirror of [`GeneratorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GenType {
    Unique,
    Random,
    Linear,
}

impl From<GenType> for GeneratorKind {
    fn from(kind: GenType) -> Self {
        match kind {
            GenType::Unique => GeneratorKind::Unique,
            GenType::Random => GeneratorKind::Random,
            GenType::Linear => GeneratorKind::Linear,
        }
    }
}

fn build_config(cli: &Cli) -> Result<RunConfig, ConfigError> {
    let config = RunConfig {
        function_name: FunctionName::new(cli.function_name.as_str())?,
        url: cli.url.clone(),
        port: Port::new(cli.port)?,
        input: cli.input.clone(),
        method: cli.function_method.clone(),
        generator: cli.gen_type.into(),
        lower_bound: cli.lower_bound,
        upper_bound: cli.upper_bound,
        warmup_count: cli.warmup,
        measured_count: cli.invocations,
        delay_micros: cli.delay,
        instrumented: cli.m5ops,
        max_consecutive_failures: cli.max_failures,
    };
    config.validate()?;
    Ok(config)
}

fn init_logging(verbose: bool, logfile: Option<&PathBuf>) -> std::io::Result<()> {
    let filter = if verbose { "debug" } else { "info" };
    match logfile {
        Some(path) => {
            // open file and create if non-existent
            let file = OpenOptions::new().append(true).create(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

async fn drive<H: SimulatorHook>(config: RunConfig, hook: H) -> i32 {
    let client = HttpFunctionClient::new(config.function_name.clone());
    let mut driver = match Driver::new(config, client, hook) {
        Ok(driver) => driver,
        Err(err) => {
            tracing::error!(error = %err, "Failed to construct driver");
            return 1;
        }
    };

    match driver.run().await {
        Ok(summary) => {
            tracing::info!(
                invocations = summary.measured,
                failures = summary.failures,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "SUCCESS: finished invoking function"
            );
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "Benchmark run failed");
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.verbose, cli.logging.as_ref()) {
        eprintln!("Failed to open log file: {}", err);
        std::process::exit(1);
    }

    tracing::info!("-- Invocation test --");

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let code = if cli.m5ops {
        drive(config, M5Ops::new()).await
    } else {
        drive(config, NoopHook).await
    };
    std::process::exit(code);
}
