//! Demo binary for the context-aware logger.

mod diagnostics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use ctxlog::{Arg, Context, Field, Formatter, Logger, LoggerConfig, Output};
use diagnostics::init_diagnostics;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "ctxlog-demo")]
#[command(about = "Emit sample context-aware log entries")]
struct Cli {
    /// Filter directive for the demo's own diagnostics (e.g., "debug")
    #[arg(long, global = true)]
    diagnostics: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one entry per level, plain and formatted
    Emit {
        #[command(flatten)]
        logger: LoggerArgs,

        /// Context value as key=value (repeatable)
        #[arg(long = "value")]
        values: Vec<String>,

        /// Explicit field as key=value attached to one entry (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Log from many tasks sharing one logger
    Concurrent {
        #[command(flatten)]
        logger: LoggerArgs,

        /// Number of tasks to spawn
        #[arg(long, default_value = "8")]
        tasks: usize,
    },
}

#[derive(Args)]
struct LoggerArgs {
    /// JSON logger configuration file; overrides the flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Formatter: simple, text or json
    #[arg(long, default_value = "simple")]
    format: String,

    /// Minimum level: off, error, warn, info, debug or trace
    #[arg(long, default_value = "debug")]
    level: String,

    /// Context key copied into every entry (repeatable)
    #[arg(long = "context-key", default_values = ["requestId", "userId"])]
    context_keys: Vec<String>,

    /// Write entries to stdout instead of stderr
    #[arg(long, default_value = "false")]
    stdout: bool,
}

#[derive(Serialize)]
struct SamplePayload {
    region: &'static str,
    retries: u32,
    tags: Vec<&'static str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_diagnostics(cli.diagnostics.as_deref())?;

    match cli.command {
        Commands::Emit {
            logger,
            values,
            fields,
        } => {
            let logger = build_logger(&logger)?;
            let ctx = build_context(&values)?;
            let fields = build_fields(&fields)?;
            emit_samples(&logger, &ctx, &fields);
            logger.sync();
        }
        Commands::Concurrent { logger, tasks } => {
            let logger = Arc::new(build_logger(&logger)?);
            run_concurrent(Arc::clone(&logger), tasks).await?;
            logger.sync();
        }
    }

    Ok(())
}

fn build_logger(args: &LoggerArgs) -> anyhow::Result<Logger> {
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            LoggerConfig::from_json(&text)?
        }
        None => LoggerConfig {
            formatter: Formatter::from_name(&args.format),
            level: args.level.clone(),
            context_keys: args.context_keys.clone(),
            output: if args.stdout { Output::Stdout } else { Output::Stderr },
        },
    };

    let logger = Logger::from_config(&config)?;
    info!(formatter = %logger.formatter(), level = %logger.level(), "logger configured");
    Ok(logger)
}

fn parse_pair(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected key=value, got `{}`", raw))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn build_context(values: &[String]) -> anyhow::Result<Context> {
    let mut ctx = Context::background();
    for raw in values {
        let (key, value) = parse_pair(raw)?;
        debug!("Context value {} set", key);
        ctx = ctx.with_value(key, value);
    }
    Ok(ctx)
}

fn build_fields(fields: &[String]) -> anyhow::Result<Vec<Field>> {
    fields
        .iter()
        .map(|raw| parse_pair(raw).map(|(key, value)| Field::new(key, value)))
        .collect()
}

fn emit_samples(logger: &Logger, ctx: &Context, fields: &[Field]) {
    let payload = SamplePayload {
        region: "eu-west-1",
        retries: 2,
        tags: vec!["beta", "canary"],
    };

    logger.debug(ctx, "Debug Message 1", &[]);
    logger.debugf(ctx, "Debug Message {}", &[Arg::from(2)]);
    logger.info(ctx, "Informational Message 1", &[]);
    logger.info(ctx, "Informational Message 2", fields);
    logger.infof(ctx, "Informational Message {} with payload {}", &[Arg::from(3), Arg::json(&payload)]);
    logger.warn(ctx, "Warning Message 1", &[]);
    logger.warnf(ctx, "Warning Message {}", &[Arg::from(2)]);
    logger.error(ctx, "Error Message 1", &[]);
    logger.errorf(ctx, "Error Message {}", &[Arg::from(2)]);
}

async fn run_concurrent(logger: Arc<Logger>, tasks: usize) -> anyhow::Result<()> {
    let mut handles = Vec::with_capacity(tasks);
    for task in 0..tasks {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            let ctx = Context::background()
                .with_value("requestId", format!("request-{task}"))
                .with_value("userId", format!("user-{}", task % 3));
            logger.infof(&ctx, "task {} finished", &[Arg::from(task)]);
        }));
    }

    for handle in handles {
        handle.await?;
    }
    info!("All {} tasks finished", tasks);
    Ok(())
}
