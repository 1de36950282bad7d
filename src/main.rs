use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use douyin_transcript::cli::{parse_batch, Cli, Commands, OutputFormat};
use douyin_transcript::config::{Config, EnvCredentials};
use douyin_transcript::transcribe::{InputItem, Operation, OutputRecord, RecognitionModel};
use douyin_transcript::{output, ReqwestTransport, TranscriptionPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries rendered output
    let default_filter = if cli.verbose {
        "douyin_transcript=debug"
    } else {
        "douyin_transcript=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    let format = match &cli.format {
        Some(format) => format.clone(),
        None => OutputFormat::from_str(&config.app.default_output_format, true)
            .map_err(|e| anyhow::anyhow!("Invalid app.default_output_format: {}", e))?,
    };

    let items = match cli.command {
        Commands::Info { share } => vec![InputItem {
            operation: Operation::ParseVideoInfo,
            video_url: share,
            recognition_model: None,
        }],
        Commands::Transcribe { share, model } => vec![InputItem {
            operation: Operation::ExtractText,
            video_url: share,
            recognition_model: model,
        }],
        Commands::Batch {
            file,
            continue_on_error,
        } => {
            let content = fs_err::read_to_string(&file).context("Failed to read batch file")?;
            let items = parse_batch(&content)?;
            let pipeline = build_pipeline(&config, cli.quiet)?;
            return run_batch(&pipeline, &items, continue_on_error, cli.output.as_deref(), &format).await;
        }
        Commands::Models => {
            println!("Supported recognition models:");
            for model in RecognitionModel::KNOWN.iter() {
                let marker = if model.as_str() == config.dashscope.default_model { " (default)" } else { "" };
                println!("  • {}{}", model, marker);
            }
            println!("Any other DashScope recording-file model name is passed through as-is.");
            return Ok(());
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file to change settings:");
                println!("  {}", Config::config_path()?.display());
            }
            return Ok(());
        }
    };

    let pipeline = build_pipeline(&config, cli.quiet)?;
    run_batch(&pipeline, &items, false, cli.output.as_deref(), &format).await
}

fn build_pipeline(config: &Config, quiet: bool) -> Result<TranscriptionPipeline> {
    let transport = ReqwestTransport::new()?;
    let credentials = EnvCredentials::new(config.dashscope.api_key.clone());

    Ok(TranscriptionPipeline::new(config, Arc::new(transport), Box::new(credentials))
        .with_progress(!quiet))
}

/// Process items one at a time and emit the successful records
async fn run_batch(
    pipeline: &TranscriptionPipeline,
    items: &[InputItem],
    continue_on_error: bool,
    output_path: Option<&Path>,
    format: &OutputFormat,
) -> Result<()> {
    let mut records: Vec<OutputRecord> = Vec::with_capacity(items.len());
    let mut failures = 0usize;

    for (index, item) in items.iter().enumerate() {
        tracing::info!("Processing item {}/{}: {}", index + 1, items.len(), item.video_url);

        match pipeline.process(item).await {
            Ok(record) => records.push(record),
            Err(e) if continue_on_error => {
                failures += 1;
                eprintln!("{} {}: {}", style("✗").red(), item.video_url, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    match output_path {
        Some(path) => {
            output::save_to_file(&records, path, format)?;
            eprintln!("Output saved to: {}", path.display());
        }
        None => output::print_to_console(&records, format)?,
    }

    if failures > 0 {
        anyhow::bail!("{} of {} items failed", failures, items.len());
    }

    Ok(())
}
