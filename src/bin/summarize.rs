//! Summarize a dialogue in the terminal, streaming the text as it is generated
//! Run with: cargo run --bin summarize --release -- dialogue.txt

use anyhow::Result;
use clap::Parser;
use dialogue_summarizer::services::ml::{StubSummarizer, SummaryModel};
use dialogue_summarizer::services::streaming::{summarize_blocking, TerminalSink};
use dialogue_summarizer::state::load_model;
use dialogue_summarizer::types::GenerationRequest;
use dialogue_summarizer::Config;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "summarize", about = "Stream an abstractive summary of a dialogue")]
struct Args {
    /// File containing the dialogue; stdin when omitted
    input: Option<PathBuf>,

    /// Model directory (overrides MODEL_DIR)
    #[arg(long)]
    model_dir: Option<String>,

    /// Use the stub summarizer instead of loading weights
    #[arg(long)]
    stub: bool,

    /// Pause after each fragment, in milliseconds (overrides STREAM_DELAY_MS)
    #[arg(long)]
    delay_ms: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dialogue_summarizer=warn,summarize=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = args.model_dir {
        config.model_dir = dir;
    }

    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let request = GenerationRequest::new(&raw, config.decoding.clone())?;

    let mut model: Box<dyn SummaryModel> = if args.stub {
        Box::new(StubSummarizer::new())
    } else {
        Box::new(load_model(&config)?)
    };

    let pacing = args
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.stream_delay());

    let stdout = std::io::stdout();
    let report = summarize_blocking(model.as_mut(), &request, TerminalSink::new(stdout.lock()), pacing)?;
    println!();

    tracing::info!(
        "{} words in {:?} (first output after {:?})",
        report.word_count,
        report.elapsed,
        report.time_to_first_output
    );

    Ok(())
}
