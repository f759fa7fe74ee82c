use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crisislink::analysis::config::AnalysisConfig;
use crisislink::chat::report::{ConfidenceTier, Report, listed_sources};
use crisislink::chat::{ChatSession, Role, SendOutcome};
use crisislink::{AnalysisClient, AnalysisError, AnalysisResult, ErrorCode};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "crisislink", about = "Crisis analysis chat client")]
struct Cli {
    /// Analysis backend base URL.
    #[arg(long, env = "ANALYSIS_BASE_URL")]
    base_url: Option<String>,

    /// Print analysis records as JSON instead of a report.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one message and exit.
    Ask { text: String },
    /// Interactive chat on stdin. `/new` starts over, `/quit` exits.
    Chat,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut config = AnalysisConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url);
    }
    let client = AnalysisClient::from_config(&config)?;
    tracing::info!(endpoint = client.endpoint(), "crisislink started");

    match cli.command {
        Command::Ask { text } => ask(&client, &text, cli.json).await,
        Command::Chat => chat(&client, cli.json).await.map(|()| ExitCode::SUCCESS),
    }
}

async fn ask(client: &AnalysisClient, text: &str, json: bool) -> Result<ExitCode, CliError> {
    let text = text.trim();
    if text.is_empty() {
        eprintln!("error: message is empty");
        return Ok(ExitCode::FAILURE);
    }

    let cancel = CancellationToken::new();
    let result = {
        let send = client.send_with_cancel(text, &cancel);
        tokio::pin!(send);
        let mut interrupted = false;
        loop {
            tokio::select! {
                r = &mut send => break r,
                _ = tokio::signal::ctrl_c(), if !interrupted => {
                    cancel.cancel();
                    interrupted = true;
                }
            }
        }
    };

    match result {
        Ok(analysis) => {
            print_reply(&analysis, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} [{}]", e, e.error_code());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn chat(client: &AnalysisClient, json: bool) -> Result<(), CliError> {
    let mut session = ChatSession::new();
    print_last(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/new" => {
                session.reset();
                print_last(&session);
                continue;
            }
            _ => {}
        }

        let cancel = CancellationToken::new();
        let outcome = {
            let send = session.send(client, &line, &cancel);
            tokio::pin!(send);
            let mut interrupted = false;
            loop {
                tokio::select! {
                    r = &mut send => break r,
                    _ = tokio::signal::ctrl_c(), if !interrupted => {
                        cancel.cancel();
                        interrupted = true;
                    }
                }
            }
        };

        match outcome {
            Ok(SendOutcome::Answered) => {
                if let Some(analysis) = session.last().and_then(|m| m.analysis.as_ref()) {
                    print_reply(analysis, json)?;
                }
            }
            Ok(SendOutcome::Failed { code, alert }) => {
                eprintln!("connection error [{code}]: {alert}");
                print_last(&session);
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn print_last(session: &ChatSession) {
    if let Some(message) = session.last() {
        let who = match message.role {
            Role::User => "You",
            Role::Assistant => "Crisis AI",
        };
        println!("{who}: {}", message.content);
    }
}

fn print_reply(analysis: &AnalysisResult, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(analysis)?);
        return Ok(());
    }

    let report = Report::from(analysis);
    println!("Crisis AI: {}", analysis.bot_response);
    let tier = match report.confidence_tier {
        ConfidenceTier::High => "high",
        ConfidenceTier::Medium => "medium",
        ConfidenceTier::Low => "low",
    };
    println!(
        "  {} ({}% confidence, {tier}) | urgency {} | sentiment {} | emotion {} | {}",
        report.verdict,
        report.confidence_percent,
        analysis.urgency,
        report.sentiment_label,
        report.emotion_label,
        report.language,
    );
    println!("  {}", report.sources_line());
    for (i, source) in listed_sources(analysis).iter().enumerate() {
        println!("  [{}] {} ({}) {}", i + 1, source.title, source.source, source.url);
    }
    Ok(())
}
