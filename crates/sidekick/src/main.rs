//! Terminal front end for the sidekick assistants.

#[macro_use]
extern crate tracing;

use std::error::Error as StdError;
use std::io::Write as _;
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use sidekick::config::AppConfig;
use sidekick::core::TranscriptSource;
use sidekick::orchestrator::Orchestrator;
use sidekick::research::{DEFAULT_NUM_SOURCES, ResearchAssistant};
use sidekick::{Session, SessionBuilder, assistants, review};
use sidekick_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::interval;

const BAR_CHAR: &str = "▎";
const RULE: &str = "======================================================================";

#[derive(Parser)]
#[command(name = "sidekick", version, about = "Task assistants in your terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Current weather, forecasts and alerts.
    Weather,
    /// Web research and report generation.
    Research,
    /// Expenses, budgets and savings goals.
    Finance,
    /// Review one file, or chat about code when no file is given.
    Review { file: Option<PathBuf> },
    /// Knowledge base answers and support tickets.
    Support,
    /// Run a task through a team of specialist agents.
    Orchestrate { task: Vec<String> },
}

enum Assistant {
    Chat(Session),
    Research(ResearchAssistant),
    Team(Orchestrator),
}

impl Assistant {
    fn reset(&self) {
        match self {
            Assistant::Chat(session) => session.reset(),
            Assistant::Research(assistant) => assistant.reset(),
            Assistant::Team(orchestrator) => orchestrator.reset(),
        }
    }
}

/// What the REPL prints around the conversation.
struct Intro {
    title: &'static str,
    lines: &'static [&'static str],
    prompt: &'static str,
    farewell: &'static str,
}

type Transcripts = UnboundedReceiver<(String, TranscriptSource)>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), Box<dyn StdError>> {
    let config = AppConfig::from_env()?;
    let provider = OpenAIProvider::new(config.model.clone())?;

    let (transcript_tx, mut transcripts) = mpsc::unbounded_channel();
    let builder = || {
        let transcript_tx = transcript_tx.clone();
        SessionBuilder::with_model_provider(provider.clone()).on_transcript(
            move |transcript, source| {
                transcript_tx.send((transcript.to_owned(), source)).ok();
            },
        )
    };

    let (assistant, intro) = match command {
        Command::Weather => (
            Assistant::Chat(assistants::weather(builder(), &config)?),
            Intro {
                title: "Weather Assistant",
                lines: &[
                    "Ask me about the weather anywhere in the world!",
                    "Examples: 'What's the weather in London?', 'Forecast for Tokyo'",
                ],
                prompt: "You",
                farewell: "Goodbye! Stay dry out there!",
            },
        ),
        Command::Research => (
            Assistant::Research(assistants::research(builder(), &config)?),
            Intro {
                title: "Research Assistant",
                lines: &[
                    "Ask me to research any topic.",
                    "Type 'report <topic>' to generate a full research report.",
                    "Type 'clear' to clear the research context.",
                ],
                prompt: "Research",
                farewell: "Goodbye! Happy researching!",
            },
        ),
        Command::Finance => (
            Assistant::Chat(assistants::finance(builder(), &config)?),
            Intro {
                title: "Personal Finance Assistant",
                lines: &[
                    "Track expenses, set budgets and reach your savings goals.",
                    "Examples: 'I spent $12 on lunch', 'Show my spending this month'",
                ],
                prompt: "Finance",
                farewell: "Goodbye! Keep up the good financial habits!",
            },
        ),
        Command::Review { file: Some(file) } => {
            let path = file.display().to_string();
            success(&format!("Code Review Agent - Reviewing: {path}"));
            let session = assistants::review(builder());
            wait(session.query(&review::review_prompt(&path)), &mut transcripts).await?;
            return Ok(());
        }
        Command::Review { file: None } => (
            Assistant::Chat(assistants::review(builder())),
            Intro {
                title: "Code Review Assistant",
                lines: &["Give me a file path to review, or ask about code quality."],
                prompt: "Review",
                farewell: "Goodbye! Happy coding!",
            },
        ),
        Command::Support => (
            Assistant::Chat(assistants::support(builder(), &config)?),
            Intro {
                title: "Customer Support Agent",
                lines: &[
                    "How can I help you today?",
                    "I can answer questions from our knowledge base and create support tickets.",
                ],
                prompt: "Support",
                farewell: "Goodbye! Have a great day!",
            },
        ),
        Command::Orchestrate { task } => {
            let coordinator = SessionBuilder::with_model_provider(provider.clone());
            let orchestrator =
                assistants::orchestrator(coordinator, provider.clone(), &config)?;
            if !task.is_empty() {
                let result =
                    wait(orchestrator.execute_task(&task.join(" ")), &mut transcripts).await;
                println!("\n{}", RULE.bright_green());
                println!("{}", "  RESULT".bright_green());
                println!("{}", RULE.bright_green());
                println!("{result}\n");
                return Ok(());
            }
            (
                Assistant::Team(orchestrator),
                Intro {
                    title: "Multi-Agent Task Orchestrator",
                    lines: &[
                        "This orchestrator coordinates multiple specialized agents:",
                        "  - Research Agent - Information gathering",
                        "  - Analysis Agent - Data analysis and insights",
                        "  - Code Agent - Software development",
                        "  - Report Agent - Documentation and reporting",
                    ],
                    prompt: "Task",
                    farewell: "Goodbye! Great working with the team!",
                },
            )
        }
    };

    repl(&assistant, &intro, &mut transcripts).await;
    Ok(())
}

async fn repl(assistant: &Assistant, intro: &Intro, transcripts: &mut Transcripts) {
    println!("{}", RULE.bright_magenta());
    println!("  {}", intro.title.bright_magenta().bold());
    println!("{}\n", RULE.bright_magenta());
    for line in intro.lines {
        println!("{line}");
    }
    println!("\nType 'quit' or 'exit' to stop, 'clear' to start over.\n");

    loop {
        print!("{} ", format!("[{}] >", intro.prompt).bright_blue());
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.to_lowercase().as_str() {
            "quit" | "exit" | "bye" => {
                success(intro.farewell);
                break;
            }
            "clear" | "reset" => {
                assistant.reset();
                success("Conversation cleared!");
                continue;
            }
            _ => {}
        }

        match assistant {
            Assistant::Chat(session) => {
                if let Err(err) = wait(session.query(line), transcripts).await {
                    debug!("turn failed: {err}");
                }
            }
            Assistant::Research(research) => {
                let Some(topic) = report_topic(line) else {
                    if let Err(err) = wait(research.query(line), transcripts).await {
                        debug!("turn failed: {err}");
                    }
                    continue;
                };
                if topic.is_empty() {
                    failure("Please specify a topic for the report");
                    continue;
                }
                let file_name = format!("research-{}", topic.chars().take(30).collect::<String>());
                let report = wait(
                    research.generate_report(topic, DEFAULT_NUM_SOURCES, Some(&file_name)),
                    transcripts,
                )
                .await;
                match report {
                    Ok(report) => {
                        agent_message(&report.content);
                        if let Some(path) = report.path {
                            success(&format!("Report saved to {}", path.display()));
                        }
                    }
                    Err(err) => failure(&format!("Could not generate the report: {err}")),
                }
            }
            Assistant::Team(orchestrator) => {
                let result = wait(orchestrator.execute_task(line), transcripts).await;
                agent_message(&result);
            }
        }
    }
}

/// `report <topic>` → `Some(topic)`.
fn report_topic(line: &str) -> Option<&str> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    command.eq_ignore_ascii_case("report").then(|| rest.trim())
}

/// Drives `fut` while showing a spinner and printing the assistant's
/// messages as they arrive.
async fn wait<F: Future>(fut: F, transcripts: &mut Transcripts) -> F::Output {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut fut = pin!(fut);
    let mut ticker = interval(Duration::from_millis(100));
    let mut progress_bar: Option<ProgressBar> = None;

    let output = loop {
        select! {
            output = &mut fut => break output,
            Some((transcript, source)) = transcripts.recv() => {
                // Finish the progress bar before printing anything else.
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
                if source == TranscriptSource::Assistant {
                    agent_message(&transcript);
                }
            }
            _ = ticker.tick() => {
                progress_bar
                    .get_or_insert_with(|| {
                        let progress_bar = ProgressBar::new_spinner();
                        progress_bar.set_style(progress_style.clone());
                        progress_bar.set_message("🤔 Thinking...");
                        progress_bar
                    })
                    .inc(1);
            }
        }
    };

    if let Some(progress_bar) = progress_bar {
        progress_bar.finish_and_clear();
    }
    while let Ok((transcript, source)) = transcripts.try_recv() {
        if source == TranscriptSource::Assistant {
            agent_message(&transcript);
        }
    }
    output
}

fn agent_message(message: &str) {
    println!("{}🤖 {}\n", BAR_CHAR.bright_cyan(), message.bright_white());
}

fn success(message: &str) {
    println!("{}", message.bright_green());
}

fn failure(message: &str) {
    eprintln!("{}", message.bright_red());
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
