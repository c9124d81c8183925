//! Terminal front-end for the chatline streaming chat client.
//!
//!   chatline chat "Who has Kubernetes experience?"
//!   chatline chat                      # interactive session
//!   chatline upload resumes/*.pdf

mod interrupt;
mod render;
mod transcript;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chatline::{ChatClient, ClientError};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use interrupt::Interrupt;
use render::StreamPrinter;
use transcript::{Sender, Transcript};

#[derive(Debug, Parser)]
#[command(name = "chatline", version, about = "Chat with the resume assistant backend")]
struct Cli {
    /// Backend base URL.
    #[arg(
        long,
        global = true,
        env = chatline::API_URL_ENV,
        default_value = chatline::DEFAULT_BASE_URL
    )]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one message, or start an interactive session when none is given.
    Chat {
        message: Option<String>,
        /// Print tool responses after each reply.
        #[arg(long)]
        show_tools: bool,
    },
    /// Upload PDF files for processing.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ChatClient::new()
        .try_base_url(&cli.api_url)
        .context("invalid --api-url")?;
    let interrupt = Interrupt::install();

    match cli.command {
        Command::Chat {
            message: Some(message),
            show_tools,
        } => {
            let mut transcript = Transcript::new();
            chat_once(&client, &interrupt, &mut transcript, &message, show_tools).await;
        }
        Command::Chat {
            message: None,
            show_tools,
        } => repl(&client, &interrupt, show_tools).await?,
        Command::Upload { files } => {
            let mut transcript = Transcript::new();
            upload(&client, &mut transcript, &files).await;
        }
    }

    Ok(())
}

/// Send one message and record the outcome.
///
/// Ctrl-C cancels the in-flight stream; text already printed stays on screen.
async fn chat_once(
    client: &ChatClient,
    interrupt: &Interrupt,
    transcript: &mut Transcript,
    message: &str,
    show_tools: bool,
) {
    transcript.push_user(message);

    let cancel = interrupt.begin();
    let mut printer = StreamPrinter::new(std::io::stdout());
    let result = client
        .send_chat(message, &cancel, |text| printer.update(text))
        .await;
    interrupt.end();
    let printed = printer.has_output();
    printer.finish();

    match result {
        Ok(reply) => {
            if !printed && !reply.text.is_empty() {
                println!("{}", reply.text);
            }
            if show_tools {
                print_tools(reply.tool_output.as_deref());
            }
            transcript.push_reply(reply);
        }
        Err(ClientError::Cancelled) => {
            eprintln!("(cancelled)");
            transcript.push_notice("(cancelled)");
        }
        Err(e) => {
            tracing::error!(error = %e, "chat failed");
            println!("{}", e.user_message());
            transcript.push_notice(e.user_message());
        }
    }
}

async fn upload(client: &ChatClient, transcript: &mut Transcript, files: &[PathBuf]) {
    match client.upload_files(files).await {
        Ok(receipt) => {
            let notice = format!("✅ {}", receipt.display_message());
            println!("{notice}");
            transcript.push_notice(notice);
        }
        Err(e) => {
            tracing::error!(error = %e, "upload failed");
            let notice = format!("❌ {}", e.user_message());
            println!("{notice}");
            transcript.push_notice(notice);
        }
    }
}

fn print_tools(tool_output: Option<&str>) {
    match tool_output {
        Some(output) => println!("🔧 Tool response:\n{output}"),
        None => println!("🔧 No tool response."),
    }
}

fn print_history(transcript: &Transcript) {
    for entry in transcript.entries() {
        let who = match entry.sender {
            Sender::User => "you",
            Sender::Bot => "bot",
        };
        let marker = if entry.tool_output.is_some() { " 🔧" } else { "" };
        println!("[{}] {who}: {}{marker}", entry.time_label(), entry.text);
    }
}

/// Interactive session. One send is in flight at a time.
async fn repl(client: &ChatClient, interrupt: &Interrupt, show_tools: bool) -> anyhow::Result<()> {
    let mut transcript = Transcript::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("What's on your mind today? (/upload <pdf>..., /tools, /history, /quit)");
    loop {
        print!("> ");
        std::io::stdout().flush().context("failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => {}
            "/quit" | "/exit" => break,
            "/tools" => print_tools(transcript.last_tool_output()),
            "/history" => print_history(&transcript),
            _ if input.starts_with("/upload") => {
                let files: Vec<PathBuf> = input
                    .trim_start_matches("/upload")
                    .split_whitespace()
                    .map(PathBuf::from)
                    .collect();
                upload(client, &mut transcript, &files).await;
            }
            _ => chat_once(client, interrupt, &mut transcript, input, show_tools).await,
        }
    }

    Ok(())
}
