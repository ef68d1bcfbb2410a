use std::io::BufRead;
use std::io::Write;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use resumerag::config::AppConfig;
use resumerag::models::ChatMessage;
use resumerag::rag::ChatService;
use resumerag::session::ChatWindow;
use tracing::info;

#[derive(Parser)]
#[command(name = "resumerag")]
#[command(about = "Portfolio chatbot CLI: ask about the resume, chat, or reload the corpus")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to a config file (defaults to config.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        question: String,
    },
    /// Interactive chat session with a bounded history window
    Chat,
    /// Re-read the corpus artifacts written by the ingestion job
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    if cli.verbose {
        resumerag::logging::init_logging_with_level("debug")?;
    } else {
        resumerag::logging::init_logging(Some(&config))?;
    }

    let service = ChatService::new(&config)?;

    match cli.command {
        Commands::Ask { question } => {
            let reply = service.answer(&question, &[]).await;
            println!("{}", reply.response);
            println!("(coverage: {:.2})", reply.context_coverage);
        }
        Commands::Chat => run_chat(&service).await?,
        Commands::Reload => {
            let summary = service.reload()?;
            println!(
                "Corpus reloaded: version {}, {} fragments, dense={}, lexical={}",
                summary.version, summary.fragments, summary.dense, summary.lexical
            );
        }
    }

    Ok(())
}

async fn run_chat(service: &ChatService) -> Result<()> {
    println!("Interactive chat. Empty line or Ctrl-D to exit.");
    let mut window = ChatWindow::new();
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let user_input = line.trim();
        if user_input.is_empty() {
            break;
        }

        let history = window.messages();
        let reply = service.answer(user_input, &history).await;

        println!("{}", reply.response);
        println!("(coverage: {:.2})", reply.context_coverage);

        // The caller appends the raw input, not the normalized form
        window.push(ChatMessage::user(user_input));
        window.push(ChatMessage::assistant(reply.response));
    }

    info!("Chat session ended");
    Ok(())
}
