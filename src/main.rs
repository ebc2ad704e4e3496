//! Terminal chat surface for the RAG customer-service backend.
//!
//! Reads lines from stdin, streams the assistant's answer token by token,
//! and prints citations when a turn completes. Configuration comes from the
//! `RAGCHAT_*` environment variables (see [`ragchat::config::ClientConfig`]).

use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use ragchat::config::ClientConfig;
use ragchat::session::ChatController;
use ragchat::sse::StreamEvent;

const HELP: &str = "commands: /new  start a new conversation
          /list list persisted conversations
          /load <id> reload a persisted conversation
          /quit exit";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    if config.token.is_none() {
        eprintln!("warning: RAGCHAT_TOKEN is not set; messages will be ignored");
    }

    let mut controller = ChatController::new(config.build_client());
    controller
        .session_mut()
        .set_bot_id(config.bot_id.clone());

    println!("ragchat connected to {}", config.base_url);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" => break,
            "/new" => {
                controller.clear_messages();
                println!("started a new conversation");
            }
            "/list" => list_conversations(&controller).await,
            _ if input.starts_with("/load ") => {
                let id = input.trim_start_matches("/load ").trim();
                match controller.load_conversation(id).await {
                    Ok(()) => print_transcript(&controller),
                    Err(err) => eprintln!("failed to load conversation: {}", err),
                }
            }
            _ => run_turn(&mut controller, input).await,
        }
    }

    Ok(())
}

fn print_prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn run_turn(controller: &mut ChatController, text: &str) {
    use std::io::Write;

    controller
        .send_message_with(text, |event, _| match event {
            StreamEvent::Token { content } => {
                print!("{}", content);
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Error { message } => {
                eprintln!("\n[stream error: {}]", message.as_deref().unwrap_or("unknown"));
            }
            _ => {}
        })
        .await;
    println!();

    if let Some(msg) = controller.session().messages.last() {
        if let Some(sources) = msg.sources.as_deref().filter(|s| !s.is_empty()) {
            println!("sources:");
            for source in sources {
                println!("  - {} ({:.2})", source.document_name, source.score);
            }
        }
    }
}

async fn list_conversations(controller: &ChatController) {
    let client = controller.client();
    match client.fetch_conversations(controller.session().bot_id.as_deref()).await {
        Ok(conversations) if conversations.is_empty() => println!("no conversations yet"),
        Ok(conversations) => {
            for conv in conversations {
                println!("  {}  {}", conv.id, conv.created_at.format("%Y-%m-%d %H:%M"));
            }
        }
        Err(err) => eprintln!("failed to list conversations: {}", err),
    }
}

fn print_transcript(controller: &ChatController) {
    for msg in &controller.session().messages {
        let speaker = match msg.role {
            ragchat::models::MessageRole::User => "you",
            ragchat::models::MessageRole::Assistant => "bot",
        };
        println!("{}: {}", speaker, msg.content);
    }
}
