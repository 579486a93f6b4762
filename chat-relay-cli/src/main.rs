mod client;

use std::io::Write;

use anyhow::Result;
use chat_relay_shared::{ChatMessage, MessageRole};
use client::{RelayClient, StreamOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://127.0.0.1:3001";

struct App {
    messages: Vec<ChatMessage>,
}

impl App {
    fn new() -> Self {
        Self { messages: Vec::new() }
    }

    fn add_user_message(&mut self, content: String) {
        self.messages.push(ChatMessage {
            role: MessageRole::User,
            content,
        });
    }

    fn finish_streaming(&mut self, content: String) {
        if !content.is_empty() {
            self.messages.push(ChatMessage {
                role: MessageRole::Assistant,
                content,
            });
        }
    }

    /// Drop the unanswered user turn so the history stays alternating.
    fn abandon_turn(&mut self) {
        if matches!(self.messages.last(), Some(m) if m.role == MessageRole::User) {
            self.messages.pop();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // stdout carries the conversation; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let base_url = std::env::var("CHAT_RELAY_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let client = RelayClient::new(&base_url);
    let mut app = App::new();

    println!("Connected to {} (/reset clears history, /quit exits)", client.chat_url());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                app.messages.clear();
                println!("History cleared.");
                continue;
            }
            _ => {}
        }

        app.add_user_message(input.to_string());
        let outcome = client
            .stream_chat(&app.messages, |delta| {
                print!("{delta}");
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();

        match outcome {
            Ok(StreamOutcome::Completed(text)) => app.finish_streaming(text),
            Ok(StreamOutcome::Failed { partial, error }) => {
                debug!("Discarding {} chars of partial reply", partial.len());
                eprintln!("[error] {error}");
                app.abandon_turn();
            }
            Ok(StreamOutcome::Truncated(text)) => {
                eprintln!("[stream ended early]");
                app.finish_streaming(text);
            }
            Err(e) => {
                error!("Request failed: {:#}", e);
                eprintln!("[request failed] {e}");
                app.abandon_turn();
            }
        }
    }

    Ok(())
}
