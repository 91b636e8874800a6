//! A terminal chat client for the relay proxy.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use relaychat_model::{ChatMessage, CredentialProvider, Role};
use relaychat_proxy_client::{ProxyRelay, RelayConfigBuilder};
use relaychat_session::{ChatSessionBuilder, SessionError};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

struct EnvCredentials {
    token: String,
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("RELAYCHAT_API_KEY") else {
        eprintln!("RELAYCHAT_API_KEY environment variable is not set");
        return;
    };

    let mut config = RelayConfigBuilder::with_credentials(Arc::new(
        EnvCredentials { token: api_key },
    ));
    if let Ok(base_url) = env::var("RELAYCHAT_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    let provider = ProxyRelay::new(config.build());

    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let session = ChatSessionBuilder::with_provider(provider)
        .on_update(move |messages| {
            update_tx.send(messages.to_vec()).ok();
        })
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/reset" {
            session.reset();
            println!("{}", "Started a new conversation.".bright_black());
            continue;
        }

        let send = session.send(ChatMessage::user(line));
        tokio::pin!(send);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(progress_style.clone());
        spinner.set_message("🤔 Thinking...");
        let mut progress_bar = Some(spinner);
        let mut printed = 0;

        let result = loop {
            select! {
                result = &mut send => {
                    break result;
                },
                update = update_rx.recv() => {
                    let Some(messages) = update else {
                        break 'outer;
                    };
                    printed =
                        print_growth(&messages, printed, &mut progress_bar);
                },
                _ = sleep(Duration::from_millis(100)) => {
                    if let Some(progress_bar) = &progress_bar {
                        progress_bar.inc(1);
                    }
                }
            }
        };

        // Snapshots may still be queued behind the final result.
        while let Ok(messages) = update_rx.try_recv() {
            printed = print_growth(&messages, printed, &mut progress_bar);
        }
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        if printed > 0 {
            println!();
        }

        if let Err(err) = result {
            let bar = BAR_CHAR.bright_red();
            match &err {
                SessionError::Relay(cause) if cause.is_retryable() => {
                    println!("{bar}⚠️  {err} (you can retry)");
                }
                _ => println!("{bar}⚠️  {err}"),
            }
        }
    }
}

/// Prints the part of the assistant reply that arrived since the last
/// snapshot, clearing the spinner before the first characters.
fn print_growth(
    messages: &[ChatMessage],
    printed: usize,
    progress_bar: &mut Option<ProgressBar>,
) -> usize {
    let Some(last) = messages.last() else {
        return printed;
    };
    if last.role != Role::Assistant {
        return printed;
    }
    if let Some(progress_bar) = progress_bar.take() {
        progress_bar.finish_and_clear();
        print!("{}🤖 ", BAR_CHAR.bright_cyan());
    }
    // Snapshots grow by appending deltas, so `printed` always sits on
    // a character boundary of the latest content.
    if last.content.len() > printed {
        print!("{}", (&last.content[printed..]).bright_white());
        std::io::stdout().flush().ok();
        return last.content.len();
    }
    printed
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
