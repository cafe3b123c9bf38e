//! Parley application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Open the local session file
//! 3. Build the HTTP clients for identity, history, NLU and grammar
//! 4. Resume or start a session and run the terminal REPL

mod cli;
mod render;
mod repl;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use parley_chat::{DialogueRouter, Routed, RouterServices, SessionStore, TextNormalizer};
use parley_client::http::build_client;
use parley_client::{HttpGrammarClient, HttpHistoryClient, HttpIdentityClient, HttpNluClient};
use parley_core::{AuthStep, ParleyConfig};

use cli::CliArgs;
use render::{latest_buttons, render_message, Palette};
use repl::Command;

const SESSION_FILE: &str = "session.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let first_run = !config_file.exists();
    let mut config = ParleyConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    // Logging goes to stderr so it never interleaves with the transcript.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));

    if first_run {
        if let Err(e) = ParleyConfig::default().save(&config_file) {
            tracing::warn!(error = %e, "Could not write default config");
        }
    }

    // Session.
    let data_dir = config.general.resolved_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let session = Arc::new(SessionStore::open(&data_dir.join(SESSION_FILE))?);
    tracing::info!(user_id = %session.user_id(), "Session store opened");

    // Services.
    let endpoints = &config.endpoints;
    let client = build_client(Duration::from_secs(endpoints.request_timeout_secs))?;
    let normalizer = if config.chat.grammar_correction {
        TextNormalizer::new(
            Arc::new(HttpGrammarClient::new(client.clone(), &endpoints.grammar_url)),
            config.chat.grammar_language.as_str(),
        )
    } else {
        tracing::info!("Grammar correction disabled");
        TextNormalizer::disabled()
    };
    let services = RouterServices {
        identity: Arc::new(HttpIdentityClient::new(client.clone(), &endpoints.identity_url)),
        history: Arc::new(HttpHistoryClient::new(client.clone(), &endpoints.history_url)),
        nlu: Arc::new(HttpNluClient::new(client, &endpoints.nlu_url)),
        normalizer,
    };

    let router = DialogueRouter::new(&config, session, services);
    let step = router.start().await;
    tracing::info!(step = %step, "Session started");

    run_repl(&router).await?;

    router.flush_persistence().await;
    tracing::info!("Parley shut down");
    Ok(())
}

/// Read lines from stdin until EOF or `/quit`, printing every new
/// transcript entry after each action.
async fn run_repl(router: &DialogueRouter) -> std::io::Result<()> {
    let mut shown = print_new(router, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(router)?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match repl::parse(&line) {
            Command::Input(text) => match router.submit(&text).await {
                Ok(Routed::LoggedOut) => shown = 0,
                Ok(routed) => tracing::debug!(?routed, "Input handled"),
                Err(e) => println!("! {}", e),
            },
            Command::Press(n) => {
                let buttons = latest_buttons(&router.transcript());
                match buttons.get(n - 1) {
                    Some(button) => match router.press_button(button).await {
                        Ok(Routed::Link(url)) => println!("Open in a browser: {}", url),
                        Ok(routed) => tracing::debug!(?routed, "Button handled"),
                        Err(e) => println!("! {}", e),
                    },
                    None => println!("! no button {}", n),
                }
            }
            Command::Suggest(partial) => {
                let suggestions = router.suggestions(&partial);
                if suggestions.is_empty() {
                    println!("(no suggestions)");
                }
                for suggestion in suggestions {
                    println!("  {}", suggestion);
                }
            }
            Command::Clear => {
                router.clear_chat().await;
                shown = 0;
            }
            Command::Theme => match router.toggle_theme() {
                Ok(theme) => {
                    println!("Theme: {}", theme);
                    shown = 0;
                }
                Err(e) => println!("! {}", e),
            },
            Command::Help => println!("{}", repl::HELP),
            Command::Quit => break,
            Command::Invalid(reason) => println!("! {}", reason),
        }
        shown = print_new(router, shown);
    }
    Ok(())
}

/// Print transcript entries from `shown` onward and return the new count.
/// A transcript shorter than `shown` was reset, so it is printed in full.
fn print_new(router: &DialogueRouter, shown: usize) -> usize {
    let transcript = router.transcript();
    let start = if shown > transcript.len() { 0 } else { shown };
    let palette = Palette::for_theme(router.theme());
    for message in &transcript[start..] {
        print!("{}", render_message(message, palette));
    }
    transcript.len()
}

fn prompt(router: &DialogueRouter) -> std::io::Result<()> {
    let label = match router.auth_step() {
        AuthStep::Authenticated => router
            .profile()
            .map(|p| p.name)
            .unwrap_or_else(|| "you".to_string()),
        _ => router.input_hint().to_string(),
    };
    print!("{}> ", label);
    std::io::stdout().flush()
}
