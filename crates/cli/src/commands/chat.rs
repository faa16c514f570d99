//! `cypherchat chat`: interactive or single-question mode.

use std::io::Write;
use std::sync::Arc;

use cypherchat_agent::{AskRequest, SessionCoordinator, StreamEvent, initialize_agent};
use cypherchat_config::AppConfig;
use cypherchat_tools::Neo4jHttpStore;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

pub async fn run(
    message: Option<String>,
    conversation: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    // Check for API key early and give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!("    CYPHERCHAT_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = cypherchat_providers::build_from_config(&config)?;
    let store = Arc::new(Neo4jHttpStore::from_config(&config.graph)?);
    let init = initialize_agent(provider, store, &config).await;
    if let Some(e) = &init.schema_error {
        eprintln!("  [Warning] Schema unavailable, answering without it: {e}");
    }

    let conversation_id =
        conversation.unwrap_or_else(|| config.agent.default_conversation_id.clone());
    let coordinator = SessionCoordinator::new(init.agent, conversation_id.as_str())
        .with_buffer(config.gateway.stream_buffer);

    if let Some(question) = message {
        ask(&coordinator, &question).await?;
        return Ok(());
    }

    println!();
    println!("  cypherchat: interactive mode");
    println!();
    println!("  Model:         {}", config.default_model);
    println!("  Conversation:  {conversation_id}");
    println!(
        "  Schema:        {}",
        if init.schema_text.is_some() { "loaded" } else { "not loaded" }
    );
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        if let Err(e) = ask(&coordinator, question).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn ask(coordinator: &SessionCoordinator, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut rx = coordinator.ask(AskRequest::new(question)).await?;
    while let Some(event) = rx.recv().await {
        for line in render_event(&event) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Terminal lines for one stream event.
///
/// Intermediate `answer` events are not printed; the `final` event
/// carries the same text.
fn render_event(event: &StreamEvent) -> Vec<String> {
    match event {
        StreamEvent::Thinking { message } => vec![format!("  ... {message}")],
        StreamEvent::Reasoning { message } => vec![format!("  ~ {message}")],
        StreamEvent::ToolStart { message, .. } => vec![format!("  > {message}")],
        StreamEvent::ToolEnd {
            message, success, ..
        } => {
            let mark = if *success { "ok" } else { "!!" };
            vec![format!("  {mark} {message}")]
        }
        StreamEvent::Answer { .. } => Vec::new(),
        StreamEvent::Final { answer } => {
            let mut lines = vec![String::new()];
            lines.extend(answer.answer.lines().map(|line| format!("  Assistant > {line}")));
            if !answer.renderables.is_empty() {
                lines.push(format!(
                    "  ({} renderable block(s) attached)",
                    answer.renderables.len()
                ));
            }
            lines
        }
        StreamEvent::Error { message } => vec![format!("  [Error] {message}")],
    }
}
