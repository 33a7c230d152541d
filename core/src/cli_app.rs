use crate::api_client::ApiClient;
use crate::config::Config;
use crate::conversation::{Conversation, DeleteOutcome, Skip, SubmitOutcome};
use crate::directory::BotScope;
use crate::error::{ChatError, Result};
use crate::service::ChatService;
use crate::token_store::TokenStore;
use crate::types::{Bot, ConversationEvent, Message, Phase, Sender};
use colored::*;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Shared CLI implementation for the `botchat` binary.
///
/// `args` are the positional arguments left after config flags were
/// consumed, starting with the binary name.
pub async fn run(args: Vec<String>, config: Config) -> anyhow::Result<()> {
    let bin = args
        .first()
        .map(|s| s.as_str())
        .unwrap_or("botchat")
        .to_string();

    if args.len() < 2 {
        print_usage(&bin);
        return Ok(());
    }

    let tokens = TokenStore::open(&config.token_path());
    let client = ApiClient::new(&config, tokens);
    let command = &args[1];

    match command.as_str() {
        "login" => {
            if args.len() < 4 {
                eprintln!("{}", format!("Usage: {} login <username> <password>", bin).yellow());
                return Ok(());
            }
            client.login(&args[2], &args[3]).await?;
            println!("{} Logged in as {}", "✓".green().bold(), args[2].cyan());
        }
        "logout" => {
            client.logout().await?;
            println!("{} Logged out", "✓".green().bold());
        }
        "bots" => {
            let mine = args[2..].iter().any(|a| a == "--mine");
            let filter = args[2..]
                .iter()
                .filter(|a| a.as_str() != "--mine")
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            let scope = if mine { BotScope::Mine } else { BotScope::Public };
            list_bots(&client, scope, &filter).await?;
        }
        "bot" => {
            let bot_id = bot_id_arg(&args, &bin, "bot")?;
            let bot = client.get_bot(bot_id).await?;
            print_bot_details(&client, &bot);
        }
        "history" => {
            let bot_id = bot_id_arg(&args, &bin, "history")?;
            let conv = Conversation::new(Arc::new(client), bot_id);
            conv.load_history().await?;
            print_transcript(&conv.messages().await);
        }
        "send" => {
            if args.len() < 4 {
                eprintln!("{}", format!("Usage: {} send <bot_id> <message>", bin).yellow());
                return Ok(());
            }
            let bot_id = bot_id_arg(&args, &bin, "send")?;
            let message = args[3..].join(" ");
            let conv = Conversation::new(Arc::new(client), bot_id);
            match conv.submit(&message).await? {
                SubmitOutcome::Replied(reply) => print_message(&reply),
                SubmitOutcome::Skipped(skip) => print_skip(skip),
            }
        }
        "undo" => {
            let bot_id = bot_id_arg(&args, &bin, "undo")?;
            let conv = Conversation::new(Arc::new(client), bot_id);
            conv.load_history().await?;
            undo(&conv).await?;
        }
        "chat" => {
            let bot_id = bot_id_arg(&args, &bin, "chat")?;
            chat(Conversation::new(Arc::new(client), bot_id)).await?;
        }
        _ => {
            eprintln!("{} Unknown command: {}", "✗".red().bold(), command.red());
            print_usage(&bin);
        }
    }

    Ok(())
}

fn bot_id_arg(args: &[String], bin: &str, command: &str) -> anyhow::Result<i64> {
    let raw = args
        .get(2)
        .ok_or_else(|| anyhow::anyhow!("Usage: {} {} <bot_id>", bin, command))?;
    raw.parse::<i64>()
        .map_err(|_| anyhow::anyhow!("Bot id must be a number (got {:?})", raw))
}

fn print_usage(bin: &str) {
    println!("{}", "🤖 Botchat CLI".bright_cyan().bold());
    println!();
    println!("{}", "Usage:".bright_white().bold());
    println!("  {} [--api-url <url>] [--data-dir <path>] [--timeout-ms <ms>] <command> [args]", bin.cyan());
    println!();
    println!("{}", "Commands:".bright_white().bold());
    println!(
        "  {} <username> <password>  Log in and keep the access token",
        "login".cyan()
    );
    println!("  {}                        Forget the access token", "logout".cyan());
    println!(
        "  {} [--mine] [filter]        List public bots, or your own",
        "bots".cyan()
    );
    println!("  {} <bot_id>                 Show one bot", "bot".cyan());
    println!("  {} <bot_id>             Print the conversation", "history".cyan());
    println!("  {} <bot_id> <message>      Send one message", "send".cyan());
    println!("  {} <bot_id>                Delete the last exchange", "undo".cyan());
    println!(
        "  {} <bot_id>                Interactive chat (/undo, /reload, /quit)",
        "chat".cyan()
    );
}

async fn list_bots(client: &ApiClient, scope: BotScope, filter: &str) -> anyhow::Result<()> {
    let bots = client.list_bots(scope, Some(filter)).await?;
    let title = match scope {
        BotScope::Public => "Public Bots",
        BotScope::Mine => "My Bots",
    };

    if bots.is_empty() {
        println!("{}", "No bots found".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} ({})", title, bots.len()).bright_cyan().bold()
    );
    println!("{}", "─".repeat(60).dimmed());
    for bot in &bots {
        let visibility = if bot.is_public {
            "public".green()
        } else {
            "private".yellow()
        };
        println!(
            "  {} {} [{}] {}",
            format!("#{}", bot.id).dimmed(),
            bot.name.cyan().bold(),
            visibility,
            bot.salutation.dimmed()
        );
    }
    Ok(())
}

fn print_bot_details(client: &ApiClient, bot: &Bot) {
    println!(
        "{}",
        "╭─ Bot ─────────────────────────────────────────────────────────╮".bright_cyan()
    );
    let rows = [
        ("Name", bot.name.clone()),
        ("Greeting", bot.salutation.clone()),
        ("Model", bot.ollama_model.clone()),
        ("Visibility", if bot.is_public { "public" } else { "private" }.to_string()),
        ("Portrait", client.portrait_url(bot)),
    ];
    for (label, value) in rows {
        println!(
            "{} {}",
            "│".bright_cyan(),
            format!("{:<11}{}", format!("{}:", label), value.cyan()).bright_white()
        );
    }
    println!(
        "{}",
        "╰───────────────────────────────────────────────────────────────╯".bright_cyan()
    );
    if !bot.character_prompt.is_empty() {
        println!("{}", bot.character_prompt.dimmed());
    }
}

fn print_message(message: &Message) {
    match message.sender {
        Sender::User => println!("{} {}", "you ›".green().bold(), message.content),
        Sender::Bot => println!("{} {}", "bot ›".bright_magenta().bold(), message.content),
    }
}

fn print_transcript(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", "No messages yet".dimmed());
        return;
    }
    for message in messages {
        print_message(message);
    }
}

fn print_skip(skip: Skip) {
    let reason = match skip {
        Skip::EmptyText => "nothing to send".to_string(),
        Skip::EmptyTranscript => "nothing to delete".to_string(),
        Skip::Superseded => "a newer change arrived first".to_string(),
        Skip::Busy(Phase::Sending) => "still waiting for the reply".to_string(),
        Skip::Busy(phase) => format!("busy ({:?})", phase),
    };
    println!("{} Skipped: {}", "•".yellow(), reason.yellow());
}

/// Print a top-level failure, with a login hint for rejected credentials
pub fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ChatError>() {
        Some(chat_err) => print_error(chat_err),
        None => eprintln!("{} {}", "✗".red().bold(), err.to_string().red()),
    }
}

fn print_error(err: &ChatError) {
    eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
    if err.requires_login() {
        eprintln!("  Run {} to refresh your session.", "botchat login".yellow());
    }
}

async fn undo<S: ChatService>(conv: &Conversation<S>) -> Result<()> {
    match conv.delete_last_exchange().await? {
        DeleteOutcome::Deleted(remaining) => {
            println!(
                "{} Last exchange deleted ({} messages left)",
                "✓".green().bold(),
                remaining
            );
            print_transcript(&conv.messages().await);
        }
        DeleteOutcome::Skipped(skip) => print_skip(skip),
    }
    Ok(())
}

/// Interactive loop. Messages are rendered from conversation events, so the
/// user's line shows up before the reply arrives.
async fn chat(conv: Conversation<ApiClient>) -> anyhow::Result<()> {
    match conv.load_bot().await {
        Ok(bot) => println!(
            "{} {}",
            bot.name.bright_cyan().bold(),
            bot.salutation.dimmed()
        ),
        Err(e) => print_error(&e),
    }
    if let Err(e) = conv.load_history().await {
        print_error(&e);
    }
    print_transcript(&conv.messages().await);

    let mut events = conv.subscribe();
    let renderer = tokio::spawn(async move {
        while let Some(event) = next_event(&mut events).await {
            match event {
                // The user's own line is already on screen
                ConversationEvent::MessageAppended { message, .. } if message.sender == Sender::Bot => {
                    print_message(&message)
                }
                ConversationEvent::PhaseChanged {
                    phase: Phase::Sending,
                    ..
                } => println!("{}", "  … thinking".dimmed()),
                ConversationEvent::Resynced { count, .. } => println!(
                    "{}",
                    format!("  transcript reloaded ({} messages)", count).dimmed()
                ),
                _ => {}
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }
        if let Err(e) = handle_line(&conv, &line).await {
            print_error(&e);
        }
    }

    renderer.abort();
    Ok(())
}

/// Next event for the renderer. A lagging receiver skips ahead instead of
/// stopping; `None` once the conversation is gone.
async fn next_event(events: &mut broadcast::Receiver<ConversationEvent>) -> Option<ConversationEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => warn!("Renderer skipped {} events", skipped),
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn handle_line<S: ChatService>(conv: &Conversation<S>, line: &str) -> Result<()> {
    match line.trim() {
        "/undo" => undo(conv).await?,
        "/reload" => {
            conv.load_history().await?;
            print_transcript(&conv.messages().await);
        }
        _ => match conv.submit(line).await? {
            SubmitOutcome::Replied(_) | SubmitOutcome::Skipped(Skip::EmptyText) => {}
            SubmitOutcome::Skipped(skip) => print_skip(skip),
        },
    }
    Ok(())
}
