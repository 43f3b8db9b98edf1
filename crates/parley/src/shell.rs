// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley shell` command implementation.
//!
//! Interactive REPL over the relay with readline history. Replies stream to
//! stdout as they arrive; Ctrl-C during a reply cancels it and keeps the
//! conversation as it was before the reply started. Conversations persist to
//! the configured store file between runs.

use std::io::Write;

use colored::{Color, Colorize};
use parley_client::{ChatSession, JsonFileStore, RelayClient, SendOutcome, StreamEvent};
use parley_config::ParleyConfig;
use parley_core::{ParleyError, Role};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const HELP: &str = "\
/new                 start a new conversation
/list                list conversations
/switch <n|id>       switch to conversation n from /list, or by id
/rename <title>      rename the current conversation
/delete [n|id]       delete a conversation (default: current)
/clear               remove all messages from the current conversation
/history             show the current conversation
/models              list installed models
/model [name]        show or set the model
/stream on|off       toggle streaming replies
/theme dark|light    set the color theme
/quit                exit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Help,
    New,
    List,
    Switch(String),
    Rename(String),
    Delete(Option<String>),
    Clear,
    History,
    Models,
    Model(Option<String>),
    Stream(bool),
    Theme(bool),
    Quit,
    Send(String),
}

/// Parses one input line. Plain text is a message to send.
fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(ShellCommand::Send(line.to_string()));
    }

    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };
    match name {
        "/help" | "/?" => Ok(ShellCommand::Help),
        "/new" => Ok(ShellCommand::New),
        "/list" | "/ls" => Ok(ShellCommand::List),
        "/switch" if !arg.is_empty() => Ok(ShellCommand::Switch(arg.to_string())),
        "/switch" => Err("usage: /switch <n|id>".to_string()),
        "/rename" if !arg.is_empty() => Ok(ShellCommand::Rename(arg.to_string())),
        "/rename" => Err("usage: /rename <title>".to_string()),
        "/delete" if arg.is_empty() => Ok(ShellCommand::Delete(None)),
        "/delete" => Ok(ShellCommand::Delete(Some(arg.to_string()))),
        "/clear" => Ok(ShellCommand::Clear),
        "/history" => Ok(ShellCommand::History),
        "/models" => Ok(ShellCommand::Models),
        "/model" if arg.is_empty() => Ok(ShellCommand::Model(None)),
        "/model" => Ok(ShellCommand::Model(Some(arg.to_string()))),
        "/stream" => match arg {
            "on" => Ok(ShellCommand::Stream(true)),
            "off" => Ok(ShellCommand::Stream(false)),
            _ => Err("usage: /stream on|off".to_string()),
        },
        "/theme" => match arg {
            "dark" => Ok(ShellCommand::Theme(true)),
            "light" => Ok(ShellCommand::Theme(false)),
            _ => Err("usage: /theme dark|light".to_string()),
        },
        "/quit" | "/exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command {other}, try /help")),
    }
}

/// Colors for the two themes.
#[derive(Debug, Clone, Copy)]
struct Palette {
    prompt: Color,
    assistant: Color,
}

impl Palette {
    fn for_theme(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                prompt: Color::BrightGreen,
                assistant: Color::BrightCyan,
            }
        } else {
            Self {
                prompt: Color::Green,
                assistant: Color::Blue,
            }
        }
    }
}

/// Runs the `parley shell` interactive REPL.
pub async fn run_shell(config: ParleyConfig, streaming: bool) -> Result<(), ParleyError> {
    let relay = RelayClient::new(&config.client.relay_url)?;
    let file = JsonFileStore::new(&config.client.store_path);
    let mut session = ChatSession::open(relay, file, config.client.history_pairs).await?;
    session.set_streaming(streaming);

    if session.transport().health().await.is_err() {
        eprintln!(
            "{}",
            format!(
                "relay not reachable at {}, start it with `parley serve`",
                session.transport().base_url()
            )
            .yellow()
        );
    }

    let mut rl = DefaultEditor::new()
        .map_err(|e| ParleyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "parley shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());
    if let Some(current) = session.current() {
        println!("{}", format!("continuing \"{}\"", current.title).dimmed());
    }

    loop {
        let palette = Palette::for_theme(session.preferences().dark_mode);
        let prompt = format!("{}> ", "you".color(palette.prompt));
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(usage) => {
                eprintln!("{}", usage.yellow());
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = handle_command(&mut session, command, palette).await {
            eprintln!("{}: {e}", "error".red());
        }
    }

    Ok(())
}

async fn handle_command(
    session: &mut ChatSession<RelayClient>,
    command: ShellCommand,
    palette: Palette,
) -> Result<(), ParleyError> {
    match command {
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::New => {
            session.new_conversation().await?;
            println!("{}", "started a new conversation".dimmed());
        }
        ShellCommand::List => print_list(session),
        ShellCommand::Switch(target) => {
            let id = resolve_target(session, &target)?;
            session.switch_to(&id).await?;
            if let Some(current) = session.current() {
                println!("{}", format!("switched to \"{}\"", current.title).dimmed());
            }
        }
        ShellCommand::Rename(title) => {
            let id = current_id(session)?;
            session.rename(&id, &title).await?;
        }
        ShellCommand::Delete(n) => {
            let id = match n {
                Some(target) => resolve_target(session, &target)?,
                None => current_id(session)?,
            };
            let removed = session.delete(&id).await?;
            println!("{}", format!("deleted \"{}\"", removed.title).dimmed());
        }
        ShellCommand::Clear => {
            let id = current_id(session)?;
            session.clear(&id).await?;
        }
        ShellCommand::History => print_history(session, palette),
        ShellCommand::Models => {
            let models = session.transport().list_models(None, None).await?;
            let selected = session.settings().model.clone();
            for model in models {
                let marker = if selected.as_deref() == Some(model.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {}", model.name);
            }
        }
        ShellCommand::Model(None) => match &session.settings().model {
            Some(model) => println!("{model}"),
            None => println!("{}", "relay default".dimmed()),
        },
        ShellCommand::Model(Some(name)) => {
            session.settings_mut().model = Some(name);
        }
        ShellCommand::Stream(on) => session.set_streaming(on),
        ShellCommand::Theme(dark) => session.set_dark_mode(dark).await?,
        ShellCommand::Send(text) => send(session, &text, palette).await?,
        ShellCommand::Quit => {}
    }
    Ok(())
}

async fn send(
    session: &mut ChatSession<RelayClient>,
    text: &str,
    palette: Palette,
) -> Result<(), ParleyError> {
    if !session.streaming() {
        let outcome = session.send(text).await?;
        print_outcome(&outcome, palette, true);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut in_thinking = false;
    let mut started = false;
    let mut stdout = std::io::stdout();
    let outcome = session
        .send_streaming(text, &cancel, |event| {
            if !started {
                print!("{} ", "assistant>".color(palette.assistant));
                started = true;
            }
            match event {
                StreamEvent::Thinking(delta) => {
                    in_thinking = true;
                    print!("{}", delta.dimmed());
                }
                StreamEvent::Content(delta) => {
                    if in_thinking {
                        println!();
                        in_thinking = false;
                    }
                    print!("{delta}");
                }
            }
            let _ = stdout.flush();
        })
        .await;
    watcher.abort();

    let outcome = outcome?;
    if started {
        println!();
    }
    print_outcome(&outcome, palette, !started);
    Ok(())
}

fn print_outcome(outcome: &SendOutcome, palette: Palette, show_reply: bool) {
    match outcome {
        SendOutcome::Replied(reply) => {
            if show_reply {
                if let Some(thinking) = &reply.thinking {
                    println!("{}", thinking.dimmed());
                }
                println!("{} {}", "assistant>".color(palette.assistant), reply.content);
            }
        }
        SendOutcome::Failed { notice, error } => {
            debug!(error = %error, "send failed");
            println!("{} {}", "assistant>".color(palette.assistant), notice.content.red());
            eprintln!("{}", format!("({error})").dimmed());
        }
        SendOutcome::Cancelled => println!("{}", "cancelled".yellow()),
    }
}

fn print_list(session: &ChatSession<RelayClient>) {
    let current = session.store().current_id();
    let list = session.store().list();
    if list.is_empty() {
        println!("{}", "no conversations yet".dimmed());
        return;
    }
    for (i, conversation) in list.iter().enumerate() {
        let marker = if current == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>2}. {}  {}",
            i + 1,
            conversation.title,
            format!(
                "({} messages, {})",
                conversation.messages.len(),
                conversation.updated_at.format("%Y-%m-%d %H:%M")
            )
            .dimmed()
        );
    }
}

fn print_history(session: &ChatSession<RelayClient>, palette: Palette) {
    let Some(current) = session.current() else {
        println!("{}", "no conversation selected".dimmed());
        return;
    };
    println!("{}", current.title.bold());
    for message in &current.messages {
        match message.role {
            Role::User => println!("{} {}", "you>".color(palette.prompt), message.content),
            Role::Assistant => {
                println!("{} {}", "assistant>".color(palette.assistant), message.content)
            }
        }
    }
}

/// Resolves a 1-based position in the `/list` order, a full id, or a unique
/// id prefix to a conversation id.
fn resolve_target(session: &ChatSession<RelayClient>, target: &str) -> Result<String, ParleyError> {
    let list = session.store().list();
    let not_found = || ParleyError::NotFound {
        id: target.to_string(),
    };

    if let Ok(n) = target.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| list.get(i))
            .map(|c| c.id.clone())
            .ok_or_else(not_found);
    }

    let mut matches = list.iter().filter(|c| c.id.starts_with(target));
    match (matches.next(), matches.next()) {
        (Some(c), None) => Ok(c.id.clone()),
        _ => Err(not_found()),
    }
}

fn current_id(session: &ChatSession<RelayClient>) -> Result<String, ParleyError> {
    session
        .store()
        .current_id()
        .map(str::to_string)
        .ok_or_else(|| ParleyError::NotFound {
            id: "current".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_command("  hello there "),
            Ok(ShellCommand::Send("hello there".into()))
        );
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(parse_command("/switch 2"), Ok(ShellCommand::Switch("2".into())));
        assert_eq!(
            parse_command("/rename  Trip plans "),
            Ok(ShellCommand::Rename("Trip plans".into()))
        );
        assert_eq!(parse_command("/delete"), Ok(ShellCommand::Delete(None)));
        assert_eq!(
            parse_command("/delete 3f2a"),
            Ok(ShellCommand::Delete(Some("3f2a".into())))
        );
        assert_eq!(
            parse_command("/model qwen3:14b"),
            Ok(ShellCommand::Model(Some("qwen3:14b".into())))
        );
        assert_eq!(parse_command("/stream off"), Ok(ShellCommand::Stream(false)));
        assert_eq!(parse_command("/theme dark"), Ok(ShellCommand::Theme(true)));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_command("/switch").is_err());
        assert!(parse_command("/rename").is_err());
        assert!(parse_command("/stream maybe").is_err());
        assert!(parse_command("/frobnicate").is_err());
    }
}
