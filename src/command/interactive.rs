//! Line-oriented interactive session.
//!
//! A bare line is taken as a repository URL and submitted. Lines starting
//! with `:` are commands; `:help` lists them.

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::api::format_star_count;
use crate::command::display::{self, TerminalObserver};
use crate::command::examples::{find_example, print_examples};
use crate::config::Config;
use crate::domain::PatternMode;
use crate::session::{IngestionSession, SessionState, SessionUpdate, SubmitOutcome};
use crate::size_scale;

const HELP: &str = "\
Commands:
  <url>               set the repository URL and submit
  :url <url>          set the repository URL
  :mode [include|exclude]
                      set or flip the pattern mode
  :pattern <text>     set the pattern text
  :size <kb>          set the file-size cutoff in kilobytes
  :slider <0-500>     set the file-size slider position
  :submit             submit the form
  :cancel             cancel the request in flight
  :tree               show the directory tree
  :toggle <n|path>    select or deselect a tree line
  :show               show the form and session state
  :save [file]        write the digest to a file (or stdout)
  :example [n|name]   list examples or load one
  :help               show this help
  :quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ToggleTarget {
    Index(usize),
    Path(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Empty,
    SubmitUrl(String),
    Url(String),
    Mode(Option<PatternMode>),
    Pattern(String),
    Size(u32),
    Slider(u32),
    Submit,
    Cancel,
    Tree,
    Toggle(ToggleTarget),
    Show,
    Save(Option<PathBuf>),
    Example(Option<String>),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplCommand::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(ReplCommand::SubmitUrl(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let command = match name {
        "url" | "u" => ReplCommand::Url(arg.to_string()),
        "mode" | "m" => {
            if arg.is_empty() {
                ReplCommand::Mode(None)
            } else {
                ReplCommand::Mode(Some(arg.parse::<PatternMode>()?))
            }
        }
        "pattern" | "p" => ReplCommand::Pattern(arg.to_string()),
        "size" => ReplCommand::Size(parse_number(arg, "size")?),
        "slider" => ReplCommand::Slider(parse_number(arg, "slider position")?),
        "submit" | "s" => ReplCommand::Submit,
        "cancel" | "c" => ReplCommand::Cancel,
        "tree" | "t" => ReplCommand::Tree,
        "toggle" | "x" => {
            if arg.is_empty() {
                return Err("Usage: :toggle <line number|path>".to_string());
            }
            match arg.parse::<usize>() {
                Ok(index) => ReplCommand::Toggle(ToggleTarget::Index(index)),
                Err(_) => ReplCommand::Toggle(ToggleTarget::Path(arg.to_string())),
            }
        }
        "show" => ReplCommand::Show,
        "save" | "w" => ReplCommand::Save((!arg.is_empty()).then(|| PathBuf::from(arg))),
        "example" | "e" => ReplCommand::Example((!arg.is_empty()).then(|| arg.to_string())),
        "help" | "h" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => return Err(format!("Unknown command :{} (try :help)", other)),
    };
    Ok(command)
}

fn parse_number(arg: &str, what: &str) -> Result<u32, String> {
    arg.parse::<u32>()
        .map_err(|_| format!("Expected a number for {}, got {:?}", what, arg))
}

enum Input {
    Line(std::io::Result<Option<String>>),
    Update(Option<SessionUpdate>),
    Interrupt,
}

pub async fn run_interactive(config: &Config) -> Result<()> {
    let client = display::build_client(config)?;
    info!(
        "Using ingestion service at {} (timeout {:?})",
        client.base_url(),
        client.timeout()
    );

    let stars_client = display::build_public_client(config)?;
    tokio::spawn(async move {
        let stars = stars_client.github_stars().await;
        if stars > 0 {
            eprintln!("⭐ {} stars on GitHub", format_star_count(stars));
        }
    });

    let mut session =
        IngestionSession::new(Arc::new(client), Box::new(TerminalObserver::interactive()))
            .with_dismiss_after(config.dismiss_after)
            .with_form(config.initial_form());

    println!("Paste a repository URL to ingest it. Type :help for commands.");
    print_prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let pending = session.has_pending_work();
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line),
            update = session.process_next(), if pending => Input::Update(update),
            _ = tokio::signal::ctrl_c() => Input::Interrupt,
        };

        match input {
            Input::Line(Ok(Some(line))) => match parse_command(&line) {
                Ok(ReplCommand::Quit) => break,
                Ok(command) => apply_command(&mut session, command)?,
                Err(message) => eprintln!("{}", message),
            },
            Input::Line(Ok(None)) => break,
            Input::Line(Err(e)) => return Err(e.into()),
            Input::Update(update) => {
                debug!("Session update: {:?}", update);
                match update {
                    Some(SessionUpdate::Failed(kind)) if kind.is_retryable() => {
                        println!("Type :submit to retry.");
                    }
                    Some(SessionUpdate::Discarded) => continue,
                    _ => {}
                }
            }
            Input::Interrupt => {
                if session.cancel() {
                    eprintln!("Request cancelled");
                } else {
                    break;
                }
            }
        }
        print_prompt();
    }

    session.cancel();
    Ok(())
}

fn apply_command(session: &mut IngestionSession, command: ReplCommand) -> Result<()> {
    match command {
        ReplCommand::Empty => {}
        ReplCommand::SubmitUrl(url) => {
            session.set_repository_url(url);
            report_submit(session.submit());
        }
        ReplCommand::Url(url) => session.set_repository_url(url),
        ReplCommand::Mode(mode) => {
            let mode = mode.unwrap_or_else(|| session.form().pattern_mode.flipped());
            session.set_pattern_mode(mode);
            println!("Pattern mode: {}", mode);
        }
        ReplCommand::Pattern(pattern) => session.set_pattern(pattern),
        ReplCommand::Size(kb) => {
            session.set_max_file_size_kb(kb);
            print_size(session);
        }
        ReplCommand::Slider(position) => {
            session.set_slider_position(position);
            print_size(session);
        }
        ReplCommand::Submit => report_submit(session.submit()),
        ReplCommand::Cancel => {
            if !session.cancel() {
                println!("Nothing to cancel");
            }
        }
        ReplCommand::Tree => print_tree(session),
        ReplCommand::Toggle(target) => {
            let toggled = match target {
                ToggleTarget::Index(index) => session.toggle_tree_index(index),
                ToggleTarget::Path(path) => {
                    let line = session
                        .selection()
                        .lines()
                        .into_iter()
                        .find(|line| line.path == Some(path.as_str()))
                        .map(|line| line.text.to_string());
                    match line {
                        Some(line) => session.toggle_tree_line(&line),
                        None => false,
                    }
                }
            };
            if toggled {
                print_tree(session);
                println!("Pattern: {}", session.form().pattern);
            } else {
                eprintln!("No selectable tree line matches");
            }
        }
        ReplCommand::Show => print_state(session),
        ReplCommand::Save(path) => match session.result() {
            Some(result) => display::write_digest(result, path.as_deref())?,
            None => eprintln!("No digest yet"),
        },
        ReplCommand::Example(None) => print_examples(),
        ReplCommand::Example(Some(key)) => match find_example(&key) {
            Some(example) => {
                session.set_repository_url(example.url);
                println!("Repository: {} (:submit to ingest)", example.url);
            }
            None => eprintln!("No example named {:?}", key),
        },
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn report_submit(outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Dispatched => {}
        SubmitOutcome::AlreadySubmitting => eprintln!("A request is already in progress"),
        SubmitOutcome::MissingRepository => eprintln!("Set a repository URL first"),
    }
}

fn print_size(session: &IngestionSession) {
    let form = session.form();
    println!(
        "Include files under: {} (slider {})",
        size_scale::format_size(form.max_file_size_kb()),
        form.slider_position
    );
}

fn print_tree(session: &IngestionSession) {
    if session.selection().tree().is_empty() {
        eprintln!("No directory tree yet");
        return;
    }
    print!("{}", display::render_tree(session.selection()));
}

fn print_state(session: &IngestionSession) {
    let form = session.form();
    println!("Repository: {}", form.repository_url);
    println!("Mode:       {}", form.pattern_mode);
    println!("Pattern:    {}", form.pattern);
    let selected = session.selection().deselected_paths();
    if !selected.is_empty() {
        println!("Selected:   {} tree path(s)", selected.len());
    }
    println!(
        "Max size:   {} (slider {})",
        size_scale::format_size(form.max_file_size_kb()),
        form.slider_position
    );
    let state = match session.state() {
        SessionState::Idle => "idle",
        SessionState::Submitting => "submitting",
    };
    println!(
        "State:      {} ({} in flight)",
        state,
        session.in_flight_count()
    );
    if let Some(result) = session.result() {
        println!(
            "Digest:     {} bytes{}",
            result.content.len(),
            result
                .ingest_id
                .as_deref()
                .map(|id| format!(" (id {})", id))
                .unwrap_or_default()
        );
    }
    if let Some(error) = session.error() {
        println!("Error:      {}", error);
    }
}

fn print_prompt() {
    print!("repodigest> ");
    let _ = std::io::stdout().flush();
}
