//! Terminal harness for the songsearch autocomplete widget.
//!
//! Each stdin line is either the new input text or a gesture:
//! `:down`, `:up`, `:tab`, `:enter`, `:esc`, `:click N`, `:summary`, `:focus`, `:blur`,
//! `:search`, `:quit`.

use std::path::PathBuf;

use clap::Parser;
use songsearch_autocomplete::view::plain_text;
use songsearch_autocomplete::{
    AutocompleteConfig, AutocompleteDriver, Key, RowKind, SuggestionsView, WidgetEvent,
    WidgetOutput,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Type into a songsearch autocomplete box from the terminal.
#[derive(Parser)]
#[command(name = "songsearch-typeahead", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Search site origin, overriding the config file.
    #[arg(short, long)]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("songsearch_autocomplete=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => AutocompleteConfig::from_file(path)?,
        None => AutocompleteConfig::default(),
    };
    if let Some(server) = cli.server {
        config.server = server;
    }

    let (event_tx, event_rx) = mpsc::channel(64);
    let (output_tx, mut output_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let driver = AutocompleteDriver::connect(config, output_tx, cancel.child_token())?;
    let driver_task = tokio::spawn(driver.run(event_rx));

    let printer = tokio::spawn(async move {
        while let Some(output) = output_rx.recv().await {
            match output {
                WidgetOutput::Render(view) => print_view(&view),
                WidgetOutput::Navigate(url) => println!("→ {url}"),
                WidgetOutput::ReplaceInput(text) => println!("> {text}"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        if event_tx.send(event).await.is_err() {
            break;
        }
    }

    cancel.cancel();
    drop(event_tx);
    driver_task.await?;
    printer.await?;
    Ok(())
}

/// `Ok(None)` means quit.
fn parse_line(line: &str) -> Result<Option<WidgetEvent>, String> {
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Some(WidgetEvent::Input(line.to_owned())));
    };
    let mut parts = command.split_whitespace();
    let event = match parts.next().unwrap_or_default() {
        "down" => WidgetEvent::Key(Key::ArrowDown),
        "up" => WidgetEvent::Key(Key::ArrowUp),
        "tab" => WidgetEvent::Key(Key::Tab),
        "enter" => WidgetEvent::Key(Key::Enter),
        "esc" => WidgetEvent::Key(Key::Escape),
        "focus" => WidgetEvent::Focus,
        "blur" => WidgetEvent::Blur,
        "summary" => WidgetEvent::ClickSummary,
        "search" => WidgetEvent::SearchIcon,
        "click" => {
            let index = parts
                .next()
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| "usage: :click N".to_owned())?;
            WidgetEvent::ClickSuggestion(index)
        }
        "quit" | "q" => return Ok(None),
        other => return Err(format!("unknown command :{other}")),
    };
    Ok(Some(event))
}

fn print_view(view: &SuggestionsView) {
    if view.max_length_warning {
        println!("! maximum length reached");
    }
    if !view.visible {
        return;
    }
    println!("--- {}", view.query);
    for row in &view.rows {
        let marker = if row.highlighted { '*' } else { ' ' };
        match &row.kind {
            RowKind::Summary { label } => println!("{marker} {label}"),
            RowKind::Song {
                name,
                artist,
                fragments,
                ..
            } => {
                match artist {
                    Some(artist) => println!("{marker} {name} by {artist}"),
                    None => println!("{marker} {name}"),
                }
                for fragment in fragments {
                    println!("      {}", plain_text(fragment));
                }
            }
            RowKind::Text { html } => println!("{marker} {}", plain_text(html)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_input() {
        assert_eq!(
            parse_line("dog days"),
            Ok(Some(WidgetEvent::Input("dog days".into())))
        );
    }

    #[test]
    fn gestures() {
        assert_eq!(parse_line(":down"), Ok(Some(WidgetEvent::Key(Key::ArrowDown))));
        assert_eq!(parse_line(":click 2"), Ok(Some(WidgetEvent::ClickSuggestion(2))));
        assert_eq!(parse_line(":quit"), Ok(None));
    }

    #[test]
    fn bad_gestures() {
        assert!(parse_line(":click").is_err());
        assert!(parse_line(":dance").is_err());
    }
}
