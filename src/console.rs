//! Line-based console commands for driving a headless kiosk

use anyhow::{anyhow, bail, Result};
use rg_kiosk_core::DisplayCommand;
use rg_kiosk_types::Notification;

/// One console command
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Press and release right away
    Tap,
    /// Press without releasing, so a long-press can fire
    Hold,
    Release,
    Previous,
    Next,
    Jump(JumpTarget),
    Notify(Notification),
    /// Take a notification off the screen by id
    Dismiss(String),
    Resize { width: f64, height: f64 },
    /// Print the visible module's view
    Render,
    /// Print the current snapshot
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JumpTarget {
    Index(usize),
    Name(String),
}

impl ConsoleCommand {
    /// Display commands this console command stands for
    pub fn display_commands(&self) -> Vec<DisplayCommand> {
        match self {
            ConsoleCommand::Tap => vec![DisplayCommand::Press, DisplayCommand::Release],
            ConsoleCommand::Hold => vec![DisplayCommand::Press],
            ConsoleCommand::Release => vec![DisplayCommand::Release],
            ConsoleCommand::Previous => vec![DisplayCommand::Previous],
            ConsoleCommand::Next => vec![DisplayCommand::Next],
            ConsoleCommand::Jump(JumpTarget::Index(index)) => vec![DisplayCommand::JumpTo(*index)],
            ConsoleCommand::Jump(JumpTarget::Name(name)) => {
                vec![DisplayCommand::JumpToName(name.clone())]
            }
            _ => Vec::new(),
        }
    }
}

pub const HELP: &str = "\
commands:
  tap                 press and release
  hold                press (release with `release`; hold 800ms to toggle the lock)
  release             end a press
  prev | next         previous / next module
  jump <index|name>   pin a module
  notify <message>    show a notification
  dismiss <id>        hide a notification (ids are listed by `status`)
  resize <w> <h>      viewport size change
  render              print the visible module
  status              print the display state
  quit";

/// Parse one input line. Empty lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "tap" | "press" => ConsoleCommand::Tap,
        "hold" => ConsoleCommand::Hold,
        "release" => ConsoleCommand::Release,
        "prev" | "previous" => ConsoleCommand::Previous,
        "next" => ConsoleCommand::Next,
        "jump" => {
            if rest.is_empty() {
                bail!("usage: jump <index|name>");
            }
            match rest.parse::<usize>() {
                Ok(index) => ConsoleCommand::Jump(JumpTarget::Index(index)),
                Err(_) => ConsoleCommand::Jump(JumpTarget::Name(rest.to_string())),
            }
        }
        "notify" => {
            if rest.is_empty() {
                bail!("usage: notify <message>");
            }
            ConsoleCommand::Notify(Notification::new(rest))
        }
        "dismiss" => {
            if rest.is_empty() {
                bail!("usage: dismiss <id>");
            }
            ConsoleCommand::Dismiss(rest.to_string())
        }
        "resize" => {
            let mut parts = rest.split_whitespace().map(str::parse::<f64>);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(Ok(width)), Some(Ok(height)), None) => ConsoleCommand::Resize { width, height },
                _ => bail!("usage: resize <width> <height>"),
            }
        }
        "render" => ConsoleCommand::Render,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(anyhow!("unknown command {:?}, try `help`", other)),
    };
    Ok(Some(command))
}
