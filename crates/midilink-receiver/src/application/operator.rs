//! Operator console commands.
//!
//! The console reads one command per line and runs it against
//! [`ReceiverState`] while holding the state lock, exactly like the network
//! handlers do.
//!
//! ```text
//! sessions            list live sessions
//! clear               tear down every session
//! allow <id>          add to the allow list
//! disallow <id>       remove from the allow list
//! prohibit <id>       add to the deny list
//! unprohibit <id>     remove from the deny list
//! lists               show both lists
//! help                this text
//! ```

use std::fmt::Write as _;
use std::str::FromStr;

use midilink_core::RemoteId;
use thiserror::Error;

use super::state::ReceiverState;

pub const HELP: &str = "\
commands:
  sessions            list live sessions
  clear               tear down every session
  allow <id>          add a remote to the allow list
  disallow <id>       remove a remote from the allow list
  prohibit <id>       add a remote to the deny list
  unprohibit <id>     remove a remote from the deny list
  lists               show the allow and deny lists
  help                show this text";

/// Errors produced while parsing a console line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),
    #[error("`{0}` needs a remote id")]
    MissingArgument(&'static str),
}

/// One parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Sessions,
    Clear,
    Allow(RemoteId),
    Disallow(RemoteId),
    Prohibit(RemoteId),
    Unprohibit(RemoteId),
    Lists,
    Help,
}

impl FromStr for OperatorCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let mut arg = |name: &'static str| {
            words
                .next()
                .map(RemoteId::from)
                .ok_or(CommandError::MissingArgument(name))
        };
        match verb {
            "sessions" => Ok(Self::Sessions),
            "clear" => Ok(Self::Clear),
            "allow" => Ok(Self::Allow(arg("allow")?)),
            "disallow" => Ok(Self::Disallow(arg("disallow")?)),
            "prohibit" => Ok(Self::Prohibit(arg("prohibit")?)),
            "unprohibit" => Ok(Self::Unprohibit(arg("unprohibit")?)),
            "lists" => Ok(Self::Lists),
            "help" => Ok(Self::Help),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// What running a command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Text to show the operator.
    pub text: String,
    /// Sessions the command tore down; each is sent a shutdown request.
    pub closed: Vec<RemoteId>,
}

impl CommandOutput {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            closed: Vec::new(),
        }
    }
}

impl ReceiverState {
    /// Runs one console command.
    pub fn execute(&mut self, command: OperatorCommand) -> CommandOutput {
        match command {
            OperatorCommand::Sessions => CommandOutput::text(self.render_sessions()),
            OperatorCommand::Clear => {
                let closed = self.blocks.remotes();
                for remote in &closed {
                    self.teardown(remote);
                }
                CommandOutput {
                    text: format!("cleared {} session(s)", closed.len()),
                    closed,
                }
            }
            OperatorCommand::Allow(id) => {
                let msg = format!("{id} {}", edit_word(self.access.allow(id.clone()), "allowed"));
                CommandOutput::text(msg)
            }
            OperatorCommand::Disallow(id) => {
                let changed = self.access.disallow(&id);
                CommandOutput::text(format!("{id} {}", edit_word(changed, "no longer allowed")))
            }
            OperatorCommand::Prohibit(id) => {
                let msg = format!("{id} {}", edit_word(self.access.prohibit(id.clone()), "prohibited"));
                CommandOutput::text(msg)
            }
            OperatorCommand::Unprohibit(id) => {
                let changed = self.access.unprohibit(&id);
                CommandOutput::text(format!("{id} {}", edit_word(changed, "no longer prohibited")))
            }
            OperatorCommand::Lists => CommandOutput::text(self.render_lists()),
            OperatorCommand::Help => CommandOutput::text(HELP),
        }
    }

    fn render_sessions(&self) -> String {
        let sessions = self.sessions();
        if sessions.is_empty() {
            return "no live sessions".to_string();
        }
        let mut out = String::from("channel  remote           window        inactive");
        for s in sessions {
            let _ = write!(
                out,
                "\n{:>7}  {:<15}  [{}, {})  {:>8}",
                s.channel.to_string(),
                s.remote.to_string(),
                s.min_seq,
                s.max_seq,
                s.inactive_time
            );
        }
        out
    }

    fn render_lists(&self) -> String {
        let join = |set: &std::collections::BTreeSet<RemoteId>| {
            if set.is_empty() {
                "(empty)".to_string()
            } else {
                set.iter().map(RemoteId::as_str).collect::<Vec<_>>().join(", ")
            }
        };
        format!(
            "allowed:    {}\nprohibited: {}",
            join(&self.access.allowed),
            join(&self.access.prohibited)
        )
    }
}

fn edit_word(changed: bool, done: &str) -> String {
    if changed {
        done.to_string()
    } else {
        "unchanged".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
