//! Output relay for CLI-style launches.
//!
//! A [`LaunchSession`] owns at most one child process at a time. The child's
//! stdout and stderr share one pipe, drained by a monitor thread that turns
//! what it reads into [`RelayEvent`]s on an [`EventSink`]. The presentation
//! layer feeds those events back into [`LaunchSession::apply`], which keeps
//! the output buffer and drops anything from a run that has been superseded.

mod monitor;
mod session;


pub use session::{LaunchSession, SessionCommand};
#[cfg(test)]
pub use session::SessionState;

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("could not set up output pipe: {0}")]
    Pipe(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Text the child wrote since the last chunk.
    Output { run: u64, chunk: String },
    /// The child is gone; always the last event of its run.
    Exited { run: u64, code: i32 },
}

impl RelayEvent {
    pub fn run(&self) -> u64 {
        match self {
            RelayEvent::Output { run, .. } | RelayEvent::Exited { run, .. } => *run,
        }
    }
}

/// Where monitor threads deliver events. Returns false once nobody listens.
pub trait EventSink: Clone + Send + 'static {
    fn emit(&self, event: RelayEvent) -> bool;
}

impl EventSink for calloop::channel::Sender<RelayEvent> {
    fn emit(&self, event: RelayEvent) -> bool {
        self.send(event).is_ok()
    }
}

impl EventSink for std::sync::mpsc::Sender<RelayEvent> {
    fn emit(&self, event: RelayEvent) -> bool {
        self.send(event).is_ok()
    }
}
