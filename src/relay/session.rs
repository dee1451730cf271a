use std::ffi::OsString;
use std::path::PathBuf;
use log::{debug, info};
use crate::i18n::{self, Language, Text};
use crate::model::split_args;
use super::monitor::{self, RunHandle};
use super::{EventSink, RelayError, RelayEvent};

/// What a CLI-style launch runs: a program, optionally a script handed to it
/// as the first argument, and the arguments to prefill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCommand {
    pub program: OsString,
    pub script: Option<PathBuf>,
    pub initial_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    /// Only observable while `run` is killing the previous child.
    Terminating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStarted {
    pub run: u64,
    pub pid: u32,
    /// A live child was killed to make room for this run.
    pub interrupted: bool,
}

/// One CLI-style launch interaction. Holds at most one live child.
///
/// Dropping the session kills the live child, if any, and waits for it.
pub struct LaunchSession<S: EventSink> {
    command: SessionCommand,
    args: String,
    buffer: String,
    state: SessionState,
    current: Option<RunHandle>,
    next_run: u64,
    language: Language,
    sink: S,
}

impl<S: EventSink> LaunchSession<S> {
    pub fn new(command: SessionCommand, language: Language, sink: S) -> Self {
        let args = command.initial_args.join(" ");
        Self {
            command,
            args,
            buffer: String::new(),
            state: SessionState::Idle,
            current: None,
            next_run: 1,
            language,
            sink,
        }
    }

    /// The editable argument line.
    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn set_args(&mut self, args: impl Into<String>) {
        self.args = args.into();
    }

    /// Argument vector for the next run: the script (if any), then the
    /// current argument line split on whitespace.
    pub fn argv(&self) -> Vec<OsString> {
        self.command
            .script
            .iter()
            .map(|s| s.clone().into_os_string())
            .chain(split_args(&self.args).into_iter().map(OsString::from))
            .collect()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().map(RunHandle::pid)
    }

    /// Start a run with the current argument line. The previous run's process
    /// group is killed and its child reaped first, and the buffer starts over.
    pub fn run(&mut self) -> Result<RunStarted, RelayError> {
        let interrupted = match self.current.take() {
            Some(previous) => {
                // An exit that is still queued is not an interruption.
                let alive = !previous.has_exited();
                self.state = SessionState::Terminating;
                if alive {
                    info!("Interrupting run {} (pid {})", previous.run, previous.pid());
                }
                previous.terminate();
                if alive {
                    self.buffer.push_str(i18n::tr(self.language, Text::Interrupted));
                }
                alive
            }
            None => false,
        };
        self.buffer.clear();

        let run = self.next_run;
        self.next_run += 1;
        let argv = self.argv();
        match monitor::start(&self.command.program, &argv, run, self.sink.clone()) {
            Ok(handle) => {
                let pid = handle.pid();
                self.current = Some(handle);
                self.state = SessionState::Running;
                Ok(RunStarted { run, pid, interrupted })
            }
            Err(e) => {
                self.state = SessionState::Idle;
                self.buffer
                    .push_str(&i18n::start_failed_marker(self.language, &e.to_string()));
                Err(e)
            }
        }
    }

    /// Fold an event into the buffer. Returns the text that was appended, or
    /// `None` when the event belongs to a run that is no longer current.
    pub fn apply(&mut self, event: RelayEvent) -> Option<String> {
        let current = self.current.as_ref().map(|h| h.run);
        if current != Some(event.run()) {
            debug!("Dropping event from stale run {}", event.run());
            return None;
        }

        match event {
            RelayEvent::Output { chunk, .. } => {
                self.buffer.push_str(&chunk);
                Some(chunk)
            }
            RelayEvent::Exited { code, .. } => {
                if let Some(mut handle) = self.current.take() {
                    handle.join();
                }
                self.state = SessionState::Idle;
                let marker = i18n::finished_marker(self.language, code);
                self.buffer.push_str(&marker);
                Some(marker)
            }
        }
    }
}

impl<S: EventSink> Drop for LaunchSession<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.current.take() {
            info!("Session closed while run {} is alive; terminating", handle.run);
            handle.terminate();
        }
    }
}
