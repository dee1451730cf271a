use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{pipe, Pid};
use super::{EventSink, RelayError, RelayEvent};

const EXIT_POLL: Duration = Duration::from_millis(20);
/// How long output may keep trickling in after the child has exited, from
/// descendants that still hold the pipe.
const DRAIN: Duration = Duration::from_millis(200);
const READ_BUF: usize = 4096;

/// One live child and the thread reporting on it.
pub(crate) struct RunHandle {
    pub run: u64,
    pid: u32,
    child: Arc<Mutex<Child>>,
    monitor: Option<JoinHandle<()>>,
}

fn cloexec(fd: &OwnedFd) -> Result<(), RelayError> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
        .map(drop)
        .map_err(|e| RelayError::Pipe(e.into()))
}

fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Spawn `program argv..` in its own process group with stdout and stderr
/// merged into one pipe.
///
/// Two threads serve the run. The reader drains the pipe until EOF, which
/// may come long after the child is gone when descendants inherited the
/// pipe, so nobody waits for it. The monitor forwards what the reader
/// collects, notices the child's exit on its own and sends `Exited` last.
pub(crate) fn start<S: EventSink>(
    program: &OsString,
    argv: &[OsString],
    run: u64,
    sink: S,
) -> Result<RunHandle, RelayError> {
    let (reader, writer) = pipe().map_err(|e| RelayError::Pipe(e.into()))?;
    cloexec(&reader)?;
    cloexec(&writer)?;
    let writer_err = writer.try_clone().map_err(RelayError::Pipe)?;

    let mut command = Command::new(program);
    command
        .args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_err))
        .process_group(0);

    let mut child = command.spawn().map_err(|source| RelayError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    // The parent's copies of the write end live in `command`; EOF only
    // arrives once they are closed.
    drop(command);

    let pid = child.id();
    debug!("Relay run {} started pid {}: {:?} {:?}", run, pid, program, argv);

    let (tx_chunks, rx_chunks) = mpsc::channel::<String>();
    let reader = File::from(reader);
    let spawned = thread::Builder::new()
        .name(format!("relay-{run}-read"))
        .spawn(move || pump(reader, run, &tx_chunks));
    if let Err(e) = spawned {
        abandon(&mut child);
        return Err(RelayError::Pipe(e));
    }

    let child = Arc::new(Mutex::new(child));
    let shared = Arc::clone(&child);
    let spawned = thread::Builder::new()
        .name(format!("relay-{run}"))
        .spawn(move || watch(&shared, rx_chunks, run, &sink));
    let monitor = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            abandon(&mut child.lock().unwrap_or_else(PoisonError::into_inner));
            return Err(RelayError::Pipe(e));
        }
    };

    Ok(RunHandle { run, pid, child, monitor: Some(monitor) })
}

/// Read the pipe until EOF, handing text to the monitor. Stops early once
/// the monitor has finished with the run. Multi-byte characters split
/// across reads are held back until complete.
fn pump(mut pipe: File, run: u64, out: &Sender<String>) {
    let mut buf = [0u8; READ_BUF];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let chunk = take_text(&mut pending);
                if !chunk.is_empty() && out.send(chunk).is_err() {
                    debug!("Relay run {}: reader stopping, run already reported", run);
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Relay run {}: reading output failed: {}", run, e);
                break;
            }
        }
    }
    if !pending.is_empty() {
        let _ = out.send(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// Forward output until the child has exited, then whatever arrives within
/// the drain window, then `Exited`.
fn watch<S: EventSink>(child: &Mutex<Child>, chunks: Receiver<String>, run: u64, sink: &S) {
    let code = loop {
        match chunks.recv_timeout(EXIT_POLL) {
            Ok(chunk) => {
                sink.emit(RelayEvent::Output { run, chunk });
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Pipe closed; only the exit is left to wait for.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(EXIT_POLL),
        }
        if let Some(code) = poll_exit(child) {
            break code;
        }
    };

    let deadline = Instant::now() + DRAIN;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match chunks.recv_timeout(left) {
            Ok(chunk) => {
                sink.emit(RelayEvent::Output { run, chunk });
            }
            Err(_) => break,
        }
    }

    debug!("Relay run {} exited with {}", run, code);
    sink.emit(RelayEvent::Exited { run, code });
}

pub(crate) fn take_text(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        // Incomplete sequence at the tail: keep it for the next read.
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}

fn poll_exit(child: &Mutex<Child>) -> Option<i32> {
    let status = child
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .try_wait();
    match status {
        Ok(Some(status)) => Some(exit_code(status)),
        Ok(None) => None,
        Err(e) => {
            warn!("Waiting for child failed: {}", e);
            Some(-1)
        }
    }
}

/// Exit code, or 128 + signal number for a child killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

impl RunHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the child has exited, whether or not its exit has been
    /// reported yet.
    pub fn has_exited(&self) -> bool {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(child.try_wait(), Ok(Some(_)))
    }

    /// SIGKILL the whole process group and wait for the monitor thread, which
    /// returns at most one drain window after the child is reaped.
    ///
    /// The group is signalled even when the child is already gone, since
    /// background jobs it left behind are still in it.
    pub fn terminate(mut self) {
        {
            // Holding the lock keeps the monitor from reaping in between.
            let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            debug!("Killing process group {}", self.pid);
            match killpg(Pid::from_raw(self.pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => {
                    warn!("killpg({}) failed: {}; killing the child alone", self.pid, e);
                    let _ = child.kill();
                }
            }
        }
        self.join();
    }

    /// Wait for the monitor thread; used once its exit event has arrived.
    pub fn join(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            if monitor.join().is_err() {
                warn!("Relay monitor for run {} panicked", self.run);
            }
        }
    }
}
