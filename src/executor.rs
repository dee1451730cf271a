use std::ffi::OsString;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use log::{debug, info, warn};
use thiserror::Error;
use crate::context::AppContext;
use crate::model::{ToolKind, ToolRecord};
use crate::opener::DesktopOpener;
use crate::relay::SessionCommand;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("failed to start '{program}': {source}")]
    Start {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// What a successful dispatch turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Preconditions not met; nothing happened.
    Skipped,
    /// The URL went to the browser.
    Opened,
    /// A process started and was left to itself.
    Detached { pid: u32 },
    /// The caller should open a relay session for this command.
    Session(SessionCommand),
}

/// The concrete action for a tool, decided before anything is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    Browser(String),
    Detached { program: OsString, args: Vec<OsString> },
    Relay(SessionCommand),
}

/// Map a tool to its launch action. `None` when the tool's precondition
/// fails: empty URL for websites, `path` not an existing file otherwise.
/// Fields the tool's kind doesn't use are never looked at.
pub fn plan(tool: &ToolRecord, interpreter: &str) -> Option<LaunchPlan> {
    let args = if tool.kind.uses_args() { tool.default_args() } else { Vec::new() };
    let plan = match tool.kind {
        ToolKind::Website => {
            let url = tool.url.trim();
            if url.is_empty() {
                return None;
            }
            LaunchPlan::Browser(url.to_string())
        }
        _ if !tool.path.is_file() => return None,
        ToolKind::CliExecutable => LaunchPlan::Relay(SessionCommand {
            program: tool.path.clone().into_os_string(),
            script: None,
            initial_args: args,
        }),
        ToolKind::GuiExecutable => LaunchPlan::Detached {
            program: tool.path.clone().into_os_string(),
            args: Vec::new(),
        },
        ToolKind::InterpretedCli => LaunchPlan::Relay(SessionCommand {
            program: OsString::from(interpreter),
            script: Some(tool.path.clone()),
            initial_args: args,
        }),
        // The stored args ride along even though the editor greys the field
        // out for this kind.
        ToolKind::InterpretedGui => LaunchPlan::Detached {
            program: OsString::from(interpreter),
            args: std::iter::once(tool.path.clone().into_os_string())
                .chain(tool.default_args().into_iter().map(OsString::from))
                .collect(),
        },
    };
    Some(plan)
}

/// Start `program` in its own process group with no stdio, so terminal
/// signals aimed at us don't reach it and it outlives us.
pub fn spawn_detached(program: &OsString, args: &[OsString]) -> Result<u32, LaunchError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);

    let child = command.spawn().map_err(|source| LaunchError::Start {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    Ok(child.id())
}

fn open_companion_doc(doc: Option<&Path>, opener: &dyn DesktopOpener) {
    let Some(doc) = doc.filter(|d| d.is_file()) else {
        return;
    };
    if let Err(e) = opener.open_path(doc) {
        warn!("Could not open document {:?}: {}", doc, e);
    }
}

/// Launch a catalog entry.
///
/// Whenever the precondition holds, a usage event is recorded and the
/// companion document (if it exists) is opened, whatever happens to the
/// primary action. Only a detached start failure comes back as an error.
pub fn execute(
    tool: &ToolRecord,
    ctx: &mut AppContext,
    opener: &dyn DesktopOpener,
) -> Result<Dispatch, LaunchError> {
    let Some(plan) = plan(tool, &ctx.settings.interpreter) else {
        debug!("Skipping '{}': nothing to launch", tool.name);
        return Ok(Dispatch::Skipped);
    };

    if let Err(e) = ctx.record_usage(&tool.name) {
        warn!("Could not record usage of '{}': {:#}", tool.name, e);
    }

    info!("Launching '{}' ({})", tool.name, tool.kind.key());
    let outcome = match plan {
        LaunchPlan::Browser(url) => {
            if let Err(e) = opener.open_url(&url) {
                warn!("Could not open {}: {}", url, e);
            }
            Ok(Dispatch::Opened)
        }
        LaunchPlan::Detached { program, args } => {
            spawn_detached(&program, &args).map(|pid| Dispatch::Detached { pid })
        }
        LaunchPlan::Relay(command) => Ok(Dispatch::Session(command)),
    };

    open_companion_doc(tool.companion_doc(), opener);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataPaths;
    use chrono::Local;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::{getpgid, Pid};
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingOpener {
        urls: RefCell<Vec<String>>,
        paths: RefCell<Vec<PathBuf>>,
    }

    impl DesktopOpener for RecordingOpener {
        fn open_url(&self, url: &str) -> io::Result<()> {
            self.urls.borrow_mut().push(url.to_string());
            Ok(())
        }

        fn open_path(&self, path: &Path) -> io::Result<()> {
            self.paths.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        ctx: AppContext,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let ctx = AppContext::load(DataPaths::in_dir(dir.path())).unwrap();
            Self { dir, ctx }
        }

        fn file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, "#!/bin/sh\n").unwrap();
            path
        }
    }

    fn tool(kind: ToolKind, path: &Path) -> ToolRecord {
        let mut t = ToolRecord::new("demo", kind);
        t.path = path.to_path_buf();
        t
    }

    #[test]
    fn cli_launch_records_exactly_one_usage_event() {
        for kind in [ToolKind::CliExecutable, ToolKind::InterpretedCli] {
            let mut fx = Fixture::new();
            let t = tool(kind, &fx.file("demo.py"));
            let before = Local::now().naive_local();

            let dispatch = execute(&t, &mut fx.ctx, &RecordingOpener::default()).unwrap();
            assert!(matches!(dispatch, Dispatch::Session(_)));
            assert_eq!(fx.ctx.usage.events.len(), 1);
            assert_eq!(fx.ctx.usage.events[0].tool, "demo");
            assert!(fx.ctx.usage.events[0].time >= before);

            // Persisted, not just in memory.
            let saved = crate::usage::load_usage(&fx.ctx.paths.usage_file);
            assert_eq!(saved.events.len(), 1);
        }
    }

    #[test]
    fn interpreted_cli_plan_uses_configured_interpreter() {
        let fx = Fixture::new();
        let path = fx.file("demo.py");
        let mut t = tool(ToolKind::InterpretedCli, &path);
        t.args = "--x 1".to_string();
        t.url = "https://ignored.example".to_string();

        let plan = plan(&t, "python3").unwrap();
        assert_eq!(
            plan,
            LaunchPlan::Relay(SessionCommand {
                program: OsString::from("python3"),
                script: Some(path),
                initial_args: vec!["--x".to_string(), "1".to_string()],
            })
        );
    }

    #[test]
    fn cli_executable_runs_path_directly() {
        let fx = Fixture::new();
        let path = fx.file("tool");
        let mut t = tool(ToolKind::CliExecutable, &path);
        t.args = "-v".to_string();
        let Some(LaunchPlan::Relay(cmd)) = plan(&t, "python") else {
            panic!("expected relay plan");
        };
        assert_eq!(cmd.program, path.into_os_string());
        assert_eq!(cmd.script, None);
        assert_eq!(cmd.initial_args, vec!["-v"]);
    }

    #[test]
    fn gui_plans_ignore_inactive_fields() {
        let fx = Fixture::new();
        let path = fx.file("app");
        let mut exec = tool(ToolKind::GuiExecutable, &path);
        exec.args = "--should-not-appear".to_string();
        assert_eq!(
            plan(&exec, "python"),
            Some(LaunchPlan::Detached { program: path.clone().into_os_string(), args: vec![] })
        );

        let mut script = tool(ToolKind::InterpretedGui, &path);
        script.args = "--big".to_string();
        assert_eq!(
            plan(&script, "python"),
            Some(LaunchPlan::Detached {
                program: OsString::from("python"),
                args: vec![path.into_os_string(), OsString::from("--big")],
            })
        );
    }

    #[test]
    fn unmet_precondition_is_skipped_silently() {
        let mut fx = Fixture::new();
        let opener = RecordingOpener::default();
        let doc = fx.file("readme.md");

        let mut missing = tool(ToolKind::CliExecutable, &fx.dir.path().join("nope"));
        missing.doc_path = Some(doc.clone());
        let mut site = ToolRecord::new("site", ToolKind::Website);
        site.path = doc.clone();

        for t in [missing, site] {
            assert_eq!(execute(&t, &mut fx.ctx, &opener).unwrap(), Dispatch::Skipped);
        }
        assert!(fx.ctx.usage.events.is_empty());
        assert!(opener.paths.borrow().is_empty());
        assert!(opener.urls.borrow().is_empty());
    }

    #[test]
    fn website_opens_url_and_companion_doc() {
        let mut fx = Fixture::new();
        let opener = RecordingOpener::default();
        let doc = fx.file("guide.md");
        let mut t = ToolRecord::new("site", ToolKind::Website);
        t.url = "https://example.com".to_string();
        t.doc_path = Some(doc.clone());

        assert_eq!(execute(&t, &mut fx.ctx, &opener).unwrap(), Dispatch::Opened);
        assert_eq!(*opener.urls.borrow(), vec!["https://example.com"]);
        assert_eq!(*opener.paths.borrow(), vec![doc]);
        assert_eq!(fx.ctx.usage.events.len(), 1);
    }

    #[test]
    fn missing_companion_doc_is_not_opened() {
        let mut fx = Fixture::new();
        let opener = RecordingOpener::default();
        let mut t = tool(ToolKind::CliExecutable, &fx.file("tool"));
        t.doc_path = Some(fx.dir.path().join("absent.md"));

        execute(&t, &mut fx.ctx, &opener).unwrap();
        assert!(opener.paths.borrow().is_empty());
    }

    #[test]
    fn detached_start_failure_still_opens_doc_and_records_usage() {
        let mut fx = Fixture::new();
        fx.ctx.settings.interpreter = "/nonexistent/ivydock-interpreter".to_string();
        let opener = RecordingOpener::default();
        let doc = fx.file("notes.txt");
        let mut t = tool(ToolKind::InterpretedGui, &fx.file("gui.py"));
        t.doc_path = Some(doc.clone());

        let err = execute(&t, &mut fx.ctx, &opener).unwrap_err();
        assert!(matches!(err, LaunchError::Start { .. }));
        assert_eq!(*opener.paths.borrow(), vec![doc]);
        assert_eq!(fx.ctx.usage.events.len(), 1);
    }

    #[test]
    fn detached_start_leads_its_own_process_group() {
        let mut fx = Fixture::new();
        fx.ctx.settings.interpreter = "sh".to_string();
        let script = fx.dir.path().join("gui.sh");
        fs::write(&script, "sleep 2\n").unwrap();
        let t = tool(ToolKind::InterpretedGui, &script);

        let dispatch = execute(&t, &mut fx.ctx, &RecordingOpener::default()).unwrap();
        let Dispatch::Detached { pid } = dispatch else {
            panic!("expected a detached start, got {:?}", dispatch);
        };
        let pid = Pid::from_raw(pid as i32);
        assert_eq!(getpgid(Some(pid)).unwrap(), pid);
        assert_ne!(getpgid(None).unwrap(), pid);
        let _ = killpg(pid, Signal::SIGKILL);
    }
}
