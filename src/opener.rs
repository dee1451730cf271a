use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use log::debug;

/// Hands URLs and documents to whatever the desktop has registered for them.
pub trait DesktopOpener {
    fn open_url(&self, url: &str) -> io::Result<()>;
    fn open_path(&self, path: &Path) -> io::Result<()>;
}

pub struct SystemOpener;

impl SystemOpener {
    fn command() -> Command {
        if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            // Empty string is the window title for `start`.
            c.args(["/C", "start", ""]);
            c
        } else if cfg!(target_os = "macos") {
            Command::new("open")
        } else {
            Command::new("xdg-open")
        }
    }

    fn spawn(target: &std::ffi::OsStr) -> io::Result<()> {
        debug!("Opening {:?}", target);
        Self::command()
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

impl DesktopOpener for SystemOpener {
    fn open_url(&self, url: &str) -> io::Result<()> {
        Self::spawn(url.as_ref())
    }

    fn open_path(&self, path: &Path) -> io::Result<()> {
        Self::spawn(path.as_os_str())
    }
}
