//! Camera adapter: runs a preview command as a child process.
//!
//! `start()` spawns the configured command (for example
//! `rpicam-hello -t 0`); `stop()` kills it and reaps the exit status so no
//! zombie is left behind.  A child that exits on its own is noticed by
//! `is_running()` and can be started again.

use std::io;
use std::process::{Child, Command, Stdio};

use log::{info, warn};

use crate::app::ports::CameraPort;

pub struct ProcessCamera {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
}

impl ProcessCamera {
    /// `command[0]` is the program, the rest its arguments.
    pub fn new(command: &[String]) -> io::Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty camera command"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            child: None,
        })
    }

    /// Collect a child that already exited.
    fn reap_exited(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                warn!("Camera: '{}' exited on its own ({})", self.program, status);
                self.child = None;
            }
            Ok(None) => {}
            Err(e) => warn!("Camera: status check failed: {}", e),
        }
    }
}

impl CameraPort for ProcessCamera {
    fn start(&mut self) -> io::Result<()> {
        self.reap_exited();
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()?;
        info!("Camera: '{}' started (pid {})", self.program, child.id());
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            // Already exited: still reap below.
            warn!("Camera: kill failed: {}", e);
        }
        match child.wait() {
            Ok(status) => info!("Camera: '{}' stopped ({})", self.program, status),
            Err(e) => warn!("Camera: reap failed: {}", e),
        }
    }

    fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for ProcessCamera {
    fn drop(&mut self) {
        self.stop();
    }
}
