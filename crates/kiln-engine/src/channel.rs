//! Node IPC message channel for child processes.
//!
//! Node (and Electron running as Node) opens an IPC channel when
//! `NODE_CHANNEL_FD` names an inherited socket. Messages are newline
//! delimited JSON in the default serialization mode.

use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Environment variable telling Node which descriptor carries the channel
pub const CHANNEL_FD_ENV: &str = "NODE_CHANNEL_FD";

/// Descriptor the child sees the channel on
pub const CHILD_CHANNEL_FD: RawFd = 3;

/// A socket pair whose child end is handed to a spawned process
pub struct MessageChannel {
    parent: std::os::unix::net::UnixStream,
    child: std::os::unix::net::UnixStream,
}

impl MessageChannel {
    /// Create the socket pair
    pub fn open() -> io::Result<Self> {
        let (parent, child) = std::os::unix::net::UnixStream::pair()?;
        Ok(Self { parent, child })
    }

    /// Make the child end available as fd 3 in the process `command` spawns
    #[allow(unsafe_code)]
    pub fn attach(&self, command: &mut Command) {
        let fd = self.child.as_raw_fd();
        command.env(CHANNEL_FD_ENV, CHILD_CHANNEL_FD.to_string());

        // SAFETY: the hook only calls async-signal-safe functions (dup2, fcntl)
        // on a descriptor owned by `self`, which outlives the spawn.
        unsafe {
            command.pre_exec(move || {
                let result = if fd == CHILD_CHANNEL_FD {
                    libc::fcntl(fd, libc::F_SETFD, 0)
                } else {
                    libc::dup2(fd, CHILD_CHANNEL_FD)
                };
                if result < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(())
                }
            });
        }
    }

    /// Close the child end and collect messages until the child closes its
    /// side. Each message is logged; lines that are not JSON are kept as
    /// strings.
    pub async fn listen(self) -> Vec<serde_json::Value> {
        drop(self.child);

        let stream = match self
            .parent
            .set_nonblocking(true)
            .and_then(|()| tokio::net::UnixStream::from_std(self.parent))
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Failed to watch isolated compiler messages: {}", e);
                return Vec::new();
            }
        };

        let mut messages = Vec::new();
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    let message = serde_json::from_str(&line)
                        .unwrap_or(serde_json::Value::String(line));
                    tracing::info!(target: "kiln::bridge", %message, "isolated compiler message");
                    messages.push(message);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read isolated compiler messages: {}", e);
                    break;
                }
            }
        }
        messages
    }
}
