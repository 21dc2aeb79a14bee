//! The line-framed transport to the IRC server: one outbound TCP stream, read
//! and written a CRLF-terminated line at a time.

use log::{trace, warn};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::ConnError;

/// A single ordered byte stream to the server, line-framed by CRLF in both
/// directions. Plain TCP only; TLS is out of scope.
pub struct Connection {
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
    connected: bool,
    quit_message: Option<String>,
}

impl Connection {
    pub fn new(quit_message: Option<String>) -> Self {
        Connection {
            reader: None,
            writer: None,
            connected: false,
            quit_message,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Opens a TCP stream to `host:port`.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), ConnError> {
        match TcpStream::connect((host, port)).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                let (read_half, write_half) = stream.into_split();
                self.reader = Some(BufReader::new(read_half));
                self.writer = Some(write_half);
                self.connected = true;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                self.connected = false;
                Err(ConnError::ConnectRefused(e))
            }
            Err(e) => {
                self.connected = false;
                Err(ConnError::ConnectFailed(e))
            }
        }
    }

    /// Writes `line` with surrounding whitespace stripped and a trailing CRLF
    /// appended.
    pub async fn send_raw(&mut self, line: &str) -> Result<(), ConnError> {
        if !self.connected {
            return Err(ConnError::NotConnected);
        }
        let writer = self.writer.as_mut().ok_or(ConnError::NotConnected)?;
        let full = format!("{}\r\n", line.trim());
        trace!(target: "cogbot::net", "-> {}", line.trim());
        match writer.write_all(full.as_bytes()).await {
            Ok(()) => match writer.flush().await {
                Ok(()) => Ok(()),
                Err(e) => {
                    self.connected = false;
                    Err(ConnError::SendFail(e))
                }
            },
            Err(e) => {
                self.connected = false;
                Err(ConnError::SendFail(e))
            }
        }
    }

    /// Reads the next CRLF-terminated line, with trailing whitespace
    /// stripped. Returns `Ok(None)` on a clean EOF; the connection is marked
    /// disconnected either way.
    pub async fn read_line(&mut self) -> Result<Option<String>, ConnError> {
        if !self.connected {
            return Ok(None);
        }
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Ok(None),
        };
        let mut buf = String::new();
        match reader.read_line(&mut buf).await {
            Ok(0) => {
                self.connected = false;
                Ok(None)
            }
            Ok(_) => {
                let trimmed = buf.trim_end_matches(['\r', '\n']);
                Ok(Some(trimmed.to_owned()))
            }
            Err(e) => {
                self.connected = false;
                warn!(target: "cogbot::net", "read failed: {}", e);
                Err(ConnError::ReadFail(e))
            }
        }
    }

    /// Sends the configured QUIT line and tears the connection down.
    pub async fn close(&mut self) {
        if self.connected {
            let line = cogbot_wire::quit(self.quit_message.as_deref());
            let _ = self.send_raw(&line).await;
        }
        self.reader = None;
        self.writer = None;
        self.connected = false;
    }
}
