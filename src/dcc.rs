//! Inbound DCC SEND: scanning a PRIVMSG for a CTCP DCC SEND payload, and the
//! side-channel file receive it advertises.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::DccError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_STALL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CHUNK_SIZE: usize = 4096;
const PROGRESS_STEP_BYTES: u64 = 5 * 1024 * 1024;

/// A CTCP DCC SEND payload extracted from a PRIVMSG trailing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DccSendRequest {
    pub filename: String,
    pub ip_address: String,
    pub port: u16,
    pub filesize: u64,
}

/// Scans `trailing` for `DCC SEND <filename> <ip> <port> <filesize>`,
/// case-insensitive on `DCC`/`SEND`, optionally wrapped in CTCP `\x01`
/// delimiters. `filename` may be quoted and contain spaces.
pub fn find_dcc_send(trailing: &str) -> Option<DccSendRequest> {
    let cleaned: String = trailing.chars().filter(|&c| c != '\u{1}').collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() < 5 {
        return None;
    }
    if !tokens[0].eq_ignore_ascii_case("DCC") || !tokens[1].eq_ignore_ascii_case("SEND") {
        return None;
    }

    let filesize: u64 = tokens.pop()?.parse().ok()?;
    let port: u16 = tokens.pop()?.parse().ok()?;
    let ip_raw: u32 = tokens.pop()?.parse().ok()?;

    let filename_tokens = &tokens[2..];
    if filename_tokens.is_empty() {
        return None;
    }
    let mut filename = filename_tokens.join(" ");
    if filename.len() >= 2 && filename.starts_with('"') && filename.ends_with('"') {
        filename = filename[1..filename.len() - 1].to_owned();
    }

    Some(DccSendRequest {
        filename,
        ip_address: dotted_quad(ip_raw),
        port,
        filesize,
    })
}

/// Converts a 32-bit big-endian decimal IP into its dotted-quad form.
pub fn dotted_quad(ip: u32) -> String {
    let octets = ip.to_be_bytes();
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}

/// Converts a dotted-quad IP back into its 32-bit big-endian decimal form.
pub fn to_long(dotted: &str) -> Option<u32> {
    let mut octets = [0u8; 4];
    let parts: Vec<&str> = dotted.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    for (i, part) in parts.iter().enumerate() {
        octets[i] = part.parse().ok()?;
    }
    Some(u32::from_be_bytes(octets))
}

/// One inbound file transfer: the advertised endpoint, where it will land on
/// disk, and its progress/outcome once [`DccFile::start_transfer`] has run.
#[derive(Debug, Clone)]
pub struct DccFile {
    pub sender_nick: String,
    pub filename: String,
    pub ip_address: String,
    pub port: u16,
    pub filesize: u64,
    pub save_dir: PathBuf,
    pub safe_filename: String,
    pub full_path: PathBuf,
    pub is_good: bool,
    pub is_done: bool,
    pub progress_bytes: u64,
    pub percent: f64,
}

impl DccFile {
    pub fn new(sender_nick: String, request: DccSendRequest, save_dir: PathBuf) -> Self {
        let safe_filename = sanitize_filename(&request.filename);
        let full_path = save_dir.join(&safe_filename);
        DccFile {
            sender_nick,
            filename: request.filename,
            ip_address: request.ip_address,
            port: request.port,
            filesize: request.filesize,
            save_dir,
            safe_filename,
            full_path,
            is_good: true,
            is_done: false,
            progress_bytes: 0,
            percent: 0.0,
        }
    }

    /// Receives the file over a dedicated TCP connection, acknowledging each
    /// chunk with a 4-byte big-endian running total. Never propagates to the
    /// main IRC loop: failures are logged and reflected in `is_good`/the
    /// returned `Err`, and `is_done` is always set to `true` on return.
    pub async fn start_transfer(&mut self) -> Result<(), DccError> {
        let result = self.start_transfer_inner(DEFAULT_CHUNK_SIZE).await;
        self.is_done = true;
        result
    }

    async fn start_transfer_inner(&mut self, chunk_size: usize) -> Result<(), DccError> {
        let mut stream = match tokio::time::timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((self.ip_address.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.is_good = false;
                return Err(DccError::ConnectRefused(e));
            }
            Err(_) => {
                self.is_good = false;
                return Err(DccError::ConnectTimeout);
            }
        };

        let mut file = tokio::fs::File::create(&self.full_path).await?;

        let mut buf = vec![0u8; chunk_size];
        let mut received: u64 = 0;
        let mut last_reported: u64 = 0;
        let mut break_reason: Option<DccError> = None;

        while received < self.filesize {
            let read = match tokio::time::timeout(READ_STALL_TIMEOUT, stream.read(&mut buf)).await
            {
                Ok(Ok(0)) => {
                    warn!(target: "cogbot::dcc", "sender closed before transfer completed ({} of {} bytes)", received, self.filesize);
                    break;
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    warn!(target: "cogbot::dcc", "transfer error: {}", e);
                    break_reason = Some(DccError::TransferError(e));
                    break;
                }
                Err(_) => {
                    warn!(target: "cogbot::dcc", "read stalled for 30s after {} of {} bytes", received, self.filesize);
                    break_reason = Some(DccError::ReadStall);
                    break;
                }
            };

            file.write_all(&buf[..read]).await?;
            received += read as u64;

            let ack = (received as u32).to_be_bytes();
            let _ = stream.write_all(&ack).await;

            if received - last_reported >= PROGRESS_STEP_BYTES || received >= self.filesize {
                self.progress_bytes = received;
                self.percent = if self.filesize > 0 {
                    (received as f64 / self.filesize as f64) * 100.0
                } else {
                    100.0
                };
                info!(target: "cogbot::dcc", "{}: {:.1}% ({} / {} bytes)", self.safe_filename, self.percent, received, self.filesize);
                last_reported = received;
            }
        }

        if received == self.filesize {
            info!(target: "cogbot::dcc", "{}: transfer complete", self.safe_filename);
            return Ok(());
        }

        if let Some(reason) = break_reason {
            return Err(reason);
        }

        warn!(target: "cogbot::dcc", "{}: size mismatch, expected {} got {}", self.safe_filename, self.filesize, received);
        Err(DccError::SizeMismatch {
            expected: self.filesize,
            received,
        })
    }
}

/// Basename of `filename`, with spaces replaced by underscores. Dropping
/// any directory components keeps `../` and absolute paths from escaping
/// `save_dir`.
fn sanitize_filename(filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_owned());
    base.replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_filename_with_space() {
        let req = find_dcc_send("\u{1}DCC SEND \"my file.bin\" 2130706433 5000 1048576\u{1}").unwrap();
        assert_eq!(req.filename, "my file.bin");
        assert_eq!(req.ip_address, "127.0.0.1");
        assert_eq!(req.port, 5000);
        assert_eq!(req.filesize, 1048576);
    }

    #[test]
    fn parses_bare_filename_without_ctcp_wrapper() {
        let req = find_dcc_send("dcc send report.txt 3232235521 1337 42").unwrap();
        assert_eq!(req.filename, "report.txt");
        assert_eq!(req.ip_address, "192.168.0.1");
        assert_eq!(req.port, 1337);
        assert_eq!(req.filesize, 42);
    }

    #[test]
    fn rejects_non_dcc_payload() {
        assert!(find_dcc_send("just a regular message").is_none());
        assert!(find_dcc_send("\u{1}ACTION waves\u{1}").is_none());
    }

    #[test]
    fn dotted_quad_round_trips() {
        for ip in [0u32, 1, 2130706433, u32::MAX] {
            assert_eq!(to_long(&dotted_quad(ip)), Some(ip));
        }
    }

    #[test]
    fn sanitizes_path_traversal_and_spaces() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my file.bin"), "my_file.bin");
        assert_eq!(sanitize_filename("/abs/path to/file"), "file");
    }

    #[test]
    fn dcc_file_paths_are_scoped_to_save_dir() {
        let req = DccSendRequest {
            filename: "../evil name.exe".to_owned(),
            ip_address: "127.0.0.1".to_owned(),
            port: 1,
            filesize: 0,
        };
        let file = DccFile::new("carol".to_owned(), req, PathBuf::from("downloads"));
        assert_eq!(file.safe_filename, "evil_name.exe");
        assert_eq!(file.full_path, PathBuf::from("downloads/evil_name.exe"));
    }
}
