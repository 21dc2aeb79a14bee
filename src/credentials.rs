//! A minimal versioned, length-prefixed binary format for the server
//! password / NickServ password pair, replacing the source's pickle-backed
//! store (see `DESIGN.md`). The version byte lets a future format change be
//! detected and rejected cleanly instead of silently misparsed.

use std::io::{Read, Write};
use std::path::Path;

use crate::error::CredentialError;

const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub server_password: Option<String>,
    pub nickserv_password: Option<String>,
}

fn write_field<W: Write>(w: &mut W, field: &Option<String>) -> std::io::Result<()> {
    match field {
        None => w.write_all(&[0]),
        Some(s) => {
            let bytes = s.as_bytes();
            w.write_all(&[1])?;
            w.write_all(&(bytes.len() as u32).to_le_bytes())?;
            w.write_all(bytes)
        }
    }
}

fn read_field<R: Read>(r: &mut R) -> Result<Option<String>, CredentialError> {
    let mut tag = [0u8; 1];
    r.read_exact(&mut tag).map_err(|_| CredentialError::Truncated)?;
    if tag[0] == 0 {
        return Ok(None);
    }
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).map_err(|_| CredentialError::Truncated)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|_| CredentialError::Truncated)?;
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| CredentialError::Truncated)
}

/// Serializes `credentials` to `path`: version byte, then each field as a
/// presence byte and (if present) a 4-byte little-endian length plus bytes.
pub fn save(path: &Path, credentials: &Credentials) -> Result<(), CredentialError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(&[FORMAT_VERSION])?;
    write_field(&mut file, &credentials.server_password)?;
    write_field(&mut file, &credentials.nickserv_password)?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Credentials, CredentialError> {
    let mut file = std::fs::File::open(path)?;
    let mut version = [0u8; 1];
    file.read_exact(&mut version).map_err(|_| CredentialError::Truncated)?;
    if version[0] != FORMAT_VERSION {
        return Err(CredentialError::UnsupportedVersion(version[0]));
    }
    let server_password = read_field(&mut file)?;
    let nickserv_password = read_field(&mut file)?;
    Ok(Credentials {
        server_password,
        nickserv_password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("cogbot-cred-test-{}-{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn round_trips_both_fields_present() {
        let dir = scratch_dir("both-present");
        let path = dir.join("creds.bin");
        let creds = Credentials {
            server_password: Some("hunter2".to_owned()),
            nickserv_password: Some("swordfish".to_owned()),
        };
        save(&path, &creds).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, creds);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn round_trips_with_absent_fields() {
        let dir = scratch_dir("absent");
        let path = dir.join("creds.bin");
        let creds = Credentials::default();
        save(&path, &creds).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, creds);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_unsupported_version() {
        let dir = scratch_dir("bad-version");
        let path = dir.join("creds.bin");
        std::fs::write(&path, [99u8, 0, 0]).unwrap();
        assert!(matches!(load(&path), Err(CredentialError::UnsupportedVersion(99))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
