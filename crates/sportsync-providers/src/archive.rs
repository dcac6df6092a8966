// ABOUTME: Extracts the first entry of a zip archive returned by activity downloads
// ABOUTME: Non-zip payloads pass through unchanged; entry checksums are verified on read
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

const LOCAL_FILE_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// Largest activity file accepted from an archive
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Archive extraction failure
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArchiveError {
    /// The container could not be read (missing central directory, truncation)
    #[error("invalid zip archive: {0}")]
    Invalid(String),
    /// The archive holds no entries
    #[error("zip archive is empty")]
    Empty,
    /// Compression method this build cannot decode
    #[error("unsupported zip entry: {0}")]
    Unsupported(String),
    /// Entry data failed to decompress or its CRC-32 did not match
    #[error("corrupt zip entry: {0}")]
    Corrupt(String),
    /// Entry inflates beyond [`MAX_ENTRY_BYTES`]
    #[error("zip entry exceeds {MAX_ENTRY_BYTES} bytes")]
    TooLarge,
}

impl From<ZipError> for ArchiveError {
    fn from(error: ZipError) -> Self {
        match error {
            ZipError::FileNotFound => Self::Empty,
            ZipError::UnsupportedArchive(detail) => Self::Unsupported(detail.to_string()),
            ZipError::Io(e) => Self::Corrupt(e.to_string()),
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// Whether `bytes` starts with a zip local file header
#[must_use]
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&LOCAL_FILE_HEADER_SIGNATURE)
}

/// Return the contents of the first zip entry, or `bytes` itself if it is not
/// a zip archive
///
/// # Errors
///
/// Returns an error if the archive is malformed or empty, uses an unsupported
/// compression method, fails its CRC-32 check, or inflates past
/// [`MAX_ENTRY_BYTES`].
pub fn unwrap_first_entry(bytes: Vec<u8>) -> Result<Vec<u8>, ArchiveError> {
    if !is_zip(&bytes) {
        return Ok(bytes);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let entry = archive.by_index(0)?;

    // Reading to the end of the entry is what triggers the CRC check
    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut out)
        .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
    if out.len() as u64 > MAX_ENTRY_BYTES {
        return Err(ArchiveError::TooLarge);
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn archive(method: CompressionMethod, name: &str, payload: &[u8]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(name, SimpleFileOptions::default().compression_method(method))
            .unwrap();
        writer.write_all(payload).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_plain_payload_passes_through() {
        let fit = b"\x0e\x10fit-bytes".to_vec();
        assert_eq!(unwrap_first_entry(fit.clone()), Ok(fit));
    }

    #[test]
    fn test_stored_entry() {
        let zipped = archive(CompressionMethod::Stored, "1.fit", b"activity");
        assert_eq!(unwrap_first_entry(zipped), Ok(b"activity".to_vec()));
    }

    #[test]
    fn test_deflated_entry() {
        let payload = b"activity activity activity activity".repeat(8);
        let zipped = archive(CompressionMethod::Deflated, "123_ACTIVITY.fit", &payload);
        assert_eq!(unwrap_first_entry(zipped), Ok(payload));
    }

    #[test]
    fn test_checksum_mismatch_is_rejected() {
        let mut zipped = archive(CompressionMethod::Stored, "1.fit", b"FITDATA-original");
        let at = zipped
            .windows(b"original".len())
            .position(|w| w == b"original")
            .unwrap();
        zipped[at] = b'X';

        assert!(matches!(
            unwrap_first_entry(zipped),
            Err(ArchiveError::Corrupt(_))
        ));
    }

    #[test]
    fn test_truncated_archive() {
        let mut zipped = archive(CompressionMethod::Stored, "1.fit", b"activity");
        zipped.truncate(zipped.len() - 10);
        assert!(unwrap_first_entry(zipped).is_err());
    }
}
