//! Gzipped username listings.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::error::{LedgerError, LedgerResult};
use crate::schema::{NS_HEADS, decode_list, encode_list};

/// Gzip a length-prefixed list of `usernames`.
///
/// # Errors
///
/// Returns [`LedgerError::Encoding`] if a name does not fit the list
/// format, [`LedgerError::Storage`] if the compressor fails.
pub fn encode_username_set<S: AsRef<str>>(usernames: &[S]) -> LedgerResult<Vec<u8>> {
    let raw = encode_list(usernames.iter().map(|u| u.as_ref().as_bytes()))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&raw)
        .and_then(|()| encoder.finish())
        .map_err(|e| {
            LedgerError::Storage(keyledger_storage::StorageError::Internal(format!(
                "gzip failed: {e}"
            )))
        })
}

/// Decode a listing produced by [`encode_username_set`].
///
/// # Errors
///
/// Returns [`LedgerError::CorruptRecord`] if the bytes are not a gzipped
/// list of UTF-8 names.
pub fn decode_username_set(gzipped: &[u8]) -> LedgerResult<Vec<String>> {
    let corrupt = |reason: String| LedgerError::corrupt_record(NS_HEADS, "listing", reason);
    let mut raw = Vec::new();
    GzDecoder::new(gzipped)
        .read_to_end(&mut raw)
        .map_err(|e| corrupt(e.to_string()))?;
    decode_list(&raw)
        .map_err(|e| corrupt(e.to_string()))?
        .into_iter()
        .map(|bytes| String::from_utf8(bytes).map_err(|e| corrupt(e.to_string())))
        .collect()
}
