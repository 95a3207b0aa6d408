//! The binary wire protocol between the coordinator and its workers.
//!
//! A single connection carries length-prefixed frames: a 4-byte
//! little-endian length followed by that many bytes of a `bincode`-encoded
//! payload. Both message shapes are plain, field-order-sensitive structs so
//! encoding stays stable across a single build.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::testcase::{CoverageSet, Verdict};

/// Coordinator → Worker: the next input to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestcaseMessage {
    /// The raw input buffer to splice into guest memory.
    pub bytes: Vec<u8>,
}

/// Worker → Coordinator: the outcome of running one testcase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    /// The bytes that were run, echoed back so the coordinator can save them
    /// without the worker needing to know corpus internals.
    pub bytes: Vec<u8>,
    /// Guest virtual addresses newly executed during this run.
    pub coverage: CoverageSet,
    /// How the run terminated.
    pub verdict: Verdict,
}

/// Writes `payload`'s length-prefixed, bincode-encoded frame to `writer`.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, payload: &T) -> Result<(), Error> {
    let encoded = bincode::serialize(payload)?;
    let len = u32::try_from(encoded.len())
        .map_err(|_| Error::serialize("payload exceeds u32::MAX bytes"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&encoded)?;
    Ok(())
}

/// Reads one length-prefixed, bincode-encoded frame from `reader`.
pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> Result<T, Error> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    bincode::deserialize(&payload).map_err(Error::from)
}

/// Like [`read_frame`], but distinguishes a clean EOF (no frame at all, i.e.
/// the peer closed before sending a length prefix) from a real error, so
/// callers can treat an orderly disconnect differently from a malformed one.
pub fn try_read_frame<R: Read, T: for<'de> Deserialize<'de>>(
    reader: &mut R,
) -> Result<Option<T>, Error> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::from(e)),
    }
    let len = u32::from_le_bytes(len_buf) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(bincode::deserialize(&payload).map_err(Error::from)?))
}
