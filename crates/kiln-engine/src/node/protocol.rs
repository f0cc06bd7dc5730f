//! Framing for the engine host protocol.
//!
//! Every message is `[tag u8][len u32 LE][payload]`. Requests carry an
//! [`Op`] tag, responses a [`Status`] tag.

use serde::Serialize;
use std::io::{self, Read, Write};

use crate::engine::{CachedScript, Invocation};
use crate::error::{EngineError, EngineResult};

/// Frame header size
pub const FRAME_HEADER_LEN: usize = 5;

/// Request operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Report `process.version` and `process.versions.v8`
    Version = 0,
    /// Compile the UTF-8 payload, reply with its code cache
    Compile = 1,
    /// Validate and run a cache, reply with a JSON outcome
    Run = 2,
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Payload is the result
    Ok = 0,
    /// Payload is an error message
    Error = 1,
}

impl TryFrom<u8> for Status {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, EngineError> {
        match value {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Error),
            other => Err(EngineError::protocol(format!("invalid status tag {}", other))),
        }
    }
}

/// Write one frame and flush
pub fn write_frame<W: Write>(writer: &mut W, tag: u8, payload: &[u8]) -> EngineResult<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| EngineError::protocol(format!("payload of {} bytes", payload.len())))?;
    writer.write_all(&[tag])?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame
pub fn read_frame<R: Read>(reader: &mut R) -> EngineResult<(u8, Vec<u8>)> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => EngineError::protocol("engine host closed its output"),
        _ => EngineError::Io(e),
    })?;

    let len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok((header[0], payload))
}

#[derive(Serialize)]
struct RunHeader<'a> {
    filename: String,
    placeholder: &'a str,
    invocation: Invocation,
}

/// Encode a run request: `[json len u32 LE][json header][cache bytes]`
pub fn encode_run(script: &CachedScript<'_>) -> EngineResult<Vec<u8>> {
    let header = serde_json::to_vec(&RunHeader {
        filename: script.filename.to_string_lossy().into_owned(),
        placeholder: script.placeholder,
        invocation: script.invocation,
    })?;

    let mut payload = Vec::with_capacity(4 + header.len() + script.data.len());
    payload.extend_from_slice(&(header.len() as u32).to_le_bytes());
    payload.extend_from_slice(&header);
    payload.extend_from_slice(script.data);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    #[test]
    fn test_frame_layout() {
        let mut out = Vec::new();
        write_frame(&mut out, Op::Compile as u8, b"1+1").unwrap();
        assert_eq!(out, vec![1, 3, 0, 0, 0, b'1', b'+', b'1']);

        let (tag, payload) = read_frame(&mut Cursor::new(out)).unwrap();
        assert_eq!(tag, 1);
        assert_eq!(payload, b"1+1");
    }

    #[test]
    fn test_read_eof_is_protocol_error() {
        let err = read_frame(&mut Cursor::new(vec![0u8, 1])).unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(Status::try_from(0).unwrap(), Status::Ok);
        assert_eq!(Status::try_from(1).unwrap(), Status::Error);
        assert!(Status::try_from(7).is_err());
    }

    #[test]
    fn test_encode_run() {
        let script = CachedScript {
            filename: Path::new("/app/main.bin"),
            placeholder: "\"\"",
            data: &[9, 9],
            invocation: Invocation::Module,
        };
        let payload = encode_run(&script).unwrap();

        let header_len = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
        let header: serde_json::Value = serde_json::from_slice(&payload[4..4 + header_len]).unwrap();
        assert_eq!(header["filename"], "/app/main.bin");
        assert_eq!(header["placeholder"], "\"\"");
        assert_eq!(header["invocation"], "module");
        assert_eq!(&payload[4 + header_len..], &[9, 9]);
    }
}
