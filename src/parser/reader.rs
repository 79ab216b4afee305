//! Seekable little-endian cursor used by the container parser.

use super::header::ParseError;
use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::SHIFT_JIS;
use log::trace;
use std::io::{self, Read, Seek, SeekFrom};

/// Cursor over a seekable byte source.
///
/// Every read either returns exactly the requested bytes or fails with
/// [`ParseError::TruncatedInput`]; there are no short reads.
pub struct BinaryReader<R> {
    inner: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> BinaryReader<R> {
    /// Wrap a source, measuring its length and rewinding it to the start.
    pub fn new(mut inner: R) -> Result<Self, ParseError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn tell(&self) -> u64 {
        self.pos
    }

    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Move to an absolute offset. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, offset: u64) -> Result<(), ParseError> {
        if offset > self.len {
            return Err(ParseError::OutOfRange {
                offset,
                size: self.len,
            });
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ParseError> {
        self.ensure_available(n as u64)?;
        let mut buf = vec![0u8; n];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, ParseError> {
        Ok(LittleEndian::read_u16(&self.read_array::<2>()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, ParseError> {
        Ok(LittleEndian::read_u32(&self.read_array::<4>()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, ParseError> {
        Ok(LittleEndian::read_i32(&self.read_array::<4>()?))
    }

    /// Jump to `offset`, run `f`, then return to the current position.
    ///
    /// The position is restored even when `f` fails, so callers can follow
    /// offsets out of a table without tracking where they came from.
    pub fn resolve<T, F>(&mut self, offset: u64, f: F) -> Result<T, ParseError>
    where
        F: FnOnce(&mut Self) -> Result<T, ParseError>,
    {
        let saved = self.pos;
        trace!("resolving offset {offset:#x} from {saved:#x}");
        self.seek(offset)?;
        let result = f(self);
        let restored = self.seek(saved);
        let value = result?;
        restored?;
        Ok(value)
    }

    /// Read `n` bytes at `offset` without moving the cursor.
    pub fn read_bytes_at(&mut self, offset: u64, n: usize) -> Result<Vec<u8>, ParseError> {
        self.resolve(offset, |r| r.read_bytes(n))
    }

    /// Read a double-null-terminated string at `offset` without moving the cursor.
    pub fn read_string_at(&mut self, offset: u64) -> Result<String, ParseError> {
        self.resolve(offset, |r| r.read_double_null_terminated_string())
    }

    /// Read bytes until the same terminator shows up twice in a row.
    ///
    /// The terminator is either `0x00` or end of stream, and the byte before the
    /// first read counts as end of stream. The collected bytes are decoded as
    /// Shift-JIS and every NUL character is removed from the result, so
    /// `"A\0B\0\0"` yields `"AB"`.
    pub fn read_double_null_terminated_string(&mut self) -> Result<String, ParseError> {
        let mut buffer = Vec::new();
        let mut previous: Option<u8> = None;

        loop {
            let current = self.next_byte()?;
            if current == previous && matches!(current, None | Some(0)) {
                break;
            }
            if let Some(byte) = current {
                buffer.push(byte);
            }
            previous = current;
        }

        decode_shift_jis(buffer)
    }

    fn next_byte(&mut self) -> Result<Option<u8>, ParseError> {
        if self.pos >= self.len {
            return Ok(None);
        }
        self.read_u8().map(Some)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        self.ensure_available(N as u64)?;
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn ensure_available(&self, needed: u64) -> Result<(), ParseError> {
        if self.remaining() < needed {
            return Err(ParseError::TruncatedInput {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), ParseError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(())
            }
            // The source shrank underneath us.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ParseError::TruncatedInput {
                offset: self.pos,
                needed: buf.len() as u64,
                available: self.remaining(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn decode_shift_jis(bytes: Vec<u8>) -> Result<String, ParseError> {
    match SHIFT_JIS.decode_without_bom_handling_and_without_replacement(&bytes) {
        Some(text) => Ok(text.replace('\0', "")),
        None => Err(ParseError::TextDecodeError { bytes }),
    }
}
