//! Binary time log format primitives.
//!
//! All multi-byte values are little-endian. A row is the fixed header
//! described by [`RecordLayout`](crate::layout::RecordLayout), a `u8` value
//! count and that many 5-byte entries: `order: u8`, `value: i32`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Bytes of one `(order, value)` entry.
pub const VALUE_ENTRY_SIZE: u64 = 5;

/// Entries a single row can declare.
pub const MAX_VALUES_PER_ROW: usize = u8::MAX as usize;

/// Descriptors addressable by an order byte.
pub const MAX_DESCRIPTORS: usize = 256;

/// Number of entries that can actually be read: the declared count clamped to
/// the whole entries left before end of file.
pub fn effective_value_count(declared: u8, remaining: u64) -> u8 {
    let fits = remaining / VALUE_ENTRY_SIZE;
    if (declared as u64) > fits { fits as u8 } else { declared }
}

/// File name of the binary paired with a template named `time_log`.
pub fn bin_file_name(time_log: &str) -> String {
    format!("{}.bin", time_log)
}

/// Path of the binary for `time_log` inside `data_path`.
pub fn bin_path(data_path: &Path, time_log: &str) -> PathBuf {
    data_path.join(bin_file_name(time_log))
}

/// Sequential reader that knows how many bytes are left.
pub(crate) struct ByteSource<R> {
    inner: R,
    position: u64,
    length: u64,
}

impl<R: Read> ByteSource<R> {
    pub fn new(inner: R, length: u64) -> Self {
        Self { inner, position: 0, length }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.length
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        if (N as u64) > self.remaining() {
            self.position = self.length;
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        self.inner.read_exact(&mut buf)?;
        self.position += N as u64;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Skip up to `count` bytes, never past the end of the data.
    pub fn skip(&mut self, count: u64) -> io::Result<()> {
        let count = count.min(self.remaining());
        let skipped = io::copy(&mut (&mut self.inner).take(count), &mut io::sink())?;
        self.position += skipped;
        if skipped < count {
            self.position = self.length;
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        Ok(())
    }
}

/// Little-endian row writer over an in-memory buffer.
#[derive(Debug, Default)]
pub(crate) struct ByteSink {
    buf: Vec<u8>,
}

impl ByteSink {
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
