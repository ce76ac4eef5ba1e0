//! Length-prefixed framing for the archive container.
//!
//! Integers are little-endian `u32`; byte strings and UTF-8 strings carry a
//! `u32` length prefix.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{CacheError, Result};

/// Upper bound for a single length-prefixed field.
pub const MAX_FIELD_LEN: usize = 1 << 30;

pub trait WriteArchiveExt: Write {
    fn write_len_u32(&mut self, len: usize) -> Result<()> {
        let len: u32 = len
            .try_into()
            .map_err(|_| CacheError::Corrupt(format!("length {len} does not fit in u32")))?;
        self.write_u32::<LittleEndian>(len)?;
        Ok(())
    }

    fn write_len_prefixed_bytes_u32(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_len_u32(bytes.len())?;
        self.write_all(bytes)?;
        Ok(())
    }

    fn write_string_u32(&mut self, s: &str) -> Result<()> {
        self.write_len_prefixed_bytes_u32(s.as_bytes())
    }
}

impl<T: Write + ?Sized> WriteArchiveExt for T {}

pub trait ReadArchiveExt: Read {
    fn read_len_u32(&mut self) -> Result<usize> {
        let len = self.read_u32::<LittleEndian>()? as usize;
        if len > MAX_FIELD_LEN {
            return Err(CacheError::Corrupt(format!("field length {len} is too large")));
        }
        Ok(len)
    }

    /// Reads exactly `len` bytes. The buffer grows with the data actually
    /// read, so a bogus length prefix cannot force a large allocation.
    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        Read::take(&mut *self, len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, found {}", buf.len()),
            )
            .into());
        }
        Ok(buf)
    }

    fn read_len_prefixed_bytes_u32(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len_u32()?;
        self.read_exact_vec(len)
    }

    fn read_string_u32(&mut self) -> Result<String> {
        Ok(String::from_utf8(self.read_len_prefixed_bytes_u32()?)?)
    }
}

impl<T: Read + ?Sized> ReadArchiveExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        buf.write_string_u32("Foo [00]").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(cursor.read_string_u32().unwrap(), "Foo [00]");
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(u32::MAX).unwrap();
        let err = Cursor::new(buf).read_len_prefixed_bytes_u32().unwrap_err();
        assert!(matches!(err, CacheError::Corrupt(_)));
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(8).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);
        let err = Cursor::new(buf).read_len_prefixed_bytes_u32().unwrap_err();
        assert!(matches!(err, CacheError::IoError(_)));
    }

    #[test]
    fn large_length_prefix_over_short_input_fails_cleanly() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(MAX_FIELD_LEN as u32).unwrap();
        buf.extend_from_slice(&[7; 16]);

        let mut cursor = Cursor::new(buf);
        let err = cursor.read_len_prefixed_bytes_u32().unwrap_err();
        assert!(matches!(err, CacheError::IoError(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert_eq!(cursor.position(), 20);
    }
}
