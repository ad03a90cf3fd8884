//! Datagram framing helpers
//!
//! Little-endian builders and readers for the fixed-layout KOTH packets.

use crate::game::constants::net::MAX_DATAGRAM_SIZE;

/// Errors that can occur while framing a datagram
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("Datagram too large: {0} bytes (max {1})")]
    DatagramTooLarge(usize, usize),
}

/// Validate datagram size (unreliable channel, no fragmentation)
pub fn validate_datagram_size(data: &[u8]) -> Result<(), FramingError> {
    if data.len() > MAX_DATAGRAM_SIZE {
        Err(FramingError::DatagramTooLarge(data.len(), MAX_DATAGRAM_SIZE))
    } else {
        Ok(())
    }
}

/// Frame builder for constructing datagrams
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Write raw bytes
    pub fn write(mut self, data: &[u8]) -> Self {
        self.buffer.extend_from_slice(data);
        self
    }

    pub fn write_u8(mut self, value: u8) -> Self {
        self.buffer.push(value);
        self
    }

    /// Write a u16 (little-endian)
    pub fn write_u16(mut self, value: u16) -> Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }

}

/// Frame reader for parsing datagrams
pub struct FrameReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read n bytes
    pub fn read(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.position + n > self.data.len() {
            return None;
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Some(slice)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.read(1).map(|b| b[0])
    }

    /// Read a u16 (little-endian)
    pub fn read_u16(&mut self) -> Option<u16> {
        self.read(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.data.len()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_datagram_size() {
        assert!(validate_datagram_size(&[0u8; 100]).is_ok());
        let large = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        assert_eq!(
            validate_datagram_size(&large),
            Err(FramingError::DatagramTooLarge(MAX_DATAGRAM_SIZE + 1, MAX_DATAGRAM_SIZE))
        );
    }

    #[test]
    fn test_frame_builder_little_endian() {
        let frame = FrameBuilder::with_capacity(8)
            .write_u8(0x01)
            .write_u16(0x1234)
            .write(b"ok")
            .build();
        assert_eq!(frame, vec![0x01, 0x34, 0x12, b'o', b'k']);
    }

    #[test]
    fn test_frame_reader() {
        let data = FrameBuilder::with_capacity(8).write_u8(42).write_u16(1000).build();
        let mut reader = FrameReader::new(&data);
        assert_eq!(reader.read_u8(), Some(42));
        assert_eq!(reader.read_u16(), Some(1000));
        assert!(!reader.has_remaining());
    }

    #[test]
    fn test_frame_reader_overflow() {
        let data = vec![1, 2, 3];
        let mut reader = FrameReader::new(&data);
        assert_eq!(reader.read_u16(), Some(0x0201));
        assert_eq!(reader.read_u16(), None);
        assert_eq!(reader.remaining(), &[3]);
    }
}
