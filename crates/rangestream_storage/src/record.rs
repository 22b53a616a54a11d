//! Operation log records and framing.
//!
//! Every mutation of a [`super::FileListStore`] is appended to its log as one
//! framed record:
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | header crc32 (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The header CRC covers the eleven bytes before it, so a damaged length is
//! caught before it is used to find the end of the frame. The trailing CRC
//! covers everything before it. Integers are little-endian.

use crate::error::{StorageError, StorageResult};

/// Magic bytes identifying a log record.
pub const LOG_MAGIC: [u8; 4] = *b"RSLG";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
const HEADER_FIELDS_SIZE: usize = 11;

/// Header fields plus their CRC.
pub(crate) const HEADER_SIZE: usize = HEADER_FIELDS_SIZE + CRC_SIZE;

pub(crate) const CRC_SIZE: usize = 4;

/// Largest payload one frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// Payload bytes of a `Push` record before its first value.
#[must_use]
pub const fn push_overhead(key_len: usize) -> usize {
    // key length + key + value count
    4 + key_len + 4
}

/// Payload bytes one value adds to a `Push` record.
#[must_use]
pub const fn push_entry_size(value_len: usize) -> usize {
    4 + value_len
}

/// Largest single value a `Push` under a key of `key_len` bytes can frame.
#[must_use]
pub const fn max_value_size(key_len: usize) -> usize {
    MAX_PAYLOAD_SIZE.saturating_sub(push_overhead(key_len) + push_entry_size(0))
}

/// Type of log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// Values appended to a list.
    Push = 1,
    /// A list trimmed to a window.
    Trim = 2,
    /// A list removed.
    Clear = 3,
    /// Every list removed.
    FlushAll = 4,
}

impl LogRecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Push),
            2 => Some(Self::Trim),
            3 => Some(Self::Clear),
            4 => Some(Self::FlushAll),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A single list mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Append values to a list.
    Push {
        /// List key.
        key: Vec<u8>,
        /// Values in append order.
        values: Vec<Vec<u8>>,
    },
    /// Keep only `[start, stop)` of a list.
    Trim {
        /// List key.
        key: Vec<u8>,
        /// Window start.
        start: u64,
        /// Window end (exclusive).
        stop: u64,
    },
    /// Remove a list.
    Clear {
        /// List key.
        key: Vec<u8>,
    },
    /// Remove every list.
    FlushAll,
}

impl LogRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> LogRecordType {
        match self {
            Self::Push { .. } => LogRecordType::Push,
            Self::Trim { .. } => LogRecordType::Trim,
            Self::Clear { .. } => LogRecordType::Clear,
            Self::FlushAll => LogRecordType::FlushAll,
        }
    }

    /// Serializes the record payload (without envelope).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooLarge`] if a key or value is longer than
    /// `u32::MAX` bytes.
    pub fn encode_payload(&self) -> StorageResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Self::Push { key, values } => {
                put_bytes(&mut buf, key)?;
                put_u32(&mut buf, values.len())?;
                for value in values {
                    put_bytes(&mut buf, value)?;
                }
            }
            Self::Trim { key, start, stop } => {
                put_bytes(&mut buf, key)?;
                buf.extend_from_slice(&start.to_le_bytes());
                buf.extend_from_slice(&stop.to_le_bytes());
            }
            Self::Clear { key } => put_bytes(&mut buf, key)?,
            Self::FlushAll => {}
        }
        Ok(buf)
    }

    /// Deserializes a record from its type and payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] on short or trailing payload bytes.
    pub fn decode_payload(record_type: LogRecordType, payload: &[u8]) -> StorageResult<Self> {
        let mut cursor = Cursor { payload, pos: 0 };
        let record = match record_type {
            LogRecordType::Push => {
                let key = cursor.bytes()?;
                let count = cursor.u32()? as usize;
                let mut values = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    values.push(cursor.bytes()?);
                }
                Self::Push { key, values }
            }
            LogRecordType::Trim => Self::Trim {
                key: cursor.bytes()?,
                start: cursor.u64()?,
                stop: cursor.u64()?,
            },
            LogRecordType::Clear => Self::Clear {
                key: cursor.bytes()?,
            },
            LogRecordType::FlushAll => Self::FlushAll,
        };
        if cursor.pos != payload.len() {
            return Err(StorageError::corrupted(format!(
                "trailing bytes in {:?} record: expected {} bytes, got {}",
                record_type,
                cursor.pos,
                payload.len()
            )));
        }
        Ok(record)
    }

    /// Serializes the record with its envelope and checksum.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooLarge`] if the payload exceeds
    /// [`MAX_PAYLOAD_SIZE`].
    pub fn encode_frame(&self) -> StorageResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        put_u32(&mut data, payload.len())?;
        let header_crc = compute_crc32(&data);
        data.extend_from_slice(&header_crc.to_le_bytes());
        data.extend_from_slice(&payload);
        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes the frame starting at `offset` in `log`.
    ///
    /// Returns `Ok(None)` when the remaining bytes hold only a truncated
    /// frame (a crash mid-write); the caller treats that as end of log.
    /// A frame counts as truncated only if its header is incomplete, or its
    /// header checks out and the declared payload runs past the end of
    /// `log`. Returns the record and the frame size otherwise.
    ///
    /// # Errors
    ///
    /// Bad magic, unknown type, future version or either CRC failing are
    /// fatal.
    pub fn decode_frame(log: &[u8], offset: usize) -> StorageResult<Option<(Self, usize)>> {
        let rest = &log[offset..];
        if rest.len() < HEADER_SIZE {
            return Ok(None);
        }
        let expected = read_u32(&rest[HEADER_FIELDS_SIZE..HEADER_SIZE]);
        let actual = compute_crc32(&rest[..HEADER_FIELDS_SIZE]);
        if expected != actual {
            return Err(StorageError::ChecksumMismatch {
                offset: offset as u64,
                expected,
                actual,
            });
        }
        if rest[0..4] != LOG_MAGIC {
            return Err(StorageError::corrupted(format!(
                "invalid magic at offset {offset}"
            )));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > LOG_VERSION {
            return Err(StorageError::corrupted(format!(
                "unsupported version {version} at offset {offset}"
            )));
        }
        let type_byte = rest[6];
        let record_type = LogRecordType::from_byte(type_byte).ok_or_else(|| {
            StorageError::corrupted(format!(
                "unknown record type {type_byte} at offset {offset}"
            ))
        })?;
        let len = read_u32(&rest[7..HEADER_FIELDS_SIZE]) as usize;
        let frame_len = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < frame_len {
            return Ok(None);
        }

        let body_end = HEADER_SIZE + len;
        let expected = read_u32(&rest[body_end..frame_len]);
        let actual = compute_crc32(&rest[..body_end]);
        if expected != actual {
            return Err(StorageError::ChecksumMismatch {
                offset: offset as u64,
                expected,
                actual,
            });
        }

        let record = Self::decode_payload(record_type, &rest[HEADER_SIZE..body_end])?;
        Ok(Some((record, frame_len)))
    }
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn put_u32(buf: &mut Vec<u8>, n: usize) -> StorageResult<()> {
    let n = u32::try_from(n).map_err(|_| StorageError::TooLarge {
        size: n,
        max: MAX_PAYLOAD_SIZE,
    })?;
    buf.extend_from_slice(&n.to_le_bytes());
    Ok(())
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> StorageResult<()> {
    put_u32(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

struct Cursor<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> StorageResult<&[u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.payload.len())
            .ok_or_else(|| StorageError::corrupted("unexpected end of payload"))?;
        let slice = &self.payload[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> StorageResult<u32> {
        self.take(4).map(read_u32)
    }

    fn u64(&mut self) -> StorageResult<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    fn bytes(&mut self) -> StorageResult<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

/// Computes CRC32 checksum for data.
pub fn compute_crc32(data: &[u8]) -> u32 {
    // IEEE polynomial, table built at compile time
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
