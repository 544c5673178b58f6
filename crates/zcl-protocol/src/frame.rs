//! ZCL frame structure and payload cursors

use crate::commands::{Direction, FrameType};
use crate::data_type::ZclDataType;
use crate::types::{FrameError, ZclValue};
use bytes::{BufMut, BytesMut};

/// Minimum frame size: frame_control(1) + seq(1) + cmd(1) = 3
pub const MIN_FRAME_SIZE: usize = 3;

/// Frame control field bits
pub mod frame_control {
    pub const FRAME_TYPE_MASK: u8 = 0x03;
    pub const MANUFACTURER_SPECIFIC: u8 = 0x04;
    pub const SERVER_TO_CLIENT: u8 = 0x08;
    pub const DISABLE_DEFAULT_RESPONSE: u8 = 0x10;
}

/// ZCL frame
///
/// Frame format:
/// ```text
/// [Frame Control: 1 byte]
/// [Manufacturer Code: 2 bytes LE] (only if manufacturer-specific)
/// [Transaction Sequence: 1 byte]
/// [Command ID: 1 byte]
/// [Payload: variable]
/// ```
///
/// Outgoing frames are built with `append_*` up to a declared capacity,
/// then `shrink()`ed to what was written. Incoming frames come from
/// `parse()` with their capacity pinned to the payload length, so they
/// are read-only and consumed with `read_*`.
#[derive(Debug, Clone)]
pub struct ZclFrame {
    frame_type: FrameType,
    direction: Direction,
    manufacturer_code: Option<u16>,
    disable_default_response: bool,
    sequence: u8,
    command_id: u8,
    payload: BytesMut,
    read_pos: usize,
    capacity: usize,
}

impl ZclFrame {
    /// Create an empty outgoing general frame able to hold `capacity` payload bytes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_type: FrameType::General,
            direction: Direction::ClientToServer,
            manufacturer_code: None,
            disable_default_response: false,
            sequence: 0,
            command_id: 0,
            payload: BytesMut::with_capacity(capacity),
            read_pos: 0,
            capacity,
        }
    }

    /// Parse a ZCL frame from raw ASDU bytes
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < MIN_FRAME_SIZE {
            return Err(FrameError::TooShort(data.len()));
        }

        let fc = data[0];
        let mut idx = 1;

        let manufacturer_code = if (fc & frame_control::MANUFACTURER_SPECIFIC) != 0 {
            if data.len() < idx + 2 + 2 {
                return Err(FrameError::TooShort(data.len()));
            }
            let code = u16::from_le_bytes([data[idx], data[idx + 1]]);
            idx += 2;
            Some(code)
        } else {
            None
        };

        let sequence = data[idx];
        let command_id = data[idx + 1];
        idx += 2;

        let payload = BytesMut::from(&data[idx..]);
        let capacity = payload.len();

        Ok(Self {
            frame_type: if (fc & frame_control::FRAME_TYPE_MASK) == 0x01 {
                FrameType::ClusterSpecific
            } else {
                FrameType::General
            },
            direction: if (fc & frame_control::SERVER_TO_CLIENT) != 0 {
                Direction::ServerToClient
            } else {
                Direction::ClientToServer
            },
            manufacturer_code,
            disable_default_response: (fc & frame_control::DISABLE_DEFAULT_RESPONSE) != 0,
            sequence,
            command_id,
            payload,
            read_pos: 0,
            capacity,
        })
    }

    /// Serialize to bytes
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(MIN_FRAME_SIZE + 2 + self.payload.len());
        data.push(self.frame_control());
        if let Some(mfr) = self.manufacturer_code {
            data.extend_from_slice(&mfr.to_le_bytes());
        }
        data.push(self.sequence);
        data.push(self.command_id);
        data.extend_from_slice(&self.payload);
        data
    }

    /// Get frame control byte
    #[must_use]
    pub fn frame_control(&self) -> u8 {
        let mut fc = self.frame_type as u8;
        if self.manufacturer_code.is_some() {
            fc |= frame_control::MANUFACTURER_SPECIFIC;
        }
        if self.direction == Direction::ServerToClient {
            fc |= frame_control::SERVER_TO_CLIENT;
        }
        if self.disable_default_response {
            fc |= frame_control::DISABLE_DEFAULT_RESPONSE;
        }
        fc
    }

    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn set_frame_type(&mut self, frame_type: FrameType) {
        self.frame_type = frame_type;
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    #[must_use]
    pub fn is_manufacturer_specific(&self) -> bool {
        self.manufacturer_code.is_some()
    }

    #[must_use]
    pub fn manufacturer_code(&self) -> Option<u16> {
        self.manufacturer_code
    }

    #[must_use]
    pub fn is_default_response_disabled(&self) -> bool {
        self.disable_default_response
    }

    pub fn disable_default_response(&mut self, disable: bool) {
        self.disable_default_response = disable;
    }

    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: u8) {
        self.sequence = sequence;
    }

    #[must_use]
    pub fn command_id(&self) -> u8 {
        self.command_id
    }

    pub fn set_command_id(&mut self, command_id: u8) {
        self.command_id = command_id;
    }

    /// Written payload bytes
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// Declared payload capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Truncate the declared capacity to the bytes actually written
    pub fn shrink(&mut self) {
        self.capacity = self.payload.len();
    }

    /// Drop written bytes past `len` (used to roll back a partial record)
    pub fn truncate(&mut self, len: usize) {
        self.payload.truncate(len);
        self.read_pos = self.read_pos.min(self.payload.len());
    }

    fn ensure_capacity(&self, additional: usize) -> Result<(), FrameError> {
        let needed = self.payload.len() + additional;
        if needed > self.capacity {
            return Err(FrameError::Overflow {
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn append_u8(&mut self, value: u8) -> Result<(), FrameError> {
        self.ensure_capacity(1)?;
        self.payload.put_u8(value);
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn append_u16(&mut self, value: u16) -> Result<(), FrameError> {
        self.ensure_capacity(2)?;
        self.payload.put_u16_le(value);
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.ensure_capacity(bytes.len())?;
        self.payload.put_slice(bytes);
        Ok(())
    }

    /// Append a value encoded as `data_type`
    #[allow(clippy::missing_errors_doc)]
    pub fn append_value(&mut self, data_type: ZclDataType, value: &ZclValue) -> Result<(), FrameError> {
        data_type.serialize(self, value)
    }

    /// Bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.read_pos
    }

    /// Current read cursor
    #[must_use]
    pub fn position(&self) -> usize {
        self.read_pos
    }

    /// Move the read cursor back to a position obtained from `position()`
    pub fn rewind(&mut self, position: usize) {
        self.read_pos = position.min(self.payload.len());
    }

    /// Look at `len` bytes starting `offset` bytes past the read cursor
    #[allow(clippy::missing_errors_doc)]
    pub fn peek(&self, offset: usize, len: usize) -> Result<&[u8], FrameError> {
        let start = self.read_pos + offset;
        if start + len > self.payload.len() {
            return Err(FrameError::Underrun {
                needed: offset + len,
                remaining: self.remaining(),
            });
        }
        Ok(&self.payload[start..start + len])
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn read_u8(&mut self) -> Result<u8, FrameError> {
        let value = self.peek(0, 1)?[0];
        self.read_pos += 1;
        Ok(value)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn read_u16(&mut self) -> Result<u16, FrameError> {
        let bytes = self.peek(0, 2)?;
        let value = u16::from_le_bytes([bytes[0], bytes[1]]);
        self.read_pos += 2;
        Ok(value)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, FrameError> {
        let bytes = self.peek(0, len)?.to_vec();
        self.read_pos += len;
        Ok(bytes)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn skip(&mut self, len: usize) -> Result<(), FrameError> {
        self.peek(0, len)?;
        self.read_pos += len;
        Ok(())
    }

    /// Derive an outgoing general frame answering this one
    ///
    /// The response keeps the transaction sequence number and manufacturer
    /// code, travels in the opposite direction and does not itself ask for
    /// a default response.
    #[must_use]
    pub fn create_response_frame(&self, capacity: usize) -> ZclFrame {
        let mut response = ZclFrame::new(capacity);
        response.direction = self.direction.reversed();
        response.manufacturer_code = self.manufacturer_code;
        response.sequence = self.sequence;
        response.disable_default_response = true;
        response
    }
}
