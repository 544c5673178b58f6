//! ZCL data types: wire widths, parsing, serialization and skipping

use crate::frame::ZclFrame;
use crate::types::{FrameError, ZclValue};

/// Marker for an invalid (absent) short string
const INVALID_SHORT_LEN: u8 = 0xFF;
/// Marker for an invalid (absent) long string or empty composite
const INVALID_LONG_LEN: u16 = 0xFFFF;

/// ZCL data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ZclDataType {
    NoData = 0x00,
    Data8 = 0x08,
    Data16 = 0x09,
    Data24 = 0x0A,
    Data32 = 0x0B,
    Data40 = 0x0C,
    Data48 = 0x0D,
    Data56 = 0x0E,
    Data64 = 0x0F,
    Boolean = 0x10,
    Bitmap8 = 0x18,
    Bitmap16 = 0x19,
    Bitmap24 = 0x1A,
    Bitmap32 = 0x1B,
    Bitmap40 = 0x1C,
    Bitmap48 = 0x1D,
    Bitmap56 = 0x1E,
    Bitmap64 = 0x1F,
    Uint8 = 0x20,
    Uint16 = 0x21,
    Uint24 = 0x22,
    Uint32 = 0x23,
    Uint40 = 0x24,
    Uint48 = 0x25,
    Uint56 = 0x26,
    Uint64 = 0x27,
    Int8 = 0x28,
    Int16 = 0x29,
    Int24 = 0x2A,
    Int32 = 0x2B,
    Int40 = 0x2C,
    Int48 = 0x2D,
    Int56 = 0x2E,
    Int64 = 0x2F,
    Enum8 = 0x30,
    Enum16 = 0x31,
    Float16 = 0x38,
    Float32 = 0x39,
    Float64 = 0x3A,
    OctetString = 0x41,
    CharString = 0x42,
    LongOctetString = 0x43,
    LongCharString = 0x44,
    Array = 0x48,
    Struct = 0x4C,
    Set = 0x50,
    Bag = 0x51,
    TimeOfDay = 0xE0,
    Date = 0xE1,
    UtcTime = 0xE2,
    ClusterId = 0xE8,
    AttributeId = 0xE9,
    BacnetOid = 0xEA,
    IeeeAddress = 0xF0,
    SecurityKey128 = 0xF1,
}

impl ZclDataType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        use ZclDataType::*;
        let data_type = match value {
            0x00 => NoData,
            0x08 => Data8,
            0x09 => Data16,
            0x0A => Data24,
            0x0B => Data32,
            0x0C => Data40,
            0x0D => Data48,
            0x0E => Data56,
            0x0F => Data64,
            0x10 => Boolean,
            0x18 => Bitmap8,
            0x19 => Bitmap16,
            0x1A => Bitmap24,
            0x1B => Bitmap32,
            0x1C => Bitmap40,
            0x1D => Bitmap48,
            0x1E => Bitmap56,
            0x1F => Bitmap64,
            0x20 => Uint8,
            0x21 => Uint16,
            0x22 => Uint24,
            0x23 => Uint32,
            0x24 => Uint40,
            0x25 => Uint48,
            0x26 => Uint56,
            0x27 => Uint64,
            0x28 => Int8,
            0x29 => Int16,
            0x2A => Int24,
            0x2B => Int32,
            0x2C => Int40,
            0x2D => Int48,
            0x2E => Int56,
            0x2F => Int64,
            0x30 => Enum8,
            0x31 => Enum16,
            0x38 => Float16,
            0x39 => Float32,
            0x3A => Float64,
            0x41 => OctetString,
            0x42 => CharString,
            0x43 => LongOctetString,
            0x44 => LongCharString,
            0x48 => Array,
            0x4C => Struct,
            0x50 => Set,
            0x51 => Bag,
            0xE0 => TimeOfDay,
            0xE1 => Date,
            0xE2 => UtcTime,
            0xE8 => ClusterId,
            0xE9 => AttributeId,
            0xEA => BacnetOid,
            0xF0 => IeeeAddress,
            0xF1 => SecurityKey128,
            _ => return None,
        };
        Some(data_type)
    }

    /// Look up a wire tag, failing on tags this library does not know
    #[allow(clippy::missing_errors_doc)]
    pub fn from_tag(tag: u8) -> Result<Self, FrameError> {
        Self::from_u8(tag).ok_or(FrameError::UnknownDataType(tag))
    }

    /// Encoded width for fixed-size types, `None` for strings and composites
    #[must_use]
    pub fn fixed_size(&self) -> Option<usize> {
        use ZclDataType::*;
        match self {
            NoData => Some(0),
            Data8 | Boolean | Bitmap8 | Uint8 | Int8 | Enum8 => Some(1),
            Data16 | Bitmap16 | Uint16 | Int16 | Enum16 | Float16 | ClusterId | AttributeId => {
                Some(2)
            }
            Data24 | Bitmap24 | Uint24 | Int24 => Some(3),
            Data32 | Bitmap32 | Uint32 | Int32 | Float32 | TimeOfDay | Date | UtcTime
            | BacnetOid => Some(4),
            Data40 | Bitmap40 | Uint40 | Int40 => Some(5),
            Data48 | Bitmap48 | Uint48 | Int48 => Some(6),
            Data56 | Bitmap56 | Uint56 | Int56 => Some(7),
            Data64 | Bitmap64 | Uint64 | Int64 | Float64 | IeeeAddress => Some(8),
            SecurityKey128 => Some(16),
            OctetString | CharString | LongOctetString | LongCharString | Array | Struct | Set
            | Bag => None,
        }
    }

    /// Analog types carry a reportable-change field in reporting configuration
    #[must_use]
    pub fn is_analog(&self) -> bool {
        use ZclDataType::*;
        matches!(
            self,
            Uint8
                | Uint16
                | Uint24
                | Uint32
                | Uint40
                | Uint48
                | Uint56
                | Uint64
                | Int8
                | Int16
                | Int24
                | Int32
                | Int40
                | Int48
                | Int56
                | Int64
                | Float16
                | Float32
                | Float64
                | TimeOfDay
                | Date
                | UtcTime
        )
    }

    fn is_signed(&self) -> bool {
        use ZclDataType::*;
        matches!(self, Int8 | Int16 | Int24 | Int32 | Int40 | Int48 | Int56 | Int64)
    }

    fn is_float(&self) -> bool {
        matches!(
            self,
            ZclDataType::Float16 | ZclDataType::Float32 | ZclDataType::Float64
        )
    }

    fn is_composite(&self) -> bool {
        use ZclDataType::*;
        matches!(self, Array | Struct | Set | Bag)
    }

    /// Encoded length of a value of this type found `offset` bytes past the read cursor
    #[allow(clippy::missing_errors_doc)]
    pub fn encoded_len(&self, frame: &ZclFrame, offset: usize) -> Result<usize, FrameError> {
        if let Some(size) = self.fixed_size() {
            return Ok(size);
        }

        match self {
            ZclDataType::OctetString | ZclDataType::CharString => {
                let len = frame.peek(offset, 1)?[0];
                if len == INVALID_SHORT_LEN {
                    Ok(1)
                } else {
                    Ok(1 + len as usize)
                }
            }
            ZclDataType::LongOctetString | ZclDataType::LongCharString => {
                let len = peek_u16(frame, offset)?;
                if len == INVALID_LONG_LEN {
                    Ok(2)
                } else {
                    Ok(2 + len as usize)
                }
            }
            ZclDataType::Array | ZclDataType::Set | ZclDataType::Bag => {
                // element_type(1) + count(2) + elements
                let element_type = Self::from_tag(frame.peek(offset, 1)?[0])?;
                let count = peek_u16(frame, offset + 1)?;
                let mut len = 3;
                if count == INVALID_LONG_LEN {
                    return Ok(len);
                }
                for _ in 0..count {
                    len += element_type.encoded_len(frame, offset + len)?;
                }
                Ok(len)
            }
            ZclDataType::Struct => {
                // count(2) + (element_type(1) + element)*
                let count = peek_u16(frame, offset)?;
                let mut len = 2;
                if count == INVALID_LONG_LEN {
                    return Ok(len);
                }
                for _ in 0..count {
                    let element_type = Self::from_tag(frame.peek(offset + len, 1)?[0])?;
                    len += 1;
                    len += element_type.encoded_len(frame, offset + len)?;
                }
                Ok(len)
            }
            _ => Err(FrameError::UnsupportedDataType(*self as u8)),
        }
    }

    /// Advance the read cursor over one value of this type
    #[allow(clippy::missing_errors_doc)]
    pub fn skip(&self, frame: &mut ZclFrame) -> Result<(), FrameError> {
        let len = self.encoded_len(frame, 0)?;
        frame.skip(len)
    }

    /// Parse one value of this type at the read cursor
    #[allow(clippy::missing_errors_doc)]
    pub fn parse(&self, frame: &mut ZclFrame) -> Result<ZclValue, FrameError> {
        use ZclDataType::*;

        if self.is_composite() {
            let len = self.encoded_len(frame, 0)?;
            return Ok(ZclValue::Octets(frame.read_bytes(len)?));
        }

        match self {
            NoData => Ok(ZclValue::Null),
            Boolean => match frame.read_u8()? {
                0x00 => Ok(ZclValue::Bool(false)),
                0x01 => Ok(ZclValue::Bool(true)),
                _ => Ok(ZclValue::Null),
            },
            Float16 => {
                let raw = frame.read_u16()?;
                Ok(ZclValue::Float(f64::from(half_to_f32(raw))))
            }
            Float32 => {
                let bytes = frame.read_bytes(4)?;
                let raw = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Ok(ZclValue::Float(f64::from(raw)))
            }
            Float64 => {
                let bytes = frame.read_bytes(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(ZclValue::Float(f64::from_le_bytes(raw)))
            }
            SecurityKey128 => Ok(ZclValue::Octets(frame.read_bytes(16)?)),
            OctetString | LongOctetString | CharString | LongCharString => {
                let len = if matches!(self, OctetString | CharString) {
                    let len = frame.read_u8()?;
                    if len == INVALID_SHORT_LEN {
                        return Ok(ZclValue::Null);
                    }
                    len as usize
                } else {
                    let len = frame.read_u16()?;
                    if len == INVALID_LONG_LEN {
                        return Ok(ZclValue::Null);
                    }
                    len as usize
                };
                let bytes = frame.read_bytes(len)?;
                if matches!(self, CharString | LongCharString) {
                    Ok(ZclValue::String(String::from_utf8_lossy(&bytes).into_owned()))
                } else {
                    Ok(ZclValue::Octets(bytes))
                }
            }
            _ => {
                let width = self
                    .fixed_size()
                    .ok_or(FrameError::UnsupportedDataType(*self as u8))?;
                let bytes = frame.read_bytes(width)?;
                let raw = bytes
                    .iter()
                    .rev()
                    .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
                if self.is_signed() {
                    let shift = 64 - 8 * width as u32;
                    Ok(ZclValue::Signed(((raw << shift) as i64) >> shift))
                } else {
                    Ok(ZclValue::Unsigned(raw))
                }
            }
        }
    }

    /// Append `value` encoded as this type
    #[allow(clippy::missing_errors_doc)]
    pub fn serialize(&self, frame: &mut ZclFrame, value: &ZclValue) -> Result<(), FrameError> {
        use ZclDataType::*;

        let mismatch = || FrameError::ValueMismatch {
            data_type: *self as u8,
            value: value.to_string(),
        };

        match (self, value) {
            (NoData, ZclValue::Null) => Ok(()),
            (Boolean, ZclValue::Bool(v)) => frame.append_u8(u8::from(*v)),
            (Boolean, ZclValue::Null) => frame.append_u8(0xFF),
            (Float16, _) => {
                let v = value.as_f64().ok_or_else(mismatch)?;
                frame.append_u16(f32_to_half(v as f32))
            }
            (Float32, _) => {
                let v = value.as_f64().ok_or_else(mismatch)?;
                frame.append_bytes(&(v as f32).to_le_bytes())
            }
            (Float64, _) => {
                let v = value.as_f64().ok_or_else(mismatch)?;
                frame.append_bytes(&v.to_le_bytes())
            }
            (OctetString | CharString, ZclValue::Null) => frame.append_u8(INVALID_SHORT_LEN),
            (LongOctetString | LongCharString, ZclValue::Null) => {
                frame.append_u16(INVALID_LONG_LEN)
            }
            (OctetString | CharString | LongOctetString | LongCharString, _) => {
                let bytes = match value {
                    ZclValue::String(s) => s.as_bytes(),
                    ZclValue::Octets(o) => o.as_slice(),
                    _ => return Err(mismatch()),
                };
                if matches!(self, OctetString | CharString) {
                    let len = u8::try_from(bytes.len())
                        .ok()
                        .filter(|&l| l != INVALID_SHORT_LEN)
                        .ok_or_else(mismatch)?;
                    frame.append_u8(len)?;
                } else {
                    let len = u16::try_from(bytes.len())
                        .ok()
                        .filter(|&l| l != INVALID_LONG_LEN)
                        .ok_or_else(mismatch)?;
                    frame.append_u16(len)?;
                }
                frame.append_bytes(bytes)
            }
            (SecurityKey128, ZclValue::Octets(o)) if o.len() == 16 => frame.append_bytes(o),
            (Array | Struct | Set | Bag, ZclValue::Octets(raw)) => frame.append_bytes(raw),
            _ => {
                let width = match self.fixed_size() {
                    Some(w) if (1..=8).contains(&w) && !self.is_float() => w,
                    _ => return Err(mismatch()),
                };
                let raw = if self.is_signed() {
                    let v = match value {
                        ZclValue::Signed(v) => *v,
                        ZclValue::Unsigned(v) => i64::try_from(*v).map_err(|_| mismatch())?,
                        _ => return Err(mismatch()),
                    };
                    if width < 8 {
                        let bound = 1i64 << (8 * width - 1);
                        if v < -bound || v >= bound {
                            return Err(mismatch());
                        }
                    }
                    v as u64
                } else {
                    let v = match value {
                        ZclValue::Unsigned(v) => *v,
                        ZclValue::Signed(v) => u64::try_from(*v).map_err(|_| mismatch())?,
                        ZclValue::Bool(v) => u64::from(*v),
                        _ => return Err(mismatch()),
                    };
                    if width < 8 && v >> (8 * width) != 0 {
                        return Err(mismatch());
                    }
                    v
                };
                frame.append_bytes(&raw.to_le_bytes()[..width])
            }
        }
    }

    /// Value of this type closest to a numeric threshold
    #[must_use]
    pub fn value_from_f64(&self, value: f64) -> ZclValue {
        if self.is_float() {
            ZclValue::Float(value)
        } else if self.is_signed() {
            ZclValue::Signed(value.round() as i64)
        } else {
            ZclValue::Unsigned(value.max(0.0).round() as u64)
        }
    }
}

fn peek_u16(frame: &ZclFrame, offset: usize) -> Result<u16, FrameError> {
    let bytes = frame.peek(offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Decode an IEEE 754 half-precision value
#[must_use]
pub fn half_to_f32(raw: u16) -> f32 {
    let sign = if raw & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = i32::from((raw >> 10) & 0x1F);
    let mantissa = f32::from(raw & 0x03FF);

    let magnitude = match exponent {
        0 => mantissa * 2f32.powi(-24),
        0x1F if mantissa == 0.0 => f32::INFINITY,
        0x1F => f32::NAN,
        _ => (1.0 + mantissa / 1024.0) * 2f32.powi(exponent - 15),
    };
    sign * magnitude
}

/// Encode an IEEE 754 half-precision value (round to nearest)
#[must_use]
pub fn f32_to_half(value: f32) -> u16 {
    if value.is_nan() {
        return 0x7E00;
    }
    let sign: u16 = if value.is_sign_negative() { 0x8000 } else { 0 };
    let magnitude = value.abs();

    if magnitude >= 65520.0 {
        return sign | 0x7C00;
    }
    if magnitude < 2f32.powi(-14) {
        // subnormal; a rounded mantissa of 0x400 lands on the smallest normal
        let mantissa = (magnitude / 2f32.powi(-24)).round() as u16;
        return sign | mantissa;
    }

    let mut exponent = magnitude.log2().floor() as i32;
    let mut mantissa = ((magnitude / 2f32.powi(exponent) - 1.0) * 1024.0).round() as u16;
    if mantissa == 0x400 {
        exponent += 1;
        mantissa = 0;
    }
    if exponent > 15 {
        return sign | 0x7C00;
    }
    sign | (((exponent + 15) as u16) << 10) | mantissa
}
