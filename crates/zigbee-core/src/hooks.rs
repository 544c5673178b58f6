//! Extension points implemented by concrete clusters
//!
//! The engine knows the general command set; everything attribute specific
//! (which attributes exist, how their values are encoded and stored) is
//! delegated to a [`ClusterHooks`] implementation.

use crate::attribute::AttributeDescriptor;
use thiserror::Error;
use zcl_protocol::{status, FrameError, ZclDataType, ZclFrame, ZclValue};

/// Failure raised by a hook
#[derive(Error, Debug)]
pub enum HookError {
    #[error("Operation not supported")]
    UnsupportedOperation,

    /// Report this ZCL status for the attribute
    #[error("ZCL status {0:#04x}")]
    Status(u8),

    /// The backing appliance failed
    #[error("Appliance error: {0}")]
    Appliance(String),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Attribute-level behavior of a concrete cluster
///
/// Every method has a default, so a cluster without attributes can use
/// [`UnsupportedHooks`] and still take part in the general command set.
pub trait ClusterHooks: Send + Sync {
    /// Attribute catalogue of the cluster
    fn attributes(&self) -> &[AttributeDescriptor] {
        &[]
    }

    fn attribute_descriptor(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes().iter().find(|d| d.name == name)
    }

    fn attribute_descriptor_by_id(&self, attr_id: u16) -> Option<&AttributeDescriptor> {
        self.attributes().iter().find(|d| d.id == attr_id)
    }

    /// Bytes needed for the value part of a ReadAttributes response record
    ///
    /// Does not include the attribute id or status byte.
    fn read_attribute_response_size(&self, _attr_id: u16) -> Result<usize, HookError> {
        Err(HookError::UnsupportedOperation)
    }

    /// Append status, data type and value for `attr_id`
    ///
    /// The attribute id is already written. Returns `Ok(false)` if the
    /// attribute is unknown, in which case nothing must have been appended.
    fn fill_attribute_record(&self, _frame: &mut ZclFrame, _attr_id: u16) -> Result<bool, HookError> {
        Ok(false)
    }

    /// Consume the value of a WriteAttributes record and apply it
    ///
    /// The read cursor sits on the value. Returns the per-record status.
    /// A hook answering `UNSUPPORTED_ATTRIBUTE` may leave the value
    /// unconsumed; the engine skips it.
    fn write_attribute(&self, _frame: &mut ZclFrame, _attr_id: u16, _data_type: u8) -> Result<u8, HookError> {
        Ok(status::UNSUPPORTED_ATTRIBUTE)
    }
}

/// Hooks for a cluster exposing no attributes
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedHooks;

impl ClusterHooks for UnsupportedHooks {}

/// Append a successful ReadAttributes record body (status, type, value)
#[allow(clippy::missing_errors_doc)]
pub fn append_attribute_value(frame: &mut ZclFrame, data_type: ZclDataType, value: &ZclValue) -> Result<(), FrameError> {
    frame.append_u8(status::SUCCESS)?;
    frame.append_u8(data_type as u8)?;
    frame.append_value(data_type, value)
}
