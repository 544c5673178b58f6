//! Outbound requests: attribute reads, writes, reporting configuration
//! and arbitrary commands
//!
//! Every operation honors `RequestContext::confirmation_required`. When it
//! is false the frame is posted with the default response disabled and
//! the operation completes without waiting for the device.

use crate::attribute::{AttributeValue, RequestContext, SubscriptionParameters};
use crate::cluster::ServiceCluster;
use crate::correlator::{correlate, is_default_response, parse_default_response};
use crate::status::{check_status, error_for_status};
use zcl_protocol::{status, FrameType, GeneralCommand, ZclDataType, ZclError, ZclFrame, ZclValue};

/// Reporting direction field: the attribute is reported by the server
const DIRECTION_REPORTED: u8 = 0x00;
/// Interval pair that disables reporting
const DISABLED_MIN_INTERVAL: u16 = 0x0000;
const DISABLED_MAX_INTERVAL: u16 = 0xFFFF;
/// Reportable change sent along with disabled reporting
const DISABLED_REPORTABLE_CHANGE: f64 = 1.0;
/// direction + attribute id + data type + min interval + max interval
const REPORTING_RECORD_SIZE: usize = 1 + 2 + 1 + 2 + 2;
/// Payload space reserved for a single WriteAttributes record
const WRITE_RECORD_CAPACITY: usize = 255;

/// Outcome of one attribute in a ReadAttributes exchange
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Value {
        data_type: ZclDataType,
        value: AttributeValue,
    },
    /// The device answered with a non-success status
    Status(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadAttributeRecord {
    pub attr_id: u16,
    pub outcome: ReadOutcome,
}

impl ServiceCluster {
    /// Read several attributes in one exchange
    ///
    /// Records come back in request order. Values read successfully are
    /// cached. Returns `None` when the request was posted unconfirmed or
    /// the device answered with a successful DefaultResponse only.
    #[allow(clippy::missing_errors_doc)]
    pub async fn read_attributes(
        &self,
        attr_ids: &[u16],
        ctx: &RequestContext,
    ) -> Result<Option<Vec<ReadAttributeRecord>>, ZclError> {
        let command_id = GeneralCommand::ReadAttributes as u8;
        let mut frame = self.create_outgoing_frame(command_id, attr_ids.len() * 2);
        for attr_id in attr_ids {
            frame.append_u16(*attr_id)?;
        }

        if !ctx.confirmation_required {
            frame.disable_default_response(true);
            self.post_frame(frame).await?;
            return Ok(None);
        }

        let mut response = self.invoke_frame(frame).await?;
        if is_default_response(&response) {
            let (echoed, status) = parse_default_response(&mut response)?;
            if echoed != command_id {
                return Err(ZclError::ProtocolMismatch(format!(
                    "default response echoes command {echoed:#04x}, sent ReadAttributes"
                )));
            }
            check_status(status)?;
            return Ok(None);
        }
        if response.frame_type() != FrameType::General
            || response.command_id() != GeneralCommand::ReadAttributesResponse as u8
        {
            return Err(ZclError::ProtocolMismatch(format!(
                "expected ReadAttributesResponse, received {:#04x}",
                response.command_id()
            )));
        }

        let mut records = Vec::with_capacity(attr_ids.len());
        for attr_id in attr_ids {
            let record = self.parse_read_record(&mut response, *attr_id)?;
            records.push(record);
        }
        Ok(Some(records))
    }

    fn parse_read_record(&self, response: &mut ZclFrame, attr_id: u16) -> Result<ReadAttributeRecord, ZclError> {
        let received = response.read_u16()?;
        if received != attr_id {
            return Err(ZclError::ProtocolMismatch(format!(
                "read response carries attribute {received:#06x}, requested {attr_id:#06x}"
            )));
        }

        let record_status = response.read_u8()?;
        if record_status != status::SUCCESS {
            return Ok(ReadAttributeRecord {
                attr_id,
                outcome: ReadOutcome::Status(record_status),
            });
        }

        let data_type = ZclDataType::from_tag(response.read_u8()?)?;
        let value = AttributeValue::new(data_type.parse(response)?);
        self.cache.insert(attr_id, value.clone());
        Ok(ReadAttributeRecord {
            attr_id,
            outcome: ReadOutcome::Value { data_type, value },
        })
    }

    /// Read a single attribute from the device
    ///
    /// Returns `None` when posted unconfirmed or acknowledged without data.
    #[allow(clippy::missing_errors_doc)]
    pub async fn read_attribute(&self, attr_id: u16, ctx: &RequestContext) -> Result<Option<AttributeValue>, ZclError> {
        let Some(records) = self.read_attributes(&[attr_id], ctx).await? else {
            return Ok(None);
        };
        match records.into_iter().next().map(|record| record.outcome) {
            Some(ReadOutcome::Value { value, .. }) => Ok(Some(value)),
            Some(ReadOutcome::Status(code)) => Err(error_for_status(code)),
            None => Err(ZclError::MalformedMessage(
                "empty read attributes response".to_string(),
            )),
        }
    }

    /// Cached value if fresh enough for `ctx`, otherwise read from the device
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_attribute(&self, attr_id: u16, ctx: &RequestContext) -> Result<Option<AttributeValue>, ZclError> {
        if let Some(value) = self.check_cache(attr_id, ctx) {
            tracing::trace!(
                "Attribute {:#06x} of cluster {:#06x} served from cache",
                attr_id,
                self.cluster_id()
            );
            return Ok(Some(value));
        }
        self.read_attribute(attr_id, ctx).await
    }

    /// Write one attribute
    #[allow(clippy::missing_errors_doc)]
    pub async fn write_attribute(
        &self,
        attr_id: u16,
        data_type: ZclDataType,
        value: &ZclValue,
        ctx: &RequestContext,
    ) -> Result<(), ZclError> {
        let mut frame = self.create_outgoing_frame(GeneralCommand::WriteAttributes as u8, WRITE_RECORD_CAPACITY);
        frame.append_u16(attr_id)?;
        frame.append_u8(data_type as u8)?;
        data_type.serialize(&mut frame, value).map_err(|e| {
            tracing::debug!("Cannot encode value for attribute {:#06x}: {}", attr_id, e);
            ZclError::InvalidAttributeValue
        })?;
        self.issue_set(frame, attr_id, ctx).await
    }

    /// Send a prepared WriteAttributes frame for `attr_id`
    #[allow(clippy::missing_errors_doc)]
    pub async fn issue_set(&self, mut frame: ZclFrame, attr_id: u16, ctx: &RequestContext) -> Result<(), ZclError> {
        let command_id = GeneralCommand::WriteAttributes as u8;
        frame.set_frame_type(FrameType::General);
        frame.set_command_id(command_id);

        if !ctx.confirmation_required {
            frame.disable_default_response(true);
            return self.post_frame(frame).await;
        }

        let mut response = self.invoke_frame(frame).await?;
        correlate(
            command_id,
            &mut response,
            GeneralCommand::WriteAttributesResponse as u8,
        )?;

        let write_status = response.read_u8()?;
        if write_status == status::SUCCESS {
            return Ok(());
        }
        let received = response.read_u16()?;
        if received != attr_id {
            return Err(ZclError::ProtocolMismatch(format!(
                "write response carries attribute {received:#06x}, written {attr_id:#06x}"
            )));
        }
        Err(error_for_status(write_status))
    }

    /// Configure reporting for the named attributes
    ///
    /// `None` parameters disable reporting for that attribute. Returns `true` once the
    /// device confirmed and `false` when the request was posted unconfirmed.
    #[allow(clippy::missing_errors_doc)]
    pub async fn configure_reporting(
        &self,
        attributes: &[(&str, Option<SubscriptionParameters>)],
        ctx: &RequestContext,
    ) -> Result<bool, ZclError> {
        let mut descriptors = Vec::with_capacity(attributes.len());
        let mut capacity = 0;
        for (name, params) in attributes {
            let descriptor = *self
                .hooks
                .attribute_descriptor(name)
                .ok_or(ZclError::UnsupportedAttribute)?;
            if !descriptor.reportable {
                return Err(ZclError::UnsupportedOperation(format!(
                    "attribute {name} is not reportable"
                )));
            }
            capacity += REPORTING_RECORD_SIZE;
            if descriptor.data_type.is_analog() {
                capacity += descriptor.data_type.fixed_size().unwrap_or(0);
            }
            descriptors.push((descriptor, *params));
        }

        let command_id = GeneralCommand::ConfigureReporting as u8;
        let mut frame = self.create_outgoing_frame(command_id, capacity);
        for (descriptor, params) in &descriptors {
            frame.append_u8(DIRECTION_REPORTED)?;
            frame.append_u16(descriptor.id)?;
            frame.append_u8(descriptor.data_type as u8)?;
            let (min, max, change) = match params {
                Some(p) => (p.min_reporting_interval, p.max_reporting_interval, p.reportable_change),
                None => (DISABLED_MIN_INTERVAL, DISABLED_MAX_INTERVAL, DISABLED_REPORTABLE_CHANGE),
            };
            frame.append_u16(min)?;
            frame.append_u16(max)?;
            if descriptor.data_type.is_analog() {
                let change = descriptor.data_type.value_from_f64(change);
                descriptor
                    .data_type
                    .serialize(&mut frame, &change)
                    .map_err(|_| ZclError::InvalidAttributeValue)?;
            }
        }
        frame.shrink();

        if !ctx.confirmation_required {
            frame.disable_default_response(true);
            self.post_frame(frame).await?;
            return Ok(false);
        }

        let mut response = self.invoke_frame(frame).await?;
        if is_default_response(&response) {
            let (echoed, status) = parse_default_response(&mut response)?;
            if echoed != command_id {
                return Err(ZclError::ProtocolMismatch(format!(
                    "default response echoes command {echoed:#04x}, sent ConfigureReporting"
                )));
            }
            check_status(status)?;
        } else if response.frame_type() == FrameType::General
            && response.command_id() == GeneralCommand::ConfigureReportingResponse as u8
        {
            check_status(response.read_u8()?)?;
        } else {
            return Err(ZclError::ProtocolMismatch(format!(
                "expected ConfigureReportingResponse, received {:#04x}",
                response.command_id()
            )));
        }
        Ok(true)
    }

    /// Subscribe to reports for one attribute
    ///
    /// A failure is logged only: sleeping end devices pick the configuration
    /// up later. The parameters are recorded either way and returned.
    pub async fn set_attribute_subscription(
        &self,
        name: &str,
        params: Option<SubscriptionParameters>,
        ctx: &RequestContext,
    ) -> Option<SubscriptionParameters> {
        if let Err(e) = self.configure_reporting(&[(name, params)], ctx).await {
            tracing::error!(
                "Error subscribing to attribute {} on cluster {:#06x}: {}. Maybe this is a sleeping end device",
                name,
                self.cluster_id(),
                e
            );
        }
        self.record_subscription(name, params);
        params
    }

    /// Send an arbitrary command and validate the reply
    ///
    /// With `expected_response_id` equal to DefaultResponse a successful
    /// acknowledgment settles the exchange. Otherwise the reply frame is
    /// returned with its payload unread.
    #[allow(clippy::missing_errors_doc)]
    pub async fn issue_exec(
        &self,
        mut frame: ZclFrame,
        expected_response_id: u8,
        ctx: &RequestContext,
    ) -> Result<Option<ZclFrame>, ZclError> {
        if !ctx.confirmation_required {
            frame.disable_default_response(true);
            self.post_frame(frame).await?;
            return Ok(None);
        }

        let sent_command_id = frame.command_id();
        let mut response = self.invoke_frame(frame).await?;
        correlate(sent_command_id, &mut response, expected_response_id)?;
        Ok(Some(response))
    }
}
