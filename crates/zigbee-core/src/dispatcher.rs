//! Inbound frame handling: the general command set a cluster answers
//! on its own (ReadAttributes, WriteAttributes, ReportAttributes)

use crate::attribute::AttributeValue;
use crate::cluster::{ClusterEvent, ServiceCluster};
use crate::hooks::HookError;
use zcl_protocol::{status, FrameError, FrameType, GeneralCommand, ZclDataType, ZclError, ZclFrame};

/// attribute id + status byte of one ReadAttributes response record
const READ_RECORD_OVERHEAD: usize = 2 + 1;
/// Payload space for a WriteAttributesResponse
const WRITE_RESPONSE_CAPACITY: usize = 255;

/// Build a DefaultResponse answering `request` with `status`
#[allow(clippy::missing_errors_doc)]
pub fn default_response(request: &ZclFrame, status: u8) -> Result<ZclFrame, FrameError> {
    let mut response = request.create_response_frame(2);
    response.set_frame_type(FrameType::General);
    response.set_command_id(GeneralCommand::DefaultResponse as u8);
    response.append_u8(request.command_id())?;
    response.append_u8(status)?;
    Ok(response)
}

/// Skip a raw value of wire type `tag`
fn skip_value(frame: &mut ZclFrame, tag: u8) -> Result<(), FrameError> {
    ZclDataType::from_tag(tag)?.skip(frame)
}

fn unsupported(frame: &ZclFrame, status: u8) -> ZclError {
    ZclError::UnsupportedGeneralCommand {
        command_id: frame.command_id(),
        status,
    }
}

impl ServiceCluster {
    /// Handle a frame the device did not correlate to a pending request
    ///
    /// Returns `Ok(true)` if a general command was handled here and
    /// `Ok(false)` for cluster-specific frames, which belong to the concrete
    /// cluster.
    #[allow(clippy::missing_errors_doc)]
    pub async fn on_incoming_frame(&self, cluster_id: u16, mut frame: ZclFrame) -> Result<bool, ZclError> {
        if let Err(e) = self.direction_validator().check_incoming(&frame) {
            tracing::warn!(
                "Dropping frame {:#04x} for cluster {:#06x}: {}",
                frame.command_id(),
                cluster_id,
                e
            );
            return Err(e);
        }

        if frame.is_manufacturer_specific() {
            let status = match frame.frame_type() {
                FrameType::General => status::UNSUP_MANUF_GENERAL_COMMAND,
                FrameType::ClusterSpecific => status::UNSUP_MANUF_CLUSTER_COMMAND,
            };
            return Err(unsupported(&frame, status));
        }

        if frame.frame_type() != FrameType::General {
            if !self.is_endpoint_available() {
                tracing::info!(
                    "Cluster-specific frame on unavailable endpoint, cluster {:#06x}",
                    cluster_id
                );
                self.emit(ClusterEvent::Announcement { cluster_id });
            }
            return Ok(false);
        }

        let command = GeneralCommand::from_u8(frame.command_id());
        tracing::debug!(
            "Incoming {:?} for cluster {:#06x}, seq={}",
            command,
            cluster_id,
            frame.sequence()
        );
        match command {
            Some(GeneralCommand::ReadAttributes) => {
                self.handle_read_attributes(cluster_id, &mut frame).await;
                Ok(true)
            }
            Some(GeneralCommand::WriteAttributes) => {
                self.handle_write_attributes(cluster_id, &mut frame).await;
                Ok(true)
            }
            Some(GeneralCommand::ReportAttributes) => {
                self.handle_report_attributes(cluster_id, &mut frame).await;
                Ok(true)
            }
            Some(cmd) if cmd.is_response() => {
                tracing::debug!("Unsolicited {:?} on cluster {:#06x}", cmd, cluster_id);
                Err(unsupported(&frame, status::UNSUP_GENERAL_COMMAND))
            }
            _ => Err(unsupported(&frame, status::UNSUP_GENERAL_COMMAND)),
        }
    }

    async fn handle_read_attributes(&self, cluster_id: u16, frame: &mut ZclFrame) {
        let mut attr_ids = Vec::with_capacity(frame.remaining() / 2);
        let mut capacity = 0;
        while let Ok(attr_id) = frame.read_u16() {
            match self.hooks.read_attribute_response_size(attr_id) {
                Ok(size) => capacity += size,
                Err(e) => tracing::debug!("No size for attribute {:#06x}: {}", attr_id, e),
            }
            capacity += READ_RECORD_OVERHEAD;
            attr_ids.push(attr_id);
        }

        let mut response = frame.create_response_frame(capacity);
        response.set_command_id(GeneralCommand::ReadAttributesResponse as u8);
        for attr_id in attr_ids {
            if let Err(e) = self.fill_read_record(&mut response, attr_id) {
                tracing::error!(
                    "Abandoning ReadAttributes response for cluster {:#06x}: {}",
                    cluster_id,
                    e
                );
                return;
            }
        }
        response.shrink();
        self.send_response(cluster_id, response).await;
    }

    fn fill_read_record(&self, response: &mut ZclFrame, attr_id: u16) -> Result<(), FrameError> {
        response.append_u16(attr_id)?;
        let mark = response.payload_size();
        let record_status = match self.hooks.fill_attribute_record(response, attr_id) {
            Ok(true) => return Ok(()),
            Ok(false) | Err(HookError::UnsupportedOperation) => status::UNSUPPORTED_ATTRIBUTE,
            Err(HookError::Frame(e @ FrameError::Overflow { .. })) => return Err(e),
            Err(HookError::Status(code)) => code,
            Err(e) => {
                tracing::warn!("Failed to read attribute {:#06x}: {}", attr_id, e);
                status::FAILURE
            }
        };
        response.truncate(mark);
        response.append_u8(record_status)
    }

    async fn handle_write_attributes(&self, cluster_id: u16, frame: &mut ZclFrame) {
        let mut response = frame.create_response_frame(WRITE_RESPONSE_CAPACITY);
        response.set_command_id(GeneralCommand::WriteAttributesResponse as u8);

        let mut failures = 0usize;
        while let Ok(attr_id) = frame.read_u16() {
            let (record_status, aligned) = match frame.read_u8() {
                Ok(tag) => self.write_record(frame, attr_id, tag),
                Err(_) => (status::INVALID_FIELD, false),
            };
            if record_status == status::SUCCESS {
                continue;
            }

            failures += 1;
            if let Err(e) = response
                .append_u8(record_status)
                .and_then(|()| response.append_u16(attr_id))
            {
                tracing::error!(
                    "Abandoning WriteAttributes response for cluster {:#06x}: {}",
                    cluster_id,
                    e
                );
                return;
            }
            if !aligned {
                tracing::debug!("Lost record alignment after attribute {:#06x}", attr_id);
                break;
            }
        }

        if failures == 0 {
            if let Err(e) = response.append_u8(status::SUCCESS) {
                tracing::error!("Abandoning WriteAttributes response: {}", e);
                return;
            }
        }
        response.shrink();
        self.send_response(cluster_id, response).await;
    }

    /// Apply one write record; returns its status and whether the read
    /// cursor still sits on a record boundary
    fn write_record(&self, frame: &mut ZclFrame, attr_id: u16, tag: u8) -> (u8, bool) {
        let value_start = frame.position();
        match self.hooks.write_attribute(frame, attr_id, tag) {
            Ok(status::UNSUPPORTED_ATTRIBUTE) => {
                frame.rewind(value_start);
                match skip_value(frame, tag) {
                    Ok(()) => (status::UNSUPPORTED_ATTRIBUTE, true),
                    Err(_) => (status::INVALID_FIELD, false),
                }
            }
            Ok(record_status) => (record_status, true),
            Err(e) => {
                tracing::debug!("Write of attribute {:#06x} failed: {}", attr_id, e);
                frame.rewind(value_start);
                (status::INVALID_FIELD, skip_value(frame, tag).is_ok())
            }
        }
    }

    async fn handle_report_attributes(&self, cluster_id: u16, frame: &mut ZclFrame) {
        let mut report_status = status::SUCCESS;
        while let Ok(attr_id) = frame.read_u16() {
            let Ok(tag) = frame.read_u8() else {
                break;
            };

            let descriptor = match self.hooks.attribute_descriptor_by_id(attr_id) {
                Some(descriptor) if descriptor.data_type as u8 == tag => *descriptor,
                Some(_) => {
                    tracing::warn!(
                        "Reported attribute {:#06x} has unexpected type {:#04x}",
                        attr_id,
                        tag
                    );
                    report_status = status::INVALID_DATA_TYPE;
                    if skip_value(frame, tag).is_err() {
                        break;
                    }
                    continue;
                }
                None => {
                    tracing::debug!("Ignoring report of unknown attribute {:#06x}", attr_id);
                    if skip_value(frame, tag).is_err() {
                        break;
                    }
                    continue;
                }
            };

            let value = match descriptor.data_type.parse(frame) {
                Ok(value) => AttributeValue::new(value),
                Err(e) => {
                    tracing::debug!("Truncated report of attribute {:#06x}: {}", attr_id, e);
                    break;
                }
            };
            self.cache.insert(attr_id, value.clone());
            let delivered = self.emit(ClusterEvent::AttributeChanged {
                cluster_id,
                attr_id,
                name: descriptor.name,
                value,
            });
            if !delivered {
                tracing::trace!("No listener for attribute {}", descriptor.name);
            }
        }

        if frame.is_default_response_disabled() {
            return;
        }
        if report_status != status::SUCCESS {
            tracing::debug!(
                "Report on cluster {:#06x} had rejected records, status {:#04x}",
                cluster_id,
                report_status
            );
        }
        // a report is acknowledged as a whole
        match default_response(frame, status::SUCCESS) {
            Ok(response) => self.send_response(cluster_id, response).await,
            Err(e) => tracing::error!("Failed to build default response: {}", e),
        }
    }
}
