//! Matching a synchronous reply against the command that was sent

use crate::status::check_status;
use zcl_protocol::{FrameType, GeneralCommand, ZclError, ZclFrame};

const DEFAULT_RESPONSE: u8 = GeneralCommand::DefaultResponse as u8;

/// Check if `frame` is a general DefaultResponse
#[must_use]
pub fn is_default_response(frame: &ZclFrame) -> bool {
    frame.frame_type() == FrameType::General && frame.command_id() == DEFAULT_RESPONSE
}

/// Read the (echoed command id, status) pair of a DefaultResponse
#[allow(clippy::missing_errors_doc)]
pub fn parse_default_response(frame: &mut ZclFrame) -> Result<(u8, u8), ZclError> {
    let command_id = frame.read_u8()?;
    let status = frame.read_u8()?;
    Ok((command_id, status))
}

/// Validate `response` as the answer to `sent_command_id`
///
/// A DefaultResponse must echo the sent command id. With a non-success
/// status it is mapped to the corresponding error. With SUCCESS it settles
/// the exchange only if a DefaultResponse was what the caller expected.
/// Any other reply must carry `expected_response_id`; its payload is left
/// unread for the caller.
#[allow(clippy::missing_errors_doc)]
pub fn correlate(sent_command_id: u8, response: &mut ZclFrame, expected_response_id: u8) -> Result<(), ZclError> {
    if is_default_response(response) {
        let (echoed, status) = parse_default_response(response)?;
        if echoed != sent_command_id {
            return Err(ZclError::ProtocolMismatch(format!(
                "default response echoes command {echoed:#04x}, sent {sent_command_id:#04x}"
            )));
        }
        check_status(status)?;
        if expected_response_id == DEFAULT_RESPONSE {
            return Ok(());
        }
        return Err(ZclError::UnexpectedDefaultResponseSuccess {
            command_id: sent_command_id,
        });
    }

    if response.command_id() == expected_response_id {
        return Ok(());
    }

    Err(ZclError::ProtocolMismatch(format!(
        "expected response {expected_response_id:#04x}, received {:#04x}",
        response.command_id()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOGGLE: u8 = 0x02;

    fn reply(frame_control: u8, command_id: u8, payload: &[u8]) -> ZclFrame {
        let mut data = vec![frame_control, 0x1E, command_id];
        data.extend_from_slice(payload);
        ZclFrame::parse(&data).unwrap()
    }

    #[test]
    fn test_default_response_success_when_expected() {
        let mut response = reply(0x18, 0x0B, &[TOGGLE, 0x00]);
        assert!(correlate(TOGGLE, &mut response, DEFAULT_RESPONSE).is_ok());
    }

    #[test]
    fn test_default_response_success_when_data_expected() {
        let mut response = reply(0x18, 0x0B, &[0x00, 0x00]);
        assert_eq!(
            correlate(0x00, &mut response, 0x01),
            Err(ZclError::UnexpectedDefaultResponseSuccess { command_id: 0x00 })
        );
    }

    #[test]
    fn test_default_response_failure_is_mapped() {
        let mut response = reply(0x18, 0x0B, &[TOGGLE, 0x7E]);
        assert_eq!(
            correlate(TOGGLE, &mut response, DEFAULT_RESPONSE),
            Err(ZclError::NotAuthorized)
        );
    }

    #[test]
    fn test_default_response_wrong_echo() {
        let mut response = reply(0x18, 0x0B, &[0x01, 0x00]);
        assert!(matches!(
            correlate(TOGGLE, &mut response, DEFAULT_RESPONSE),
            Err(ZclError::ProtocolMismatch(_))
        ));
    }

    #[test]
    fn test_expected_response_leaves_payload() {
        let mut response = reply(0x19, 0x05, &[0xAA]);
        assert!(correlate(0x04, &mut response, 0x05).is_ok());
        assert_eq!(response.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn test_unexpected_command() {
        let mut response = reply(0x19, 0x07, &[]);
        assert!(matches!(
            correlate(0x04, &mut response, 0x05),
            Err(ZclError::ProtocolMismatch(_))
        ));
    }

    #[test]
    fn test_truncated_default_response() {
        let mut response = reply(0x18, 0x0B, &[TOGGLE]);
        assert!(matches!(
            correlate(TOGGLE, &mut response, DEFAULT_RESPONSE),
            Err(ZclError::MalformedMessage(_))
        ));
    }
}
