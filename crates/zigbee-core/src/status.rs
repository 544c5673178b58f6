//! ZCL status code to error mapping

use zcl_protocol::{status, ZclError};

/// Error kind a device-reported status stands for
///
/// Total over all codes. `SUCCESS` is not an error and maps to the generic
/// `ProtocolStatus(0x00)`; callers check for it first, see `check_status`.
#[must_use]
pub fn error_for_status(code: u8) -> ZclError {
    match code {
        status::UNSUPPORTED_ATTRIBUTE => ZclError::UnsupportedAttribute,
        status::UNREPORTABLE_ATTRIBUTE => {
            ZclError::UnsupportedOperation("unreportable attribute".to_string())
        }
        status::INVALID_VALUE => ZclError::InvalidAttributeValue,
        status::READ_ONLY => ZclError::ReadOnlyAttribute,
        status::NOT_AUTHORIZED => ZclError::NotAuthorized,
        status::MALFORMED_COMMAND => {
            ZclError::MalformedMessage("device reported malformed command".to_string())
        }
        other => ZclError::ProtocolStatus(other),
    }
}

/// `Ok` for `SUCCESS`, the mapped error otherwise
#[allow(clippy::missing_errors_doc)]
pub fn check_status(code: u8) -> Result<(), ZclError> {
    if code == status::SUCCESS {
        Ok(())
    } else {
        Err(error_for_status(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(error_for_status(0x86), ZclError::UnsupportedAttribute);
        assert!(matches!(
            error_for_status(0x8C),
            ZclError::UnsupportedOperation(_)
        ));
        assert_eq!(error_for_status(0x87), ZclError::InvalidAttributeValue);
        assert_eq!(error_for_status(0x88), ZclError::ReadOnlyAttribute);
        assert_eq!(error_for_status(0x7E), ZclError::NotAuthorized);
        assert!(matches!(
            error_for_status(0x80),
            ZclError::MalformedMessage(_)
        ));
        assert_eq!(error_for_status(0x01), ZclError::ProtocolStatus(0x01));
        assert_eq!(error_for_status(0xC2), ZclError::ProtocolStatus(0xC2));
    }

    #[test]
    fn test_mapping_is_pure() {
        for code in 0..=u8::MAX {
            assert_eq!(error_for_status(code), error_for_status(code));
        }
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(status::SUCCESS).is_ok());
        assert_eq!(
            check_status(status::READ_ONLY),
            Err(ZclError::ReadOnlyAttribute)
        );
    }
}
