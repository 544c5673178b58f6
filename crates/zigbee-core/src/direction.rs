//! Direction field checks for incoming and response frames
//!
//! Disabled by default: some device firmware sets the direction bit wrongly.

use zcl_protocol::{Side, ZclError, ZclFrame};

const BAD_DIRECTION_MESSAGE: &str = "bad direction field";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionValidator {
    pub enabled: bool,
    pub side: Side,
}

impl DirectionValidator {
    #[must_use]
    pub fn new(enabled: bool, side: Side) -> Self {
        Self { enabled, side }
    }

    /// A fresh frame must travel towards this side
    #[allow(clippy::missing_errors_doc)]
    pub fn check_incoming(&self, frame: &ZclFrame) -> Result<(), ZclError> {
        self.check(frame, "incoming frame")
    }

    /// A reply to a frame this side sent must come from the peer side
    #[allow(clippy::missing_errors_doc)]
    pub fn check_response(&self, frame: &ZclFrame) -> Result<(), ZclError> {
        self.check(frame, "response frame")
    }

    fn check(&self, frame: &ZclFrame, what: &str) -> Result<(), ZclError> {
        if !self.enabled {
            return Ok(());
        }
        let expected = self.side.incoming_direction();
        if frame.direction() != expected {
            return Err(ZclError::MalformedMessage(format!(
                "{BAD_DIRECTION_MESSAGE} in {what}: expected {expected:?} for {:?} side",
                self.side
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_protocol::Direction;

    fn frame(direction: Direction) -> ZclFrame {
        let mut frame = ZclFrame::new(0);
        frame.set_direction(direction);
        frame
    }

    #[test]
    fn test_disabled_accepts_anything() {
        let validator = DirectionValidator::new(false, Side::Client);
        assert!(validator
            .check_incoming(&frame(Direction::ClientToServer))
            .is_ok());
        assert!(validator
            .check_response(&frame(Direction::ClientToServer))
            .is_ok());
    }

    #[test]
    fn test_enabled_client_side() {
        let validator = DirectionValidator::new(true, Side::Client);
        assert!(validator
            .check_incoming(&frame(Direction::ServerToClient))
            .is_ok());
        assert!(matches!(
            validator.check_incoming(&frame(Direction::ClientToServer)),
            Err(ZclError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_enabled_server_side_responses() {
        let validator = DirectionValidator::new(true, Side::Server);
        assert!(validator
            .check_response(&frame(Direction::ClientToServer))
            .is_ok());
        assert!(matches!(
            validator.check_response(&frame(Direction::ServerToClient)),
            Err(ZclError::MalformedMessage(_))
        ));
    }
}
