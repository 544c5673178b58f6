//! ZCL general command definitions

use serde::{Deserialize, Serialize};

/// General (profile-wide) command IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GeneralCommand {
    /// Read one or more attributes
    ReadAttributes = 0x00,
    /// Answer to `ReadAttributes`
    ReadAttributesResponse = 0x01,
    /// Write one or more attributes
    WriteAttributes = 0x02,
    /// Write attributes, all or nothing
    WriteAttributesUndivided = 0x03,
    /// Answer to `WriteAttributes`
    WriteAttributesResponse = 0x04,
    /// Write attributes, no answer expected
    WriteAttributesNoResponse = 0x05,
    /// Configure attribute reporting
    ConfigureReporting = 0x06,
    /// Answer to `ConfigureReporting`
    ConfigureReportingResponse = 0x07,
    /// Read the reporting configuration
    ReadReportingConfiguration = 0x08,
    /// Answer to `ReadReportingConfiguration`
    ReadReportingConfigurationResponse = 0x09,
    /// Unsolicited or scheduled attribute report
    ReportAttributes = 0x0A,
    /// Generic acknowledgment / error
    DefaultResponse = 0x0B,
    /// Discover supported attributes
    DiscoverAttributes = 0x0C,
    /// Answer to `DiscoverAttributes`
    DiscoverAttributesResponse = 0x0D,
    /// Read structured attribute elements
    ReadAttributesStructured = 0x0E,
    /// Write structured attribute elements
    WriteAttributesStructured = 0x0F,
    /// Answer to `WriteAttributesStructured`
    WriteAttributesStructuredResponse = 0x10,
}

impl GeneralCommand {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(GeneralCommand::ReadAttributes),
            0x01 => Some(GeneralCommand::ReadAttributesResponse),
            0x02 => Some(GeneralCommand::WriteAttributes),
            0x03 => Some(GeneralCommand::WriteAttributesUndivided),
            0x04 => Some(GeneralCommand::WriteAttributesResponse),
            0x05 => Some(GeneralCommand::WriteAttributesNoResponse),
            0x06 => Some(GeneralCommand::ConfigureReporting),
            0x07 => Some(GeneralCommand::ConfigureReportingResponse),
            0x08 => Some(GeneralCommand::ReadReportingConfiguration),
            0x09 => Some(GeneralCommand::ReadReportingConfigurationResponse),
            0x0A => Some(GeneralCommand::ReportAttributes),
            0x0B => Some(GeneralCommand::DefaultResponse),
            0x0C => Some(GeneralCommand::DiscoverAttributes),
            0x0D => Some(GeneralCommand::DiscoverAttributesResponse),
            0x0E => Some(GeneralCommand::ReadAttributesStructured),
            0x0F => Some(GeneralCommand::WriteAttributesStructured),
            0x10 => Some(GeneralCommand::WriteAttributesStructuredResponse),
            _ => None,
        }
    }

    /// Check if this command only ever travels as an answer to a request
    #[must_use]
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            GeneralCommand::ReadAttributesResponse
                | GeneralCommand::WriteAttributesResponse
                | GeneralCommand::WriteAttributesNoResponse
                | GeneralCommand::ConfigureReportingResponse
                | GeneralCommand::ReadReportingConfigurationResponse
                | GeneralCommand::DiscoverAttributesResponse
                | GeneralCommand::WriteAttributesStructuredResponse
        )
    }
}

/// ZCL frame types (frame control bits 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    General = 0x00,
    ClusterSpecific = 0x01,
}

/// ZCL direction (frame control bit 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    ClientToServer = 0x00,
    ServerToClient = 0x01,
}

impl Direction {
    /// The direction a reply to this direction travels in
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Direction::ClientToServer => Direction::ServerToClient,
            Direction::ServerToClient => Direction::ClientToServer,
        }
    }
}

/// Role a service cluster plays for its cluster id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Client,
    Server,
}

impl Side {
    /// Direction of frames this side originates
    #[must_use]
    pub fn outgoing_direction(self) -> Direction {
        match self {
            Side::Client => Direction::ClientToServer,
            Side::Server => Direction::ServerToClient,
        }
    }

    /// Direction of frames this side is expected to receive
    #[must_use]
    pub fn incoming_direction(self) -> Direction {
        self.outgoing_direction().reversed()
    }

    /// The side that receives frames travelling in `direction`
    #[must_use]
    pub fn receiving(direction: Direction) -> Self {
        match direction {
            Direction::ClientToServer => Side::Server,
            Direction::ServerToClient => Side::Client,
        }
    }
}
