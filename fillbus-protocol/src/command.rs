//! Command and status taxonomies.
//!
//! Both tables are closed enumerations with stable on-wire u16 ids; any id
//! outside a table is a decode error, never a catch-all variant.

use crate::error::ProtocolError;
use std::fmt;

/// Request-side opcodes occupying bytes 0..1 of a request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Heartbeat; carries no tag and no payload.
    NoOp,
    /// Read one numeric tag value.
    ReadSingleValue,
    /// Write one numeric tag value.
    WriteSingleValue,
    /// Reserved; never dispatched.
    ReadList,
    /// Reserved; never dispatched.
    WriteList,
    /// Read a string tag (multi-frame response).
    ReadString,
    /// Write a string tag (multi-frame request).
    WriteString,
}

impl Command {
    /// All commands, in on-wire id order.
    pub const ALL: [Command; 7] = [
        Command::NoOp,
        Command::ReadSingleValue,
        Command::WriteSingleValue,
        Command::ReadList,
        Command::WriteList,
        Command::ReadString,
        Command::WriteString,
    ];

    /// Returns the stable on-wire id.
    pub fn as_u16(self) -> u16 {
        match self {
            Command::NoOp => 1,
            Command::ReadSingleValue => 2,
            Command::WriteSingleValue => 3,
            Command::ReadList => 4,
            Command::WriteList => 5,
            Command::ReadString => 8,
            Command::WriteString => 9,
        }
    }

    /// Parses an on-wire id.
    pub fn from_u16(id: u16) -> Result<Self, ProtocolError> {
        match id {
            1 => Ok(Command::NoOp),
            2 => Ok(Command::ReadSingleValue),
            3 => Ok(Command::WriteSingleValue),
            4 => Ok(Command::ReadList),
            5 => Ok(Command::WriteList),
            8 => Ok(Command::ReadString),
            9 => Ok(Command::WriteString),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    /// Returns whether this command is reserved (present in the taxonomy but
    /// never dispatched).
    pub fn is_reserved(self) -> bool {
        matches!(self, Command::ReadList | Command::WriteList)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::NoOp => "NO_OP",
            Command::ReadSingleValue => "READ_SINGLE_VALUE",
            Command::WriteSingleValue => "WRITE_SINGLE_VALUE",
            Command::ReadList => "READ_LIST",
            Command::WriteList => "WRITE_LIST",
            Command::ReadString => "READ_STRING",
            Command::WriteString => "WRITE_STRING",
        };
        write!(f, "{}", name)
    }
}

/// Response-side codes occupying bytes 0..1 of a response frame.
///
/// These codes are part of the protocol contract and must remain stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation succeeded.
    Successful,
    /// Value could not be stored.
    WriteNotSuccessful,
    /// Out of capacity.
    MemoryOverflow,
    /// Command field not recognized.
    UnknownCommand,
    /// Tag access mode forbids the operation.
    UnauthorizedAccess,
    /// Temporary refusal.
    ServerOverload,
    /// Bad tag id, bad payload, or type mismatch.
    ImplausibleArgument,
    /// List variant misformed.
    ImplausibleList,
    /// NoOp acknowledgment.
    Alive,
}

impl Status {
    /// All statuses, in on-wire code order.
    pub const ALL: [Status; 9] = [
        Status::Successful,
        Status::WriteNotSuccessful,
        Status::MemoryOverflow,
        Status::UnknownCommand,
        Status::UnauthorizedAccess,
        Status::ServerOverload,
        Status::ImplausibleArgument,
        Status::ImplausibleList,
        Status::Alive,
    ];

    /// Returns the stable on-wire code.
    pub fn as_u16(self) -> u16 {
        match self {
            Status::Successful => 0x0000,
            Status::WriteNotSuccessful => 0x8888,
            Status::MemoryOverflow => 0x9999,
            Status::UnknownCommand => 0xAAAA,
            Status::UnauthorizedAccess => 0xBBBB,
            Status::ServerOverload => 0xCCCC,
            Status::ImplausibleArgument => 0xDDDD,
            Status::ImplausibleList => 0xEEEE,
            Status::Alive => 0xFFFF,
        }
    }

    /// Parses an on-wire code.
    pub fn from_u16(code: u16) -> Result<Self, ProtocolError> {
        match code {
            0x0000 => Ok(Status::Successful),
            0x8888 => Ok(Status::WriteNotSuccessful),
            0x9999 => Ok(Status::MemoryOverflow),
            0xAAAA => Ok(Status::UnknownCommand),
            0xBBBB => Ok(Status::UnauthorizedAccess),
            0xCCCC => Ok(Status::ServerOverload),
            0xDDDD => Ok(Status::ImplausibleArgument),
            0xEEEE => Ok(Status::ImplausibleList),
            0xFFFF => Ok(Status::Alive),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Successful => "SUCCESSFUL",
            Status::WriteNotSuccessful => "WRITE_NOT_SUCCESSFUL",
            Status::MemoryOverflow => "MEMORY_OVERFLOW",
            Status::UnknownCommand => "UNKNOWN_COMMAND",
            Status::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            Status::ServerOverload => "SERVER_OVERLOAD",
            Status::ImplausibleArgument => "IMPLAUSIBLE_ARGUMENT",
            Status::ImplausibleList => "IMPLAUSIBLE_LIST",
            Status::Alive => "ALIVE",
        };
        write!(f, "{} ({:#06x})", name, self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_roundtrip() {
        for cmd in Command::ALL {
            assert_eq!(Command::from_u16(cmd.as_u16()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_command_wire_ids() {
        assert_eq!(Command::NoOp.as_u16(), 1);
        assert_eq!(Command::ReadSingleValue.as_u16(), 2);
        assert_eq!(Command::WriteSingleValue.as_u16(), 3);
        assert_eq!(Command::ReadList.as_u16(), 4);
        assert_eq!(Command::WriteList.as_u16(), 5);
        assert_eq!(Command::ReadString.as_u16(), 8);
        assert_eq!(Command::WriteString.as_u16(), 9);
    }

    #[test]
    fn test_unknown_command_rejected() {
        for id in [0u16, 6, 7, 10, 0xFFFF] {
            assert!(matches!(
                Command::from_u16(id),
                Err(ProtocolError::UnknownCommand(got)) if got == id
            ));
        }
    }

    #[test]
    fn test_reserved_commands() {
        assert!(Command::ReadList.is_reserved());
        assert!(Command::WriteList.is_reserved());
        assert!(!Command::NoOp.is_reserved());
        assert!(!Command::ReadString.is_reserved());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in Status::ALL {
            assert_eq!(Status::from_u16(status.as_u16()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_wire_codes() {
        assert_eq!(Status::Successful.as_u16(), 0x0000);
        assert_eq!(Status::WriteNotSuccessful.as_u16(), 0x8888);
        assert_eq!(Status::MemoryOverflow.as_u16(), 0x9999);
        assert_eq!(Status::UnknownCommand.as_u16(), 0xAAAA);
        assert_eq!(Status::UnauthorizedAccess.as_u16(), 0xBBBB);
        assert_eq!(Status::ServerOverload.as_u16(), 0xCCCC);
        assert_eq!(Status::ImplausibleArgument.as_u16(), 0xDDDD);
        assert_eq!(Status::ImplausibleList.as_u16(), 0xEEEE);
        assert_eq!(Status::Alive.as_u16(), 0xFFFF);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(matches!(
            Status::from_u16(0x1234),
            Err(ProtocolError::UnknownStatus(0x1234))
        ));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Alive.to_string(), "ALIVE (0xffff)");
        assert_eq!(
            Status::UnauthorizedAccess.to_string(),
            "UNAUTHORIZED_ACCESS (0xbbbb)"
        );
    }
}
