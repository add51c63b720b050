//! Opcodes of the wire protocol.
//!
//! Byte values match the ECU firmware so either node can talk to the real
//! hardware counterpart. `0xE9` (`RECEIVED`) belongs to the same range but is
//! never sent by anyone, it decodes as unknown.

use std::convert::TryFrom;

use thiserror::Error;

/// Marks the end of a 5-digit payload, in both directions.
pub const TERMINATOR: u8 = b'#';

/// Status byte value meaning "a credential is configured". Shares its value
/// with [`TERMINATOR`] because the stored record ends with it.
const PASSWORD_SAVED: u8 = 0x23;

/// What an erased EEPROM cell reads as.
const ERASED: u8 = 0xFF;

/// A byte that is not a valid opcode in the position it was received.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
#[error("unknown opcode {0:#04x}")]
pub struct UnknownOpcode(pub u8);

/// Opcodes sent by the HMI node to the control node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Request {
    /// Is a credential configured?
    GetStatus,
    /// First payload of a provisioning exchange.
    SetNewPass,
    /// Second (confirmation) payload of a provisioning exchange.
    ConfirmPass,
    /// Verify a payload against the stored credential.
    CheckPass,
    /// The user ran out of attempts, sound the alarm.
    AttemptsEnded,
    /// Run the door actuation sequence.
    UnlockDoor,
}

impl From<Request> for u8 {
    fn from(request: Request) -> u8 {
        match request {
            Request::GetStatus => 0xE1,
            Request::SetNewPass => 0xE2,
            Request::ConfirmPass => 0xE4,
            Request::CheckPass => 0xE7,
            Request::AttemptsEnded => 0xF0,
            Request::UnlockDoor => 0xF1,
        }
    }
}

impl TryFrom<u8> for Request {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0xE1 => Ok(Request::GetStatus),
            0xE2 => Ok(Request::SetNewPass),
            0xE4 => Ok(Request::ConfirmPass),
            0xE7 => Ok(Request::CheckPass),
            0xF0 => Ok(Request::AttemptsEnded),
            0xF1 => Ok(Request::UnlockDoor),
            other => Err(UnknownOpcode(other)),
        }
    }
}

/// Opcodes sent by the control node to the HMI node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Reply {
    /// The control node finished booting.
    Ready,
    /// Send the next payload digit.
    NextDigit,
    PassMatch,
    PassNoMatch,
    /// The room is clear and the door started closing.
    LockDoor,
}

impl From<Reply> for u8 {
    fn from(reply: Reply) -> u8 {
        match reply {
            Reply::Ready => 0xE0,
            Reply::NextDigit => 0xE3,
            Reply::PassMatch => 0xE5,
            Reply::PassNoMatch => 0xE6,
            Reply::LockDoor => 0xF2,
        }
    }
}

impl TryFrom<u8> for Reply {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0xE0 => Ok(Reply::Ready),
            0xE3 => Ok(Reply::NextDigit),
            0xE5 => Ok(Reply::PassMatch),
            0xE6 => Ok(Reply::PassNoMatch),
            0xF2 => Ok(Reply::LockDoor),
            other => Err(UnknownOpcode(other)),
        }
    }
}

impl Reply {
    /// The comparison result for `matched`.
    pub fn verdict(matched: bool) -> Self {
        if matched {
            Reply::PassMatch
        } else {
            Reply::PassNoMatch
        }
    }
}

/// Answer to [`Request::GetStatus`], also the last byte of the stored record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    Configured,
    Unconfigured,
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Configured => PASSWORD_SAVED,
            Status::Unconfigured => ERASED,
        }
    }
}

/// Total: only `PASSWORD_SAVED` means configured, whatever else was in the
/// cell (erased or garbage) means there is no usable credential.
impl From<u8> for Status {
    fn from(byte: u8) -> Self {
        if byte == PASSWORD_SAVED {
            Status::Configured
        } else {
            Status::Unconfigured
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REQUESTS: [Request; 6] = [
        Request::GetStatus,
        Request::SetNewPass,
        Request::ConfirmPass,
        Request::CheckPass,
        Request::AttemptsEnded,
        Request::UnlockDoor,
    ];

    const ALL_REPLIES: [Reply; 5] = [
        Reply::Ready,
        Reply::NextDigit,
        Reply::PassMatch,
        Reply::PassNoMatch,
        Reply::LockDoor,
    ];

    #[test]
    fn wire_values_match_the_devices() {
        assert_eq!(u8::from(Reply::Ready), 0xE0);
        assert_eq!(u8::from(Request::GetStatus), 0xE1);
        assert_eq!(u8::from(Request::SetNewPass), 0xE2);
        assert_eq!(u8::from(Reply::NextDigit), 0xE3);
        assert_eq!(u8::from(Request::ConfirmPass), 0xE4);
        assert_eq!(u8::from(Reply::PassMatch), 0xE5);
        assert_eq!(u8::from(Reply::PassNoMatch), 0xE6);
        assert_eq!(u8::from(Request::CheckPass), 0xE7);
        assert_eq!(u8::from(Request::AttemptsEnded), 0xF0);
        assert_eq!(u8::from(Request::UnlockDoor), 0xF1);
        assert_eq!(u8::from(Reply::LockDoor), 0xF2);
        assert_eq!(u8::from(Status::Configured), 0x23);
        assert_eq!(TERMINATOR, 0x23);
    }

    #[test]
    fn requests_and_replies_never_share_a_byte() {
        for request in ALL_REQUESTS.iter() {
            assert!(Reply::try_from(u8::from(*request)).is_err());
        }
        for reply in ALL_REPLIES.iter() {
            assert!(Request::try_from(u8::from(*reply)).is_err());
        }
    }

    #[test]
    fn received_and_digits_are_not_opcodes() {
        assert_eq!(Request::try_from(0xE9), Err(UnknownOpcode(0xE9)));
        assert_eq!(Reply::try_from(0xE9), Err(UnknownOpcode(0xE9)));
        for digit in 0..=9 {
            assert!(Request::try_from(digit).is_err());
        }
    }

    #[test]
    fn status_only_trusts_the_saved_marker() {
        assert_eq!(Status::from(0x23), Status::Configured);
        assert_eq!(Status::from(0xFF), Status::Unconfigured);
        assert_eq!(Status::from(0x00), Status::Unconfigured);
        assert_eq!(Status::from(u8::from(Status::Unconfigured)), Status::Unconfigured);
    }

    #[test]
    fn verdict() {
        assert_eq!(Reply::verdict(true), Reply::PassMatch);
        assert_eq!(Reply::verdict(false), Reply::PassNoMatch);
    }
}
