//! Payload framing: opcode, five acknowledged digits, terminator.

use std::convert::TryFrom;

use log::{debug, log_enabled, trace, warn, Level::Trace};

use super::{
    credential::{Credential, CredentialError, DIGITS},
    opcode::{Reply, Request, TERMINATOR},
};
use crate::{error::LinkError, link::Link};

/// A payload exactly as it came off the link.
///
/// The receiver always completes the handshake before looking at the bytes, so
/// a garbled payload never leaves the sender waiting for an acknowledgment.
/// Turning the frame into a [`Credential`] is a separate, fallible step.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Frame {
    pub digits: [u8; DIGITS],
    pub terminator: u8,
}

impl Frame {
    pub fn credential(&self) -> Result<Credential, CredentialError> {
        if self.terminator != TERMINATOR {
            return Err(CredentialError::Terminator(self.terminator));
        }
        Credential::new(self.digits)
    }
}

/// Send `request` followed by the digits of `credential`, waiting for
/// `NEXT_DIGIT` after each one, then the terminator.
pub fn send_payload<L: Link + ?Sized>(
    link: &mut L,
    request: Request,
    credential: &Credential,
) -> Result<(), LinkError> {
    debug!("-> {:?} with payload", request);
    link.send(request.into())?;
    for &digit in credential.digits().iter() {
        link.send(digit)?;
        expect_reply(link, Reply::NextDigit)?;
    }
    link.send(TERMINATOR)
}

/// Receive the five digits and the terminator of a payload whose opcode was
/// already consumed, acknowledging each digit with `NEXT_DIGIT`.
pub fn receive_payload<L: Link + ?Sized>(link: &mut L) -> Result<Frame, LinkError> {
    let mut digits = [0_u8; DIGITS];
    for slot in digits.iter_mut() {
        *slot = link.recv()?;
        link.send(Reply::NextDigit.into())?;
    }
    let terminator = link.recv()?;
    let frame = Frame { digits, terminator };

    if log_enabled!(Trace) {
        use hexplay::HexViewBuilder;

        let mut raw = [0_u8; DIGITS + 1];
        raw[..DIGITS].copy_from_slice(&frame.digits);
        raw[DIGITS] = frame.terminator;
        let view = HexViewBuilder::new(&raw)
            .address_offset(0)
            .row_width(16)
            .finish();
        trace!("<- payload\n{}", view);
    }
    Ok(frame)
}

/// Receive until `wanted` shows up. Anything else is logged and dropped, which
/// is how the devices resynchronize on a noisy line.
pub fn expect_reply<L: Link + ?Sized>(link: &mut L, wanted: Reply) -> Result<(), LinkError> {
    loop {
        let byte = link.recv()?;
        match Reply::try_from(byte) {
            Ok(reply) if reply == wanted => return Ok(()),
            Ok(reply) => warn!("expected {:?}, skipping {:?}", wanted, reply),
            Err(unknown) => warn!("expected {:?}, skipping {}", wanted, unknown),
        }
    }
}

/// Receive until the `wanted` request shows up, dropping anything else.
pub fn expect_request<L: Link + ?Sized>(link: &mut L, wanted: Request) -> Result<(), LinkError> {
    loop {
        let byte = link.recv()?;
        match Request::try_from(byte) {
            Ok(request) if request == wanted => return Ok(()),
            Ok(request) => warn!("expected {:?}, skipping {:?}", wanted, request),
            Err(unknown) => warn!("expected {:?}, skipping {}", wanted, unknown),
        }
    }
}

/// Receive until a comparison result shows up and tell whether it was a match.
pub fn expect_verdict<L: Link + ?Sized>(link: &mut L) -> Result<bool, LinkError> {
    loop {
        let byte = link.recv()?;
        match Reply::try_from(byte) {
            Ok(Reply::PassMatch) => return Ok(true),
            Ok(Reply::PassNoMatch) => return Ok(false),
            Ok(reply) => warn!("expected a verdict, skipping {:?}", reply),
            Err(unknown) => warn!("expected a verdict, skipping {}", unknown),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Scripted peer: `recv` pops from `incoming`, `send` appends to `sent`.
    struct Script {
        incoming: VecDeque<u8>,
        sent: Vec<u8>,
    }

    impl Script {
        fn new(incoming: &[u8]) -> Self {
            Script {
                incoming: incoming.iter().copied().collect(),
                sent: vec![],
            }
        }
    }

    impl Link for Script {
        fn send(&mut self, byte: u8) -> Result<(), LinkError> {
            self.sent.push(byte);
            Ok(())
        }

        fn recv(&mut self) -> Result<u8, LinkError> {
            self.incoming.pop_front().ok_or(LinkError::Closed)
        }
    }

    #[test]
    fn sender_waits_for_each_acknowledgment() {
        let mut link = Script::new(&[0xE3; 5]);
        let credential: Credential = "40213".parse().unwrap();
        send_payload(&mut link, Request::CheckPass, &credential).unwrap();
        assert_eq!(link.sent, vec![0xE7, 4, 0, 2, 1, 3, b'#']);
        assert!(link.incoming.is_empty());
    }

    #[test]
    fn sender_skips_noise_between_acknowledgments() {
        let mut link = Script::new(&[0xE3, 0x55, 0xE3, 0xE5, 0xE3, 0xE3, 0xE3]);
        let credential: Credential = "11111".parse().unwrap();
        send_payload(&mut link, Request::SetNewPass, &credential).unwrap();
        assert_eq!(link.sent.len(), 7);
    }

    #[test]
    fn sender_stalls_without_acknowledgment() {
        let mut link = Script::new(&[0xE3, 0xE3]);
        let credential: Credential = "11111".parse().unwrap();
        let result = send_payload(&mut link, Request::SetNewPass, &credential);
        assert!(matches!(result, Err(LinkError::Closed)));
        // opcode plus the three digits that were sent before the acks ran out
        assert_eq!(link.sent, vec![0xE2, 1, 1, 1]);
    }

    #[test]
    fn receiver_acknowledges_every_digit() {
        let mut link = Script::new(&[9, 8, 7, 6, 5, b'#']);
        let frame = receive_payload(&mut link).unwrap();
        assert_eq!(link.sent, vec![0xE3; 5]);
        assert_eq!(frame.credential().unwrap().to_string(), "98765");
    }

    #[test]
    fn malformed_frames_complete_the_handshake() {
        let mut link = Script::new(&[1, 2, 0x41, 4, 5, b'#']);
        let frame = receive_payload(&mut link).unwrap();
        assert_eq!(link.sent, vec![0xE3; 5]);
        assert!(matches!(
            frame.credential(),
            Err(CredentialError::NotADigit { position: 2, .. })
        ));

        let mut link = Script::new(&[1, 2, 3, 4, 5, b'*']);
        let frame = receive_payload(&mut link).unwrap();
        assert_eq!(frame.credential(), Err(CredentialError::Terminator(b'*')));
    }

    #[test]
    fn expect_request_drops_everything_else() {
        let mut link = Script::new(&[0xE7, 0x05, 0xE4, 1]);
        expect_request(&mut link, Request::ConfirmPass).unwrap();
        assert_eq!(link.incoming, vec![1]);
    }

    #[test]
    fn expect_verdict_reads_the_comparison_result() {
        let mut link = Script::new(&[0xE3, 0xE6, 0xE5]);
        assert!(!expect_verdict(&mut link).unwrap());
        assert!(expect_verdict(&mut link).unwrap());
    }

    #[test]
    fn expect_reply_drops_everything_else() {
        let mut link = Script::new(&[0x00, 0xE3, 0xE6, 0xF2, 0xE0]);
        expect_reply(&mut link, Reply::LockDoor).unwrap();
        assert_eq!(link.incoming.len(), 1);
    }
}
