//! The byte link between the HMI node and the control node.
//!
//! The link is the only thing the two nodes share. It moves one byte at a time,
//! in order, with no buffering guarantees beyond that, and no framing of its
//! own. Everything above single bytes lives in [`protocol`](crate::protocol).
//!
//! Two transports are provided:
//!
//! * [`PortLink`] over a real serial port (`serialport`),
//! * [`ChannelLink`] over a pair of in-memory channels, used to run both nodes
//!   in one process.

#[macro_use]
mod macros;

mod channel;
mod port;

pub use channel::{pair, ChannelLink};
pub use port::{open_and_setup_port, select_port, PortLink};

use crate::error::LinkError;

/// A blocking, byte-atomic, in-order link to the peer node.
///
/// `recv` blocks until a byte arrives. Whether it ever gives up depends on the
/// transport's receive timeout; with no timeout configured a silent peer stalls
/// the caller forever, which is the contract of the ECU firmware.
pub trait Link: Send {
    fn send(&mut self, byte: u8) -> Result<(), LinkError>;
    fn recv(&mut self) -> Result<u8, LinkError>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        (**self).send(byte)
    }

    fn recv(&mut self) -> Result<u8, LinkError> {
        (**self).recv()
    }
}
