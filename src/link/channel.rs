//! In-memory link made of two `mpsc` channels, one per direction.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::Duration,
};

use log::trace;

use super::Link;
use crate::error::LinkError;

/// One end of an in-memory link. Create both ends with [`pair`].
#[derive(Debug)]
pub struct ChannelLink {
    name: &'static str,
    tx: Sender<u8>,
    rx: Receiver<u8>,
    timeout: Option<Duration>,
}

/// Build two connected link ends. Bytes sent on one end are received, in
/// order, on the other.
///
/// With `timeout` set to `None`, `recv` blocks until a byte arrives or the
/// other end is dropped.
pub fn pair(timeout: Option<Duration>) -> (ChannelLink, ChannelLink) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (
        ChannelLink {
            name: "a",
            tx: a_tx,
            rx: a_rx,
            timeout,
        },
        ChannelLink {
            name: "b",
            tx: b_tx,
            rx: b_rx,
            timeout,
        },
    )
}

impl Link for ChannelLink {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        trace!("[{}] tx {:#04x}", self.name, byte);
        self.tx.send(byte).map_err(|_| LinkError::Closed)
    }

    fn recv(&mut self) -> Result<u8, LinkError> {
        let byte = match self.timeout {
            None => self.rx.recv().map_err(|_| LinkError::Closed)?,
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => LinkError::TimedOut,
                RecvTimeoutError::Disconnected => LinkError::Closed,
            })?,
        };
        trace!("[{}] rx {:#04x}", self.name, byte);
        Ok(byte)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_cross_in_order() {
        let (mut a, mut b) = pair(None);
        a.send(1).unwrap();
        a.send(2).unwrap();
        b.send(9).unwrap();
        assert_eq!(b.recv().unwrap(), 1);
        assert_eq!(b.recv().unwrap(), 2);
        assert_eq!(a.recv().unwrap(), 9);
    }

    #[test]
    fn dropped_peer_closes_the_link() {
        let (mut a, b) = pair(None);
        drop(b);
        assert!(matches!(a.recv(), Err(LinkError::Closed)));
        assert!(matches!(a.send(0), Err(LinkError::Closed)));
    }

    #[test]
    fn silent_peer_times_out_when_a_timeout_is_set() {
        let (mut a, _b) = pair(Some(Duration::from_millis(10)));
        assert!(matches!(a.recv(), Err(LinkError::TimedOut)));
    }
}
