//! `doorcom` command protocol.
//!
//! The HMI node always starts an exchange by sending a [`Request`] opcode and
//! the control node answers with a [`Reply`]. Some exchanges carry a 5-digit
//! payload, moved one digit at a time with a `NEXT_DIGIT` acknowledgment after
//! each digit and a `#` terminator at the end:
//!
//! ```text
//!   HMI                          CONTROL
//!    |---- CHECK_PASS ------------->|
//!    |---- digit 0 ---------------->|
//!    |<--- NEXT_DIGIT --------------|
//!    |            ...               |
//!    |---- digit 4 ---------------->|
//!    |<--- NEXT_DIGIT --------------|
//!    |---- '#' -------------------->|
//!    |<--- PASS_MATCH/NO_MATCH -----|
//! ```
//!
//! The per-digit acknowledgment is the only flow control there is. If either
//! side stops playing its part, the other one blocks.
//!
//! **Example** - Sending a credential for verification:
//! ```
//! use doorcom::link::{pair, Link};
//! use doorcom::protocol::{receive_payload, send_payload, Credential, Request};
//! use std::thread;
//!
//! let (mut hmi, mut control) = pair(None);
//! let sender = thread::spawn(move || {
//!     let credential: Credential = "12345".parse().unwrap();
//!     send_payload(&mut hmi, Request::CheckPass, &credential).unwrap();
//! });
//! assert_eq!(control.recv().unwrap(), u8::from(Request::CheckPass));
//! let frame = receive_payload(&mut control).unwrap();
//! sender.join().unwrap();
//! assert_eq!(frame.credential().unwrap().to_string(), "12345");
//! ```

mod credential;
mod framing;
mod opcode;

pub use credential::{Credential, CredentialError, DIGITS};
pub use framing::{
    expect_reply, expect_request, expect_verdict, receive_payload, send_payload, Frame,
};
pub use opcode::{Reply, Request, Status, UnknownOpcode, TERMINATOR};
