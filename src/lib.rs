//! Doorcom is the software of a two-node door lock: an HMI node with a keypad
//! and a two-line display, and a control node that owns the password store,
//! the door motor, the alarm and the doorway motion sensor. The two nodes talk
//! over a serial line with a small byte-oriented protocol.
//!
//! The HMI node drives the conversation. It asks whether a password is set,
//! guides the user through setting one, and sends every candidate to the
//! control node, which is the only one to ever compare passwords. After three
//! consecutive failures the system locks for a minute and the alarm sounds.
//!
//! Both nodes can run on a workstation against each other's real hardware
//! through the `control` and `hmi` commands, or together in one process on
//! virtual hardware with the `simulate` command (see [`sim`]).
//!
//! Both nodes are implemented as state machines. State machines are
//! implemented in terms of **states** and **transitions** between them with
//! the following characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * Data shared between **all** states lives in a context owned by the node
//!   and lent to the running state.
//! * Transitions between states are triggered via typed **events** and follow
//!   defined semantics.
//! * Transitioning from one state to another consumes the original state and
//!   renders it unusable. Any transition back to that state would create a new
//!   state.
//! * Data can be transferred from one state to the next by attaching it to the
//!   transition event, like the attempt counter of a verification session.
//!
//! The implementation of state transitions leverages `rust`'s `From` and `Into`
//! pattern: each state defines how to create itself from the event that leads
//! to it. Only transitions for which the `From` trait is implemented are
//! authorized; anything else is rejected at compile-time.

pub mod console;
pub mod control;
pub mod error;
pub mod hmi;
pub mod link;
pub mod peripherals;
pub mod policy;
pub mod protocol;
pub mod sim;
pub mod store;
pub mod timing;

mod settings;

pub use error::Error;
pub use settings::{Settings, SettingsBuilder};
