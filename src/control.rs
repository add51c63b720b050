//! The control node: owns the credential, answers the HMI node and drives the
//! door.
//!
//! **Example** - Running the control node with in-memory peripherals:
//! ```no_run
//! use doorcom::{control, link, sim::Journal, store::MemoryStore, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().finalize();
//! let (_hmi_end, control_end) = link::pair(None);
//! let journal = Journal::default();
//! let peripherals = control::Peripherals {
//!     link: Box::new(control_end),
//!     store: Box::new(MemoryStore::new()),
//!     motor: Box::new(journal.motor()),
//!     alarm: Box::new(journal.alarm()),
//!     motion: Box::new(journal.motion(&[])),
//! };
//! let mut node = control::factory(settings, peripherals);
//! let status = node.run(); // returns once the link is closed
//! println!("status: {}", status);
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::{factory, BackEnd, Peripherals};
