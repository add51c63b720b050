//! The HMI node: guides the user through setting, checking and changing the
//! password, and asks the control node to open the door.
//!
//! **Example** - Running the HMI node on a serial port with the terminal as
//! display and keypad:
//! ```no_run
//! use doorcom::{console, hmi, link::PortLink, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
//! let link = PortLink::open(&settings).expect("port should open");
//! let peripherals = hmi::Peripherals {
//!     link: Box::new(link),
//!     keypad: Box::new(console::TerminalKeypad::default()),
//!     display: Box::new(console::ConsoleDisplay::default()),
//! };
//! let status = hmi::factory(settings, peripherals).run();
//! std::process::exit(status.into());
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::{factory, FrontEnd, Peripherals};
