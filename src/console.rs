//! Peripherals backed by the terminal, for running a node on a workstation
//! wired to the real peer over a serial port.
//!
//! The keypad reads raw key presses with `crossterm`, the display and the
//! stand-in actuators print with `console`, and the motion sensor asks the
//! operator with a `dialoguer` prompt.

use std::{io, thread, time::Duration};

use console::{style, Term};
use crossterm::{
    event::{read, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use dialoguer::Confirm;
use log::{info, warn};

use crate::{
    error::InputError,
    peripherals::{Alarm, Direction, Display, Key, Keypad, MotionSensor, Motor, Screen},
};

/// How long the operator gets to walk through before being asked again.
const DOORWAY_POLL: Duration = Duration::from_secs(1);

// =============================================================================
// HMI node
// =============================================================================

/// A two-line display drawn on stdout.
#[derive(Debug)]
pub struct ConsoleDisplay {
    term: Term,
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        ConsoleDisplay {
            term: Term::stdout(),
        }
    }
}

impl Display for ConsoleDisplay {
    fn show(&mut self, screen: Screen) {
        let (top, bottom) = screen.lines();
        let drawn = self
            .term
            .clear_screen()
            .and_then(|_| self.term.write_line(&format!("{}", style(top).cyan().bold())))
            .and_then(|_| self.term.write_str(bottom));
        if let Err(e) = drawn {
            warn!("display: {}", e);
        }
    }

    fn echo_masked(&mut self) {
        if let Err(e) = self.term.write_str("*") {
            warn!("display: {}", e);
        }
    }
}

/// Key presses read from the terminal in raw mode.
///
/// `Enter` and `=` confirm an entry. `Esc` or `Ctrl+C` close the keypad,
/// which stops the HMI node normally.
#[derive(Debug, Default)]
pub struct TerminalKeypad {}

impl Keypad for TerminalKeypad {
    fn next_key(&mut self) -> Result<Key, InputError> {
        enable_raw_mode().map_err(terminal_error)?;
        let key = read_key();
        disable_raw_mode().map_err(terminal_error)?;
        key
    }
}

fn read_key() -> Result<Key, InputError> {
    loop {
        if let Event::Key(KeyEvent { code, modifiers }) = read().map_err(terminal_error)? {
            match code {
                // As we are in raw mode, Ctrl+C is captured here as a key event.
                KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => {
                    return Err(InputError::Closed)
                }
                KeyCode::Esc => return Err(InputError::Closed),
                KeyCode::Enter => return Ok(Key::Enter),
                KeyCode::Char(c) => return Ok(Key::from(c)),
                _ => {}
            }
        }
    }
}

fn terminal_error(e: crossterm::ErrorKind) -> InputError {
    InputError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
}

// =============================================================================
// Control node
// =============================================================================

/// Prints motor commands instead of driving an H-bridge.
#[derive(Debug, Default)]
pub struct ConsoleMotor {}

impl Motor for ConsoleMotor {
    fn drive(&mut self, direction: Direction) {
        info!("motor {:?}", direction);
        let label = match direction {
            Direction::Open => style("opening").green(),
            Direction::Close => style("closing").yellow(),
            Direction::Stop => style("stopped").dim(),
        };
        println!("[motor] {}", label);
    }
}

#[derive(Debug, Default)]
pub struct ConsoleAlarm {}

impl Alarm for ConsoleAlarm {
    fn set(&mut self, on: bool) {
        info!("alarm {}", if on { "on" } else { "off" });
        if on {
            println!("[alarm] {}", style("SOUNDING").red().bold());
        } else {
            println!("[alarm] {}", style("silent").dim());
        }
    }
}

/// Asks the operator whether someone is still in the doorway.
#[derive(Debug, Default)]
pub struct PromptMotionSensor {}

impl MotionSensor for PromptMotionSensor {
    fn wait_until_clear(&mut self) -> io::Result<()> {
        loop {
            let occupied = Confirm::new()
                .with_prompt("Is someone still in the doorway?")
                .default(false)
                .interact()?;
            if !occupied {
                return Ok(());
            }
            thread::sleep(DOORWAY_POLL);
        }
    }
}
