//! Interfaces to the hardware around the two state machines.
//!
//! Rendering on the display, scanning the keypad, driving the motor, polling
//! the motion sensor and writing the EEPROM are not this crate's business. The
//! state machines only see these traits. Every wait is a blocking call
//! ([`Keypad::next_key`], [`MotionSensor::wait_until_clear`]), so an
//! implementation is free to poll, sleep or block on an event source.

use std::io;

use crate::error::{InputError, StoreError};

// =============================================================================
// Control node
// =============================================================================

/// Byte-addressed persistent storage holding the 6-byte credential record.
/// See [`store`](crate::store) for the layout.
pub trait CredentialStore: Send {
    fn read_byte(&mut self, offset: usize) -> Result<u8, StoreError>;
    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StoreError>;
}

/// Motor drive commands. Opening turns the motor clockwise.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    Open,
    Close,
    Stop,
}

pub trait Motor: Send {
    fn drive(&mut self, direction: Direction);
}

pub trait Alarm: Send {
    fn set(&mut self, on: bool);
}

pub trait MotionSensor: Send {
    /// Block until nobody is in the doorway anymore. There is no upper bound:
    /// a sensor that keeps reporting motion keeps the door open.
    fn wait_until_clear(&mut self) -> io::Result<()>;
}

// =============================================================================
// HMI node
// =============================================================================

/// A key as seen by the state machines, after scanning and debouncing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Key {
    /// A digit key, holding its value `0..=9`.
    Digit(u8),
    Enter,
    Plus,
    Minus,
    Other(char),
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        match c {
            '0'..='9' => Key::Digit(c as u8 - b'0'),
            '+' => Key::Plus,
            '-' => Key::Minus,
            '\n' | '\r' | '=' => Key::Enter,
            other => Key::Other(other),
        }
    }
}

pub trait Keypad: Send {
    /// Block until the next key press.
    fn next_key(&mut self) -> Result<Key, InputError>;
}

/// Everything the HMI node ever shows. The wording is free, the screens carry
/// no protocol meaning.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Screen {
    EnterPassword,
    ReEnterPassword,
    PasswordsMatch,
    PasswordsDontMatch,
    MainMenu,
    DoorUnlocking,
    WaitForPeople,
    DoorLocking,
    SystemLocked,
}

impl Screen {
    /// The two lines of a 16x2 character display.
    pub fn lines(&self) -> (&'static str, &'static str) {
        match self {
            Screen::EnterPassword => ("ENTER PASS:", ""),
            Screen::ReEnterPassword => ("RE-ENTER PASS:", ""),
            Screen::PasswordsMatch => ("PASS MATCH", ""),
            Screen::PasswordsDontMatch => ("PASS DONT MATCH", ""),
            Screen::MainMenu => ("+ : Open Door", "- : Change Pass"),
            Screen::DoorUnlocking => ("   DOOR IS", "  UNLOCKING"),
            Screen::WaitForPeople => ("WAIT FOR PEOPLE", "    TO ENTER"),
            Screen::DoorLocking => ("   DOOR IS", "  LOCKING"),
            Screen::SystemLocked => ("SYSTEM LOCKED", ""),
        }
    }
}

pub trait Display: Send {
    /// Clear the display and show `screen`.
    fn show(&mut self, screen: Screen);
    /// Echo one entered digit, masked.
    fn echo_masked(&mut self);
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn keys_from_chars() {
    assert_eq!(Key::from('7'), Key::Digit(7));
    assert_eq!(Key::from('0'), Key::Digit(0));
    assert_eq!(Key::from('+'), Key::Plus);
    assert_eq!(Key::from('-'), Key::Minus);
    assert_eq!(Key::from('\n'), Key::Enter);
    assert_eq!(Key::from('x'), Key::Other('x'));
}

#[test]
fn screens_fit_a_16x2_display() {
    let all = [
        Screen::EnterPassword,
        Screen::ReEnterPassword,
        Screen::PasswordsMatch,
        Screen::PasswordsDontMatch,
        Screen::MainMenu,
        Screen::DoorUnlocking,
        Screen::WaitForPeople,
        Screen::DoorLocking,
        Screen::SystemLocked,
    ];
    for screen in all.iter() {
        let (top, bottom) = screen.lines();
        assert!(top.len() <= 16 && bottom.len() <= 16, "{:?}", screen);
    }
}
