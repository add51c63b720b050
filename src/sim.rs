//! Virtual hardware for running both nodes in one process.
//!
//! Every simulated peripheral writes what happens to it into a shared
//! [`Journal`], in the order it happens across both nodes. Tests read the
//! journal to check ordering properties; the `simulate` command prints it.
//!
//! **Example** - A first boot where the user sets `11111`:
//! ```
//! use doorcom::{sim::Simulation, SettingsBuilder};
//! use std::time::Duration;
//!
//! let settings = SettingsBuilder::new()
//!     .tick_period(Duration::from_millis(1))
//!     .finalize();
//! let outcome = Simulation::new(settings).keys("11111e 11111e").run();
//! assert_eq!(outcome.hmi_status, 0);
//! assert_eq!(outcome.store.snapshot(), [1, 1, 1, 1, 1, 0x23]);
//! ```

use std::{
    collections::VecDeque,
    fmt, io,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use log::{debug, error};

use crate::{
    control,
    error::{InputError, LinkError},
    hmi,
    link::{self, Link},
    peripherals::{Alarm, Direction, Display, Key, Keypad, MotionSensor, Motor, Screen},
    protocol::Credential,
    settings::Settings,
    store::MemoryStore,
};

/// Pause between two readings of the simulated motion sensor.
const MOTION_POLL: Duration = Duration::from_millis(1);

/// Which node did something.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Node {
    Hmi,
    Control,
}

/// One thing that happened to the virtual hardware.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Record {
    /// A byte put on the link.
    Sent(Node, u8),
    Motor(Direction),
    Alarm(bool),
    /// One reading of the motion sensor, `true` meaning motion.
    Motion(bool),
    Screen(Screen),
    /// A masked digit echoed on the display.
    Echo,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Sent(node, byte) => write!(f, "{:?} sent {:#04x}", node, byte),
            Record::Motor(direction) => write!(f, "motor {:?}", direction),
            Record::Alarm(on) => write!(f, "alarm {}", if *on { "on" } else { "off" }),
            Record::Motion(motion) => {
                write!(f, "motion {}", if *motion { "detected" } else { "clear" })
            }
            Record::Screen(screen) => {
                let (top, bottom) = screen.lines();
                write!(f, "display [{}] [{}]", top, bottom)
            }
            Record::Echo => write!(f, "display *"),
        }
    }
}

/// The shared, ordered log of everything the virtual hardware saw.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Journal {
    pub fn push(&self, record: Record) {
        debug!("{}", record);
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Bytes sent by `node`, in order.
    pub fn sent_by(&self, node: Node) -> Vec<u8> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Sent(n, byte) if n == node => Some(byte),
                _ => None,
            })
            .collect()
    }

    /// Screens shown by the HMI node, in order.
    pub fn screens(&self) -> Vec<Screen> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Screen(screen) => Some(screen),
                _ => None,
            })
            .collect()
    }

    pub fn motor(&self) -> SimMotor {
        SimMotor(self.clone())
    }

    pub fn alarm(&self) -> SimAlarm {
        SimAlarm(self.clone())
    }

    /// A motion sensor returning `readings` one by one, then reporting clear
    /// forever.
    pub fn motion(&self, readings: &[bool]) -> SimMotion {
        SimMotion {
            journal: self.clone(),
            readings: readings.iter().copied().collect(),
        }
    }

    pub fn display(&self) -> SimDisplay {
        SimDisplay(self.clone())
    }

    /// Record every byte `link` sends on behalf of `node`.
    pub fn tap<L: Link>(&self, link: L, node: Node) -> Tap<L> {
        Tap {
            inner: link,
            node,
            journal: self.clone(),
        }
    }
}

#[derive(Debug)]
pub struct SimMotor(Journal);
impl Motor for SimMotor {
    fn drive(&mut self, direction: Direction) {
        self.0.push(Record::Motor(direction));
    }
}

#[derive(Debug)]
pub struct SimAlarm(Journal);
impl Alarm for SimAlarm {
    fn set(&mut self, on: bool) {
        self.0.push(Record::Alarm(on));
    }
}

#[derive(Debug)]
pub struct SimMotion {
    journal: Journal,
    readings: VecDeque<bool>,
}
impl MotionSensor for SimMotion {
    fn wait_until_clear(&mut self) -> io::Result<()> {
        loop {
            let motion = self.readings.pop_front().unwrap_or(false);
            self.journal.push(Record::Motion(motion));
            if !motion {
                return Ok(());
            }
            thread::sleep(MOTION_POLL);
        }
    }
}

#[derive(Debug)]
pub struct SimDisplay(Journal);
impl Display for SimDisplay {
    fn show(&mut self, screen: Screen) {
        self.0.push(Record::Screen(screen));
    }

    fn echo_masked(&mut self) {
        self.0.push(Record::Echo);
    }
}

/// A keypad replaying a script of key presses.
///
/// Digits, `+` and `-` are their own keys, `e` (or a newline) is `Enter`,
/// whitespace is skipped so scripts can be grouped for readability. When the
/// script runs out, the keypad reports itself closed.
#[derive(Debug)]
pub struct ScriptedKeypad {
    keys: VecDeque<Key>,
}

impl ScriptedKeypad {
    pub fn new(script: &str) -> Self {
        let keys = script
            .chars()
            .filter(|c| *c == '\n' || !c.is_whitespace())
            .map(|c| if c == 'e' { Key::Enter } else { Key::from(c) })
            .collect();
        ScriptedKeypad { keys }
    }
}

impl Keypad for ScriptedKeypad {
    fn next_key(&mut self) -> Result<Key, InputError> {
        self.keys.pop_front().ok_or(InputError::Closed)
    }
}

/// A link that records what it sends. See [`Journal::tap`].
#[derive(Debug)]
pub struct Tap<L> {
    inner: L,
    node: Node,
    journal: Journal,
}

impl<L: Link> Link for Tap<L> {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        // Journal first, so the peer's reaction is always recorded after it.
        self.journal.push(Record::Sent(self.node, byte));
        self.inner.send(byte)
    }

    fn recv(&mut self) -> Result<u8, LinkError> {
        self.inner.recv()
    }
}

// =============================================================================
// Simulation
// =============================================================================

/// Both nodes wired together over an in-memory link, the control node on its
/// own thread, the HMI node on the caller's.
pub struct Simulation {
    settings: Settings,
    store: MemoryStore,
    keys: String,
    motion: Vec<bool>,
}

/// What a finished simulation leaves behind.
#[derive(Debug)]
pub struct Outcome {
    pub hmi_status: i8,
    pub control_status: i8,
    pub journal: Journal,
    /// Shares its record with the store the control node used.
    pub store: MemoryStore,
}

impl Simulation {
    pub fn new(settings: Settings) -> Self {
        Simulation {
            settings,
            store: MemoryStore::new(),
            keys: String::new(),
            motion: vec![],
        }
    }

    /// Start with `credential` already provisioned.
    pub fn stored(mut self, credential: &Credential) -> Self {
        self.store = MemoryStore::with_credential(credential);
        self
    }

    /// Key presses for the HMI node. See [`ScriptedKeypad`].
    pub fn keys(mut self, script: &str) -> Self {
        self.keys = script.to_owned();
        self
    }

    /// Motion sensor readings, see [`Journal::motion`].
    pub fn motion(mut self, readings: &[bool]) -> Self {
        self.motion = readings.to_vec();
        self
    }

    /// Run until the key script is exhausted. The HMI node then drops its end
    /// of the link, which stops the control node.
    pub fn run(self) -> Outcome {
        let journal = Journal::default();
        let (hmi_end, control_end) = link::pair(self.settings.receive_timeout);

        let control_peripherals = control::Peripherals {
            link: Box::new(journal.tap(control_end, Node::Control)),
            store: Box::new(self.store.clone()),
            motor: Box::new(journal.motor()),
            alarm: Box::new(journal.alarm()),
            motion: Box::new(journal.motion(&self.motion)),
        };
        let control_settings = self.settings.clone();
        let control = thread::spawn(move || {
            control::factory(control_settings, control_peripherals).run()
        });

        let hmi_peripherals = hmi::Peripherals {
            link: Box::new(journal.tap(hmi_end, Node::Hmi)),
            keypad: Box::new(ScriptedKeypad::new(&self.keys)),
            display: Box::new(journal.display()),
        };
        let mut front = hmi::factory(self.settings, hmi_peripherals);
        let hmi_status = front.run();
        drop(front);

        let control_status = control.join().unwrap_or_else(|_| {
            error!("control node panicked");
            1
        });

        Outcome {
            hmi_status,
            control_status,
            journal,
            store: self.store,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn keypad_script() {
    let mut keypad = ScriptedKeypad::new("12 e+\n-");
    let mut keys = vec![];
    while let Ok(key) = keypad.next_key() {
        keys.push(key);
    }
    assert_eq!(
        keys,
        vec![
            Key::Digit(1),
            Key::Digit(2),
            Key::Enter,
            Key::Plus,
            Key::Enter,
            Key::Minus
        ]
    );
}

#[test]
fn motion_sensor_reports_until_clear() {
    let journal = Journal::default();
    let mut sensor = journal.motion(&[true, true, false, true]);
    sensor.wait_until_clear().unwrap();
    assert_eq!(
        journal.records(),
        vec![
            Record::Motion(true),
            Record::Motion(true),
            Record::Motion(false)
        ]
    );
}

#[test]
fn tap_records_sent_bytes() {
    let journal = Journal::default();
    let (a, mut b) = link::pair(None);
    let mut a = journal.tap(a, Node::Hmi);
    a.send(0xE1).unwrap();
    assert_eq!(b.recv().unwrap(), 0xE1);
    b.send(0x23).unwrap();
    assert_eq!(a.recv().unwrap(), 0x23);
    assert_eq!(journal.sent_by(Node::Hmi), vec![0xE1]);
    assert!(journal.sent_by(Node::Control).is_empty());
}
