//! `doorcom` control node state machine.
//!
//! The control node is a stateless server as far as the user is concerned:
//! every state other than `AwaitCommand` handles exactly one request and goes
//! back to waiting. Only the cached credential survives from one request to
//! the next.
//!
//! ```text
//!                 START
//!                   |
//!                   v
//!               .-------.
//!               | Init  |-------------------------------.
//!               '-------'                               |
//!                   | READY sent                        |
//!                   v                                   |
//!          .-----------------.   unknown byte           |
//!     .--->|  AwaitCommand   |----------.               |
//!     |    '-----------------'<---------'               |
//!     |      |   |   |   |   |                          |
//!     |  GET_STATUS  |   |  UNLOCK_DOOR                 |
//!     |      |  SET_NEW_PASS |   |                      |
//!     |      |   |  CHECK_PASS   |                      |
//!     |      |   |   |  ATTEMPTS_ENDED                  |
//!     |      v   v   v   v   v                          |
//!     |  ReportStatus Provision Verify                  |
//!     |  Lockdown UnlockSequence                        |
//!     |      |                                          |
//!     '------'  done                    error / closed  |
//!                                             |         |
//!                                             v         v
//!                                          .-------------.
//!                                          |    Done     |
//!                                          '-------------'
//!                                                 |
//!                                                END
//! ```

use log::debug;

use super::events::*;
use super::states::*;
use crate::{
    link::Link,
    peripherals::{Alarm, CredentialStore, MotionSensor, Motor},
    protocol::Credential,
    settings::Settings,
    timing::Ticker,
};

// =============================================================================
// Public Interface
// =============================================================================

/// The hardware the control node is wired to.
pub struct Peripherals {
    pub link: Box<dyn Link>,
    pub store: Box<dyn CredentialStore>,
    pub motor: Box<dyn Motor>,
    pub alarm: Box<dyn Alarm>,
    pub motion: Box<dyn MotionSensor>,
}

/// Represents the control node state machine. Use the `factory()` function to
/// get an instance then run it by calling its `run()` method.
pub struct BackEnd {
    ctx: Context,
    sm: ControlStates,
}
impl BackEnd {
    /// The event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set. At such point, the event loop terminates and
    /// returns an exit code indicating no errors when equal to **`0`**;
    /// otherwise a termination with error.
    pub fn run(&mut self) -> i8 {
        loop {
            self.sm = self.sm.step(&mut self.ctx);
            if let ControlStates::Done(state) = &self.sm {
                if state.should_exit {
                    return if state.with_error { 1 } else { 0 };
                }
            }
        }
    }
}

/// Factory function for the control node state machine. The tick source is
/// started here, with the period from `settings`.
pub fn factory(settings: Settings, peripherals: Peripherals) -> BackEnd {
    let ticker = Ticker::start(settings.tick_period);
    BackEnd {
        ctx: Context {
            settings,
            io: peripherals,
            ticker,
            cached: None,
        },
        // The machine naturally starts in the `Init` state.
        sm: ControlStates::Init(InitState {}),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Data shared by all states, owned by the node and lent to the running
/// state.
pub(crate) struct Context {
    pub settings: Settings,
    pub io: Peripherals,
    pub ticker: Ticker,
    /// The credential as last read from the store. Verification compares
    /// against this copy only.
    pub cached: Option<Credential>,
}

/// An enum wrapper around the states of the control node state machine.
enum ControlStates {
    Init(InitState),
    AwaitCommand(AwaitCommandState),
    ReportStatus(ReportStatusState),
    Provision(ProvisionState),
    Verify(VerifyState),
    Lockdown(LockdownState),
    UnlockSequence(UnlockSequenceState),
    Done(DoneState),
}
impl ControlStates {
    /// The unit of work in the state machine event loop. It runs the current
    /// state and decides the next transition from the event it returns. State
    /// transitions from events are implemented using the rust `From`/`Into`
    /// pattern, so an event that is not expected in a state is caught here.
    fn step(&mut self, ctx: &mut Context) -> Self {
        match self {
            ControlStates::Init(state) => {
                let event = state.run(ctx);
                match event {
                    Event::AwaitCommand(ev) => ControlStates::AwaitCommand(ev.into()),
                    Event::Done(ev) => ControlStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ControlStates::AwaitCommand(state) => {
                let event = state.run(ctx);
                match event {
                    Event::AwaitCommand(ev) => ControlStates::AwaitCommand(ev.into()),
                    Event::ReportStatus(ev) => ControlStates::ReportStatus(ev.into()),
                    Event::Provision(ev) => ControlStates::Provision(ev.into()),
                    Event::Verify(ev) => ControlStates::Verify(ev.into()),
                    Event::Lockdown(ev) => ControlStates::Lockdown(ev.into()),
                    Event::Unlock(ev) => ControlStates::UnlockSequence(ev.into()),
                    Event::Done(ev) => ControlStates::Done(ev.into()),
                    Event::Exit(_) => {
                        unreachable!("illegal event {:#?} at current state {:#?}", event, state)
                    }
                }
            }
            ControlStates::ReportStatus(state) => {
                let event = state.run(ctx);
                Self::after_command(event, state)
            }
            ControlStates::Provision(state) => {
                let event = state.run(ctx);
                Self::after_command(event, state)
            }
            ControlStates::Verify(state) => {
                let event = state.run(ctx);
                Self::after_command(event, state)
            }
            ControlStates::Lockdown(state) => {
                let event = state.run(ctx);
                Self::after_command(event, state)
            }
            ControlStates::UnlockSequence(state) => {
                let event = state.run(ctx);
                Self::after_command(event, state)
            }
            ControlStates::Done(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Exit(ev) => ControlStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
        }
    }

    /// Command states all end the same way: back to waiting, or done.
    fn after_command<S: std::fmt::Debug>(event: Event, state: &S) -> Self {
        match event {
            Event::AwaitCommand(ev) => ControlStates::AwaitCommand(ev.into()),
            Event::Done(ev) => ControlStates::Done(ev.into()),
            _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<AwaitCommandEvent> for AwaitCommandState {
    fn from(_: AwaitCommandEvent) -> AwaitCommandState {
        AwaitCommandState {}
    }
}

impl From<ReportStatusEvent> for ReportStatusState {
    fn from(_: ReportStatusEvent) -> ReportStatusState {
        ReportStatusState {}
    }
}

impl From<ProvisionEvent> for ProvisionState {
    fn from(_: ProvisionEvent) -> ProvisionState {
        ProvisionState {}
    }
}

impl From<VerifyEvent> for VerifyState {
    fn from(_: VerifyEvent) -> VerifyState {
        VerifyState {}
    }
}

impl From<LockdownEvent> for LockdownState {
    fn from(_: LockdownEvent) -> LockdownState {
        LockdownState {}
    }
}

impl From<UnlockEvent> for UnlockSequenceState {
    fn from(_: UnlockEvent) -> UnlockSequenceState {
        UnlockSequenceState {}
    }
}

impl From<DoneEvent> for DoneState {
    fn from(event: DoneEvent) -> DoneState {
        debug!("stopping, errors: {}", event.with_errors);
        DoneState {
            with_error: event.with_errors,
            should_exit: false,
        }
    }
}
impl From<ExitEvent> for DoneState {
    fn from(event: ExitEvent) -> DoneState {
        DoneState {
            with_error: event.with_error,
            should_exit: true,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;
    use crate::{
        link::{pair, ChannelLink},
        protocol::{expect_reply, expect_verdict, send_payload, Reply, Request},
        sim::{Journal, Record},
        store::MemoryStore,
        SettingsBuilder,
    };

    fn spawn(store: MemoryStore, journal: &Journal) -> (ChannelLink, thread::JoinHandle<i8>) {
        spawn_with_timeout(store, journal, None)
    }

    fn spawn_with_timeout(
        store: MemoryStore,
        journal: &Journal,
        timeout: Option<Duration>,
    ) -> (ChannelLink, thread::JoinHandle<i8>) {
        let mut builder = SettingsBuilder::new().tick_period(Duration::from_millis(1));
        if let Some(timeout) = timeout {
            builder = builder.receive_timeout(timeout);
        }
        let settings = builder.finalize();
        let (hmi, control) = pair(timeout);
        let peripherals = Peripherals {
            link: Box::new(control),
            store: Box::new(store),
            motor: Box::new(journal.motor()),
            alarm: Box::new(journal.alarm()),
            motion: Box::new(journal.motion(&[true, true, false])),
        };
        let handle = thread::spawn(move || factory(settings, peripherals).run());
        (hmi, handle)
    }

    fn credential(s: &str) -> Credential {
        s.parse().unwrap()
    }

    #[test]
    fn announces_ready_and_stops_when_the_link_closes() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::new(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn reports_status() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::with_credential(&credential("12345")), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(Request::GetStatus.into()).unwrap();
        assert_eq!(hmi.recv().unwrap(), 0x23);
        // Idempotent without an intervening provisioning.
        hmi.send(Request::GetStatus.into()).unwrap();
        assert_eq!(hmi.recv().unwrap(), 0x23);
        // The cached credential survives the status reloads.
        send_payload(&mut hmi, Request::CheckPass, &credential("12345")).unwrap();
        assert!(expect_verdict(&mut hmi).unwrap());
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn corrupt_record_is_reported_unconfigured() {
        let journal = Journal::default();
        let store = MemoryStore::new();
        {
            let mut raw = store.clone();
            raw.write_byte(1, 0x42).unwrap();
            raw.write_byte(5, 0x23).unwrap();
        }
        let (mut hmi, handle) = spawn(store, &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(Request::GetStatus.into()).unwrap();
        assert_eq!(hmi.recv().unwrap(), 0xFF);
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn verify_without_a_credential_is_a_mismatch() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::new(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        send_payload(&mut hmi, Request::CheckPass, &credential("00000")).unwrap();
        assert!(!expect_verdict(&mut hmi).unwrap());
        send_payload(&mut hmi, Request::CheckPass, &credential("99999")).unwrap();
        assert!(!expect_verdict(&mut hmi).unwrap());
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn provisions_only_matching_entries() {
        let journal = Journal::default();
        let store = MemoryStore::new();
        let (mut hmi, handle) = spawn(store.clone(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();

        send_payload(&mut hmi, Request::SetNewPass, &credential("11111")).unwrap();
        send_payload(&mut hmi, Request::ConfirmPass, &credential("11112")).unwrap();
        assert!(!expect_verdict(&mut hmi).unwrap());
        assert_eq!(store.snapshot(), [0xFF; 6]);

        send_payload(&mut hmi, Request::SetNewPass, &credential("11111")).unwrap();
        send_payload(&mut hmi, Request::ConfirmPass, &credential("11111")).unwrap();
        assert!(expect_verdict(&mut hmi).unwrap());
        assert_eq!(store.snapshot(), [1, 1, 1, 1, 1, 0x23]);

        send_payload(&mut hmi, Request::CheckPass, &credential("11111")).unwrap();
        assert!(expect_verdict(&mut hmi).unwrap());

        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn ignores_unknown_bytes_between_requests() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::with_credential(&credential("54321")), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(0x00).unwrap();
        hmi.send(0xE9).unwrap();
        hmi.send(Request::ConfirmPass.into()).unwrap();
        send_payload(&mut hmi, Request::CheckPass, &credential("54321")).unwrap();
        assert!(expect_verdict(&mut hmi).unwrap());
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn garbled_payload_is_a_mismatch() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::with_credential(&credential("00000")), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(Request::CheckPass.into()).unwrap();
        for byte in [0, 0, 0x30, 0, 0].iter() {
            hmi.send(*byte).unwrap();
            expect_reply(&mut hmi, Reply::NextDigit).unwrap();
        }
        hmi.send(b'#').unwrap();
        assert!(!expect_verdict(&mut hmi).unwrap());
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    /// Sends a payload byte by byte, whatever its content.
    fn send_raw_payload(hmi: &mut ChannelLink, request: Request, digits: [u8; 5], terminator: u8) {
        hmi.send(request.into()).unwrap();
        for byte in digits.iter() {
            hmi.send(*byte).unwrap();
            expect_reply(hmi, Reply::NextDigit).unwrap();
        }
        hmi.send(terminator).unwrap();
    }

    #[test]
    fn garbled_provisioning_leaves_the_store_alone() {
        let journal = Journal::default();
        let store = MemoryStore::new();
        let (mut hmi, handle) = spawn(store.clone(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();

        // A digit out of range in the first entry.
        send_raw_payload(&mut hmi, Request::SetNewPass, [1, 2, 10, 4, 5], b'#');
        send_raw_payload(&mut hmi, Request::ConfirmPass, [1, 2, 10, 4, 5], b'#');
        assert!(!expect_verdict(&mut hmi).unwrap());
        assert_eq!(store.snapshot(), [0xFF; 6]);

        // A bad terminator on the confirmation.
        send_payload(&mut hmi, Request::SetNewPass, &credential("12345")).unwrap();
        send_raw_payload(&mut hmi, Request::ConfirmPass, [1, 2, 3, 4, 5], b'*');
        assert!(!expect_verdict(&mut hmi).unwrap());
        assert_eq!(store.snapshot(), [0xFF; 6]);

        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn silent_peer_times_out_with_an_error() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn_with_timeout(
            MemoryStore::new(),
            &journal,
            Some(Duration::from_millis(20)),
        );
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        // Keep our end open: only the timeout may stop the node.
        assert_eq!(handle.join().unwrap(), 1);
        drop(hmi);
    }

    #[test]
    fn lockdown_sounds_the_alarm_then_silences_it() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::new(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(Request::AttemptsEnded.into()).unwrap();
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
        assert_eq!(
            journal.records(),
            vec![Record::Alarm(true), Record::Alarm(false)]
        );
    }

    #[test]
    fn door_relocks_only_after_the_doorway_is_clear() {
        use crate::peripherals::Direction;

        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::new(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(Request::UnlockDoor.into()).unwrap();
        expect_reply(&mut hmi, Reply::LockDoor).unwrap();
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 0);
        assert_eq!(
            journal.records(),
            vec![
                Record::Motor(Direction::Open),
                Record::Motor(Direction::Stop),
                Record::Motion(true),
                Record::Motion(true),
                Record::Motion(false),
                Record::Motor(Direction::Close),
                Record::Motor(Direction::Stop),
            ]
        );
    }

    #[test]
    fn link_closed_mid_exchange_is_an_error() {
        let journal = Journal::default();
        let (mut hmi, handle) = spawn(MemoryStore::new(), &journal);
        expect_reply(&mut hmi, Reply::Ready).unwrap();
        hmi.send(Request::CheckPass.into()).unwrap();
        hmi.send(1).unwrap();
        drop(hmi);
        assert_eq!(handle.join().unwrap(), 1);
    }
}
