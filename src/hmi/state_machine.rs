//! `doorcom` HMI node state machine.
//!
//! The HMI node drives the conversation: it sends every request and the
//! control node only answers. Attempt counting lives here, in the events that
//! move between `UnlockFlow` (or `ChangePassword`) and itself.
//!
//! ```text
//!                      START
//!                        |
//!                        v
//!                    .-------.  unconfigured  .--------------.
//!                    | Init  |--------------->| Provisioning |<--.
//!                    '-------'                '--------------'   | no match
//!                        | configured            |    |          |
//!                        |             match     |    '----------'
//!                        v                       |
//!                 .------------.<----------------'
//!       .-------->|  MainMenu  |<------------------------------.
//!       |         '------------'                               |
//!       |            |      |                                  |
//!       |         '+'|      |'-'                               |
//!       |            v      v                                  |
//!       |  .------------. .----------------.  match            |
//!       |  | UnlockFlow | | ChangePassword |-----> Provisioning |
//!       |  '------------' '----------------'                   |
//!       |    |   ^  |       |   ^    |                         |
//!       |    '---'  |       '---'    |                         |
//!       |   retry   | match  retry   | last attempt failed     |
//!       |           |                v                         |
//!       '-----------'        .---------------.                 |
//!        door cycled         | SystemLockout |-----------------'
//!                            '---------------'
//!
//!         keypad closed / link error from any state ---> Done ---> END
//! ```

use log::debug;

use super::events::*;
use super::states::*;
use crate::{
    link::Link,
    peripherals::{Display, Keypad},
    settings::Settings,
    timing::Ticker,
};

// =============================================================================
// Public Interface
// =============================================================================

/// The hardware the HMI node is wired to.
pub struct Peripherals {
    pub link: Box<dyn Link>,
    pub keypad: Box<dyn Keypad>,
    pub display: Box<dyn Display>,
}

/// Represents the HMI node state machine. Use the `factory()` function to get
/// an instance then run it by calling its `run()` method.
pub struct FrontEnd {
    ctx: Context,
    sm: HmiStates,
}
impl FrontEnd {
    /// The event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set. At such point, the event loop terminates and
    /// returns an exit code indicating no errors when equal to **`0`**;
    /// otherwise a termination with error.
    pub fn run(&mut self) -> i8 {
        loop {
            self.sm = self.sm.step(&mut self.ctx);
            if let HmiStates::Done(state) = &self.sm {
                if state.should_exit {
                    return if state.with_error { 1 } else { 0 };
                }
            }
        }
    }
}

/// Factory function for the HMI node state machine.
pub fn factory(settings: Settings, peripherals: Peripherals) -> FrontEnd {
    let ticker = Ticker::start(settings.tick_period);
    FrontEnd {
        ctx: Context {
            settings,
            io: peripherals,
            ticker,
        },
        sm: HmiStates::Init(InitState {}),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

pub(crate) struct Context {
    pub settings: Settings,
    pub io: Peripherals,
    pub ticker: Ticker,
}

/// An enum wrapper around the states of the HMI node state machine.
enum HmiStates {
    Init(InitState),
    Provisioning(ProvisioningState),
    MainMenu(MainMenuState),
    UnlockFlow(UnlockFlowState),
    ChangePassword(ChangePasswordState),
    SystemLockout(SystemLockoutState),
    Done(DoneState),
}
impl HmiStates {
    /// Runs the current state and maps the event it returns to the next
    /// state. Events that are not expected in a state are a bug.
    fn step(&mut self, ctx: &mut Context) -> Self {
        match self {
            HmiStates::Init(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Provision(ev) => HmiStates::Provisioning(ev.into()),
                    Event::Menu(ev) => HmiStates::MainMenu(ev.into()),
                    Event::Done(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            HmiStates::Provisioning(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Provision(ev) => HmiStates::Provisioning(ev.into()),
                    Event::Menu(ev) => HmiStates::MainMenu(ev.into()),
                    Event::Done(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            HmiStates::MainMenu(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Unlock(ev) => HmiStates::UnlockFlow(ev.into()),
                    Event::ChangePassword(ev) => HmiStates::ChangePassword(ev.into()),
                    Event::Done(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            HmiStates::UnlockFlow(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Menu(ev) => HmiStates::MainMenu(ev.into()),
                    Event::Unlock(ev) => HmiStates::UnlockFlow(ev.into()),
                    Event::Lockout(ev) => HmiStates::SystemLockout(ev.into()),
                    Event::Done(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            HmiStates::ChangePassword(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Provision(ev) => HmiStates::Provisioning(ev.into()),
                    Event::ChangePassword(ev) => HmiStates::ChangePassword(ev.into()),
                    Event::Lockout(ev) => HmiStates::SystemLockout(ev.into()),
                    Event::Done(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            HmiStates::SystemLockout(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Menu(ev) => HmiStates::MainMenu(ev.into()),
                    Event::Done(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            HmiStates::Done(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Exit(ev) => HmiStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<ProvisionEvent> for ProvisioningState {
    fn from(_: ProvisionEvent) -> ProvisioningState {
        ProvisioningState {}
    }
}

impl From<MenuEvent> for MainMenuState {
    fn from(_: MenuEvent) -> MainMenuState {
        MainMenuState {}
    }
}

impl From<UnlockEvent> for UnlockFlowState {
    fn from(event: UnlockEvent) -> UnlockFlowState {
        UnlockFlowState {
            attempts: event.attempts,
        }
    }
}

impl From<ChangePasswordEvent> for ChangePasswordState {
    fn from(event: ChangePasswordEvent) -> ChangePasswordState {
        ChangePasswordState {
            attempts: event.attempts,
        }
    }
}

impl From<LockoutEvent> for SystemLockoutState {
    fn from(_: LockoutEvent) -> SystemLockoutState {
        SystemLockoutState {}
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
