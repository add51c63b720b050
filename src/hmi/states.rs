//! States for the HMI node state machine.
//!
//! This modules is private and restricted to the [`hmi`](crate::hmi) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use log::{debug, error, info};

use super::events::*;
use super::state_machine::Context;
use crate::{
    error::{Error, InputError},
    peripherals::{Key, Screen},
    policy::{AttemptCounter, Verdict},
    protocol::{self, Credential, Reply, Request, Status, DIGITS},
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// When finished, the state requests a transition by returning the
    /// appropriate `event`. Transitions that need data (the attempt counter)
    /// carry it in the event.
    fn run(&mut self, ctx: &mut Context) -> Event;
}

// Init State ==================================================================

/// Waits for the control node to announce `READY`, then asks whether a
/// credential is configured. This decides the first real state, once.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Init");
        match query_status(ctx) {
            Ok(Status::Configured) => Event::Menu(MenuEvent {}),
            Ok(Status::Unconfigured) => Event::Provision(ProvisionEvent {}),
            Err(e) => done(e),
        }
    }
}

fn query_status(ctx: &mut Context) -> Result<Status, Error> {
    protocol::expect_reply(&mut *ctx.io.link, Reply::Ready)?;
    ctx.io.link.send(Request::GetStatus.into())?;
    let status = Status::from(ctx.io.link.recv()?);
    debug!("<- {:?}", status);
    Ok(status)
}

// Provisioning State ==========================================================

/// Asks for a new password twice and lets the control node decide whether the
/// two entries match.
///
/// There is no attempt limit here: a mismatch simply starts over.
#[derive(Debug)]
pub(crate) struct ProvisioningState {}
impl Runnable for ProvisioningState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Provisioning");
        match provision(ctx) {
            Ok(true) => Event::Menu(MenuEvent {}),
            Ok(false) => Event::Provision(ProvisionEvent {}),
            Err(e) => done(e),
        }
    }
}

fn provision(ctx: &mut Context) -> Result<bool, Error> {
    ctx.io.display.show(Screen::EnterPassword);
    let first = enter_password(ctx)?;
    protocol::send_payload(&mut *ctx.io.link, Request::SetNewPass, &first)?;

    ctx.io.display.show(Screen::ReEnterPassword);
    let second = enter_password(ctx)?;
    protocol::send_payload(&mut *ctx.io.link, Request::ConfirmPass, &second)?;

    let matched = protocol::expect_verdict(&mut *ctx.io.link)?;
    show_verdict(ctx, matched);
    Ok(matched)
}

// MainMenu State ==============================================================

/// Two choices: `+` opens the door, `-` changes the password. Every other key
/// is ignored. Each choice starts a new verification session.
#[derive(Debug)]
pub(crate) struct MainMenuState {}
impl Runnable for MainMenuState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> MainMenu");
        ctx.io.display.show(Screen::MainMenu);
        loop {
            match ctx.io.keypad.next_key() {
                Ok(Key::Plus) => {
                    return Event::Unlock(UnlockEvent {
                        attempts: AttemptCounter::new(&ctx.settings.policy),
                    })
                }
                Ok(Key::Minus) => {
                    return Event::ChangePassword(ChangePasswordEvent {
                        attempts: AttemptCounter::new(&ctx.settings.policy),
                    })
                }
                Ok(_) => {}
                Err(e) => return done(e.into()),
            }
        }
    }
}

// UnlockFlow State ============================================================

/// One attempt at opening the door.
///
///  * match: runs the door cycle, then **[`MenuEvent`]**,
///  * mismatch with attempts left: **[`UnlockEvent`]** carrying the counter,
///  * mismatch on the last attempt: **[`LockoutEvent`]**.
#[derive(Debug)]
pub(crate) struct UnlockFlowState {
    pub attempts: AttemptCounter,
}
impl Runnable for UnlockFlowState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> UnlockFlow ({} attempt(s) left)", self.attempts.remaining());
        let result = check_password(ctx).and_then(|matched| {
            if matched {
                open_door(ctx)?;
            }
            Ok(matched)
        });
        match result {
            Ok(true) => Event::Menu(MenuEvent {}),
            Ok(false) => match self.attempts.record_failure() {
                Verdict::Retry => Event::Unlock(UnlockEvent {
                    attempts: self.attempts.clone(),
                }),
                Verdict::Lockout => Event::Lockout(LockoutEvent {}),
            },
            Err(e) => done(e),
        }
    }
}

/// The HMI side of the door cycle. The control node decides when the door
/// starts closing: we only move on once it sends `LOCK_DOOR`.
fn open_door(ctx: &mut Context) -> Result<(), Error> {
    let dwell = ctx.settings.policy.door_motion_seconds;
    debug!("-> {:?}", Request::UnlockDoor);
    ctx.io.link.send(Request::UnlockDoor.into())?;

    ctx.io.display.show(Screen::DoorUnlocking);
    ctx.ticker.wait_seconds(dwell);

    ctx.io.display.show(Screen::WaitForPeople);
    protocol::expect_reply(&mut *ctx.io.link, Reply::LockDoor)?;

    ctx.io.display.show(Screen::DoorLocking);
    ctx.ticker.wait_seconds(dwell);
    Ok(())
}

// ChangePassword State ========================================================

/// One attempt at proving the current password before a new one may be set.
///
///  * match: **[`ProvisionEvent`]**,
///  * mismatch with attempts left: **[`ChangePasswordEvent`]**,
///  * mismatch on the last attempt: **[`LockoutEvent`]**.
#[derive(Debug)]
pub(crate) struct ChangePasswordState {
    pub attempts: AttemptCounter,
}
impl Runnable for ChangePasswordState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!(
            "=> ChangePassword ({} attempt(s) left)",
            self.attempts.remaining()
        );
        match check_password(ctx) {
            Ok(true) => Event::Provision(ProvisionEvent {}),
            Ok(false) => match self.attempts.record_failure() {
                Verdict::Retry => Event::ChangePassword(ChangePasswordEvent {
                    attempts: self.attempts.clone(),
                }),
                Verdict::Lockout => Event::Lockout(LockoutEvent {}),
            },
            Err(e) => done(e),
        }
    }
}

// SystemLockout State =========================================================

/// Tells the control node to sound the alarm and keeps the keypad dead for
/// the lockout period.
#[derive(Debug)]
pub(crate) struct SystemLockoutState {}
impl Runnable for SystemLockoutState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> SystemLockout");
        debug!("-> {:?}", Request::AttemptsEnded);
        if let Err(e) = ctx.io.link.send(Request::AttemptsEnded.into()) {
            return done(e.into());
        }
        ctx.io.display.show(Screen::SystemLocked);
        ctx.ticker.wait_seconds(ctx.settings.policy.lockout_seconds);
        Event::Menu(MenuEvent {})
    }
}

// Done State ==================================================================

/// Reached when the HMI node stops. Logs the outcome, then fires
/// [`ExitEvent`] so the event loop terminates.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true`, indicates an abnormal completion caused by an error.
    pub with_error: bool,
    /// When `true` instructs the state machine to exit its event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, _ctx: &mut Context) -> Event {
        info!(
            "=> Done with{}errors",
            if self.with_error { " " } else { " no " }
        );
        Event::Exit(ExitEvent {
            with_error: self.with_error,
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Read five digits from the keypad, echoing each one masked, then wait for
/// `Enter`. Other keys are ignored.
fn enter_password(ctx: &mut Context) -> Result<Credential, Error> {
    let mut digits = [0_u8; DIGITS];
    let mut entered = 0;
    while entered < DIGITS {
        if let Key::Digit(d) = ctx.io.keypad.next_key()? {
            if d <= 9 {
                digits[entered] = d;
                entered += 1;
                ctx.io.display.echo_masked();
            }
        }
    }
    while ctx.io.keypad.next_key()? != Key::Enter {}
    Ok(Credential::new(digits)?)
}

/// Prompt, read and verify one password. The candidate is dropped as soon as
/// the exchange is over.
fn check_password(ctx: &mut Context) -> Result<bool, Error> {
    ctx.io.display.show(Screen::EnterPassword);
    let candidate = enter_password(ctx)?;
    protocol::send_payload(&mut *ctx.io.link, Request::CheckPass, &candidate)?;
    let matched = protocol::expect_verdict(&mut *ctx.io.link)?;
    show_verdict(ctx, matched);
    Ok(matched)
}

fn show_verdict(ctx: &mut Context, matched: bool) {
    debug!("<- {:?}", Reply::verdict(matched));
    ctx.io.display.show(if matched {
        Screen::PasswordsMatch
    } else {
        Screen::PasswordsDontMatch
    });
    ctx.ticker.wait_seconds(ctx.settings.policy.message_seconds);
}

/// A closed keypad is how the HMI node is told to stop. Anything else is a
/// failure.
fn done(e: Error) -> Event {
    match e {
        Error::Input(InputError::Closed) => {
            info!("keypad closed");
            Event::Done(DoneEvent { with_errors: false })
        }
        e => {
            error!("{}", e);
            Event::Done(DoneEvent { with_errors: true })
        }
    }
}
