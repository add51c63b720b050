//! States for the control node state machine.
//!
//! This modules is private and restricted to the [`control`](crate::control)
//! scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::convert::TryFrom;

use log::{debug, error, info, warn};

use super::events::*;
use super::state_machine::Context;
use crate::{
    error::{Error, LinkError},
    peripherals::Direction,
    protocol::{self, Reply, Request, Status},
    store,
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// The node's peripherals, settings and cached credential are reachable
    /// through `ctx`. When finished, the state requests a transition by
    /// returning the appropriate `event`.
    fn run(&mut self, ctx: &mut Context) -> Event;
}

// Init State ==================================================================

/// The control node just booted.
///
/// Loads the credential cache from the store, then announces `READY`.
///
///  * **[`AwaitCommandEvent`] => [`AwaitCommandState`]** once announced,
///  * **[`DoneEvent`] => [`DoneState`]** when the store cannot be read or the
///    link is down. A control node without its store must not serve.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Init");
        finish(announce(ctx))
    }
}

fn announce(ctx: &mut Context) -> Result<(), Error> {
    ctx.cached = store::load(&mut *ctx.io.store)?;
    debug!(
        "credential {}",
        if ctx.cached.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    ctx.io.link.send(Reply::Ready.into())?;
    Ok(())
}

// AwaitCommand State ==========================================================

/// Blocks on the link for the next request opcode and dispatches it.
///
/// `CONFIRM_PASS` is only meaningful inside a provisioning exchange and is
/// dropped here, as is any byte that is not a request.
#[derive(Debug)]
pub(crate) struct AwaitCommandState {}
impl Runnable for AwaitCommandState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> AwaitCommand");
        let byte = match ctx.io.link.recv() {
            Ok(byte) => byte,
            Err(LinkError::Closed) => {
                info!("link closed by the HMI node");
                return Event::Done(DoneEvent { with_errors: false });
            }
            Err(e) => {
                error!("{}", e);
                return Event::Done(DoneEvent { with_errors: true });
            }
        };

        match Request::try_from(byte) {
            Ok(request) => {
                debug!("<- {:?}", request);
                match request {
                    Request::GetStatus => Event::ReportStatus(ReportStatusEvent {}),
                    Request::SetNewPass => Event::Provision(ProvisionEvent {}),
                    Request::CheckPass => Event::Verify(VerifyEvent {}),
                    Request::AttemptsEnded => Event::Lockdown(LockdownEvent {}),
                    Request::UnlockDoor => Event::Unlock(UnlockEvent {}),
                    Request::ConfirmPass => {
                        warn!("dropping {:?} outside of provisioning", request);
                        Event::AwaitCommand(AwaitCommandEvent {})
                    }
                }
            }
            Err(unknown) => {
                warn!("dropping {}", unknown);
                Event::AwaitCommand(AwaitCommandEvent {})
            }
        }
    }
}

// ReportStatus State ==========================================================

/// Answers `GET_STATUS` and refreshes the cached credential from the store.
///
/// The status comes from the credential actually loaded, not from the status
/// byte alone: a record flagged as saved but holding corrupt digits is
/// reported unconfigured, so the HMI node provisions it again instead of
/// failing every verification.
#[derive(Debug)]
pub(crate) struct ReportStatusState {}
impl Runnable for ReportStatusState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> ReportStatus");
        finish(report_status(ctx))
    }
}

fn report_status(ctx: &mut Context) -> Result<(), Error> {
    ctx.cached = store::load(&mut *ctx.io.store)?;
    let status = if ctx.cached.is_some() {
        Status::Configured
    } else {
        Status::Unconfigured
    };
    debug!("-> {:?}", status);
    ctx.io.link.send(status.into())?;
    Ok(())
}

// Provision State =============================================================

/// Receives the new credential, waits for `CONFIRM_PASS`, receives the
/// confirmation, and replaces the stored record only when both are equal.
///
/// A garbled payload on either side counts as a mismatch. Nothing is written
/// before the two entries are known to match.
#[derive(Debug)]
pub(crate) struct ProvisionState {}
impl Runnable for ProvisionState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Provision");
        finish(provision(ctx))
    }
}

fn provision(ctx: &mut Context) -> Result<(), Error> {
    let first = protocol::receive_payload(&mut *ctx.io.link)?;
    protocol::expect_request(&mut *ctx.io.link, Request::ConfirmPass)?;
    let second = protocol::receive_payload(&mut *ctx.io.link)?;

    let candidate = match (first.credential(), second.credential()) {
        (Ok(first), Ok(second)) if first.matches(&second) => Some(first),
        (Ok(_), Ok(_)) => None,
        (first, second) => {
            if let Err(e) = first {
                warn!("malformed payload: {}", e);
            }
            if let Err(e) = second {
                warn!("malformed confirmation payload: {}", e);
            }
            None
        }
    };

    if let Some(credential) = candidate {
        store::save(&mut *ctx.io.store, &credential)?;
        ctx.cached = store::load(&mut *ctx.io.store)?;
        info!("new credential saved");
    }
    let reply = Reply::verdict(candidate.is_some());
    debug!("-> {:?}", reply);
    ctx.io.link.send(reply.into())?;
    Ok(())
}

// Verify State ================================================================

/// Compares one payload against the cached credential. Keeps no count of
/// attempts, the HMI node owns that policy.
#[derive(Debug)]
pub(crate) struct VerifyState {}
impl Runnable for VerifyState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Verify");
        finish(verify(ctx))
    }
}

fn verify(ctx: &mut Context) -> Result<(), Error> {
    let frame = protocol::receive_payload(&mut *ctx.io.link)?;
    let matched = match (frame.credential(), ctx.cached.as_ref()) {
        (Ok(candidate), Some(stored)) => candidate.matches(stored),
        (Ok(_), None) => {
            warn!("verification requested but no credential is configured");
            false
        }
        (Err(e), _) => {
            warn!("malformed payload: {}", e);
            false
        }
    };
    let reply = Reply::verdict(matched);
    debug!("-> {:?}", reply);
    ctx.io.link.send(reply.into())?;
    Ok(())
}

// Lockdown State ==============================================================

/// Sounds the alarm for the lockout period.
#[derive(Debug)]
pub(crate) struct LockdownState {}
impl Runnable for LockdownState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> Lockdown");
        ctx.io.alarm.set(true);
        ctx.ticker.wait_seconds(ctx.settings.policy.lockout_seconds);
        ctx.io.alarm.set(false);
        Event::AwaitCommand(AwaitCommandEvent {})
    }
}

// UnlockSequence State ========================================================

/// Opens the door, waits for the doorway to clear, then closes it.
///
/// The order is the safety property of the door: the motor is stopped, then
/// the sensor must report no motion, and only then is `LOCK_DOOR` sent and the
/// motor driven closed.
#[derive(Debug)]
pub(crate) struct UnlockSequenceState {}
impl Runnable for UnlockSequenceState {
    fn run(&mut self, ctx: &mut Context) -> Event {
        info!("=> UnlockSequence");
        let result = actuate(ctx);
        if result.is_err() {
            // Never leave the motor running.
            ctx.io.motor.drive(Direction::Stop);
        }
        finish(result)
    }
}

fn actuate(ctx: &mut Context) -> Result<(), Error> {
    let dwell = ctx.settings.policy.door_motion_seconds;

    ctx.io.motor.drive(Direction::Open);
    ctx.ticker.wait_seconds(dwell);
    ctx.io.motor.drive(Direction::Stop);

    ctx.io.motion.wait_until_clear().map_err(Error::Sensor)?;
    debug!("doorway clear -> {:?}", Reply::LockDoor);
    ctx.io.link.send(Reply::LockDoor.into())?;

    ctx.io.motor.drive(Direction::Close);
    ctx.ticker.wait_seconds(dwell);
    ctx.io.motor.drive(Direction::Stop);
    Ok(())
}

// Done State ==================================================================

/// Reached when the control node stops serving.
///
/// Like every `Done` state in `doorcom`, it runs in two phases: first it logs
/// the outcome, then it fires [`ExitEvent`] so the event loop terminates.
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

/// Map the outcome of a command to the next event: back to waiting on success,
/// done with errors otherwise. A link closed in the middle of an exchange is
/// abnormal.
fn finish(result: Result<(), Error>) -> Event {
    match result {
        Ok(()) => Event::AwaitCommand(AwaitCommandEvent {}),
        Err(e) => {
            error!("{}", e);
            Event::Done(DoneEvent { with_errors: true })
        }
    }
}
