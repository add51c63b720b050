//! Events for the control node state machine.
//!
//! This modules is private and restricted to the [`control`](crate::control)
//! scope. The public interface of the state machine is provided by
//! [`control`](crate::control).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

// =============================================================================
// Crate-Public Interface
// =============================================================================

// AwaitCommandEvent ===========================================================

/// Event fired to go (back) to waiting for the next request.
///
/// This event can happen under one of the following circumstances:
///
///  1. At the `Init` state, once `READY` was announced.
///  2. At the end of every command state, whatever its outcome.
///  3. At the `AwaitCommand` state itself, after an unknown or out of context
///     byte was dropped.
#[derive(Debug)]
pub(crate) struct AwaitCommandEvent {}

// Command events ==============================================================

/// `GET_STATUS` was received.
#[derive(Debug)]
pub(crate) struct ReportStatusEvent {}

/// `SET_NEW_PASS` was received.
#[derive(Debug)]
pub(crate) struct ProvisionEvent {}

/// `CHECK_PASS` was received.
#[derive(Debug)]
pub(crate) struct VerifyEvent {}

/// `ATTEMPTS_ENDED` was received.
#[derive(Debug)]
pub(crate) struct LockdownEvent {}

/// `UNLOCK_DOOR` was received.
#[derive(Debug)]
pub(crate) struct UnlockEvent {}

// DoneEvent ===================================================================

/// Event fired when the node stops serving. The link was closed by the HMI
/// node (normal termination) or an unrecoverable link or storage error
/// happened.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub with_errors: bool,
}

// ExitEvent ===================================================================

/// The last event of the state machine, ending the event loop with an exit
/// status.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub with_error: bool,
}

// Events enum ==================================================================

/// Events that can be triggered within the control node state machine.
#[derive(Debug)]
pub(crate) enum Event {
    AwaitCommand(AwaitCommandEvent),
    ReportStatus(ReportStatusEvent),
    Provision(ProvisionEvent),
    Verify(VerifyEvent),
    Lockdown(LockdownEvent),
    Unlock(UnlockEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
