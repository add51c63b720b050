//! Events for the HMI node state machine.
//!
//! This modules is private and restricted to the [`hmi`](crate::hmi) scope.
//! The public interface of the state machine is provided by
//! [`hmi`](crate::hmi).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use crate::policy::AttemptCounter;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// ProvisionEvent ==============================================================

/// Event fired to trigger a transition to the `Provisioning` state.
///
/// This event can happen under one of the following circumstances:
///
///  1. At the `Init` state, when the control node reports no credential.
///  2. At the `Provisioning` state, when the two entries did not match.
///  3. At the `ChangePassword` state, once the current password was verified.
#[derive(Debug)]
pub(crate) struct ProvisionEvent {}

// MenuEvent ===================================================================

/// Event fired to go (back) to the main menu: after startup with a configured
/// credential, after provisioning, after the door cycle, or once a lockout
/// period is over.
#[derive(Debug)]
pub(crate) struct MenuEvent {}

// UnlockEvent =================================================================

/// Event fired to trigger a transition to the `UnlockFlow` state, from the
/// main menu with a fresh counter, or from `UnlockFlow` itself after a
/// mismatch with the counter carried over.
#[derive(Debug)]
pub(crate) struct UnlockEvent {
    pub attempts: AttemptCounter,
}

// ChangePasswordEvent =========================================================

/// Same as [`UnlockEvent`] for the `ChangePassword` state.
#[derive(Debug)]
pub(crate) struct ChangePasswordEvent {
    pub attempts: AttemptCounter,
}

// LockoutEvent ================================================================

/// Event fired when the attempts of a verification session are exhausted. The
/// counter is dropped with the session; the menu starts the next one fresh.
#[derive(Debug)]
pub(crate) struct LockoutEvent {}

// DoneEvent ===================================================================

/// Event fired when the HMI node stops: the keypad was closed (normal
/// termination) or the link failed.
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

/// Events that can be triggered within the HMI node state machine.
#[derive(Debug)]
pub(crate) enum Event {
    Provision(ProvisionEvent),
    Menu(MenuEvent),
    Unlock(UnlockEvent),
    ChangePassword(ChangePasswordEvent),
    Lockout(LockoutEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
