//! Unit tests for the launch phase state machine.

use crate::launch::LaunchPhase::*;
use crate::launch::LaunchState;

#[test]
fn test_forward_transitions_allowed() {
    assert!(Initializing.can_advance_to(CheckingUpdate));
    assert!(CheckingUpdate.can_advance_to(UpdateOffered));
    assert!(UpdateOffered.can_advance_to(StartingServer));
    assert!(StartingServer.can_advance_to(Ready));
}

#[test]
fn test_skipping_phases_is_allowed() {
    // No update offered on the NoUpdate/CheckFailed path
    assert!(CheckingUpdate.can_advance_to(StartingServer));
    assert!(Initializing.can_advance_to(Ready));
}

#[test]
fn test_no_phase_is_revisited() {
    assert!(!CheckingUpdate.can_advance_to(Initializing));
    assert!(!StartingServer.can_advance_to(CheckingUpdate));
    assert!(!Ready.can_advance_to(StartingServer));
    assert!(!Ready.can_advance_to(Ready));
}

#[test]
fn test_aborted_reachable_only_from_update_offered() {
    assert!(UpdateOffered.can_advance_to(Aborted));

    assert!(!Initializing.can_advance_to(Aborted));
    assert!(!CheckingUpdate.can_advance_to(Aborted));
    assert!(!StartingServer.can_advance_to(Aborted));
    assert!(!Ready.can_advance_to(Aborted));
}

#[test]
fn test_aborted_is_terminal() {
    assert!(!Aborted.can_advance_to(Initializing));
    assert!(!Aborted.can_advance_to(CheckingUpdate));
    assert!(!Aborted.can_advance_to(UpdateOffered));
    assert!(!Aborted.can_advance_to(StartingServer));
    assert!(!Aborted.can_advance_to(Ready));
    assert!(!Aborted.can_advance_to(Aborted));
}

#[test]
fn given_new_state_when_advancing_forward_then_phase_and_message_update() {
    let state = LaunchState::new();
    assert_eq!(state.phase(), Initializing);

    assert!(state.advance(CheckingUpdate, "Checking for updates..."));
    assert_eq!(state.phase(), CheckingUpdate);
    assert_eq!(state.message(), "Checking for updates...");
}

#[test]
fn given_later_phase_when_regressing_then_advance_refused() {
    let state = LaunchState::new();
    assert!(state.advance(StartingServer, "Starting application server..."));

    assert!(!state.advance(CheckingUpdate, "should not happen"));
    assert_eq!(state.phase(), StartingServer);
    assert_eq!(state.message(), "Starting application server...");
}

#[test]
fn given_subscriber_when_state_advances_then_update_observed() {
    let state = LaunchState::new();
    let rx = state.subscribe();

    state.advance(CheckingUpdate, "Checking for updates...");

    let update = rx.borrow();
    assert_eq!(update.phase, CheckingUpdate);
    assert_eq!(update.message, "Checking for updates...");
}

#[test]
fn test_phase_labels() {
    assert_eq!(Initializing.as_str(), "initializing");
    assert_eq!(CheckingUpdate.as_str(), "checking_update");
    assert_eq!(UpdateOffered.as_str(), "update_offered");
    assert_eq!(StartingServer.as_str(), "starting_server");
    assert_eq!(Ready.as_str(), "ready");
    assert_eq!(Aborted.as_str(), "aborted");
}
