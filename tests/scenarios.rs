//! Both nodes running against each other on virtual hardware.

use std::time::Duration;

use doorcom::{
    peripherals::{Direction, Screen},
    protocol::{Credential, Reply, Request},
    sim::{Node, Outcome, Record, Simulation},
    SettingsBuilder,
};

fn simulation() -> Simulation {
    let settings = SettingsBuilder::new()
        .tick_period(Duration::from_millis(1))
        .finalize();
    Simulation::new(settings)
}

fn credential(s: &str) -> Credential {
    s.parse().unwrap()
}

fn position(records: &[Record], wanted: Record) -> usize {
    records
        .iter()
        .position(|r| *r == wanted)
        .unwrap_or_else(|| panic!("{:?} never happened", wanted))
}

fn count_sent(outcome: &Outcome, node: Node, byte: u8) -> usize {
    outcome
        .journal
        .sent_by(node)
        .into_iter()
        .filter(|b| *b == byte)
        .count()
}

fn assert_clean_exit(outcome: &Outcome) {
    assert_eq!(outcome.hmi_status, 0, "hmi node failed");
    assert_eq!(outcome.control_status, 0, "control node failed");
}

#[test]
fn first_boot_provisions_the_password() {
    let outcome = simulation().keys("11111e 11111e").run();
    assert_clean_exit(&outcome);

    assert_eq!(outcome.store.snapshot(), [1, 1, 1, 1, 1, 0x23]);
    assert_eq!(
        outcome.journal.screens(),
        vec![
            Screen::EnterPassword,
            Screen::ReEnterPassword,
            Screen::PasswordsMatch,
            Screen::MainMenu
        ]
    );
    assert_eq!(
        outcome.journal.sent_by(Node::Hmi),
        vec![
            0xE1, 0xE2, 1, 1, 1, 1, 1, 0x23, 0xE4, 1, 1, 1, 1, 1, 0x23
        ]
    );
    assert_eq!(
        outcome.journal.sent_by(Node::Control),
        vec![
            0xE0, 0xFF, 0xE3, 0xE3, 0xE3, 0xE3, 0xE3, 0xE3, 0xE3, 0xE3, 0xE3, 0xE3, 0xE5
        ]
    );
}

#[test]
fn mismatched_entries_start_provisioning_over() {
    let outcome = simulation().keys("11111e 11112e 44444e 44444e").run();
    assert_clean_exit(&outcome);

    assert_eq!(outcome.store.snapshot(), [4, 4, 4, 4, 4, 0x23]);
    let screens = outcome.journal.screens();
    assert_eq!(screens[2], Screen::PasswordsDontMatch);
    assert_eq!(screens[3], Screen::EnterPassword);
    assert_eq!(screens.last(), Some(&Screen::MainMenu));
}

#[test]
fn correct_password_opens_the_door() {
    let outcome = simulation()
        .stored(&credential("22222"))
        .keys("+ 22222e")
        .motion(&[true, true, false])
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(
        outcome.journal.screens(),
        vec![
            Screen::MainMenu,
            Screen::EnterPassword,
            Screen::PasswordsMatch,
            Screen::DoorUnlocking,
            Screen::WaitForPeople,
            Screen::DoorLocking,
            Screen::MainMenu
        ]
    );
    assert_eq!(count_sent(&outcome, Node::Hmi, Request::UnlockDoor.into()), 1);
    assert_eq!(count_sent(&outcome, Node::Control, Reply::LockDoor.into()), 1);
    assert_eq!(outcome.store.snapshot(), [2, 2, 2, 2, 2, 0x23]);
}

#[test]
fn door_closes_only_once_the_doorway_is_clear() {
    let outcome = simulation()
        .stored(&credential("22222"))
        .keys("+ 22222e")
        .motion(&[true, true, true, false])
        .run();
    assert_clean_exit(&outcome);

    let records = outcome.journal.records();
    let opened = position(&records, Record::Motor(Direction::Open));
    let clear = position(&records, Record::Motion(false));
    let lock_door = position(&records, Record::Sent(Node::Control, Reply::LockDoor.into()));
    let closing = position(&records, Record::Motor(Direction::Close));

    assert!(opened < clear);
    assert!(clear < lock_door);
    assert!(lock_door < closing);
    let readings: Vec<_> = records[opened..=clear]
        .iter()
        .filter(|r| matches!(r, Record::Motion(_)))
        .collect();
    assert_eq!(
        readings,
        vec![
            &Record::Motion(true),
            &Record::Motion(true),
            &Record::Motion(true),
            &Record::Motion(false)
        ]
    );
}

#[test]
fn three_wrong_passwords_lock_the_system() {
    let outcome = simulation()
        .stored(&credential("33333"))
        .keys("+ 00000e 00000e 00000e")
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(
        count_sent(&outcome, Node::Hmi, Request::AttemptsEnded.into()),
        1
    );
    assert_eq!(count_sent(&outcome, Node::Control, Reply::PassNoMatch.into()), 3);

    let records = outcome.journal.records();
    let alarm_on = position(&records, Record::Alarm(true));
    let alarm_off = position(&records, Record::Alarm(false));
    assert!(alarm_on < alarm_off);

    let screens = outcome.journal.screens();
    let locked = screens
        .iter()
        .position(|s| *s == Screen::SystemLocked)
        .unwrap();
    assert_eq!(screens[locked + 1], Screen::MainMenu);
}

#[test]
fn lockout_starts_a_fresh_session() {
    // Two failures after the lockout must not lock out again.
    let outcome = simulation()
        .stored(&credential("33333"))
        .keys("+ 00000e 00000e 00000e  + 00000e 00000e 33333e")
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(
        count_sent(&outcome, Node::Hmi, Request::AttemptsEnded.into()),
        1
    );
    assert_eq!(count_sent(&outcome, Node::Hmi, Request::UnlockDoor.into()), 1);
}

#[test]
fn two_failures_never_lock_out() {
    let outcome = simulation()
        .stored(&credential("33333"))
        .keys("+ 00000e 12345e 33333e")
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(
        count_sent(&outcome, Node::Hmi, Request::AttemptsEnded.into()),
        0
    );
    assert!(!outcome.journal.screens().contains(&Screen::SystemLocked));
    assert!(!outcome.journal.records().contains(&Record::Alarm(true)));
    assert_eq!(count_sent(&outcome, Node::Hmi, Request::UnlockDoor.into()), 1);
}

#[test]
fn change_password_replaces_the_credential() {
    let outcome = simulation()
        .stored(&credential("12345"))
        .keys("- 12345e 67890e 67890e  + 67890e")
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(outcome.store.snapshot(), [6, 7, 8, 9, 0, 0x23]);
    assert_eq!(count_sent(&outcome, Node::Hmi, Request::UnlockDoor.into()), 1);
}

#[test]
fn change_password_locks_out_after_three_failures() {
    let outcome = simulation()
        .stored(&credential("12345"))
        .keys("- 00000e 00000e 00000e")
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(outcome.store.snapshot(), [1, 2, 3, 4, 5, 0x23]);
    assert_eq!(
        count_sent(&outcome, Node::Hmi, Request::AttemptsEnded.into()),
        1
    );
    assert!(!outcome.journal.screens().contains(&Screen::ReEnterPassword));
}

#[test]
fn keys_outside_an_entry_are_ignored() {
    let outcome = simulation()
        .stored(&credential("54321"))
        .keys("x 9 e + 5a4b3c2d1 e")
        .run();
    assert_clean_exit(&outcome);

    assert_eq!(count_sent(&outcome, Node::Control, Reply::PassMatch.into()), 1);
    assert_eq!(count_sent(&outcome, Node::Hmi, Request::UnlockDoor.into()), 1);
}
