//! Match/no-match properties of the control node over every 5-digit input.

use std::{thread, time::Duration};

use proptest::prelude::*;

use doorcom::{
    control,
    link::{pair, ChannelLink, Link},
    protocol::{expect_reply, expect_verdict, send_payload, Credential, Reply, Request},
    sim::Journal,
    store::MemoryStore,
    SettingsBuilder,
};

/// Runs a control node on `store` while `drive` plays the HMI side.
fn with_control_node<T>(store: MemoryStore, drive: impl FnOnce(&mut ChannelLink) -> T) -> T {
    let settings = SettingsBuilder::new()
        .tick_period(Duration::from_millis(1))
        .finalize();
    let journal = Journal::default();
    let (mut hmi, back) = pair(None);
    let peripherals = control::Peripherals {
        link: Box::new(back),
        store: Box::new(store),
        motor: Box::new(journal.motor()),
        alarm: Box::new(journal.alarm()),
        motion: Box::new(journal.motion(&[])),
    };
    let handle = thread::spawn(move || control::factory(settings, peripherals).run());

    expect_reply(&mut hmi, Reply::Ready).unwrap();
    let result = drive(&mut hmi);
    drop(hmi);
    assert_eq!(handle.join().unwrap(), 0);
    result
}

fn digits() -> impl Strategy<Value = [u8; 5]> {
    prop::array::uniform5(0_u8..=9)
}

fn record(digits: [u8; 5]) -> [u8; 6] {
    let mut record = [0x23; 6];
    record[..5].copy_from_slice(&digits);
    record
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn provision_persists_only_equal_entries(a in digits(), b in digits()) {
        let store = MemoryStore::new();
        let first = Credential::new(a).unwrap();
        let second = Credential::new(b).unwrap();

        let matched = with_control_node(store.clone(), |hmi| {
            send_payload(hmi, Request::SetNewPass, &first).unwrap();
            send_payload(hmi, Request::ConfirmPass, &second).unwrap();
            expect_verdict(hmi).unwrap()
        });

        prop_assert_eq!(matched, a == b);
        if a == b {
            prop_assert_eq!(store.snapshot(), record(a));
        } else {
            prop_assert_eq!(store.snapshot(), [0xFF; 6]);
        }
    }

    #[test]
    fn failed_provision_keeps_the_old_credential(old in digits(), a in digits(), b in digits()) {
        prop_assume!(a != b);
        let store = MemoryStore::with_credential(&Credential::new(old).unwrap());
        let first = Credential::new(a).unwrap();
        let second = Credential::new(b).unwrap();

        let (matched, old_still_valid) = with_control_node(store.clone(), |hmi| {
            send_payload(hmi, Request::SetNewPass, &first).unwrap();
            send_payload(hmi, Request::ConfirmPass, &second).unwrap();
            let matched = expect_verdict(hmi).unwrap();
            send_payload(hmi, Request::CheckPass, &Credential::new(old).unwrap()).unwrap();
            (matched, expect_verdict(hmi).unwrap())
        });

        prop_assert!(!matched);
        prop_assert!(old_still_valid);
        prop_assert_eq!(store.snapshot(), record(old));
    }

    #[test]
    fn verify_matches_only_the_stored_credential(stored in digits(), candidate in digits()) {
        let store = MemoryStore::with_credential(&Credential::new(stored).unwrap());
        let candidate_credential = Credential::new(candidate).unwrap();

        let matched = with_control_node(store, |hmi| {
            send_payload(hmi, Request::CheckPass, &candidate_credential).unwrap();
            expect_verdict(hmi).unwrap()
        });

        prop_assert_eq!(matched, stored == candidate);
    }

    #[test]
    fn status_is_stable_between_provisions(configured in any::<bool>(), repeats in 1_usize..5) {
        let stored: Credential = "24680".parse().unwrap();
        let store = if configured {
            MemoryStore::with_credential(&stored)
        } else {
            MemoryStore::new()
        };

        let (answers, still_matches) = with_control_node(store, |hmi| {
            let answers = (0..repeats)
                .map(|_| {
                    hmi.send(Request::GetStatus.into()).unwrap();
                    hmi.recv().unwrap()
                })
                .collect::<Vec<_>>();
            send_payload(hmi, Request::CheckPass, &stored).unwrap();
            (answers, expect_verdict(hmi).unwrap())
        });

        let expected = if configured { 0x23 } else { 0xFF };
        prop_assert!(answers.iter().all(|b| *b == expected));
        prop_assert_eq!(still_matches, configured);
    }
}
