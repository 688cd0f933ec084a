use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use pretty_assertions::{assert_eq, assert_ne};
use proptest::prelude::*;
use rstest::rstest;
use serial_test::serial;
use tandem_config::{PidFormat, RuntimeOptions};
use tandem_identity::{IdentityError, Identities, NameKey, NameRegistry, ProcessId, Uid, display_format};

fn leader(uid: u128) -> ProcessId {
	ProcessId::new(Uid::from_raw(uid), 1, "Leader", "leader", "", "127.0.0.1", vec![Some(7000)])
}

#[test]
fn leader_scenario_keeps_published_identity() {
	let registry = NameRegistry::new();
	let a = leader(100);
	let b = leader(50);

	let seen_by_a = registry.publish(a.clone());
	let seen_by_b = registry.publish(b);

	assert_eq!(seen_by_a, a);
	assert_eq!(seen_by_b, a);
	assert_eq!(registry.lookup(&NameKey::new("leader", "")), Some(a));
}

#[test]
fn concurrent_creation_leaves_one_survivor() {
	const THREADS: usize = 8;
	let ids = Identities::new("127.0.0.1", "alpha");
	let barrier = Arc::new(Barrier::new(THREADS));

	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let ids = ids.clone();
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				ids.create("Leader", vec![], "leader").unwrap()
			})
		})
		.collect();
	let returned: Vec<ProcessId> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	let published = ids.lookup("leader").expect("name must be published");
	let highest = returned.iter().max().unwrap();
	assert_eq!(&published, highest);
	assert!(returned.iter().all(|pid| pid <= &published));
	assert_eq!(ids.registry().all_published(), vec![published]);
}

#[test]
fn deferred_callback_fires_once_from_other_thread() {
	let ids = Identities::new("127.0.0.1", "");
	let (tx, rx) = mpsc::channel();

	let deferred = ids.registry().lookup_or_register_callback(&ids.key("acceptor"), move |pid| {
		tx.send(pid.clone()).unwrap();
	});
	assert_eq!(deferred, None);

	let creator = ids.clone();
	let created = thread::spawn(move || creator.create("Acceptor", vec![Some(9000)], "acceptor").unwrap())
		.join()
		.unwrap();

	assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), created);

	let creator = ids.clone();
	thread::spawn(move || creator.create("Acceptor", vec![], "acceptor").unwrap())
		.join()
		.unwrap();
	assert!(rx.recv_timeout(Duration::from_millis(50)).is_err(), "callback must not fire twice");
}

#[test]
fn anonymous_processes_skip_the_registry() {
	let ids = Identities::new("127.0.0.1", "");
	let a = ids.create("Worker", vec![], "").unwrap();
	let b = ids.create("Worker", vec![], "").unwrap();
	assert_ne!(a, b);
	assert_eq!(a.seqno(), 1);
	assert!(ids.registry().all_published().is_empty());
}

#[rstest]
#[case("a#b")]
#[case("leader@alpha")]
#[case("host:4000")]
fn reserved_characters_are_rejected(#[case] name: &str) {
	let ids = Identities::new("127.0.0.1", "");
	assert!(matches!(ids.create("Worker", vec![], name), Err(IdentityError::InvalidName(_))));
	assert!(ids.registry().all_published().is_empty());
}

#[test]
fn services_in_one_process_mint_distinct_uids() {
	let mut seen = HashSet::new();
	for _ in 0..50 {
		let first = Identities::new("127.0.0.1", "");
		let second = Identities::new("127.0.0.1", "");
		let a = first.create("Worker", vec![], "").unwrap();
		let b = second.create("Worker", vec![], "").unwrap();
		assert_ne!(a.uid(), b.uid());
		assert!(seen.insert(a.uid()));
		assert!(seen.insert(b.uid()));
	}
}

#[test]
fn identity_received_over_the_wire_resolves_locally() {
	let ids = Identities::new("127.0.0.1", "");
	let acceptor = ids.create("Acceptor", vec![Some(6000), None], "acceptor").unwrap();

	let bytes = postcard::to_stdvec(&acceptor).unwrap();
	let received: ProcessId = postcard::from_bytes(&bytes).unwrap();
	assert_eq!(ids.registry().publish(received.clone()), acceptor);
	assert_eq!(received.address_for(0), Some(("127.0.0.1", 6000)));
	assert_eq!(received.address_for(1), None);
}

proptest! {
	#[test]
	fn publication_order_does_not_change_the_winner(uids in proptest::collection::vec(1u128..1_000_000, 1..16)) {
		let registry = NameRegistry::new();
		for uid in &uids {
			registry.publish(leader(*uid));
		}
		let best = uids.iter().copied().max().map(leader);
		prop_assert_eq!(registry.lookup(&NameKey::new("leader", "")), best);
		prop_assert_eq!(registry.all_published().len(), 1);
	}
}

#[test]
fn services_can_share_a_registry() {
	let shared = Arc::new(NameRegistry::new());
	let alpha = Identities::new("127.0.0.1", "alpha").with_registry(Arc::clone(&shared));
	let beta = Identities::new("127.0.0.1", "beta").with_registry(Arc::clone(&shared));

	let a = alpha.create("P", vec![], "p").unwrap();
	let b = beta.create("P", vec![], "p").unwrap();
	assert_ne!(a, b);
	assert_eq!(shared.all_published().len(), 2);
	assert_eq!(beta.registry().lookup(&NameKey::new("p", "alpha")), Some(a));
}

#[test]
#[serial]
fn uninitialized_options_are_invalid_state() {
	let options = RuntimeOptions::default();
	assert!(matches!(Identities::from_options(&options), Err(IdentityError::InvalidState(_))));
}

#[test]
#[serial]
fn options_select_display_format() {
	let mut options = RuntimeOptions::from_toml_str("hostname = \"127.0.0.1\"\nnodename = \"alpha\"\npid_format = \"long\"").unwrap();
	options.initialize().unwrap();

	let ids = Identities::from_options(&options).unwrap();
	assert_eq!(display_format(), PidFormat::Long);
	assert_eq!(ids.scope(), "alpha");
	assert_eq!(ids.host(), "127.0.0.1");

	let anon = ids.create("Worker", vec![], "").unwrap();
	assert_eq!(anon.to_string(), format!("<Worker:{:x}#alpha>", anon.uid()));
	tandem_identity::set_display_format(PidFormat::Short);
}
