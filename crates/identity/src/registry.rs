//! Name registry with deferred resolution.
//!
//! Maps `(name, scope)` keys to the published [`ProcessId`] and holds the
//! callbacks of senders waiting for a name that has not been published yet.
//! Publication reconciles races between identities created under the same
//! name: whichever sorts higher in the identity order wins.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::display::PidFormat;
use crate::name::NameKey;
use crate::pid::ProcessId;

/// Callback fired once with the identity eventually published for a name.
pub type ResolveCallback = Box<dyn FnOnce(&ProcessId) + Send + 'static>;

#[derive(Default)]
struct RegistryState {
	named: FxHashMap<NameKey, ProcessId>,
	pending: FxHashMap<NameKey, Vec<ResolveCallback>>,
}

/// Process-lifetime table of published process names.
///
/// Thread-safe; share via `Arc<NameRegistry>`. Callbacks always run outside
/// the registry lock, so they may create or look up identities themselves.
#[derive(Default)]
pub struct NameRegistry {
	state: Mutex<RegistryState>,
}

impl std::fmt::Debug for NameRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("NameRegistry")
			.field("published", &state.named.len())
			.field("pending", &state.pending.len())
			.finish()
	}
}

impl NameRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Publishes `pid` under its name and returns the identity that now owns
	/// the name.
	///
	/// If an identity is already published for the key and `pid` sorts below
	/// it, the published one is kept and returned. Otherwise `pid` replaces
	/// it, logging a reassignment when the uids differ. Pending callbacks for
	/// the key are drained and invoked in registration order with the result.
	///
	/// Anonymous identities are returned unchanged.
	pub fn publish(&self, pid: ProcessId) -> ProcessId {
		let Some(key) = pid.name_key() else {
			return pid;
		};

		let (resolved, callbacks) = {
			let mut state = self.state.lock();
			let entry = state.named.get(&key).cloned();
			let mut resolved = pid;
			if let Some(entry) = entry.as_ref() {
				if resolved < *entry {
					resolved = entry.clone();
				} else if resolved.uid() != entry.uid() {
					warn!(
						name = %key,
						from = %entry.display(PidFormat::Full),
						to = %resolved.display(PidFormat::Full),
						"process name reassigned"
					);
				}
			}
			if entry.as_ref() != Some(&resolved) {
				state.named.insert(key.clone(), resolved.clone());
				debug!(name = %key, uid = %resolved.uid(), "registry.publish");
			}
			(resolved, state.pending.remove(&key).unwrap_or_default())
		};

		if !callbacks.is_empty() {
			debug!(name = %key, callbacks = callbacks.len(), "registry.resolve_pending");
		}
		for callback in callbacks {
			callback(&resolved);
		}
		resolved
	}

	/// Returns the identity published for `key`.
	pub fn lookup(&self, key: &NameKey) -> Option<ProcessId> {
		self.state.lock().named.get(key).cloned()
	}

	/// Returns the identity published for `key`, or registers `callback` to
	/// be fired once with the identity that first publishes it.
	///
	/// `None` means resolution is deferred and `callback` was stored.
	pub fn lookup_or_register_callback(&self, key: &NameKey, callback: impl FnOnce(&ProcessId) + Send + 'static) -> Option<ProcessId> {
		let mut state = self.state.lock();
		if let Some(pid) = state.named.get(key) {
			return Some(pid.clone());
		}
		let waiting = state.pending.entry(key.clone()).or_default();
		waiting.push(Box::new(callback));
		debug!(name = %key, waiting = waiting.len(), "registry.defer");
		None
	}

	/// Returns every published identity, in identity order.
	pub fn all_published(&self) -> Vec<ProcessId> {
		let mut all: Vec<_> = self.state.lock().named.values().cloned().collect();
		all.sort();
		all
	}

	/// Unpublishes `pid` if it still owns its name.
	///
	/// Pending callbacks for the name are kept; a later publication still
	/// resolves them. Returns true if an entry was removed.
	pub fn drop_entry(&self, pid: &ProcessId) -> bool {
		let Some(key) = pid.name_key() else {
			return false;
		};
		let mut state = self.state.lock();
		if state.named.get(&key) == Some(pid) {
			state.named.remove(&key);
			debug!(name = %key, uid = %pid.uid(), "registry.drop");
			true
		} else {
			false
		}
	}

	/// Number of callbacks waiting on `key`.
	pub fn pending_count(&self, key: &NameKey) -> usize {
		self.state.lock().pending.get(key).map_or(0, Vec::len)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::uid::Uid;

	fn named(uid: u128, name: &str) -> ProcessId {
		ProcessId::new(Uid::from_raw(uid), 1, "Leader", name, "", "127.0.0.1", vec![])
	}

	#[test]
	fn lower_identity_loses_to_published() {
		let registry = NameRegistry::new();
		let a = named(100, "leader");
		let b = named(50, "leader");

		assert_eq!(registry.publish(a.clone()), a);
		assert_eq!(registry.publish(b), a);
		assert_eq!(registry.lookup(&NameKey::new("leader", "")), Some(a));
	}

	#[test]
	fn higher_identity_reassigns_name() {
		let registry = NameRegistry::new();
		let old = named(100, "leader");
		let new = named(200, "leader");

		registry.publish(old);
		assert_eq!(registry.publish(new.clone()), new);
		assert_eq!(registry.lookup(&NameKey::new("leader", "")), Some(new));
	}

	#[test]
	fn republishing_same_identity_is_idempotent() {
		let registry = NameRegistry::new();
		let a = named(100, "leader");
		registry.publish(a.clone());
		assert_eq!(registry.publish(a.clone()), a);
		assert_eq!(registry.all_published(), vec![a]);
	}

	#[test]
	fn scopes_keep_names_apart() {
		let registry = NameRegistry::new();
		let here = ProcessId::new(Uid::from_raw(1), 1, "R", "p", "alpha", "h", vec![]);
		let there = ProcessId::new(Uid::from_raw(2), 1, "R", "p", "beta", "h", vec![]);
		registry.publish(here.clone());
		registry.publish(there.clone());
		assert_eq!(registry.lookup(&NameKey::new("p", "alpha")), Some(here));
		assert_eq!(registry.lookup(&NameKey::new("p", "beta")), Some(there));
	}

	#[test]
	fn anonymous_identities_are_not_published() {
		let registry = NameRegistry::new();
		let anon = named(5, "");
		assert_eq!(registry.publish(anon.clone()), anon);
		assert!(registry.all_published().is_empty());
		assert!(!registry.drop_entry(&anon));
	}

	#[test]
	fn deferred_callbacks_fire_once_in_order() {
		let registry = NameRegistry::new();
		let key = NameKey::new("leader", "");
		let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

		for tag in 0..3 {
			let order = Arc::clone(&order);
			let got = registry.lookup_or_register_callback(&key, move |pid| order.lock().push((tag, pid.uid())));
			assert_eq!(got, None);
		}
		assert_eq!(registry.pending_count(&key), 3);

		let first = registry.publish(named(10, "leader"));
		registry.publish(named(20, "leader"));

		assert_eq!(*order.lock(), vec![(0, first.uid()), (1, first.uid()), (2, first.uid())]);
		assert_eq!(registry.pending_count(&key), 0);
	}

	#[test]
	fn callbacks_receive_the_surviving_identity() {
		let registry = NameRegistry::new();
		let key = NameKey::new("leader", "");
		let a = named(100, "leader");
		registry.publish(a.clone());
		registry.drop_entry(&a);

		let seen = Arc::new(parking_lot::Mutex::new(None));
		let slot = Arc::clone(&seen);
		assert_eq!(registry.lookup_or_register_callback(&key, move |pid| *slot.lock() = Some(pid.clone())), None);

		let b = named(300, "leader");
		registry.publish(b.clone());
		assert_eq!(*seen.lock(), Some(b));
	}

	#[test]
	fn lookup_or_register_returns_published_without_storing() {
		let registry = NameRegistry::new();
		let key = NameKey::new("leader", "");
		let a = registry.publish(named(1, "leader"));
		let fired = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&fired);

		let got = registry.lookup_or_register_callback(&key, move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		assert_eq!(got, Some(a));
		assert_eq!(registry.pending_count(&key), 0);
		assert_eq!(fired.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn drop_entry_keeps_replacement_and_pending() {
		let registry = NameRegistry::new();
		let key = NameKey::new("leader", "");
		let old = named(1, "leader");
		let new = named(2, "leader");
		registry.publish(old.clone());
		registry.publish(new.clone());

		assert!(!registry.drop_entry(&old));
		assert_eq!(registry.lookup(&key), Some(new.clone()));
		assert!(registry.drop_entry(&new));
		assert_eq!(registry.lookup(&key), None);

		let _ = registry.lookup_or_register_callback(&key, |_| {});
		let again = named(3, "leader");
		registry.publish(again.clone());
		assert!(registry.drop_entry(&again));
		assert_eq!(registry.pending_count(&key), 0);
	}

	#[test]
	fn callback_may_reenter_registry() {
		let registry = Arc::new(NameRegistry::new());
		let key = NameKey::new("leader", "");
		let inner = Arc::clone(&registry);
		let follower = named(7, "follower");
		let to_publish = follower.clone();
		registry.lookup_or_register_callback(&key, move |_| {
			inner.publish(to_publish);
		});

		registry.publish(named(1, "leader"));
		assert_eq!(registry.lookup(&NameKey::new("follower", "")), Some(follower));
	}
}
