use crate::platform::NodeKey;
use hashbrown::{hash_map::Entry, HashMap};
use tracing::{trace, warn};
use wasm_bindgen::closure::Closure;

/// Owns the JavaScript closures registered as event listeners, one per live node and event name.
///
/// Dropping a [`Closure`] invalidates it, so each must stay here until it has been unregistered.
#[derive(Default)]
pub(crate) struct ClosureMap {
	closures: HashMap<(NodeKey, String), Closure<dyn Fn(web_sys::Event)>>,
}

impl ClosureMap {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Stores `closure` and returns a reference to pass to `addEventListener`.
	///
	/// Any closure previously published for the same node and event is returned as well,
	/// so the caller can unregister it before it is dropped.
	pub(crate) fn publish(&mut self, key: NodeKey, event: &str, closure: Closure<dyn Fn(web_sys::Event)>) -> (&Closure<dyn Fn(web_sys::Event)>, Option<Closure<dyn Fn(web_sys::Event)>>) {
		match self.closures.entry((key, event.to_owned())) {
			Entry::Vacant(vacant) => {
				trace!("Created Closure.");
				(vacant.insert(closure), None)
			}
			Entry::Occupied(occupied) => {
				warn!("Replacing a published {:?} closure that was never unpublished.", event);
				let mut occupied = occupied;
				let previous = occupied.insert(closure);
				(occupied.into_mut(), Some(previous))
			}
		}
	}

	/// Takes back the closure for `key` and `event`. It must be unregistered before the return value is dropped.
	pub(crate) fn unpublish(&mut self, key: NodeKey, event: &str) -> Option<Closure<dyn Fn(web_sys::Event)>> {
		let closure = self.closures.remove(&(key, event.to_owned()));
		if closure.is_some() {
			trace!("Destroyed Closure.");
		}
		closure
	}

	pub(crate) fn len(&self) -> usize {
		self.closures.len()
	}
}
