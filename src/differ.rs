use crate::{
	config::Config,
	diff::diff_with,
	event::{Chain, Handler, Listener},
	facts::{Facts, FactsDiff},
	node::Node,
	patch::Patch,
	platform::{NodeKey, Platform},
	Error,
};
use core::fmt;
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

/// Engine-side bookkeeping for one live node.
pub(crate) struct Slot<Msg> {
	/// Chain records of the wrapper runs directly above the node, outermost first.
	pub(crate) chains: Vec<Chain<Msg>>,
	/// `None` until the first listener is added.
	pub(crate) listeners: Option<HashMap<String, Rc<Listener<Msg>>>>,
}

impl<Msg> Default for Slot<Msg> {
	fn default() -> Self {
		Self { chains: Vec::new(), listeners: None }
	}
}

/// Renders virtual trees into a [`Platform`] and keeps them up to date.
///
/// # Correct Use
///
/// Every live node the [`DomDiffer`] creates must only be mutated through it (or by a [`Widget`](`crate::node::Widget`) it manages).
/// The `old` tree passed to [`update`](`DomDiffer::update`) must be the tree the live nodes were last rendered or updated from.
///
/// Violations are detected on a best-effort basis and reported as [`Error`]s, after which the live tree should be considered lost.
pub struct DomDiffer<P: Platform<Msg>, Msg> {
	platform: P,
	config: Config,
	sink: Chain<Msg>,
	pub(crate) slots: HashMap<NodeKey, Slot<Msg>>,
}

impl<P: Platform<Msg>, Msg> DomDiffer<P, Msg> {
	/// `sink` receives every message produced by event handlers in trees this instance renders.
	/// Its second argument requests a synchronous repaint.
	pub fn new(platform: P, sink: impl Fn(Msg, bool) + 'static) -> Self {
		Self::with_config(platform, Config::default(), sink)
	}

	pub fn with_config(platform: P, config: Config, sink: impl Fn(Msg, bool) + 'static) -> Self {
		Self {
			platform,
			config,
			sink: Chain::sink(sink),
			slots: HashMap::new(),
		}
	}

	#[must_use]
	pub fn platform(&self) -> &P {
		&self.platform
	}

	pub fn platform_mut(&mut self) -> &mut P {
		&mut self.platform
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The root record of the event dispatch chain.
	#[must_use]
	pub fn sink(&self) -> &Chain<Msg> {
		&self.sink
	}

	/// Computes the patches turning `old` into `new`.
	#[must_use]
	pub fn diff(&self, old: &Node<Msg>, new: &Node<Msg>) -> Vec<Patch<Msg>> {
		diff_with(&self.config, old, new)
	}

	/// Updates the live tree at `root`, which was rendered from `old`, to match `new`.
	///
	/// Returns the (possibly replaced) live root.
	///
	/// # Errors
	///
	/// Iff the live tree turns out not to match `old`. It may be partially patched in that case.
	#[instrument(skip(self, root, old, new), err)]
	pub fn update(&mut self, root: &P::Node, old: &Node<Msg>, new: &Node<Msg>) -> Result<P::Node, Error> {
		let patches = self.diff(old, new);
		if patches.is_empty() {
			trace!("Nothing to do.");
			return Ok(root.clone());
		}

		let bound = self.locate(root, old, patches)?;
		let root = self.apply(root, bound)?;
		trace!("Tracking {} live node(s).", self.slots.len());
		Ok(root)
	}

	pub(crate) fn slot_mut(&mut self, node: &P::Node) -> &mut Slot<Msg> {
		let key = self.platform.assign_key(node);
		self.slots.entry(key).or_default()
	}

	pub(crate) fn slot(&self, node: &P::Node) -> Option<&Slot<Msg>> {
		self.platform.node_key(node).and_then(|key| self.slots.get(&key))
	}

	/// Applies all facts of a freshly created node.
	pub(crate) fn render_facts(&mut self, node: &P::Node, facts: &Facts<Msg>, chain: &Chain<Msg>) -> Result<(), Error> {
		for (name, value) in &facts.styles {
			self.platform.set_style(node, name, value);
		}
		for (name, value) in &facts.attributes {
			self.platform.set_attribute(node, name, Some(value));
		}
		for (name, (namespace, value)) in &facts.namespaced {
			self.platform.set_attribute_ns(node, namespace, name, Some(value));
		}
		for (name, value) in &facts.properties {
			self.platform.set_property(node, name, value);
		}
		for (category, bucket) in &facts.other {
			for (name, value) in bucket {
				self.platform.set_extension(node, category, name, Some(value));
			}
		}
		for (name, handler) in &facts.events {
			self.set_event(node, name, Some(handler.clone()), chain, 0)?;
		}
		Ok(())
	}

	/// Applies a [`FactsDiff`] to an existing node.
	pub(crate) fn patch_facts(&mut self, node: &P::Node, diff: &FactsDiff<Msg>, chain: &Chain<Msg>, index: usize) -> Result<(), Error> {
		let span = trace_span!("Patching facts", index, changes = diff.len());
		let _enter = span.enter();

		// Attributes go first, so that dropping a loaded `style` attribute doesn't clobber styles set below.
		for (name, value) in &diff.attributes {
			self.platform.set_attribute(node, name, value.as_deref());
		}
		for (name, (namespace, value)) in &diff.namespaced {
			self.platform.set_attribute_ns(node, namespace, name, value.as_deref());
		}
		for (name, value) in &diff.styles {
			self.platform.set_style(node, name, value);
		}
		for (name, value) in &diff.properties {
			self.set_property(node, name, value);
		}
		for (category, bucket) in &diff.other {
			for (name, value) in bucket {
				self.platform.set_extension(node, category, name, value.as_ref());
			}
		}
		for (name, handler) in &diff.events {
			self.set_event(node, name, handler.clone(), chain, index)?;
		}
		Ok(())
	}

	fn set_property(&mut self, node: &P::Node, name: &str, value: &Value) {
		// Writing these resets cursor position and the like even if unchanged.
		if matches!(name, "value" | "checked") && self.platform.property(node, name).as_ref() == Some(value) {
			return trace!("Live {:?} is already current.", name);
		}
		self.platform.set_property(node, name, value);
	}

	/// Adds, swaps or removes (`None`) the listener for `event`.
	///
	/// Handlers of the same kind are swapped into the existing listener. The host registration is only touched when the kind changes.
	fn set_event(&mut self, node: &P::Node, event: &str, handler: Option<Handler<Msg>>, chain: &Chain<Msg>, index: usize) -> Result<(), Error> {
		let Some(handler) = handler else {
			let removed = self
				.platform
				.node_key(node)
				.and_then(|key| self.slots.get_mut(&key))
				.and_then(|slot| slot.listeners.as_mut())
				.and_then(|listeners| listeners.remove(event))
				.ok_or_else(|| Error::MissingListenerTable { index, event: event.to_owned() })?;
			self.platform.remove_listener(node, event, &removed);
			return Ok(());
		};

		let passive = self.config.passive_listeners && handler.kind().may_be_passive();
		let key = self.platform.assign_key(node);
		let listeners = self.slots.entry(key).or_default().listeners.get_or_insert_with(HashMap::new);

		if let Some(existing) = listeners.get(event) {
			if existing.kind() == handler.kind() {
				trace!("Swapping handler for {:?}.", event);
				existing.swap(handler);
				return Ok(());
			}
		}

		let listener = Rc::new(Listener::new(handler, chain.clone()));
		if let Some(replaced) = listeners.insert(event.to_owned(), Rc::clone(&listener)) {
			self.platform.remove_listener(node, event, &replaced);
		}
		self.platform.add_listener(node, event, &listener, passive);
		Ok(())
	}

	/// Forgets the bookkeeping of a detached subtree and unregisters its listeners.
	pub(crate) fn release(&mut self, node: &P::Node) {
		let mut stack = vec![node.clone()];
		let mut freed = 0_usize;
		while let Some(node) = stack.pop() {
			if let Some(slot) = self.platform.node_key(&node).and_then(|key| self.slots.remove(&key)) {
				for (event, listener) in slot.listeners.iter().flatten() {
					self.platform.remove_listener(&node, event, listener);
					freed += 1;
				}
			}
			stack.extend((0..self.platform.child_count(&node)).filter_map(|i| self.platform.child_at(&node, i)));
		}
		trace!("Freed {} event listener(s).", freed);
	}
}

impl<P: Platform<Msg> + fmt::Debug, Msg> fmt::Debug for DomDiffer<P, Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DomDiffer")
			.field("platform", &self.platform)
			.field("config", &self.config)
			.field("slots", &self.slots.len())
			.finish()
	}
}
