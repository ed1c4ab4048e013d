//! An in-memory [`Platform`], for tests and headless rendering.
//!
//! [`MemoryDom`] follows DOM semantics where the engine can observe them: inserting an attached
//! node moves it, inserting a fragment moves the fragment's children, and listeners bubble.

use crate::{
	event::{Listener, NativeEvent, Propagation},
	platform::{NodeKey, Platform, Shape},
	Error,
};
use core::{cell::RefCell, fmt, fmt::Write as _};
use hashbrown::HashMap;
use serde_json::Value;
use std::{
	collections::BTreeMap,
	rc::{Rc, Weak},
};
use tracing::{error, trace, trace_span};

enum Data {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		attributes: BTreeMap<String, String>,
		/// name → (namespace, value)
		namespaced: BTreeMap<String, (String, String)>,
		styles: BTreeMap<String, String>,
		properties: BTreeMap<String, Value>,
		extensions: BTreeMap<(String, String), Value>,
	},
	Fragment,
}

struct Inner {
	key: Option<NodeKey>,
	data: Data,
	parent: Weak<RefCell<Inner>>,
	children: Vec<MemoryNode>,
}

/// A handle to a node of a [`MemoryDom`]. Equality is identity.
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<Inner>>);

impl PartialEq for MemoryNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for MemoryNode {}

impl fmt::Debug for MemoryNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.0.borrow();
		match &inner.data {
			Data::Text(_) => f.debug_struct("MemoryNode::Text").field("key", &inner.key).finish(),
			Data::Element { tag, .. } => f.debug_struct("MemoryNode::Element").field("key", &inner.key).field("tag", tag).field("children", &inner.children.len()).finish(),
			Data::Fragment => f.debug_struct("MemoryNode::Fragment").field("children", &inner.children.len()).finish(),
		}
	}
}

impl MemoryNode {
	fn new(data: Data) -> Self {
		Self(Rc::new(RefCell::new(Inner {
			key: None,
			data,
			parent: Weak::new(),
			children: Vec::new(),
		})))
	}

	#[must_use]
	pub fn children(&self) -> Vec<MemoryNode> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn parent(&self) -> Option<MemoryNode> {
		self.0.borrow().parent.upgrade().map(MemoryNode)
	}

	/// The text of a text node.
	#[must_use]
	pub fn text(&self) -> Option<String> {
		match &self.0.borrow().data {
			Data::Text(text) => Some(text.clone()),
			_ => None,
		}
	}

	#[must_use]
	pub fn tag(&self) -> Option<String> {
		match &self.0.borrow().data {
			Data::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		match &self.0.borrow().data {
			Data::Element { attributes, .. } => attributes.get(name).cloned(),
			_ => None,
		}
	}

	#[must_use]
	pub fn style(&self, name: &str) -> Option<String> {
		match &self.0.borrow().data {
			Data::Element { styles, .. } => styles.get(name).cloned(),
			_ => None,
		}
	}

	#[must_use]
	pub fn property(&self, name: &str) -> Option<Value> {
		match &self.0.borrow().data {
			Data::Element { properties, .. } => properties.get(name).cloned(),
			_ => None,
		}
	}

	/// Simulates user input by writing a property directly.
	pub fn set_property(&self, name: &str, value: Value) {
		if let Data::Element { properties, .. } = &mut self.0.borrow_mut().data {
			properties.insert(name.to_owned(), value);
		}
	}

	/// Serializes the subtree. Sorted, so two structurally equal subtrees produce the same markup.
	///
	/// Namespaced attributes print as `{namespace}name`, styles as `style:name` and properties as `.name=<JSON>`.
	#[must_use]
	pub fn to_markup(&self) -> String {
		let mut markup = String::new();
		self.write_markup(&mut markup);
		markup
	}

	fn write_markup(&self, out: &mut String) {
		let inner = self.0.borrow();
		match &inner.data {
			Data::Text(text) => out.push_str(&escape(text)),
			Data::Fragment => {
				for child in &inner.children {
					child.write_markup(out);
				}
			}
			Data::Element {
				tag,
				namespace,
				attributes,
				namespaced,
				styles,
				properties,
				extensions,
			} => {
				out.push('<');
				if let Some(namespace) = namespace {
					let _ = write!(out, "{{{}}}", namespace);
				}
				out.push_str(tag);
				for (name, value) in attributes {
					let _ = write!(out, " {}=\"{}\"", name, escape(value));
				}
				for (name, (namespace, value)) in namespaced {
					let _ = write!(out, " {{{}}}{}=\"{}\"", namespace, name, escape(value));
				}
				for (name, value) in styles {
					let _ = write!(out, " style:{}=\"{}\"", name, escape(value));
				}
				for (name, value) in properties {
					let _ = write!(out, " .{}={}", name, value);
				}
				for ((category, name), value) in extensions {
					let _ = write!(out, " {}:{}={}", category, name, value);
				}
				out.push('>');
				for child in &inner.children {
					child.write_markup(out);
				}
				let _ = write!(out, "</{}>", tag);
			}
		}
	}

	fn detach(&self) {
		let parent = self.0.borrow().parent.upgrade();
		if let Some(parent) = parent {
			parent.borrow_mut().children.retain(|child| child != self);
			self.0.borrow_mut().parent = Weak::new();
		}
	}

	/// The nodes actually inserted for `self`: its children if it's a fragment.
	fn take_insertable(&self) -> Vec<MemoryNode> {
		if matches!(self.0.borrow().data, Data::Fragment) {
			let children = core::mem::take(&mut self.0.borrow_mut().children);
			for child in &children {
				child.0.borrow_mut().parent = Weak::new();
			}
			children
		} else {
			self.detach();
			vec![self.clone()]
		}
	}

	fn insert_at(&self, position: usize, child: &MemoryNode) {
		let inserted = child.take_insertable();
		for node in &inserted {
			node.0.borrow_mut().parent = Rc::downgrade(&self.0);
		}
		let mut inner = self.0.borrow_mut();
		let position = position.min(inner.children.len());
		inner.children.splice(position..position, inserted);
	}

	fn position_of(&self, child: &MemoryNode) -> Option<usize> {
		self.0.borrow().children.iter().position(|c| c == child)
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('"', "&quot;")
}

/// An in-memory host.
///
/// Properties set to `null` or `""` are cleared, so a patched tree prints the same [markup](`MemoryNode::to_markup`) as a freshly rendered one.
pub struct MemoryDom<Msg> {
	next_key: NodeKey,
	listeners: HashMap<(NodeKey, String), (Rc<Listener<Msg>>, bool)>,
	added: usize,
	removed: usize,
}

impl<Msg> Default for MemoryDom<Msg> {
	fn default() -> Self {
		Self::new()
	}
}

impl<Msg> fmt::Debug for MemoryDom<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDom")
			.field("listeners", &self.listeners.len())
			.field("added", &self.added)
			.field("removed", &self.removed)
			.finish()
	}
}

impl<Msg> MemoryDom<Msg> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			next_key: 0,
			listeners: HashMap::new(),
			added: 0,
			removed: 0,
		}
	}

	/// A detached `<tag>` to mount trees into.
	#[must_use]
	pub fn container(tag: &str) -> MemoryNode {
		MemoryNode::new(Data::Element {
			tag: tag.to_owned(),
			namespace: None,
			attributes: BTreeMap::new(),
			namespaced: BTreeMap::new(),
			styles: BTreeMap::new(),
			properties: BTreeMap::new(),
			extensions: BTreeMap::new(),
		})
	}

	/// Currently registered listeners.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	/// Total host-level listener registrations so far.
	#[must_use]
	pub fn added_listeners(&self) -> usize {
		self.added
	}

	/// Total host-level listener removals so far.
	#[must_use]
	pub fn removed_listeners(&self) -> usize {
		self.removed
	}

	/// Whether the listener for `event` on `node` was registered as passive, if there is one.
	#[must_use]
	pub fn is_passive(&self, node: &MemoryNode, event: &str) -> Option<bool> {
		let key = node.0.borrow().key?;
		self.listeners.get(&(key, event.to_owned())).map(|(_, passive)| *passive)
	}

	/// Fires `event` at `target` and bubbles it towards the root until a listener stops propagation.
	pub fn dispatch(&self, target: &MemoryNode, event: &str, payload: &dyn NativeEvent) -> Propagation {
		let span = trace_span!("MemoryDom::dispatch", event);
		let _enter = span.enter();

		let mut result = Propagation::default();
		let mut current = Some(target.clone());
		while let Some(node) = current {
			let key = node.0.borrow().key;
			let listener = key.and_then(|key| self.listeners.get(&(key, event.to_owned()))).map(|(listener, _)| Rc::clone(listener));
			if let Some(listener) = listener {
				let propagation = listener.handle(payload);
				result.prevent_default |= propagation.prevent_default;
				if propagation.stop_propagation {
					result.stop_propagation = true;
					break;
				}
			}
			current = node.parent();
		}
		result
	}
}

impl<Msg> Platform<Msg> for MemoryDom<Msg> {
	type Node = MemoryNode;

	fn create_text(&mut self, text: &str) -> MemoryNode {
		MemoryNode::new(Data::Text(text.to_owned()))
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Result<MemoryNode, Error> {
		if tag.is_empty() || tag.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
			return Err(Error::host(format!("invalid tag name {:?}", tag)));
		}
		let node = Self::container(tag);
		if let Data::Element { namespace: slot, .. } = &mut node.0.borrow_mut().data {
			*slot = namespace.map(ToOwned::to_owned);
		}
		Ok(node)
	}

	fn create_fragment(&mut self) -> MemoryNode {
		MemoryNode::new(Data::Fragment)
	}

	fn set_text(&mut self, node: &MemoryNode, text: &str) {
		match &mut node.0.borrow_mut().data {
			Data::Text(current) => *current = text.to_owned(),
			_ => error!("Tried to set text on a non-text node."),
		}
	}

	fn set_attribute(&mut self, node: &MemoryNode, name: &str, value: Option<&str>) {
		if let Data::Element { attributes, .. } = &mut node.0.borrow_mut().data {
			match value {
				Some(value) => attributes.insert(name.to_owned(), value.to_owned()),
				None => attributes.remove(name),
			};
		}
	}

	fn set_attribute_ns(&mut self, node: &MemoryNode, namespace: &str, name: &str, value: Option<&str>) {
		if let Data::Element { namespaced, .. } = &mut node.0.borrow_mut().data {
			match value {
				Some(value) => namespaced.insert(name.to_owned(), (namespace.to_owned(), value.to_owned())),
				None => namespaced.remove(name),
			};
		}
	}

	fn set_style(&mut self, node: &MemoryNode, name: &str, value: &str) {
		if let Data::Element { styles, .. } = &mut node.0.borrow_mut().data {
			if value.is_empty() {
				styles.remove(name);
			} else {
				styles.insert(name.to_owned(), value.to_owned());
			}
		}
	}

	fn set_property(&mut self, node: &MemoryNode, name: &str, value: &Value) {
		if let Data::Element { properties, .. } = &mut node.0.borrow_mut().data {
			match value {
				Value::Null => properties.remove(name),
				Value::String(string) if string.is_empty() => properties.remove(name),
				value => properties.insert(name.to_owned(), value.clone()),
			};
		}
	}

	fn property(&self, node: &MemoryNode, name: &str) -> Option<Value> {
		node.property(name)
	}

	fn set_extension(&mut self, node: &MemoryNode, category: &str, name: &str, value: Option<&Value>) {
		if let Data::Element { extensions, .. } = &mut node.0.borrow_mut().data {
			let key = (category.to_owned(), name.to_owned());
			match value {
				Some(value) => extensions.insert(key, value.clone()),
				None => extensions.remove(&key),
			};
		}
	}

	fn add_listener(&mut self, node: &MemoryNode, event: &str, listener: &Rc<Listener<Msg>>, passive: bool) {
		let key = <Self as Platform<Msg>>::assign_key(self, node);
		trace!("Adding {:?} listener to node {}.", event, key);
		self.added += 1;
		self.listeners.insert((key, event.to_owned()), (Rc::clone(listener), passive));
	}

	fn remove_listener(&mut self, node: &MemoryNode, event: &str, listener: &Rc<Listener<Msg>>) {
		let key = node.0.borrow().key;
		match key.and_then(|key| self.listeners.remove(&(key, event.to_owned()))) {
			Some((registered, _)) if Rc::ptr_eq(&registered, listener) => self.removed += 1,
			Some(_) => error!("Removed a {:?} listener that was not the one registered.", event),
			None => error!("No {:?} listener to remove.", event),
		}
	}

	fn append_child(&mut self, parent: &MemoryNode, child: &MemoryNode) {
		let len = parent.0.borrow().children.len();
		parent.insert_at(len, child);
	}

	fn insert_before(&mut self, parent: &MemoryNode, child: &MemoryNode, reference: Option<&MemoryNode>) {
		let Some(reference) = reference else {
			return self.append_child(parent, child);
		};
		if reference == child {
			return;
		}
		// Detaching `child` may shift the reference's position.
		child.detach();
		match parent.position_of(reference) {
			Some(position) => parent.insert_at(position, child),
			None => error!("Reference node is not a child of the parent."),
		}
	}

	fn remove_child(&mut self, parent: &MemoryNode, child: &MemoryNode) {
		if child.parent().as_ref() == Some(parent) {
			child.detach();
		} else {
			error!("Tried to remove a node from a parent it doesn't belong to.");
		}
	}

	fn replace_child(&mut self, parent: &MemoryNode, new: &MemoryNode, old: &MemoryNode) {
		let Some(position) = parent.position_of(old) else {
			return error!("Tried to replace a node that isn't a child of the parent.");
		};
		old.detach();
		new.detach();
		let len = parent.0.borrow().children.len();
		parent.insert_at(position.min(len), new);
	}

	fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
		node.parent()
	}

	fn child_at(&self, node: &MemoryNode, index: usize) -> Option<MemoryNode> {
		node.0.borrow().children.get(index).cloned()
	}

	fn child_count(&self, node: &MemoryNode) -> usize {
		node.0.borrow().children.len()
	}

	fn node_key(&self, node: &MemoryNode) -> Option<NodeKey> {
		node.0.borrow().key
	}

	fn assign_key(&mut self, node: &MemoryNode) -> NodeKey {
		let mut inner = node.0.borrow_mut();
		*inner.key.get_or_insert_with(|| {
			self.next_key += 1;
			self.next_key
		})
	}

	fn inspect(&self, node: &MemoryNode) -> Shape {
		match &node.0.borrow().data {
			Data::Text(text) => Shape::Text(text.clone()),
			Data::Element { tag, namespace, attributes, .. } => Shape::Element {
				tag: tag.clone(),
				namespace: namespace.clone(),
				attributes: attributes.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
			},
			Data::Fragment => Shape::Other,
		}
	}
}
