use crate::{event::Listener, Error};
use core::any::Any;
use serde_json::Value;
use std::rc::Rc;
use tracing::trace;

/// Stable identity of a live node, used to find engine-side bookkeeping (event chains and listener tables).
pub type NodeKey = u64;

/// What [`virtualize`](`crate::load::virtualize`) can see of a live node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		attributes: Vec<(String, String)>,
	},
	Other,
}

/// A retained, DOM-like tree host.
///
/// Mutators don't report failures: hosts are expected to log them, as the engine can't recover from them anyway.
pub trait Platform<Msg> {
	/// A handle to a live node. Equality must be identity.
	type Node: Clone + PartialEq + 'static;

	fn create_text(&mut self, text: &str) -> Self::Node;
	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Result<Self::Node, Error>;
	fn create_fragment(&mut self) -> Self::Node;

	fn set_text(&mut self, node: &Self::Node, text: &str);

	/// `None` removes the attribute.
	fn set_attribute(&mut self, node: &Self::Node, name: &str, value: Option<&str>);
	/// `None` removes the attribute.
	fn set_attribute_ns(&mut self, node: &Self::Node, namespace: &str, name: &str, value: Option<&str>);
	/// An empty `value` removes the style.
	fn set_style(&mut self, node: &Self::Node, name: &str, value: &str);
	fn set_property(&mut self, node: &Self::Node, name: &str, value: &Value);
	fn property(&self, node: &Self::Node, name: &str) -> Option<Value>;

	/// Receives facts of categories the engine doesn't know. `None` removes.
	fn set_extension(&mut self, node: &Self::Node, category: &str, name: &str, value: Option<&Value>) {
		let _ = (node, value);
		trace!("Ignoring fact {:?} of unknown category {:?}.", name, category);
	}

	fn add_listener(&mut self, node: &Self::Node, event: &str, listener: &Rc<Listener<Msg>>, passive: bool);
	fn remove_listener(&mut self, node: &Self::Node, event: &str, listener: &Rc<Listener<Msg>>);

	/// Appending a fragment moves its children instead.
	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
	fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>);
	fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node);
	fn replace_child(&mut self, parent: &Self::Node, new: &Self::Node, old: &Self::Node);

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_at(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;
	fn child_count(&self, node: &Self::Node) -> usize;

	/// The node's key, if it has been assigned one.
	fn node_key(&self, node: &Self::Node) -> Option<NodeKey>;
	fn assign_key(&mut self, node: &Self::Node) -> NodeKey;

	fn inspect(&self, node: &Self::Node) -> Shape;

	/// Recovers a live node from a [`Widget`](`crate::node::Widget`)'s output.
	fn adopt(&mut self, raw: Box<dyn Any>) -> Option<Self::Node> {
		raw.downcast::<Self::Node>().ok().map(|node| *node)
	}
}
