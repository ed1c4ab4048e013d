//! The immutable virtual tree.
//!
//! [`Node`] is a reference-counted handle: cloning it is cheap, and two handles to the same
//! allocation short-circuit diffing entirely.

use crate::{
	event::{Transform, Transforms},
	facts::{Fact, Facts},
};
use core::{any::Any, cell::OnceCell, fmt};
use std::rc::Rc;

/// An externally controlled node. The engine only applies its facts and asks it for patches.
pub trait Widget {
	/// Creates the live node for `state`. The result must box a live node of the platform in use.
	fn render(&self, state: &dyn Any) -> Box<dyn Any>;

	/// Returns a patch turning the live node rendered for `old` into one for `new`, if one is needed.
	fn diff(&self, old: &dyn Any, new: &dyn Any) -> Option<ManagedPatch>;
}

/// Receives the boxed live node and returns the boxed (possibly replaced) live node.
pub type ManagedPatch = Rc<dyn Fn(Box<dyn Any>) -> Box<dyn Any>>;

pub struct Element<Msg> {
	pub tag: String,
	pub namespace: Option<String>,
	pub facts: Facts<Msg>,
	pub children: Vec<Node<Msg>>,
	size: usize,
}

pub struct KeyedElement<Msg> {
	pub tag: String,
	pub namespace: Option<String>,
	pub facts: Facts<Msg>,
	pub children: Vec<(String, Node<Msg>)>,
	size: usize,
}

pub struct Wrapped<Msg> {
	pub transform: Transform<Msg>,
	pub inner: Node<Msg>,
	size: usize,
}

pub struct Memo<Msg> {
	pub identity: Vec<Rc<dyn Any>>,
	/// The view function of [`Node::lazy`] memos.
	view: Option<*const ()>,
	compute: Box<dyn Fn() -> Node<Msg>>,
	cached: OnceCell<Node<Msg>>,
}

pub struct Managed<Msg> {
	pub facts: Facts<Msg>,
	pub state: Rc<dyn Any>,
	pub widget: Rc<dyn Widget>,
}

pub enum Kind<Msg> {
	Text(String),
	Element(Element<Msg>),
	Keyed(KeyedElement<Msg>),
	Wrapped(Wrapped<Msg>),
	Memo(Memo<Msg>),
	Managed(Managed<Msg>),
}

pub struct Node<Msg>(Rc<Kind<Msg>>);

impl<Msg> Clone for Node<Msg> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

fn descendants<'a, Msg: 'a>(children: impl ExactSizeIterator<Item = &'a Node<Msg>>) -> usize {
	children.len() + children.map(Node::size).sum::<usize>()
}

impl<Msg> Node<Msg> {
	fn new(kind: Kind<Msg>) -> Self {
		Self(Rc::new(kind))
	}

	pub fn text(text: impl Into<String>) -> Self {
		Self::new(Kind::Text(text.into()))
	}

	pub fn element(tag: impl Into<String>, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = Node<Msg>>) -> Self {
		Self::build_element(tag.into(), None, Facts::organize(facts), children.into_iter().collect())
	}

	pub fn element_ns(namespace: impl Into<String>, tag: impl Into<String>, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = Node<Msg>>) -> Self {
		Self::build_element(tag.into(), Some(namespace.into()), Facts::organize(facts), children.into_iter().collect())
	}

	fn build_element(tag: String, namespace: Option<String>, facts: Facts<Msg>, children: Vec<Node<Msg>>) -> Self {
		let size = descendants(children.iter());
		Self::new(Kind::Element(Element {
			tag,
			namespace,
			facts,
			children,
			size,
		}))
	}

	pub fn keyed<K: Into<String>>(tag: impl Into<String>, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = (K, Node<Msg>)>) -> Self {
		Self::build_keyed(tag.into(), None, facts, children)
	}

	pub fn keyed_ns<K: Into<String>>(
		namespace: impl Into<String>,
		tag: impl Into<String>,
		facts: impl IntoIterator<Item = Fact<Msg>>,
		children: impl IntoIterator<Item = (K, Node<Msg>)>,
	) -> Self {
		Self::build_keyed(tag.into(), Some(namespace.into()), facts, children)
	}

	fn build_keyed<K: Into<String>>(tag: String, namespace: Option<String>, facts: impl IntoIterator<Item = Fact<Msg>>, children: impl IntoIterator<Item = (K, Node<Msg>)>) -> Self {
		let children: Vec<_> = children.into_iter().map(|(key, node)| (key.into(), node)).collect();
		let size = descendants(children.iter().map(|(_, node)| node));
		Self::new(Kind::Keyed(KeyedElement {
			tag,
			namespace,
			facts: Facts::organize(facts),
			children,
			size,
		}))
	}

	/// Applies `transform` to every message produced below this node.
	#[must_use]
	pub fn map(self, transform: impl Fn(Msg) -> Msg + 'static) -> Self {
		self.map_with(Rc::new(transform))
	}

	/// Like [`map`](`Node::map`), but reuses an existing transform so that diffing can recognize it.
	#[must_use]
	pub fn map_with(self, transform: Transform<Msg>) -> Self {
		let size = 1 + self.size();
		Self::new(Kind::Wrapped(Wrapped { transform, inner: self, size }))
	}

	/// A node whose content is only recomputed (and diffed) when an `identity` reference changes.
	pub fn memo(identity: Vec<Rc<dyn Any>>, compute: impl Fn() -> Node<Msg> + 'static) -> Self {
		Self::new(Kind::Memo(Memo {
			identity,
			view: None,
			compute: Box::new(compute),
			cached: OnceCell::new(),
		}))
	}

	/// [`memo`](`Node::memo`) keyed on `view` and a single shared argument.
	///
	/// `view` is compared by address, so two call sites passing the same `argument` still diff against each other.
	pub fn lazy<A: 'static>(view: fn(&A) -> Node<Msg>, argument: Rc<A>) -> Self
	where
		Msg: 'static,
	{
		let identity: Rc<dyn Any> = argument.clone();
		Self::new(Kind::Memo(Memo {
			identity: vec![identity],
			view: Some(view as *const ()),
			compute: Box::new(move || view(&argument)),
			cached: OnceCell::new(),
		}))
	}

	pub fn managed(facts: impl IntoIterator<Item = Fact<Msg>>, state: Rc<dyn Any>, widget: Rc<dyn Widget>) -> Self {
		Self::new(Kind::Managed(Managed {
			facts: Facts::organize(facts),
			state,
			widget,
		}))
	}

	#[must_use]
	pub fn kind(&self) -> &Kind<Msg> {
		&self.0
	}

	/// Number of descendants in this node's index space.
	#[must_use]
	pub fn size(&self) -> usize {
		match self.kind() {
			Kind::Text(_) | Kind::Memo(_) | Kind::Managed(_) => 0,
			Kind::Element(element) => element.size,
			Kind::Keyed(keyed) => keyed.size,
			Kind::Wrapped(wrapped) => wrapped.size,
		}
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Collapses a run of nested wrappers.
	///
	/// Returns the transforms (outermost first) and the first node that isn't a wrapper.
	/// The number of transforms is the number of tree indices the run occupies.
	#[must_use]
	pub fn unwrap_wrappers(&self) -> (Transforms<Msg>, &Node<Msg>) {
		let mut transforms = Vec::new();
		let mut node = self;
		while let Kind::Wrapped(wrapped) = node.kind() {
			transforms.push(Rc::clone(&wrapped.transform));
			node = &wrapped.inner;
		}
		(transforms, node)
	}

	/// The same element without keys, sharing facts and children.
	#[must_use]
	pub(crate) fn dekey(keyed: &KeyedElement<Msg>) -> Self {
		Self::new(Kind::Element(Element {
			tag: keyed.tag.clone(),
			namespace: keyed.namespace.clone(),
			facts: keyed.facts.clone(),
			children: keyed.children.iter().map(|(_, node)| node.clone()).collect(),
			size: keyed.size,
		}))
	}
}

impl<Msg> Memo<Msg> {
	/// The content, computed on first use.
	pub fn force(&self) -> &Node<Msg> {
		self.cached.get_or_init(|| (self.compute)())
	}

	#[must_use]
	pub fn cached(&self) -> Option<&Node<Msg>> {
		self.cached.get()
	}

	/// Adopts a previous memo's content without computing.
	pub(crate) fn adopt(&self, content: &Node<Msg>) {
		// Already computed content is equally valid.
		let _ = self.cached.set(content.clone());
	}

	#[must_use]
	pub fn same_identity(&self, other: &Self) -> bool {
		self.view == other.view && self.identity.len() == other.identity.len() && self.identity.iter().zip(&other.identity).all(|(a, b)| crate::event::same_rc(a, b))
	}
}

impl<Msg> fmt::Debug for Node<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind() {
			Kind::Text(text) => {
				if cfg!(feature = "dangerous-logging") {
					f.debug_tuple("Text").field(text).finish()
				} else {
					f.debug_tuple("Text").field(&text.len()).finish()
				}
			}
			Kind::Element(element) => f
				.debug_struct("Element")
				.field("tag", &element.tag)
				.field("namespace", &element.namespace)
				.field("facts", &element.facts)
				.field("children", &element.children)
				.finish(),
			Kind::Keyed(keyed) => f
				.debug_struct("KeyedElement")
				.field("tag", &keyed.tag)
				.field("namespace", &keyed.namespace)
				.field("facts", &keyed.facts)
				.field("children", &keyed.children)
				.finish(),
			Kind::Wrapped(wrapped) => f.debug_struct("Wrapped").field("inner", &wrapped.inner).finish(),
			Kind::Memo(memo) => f
				.debug_struct("Memo")
				.field("identity", &memo.identity.len())
				.field("cached", &memo.cached.get())
				.finish(),
			Kind::Managed(managed) => f.debug_struct("Managed").field("facts", &managed.facts).finish(),
		}
	}
}
