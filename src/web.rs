//! The browser [`Platform`], over [`web_sys`].
//!
//! Live node keys are stored on the JavaScript node objects themselves, so they survive
//! round trips through `childNodes` and the like.

use crate::{
	closure_map::ClosureMap,
	driver::FrameScheduler,
	event::{Listener, NativeEvent},
	platform::{NodeKey, Platform, Shape},
	Error,
};
use core::{any::Any, fmt};
use js_sys::{Reflect, JSON};
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{AddEventListenerOptions, CharacterData, CssStyleDeclaration, Document, Element, Node};

const KEY_PROPERTY: &str = "__arbor_key";
const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Renders into a [`Document`].
pub struct WebDom<Msg> {
	document: Document,
	closures: ClosureMap,
	next_key: NodeKey,
	_phantom: core::marker::PhantomData<fn(Msg)>,
}

impl<Msg> fmt::Debug for WebDom<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDom").field("closures", &self.closures.len()).field("next_key", &self.next_key).finish()
	}
}

impl<Msg> WebDom<Msg> {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self {
			document,
			closures: ClosureMap::new(),
			next_key: 0,
			_phantom: core::marker::PhantomData,
		}
	}

	/// Uses the current window's document.
	///
	/// # Errors
	///
	/// Iff there is no window or it has no document.
	pub fn for_window() -> Result<Self, Error> {
		let document = web_sys::window().and_then(|window| window.document()).ok_or_else(|| Error::host("no document found for the current window"))?;
		Ok(Self::new(document))
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

fn log_failure<T>(operation: &str, result: Result<T, JsValue>) {
	if let Err(error) = result {
		error!("{} failed: {:?}", operation, error);
	}
}

#[allow(clippy::cast_precision_loss)]
fn key_to_js(key: NodeKey) -> JsValue {
	JsValue::from_f64(key as f64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn key_from_js(value: &JsValue) -> Option<NodeKey> {
	value.as_f64().map(|key| key as NodeKey)
}

fn to_js(value: &Value) -> JsValue {
	match value {
		Value::Null => JsValue::NULL,
		Value::Bool(bool) => JsValue::from_bool(*bool),
		Value::Number(number) => number.as_f64().map_or(JsValue::NULL, JsValue::from_f64),
		Value::String(string) => JsValue::from_str(string),
		complex => JSON::parse(&complex.to_string()).unwrap_or_else(|error| {
			error!("Failed to convert complex value: {:?}", error);
			JsValue::UNDEFINED
		}),
	}
}

fn from_js(value: &JsValue) -> Value {
	if let Some(string) = value.as_string() {
		Value::String(string)
	} else if let Some(bool) = value.as_bool() {
		Value::Bool(bool)
	} else if let Some(number) = value.as_f64() {
		serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
	} else if value.is_null() || value.is_undefined() || value.is_function() {
		Value::Null
	} else {
		JSON::stringify(value)
			.ok()
			.and_then(|json| json.as_string())
			.and_then(|json| serde_json::from_str(&json).ok())
			.unwrap_or(Value::Null)
	}
}

fn style_of(node: &Node) -> Option<CssStyleDeclaration> {
	Reflect::get(node, &JsValue::from_str("style")).ok()?.dyn_into().ok()
}

/// A native event as seen by [`Handler`](`crate::event::Handler`) decoders.
pub struct WebEvent(pub web_sys::Event);

impl NativeEvent for WebEvent {
	fn value_at(&self, path: &[&str]) -> Option<Value> {
		let mut value: JsValue = self.0.clone().into();
		for segment in path {
			value = Reflect::get(&value, &JsValue::from_str(segment)).ok()?;
			if value.is_undefined() {
				return None;
			}
		}
		Some(from_js(&value))
	}
}

impl<Msg: 'static> Platform<Msg> for WebDom<Msg> {
	type Node = Node;

	fn create_text(&mut self, text: &str) -> Node {
		self.document.create_text_node(text).into()
	}

	fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> Result<Node, Error> {
		let element = match namespace {
			Some(namespace) => self.document.create_element_ns(Some(namespace), tag),
			None => self.document.create_element(tag),
		};
		element.map(Into::into).map_err(|error| Error::host(format!("creating <{}> failed: {:?}", tag, error)))
	}

	fn create_fragment(&mut self) -> Node {
		self.document.create_document_fragment().into()
	}

	fn set_text(&mut self, node: &Node, text: &str) {
		match node.dyn_ref::<CharacterData>() {
			Some(data) => data.set_data(text),
			None => error!("Tried to set text on a non-text node."),
		}
	}

	fn set_attribute(&mut self, node: &Node, name: &str, value: Option<&str>) {
		let Some(element) = node.dyn_ref::<Element>() else {
			return error!("Tried to set attribute {:?} on a non-element.", name);
		};
		match value {
			Some(value) => log_failure("setAttribute", element.set_attribute(name, value)),
			None => log_failure("removeAttribute", element.remove_attribute(name)),
		}
	}

	fn set_attribute_ns(&mut self, node: &Node, namespace: &str, name: &str, value: Option<&str>) {
		let Some(element) = node.dyn_ref::<Element>() else {
			return error!("Tried to set attribute {:?} on a non-element.", name);
		};
		match value {
			Some(value) => log_failure("setAttributeNS", element.set_attribute_ns(Some(namespace), name, value)),
			None => log_failure("removeAttributeNS", element.remove_attribute_ns(Some(namespace), name)),
		}
	}

	fn set_style(&mut self, node: &Node, name: &str, value: &str) {
		let Some(style) = style_of(node) else {
			return error!("Node has no style declaration.");
		};
		if value.is_empty() {
			log_failure("style.removeProperty", style.remove_property(name));
		} else {
			log_failure("style.setProperty", style.set_property(name, value));
		}
	}

	fn set_property(&mut self, node: &Node, name: &str, value: &Value) {
		log_failure("property assignment", Reflect::set(node, &JsValue::from_str(name), &to_js(value)));
	}

	fn property(&self, node: &Node, name: &str) -> Option<Value> {
		Reflect::get(node, &JsValue::from_str(name)).ok().map(|value| from_js(&value))
	}

	fn add_listener(&mut self, node: &Node, event: &str, listener: &Rc<Listener<Msg>>, passive: bool) {
		let key = self.assign_key(node);
		let listener = Rc::clone(listener);
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let propagation = listener.handle(&WebEvent(event.clone()));
			if propagation.stop_propagation {
				event.stop_propagation();
			}
			if propagation.prevent_default {
				event.prevent_default();
			}
		}) as Box<dyn Fn(web_sys::Event)>);

		let options = AddEventListenerOptions::new();
		options.set_passive(passive);

		let (published, previous) = self.closures.publish(key, event, closure);
		log_failure(
			"addEventListener",
			node.add_event_listener_with_callback_and_add_event_listener_options(event, published.as_ref().unchecked_ref(), &options),
		);
		if let Some(previous) = previous {
			log_failure("removeEventListener", node.remove_event_listener_with_callback(event, previous.as_ref().unchecked_ref()));
		}
	}

	fn remove_listener(&mut self, node: &Node, event: &str, _listener: &Rc<Listener<Msg>>) {
		let Some(key) = self.node_key(node) else {
			return error!("Tried to remove a {:?} listener from an untracked node.", event);
		};
		match self.closures.unpublish(key, event) {
			Some(closure) => log_failure("removeEventListener", node.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())),
			None => warn!("No published closure for {:?} on node {}.", event, key),
		}
	}

	fn append_child(&mut self, parent: &Node, child: &Node) {
		log_failure("appendChild", parent.append_child(child));
	}

	fn insert_before(&mut self, parent: &Node, child: &Node, reference: Option<&Node>) {
		log_failure("insertBefore", parent.insert_before(child, reference));
	}

	fn remove_child(&mut self, parent: &Node, child: &Node) {
		log_failure("removeChild", parent.remove_child(child));
	}

	fn replace_child(&mut self, parent: &Node, new: &Node, old: &Node) {
		log_failure("replaceChild", parent.replace_child(new, old));
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	#[allow(clippy::cast_possible_truncation)]
	fn child_at(&self, node: &Node, index: usize) -> Option<Node> {
		node.child_nodes().get(index as u32)
	}

	fn child_count(&self, node: &Node) -> usize {
		node.child_nodes().length() as usize
	}

	fn node_key(&self, node: &Node) -> Option<NodeKey> {
		Reflect::get(node, &JsValue::from_str(KEY_PROPERTY)).ok().as_ref().and_then(key_from_js)
	}

	fn assign_key(&mut self, node: &Node) -> NodeKey {
		if let Some(key) = <Self as Platform<Msg>>::node_key(self, node) {
			return key;
		}
		self.next_key += 1;
		let key = self.next_key;
		log_failure("key assignment", Reflect::set(node, &JsValue::from_str(KEY_PROPERTY), &key_to_js(key)));
		trace!("Assigned key {}.", key);
		key
	}

	fn inspect(&self, node: &Node) -> Shape {
		match node.node_type() {
			Node::TEXT_NODE => Shape::Text(node.text_content().unwrap_or_default()),
			Node::ELEMENT_NODE => {
				let Some(element) = node.dyn_ref::<Element>() else {
					return Shape::Other;
				};
				let attributes = element.attributes();
				Shape::Element {
					tag: element.local_name(),
					namespace: element.namespace_uri().filter(|namespace| namespace != XHTML_NAMESPACE),
					attributes: (0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| (attribute.name(), attribute.value())).collect(),
				}
			}
			_ => Shape::Other,
		}
	}

	fn adopt(&mut self, raw: Box<dyn Any>) -> Option<Node> {
		match raw.downcast::<Node>() {
			Ok(node) => Some(*node),
			Err(raw) => raw.downcast::<Element>().ok().map(|element| (*element).into()),
		}
	}
}

/// Schedules [`Animator`](`crate::driver::Animator`) frames with `requestAnimationFrame`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnimationFrames;

impl FrameScheduler for AnimationFrames {
	fn request_frame(&self, callback: Box<dyn FnOnce()>) {
		let Some(window) = web_sys::window() else {
			return error!("No window to request an animation frame from.");
		};
		let callback = Closure::once_into_js(move || callback());
		log_failure("requestAnimationFrame", window.request_animation_frame(callback.unchecked_ref()));
	}
}
