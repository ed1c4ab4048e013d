//! Event handlers, the event dispatch chain and the listeners that connect them to live nodes.
//!
//! A [`Listener`] lives on exactly one live node. When the host fires an event, the listener runs
//! its current [`Handler`]'s decoder, threads the decoded message through every enclosing
//! [`Chain`] record's transforms (innermost first) and finally hands it to the dispatch sink.

use core::{cell::RefCell, fmt, mem};
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace_span};

/// Read access to a native event object.
pub trait NativeEvent {
	/// Looks up a (primitive) value by property path, e.g. `["target", "value"]`.
	fn value_at(&self, path: &[&str]) -> Option<Value>;
}

impl NativeEvent for Value {
	fn value_at(&self, path: &[&str]) -> Option<Value> {
		path.iter().try_fold(self, |value, segment| value.get(*segment)).cloned()
	}
}

/// Why a native event could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
	#[error("missing field at {path}")]
	MissingField { path: String },

	#[error("expected {expected} at {path}, found {found}")]
	UnexpectedType { path: String, expected: &'static str, found: Value },

	#[error("{0}")]
	Failure(String),
}

impl DecodeError {
	pub fn failure(message: impl Into<String>) -> Self {
		Self::Failure(message.into())
	}
}

fn required(event: &dyn NativeEvent, path: &[&str]) -> Result<Value, DecodeError> {
	event.value_at(path).ok_or_else(|| DecodeError::MissingField { path: path.join(".") })
}

pub fn string_at(event: &dyn NativeEvent, path: &[&str]) -> Result<String, DecodeError> {
	match required(event, path)? {
		Value::String(string) => Ok(string),
		found => Err(DecodeError::UnexpectedType { path: path.join("."), expected: "a string", found }),
	}
}

pub fn bool_at(event: &dyn NativeEvent, path: &[&str]) -> Result<bool, DecodeError> {
	match required(event, path)? {
		Value::Bool(bool) => Ok(bool),
		found => Err(DecodeError::UnexpectedType { path: path.join("."), expected: "a boolean", found }),
	}
}

pub fn f64_at(event: &dyn NativeEvent, path: &[&str]) -> Result<f64, DecodeError> {
	let value = required(event, path)?;
	value.as_f64().ok_or_else(|| DecodeError::UnexpectedType {
		path: path.join("."),
		expected: "a number",
		found: value,
	})
}

pub type Decoder<T> = Rc<dyn Fn(&dyn NativeEvent) -> Result<T, DecodeError>>;

/// The result of a [`Handler::Custom`] decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Custom<Msg> {
	pub message: Msg,
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

/// What to do with a native event besides dispatching a message.
pub enum Handler<Msg> {
	Normal(Decoder<Msg>),
	/// Decodes to `(message, stop_propagation)`.
	MayStopPropagation(Decoder<(Msg, bool)>),
	/// Decodes to `(message, prevent_default)`.
	MayPreventDefault(Decoder<(Msg, bool)>),
	Custom(Decoder<Custom<Msg>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
	Normal,
	MayStopPropagation,
	MayPreventDefault,
	Custom,
}

impl HandlerKind {
	/// Listeners that can never call `preventDefault` may be registered as passive.
	#[must_use]
	pub fn may_be_passive(self) -> bool {
		matches!(self, Self::Normal | Self::MayStopPropagation)
	}
}

impl<Msg> Handler<Msg> {
	pub fn normal(decoder: impl Fn(&dyn NativeEvent) -> Result<Msg, DecodeError> + 'static) -> Self {
		Self::Normal(Rc::new(decoder))
	}

	pub fn may_stop_propagation(decoder: impl Fn(&dyn NativeEvent) -> Result<(Msg, bool), DecodeError> + 'static) -> Self {
		Self::MayStopPropagation(Rc::new(decoder))
	}

	pub fn may_prevent_default(decoder: impl Fn(&dyn NativeEvent) -> Result<(Msg, bool), DecodeError> + 'static) -> Self {
		Self::MayPreventDefault(Rc::new(decoder))
	}

	pub fn custom(decoder: impl Fn(&dyn NativeEvent) -> Result<Custom<Msg>, DecodeError> + 'static) -> Self {
		Self::Custom(Rc::new(decoder))
	}

	#[must_use]
	pub fn kind(&self) -> HandlerKind {
		match self {
			Self::Normal(_) => HandlerKind::Normal,
			Self::MayStopPropagation(_) => HandlerKind::MayStopPropagation,
			Self::MayPreventDefault(_) => HandlerKind::MayPreventDefault,
			Self::Custom(_) => HandlerKind::Custom,
		}
	}

	/// Same kind and the very same decoder.
	#[must_use]
	pub fn same(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Normal(a), Self::Normal(b)) => same_rc(a, b),
			(Self::MayStopPropagation(a), Self::MayStopPropagation(b)) | (Self::MayPreventDefault(a), Self::MayPreventDefault(b)) => same_rc(a, b),
			(Self::Custom(a), Self::Custom(b)) => same_rc(a, b),
			_ => false,
		}
	}

	fn decode(&self, event: &dyn NativeEvent) -> Result<Custom<Msg>, DecodeError> {
		Ok(match self {
			Self::Normal(decoder) => Custom {
				message: decoder(event)?,
				stop_propagation: false,
				prevent_default: false,
			},
			Self::MayStopPropagation(decoder) => {
				let (message, stop_propagation) = decoder(event)?;
				Custom {
					message,
					stop_propagation,
					prevent_default: false,
				}
			}
			Self::MayPreventDefault(decoder) => {
				let (message, prevent_default) = decoder(event)?;
				Custom {
					message,
					stop_propagation: false,
					prevent_default,
				}
			}
			Self::Custom(decoder) => decoder(event)?,
		})
	}
}

impl<Msg> Clone for Handler<Msg> {
	fn clone(&self) -> Self {
		match self {
			Self::Normal(decoder) => Self::Normal(Rc::clone(decoder)),
			Self::MayStopPropagation(decoder) => Self::MayStopPropagation(Rc::clone(decoder)),
			Self::MayPreventDefault(decoder) => Self::MayPreventDefault(Rc::clone(decoder)),
			Self::Custom(decoder) => Self::Custom(Rc::clone(decoder)),
		}
	}
}

impl<Msg> fmt::Debug for Handler<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Handler::{:?}", self.kind())
	}
}

/// Compares the data addresses of two `Rc`s, ignoring vtables.
pub(crate) fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
	core::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

pub type Transform<Msg> = Rc<dyn Fn(Msg) -> Msg>;

/// Transforms of one collapsed run of wrappers, outermost first.
pub type Transforms<Msg> = Vec<Transform<Msg>>;

pub(crate) fn same_transforms<Msg>(a: &[Transform<Msg>], b: &[Transform<Msg>]) -> bool {
	a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_rc(a, b))
}

/// The dispatch sink. The flag is set when the handler stopped propagation, which drivers treat as a request to paint synchronously.
pub type Sink<Msg> = Rc<dyn Fn(Msg, bool)>;

enum Link<Msg> {
	Sink(Sink<Msg>),
	Transform { transforms: RefCell<Transforms<Msg>>, parent: Chain<Msg> },
}

/// One record of the event dispatch chain.
///
/// Records only point towards the sink, never at live nodes.
pub struct Chain<Msg>(Rc<Link<Msg>>);

impl<Msg> Chain<Msg> {
	pub fn sink(sink: impl Fn(Msg, bool) + 'static) -> Self {
		Self(Rc::new(Link::Sink(Rc::new(sink))))
	}

	/// Creates a child record applying `transforms` before handing messages to `self`.
	#[must_use]
	pub fn wrap(&self, transforms: Transforms<Msg>) -> Self {
		Self(Rc::new(Link::Transform {
			transforms: RefCell::new(transforms),
			parent: self.clone(),
		}))
	}

	/// Swaps this record's transforms, affecting every listener below it at once.
	///
	/// Returns `false` for the sink record, which has no transforms.
	pub fn rebind(&self, next: Transforms<Msg>) -> bool {
		match &*self.0 {
			Link::Sink(_) => false,
			Link::Transform { transforms, .. } => {
				drop(mem::replace(&mut *transforms.borrow_mut(), next));
				true
			}
		}
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Threads `message` through all transforms up to the sink.
	pub fn dispatch(&self, mut message: Msg, sync: bool) {
		let mut link = Rc::clone(&self.0);
		loop {
			let next = match &*link {
				Link::Sink(sink) => return sink(message, sync),
				Link::Transform { transforms, parent } => {
					let transforms = transforms.borrow().clone();
					for transform in transforms.iter().rev() {
						message = transform(message);
					}
					Rc::clone(&parent.0)
				}
			};
			link = next;
		}
	}

	fn depth(&self) -> usize {
		let mut depth = 0;
		let mut link = &self.0;
		while let Link::Transform { parent, .. } = &**link {
			depth += 1;
			link = &parent.0;
		}
		depth
	}
}

impl<Msg> Clone for Chain<Msg> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<Msg> fmt::Debug for Chain<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Chain").field("depth", &self.depth()).finish()
	}
}

/// What the host should do with the native event after a listener ran.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

/// The callback a host registers for one event name on one live node.
///
/// The handler can be swapped without touching the host registration as long as its kind stays the same.
pub struct Listener<Msg> {
	handler: RefCell<Handler<Msg>>,
	chain: Chain<Msg>,
}

impl<Msg> Listener<Msg> {
	pub(crate) fn new(handler: Handler<Msg>, chain: Chain<Msg>) -> Self {
		Self {
			handler: RefCell::new(handler),
			chain,
		}
	}

	#[must_use]
	pub fn kind(&self) -> HandlerKind {
		self.handler.borrow().kind()
	}

	pub(crate) fn swap(&self, handler: Handler<Msg>) {
		*self.handler.borrow_mut() = handler;
	}

	/// Decodes `event` and dispatches the resulting message. Undecodable events are dropped.
	pub fn handle(&self, event: &dyn NativeEvent) -> Propagation {
		let span = trace_span!("Listener::handle", kind = ?self.kind());
		let _enter = span.enter();

		let handler = self.handler.borrow().clone();
		match handler.decode(event) {
			Ok(Custom {
				message,
				stop_propagation,
				prevent_default,
			}) => {
				self.chain.dispatch(message, stop_propagation);
				Propagation {
					stop_propagation,
					prevent_default,
				}
			}
			Err(error) => {
				debug!("Dropping event that failed to decode: {}", error);
				Propagation::default()
			}
		}
	}
}

impl<Msg> fmt::Debug for Listener<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener").field("kind", &self.kind()).field("chain", &self.chain).finish()
	}
}
