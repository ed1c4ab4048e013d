//! Attributes, styles, properties and event handlers of an element, organized by category.

use crate::event::Handler;
use core::fmt;
use hashbrown::HashMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// The bucket a [`Fact`] is sorted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
	Event,
	Style,
	Attribute,
	NamespacedAttribute,
	Property,
	/// Kept verbatim and forwarded to [`Platform::set_extension`](`crate::Platform::set_extension`).
	Other(String),
}

/// One unorganized input item.
pub enum Fact<Msg> {
	Event { name: String, handler: Handler<Msg> },
	Style { name: String, value: String },
	Attribute { name: String, value: String },
	NamespacedAttribute { namespace: String, name: String, value: String },
	Property { name: String, value: Value },
	Other { category: String, name: String, value: Value },
}

impl<Msg> Fact<Msg> {
	pub fn on(name: impl Into<String>, handler: Handler<Msg>) -> Self {
		Self::Event { name: name.into(), handler }
	}

	pub fn style(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Style {
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Attribute {
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn class(value: impl Into<String>) -> Self {
		Self::attribute("class", value)
	}

	pub fn attribute_ns(namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::NamespacedAttribute {
			namespace: namespace.into(),
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn property(name: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Property {
			name: name.into(),
			value: value.into(),
		}
	}

	pub fn other(category: impl Into<String>, name: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Other {
			category: category.into(),
			name: name.into(),
			value: value.into(),
		}
	}

	#[must_use]
	pub fn category(&self) -> Category {
		match self {
			Self::Event { .. } => Category::Event,
			Self::Style { .. } => Category::Style,
			Self::Attribute { .. } => Category::Attribute,
			Self::NamespacedAttribute { .. } => Category::NamespacedAttribute,
			Self::Property { .. } => Category::Property,
			Self::Other { category, .. } => Category::Other(category.clone()),
		}
	}
}

/// Organized facts of one node.
pub struct Facts<Msg> {
	pub events: HashMap<String, Handler<Msg>>,
	pub styles: HashMap<String, String>,
	pub attributes: HashMap<String, String>,
	/// name → (namespace, value)
	pub namespaced: HashMap<String, (String, String)>,
	pub properties: HashMap<String, Value>,
	pub other: HashMap<String, HashMap<String, Value>>,
}

fn add_class(classes: &mut String, class: &str) {
	if !classes.is_empty() {
		classes.push(' ');
	}
	classes.push_str(class);
}

impl<Msg> Facts<Msg> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			events: HashMap::new(),
			styles: HashMap::new(),
			attributes: HashMap::new(),
			namespaced: HashMap::new(),
			properties: HashMap::new(),
			other: HashMap::new(),
		}
	}

	/// Sorts `facts` into buckets. Later facts overwrite earlier ones, except that `class` attributes and `className` properties accumulate.
	pub fn organize(facts: impl IntoIterator<Item = Fact<Msg>>) -> Self {
		let mut organized = Self::new();
		for fact in facts {
			match fact {
				Fact::Event { name, handler } => {
					organized.events.insert(name, handler);
				}
				Fact::Style { name, value } => {
					organized.styles.insert(name, value);
				}
				Fact::Attribute { name, value } if name == "class" => add_class(organized.attributes.entry(name).or_default(), &value),
				Fact::Attribute { name, value } => {
					organized.attributes.insert(name, value);
				}
				Fact::NamespacedAttribute { namespace, name, value } => {
					organized.namespaced.insert(name, (namespace, value));
				}
				Fact::Property { name, value: Value::String(class) } if name == "className" => {
					match organized.properties.entry(name).or_insert_with(|| Value::String(String::new())) {
						Value::String(classes) => add_class(classes, &class),
						other => *other = Value::String(class),
					}
				}
				Fact::Property { name, value } => {
					organized.properties.insert(name, value);
				}
				Fact::Other { category, name, value } => {
					organized.other.entry(category).or_default().insert(name, value);
				}
			}
		}
		organized
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.attributes.is_empty() && self.namespaced.is_empty() && self.properties.is_empty() && self.other.is_empty()
	}
}

impl<Msg> Default for Facts<Msg> {
	fn default() -> Self {
		Self::new()
	}
}

impl<Msg> Clone for Facts<Msg> {
	fn clone(&self) -> Self {
		Self {
			events: self.events.clone(),
			styles: self.styles.clone(),
			attributes: self.attributes.clone(),
			namespaced: self.namespaced.clone(),
			properties: self.properties.clone(),
			other: self.other.clone(),
		}
	}
}

impl<Msg> fmt::Debug for Facts<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Facts");
		debug.field("events", &self.events.keys().collect::<Vec<_>>());
		if cfg!(feature = "dangerous-logging") {
			debug
				.field("styles", &self.styles)
				.field("attributes", &self.attributes)
				.field("namespaced", &self.namespaced)
				.field("properties", &self.properties)
				.field("other", &self.other);
		} else {
			debug
				.field("styles", &self.styles.keys().collect::<Vec<_>>())
				.field("attributes", &self.attributes.keys().collect::<Vec<_>>())
				.field("namespaced", &self.namespaced.keys().collect::<Vec<_>>())
				.field("properties", &self.properties.keys().collect::<Vec<_>>())
				.field("other", &self.other.keys().collect::<Vec<_>>());
		}
		debug.finish()
	}
}

/// Changes between two [`Facts`]. `None` values mean removal.
///
/// Styles are removed by setting them to the empty string.
/// Removed properties are reset to `""` if their old value was a string and to `null` otherwise.
pub struct FactsDiff<Msg> {
	pub events: BTreeMap<String, Option<Handler<Msg>>>,
	pub styles: BTreeMap<String, String>,
	pub attributes: BTreeMap<String, Option<String>>,
	pub namespaced: BTreeMap<String, (String, Option<String>)>,
	pub properties: BTreeMap<String, Value>,
	pub other: BTreeMap<String, BTreeMap<String, Option<Value>>>,
}

impl<Msg> FactsDiff<Msg> {
	fn new() -> Self {
		Self {
			events: BTreeMap::new(),
			styles: BTreeMap::new(),
			attributes: BTreeMap::new(),
			namespaced: BTreeMap::new(),
			properties: BTreeMap::new(),
			other: BTreeMap::new(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.attributes.is_empty() && self.namespaced.is_empty() && self.properties.is_empty() && self.other.is_empty()
	}

	/// Number of individual changes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.events.len() + self.styles.len() + self.attributes.len() + self.namespaced.len() + self.properties.len() + self.other.values().map(BTreeMap::len).sum::<usize>()
	}
}

impl<Msg> fmt::Debug for FactsDiff<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("FactsDiff");
		debug.field("events", &self.events);
		if cfg!(feature = "dangerous-logging") {
			debug
				.field("styles", &self.styles)
				.field("attributes", &self.attributes)
				.field("namespaced", &self.namespaced)
				.field("properties", &self.properties)
				.field("other", &self.other);
		} else {
			debug.field("changes", &self.len());
		}
		debug.finish()
	}
}

fn diff_bucket<V, D>(old: &HashMap<String, V>, new: &HashMap<String, V>, out: &mut BTreeMap<String, D>, same: impl Fn(&V, &V) -> bool, removed: impl Fn(&V) -> D, added: impl Fn(&V) -> D) {
	for (name, old_value) in old {
		match new.get(name) {
			None => {
				out.insert(name.clone(), removed(old_value));
			}
			Some(new_value) if same(old_value, new_value) => (),
			Some(new_value) => {
				out.insert(name.clone(), added(new_value));
			}
		}
	}
	for (name, new_value) in new {
		if !old.contains_key(name) {
			out.insert(name.clone(), added(new_value));
		}
	}
}

/// Computes the changes needed to turn `old` into `new`, if any.
pub fn diff_facts<Msg>(old: &Facts<Msg>, new: &Facts<Msg>) -> Option<FactsDiff<Msg>> {
	let mut diff = FactsDiff::new();

	diff_bucket(&old.events, &new.events, &mut diff.events, Handler::same, |_| None, |handler| Some(handler.clone()));
	diff_bucket(&old.styles, &new.styles, &mut diff.styles, PartialEq::eq, |_| String::new(), Clone::clone);
	diff_bucket(&old.attributes, &new.attributes, &mut diff.attributes, PartialEq::eq, |_| None, |value| Some(value.clone()));
	diff_bucket(
		&old.namespaced,
		&new.namespaced,
		&mut diff.namespaced,
		PartialEq::eq,
		|(namespace, _)| (namespace.clone(), None),
		|(namespace, value)| (namespace.clone(), Some(value.clone())),
	);
	diff_bucket(
		&old.properties,
		&new.properties,
		&mut diff.properties,
		PartialEq::eq,
		|value| match value {
			Value::String(_) => Value::String(String::new()),
			_ => Value::Null,
		},
		Clone::clone,
	);

	let empty = HashMap::new();
	for (category, old_bucket) in &old.other {
		let mut bucket = BTreeMap::new();
		diff_bucket(old_bucket, new.other.get(category).unwrap_or(&empty), &mut bucket, PartialEq::eq, |_| None, |value| Some(value.clone()));
		if !bucket.is_empty() {
			diff.other.insert(category.clone(), bucket);
		}
	}
	for (category, new_bucket) in &new.other {
		if !old.other.contains_key(category) {
			diff.other.insert(category.clone(), new_bucket.iter().map(|(name, value)| (name.clone(), Some(value.clone()))).collect());
		}
	}

	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}
