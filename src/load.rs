//! Reads existing live trees back into virtual ones, so that a driver can take over server-rendered or otherwise pre-existing content.

use crate::{
	facts::Fact,
	node::Node,
	platform::{Platform, Shape},
};
use tracing::{instrument, trace};

/// Builds a virtual tree matching the live tree at `node`.
///
/// Only text, elements and their attributes are recovered. Other live nodes (comments, for example) load as empty text,
/// which keeps the child positions aligned so that the first update can patch them away.
#[instrument(skip(platform, node))]
pub fn virtualize<P: Platform<Msg>, Msg>(platform: &P, node: &P::Node) -> Node<Msg> {
	match platform.inspect(node) {
		Shape::Text(text) => Node::text(text),
		Shape::Element { tag, namespace, attributes } => {
			let facts = load_attributes(attributes);
			let children = (0..platform.child_count(node)).filter_map(|i| platform.child_at(node, i)).map(|child| virtualize(platform, &child));
			match namespace {
				Some(namespace) => Node::element_ns(namespace, tag, facts, children),
				None => Node::element(tag, facts, children),
			}
		}
		Shape::Other => {
			trace!("Loading unrecognised live node as empty text.");
			Node::text("")
		}
	}
}

fn load_attributes<Msg>(attributes: Vec<(String, String)>) -> impl Iterator<Item = Fact<Msg>> {
	attributes.into_iter().map(|(name, value)| Fact::attribute(name, value))
}
