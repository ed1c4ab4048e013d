use crate::{
	event::Chain,
	node::{Kind, Node},
	platform::Platform,
	DomDiffer, Error,
};
use tracing::{instrument, trace, trace_span};

struct Work<N, Msg> {
	node: Node<Msg>,
	parent: Option<N>,
	chain: Chain<Msg>,
	/// Wrapper chain records collected since the last live node.
	attach: Vec<Chain<Msg>>,
}

impl<P: Platform<Msg>, Msg> DomDiffer<P, Msg> {
	/// Creates the live tree for `node`, with event handlers dispatching straight to the sink.
	///
	/// # Errors
	///
	/// Iff the platform rejects an element or a [`Widget`](`crate::node::Widget`) renders something foreign.
	pub fn render(&mut self, node: &Node<Msg>) -> Result<P::Node, Error> {
		let chain = self.sink().clone();
		self.render_attached(node, &chain, Vec::new())
	}

	/// Renders `node` below `chain`, attaching `attach` as the outermost wrapper records of its live root.
	///
	/// Works iteratively, so arbitrarily deep trees don't exhaust the stack.
	#[instrument(skip(self, node, chain, attach))]
	pub(crate) fn render_attached(&mut self, node: &Node<Msg>, chain: &Chain<Msg>, attach: Vec<Chain<Msg>>) -> Result<P::Node, Error> {
		let mut root = None;
		let mut stack = vec![Work {
			node: node.clone(),
			parent: None,
			chain: chain.clone(),
			attach,
		}];

		while let Some(Work { node, parent, chain, mut attach }) = stack.pop() {
			let created = match node.kind() {
				Kind::Wrapped(_) => {
					let (transforms, inner) = node.unwrap_wrappers();
					let chain = chain.wrap(transforms);
					attach.push(chain.clone());
					stack.push(Work {
						node: inner.clone(),
						parent,
						chain,
						attach,
					});
					continue;
				}

				Kind::Memo(memo) => {
					stack.push(Work {
						node: memo.force().clone(),
						parent,
						chain,
						attach,
					});
					continue;
				}

				Kind::Text(text) => self.platform_mut().create_text(text),

				Kind::Element(element) => {
					let span = trace_span!("Rendering element", tag = %element.tag);
					let _enter = span.enter();
					let created = self.platform_mut().create_element(&element.tag, element.namespace.as_deref())?;
					self.render_facts(&created, &element.facts, &chain)?;
					for child in element.children.iter().rev() {
						stack.push(Work {
							node: child.clone(),
							parent: Some(created.clone()),
							chain: chain.clone(),
							attach: Vec::new(),
						});
					}
					created
				}

				Kind::Keyed(keyed) => {
					let span = trace_span!("Rendering keyed element", tag = %keyed.tag);
					let _enter = span.enter();
					let created = self.platform_mut().create_element(&keyed.tag, keyed.namespace.as_deref())?;
					self.render_facts(&created, &keyed.facts, &chain)?;
					for (_, child) in keyed.children.iter().rev() {
						stack.push(Work {
							node: child.clone(),
							parent: Some(created.clone()),
							chain: chain.clone(),
							attach: Vec::new(),
						});
					}
					created
				}

				Kind::Managed(managed) => {
					let raw = managed.widget.render(&*managed.state);
					let created = self.platform_mut().adopt(raw).ok_or(Error::ForeignManagedNode)?;
					self.render_facts(&created, &managed.facts, &chain)?;
					created
				}
			};

			if !attach.is_empty() {
				trace!("Attaching {} wrapper chain(s).", attach.len());
				self.slot_mut(&created).chains = attach;
			}

			match parent {
				Some(parent) => self.platform_mut().append_child(&parent, &created),
				None => root = Some(created),
			}
		}

		root.ok_or_else(|| Error::host("rendering produced no live node"))
	}
}
