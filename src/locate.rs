//! Binds index-tagged patches to live nodes.
//!
//! Walks the old virtual tree and the live tree in lockstep, but only descends into subtrees
//! whose index range contains the next pending patch. The live tree must not have been mutated yet.

use crate::{
	event::Chain,
	node::{Kind, Node},
	patch::{BoundPatch, Move, Patch, PatchKind, Reconcile, Target},
	platform::Platform,
	DomDiffer, Error,
};
use core::iter::Peekable;
use std::vec;
use tracing::{instrument, trace};

type Queue<Msg> = Peekable<vec::IntoIter<Patch<Msg>>>;

impl<P: Platform<Msg>, Msg> DomDiffer<P, Msg> {
	/// Finds the live node for each of `patches`, which must have been diffed against `old`.
	///
	/// # Errors
	///
	/// Iff the live tree at `root` doesn't have the shape of `old`.
	#[instrument(skip(self, root, old, patches), fields(patches = patches.len()))]
	pub fn locate(&self, root: &P::Node, old: &Node<Msg>, patches: Vec<Patch<Msg>>) -> Result<Vec<BoundPatch<P::Node, Msg>>, Error> {
		let chain = self.sink().clone();
		self.locate_list(root, old, patches, 0, old.size(), &chain, 0)
	}

	#[allow(clippy::too_many_arguments)]
	fn locate_list(&self, dom: &P::Node, vnode: &Node<Msg>, patches: Vec<Patch<Msg>>, low: usize, high: usize, chain: &Chain<Msg>, layer: usize) -> Result<Vec<BoundPatch<P::Node, Msg>>, Error> {
		let mut queue = patches.into_iter().peekable();
		let mut out = Vec::with_capacity(queue.len());
		self.locate_help(dom, vnode, &mut queue, &mut out, low, high, chain, layer)?;
		match queue.next() {
			Some(leftover) => Err(Error::UnlocatedPatch { index: leftover.index }),
			None => Ok(out),
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn locate_help(
		&self,
		dom: &P::Node,
		vnode: &Node<Msg>,
		queue: &mut Queue<Msg>,
		out: &mut Vec<BoundPatch<P::Node, Msg>>,
		low: usize,
		high: usize,
		chain: &Chain<Msg>,
		layer: usize,
	) -> Result<(), Error> {
		while let Some(patch) = queue.next_if(|patch| patch.index == low) {
			trace!("Binding {} at index {}.", patch.name(), low);
			let bound = self.bind(patch, dom, vnode, low, high, chain, layer)?;
			out.push(bound);
		}

		if !pending_within(queue, high) {
			return Ok(());
		}

		match vnode.kind() {
			Kind::Wrapped(_) => {
				let (transforms, inner) = vnode.unwrap_wrappers();
				let inner_chain = self
					.slot(dom)
					.and_then(|slot| slot.chains.get(layer))
					.ok_or(Error::MissingEventChain { index: low })?
					.clone();
				self.locate_help(dom, inner, queue, out, low + transforms.len(), high, &inner_chain, layer + 1)
			}

			Kind::Element(element) => self.locate_children(dom, element.children.iter(), queue, out, low, high, chain),
			Kind::Keyed(keyed) => self.locate_children(dom, keyed.children.iter().map(|(_, child)| child), queue, out, low, high, chain),

			// No descendants in this index space.
			Kind::Text(_) | Kind::Memo(_) | Kind::Managed(_) => Ok(()),
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn locate_children<'a>(
		&self,
		dom: &P::Node,
		children: impl Iterator<Item = &'a Node<Msg>>,
		queue: &mut Queue<Msg>,
		out: &mut Vec<BoundPatch<P::Node, Msg>>,
		mut low: usize,
		high: usize,
		chain: &Chain<Msg>,
	) -> Result<(), Error>
	where
		Msg: 'a,
	{
		for (position, child) in children.enumerate() {
			low += 1;
			let next_low = low + child.size();
			if queue.peek().map_or(false, |patch| (low..=next_low).contains(&patch.index)) {
				let child_dom = self.platform().child_at(dom, position).ok_or(Error::MissingChild { index: low, position })?;
				self.locate_help(&child_dom, child, queue, out, low, next_low, chain, 0)?;
			}

			if !pending_within(queue, high) {
				return Ok(());
			}
			low = next_low;
		}
		Ok(())
	}

	#[allow(clippy::too_many_arguments)]
	fn bind(&self, patch: Patch<Msg>, dom: &P::Node, vnode: &Node<Msg>, low: usize, high: usize, chain: &Chain<Msg>, layer: usize) -> Result<BoundPatch<P::Node, Msg>, Error> {
		let Patch { index, kind, target: () } = patch;
		let kind = match kind {
			PatchKind::FullReplace(node) => PatchKind::FullReplace(node),
			PatchKind::PatchFacts(diff) => PatchKind::PatchFacts(diff),
			PatchKind::ChangeText(text) => PatchKind::ChangeText(text),
			PatchKind::RebindWrapper(transforms) => PatchKind::RebindWrapper(transforms),
			PatchKind::RemoveTrailing { keep, count } => PatchKind::RemoveTrailing { keep, count },
			PatchKind::AppendRange { from, nodes } => PatchKind::AppendRange { from, nodes },
			PatchKind::PatchManaged(patch) => PatchKind::PatchManaged(patch),

			PatchKind::DescendMemo(patches) => {
				let Kind::Memo(memo) = vnode.kind() else {
					return Err(Error::UnlocatedPatch { index });
				};
				let content = memo.cached().ok_or(Error::UncomputedMemo { index })?;
				PatchKind::DescendMemo(self.locate_list(dom, content, patches, 0, content.size(), chain, layer)?)
			}

			PatchKind::ReconcileKeyed(Reconcile { patches, inserts, end_inserts, entries }) => PatchKind::ReconcileKeyed(Reconcile {
				patches: self.locate_list(dom, vnode, patches, low, high, chain, layer)?,
				inserts,
				end_inserts,
				entries,
			}),

			PatchKind::RemoveKeyed(None) => PatchKind::RemoveKeyed(None),
			PatchKind::RemoveKeyed(Some(Move { entry, patches })) => PatchKind::RemoveKeyed(Some(Move {
				entry,
				patches: self.locate_list(dom, vnode, patches, low, high, chain, layer)?,
			})),
		};

		Ok(Patch {
			index,
			kind,
			target: Target {
				node: dom.clone(),
				chain: chain.clone(),
				layer,
			},
		})
	}
}

fn pending_within<Msg>(queue: &mut Queue<Msg>, high: usize) -> bool {
	queue.peek().map_or(false, |patch| patch.index <= high)
}
