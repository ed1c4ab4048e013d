use crate::{
	event::Chain,
	patch::{BoundPatch, Entry, Move, PatchKind, Reconcile, Status, Target},
	platform::Platform,
	DomDiffer, Error,
};
use tracing::{instrument, trace, trace_span, warn};

/// Live nodes detached by keyed moves, by ledger entry.
type Moves<N> = Vec<Option<N>>;

impl<P: Platform<Msg>, Msg> DomDiffer<P, Msg> {
	/// Applies located patches in order. Returns the (possibly replaced) live root.
	///
	/// # Errors
	///
	/// Iff the patches are inconsistent with the live tree.
	#[instrument(skip(self, root, patches), fields(patches = patches.len()))]
	pub fn apply(&mut self, root: &P::Node, patches: Vec<BoundPatch<P::Node, Msg>>) -> Result<P::Node, Error> {
		self.apply_all(root, patches, None)
	}

	fn apply_all(&mut self, root: &P::Node, patches: Vec<BoundPatch<P::Node, Msg>>, mut moves: Option<&mut Moves<P::Node>>) -> Result<P::Node, Error> {
		let mut root = root.clone();
		for patch in patches {
			let is_root = patch.target.node == root;
			let replaced = self.apply_patch(patch, moves.as_deref_mut())?;
			if is_root {
				root = replaced;
			}
		}
		Ok(root)
	}

	/// Returns the node now standing in for the patch target.
	fn apply_patch(&mut self, patch: BoundPatch<P::Node, Msg>, moves: Option<&mut Moves<P::Node>>) -> Result<P::Node, Error> {
		let index = patch.index;
		let Target { node, chain, layer } = patch.target;
		let span = trace_span!("Applying patch", kind = patch.kind.name(), index);
		let _enter = span.enter();

		match patch.kind {
			PatchKind::FullReplace(vnode) => {
				let outer: Vec<_> = self.slot(&node).map(|slot| slot.chains.iter().take(layer).cloned().collect()).unwrap_or_default();
				let created = self.render_attached(&vnode, &chain, outer)?;
				if let Some(parent) = self.platform().parent(&node) {
					self.platform_mut().replace_child(&parent, &created, &node);
				}
				self.release(&node);
				Ok(created)
			}

			PatchKind::PatchFacts(diff) => {
				self.patch_facts(&node, &diff, &chain, index)?;
				Ok(node)
			}

			PatchKind::ChangeText(text) => {
				self.platform_mut().set_text(&node, &text);
				Ok(node)
			}

			PatchKind::DescendMemo(patches) => self.apply_all(&node, patches, None),

			PatchKind::RebindWrapper(transforms) => {
				let record = self.slot(&node).and_then(|slot| slot.chains.get(layer)).ok_or(Error::MissingEventChain { index })?;
				record.rebind(transforms);
				Ok(node)
			}

			PatchKind::RemoveTrailing { keep, count } => {
				for _ in 0..count {
					let child = self.platform().child_at(&node, keep).ok_or(Error::MissingChild { index, position: keep })?;
					self.platform_mut().remove_child(&node, &child);
					self.release(&child);
				}
				Ok(node)
			}

			PatchKind::AppendRange { from, nodes } => {
				let found = self.platform().child_count(&node);
				if found != from {
					return Err(Error::ChildCountMismatch { index, expected: from, found });
				}
				let fragment = self.platform_mut().create_fragment();
				for vnode in &nodes {
					let created = self.render_attached(vnode, &chain, Vec::new())?;
					self.platform_mut().append_child(&fragment, &created);
				}
				self.platform_mut().append_child(&node, &fragment);
				Ok(node)
			}

			PatchKind::PatchManaged(patch) => {
				let raw = patch(Box::new(node.clone()));
				let patched = self.platform_mut().adopt(raw).ok_or(Error::ForeignManagedNode)?;
				if patched != node {
					trace!("Managed node was replaced by its widget.");
					if let Some(parent) = self.platform().parent(&node) {
						self.platform_mut().replace_child(&parent, &patched, &node);
					}
					self.release(&node);
				}
				Ok(patched)
			}

			PatchKind::ReconcileKeyed(reconcile) => {
				self.apply_reconcile(&node, reconcile, &chain)?;
				Ok(node)
			}

			PatchKind::RemoveKeyed(removal) => {
				let Some(moves) = moves else {
					return Err(Error::StrayKeyedRemoval { index });
				};
				if let Some(parent) = self.platform().parent(&node) {
					self.platform_mut().remove_child(&parent, &node);
				} else {
					warn!("Keyed child at index {} was already detached.", index);
				}

				match removal {
					None => self.release(&node),
					Some(Move { entry, patches }) => {
						let moved = self.apply_all(&node, patches, None)?;
						if let Some(slot) = moves.get_mut(entry) {
							*slot = Some(moved);
						}
					}
				}
				Ok(node)
			}
		}
	}

	fn apply_reconcile(&mut self, parent: &P::Node, reconcile: Reconcile<Msg, Target<P::Node, Msg>>, chain: &Chain<Msg>) -> Result<(), Error> {
		let Reconcile { patches, inserts, end_inserts, entries } = reconcile;
		let mut moves: Moves<P::Node> = vec![None; entries.len()];
		self.apply_all(parent, patches, Some(&mut moves))?;

		for insert in inserts {
			let live = self.resolve_entry(insert.entry, &entries, &mut moves, chain)?;
			let reference = self.platform().child_at(parent, insert.position);
			self.platform_mut().insert_before(parent, &live, reference.as_ref());
		}

		if !end_inserts.is_empty() {
			let fragment = self.platform_mut().create_fragment();
			for entry in end_inserts {
				let live = self.resolve_entry(entry, &entries, &mut moves, chain)?;
				self.platform_mut().append_child(&fragment, &live);
			}
			self.platform_mut().append_child(parent, &fragment);
		}
		Ok(())
	}

	/// The live node to insert for a ledger entry: the detached one for moves, a fresh one otherwise.
	fn resolve_entry(&mut self, id: usize, entries: &[Entry<Msg>], moves: &mut Moves<P::Node>, chain: &Chain<Msg>) -> Result<P::Node, Error> {
		let entry = entries.get(id).ok_or(Error::UnresolvedMove { key: id.to_string() })?;
		match entry.status {
			Status::New => self.render_attached(&entry.node, chain, Vec::new()),
			Status::Matched => moves.get_mut(id).and_then(Option::take).ok_or_else(|| Error::UnresolvedMove { key: entry.key.clone() }),
			Status::Removed => Err(Error::UnresolvedMove { key: entry.key.clone() }),
		}
	}
}
