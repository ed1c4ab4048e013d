//! The differencer: computes an ordered, index-tagged patch list between two trees.
//!
//! Indices are preorder positions in the old tree. A node at index `i` with `size` descendants
//! owns the indices `i..=i + size`, so sibling indices follow from the sizes alone.

use crate::{
	config::Config,
	event::{same_rc, same_transforms},
	facts::diff_facts,
	node::{Element, KeyedElement, Kind, Node},
	patch::{Entry, Insert, Move, Patch, PatchKind, Reconcile, Status},
};
use hashbrown::HashMap;
use tracing::{instrument, trace, trace_span, warn};

/// Appended to a key each time it collides with an occupied ledger entry.
const DUPLICATE_KEY_SUFFIX: &str = "\u{0}dup";

/// Diffs `old` against `new` with the default [`Config`].
pub fn diff<Msg>(old: &Node<Msg>, new: &Node<Msg>) -> Vec<Patch<Msg>> {
	diff_with(&Config::default(), old, new)
}

#[instrument(skip(old, new))]
pub fn diff_with<Msg>(config: &Config, old: &Node<Msg>, new: &Node<Msg>) -> Vec<Patch<Msg>> {
	let mut patches = Vec::new();
	Differ { depth_limit: config.depth_limit }.diff_help(old, new, &mut patches, 0, 0);
	trace!("Produced {} top-level patch(es).", patches.len());
	patches
}

struct Differ {
	depth_limit: usize,
}

struct LedgerEntry<Msg> {
	key: String,
	status: Status,
	node: Node<Msg>,
	/// Old-tree index of a removed node.
	index: usize,
	/// Position of the entry's `RemoveKeyed` patch in `Ledger::local`.
	removal: Option<usize>,
}

struct Ledger<Msg> {
	keys: HashMap<String, usize>,
	entries: Vec<LedgerEntry<Msg>>,
	local: Vec<Patch<Msg>>,
	inserts: Vec<Insert>,
	end_inserts: Vec<usize>,
}

impl<Msg> Ledger<Msg> {
	fn new() -> Self {
		Self {
			keys: HashMap::new(),
			entries: Vec::new(),
			local: Vec::new(),
			inserts: Vec::new(),
			end_inserts: Vec::new(),
		}
	}

	fn record_insert(&mut self, position: Option<usize>, entry: usize) {
		match position {
			Some(position) => self.inserts.push(Insert { position, entry }),
			None => self.end_inserts.push(entry),
		}
	}

	fn add(&mut self, key: String, status: Status, node: &Node<Msg>, index: usize, removal: Option<usize>) -> usize {
		let id = self.entries.len();
		self.entries.push(LedgerEntry {
			key: key.clone(),
			status,
			node: node.clone(),
			index,
			removal,
		});
		self.keys.insert(key, id);
		id
	}

	fn finish(self) -> Option<Reconcile<Msg>> {
		if self.local.is_empty() && self.inserts.is_empty() && self.end_inserts.is_empty() {
			return None;
		}
		Some(Reconcile {
			patches: self.local,
			inserts: self.inserts,
			end_inserts: self.end_inserts,
			entries: self.entries.into_iter().map(|LedgerEntry { key, status, node, .. }| Entry { key, status, node }).collect(),
		})
	}
}

impl Differ {
	fn diff_help<Msg>(&self, x: &Node<Msg>, y: &Node<Msg>, patches: &mut Vec<Patch<Msg>>, index: usize, depth: usize) {
		if x.ptr_eq(y) {
			return trace!("Identical node at index {}.", index);
		}

		if depth >= self.depth_limit {
			warn!("Depth limit reached at index {}. Replacing the subtree instead.", index);
			return patches.push(Patch::new(index, PatchKind::FullReplace(y.clone())));
		}

		match (x.kind(), y.kind()) {
			(Kind::Text(t_1), Kind::Text(t_2)) => {
				if t_1 != t_2 {
					patches.push(Patch::new(index, PatchKind::ChangeText(t_2.clone())));
				}
			}

			(Kind::Element(e_1), Kind::Element(e_2)) => self.diff_element(e_1, e_2, y, patches, index, depth),

			(Kind::Element(e_1), Kind::Keyed(k_2)) => {
				let span = trace_span!("De-keying new element", tag = %k_2.tag);
				let _enter = span.enter();
				let dekeyed = Node::dekey(k_2);
				if let Kind::Element(e_2) = dekeyed.kind() {
					self.diff_element(e_1, e_2, y, patches, index, depth);
				}
			}

			(Kind::Keyed(k_1), Kind::Keyed(k_2)) => self.diff_keyed(k_1, k_2, y, patches, index, depth),

			(Kind::Memo(m_1), Kind::Memo(m_2)) => {
				let span = trace_span!("Diffing memoized", index);
				let _enter = span.enter();
				if m_1.same_identity(m_2) {
					if let Some(content) = m_1.cached() {
						m_2.adopt(content);
					}
					return trace!("Identities matched. Skipping.");
				}

				let mut content_patches = Vec::new();
				self.diff_help(m_1.force(), m_2.force(), &mut content_patches, 0, depth + 1);
				if !content_patches.is_empty() {
					patches.push(Patch::new(index, PatchKind::DescendMemo(content_patches)));
				}
			}

			(Kind::Wrapped(_), Kind::Wrapped(_)) => {
				let (transforms_1, inner_1) = x.unwrap_wrappers();
				let (transforms_2, inner_2) = y.unwrap_wrappers();
				let span = trace_span!("Diffing wrapped", index, layers_1 = transforms_1.len(), layers_2 = transforms_2.len());
				let _enter = span.enter();

				if transforms_1.len() != transforms_2.len() {
					trace!("Wrapper nesting changed. Replacing.");
					return patches.push(Patch::new(index, PatchKind::FullReplace(y.clone())));
				}

				let layers = transforms_1.len();
				if !same_transforms(&transforms_1, &transforms_2) {
					patches.push(Patch::new(index, PatchKind::RebindWrapper(transforms_2)));
				}
				self.diff_help(inner_1, inner_2, patches, index + layers, depth + 1);
			}

			(Kind::Managed(m_1), Kind::Managed(m_2)) => {
				if !same_rc(&m_1.widget, &m_2.widget) {
					return patches.push(Patch::new(index, PatchKind::FullReplace(y.clone())));
				}
				if let Some(facts) = diff_facts(&m_1.facts, &m_2.facts) {
					patches.push(Patch::new(index, PatchKind::PatchFacts(facts)));
				}
				if let Some(patch) = m_2.widget.diff(&*m_1.state, &*m_2.state) {
					patches.push(Patch::new(index, PatchKind::PatchManaged(patch)));
				}
			}

			// Mismatching shapes: Destroy and rebuild.
			_ => {
				trace!("Mismatching node kinds at index {}. Replacing.", index);
				patches.push(Patch::new(index, PatchKind::FullReplace(y.clone())));
			}
		}
	}

	fn diff_element<Msg>(&self, e_1: &Element<Msg>, e_2: &Element<Msg>, y: &Node<Msg>, patches: &mut Vec<Patch<Msg>>, index: usize, depth: usize) {
		let span = trace_span!("Diffing element", tag = %e_1.tag, index);
		let _enter = span.enter();

		if e_1.tag != e_2.tag || e_1.namespace != e_2.namespace {
			trace!("Tag or namespace changed to <{}>. Replacing.", e_2.tag);
			return patches.push(Patch::new(index, PatchKind::FullReplace(y.clone())));
		}

		if let Some(facts) = diff_facts(&e_1.facts, &e_2.facts) {
			patches.push(Patch::new(index, PatchKind::PatchFacts(facts)));
		}

		let (len_1, len_2) = (e_1.children.len(), e_2.children.len());
		if len_1 > len_2 {
			patches.push(Patch::new(index, PatchKind::RemoveTrailing { keep: len_2, count: len_1 - len_2 }));
		} else if len_1 < len_2 {
			patches.push(Patch::new(
				index,
				PatchKind::AppendRange {
					from: len_1,
					nodes: e_2.children[len_1..].to_vec(),
				},
			));
		}

		let mut index = index;
		for (child_1, child_2) in e_1.children.iter().zip(&e_2.children) {
			index += 1;
			self.diff_help(child_1, child_2, patches, index, depth + 1);
			index += child_1.size();
		}
	}

	fn diff_keyed<Msg>(&self, k_1: &KeyedElement<Msg>, k_2: &KeyedElement<Msg>, y: &Node<Msg>, patches: &mut Vec<Patch<Msg>>, index: usize, depth: usize) {
		let span = trace_span!("Diffing keyed element", tag = %k_1.tag, index, "len_1" = k_1.children.len(), "len_2" = k_2.children.len());
		let _enter = span.enter();

		if k_1.tag != k_2.tag || k_1.namespace != k_2.namespace {
			trace!("Tag or namespace changed to <{}>. Replacing.", k_2.tag);
			return patches.push(Patch::new(index, PatchKind::FullReplace(y.clone())));
		}

		if let Some(facts) = diff_facts(&k_1.facts, &k_2.facts) {
			patches.push(Patch::new(index, PatchKind::PatchFacts(facts)));
		}

		if let Some(reconcile) = self.reconcile(&k_1.children, &k_2.children, index, depth + 1) {
			patches.push(Patch::new(index, PatchKind::ReconcileKeyed(reconcile)));
		}
	}

	/// Two cursors with a lookahead of exactly one child on each side.
	/// Anything the lookahead can't explain is removed and appended, with same-key pairs linked into moves.
	#[allow(clippy::similar_names)]
	fn reconcile<Msg>(&self, old: &[(String, Node<Msg>)], new: &[(String, Node<Msg>)], mut index: usize, depth: usize) -> Option<Reconcile<Msg>> {
		let mut ledger = Ledger::new();
		let (mut x, mut y) = (0, 0);

		while x < old.len() && y < new.len() {
			let (x_key, x_node) = &old[x];
			let (y_key, y_node) = &new[y];

			if x_key == y_key {
				index += 1;
				self.diff_help(x_node, y_node, &mut ledger.local, index, depth);
				index += x_node.size();
				x += 1;
				y += 1;
				continue;
			}

			let x_next = old.get(x + 1);
			let y_next = new.get(y + 1);
			let old_match = matches!(x_next, Some((key, _)) if key == y_key);
			let new_match = matches!(y_next, Some((key, _)) if key == x_key);

			match (x_next, y_next) {
				(Some((x_next_key, x_next_node)), Some((_, y_next_node))) if old_match && new_match => {
					trace!("Swapping {:?} and {:?}.", x_key, x_next_key);
					index += 1;
					self.diff_help(x_node, y_next_node, &mut ledger.local, index, depth);
					self.insert_node(&mut ledger, y_key, y_node, Some(y), depth);
					index += x_node.size();
					index += 1;
					self.remove_node(&mut ledger, x_next_key, x_next_node, index, depth);
					index += x_next_node.size();
					x += 2;
					y += 2;
				}

				(_, Some((_, y_next_node))) if new_match => {
					trace!("Inserting {:?}.", y_key);
					self.insert_node(&mut ledger, y_key, y_node, Some(y), depth);
					index += 1;
					self.diff_help(x_node, y_next_node, &mut ledger.local, index, depth);
					index += x_node.size();
					x += 1;
					y += 2;
				}

				(Some((_, x_next_node)), _) if old_match => {
					trace!("Removing {:?}.", x_key);
					index += 1;
					self.remove_node(&mut ledger, x_key, x_node, index, depth);
					index += x_node.size();
					index += 1;
					self.diff_help(x_next_node, y_node, &mut ledger.local, index, depth);
					index += x_next_node.size();
					x += 2;
					y += 1;
				}

				(Some((x_next_key, x_next_node)), Some((y_next_key, y_next_node))) if x_next_key == y_next_key => {
					trace!("Replacing {:?} with {:?}.", x_key, y_key);
					index += 1;
					self.remove_node(&mut ledger, x_key, x_node, index, depth);
					self.insert_node(&mut ledger, y_key, y_node, Some(y), depth);
					index += x_node.size();
					index += 1;
					self.diff_help(x_next_node, y_next_node, &mut ledger.local, index, depth);
					index += x_next_node.size();
					x += 2;
					y += 2;
				}

				_ => break,
			}
		}

		for (x_key, x_node) in &old[x..] {
			index += 1;
			self.remove_node(&mut ledger, x_key, x_node, index, depth);
			index += x_node.size();
		}

		for (y_key, y_node) in &new[y..] {
			self.insert_node(&mut ledger, y_key, y_node, None, depth);
		}

		ledger.finish()
	}

	/// `position: None` appends past the end of the old list.
	fn insert_node<Msg>(&self, ledger: &mut Ledger<Msg>, key: &str, node: &Node<Msg>, position: Option<usize>, depth: usize) {
		let mut key = key.to_owned();
		loop {
			match ledger.keys.get(&key).copied() {
				None => {
					let id = ledger.add(key, Status::New, node, 0, None);
					return ledger.record_insert(position, id);
				}

				Some(id) if ledger.entries[id].status == Status::Removed => {
					ledger.record_insert(position, id);
					let entry = &mut ledger.entries[id];
					trace!("Linking removed {:?} into a move.", entry.key);
					entry.status = Status::Matched;
					let mut patches = Vec::new();
					self.diff_help(&entry.node, node, &mut patches, entry.index, depth);
					entry.node = node.clone();
					if let Some(removal) = entry.removal {
						ledger.local[removal].kind = PatchKind::RemoveKeyed(Some(Move { entry: id, patches }));
					}
					return;
				}

				Some(_) => key.push_str(DUPLICATE_KEY_SUFFIX),
			}
		}
	}

	fn remove_node<Msg>(&self, ledger: &mut Ledger<Msg>, key: &str, node: &Node<Msg>, index: usize, depth: usize) {
		let mut key = key.to_owned();
		loop {
			match ledger.keys.get(&key).copied() {
				None => {
					let removal = ledger.local.len();
					ledger.local.push(Patch::new(index, PatchKind::RemoveKeyed(None)));
					ledger.add(key, Status::Removed, node, index, Some(removal));
					return;
				}

				Some(id) if ledger.entries[id].status == Status::New => {
					let entry = &mut ledger.entries[id];
					trace!("Linking inserted {:?} into a move.", entry.key);
					entry.status = Status::Matched;
					entry.index = index;
					entry.removal = Some(ledger.local.len());
					let mut patches = Vec::new();
					self.diff_help(node, &entry.node, &mut patches, index, depth);
					ledger.local.push(Patch::new(index, PatchKind::RemoveKeyed(Some(Move { entry: id, patches }))));
					return;
				}

				Some(_) => key.push_str(DUPLICATE_KEY_SUFFIX),
			}
		}
	}
}
