//! Edit instructions produced by [`diff`](`crate::diff::diff`).
//!
//! A [`Patch`] targets a preorder index in the *old* tree. Lists are sorted by ascending index.
//! [`locate`](`crate::DomDiffer::locate`) turns `Patch<Msg>` into [`BoundPatch`]es by filling in the `target`.

use crate::{
	event::{Chain, Transforms},
	facts::FactsDiff,
	node::{ManagedPatch, Node},
};
use core::fmt;

pub struct Patch<Msg, T = ()> {
	pub index: usize,
	pub kind: PatchKind<Msg, T>,
	pub target: T,
}

/// Where a patch applies: the live node and the event chain in effect there.
pub struct Target<N, Msg> {
	pub node: N,
	pub chain: Chain<Msg>,
	/// How many of the live node's attached chain records belong to wrappers above this position.
	pub layer: usize,
}

pub type BoundPatch<N, Msg> = Patch<Msg, Target<N, Msg>>;

pub enum PatchKind<Msg, T = ()> {
	FullReplace(Node<Msg>),
	PatchFacts(FactsDiff<Msg>),
	ChangeText(String),
	/// Patches for a memoized node's content, indexed from 0 within it.
	DescendMemo(Vec<Patch<Msg, T>>),
	RebindWrapper(Transforms<Msg>),
	/// Removes `count` children starting at position `keep`.
	RemoveTrailing { keep: usize, count: usize },
	/// Appends `nodes` at position `from`.
	AppendRange { from: usize, nodes: Vec<Node<Msg>> },
	PatchManaged(ManagedPatch),
	ReconcileKeyed(Reconcile<Msg, T>),
	/// Detaches a keyed child, either for good (`None`) or to be reinserted elsewhere.
	RemoveKeyed(Option<Move<Msg, T>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	/// Only present in the new list.
	New,
	/// Only present in the old list.
	Removed,
	/// Present in both: the live node moves.
	Matched,
}

/// A finished keyed reconciliation ledger entry.
pub struct Entry<Msg> {
	pub key: String,
	pub status: Status,
	/// The new node for [`Status::New`] and [`Status::Matched`] entries, the old one otherwise.
	pub node: Node<Msg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insert {
	/// Child position in the new list.
	pub position: usize,
	pub entry: usize,
}

pub struct Reconcile<Msg, T = ()> {
	/// In-place child patches and [`PatchKind::RemoveKeyed`] removals, in index order.
	pub patches: Vec<Patch<Msg, T>>,
	/// Ascending by position.
	pub inserts: Vec<Insert>,
	/// Entries appended past the end of the old list, in order.
	pub end_inserts: Vec<usize>,
	pub entries: Vec<Entry<Msg>>,
}

pub struct Move<Msg, T = ()> {
	pub entry: usize,
	/// Patches turning the detached node into its new version.
	pub patches: Vec<Patch<Msg, T>>,
}

impl<Msg, T> Patch<Msg, T> {
	#[must_use]
	pub fn name(&self) -> &'static str {
		self.kind.name()
	}
}

impl<Msg, T> PatchKind<Msg, T> {
	#[must_use]
	pub fn name(&self) -> &'static str {
		match self {
			Self::FullReplace(_) => "FullReplace",
			Self::PatchFacts(_) => "PatchFacts",
			Self::ChangeText(_) => "ChangeText",
			Self::DescendMemo(_) => "DescendMemo",
			Self::RebindWrapper(_) => "RebindWrapper",
			Self::RemoveTrailing { .. } => "RemoveTrailing",
			Self::AppendRange { .. } => "AppendRange",
			Self::PatchManaged(_) => "PatchManaged",
			Self::ReconcileKeyed(_) => "ReconcileKeyed",
			Self::RemoveKeyed(_) => "RemoveKeyed",
		}
	}
}

impl<Msg, T> fmt::Debug for Patch<Msg, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Patch").field("index", &self.index).field("kind", &self.kind).finish()
	}
}

impl<Msg, T> fmt::Debug for PatchKind<Msg, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::FullReplace(node) => f.debug_tuple("FullReplace").field(node).finish(),
			Self::PatchFacts(diff) => f.debug_tuple("PatchFacts").field(diff).finish(),
			Self::ChangeText(text) => {
				if cfg!(feature = "dangerous-logging") {
					f.debug_tuple("ChangeText").field(text).finish()
				} else {
					f.debug_tuple("ChangeText").field(&text.len()).finish()
				}
			}
			Self::DescendMemo(patches) => f.debug_tuple("DescendMemo").field(patches).finish(),
			Self::RebindWrapper(transforms) => f.debug_tuple("RebindWrapper").field(&transforms.len()).finish(),
			Self::RemoveTrailing { keep, count } => f.debug_struct("RemoveTrailing").field("keep", keep).field("count", count).finish(),
			Self::AppendRange { from, nodes } => f.debug_struct("AppendRange").field("from", from).field("nodes", nodes).finish(),
			Self::PatchManaged(_) => f.write_str("PatchManaged"),
			Self::ReconcileKeyed(reconcile) => f
				.debug_struct("ReconcileKeyed")
				.field("patches", &reconcile.patches)
				.field("inserts", &reconcile.inserts)
				.field("end_inserts", &reconcile.end_inserts)
				.field("entries", &reconcile.entries)
				.finish(),
			Self::RemoveKeyed(None) => f.write_str("RemoveKeyed"),
			Self::RemoveKeyed(Some(Move { entry, patches })) => f.debug_struct("RemoveKeyed").field("entry", entry).field("patches", patches).finish(),
		}
	}
}

impl<Msg> fmt::Debug for Entry<Msg> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry").field("key", &self.key).field("status", &self.status).finish()
	}
}

impl<Msg> Patch<Msg> {
	pub(crate) fn new(index: usize, kind: PatchKind<Msg>) -> Self {
		Self { index, kind, target: () }
	}
}
