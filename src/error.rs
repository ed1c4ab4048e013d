use thiserror::Error;

/// Internal consistency violations and host failures surfaced by [`DomDiffer`](`crate::DomDiffer`).
///
/// Apart from [`Error::Host`], every variant means that the live tree no longer matches the
/// tree it was diffed against. The update that produced it must be treated as aborted.
#[derive(Debug, Error)]
pub enum Error {
	#[error("no live child at position {position} for tree index {index}")]
	MissingChild { index: usize, position: usize },

	#[error("node at tree index {index} has {found} live children, expected {expected}")]
	ChildCountMismatch { index: usize, expected: usize, found: usize },

	#[error("patch at tree index {index} could not be bound to a live node")]
	UnlocatedPatch { index: usize },

	#[error("memoized node at tree index {index} was never computed")]
	UncomputedMemo { index: usize },

	#[error("wrapped node at tree index {index} has no event chain attached to its live node")]
	MissingEventChain { index: usize },

	#[error("node at tree index {index} has no listener table entry for {event:?}")]
	MissingListenerTable { index: usize, event: String },

	#[error("keyed removal at tree index {index} outside of a keyed reconciliation")]
	StrayKeyedRemoval { index: usize },

	#[error("keyed entry {key:?} was inserted before its live node was detached")]
	UnresolvedMove { key: String },

	#[error("managed node produced a value that is not a live node of this platform")]
	ForeignManagedNode,

	#[error("the mounted tree no longer matches the live tree after an aborted update")]
	Poisoned,

	#[error("host call failed: {0}")]
	Host(String),
}

impl Error {
	pub fn host(message: impl Into<String>) -> Self {
		Self::Host(message.into())
	}
}
