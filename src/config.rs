/// Tuning knobs for [`DomDiffer`](`crate::DomDiffer`) and [`diff_with`](`crate::diff::diff_with`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// How many levels the differencer descends before it replaces a subtree wholesale.
	///
	/// This bounds the native stack used by diffing and locating.
	/// Rendering uses an explicit work stack and is not limited.
	pub depth_limit: usize,

	/// Register listeners whose handler can't prevent the default action as passive.
	pub passive_listeners: bool,
}

impl Config {
	pub const DEFAULT_DEPTH_LIMIT: usize = 512;

	#[must_use]
	pub fn with_depth_limit(self, depth_limit: usize) -> Self {
		Self { depth_limit, ..self }
	}

	#[must_use]
	pub fn with_passive_listeners(self, passive_listeners: bool) -> Self {
		Self { passive_listeners, ..self }
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			depth_limit: Self::DEFAULT_DEPTH_LIMIT,
			passive_listeners: true,
		}
	}
}
