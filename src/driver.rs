//! Keeping a live tree in sync with a changing model.
//!
//! [`Mount`] owns a rendered tree and the virtual tree it was last updated from.
//! [`Animator`] coalesces model updates so that at most one draw happens per frame.

use crate::{load::virtualize, node::Node, platform::Platform, DomDiffer, Error};
use core::{cell::RefCell, fmt};
use std::rc::Rc;
use tracing::{error, instrument, trace};

/// A live tree together with the virtual tree it currently shows.
pub struct Mount<P: Platform<Msg>, Msg> {
	differ: DomDiffer<P, Msg>,
	root: P::Node,
	current: Node<Msg>,
	poisoned: bool,
}

impl<P: Platform<Msg>, Msg> Mount<P, Msg> {
	/// Renders `tree` and appends it to `parent`.
	///
	/// # Errors
	///
	/// Iff rendering fails.
	#[instrument(skip(differ, parent, tree))]
	pub fn new(mut differ: DomDiffer<P, Msg>, parent: &P::Node, tree: Node<Msg>) -> Result<Self, Error> {
		let root = differ.render(&tree)?;
		differ.platform_mut().append_child(parent, &root);
		Ok(Self {
			differ,
			root,
			current: tree,
			poisoned: false,
		})
	}

	/// Takes over an existing live tree. The first [`update`](`Mount::update`) patches it into shape.
	#[instrument(skip(differ, root))]
	pub fn hydrate(differ: DomDiffer<P, Msg>, root: P::Node) -> Self {
		let current = virtualize(differ.platform(), &root);
		Self {
			differ,
			root,
			current,
			poisoned: false,
		}
	}

	/// Brings the live tree in line with `next`.
	///
	/// # Errors
	///
	/// Iff the live tree had diverged from the current virtual tree. The mount is poisoned afterwards
	/// and rejects further updates with [`Error::Poisoned`].
	pub fn update(&mut self, next: Node<Msg>) -> Result<(), Error> {
		if self.poisoned {
			return Err(Error::Poisoned);
		}
		match self.differ.update(&self.root, &self.current, &next) {
			Ok(root) => {
				self.root = root;
				self.current = next;
				Ok(())
			}
			Err(error) => {
				error!("Update failed, abandoning the live tree: {}", error);
				self.poisoned = true;
				Err(error)
			}
		}
	}

	#[must_use]
	pub fn root(&self) -> &P::Node {
		&self.root
	}

	#[must_use]
	pub fn current(&self) -> &Node<Msg> {
		&self.current
	}

	#[must_use]
	pub fn is_poisoned(&self) -> bool {
		self.poisoned
	}

	#[must_use]
	pub fn differ(&self) -> &DomDiffer<P, Msg> {
		&self.differ
	}

	pub fn differ_mut(&mut self) -> &mut DomDiffer<P, Msg> {
		&mut self.differ
	}
}

impl<P: Platform<Msg>, Msg> fmt::Debug for Mount<P, Msg>
where
	P: fmt::Debug,
	P::Node: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Mount")
			.field("differ", &self.differ)
			.field("root", &self.root)
			.field("current", &self.current)
			.field("poisoned", &self.poisoned)
			.finish()
	}
}

/// Requests a callback before the next repaint.
pub trait FrameScheduler {
	fn request_frame(&self, callback: Box<dyn FnOnce()>);
}

/// Frame request state of an [`Animator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latch {
	/// No frame requested.
	Quiescent,
	/// A frame is requested and the model changed since the last draw.
	FramePending,
	/// A frame is requested, but there is nothing new to draw yet.
	/// If it stays that way, the frame lets the latch go quiescent.
	FrameScheduled,
}

struct State<Model> {
	latch: Latch,
	model: Model,
	draw: Box<dyn FnMut(&Model)>,
}

/// Draws the latest model at most once per frame, unless asked to draw synchronously.
///
/// `draw` must not call back into the [`Animator`].
pub struct Animator<Model> {
	state: Rc<RefCell<State<Model>>>,
	scheduler: Rc<dyn FrameScheduler>,
}

impl<Model> Clone for Animator<Model> {
	fn clone(&self) -> Self {
		Self {
			state: Rc::clone(&self.state),
			scheduler: Rc::clone(&self.scheduler),
		}
	}
}

impl<Model> Animator<Model> {
	#[must_use]
	pub fn latch(&self) -> Latch {
		self.state.borrow().latch
	}
}

impl<Model> fmt::Debug for Animator<Model> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Animator").field("latch", &self.latch()).finish()
	}
}

impl<Model: 'static> Animator<Model> {
	/// Draws `model` once right away.
	pub fn new(model: Model, mut draw: impl FnMut(&Model) + 'static, scheduler: Rc<dyn FrameScheduler>) -> Self {
		draw(&model);
		Self {
			state: Rc::new(RefCell::new(State {
				latch: Latch::Quiescent,
				model,
				draw: Box::new(draw),
			})),
			scheduler,
		}
	}

	/// Replaces the model. `sync` draws immediately instead of waiting for a frame.
	pub fn update(&self, model: Model, sync: bool) {
		let mut state = self.state.borrow_mut();
		state.model = model;

		if sync {
			let State { model, draw, latch } = &mut *state;
			draw(model);
			if *latch == Latch::FramePending {
				*latch = Latch::FrameScheduled;
			}
		} else {
			if state.latch == Latch::Quiescent {
				drop(state);
				self.request();
				state = self.state.borrow_mut();
			}
			state.latch = Latch::FramePending;
		}
	}

	fn request(&self) {
		let animator = self.clone();
		self.scheduler.request_frame(Box::new(move || animator.on_frame()));
	}

	fn on_frame(&self) {
		let mut state = self.state.borrow_mut();
		if state.latch == Latch::FrameScheduled {
			trace!("Nothing changed since the last frame.");
			state.latch = Latch::Quiescent;
			return;
		}

		drop(state);
		self.request();
		let mut state = self.state.borrow_mut();
		let State { model, draw, latch } = &mut *state;
		draw(model);
		*latch = Latch::FrameScheduled;
	}
}
