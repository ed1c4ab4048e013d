#![allow(dead_code)]

use arbor_dom::{
	event::Transform,
	memory::{MemoryDom, MemoryNode},
	DomDiffer, Node, Platform,
};
use std::{cell::RefCell, rc::Rc};

pub fn init_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}

pub type Log<Msg> = Rc<RefCell<Vec<(Msg, bool)>>>;

pub fn differ<Msg: 'static>() -> (DomDiffer<MemoryDom<Msg>, Msg>, Log<Msg>) {
	let log: Log<Msg> = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&log);
	(DomDiffer::new(MemoryDom::new(), move |message, sync| sink.borrow_mut().push((message, sync))), log)
}

/// Renders `tree` into a fresh `<body>` and returns both.
pub fn mount<Msg: 'static>(differ: &mut DomDiffer<MemoryDom<Msg>, Msg>, tree: &Node<Msg>) -> (MemoryNode, MemoryNode) {
	let body = MemoryDom::<Msg>::container("body");
	let root = differ.render(tree).unwrap();
	differ.platform_mut().append_child(&body, &root);
	(body, root)
}

/// What `tree` looks like when rendered from scratch.
pub fn fresh_markup<Msg: 'static>(tree: &Node<Msg>) -> String {
	let (mut differ, _) = differ();
	mount(&mut differ, tree).1.to_markup()
}

/// Renders `old`, updates it to `new` and checks the result against a fresh rendering of `new`.
pub fn assert_transition<Msg: 'static>(old: &Node<Msg>, new: &Node<Msg>) -> (DomDiffer<MemoryDom<Msg>, Msg>, MemoryNode, MemoryNode) {
	let (mut differ, _) = differ();
	let (body, root) = mount(&mut differ, old);
	let root = differ.update(&root, old, new).unwrap();
	assert_eq!(body.children(), vec![root.clone()]);
	assert_eq!(root.to_markup(), fresh_markup(new));
	(differ, body, root)
}

pub fn text<Msg>(text: &str) -> Node<Msg> {
	Node::text(text)
}

pub fn div<Msg>(children: impl IntoIterator<Item = Node<Msg>>) -> Node<Msg> {
	Node::element("div", [], children)
}

pub fn list<Msg>(keys: &[&str]) -> Node<Msg> {
	Node::keyed("ul", [], keys.iter().map(|key| (*key, Node::element("li", [], [Node::text(*key)]))))
}

/// Finds the first text node with the given content.
pub fn find_text(node: &MemoryNode, content: &str) -> Option<MemoryNode> {
	if node.text().as_deref() == Some(content) {
		return Some(node.clone());
	}
	node.children().iter().find_map(|child| find_text(child, content))
}

thread_local! {
	static IDENTITY: Transform<u32> = Rc::new(|message| message);
}

/// A transform shared across trees, so that diffing sees it as unchanged.
pub fn identity() -> Transform<u32> {
	IDENTITY.with(Rc::clone)
}
