use arbor_dom::{
	facts::Fact,
	memory::{MemoryDom, MemoryNode},
	node::Widget,
	Config, DomDiffer, Error, Node, Platform,
};
use core::any::Any;
use serde_json::json;
use std::rc::Rc;

mod support_;
use support_::{assert_transition, differ, div, find_text, fresh_markup, init_logging, list, mount, text};

type Msg = u32;

#[test]
fn renders_markup() {
	init_logging();

	let tree: Node<Msg> = Node::element(
		"p",
		[Fact::class("intro"), Fact::style("color", "red"), Fact::property("hidden", true), Fact::attribute_ns("urn:x", "note", "n")],
		[text("Hello, "), Node::element("b", [], [text("<world>")])],
	);
	assert_eq!(
		fresh_markup(&tree),
		r#"<p class="intro" {urn:x}note="n" style:color="red" .hidden=true>Hello, <b>&lt;world></b></p>"#
	);
}

#[test]
fn text_change_keeps_live_nodes() {
	init_logging();

	let old: Node<Msg> = div([text("a"), div([text("b")])]);
	let new = div([text("a"), div([text("c")])]);

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &old);
	let inner = root.children()[1].clone();
	let leaf = find_text(&root, "b").unwrap();

	let updated = differ.update(&root, &old, &new).unwrap();
	assert_eq!(updated, root);
	assert_eq!(root.children()[1], inner);
	assert_eq!(leaf.text().as_deref(), Some("c"));
	assert_eq!(root.to_markup(), "<div>a<div>c</div></div>");
}

#[test]
fn replacing_the_root() {
	init_logging();

	let old: Node<Msg> = div([text("a")]);
	let new = Node::element("span", [], [text("a")]);

	let (_, body, root) = assert_transition(&old, &new);
	assert_eq!(root.tag().as_deref(), Some("span"));
	assert_eq!(body.children(), vec![root]);
}

#[test]
fn growing_and_shrinking() {
	init_logging();

	let short: Node<Msg> = div([text("a")]);
	let long = div([text("a"), div([text("b")]), text("c")]);

	assert_transition(&short, &long);
	assert_transition(&long, &short);
	assert_transition(&div([]), &long);
	assert_transition(&long, &div([]));
}

#[test]
fn facts_are_patched() {
	init_logging();

	let old: Node<Msg> = Node::element("input", [Fact::class("a"), Fact::style("color", "red"), Fact::property("value", "x"), Fact::attribute("title", "t")], []);
	let new = Node::element("input", [Fact::class("b"), Fact::style("margin", "0"), Fact::property("disabled", true)], []);

	let (_, _, root) = assert_transition(&old, &new);
	assert_eq!(root.attribute("class").as_deref(), Some("b"));
	assert_eq!(root.attribute("title"), None);
	assert_eq!(root.style("color"), None);
	assert_eq!(root.style("margin").as_deref(), Some("0"));
	assert_eq!(root.property("value"), None);

	assert_transition(&new, &old);
}

#[test]
fn unchanged_value_is_left_alone() {
	init_logging();

	let view = || -> Node<Msg> { Node::element("input", [Fact::property("value", "draft")], []) };
	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &view());

	// Typing doesn't go through the virtual tree.
	root.set_property("value", json!("draft, edited"));
	differ.update(&root, &view(), &view()).unwrap();
	assert_eq!(root.property("value"), Some(json!("draft, edited")));
}

#[test]
fn unknown_fact_categories_reach_the_platform() {
	init_logging();

	let old: Node<Msg> = Node::element("div", [Fact::other("aria", "label", "a")], []);
	let new = Node::element("div", [Fact::other("aria", "label", "b")], []);
	let (_, _, root) = assert_transition(&old, &new);
	assert_eq!(root.to_markup(), r#"<div aria:label="b"></div>"#);
}

#[test]
fn memo_content_is_patched() {
	init_logging();

	fn view(label: &String) -> Node<Msg> {
		div([text("memo"), text(label)])
	}

	let old = div([text("x"), Node::lazy(view, Rc::new("a".to_owned())), text("y")]);
	let new = div([text("x"), Node::lazy(view, Rc::new("b".to_owned())), text("z")]);
	let (_, _, root) = assert_transition(&old, &new);
	assert_eq!(root.to_markup(), "<div>x<div>memob</div>z</div>");

	let replaced = div([text("x"), Node::lazy(|_: &String| text("flat"), Rc::new("c".to_owned())), text("z")]);
	assert_transition(&new, &replaced);
}

#[test]
fn keyed_reordering() {
	init_logging();

	let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
		(vec!["a", "b", "c"], vec!["b", "a", "c"]),
		(vec!["a", "b", "c"], vec!["c", "b", "a"]),
		(vec!["a", "b", "c"], vec!["c", "a", "b"]),
		(vec!["a", "b", "c"], vec!["a", "x", "b", "c"]),
		(vec!["a", "b", "c"], vec!["a", "c"]),
		(vec!["a", "b", "c"], vec!["x", "b", "c"]),
		(vec!["a", "b", "c", "d", "e"], vec!["e", "d", "c", "b", "a"]),
		(vec!["a", "b"], vec![]),
		(vec![], vec!["a", "b"]),
		(vec!["a", "b", "c"], vec!["d", "e", "f"]),
	];

	for (old, new) in &cases {
		let (_, _, root) = assert_transition::<Msg>(&list(old), &list(new));
		assert_eq!(root.children().len(), new.len());
	}
}

#[test]
fn keyed_moves_keep_live_nodes() {
	init_logging();

	let old: Node<Msg> = list(&["a", "b", "c", "d"]);
	let new = list(&["d", "c", "b", "a"]);

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &old);
	let before: Vec<MemoryNode> = ["a", "b", "c", "d"].iter().map(|key| find_text(&root, key).unwrap()).collect();

	differ.update(&root, &old, &new).unwrap();
	assert_eq!(root.to_markup(), fresh_markup(&new));
	for (key, node) in ["a", "b", "c", "d"].iter().zip(before) {
		assert_eq!(find_text(&root, key), Some(node));
	}
}

#[test]
fn keyed_moves_carry_their_patches() {
	init_logging();

	let item = |key: &str, label: &str| (key.to_owned(), Node::element("li", [], [text(label)]));
	let old: Node<Msg> = Node::keyed("ul", [], [item("a", "1"), item("b", "2"), item("c", "3")]);
	let new = Node::keyed("ul", [], [item("c", "3!"), item("b", "2!"), item("a", "1!")]);

	let (_, _, root) = assert_transition(&old, &new);
	assert_eq!(root.to_markup(), "<ul><li>3!</li><li>2!</li><li>1!</li></ul>");
}

#[test]
fn duplicate_keys() {
	init_logging();

	assert_transition::<Msg>(&list(&["x", "y"]), &list(&["a", "a"]));
	assert_transition::<Msg>(&list(&["a", "a", "b"]), &list(&["b", "a", "a"]));
	assert_transition::<Msg>(&list(&["a", "a"]), &list(&["a"]));
}

#[test]
fn element_and_keyed_interchange() {
	init_logging();

	let plain: Node<Msg> = Node::element("ul", [], [Node::element("li", [], [text("a")])]);
	let keyed = list(&["a", "b"]);

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &plain);
	let root = differ.update(&root, &plain, &keyed).unwrap();
	assert_eq!(root.to_markup(), fresh_markup(&keyed));

	let shuffled = list(&["b", "a"]);
	let root = differ.update(&root, &keyed, &shuffled).unwrap();
	assert_eq!(root.to_markup(), fresh_markup(&shuffled));

	assert_transition(&shuffled, &plain);
}

#[test]
fn deep_trees_render_and_update() {
	init_logging();

	let deep = |leaf: &str| -> Node<Msg> { (0..300).fold(text(leaf), |inner, _| div([inner])) };
	let mut differ = DomDiffer::with_config(MemoryDom::new(), Config::default().with_depth_limit(64), |_: Msg, _| ());

	let old = deep("a");
	let new = deep("b");
	let (_, root) = mount(&mut differ, &old);
	differ.update(&root, &old, &new).unwrap();
	assert!(find_text(&root, "b").is_some());
	assert!(find_text(&root, "a").is_none());
}

struct Canvas;

impl Widget for Canvas {
	fn render(&self, state: &dyn Any) -> Box<dyn Any> {
		let mut dom = MemoryDom::<()>::new();
		let canvas = MemoryDom::<()>::container("canvas");
		dom.set_attribute(&canvas, "data-frame", state.downcast_ref::<u32>().map(ToString::to_string).as_deref());
		Box::new(canvas)
	}

	fn diff(&self, old: &dyn Any, new: &dyn Any) -> Option<arbor_dom::node::ManagedPatch> {
		let new = *new.downcast_ref::<u32>()?;
		if old.downcast_ref::<u32>() == Some(&new) {
			return None;
		}
		Some(Rc::new(move |live: Box<dyn Any>| {
			if let Some(canvas) = live.downcast_ref::<MemoryNode>() {
				MemoryDom::<()>::new().set_attribute(canvas, "data-frame", Some(&new.to_string()));
			}
			live
		}))
	}
}

#[test]
fn managed_nodes() {
	init_logging();

	let widget: Rc<dyn Widget> = Rc::new(Canvas);
	let view = |frame: u32| -> Node<Msg> { div([Node::managed([Fact::class("game")], Rc::new(frame), Rc::clone(&widget))]) };

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &view(1));
	let canvas = root.children()[0].clone();
	assert_eq!(root.to_markup(), r#"<div><canvas class="game" data-frame="1"></canvas></div>"#);

	differ.update(&root, &view(1), &view(2)).unwrap();
	assert_eq!(root.children()[0], canvas);
	assert_eq!(canvas.attribute("data-frame").as_deref(), Some("2"));
}

struct Foreign;

impl Widget for Foreign {
	fn render(&self, _: &dyn Any) -> Box<dyn Any> {
		Box::new("not a node")
	}

	fn diff(&self, _: &dyn Any, _: &dyn Any) -> Option<arbor_dom::node::ManagedPatch> {
		None
	}
}

#[test]
fn foreign_managed_output_is_rejected() {
	init_logging();

	let (mut differ, _) = differ::<Msg>();
	let tree = Node::managed([], Rc::new(()), Rc::new(Foreign));
	assert!(matches!(differ.render(&tree), Err(Error::ForeignManagedNode)));
}

#[test]
fn diverged_live_tree_is_detected() {
	init_logging();

	let old: Node<Msg> = div([div([text("a")]), div([text("b")])]);
	let new = div([div([text("a")]), div([text("c")])]);

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &old);
	let second = root.children()[1].clone();
	differ.platform_mut().remove_child(&root, &second);

	assert!(matches!(differ.update(&root, &old, &new), Err(Error::MissingChild { position: 1, .. })));
}

#[test]
fn stray_live_children_block_appends() {
	init_logging();

	let old: Node<Msg> = div([text("a")]);
	let new = div([text("a"), text("b")]);

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &old);
	let stray = differ.platform_mut().create_element("i", None).unwrap();
	differ.platform_mut().append_child(&root, &stray);

	let result = differ.update(&root, &old, &new);
	assert!(matches!(result, Err(Error::ChildCountMismatch { index: 0, expected: 1, found: 2 })));
	assert_eq!(root.to_markup(), "<div>a<i></i></div>");
}
