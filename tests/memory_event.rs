use arbor_dom::{
	event::{string_at, Handler},
	facts::Fact,
	memory::MemoryDom,
	Config, DomDiffer, Error, Node,
};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};

mod support_;
use support_::{differ, div, init_logging, mount};

type Msg = u32;

fn button(handler: &Handler<Msg>) -> Node<Msg> {
	Node::element("button", [Fact::on("click", handler.clone())], [])
}

fn click() -> serde_json::Value {
	json!({ "type": "click" })
}

#[test]
fn click_dispatches_to_the_sink() {
	init_logging();

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &button(&Handler::normal(|_| Ok(1))));

	let propagation = differ.platform().dispatch(&root, "click", &click());
	assert!(!propagation.stop_propagation);
	assert_eq!(*log.borrow(), vec![(1, false)]);
}

#[test]
fn wrappers_transform_messages_innermost_first() {
	init_logging();

	let tree = button(&Handler::normal(|_| Ok(2))).map(|m| m + 1).map(|m| m * 10);
	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &tree);

	differ.platform().dispatch(&root, "click", &click());
	assert_eq!(*log.borrow(), vec![(30, false)]);
}

#[test]
fn rebinding_reuses_the_listener() {
	init_logging();

	let handler = Handler::normal(|_| Ok(2));
	let old = button(&handler).map(|m| m + 1);
	let new = button(&handler).map(|m| m * 100);

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &old);
	differ.update(&root, &old, &new).unwrap();

	differ.platform().dispatch(&root, "click", &click());
	assert_eq!(*log.borrow(), vec![(200, false)]);
	assert_eq!(differ.platform().added_listeners(), 1);
	assert_eq!(differ.platform().removed_listeners(), 0);
}

#[test]
fn undecodable_events_are_dropped() {
	init_logging();

	#[allow(clippy::cast_possible_truncation)]
	let handler = Handler::normal(|event| string_at(event, &["target", "value"]).map(|value| value.len() as u32));
	let tree = Node::element("input", [Fact::on("input", handler)], []);
	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &tree);

	differ.platform().dispatch(&root, "input", &json!({ "target": {} }));
	differ.platform().dispatch(&root, "input", &json!({ "target": { "value": 5 } }));
	assert!(log.borrow().is_empty());

	differ.platform().dispatch(&root, "input", &json!({ "target": { "value": "abc" } }));
	assert_eq!(*log.borrow(), vec![(3, false)]);
}

#[test]
fn same_kind_handlers_are_swapped_in_place() {
	init_logging();

	let old = button(&Handler::normal(|_| Ok(1)));
	let new = button(&Handler::normal(|_| Ok(2)));

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &old);
	differ.update(&root, &old, &new).unwrap();

	differ.platform().dispatch(&root, "click", &click());
	assert_eq!(*log.borrow(), vec![(2, false)]);
	assert_eq!(differ.platform().added_listeners(), 1);
	assert_eq!(differ.platform().removed_listeners(), 0);
}

#[test]
fn kind_changes_reregister() {
	init_logging();

	let old = button(&Handler::normal(|_| Ok(1)));
	let new = button(&Handler::may_prevent_default(|_| Ok((3, true))));

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &old);
	assert_eq!(differ.platform().is_passive(&root, "click"), Some(true));

	differ.update(&root, &old, &new).unwrap();
	assert_eq!(differ.platform().added_listeners(), 2);
	assert_eq!(differ.platform().removed_listeners(), 1);
	assert_eq!(differ.platform().is_passive(&root, "click"), Some(false));

	let propagation = differ.platform().dispatch(&root, "click", &click());
	assert!(propagation.prevent_default);
	assert_eq!(*log.borrow(), vec![(3, false)]);
}

#[test]
fn passive_registration_can_be_disabled() {
	init_logging();

	let mut differ = DomDiffer::with_config(MemoryDom::new(), Config::default().with_passive_listeners(false), |_: Msg, _| ());
	let (_, root) = mount(&mut differ, &button(&Handler::normal(|_| Ok(1))));
	assert_eq!(differ.platform().is_passive(&root, "click"), Some(false));
}

#[test]
fn removed_handlers_are_unregistered() {
	init_logging();

	let old = button(&Handler::normal(|_| Ok(1)));
	let new = Node::element("button", [], []);

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &old);
	differ.update(&root, &old, &new).unwrap();

	assert_eq!(differ.platform().listener_count(), 0);
	assert_eq!(differ.platform().removed_listeners(), 1);
	differ.platform().dispatch(&root, "click", &click());
	assert!(log.borrow().is_empty());
}

#[test]
fn stopping_propagation_requests_a_sync_paint() {
	init_logging();

	let tree = |stop: bool| -> Node<Msg> {
		Node::element(
			"div",
			[Fact::on("click", Handler::normal(|_| Ok(1)))],
			[Node::element("button", [Fact::on("click", Handler::may_stop_propagation(move |_| Ok((2, stop))))], [])],
		)
	};

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &tree(true));
	let target = root.children()[0].clone();

	let propagation = differ.platform().dispatch(&target, "click", &click());
	assert!(propagation.stop_propagation);
	assert_eq!(*log.borrow(), vec![(2, true)]);

	let (mut differ, log) = support_::differ();
	let (_, root) = mount(&mut differ, &tree(false));
	let target = root.children()[0].clone();
	differ.platform().dispatch(&target, "click", &click());
	assert_eq!(*log.borrow(), vec![(2, false), (1, false)]);
}

#[test]
fn detached_subtrees_release_their_listeners() {
	init_logging();

	let handler = Handler::normal(|_| Ok(1));
	let old = div([button(&handler), div([button(&handler)])]);
	let new = div([]);

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &old);
	assert_eq!(differ.platform().listener_count(), 2);

	differ.update(&root, &old, &new).unwrap();
	assert_eq!(differ.platform().listener_count(), 0);
	assert_eq!(differ.platform().removed_listeners(), 2);
}

#[test]
fn removing_an_unknown_listener_fails() {
	init_logging();

	let bare = Node::element("button", [], []);
	let claimed = button(&Handler::normal(|_| Ok(1)));

	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &bare);
	let result = differ.update(&root, &claimed, &bare);
	assert!(matches!(result, Err(Error::MissingListenerTable { index: 0, ref event }) if event == "click"));
}

#[test]
fn wrappers_inside_memos() {
	init_logging();

	let handler = Handler::normal(|_| Ok(2));
	let outer: Rc<dyn Fn(Msg) -> Msg> = Rc::new(|m| m + 1);
	let view = |identity: u32, inner: Rc<dyn Fn(Msg) -> Msg>| -> Node<Msg> {
		let handler = handler.clone();
		let identity: Rc<dyn core::any::Any> = Rc::new(identity);
		Node::memo(vec![identity], move || button(&handler).map_with(Rc::clone(&inner))).map_with(Rc::clone(&outer))
	};

	let old = view(1, Rc::new(|m| m * 10));
	let new = view(2, Rc::new(|m| m * 100));

	let (mut differ, log) = differ();
	let (_, root) = mount(&mut differ, &old);
	differ.platform().dispatch(&root, "click", &click());

	differ.update(&root, &old, &new).unwrap();
	differ.platform().dispatch(&root, "click", &click());
	assert_eq!(*log.borrow(), vec![(21, false), (201, false)]);
	assert_eq!(differ.platform().added_listeners(), 1);
}

#[test]
fn replacing_below_a_wrapper_keeps_its_chain() {
	init_logging();

	let handler = Handler::normal(|_| Ok(2));
	let add: Rc<dyn Fn(Msg) -> Msg> = Rc::new(|m| m + 1);
	let old = Node::element("span", [Fact::on("click", handler.clone())], []).map_with(Rc::clone(&add));
	let new = button(&handler).map_with(Rc::clone(&add));
	let rebound = button(&handler).map(|m| m * 10);

	let (mut differ, log) = differ();
	let (body, root) = mount(&mut differ, &old);

	let root = differ.update(&root, &old, &new).unwrap();
	assert_eq!(body.children(), vec![root.clone()]);
	assert_eq!(root.tag().as_deref(), Some("button"));
	differ.platform().dispatch(&root, "click", &click());

	let root = differ.update(&root, &new, &rebound).unwrap();
	differ.platform().dispatch(&root, "click", &click());
	assert_eq!(*log.borrow(), vec![(3, false), (20, false)]);
}

#[test]
fn handlers_see_the_current_sink() {
	init_logging();

	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	let mut differ = DomDiffer::new(MemoryDom::new(), move |message: Msg, sync| sink.borrow_mut().push((message, sync)));
	let (_, root) = mount(&mut differ, &button(&Handler::custom(|_| Ok(arbor_dom::event::Custom { message: 7, stop_propagation: true, prevent_default: true }))));

	let propagation = differ.platform().dispatch(&root, "click", &click());
	assert!(propagation.stop_propagation && propagation.prevent_default);
	assert_eq!(*seen.borrow(), vec![(7, true)]);
}
