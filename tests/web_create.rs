#![cfg(target_arch = "wasm32")]

use arbor_dom::{facts::Fact, Node};
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Element, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

mod web_support_;
use web_support_::{differ, init_logging, mount};

type Msg = ();

#[wasm_bindgen_test]
fn text() {
	init_logging();

	let (mut differ, _) = differ();
	let (container, _) = mount(&mut differ, &Node::<Msg>::text("Hello arbor-dom!"));
	assert_eq!(container.inner_html(), "Hello arbor-dom!");
}

#[wasm_bindgen_test]
fn nested_elements() {
	init_logging();

	let tree: Node<Msg> = Node::element("ul", [], [Node::element("li", [], [Node::text("one")]), Node::element("li", [], [Node::text("two")])]);
	let (mut differ, _) = differ();
	let (container, _) = mount(&mut differ, &tree);
	assert_eq!(container.inner_html(), "<ul><li>one</li><li>two</li></ul>");
}

#[wasm_bindgen_test]
fn facts() {
	init_logging();

	let tree: Node<Msg> = Node::element(
		"input",
		[Fact::class("field"), Fact::attribute("title", "Name"), Fact::style("color", "red"), Fact::property("value", "draft")],
		[],
	);
	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &tree);

	let element = root.dyn_ref::<HtmlElement>().unwrap();
	assert_eq!(element.get_attribute("class").as_deref(), Some("field"));
	assert_eq!(element.get_attribute("title").as_deref(), Some("Name"));
	assert_eq!(element.style().get_property_value("color").unwrap(), "red");
	assert_eq!(Reflect::get(&root, &JsValue::from_str("value")).unwrap().as_string().as_deref(), Some("draft"));
}

#[wasm_bindgen_test]
fn namespaced() {
	init_logging();

	const SVG: &str = "http://www.w3.org/2000/svg";
	const XLINK: &str = "http://www.w3.org/1999/xlink";

	let tree: Node<Msg> = Node::element_ns(SVG, "svg", [], [Node::element_ns(SVG, "use", [Fact::attribute_ns(XLINK, "xlink:href", "#icon")], [])]);
	let (mut differ, _) = differ();
	let (_, root) = mount(&mut differ, &tree);

	let svg = root.dyn_ref::<Element>().unwrap();
	assert_eq!(svg.namespace_uri().as_deref(), Some(SVG));
	let used = svg.first_element_child().unwrap();
	assert_eq!(used.namespace_uri().as_deref(), Some(SVG));
	assert_eq!(used.get_attribute_ns(Some(XLINK), "href").as_deref(), Some("#icon"));
}
