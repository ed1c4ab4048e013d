#![cfg(target_arch = "wasm32")]
#![allow(dead_code)]

use arbor_dom::{web::WebDom, DomDiffer, Node, Platform};
use std::{cell::RefCell, rc::Rc, sync::Once};
use web_sys::Element;

static LOGGING: Once = Once::new();

pub fn init_logging() {
	//TODO: Fail on warnings and errors.
	LOGGING.call_once(tracing_wasm::set_as_global_default);
}

pub type Log<Msg> = Rc<RefCell<Vec<(Msg, bool)>>>;

pub fn differ<Msg: 'static>() -> (DomDiffer<WebDom<Msg>, Msg>, Log<Msg>) {
	let log: Log<Msg> = Rc::default();
	let sink = Rc::clone(&log);
	let platform = WebDom::for_window().unwrap();
	(DomDiffer::new(platform, move |message, sync| sink.borrow_mut().push((message, sync))), log)
}

/// A fresh `<div>` in the document body, so that tests don't see each other's nodes.
pub fn container() -> Element {
	let document = web_sys::window().unwrap().document().unwrap();
	let container = document.create_element("div").unwrap();
	document.body().unwrap().append_child(&container).unwrap();
	container
}

/// Renders `tree` into a fresh [`container`] and returns both.
pub fn mount<Msg: 'static>(differ: &mut DomDiffer<WebDom<Msg>, Msg>, tree: &Node<Msg>) -> (Element, web_sys::Node) {
	let container = container();
	let root = differ.render(tree).unwrap();
	differ.platform_mut().append_child(container.as_ref(), &root);
	(container, root)
}
