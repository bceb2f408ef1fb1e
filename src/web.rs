//! The browser [`Dom`], on top of [`web_sys`].

use crate::{
	dom::{Dom, NodeKind},
	value::{Event, ListenerOptions, ListenerSlot, Value},
};
use core::cell::RefCell;
use hashbrown::HashMap;
use js_sys::{Function, Reflect};
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};
use web_sys::{AddEventListenerOptions, Document, Element, HtmlTemplateElement, Node};

/// A [`Dom`] over a browser document.
///
/// Failing DOM calls are logged and otherwise ignored.
#[derive(Debug)]
pub struct WebDom {
	document: Document,
	/// One native handler per [`ListenerSlot`], keyed by the slot's address.
	handlers: RefCell<HashMap<usize, (Weak<ListenerSlot>, Function)>>,
	add_event_listener_options_cache: RefCell<[Option<AddEventListenerOptions>; 8]>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self {
			document,
			handlers: RefCell::default(),
			add_event_listener_options_cache: RefCell::new([None, None, None, None, None, None, None, None]),
		}
	}

	/// The document of the global `window`, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		Some(Self::new(web_sys::window()?.document()?))
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	#[instrument(skip(self))]
	fn get_or_create_handler(&self, slot: &Rc<ListenerSlot>) -> Function {
		let mut handlers = self.handlers.borrow_mut();
		let before = handlers.len();
		handlers.retain(|_, (weak, _)| weak.strong_count() > 0);
		if handlers.len() != before {
			trace!("Freed {} native handler(s).", before - handlers.len());
		}

		let key = Rc::as_ptr(slot) as usize;
		handlers
			.entry(key)
			.or_insert_with(|| {
				let weak = Rc::downgrade(slot);
				let handler = Closure::wrap(Box::new(move |event: web_sys::Event| {
					let span = trace_span!("native_handler", event = ?&event);
					let _enter = span.enter();
					match weak.upgrade() {
						Some(slot) => slot.handle_event(&Event::with_native(event.type_(), event)),
						None => trace!("Event arrived after its part was dropped."),
					}
				}) as Box<dyn Fn(web_sys::Event)>);
				(Rc::downgrade(slot), handler.into_js_value().unchecked_into::<Function>())
			})
			.1
			.clone()
	}

	fn handler(&self, slot: &Rc<ListenerSlot>) -> Option<Function> {
		self.handlers.borrow().get(&(Rc::as_ptr(slot) as usize)).map(|(_, handler)| handler.clone())
	}

	fn add_event_listener_options(&self, options: ListenerOptions) -> AddEventListenerOptions {
		let mut cache = self.add_event_listener_options_cache.borrow_mut();
		let entry = cache
			.get_mut(usize::from(options.capture) + usize::from(options.once) * 2 + usize::from(options.passive) * 4)
			.unwrap_throw();
		entry
			.get_or_insert_with(|| {
				let web_options = AddEventListenerOptions::new();
				web_options.set_capture(options.capture);
				web_options.set_once(options.once);
				web_options.set_passive(options.passive);
				web_options
			})
			.clone()
	}

	fn element<'a>(node: &'a Node, operation: &str) -> Option<&'a Element> {
		let element = node.dyn_ref::<Element>();
		if element.is_none() {
			error!("Can't {} on non-element {:?}.", operation, node);
		}
		element
	}
}

fn to_js(value: &Value) -> JsValue {
	match value {
		Value::Undefined | Value::Nothing | Value::NoChange => JsValue::UNDEFINED,
		Value::Null => JsValue::NULL,
		Value::Bool(b) => JsValue::from_bool(*b),
		Value::Number(n) => JsValue::from_f64(*n),
		Value::Str(s) => JsValue::from_str(s),
		Value::List(items) => items.iter().map(to_js).collect::<js_sys::Array>().into(),
		other => JsValue::from_str(&other.to_text()),
	}
}

impl Dom for WebDom {
	type Node = Node;

	fn create_comment(&self, data: &str) -> Node {
		self.document.create_comment(data).into()
	}

	fn create_text(&self, data: &str) -> Node {
		self.document.create_text_node(data).into()
	}

	fn parse_fragment(&self, html: &str) -> Node {
		match self.document.create_element("template").map(|element| element.dyn_into::<HtmlTemplateElement>()) {
			Ok(Ok(template)) => {
				template.set_inner_html(html);
				template.content().into()
			}
			Ok(Err(element)) => {
				error!("`<template>` isn't an `HTMLTemplateElement`: {:?}", element);
				self.document.create_document_fragment().into()
			}
			Err(error) => {
				error!("Failed to create `<template>`: {:?}", error);
				self.document.create_document_fragment().into()
			}
		}
	}

	fn import(&self, node: &Node) -> Node {
		match self.document.import_node_with_deep(node, true) {
			Ok(clone) => clone,
			Err(error) => {
				error!("Failed to import node: {:?}", error);
				self.document.create_document_fragment().into()
			}
		}
	}

	fn node_kind(&self, node: &Node) -> NodeKind {
		match node.node_type() {
			Node::ELEMENT_NODE => NodeKind::Element,
			Node::TEXT_NODE => NodeKind::Text,
			Node::COMMENT_NODE => NodeKind::Comment,
			Node::DOCUMENT_FRAGMENT_NODE => NodeKind::Fragment,
			_ => NodeKind::Other,
		}
	}

	fn parent(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn first_child(&self, node: &Node) -> Option<Node> {
		node.first_child()
	}

	fn next_sibling(&self, node: &Node) -> Option<Node> {
		node.next_sibling()
	}

	fn previous_sibling(&self, node: &Node) -> Option<Node> {
		node.previous_sibling()
	}

	fn insert_before(&self, parent: &Node, node: &Node, reference: Option<&Node>) {
		if let Err(error) = parent.insert_before(node, reference) {
			error!("Failed to insert node: {:?}", error);
		}
	}

	fn remove(&self, node: &Node) {
		match node.parent_node() {
			Some(parent) => {
				if let Err(error) = parent.remove_child(node) {
					error!("Failed to remove the node: {:?}", error);
				}
			}
			None => trace!("Node to remove is already detached."),
		}
	}

	fn tag_name(&self, element: &Node) -> String {
		element.dyn_ref::<Element>().map(Element::local_name).unwrap_or_default()
	}

	fn data(&self, node: &Node) -> String {
		node.node_value().unwrap_or_default()
	}

	fn set_data(&self, node: &Node, data: &str) {
		node.set_node_value(Some(data));
	}

	fn attribute_names(&self, element: &Node) -> Vec<String> {
		element
			.dyn_ref::<Element>()
			.map(|element| element.get_attribute_names().iter().filter_map(|name| name.as_string()).collect())
			.unwrap_or_default()
	}

	fn get_attribute(&self, element: &Node, name: &str) -> Option<String> {
		element.dyn_ref::<Element>()?.get_attribute(name)
	}

	fn set_attribute(&self, element: &Node, name: &str, value: &str) {
		if let Some(element) = Self::element(element, "set an attribute") {
			if let Err(error) = element.set_attribute(name, value) {
				error!("Failed to set attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn remove_attribute(&self, element: &Node, name: &str) {
		if let Some(element) = Self::element(element, "remove an attribute") {
			if let Err(error) = element.remove_attribute(name) {
				error!("Failed to remove attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn set_property(&self, element: &Node, name: &str, value: &Value) {
		if let Err(error) = Reflect::set(element, &JsValue::from_str(name), &to_js(value)) {
			error!("Failed to set property {:?}: {:?}", name, error);
		}
	}

	fn add_event_listener(&self, element: &Node, event: &str, listener: &Rc<ListenerSlot>, options: ListenerOptions) {
		let handler = self.get_or_create_handler(listener);
		let web_options = self.add_event_listener_options(options);
		if let Err(error) = element.add_event_listener_with_callback_and_add_event_listener_options(event, &handler, &web_options) {
			error!("Failed to add event listener: {:?}", error);
		}
	}

	fn remove_event_listener(&self, element: &Node, event: &str, listener: &Rc<ListenerSlot>, options: ListenerOptions) {
		match self.handler(listener) {
			Some(handler) => {
				if let Err(error) = element.remove_event_listener_with_callback_and_bool(event, &handler, options.capture) {
					error!("Failed to remove event listener: {:?}", error);
				}
			}
			None => error!("No native handler registered for the listener to remove."),
		}
	}
}
