//! An in-memory [`Dom`].
//!
//! Parsing uses [`html5gum`]'s tokenizer with a simplified tree builder:
//! no implied end tags, no foster parenting, and `<script>`/`<style>` content is tokenized like any other text.
//! Attributes come out of the tokenizer sorted by name. That's enough for templates and for markup this crate serializes itself.
//!
//! Nodes are never freed while the [`MemoryDom`] lives.

use crate::{
	dom::{Dom, NodeKind},
	value::{Event, ListenerOptions, ListenerSlot, Value},
};
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use html5gum::{Token, Tokenizer};
use std::{borrow::Cow, rc::Rc};
use tracing::{error, trace};

/// A node handle of a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

const VOID_ELEMENTS: [&str; 14] = [
	"area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta", "param", "source", "track",
];

fn is_void_element(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag) || tag == "wbr"
}

struct Registration {
	event: String,
	slot: Rc<ListenerSlot>,
	options: ListenerOptions,
}

enum Data {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		properties: HashMap<String, Value>,
		listeners: Vec<Registration>,
	},
	Text(String),
	Comment(String),
	Fragment,
}

/// Children are linked through their siblings, so that the tree walks of the renderer stay O(1) per step.
struct NodeData {
	data: Data,
	parent: Option<NodeId>,
	first_child: Option<NodeId>,
	last_child: Option<NodeId>,
	previous: Option<NodeId>,
	next: Option<NodeId>,
}

impl NodeData {
	fn new(data: Data) -> Self {
		Self {
			data,
			parent: None,
			first_child: None,
			last_child: None,
			previous: None,
			next: None,
		}
	}
}

fn children(nodes: &[NodeData], parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
	core::iter::successors(nodes[parent.0].first_child, move |child| nodes[child.0].next)
}

/// A DOM that lives in memory, for native hosts, server rendering and tests.
///
/// Mutations of nodes outside of fragments (that is: of the "document") are counted, see [`MemoryDom::mutation_count`].
#[derive(Default)]
pub struct MemoryDom {
	nodes: RefCell<Vec<NodeData>>,
	mutations: Cell<usize>,
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn alloc(&self, data: Data) -> NodeId {
		let mut nodes = self.nodes.borrow_mut();
		nodes.push(NodeData::new(data));
		NodeId(nodes.len() - 1)
	}

	/// A detached element, for example to render into.
	#[must_use]
	pub fn create_element(&self, tag: &str) -> NodeId {
		self.alloc(Data::Element {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
			properties: HashMap::new(),
			listeners: Vec::new(),
		})
	}

	#[must_use]
	pub fn create_fragment(&self) -> NodeId {
		self.alloc(Data::Fragment)
	}

	/// How often nodes outside of fragments were changed so far.
	#[must_use]
	pub fn mutation_count(&self) -> usize {
		self.mutations.get()
	}

	fn is_live(nodes: &[NodeData], mut id: NodeId) -> bool {
		while let Some(parent) = nodes[id.0].parent {
			id = parent;
		}
		!matches!(nodes[id.0].data, Data::Fragment)
	}

	fn record(&self, nodes: &[NodeData], id: NodeId) {
		if Self::is_live(nodes, id) {
			self.mutations.set(self.mutations.get() + 1);
		}
	}

	fn detach(nodes: &mut [NodeData], id: NodeId) {
		let parent = match nodes[id.0].parent.take() {
			Some(parent) => parent,
			None => return,
		};
		let previous = nodes[id.0].previous.take();
		let next = nodes[id.0].next.take();
		match previous {
			Some(previous) => nodes[previous.0].next = next,
			None => nodes[parent.0].first_child = next,
		}
		match next {
			Some(next) => nodes[next.0].previous = previous,
			None => nodes[parent.0].last_child = previous,
		}
	}

	/// Links the detached `child` into `parent` before `before`, or last.
	fn link(nodes: &mut [NodeData], parent: NodeId, child: NodeId, before: Option<NodeId>) {
		let previous = match before {
			Some(before) => nodes[before.0].previous,
			None => nodes[parent.0].last_child,
		};
		nodes[child.0].parent = Some(parent);
		nodes[child.0].previous = previous;
		nodes[child.0].next = before;
		match previous {
			Some(previous) => nodes[previous.0].next = Some(child),
			None => nodes[parent.0].first_child = Some(child),
		}
		match before {
			Some(before) => nodes[before.0].previous = Some(child),
			None => nodes[parent.0].last_child = Some(child),
		}
	}

	fn append(nodes: &mut [NodeData], parent: NodeId, child: NodeId) {
		Self::link(nodes, parent, child, None);
	}

	#[must_use]
	pub fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
		children(&self.nodes.borrow(), node).collect()
	}

	/// The concatenated text below `node`.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		fn collect(nodes: &[NodeData], id: NodeId, out: &mut String) {
			match &nodes[id.0].data {
				Data::Text(text) => out.push_str(text),
				Data::Comment(_) => (),
				Data::Element { .. } | Data::Fragment => {
					for child in children(nodes, id) {
						collect(nodes, child, out);
					}
				}
			}
		}

		let mut text = String::new();
		collect(&self.nodes.borrow(), node, &mut text);
		text
	}

	/// Replaces the children of `node` with parsed `html`. This isn't counted as mutation.
	pub fn set_inner_html(&self, node: NodeId, html: &str) {
		{
			let mut nodes = self.nodes.borrow_mut();
			let previous: Vec<NodeId> = children(&nodes, node).collect();
			for child in previous {
				Self::detach(&mut nodes, child);
			}
		}
		self.parse_into(node, html);
	}

	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let nodes = self.nodes.borrow();
		let mut html = String::new();
		for child in children(&nodes, node) {
			write_html(&nodes, child, &mut html);
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		write_html(&self.nodes.borrow(), node, &mut html);
		html
	}

	/// The last value assigned to the element's `name` property.
	#[must_use]
	pub fn property(&self, element: NodeId, name: &str) -> Option<Value> {
		match &self.nodes.borrow()[element.0].data {
			Data::Element { properties, .. } => properties.get(name).cloned(),
			_ => None,
		}
	}

	/// The number of native listeners for `event` on `element`.
	#[must_use]
	pub fn listener_count(&self, element: NodeId, event: &str) -> usize {
		match &self.nodes.borrow()[element.0].data {
			Data::Element { listeners, .. } => listeners.iter().filter(|registration| registration.event == event).count(),
			_ => 0,
		}
	}

	/// Calls the listeners for `event` registered directly on `target`, and returns how many there were.
	///
	/// There is no propagation.
	pub fn dispatch_event(&self, target: NodeId, event: &Event) -> usize {
		let slots: Vec<Rc<ListenerSlot>> = {
			let mut nodes = self.nodes.borrow_mut();
			match &mut nodes[target.0].data {
				Data::Element { listeners, .. } => {
					let slots = listeners.iter().filter(|registration| registration.event == event.kind()).map(|registration| registration.slot.clone()).collect();
					listeners.retain(|registration| !(registration.event == event.kind() && registration.options.once));
					slots
				}
				_ => Vec::new(),
			}
		};
		for slot in &slots {
			slot.handle_event(event);
		}
		slots.len()
	}

	fn parse_into(&self, parent: NodeId, html: &str) {
		let mut nodes = self.nodes.borrow_mut();
		let mut stack = vec![parent];

		for token in Tokenizer::new(html).infallible() {
			let current = *stack.last().unwrap_or(&parent);
			match token {
				Token::StartTag(tag) => {
					let name = String::from_utf8_lossy(&tag.name).into_owned();
					let attributes = tag
						.attributes
						.iter()
						.map(|(name, value)| (String::from_utf8_lossy(name).into_owned(), String::from_utf8_lossy(value).into_owned()))
						.collect();
					let void = is_void_element(&name);
					nodes.push(NodeData::new(Data::Element {
						tag: name,
						attributes,
						properties: HashMap::new(),
						listeners: Vec::new(),
					}));
					let element = NodeId(nodes.len() - 1);
					Self::append(&mut nodes, current, element);
					if !void && !tag.self_closing {
						stack.push(element);
					}
				}
				Token::EndTag(tag) => {
					let name = String::from_utf8_lossy(&tag.name);
					let open = stack[1..].iter().rposition(|&id| matches!(&nodes[id.0].data, Data::Element { tag, .. } if *tag == name));
					match open {
						Some(position) => stack.truncate(position + 1),
						None => trace!("Ignoring stray end tag </{}>.", name),
					}
				}
				Token::String(text) => {
					let text = String::from_utf8_lossy(&text);
					let last = nodes[current.0].last_child;
					if let Some(last) = last {
						if let Data::Text(existing) = &mut nodes[last.0].data {
							existing.push_str(&text);
							continue;
						}
					}
					nodes.push(NodeData::new(Data::Text(text.into_owned())));
					let node = NodeId(nodes.len() - 1);
					Self::append(&mut nodes, current, node);
				}
				Token::Comment(data) => {
					nodes.push(NodeData::new(Data::Comment(String::from_utf8_lossy(&data).into_owned())));
					let node = NodeId(nodes.len() - 1);
					Self::append(&mut nodes, current, node);
				}
				Token::Doctype(_) => (),
				Token::Error(error) => trace!("HTML parse error: {:?}", error),
			}
		}
	}

	fn clone_subtree(&self, node: NodeId) -> NodeId {
		let (data, children) = {
			let nodes = self.nodes.borrow();
			let source = &nodes[node.0];
			let data = match &source.data {
				Data::Element { tag, attributes, .. } => Data::Element {
					tag: tag.clone(),
					attributes: attributes.clone(),
					properties: HashMap::new(),
					listeners: Vec::new(),
				},
				Data::Text(text) => Data::Text(text.clone()),
				Data::Comment(comment) => Data::Comment(comment.clone()),
				Data::Fragment => Data::Fragment,
			};
			(data, children(&nodes, node).collect::<Vec<_>>())
		};

		let clone = self.alloc(data);
		for child in children {
			let child = self.clone_subtree(child);
			Self::append(&mut self.nodes.borrow_mut(), clone, child);
		}
		clone
	}
}

impl Dom for MemoryDom {
	type Node = NodeId;

	fn create_comment(&self, data: &str) -> NodeId {
		self.alloc(Data::Comment(data.to_owned()))
	}

	fn create_text(&self, data: &str) -> NodeId {
		self.alloc(Data::Text(data.to_owned()))
	}

	fn parse_fragment(&self, html: &str) -> NodeId {
		let fragment = self.create_fragment();
		self.parse_into(fragment, html);
		fragment
	}

	fn import(&self, node: &NodeId) -> NodeId {
		self.clone_subtree(*node)
	}

	fn node_kind(&self, node: &NodeId) -> NodeKind {
		match self.nodes.borrow()[node.0].data {
			Data::Element { .. } => NodeKind::Element,
			Data::Text(_) => NodeKind::Text,
			Data::Comment(_) => NodeKind::Comment,
			Data::Fragment => NodeKind::Fragment,
		}
	}

	fn parent(&self, node: &NodeId) -> Option<NodeId> {
		self.nodes.borrow()[node.0].parent
	}

	fn first_child(&self, node: &NodeId) -> Option<NodeId> {
		self.nodes.borrow()[node.0].first_child
	}

	fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
		self.nodes.borrow()[node.0].next
	}

	fn previous_sibling(&self, node: &NodeId) -> Option<NodeId> {
		self.nodes.borrow()[node.0].previous
	}

	fn insert_before(&self, parent: &NodeId, node: &NodeId, reference: Option<&NodeId>) {
		let mut nodes = self.nodes.borrow_mut();
		let moved: Vec<NodeId> = match nodes[node.0].data {
			Data::Fragment => children(&nodes, *node).collect(),
			_ => vec![*node],
		};
		let reference = match reference {
			Some(reference) if nodes[reference.0].parent != Some(*parent) => {
				error!("Reference node {:?} is not a child of {:?}. Appending instead.", reference, parent);
				None
			}
			reference => reference.copied(),
		};
		for node in moved {
			if Some(node) == reference {
				continue;
			}
			Self::detach(&mut nodes, node);
			Self::link(&mut nodes, *parent, node, reference);
		}
		self.record(&nodes, *parent);
	}

	fn remove(&self, node: &NodeId) {
		let mut nodes = self.nodes.borrow_mut();
		if nodes[node.0].parent.is_some() {
			self.record(&nodes, *node);
			Self::detach(&mut nodes, *node);
		}
	}

	fn tag_name(&self, element: &NodeId) -> String {
		match &self.nodes.borrow()[element.0].data {
			Data::Element { tag, .. } => tag.clone(),
			_ => String::new(),
		}
	}

	fn data(&self, node: &NodeId) -> String {
		match &self.nodes.borrow()[node.0].data {
			Data::Text(data) | Data::Comment(data) => data.clone(),
			_ => String::new(),
		}
	}

	fn set_data(&self, node: &NodeId, data: &str) {
		let mut nodes = self.nodes.borrow_mut();
		match &mut nodes[node.0].data {
			Data::Text(existing) | Data::Comment(existing) => *existing = data.to_owned(),
			_ => return error!("Can't set data of {:?}, which is neither text nor comment.", node),
		}
		self.record(&nodes, *node);
	}

	fn attribute_names(&self, element: &NodeId) -> Vec<String> {
		match &self.nodes.borrow()[element.0].data {
			Data::Element { attributes, .. } => attributes.iter().map(|(name, _)| name.clone()).collect(),
			_ => Vec::new(),
		}
	}

	fn get_attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		match &self.nodes.borrow()[element.0].data {
			Data::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) {
		let mut nodes = self.nodes.borrow_mut();
		match &mut nodes[element.0].data {
			Data::Element { attributes, .. } => match attributes.iter_mut().find(|(n, _)| n == name) {
				Some((_, existing)) => *existing = value.to_owned(),
				None => attributes.push((name.to_owned(), value.to_owned())),
			},
			_ => return error!("Can't set attribute {:?} on non-element {:?}.", name, element),
		}
		self.record(&nodes, *element);
	}

	fn remove_attribute(&self, element: &NodeId, name: &str) {
		let mut nodes = self.nodes.borrow_mut();
		let removed = match &mut nodes[element.0].data {
			Data::Element { attributes, .. } => {
				let before = attributes.len();
				attributes.retain(|(n, _)| n != name);
				attributes.len() != before
			}
			_ => false,
		};
		if removed {
			self.record(&nodes, *element);
		}
	}

	fn set_property(&self, element: &NodeId, name: &str, value: &Value) {
		let mut nodes = self.nodes.borrow_mut();
		match &mut nodes[element.0].data {
			Data::Element { properties, .. } => {
				let value = match value {
					Value::Nothing => Value::Undefined,
					value => value.clone(),
				};
				properties.insert(name.to_owned(), value);
			}
			_ => return error!("Can't set property {:?} on non-element {:?}.", name, element),
		}
		self.record(&nodes, *element);
	}

	fn add_event_listener(&self, element: &NodeId, event: &str, listener: &Rc<ListenerSlot>, options: ListenerOptions) {
		let mut nodes = self.nodes.borrow_mut();
		match &mut nodes[element.0].data {
			Data::Element { listeners, .. } => {
				let duplicate = listeners
					.iter()
					.any(|registration| registration.event == event && Rc::ptr_eq(&registration.slot, listener) && registration.options.capture == options.capture);
				if duplicate {
					return;
				}
				listeners.push(Registration {
					event: event.to_owned(),
					slot: listener.clone(),
					options,
				});
			}
			_ => return error!("Can't listen for {:?} on non-element {:?}.", event, element),
		}
		self.record(&nodes, *element);
	}

	fn remove_event_listener(&self, element: &NodeId, event: &str, listener: &Rc<ListenerSlot>, options: ListenerOptions) {
		let mut nodes = self.nodes.borrow_mut();
		if let Data::Element { listeners, .. } = &mut nodes[element.0].data {
			listeners.retain(|registration| !(registration.event == event && Rc::ptr_eq(&registration.slot, listener) && registration.options.capture == options.capture));
		}
		self.record(&nodes, *element);
	}
}

/// Escapes `&`, `<` and `>`.
pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
	if !text.contains(|c| matches!(c, '&' | '<' | '>')) {
		return Cow::Borrowed(text);
	}
	let mut escaped = String::with_capacity(text.len() + 8);
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			c => escaped.push(c),
		}
	}
	Cow::Owned(escaped)
}

/// Escapes `&` and `"` for double-quoted attribute values.
pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
	if !value.contains(|c| matches!(c, '&' | '"')) {
		return Cow::Borrowed(value);
	}
	let mut escaped = String::with_capacity(value.len() + 8);
	for c in value.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'"' => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	Cow::Owned(escaped)
}

/// Whether text inside `tag` is written out verbatim.
pub(crate) fn is_unescaped_text_element(tag: &str) -> bool {
	matches!(tag, "script" | "style")
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
	is_void_element(tag)
}

fn write_html(nodes: &[NodeData], id: NodeId, out: &mut String) {
	let node = &nodes[id.0];
	match &node.data {
		Data::Element { tag, attributes, .. } => {
			out.push('<');
			out.push_str(tag);
			for (name, value) in attributes {
				out.push(' ');
				out.push_str(name);
				out.push_str("=\"");
				out.push_str(&escape_attribute(value));
				out.push('"');
			}
			out.push('>');
			if is_void_element(tag) {
				return;
			}
			for child in children(nodes, id) {
				write_html(nodes, child, out);
			}
			out.push_str("</");
			out.push_str(tag);
			out.push('>');
		}
		Data::Text(text) => {
			let verbatim = node.parent.map_or(false, |parent| matches!(&nodes[parent.0].data, Data::Element { tag, .. } if is_unescaped_text_element(tag)));
			if verbatim {
				out.push_str(text);
			} else {
				out.push_str(&escape_text(text));
			}
		}
		Data::Comment(data) => {
			out.push_str("<!--");
			out.push_str(data);
			out.push_str("-->");
		}
		Data::Fragment => {
			for child in children(nodes, id) {
				write_html(nodes, child, out);
			}
		}
	}
}
