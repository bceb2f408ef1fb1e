//! The DOM adapter interface.
//!
//! Everything in this crate talks to the document only through a [`Dom`] implementation that is chosen once,
//! when a [`Renderer`](`crate::Renderer`) is created: [`MemoryDom`](`crate::MemoryDom`) anywhere,
//! or `WebDom` in the browser.

use crate::value::{ListenerOptions, ListenerSlot, Value};
use core::fmt::Debug;
use std::rc::Rc;

/// What a node is, as far as parts care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	Fragment,
	Other,
}

/// A document the parts can be committed to.
///
/// Node handles are cheap clones that compare by node identity.
/// Methods don't fail: backends that can fail log the problem and carry on, like a browser would with a broken script.
pub trait Dom: 'static {
	type Node: Clone + PartialEq + Debug + 'static;

	fn create_comment(&self, data: &str) -> Self::Node;
	fn create_text(&self, data: &str) -> Self::Node;

	/// Parses `html` as the content of a `<template>` element and returns the resulting fragment.
	fn parse_fragment(&self, html: &str) -> Self::Node;

	/// A deep clone of `node` that belongs to this document.
	fn import(&self, node: &Self::Node) -> Self::Node;

	fn node_kind(&self, node: &Self::Node) -> NodeKind;
	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn first_child(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn previous_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Inserts `node` into `parent` before `reference`, or at the end if there is no `reference`.
	///
	/// Inserting a fragment moves its children instead.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>);

	/// Detaches `node` from its parent.
	fn remove(&self, node: &Self::Node);

	/// The lowercase local name of an element.
	fn tag_name(&self, element: &Self::Node) -> String;

	/// Text or comment data.
	fn data(&self, node: &Self::Node) -> String;
	fn set_data(&self, node: &Self::Node, data: &str);

	fn attribute_names(&self, element: &Self::Node) -> Vec<String>;
	fn get_attribute(&self, element: &Self::Node, name: &str) -> Option<String>;
	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str);
	fn remove_attribute(&self, element: &Self::Node, name: &str);

	/// Assigns a property of the element object. `nothing` arrives as `undefined`.
	fn set_property(&self, element: &Self::Node, name: &str, value: &Value);

	fn add_event_listener(&self, element: &Self::Node, event: &str, listener: &Rc<ListenerSlot>, options: ListenerOptions);
	fn remove_event_listener(&self, element: &Self::Node, event: &str, listener: &Rc<ListenerSlot>, options: ListenerOptions);
}

/// The next node after `node` in document order, staying inside `root`.
pub(crate) fn next_in_tree<D: Dom>(dom: &D, node: &D::Node, root: &D::Node) -> Option<D::Node> {
	if let Some(child) = dom.first_child(node) {
		return Some(child);
	}
	let mut current = node.clone();
	loop {
		if &current == root {
			return None;
		}
		if let Some(sibling) = dom.next_sibling(&current) {
			return Some(sibling);
		}
		current = dom.parent(&current)?;
	}
}

/// A depth-first walk over the elements and comments below a root.
///
/// Text nodes are skipped, so indices counted along this walk are stable across whitespace and text changes.
pub(crate) struct Walker<D: Dom> {
	root: D::Node,
	current: D::Node,
	comments_only: bool,
}

impl<D: Dom> Walker<D> {
	pub(crate) fn new(root: D::Node) -> Self {
		Self {
			current: root.clone(),
			root,
			comments_only: false,
		}
	}

	pub(crate) fn comments(root: D::Node) -> Self {
		Self {
			comments_only: true,
			..Self::new(root)
		}
	}

	pub(crate) fn next(&mut self, dom: &D) -> Option<D::Node> {
		loop {
			let next = next_in_tree(dom, &self.current, &self.root)?;
			self.current = next.clone();
			match dom.node_kind(&next) {
				NodeKind::Comment => return Some(next),
				NodeKind::Element if !self.comments_only => return Some(next),
				_ => (),
			}
		}
	}
}

/// Removes the nodes from `from` up to (not including) `end`, or to the end of the parent.
pub(crate) fn remove_until<D: Dom>(dom: &D, from: Option<D::Node>, end: Option<&D::Node>) {
	let mut node = from;
	while let Some(current) = node {
		if Some(&current) == end {
			break;
		}
		node = dom.next_sibling(&current);
		dom.remove(&current);
	}
}

/// Removes `start` through `end`, both included.
pub(crate) fn remove_range<D: Dom>(dom: &D, start: &D::Node, end: &D::Node) {
	let mut node = Some(start.clone());
	while let Some(current) = node {
		node = if &current == end { None } else { dom.next_sibling(&current) };
		dom.remove(&current);
	}
}

/// Moves `start` through `end`, both included, before `before` (or to the end of `parent`).
pub(crate) fn move_range<D: Dom>(dom: &D, parent: &D::Node, start: &D::Node, end: &D::Node, before: Option<&D::Node>) {
	if dom.next_sibling(end).as_ref() == before {
		return;
	}
	let mut node = Some(start.clone());
	while let Some(current) = node {
		node = if &current == end { None } else { dom.next_sibling(&current) };
		dom.insert_before(parent, &current, before);
	}
}
