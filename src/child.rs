//! Child parts: the content between a start marker and an end boundary.

use crate::{
	directive::{Bound, DirectiveResult, PartInfo, Pending, Sink},
	dom::{remove_range, remove_until, Dom, NodeKind},
	error::Error,
	instance::TemplateInstance,
	keyed::{self, KeyedItem, KeyedPart},
	render::Context,
	template::TemplateResult,
	value::Value,
};
use core::{cell::RefCell, mem};
use std::rc::{Rc, Weak};
use tracing::{error, trace_span};

/// What a [`ChildPart`] currently shows.
pub(crate) enum Committed<D: Dom> {
	/// Nothing committed yet, or a commit failed. The range may contain leftovers.
	Empty,
	Nothing,
	Primitive(Value),
	Template(TemplateInstance<D>),
	List(Vec<ChildPart<D>>),
	Keyed(Vec<KeyedPart<D>>),
	Directive(Box<ChildDirective<D>>),
}

impl<D: Dom> Committed<D> {
	/// Recursively notifies the directives below.
	fn set_connected(&mut self, connected: bool) {
		match self {
			Committed::Empty | Committed::Nothing | Committed::Primitive(_) => (),
			Committed::Template(instance) => instance.set_connected(connected),
			Committed::List(parts) => {
				for part in parts {
					part.set_connected(connected);
				}
			}
			Committed::Keyed(parts) => {
				for keyed in parts {
					keyed.part.set_connected(connected);
				}
			}
			Committed::Directive(directive) => {
				directive.content.borrow_mut().set_connected(connected);
				directive.bound.set_connected(connected);
			}
		}
	}

	/// Drops this state after disconnecting every directive in it.
	fn discard(mut self) {
		self.set_connected(false);
	}
}

/// A directive bound to a child part, with the part it commits into.
pub(crate) struct ChildDirective<D: Dom> {
	bound: Bound,
	/// Shares the markers of the part that owns the directive.
	content: Rc<RefCell<ChildPart<D>>>,
}

impl<D: Dom> ChildDirective<D> {
	fn new(cx: &Context<D>, result: &DirectiveResult, content: ChildPart<D>) -> Self {
		let connected = content.is_connected();
		let content = Rc::new(RefCell::new(content));
		let sink = ChildSink {
			content: Rc::downgrade(&content),
			cx: cx.clone(),
		};
		Self {
			bound: Bound::new(result, &PartInfo::child(), Box::new(sink), connected, cx.spawner().cloned()),
			content,
		}
	}

	/// Binds `result` to `content`, which shows the directive's value already.
	///
	/// # Errors
	///
	/// Iff the directive fails to update.
	pub(crate) fn hydrate(cx: &Context<D>, result: &DirectiveResult, content: ChildPart<D>) -> Result<(Self, Value), Error> {
		let mut directive = Self::new(cx, result, content);
		let value = directive.bound.update(result)?;
		Ok((directive, value))
	}

	pub(crate) fn content(&self) -> &Rc<RefCell<ChildPart<D>>> {
		&self.content
	}
}

struct ChildSink<D: Dom> {
	content: Weak<RefCell<ChildPart<D>>>,
	cx: Context<D>,
}

impl<D: Dom> Sink for ChildSink<D> {
	fn commit(&self, value: Pending) -> Result<(), Error> {
		let content = match self.content.upgrade() {
			Some(content) => content,
			None => return Ok(()),
		};
		let mut content = content.try_borrow_mut().map_err(|_| Error::PartBusy)?;
		match value {
			Pending::Set(value) => content.set_value(&self.cx, value),
			Pending::Append(value) => content.append(&self.cx, value),
		}
	}
}

/// Manages the nodes after `start` and before `end`.
///
/// `start` is always a comment. `end` is `None` at the end of the parent.
pub(crate) struct ChildPart<D: Dom> {
	start: D::Node,
	end: Option<D::Node>,
	committed: Committed<D>,
	connected: bool,
}

impl<D: Dom> ChildPart<D> {
	pub(crate) fn new(start: D::Node, end: Option<D::Node>, connected: bool) -> Self {
		Self::with_committed(start, end, Committed::Empty, connected)
	}

	/// A part over existing content, which `committed` already describes.
	pub(crate) fn with_committed(start: D::Node, end: Option<D::Node>, committed: Committed<D>, connected: bool) -> Self {
		Self {
			start,
			end,
			committed,
			connected,
		}
	}

	pub(crate) fn start(&self) -> &D::Node {
		&self.start
	}

	pub(crate) fn end(&self) -> Option<&D::Node> {
		self.end.as_ref()
	}

	pub(crate) fn is_connected(&self) -> bool {
		self.connected
	}

	pub(crate) fn parent(&self, dom: &D) -> Option<D::Node> {
		dom.parent(&self.start)
	}

	/// Inserts `node` (or a fragment's children) before `before`, or at the end of this part.
	pub(crate) fn insert(&self, dom: &D, node: &D::Node, before: Option<&D::Node>) {
		match self.parent(dom) {
			Some(parent) => dom.insert_before(&parent, node, before.or(self.end.as_ref())),
			None => error!("Child part start marker {:?} is detached. Dropping inserted content.", self.start),
		}
	}

	/// Removes everything between the markers.
	pub(crate) fn clear(&self, dom: &D) {
		remove_until(dom, dom.next_sibling(&self.start), self.end.as_ref());
	}

	/// Removes this part's content and its markers. Only for parts with an end marker of their own.
	pub(crate) fn remove(&self, dom: &D) {
		match &self.end {
			Some(end) => remove_range(dom, &self.start, end),
			None => {
				self.clear(dom);
				dom.remove(&self.start);
			}
		}
	}

	/// A new part with its own marker pair, inserted before `before` or at the end of this part.
	pub(crate) fn insert_item(&self, dom: &D, before: Option<&D::Node>) -> ChildPart<D> {
		let start = dom.create_comment("");
		let end = dom.create_comment("");
		self.insert(dom, &start, before);
		self.insert(dom, &end, before);
		ChildPart::new(start, Some(end), self.connected)
	}

	/// Removes this part with its content, disconnecting the directives in it first.
	pub(crate) fn dispose(mut self, dom: &D) {
		self.set_connected(false);
		self.remove(dom);
	}

	/// Discards the committed state and clears the range.
	fn release(&mut self, dom: &D) {
		mem::replace(&mut self.committed, Committed::Empty).discard();
		self.clear(dom);
	}

	/// Commits `value`, touching the DOM only where it differs from what is committed.
	///
	/// # Errors
	///
	/// If a nested template can't be prepared, carries the wrong number of values,
	/// or a directive fails to update. The part may then be left empty.
	pub(crate) fn set_value(&mut self, cx: &Context<D>, value: Value) -> Result<(), Error> {
		match value {
			Value::NoChange => Ok(()),
			Value::Nothing => {
				if !matches!(self.committed, Committed::Nothing) {
					self.release(cx.dom());
					self.committed = Committed::Nothing;
				}
				Ok(())
			}
			Value::Template(result) => self.commit_template(cx, result),
			Value::List(items) => self.commit_list(cx, items),
			Value::Keyed(items) => self.commit_keyed(cx, items),
			Value::Directive(result) => self.commit_directive(cx, result),
			value if value.is_primitive() => {
				self.commit_text(cx.dom(), value);
				Ok(())
			}
			value => {
				self.commit_text(cx.dom(), Value::Str(value.to_text().into()));
				Ok(())
			}
		}
	}

	fn commit_text(&mut self, dom: &D, value: Value) {
		if let Committed::Primitive(committed) = &self.committed {
			if committed.strict_eq(&value) {
				return;
			}
		}

		let text = value.to_text();
		let single_text = dom
			.next_sibling(&self.start)
			.filter(|node| dom.node_kind(node) == NodeKind::Text && dom.next_sibling(node).as_ref() == self.end.as_ref());
		match (&self.committed, single_text) {
			(Committed::Primitive(_), Some(node)) => dom.set_data(&node, &text),
			_ => {
				self.release(dom);
				self.insert(dom, &dom.create_text(&text), None);
			}
		}
		self.committed = Committed::Primitive(value);
	}

	fn commit_template(&mut self, cx: &Context<D>, result: TemplateResult) -> Result<(), Error> {
		let template = cx.template(&result)?;

		match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::Template(mut instance) if Rc::ptr_eq(instance.template(), &template) => {
				instance.update(cx, result.into_values())?;
				self.committed = Committed::Template(instance);
				return Ok(());
			}
			previous => previous.discard(),
		}

		let span = trace_span!("instantiate", digest = template.digest());
		let _enter = span.enter();

		let dom = cx.dom();
		let (fragment, mut instance) = TemplateInstance::create(dom, template, self.connected)?;
		instance.update(cx, result.into_values())?;
		self.clear(dom);
		self.insert(dom, &fragment, None);
		self.committed = Committed::Template(instance);
		Ok(())
	}

	/// Positional reconciliation: item parts are reused by index, surplus ones removed.
	fn commit_list(&mut self, cx: &Context<D>, items: Vec<Value>) -> Result<(), Error> {
		let dom = cx.dom();
		let mut parts = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::List(parts) => parts,
			previous => {
				previous.discard();
				self.clear(dom);
				Vec::new()
			}
		};

		let mut used = 0;
		for item in items {
			if used == parts.len() {
				parts.push(self.insert_item(dom, None));
			}
			parts[used].set_value(cx, item)?;
			used += 1;
		}
		for surplus in parts.drain(used..) {
			surplus.dispose(dom);
		}

		self.committed = Committed::List(parts);
		Ok(())
	}

	fn commit_keyed(&mut self, cx: &Context<D>, items: Vec<KeyedItem>) -> Result<(), Error> {
		let old = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::Keyed(parts) => parts,
			previous => {
				previous.discard();
				self.clear(cx.dom());
				Vec::new()
			}
		};

		let span = trace_span!("reconcile", old = old.len(), new = items.len());
		let _enter = span.enter();
		let parts = keyed::reconcile(cx, self, old, keyed::dedupe(items))?;
		self.committed = Committed::Keyed(parts);
		Ok(())
	}

	/// Keeps the bound instance while `result` is for the same directive type.
	fn commit_directive(&mut self, cx: &Context<D>, result: DirectiveResult) -> Result<(), Error> {
		let mut directive = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::Directive(directive) if directive.bound.accepts(&result) => directive,
			previous => {
				previous.discard();
				self.clear(cx.dom());
				let content = ChildPart::new(self.start.clone(), self.end.clone(), self.connected);
				Box::new(ChildDirective::new(cx, &result, content))
			}
		};

		let committed = directive
			.bound
			.update(&result)
			.and_then(|value| directive.content.borrow_mut().set_value(cx, value));
		self.committed = Committed::Directive(directive);
		committed
	}

	/// Appends `value` as a new item, for [`async_append`](`crate::async_append`).
	pub(crate) fn append(&mut self, cx: &Context<D>, value: Value) -> Result<(), Error> {
		let dom = cx.dom();
		let mut parts = match mem::replace(&mut self.committed, Committed::Empty) {
			Committed::List(parts) => parts,
			previous => {
				previous.discard();
				self.clear(dom);
				Vec::new()
			}
		};

		let mut item = self.insert_item(dom, None);
		let result = item.set_value(cx, value);
		parts.push(item);
		self.committed = Committed::List(parts);
		result
	}

	/// Recursively notifies the directives below this part.
	pub(crate) fn set_connected(&mut self, connected: bool) {
		if self.connected == connected {
			return;
		}
		self.connected = connected;
		self.committed.set_connected(connected);
	}
}
