//! Attribute-like and element parts.
//!
//! Both keep what they commit behind an `Rc<RefCell<…>>`, so that directives bound to them can commit values later on.

use crate::{
	directive::{Bound, PartInfo, Pending, Sink},
	dom::Dom,
	error::Error,
	render::Context,
	template::{PartDescriptor, PartKind},
	value::{ElementCallback, EventListener, ListenerSlot, Value},
};
use core::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

/// An `name=…`, `.name=…`, `?name=…` or `@name=…` binding on one element.
pub(crate) struct AttributePart<D: Dom> {
	target: Rc<RefCell<AttributeTarget<D>>>,
	/// One slot per expression.
	directives: Vec<Option<Bound>>,
	connected: bool,
}

struct AttributeTarget<D: Dom> {
	element: D::Node,
	name: String,
	kind: PartKind,
	/// `None` for a single expression that is the entire value.
	strings: Option<Rc<[String]>>,
	values: Vec<Value>,
	listener: Option<Registered>,
}

struct Registered {
	slot: Rc<ListenerSlot>,
	listener: EventListener,
}

impl<D: Dom> AttributePart<D> {
	pub(crate) fn new(element: D::Node, descriptor: &PartDescriptor, connected: bool) -> Self {
		let strings = descriptor
			.strings
			.clone()
			.filter(|strings| !(strings.len() == 2 && strings.iter().all(String::is_empty)));
		let count = descriptor.value_count();
		Self {
			target: Rc::new(RefCell::new(AttributeTarget {
				element,
				name: descriptor.name.clone().unwrap_or_default(),
				kind: descriptor.kind,
				values: vec![Value::Nothing; count],
				strings,
				listener: None,
			})),
			directives: (0..count).map(|_| None).collect(),
			connected,
		}
	}

	pub(crate) fn value_count(&self) -> usize {
		self.directives.len()
	}

	/// Dirty-checks `values` against the committed ones and writes to the DOM only if something changed.
	///
	/// # Errors
	///
	/// Iff a directive fails to update.
	pub(crate) fn set_values(&mut self, cx: &Context<D>, values: Vec<Value>) -> Result<(), Error> {
		let values = self.resolve(cx, values)?;
		self.target.borrow_mut().set_values(cx.dom(), values);
		Ok(())
	}

	/// Takes `values` as committed without writing anything, for server-rendered markup that already shows them.
	///
	/// # Errors
	///
	/// Iff a directive fails to update.
	pub(crate) fn prime(&mut self, cx: &Context<D>, values: Vec<Value>) -> Result<(), Error> {
		let values = self.resolve(cx, values)?;
		self.target.borrow_mut().update(values);
		Ok(())
	}

	/// Takes over `values` and commits them unconditionally.
	///
	/// # Errors
	///
	/// Iff a directive fails to update.
	pub(crate) fn force(&mut self, cx: &Context<D>, values: Vec<Value>) -> Result<(), Error> {
		let values = self.resolve(cx, values)?;
		let mut target = self.target.borrow_mut();
		target.update(values);
		target.commit(cx.dom());
		Ok(())
	}

	/// Replaces directive results with the values their directives return.
	fn resolve(&mut self, cx: &Context<D>, values: Vec<Value>) -> Result<Vec<Value>, Error> {
		let (kind, name) = {
			let target = self.target.borrow();
			(target.kind, target.name.clone())
		};
		let connected = self.connected;
		let target = &self.target;
		let mut resolved = Vec::with_capacity(values.len());
		for (index, (slot, value)) in self.directives.iter_mut().zip(values).enumerate() {
			resolved.push(resolve(cx, slot, value, connected, || {
				let sink = AttributeSink {
					target: Rc::downgrade(target),
					index,
					dom: cx.dom_rc().clone(),
				};
				(PartInfo::new(kind, Some(name.clone())), Box::new(sink) as Box<dyn Sink>)
			})?);
		}
		Ok(resolved)
	}

	pub(crate) fn set_connected(&mut self, connected: bool) {
		self.connected = connected;
		for bound in self.directives.iter_mut().flatten() {
			bound.set_connected(connected);
		}
	}
}

impl<D: Dom> AttributeTarget<D> {
	fn set_values(&mut self, dom: &D, values: Vec<Value>) {
		if self.update(values) {
			self.commit(dom);
		}
	}

	fn update(&mut self, values: Vec<Value>) -> bool {
		let mut changed = false;
		for (committed, value) in self.values.iter_mut().zip(values) {
			if matches!(value, Value::NoChange) {
				continue;
			}
			let dirty = match self.kind {
				// Listeners are compared by callback, so that a re-created closure swaps the handler.
				PartKind::Event => *committed != value,
				_ if value.is_primitive() || matches!(value, Value::Nothing) => !committed.strict_eq(&value),
				_ => *committed != value,
			};
			if dirty {
				*committed = value;
				changed = true;
			}
		}
		changed
	}

	fn commit(&mut self, dom: &D) {
		match self.kind {
			PartKind::Attribute => match interpolate(self.strings.as_deref(), &self.values) {
				Some(value) => dom.set_attribute(&self.element, &self.name, &value),
				None => dom.remove_attribute(&self.element, &self.name),
			},
			PartKind::Property => dom.set_property(&self.element, &self.name, &self.values[0]),
			PartKind::BooleanAttribute => {
				if self.values[0].is_truthy() {
					dom.set_attribute(&self.element, &self.name, "");
				} else {
					dom.remove_attribute(&self.element, &self.name);
				}
			}
			PartKind::Event => self.commit_listener(dom),
			PartKind::Child | PartKind::Element | PartKind::Comment => (),
		}
	}

	fn commit_listener(&mut self, dom: &D) {
		let listener = match &self.values[0] {
			Value::Listener(listener) => Some(listener.clone()),
			Value::Nothing | Value::Undefined | Value::Null => None,
			other => {
				if cfg!(feature = "dangerous-logging") {
					warn!("Ignoring non-listener value {:?} bound to event {:?}.", other, self.name);
				} else {
					warn!("Ignoring non-listener value bound to event {:?}.", self.name);
				}
				None
			}
		};

		match (self.listener.take(), listener) {
			(None, None) => (),
			(Some(registered), None) => {
				trace!("Removing listener for {:?}.", self.name);
				dom.remove_event_listener(&self.element, &self.name, &registered.slot, registered.listener.options());
				registered.slot.set(None);
			}
			(Some(registered), Some(listener)) if registered.listener.options() == listener.options() => {
				registered.slot.set(Some(listener.clone()));
				self.listener = Some(Registered {
					slot: registered.slot,
					listener,
				});
			}
			(previous, Some(listener)) => {
				let slot = match previous {
					Some(registered) => {
						trace!("Re-registering listener for {:?} with new options.", self.name);
						dom.remove_event_listener(&self.element, &self.name, &registered.slot, registered.listener.options());
						registered.slot
					}
					None => Rc::new(ListenerSlot::default()),
				};
				slot.set(Some(listener.clone()));
				dom.add_event_listener(&self.element, &self.name, &slot, listener.options());
				self.listener = Some(Registered { slot, listener });
			}
		}
	}
}

struct AttributeSink<D: Dom> {
	target: Weak<RefCell<AttributeTarget<D>>>,
	index: usize,
	dom: Rc<D>,
}

impl<D: Dom> Sink for AttributeSink<D> {
	fn commit(&self, value: Pending) -> Result<(), Error> {
		let target = match self.target.upgrade() {
			Some(target) => target,
			None => return Ok(()),
		};
		let mut target = target.try_borrow_mut().map_err(|_| Error::PartBusy)?;
		let (Pending::Set(value) | Pending::Append(value)) = value;
		let mut values = vec![Value::NoChange; target.values.len()];
		if let Some(slot) = values.get_mut(self.index) {
			*slot = value;
		}
		target.set_values(&self.dom, values);
		Ok(())
	}
}

/// Resolves `value` through the directive in `slot`, binding a new one first where the directive type changed.
///
/// Any other value releases the directive, except [`Value::NoChange`].
fn resolve<D: Dom>(cx: &Context<D>, slot: &mut Option<Bound>, value: Value, connected: bool, bind: impl FnOnce() -> (PartInfo, Box<dyn Sink>)) -> Result<Value, Error> {
	let result = match value {
		Value::Directive(result) => result,
		Value::NoChange => return Ok(Value::NoChange),
		value => {
			if let Some(previous) = slot.take() {
				previous.dispose();
			}
			return Ok(value);
		}
	};

	if !slot.as_ref().map_or(false, |bound| bound.accepts(&result)) {
		if let Some(previous) = slot.take() {
			previous.dispose();
		}
		let (part, sink) = bind();
		*slot = Some(Bound::new(&result, &part, sink, connected, cx.spawner().cloned()));
	}
	let value = match slot {
		Some(bound) => bound.update(&result)?,
		None => Value::NoChange,
	};
	if let Value::Directive(_) = value {
		warn!("Directives returning directives are only supported in child position.");
		return Ok(Value::NoChange);
	}
	Ok(value)
}

/// Interleaves `strings` with the text of `values`. `None` if any value is `nothing`.
///
/// Without `strings`, the single value is the entire attribute value.
pub(crate) fn interpolate(strings: Option<&[String]>, values: &[Value]) -> Option<String> {
	if values.iter().any(|value| matches!(value, Value::Nothing)) {
		return None;
	}
	match strings {
		None => values.first().map(Value::to_text),
		Some(strings) => {
			let mut text = strings.first().cloned().unwrap_or_default();
			for (value, string) in values.iter().zip(strings.iter().skip(1)) {
				text.push_str(&value.to_text());
				text.push_str(string);
			}
			Some(text)
		}
	}
}

/// A binding in element position (`<div ${…}>`).
pub(crate) struct ElementPart<D: Dom> {
	target: Rc<RefCell<ElementTarget<D>>>,
	directive: Option<Bound>,
	connected: bool,
}

struct ElementTarget<D: Dom> {
	element: D::Node,
	callback: Option<ElementCallback>,
}

impl<D: Dom> ElementPart<D> {
	pub(crate) fn new(element: D::Node, connected: bool) -> Self {
		Self {
			target: Rc::new(RefCell::new(ElementTarget { element, callback: None })),
			directive: None,
			connected,
		}
	}

	/// # Errors
	///
	/// Iff a directive fails to update.
	pub(crate) fn set_value(&mut self, cx: &Context<D>, value: Value) -> Result<(), Error> {
		let target = &self.target;
		let value = resolve(cx, &mut self.directive, value, self.connected, || {
			let sink = ElementSink { target: Rc::downgrade(target) };
			(PartInfo::new(PartKind::Element, None), Box::new(sink) as Box<dyn Sink>)
		})?;
		self.target.borrow_mut().set_value(value);
		Ok(())
	}

	pub(crate) fn set_connected(&mut self, connected: bool) {
		self.connected = connected;
		if let Some(bound) = &mut self.directive {
			bound.set_connected(connected);
		}
	}
}

impl<D: Dom> ElementTarget<D> {
	fn set_value(&mut self, value: Value) {
		match value {
			Value::Element(callback) => {
				if self.callback.as_ref().map_or(false, |committed| committed.same_callback(&callback)) {
					return;
				}
				callback.call(&self.element);
				self.callback = Some(callback);
			}
			Value::NoChange => (),
			Value::Nothing | Value::Undefined | Value::Null => self.callback = None,
			_ => warn!("Ignoring a value in element position that isn't an element callback."),
		}
	}
}

struct ElementSink<D: Dom> {
	target: Weak<RefCell<ElementTarget<D>>>,
}

impl<D: Dom> Sink for ElementSink<D> {
	fn commit(&self, value: Pending) -> Result<(), Error> {
		if let Some(target) = self.target.upgrade() {
			let (Pending::Set(value) | Pending::Append(value)) = value;
			target.try_borrow_mut().map_err(|_| Error::PartBusy)?.set_value(value);
		}
		Ok(())
	}
}
