//! Values that can be committed to parts.

use crate::{async_value::AsyncValue, directive::DirectiveResult, keyed::KeyedItem, template::TemplateResult};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Display, Formatter},
};
use std::rc::Rc;
use tracing::trace;

/// A value bound to one expression hole of a template.
///
/// The primitive variants mirror JavaScript's primitives, since dirty-checking and stringification follow their semantics
/// (`NaN` is never equal to itself, `null` and `undefined` render as empty text, and so on).
#[derive(Clone)]
pub enum Value {
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	Str(Rc<str>),
	/// A nested template.
	Template(TemplateResult),
	/// Positionally reconciled items.
	List(Vec<Value>),
	/// Key-reconciled items, see [`repeat`](`crate::repeat`).
	Keyed(Vec<KeyedItem>),
	/// A directive with its arguments, see [`directive`](`crate::directive`).
	Directive(DirectiveResult),
	/// Only meaningful in event position.
	Listener(EventListener),
	/// Only meaningful in element position.
	Element(ElementCallback),
	/// Anything else. Rendered through [`Display`].
	Object(Rc<dyn Display>),
	/// Clears a child part or removes an attribute.
	Nothing,
	/// Leaves the part as it is.
	NoChange,
}

impl Value {
	/// Whether this is one of the JavaScript-like primitives.
	#[must_use]
	pub fn is_primitive(&self) -> bool {
		matches!(self, Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_))
	}

	/// JavaScript `===` on primitives and the sentinels. Everything else is never strictly equal.
	#[must_use]
	pub fn strict_eq(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) | (Value::Nothing, Value::Nothing) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			#[allow(clippy::float_cmp)]
			(Value::Number(a), Value::Number(b)) => a == b,
			(Value::Str(a), Value::Str(b)) => a == b,
			_ => false,
		}
	}

	/// JavaScript truthiness. [`Value::Nothing`] is falsy.
	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Undefined | Value::Null | Value::Nothing => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::Str(s) => !s.is_empty(),
			_ => true,
		}
	}

	/// The text committed for this value in child or attribute position.
	///
	/// `null` and `undefined` become the empty string.
	#[must_use]
	pub fn to_text(&self) -> String {
		match self {
			Value::Undefined | Value::Null => String::new(),
			other => other.to_string(),
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("undefined"),
			Value::Null => f.write_str("null"),
			Value::Bool(b) => Display::fmt(b, f),
			Value::Number(n) => f.write_str(&format_number(*n)),
			Value::Str(s) => f.write_str(s),
			Value::Template(_) => f.write_str("[template]"),
			Value::List(items) => {
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					f.write_str(&item.to_text())?;
				}
				Ok(())
			}
			Value::Keyed(items) => {
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						f.write_str(",")?;
					}
					f.write_str(&item.value.to_text())?;
				}
				Ok(())
			}
			Value::Directive(_) => f.write_str("[directive]"),
			Value::Listener(_) => f.write_str("[listener]"),
			Value::Element(_) => f.write_str("[element callback]"),
			Value::Object(object) => Display::fmt(object, f),
			Value::Nothing | Value::NoChange => Ok(()),
		}
	}
}

impl Debug for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Undefined => f.write_str("Undefined"),
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
			Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
			Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
			Value::Template(result) => f.debug_tuple("Template").field(result).finish(),
			Value::List(items) => f.debug_tuple("List").field(items).finish(),
			Value::Keyed(items) => f.debug_tuple("Keyed").field(items).finish(),
			Value::Directive(result) => f.debug_tuple("Directive").field(result).finish(),
			Value::Listener(listener) => f.debug_tuple("Listener").field(listener).finish(),
			Value::Element(callback) => f.debug_tuple("Element").field(callback).finish(),
			Value::Object(object) => f.debug_tuple("Object").field(&object.to_string()).finish(),
			Value::Nothing => f.write_str("Nothing"),
			Value::NoChange => f.write_str("NoChange"),
		}
	}
}

/// Primitives and sentinels compare like [`Value::strict_eq`] (except that `NaN == NaN` here), reference types by identity.
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
			(Value::NoChange, Value::NoChange) => true,
			(Value::Template(a), Value::Template(b)) => a == b,
			(Value::List(a), Value::List(b)) => a == b,
			(Value::Keyed(a), Value::Keyed(b)) => a == b,
			(Value::Directive(a), Value::Directive(b)) => a.is_same(b),
			(Value::Listener(a), Value::Listener(b)) => a.same_callback(b) && a.options == b.options,
			(Value::Element(a), Value::Element(b)) => a.same_callback(b),
			(Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
			(a, b) => a.strict_eq(b),
		}
	}
}

/// Formats like JavaScript's `String(number)` for the common cases.
fn format_number(n: f64) -> String {
	if n.is_nan() {
		"NaN".to_owned()
	} else if n.is_infinite() {
		let infinity = if n > 0.0 { "Infinity" } else { "-Infinity" };
		infinity.to_owned()
	} else if n == 0.0 {
		"0".to_owned()
	} else if n.fract() == 0.0 && n.abs() < 1e21 {
		format!("{:.0}", n)
	} else {
		n.to_string()
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::Str(s.into())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::Str(s.into())
	}
}

impl From<&String> for Value {
	fn from(s: &String) -> Self {
		Value::Str(s.as_str().into())
	}
}

impl From<Rc<str>> for Value {
	fn from(s: Rc<str>) -> Self {
		Value::Str(s)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

macro_rules! number_from {
	($($t:ty),*$(,)?) => {$(
		impl From<$t> for Value {
			#[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
			fn from(n: $t) -> Self {
				Value::Number(n as f64)
			}
		}
	)*};
}
number_from!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl From<TemplateResult> for Value {
	fn from(result: TemplateResult) -> Self {
		Value::Template(result)
	}
}

impl From<EventListener> for Value {
	fn from(listener: EventListener) -> Self {
		Value::Listener(listener)
	}
}

impl From<ElementCallback> for Value {
	fn from(callback: ElementCallback) -> Self {
		Value::Element(callback)
	}
}

impl From<DirectiveResult> for Value {
	fn from(result: DirectiveResult) -> Self {
		Value::Directive(result)
	}
}

/// Renders through [`async_replace`](`crate::async_replace`) or [`async_append`](`crate::async_append`), by [`AsyncValue::mode`].
impl From<AsyncValue> for Value {
	fn from(value: AsyncValue) -> Self {
		value.into_directive()
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(items: Vec<T>) -> Self {
		Value::List(items.into_iter().map(Into::into).collect())
	}
}

/// `None` is `undefined`.
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Undefined, Into::into)
	}
}

/// Wraps any [`Display`] as [`Value::Object`].
pub fn object(value: impl Display + 'static) -> Value {
	Value::Object(Rc::new(value))
}

/// A key of a [`repeat`](`crate::repeat`)ed item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Rc<str>),
}

impl Display for Key {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Key::Int(i) => Display::fmt(i, f),
			Key::Str(s) => f.write_str(s),
		}
	}
}

macro_rules! int_key_from {
	($($t:ty),*$(,)?) => {$(
		impl From<$t> for Key {
			#[allow(clippy::cast_possible_wrap, clippy::cast_lossless)]
			fn from(i: $t) -> Self {
				Key::Int(i as i64)
			}
		}
	)*};
}
int_key_from!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<&str> for Key {
	fn from(s: &str) -> Self {
		Key::Str(s.into())
	}
}

impl From<String> for Key {
	fn from(s: String) -> Self {
		Key::Str(s.into())
	}
}

/// An event as seen by an [`EventListener`].
#[derive(Clone)]
pub struct Event {
	kind: String,
	native: Option<Rc<dyn Any>>,
}

impl Event {
	#[must_use]
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into(), native: None }
	}

	/// An event that carries the DOM backend's own event object.
	#[must_use]
	pub fn with_native(kind: impl Into<String>, native: impl Any) -> Self {
		Self {
			kind: kind.into(),
			native: Some(Rc::new(native)),
		}
	}

	/// The event type, like `"click"`.
	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	/// The backend event object, if it is a `T`.
	#[must_use]
	pub fn native<T: Any>(&self) -> Option<&T> {
		self.native.as_deref().and_then(|native| native.downcast_ref::<T>())
	}
}

impl Debug for Event {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event").field("kind", &self.kind).field("native", &self.native.is_some()).finish()
	}
}

/// Options of the native listener. Changing them re-registers it.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
	pub capture: bool,
	pub once: bool,
	pub passive: bool,
}

/// An event handler bound with `@event=${…}`.
#[derive(Clone)]
pub struct EventListener {
	callback: Rc<dyn Fn(&Event)>,
	options: ListenerOptions,
}

impl EventListener {
	pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
		Self {
			callback: Rc::new(callback),
			options: ListenerOptions::default(),
		}
	}

	#[must_use]
	pub fn with_options(mut self, options: ListenerOptions) -> Self {
		self.options = options;
		self
	}

	#[must_use]
	pub fn options(&self) -> ListenerOptions {
		self.options
	}

	pub fn call(&self, event: &Event) {
		(self.callback)(event);
	}

	pub(crate) fn same_callback(&self, other: &EventListener) -> bool {
		Rc::ptr_eq(&self.callback, &other.callback)
	}
}

impl Debug for EventListener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventListener")
			.field("callback", &Rc::as_ptr(&self.callback).cast::<()>())
			.field("options", &self.options)
			.finish()
	}
}

/// Shorthand for an [`EventListener`] value with default options.
pub fn on(callback: impl Fn(&Event) + 'static) -> Value {
	EventListener::new(callback).into()
}

/// The listener object a [`Dom`](`crate::Dom`) registers natively.
///
/// There is one per event part. Updating the part's handler swaps it in here without touching the DOM.
#[derive(Default)]
pub struct ListenerSlot {
	handler: RefCell<Option<EventListener>>,
}

impl ListenerSlot {
	/// Dispatches `event` to the current handler.
	pub fn handle_event(&self, event: &Event) {
		// Cloned so that the handler can re-render (and swap itself out) while it runs.
		let handler = self.handler.borrow().clone();
		match handler {
			Some(handler) => handler.call(event),
			None => trace!("Event {:?} arrived at a cleared listener slot.", event.kind()),
		}
	}

	pub(crate) fn set(&self, handler: Option<EventListener>) {
		*self.handler.borrow_mut() = handler;
	}
}

impl Debug for ListenerSlot {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ListenerSlot").field("handler", &self.handler.borrow()).finish()
	}
}

/// A callback bound in element position (`<div ${…}>`).
///
/// It receives the DOM backend's node, for example a [`NodeId`](`crate::memory::NodeId`) with [`MemoryDom`](`crate::MemoryDom`).
#[derive(Clone)]
pub struct ElementCallback(Rc<dyn Fn(&dyn Any)>);

impl ElementCallback {
	pub fn new(callback: impl Fn(&dyn Any) + 'static) -> Self {
		Self(Rc::new(callback))
	}

	pub(crate) fn call(&self, element: &dyn Any) {
		(self.0)(element);
	}

	pub(crate) fn same_callback(&self, other: &ElementCallback) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for ElementCallback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ElementCallback").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}

/// Shorthand for an [`ElementCallback`] value.
pub fn element_callback(callback: impl Fn(&dyn Any) + 'static) -> Value {
	ElementCallback::new(callback).into()
}
