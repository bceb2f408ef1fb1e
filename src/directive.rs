//! Directives: stateful values that decide themselves what their part shows.
//!
//! A directive instance is created the first time a [`DirectiveResult`] of its type is committed to a part
//! and lives as long as the part keeps receiving results of that type.
//! Each render hands it the new arguments through [`Directive::update`], and its [`DirectiveHandle`]
//! lets it commit values later on, outside of any render.
//!
//! While the part is disconnected (see [`RootPart::set_connected`](`crate::RootPart::set_connected`)),
//! values set through the handle are held back and committed on reconnection.

use crate::{error::Error, template::PartKind, value::Value};
use core::{
	any::{type_name, Any, TypeId},
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	mem,
};
use futures::task::LocalSpawn;
use std::rc::{Rc, Weak};
use tracing::{error, trace};

/// Logic that owns the value of one part.
///
/// ```
/// use lit_dom::{directive, html, Directive, Error, MemoryDom, PartInfo, Renderer, Value};
/// use std::rc::Rc;
///
/// /// Counts how often it was rendered.
/// struct Renders(u32);
///
/// impl Directive for Renders {
///     type Args = ();
///
///     fn new(_part: &PartInfo) -> Self {
///         Self(0)
///     }
///
///     fn render(&mut self, _args: &()) -> Value {
///         self.0 += 1;
///         self.0.into()
///     }
/// }
///
/// let dom = Rc::new(MemoryDom::new());
/// let container = dom.create_element("div");
/// let mut renderer = Renderer::new(dom.clone());
/// for _ in 0..3 {
///     renderer.render(html!(["<p>", "</p>"], directive::<Renders>(())), &container)?;
/// }
/// assert_eq!(dom.text_content(container), "3");
/// # Ok::<(), Error>(())
/// ```
pub trait Directive: 'static {
	/// What each render passes in.
	type Args: Clone + 'static;

	/// Creates the instance for a part that didn't show this directive before.
	fn new(part: &PartInfo) -> Self
	where
		Self: Sized;

	/// The value to show for `args`. This is all the server renderer calls.
	fn render(&mut self, args: &Self::Args) -> Value;

	/// The value to commit for `args` on a live part. [`Value::NoChange`] leaves the part as it is.
	///
	/// Defaults to [`render`](`Directive::render`).
	///
	/// # Errors
	///
	/// Errors are returned from the render or hydration call.
	fn update(&mut self, args: Self::Args, handle: &DirectiveHandle) -> Result<Value, Error> {
		let _ = handle;
		Ok(self.render(&args))
	}

	/// The part was disconnected, or its directive replaced.
	fn disconnected(&mut self) {}

	/// The part was connected again. Values held back meanwhile were already committed.
	fn reconnected(&mut self) {}
}

/// Where a directive is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
	kind: PartKind,
	name: Option<String>,
}

impl PartInfo {
	pub(crate) fn new(kind: PartKind, name: Option<String>) -> Self {
		Self { kind, name }
	}

	pub(crate) fn child() -> Self {
		Self::new(PartKind::Child, None)
	}

	#[must_use]
	pub fn kind(&self) -> PartKind {
		self.kind
	}

	/// The attribute, property or event name of attribute-like parts.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}
}

/// Object-safe face of [`Directive`].
pub(crate) trait AnyDirective {
	fn render(&mut self, args: &dyn Any) -> Value;
	fn update(&mut self, args: &dyn Any, handle: &DirectiveHandle) -> Result<Value, Error>;
	fn disconnected(&mut self);
	fn reconnected(&mut self);
}

impl<T: Directive> AnyDirective for T {
	fn render(&mut self, args: &dyn Any) -> Value {
		match args.downcast_ref::<T::Args>() {
			Some(args) => Directive::render(self, args),
			None => {
				error!("Arguments of directive {} have the wrong type.", type_name::<T>());
				Value::NoChange
			}
		}
	}

	fn update(&mut self, args: &dyn Any, handle: &DirectiveHandle) -> Result<Value, Error> {
		match args.downcast_ref::<T::Args>() {
			Some(args) => Directive::update(self, args.clone(), handle),
			None => {
				error!("Arguments of directive {} have the wrong type.", type_name::<T>());
				Ok(Value::NoChange)
			}
		}
	}

	fn disconnected(&mut self) {
		Directive::disconnected(self);
	}

	fn reconnected(&mut self) {
		Directive::reconnected(self);
	}
}

fn create<T: Directive>(part: &PartInfo) -> Box<dyn AnyDirective> {
	Box::new(T::new(part))
}

/// A directive type with the arguments of one render, see [`directive`].
#[derive(Clone)]
pub struct DirectiveResult {
	type_id: TypeId,
	name: &'static str,
	create: fn(&PartInfo) -> Box<dyn AnyDirective>,
	args: Rc<dyn Any>,
}

impl DirectiveResult {
	pub(crate) fn is_same(&self, other: &Self) -> bool {
		self.type_id == other.type_id && Rc::ptr_eq(&self.args, &other.args)
	}

	/// What a fresh instance renders, for output without live parts.
	pub(crate) fn render_static(&self, part: &PartInfo) -> Value {
		(self.create)(part).render(&*self.args)
	}
}

impl Debug for DirectiveResult {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DirectiveResult").field("directive", &self.name).finish_non_exhaustive()
	}
}

/// Binds directive `T` with `args`.
pub fn directive<T: Directive>(args: T::Args) -> Value {
	Value::Directive(DirectiveResult {
		type_id: TypeId::of::<T>(),
		name: type_name::<T>(),
		create: create::<T>,
		args: Rc::new(args),
	})
}

/// A value set through a [`DirectiveHandle`].
pub(crate) enum Pending {
	Set(Value),
	Append(Value),
}

/// Commits values set through a [`DirectiveHandle`] into the part that holds the directive.
pub(crate) trait Sink {
	/// # Errors
	///
	/// Iff the part is being rendered right now, or the commit itself fails.
	fn commit(&self, value: Pending) -> Result<(), Error>;
}

struct HandleState {
	connected: Cell<bool>,
	/// Held back while disconnected.
	pending: RefCell<Vec<Pending>>,
	sink: Box<dyn Sink>,
}

/// Lets a directive commit values into its part from outside a render, for example from a spawned task.
///
/// The handle goes dead once the part drops the directive.
#[derive(Clone)]
pub struct DirectiveHandle {
	state: Weak<HandleState>,
	spawner: Option<Rc<dyn LocalSpawn>>,
}

impl DirectiveHandle {
	/// Replaces the part's value.
	///
	/// Don't call this from within [`Directive::update`]. Return the value from there instead.
	pub fn set_value(&self, value: impl Into<Value>) {
		self.send(Pending::Set(value.into()));
	}

	/// Appends `value` as a new item of a child part. Other parts treat it like [`set_value`](`DirectiveHandle::set_value`).
	pub fn append(&self, value: impl Into<Value>) {
		self.send(Pending::Append(value.into()));
	}

	/// Whether the part still holds the directive.
	#[must_use]
	pub fn is_live(&self) -> bool {
		self.state.strong_count() > 0
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.state.upgrade().map_or(false, |state| state.connected.get())
	}

	/// The spawner from the [`RenderOptions`](`crate::RenderOptions`), if any.
	#[must_use]
	pub fn spawner(&self) -> Option<&Rc<dyn LocalSpawn>> {
		self.spawner.as_ref()
	}

	fn send(&self, value: Pending) {
		let state = match self.state.upgrade() {
			Some(state) => state,
			None => return trace!("Dropping a value set on a directive that is no longer bound."),
		};
		if state.connected.get() {
			if let Err(error) = state.sink.commit(value) {
				error!("Failed to commit a directive value: {}", error);
			}
		} else {
			trace!("Holding back a value of a disconnected directive.");
			let mut pending = state.pending.borrow_mut();
			if matches!(value, Pending::Set(_)) {
				pending.clear();
			}
			pending.push(value);
		}
	}
}

impl Debug for DirectiveHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("DirectiveHandle")
			.field("live", &self.is_live())
			.field("connected", &self.is_connected())
			.finish_non_exhaustive()
	}
}

/// A directive instance held by a part.
pub(crate) struct Bound {
	type_id: TypeId,
	directive: Box<dyn AnyDirective>,
	state: Rc<HandleState>,
	spawner: Option<Rc<dyn LocalSpawn>>,
}

impl Bound {
	pub(crate) fn new(result: &DirectiveResult, part: &PartInfo, sink: Box<dyn Sink>, connected: bool, spawner: Option<Rc<dyn LocalSpawn>>) -> Self {
		trace!("Binding directive {}.", result.name);
		Self {
			type_id: result.type_id,
			directive: (result.create)(part),
			state: Rc::new(HandleState {
				connected: Cell::new(connected),
				pending: RefCell::new(Vec::new()),
				sink,
			}),
			spawner,
		}
	}

	/// Whether `result` is for this directive's type, so that the instance can be reused.
	pub(crate) fn accepts(&self, result: &DirectiveResult) -> bool {
		self.type_id == result.type_id
	}

	pub(crate) fn update(&mut self, result: &DirectiveResult) -> Result<Value, Error> {
		let handle = DirectiveHandle {
			state: Rc::downgrade(&self.state),
			spawner: self.spawner.clone(),
		};
		self.directive.update(&*result.args, &handle)
	}

	/// Commits what was held back through the sink before notifying the directive.
	///
	/// The part must not be borrowed while this runs.
	pub(crate) fn set_connected(&mut self, connected: bool) {
		if self.state.connected.replace(connected) == connected {
			return;
		}
		if connected {
			let pending = mem::take(&mut *self.state.pending.borrow_mut());
			for value in pending {
				if let Err(error) = self.state.sink.commit(value) {
					error!("Failed to commit a held back directive value: {}", error);
				}
			}
			self.directive.reconnected();
		} else {
			self.directive.disconnected();
		}
	}

	/// Drops the directive, disconnecting it first.
	pub(crate) fn dispose(mut self) {
		if self.state.connected.replace(false) {
			self.directive.disconnected();
		}
	}
}
