//! The render entry point.

use crate::{
	cache::TemplateCache,
	child::ChildPart,
	compile::CompiledTemplate,
	dom::Dom,
	error::{Error, HydrationError, TemplateError},
	hydrate,
	template::{Template, TemplateResult, TemplateStrings},
	value::Value,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use futures::task::LocalSpawn;
use std::rc::Rc;
use tracing::{instrument, trace};

/// Configuration of a [`Renderer`].
#[derive(Default, Clone)]
pub struct RenderOptions {
	spawner: Option<Rc<dyn LocalSpawn>>,
}

impl RenderOptions {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the executor that drives [`async_replace`](`crate::async_replace`) and [`async_append`](`crate::async_append`) subscriptions.
	///
	/// Without one, rendering an asynchronous value fails with [`Error::NoSpawner`].
	#[must_use]
	pub fn with_spawner(mut self, spawner: impl LocalSpawn + 'static) -> Self {
		self.spawner = Some(Rc::new(spawner));
		self
	}
}

impl Debug for RenderOptions {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderOptions").field("spawner", &self.spawner.is_some()).finish()
	}
}

struct Shared<D: Dom> {
	dom: Rc<D>,
	templates: RefCell<TemplateCache<D>>,
	spawner: Option<Rc<dyn LocalSpawn>>,
}

/// What every part needs to commit: the DOM, the template cache and the options.
pub(crate) struct Context<D: Dom> {
	shared: Rc<Shared<D>>,
}

impl<D: Dom> Clone for Context<D> {
	fn clone(&self) -> Self {
		Self { shared: self.shared.clone() }
	}
}

impl<D: Dom> Debug for Context<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("templates", &self.template_count())
			.field("spawner", &self.shared.spawner.is_some())
			.finish_non_exhaustive()
	}
}

impl<D: Dom> Context<D> {
	pub(crate) fn new(dom: Rc<D>, options: RenderOptions) -> Self {
		Self {
			shared: Rc::new(Shared {
				dom,
				templates: RefCell::new(TemplateCache::new()),
				spawner: options.spawner,
			}),
		}
	}

	pub(crate) fn dom(&self) -> &D {
		&self.shared.dom
	}

	pub(crate) fn dom_rc(&self) -> &Rc<D> {
		&self.shared.dom
	}

	pub(crate) fn spawner(&self) -> Option<&Rc<dyn LocalSpawn>> {
		self.shared.spawner.as_ref()
	}

	/// The prepared template of `result`, preparing and caching it on first use.
	pub(crate) fn template(&self, result: &TemplateResult) -> Result<Rc<Template<D>>, TemplateError> {
		if let Some(template) = self.shared.templates.borrow().get(result.strings()) {
			return Ok(template);
		}
		let template = Rc::new(Template::new(self.dom(), result.strings(), result.kind())?);
		self.shared.templates.borrow_mut().set(result.strings(), template.clone());
		Ok(template)
	}

	pub(crate) fn insert_template(&self, template: Template<D>) {
		self.shared.templates.borrow_mut().set(template.strings(), Rc::new(template));
	}

	pub(crate) fn template_count(&self) -> usize {
		self.shared.templates.borrow().len()
	}
}

/// The outermost child part of a container.
///
/// Handles are shared: the [`Renderer`] keeps one per container and hands out clones.
pub struct RootPart<D: Dom> {
	container: D::Node,
	part: Rc<RefCell<ChildPart<D>>>,
	cx: Context<D>,
}

impl<D: Dom> Clone for RootPart<D> {
	fn clone(&self) -> Self {
		Self {
			container: self.container.clone(),
			part: self.part.clone(),
			cx: self.cx.clone(),
		}
	}
}

impl<D: Dom> RootPart<D> {
	fn new(container: D::Node, part: ChildPart<D>, cx: Context<D>) -> Self {
		Self {
			container,
			part: Rc::new(RefCell::new(part)),
			cx,
		}
	}

	#[must_use]
	pub fn container(&self) -> &D::Node {
		&self.container
	}

	/// Commits `value`, like rendering it into the container again.
	///
	/// # Errors
	///
	/// See [`Renderer::render`].
	pub fn set_value(&self, value: impl Into<Value>) -> Result<(), Error> {
		self.part.borrow_mut().set_value(&self.cx, value.into())
	}

	/// Disconnects (`false`) or reconnects (`true`) every directive in the rendered tree,
	/// calling [`Directive::disconnected`](`crate::Directive::disconnected`) or [`Directive::reconnected`](`crate::Directive::reconnected`).
	///
	/// The DOM stays as it is. Values that arrive while disconnected are held back, and committed on reconnection.
	#[instrument(skip(self))]
	pub fn set_connected(&self, connected: bool) {
		self.part.borrow_mut().set_connected(connected);
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.part.borrow().is_connected()
	}
}

impl<D: Dom> Debug for RootPart<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RootPart").field("container", &self.container).finish_non_exhaustive()
	}
}

/// Renders values into containers of one [`Dom`].
///
/// The renderer owns the template cache. Keep one per document.
pub struct Renderer<D: Dom> {
	cx: Context<D>,
	roots: Vec<RootPart<D>>,
}

impl<D: Dom> Renderer<D> {
	#[must_use]
	pub fn new(dom: Rc<D>) -> Self {
		Self::with_options(dom, RenderOptions::default())
	}

	#[must_use]
	pub fn with_options(dom: Rc<D>, options: RenderOptions) -> Self {
		Self {
			cx: Context::new(dom, options),
			roots: Vec::new(),
		}
	}

	#[must_use]
	pub fn dom(&self) -> &Rc<D> {
		self.cx.dom_rc()
	}

	/// The number of prepared templates in the cache.
	#[must_use]
	pub fn template_count(&self) -> usize {
		self.cx.template_count()
	}

	/// The root part previously rendered or hydrated into `container`.
	#[must_use]
	pub fn root(&self, container: &D::Node) -> Option<RootPart<D>> {
		self.roots.iter().find(|root| &root.container == container).cloned()
	}

	/// Renders `value` into `container`.
	///
	/// The first render appends a start marker to the container's children and creates the root part after it.
	/// Later renders into the same container update that root part.
	///
	/// # Errors
	///
	/// If a template can't be prepared, a template result carries the wrong number of values,
	/// or an asynchronous value is rendered without a spawner.
	#[instrument(skip(self, value))]
	pub fn render(&mut self, value: impl Into<Value>, container: &D::Node) -> Result<RootPart<D>, Error> {
		let root = match self.root(container) {
			Some(root) => root,
			None => {
				trace!("First render into this container.");
				let dom = self.cx.dom();
				let marker = dom.create_comment("");
				dom.insert_before(container, &marker, None);
				let root = RootPart::new(container.clone(), ChildPart::new(marker, None, true), self.cx.clone());
				self.roots.push(root.clone());
				root
			}
		};
		root.set_value(value)?;
		Ok(root)
	}

	/// Takes over server-rendered markup in `container`, which must show `value`, without creating nodes for it.
	///
	/// Afterwards, [`render`](`Renderer::render`) into `container` updates the markup like a client-side render would.
	///
	/// # Errors
	///
	/// If the markup doesn't match `value`, see [`HydrationError`].
	#[instrument(skip(self, value))]
	pub fn hydrate(&mut self, value: impl Into<Value>, container: &D::Node) -> Result<RootPart<D>, Error> {
		if self.root(container).is_some() {
			return Err(HydrationError::AlreadyRendered.into());
		}
		let part = hydrate::hydrate(&self.cx, value.into(), container)?;
		let root = RootPart::new(container.clone(), part, self.cx.clone());
		self.roots.push(root.clone());
		Ok(root)
	}

	/// Seeds the template cache with a [`precompile`](`crate::precompile`)d template, so that it isn't parsed from marker HTML.
	pub fn insert_compiled(&self, strings: &'static TemplateStrings, compiled: &CompiledTemplate) {
		self.cx.insert_template(Template::from_compiled(self.cx.dom(), strings, compiled));
	}

	/// Forgets the root part of `container`. Its DOM stays as it is.
	pub fn forget(&mut self, container: &D::Node) -> Option<RootPart<D>> {
		let index = self.roots.iter().position(|root| &root.container == container)?;
		Some(self.roots.swap_remove(index))
	}
}

impl<D: Dom> Debug for Renderer<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Renderer")
			.field("templates", &self.cx.template_count())
			.field("roots", &self.roots)
			.finish()
	}
}
