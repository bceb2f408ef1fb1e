//! Prepared templates by template identity.

use crate::{dom::Dom, template::Template, TemplateStrings};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::rc::Rc;

/// Prepared templates, keyed by the address of their [`TemplateStrings`].
///
/// Entries are never evicted. Growth is bounded by the number of template sites in the program,
/// not by how often they are rendered.
pub struct TemplateCache<D: Dom> {
	templates: HashMap<usize, Rc<Template<D>>>,
}

impl<D: Dom> TemplateCache<D> {
	#[must_use]
	pub fn new() -> Self {
		Self { templates: HashMap::new() }
	}

	#[must_use]
	pub fn get(&self, strings: &'static TemplateStrings) -> Option<Rc<Template<D>>> {
		self.templates.get(&strings.id()).cloned()
	}

	pub fn set(&mut self, strings: &'static TemplateStrings, template: Rc<Template<D>>) {
		self.templates.insert(strings.id(), template);
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.templates.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.templates.is_empty()
	}
}

impl<D: Dom> Default for TemplateCache<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> Debug for TemplateCache<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("TemplateCache").field("len", &self.templates.len()).finish()
	}
}
