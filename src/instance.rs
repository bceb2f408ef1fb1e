//! Template instances: one stamped copy of a prepared template and its parts.

use crate::{
	child::ChildPart,
	dom::{Dom, Walker},
	error::{Error, TemplateError},
	part::{AttributePart, ElementPart},
	render::Context,
	template::{PartKind, Template},
	value::Value,
};
use std::rc::Rc;
use tracing::instrument;

/// A live part of a [`TemplateInstance`], in descriptor order.
pub(crate) enum Part<D: Dom> {
	Child(ChildPart<D>),
	Attribute(AttributePart<D>),
	Element(ElementPart<D>),
	/// Takes a value and ignores it.
	Comment,
}

pub(crate) struct TemplateInstance<D: Dom> {
	template: Rc<Template<D>>,
	parts: Vec<Part<D>>,
}

impl<D: Dom> TemplateInstance<D> {
	/// Clones the template's content and creates its parts, without committing any values.
	///
	/// The clone is walked in the same order the template was described in, so descriptor indices find their nodes.
	#[instrument(skip(dom, template), fields(digest = template.digest()))]
	pub(crate) fn create(dom: &D, template: Rc<Template<D>>, connected: bool) -> Result<(D::Node, Self), TemplateError> {
		let fragment = dom.import(template.content());
		let mut walker = Walker::<D>::new(fragment.clone());
		let mut node: Option<D::Node> = None;
		let mut visited = 0;
		let mut parts = Vec::with_capacity(template.parts().len());

		for descriptor in template.parts() {
			while visited <= descriptor.index {
				node = walker.next(dom);
				visited += 1;
				if node.is_none() {
					break;
				}
			}
			let node = node.clone().ok_or(TemplateError::MissingNode { index: descriptor.index })?;

			parts.push(match descriptor.kind {
				PartKind::Child => {
					let end = dom.next_sibling(&node);
					Part::Child(ChildPart::new(node, end, connected))
				}
				PartKind::Attribute | PartKind::Property | PartKind::BooleanAttribute | PartKind::Event => Part::Attribute(AttributePart::new(node, descriptor, connected)),
				PartKind::Element => Part::Element(ElementPart::new(node, connected)),
				PartKind::Comment => Part::Comment,
			});
		}

		Ok((fragment, Self { template, parts }))
	}

	/// An instance over server-rendered nodes.
	pub(crate) fn from_parts(template: Rc<Template<D>>, parts: Vec<Part<D>>) -> Self {
		Self { template, parts }
	}

	pub(crate) fn template(&self) -> &Rc<Template<D>> {
		&self.template
	}

	/// Hands `values` to the parts in order. Each part consumes as many values as its descriptor has expressions.
	///
	/// # Errors
	///
	/// If the number of values doesn't match the template, a nested child part fails or a directive fails to update.
	pub(crate) fn update(&mut self, cx: &Context<D>, values: Vec<Value>) -> Result<(), Error> {
		let expected = self.template.value_count();
		if values.len() != expected {
			return Err(TemplateError::ValueCountMismatch { expected, found: values.len() }.into());
		}

		let mut values = values.into_iter();
		for part in &mut self.parts {
			match part {
				Part::Child(child) => child.set_value(cx, values.next().unwrap_or(Value::NoChange))?,
				Part::Attribute(attribute) => {
					let count = attribute.value_count();
					attribute.set_values(cx, values.by_ref().take(count).collect())?;
				}
				Part::Element(element) => element.set_value(cx, values.next().unwrap_or(Value::NoChange))?,
				Part::Comment => drop(values.next()),
			}
		}
		Ok(())
	}

	pub(crate) fn set_connected(&mut self, connected: bool) {
		for part in &mut self.parts {
			match part {
				Part::Child(child) => child.set_connected(connected),
				Part::Attribute(attribute) => attribute.set_connected(connected),
				Part::Element(element) => element.set_connected(connected),
				Part::Comment => (),
			}
		}
	}
}
