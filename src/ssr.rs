//! Server rendering into marker HTML that [`Renderer::hydrate`](`crate::Renderer::hydrate`) can take over.

use crate::{
	directive::PartInfo,
	dom::{Dom, NodeKind},
	error::{Error, TemplateError},
	keyed,
	memory::{escape_attribute, escape_text, is_unescaped_text_element, is_void_tag, MemoryDom, NodeId},
	part::interpolate,
	render::{Context, RenderOptions},
	scan::{is_raw_text_element, MARKER, MARKER_MATCH},
	template::{PartKind, Template},
	value::Value,
};
use core::fmt::Write as _;
use std::rc::Rc;
use tracing::instrument;

/// Renders values to HTML strings with hydration markers.
///
/// Templates are prepared once per renderer, on an internal [`MemoryDom`].
#[derive(Debug)]
pub struct ServerRenderer {
	cx: Context<MemoryDom>,
}

impl Default for ServerRenderer {
	fn default() -> Self {
		Self::new()
	}
}

impl ServerRenderer {
	#[must_use]
	pub fn new() -> Self {
		Self {
			cx: Context::new(Rc::new(MemoryDom::new()), RenderOptions::default()),
		}
	}

	/// Renders `value` as the root part of a container.
	///
	/// Directives render what a fresh instance returns from [`Directive::render`](`crate::Directive::render`).
	/// Asynchronous values thereby render empty. Their subscription starts on hydration.
	///
	/// # Errors
	///
	/// If a template can't be prepared, carries the wrong number of values,
	/// or has bindings inside `<script>`, `<style>`, `<textarea>` or `<title>` ([`Error::Unsupported`]).
	#[instrument(skip(self, value))]
	pub fn render_to_string(&self, value: &Value) -> Result<String, Error> {
		let mut html = String::new();
		self.render_child(value, &mut html)?;
		Ok(html)
	}

	fn render_child(&self, value: &Value, out: &mut String) -> Result<(), Error> {
		if let Value::Directive(result) = value {
			return self.render_child(&result.render_static(&PartInfo::child()), out);
		}
		if let Value::Template(result) = value {
			let template = self.cx.template(result)?;
			if template.has_raw_text_bindings() {
				return Err(Error::Unsupported("bindings inside raw text elements can't be server-rendered"));
			}
			if result.values().len() != template.value_count() {
				return Err(TemplateError::ValueCountMismatch {
					expected: template.value_count(),
					found: result.values().len(),
				}
				.into());
			}

			out.push_str("<!--lit-part ");
			out.push_str(template.digest());
			out.push_str("-->");
			TemplateWriter::new(self, &template, result.values()).write_children(*template.content(), false, out)?;
			out.push_str("<!--/lit-part-->");
			return Ok(());
		}

		out.push_str("<!--lit-part-->");
		match value {
			Value::List(items) => {
				for item in items {
					self.render_child(item, out)?;
				}
			}
			Value::Keyed(items) => {
				for item in keyed::dedupe(items.clone()) {
					self.render_child(&item.value, out)?;
				}
			}
			Value::Nothing | Value::NoChange => (),
			value => out.push_str(&escape_text(&value.to_text())),
		}
		out.push_str("<!--/lit-part-->");
		Ok(())
	}
}

/// Writes one template's content, substituting its values.
struct TemplateWriter<'a> {
	renderer: &'a ServerRenderer,
	template: &'a Template<MemoryDom>,
	values: &'a [Value],
	/// Where each descriptor's values start.
	offsets: Vec<usize>,
	/// Depth-first index of the next element or comment.
	index: usize,
}

impl<'a> TemplateWriter<'a> {
	fn new(renderer: &'a ServerRenderer, template: &'a Template<MemoryDom>, values: &'a [Value]) -> Self {
		let offsets = template
			.parts()
			.iter()
			.scan(0, |offset, descriptor| {
				let start = *offset;
				*offset += descriptor.value_count();
				Some(start)
			})
			.collect();
		Self {
			renderer,
			template,
			values,
			offsets,
			index: 0,
		}
	}

	fn dom(&self) -> &MemoryDom {
		self.renderer.cx.dom()
	}

	fn write_children(&mut self, node: NodeId, verbatim: bool, out: &mut String) -> Result<(), Error> {
		for child in self.dom().child_nodes(node) {
			self.write_node(child, verbatim, out)?;
		}
		Ok(())
	}

	fn write_node(&mut self, node: NodeId, verbatim: bool, out: &mut String) -> Result<(), Error> {
		let (renderer, template) = (self.renderer, self.template);
		let dom = renderer.cx.dom();
		match dom.node_kind(&node) {
			NodeKind::Element => {
				let index = self.index;
				self.index += 1;
				let tag = dom.tag_name(&node);

				out.push('<');
				out.push_str(&tag);
				for name in dom.attribute_names(&node) {
					let value = dom.get_attribute(&node, &name).unwrap_or_default();
					let _ = write!(out, " {}=\"{}\"", name, escape_attribute(&value));
				}
				let mut bound = false;
				for (position, descriptor) in template.parts().iter().enumerate().filter(|(_, descriptor)| descriptor.index == index) {
					let values: Vec<Value> = self.values[self.offsets[position]..self.offsets[position] + descriptor.value_count()]
						.iter()
						.map(|value| match value {
							Value::Directive(result) => result.render_static(&PartInfo::new(descriptor.kind, descriptor.name.clone())),
							value => value.clone(),
						})
						.collect();
					let name = descriptor.name.as_deref().unwrap_or_default();
					match descriptor.kind {
						PartKind::Attribute => {
							if let Some(value) = interpolate(descriptor.strings.as_deref(), &values) {
								let _ = write!(out, " {}=\"{}\"", name, escape_attribute(&value));
							}
						}
						PartKind::BooleanAttribute => {
							if values[0].is_truthy() {
								out.push(' ');
								out.push_str(name);
							}
						}
						PartKind::Property | PartKind::Event | PartKind::Element => (),
						PartKind::Child | PartKind::Comment => continue,
					}
					bound = true;
				}
				out.push('>');
				// Comments don't parse inside raw text, so there the marker follows the end tag instead.
				let raw_text = is_raw_text_element(&tag);
				if bound && !raw_text {
					let _ = write!(out, "<!--lit-bindings {}-->", index);
				}

				if !is_void_tag(&tag) {
					self.write_children(node, is_unescaped_text_element(&tag), out)?;
					out.push_str("</");
					out.push_str(&tag);
					out.push('>');
				}
				if bound && raw_text {
					let _ = write!(out, "<!--lit-bindings {}-->", index);
				}
			}
			NodeKind::Comment => {
				let index = self.index;
				self.index += 1;
				let data = dom.data(&node);
				if data == MARKER_MATCH {
					let position = template
						.parts()
						.iter()
						.position(|descriptor| descriptor.index == index && descriptor.kind == PartKind::Child)
						.ok_or(TemplateError::MissingNode { index })?;
					renderer.render_child(&self.values[self.offsets[position]], out)?;
				} else if data != "?" {
					out.push_str("<!--");
					out.push_str(&data.replace(MARKER, ""));
					out.push_str("-->");
				}
			}
			NodeKind::Text => {
				let text = dom.data(&node);
				if verbatim {
					out.push_str(&text);
				} else {
					out.push_str(&escape_text(&text));
				}
			}
			NodeKind::Fragment | NodeKind::Other => self.write_children(node, verbatim, out)?,
		}
		Ok(())
	}
}
