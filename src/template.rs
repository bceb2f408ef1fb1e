//! Template identities, results and prepared templates.

use crate::{
	digest::digest_for_template,
	dom::{Dom, NodeKind, Walker},
	error::TemplateError,
	scan::{self, TagBinding, BOUND_ATTRIBUTE_SUFFIX, MARKER, MARKER_MATCH},
	value::Value,
};
use core::{fmt, ptr};
use std::rc::Rc;
use tracing::{instrument, trace};

/// The static strings of one template literal site.
///
/// The identity of a template is the address of its `TemplateStrings`, not its content:
/// two textually identical templates at different sites never share a prepared template or an instance.
/// [`html!`](`crate::html!`) and [`svg!`](`crate::svg!`) declare one `static` per invocation.
pub struct TemplateStrings(&'static [&'static str]);

impl TemplateStrings {
	/// # Panics
	///
	/// Iff `strings` is empty. A template without holes still has one string.
	#[must_use]
	pub const fn new(strings: &'static [&'static str]) -> Self {
		assert!(!strings.is_empty(), "A template has at least one string.");
		Self(strings)
	}

	/// Creates a new template identity at runtime. Each call leaks a little memory, so call it once per template.
	///
	/// # Panics
	///
	/// Iff `strings` is empty.
	#[must_use]
	pub fn leak(strings: Vec<String>) -> &'static Self {
		assert!(!strings.is_empty(), "A template has at least one string.");
		let strings: Vec<&'static str> = strings.into_iter().map(|s| &*Box::leak(s.into_boxed_str())).collect();
		Box::leak(Box::new(Self(Box::leak(strings.into_boxed_slice()))))
	}

	#[must_use]
	pub fn strings(&self) -> &'static [&'static str] {
		self.0
	}

	/// The number of expressions the template takes.
	#[must_use]
	pub fn hole_count(&self) -> usize {
		self.0.len() - 1
	}

	pub(crate) fn id(&'static self) -> usize {
		ptr::addr_of!(*self) as usize
	}
}

impl fmt::Debug for TemplateStrings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TemplateStrings").field(&ptr::addr_of!(*self)).field(&self.0).finish()
	}
}

/// Whether a result's HTML is parsed as HTML or inside an `<svg>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
	Html,
	Svg,
}

/// A template with the values for its holes.
#[derive(Debug, Clone)]
pub struct TemplateResult {
	strings: &'static TemplateStrings,
	values: Vec<Value>,
	kind: ResultKind,
}

impl TemplateResult {
	#[must_use]
	pub fn new(strings: &'static TemplateStrings, values: Vec<Value>) -> Self {
		Self {
			strings,
			values,
			kind: ResultKind::Html,
		}
	}

	#[must_use]
	pub fn svg(strings: &'static TemplateStrings, values: Vec<Value>) -> Self {
		Self {
			strings,
			values,
			kind: ResultKind::Svg,
		}
	}

	#[must_use]
	pub fn strings(&self) -> &'static TemplateStrings {
		self.strings
	}

	#[must_use]
	pub fn values(&self) -> &[Value] {
		&self.values
	}

	#[must_use]
	pub fn kind(&self) -> ResultKind {
		self.kind
	}

	#[must_use]
	pub fn into_values(self) -> Vec<Value> {
		self.values
	}
}

impl PartialEq for TemplateResult {
	fn eq(&self, other: &Self) -> bool {
		ptr::eq(self.strings, other.strings) && self.kind == other.kind && self.values == other.values
	}
}

/// What a part binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
	/// Content between two comment markers.
	Child,
	/// `name=${…}`, possibly interpolated.
	Attribute,
	/// `.name=${…}`
	Property,
	/// `?name=${…}`
	BooleanAttribute,
	/// `@name=${…}`
	Event,
	/// `<div ${…}>`
	Element,
	/// A hole inside an HTML comment. It takes a value and does nothing.
	Comment,
}

/// Where one part of a template goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
	pub kind: PartKind,
	/// Depth-first index of the node among the template's elements and comments.
	pub index: usize,
	/// Attribute, property or event name (case-sensitive) for attribute-like parts.
	pub name: Option<String>,
	/// The static strings around the expressions of an attribute-like part. Always one longer than its expression count.
	pub strings: Option<Rc<[String]>>,
}

impl PartDescriptor {
	/// The number of template values this part consumes.
	#[must_use]
	pub fn value_count(&self) -> usize {
		match &self.strings {
			Some(strings) => strings.len() - 1,
			None => 1,
		}
	}
}

/// A template prepared for a particular [`Dom`]: the parsed content to clone and the descriptors of its parts.
pub struct Template<D: Dom> {
	strings: &'static TemplateStrings,
	kind: ResultKind,
	html: String,
	parts: Vec<PartDescriptor>,
	content: D::Node,
	digest: String,
	raw_text_bindings: bool,
}

impl<D: Dom> Template<D> {
	/// Prepares `strings` by scanning them into marker HTML, parsing that and walking it once.
	///
	/// # Errors
	///
	/// Iff the strings can't be represented with markers (dynamic tag names) or don't produce one part value per hole.
	#[instrument(skip(dom))]
	pub fn new(dom: &D, strings: &'static TemplateStrings, kind: ResultKind) -> Result<Self, TemplateError> {
		let scanned = scan::prepare(strings.strings())?;
		let content = parse(dom, &scanned.html, kind);
		let mut raw_text_bindings = false;
		let parts = describe(dom, &content, scanned.bindings, &mut raw_text_bindings)?;

		let found: usize = parts.iter().map(PartDescriptor::value_count).sum();
		if found != strings.hole_count() {
			return Err(TemplateError::BindingCountMismatch {
				expected: strings.hole_count(),
				found,
			});
		}

		trace!("Prepared template with {} part(s).", parts.len());
		Ok(Self {
			strings,
			kind,
			html: scanned.html,
			parts,
			content,
			digest: digest_for_template(strings.strings()),
			raw_text_bindings,
		})
	}

	/// Wraps a [`precompile`](`crate::precompile`)d template. The descriptors are trusted as they are.
	pub fn from_compiled(dom: &D, strings: &'static TemplateStrings, compiled: &crate::CompiledTemplate) -> Self {
		Self {
			strings,
			kind: compiled.kind,
			html: compiled.html.clone(),
			parts: compiled.parts.clone(),
			content: parse(dom, &compiled.html, compiled.kind),
			digest: digest_for_template(strings.strings()),
			raw_text_bindings: false,
		}
	}

	#[must_use]
	pub fn strings(&self) -> &'static TemplateStrings {
		self.strings
	}

	#[must_use]
	pub fn kind(&self) -> ResultKind {
		self.kind
	}

	/// The marker HTML the content was parsed from.
	#[must_use]
	pub fn html(&self) -> &str {
		&self.html
	}

	#[must_use]
	pub fn parts(&self) -> &[PartDescriptor] {
		&self.parts
	}

	/// The prepared content. Clone it with [`Dom::import`], never modify it.
	#[must_use]
	pub fn content(&self) -> &D::Node {
		&self.content
	}

	#[must_use]
	pub fn digest(&self) -> &str {
		&self.digest
	}

	/// Whether there are child parts inside `<script>`, `<style>`, `<textarea>` or `<title>`.
	///
	/// Those work at runtime, but can't be written out as HTML with markers.
	#[must_use]
	pub fn has_raw_text_bindings(&self) -> bool {
		self.raw_text_bindings
	}

	#[must_use]
	pub fn value_count(&self) -> usize {
		self.strings.hole_count()
	}
}

impl<D: Dom> fmt::Debug for Template<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Template")
			.field("strings", &self.strings)
			.field("kind", &self.kind)
			.field("parts", &self.parts)
			.field("digest", &self.digest)
			.finish_non_exhaustive()
	}
}

fn parse<D: Dom>(dom: &D, html: &str, kind: ResultKind) -> D::Node {
	match kind {
		ResultKind::Html => dom.parse_fragment(html),
		ResultKind::Svg => {
			let fragment = dom.parse_fragment(&format!("<svg>{}</svg>", html));
			if let Some(svg) = dom.first_child(&fragment) {
				while let Some(child) = dom.first_child(&svg) {
					dom.insert_before(&fragment, &child, Some(&svg));
				}
				dom.remove(&svg);
			}
			fragment
		}
	}
}

/// Walks freshly parsed marker HTML once, consuming the markers into part descriptors.
fn describe<D: Dom>(dom: &D, content: &D::Node, bindings: Vec<TagBinding>, raw_text_bindings: &mut bool) -> Result<Vec<PartDescriptor>, TemplateError> {
	let mut bindings = bindings.into_iter();
	let mut parts = Vec::new();
	let mut walker = Walker::<D>::new(content.clone());
	let mut index = 0;

	while let Some(node) = walker.next(dom) {
		match dom.node_kind(&node) {
			NodeKind::Element => {
				let bound = dom
					.attribute_names(&node)
					.iter()
					.filter(|name| name.ends_with(BOUND_ATTRIBUTE_SUFFIX) || name.starts_with(MARKER))
					.count();
				for _ in 0..bound {
					match bindings.next() {
						Some(TagBinding::Attribute(name)) => parts.push(describe_attribute(dom, &node, index, name)?),
						Some(TagBinding::Element(marker)) => {
							dom.remove_attribute(&node, &marker);
							parts.push(PartDescriptor {
								kind: PartKind::Element,
								index,
								name: None,
								strings: None,
							});
						}
						None => break,
					}
				}

				if scan::is_raw_text_element(&dom.tag_name(&node)) && split_raw_text(dom, &node) {
					*raw_text_bindings = true;
				}
			}
			NodeKind::Comment => {
				let data = dom.data(&node);
				if data == MARKER_MATCH {
					parts.push(PartDescriptor {
						kind: PartKind::Child,
						index,
						name: None,
						strings: None,
					});
				} else {
					for _ in data.matches(MARKER) {
						parts.push(PartDescriptor {
							kind: PartKind::Comment,
							index,
							name: None,
							strings: None,
						});
					}
				}
			}
			_ => (),
		}
		index += 1;
	}

	Ok(parts)
}

fn describe_attribute<D: Dom>(dom: &D, element: &D::Node, index: usize, real_name: String) -> Result<PartDescriptor, TemplateError> {
	let dom_name = format!("{}{}", real_name.to_ascii_lowercase(), BOUND_ATTRIBUTE_SUFFIX);
	let value = dom.get_attribute(element, &dom_name).unwrap_or_default();
	dom.remove_attribute(element, &dom_name);
	let strings: Rc<[String]> = value.split(MARKER).map(str::to_owned).collect();

	let (kind, name) = match real_name.chars().next() {
		Some('.') => (PartKind::Property, real_name[1..].to_owned()),
		Some('?') => (PartKind::BooleanAttribute, real_name[1..].to_owned()),
		Some('@') => (PartKind::Event, real_name[1..].to_owned()),
		_ => (PartKind::Attribute, real_name),
	};

	if kind != PartKind::Attribute && (strings.len() != 2 || strings.iter().any(|s| !s.is_empty())) {
		return Err(TemplateError::InterpolatedBinding { kind, name });
	}

	Ok(PartDescriptor {
		kind,
		index,
		name: Some(name),
		strings: Some(strings),
	})
}

/// Comments don't parse inside raw-text elements, so markers there arrive as text.
/// Splits that text into text nodes and child markers. Returns whether there were any.
fn split_raw_text<D: Dom>(dom: &D, element: &D::Node) -> bool {
	let mut text = String::new();
	let mut child = dom.first_child(element);
	while let Some(node) = child {
		text.push_str(&dom.data(&node));
		child = dom.next_sibling(&node);
	}
	if !text.contains(MARKER) {
		return false;
	}

	while let Some(node) = dom.first_child(element) {
		dom.remove(&node);
	}
	let mut segments = text.split(MARKER).peekable();
	while let Some(segment) = segments.next() {
		dom.insert_before(element, &dom.create_text(segment), None);
		if segments.peek().is_some() {
			dom.insert_before(element, &dom.create_comment(MARKER_MATCH), None);
		}
	}
	// End node of the last part.
	dom.insert_before(element, &dom.create_comment(""), None);
	true
}
