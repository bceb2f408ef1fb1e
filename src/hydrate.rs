//! Hydration of server-rendered markup.
//!
//! The markers, as written by [`ServerRenderer`](`crate::ServerRenderer`):
//!
//! - `<!--lit-part DIGEST-->` opens a child part showing a template result with that digest,
//! - `<!--lit-part-->` opens any other child part (including each item of a list),
//! - `<!--/lit-part-->` closes the innermost open part,
//! - `<!--lit-bindings N-->` directly follows the start tag of the template element with depth-first index `N`
//!   (or its end tag, for void and raw text elements), whose attribute-like and element parts are bound here.
//!
//! The comments of the container are collected first and then run through a stack of open parts.
//! Nothing is created or moved, and only property and event parts write to the DOM.

use crate::{
	child::{ChildDirective, ChildPart, Committed},
	dom::{Dom, NodeKind, Walker},
	error::{Error, HydrationError, TemplateError},
	instance::{Part, TemplateInstance},
	keyed::{self, KeyedItem, KeyedPart},
	part::{AttributePart, ElementPart},
	render::Context,
	template::{PartKind, Template},
	value::{Key, Value},
};
use std::{rc::Rc, vec};
use tracing::{instrument, trace};

const PART_OPEN: &str = "lit-part";
const PART_CLOSE: &str = "/lit-part";
const BINDINGS: &str = "lit-bindings ";

enum State<D: Dom> {
	Leaf(Value),
	List {
		items: vec::IntoIter<Value>,
		parts: Vec<ChildPart<D>>,
	},
	Keyed {
		items: vec::IntoIter<KeyedItem>,
		parts: Vec<KeyedPart<D>>,
	},
	Instance {
		template: Rc<Template<D>>,
		values: vec::IntoIter<Value>,
		next_descriptor: usize,
		parts: Vec<Part<D>>,
	},
	/// A directive and the frame of the value it resolved to.
	Directive {
		directive: Box<ChildDirective<D>>,
		inner: Box<State<D>>,
	},
}

/// The state that parts below a frame belong to, looking through directives.
fn innermost<D: Dom>(state: &mut State<D>) -> &mut State<D> {
	match state {
		State::Directive { inner, .. } => innermost(inner),
		state => state,
	}
}

/// An open child part.
struct Frame<D: Dom> {
	start: D::Node,
	/// Set for items of keyed lists.
	key: Option<Key>,
	state: State<D>,
}

/// Reconstructs the part tree of `value` over the markup in `container` and returns its root part.
#[instrument(skip(cx, value))]
pub(crate) fn hydrate<D: Dom>(cx: &Context<D>, value: Value, container: &D::Node) -> Result<ChildPart<D>, Error> {
	let dom = cx.dom();
	let mut comments = Vec::new();
	let mut walker = Walker::<D>::comments(container.clone());
	while let Some(comment) = walker.next(dom) {
		comments.push(comment);
	}
	trace!("Found {} comment(s).", comments.len());

	let mut root_value = Some(value);
	let mut root: Option<ChildPart<D>> = None;
	let mut stack: Vec<Frame<D>> = Vec::new();

	for comment in comments {
		let data = dom.data(&comment);
		if data == PART_OPEN || data.starts_with("lit-part ") {
			let digest = data.strip_prefix("lit-part ").map(str::trim);
			let (value, key) = match stack.last_mut() {
				None => match root_value.take() {
					Some(value) if root.is_none() => (value, None),
					_ => return Err(HydrationError::MultipleRootParts.into()),
				},
				Some(parent) => next_child_value(innermost(&mut parent.state))?,
			};
			let state = open(cx, value, digest, &comment)?;
			stack.push(Frame { start: comment, key, state });
		} else if data == PART_CLOSE {
			let frame = stack.pop().ok_or(HydrationError::UnbalancedMarker)?;
			let key = frame.key.clone();
			let part = close(frame, comment)?;
			match stack.last_mut() {
				None => root = Some(part),
				Some(parent) => attach(innermost(&mut parent.state), part, key)?,
			}
		} else if let Some(index) = data.strip_prefix(BINDINGS) {
			let index = index.trim().parse::<usize>().map_err(|_| HydrationError::Internal("malformed `lit-bindings` marker"))?;
			let frame = stack.last_mut().ok_or(HydrationError::UnexpectedBindings { index })?;
			bind(cx, innermost(&mut frame.state), &comment, index)?;
		}
	}

	if !stack.is_empty() {
		return Err(HydrationError::UnterminatedPart { open: stack.len() }.into());
	}
	root.ok_or_else(|| HydrationError::NoRootPart.into())
}

/// The value (and key) for a child part opened inside `parent`.
fn next_child_value<D: Dom>(parent: &mut State<D>) -> Result<(Value, Option<Key>), HydrationError> {
	match parent {
		State::Instance {
			template,
			values,
			next_descriptor,
			parts,
		} => {
			skip_comment_parts(template, values, next_descriptor, parts);
			match template.parts().get(*next_descriptor).map(|descriptor| descriptor.kind) {
				Some(PartKind::Child) => {
					*next_descriptor += 1;
					values.next().map(|value| (value, None)).ok_or(HydrationError::Internal("template instance ran out of values"))
				}
				expected => Err(HydrationError::PartMismatch { expected }),
			}
		}
		State::List { items, .. } => items.next().map(|value| (value, None)).ok_or(HydrationError::ServerIterableLonger),
		State::Keyed { items, .. } => items.next().map(|item| (item.value, Some(item.key))).ok_or(HydrationError::ServerIterableLonger),
		State::Leaf(_) | State::Directive { .. } => Err(HydrationError::PartMismatch { expected: None }),
	}
}

fn skip_comment_parts<D: Dom>(template: &Template<D>, values: &mut vec::IntoIter<Value>, next_descriptor: &mut usize, parts: &mut Vec<Part<D>>) {
	while template.parts().get(*next_descriptor).map_or(false, |descriptor| descriptor.kind == PartKind::Comment) {
		drop(values.next());
		parts.push(Part::Comment);
		*next_descriptor += 1;
	}
}

/// Starts a frame for `value` at its `lit-part` marker `start`.
fn open<D: Dom>(cx: &Context<D>, value: Value, digest: Option<&str>, start: &D::Node) -> Result<State<D>, Error> {
	match value {
		// The server rendered what the directive resolves to, within the same markers.
		Value::Directive(result) => {
			let (directive, value) = ChildDirective::hydrate(cx, &result, ChildPart::new(start.clone(), None, true))?;
			let inner = open(cx, value, digest, start)?;
			Ok(State::Directive {
				directive: Box::new(directive),
				inner: Box::new(inner),
			})
		}
		Value::Template(result) => {
			let template = cx.template(&result)?;
			if digest != Some(template.digest()) {
				return Err(HydrationError::DigestMismatch {
					expected: template.digest().to_owned(),
					found: digest.unwrap_or_default().to_owned(),
				}
				.into());
			}
			let values = result.into_values();
			if values.len() != template.value_count() {
				return Err(TemplateError::ValueCountMismatch {
					expected: template.value_count(),
					found: values.len(),
				}
				.into());
			}
			Ok(State::Instance {
				template,
				values: values.into_iter(),
				next_descriptor: 0,
				parts: Vec::new(),
			})
		}
		_ if digest.is_some() => Err(HydrationError::DigestMismatch {
			expected: String::new(),
			found: digest.unwrap_or_default().to_owned(),
		}
		.into()),
		Value::List(items) => Ok(State::List {
			items: items.into_iter(),
			parts: Vec::new(),
		}),
		Value::Keyed(items) => Ok(State::Keyed {
			items: keyed::dedupe(items).into_iter(),
			parts: Vec::new(),
		}),
		value => Ok(State::Leaf(value)),
	}
}

/// Finishes a frame at its `/lit-part` marker.
fn close<D: Dom>(frame: Frame<D>, end: D::Node) -> Result<ChildPart<D>, Error> {
	let committed = finish(frame.state, &frame.start, &end)?;
	Ok(ChildPart::with_committed(frame.start, Some(end), committed, true))
}

fn finish<D: Dom>(state: State<D>, start: &D::Node, end: &D::Node) -> Result<Committed<D>, Error> {
	Ok(match state {
		State::Leaf(Value::NoChange) => Committed::Empty,
		State::Leaf(Value::Nothing) => Committed::Nothing,
		State::Leaf(value) if value.is_primitive() => Committed::Primitive(value),
		State::Leaf(value) => Committed::Primitive(Value::Str(value.to_text().into())),
		State::List { mut items, parts } => {
			if items.next().is_some() {
				return Err(HydrationError::ServerIterableShorter.into());
			}
			Committed::List(parts)
		}
		State::Keyed { mut items, parts } => {
			if items.next().is_some() {
				return Err(HydrationError::ServerIterableShorter.into());
			}
			Committed::Keyed(parts)
		}
		State::Instance {
			template,
			mut values,
			mut next_descriptor,
			mut parts,
		} => {
			skip_comment_parts(&template, &mut values, &mut next_descriptor, &mut parts);
			let missing = template.parts().len() - next_descriptor;
			if missing > 0 {
				return Err(HydrationError::MissingParts { missing }.into());
			}
			Committed::Template(TemplateInstance::from_parts(template, parts))
		}
		State::Directive { directive, inner } => {
			let committed = finish(*inner, start, end)?;
			*directive.content().borrow_mut() = ChildPart::with_committed(start.clone(), Some(end.clone()), committed, true);
			Committed::Directive(directive)
		}
	})
}

fn attach<D: Dom>(parent: &mut State<D>, part: ChildPart<D>, key: Option<Key>) -> Result<(), HydrationError> {
	match parent {
		State::Instance { parts, .. } => parts.push(Part::Child(part)),
		State::List { parts, .. } => parts.push(part),
		State::Keyed { parts, .. } => match key {
			Some(key) => parts.push(KeyedPart { key, part }),
			None => return Err(HydrationError::Internal("keyed list item without key")),
		},
		State::Leaf(_) | State::Directive { .. } => return Err(HydrationError::Internal("child part closed inside a leaf")),
	}
	Ok(())
}

/// Binds the attribute-like and element parts of the element at `index` at its `lit-bindings` marker.
fn bind<D: Dom>(cx: &Context<D>, state: &mut State<D>, marker: &D::Node, index: usize) -> Result<(), Error> {
	let dom = cx.dom();
	let (template, values, next_descriptor, parts) = match state {
		State::Instance {
			template,
			values,
			next_descriptor,
			parts,
		} => (template, values, next_descriptor, parts),
		_ => return Err(HydrationError::UnexpectedBindings { index }.into()),
	};

	let element = match dom.previous_sibling(marker) {
		Some(previous) if dom.node_kind(&previous) == NodeKind::Element => previous,
		_ => dom.parent(marker).ok_or(HydrationError::Internal("detached `lit-bindings` marker"))?,
	};

	let mut bound = 0;
	loop {
		skip_comment_parts(template, values, next_descriptor, parts);
		let descriptor = match template.parts().get(*next_descriptor) {
			Some(descriptor) if descriptor.index == index && !matches!(descriptor.kind, PartKind::Child | PartKind::Comment) => descriptor,
			_ => break,
		};

		if descriptor.kind == PartKind::Element {
			let mut part = ElementPart::new(element.clone(), true);
			part.set_value(cx, values.next().unwrap_or(Value::NoChange))?;
			parts.push(Part::Element(part));
		} else {
			let mut part = AttributePart::new(element.clone(), descriptor, true);
			let count = part.value_count();
			let part_values = values.by_ref().take(count).collect();
			match descriptor.kind {
				// Not representable in markup.
				PartKind::Property | PartKind::Event => part.force(cx, part_values)?,
				_ => part.prime(cx, part_values)?,
			}
			parts.push(Part::Attribute(part));
		}
		*next_descriptor += 1;
		bound += 1;
	}

	if bound == 0 {
		return Err(HydrationError::UnexpectedBindings { index }.into());
	}
	trace!("Bound {} part(s) of element {}.", bound, index);
	Ok(())
}
