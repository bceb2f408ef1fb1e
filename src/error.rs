//! Error taxonomy.
//!
//! Structural problems abort the `render`/`hydrate` call that found them.
//! Advisory conditions (like duplicate keys) are only logged and never show up here.

use thiserror::Error;

/// Any failure of a render, hydration or server render call.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Template(#[from] TemplateError),
	#[error(transparent)]
	Hydration(#[from] HydrationError),
	/// An asynchronous value was rendered by a renderer without [`RenderOptions::with_spawner`](`crate::RenderOptions::with_spawner`).
	#[error("asynchronous values require a spawner in the render options")]
	NoSpawner,
	#[error("failed to spawn the subscription of an asynchronous value: {0}")]
	Spawn(#[from] futures::task::SpawnError),
	/// A directive committed a value into a part that is being rendered right now.
	#[error("a directive value was committed into a part that is busy rendering")]
	PartBusy,
	/// The value can't be expressed in this output format.
	#[error("unsupported: {0}")]
	Unsupported(&'static str),
}

/// Preparation of template strings failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
	/// `<${tag}>` and `</${tag}>` can't be represented with markers.
	#[error("template hole {hole} is used as a tag name, which is not supported")]
	DynamicTagName { hole: usize },
	/// `.prop`, `?bool` and `@event` bindings must be the complete attribute value.
	#[error("`{name}` binds a {kind:?} part, which can't be interpolated with static text or other expressions")]
	InterpolatedBinding { kind: crate::PartKind, name: String },
	/// The parsed template didn't account for every expression hole.
	#[error("the template has {expected} expression(s), but its parts consume {found}")]
	BindingCountMismatch { expected: usize, found: usize },
	/// A template result carried the wrong number of values for its strings.
	#[error("the template has {expected} part value(s), but the result carries {found}")]
	ValueCountMismatch { expected: usize, found: usize },
	/// The template content didn't contain the node a part descriptor points at.
	#[error("no node at depth-first index {index} of the template content")]
	MissingNode { index: usize },
}

/// Hydration of server-rendered markup failed.
///
/// None of these are recoverable: once the markers and the value disagree, the layout of everything downstream is unknown.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HydrationError {
	#[error("container already contains a live render")]
	AlreadyRendered,
	#[error("there must be only one root part per container")]
	MultipleRootParts,
	#[error("hydration value mismatch: expected template digest {expected:?} but the marker reads {found:?}")]
	DigestMismatch { expected: String, found: String },
	/// The server rendered more items than the value has.
	#[error("unexpected longer than expected iterable: the server-rendered markup has more items than the value")]
	ServerIterableLonger,
	/// The value has more items than the server rendered.
	#[error("unexpected shorter than expected iterable: the value has items that weren't server-rendered")]
	ServerIterableShorter,
	#[error("unbalanced part marker: `/lit-part` without an open part")]
	UnbalancedMarker,
	#[error("unterminated part marker: {open} part(s) still open at the end of the container")]
	UnterminatedPart { open: usize },
	#[error("the container doesn't contain a `lit-part` root marker")]
	NoRootPart,
	#[error("`lit-bindings {index}` marker outside of a template instance or without bound attributes")]
	UnexpectedBindings { index: usize },
	#[error("part marker doesn't match the template's next part ({expected:?})")]
	PartMismatch { expected: Option<crate::PartKind> },
	#[error("template instance closed with {missing} part(s) not found in the markup")]
	MissingParts { missing: usize },
	#[error("hydration internal error: {0}")]
	Internal(&'static str),
}
