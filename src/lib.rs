#![doc(html_root_url = "https://docs.rs/lit-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Template parts over a pluggable DOM.
//!
//! A template is prepared once per literal site into marker HTML and a list of part descriptors.
//! Rendering clones it into a [`Dom`] and commits values into its parts, and re-rendering only touches what changed.
//! [`ServerRenderer`] writes the same templates as HTML with hydration markers, which [`Renderer::hydrate`] takes over.
//!
//! ```
//! use lit_dom::{html, MemoryDom, Renderer};
//! use std::rc::Rc;
//!
//! let dom = Rc::new(MemoryDom::new());
//! let container = dom.create_element("div");
//! let mut renderer = Renderer::new(dom.clone());
//!
//! for name in ["World", "Rust"] {
//!     renderer.render(html!(["<p>Hello, ", "!</p>"], name), &container)?;
//! }
//! assert_eq!(dom.text_content(container), "Hello, Rust!");
//! # Ok::<(), lit_dom::Error>(())
//! ```

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod async_value;
mod cache;
mod child;
mod compile;
mod digest;
mod directive;
mod dom;
mod error;
mod hydrate;
mod instance;
mod keyed;
pub mod memory;
mod part;
mod render;
mod scan;
mod ssr;
mod template;
mod value;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use crate::{
	async_value::{async_append, async_replace, AsyncMode, AsyncValue},
	cache::TemplateCache,
	compile::{precompile, CompiledTemplate},
	digest::digest_for_template,
	directive::{directive, Directive, DirectiveHandle, DirectiveResult, PartInfo},
	dom::{Dom, NodeKind},
	error::{Error, HydrationError, TemplateError},
	keyed::{repeat, KeyedItem},
	memory::MemoryDom,
	render::{RenderOptions, Renderer, RootPart},
	ssr::ServerRenderer,
	template::{PartDescriptor, PartKind, ResultKind, Template, TemplateResult, TemplateStrings},
	value::{element_callback, object, on, ElementCallback, Event, EventListener, Key, ListenerOptions, ListenerSlot, Value},
};

/// Builds a [`TemplateResult`] from string literals and expressions, one fewer expressions than strings.
///
/// Each invocation is its own template identity, even if the strings are the same as elsewhere.
///
/// ```
/// use lit_dom::html;
///
/// let greeting = html!(["<p class=", ">Hello, ", "!</p>"], "big", "World");
/// assert_eq!(greeting.values().len(), 2);
/// ```
#[macro_export]
macro_rules! html {
	([$($s:literal),+ $(,)?] $(, $v:expr)* $(,)?) => {{
		static STRINGS: $crate::TemplateStrings = $crate::TemplateStrings::new(&[$($s),+]);
		$crate::TemplateResult::new(&STRINGS, vec![$($crate::Value::from($v)),*])
	}};
}

/// Like [`html!`], but parsed as SVG content.
#[macro_export]
macro_rules! svg {
	([$($s:literal),+ $(,)?] $(, $v:expr)* $(,)?) => {{
		static STRINGS: $crate::TemplateStrings = $crate::TemplateStrings::new(&[$($s),+]);
		$crate::TemplateResult::svg(&STRINGS, vec![$($crate::Value::from($v)),*])
	}};
}

/// Clears a child part or removes an attribute.
pub const NOTHING: Value = Value::Nothing;

/// Leaves a part as it is.
pub const NO_CHANGE: Value = Value::NoChange;
