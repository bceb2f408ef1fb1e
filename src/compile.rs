//! Ahead-of-time template preparation.

use crate::{
	memory::MemoryDom,
	scan::MARKER_MATCH,
	template::{PartDescriptor, ResultKind, Template, TemplateStrings},
};
use tracing::{debug, instrument};

/// A template in static form: HTML with `<?>` in child positions and bound attributes removed, plus its part descriptors.
///
/// Feed it to [`Renderer::insert_compiled`](`crate::Renderer::insert_compiled`) to skip preparation at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
	pub(crate) html: String,
	pub(crate) parts: Vec<PartDescriptor>,
	pub(crate) kind: ResultKind,
}

impl CompiledTemplate {
	#[must_use]
	pub fn html(&self) -> &str {
		&self.html
	}

	#[must_use]
	pub fn parts(&self) -> &[PartDescriptor] {
		&self.parts
	}

	#[must_use]
	pub fn kind(&self) -> ResultKind {
		self.kind
	}
}

/// Prepares `strings` into their static form.
///
/// Returns `None` for templates that can't be expressed that way, which then stay with runtime preparation:
/// dynamic tag names, and child bindings inside `<script>`, `<style>`, `<textarea>` or `<title>`.
#[must_use]
#[instrument]
pub fn precompile(strings: &'static TemplateStrings, kind: ResultKind) -> Option<CompiledTemplate> {
	let dom = MemoryDom::new();
	let template = match Template::new(&dom, strings, kind) {
		Ok(template) => template,
		Err(error) => {
			debug!("Not precompiling: {}", error);
			return None;
		}
	};
	if template.has_raw_text_bindings() {
		debug!("Not precompiling: child bindings inside raw text elements.");
		return None;
	}

	let html = dom.inner_html(*template.content()).replace(&format!("<!--{}-->", MARKER_MATCH), "<?>");
	Some(CompiledTemplate {
		html,
		parts: template.parts().to_vec(),
		kind,
	})
}
