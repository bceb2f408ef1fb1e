//! Marker preparation of static template strings.
//!
//! The strings are scanned with a small HTML-context state machine (text, comment, tag, quoted attribute value, raw text)
//! to decide what each hole turns into:
//!
//! - in text: a `<?lit$…$>` processing instruction, which parses as a comment node,
//! - at the end of an attribute name: the attribute is renamed to `name$lit$` and its value receives the marker,
//! - anywhere else (attribute values after the first hole, comments, raw text, tag position): the bare marker.

use crate::error::TemplateError;
use lazy_static::lazy_static;
use regex::Regex;

pub(crate) const MARKER: &str = "lit$3141592$";
/// The data of the comment `<?lit$3141592$>` parses into.
pub(crate) const MARKER_MATCH: &str = "?lit$3141592$";
pub(crate) const NODE_MARKER: &str = "<?lit$3141592$>";
pub(crate) const BOUND_ATTRIBUTE_SUFFIX: &str = "$lit$";

lazy_static! {
	static ref TEXT_END: Regex = Regex::new(r"<(?:(!--|/[^a-zA-Z])|(/?[a-zA-Z][^>\s]*)|(/?$))").unwrap();
	static ref COMMENT_END: Regex = Regex::new("-->").unwrap();
	static ref COMMENT2_END: Regex = Regex::new(">").unwrap();
	static ref TAG_END: Regex = Regex::new(r#">|[ \t\n\f\r]([^\x00-\x1F\x7F-\x9F "'>=/]+)([ \t\n\f\r]*=[ \t\n\f\r]*(?:[^ \t\n\f\r"'`<>=]|("|')|))"#).unwrap();
	static ref SINGLE_QUOTE_END: Regex = Regex::new("'").unwrap();
	static ref DOUBLE_QUOTE_END: Regex = Regex::new("\"").unwrap();
}

const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

pub(crate) fn is_raw_text_element(tag_name: &str) -> bool {
	RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(tag_name))
}

/// A hole in tag position, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagBinding {
	/// The (case-preserved) attribute name, including any `.`, `?` or `@` prefix.
	Attribute(String),
	/// The name of the marker attribute standing in for the hole, unique per hole.
	Element(String),
}

#[derive(Debug)]
pub(crate) struct Scanned {
	pub html: String,
	pub bindings: Vec<TagBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
	Text,
	Comment,
	Comment2,
	Tag,
	SingleQuote,
	DoubleQuote,
	/// Lowercase closing tag prefix, like `</script`.
	RawText(String),
}

fn is_html_space(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\n' | '\x0C' | '\r')
}

/// Case-insensitive ASCII search.
fn find_ignore_case(haystack: &str, from: usize, needle: &str) -> Option<usize> {
	let bytes = haystack.as_bytes();
	let needle = needle.as_bytes();
	(from..=bytes.len().checked_sub(needle.len())?).find(|&i| bytes[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Joins `strings` into marker-prepared HTML.
pub(crate) fn prepare(strings: &[&str]) -> Result<Scanned, TemplateError> {
	let holes = strings.len().saturating_sub(1);
	let mut html = String::new();
	let mut bindings = Vec::new();
	let mut state = State::Text;
	let mut raw_text_end: Option<String> = None;
	// Set after a hole that is an unquoted attribute value, which the next hole may continue.
	let mut in_unquoted_value = false;

	for (hole, s) in strings[..holes].iter().enumerate() {
		let mut attribute_name_end: Option<usize> = None;
		let mut attribute_name: Option<&str> = None;
		let continues_value = in_unquoted_value && !s.contains(|c: char| is_html_space(c) || c == '>');
		let mut last = 0;

		while last < s.len() {
			if let State::RawText(end) = &state {
				match find_ignore_case(s, last, end) {
					Some(i) => {
						last = i + end.len();
						state = State::Tag;
						continue;
					}
					None => break,
				}
			}

			let regex: &Regex = match state {
				State::Text => &*TEXT_END,
				State::Comment => &*COMMENT_END,
				State::Comment2 => &*COMMENT2_END,
				State::Tag => &*TAG_END,
				State::SingleQuote => &*SINGLE_QUOTE_END,
				State::DoubleQuote => &*DOUBLE_QUOTE_END,
				State::RawText(_) => break,
			};
			let captures = match regex.captures_at(s, last) {
				Some(captures) => captures,
				None => break,
			};
			let whole = match captures.get(0) {
				Some(whole) => whole,
				None => break,
			};
			last = whole.end();

			state = match state {
				State::Text => {
					if let Some(comment) = captures.get(1) {
						if comment.as_str() == "!--" {
							State::Comment
						} else {
							State::Comment2
						}
					} else if let Some(tag) = captures.get(2) {
						if is_raw_text_element(tag.as_str()) {
							raw_text_end = Some(format!("</{}", tag.as_str().to_ascii_lowercase()));
						}
						State::Tag
					} else if captures.get(3).is_some() {
						return Err(TemplateError::DynamicTagName { hole });
					} else {
						State::Text
					}
				}
				State::Tag => {
					if whole.as_str() == ">" {
						attribute_name_end = None;
						raw_text_end.take().map_or(State::Text, State::RawText)
					} else {
						let spaces_and_equals = captures.get(2).map_or(0, |g| g.as_str().len());
						attribute_name_end = Some(whole.end() - spaces_and_equals);
						attribute_name = captures.get(1).map(|g| g.as_str());
						match captures.get(3).map(|g| g.as_str()) {
							None => State::Tag,
							Some("\"") => State::DoubleQuote,
							Some(_) => State::SingleQuote,
						}
					}
				}
				State::SingleQuote | State::DoubleQuote => State::Tag,
				State::Comment | State::Comment2 => State::Text,
				State::RawText(end) => State::RawText(end),
			};
		}

		if state == State::Text {
			html.push_str(s);
			html.push_str(NODE_MARKER);
			in_unquoted_value = false;
			continue;
		}

		match (attribute_name_end, attribute_name) {
			(Some(end), Some(name)) => {
				bindings.push(TagBinding::Attribute(name.to_owned()));
				html.push_str(&s[..end]);
				html.push_str(BOUND_ATTRIBUTE_SUFFIX);
				html.push_str(&s[end..]);
				in_unquoted_value = state == State::Tag;
			}
			_ => {
				html.push_str(s);
				if state == State::Tag && !continues_value {
					// Parsers keep only one of several attributes with the same name.
					let name = format!("{}{}", MARKER, hole);
					html.push_str(&name);
					if !strings[hole + 1].starts_with(|c: char| is_html_space(c) || c == '>' || c == '/') {
						html.push(' ');
					}
					bindings.push(TagBinding::Element(name));
					in_unquoted_value = false;
					continue;
				}
			}
		}
		html.push_str(MARKER);
	}

	match strings.last() {
		Some(last) if !last.is_empty() => html.push_str(last),
		// So that a trailing child part has an end node. `<?>` parses as a comment that isn't a marker.
		_ => html.push_str("<?>"),
	}

	Ok(Scanned { html, bindings })
}
