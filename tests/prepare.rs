use lit_dom::{precompile, MemoryDom, PartDescriptor, PartKind, Renderer, ResultKind, Template, TemplateError, TemplateResult, TemplateStrings};
use std::rc::Rc;

use memory_dom_::elements;

fn attribute(kind: PartKind, index: usize, name: &str, strings: &[&str]) -> PartDescriptor {
	PartDescriptor {
		kind,
		index,
		name: Some(name.to_owned()),
		strings: Some(strings.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>().into()),
	}
}

fn node(kind: PartKind, index: usize) -> PartDescriptor {
	PartDescriptor {
		kind,
		index,
		name: None,
		strings: None,
	}
}

fn prepare(strings: &'static TemplateStrings) -> Result<Template<MemoryDom>, TemplateError> {
	Template::new(&MemoryDom::new(), strings, ResultKind::Html)
}

#[test]
fn descriptors_in_document_order() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&[
		"<div class=\"a ",
		" b\" .value=",
		"><!-- ",
		" --><span ?hidden=",
		" @click=",
		">",
		"</span><input ",
		"></div>",
	]);

	let template = prepare(&STRINGS).unwrap();
	assert_eq!(
		template.parts(),
		&[
			attribute(PartKind::Attribute, 0, "class", &["a ", " b"]),
			attribute(PartKind::Property, 0, "value", &["", ""]),
			node(PartKind::Comment, 1),
			attribute(PartKind::BooleanAttribute, 2, "hidden", &["", ""]),
			attribute(PartKind::Event, 2, "click", &["", ""]),
			node(PartKind::Child, 3),
			node(PartKind::Element, 4),
		]
	);
	assert_eq!(template.value_count(), 7);
	assert!(!template.has_raw_text_bindings());
}

#[test]
fn attribute_names_keep_their_case() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<input .valueAsNumber=", " @myEvent=", ">"]);

	let template = prepare(&STRINGS).unwrap();
	assert_eq!(template.parts()[0].name.as_deref(), Some("valueAsNumber"));
	assert_eq!(template.parts()[1].name.as_deref(), Some("myEvent"));
}

#[test]
fn interpolated_attribute_has_one_descriptor() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<a title=\"", "-", "\"></a>"]);

	let template = prepare(&STRINGS).unwrap();
	assert_eq!(template.parts(), &[attribute(PartKind::Attribute, 0, "title", &["", "-", ""])]);
	assert_eq!(template.parts()[0].value_count(), 2);
}

#[test]
fn interpolated_property_is_rejected() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<input .value=\"a", "\">"]);

	assert_eq!(
		prepare(&STRINGS).unwrap_err(),
		TemplateError::InterpolatedBinding {
			kind: PartKind::Property,
			name: "value".to_owned(),
		}
	);
}

#[test]
fn dynamic_tag_names_are_rejected() {
	static OPEN: TemplateStrings = TemplateStrings::new(&["<", "></div>"]);
	static CLOSE: TemplateStrings = TemplateStrings::new(&["<div></", ">"]);

	assert_eq!(prepare(&OPEN).unwrap_err(), TemplateError::DynamicTagName { hole: 0 });
	assert_eq!(prepare(&CLOSE).unwrap_err(), TemplateError::DynamicTagName { hole: 0 });
}

#[test]
fn raw_text_bindings() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<style>p { color: ", "; }</style>"]);

	let template = prepare(&STRINGS).unwrap();
	assert!(template.has_raw_text_bindings());
	assert_eq!(template.parts(), &[node(PartKind::Child, 1)]);
	assert_eq!(precompile(&STRINGS, ResultKind::Html), None);
}

#[test]
fn digest_is_precomputed() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<p>", "</p>"]);

	assert_eq!(prepare(&STRINGS).unwrap().digest(), "y6RVfKR7hws=");
}

#[test]
fn precompiled_templates_render() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<p class=", ">", "</p>"]);

	let compiled = precompile(&STRINGS, ResultKind::Html).unwrap();
	assert_eq!(compiled.html(), "<p><?></p>");
	assert_eq!(compiled.kind(), ResultKind::Html);
	assert_eq!(compiled.parts(), &[attribute(PartKind::Attribute, 0, "class", &["", ""]), node(PartKind::Child, 1)]);

	let dom = Rc::new(MemoryDom::new());
	let container = dom.create_element("div");
	let mut renderer = Renderer::new(dom.clone());
	renderer.insert_compiled(&STRINGS, &compiled);
	assert_eq!(renderer.template_count(), 1);

	renderer.render(TemplateResult::new(&STRINGS, vec!["x".into(), "y".into()]), &container).unwrap();
	assert_eq!(renderer.template_count(), 1);
	assert_eq!(dom.text_content(container), "y");
	assert_eq!(dom.outer_html(elements(&dom, container)[0]), "<p class=\"x\"><!--?-->y</p>");
}

#[test]
fn runtime_template_identity() {
	let first = TemplateStrings::leak(vec!["<b>".to_owned(), "</b>".to_owned()]);
	let second = TemplateStrings::leak(vec!["<b>".to_owned(), "</b>".to_owned()]);

	let dom = Rc::new(MemoryDom::new());
	let container = dom.create_element("div");
	let mut renderer = Renderer::new(dom.clone());
	renderer.render(TemplateResult::new(first, vec!["1".into()]), &container).unwrap();
	renderer.render(TemplateResult::new(second, vec!["2".into()]), &container).unwrap();

	assert_eq!(renderer.template_count(), 2);
	assert_eq!(dom.text_content(container), "2");
}
