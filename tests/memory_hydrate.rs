use lit_dom::{digest_for_template, element_callback, html, on, repeat, Dom, Error, Event, HydrationError, ServerRenderer, TemplateResult, Value};
use std::{cell::Cell, rc::Rc};

use memory_dom_::{elements, setup};

fn page(title: &str, items: &[&'static str]) -> TemplateResult {
	html!(
		["<section class=", "><h1>", "</h1><ul>", "</ul></section>"],
		title.to_lowercase(),
		title,
		items.iter().map(|item| html!(["<li>", "</li>"], *item)).collect::<Vec<_>>(),
	)
}

fn server_render(value: impl Into<Value>) -> String {
	ServerRenderer::new().render_to_string(&value.into()).unwrap()
}

#[test]
fn server_markup() {
	let paragraph = |class: &str, text: &str| html!(["<p class=", ">", "</p>"], class, text);

	assert_eq!(
		server_render(paragraph("x", "<y>")),
		format!(
			"<!--lit-part {}--><p class=\"x\"><!--lit-bindings 0--><!--lit-part-->&lt;y&gt;<!--/lit-part--></p><!--/lit-part-->",
			digest_for_template(&["<p class=", ">", "</p>"]),
		),
	);
	assert_eq!(server_render(vec!["a", "b"]), "<!--lit-part--><!--lit-part-->a<!--/lit-part--><!--lit-part-->b<!--/lit-part--><!--/lit-part-->");
	assert_eq!(server_render(lit_dom::NOTHING), "<!--lit-part--><!--/lit-part-->");
}

#[test]
fn server_markup_for_void_and_boolean() {
	let input = |checked: bool| html!(["<input ?checked=", ">"], checked);

	assert!(server_render(input(true)).contains("<input checked><!--lit-bindings 0-->"));
	assert!(server_render(input(false)).contains("<input><!--lit-bindings 0-->"));
}

#[test]
fn hydrates_without_mutations() {
	let html = server_render(page("Todo", &["Write", "Test"]));

	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &html);
	let section = elements(&dom, container)[0];

	renderer.hydrate(page("Todo", &["Write", "Test"]), &container).unwrap();
	assert_eq!(dom.mutation_count(), 0);
	assert_eq!(elements(&dom, container), vec![section]);

	// The same value again is a no-op, too.
	renderer.render(page("Todo", &["Write", "Test"]), &container).unwrap();
	assert_eq!(dom.mutation_count(), 0);
}

#[test]
fn updates_after_hydration() {
	let html = server_render(page("Todo", &["Write", "Test"]));

	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &html);
	let section = elements(&dom, container)[0];

	renderer.hydrate(page("Todo", &["Write", "Test"]), &container).unwrap();
	renderer.render(page("Done", &["Write", "Test", "Ship"]), &container).unwrap();

	assert_eq!(elements(&dom, container), vec![section]);
	assert_eq!(dom.get_attribute(&section, "class").as_deref(), Some("done"));
	assert_eq!(dom.text_content(container), "DoneWriteTestShip");
	assert_eq!(renderer.template_count(), 2);
}

#[test]
fn hydrated_primitive_updates_its_text_node() {
	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &server_render("a"));

	renderer.hydrate("a", &container).unwrap();
	renderer.render("b", &container).unwrap();

	assert_eq!(dom.text_content(container), "b");
	assert_eq!(dom.mutation_count(), 1);
}

#[test]
fn keyed_items_keep_their_nodes() {
	let list = |keys: &[u32]| repeat(keys.to_vec(), |key| *key, |key, _| html!(["<li>", "</li>"], *key).into());

	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &server_render(list(&[1, 2, 3])));
	let lis = elements(&dom, container);

	renderer.hydrate(list(&[1, 2, 3]), &container).unwrap();
	assert_eq!(dom.mutation_count(), 0);

	renderer.render(list(&[3, 2, 1]), &container).unwrap();
	assert_eq!(dom.text_content(container), "321");
	assert_eq!(elements(&dom, container), vec![lis[2], lis[1], lis[0]]);
}

#[test]
fn events_and_properties_are_committed() {
	let button = |label: &str, listener: Value| html!(["<button .title=", " @click=", ">Go</button>"], label, listener);
	let clicks = Rc::new(Cell::new(0));
	let listener = on({
		let clicks = clicks.clone();
		move |_| clicks.set(clicks.get() + 1)
	});

	let html = server_render(button("go", Value::Nothing));
	assert!(!html.contains("title"));

	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &html);
	renderer.hydrate(button("go", listener), &container).unwrap();

	let element = elements(&dom, container)[0];
	assert_eq!(dom.property(element, "title"), Some(Value::from("go")));
	assert_eq!(dom.dispatch_event(element, &Event::new("click")), 1);
	assert_eq!(clicks.get(), 1);
}

#[test]
fn digest_mismatch() {
	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &server_render(html!(["<p>", "</p>"], "x")));

	let error = renderer.hydrate(html!(["<div>", "</div>"], "x"), &container).unwrap_err();
	assert!(matches!(error, Error::Hydration(HydrationError::DigestMismatch { .. })));
}

#[test]
fn digest_on_a_non_template() {
	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &server_render(html!(["<p>", "</p>"], "x")));

	let error = renderer.hydrate("x", &container).unwrap_err();
	assert!(matches!(error, Error::Hydration(HydrationError::DigestMismatch { .. })));
}

#[test]
fn server_iterable_longer() {
	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &server_render(vec!["a", "b", "c"]));

	let error = renderer.hydrate(vec!["a", "b"], &container).unwrap_err();
	assert!(matches!(error, Error::Hydration(HydrationError::ServerIterableLonger)));
}

#[test]
fn server_iterable_shorter() {
	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &server_render(vec!["a", "b"]));

	let error = renderer.hydrate(vec!["a", "b", "c"], &container).unwrap_err();
	assert!(matches!(error, Error::Hydration(HydrationError::ServerIterableShorter)));
}

#[test]
fn multiple_root_parts() {
	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &(server_render("a") + &server_render("b")));

	let error = renderer.hydrate("a", &container).unwrap_err();
	assert!(matches!(error, Error::Hydration(HydrationError::MultipleRootParts)));
}

#[test]
fn malformed_markers() {
	let cases: [(&str, fn(&HydrationError) -> bool); 3] = [
		("<!--/lit-part-->", |error| *error == HydrationError::UnbalancedMarker),
		("<!--lit-part-->a", |error| *error == HydrationError::UnterminatedPart { open: 1 }),
		("<p>no markers</p>", |error| *error == HydrationError::NoRootPart),
	];

	for (html, expected) in cases {
		let (dom, container, mut renderer) = setup();
		dom.set_inner_html(container, html);
		match renderer.hydrate("a", &container) {
			Err(Error::Hydration(error)) => assert!(expected(&error), "{}: {:?}", html, error),
			other => panic!("{}: {:?}", html, other),
		}
	}
}

#[test]
fn hydrate_after_render_fails() {
	let (_dom, container, mut renderer) = setup();
	renderer.render("a", &container).unwrap();

	let error = renderer.hydrate("a", &container).unwrap_err();
	assert!(matches!(error, Error::Hydration(HydrationError::AlreadyRendered)));
}

#[test]
fn raw_text_bindings_are_not_server_rendered() {
	let error = ServerRenderer::new().render_to_string(&html!(["<title>", "</title>"], "x").into()).unwrap_err();
	assert!(matches!(error, Error::Unsupported(_)));
}

#[test]
fn attribute_bindings_on_raw_text_elements() {
	let textarea = |name: &str| html!(["<textarea name=", ">static</textarea>"], name);
	let html = server_render(textarea("a"));
	assert!(html.contains("<textarea name=\"a\">static</textarea><!--lit-bindings 0-->"));

	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &html);
	renderer.hydrate(textarea("a"), &container).unwrap();
	assert_eq!(dom.mutation_count(), 0);

	renderer.render(textarea("b"), &container).unwrap();
	let element = elements(&dom, container)[0];
	assert_eq!(dom.get_attribute(&element, "name").as_deref(), Some("b"));
}

#[test]
fn element_parts_round_trip() {
	let calls = Rc::new(Cell::new(0));
	let view = || {
		let count = || {
			let calls = calls.clone();
			element_callback(move |_| calls.set(calls.get() + 1))
		};
		html!(["<div ", " ", ">", "</div>"], count(), count(), "x")
	};

	let html = server_render(view());
	assert!(html.contains("<div><!--lit-bindings 0-->"));
	assert_eq!(calls.get(), 0);

	let (dom, container, mut renderer) = setup();
	dom.set_inner_html(container, &html);
	renderer.hydrate(view(), &container).unwrap();
	assert_eq!(calls.get(), 2);
	assert_eq!(dom.mutation_count(), 0);
	assert_eq!(dom.text_content(container), "x");
}
