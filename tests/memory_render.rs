use lit_dom::{element_callback, html, memory::NodeId, object, on, svg, Dom, Error, Event, TemplateError, TemplateResult, TemplateStrings, Value, NOTHING};
use std::{cell::Cell, rc::Rc};

use memory_dom_::{elements, setup};

fn greeting(name: &str) -> TemplateResult {
	html!(["<p>Hello, ", "!</p>"], name)
}

#[test]
fn first_render() {
	let (dom, container, mut renderer) = setup();

	renderer.render(greeting("World"), &container).unwrap();

	assert_eq!(dom.inner_html(container), "<!----><p>Hello, <!--?lit$3141592$-->World!</p>");
	assert_eq!(dom.text_content(container), "Hello, World!");
}

#[test]
fn same_value_twice_is_idempotent() {
	let (dom, container, mut renderer) = setup();

	renderer.render(greeting("World"), &container).unwrap();
	let p = elements(&dom, container)[0];
	let before = dom.mutation_count();

	renderer.render(greeting("World"), &container).unwrap();
	assert_eq!(dom.mutation_count(), before);

	renderer.render(greeting("Rust"), &container).unwrap();
	assert_eq!(dom.mutation_count(), before + 1);
	assert_eq!(elements(&dom, container), vec![p]);
	assert_eq!(dom.text_content(container), "Hello, Rust!");
}

#[test]
fn templates_are_cached_per_call_site() {
	let (dom, container, mut renderer) = setup();

	for name in ["a", "b", "c"] {
		renderer.render(greeting(name), &container).unwrap();
	}
	assert_eq!(renderer.template_count(), 1);
	let p = elements(&dom, container)[0];

	// Textually identical, but a different site.
	renderer.render(html!(["<p>Hello, ", "!</p>"], "d"), &container).unwrap();
	assert_eq!(renderer.template_count(), 2);
	assert_ne!(elements(&dom, container), vec![p]);
	assert_eq!(dom.text_content(container), "Hello, d!");
}

#[test]
fn switching_templates_replaces_content() {
	let (dom, container, mut renderer) = setup();

	renderer.render(greeting("World"), &container).unwrap();
	renderer.render(html!(["<b>", "</b>"], 1), &container).unwrap();

	let children = elements(&dom, container);
	assert_eq!(children.len(), 1);
	assert_eq!(dom.tag_name(&children[0]), "b");
	assert_eq!(dom.text_content(container), "1");
}

#[test]
fn nested_templates_update_in_place() {
	let (dom, container, mut renderer) = setup();
	let outer = |inner: &str| html!(["<div>", "</div>"], html!(["<span>", "</span>"], inner));

	renderer.render(outer("x"), &container).unwrap();
	let div = elements(&dom, container)[0];
	let span = elements(&dom, div)[0];

	renderer.render(outer("y"), &container).unwrap();
	assert_eq!(elements(&dom, container), vec![div]);
	assert_eq!(elements(&dom, div), vec![span]);
	assert_eq!(dom.text_content(container), "y");
}

#[test]
fn primitives() {
	let (dom, container, mut renderer) = setup();

	let cases: Vec<(Value, &str)> = vec![
		(3.into(), "3"),
		(1.5.into(), "1.5"),
		(true.into(), "true"),
		(Value::Null, ""),
		(Value::Undefined, ""),
		(f64::NAN.into(), "NaN"),
		(object(42_u8), "42"),
	];
	for (value, text) in cases {
		renderer.render(value, &container).unwrap();
		assert_eq!(dom.text_content(container), text);
	}
}

#[test]
fn nothing_clears() {
	let (dom, container, mut renderer) = setup();

	renderer.render(greeting("World"), &container).unwrap();
	renderer.render(NOTHING, &container).unwrap();

	assert_eq!(dom.child_nodes(container).len(), 1);
	assert_eq!(dom.text_content(container), "");
}

#[test]
fn lists_reuse_items_by_position() {
	let (dom, container, mut renderer) = setup();
	let item = |text: &str| html!(["<i>", "</i>"], text);

	renderer.render(vec![item("a"), item("b"), item("c")], &container).unwrap();
	let before = elements(&dom, container);
	assert_eq!(dom.text_content(container), "abc");

	renderer.render(vec![item("c"), item("b")], &container).unwrap();
	assert_eq!(elements(&dom, container), before[..2].to_vec());
	assert_eq!(dom.text_content(container), "cb");

	renderer.render(Vec::<Value>::new(), &container).unwrap();
	assert_eq!(dom.text_content(container), "");
}

#[test]
fn interpolated_attribute() {
	let (dom, container, mut renderer) = setup();
	let labelled = |a: &str, b: &str| html!(["<a title=\"", "-", "\"></a>"], a, b);

	renderer.render(labelled("value", "b"), &container).unwrap();
	let a = elements(&dom, container)[0];
	assert_eq!(dom.get_attribute(&a, "title").as_deref(), Some("value-b"));

	let before = dom.mutation_count();
	renderer.render(labelled("value", "b"), &container).unwrap();
	assert_eq!(dom.mutation_count(), before);

	renderer.render(labelled("value", "newB"), &container).unwrap();
	assert_eq!(dom.get_attribute(&a, "title").as_deref(), Some("value-newB"));
	assert_eq!(dom.mutation_count(), before + 1);
}

#[test]
fn attribute_nothing_removes() {
	let (dom, container, mut renderer) = setup();
	let titled = |title: Value| html!(["<a class=\"static\" title=", "></a>"], title);

	renderer.render(titled("x".into()), &container).unwrap();
	let a = elements(&dom, container)[0];
	assert_eq!(dom.get_attribute(&a, "title").as_deref(), Some("x"));
	assert_eq!(dom.get_attribute(&a, "class").as_deref(), Some("static"));

	renderer.render(titled(NOTHING), &container).unwrap();
	assert_eq!(dom.get_attribute(&a, "title"), None);
}

#[test]
fn boolean_attribute() {
	let (dom, container, mut renderer) = setup();
	let input = |checked: bool| html!(["<input ?checked=", ">"], checked);

	renderer.render(input(true), &container).unwrap();
	let element = elements(&dom, container)[0];
	assert_eq!(dom.get_attribute(&element, "checked").as_deref(), Some(""));

	renderer.render(input(false), &container).unwrap();
	assert_eq!(dom.get_attribute(&element, "checked"), None);
}

#[test]
fn property() {
	let (dom, container, mut renderer) = setup();
	let input = |value: Value| html!(["<input .value=", ">"], value);

	renderer.render(input("x".into()), &container).unwrap();
	let element = elements(&dom, container)[0];
	assert_eq!(dom.property(element, "value"), Some(Value::from("x")));
	assert_eq!(dom.get_attribute(&element, "value"), None);

	renderer.render(input(NOTHING), &container).unwrap();
	assert_eq!(dom.property(element, "value"), Some(Value::Undefined));
}

#[test]
fn event_listener() {
	let (dom, container, mut renderer) = setup();
	let clicks = Rc::new(Cell::new(0));
	let button = |listener: Value| html!(["<button @click=", ">Click</button>"], listener);

	let listener = on({
		let clicks = clicks.clone();
		move |event| {
			assert_eq!(event.kind(), "click");
			clicks.set(clicks.get() + 1);
		}
	});
	renderer.render(button(listener.clone()), &container).unwrap();
	let element = elements(&dom, container)[0];
	assert_eq!(dom.listener_count(element, "click"), 1);
	assert_eq!(dom.dispatch_event(element, &Event::new("click")), 1);
	assert_eq!(clicks.get(), 1);

	// A new handler is swapped in without re-registering.
	let before = dom.mutation_count();
	renderer
		.render(
			button(on({
				let clicks = clicks.clone();
				move |_| clicks.set(clicks.get() + 10)
			})),
			&container,
		)
		.unwrap();
	assert_eq!(dom.mutation_count(), before);
	assert_eq!(dom.listener_count(element, "click"), 1);
	dom.dispatch_event(element, &Event::new("click"));
	assert_eq!(clicks.get(), 11);

	renderer.render(button(NOTHING), &container).unwrap();
	assert_eq!(dom.listener_count(element, "click"), 0);
	assert_eq!(dom.dispatch_event(element, &Event::new("click")), 0);
	assert_eq!(clicks.get(), 11);
}

#[test]
fn element_callback_runs_once_per_callback() {
	let (dom, container, mut renderer) = setup();
	let seen = Rc::new(Cell::new(None::<NodeId>));
	let calls = Rc::new(Cell::new(0));

	let callback = element_callback({
		let (seen, calls) = (seen.clone(), calls.clone());
		move |element| {
			seen.set(element.downcast_ref::<NodeId>().copied());
			calls.set(calls.get() + 1);
		}
	});
	let div = |callback: Value| html!(["<div ", "></div>"], callback);

	renderer.render(div(callback.clone()), &container).unwrap();
	renderer.render(div(callback), &container).unwrap();

	assert_eq!(calls.get(), 1);
	assert_eq!(seen.get(), Some(elements(&dom, container)[0]));
}

#[test]
fn several_element_callbacks_on_one_element() {
	let (dom, container, mut renderer) = setup();
	let calls = Rc::new(Cell::new(0));
	let count = || {
		let calls = calls.clone();
		element_callback(move |_| calls.set(calls.get() + 1))
	};

	renderer.render(html!(["<div ", " ", "></div>"], count(), count()), &container).unwrap();

	assert_eq!(calls.get(), 2);
	let div = elements(&dom, container)[0];
	assert!(dom.attribute_names(&div).is_empty());
}

#[test]
fn comment_bindings_are_ignored() {
	let (dom, container, mut renderer) = setup();

	renderer.render(html!(["<!-- ", " --><p>", "</p>"], "hidden", "shown"), &container).unwrap();

	assert_eq!(dom.text_content(container), "shown");
}

#[test]
fn svg_templates() {
	let (dom, container, mut renderer) = setup();
	let svg_element = dom.create_element("svg");

	renderer.render(svg!(["<circle r=", "></circle>"], 5), &svg_element).unwrap();
	let circle = elements(&dom, svg_element)[0];
	assert_eq!(dom.tag_name(&circle), "circle");
	assert_eq!(dom.get_attribute(&circle, "r").as_deref(), Some("5"));

	renderer.render(html!(["<p>", "</p>"], 1), &container).unwrap();
	assert_eq!(renderer.template_count(), 2);
}

#[test]
fn raw_text_bindings_work_at_runtime() {
	let (dom, container, mut renderer) = setup();
	let textarea = |text: &str| html!(["<textarea>", "</textarea>"], text);

	renderer.render(textarea("first"), &container).unwrap();
	assert_eq!(dom.text_content(container), "first");

	renderer.render(textarea("second"), &container).unwrap();
	assert_eq!(dom.text_content(container), "second");
}

#[test]
fn wrong_value_count() {
	static STRINGS: TemplateStrings = TemplateStrings::new(&["<p>", "</p>"]);
	let (_dom, container, mut renderer) = setup();

	let error = renderer.render(TemplateResult::new(&STRINGS, vec![]), &container).unwrap_err();
	assert!(matches!(error, Error::Template(TemplateError::ValueCountMismatch { expected: 1, found: 0 })));
}

#[test]
fn dynamic_tag_name_fails() {
	let (_dom, container, mut renderer) = setup();

	let error = renderer.render(html!(["<", "></div>"], "div"), &container).unwrap_err();
	assert!(matches!(error, Error::Template(TemplateError::DynamicTagName { hole: 0 })));
}

#[test]
fn root_part_handles() {
	let (_dom, container, mut renderer) = setup();

	let root = renderer.render(greeting("World"), &container).unwrap();
	assert!(root.is_connected());
	assert_eq!(root.container(), &container);
	assert!(renderer.root(&container).is_some());

	root.set_connected(false);
	assert!(!renderer.root(&container).unwrap().is_connected());

	assert!(renderer.forget(&container).is_some());
	assert!(renderer.root(&container).is_none());
}
