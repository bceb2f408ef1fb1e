use futures::{channel::mpsc, executor::LocalPool};
use lit_dom::{async_append, async_replace, html, Error, RenderOptions, ServerRenderer, TemplateResult, Value};

use memory_dom_::{setup, setup_with};

#[test]
fn disconnected_values_are_held_back() {
	let mut pool = LocalPool::new();
	let (dom, container, mut renderer) = setup_with(RenderOptions::new().with_spawner(pool.spawner()));
	let (sender, receiver) = mpsc::unbounded::<&'static str>();

	let root = renderer.render(html!(["<p>", "</p>"], async_replace(receiver)), &container).unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "");

	sender.unbounded_send("1").unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "1");

	root.set_connected(false);
	sender.unbounded_send("2").unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "1");

	root.set_connected(true);
	assert_eq!(dom.text_content(container), "2");

	sender.unbounded_send("3").unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "3");
}

#[test]
fn only_the_latest_held_back_value_is_committed() {
	let mut pool = LocalPool::new();
	let (dom, container, mut renderer) = setup_with(RenderOptions::new().with_spawner(pool.spawner()));
	let (sender, receiver) = mpsc::unbounded::<&'static str>();

	let root = renderer.render(async_replace(receiver), &container).unwrap();
	root.set_connected(false);
	for value in ["a", "b", "c"] {
		sender.unbounded_send(value).unwrap();
	}
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "");

	let before = dom.mutation_count();
	root.set_connected(true);
	assert_eq!(dom.text_content(container), "c");
	assert_eq!(dom.mutation_count(), before + 1);
}

#[test]
fn append_keeps_every_value() {
	let mut pool = LocalPool::new();
	let (dom, container, mut renderer) = setup_with(RenderOptions::new().with_spawner(pool.spawner()));
	let (sender, receiver) = mpsc::unbounded::<TemplateResult>();

	let root = renderer.render(async_append(receiver), &container).unwrap();
	sender.unbounded_send(html!(["<i>", "</i>"], "a")).unwrap();
	sender.unbounded_send(html!(["<i>", "</i>"], "b")).unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "ab");

	root.set_connected(false);
	sender.unbounded_send(html!(["<i>", "</i>"], "c")).unwrap();
	sender.unbounded_send(html!(["<i>", "</i>"], "d")).unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "ab");

	root.set_connected(true);
	assert_eq!(dom.text_content(container), "abcd");
}

#[test]
fn same_source_keeps_its_subscription() {
	let mut pool = LocalPool::new();
	let (dom, container, mut renderer) = setup_with(RenderOptions::new().with_spawner(pool.spawner()));
	let (sender, receiver) = mpsc::unbounded::<u32>();
	let source = async_replace(receiver);

	renderer.render(source.clone(), &container).unwrap();
	renderer.render(source, &container).unwrap();

	sender.unbounded_send(7).unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "7");
}

#[test]
fn replacing_the_value_ends_the_subscription() {
	let mut pool = LocalPool::new();
	let (dom, container, mut renderer) = setup_with(RenderOptions::new().with_spawner(pool.spawner()));
	let (sender, receiver) = mpsc::unbounded::<&'static str>();

	renderer.render(async_replace(receiver), &container).unwrap();
	renderer.render("static", &container).unwrap();

	// Sending may already fail here, since the subscription was aborted.
	let _ = sender.unbounded_send("late");
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "static");
	assert!(sender.is_closed());
}

#[test]
fn no_spawner() {
	let (_dom, container, mut renderer) = setup();
	let (_sender, receiver) = mpsc::unbounded::<&'static str>();

	let error = renderer.render(async_replace(receiver), &container).unwrap_err();
	assert!(matches!(error, Error::NoSpawner));
}

#[test]
fn hydration_subscribes() {
	let view = |value: Value| html!(["<p>", "</p>"], value);
	let (_, receiver) = mpsc::unbounded::<&'static str>();
	let html = ServerRenderer::new().render_to_string(&view(async_replace(receiver)).into()).unwrap();

	let mut pool = LocalPool::new();
	let (dom, container, mut renderer) = setup_with(RenderOptions::new().with_spawner(pool.spawner()));
	dom.set_inner_html(container, &html);

	let (sender, receiver) = mpsc::unbounded::<&'static str>();
	renderer.hydrate(view(async_replace(receiver)), &container).unwrap();
	assert_eq!(dom.mutation_count(), 0);

	sender.unbounded_send("live").unwrap();
	pool.run_until_stalled();
	assert_eq!(dom.text_content(container), "live");
}
