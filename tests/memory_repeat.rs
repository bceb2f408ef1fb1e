use lit_dom::{html, repeat, Value};

use memory_dom_::{count_warnings, elements, setup};

fn list(keys: &[u32]) -> Value {
	repeat(keys.to_vec(), |key| *key, |key, _| html!(["<li>", "</li>"], *key).into())
}

#[test]
fn reorder_keeps_nodes() {
	let (dom, container, mut renderer) = setup();

	renderer.render(list(&[1, 2, 3]), &container).unwrap();
	let lis = elements(&dom, container);
	assert_eq!(dom.text_content(container), "123");

	renderer.render(list(&[3, 1, 2]), &container).unwrap();
	assert_eq!(dom.text_content(container), "312");
	assert_eq!(elements(&dom, container), vec![lis[2], lis[0], lis[1]]);

	renderer.render(list(&[2, 1, 3]), &container).unwrap();
	assert_eq!(dom.text_content(container), "213");
	assert_eq!(elements(&dom, container), vec![lis[1], lis[0], lis[2]]);
}

#[test]
fn insert_and_remove() {
	let (dom, container, mut renderer) = setup();

	renderer.render(list(&[1, 2, 3, 4]), &container).unwrap();
	let lis = elements(&dom, container);

	renderer.render(list(&[1, 5, 3]), &container).unwrap();
	assert_eq!(dom.text_content(container), "153");
	let after = elements(&dom, container);
	assert_eq!(after[0], lis[0]);
	assert!(!lis.contains(&after[1]));
	assert_eq!(after[2], lis[2]);

	renderer.render(list(&[6, 1, 5, 3, 7]), &container).unwrap();
	assert_eq!(dom.text_content(container), "61537");
	assert_eq!(elements(&dom, container)[1..4].to_vec(), after);

	renderer.render(list(&[]), &container).unwrap();
	assert_eq!(dom.text_content(container), "");
	assert!(elements(&dom, container).is_empty());
}

#[test]
fn reverse() {
	let (dom, container, mut renderer) = setup();

	renderer.render(list(&[1, 2, 3, 4, 5]), &container).unwrap();
	let mut lis = elements(&dom, container);

	renderer.render(list(&[5, 4, 3, 2, 1]), &container).unwrap();
	lis.reverse();
	assert_eq!(elements(&dom, container), lis);
	assert_eq!(dom.text_content(container), "54321");
}

#[test]
fn items_update_in_place() {
	let (dom, container, mut renderer) = setup();
	let labelled = |items: &[(u32, &'static str)]| repeat(items.to_vec(), |(key, _)| *key, |(_, label), _| html!(["<li>", "</li>"], *label).into());

	renderer.render(labelled(&[(1, "a"), (2, "b")]), &container).unwrap();
	let lis = elements(&dom, container);

	renderer.render(labelled(&[(2, "B"), (1, "a")]), &container).unwrap();
	assert_eq!(dom.text_content(container), "Ba");
	assert_eq!(elements(&dom, container), vec![lis[1], lis[0]]);
}

#[test]
fn duplicate_keys_render_once_and_warn_once() {
	let (dom, container, mut renderer) = setup();

	let (result, warnings) = count_warnings(|| renderer.render(list(&[42, 42]), &container));
	result.unwrap();

	assert_eq!(elements(&dom, container).len(), 1);
	assert_eq!(dom.text_content(container), "42");
	assert_eq!(warnings, 1);
}

#[test]
fn switching_from_positional_list() {
	let (dom, container, mut renderer) = setup();

	renderer.render(vec!["a", "b"], &container).unwrap();
	renderer.render(list(&[1, 2]), &container).unwrap();

	assert_eq!(dom.text_content(container), "12");
	assert_eq!(elements(&dom, container).len(), 2);
}

#[test]
fn long_list_reversal() {
	let (dom, container, mut renderer) = setup();
	let keys: Vec<u32> = (0..2000).collect();

	renderer.render(list(&keys), &container).unwrap();
	let lis = elements(&dom, container);

	let reversed: Vec<u32> = keys.iter().rev().copied().collect();
	renderer.render(list(&reversed), &container).unwrap();
	assert_eq!(elements(&dom, container), lis.iter().rev().copied().collect::<Vec<_>>());
}
