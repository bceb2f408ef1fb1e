use lit_dom::{memory::NodeId, Dom, MemoryDom};

fn forward(dom: &MemoryDom, parent: NodeId) -> Vec<NodeId> {
	let mut nodes = Vec::new();
	let mut next = dom.first_child(&parent);
	while let Some(node) = next {
		next = dom.next_sibling(&node);
		nodes.push(node);
	}
	nodes
}

fn backward(dom: &MemoryDom, parent: NodeId) -> Vec<NodeId> {
	let mut nodes = Vec::new();
	let mut previous = dom.child_nodes(parent).last().copied();
	while let Some(node) = previous {
		previous = dom.previous_sibling(&node);
		nodes.push(node);
	}
	nodes
}

#[test]
fn siblings_follow_moves() {
	let dom = MemoryDom::new();
	let parent = dom.create_element("ul");
	let [a, b, c] = ["a", "b", "c"].map(|text| dom.create_text(text));
	for node in [a, b, c] {
		dom.insert_before(&parent, &node, None);
	}

	dom.insert_before(&parent, &c, Some(&a));
	assert_eq!(forward(&dom, parent), vec![c, a, b]);
	assert_eq!(backward(&dom, parent), vec![b, a, c]);

	dom.remove(&a);
	assert_eq!(forward(&dom, parent), vec![c, b]);
	assert_eq!(dom.previous_sibling(&b), Some(c));
	assert_eq!((dom.parent(&a), dom.next_sibling(&a), dom.previous_sibling(&a)), (None, None, None));
}

#[test]
fn fragments_are_emptied_into_place() {
	let dom = MemoryDom::new();
	let parent = dom.create_element("div");
	let (first, last) = (dom.create_comment("first"), dom.create_comment("last"));
	dom.insert_before(&parent, &first, None);
	dom.insert_before(&parent, &last, None);

	let fragment = dom.parse_fragment("<b>1</b>2<i>3</i>");
	let moved = dom.child_nodes(fragment);
	dom.insert_before(&parent, &fragment, Some(&last));

	assert!(dom.child_nodes(fragment).is_empty());
	let mut expected = vec![first];
	expected.extend(&moved);
	expected.push(last);
	assert_eq!(forward(&dom, parent), expected);
	assert_eq!(backward(&dom, parent), expected.into_iter().rev().collect::<Vec<_>>());
	assert_eq!(dom.inner_html(parent), "<!--first--><b>1</b>2<i>3</i><!--last-->");
}

#[test]
fn foreign_reference_appends() {
	let dom = MemoryDom::new();
	let (parent, other) = (dom.create_element("div"), dom.create_element("div"));
	let stranger = dom.create_text("elsewhere");
	dom.insert_before(&other, &stranger, None);

	let node = dom.create_text("here");
	dom.insert_before(&parent, &node, Some(&stranger));
	assert_eq!(forward(&dom, parent), vec![node]);
	assert_eq!(forward(&dom, other), vec![stranger]);
}
