//! Keyed lists: the `repeat` directive and its reconciliation.

use crate::{
	child::ChildPart,
	dom::{move_range, Dom},
	error::Error,
	render::Context,
	value::{Key, Value},
};
use hashbrown::{HashMap, HashSet};
use tracing::{trace, warn};

/// One item of a keyed list.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedItem {
	pub key: Key,
	pub value: Value,
}

/// Renders `items` as a list whose item DOM follows the items by key when they are reordered, inserted or removed.
///
/// Keys should be unique. For a duplicate key, only the first item with it is rendered and a warning is logged.
///
/// ```
/// use lit_dom::{html, repeat};
///
/// let rows = vec![(1, "one"), (2, "two")];
/// let list = repeat(rows, |(id, _)| *id, |(_, label), _| html!(["<li>", "</li>"], *label).into());
/// ```
pub fn repeat<T, K: Into<Key>>(items: impl IntoIterator<Item = T>, key_fn: impl Fn(&T) -> K, template: impl Fn(&T, usize) -> Value) -> Value {
	Value::Keyed(
		items
			.into_iter()
			.enumerate()
			.map(|(index, item)| KeyedItem {
				key: key_fn(&item).into(),
				value: template(&item, index),
			})
			.collect(),
	)
}

/// Drops items whose key was already seen, with one warning each.
pub(crate) fn dedupe(items: Vec<KeyedItem>) -> Vec<KeyedItem> {
	let mut seen = HashSet::with_capacity(items.len());
	items
		.into_iter()
		.filter(|item| {
			let first = seen.insert(item.key.clone());
			if !first {
				if cfg!(feature = "dangerous-logging") {
					warn!("Duplicate key {} in keyed list. Only the first item with it is rendered.", item.key);
				} else {
					warn!("Duplicate key in keyed list. Only the first item with each key is rendered.");
				}
			}
			first
		})
		.collect()
}

/// An item part of a keyed list.
pub(crate) struct KeyedPart<D: Dom> {
	pub(crate) key: Key,
	pub(crate) part: ChildPart<D>,
}

fn start_of<D: Dom>(part: Option<&Option<KeyedPart<D>>>) -> Option<D::Node> {
	part.and_then(Option::as_ref).map(|keyed| keyed.part.start().clone())
}

fn move_before<D: Dom>(cx: &Context<D>, container: &ChildPart<D>, keyed: &KeyedPart<D>, before: Option<D::Node>) {
	let dom = cx.dom();
	let (parent, end) = match (container.parent(dom), keyed.part.end()) {
		(Some(parent), Some(end)) => (parent, end.clone()),
		_ => return,
	};
	move_range(dom, &parent, keyed.part.start(), &end, before.as_ref().or_else(|| container.end()));
}

/// Reconciles `old` item parts with (deduplicated) `items`, reusing parts by key.
///
/// Matching heads and tails are updated in place, heads and tails that swapped ends are moved once,
/// and for anything else an old key index decides between moving an existing part and creating a new one.
/// Parts for keys that aren't in `items` anymore are removed.
pub(crate) fn reconcile<D: Dom>(cx: &Context<D>, container: &ChildPart<D>, old: Vec<KeyedPart<D>>, items: Vec<KeyedItem>) -> Result<Vec<KeyedPart<D>>, Error> {
	let dom = cx.dom();
	let old_keys: Vec<Key> = old.iter().map(|keyed| keyed.key.clone()).collect();
	let mut old_parts: Vec<Option<KeyedPart<D>>> = old.into_iter().map(Some).collect();
	let (new_keys, mut new_values): (Vec<Key>, Vec<Option<Value>>) = items.into_iter().map(|item| (item.key, Some(item.value))).unzip();
	let mut new_parts: Vec<Option<KeyedPart<D>>> = new_keys.iter().map(|_| None).collect();

	let mut new_key_index: Option<HashSet<Key>> = None;
	let mut old_key_index: Option<HashMap<Key, usize>> = None;

	// Half-open windows: `old_head..old_end` and `new_head..new_end` are still unprocessed.
	let (mut old_head, mut old_end) = (0, old_parts.len());
	let (mut new_head, mut new_end) = (0, new_parts.len());

	let update = |keyed: KeyedPart<D>, index: usize, new_values: &mut Vec<Option<Value>>| -> Result<KeyedPart<D>, Error> {
		let mut keyed = keyed;
		keyed.part.set_value(cx, new_values[index].take().unwrap_or(Value::NoChange))?;
		Ok(keyed)
	};

	while old_head < old_end && new_head < new_end {
		if old_parts[old_head].is_none() {
			old_head += 1;
		} else if old_parts[old_end - 1].is_none() {
			old_end -= 1;
		} else if old_keys[old_head] == new_keys[new_head] {
			if let Some(keyed) = old_parts[old_head].take() {
				new_parts[new_head] = Some(update(keyed, new_head, &mut new_values)?);
			}
			old_head += 1;
			new_head += 1;
		} else if old_keys[old_end - 1] == new_keys[new_end - 1] {
			if let Some(keyed) = old_parts[old_end - 1].take() {
				new_parts[new_end - 1] = Some(update(keyed, new_end - 1, &mut new_values)?);
			}
			old_end -= 1;
			new_end -= 1;
		} else if old_keys[old_head] == new_keys[new_end - 1] {
			// Old head moves to the new tail.
			if let Some(keyed) = old_parts[old_head].take() {
				let keyed = update(keyed, new_end - 1, &mut new_values)?;
				move_before(cx, container, &keyed, start_of(new_parts.get(new_end)));
				new_parts[new_end - 1] = Some(keyed);
			}
			old_head += 1;
			new_end -= 1;
		} else if old_keys[old_end - 1] == new_keys[new_head] {
			// Old tail moves to the new head.
			if let Some(keyed) = old_parts[old_end - 1].take() {
				let keyed = update(keyed, new_head, &mut new_values)?;
				move_before(cx, container, &keyed, start_of(old_parts.get(old_head)));
				new_parts[new_head] = Some(keyed);
			}
			old_end -= 1;
			new_head += 1;
		} else {
			let new_keys_present = new_key_index.get_or_insert_with(|| new_keys[new_head..new_end].iter().cloned().collect());
			if !new_keys_present.contains(&old_keys[old_head]) {
				if let Some(stale) = old_parts[old_head].take() {
					stale.part.dispose(dom);
				}
				old_head += 1;
			} else if !new_keys_present.contains(&old_keys[old_end - 1]) {
				if let Some(stale) = old_parts[old_end - 1].take() {
					stale.part.dispose(dom);
				}
				old_end -= 1;
			} else {
				let old_index = old_key_index
					.get_or_insert_with(|| old_keys[old_head..old_end].iter().cloned().enumerate().map(|(i, key)| (key, old_head + i)).collect())
					.get(&new_keys[new_head])
					.copied();
				let before = start_of(old_parts.get(old_head));
				let keyed = match old_index.and_then(|index| old_parts[index].take()) {
					Some(keyed) => {
						let keyed = update(keyed, new_head, &mut new_values)?;
						move_before(cx, container, &keyed, before);
						keyed
					}
					None => {
						let part = container.insert_item(dom, before.as_ref());
						update(
							KeyedPart {
								key: new_keys[new_head].clone(),
								part,
							},
							new_head,
							&mut new_values,
						)?
					}
				};
				new_parts[new_head] = Some(keyed);
				new_head += 1;
			}
		}
	}

	// Remaining new items are inserted before the first part of the processed tail.
	while new_head < new_end {
		let before = start_of(new_parts.get(new_end));
		let part = container.insert_item(dom, before.as_ref());
		let keyed = update(
			KeyedPart {
				key: new_keys[new_head].clone(),
				part,
			},
			new_head,
			&mut new_values,
		)?;
		new_parts[new_head] = Some(keyed);
		new_head += 1;
	}

	for stale in old_parts[old_head..old_end].iter_mut().filter_map(Option::take) {
		stale.part.dispose(dom);
	}

	let parts: Vec<KeyedPart<D>> = new_parts.into_iter().flatten().collect();
	trace!("Reconciled into {} keyed part(s).", parts.len());
	Ok(parts)
}
