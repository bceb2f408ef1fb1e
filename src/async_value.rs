//! Asynchronous values: `async_replace` and `async_append`.
//!
//! Both are directives. A subscription is a task on the [`LocalSpawn`](`futures::task::LocalSpawn`) of the render options,
//! committing each value the stream yields into the part it was rendered to.
//! While that part is disconnected, values are held back instead, and the latest is committed once on reconnection.

use crate::{
	directive::{directive, Directive, DirectiveHandle, PartInfo},
	error::Error,
	value::Value,
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use futures::{
	future::{AbortHandle, Abortable},
	stream::{LocalBoxStream, Stream, StreamExt},
	task::LocalSpawnExt,
};
use std::rc::Rc;
use tracing::{instrument, trace, warn};

/// How the values of an [`AsyncValue`] are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncMode {
	/// Each value replaces the previous one.
	Replace,
	/// Each value is appended after the previous ones.
	Append,
}

/// A stream of values rendered into a child part.
///
/// Clones share the stream. Rendering the same (or a cloned) value again into the same part keeps the subscription.
/// The stream can be subscribed to only once.
#[derive(Clone)]
pub struct AsyncValue {
	stream: Rc<RefCell<Option<LocalBoxStream<'static, Value>>>>,
	mode: AsyncMode,
}

impl AsyncValue {
	pub fn new<S>(stream: S, mode: AsyncMode) -> Self
	where
		S: Stream + 'static,
		S::Item: Into<Value>,
	{
		Self {
			stream: Rc::new(RefCell::new(Some(stream.map(Into::<Value>::into).boxed_local()))),
			mode,
		}
	}

	#[must_use]
	pub fn mode(&self) -> AsyncMode {
		self.mode
	}

	pub(crate) fn same_source(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.stream, &other.stream)
	}

	pub(crate) fn take_stream(&self) -> Option<LocalBoxStream<'static, Value>> {
		self.stream.borrow_mut().take()
	}

	pub(crate) fn into_directive(self) -> Value {
		directive::<AsyncDirective>(self)
	}
}

impl Debug for AsyncValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("AsyncValue")
			.field("stream", &Rc::as_ptr(&self.stream))
			.field("mode", &self.mode)
			.field("subscribed", &self.stream.borrow().is_none())
			.finish()
	}
}

/// Renders the latest value of `stream`.
pub fn async_replace<S>(stream: S) -> Value
where
	S: Stream + 'static,
	S::Item: Into<Value>,
{
	AsyncValue::new(stream, AsyncMode::Replace).into()
}

/// Renders all values of `stream`, in order.
pub fn async_append<S>(stream: S) -> Value
where
	S: Stream + 'static,
	S::Item: Into<Value>,
{
	AsyncValue::new(stream, AsyncMode::Append).into()
}

/// Subscribes to the stream of an [`AsyncValue`] and commits what it yields through its [`DirectiveHandle`].
pub(crate) struct AsyncDirective {
	source: Option<AsyncValue>,
	abort: Option<AbortHandle>,
}

impl Directive for AsyncDirective {
	type Args = AsyncValue;

	fn new(_part: &PartInfo) -> Self {
		Self { source: None, abort: None }
	}

	/// There is nothing to show before the first value arrives.
	fn render(&mut self, _source: &AsyncValue) -> Value {
		Value::NoChange
	}

	#[instrument(skip(self, handle))]
	fn update(&mut self, source: AsyncValue, handle: &DirectiveHandle) -> Result<Value, Error> {
		if self.source.as_ref().map_or(false, |current| current.same_source(&source)) {
			return Ok(Value::NoChange);
		}
		if let Some(abort) = self.abort.take() {
			abort.abort();
		}
		let stream = match source.take_stream() {
			Some(stream) => stream,
			None => {
				warn!("Asynchronous value was already subscribed to elsewhere.");
				self.source = Some(source);
				return Ok(Value::Nothing);
			}
		};
		let spawner = handle.spawner().ok_or(Error::NoSpawner)?;

		let (abort, registration) = AbortHandle::new_pair();
		let task = Abortable::new(pump(handle.clone(), source.mode(), stream), registration);
		spawner.spawn_local(async move {
			if task.await.is_err() {
				trace!("Asynchronous value subscription aborted.");
			}
		})?;
		self.source = Some(source);
		self.abort = Some(abort);
		Ok(Value::NoChange)
	}
}

impl Drop for AsyncDirective {
	fn drop(&mut self) {
		if let Some(abort) = self.abort.take() {
			abort.abort();
		}
	}
}

async fn pump(handle: DirectiveHandle, mode: AsyncMode, mut stream: LocalBoxStream<'static, Value>) {
	while let Some(value) = stream.next().await {
		if !handle.is_live() {
			return;
		}
		match mode {
			AsyncMode::Replace => handle.set_value(value),
			AsyncMode::Append => handle.append(value),
		}
	}
	trace!("Asynchronous value exhausted.");
}
