//! Single-occupancy slot for cancellable attempts.
//!
//! Spawning into a slot first aborts the previous task and waits until it
//! has been torn down, so every future, timer, and transport handle it owned
//! is dropped before the successor starts.

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct AttemptSlot {
	current: Option<JoinHandle<()>>,
	generation: u64,
}

impl AttemptSlot {
	pub fn new() -> Self {
		Self {
			current: None,
			generation: 0,
		}
	}

	/// Whether an attempt is still running.
	pub fn is_active(&self) -> bool {
		self.current.as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Number of attempts spawned so far.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Aborts the running attempt, if any, and waits for its teardown.
	pub async fn dispose(&mut self) {
		let Some(task) = self.current.take() else {
			return;
		};
		if !task.is_finished() {
			debug!(target = "hwpair.attempt", generation = self.generation, "disposing in-flight attempt");
		}
		task.abort();
		let _ = task.await;
	}

	/// Disposes the predecessor, then runs `attempt` as the new occupant.
	pub async fn spawn<F, T>(&mut self, attempt: F) -> AttemptHandle<T>
	where
		F: Future<Output = T> + Send + 'static,
		T: Send + 'static,
	{
		self.dispose().await;

		let (tx, rx) = oneshot::channel();
		self.generation += 1;
		self.current = Some(tokio::spawn(async move {
			let _ = tx.send(attempt.await);
		}));

		AttemptHandle {
			generation: self.generation,
			outcome: rx,
		}
	}
}

impl Default for AttemptSlot {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for AttemptSlot {
	fn drop(&mut self) {
		if let Some(task) = self.current.take() {
			task.abort();
		}
	}
}

/// Receives the result of one spawned attempt.
pub struct AttemptHandle<T> {
	generation: u64,
	outcome: oneshot::Receiver<T>,
}

impl<T> AttemptHandle<T> {
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Waits for the attempt. `None` when it was disposed before finishing.
	pub async fn outcome(self) -> Option<T> {
		self.outcome.await.ok()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use super::*;

	struct Held(Arc<AtomicUsize>);

	impl Held {
		fn acquire(count: &Arc<AtomicUsize>) -> Self {
			count.fetch_add(1, Ordering::SeqCst);
			Self(Arc::clone(count))
		}
	}

	impl Drop for Held {
		fn drop(&mut self) {
			self.0.fetch_sub(1, Ordering::SeqCst);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn spawning_tears_down_predecessor_first() {
		let held = Arc::new(AtomicUsize::new(0));
		let mut slot = AttemptSlot::new();

		let first = slot
			.spawn({
				let held = Arc::clone(&held);
				async move {
					let _resource = Held::acquire(&held);
					std::future::pending::<()>().await;
				}
			})
			.await;
		tokio::time::sleep(Duration::from_millis(1)).await;
		assert_eq!(held.load(Ordering::SeqCst), 1);

		let observed = Arc::new(AtomicUsize::new(usize::MAX));
		let second = slot
			.spawn({
				let held = Arc::clone(&held);
				let observed = Arc::clone(&observed);
				async move {
					observed.store(held.load(Ordering::SeqCst), Ordering::SeqCst);
					7
				}
			})
			.await;

		assert_eq!(first.outcome().await, None);
		assert_eq!(second.generation(), 2);
		assert_eq!(second.outcome().await, Some(7));
		assert_eq!(observed.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn dispose_on_empty_slot_is_noop() {
		let mut slot = AttemptSlot::new();
		slot.dispose().await;
		assert!(!slot.is_active());
		assert_eq!(slot.generation(), 0);
	}
}
