/*!
# Rip Stream: Completion Signal
*/

use std::{
	sync::{
		Condvar,
		Mutex,
		MutexGuard,
		PoisonError,
	},
	time::{
		Duration,
		Instant,
	},
};



#[derive(Debug)]
/// # Completion Signal.
///
/// A single-slot event carrying a value from the callback thread to the
/// driver. At most one value can be pending; waiting takes it, resetting the
/// slot for the next round.
pub(crate) struct CompletionSignal<T> {
	/// # Slot.
	slot: Mutex<Option<T>>,

	/// # Wakeup.
	cond: Condvar,
}

impl<T> Default for CompletionSignal<T> {
	fn default() -> Self {
		Self {
			slot: Mutex::new(None),
			cond: Condvar::new(),
		}
	}
}

impl<T> CompletionSignal<T> {
	/// # Set.
	///
	/// If a value is already pending, the new one is handed back.
	pub(crate) fn set(&self, val: T) -> Result<(), T> {
		let mut slot = self.lock();
		if slot.is_some() { return Err(val); }
		slot.replace(val);
		drop(slot);
		self.cond.notify_all();
		Ok(())
	}

	/// # Take.
	///
	/// Remove and return the pending value, if any, without waiting.
	pub(crate) fn take(&self) -> Option<T> { self.lock().take() }

	/// # Clear.
	pub(crate) fn clear(&self) { drop(self.take()); }

	#[cfg(test)]
	/// # Pending?
	pub(crate) fn is_set(&self) -> bool { self.lock().is_some() }

	/// # Wait.
	///
	/// Block until a value is set, then take it. If `timeout` is provided and
	/// elapses first, `None` is returned.
	pub(crate) fn wait(&self, timeout: Option<Duration>) -> Option<T> {
		let mut slot = self.lock();
		match timeout {
			Some(timeout) => {
				let deadline = Instant::now() + timeout;
				while slot.is_none() {
					let remaining = deadline.saturating_duration_since(Instant::now());
					if remaining.is_zero() { return None; }
					slot = self.cond.wait_timeout(slot, remaining)
						.unwrap_or_else(PoisonError::into_inner)
						.0;
				}
			},
			None => while slot.is_none() {
				slot = self.cond.wait(slot).unwrap_or_else(PoisonError::into_inner);
			},
		}

		slot.take()
	}

	/// # Lock.
	fn lock(&self) -> MutexGuard<'_, Option<T>> {
		self.slot.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
