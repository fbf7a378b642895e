/*!
# Rip Stream: Delivery

This is the bridge between the session's callback thread and the sequential
driver. Frames are written to the active sink as they arrive; the end of the
track (or a failure, or an abort) hands the sink back to the driver through a
single-slot signal.
*/

use crate::{
	AudioFormat,
	CompletionSignal,
	ConnectionState,
	KillSwitch,
	RipStreamError,
	SessionEvents,
	Sink,
};
use fyi_msg::{
	Msg,
	Progless,
};
use std::{
	sync::{
		atomic::{
			AtomicU64,
			Ordering::{
				Acquire,
				Relaxed,
				Release,
			},
		},
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
/// # Track End.
///
/// How a track's delivery wrapped up. Every variant but `Stalled` returns the
/// sink so the driver can close it.
pub(crate) enum TrackEnd {
	/// # End of Track.
	Finished(Sink),

	/// # Sink Error.
	Failed(Sink, RipStreamError),

	/// # Run Aborted.
	Aborted(Sink, RipStreamError),

	/// # Nothing Arrived in Time.
	Stalled(Duration),
}



#[derive(Debug)]
/// # Delivery.
///
/// One of these is shared between the driver and the session for the
/// duration of the run. Only one track is ever active at a time.
pub struct Delivery {
	/// # Kill Switch.
	killed: KillSwitch,

	/// # Abort Reason.
	reason: Mutex<Option<RipStreamError>>,

	/// # Active Sink.
	///
	/// This is only `Some` while a track is ripping.
	active: Mutex<Option<Sink>>,

	/// # Completion Signal.
	signal: CompletionSignal<TrackEnd>,

	/// # Connection State.
	connection: Mutex<ConnectionState>,

	/// # Connection Wakeup.
	connection_cond: Condvar,

	/// # Frames Delivered (Current Track).
	frames: AtomicU64,

	/// # Bytes Delivered (Current Track).
	bytes: AtomicU64,

	/// # Progress Bar.
	progress: Option<Progless>,
}

impl Delivery {
	#[must_use]
	/// # New.
	pub fn new(killed: KillSwitch) -> Self {
		Self {
			killed,
			reason: Mutex::new(None),
			active: Mutex::new(None),
			signal: CompletionSignal::default(),
			connection: Mutex::new(ConnectionState::LoggedOut),
			connection_cond: Condvar::new(),
			frames: AtomicU64::new(0),
			bytes: AtomicU64::new(0),
			progress: None,
		}
	}

	#[must_use]
	/// # With Progress Bar.
	pub fn with_progress(self, progress: Progless) -> Self {
		Self {
			progress: Some(progress),
			..self
		}
	}
}

/// # Getters.
impl Delivery {
	#[must_use]
	/// # Kill Switch.
	pub const fn killswitch(&self) -> &KillSwitch { &self.killed }

	#[must_use]
	/// # Killed?
	pub fn killed(&self) -> bool { self.killed.killed() }

	#[must_use]
	/// # Abort Reason.
	pub fn abort_reason(&self) -> Option<RipStreamError> {
		lock(&self.reason).clone()
	}

	#[must_use]
	/// # Frames Delivered.
	///
	/// This is reset at the start of each track.
	pub fn frames(&self) -> u64 { self.frames.load(Acquire) }

	#[must_use]
	/// # Bytes Delivered.
	///
	/// This is reset at the start of each track.
	pub fn bytes(&self) -> u64 { self.bytes.load(Acquire) }

	#[must_use]
	/// # Connection State.
	pub fn connection(&self) -> ConnectionState { lock(&self.connection).clone() }

	#[must_use]
	/// # Progress Bar.
	pub(crate) const fn progress(&self) -> Option<&Progless> { self.progress.as_ref() }
}

impl Delivery {
	/// # Abort.
	///
	/// Flip the kill switch and, if a track is mid-rip, hand its sink back to
	/// the driver so it can clean up. Only the first reason sticks.
	pub fn abort(&self, reason: RipStreamError) {
		if self.killed.kill() {
			lock(&self.reason).replace(reason.clone());
		}

		// Pull the sink while holding the lock so the hand-off can't race
		// with the driver.
		let mut active = lock(&self.active);
		if let Some(sink) = active.take() {
			let _res = self.signal.set(TrackEnd::Aborted(sink, reason));
		}
		drop(active);

		// Wake anybody waiting on the connection too.
		self.connection_cond.notify_all();
	}

	/// # Arm.
	///
	/// Install the sink for a new track, clearing any leftovers from the last
	/// one.
	pub(crate) fn arm(&self, sink: Sink) {
		let mut active = lock(&self.active);
		self.signal.clear();
		self.frames.store(0, Release);
		self.bytes.store(0, Release);
		active.replace(sink);
	}

	/// # Disarm.
	///
	/// Take the sink back, whether it is still active or was already handed
	/// off through the signal. Either way, nothing is left pending.
	pub(crate) fn disarm(&self) -> Option<Sink> {
		let mut active = lock(&self.active);
		active.take().or_else(|| match self.signal.take()? {
			TrackEnd::Finished(s) | TrackEnd::Failed(s, _) | TrackEnd::Aborted(s, _) => Some(s),
			TrackEnd::Stalled(_) => None,
		})
	}

	/// # Wait for the Track to End.
	///
	/// If `stall` is provided and no new frames arrive within that window,
	/// `TrackEnd::Stalled` is returned. The sink remains armed in that case.
	pub(crate) fn wait(&self, stall: Option<Duration>) -> TrackEnd {
		let mut last = self.frames();
		loop {
			if let Some(end) = self.signal.wait(stall) { return end; }
			let now = self.frames();
			if now == last {
				return TrackEnd::Stalled(stall.unwrap_or_default());
			}
			last = now;
		}
	}

	/// # Reset Connection.
	///
	/// Forget any previous login outcome before starting a new one.
	pub(crate) fn reset_connection(&self) {
		*lock(&self.connection) = ConnectionState::LoggedOut;
	}

	/// # Wait for Login.
	///
	/// ## Errors
	///
	/// Returns an error if the login fails, times out, or the run is aborted
	/// in the meantime.
	pub(crate) fn wait_login(&self, timeout: Duration) -> Result<(), RipStreamError> {
		let state = self.wait_connection(timeout, |s| ! matches!(s, ConnectionState::LoggedOut));
		match state {
			Some(ConnectionState::LoggedIn) => Ok(()),
			Some(ConnectionState::Failed(e)) => Err(RipStreamError::Login(e)),
			_ =>
				if self.killed() { Err(RipStreamError::Killed) }
				else { Err(RipStreamError::Login("timed out".to_owned())) },
		}
	}

	/// # Wait for Logout.
	///
	/// Unlike login, this ignores the kill switch; aborted runs should still
	/// log out.
	///
	/// ## Errors
	///
	/// Returns an error if the session doesn't confirm in time.
	pub(crate) fn wait_logout(&self, timeout: Duration) -> Result<(), RipStreamError> {
		let deadline = Instant::now() + timeout;
		let mut state = lock(&self.connection);
		while *state != ConnectionState::LoggedOut {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() { return Err(RipStreamError::Logout); }
			state = self.connection_cond.wait_timeout(state, remaining)
				.unwrap_or_else(PoisonError::into_inner)
				.0;
		}
		Ok(())
	}

	/// # Wait for Connection State.
	///
	/// Returns the state once `cb` is satisfied, or `None` if the run is
	/// killed or the time runs out.
	fn wait_connection<F>(&self, timeout: Duration, cb: F) -> Option<ConnectionState>
	where F: Fn(&ConnectionState) -> bool {
		let deadline = Instant::now() + timeout;
		let mut state = lock(&self.connection);
		loop {
			if cb(&state) { return Some(state.clone()); }
			if self.killed() { return None; }

			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() { return None; }
			state = self.connection_cond.wait_timeout(state, remaining)
				.unwrap_or_else(PoisonError::into_inner)
				.0;
		}
	}
}

impl SessionEvents for Delivery {
	fn connection_state_changed(&self, state: ConnectionState) {
		*lock(&self.connection) = state;
		self.connection_cond.notify_all();
	}

	fn frame_delivered(&self, format: AudioFormat, frames: &[u8], num_frames: usize) -> usize {
		let mut active = lock(&self.active);
		let Some(sink) = active.as_mut() else { return num_frames; };

		// Everything downstream assumes CD-quality stereo.
		let res =
			if format == AudioFormat::default() { sink.write(frames) }
			else {
				Err(RipStreamError::Session(format!(
					"unsupported audio format ({} Hz, {} channel(s))",
					format.sample_rate,
					format.channels,
				)))
			};

		match res {
			Ok(()) => {
				self.frames.fetch_add(num_frames as u64, Relaxed);
				self.bytes.fetch_add(frames.len() as u64, Release);
				if let Some(p) = self.progress.as_ref() {
					p.increment_n(u32::try_from(num_frames).unwrap_or(u32::MAX));
				}
			},
			Err(e) => if let Some(sink) = active.take() {
				let _res = self.signal.set(TrackEnd::Failed(sink, e));
			},
		}

		num_frames
	}

	fn end_of_track(&self) {
		let mut active = lock(&self.active);
		if let Some(sink) = active.take() {
			let _res = self.signal.set(TrackEnd::Finished(sink));
		}
	}

	fn play_token_lost(&self) {
		Msg::error("Play token lost, aborting…").eprint();
		self.abort(RipStreamError::PlayTokenLost);
	}
}



/// # Lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
