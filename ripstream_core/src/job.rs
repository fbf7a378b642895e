/*!
# Rip Stream: Rip Job
*/

use crate::{
	Delivery,
	remove_partial,
	RipStreamError,
	Session,
	Sink,
	SinkKind,
	Track,
	delivery::TrackEnd,
};
use std::{
	path::{
		Path,
		PathBuf,
	},
	time::{
		Duration,
		Instant,
	},
};



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Track State.
///
/// Every rip runs `Idle → Preparing → Ripping → Finishing → Succeeded`,
/// bailing to `Failed` from any of the middle three.
pub enum TrackState {
	#[default]
	/// # Nothing Yet.
	Idle,

	/// # Opening the Sink.
	Preparing,

	/// # Receiving Frames.
	Ripping,

	/// # Closing the Sink.
	Finishing,

	/// # Done!
	Succeeded,

	/// # Failed or Aborted.
	Failed,
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track Outcome.
///
/// Every track handled by the run ends up as exactly one of these.
pub enum TrackOutcome {
	/// # Ripped.
	///
	/// The warning holds a non-zero encoder exit code, if any.
	Succeeded {
		/// # Encoder Exit Code.
		warning: Option<i32>,
	},

	/// # Already Exists.
	Skipped,

	/// # Failed.
	Failed(RipStreamError),

	/// # Failed and Took the Run With It.
	Aborted(RipStreamError),
}

impl TrackOutcome {
	#[must_use]
	/// # Is Success?
	pub const fn is_success(&self) -> bool { matches!(self, Self::Succeeded { .. }) }

	#[must_use]
	/// # Is Abort?
	pub const fn is_abort(&self) -> bool { matches!(self, Self::Aborted(_)) }
}



#[derive(Debug)]
/// # Rip Job.
///
/// This is the mutable state for the one track currently being ripped.
pub(crate) struct RipJob<'a> {
	/// # Track.
	track: &'a Track,

	/// # Destination.
	dst: PathBuf,

	/// # State.
	state: TrackState,

	/// # Start Time.
	start: Instant,
}

impl<'a> RipJob<'a> {
	/// # New.
	pub(crate) fn new(track: &'a Track, dst: PathBuf) -> Self {
		Self {
			track,
			dst,
			state: TrackState::Idle,
			start: Instant::now(),
		}
	}

	/// # Destination.
	pub(crate) fn dst(&self) -> &Path { &self.dst }

	/// # Elapsed.
	pub(crate) fn elapsed(&self) -> Duration { self.start.elapsed() }

	/// # State.
	pub(crate) const fn state(&self) -> TrackState { self.state }

	/// # Rip!
	///
	/// Open the sink, play the track, and wait for it to finish. Whatever
	/// happens, playback is stopped, the sink is closed, and failures leave no
	/// partial file behind.
	pub(crate) fn rip<S>(
		&mut self,
		session: &mut S,
		delivery: &Delivery,
		kind: &SinkKind,
		stall: Option<Duration>,
	) -> TrackOutcome
	where S: Session + ?Sized {
		self.start = Instant::now();

		// Preparing.
		self.state = TrackState::Preparing;
		if let Some(parent) = self.dst.parent() {
			if std::fs::create_dir_all(parent).is_err() {
				let err = RipStreamError::Dir(parent.to_string_lossy().into_owned());
				return self.fail(None, err, false);
			}
		}
		let sink = match Sink::open(kind, &self.dst) {
			Ok(s) => s,
			Err(e) => return self.fail(None, e, false),
		};

		// Let the callbacks have it.
		delivery.arm(sink);
		if delivery.killed() {
			let err = delivery.abort_reason().unwrap_or(RipStreamError::Killed);
			return self.fail(delivery.disarm(), err, true);
		}

		// Ripping.
		self.state = TrackState::Ripping;
		if let Err(e) = session.load(self.track).and_then(|()| session.play()) {
			session.stop();
			return self.fail(delivery.disarm(), e, false);
		}

		let end = delivery.wait(stall);
		session.stop();
		match end {
			TrackEnd::Finished(sink) => {
				self.state = TrackState::Finishing;
				match sink.close() {
					Ok(warning) => {
						self.state = TrackState::Succeeded;
						TrackOutcome::Succeeded { warning }
					},
					Err(e) => self.fail(None, e, false),
				}
			},
			TrackEnd::Failed(sink, e) => self.fail(Some(sink), e, false),
			TrackEnd::Aborted(sink, e) => self.fail(Some(sink), e, true),
			TrackEnd::Stalled(d) => {
				let err = RipStreamError::Stalled(d.as_secs());
				self.fail(delivery.disarm(), err, false)
			},
		}
	}

	/// # Fail.
	///
	/// Close the sink (if we still have it), remove the partial output, and
	/// return the appropriate outcome.
	fn fail(&mut self, sink: Option<Sink>, err: RipStreamError, abort: bool)
	-> TrackOutcome {
		if let Some(sink) = sink { let _res = sink.close(); }
		remove_partial(&self.dst);
		self.state = TrackState::Failed;

		if abort { TrackOutcome::Aborted(err) }
		else { TrackOutcome::Failed(err) }
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		AudioFormat,
		KillSwitch,
		Login,
		Playlist,
		Resolved,
		SessionEvents,
		User,
	};
	use std::{
		sync::Arc,
		thread::JoinHandle,
	};

	#[cfg(unix)] use crate::EncoderCommand;

	/// # Playback Script.
	#[derive(Clone, Copy)]
	enum Script {
		/// # Deliver N Chunks, Then End.
		Finish(u8),

		/// # Deliver N Chunks, Then Lose the Token.
		LoseToken(u8),

		/// # Deliver N Chunks, Then Nothing.
		Hang(u8),

		/// # Refuse to Load.
		NoLoad,
	}

	/// # One-Track Session.
	struct Player {
		events: Arc<Delivery>,
		script: Script,
		thread: Option<JoinHandle<()>>,
		stops: u8,
	}

	impl Player {
		fn new(events: Arc<Delivery>, script: Script) -> Self {
			Self { events, script, thread: None, stops: 0 }
		}
	}

	impl Session for Player {
		fn set_events(&mut self, _events: Arc<dyn SessionEvents>) {}
		fn login(&mut self, _login: &Login) -> Result<(), RipStreamError> { Ok(()) }
		fn logout(&mut self) {}
		fn user(&self) -> Option<User> { None }
		fn resolve(&mut self, uri: &str) -> Result<Resolved, RipStreamError> {
			Err(RipStreamError::Uri(uri.to_owned()))
		}
		fn load(&mut self, _track: &Track) -> Result<(), RipStreamError> {
			if matches!(self.script, Script::NoLoad) {
				Err(RipStreamError::Session("no load".to_owned()))
			}
			else { Ok(()) }
		}
		fn play(&mut self) -> Result<(), RipStreamError> {
			let events = Arc::clone(&self.events);
			let script = self.script;
			self.thread.replace(std::thread::spawn(move || {
				let (chunks, end) = match script {
					Script::Finish(n) => (n, 1),
					Script::LoseToken(n) => (n, 2),
					Script::Hang(n) => (n, 0),
					Script::NoLoad => (0, 0),
				};
				for i in 0..chunks {
					events.frame_delivered(AudioFormat::default(), &[i; 400], 100);
				}
				match end {
					1 => events.end_of_track(),
					2 => events.play_token_lost(),
					_ => {},
				}
			}));
			Ok(())
		}
		fn stop(&mut self) {
			self.stops += 1;
			if let Some(t) = self.thread.take() { t.join().expect("Player panicked."); }
		}
		fn remove_tracks(&mut self, _playlist: &Playlist, _positions: &[usize])
		-> Result<(), RipStreamError> { Ok(()) }
		fn has_pending_changes(&mut self, _playlist: &Playlist) -> bool { false }
	}

	fn run(script: Script, dst: PathBuf) -> (TrackOutcome, TrackState, u8) {
		run_with(script, dst, &SinkKind::Raw, Duration::from_millis(50))
	}

	fn run_with(script: Script, dst: PathBuf, kind: &SinkKind, stall: Duration)
	-> (TrackOutcome, TrackState, u8) {
		let delivery = Arc::new(Delivery::new(KillSwitch::default()));
		let mut player = Player::new(Arc::clone(&delivery), script);
		let track = Track::new("x:track:1", "One");
		let mut job = RipJob::new(&track, dst);
		let outcome = job.rip(&mut player, &delivery, kind, Some(stall));
		(outcome, job.state(), player.stops)
	}

	#[cfg(unix)]
	/// # Shell Encoder.
	///
	/// Run `script` with the destination as `$1` and `log` as `$2`.
	fn shell(script: &str, log: &Path) -> SinkKind {
		SinkKind::Encoder(EncoderCommand::new(
			"sh",
			[
				"-c".to_owned(),
				script.to_owned(),
				"sh".to_owned(),
				"{out}".to_owned(),
				log.to_string_lossy().into_owned(),
			],
		))
	}

	#[cfg(unix)]
	/// # Lines.
	fn lines(path: &Path) -> usize {
		std::fs::read_to_string(path).map_or(0, |s| s.lines().count())
	}

	#[test]
	fn t_success() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("a").join("b").join("one.pcm");
		let (outcome, state, stops) = run(Script::Finish(5), dst.clone());
		assert_eq!(outcome, TrackOutcome::Succeeded { warning: None });
		assert_eq!(state, TrackState::Succeeded);
		assert_eq!(stops, 1, "Playback should be stopped once.");

		let raw = std::fs::read(&dst).expect("Read failed.");
		let expected: Vec<u8> = (0..5_u8).flat_map(|i| [i; 400]).collect();
		assert_eq!(raw, expected, "The file should hold every frame, in order.");
	}

	#[test]
	fn t_load_failure() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("one.pcm");
		let (outcome, state, stops) = run(Script::NoLoad, dst.clone());
		assert_eq!(outcome, TrackOutcome::Failed(RipStreamError::Session("no load".to_owned())));
		assert_eq!(state, TrackState::Failed);
		assert_eq!(stops, 1, "Playback should be stopped once.");
		assert!(! dst.exists(), "The partial file should be gone.");
	}

	#[test]
	fn t_stall() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("one.pcm");
		let (outcome, state, _) = run(Script::Hang(3), dst.clone());
		assert!(
			matches!(outcome, TrackOutcome::Failed(RipStreamError::Stalled(_))),
			"Expected a stall.",
		);
		assert_eq!(state, TrackState::Failed);
		assert!(! dst.exists(), "The partial file should be gone.");
	}

	#[test]
	fn t_token_lost() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("one.pcm");
		let (outcome, state, _) = run(Script::LoseToken(3), dst.clone());
		assert_eq!(outcome, TrackOutcome::Aborted(RipStreamError::PlayTokenLost));
		assert!(outcome.is_abort(), "Expected an abort.");
		assert_eq!(state, TrackState::Failed);
		assert!(! dst.exists(), "The partial file should be gone.");
	}

	#[test]
	fn t_already_dead() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("one.pcm");
		let delivery = Arc::new(Delivery::new(KillSwitch::default()));
		delivery.abort(RipStreamError::Killed);

		let mut player = Player::new(Arc::clone(&delivery), Script::Finish(1));
		let track = Track::new("x:track:1", "One");
		let mut job = RipJob::new(&track, dst.clone());
		let outcome = job.rip(&mut player, &delivery, &SinkKind::Raw, None);
		assert_eq!(outcome, TrackOutcome::Aborted(RipStreamError::Killed));
		assert_eq!(player.stops, 0, "Nothing should have played.");
		assert!(! dst.exists(), "The partial file should be gone.");
	}

	#[cfg(unix)]
	#[test]
	fn t_encoder_tracks() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let log = dir.path().join("exits.txt");
		let kind = shell(r#"cat > "$1"; echo "$1" >> "$2""#, &log);
		let expected: Vec<u8> = (0..5_u8).flat_map(|i| [i; 400]).collect();

		// Each encoder should have exited (and been reaped) before the rip
		// returns, once per track.
		for n in 1..=3 {
			let dst = dir.path().join(format!("{n}.enc"));
			let (outcome, state, stops) = run_with(
				Script::Finish(5),
				dst.clone(),
				&kind,
				Duration::from_secs(10),
			);
			assert_eq!(outcome, TrackOutcome::Succeeded { warning: None });
			assert_eq!(state, TrackState::Succeeded);
			assert_eq!(stops, 1, "Playback should be stopped once.");
			assert_eq!(lines(&log), n, "Each encoder should exit exactly once.");
			assert_eq!(std::fs::read(&dst).expect("Read failed."), expected);
		}
	}

	#[cfg(unix)]
	#[test]
	fn t_encoder_dies() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let log = dir.path().join("exits.txt");
		let dst = dir.path().join("one.enc");

		// Far more than a pipe buffer, so the writes can't all sneak in before
		// the encoder quits.
		let kind = shell(r#"head -c 10 > "$1"; echo "$1" >> "$2"; exit 2"#, &log);
		let (outcome, state, _) = run_with(
			Script::Finish(255),
			dst.clone(),
			&kind,
			Duration::from_secs(10),
		);
		assert!(
			matches!(outcome, TrackOutcome::Failed(RipStreamError::BrokenPipe(_))),
			"A dead encoder should fail the track.",
		);
		assert_eq!(state, TrackState::Failed);
		assert_eq!(lines(&log), 1, "The encoder should have been reaped.");
		assert!(! dst.exists(), "The partial file should be gone.");
	}

	#[cfg(unix)]
	#[test]
	fn t_encoder_abort() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let log = dir.path().join("exits.txt");
		let dst = dir.path().join("one.enc");

		let kind = shell(r#"cat > "$1"; echo "$1" >> "$2""#, &log);
		let (outcome, state, _) = run_with(
			Script::LoseToken(3),
			dst.clone(),
			&kind,
			Duration::from_secs(10),
		);
		assert_eq!(outcome, TrackOutcome::Aborted(RipStreamError::PlayTokenLost));
		assert_eq!(state, TrackState::Failed);
		assert_eq!(lines(&log), 1, "The encoder should have been reaped.");
		assert!(! dst.exists(), "The partial file should be gone.");
	}
}
