/*!
# Rip Stream: Run Driver
*/

use crate::{
	append_m3u,
	Delivery,
	expected_size,
	FailureLedger,
	Login,
	nice_size,
	Playlist,
	RemovalQueue,
	RipJob,
	RipLog,
	RipOptions,
	RipStreamError,
	SAMPLE_RATE,
	Session,
	SessionEvents,
	SinkKind,
	Tagger,
	Track,
	track_path,
	TrackOutcome,
	TrackState,
	User,
	NoTags,
};
use dactyl::traits::NiceInflection;
use fyi_ansi::{
	ansi,
	dim,
};
use fyi_msg::Msg;
use std::{
	fmt,
	path::{
		Path,
		PathBuf,
	},
	sync::Arc,
	time::Duration,
};



/// # Connection Timeout.
///
/// How long to wait for a login or logout to settle.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// # Playlist Sync Interval.
const SYNC_INTERVAL: Duration = Duration::from_millis(100);



/// # Ripper.
///
/// This owns the session for the duration of a run, feeding it tracks one at
/// a time.
pub struct Ripper<S: Session> {
	/// # Session.
	session: S,

	/// # Options.
	opts: RipOptions,

	/// # Delivery.
	delivery: Arc<Delivery>,

	/// # Tagger.
	tagger: Box<dyn Tagger>,
}

impl<S: Session> fmt::Debug for Ripper<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Ripper")
			.field("opts", &self.opts)
			.field("delivery", &self.delivery)
			.finish_non_exhaustive()
	}
}

impl<S: Session> Ripper<S> {
	#[must_use]
	/// # New.
	///
	/// Hook `delivery` up to the session's callbacks.
	pub fn new(mut session: S, opts: RipOptions, delivery: Delivery) -> Self {
		let delivery = Arc::new(delivery);
		let events: Arc<dyn SessionEvents> = delivery.clone();
		session.set_events(events);
		Self {
			session,
			opts,
			delivery,
			tagger: Box::new(NoTags),
		}
	}

	#[must_use]
	/// # With Tagger.
	///
	/// Set the metadata tagger to run on each ripped file. By default files
	/// are left alone.
	pub fn with_tagger<T>(self, tagger: T) -> Self
	where T: Tagger + 'static {
		Self {
			tagger: Box::new(tagger),
			..self
		}
	}

	#[must_use]
	/// # Delivery.
	///
	/// This is mainly useful for wiring up an interrupt handler; see
	/// [`Delivery::abort`].
	pub fn delivery(&self) -> Arc<Delivery> { Arc::clone(&self.delivery) }

	#[must_use]
	/// # Options.
	pub const fn opts(&self) -> &RipOptions { &self.opts }

	#[must_use]
	/// # Session.
	pub const fn session(&self) -> &S { &self.session }
}

impl<S: Session> Ripper<S> {
	/// # Run!
	///
	/// Log in, rip every track from every URI, then tidy up: flush the
	/// playlist removals, close the failure log, print a summary, and log
	/// out.
	///
	/// Entries in `uris` that point to existing files are treated as lists of
	/// URIs, one per line.
	///
	/// ## Errors
	///
	/// Returns an error if the failure log cannot be created or the login
	/// fails. Track-level problems are recorded in the report instead.
	pub fn run(&mut self, login: &Login, uris: &[String])
	-> Result<RunReport, RipStreamError> {
		let uris = expand_uris(uris);
		if uris.is_empty() { return Err(RipStreamError::Noop); }

		let mut ledger = FailureLedger::new(self.opts.fail_log())?;
		self.login(login)?;

		let user = self.session.user();
		let kind = SinkKind::from(&self.opts);
		let mut removals = RemovalQueue::new(self.opts.remove_from_playlist());
		let mut log = self.opts.verbose().then(RipLog::new);

		'uris: for uri in &uris {
			if self.delivery.killed() { break; }

			let (tracks, playlist) = match self.session.resolve(uri) {
				Ok(r) => r.into_parts(),
				Err(e) => {
					Msg::from(e).eprint();
					continue;
				},
			};
			if tracks.is_empty() {
				Msg::warning(format!("{uri} has no tracks.")).eprint();
				continue;
			}

			self.print_size(&tracks);

			// Playlist indexes are padded to match the list length.
			let width =
				if playlist.is_some() { tracks.len().to_string().len() }
				else { 0 };
			for (pos, track) in tracks.into_iter().enumerate() {
				if self.delivery.killed() { break 'uris; }

				let ctx = TrackContext {
					pos,
					width,
					playlist: playlist.as_ref(),
					user: user.as_ref(),
				};
				let outcome = self.rip_track(&track, &ctx, &kind, &mut removals, log.as_mut());
				let abort = outcome.is_abort();
				match outcome {
					TrackOutcome::Succeeded { .. } => ledger.succeeded(track),
					TrackOutcome::Skipped => ledger.skipped(track),
					TrackOutcome::Failed(e) | TrackOutcome::Aborted(e) => ledger.failed(track, e),
				}
				if abort { break 'uris; }
			}
		}

		// Wrap it up.
		if let Err(e) = removals.flush(&mut self.session, SYNC_INTERVAL) {
			Msg::warning(format!(
				"Playlist cleanup was incomplete; only {} removed. ({e})",
				removals.removed().nice_inflect("track was", "tracks were"),
			)).eprint();
		}
		let removed = removals.removed();
		let fail_log = ledger.finish();
		if 1 < ledger.attempted() { self.summarize(&ledger); }
		if let Some(path) = fail_log.as_ref() {
			Msg::warning(format!(
				"Failed tracks have been logged to {}.",
				path.to_string_lossy(),
			)).eprint();
		}
		drop(log);
		self.logout();

		Ok(RunReport {
			ledger,
			aborted: self.delivery.abort_reason(),
			fail_log,
			removed,
		})
	}

	/// # Rip Track.
	///
	/// Run a single track through its paces, handling all the side effects
	/// except for the ledger.
	fn rip_track(
		&mut self,
		track: &Track,
		ctx: &TrackContext,
		kind: &SinkKind,
		removals: &mut RemovalQueue,
		log: Option<&mut RipLog>,
	) -> TrackOutcome {
		let dst = track_path(&self.opts, track, ctx.pos, ctx.width, ctx.playlist, ctx.user);
		let mut job = RipJob::new(track, dst);

		let outcome =
			if ! track.is_available() {
				TrackOutcome::Failed(RipStreamError::Unavailable(track.display_name()))
			}
			else if ! self.opts.overwrite() && job.dst().exists() {
				TrackOutcome::Skipped
			}
			else {
				self.start_progress(track);
				let out = job.rip(
					&mut self.session,
					&self.delivery,
					kind,
					self.opts.stall_timeout(),
				);
				if let Some(p) = self.delivery.progress() { p.finish(); }
				debug_assert!(
					matches!(job.state(), TrackState::Succeeded | TrackState::Failed),
					"Rip jobs should always end in a terminal state.",
				);
				out
			};

		match &outcome {
			TrackOutcome::Succeeded { warning } => {
				if let Some(code) = warning {
					Msg::warning(format!("The encoder exited with code {code}.")).eprint();
				}
				if let Err(e) = self.tagger.tag(job.dst(), track) {
					Msg::warning(e.to_string()).eprint();
				}
				if let Some(p) = ctx.playlist {
					if let Err(e) = append_m3u(self.opts.base_dir(), p, job.dst()) {
						Msg::warning(e.to_string()).eprint();
					}
				}
				Msg::success(format!("Ripped {}.", track.display_name())).eprint();
				removals.queue(ctx.playlist, ctx.user, ctx.pos);
			},
			TrackOutcome::Skipped => {
				Msg::custom("Skipped", 11, &format!(
					"{} already exists.",
					job.dst().to_string_lossy(),
				))
					.with_newline(true)
					.eprint();
				removals.queue(ctx.playlist, ctx.user, ctx.pos);
			},
			TrackOutcome::Failed(e) | TrackOutcome::Aborted(e) => {
				Msg::error(format!("{} failed: {e}", track.display_name())).eprint();
			},
		}

		if let Some(log) = log { log.add(track, &outcome, job.elapsed()); }
		outcome
	}

	/// # Log In.
	fn login(&mut self, login: &Login) -> Result<(), RipStreamError> {
		self.delivery.reset_connection();
		self.session.login(login)?;
		self.delivery.wait_login(CONNECTION_TIMEOUT)?;

		if let Some(user) = self.session.user() {
			Msg::custom("Login", 199, &format!("Logged in as {}.", user.display()))
				.with_newline(true)
				.eprint();
		}
		Ok(())
	}

	/// # Log Out.
	fn logout(&mut self) {
		self.session.logout();
		if let Err(e) = self.delivery.wait_logout(CONNECTION_TIMEOUT) {
			Msg::warning(e.to_string()).eprint();
		}
	}

	/// # Print Size.
	///
	/// Let the user know roughly how much is about to be downloaded, if that
	/// can be known.
	fn print_size(&self, tracks: &[Track]) {
		let total = tracks.iter()
			.try_fold(0_u64, |acc, t| expected_size(&self.opts, t.duration()).map(|s| acc + s));
		if let Some(total) = total.filter(|&n| n != 0) {
			Msg::custom("Size", 199, &format!(
				"{} will be downloaded ({}).",
				tracks.len().nice_inflect("track", "tracks"),
				nice_size(total),
			))
				.with_newline(true)
				.eprint();
		}
	}

	/// # Start Progress.
	fn start_progress(&self, track: &Track) {
		let Some(progress) = self.delivery.progress() else { return; };
		let millis = track.duration().as_millis();
		let frames = millis.saturating_mul(u128::from(SAMPLE_RATE)).wrapping_div(1000);
		let _res = progress.reset(u32::try_from(frames).unwrap_or(u32::MAX));

		let title = match expected_size(&self.opts, track.duration()) {
			Some(size) => format!("{} ({})", track.display_name(), nice_size(size)),
			None => track.display_name(),
		};
		progress.set_title(Some(Msg::custom("Ripping", 199, &title)));
	}

	/// # Summarize.
	fn summarize(&mut self, ledger: &FailureLedger) {
		Msg::custom("Summary", 199, &format!(
			"{} ripped, {} skipped, {} failed.",
			ledger.succeeded_tracks().len(),
			ledger.skipped_tracks().len(),
			ledger.failed_tracks().len(),
		))
			.with_newline(true)
			.eprint();

		for track in ledger.succeeded_tracks() {
			let name = self.display_name(track);
			eprintln!(concat!("        ", ansi!((light_green) "✔"), " {}"), name);
		}
		for (track, err) in ledger.failed_tracks() {
			let name = self.display_name(track);
			eprintln!(concat!("        ", ansi!((light_red) "✘"), " {} ", dim!("({})")), name, err);
		}

		eprintln!();
	}

	/// # Display Name.
	///
	/// Ask the session for the freshest name, falling back to the URI.
	fn display_name(&mut self, track: &Track) -> String {
		self.session.display_name(track)
			.filter(|n| ! n.trim().is_empty())
			.unwrap_or_else(|| track.uri().to_owned())
	}
}



/// # Per-Track Context.
struct TrackContext<'a> {
	/// # Position (Zero-Based).
	pos: usize,

	/// # Index Width.
	///
	/// Only playlists get default padding.
	width: usize,

	/// # Source Playlist.
	playlist: Option<&'a Playlist>,

	/// # Current User.
	user: Option<&'a User>,
}



#[derive(Debug)]
/// # Run Report.
///
/// The results of a completed (or aborted) run.
pub struct RunReport {
	/// # Ledger.
	ledger: FailureLedger,

	/// # Abort Reason.
	aborted: Option<RipStreamError>,

	/// # Failure Log.
	fail_log: Option<PathBuf>,

	/// # Positions Removed From Playlists.
	removed: usize,
}

impl RunReport {
	#[must_use]
	/// # Succeeded Tracks.
	pub fn succeeded(&self) -> &[Track] { self.ledger.succeeded_tracks() }

	#[must_use]
	/// # Failed Tracks.
	pub fn failed(&self) -> &[(Track, RipStreamError)] { self.ledger.failed_tracks() }

	#[must_use]
	/// # Skipped Tracks.
	pub fn skipped(&self) -> &[Track] { self.ledger.skipped_tracks() }

	#[must_use]
	/// # Abort Reason.
	///
	/// This is `Some` if the run was cut short.
	pub const fn aborted(&self) -> Option<&RipStreamError> { self.aborted.as_ref() }

	#[must_use]
	/// # Failure Log.
	///
	/// This is only `Some` if a log was requested and something failed.
	pub fn fail_log(&self) -> Option<&Path> { self.fail_log.as_deref() }

	#[must_use]
	/// # Removed From Playlists.
	pub const fn removed(&self) -> usize { self.removed }

	#[must_use]
	/// # Total Tracks Handled.
	pub fn total(&self) -> usize { self.ledger.total() }

	#[must_use]
	/// # All Good?
	pub fn is_ok(&self) -> bool {
		self.aborted.is_none() && self.ledger.failed_tracks().is_empty()
	}
}



/// # Expand URIs.
///
/// Anything that's an existing file is read as a list of URIs, one per line.
fn expand_uris(uris: &[String]) -> Vec<String> {
	let mut out = Vec::new();
	for uri in uris {
		let uri = uri.trim();
		if uri.is_empty() { continue; }

		let path = Path::new(uri);
		if path.is_file() {
			match std::fs::read_to_string(path) {
				Ok(raw) => out.extend(
					raw.lines()
						.map(str::trim)
						.filter(|l| ! l.is_empty())
						.map(String::from)
				),
				Err(_) => Msg::from(RipStreamError::Read(uri.to_owned())).eprint(),
			}
		}
		else { out.push(uri.to_owned()); }
	}
	out
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		AudioFormat,
		ConnectionState,
		KillSwitch,
		OutputFormat,
		Resolved,
	};
	use std::{
		collections::BTreeMap,
		sync::Mutex,
		thread::JoinHandle,
	};

	/// # Fake Track Behavior.
	#[derive(Clone, Copy)]
	enum Script {
		/// # Deliver N Chunks, Then End.
		Finish(u8),

		/// # Deliver N Chunks, Then Lose the Token.
		LoseToken(u8),
	}

	#[derive(Default)]
	/// # Scripted Session.
	struct FakeSession {
		events: Option<Arc<dyn SessionEvents>>,
		user: Option<User>,
		fail_login: bool,
		resolved: BTreeMap<String, Resolved>,
		scripts: BTreeMap<String, Script>,
		loaded: Option<Script>,
		thread: Option<JoinHandle<()>>,
		played: Arc<Mutex<Vec<String>>>,
		now_playing: String,
		removed: Vec<(String, Vec<usize>)>,
		reject: Option<&'static str>,
		logins: u8,
		logouts: u8,
	}

	impl FakeSession {
		fn new(user: &str) -> Self {
			Self {
				user: Some(User::new(user)),
				..Self::default()
			}
		}

		fn with(mut self, uri: &str, resolved: Resolved) -> Self {
			self.resolved.insert(uri.to_owned(), resolved);
			self
		}

		fn with_script(mut self, uri: &str, script: Script) -> Self {
			self.scripts.insert(uri.to_owned(), script);
			self
		}

		fn events(&self) -> Arc<dyn SessionEvents> {
			Arc::clone(self.events.as_ref().expect("Events not set."))
		}
	}

	impl Session for FakeSession {
		fn set_events(&mut self, events: Arc<dyn SessionEvents>) { self.events.replace(events); }

		fn login(&mut self, _login: &Login) -> Result<(), RipStreamError> {
			self.logins += 1;
			let state =
				if self.fail_login { ConnectionState::Failed("bad password".to_owned()) }
				else { ConnectionState::LoggedIn };
			let events = self.events();
			std::thread::spawn(move || events.connection_state_changed(state));
			Ok(())
		}

		fn logout(&mut self) {
			self.logouts += 1;
			self.events().connection_state_changed(ConnectionState::LoggedOut);
		}

		fn user(&self) -> Option<User> { self.user.clone() }

		fn resolve(&mut self, uri: &str) -> Result<Resolved, RipStreamError> {
			self.resolved.get(uri).cloned().ok_or_else(|| RipStreamError::Uri(uri.to_owned()))
		}

		fn load(&mut self, track: &Track) -> Result<(), RipStreamError> {
			self.now_playing = track.uri().to_owned();
			self.loaded.replace(self.scripts.get(track.uri()).copied().unwrap_or(Script::Finish(4)));
			Ok(())
		}

		fn play(&mut self) -> Result<(), RipStreamError> {
			let script = self.loaded.take().ok_or(RipStreamError::Bug("nothing loaded"))?;
			self.played.lock().expect("Poisoned.").push(self.now_playing.clone());
			let events = self.events();
			self.thread.replace(std::thread::spawn(move || {
				let (chunks, lose) = match script {
					Script::Finish(n) => (n, false),
					Script::LoseToken(n) => (n, true),
				};
				for i in 0..chunks {
					events.frame_delivered(AudioFormat::default(), &[i; 400], 100);
				}
				if lose { events.play_token_lost(); }
				else { events.end_of_track(); }
			}));
			Ok(())
		}

		fn stop(&mut self) {
			if let Some(t) = self.thread.take() { t.join().expect("Player panicked."); }
		}

		fn remove_tracks(&mut self, playlist: &Playlist, positions: &[usize])
		-> Result<(), RipStreamError> {
			if self.reject == Some(playlist.uri()) {
				return Err(RipStreamError::Playlist(playlist.name().to_owned()));
			}
			self.removed.push((playlist.uri().to_owned(), positions.to_vec()));
			Ok(())
		}

		fn has_pending_changes(&mut self, _playlist: &Playlist) -> bool { false }
	}

	fn tracks(prefix: &str, num: usize) -> Vec<Track> {
		(1..=num)
			.map(|n| Track::new(format!("{prefix}:{n}"), format!("Song {n}"))
				.with_artist("Band")
				.with_duration(Duration::from_secs(1))
			)
			.collect()
	}

	fn opts(dir: &Path) -> RipOptions {
		RipOptions::default()
			.with_base_dir(dir)
			.with_format(OutputFormat::Pcm)
			.with_template("{track}.{ext}")
			.with_stall_timeout(Some(Duration::from_secs(10)))
	}

	fn ripper(session: FakeSession, opts: RipOptions) -> Ripper<FakeSession> {
		Ripper::new(session, opts, Delivery::new(KillSwitch::default()))
	}

	#[test]
	fn t_outcomes() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let mut list = tracks("x:track", 4);
		list[1] = list[1].clone().with_available(false);
		std::fs::write(dir.path().join("Song 3.pcm"), b"old").expect("Write failed.");

		let album = crate::Album::new("x:album:1", "Record", "Band");
		let session = FakeSession::new("me")
			.with("x:album:1", Resolved::Album(album, list));
		let mut ripper = ripper(session, opts(dir.path()));
		let report = ripper.run(&Login::Remembered, &["x:album:1".to_owned()])
			.expect("Run failed.");

		// Each track lands in exactly one bucket.
		assert_eq!(report.total(), 4);
		let uris = |t: &[Track]| t.iter().map(|t| t.uri().to_owned()).collect::<Vec<_>>();
		assert_eq!(uris(report.succeeded()), vec!["x:track:1", "x:track:4"]);
		assert_eq!(uris(report.skipped()), vec!["x:track:3"]);
		assert_eq!(report.failed().len(), 1);
		assert_eq!(report.failed()[0].0.uri(), "x:track:2");
		assert!(matches!(report.failed()[0].1, RipStreamError::Unavailable(_)));
		assert!(report.aborted().is_none(), "Nothing should have aborted.");

		// The skipped file was left alone.
		assert_eq!(
			std::fs::read(dir.path().join("Song 3.pcm")).expect("Read failed."),
			b"old",
		);

		// The ripped files hold exactly what was delivered.
		let expected: Vec<u8> = (0..4_u8).flat_map(|i| [i; 400]).collect();
		assert_eq!(std::fs::read(dir.path().join("Song 1.pcm")).expect("Read failed."), expected);
		assert_eq!(std::fs::read(dir.path().join("Song 4.pcm")).expect("Read failed."), expected);
		assert!(! dir.path().join("Song 2.pcm").exists(), "Unavailable tracks should not be written.");

		// Only the two real rips should have played.
		let played = ripper.session().played.lock().expect("Poisoned.").clone();
		assert_eq!(played, vec!["x:track:1", "x:track:4"]);
		assert_eq!(ripper.session().logins, 1);
		assert_eq!(ripper.session().logouts, 1);
	}

	#[test]
	fn t_removal_batch() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let me = User::new("me");
		let mine = Playlist::new("x:playlist:mine", "Mine", me);
		let theirs = Playlist::new("x:playlist:theirs", "Theirs", User::new("them"));

		// Only positions 2, 5, and 7 succeed.
		let mut list = tracks("x:mine", 8);
		for (k, t) in list.iter_mut().enumerate() {
			if ! matches!(k, 2 | 5 | 7) { *t = t.clone().with_available(false); }
		}

		let session = FakeSession::new("me")
			.with("x:playlist:mine", Resolved::Playlist(mine, list))
			.with("x:playlist:theirs", Resolved::Playlist(theirs, tracks("x:theirs", 1)));
		let mut ripper = ripper(session, opts(dir.path()).with_remove_from_playlist(true));
		let report = ripper.run(
			&Login::Remembered,
			&["x:playlist:mine".to_owned(), "x:playlist:theirs".to_owned()],
		).expect("Run failed.");

		assert_eq!(report.succeeded().len(), 4);
		assert_eq!(report.failed().len(), 5);
		assert_eq!(report.removed(), 3);
		assert_eq!(
			ripper.session().removed,
			vec![("x:playlist:mine".to_owned(), vec![2, 5, 7])],
			"Expected one batch, for the owned playlist only.",
		);

		// Playlist files were appended as we went.
		let m3u = std::fs::read_to_string(dir.path().join("Mine.m3u")).expect("Read failed.");
		assert_eq!(m3u, "Song 3.pcm\nSong 6.pcm\nSong 8.pcm\n");
	}

	#[test]
	fn t_skipped_removal() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let mine = Playlist::new("x:playlist:mine", "Mine", User::new("me"));
		std::fs::write(dir.path().join("Song 2.pcm"), b"old").expect("Write failed.");

		let session = FakeSession::new("me")
			.with("x:playlist:mine", Resolved::Playlist(mine, tracks("x:mine", 3)));
		let mut ripper = ripper(session, opts(dir.path()).with_remove_from_playlist(true));
		let report = ripper.run(&Login::Remembered, &["x:playlist:mine".to_owned()])
			.expect("Run failed.");

		assert_eq!(report.succeeded().len(), 2);
		assert_eq!(report.skipped().len(), 1);
		assert_eq!(report.skipped()[0].uri(), "x:mine:2");

		// The existing track goes too, in the same batch.
		assert_eq!(
			ripper.session().removed,
			vec![("x:playlist:mine".to_owned(), vec![0, 1, 2])],
			"Skipped tracks should still be removed.",
		);
		assert_eq!(report.removed(), 3);

		// But it isn't added to the playlist file.
		let m3u = std::fs::read_to_string(dir.path().join("Mine.m3u")).expect("Read failed.");
		assert_eq!(m3u, "Song 1.pcm\nSong 3.pcm\n");
	}

	#[test]
	fn t_removal_partial() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let me = User::new("me");
		let one = Playlist::new("x:playlist:one", "One", me.clone());
		let two = Playlist::new("x:playlist:two", "Two", me);

		let mut session = FakeSession::new("me")
			.with("x:playlist:one", Resolved::Playlist(one, tracks("x:one", 2)))
			.with("x:playlist:two", Resolved::Playlist(two, tracks("x:two", 3)));
		session.reject = Some("x:playlist:one");
		let opts = opts(dir.path())
			.with_template("{playlist}/{track}.{ext}")
			.with_remove_from_playlist(true);
		let mut ripper = ripper(session, opts);
		let report = ripper.run(
			&Login::Remembered,
			&["x:playlist:one".to_owned(), "x:playlist:two".to_owned()],
		).expect("Run failed.");

		assert_eq!(report.succeeded().len(), 5);
		assert_eq!(report.removed(), 3, "The other playlist's removals should count.");
		assert_eq!(
			ripper.session().removed,
			vec![("x:playlist:two".to_owned(), vec![0, 1, 2])],
		);
	}

	#[test]
	fn t_index_names() {
		/// # Sorted File Names.
		fn names(dir: &Path) -> Vec<String> {
			let mut out: Vec<String> = std::fs::read_dir(dir)
				.expect("Read failed.")
				.filter_map(|e| {
					let e = e.ok()?;
					if e.path().is_file() { Some(e.file_name().to_string_lossy().into_owned()) }
					else { None }
				})
				.collect();
			out.sort();
			out
		}

		// Albums are zero-based and unpadded.
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let album = crate::Album::new("x:album:1", "Record", "Band");
		let session = FakeSession::new("me")
			.with("x:album:1", Resolved::Album(album, tracks("x:track", 10)));
		let mut ripper = ripper(session, opts(dir.path()).with_template("{idx}.{ext}"));
		let report = ripper.run(&Login::Remembered, &["x:album:1".to_owned()])
			.expect("Run failed.");
		assert_eq!(report.succeeded().len(), 10);
		let expected: Vec<String> = (0..10).map(|n| format!("{n}.pcm")).collect();
		assert_eq!(names(dir.path()), expected);

		// Playlists are padded to the list length.
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let mix = Playlist::new("x:playlist:mix", "Mix", User::new("me"));
		let session = FakeSession::new("me")
			.with("x:playlist:mix", Resolved::Playlist(mix, tracks("x:track", 10)));
		let mut ripper = self::ripper(session, opts(dir.path()).with_template("{idx}.{ext}"));
		let report = ripper.run(&Login::Remembered, &["x:playlist:mix".to_owned()])
			.expect("Run failed.");
		assert_eq!(report.succeeded().len(), 10);
		let mut expected: Vec<String> = (0..10).map(|n| format!("{n:02}.pcm")).collect();
		expected.push("Mix.m3u".to_owned());
		assert_eq!(names(dir.path()), expected);
	}

	#[test]
	fn t_fail_log() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let log = dir.path().join("failed.txt");

		// One of three fails.
		let mut list = tracks("x:track", 3);
		list[1] = list[1].clone().with_available(false);
		let album = crate::Album::new("x:album:1", "Record", "Band");
		let session = FakeSession::new("me")
			.with("x:album:1", Resolved::Album(album.clone(), list));
		let mut ripper = ripper(session, opts(dir.path()).with_fail_log(Some("failed.txt")));
		let report = ripper.run(&Login::Remembered, &["x:album:1".to_owned()])
			.expect("Run failed.");
		assert_eq!(report.fail_log(), Some(log.as_path()));
		assert_eq!(std::fs::read_to_string(&log).expect("Read failed."), "x:track:2\n");

		// None fail.
		std::fs::remove_file(&log).expect("Remove failed.");
		let dir2 = tempfile::tempdir().expect("Tempdir failed.");
		let session = FakeSession::new("me")
			.with("x:album:1", Resolved::Album(album, tracks("x:track", 3)));
		let mut ripper = self::ripper(session, opts(dir2.path()).with_fail_log(Some("failed.txt")));
		let report = ripper.run(&Login::Remembered, &["x:album:1".to_owned()])
			.expect("Run failed.");
		assert!(report.is_ok(), "Nothing should have failed.");
		assert!(report.fail_log().is_none(), "There should be no log.");
		assert!(! dir2.path().join("failed.txt").exists(), "The empty log should be gone.");
	}

	#[test]
	fn t_abort() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let me = User::new("me");
		let mine = Playlist::new("x:playlist:mine", "Mine", me);
		let session = FakeSession::new("me")
			.with("x:playlist:mine", Resolved::Playlist(mine, tracks("x:track", 3)))
			.with_script("x:track:2", Script::LoseToken(3));
		let mut ripper = ripper(session, opts(dir.path()).with_remove_from_playlist(true));
		let report = ripper.run(&Login::Remembered, &["x:playlist:mine".to_owned()])
			.expect("Run failed.");

		assert_eq!(report.aborted(), Some(&RipStreamError::PlayTokenLost));
		assert_eq!(report.succeeded().len(), 1);
		assert_eq!(report.failed().len(), 1);
		assert_eq!(report.total(), 2, "The third track should never start.");
		assert!(dir.path().join("Song 1.pcm").exists(), "The first rip should be intact.");
		assert!(! dir.path().join("Song 2.pcm").exists(), "The partial file should be gone.");
		assert!(! dir.path().join("Song 3.pcm").exists(), "The third track should never start.");

		// Cleanup still happened.
		assert_eq!(ripper.session().removed, vec![("x:playlist:mine".to_owned(), vec![0])]);
		assert_eq!(ripper.session().logouts, 1, "The session should still be logged out.");
	}

	#[test]
	fn t_login_failure() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let mut session = FakeSession::new("me")
			.with("x:track:1", Resolved::Track(Track::new("x:track:1", "One")));
		session.fail_login = true;

		let mut ripper = ripper(session, opts(dir.path()).with_fail_log(Some("failed.txt")));
		assert_eq!(
			ripper.run(&Login::Remembered, &["x:track:1".to_owned()]).map(|_| ()),
			Err(RipStreamError::Login("bad password".to_owned())),
		);
		assert!(ripper.session().played.lock().expect("Poisoned.").is_empty(), "Nothing should play.");
		assert!(! dir.path().join("failed.txt").exists(), "The log should be cleaned up.");
	}

	#[test]
	fn t_expand_uris() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let list = dir.path().join("uris.txt");
		std::fs::write(&list, "x:track:1\n\n  x:track:2  \n").expect("Write failed.");

		let uris = expand_uris(&[
			"x:album:1".to_owned(),
			"   ".to_owned(),
			list.to_string_lossy().into_owned(),
		]);
		assert_eq!(uris, vec!["x:album:1", "x:track:1", "x:track:2"]);
	}
}
