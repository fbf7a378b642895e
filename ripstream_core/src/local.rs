/*!
# Rip Stream: Local Session

This is a streaming session backed by audio files on the local disk. It
behaves like the real thing, delivering frames from its own thread, and so
doubles as a way to exercise (or simply use) the ripper without a network.

URIs take one of the following forms:

* `local:track:<file>`: a single WAV or raw PCM file;
* `local:album:<dir>`: every WAV or PCM file in a directory, sorted by name;
* `local:artist:<dir>`: every album subdirectory within a directory;
* `local:playlist:<file>`: a text file listing one audio file per line.

Playlist paths are relative to the list itself. Lines beginning with `#` are
ignored, except for an optional `#owner:<name>` directive; playlists without
one belong to whoever is logged in.
*/

use crate::{
	Album,
	AudioFormat,
	ConnectionState,
	Login,
	Playlist,
	Resolved,
	RipStreamError,
	BYTES_PER_SECOND,
	Session,
	SessionEvents,
	Track,
	User,
};
use fyi_msg::Msg;
use std::{
	fs::File,
	io::{
		BufReader,
		Read,
	},
	path::{
		Path,
		PathBuf,
	},
	sync::{
		Arc,
		atomic::{
			AtomicBool,
			Ordering::{
				Acquire,
				Release,
			},
		},
	},
	thread::JoinHandle,
	time::Duration,
};
use trimothy::TrimMut;



/// # URI Prefix: Album.
const PREFIX_ALBUM: &str = "local:album:";

/// # URI Prefix: Artist.
const PREFIX_ARTIST: &str = "local:artist:";

/// # URI Prefix: Playlist.
const PREFIX_PLAYLIST: &str = "local:playlist:";

/// # URI Prefix: Track.
const PREFIX_TRACK: &str = "local:track:";

/// # Owner Directive.
const OWNER: &str = "#owner:";

/// # Frames Per Delivery.
const CHUNK_FRAMES: usize = 4096;



#[derive(Default)]
/// # Local Session.
pub struct LocalSession {
	/// # Event Handler.
	events: Option<Arc<dyn SessionEvents>>,

	/// # Logged-In User.
	user: Option<User>,

	/// # Settings File.
	///
	/// This remembers the last user to log in.
	settings: Option<PathBuf>,

	/// # Loaded Track.
	loaded: Option<PathBuf>,

	/// # Active Playback.
	player: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl std::fmt::Debug for LocalSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalSession")
			.field("user", &self.user)
			.field("settings", &self.settings)
			.field("loaded", &self.loaded)
			.finish_non_exhaustive()
	}
}

impl Drop for LocalSession {
	fn drop(&mut self) { self.stop(); }
}

impl LocalSession {
	#[must_use]
	/// # With Settings File.
	///
	/// The last successful login is saved here, allowing later runs to use
	/// [`Login::Remembered`].
	pub fn with_settings<P>(mut self, settings: P) -> Self
	where P: AsRef<Path> {
		self.settings.replace(settings.as_ref().to_path_buf());
		self
	}

	/// # Notify.
	fn notify(&self, state: ConnectionState) {
		if let Some(events) = self.events.as_ref() {
			events.connection_state_changed(state);
		}
	}

	/// # Remembered User.
	fn remembered(&self) -> Option<String> {
		let path = self.settings.as_ref()?;
		let mut raw = std::fs::read_to_string(path).ok()?;
		raw.trim_mut();
		if raw.is_empty() { None }
		else { Some(raw) }
	}

	/// # Resolve Playlist.
	fn resolve_playlist(&self, uri: &str, src: &Path) -> Result<Resolved, RipStreamError> {
		let (owner, entries) = read_playlist(src)?;
		let owner = owner.map(User::new)
			.or_else(|| self.user.clone())
			.unwrap_or_else(|| User::new("nobody"));
		let name = file_stem(src);
		let dir = src.parent().unwrap_or_else(|| Path::new("."));

		let tracks = entries.into_iter()
			.map(|e| load_track(&dir.join(e)))
			.collect();
		Ok(Resolved::Playlist(Playlist::new(uri, name, owner), tracks))
	}
}

impl Session for LocalSession {
	fn set_events(&mut self, events: Arc<dyn SessionEvents>) {
		self.events.replace(events);
	}

	fn login(&mut self, login: &Login) -> Result<(), RipStreamError> {
		let name = match login {
			Login::Password { user, .. } => Some(user.trim().to_owned()).filter(|u| ! u.is_empty()),
			Login::Remembered => self.remembered(),
		};

		if let Some(name) = name {
			if let Some(settings) = self.settings.as_ref() {
				if write_atomic::write_file(settings, name.as_bytes()).is_err() {
					Msg::warning(format!(
						"Unable to save login details to {}.",
						settings.to_string_lossy(),
					)).eprint();
				}
			}
			self.user.replace(User::new(name));
			self.notify(ConnectionState::LoggedIn);
		}
		else {
			self.notify(ConnectionState::Failed(match login {
				Login::Password { .. } => "a username is required".to_owned(),
				Login::Remembered => "no user has logged in before".to_owned(),
			}));
		}

		Ok(())
	}

	fn logout(&mut self) {
		self.stop();
		self.user = None;
		self.notify(ConnectionState::LoggedOut);
	}

	fn user(&self) -> Option<User> { self.user.clone() }

	fn resolve(&mut self, uri: &str) -> Result<Resolved, RipStreamError> {
		if let Some(src) = uri.strip_prefix(PREFIX_TRACK) {
			let track = load_track(Path::new(src));
			Ok(Resolved::Track(track))
		}
		else if let Some(src) = uri.strip_prefix(PREFIX_ALBUM) {
			let (album, tracks) = read_album(Path::new(src))?;
			Ok(Resolved::Album(album, tracks))
		}
		else if let Some(src) = uri.strip_prefix(PREFIX_ARTIST) {
			let src = Path::new(src);
			let mut dirs = read_dir(src, Path::is_dir)?;
			dirs.sort();

			let mut tracks = Vec::new();
			for dir in dirs {
				let (_, mut t) = read_album(&dir)?;
				tracks.append(&mut t);
			}
			Ok(Resolved::Artist(tracks))
		}
		else if let Some(src) = uri.strip_prefix(PREFIX_PLAYLIST) {
			self.resolve_playlist(uri, Path::new(src))
		}
		else { Err(RipStreamError::Uri(uri.to_owned())) }
	}

	fn load(&mut self, track: &Track) -> Result<(), RipStreamError> {
		self.stop();
		let src = track.uri().strip_prefix(PREFIX_TRACK)
			.map(PathBuf::from)
			.filter(|p| p.is_file())
			.ok_or_else(|| RipStreamError::Unavailable(track.uri().to_owned()))?;
		self.loaded.replace(src);
		Ok(())
	}

	fn play(&mut self) -> Result<(), RipStreamError> {
		self.stop();
		let src = self.loaded.clone()
			.ok_or_else(|| RipStreamError::Session("no track is loaded".to_owned()))?;
		let events = self.events.clone()
			.ok_or(RipStreamError::Bug("no event handler is registered"))?;

		let source = Source::open(&src)?;
		let stop = Arc::new(AtomicBool::new(false));
		let stop2 = Arc::clone(&stop);
		let handle = std::thread::spawn(move || source.play(&*events, &stop2));
		self.player.replace((stop, handle));
		Ok(())
	}

	fn stop(&mut self) {
		if let Some((stop, handle)) = self.player.take() {
			stop.store(true, Release);
			let _res = handle.join();
		}
	}

	fn remove_tracks(&mut self, playlist: &Playlist, positions: &[usize])
	-> Result<(), RipStreamError> {
		let src = playlist.uri().strip_prefix(PREFIX_PLAYLIST)
			.map(Path::new)
			.ok_or_else(|| RipStreamError::Playlist(playlist.name().to_owned()))?;
		let raw = std::fs::read_to_string(src)
			.map_err(|_| RipStreamError::Read(src.to_string_lossy().into_owned()))?;

		// Count only the entries, keeping comments and blanks as they are.
		let mut pos = 0;
		let mut out = String::with_capacity(raw.len());
		for line in raw.lines() {
			if is_entry(line) {
				let keep = ! positions.contains(&pos);
				pos += 1;
				if ! keep { continue; }
			}
			out.push_str(line);
			out.push('\n');
		}

		write_atomic::write_file(src, out.as_bytes())
			.map_err(|_| RipStreamError::Playlist(playlist.name().to_owned()))
	}

	/// # Pending Changes?
	///
	/// Local changes are written synchronously, so there's never anything
	/// left to wait for.
	fn has_pending_changes(&mut self, _playlist: &Playlist) -> bool { false }
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Audio File Kind.
enum AudioKind {
	Pcm,
	Wav,
}

/// # Audio Source.
enum Source {
	/// # Raw PCM.
	Pcm(BufReader<File>),

	/// # WAV.
	Wav(hound::WavReader<BufReader<File>>, AudioFormat),
}

impl Source {
	/// # Open.
	fn open(src: &Path) -> Result<Self, RipStreamError> {
		let err = || RipStreamError::Read(src.to_string_lossy().into_owned());
		match audio_kind(src) {
			Some(AudioKind::Pcm) => File::open(src)
				.map(|f| Self::Pcm(BufReader::new(f)))
				.map_err(|_| err()),
			Some(AudioKind::Wav) => {
				let reader = hound::WavReader::open(src).map_err(|_| err())?;
				let spec = reader.spec();
				if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
					return Err(RipStreamError::Unavailable(src.to_string_lossy().into_owned()));
				}
				let format = AudioFormat {
					sample_rate: spec.sample_rate,
					channels: spec.channels,
				};
				Ok(Self::Wav(reader, format))
			},
			None => Err(err()),
		}
	}

	/// # Play.
	///
	/// Feed the whole thing to `events`, chunk by chunk, then signal the end
	/// of the track. Stopping early skips the signal.
	fn play(self, events: &dyn SessionEvents, stop: &AtomicBool) {
		let (format, mut next): (AudioFormat, Box<dyn FnMut(&mut Vec<u8>) -> bool>) = match self {
			Self::Pcm(mut r) => (
				AudioFormat::default(),
				Box::new(move |buf: &mut Vec<u8>| {
					buf.resize(CHUNK_FRAMES * AudioFormat::default().bytes_per_frame(), 0);
					let len = read_full(&mut r, buf);
					buf.truncate(len);
					! buf.is_empty()
				}),
			),
			Self::Wav(r, format) => {
				let mut samples = r.into_samples::<i16>();
				let per_chunk = CHUNK_FRAMES * usize::from(format.channels);
				(
					format,
					Box::new(move |buf: &mut Vec<u8>| {
						buf.clear();
						for s in samples.by_ref().take(per_chunk) {
							let Ok(s) = s else { break; };
							buf.extend_from_slice(&s.to_le_bytes());
						}
						! buf.is_empty()
					}),
				)
			},
		};

		let frame_size = format.bytes_per_frame().max(1);
		let mut buf = Vec::new();
		while ! stop.load(Acquire) && next(&mut buf) {
			// Drop any trailing partial frame.
			let frames = buf.len().wrapping_div(frame_size);
			let mut sent = 0;
			while sent < frames {
				if stop.load(Acquire) { return; }
				let chunk = &buf[sent * frame_size..frames * frame_size];
				let accepted = events.frame_delivered(format, chunk, frames - sent);
				if accepted == 0 { std::thread::sleep(Duration::from_millis(10)); }
				sent += accepted;
			}
		}

		if ! stop.load(Acquire) { events.end_of_track(); }
	}
}



/// # Audio Kind.
fn audio_kind(src: &Path) -> Option<AudioKind> {
	let ext = src.extension()?.to_str()?;
	if ext.eq_ignore_ascii_case("wav") { Some(AudioKind::Wav) }
	else if ext.eq_ignore_ascii_case("pcm") { Some(AudioKind::Pcm) }
	else { None }
}

/// # File Stem.
fn file_stem(src: &Path) -> String {
	src.file_stem()
		.map_or_else(|| "Unknown".to_owned(), |s| s.to_string_lossy().into_owned())
}

/// # Is Playlist Entry?
fn is_entry(line: &str) -> bool {
	let line = line.trim();
	! line.is_empty() && ! line.starts_with('#')
}

/// # Load Track.
///
/// Build a track from an audio file. Names of the form "Artist - Title" are
/// split accordingly. Files that can't be read are marked unavailable.
fn load_track(src: &Path) -> Track {
	let src = std::fs::canonicalize(src).unwrap_or_else(|_| src.to_path_buf());
	let stem = file_stem(&src);
	let (artist, name) = stem.split_once(" - ").unwrap_or(("", stem.as_str()));
	let mut track = Track::new(format!("{PREFIX_TRACK}{}", src.to_string_lossy()), name.trim());
	if ! artist.trim().is_empty() { track = track.with_artist(artist.trim()); }

	let duration = match audio_kind(&src) {
		Some(AudioKind::Wav) => hound::WavReader::open(&src).ok().map(|r| {
			let rate = u64::from(r.spec().sample_rate.max(1));
			Duration::from_millis((u64::from(r.duration()) * 1000).wrapping_div(rate))
		}),
		Some(AudioKind::Pcm) => std::fs::metadata(&src).ok().map(|m|
			Duration::from_millis((m.len() * 1000).wrapping_div(u64::from(BYTES_PER_SECOND)))
		),
		None => None,
	};

	match duration {
		Some(d) => track.with_duration(d),
		None => track.with_available(false),
	}
}

/// # Read Album.
///
/// The directory name is the album, and its parent the album artist.
fn read_album(src: &Path) -> Result<(Album, Vec<Track>), RipStreamError> {
	let mut files = read_dir(src, |p| p.is_file() && audio_kind(p).is_some())?;
	files.sort();

	let uri = format!("{PREFIX_ALBUM}{}", src.to_string_lossy());
	let name = file_stem(src);
	let artist = src.parent().map_or_else(|| "Unknown Artist".to_owned(), file_stem);
	let album = Album::new(uri, name, artist.as_str());
	let tracks = files.iter()
		.zip(1_u16..)
		.map(|(path, idx)|
			load_track(path)
				.with_album(album.clone())
				.with_index(idx)
		)
		.collect();

	Ok((album, tracks))
}

/// # Read Directory.
///
/// Return the paths within `src` matching the callback, unsorted.
fn read_dir<F>(src: &Path, cb: F) -> Result<Vec<PathBuf>, RipStreamError>
where F: Fn(&Path) -> bool {
	let out = std::fs::read_dir(src)
		.map_err(|_| RipStreamError::Read(src.to_string_lossy().into_owned()))?
		.filter_map(|e| {
			let path = e.ok()?.path();
			if cb(&path) { Some(path) }
			else { None }
		})
		.collect();
	Ok(out)
}

/// # Read Full.
///
/// Fill as much of `buf` as possible, returning the length read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> usize {
	let mut len = 0;
	while len < buf.len() {
		match r.read(&mut buf[len..]) {
			Ok(0) | Err(_) => break,
			Ok(n) => len += n,
		}
	}
	len
}

/// # Read Playlist.
///
/// Return the owner directive, if any, and the entries.
fn read_playlist(src: &Path) -> Result<(Option<String>, Vec<String>), RipStreamError> {
	let raw = std::fs::read_to_string(src)
		.map_err(|_| RipStreamError::Read(src.to_string_lossy().into_owned()))?;

	let mut owner = None;
	let mut entries = Vec::new();
	for line in raw.lines() {
		let line = line.trim();
		if let Some(o) = line.strip_prefix(OWNER) {
			let o = o.trim();
			if ! o.is_empty() { owner.replace(o.to_owned()); }
		}
		else if is_entry(line) { entries.push(line.to_owned()); }
	}

	Ok((owner, entries))
}
