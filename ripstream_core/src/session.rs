/*!
# Rip Stream: Session Collaborator

The streaming session is a black box as far as the ripper is concerned: it
logs in and out, resolves URIs, and plays tracks, reporting back through a
handful of callbacks that may fire from its own thread.
*/

use crate::{
	CHANNELS,
	RipStreamError,
	SAMPLE_RATE,
};
use std::{
	path::Path,
	sync::Arc,
	time::Duration,
};



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Audio Format.
///
/// Delivered frames are always interleaved, signed 16-bit little-endian
/// samples; only the rate and channel count vary.
pub struct AudioFormat {
	/// # Sample Rate.
	pub sample_rate: u32,

	/// # Channels.
	pub channels: u16,
}

impl Default for AudioFormat {
	fn default() -> Self {
		Self {
			sample_rate: SAMPLE_RATE,
			channels: CHANNELS,
		}
	}
}

impl AudioFormat {
	#[must_use]
	/// # Bytes Per Frame.
	pub const fn bytes_per_frame(self) -> usize { self.channels as usize * 2 }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Connection State.
pub enum ConnectionState {
	/// # Logged Out.
	LoggedOut,

	/// # Logged In.
	LoggedIn,

	/// # Login Attempt Failed.
	Failed(String),
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Login Method.
pub enum Login {
	/// # Username and Password.
	Password {
		/// # User.
		user: String,

		/// # Password.
		password: String,
	},

	/// # Whoever Logged In Last.
	Remembered,
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # User.
pub struct User {
	/// # Canonical (Unique) Name.
	canonical: String,

	/// # Display Name.
	display: String,
}

impl User {
	#[must_use]
	/// # New.
	///
	/// The display name defaults to the canonical one.
	pub fn new<S>(canonical: S) -> Self
	where S: Into<String> {
		let canonical = canonical.into();
		let display = canonical.clone();
		Self { canonical, display }
	}

	#[must_use]
	/// # With Display Name.
	pub fn with_display<S>(self, display: S) -> Self
	where S: Into<String> {
		Self {
			display: display.into(),
			..self
		}
	}

	#[must_use]
	/// # Canonical Name.
	pub fn canonical(&self) -> &str { &self.canonical }

	#[must_use]
	/// # Display Name.
	pub fn display(&self) -> &str { &self.display }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Album.
pub struct Album {
	/// # URI.
	uri: String,

	/// # Name.
	name: String,

	/// # Album Artist.
	artist: String,

	/// # Release Year.
	year: u16,
}

impl Album {
	#[must_use]
	/// # New.
	pub fn new<S, T, U>(uri: S, name: T, artist: U) -> Self
	where S: Into<String>, T: Into<String>, U: Into<String> {
		Self {
			uri: uri.into(),
			name: name.into(),
			artist: artist.into(),
			year: 0,
		}
	}

	#[must_use]
	/// # With Year.
	pub fn with_year(self, year: u16) -> Self { Self { year, ..self } }

	#[must_use]
	/// # URI.
	pub fn uri(&self) -> &str { &self.uri }

	#[must_use]
	/// # Name.
	pub fn name(&self) -> &str { &self.name }

	#[must_use]
	/// # Album Artist.
	pub fn artist(&self) -> &str { &self.artist }

	#[must_use]
	/// # Year.
	pub const fn year(&self) -> u16 { self.year }
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Playlist.
pub struct Playlist {
	/// # URI.
	uri: String,

	/// # Name.
	name: String,

	/// # Owner.
	owner: User,
}

impl Playlist {
	#[must_use]
	/// # New.
	pub fn new<S, T>(uri: S, name: T, owner: User) -> Self
	where S: Into<String>, T: Into<String> {
		Self {
			uri: uri.into(),
			name: name.into(),
			owner,
		}
	}

	#[must_use]
	/// # URI.
	pub fn uri(&self) -> &str { &self.uri }

	#[must_use]
	/// # Name.
	pub fn name(&self) -> &str { &self.name }

	#[must_use]
	/// # Owner.
	pub const fn owner(&self) -> &User { &self.owner }

	#[must_use]
	/// # Owned By?
	pub fn is_owned_by(&self, user: &User) -> bool {
		self.owner.canonical == user.canonical
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Track.
///
/// Tracks belong to the session; the ripper only ever reads them.
pub struct Track {
	/// # URI.
	uri: String,

	/// # Name.
	name: String,

	/// # Artist(s).
	artists: Vec<String>,

	/// # Album.
	album: Option<Album>,

	/// # Track Number.
	index: u16,

	/// # Disc Number.
	disc: u16,

	/// # Duration.
	duration: Duration,

	/// # Available?
	available: bool,
}

impl Track {
	#[must_use]
	/// # New.
	///
	/// Tracks start out available, with no artists, album, or duration.
	pub fn new<S, T>(uri: S, name: T) -> Self
	where S: Into<String>, T: Into<String> {
		Self {
			uri: uri.into(),
			name: name.into(),
			artists: Vec::new(),
			album: None,
			index: 0,
			disc: 1,
			duration: Duration::ZERO,
			available: true,
		}
	}

	#[must_use]
	/// # With Album.
	pub fn with_album(self, album: Album) -> Self {
		Self {
			album: Some(album),
			..self
		}
	}

	#[must_use]
	/// # With Artist.
	pub fn with_artist<S>(mut self, artist: S) -> Self
	where S: Into<String> {
		self.artists.push(artist.into());
		self
	}

	#[must_use]
	/// # With Availability.
	pub fn with_available(self, available: bool) -> Self {
		Self { available, ..self }
	}

	#[must_use]
	/// # With Disc Number.
	pub fn with_disc(self, disc: u16) -> Self { Self { disc, ..self } }

	#[must_use]
	/// # With Duration.
	pub fn with_duration(self, duration: Duration) -> Self {
		Self { duration, ..self }
	}

	#[must_use]
	/// # With Track Number.
	pub fn with_index(self, index: u16) -> Self { Self { index, ..self } }
}

impl Track {
	#[must_use]
	/// # URI.
	pub fn uri(&self) -> &str { &self.uri }

	#[must_use]
	/// # Name.
	pub fn name(&self) -> &str { &self.name }

	#[must_use]
	/// # Artists.
	pub fn artists(&self) -> &[String] { &self.artists }

	#[must_use]
	/// # Primary Artist.
	pub fn artist(&self) -> &str {
		self.artists.first().map_or("Unknown Artist", String::as_str)
	}

	#[must_use]
	/// # Album.
	pub const fn album(&self) -> Option<&Album> { self.album.as_ref() }

	#[must_use]
	/// # Track Number.
	pub const fn index(&self) -> u16 { self.index }

	#[must_use]
	/// # Disc Number.
	pub const fn disc(&self) -> u16 { self.disc }

	#[must_use]
	/// # Duration.
	pub const fn duration(&self) -> Duration { self.duration }

	#[must_use]
	/// # Available?
	pub const fn is_available(&self) -> bool { self.available }

	#[must_use]
	/// # Display Name.
	///
	/// This is "Artist - Name".
	pub fn display_name(&self) -> String {
		format!("{} - {}", self.artist(), self.name)
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Resolved URI.
pub enum Resolved {
	/// # A Single Track.
	Track(Track),

	/// # A Playlist and Its Tracks.
	///
	/// Track order matches playlist position.
	Playlist(Playlist, Vec<Track>),

	/// # An Album and Its Tracks.
	Album(Album, Vec<Track>),

	/// # An Artist's Tracks.
	Artist(Vec<Track>),
}

impl Resolved {
	#[must_use]
	/// # Into Parts.
	///
	/// Split into the track list and the source playlist, if any.
	pub fn into_parts(self) -> (Vec<Track>, Option<Playlist>) {
		match self {
			Self::Track(t) => (vec![t], None),
			Self::Playlist(p, t) => (t, Some(p)),
			Self::Album(_, t) | Self::Artist(t) => (t, None),
		}
	}
}



/// # Session Events.
///
/// These are the callbacks a session fires, potentially from its own thread.
pub trait SessionEvents: Send + Sync {
	/// # Connection State Changed.
	fn connection_state_changed(&self, state: ConnectionState);

	/// # Frames Delivered.
	///
	/// Return the number of frames accepted. Sessions are expected to
	/// redeliver whatever was not.
	fn frame_delivered(&self, format: AudioFormat, frames: &[u8], num_frames: usize) -> usize;

	/// # End of Track.
	fn end_of_track(&self);

	/// # Play Token Lost.
	///
	/// The account started playing somewhere else.
	fn play_token_lost(&self);
}



/// # Streaming Session.
pub trait Session {
	/// # Register Event Handler.
	fn set_events(&mut self, events: Arc<dyn SessionEvents>);

	/// # Log In.
	///
	/// This starts the process; the outcome is reported via
	/// [`SessionEvents::connection_state_changed`].
	///
	/// ## Errors
	///
	/// Returns an error if the attempt could not even be started.
	fn login(&mut self, login: &Login) -> Result<(), RipStreamError>;

	/// # Log Out.
	///
	/// As with login, completion is signaled through the connection state
	/// callback.
	fn logout(&mut self);

	/// # Current User.
	fn user(&self) -> Option<User>;

	/// # Resolve URI.
	///
	/// ## Errors
	///
	/// Returns an error if the URI is unsupported or cannot be loaded.
	fn resolve(&mut self, uri: &str) -> Result<Resolved, RipStreamError>;

	/// # Load Track.
	///
	/// ## Errors
	///
	/// Returns an error if the track cannot be loaded for playback.
	fn load(&mut self, track: &Track) -> Result<(), RipStreamError>;

	/// # Play.
	///
	/// Start delivering frames for the loaded track.
	///
	/// ## Errors
	///
	/// Returns an error if playback cannot be started.
	fn play(&mut self) -> Result<(), RipStreamError>;

	/// # Stop.
	fn stop(&mut self);

	/// # Remove Tracks From Playlist.
	///
	/// Positions are zero-based and refer to the playlist as it was resolved.
	///
	/// ## Errors
	///
	/// Returns an error if the change is rejected outright.
	fn remove_tracks(&mut self, playlist: &Playlist, positions: &[usize])
	-> Result<(), RipStreamError>;

	/// # Playlist Changes Pending?
	fn has_pending_changes(&mut self, playlist: &Playlist) -> bool;

	/// # Display Name.
	///
	/// Reload the track metadata for summary purposes, if possible.
	fn display_name(&mut self, track: &Track) -> Option<String> {
		Some(track.display_name())
	}
}



/// # Metadata Tagger.
///
/// Called once for each successfully ripped file.
pub trait Tagger {
	/// # Tag File.
	///
	/// ## Errors
	///
	/// Tagging errors are reported as warnings; the rip still counts.
	fn tag(&mut self, dst: &Path, track: &Track) -> Result<(), RipStreamError>;
}

#[derive(Debug, Clone, Copy, Default)]
/// # No Tags.
///
/// A tagger that leaves files alone.
pub struct NoTags;

impl Tagger for NoTags {
	#[inline]
	fn tag(&mut self, _dst: &Path, _track: &Track) -> Result<(), RipStreamError> {
		Ok(())
	}
}



#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn t_track_display() {
		let track = Track::new("x:1", "Song");
		assert_eq!(track.display_name(), "Unknown Artist - Song");

		let track = track.with_artist("Band").with_artist("Guest");
		assert_eq!(track.display_name(), "Band - Song");
		assert_eq!(track.artists().len(), 2);
	}

	#[test]
	fn t_playlist_owner() {
		let me = User::new("me").with_display("Me!");
		let them = User::new("them");
		let list = Playlist::new("x:pl", "Mix", me.clone());
		assert!(list.is_owned_by(&me), "Owner mismatch.");
		assert!(! list.is_owned_by(&them), "Owner mismatch.");

		// Display names don't matter.
		assert!(list.is_owned_by(&User::new("me")), "Canonical names should suffice.");
	}

	#[test]
	fn t_resolved_parts() {
		let track = Track::new("x:1", "One");
		let list = Playlist::new("x:pl", "Mix", User::new("me"));

		let (tracks, pl) = Resolved::Track(track.clone()).into_parts();
		assert_eq!(tracks, vec![track.clone()]);
		assert!(pl.is_none(), "Tracks have no playlist.");

		let (tracks, pl) = Resolved::Playlist(list.clone(), vec![track.clone()]).into_parts();
		assert_eq!(tracks.len(), 1);
		assert_eq!(pl, Some(list));

		let (_, pl) = Resolved::Artist(vec![track]).into_parts();
		assert!(pl.is_none(), "Artists have no playlist.");
	}
}
