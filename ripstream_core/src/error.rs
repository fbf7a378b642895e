/*!
# Rip Stream: Errors
*/

#[cfg(feature = "bin")]
use fyi_ansi::{
	ansi,
	csi,
};
use fyi_msg::Msg;
use std::{
	error::Error,
	fmt,
};



#[cfg(feature = "bin")]
/// # Help Text.
const HELP: &str = concat!(r#"
    .--.
   |o_o |     "#, csi!(199), "Rip Stream", ansi!((cornflower_blue) " v", env!("CARGO_PKG_VERSION")), r#"
   |:_/ |     Rip streamed tracks into
  //   \ \    properly closed audio files.
 (|     | )
/'\_   _/`\
\___)=(___/

USAGE:
    ripstream [OPTIONS] <URI(s)>...

LOGIN:
    -u, --user <USER> Log in as <USER>.
    -p, --password <PASS>
                      The password to use with -u/--user (required).
    -l, --last        Log in as the most recently remembered user instead.
        --settings <FILE>
                      Where to remember the last user. [default: none]

OUTPUT:
    -d, --directory <DIR>
                      The base directory for ripped files and playlists.
                      [default: ./]
    -f, --format <TEMPLATE>
                      The (relative) output path template. Tags like {artist},
                      {album}, {track_name}, {track_num:2}, {idx}, {ext}, etc.,
                      are replaced with the corresponding track values.
                      [default: {album_artist}/{album}/{artist} - {track_name}.{ext}]
    -o, --output-type <TYPE>
                      One of aac, flac, m4a, mp3, ogg, opus, pcm, or wav.
                      [default: mp3]
        --overwrite   Re-rip tracks even if the destination already exists.

ENCODING:
    -b, --bitrate <KBPS>
                      The constant bitrate to use with --cbr. [default: 320]
        --cbr         Encode at a constant bitrate rather than a variable one.
        --comp <NUM>  The compression level for FLAC and Opus. [default: 5]
        --vbr <NUM>   The variable bitrate quality setting, passed straight
                      through to the encoder. [default: 0]

PLAYLISTS:
        --fail-log <FILE>
                      Record the URIs of failed tracks in <FILE>, relative to
                      the base directory. The file is removed if nothing
                      fails.
    -r, --remove-from-playlist
                      Remove ripped (or already-present) tracks from their
                      source playlist once the run has finished. This only
                      works for playlists owned by the logged-in user.

MISCELLANEOUS:
    -h, --help        Print help information to STDOUT and exit.
        --timeout <SECS>
                      Give up on a track if no audio arrives for this many
                      seconds. Use 0 to wait forever. [default: 60]
    -v, --verbose     Print a plain-text log of each track's outcome to
                      STDOUT.
    -V, --version     Print version information to STDOUT and exit.

URIS:
    Tracks are resolved by the session. The bundled local session understands
    local:track:<FILE>, local:album:<DIR>, local:artist:<DIR>, and
    local:playlist:<FILE>. A path to an existing text file is treated as a
    list of URIs, one per line.

EARLY EXIT:
    Press "#, ansi!((dark_orange) "CTRL"), "+", ansi!((dark_orange) "C"), r#" to stop early. The partial track will be deleted,
    but everything else will be wrapped up properly.
"#);



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Errors.
pub enum RipStreamError {
	/// # Bug!
	Bug(&'static str),

	/// # Encoder pipe closed early.
	BrokenPipe(String),

	/// # Unable to create directory.
	Dir(String),

	/// # Encoder could not be started.
	EncoderSpawn(String),

	/// # User Abort.
	Killed,

	/// # Login failed.
	Login(String),

	/// # Logout did not settle.
	Logout,

	/// # Noop.
	Noop,

	/// # Play token lost.
	PlayTokenLost,

	/// # Playlist mutation failed.
	Playlist(String),

	/// # Unable to read a file.
	Read(String),

	/// # Generic session-layer error.
	Session(String),

	/// # Stalled Delivery.
	Stalled(u64),

	/// # Track not available.
	Unavailable(String),

	/// # URI could not be resolved.
	Uri(String),

	/// # Writing to disk.
	Write(String),

	#[cfg(feature = "bin")]
	/// # Invalid CLI arg.
	CliArg(String),

	#[cfg(feature = "bin")]
	/// # CLI Parsing failure.
	CliParse(&'static str),

	#[cfg(feature = "bin")]
	/// # Missing Password.
	NoPassword,

	#[cfg(feature = "bin")]
	/// # Print Help (Not an Error).
	PrintHelp,

	#[cfg(feature = "bin")]
	/// # Print Version (Not an Error).
	PrintVersion,
}

impl Error for RipStreamError {}

impl From<RipStreamError> for Msg {
	#[inline]
	fn from(src: RipStreamError) -> Self { Self::error(src.to_string()) }
}

impl fmt::Display for RipStreamError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bug(s) => write!(f, "Bug: {s}."),
			Self::BrokenPipe(s) => write!(f, "The encoder closed its input early ({s})."),
			Self::Dir(s) => write!(f, "Unable to create directory {s}."),
			Self::EncoderSpawn(s) => write!(f, "Unable to launch the {s} encoder; is it installed?"),
			Self::Killed => f.write_str("User abort."),
			Self::Login(s) => write!(f, "Login failed: {s}."),
			Self::Logout => f.write_str("The session did not confirm the logout."),
			Self::Noop => f.write_str("There's nothing to do!"),
			Self::PlayTokenLost => f.write_str("Play token lost; the account is being used elsewhere."),
			Self::Playlist(s) => write!(f, "Unable to update playlist {s}."),
			Self::Read(s) => write!(f, "Unable to read {s}."),
			Self::Session(s) => write!(f, "Session error: {s}."),
			Self::Stalled(n) => write!(f, "No audio was received for {n} seconds."),
			Self::Unavailable(s) => write!(f, "Track {s} is not available."),
			Self::Uri(s) => write!(f, "Unable to resolve {s}."),
			Self::Write(s) => write!(f, "Unable to write to {s}."),

			#[cfg(feature = "bin")]
			Self::CliArg(s) => write!(f, "Invalid CLI option: {s}"),

			#[cfg(feature = "bin")]
			Self::CliParse(s) => write!(f, "Unable to parse {s}."),

			#[cfg(feature = "bin")]
			Self::NoPassword => f.write_str("A password is required with -u/--user; pass it with -p/--password."),

			#[cfg(feature = "bin")]
			Self::PrintHelp => f.write_str(HELP),

			#[cfg(feature = "bin")]
			Self::PrintVersion => f.write_str(concat!("Rip Stream v", env!("CARGO_PKG_VERSION"))),
		}
	}
}
