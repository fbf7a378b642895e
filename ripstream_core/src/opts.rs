/*!
# Rip Stream: Ripping Options
*/

use crate::RipStreamError;
use std::{
	fmt,
	path::{
		Path,
		PathBuf,
	},
	time::Duration,
};



/// # FLAG: Constant Bitrate.
const FLAG_CBR: u8 =        0b0000_0001;

/// # FLAG: Overwrite Existing Files.
const FLAG_OVERWRITE: u8 =  0b0000_0010;

/// # FLAG: Remove From Playlist.
const FLAG_REMOVE: u8 =     0b0000_0100;

/// # FLAG: Verbose.
const FLAG_VERBOSE: u8 =    0b0000_1000;

/// # FLAG: Default.
const FLAG_DEFAULT: u8 = 0;

/// # Default Path Template.
pub(crate) const DEFAULT_TEMPLATE: &str = "{album_artist}/{album}/{artist} - {track_name}.{ext}";

/// # Default Stall Timeout (Seconds).
const STALL_DEFAULT: u64 = 60;

/// # Maximum Compression Level.
const COMP_MAX: u8 = 10;

/// # Minimum Constant Bitrate.
const BITRATE_MIN: u16 = 32;

/// # Maximum Constant Bitrate.
const BITRATE_MAX: u16 = 512;



#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
/// # Output Format.
pub enum OutputFormat {
	/// # AAC (faac).
	Aac,

	/// # FLAC (flac).
	Flac,

	/// # M4A (fdkaac).
	M4a,

	#[default]
	/// # MP3 (lame).
	Mp3,

	/// # Ogg Vorbis (oggenc).
	Ogg,

	/// # Opus (opusenc).
	Opus,

	/// # Raw PCM.
	Pcm,

	/// # WAV.
	Wav,
}

impl fmt::Display for OutputFormat {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

impl TryFrom<&str> for OutputFormat {
	type Error = RipStreamError;

	fn try_from(src: &str) -> Result<Self, Self::Error> {
		let src = src.trim();
		Self::ALL.into_iter()
			.find(|f| f.extension().eq_ignore_ascii_case(src))
			.ok_or(RipStreamError::Noop)
	}
}

impl OutputFormat {
	/// # All Formats.
	pub const ALL: [Self; 8] = [
		Self::Aac, Self::Flac, Self::M4a, Self::Mp3,
		Self::Ogg, Self::Opus, Self::Pcm, Self::Wav,
	];

	#[must_use]
	/// # File Extension.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::Aac => "aac",
			Self::Flac => "flac",
			Self::M4a => "m4a",
			Self::Mp3 => "mp3",
			Self::Ogg => "ogg",
			Self::Opus => "opus",
			Self::Pcm => "pcm",
			Self::Wav => "wav",
		}
	}

	#[must_use]
	/// # Raw?
	///
	/// Returns `true` for formats written directly, without an encoder.
	pub const fn is_raw(self) -> bool { matches!(self, Self::Pcm | Self::Wav) }
}



#[derive(Debug, Clone)]
/// # Rip Options.
///
/// This struct holds the rip-related options like output format, bitrate,
/// destination, etc.
///
/// Options are set using builder-style methods, like:
///
/// ```
/// use ripstream_core::{
///     OutputFormat,
///     RipOptions,
/// };
///
/// let opts = RipOptions::default()
///     .with_format(OutputFormat::Ogg)
///     .with_cbr(true)
///     .with_bitrate(256);
///
/// assert_eq!(opts.format(), OutputFormat::Ogg);
/// assert!(opts.cbr());
/// assert_eq!(opts.bitrate(), 256);
/// ```
pub struct RipOptions {
	format: OutputFormat,
	flags: u8,
	bitrate: u16,
	vbr: u16,
	comp: u8,
	base_dir: PathBuf,
	template: String,
	fail_log: Option<String>,
	stall: Option<Duration>,
}

impl Default for RipOptions {
	fn default() -> Self {
		Self {
			format: OutputFormat::default(),
			flags: FLAG_DEFAULT,
			bitrate: 320,
			vbr: 0,
			comp: 5,
			base_dir: PathBuf::from("."),
			template: DEFAULT_TEMPLATE.to_owned(),
			fail_log: None,
			stall: Some(Duration::from_secs(STALL_DEFAULT)),
		}
	}
}

macro_rules! with_flag {
	($fn:ident, $flag:ident, $($doc:literal),+ $(,)?) => (
		#[must_use]
		$(
			#[doc = $doc]
		)+
		pub fn $fn(self, v: bool) -> Self {
			let flags =
				if v { self.flags | $flag }
				else { self.flags & ! $flag };

			Self {
				flags,
				..self
			}
		}
	)
}

/// ## Setters.
impl RipOptions {
	#[must_use]
	/// # Base Directory.
	///
	/// All output paths, playlists, and the failure log are relative to this
	/// directory.
	///
	/// The default is the current working directory.
	pub fn with_base_dir<P>(self, base_dir: P) -> Self
	where P: AsRef<Path> {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			..self
		}
	}

	#[must_use]
	/// # Constant Bitrate (kbps).
	///
	/// This only applies when [`RipOptions::cbr`] is enabled. Values are
	/// capped to `32..=512`.
	///
	/// The default is `320`.
	pub fn with_bitrate(self, bitrate: u16) -> Self {
		Self {
			bitrate: bitrate.clamp(BITRATE_MIN, BITRATE_MAX),
			..self
		}
	}

	with_flag!(
		with_cbr,
		FLAG_CBR,
		"# Constant Bitrate.",
		"",
		"When `true`, encoders are asked for a constant bitrate. When `false`,",
		"the variable bitrate quality setting is used instead.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Compression Level.
	///
	/// This applies to FLAC and Opus only. Values are capped to `0..=10`,
	/// though FLAC itself tops out at `8`.
	///
	/// The default is `5`.
	pub fn with_comp(self, comp: u8) -> Self {
		Self {
			comp: comp.min(COMP_MAX),
			..self
		}
	}

	#[must_use]
	/// # Failure Log.
	///
	/// If set, the URIs of failed tracks will be written to this file
	/// (relative to the base directory). The file is removed at the end of
	/// the run if nothing failed.
	pub fn with_fail_log<S>(self, fail_log: Option<S>) -> Self
	where S: Into<String> {
		Self {
			fail_log: fail_log.map(Into::into).filter(|s| ! s.trim().is_empty()),
			..self
		}
	}

	#[must_use]
	/// # Output Format.
	///
	/// The default is MP3.
	pub fn with_format(self, format: OutputFormat) -> Self {
		Self {
			format,
			..self
		}
	}

	with_flag!(
		with_overwrite,
		FLAG_OVERWRITE,
		"# Overwrite.",
		"",
		"When `true`, tracks are re-ripped even if the destination file",
		"already exists. When `false`, such tracks are skipped.",
		"",
		"The default is `false`.",
	);

	with_flag!(
		with_remove_from_playlist,
		FLAG_REMOVE,
		"# Remove From Playlist.",
		"",
		"When `true`, tracks that were ripped or skipped are removed from their",
		"source playlist at the end of the run, provided the logged-in user",
		"owns it.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Stall Timeout.
	///
	/// Give up on a track if no frames arrive for this long. `None` waits
	/// forever.
	///
	/// The default is sixty seconds.
	pub fn with_stall_timeout(self, stall: Option<Duration>) -> Self {
		Self {
			stall: stall.filter(|d| ! d.is_zero()),
			..self
		}
	}

	#[must_use]
	/// # Path Template.
	///
	/// See [`track_path`](crate::track_path) for the supported tags. Empty
	/// values are ignored.
	pub fn with_template<S>(self, template: S) -> Self
	where S: AsRef<str> {
		let template = template.as_ref().trim();
		if template.is_empty() { self }
		else {
			Self {
				template: template.to_owned(),
				..self
			}
		}
	}

	with_flag!(
		with_verbose,
		FLAG_VERBOSE,
		"# Verbose.",
		"",
		"When `true`, a plain-text log of each track's outcome is printed to",
		"STDOUT at the end of the run.",
		"",
		"The default is `false`.",
	);

	#[must_use]
	/// # Variable Bitrate Quality.
	///
	/// This is passed through as-is to whichever encoder is in use, so its
	/// meaning varies from format to format.
	///
	/// The default is `0`.
	pub fn with_vbr(self, vbr: u16) -> Self {
		Self {
			vbr,
			..self
		}
	}
}



macro_rules! get_flag {
	($fn:ident, $flag:ident, $title:literal) => (
		#[must_use]
		#[doc = concat!("# ", $title, "?")]
		pub const fn $fn(&self) -> bool { $flag == self.flags & $flag }
	);
}

/// # Getters.
impl RipOptions {
	get_flag!(cbr, FLAG_CBR, "Constant Bitrate");
	get_flag!(overwrite, FLAG_OVERWRITE, "Overwrite");
	get_flag!(remove_from_playlist, FLAG_REMOVE, "Remove From Playlist");
	get_flag!(verbose, FLAG_VERBOSE, "Verbose");

	#[must_use]
	/// # Base Directory.
	pub fn base_dir(&self) -> &Path { &self.base_dir }

	#[must_use]
	/// # Constant Bitrate.
	pub const fn bitrate(&self) -> u16 { self.bitrate }

	#[must_use]
	/// # Encoder Bitrate.
	///
	/// The constant bitrate actually handed to the encoder. Opus is fed both
	/// channels at once, so it gets half.
	pub const fn encoder_bitrate(&self) -> u16 {
		if matches!(self.format, OutputFormat::Opus) { self.bitrate.wrapping_div(2) }
		else { self.bitrate }
	}

	#[must_use]
	/// # Compression Level.
	pub const fn comp(&self) -> u8 { self.comp }

	#[must_use]
	/// # Failure Log Path.
	pub fn fail_log(&self) -> Option<PathBuf> {
		self.fail_log.as_ref().map(|f| self.base_dir.join(f))
	}

	#[must_use]
	/// # Output Format.
	pub const fn format(&self) -> OutputFormat { self.format }

	#[must_use]
	/// # Stall Timeout.
	pub const fn stall_timeout(&self) -> Option<Duration> { self.stall }

	#[must_use]
	/// # Path Template.
	pub fn template(&self) -> &str { &self.template }

	#[must_use]
	/// # Variable Bitrate Quality.
	pub const fn vbr(&self) -> u16 { self.vbr }
}
