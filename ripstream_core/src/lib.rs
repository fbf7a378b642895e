/*!
# Rip Stream: Library
*/

#![deny(unsafe_code)]

#![warn(
	clippy::filetype_is_file,
	clippy::integer_division,
	clippy::needless_borrow,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::suboptimal_flops,
	clippy::unneeded_field_pattern,
	macro_use_extern_crate,
	missing_copy_implementations,
	missing_debug_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unreachable_pub,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![allow(
	clippy::doc_markdown,
	clippy::module_name_repetitions,
	clippy::redundant_pub_crate,
)]

mod abort;
mod delivery;
mod error;
mod job;
mod ledger;
mod local;
mod log;
mod opts;
mod removal;
mod run;
mod session;
mod signal;
mod sink;
mod template;
mod utility;

pub use abort::KillSwitch;
pub use delivery::Delivery;
pub use error::RipStreamError;
pub(crate) use job::RipJob;
pub use job::{
	TrackOutcome,
	TrackState,
};
pub use ledger::FailureLedger;
pub use local::LocalSession;
pub(crate) use log::RipLog;
pub use opts::{
	OutputFormat,
	RipOptions,
};
pub use removal::RemovalQueue;
pub use run::{
	Ripper,
	RunReport,
};
pub use session::{
	Album,
	AudioFormat,
	ConnectionState,
	Login,
	NoTags,
	Playlist,
	Resolved,
	Session,
	SessionEvents,
	Tagger,
	Track,
	User,
};
pub(crate) use signal::CompletionSignal;
pub use sink::{
	EncoderCommand,
	Sink,
	SinkKind,
};
pub use template::track_path;
pub(crate) use utility::{
	append_m3u,
	remove_partial,
};
pub use utility::{
	expected_size,
	nice_size,
};

#[cfg(test)] use tempfile as _;



/// # Sample Rate.
pub const SAMPLE_RATE: u32 = 44_100;

/// # Channels.
pub const CHANNELS: u16 = 2;

/// # Bytes Per Frame.
///
/// One 16-bit sample for each of the two channels.
pub const BYTES_PER_FRAME: u16 = CHANNELS * 2;

/// # Bytes Per Second (Raw).
pub const BYTES_PER_SECOND: u32 = SAMPLE_RATE * BYTES_PER_FRAME as u32;

/// # Maximum Path Component Length.
///
/// Most filesystems cap individual file and directory names at this many
/// bytes.
pub const MAX_COMPONENT_LEN: usize = 255;

/// # Playlist Extension.
pub const PLAYLIST_EXT: &str = "m3u";

/// # Wave Spec.
pub(crate) const WAVE_SPEC: hound::WavSpec = hound::WavSpec {
	channels: CHANNELS,
	sample_rate: SAMPLE_RATE,
	bits_per_sample: 16,
	sample_format: hound::SampleFormat::Int,
};
