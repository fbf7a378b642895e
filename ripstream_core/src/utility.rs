/*!
# Rip Stream: Utility
*/

use crate::{
	BYTES_PER_SECOND,
	OutputFormat,
	PLAYLIST_EXT,
	Playlist,
	RipOptions,
	RipStreamError,
};
use dactyl::NiceU64;
use fyi_msg::Msg;
use std::{
	fs::OpenOptions,
	io::Write,
	path::{
		Path,
		PathBuf,
	},
	time::Duration,
};



/// # Bytes in a KiB.
const KIB: u64 = 1024;

/// # Bytes in a MiB.
const MIB: u64 = 1024 * 1024;

/// # WAV Header Size.
const WAV_HEADER: u64 = 44;



/// # Append to Playlist File.
///
/// Add `dst` to `{base_dir}/{playlist name}.m3u`, creating it if needed. Paths
/// are written relative to the base directory when possible.
///
/// ## Errors
///
/// Returns an error if the file cannot be opened or written to.
pub(crate) fn append_m3u(base_dir: &Path, playlist: &Playlist, dst: &Path)
-> Result<PathBuf, RipStreamError> {
	let name = playlist.name().replace(['/', '\\'], "-");
	let name = name.trim();
	let name = if name.is_empty() { "playlist" } else { name };
	let file = base_dir.join(format!("{name}.{PLAYLIST_EXT}"));

	let line = dst.strip_prefix(base_dir).unwrap_or(dst);
	OpenOptions::new()
		.create(true)
		.append(true)
		.open(&file)
		.and_then(|mut f| writeln!(f, "{}", line.to_string_lossy()))
		.map_err(|_| RipStreamError::Write(file.to_string_lossy().into_owned()))?;

	Ok(file)
}

#[must_use]
/// # Expected Size.
///
/// Estimate the output size for a track of the given duration, if possible.
/// Variable bitrate encodings are anybody's guess.
pub fn expected_size(opts: &RipOptions, duration: Duration) -> Option<u64> {
	let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
	let format = opts.format();
	if format.is_raw() {
		let size = millis.saturating_mul(u64::from(BYTES_PER_SECOND)).wrapping_div(1000);
		if format == OutputFormat::Wav { Some(size + WAV_HEADER) }
		else { Some(size) }
	}
	else if opts.cbr() {
		// Kilobits to bytes.
		Some(millis.saturating_mul(u64::from(opts.encoder_bitrate())).wrapping_div(8))
	}
	else { None }
}

#[must_use]
/// # Nice Size.
///
/// Format a byte count for human eyes, e.g. "12.3 MiB".
pub fn nice_size(bytes: u64) -> String {
	if bytes < KIB { format!("{} B", NiceU64::from(bytes)) }
	else if bytes < MIB {
		format!("{} KiB", NiceU64::from(bytes.wrapping_div(KIB)))
	}
	else {
		let whole = bytes.wrapping_div(MIB);
		let tenth = (bytes % MIB).saturating_mul(10).wrapping_div(MIB);
		format!("{}.{tenth} MiB", NiceU64::from(whole))
	}
}

/// # Remove Partial Output.
///
/// Failed rips shouldn't leave half a file lying around.
pub(crate) fn remove_partial(dst: &Path) {
	if dst.exists() && std::fs::remove_file(dst).is_err() {
		Msg::warning(format!(
			"Unable to remove partial file {}.",
			dst.to_string_lossy(),
		)).eprint();
	}
}



#[cfg(test)]
mod test {
	use super::*;
	use crate::User;

	#[test]
	fn t_append_m3u() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let list = Playlist::new("x:pl", "Road/Trip", User::new("me"));

		let one = dir.path().join("A").join("one.mp3");
		let two = PathBuf::from("/elsewhere/two.mp3");
		let file = append_m3u(dir.path(), &list, &one).expect("Append failed.");
		assert_eq!(file, dir.path().join("Road-Trip.m3u"));
		append_m3u(dir.path(), &list, &two).expect("Append failed.");

		let raw = std::fs::read_to_string(&file).expect("Read failed.");
		assert_eq!(raw, "A/one.mp3\n/elsewhere/two.mp3\n");
	}

	#[test]
	fn t_expected_size() {
		let minute = Duration::from_secs(60);
		let opts = RipOptions::default().with_format(OutputFormat::Pcm);
		assert_eq!(expected_size(&opts, minute), Some(10_584_000));

		let opts = opts.with_format(OutputFormat::Wav);
		assert_eq!(expected_size(&opts, minute), Some(10_584_044));

		let opts = opts.with_format(OutputFormat::Mp3).with_bitrate(320);
		assert_eq!(expected_size(&opts, minute), None, "VBR is unknowable.");

		let opts = opts.with_cbr(true);
		assert_eq!(expected_size(&opts, minute), Some(2_400_000));

		// Opus is encoded at half the nominal rate.
		let opts = opts.with_format(OutputFormat::Opus);
		assert_eq!(expected_size(&opts, minute), Some(1_200_000));
	}

	#[test]
	fn t_nice_size() {
		assert_eq!(nice_size(512), "512 B");
		assert_eq!(nice_size(2048), "2 KiB");
		assert_eq!(nice_size(10_584_000), "10.0 MiB");
		assert_eq!(nice_size(MIB * 1500 + MIB / 2), "1,500.5 MiB");
	}

	#[test]
	fn t_remove_partial() {
		let dir = tempfile::tempdir().expect("Tempdir failed.");
		let dst = dir.path().join("partial.mp3");
		std::fs::write(&dst, b"abc").expect("Write failed.");
		remove_partial(&dst);
		assert!(! dst.exists(), "The file should be gone.");

		// Missing files are fine.
		remove_partial(&dst);
	}
}
