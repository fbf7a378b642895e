/*!
# Rip Stream: Failure Ledger
*/

use crate::{
	RipStreamError,
	Track,
};
use fyi_msg::Msg;
use std::{
	fs::File,
	io::{
		BufWriter,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
};



#[derive(Debug, Default)]
/// # Failure Ledger.
///
/// This keeps track of how each track in the run turned out, and optionally
/// writes the URIs of the failures to a log file as they happen so they can
/// be retried later.
pub struct FailureLedger {
	/// # Succeeded.
	succeeded: Vec<Track>,

	/// # Failed.
	failed: Vec<(Track, RipStreamError)>,

	/// # Skipped.
	skipped: Vec<Track>,

	/// # Log File.
	log: Option<(PathBuf, BufWriter<File>)>,
}

impl Drop for FailureLedger {
	fn drop(&mut self) { self.finish(); }
}

impl FailureLedger {
	/// # New.
	///
	/// If `log` is provided, that file is created (or truncated) right away.
	///
	/// ## Errors
	///
	/// Returns an error if the log's parent directory or the log itself
	/// cannot be created.
	pub fn new(log: Option<PathBuf>) -> Result<Self, RipStreamError> {
		let log = match log {
			Some(path) => {
				if let Some(parent) = path.parent().filter(|p| ! p.as_os_str().is_empty()) {
					std::fs::create_dir_all(parent)
						.map_err(|_| RipStreamError::Dir(parent.to_string_lossy().into_owned()))?;
				}
				let file = File::create(&path)
					.map_err(|_| RipStreamError::Write(path.to_string_lossy().into_owned()))?;
				Some((path, BufWriter::new(file)))
			},
			None => None,
		};

		Ok(Self {
			succeeded: Vec::new(),
			failed: Vec::new(),
			skipped: Vec::new(),
			log,
		})
	}

	/// # Record Success.
	pub fn succeeded(&mut self, track: Track) { self.succeeded.push(track); }

	/// # Record Skip.
	pub fn skipped(&mut self, track: Track) { self.skipped.push(track); }

	/// # Record Failure.
	///
	/// The track's URI is written to the log immediately, if there is one.
	pub fn failed(&mut self, track: Track, err: RipStreamError) {
		if let Some((path, file)) = self.log.as_mut() {
			let res = writeln!(file, "{}", track.uri()).and_then(|()| file.flush());
			if res.is_err() {
				Msg::warning(format!(
					"Unable to record failure in {}.",
					path.to_string_lossy(),
				)).eprint();
			}
		}
		self.failed.push((track, err));
	}

	/// # Finish.
	///
	/// Close the log file, deleting it if nothing failed. The path is
	/// returned if the log was kept.
	///
	/// This is idempotent; later calls do nothing.
	pub fn finish(&mut self) -> Option<PathBuf> {
		let (path, file) = self.log.take()?;
		if let Ok(file) = file.into_inner() {
			let _res = file.sync_all();
		}

		if self.failed.is_empty() {
			let _res = std::fs::remove_file(&path);
			None
		}
		else { Some(path) }
	}
}

/// # Getters.
impl FailureLedger {
	#[must_use]
	/// # Succeeded Tracks.
	pub fn succeeded_tracks(&self) -> &[Track] { &self.succeeded }

	#[must_use]
	/// # Failed Tracks.
	pub fn failed_tracks(&self) -> &[(Track, RipStreamError)] { &self.failed }

	#[must_use]
	/// # Skipped Tracks.
	pub fn skipped_tracks(&self) -> &[Track] { &self.skipped }

	#[must_use]
	/// # Log Path.
	///
	/// This is only available until [`FailureLedger::finish`] is called.
	pub fn log_path(&self) -> Option<&Path> {
		self.log.as_ref().map(|(p, _)| p.as_path())
	}

	#[must_use]
	/// # Attempted.
	///
	/// The number of tracks that were actually ripped or tried to be, i.e.
	/// everything but the skips.
	pub fn attempted(&self) -> usize { self.succeeded.len() + self.failed.len() }

	#[must_use]
	/// # Total.
	pub fn total(&self) -> usize {
		self.succeeded.len() + self.failed.len() + self.skipped.len()
	}
}
