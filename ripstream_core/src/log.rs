/*!
# Rip Stream: Log
*/

use crate::{
	Track,
	TrackOutcome,
};
use dactyl::NiceElapsed;
use std::{
	io::Write,
	time::{
		Duration,
		Instant,
	},
};
use utc2k::FmtUtc2k;



/// # Super Basic Log.
///
/// This holds the log-worthy details from each track, printing them out en
/// masse at the end of the run.
///
/// Doing it this way, versus printing each line in realtime, keeps the log
/// from getting tangled up with the progress bar.
pub(crate) struct RipLog {
	/// # Run Start.
	start: Instant,

	/// # Entries.
	entries: Vec<RipLogEntry>,
}

impl Drop for RipLog {
	/// # Final Print.
	fn drop(&mut self) { self.flush(); }
}

impl RipLog {
	/// # New Instance.
	pub(crate) fn new() -> Self {
		Self {
			start: Instant::now(),
			entries: Vec::new(),
		}
	}

	/// # Add Entry.
	pub(crate) fn add(&mut self, track: &Track, outcome: &TrackOutcome, elapsed: Duration) {
		let (kind, note) = match outcome {
			TrackOutcome::Succeeded { warning: None } => (RipLogKind::Ripped, None),
			TrackOutcome::Succeeded { warning: Some(code) } =>
				(RipLogKind::Ripped, Some(format!("encoder exit code {code}"))),
			TrackOutcome::Skipped => (RipLogKind::Skipped, None),
			TrackOutcome::Failed(e) => (RipLogKind::Failed, Some(e.to_string())),
			TrackOutcome::Aborted(e) => (RipLogKind::Aborted, Some(e.to_string())),
		};

		self.entries.push(RipLogEntry {
			time: FmtUtc2k::now(),
			uri: track.uri().to_owned(),
			kind,
			elapsed,
			note,
		});
	}

	/// # Flush.
	fn flush(&mut self) {
		if self.entries.is_empty() { return; }

		let writer = std::io::stdout();
		let mut handle = writer.lock();
		let count = |k: RipLogKind| self.entries.iter().filter(|e| e.kind == k).count();
		let _res = writeln!(
			&mut handle,
			r"##
## Run: {}
## Ripped: {}
## Skipped: {}
## Failed: {}
##",
			NiceElapsed::from(self.start),
			count(RipLogKind::Ripped),
			count(RipLogKind::Skipped),
			count(RipLogKind::Failed) + count(RipLogKind::Aborted),
		);

		for e in self.entries.drain(..) {
			let _res = write!(
				&mut handle,
				"[{}] {:<7}  {}  {}",
				e.time,
				e.kind.as_str(),
				e.uri,
				NiceElapsed::from(e.elapsed),
			);
			let _res =
				if let Some(note) = e.note { writeln!(&mut handle, "  ({note})") }
				else { writeln!(&mut handle) };
		}

		// Write it!
		let _res = handle.flush();
	}
}



/// # Log Entry.
struct RipLogEntry {
	/// # Timestamp.
	time: FmtUtc2k,

	/// # Track URI.
	uri: String,

	/// # Outcome.
	kind: RipLogKind,

	/// # Time Spent.
	elapsed: Duration,

	/// # Extra Details.
	note: Option<String>,
}



#[derive(Debug, Clone, Copy, Eq, PartialEq)]
/// # Outcome Kind.
enum RipLogKind {
	Ripped,
	Skipped,
	Failed,
	Aborted,
}

impl RipLogKind {
	/// # As Str.
	const fn as_str(self) -> &'static str {
		match self {
			Self::Ripped => "RIPPED",
			Self::Skipped => "SKIPPED",
			Self::Failed => "FAILED",
			Self::Aborted => "ABORTED",
		}
	}
}
