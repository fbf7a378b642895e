/*!
# Rip Stream: Playlist Removal Queue
*/

use crate::{
	Playlist,
	RipStreamError,
	Session,
	User,
};
use dactyl::traits::NiceInflection;
use fyi_msg::Msg;
use std::{
	collections::BTreeSet,
	time::Duration,
};



/// # Max Polls.
///
/// At the default 100ms interval, this gives the session a minute to sync
/// each playlist.
const MAX_POLLS: u32 = 600;



#[derive(Debug, Clone, Default)]
/// # Removal Queue.
///
/// Tracks to be removed from their source playlists are collected here over
/// the course of the run, then removed in one batch per playlist at the end.
/// Removing them as we go would shift the positions of everything after.
pub struct RemovalQueue {
	/// # Enabled?
	enabled: bool,

	/// # Queued Positions, by Playlist.
	queue: Vec<(Playlist, BTreeSet<usize>)>,

	/// # Positions Removed So Far.
	removed: usize,
}

impl RemovalQueue {
	#[must_use]
	/// # New.
	///
	/// A disabled queue ignores everything.
	pub const fn new(enabled: bool) -> Self {
		Self {
			enabled,
			queue: Vec::new(),
			removed: 0,
		}
	}

	#[must_use]
	/// # Is Empty?
	pub fn is_empty(&self) -> bool {
		self.queue.iter().all(|(_, v)| v.is_empty())
	}

	#[must_use]
	/// # Length.
	///
	/// The total number of queued positions across all playlists.
	pub fn len(&self) -> usize {
		self.queue.iter().map(|(_, v)| v.len()).sum()
	}

	#[must_use]
	/// # Removed.
	///
	/// The total number of positions successfully removed by all flushes so
	/// far, including partially failed ones.
	pub const fn removed(&self) -> usize { self.removed }

	/// # Queue Position.
	///
	/// Mark the zero-based `position` for removal from `playlist`. This only
	/// works if the queue is enabled, the track came from a playlist, and
	/// `user` owns that playlist; otherwise a warning is printed and `false`
	/// is returned.
	pub fn queue(&mut self, playlist: Option<&Playlist>, user: Option<&User>, position: usize)
	-> bool {
		if ! self.enabled { return false; }

		let Some(playlist) = playlist else {
			Msg::warning("This track is not from a playlist; there is nothing to remove it from.")
				.eprint();
			return false;
		};

		if ! user.is_some_and(|u| playlist.is_owned_by(u)) {
			Msg::warning(format!(
				"Tracks can only be removed from your own playlists; {} belongs to {}.",
				playlist.name(),
				playlist.owner().display(),
			)).eprint();
			return false;
		}

		if let Some((_, set)) = self.queue.iter_mut().find(|(p, _)| p.uri() == playlist.uri()) {
			set.insert(position);
		}
		else {
			self.queue.push((playlist.clone(), BTreeSet::from([position])));
		}

		true
	}

	/// # Flush.
	///
	/// Issue one removal per playlist, then poll every `interval` until the
	/// session reports the changes have settled. Returns the number of
	/// positions removed.
	///
	/// ## Errors
	///
	/// Every playlist is attempted regardless, but if any removal is rejected
	/// the first such error is returned.
	pub fn flush<S>(&mut self, session: &mut S, interval: Duration)
	-> Result<usize, RipStreamError>
	where S: Session + ?Sized {
		let mut removed = 0;
		let mut err = None;
		for (playlist, set) in std::mem::take(&mut self.queue) {
			if set.is_empty() { continue; }
			let positions: Vec<usize> = set.into_iter().collect();

			Msg::custom("Removing", 199, &format!(
				"{} from {}…",
				positions.len().nice_inflect("track", "tracks"),
				playlist.name(),
			))
				.with_newline(true)
				.eprint();

			if let Err(e) = session.remove_tracks(&playlist, &positions) {
				Msg::from(e.clone()).eprint();
				if err.is_none() { err.replace(e); }
				continue;
			}

			// Wait for it to sync.
			let mut polls = 0;
			while session.has_pending_changes(&playlist) {
				if MAX_POLLS <= polls {
					Msg::warning(format!(
						"Changes to {} are still pending; giving up on the wait.",
						playlist.name(),
					)).eprint();
					break;
				}
				polls += 1;
				std::thread::sleep(interval);
			}

			removed += positions.len();
		}
		self.removed += removed;

		match err {
			Some(e) => Err(e),
			None => Ok(removed),
		}
	}
}
