/*!
# Rip Stream: Path Templates
*/

use crate::{
	MAX_COMPONENT_LEN,
	Playlist,
	RipOptions,
	Track,
	User,
};
use std::path::PathBuf;
use trimothy::TrimMut;



/// # Track Path.
///
/// Expand the configured template for `track` and glue it onto the base
/// directory.
///
/// Tags look like `{name}` or, for numeric values, `{name:width}` to zero-fill.
/// Unrecognized tags are left as-is. Substituted values cannot introduce new
/// path segments; slashes within them are replaced with dashes.
///
/// `idx` is the track's zero-based position within its source list, and
/// `idx_width` the default zero-fill width for `{idx}` (`0` for none).
///
/// Each resulting segment is capped at `MAX_COMPONENT_LEN` bytes; the file
/// name loses characters from its stem rather than its extension.
pub fn track_path(
	opts: &RipOptions,
	track: &Track,
	idx: usize,
	idx_width: usize,
	playlist: Option<&Playlist>,
	user: Option<&User>,
) -> PathBuf {
	let ext = opts.format().extension();
	let raw = expand(opts.template(), |tag, width| {
		let out = match tag {
			"track_artist" | "artist" => escape(track.artist()),
			"track_artists" | "artists" | "album_artists_web" => escape(&artists(track)),
			"album_artist" => escape(
				track.album().map_or_else(|| track.artist(), |a|
					if a.artist().trim().is_empty() { track.artist() }
					else { a.artist() }
				)
			),
			"album" => escape(track.album().map_or("Unknown Album", |a| a.name())),
			"track_name" | "track" => escape(track.name()),
			"year" => match track.album().map_or(0, |a| a.year()) {
				0 => "0000".to_owned(),
				y => y.to_string(),
			},
			"ext" | "extension" => ext.to_owned(),
			"idx" | "index" => zero_fill(idx, width.unwrap_or(idx_width)),
			"track_num" | "track_idx" | "track_index" =>
				zero_fill(usize::from(track.index()), width.unwrap_or(0)),
			"disc_num" | "disc_idx" | "disc_index" =>
				zero_fill(usize::from(track.disc()), width.unwrap_or(0)),
			"playlist" | "playlist_name" =>
				escape(playlist.map_or("No Playlist", Playlist::name)),
			"playlist_owner" | "playlist_user" | "playlist_username" =>
				escape(playlist.map_or("No Playlist Owner", |p| p.owner().display())),
			"user" | "username" => escape(user.map_or("Unknown User", User::display)),
			_ => return None,
		};
		Some(out)
	});

	let parts: Vec<&str> = raw.split('/').filter(|p| ! p.trim().is_empty()).collect();
	let mut out = opts.base_dir().to_path_buf();

	// Nothing usable? Fall back to the track name.
	if parts.is_empty() {
		let mut file = format!("{}.{ext}", escape(track.name()));
		truncate_file(&mut file, ext);
		out.push(file);
		return out;
	}

	let last = parts.len() - 1;
	for (k, part) in parts.into_iter().enumerate() {
		let mut part =
			if part == "." || part == ".." { "_".to_owned() }
			else { part.to_owned() };

		if k == last { truncate_file(&mut part, ext); }
		else {
			truncate(&mut part, MAX_COMPONENT_LEN);
			part.trim_mut();
		}

		out.push(part);
	}

	out
}



/// # Expand Tags.
///
/// Run through the template once, replacing each `{tag}` or `{tag:width}`
/// with whatever the callback returns. A `None` leaves the tag untouched.
fn expand<F>(src: &str, mut cb: F) -> String
where F: FnMut(&str, Option<usize>) -> Option<String> {
	let mut out = String::with_capacity(src.len() * 2);
	let mut rest = src;
	while let Some(start) = rest.find('{') {
		out.push_str(&rest[..start]);
		let after = &rest[start + 1..];

		match after.find(&['{', '}'][..]) {
			Some(end) if after.as_bytes()[end] == b'}' => {
				let inner = &after[..end];
				let (tag, width) = match inner.split_once(':') {
					Some((tag, width)) => match width.parse::<usize>() {
						Ok(width) => (tag, Some(width)),
						Err(_) => (inner, None),
					},
					None => (inner, None),
				};

				if let Some(v) = cb(tag, width) { out.push_str(&v); }
				else {
					out.push('{');
					out.push_str(inner);
					out.push('}');
				}
				rest = &after[end + 1..];
			},
			// A stray brace.
			_ => {
				out.push('{');
				rest = after;
			},
		}
	}

	out.push_str(rest);
	out
}

/// # Track Artists.
fn artists(track: &Track) -> String {
	let all = track.artists();
	if all.is_empty() { track.artist().to_owned() }
	else { all.join(", ") }
}

/// # Escape Value.
///
/// Path separators become dashes.
fn escape(src: &str) -> String { src.replace(['/', '\\'], "-") }

/// # Truncate.
///
/// Shorten `src` to at most `max` bytes without splitting a character.
fn truncate(src: &mut String, max: usize) {
	if max < src.len() {
		let mut end = max;
		while ! src.is_char_boundary(end) { end -= 1; }
		src.truncate(end);
	}
}

/// # Truncate File Name.
///
/// Like `truncate`, but shortens the stem when the name ends with `ext`.
fn truncate_file(src: &mut String, ext: &str) {
	src.trim_mut();
	if src.len() <= MAX_COMPONENT_LEN { return; }

	let suffix = format!(".{ext}");
	if let Some(stem) = src.strip_suffix(suffix.as_str()) {
		let mut stem = stem.to_owned();
		truncate(&mut stem, MAX_COMPONENT_LEN - suffix.len());
		stem.trim_mut();
		stem.push_str(&suffix);
		*src = stem;
	}
	else {
		truncate(src, MAX_COMPONENT_LEN);
		src.trim_mut();
	}
}

/// # Zero Fill.
fn zero_fill(num: usize, width: usize) -> String { format!("{num:0width$}") }
