/*!
# Rip Stream: CLI
*/

use argyle::Argument;
use dactyl::traits::BytesToUnsigned;
use ripstream_core::{
	Login,
	OutputFormat,
	RipOptions,
	RipStreamError,
};
use std::{
	path::PathBuf,
	time::Duration,
};
use trimothy::TrimMut;



/// # Options Return Type.
///
/// Options, login, settings file, and URIs.
pub(super) type Parsed = (
	RipOptions,
	Login,
	Option<PathBuf>,
	Vec<String>,
);



/// # Parse Options.
pub(super) fn parse() -> Result<Parsed, RipStreamError> {
	let args = argyle::args()
		.with_keywords(include!(concat!(env!("OUT_DIR"), "/argyle.rs")));

	let mut opts = RipOptions::default();
	let mut last = false;
	let mut user = None;
	let mut password = None;
	let mut settings = None;
	let mut uris = Vec::new();
	for arg in args {
		match arg {
			Argument::Key("--cbr") => { opts = opts.with_cbr(true); },
			Argument::Key("-h" | "--help") => return Err(RipStreamError::PrintHelp),
			Argument::Key("-l" | "--last") => { last = true; },
			Argument::Key("--overwrite") => { opts = opts.with_overwrite(true); },
			Argument::Key("-r" | "--remove-from-playlist") => {
				opts = opts.with_remove_from_playlist(true);
			},
			Argument::Key("-v" | "--verbose") => { opts = opts.with_verbose(true); },
			Argument::Key("-V" | "--version") => return Err(RipStreamError::PrintVersion),

			Argument::KeyWithValue("-b" | "--bitrate", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("-b/--bitrate"))?;
				opts = opts.with_bitrate(s);
			},
			Argument::KeyWithValue("--comp", s) => {
				let s = u8::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--comp"))?;
				opts = opts.with_comp(s);
			},
			Argument::KeyWithValue("-d" | "--directory", s) => {
				opts = opts.with_base_dir(s.trim());
			},
			Argument::KeyWithValue("--fail-log", s) => {
				opts = opts.with_fail_log(Some(s));
			},
			Argument::KeyWithValue("-f" | "--format", s) => {
				opts = opts.with_template(s);
			},
			Argument::KeyWithValue("-o" | "--output-type", s) => {
				let s = OutputFormat::try_from(s.as_str())
					.map_err(|_| RipStreamError::CliParse("-o/--output-type"))?;
				opts = opts.with_format(s);
			},
			Argument::KeyWithValue("-p" | "--password", s) => { password.replace(s); },
			Argument::KeyWithValue("--settings", s) => {
				settings.replace(PathBuf::from(s.trim()));
			},
			Argument::KeyWithValue("--timeout", s) => {
				let s = u64::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--timeout"))?;
				opts = opts.with_stall_timeout(Some(Duration::from_secs(s)));
			},
			Argument::KeyWithValue("-u" | "--user", mut s) => {
				s.trim_mut();
				if s.is_empty() { return Err(RipStreamError::CliParse("-u/--user")); }
				user.replace(s);
			},
			Argument::KeyWithValue("--vbr", s) => {
				let s = u16::btou(s.trim().as_bytes())
					.ok_or(RipStreamError::CliParse("--vbr"))?;
				opts = opts.with_vbr(s);
			},

			Argument::Other(s) => {
				if s.starts_with('-') { return Err(RipStreamError::CliArg(s)); }
				uris.push(s);
			},

			_ => {},
		}
	}

	let login = login(user, password, last, settings.is_some())?;

	if uris.is_empty() { return Err(RipStreamError::Noop); }

	Ok((opts, login, settings, uris))
}



/// # Resolve Login.
///
/// A user needs a password; otherwise the remembered user is used, so long
/// as there's somewhere to remember it.
fn login(user: Option<String>, password: Option<String>, last: bool, settings: bool)
-> Result<Login, RipStreamError> {
	match (user, last) {
		(Some(user), false) => {
			let password = password.ok_or(RipStreamError::NoPassword)?;
			Ok(Login::Password { user, password })
		},
		(None, true) => Ok(Login::Remembered),
		(Some(_), true) => Err(RipStreamError::CliArg(
			"-u/--user and -l/--last are mutually exclusive".to_owned()
		)),
		(None, false) =>
			if settings { Ok(Login::Remembered) }
			else { Err(RipStreamError::CliParse("-u/--user")) },
	}
}
