/*!
# Rip Stream
*/

#![forbid(unsafe_code)]

#![deny(
	clippy::allow_attributes_without_reason,
	clippy::correctness,
	unreachable_pub,
)]

#![warn(
	clippy::complexity,
	clippy::nursery,
	clippy::pedantic,
	clippy::perf,
	clippy::style,

	clippy::allow_attributes,
	clippy::clone_on_ref_ptr,
	clippy::create_dir,
	clippy::filetype_is_file,
	clippy::format_push_string,
	clippy::get_unwrap,
	clippy::impl_trait_in_params,
	clippy::lossy_float_literal,
	clippy::missing_assert_message,
	clippy::missing_docs_in_private_items,
	clippy::needless_raw_strings,
	clippy::panic_in_result_fn,
	clippy::pub_without_shorthand,
	clippy::rest_pat_in_fully_bound_structs,
	clippy::semicolon_inside_block,
	clippy::str_to_string,
	clippy::string_to_string,
	clippy::todo,
	clippy::undocumented_unsafe_blocks,
	clippy::unneeded_field_pattern,
	clippy::unseparated_literal_suffix,
	clippy::unwrap_in_result,

	macro_use_extern_crate,
	missing_copy_implementations,
	missing_docs,
	non_ascii_idents,
	trivial_casts,
	trivial_numeric_casts,
	unused_crate_dependencies,
	unused_extern_crates,
	unused_import_braces,
)]

#![expect(clippy::redundant_pub_crate, reason = "Unresolvable.")]



mod cli;

use dactyl::NiceU16;
use fyi_ansi::{
	ansi,
	bold,
	csi,
	dim,
};
use fyi_msg::{
	Msg,
	Progless,
};
use oxford_join::JoinFmt;
use ripstream_core::{
	Delivery,
	KillSwitch,
	LocalSession,
	Login,
	RipOptions,
	Ripper,
	RipStreamError,
};
use std::{
	borrow::Cow,
	process::ExitCode,
};
use utc2k::FmtUtc2k;



/// # Main.
///
/// This lets us bubble up startup errors so they can be pretty-printed.
fn main() -> ExitCode {
	match main__() {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::FAILURE,
		Err(e @ (RipStreamError::PrintHelp | RipStreamError::PrintVersion)) => {
			println!("{e}");
			ExitCode::SUCCESS
		},
		Err(e) => {
			Msg::from(e).eprint();
			ExitCode::FAILURE
		},
	}
}

#[inline]
/// # Actual Main.
///
/// This does all the stuff. The return value indicates whether or not every
/// track made it.
fn main__() -> Result<bool, RipStreamError> {
	let (opts, login, settings, uris) = cli::parse()?;

	// Set up the session and delivery.
	let delivery = Delivery::new(KillSwitch::default())
		.with_progress(Progless::default());
	let session = match settings {
		Some(s) => LocalSession::default().with_settings(s),
		None => LocalSession::default(),
	};
	let mut ripper = Ripper::new(session, opts, delivery);

	// Intercept CTRL+C so we can clean up before leaving.
	let delivery = ripper.delivery();
	ctrlc::set_handler(move || delivery.abort(RipStreamError::Killed))
		.map_err(|_| RipStreamError::Bug("unable to intercept CTRL+C"))?;

	rip_summary(ripper.opts(), &login);
	if ripper.opts().verbose() { log_header(ripper.opts(), &uris); }

	// Rip and rip and rip!
	let report = ripper.run(&login, &uris)?;
	if let Some(e) = report.aborted() { return Err(e.clone()); }
	Ok(report.is_ok())
}

/// # Log Header.
///
/// Print a few basic setup details for the log. Only applies when -v/--verbose
/// is set.
fn log_header(opts: &RipOptions, uris: &[String]) {
	use std::io::Write;

	let writer = std::io::stdout();
	let mut handle = writer.lock();

	let _res = writeln!(
		&mut handle,
		concat!("#####
## Rip Stream v", env!("CARGO_PKG_VERSION"), "
## Date:      {date}
## Format:    {format}
## Template:  {template}
## URIs:      {uris}
##
## Each track's outcome is noted with the following fields, separated by two
## spaces:
##   * [Timestamp]
##   * Outcome (RIPPED, SKIPPED, FAILED, or ABORTED)
##   * Track URI
##   * Time Spent
##   * (Details, if any)
#####"),
		date=FmtUtc2k::now(),
		format=opts.format(),
		template=opts.template(),
		uris=JoinFmt::new(uris.iter(), ", "),
	);

	let _res = handle.flush();
}

/// # Rip Summary.
///
/// Print the chosen settings before getting started.
fn rip_summary(opts: &RipOptions, login: &Login) {
	let nice_login = match login {
		Login::Password { user, .. } => Cow::Owned(user.clone()),
		Login::Remembered => Cow::Borrowed(concat!(
			csi!(reset, dim), "(",
			csi!(reset, bold), "Last User",
			csi!(reset, dim), ")",
		)),
	};
	let nice_format = Cow::Owned(opts.format().to_string());
	let nice_quality = Cow::Owned(
		if opts.format().is_raw() { "Lossless".to_owned() }
		else if opts.cbr() { format!("{} kbps (CBR)", NiceU16::from(opts.bitrate())) }
		else { format!("VBR {}", opts.vbr()) }
	);
	let nice_output = Cow::Owned(format!(
		concat!("{}/", csi!(reset, dim), "{}"),
		opts.base_dir().to_string_lossy(),
		opts.template(),
	));
	let nice_timeout = opts.stall_timeout().map_or(
		Cow::Borrowed("Never"),
		|d| Cow::Owned(format!("{}s", d.as_secs())),
	);
	let nice_fail_log = opts.fail_log().map_or(
		Cow::Borrowed("Disabled"),
		|p| Cow::Owned(p.to_string_lossy().into_owned()),
	);

	let set = [
		("Login:", nice_login, true),
		("Format:", nice_format, true),
		("Quality:", nice_quality, true),
		("Destination:", nice_output, true),
		("Overwrite:", Cow::Borrowed(if opts.overwrite() { "Yes" } else { "No" }), opts.overwrite()),
		("Stall Timeout:", nice_timeout, opts.stall_timeout().is_some()),
		("Failure Log:", nice_fail_log, opts.fail_log().is_some()),
		("Playlists:", Cow::Borrowed("Remove Ripped"), opts.remove_from_playlist()),
		("Verbose:", Cow::Borrowed(if opts.verbose() { "Yes" } else { "No" }), opts.verbose()),
	];
	let max_label = set.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0);

	eprintln!(ansi!((bold, 199) "Rip Stream…"));
	for (k, v, enabled) in set {
		if enabled {
			eprintln!(
				concat!("  {k:max_label$} ", bold!("{v}")),
				k=k,
				v=v,
				max_label=max_label,
			);
		}
		else {
			eprintln!(
				dim!("  {k:max_label$} ", csi!(strike), "{v}"),
				k=k,
				v=v,
				max_label=max_label,
			);
		}
	}
	eprintln!();
}
