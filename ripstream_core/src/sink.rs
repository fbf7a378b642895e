/*!
# Rip Stream: Sinks

A sink is wherever the decoded frames for a single track end up: a raw file,
a WAV file, or the standard input of an external encoder.
*/

use crate::{
	OutputFormat,
	RipOptions,
	RipStreamError,
	SAMPLE_RATE,
	WAVE_SPEC,
};
use hound::WavWriter;
use std::{
	fmt,
	fs::File,
	io::{
		BufWriter,
		ErrorKind,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
	process::{
		Child,
		ChildStdin,
		Command,
		Stdio,
	},
};



/// # Output Placeholder.
///
/// Encoder arguments equal to this are swapped for the destination path.
const OUT: &str = "{out}";



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Sink Kind.
///
/// This determines what [`Sink::open`] actually opens.
pub enum SinkKind {
	/// # Raw PCM File.
	Raw,

	/// # WAV File.
	Wav,

	/// # External Encoder.
	Encoder(EncoderCommand),
}

impl From<&RipOptions> for SinkKind {
	fn from(opts: &RipOptions) -> Self {
		match opts.format() {
			OutputFormat::Pcm => Self::Raw,
			OutputFormat::Wav => Self::Wav,
			OutputFormat::Aac => Self::Encoder(EncoderCommand::aac(opts)),
			OutputFormat::Flac => Self::Encoder(EncoderCommand::flac(opts)),
			OutputFormat::M4a => Self::Encoder(EncoderCommand::m4a(opts)),
			OutputFormat::Mp3 => Self::Encoder(EncoderCommand::mp3(opts)),
			OutputFormat::Ogg => Self::Encoder(EncoderCommand::ogg(opts)),
			OutputFormat::Opus => Self::Encoder(EncoderCommand::opus(opts)),
		}
	}
}



#[derive(Debug, Clone, Eq, PartialEq)]
/// # Encoder Command.
///
/// The program and argument template for an external encoder. Any argument
/// equal to `{out}` is replaced with the destination path at spawn time. The
/// frames themselves are always fed through STDIN.
pub struct EncoderCommand {
	/// # Program.
	program: String,

	/// # Arguments.
	args: Vec<String>,

	/// # Discard Output?
	quiet: bool,
}

impl EncoderCommand {
	#[must_use]
	/// # New.
	pub fn new<S, I, A>(program: S, args: I) -> Self
	where S: Into<String>, I: IntoIterator<Item=A>, A: Into<String> {
		Self {
			program: program.into(),
			args: args.into_iter().map(Into::into).collect(),
			quiet: false,
		}
	}

	#[must_use]
	/// # Discard Output.
	///
	/// Some encoders are chatty no matter what; this sends their STDOUT and
	/// STDERR to the void so they don't trample our own output.
	pub fn with_quiet(self, quiet: bool) -> Self { Self { quiet, ..self } }

	#[must_use]
	/// # Program.
	pub fn program(&self) -> &str { &self.program }

	#[must_use]
	/// # Arguments.
	pub fn args(&self) -> &[String] { &self.args }

	#[must_use]
	/// # Quiet?
	pub const fn quiet(&self) -> bool { self.quiet }

	/// # Spawn.
	///
	/// Start the encoder with a piped STDIN.
	fn spawn(&self, dst: &Path) -> Result<Child, RipStreamError> {
		let mut cmd = Command::new(&self.program);
		for arg in &self.args {
			if arg == OUT { cmd.arg(dst); }
			else { cmd.arg(arg); }
		}
		cmd.stdin(Stdio::piped());
		if self.quiet {
			cmd.stdout(Stdio::null()).stderr(Stdio::null());
		}

		cmd.spawn().map_err(|_| RipStreamError::EncoderSpawn(self.program.clone()))
	}
}

/// ## Formats.
impl EncoderCommand {
	/// # AAC.
	fn aac(opts: &RipOptions) -> Self {
		let (k, v) = bitrate_pair(opts, "-b", "-q");
		Self::new("faac", ["-P", "-X", k, v.as_str(), "-o", OUT, "-"])
			.with_quiet(true)
	}

	/// # FLAC.
	fn flac(opts: &RipOptions) -> Self {
		let comp = format!("-{}", opts.comp().min(8));
		let rate = SAMPLE_RATE.to_string();
		Self::new("flac", [
			"-f", comp.as_str(), "--silent",
			"--endian", "little",
			"--channels", "2",
			"--bps", "16",
			"--sample-rate", rate.as_str(),
			"--sign", "signed",
			"-o", OUT, "-",
		])
	}

	/// # M4A.
	fn m4a(opts: &RipOptions) -> Self {
		let (k, v) = bitrate_pair(opts, "-b", "-m");
		Self::new("fdkaac", ["-S", "-R", "-w", "200000", k, v.as_str(), "-o", OUT, "-"])
	}

	/// # MP3.
	fn mp3(opts: &RipOptions) -> Self {
		if opts.cbr() {
			let v = opts.bitrate().to_string();
			Self::new("lame", ["--silent", "-cbr", "-b", v.as_str(), "-h", "-r", "-", OUT])
		}
		else {
			let v = opts.vbr().to_string();
			Self::new("lame", ["--silent", "-V", v.as_str(), "-h", "-r", "-", OUT])
		}
	}

	/// # Ogg Vorbis.
	fn ogg(opts: &RipOptions) -> Self {
		let (k, v) = bitrate_pair(opts, "-b", "-q");
		Self::new("oggenc", ["--quiet", "--raw", k, v.as_str(), "-o", OUT, "-"])
	}

	/// # Opus.
	///
	/// The constant bitrate is halved; see [`RipOptions::encoder_bitrate`].
	fn opus(opts: &RipOptions) -> Self {
		let comp = opts.comp().to_string();
		let mode = if opts.cbr() { "--cvbr" } else { "--vbr" };
		let (_, v) = bitrate_pair(opts, "", "");
		let rate = SAMPLE_RATE.to_string();
		Self::new("opusenc", [
			"--quiet", "--comp", comp.as_str(), mode,
			"--bitrate", v.as_str(),
			"--raw", "--raw-rate", rate.as_str(),
			"-", OUT,
		])
	}
}



#[derive(Debug)]
/// # Sink.
///
/// An open destination for one track's frames.
///
/// Sinks should always be consumed with [`Sink::close`]; if one is dropped
/// instead, it will still flush and reap whatever it holds, but any problems
/// will go unreported.
pub struct Sink {
	/// # Destination.
	dst: PathBuf,

	/// # Inner Writer.
	inner: Option<SinkInner>,

	/// # Bytes Written.
	written: u64,
}

impl Drop for Sink {
	fn drop(&mut self) {
		if let Some(inner) = self.inner.take() { let _res = inner.finish(&self.dst); }
	}
}

impl Sink {
	/// # Open.
	///
	/// Create the output file or spawn the encoder, as appropriate.
	///
	/// ## Errors
	///
	/// This will return an error if the file cannot be created or the encoder
	/// cannot be started.
	pub fn open<P>(kind: &SinkKind, dst: P) -> Result<Self, RipStreamError>
	where P: AsRef<Path> {
		let dst = dst.as_ref().to_path_buf();
		let inner = match kind {
			SinkKind::Raw => {
				let file = File::create(&dst).map_err(|_| write_err(&dst))?;
				SinkInner::Raw(BufWriter::new(file))
			},
			SinkKind::Wav => {
				let file = File::create(&dst).map_err(|_| write_err(&dst))?;
				let sync = file.try_clone().map_err(|_| write_err(&dst))?;
				let writer = WavWriter::new(BufWriter::new(file), WAVE_SPEC)
					.map_err(|_| write_err(&dst))?;
				SinkInner::Wav(writer, sync)
			},
			SinkKind::Encoder(cmd) => {
				let mut child = cmd.spawn(&dst)?;
				let Some(stdin) = child.stdin.take() else {
					let _res = child.kill();
					let _res = child.wait();
					return Err(RipStreamError::EncoderSpawn(cmd.program.clone()));
				};
				SinkInner::Encoder(child, Some(stdin))
			},
		};

		Ok(Self { dst, inner: Some(inner), written: 0 })
	}

	/// # Write Frames.
	///
	/// This blocks if the encoder isn't keeping up, which in turn slows the
	/// session's delivery.
	///
	/// ## Errors
	///
	/// A closed encoder pipe is reported as [`RipStreamError::BrokenPipe`];
	/// anything else as a general write error.
	pub fn write(&mut self, frames: &[u8]) -> Result<(), RipStreamError> {
		let inner = self.inner.as_mut()
			.ok_or(RipStreamError::Bug("sink written after close"))?;

		match inner {
			SinkInner::Raw(w) => w.write_all(frames).map_err(|_| write_err(&self.dst))?,
			SinkInner::Wav(w, _) => {
				for chunk in frames.chunks_exact(2) {
					let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
					w.write_sample(sample).map_err(|_| write_err(&self.dst))?;
				}
			},
			SinkInner::Encoder(child, stdin) => {
				let pipe = stdin.as_mut()
					.ok_or(RipStreamError::Bug("encoder pipe missing"))?;
				if let Err(e) = pipe.write_all(frames) {
					return Err(
						if e.kind() == ErrorKind::BrokenPipe {
							RipStreamError::BrokenPipe(format!("pid {}", child.id()))
						}
						else { write_err(&self.dst) }
					);
				}
			},
		}

		self.written += frames.len() as u64;
		Ok(())
	}

	/// # Close.
	///
	/// Flush and sync file sinks, or close the encoder's input and wait for
	/// it to exit.
	///
	/// A non-zero encoder exit code is returned as `Some(code)`. That isn't
	/// treated as an error because the output may well be fine.
	///
	/// ## Errors
	///
	/// This will return an error if the final flush/sync fails or the
	/// encoder cannot be waited on.
	pub fn close(mut self) -> Result<Option<i32>, RipStreamError> {
		match self.inner.take() {
			Some(inner) => inner.finish(&self.dst),
			None => Ok(None),
		}
	}

	#[must_use]
	/// # Destination.
	pub fn dst(&self) -> &Path { &self.dst }

	#[must_use]
	/// # Bytes Written.
	pub const fn written(&self) -> u64 { self.written }
}



/// # Inner Sink.
enum SinkInner {
	/// # Raw File.
	Raw(BufWriter<File>),

	/// # WAV File.
	///
	/// The extra handle is used for syncing after `hound` finalizes the
	/// header.
	Wav(WavWriter<BufWriter<File>>, File),

	/// # Encoder Process.
	Encoder(Child, Option<ChildStdin>),
}

impl fmt::Debug for SinkInner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Raw(_) => f.write_str("Raw"),
			Self::Wav(..) => f.write_str("Wav"),
			Self::Encoder(child, _) => f.debug_tuple("Encoder").field(&child.id()).finish(),
		}
	}
}

impl SinkInner {
	/// # Finish.
	fn finish(self, dst: &Path) -> Result<Option<i32>, RipStreamError> {
		match self {
			Self::Raw(w) => {
				let file = w.into_inner().map_err(|_| write_err(dst))?;
				file.sync_all().map_err(|_| write_err(dst))?;
				Ok(None)
			},
			Self::Wav(w, file) => {
				w.finalize().map_err(|_| write_err(dst))?;
				file.sync_all().map_err(|_| write_err(dst))?;
				Ok(None)
			},
			Self::Encoder(mut child, stdin) => {
				// Closing the pipe is what tells the encoder it has everything.
				// A flush failure just means it already left.
				if let Some(mut stdin) = stdin {
					let _res = stdin.flush();
					drop(stdin);
				}

				let status = child.wait().map_err(|_| RipStreamError::Bug("unable to wait for encoder"))?;
				if status.success() { Ok(None) }
				else { Ok(Some(status.code().unwrap_or(-1))) }
			},
		}
	}
}



/// # Bitrate Argument Pair.
///
/// Return the flag and value for the current bitrate mode.
fn bitrate_pair(opts: &RipOptions, cbr: &'static str, vbr: &'static str)
-> (&'static str, String) {
	if opts.cbr() { (cbr, opts.encoder_bitrate().to_string()) }
	else { (vbr, opts.vbr().to_string()) }
}

/// # Write Error.
fn write_err(dst: &Path) -> RipStreamError {
	RipStreamError::Write(dst.to_string_lossy().into_owned())
}
