/*!
# Rip Stream: Kill Switch
*/

use std::sync::{
	Arc,
	atomic::{
		AtomicBool,
		Ordering::{
			Acquire,
			Release,
		},
	},
};



#[derive(Debug, Clone, Default)]
/// # Kill Switch.
///
/// This is a short-circuit for the run as a whole. It is shared between the
/// sequential driver and the session's callback thread.
///
/// Either a lost play token or the main program's CTRL-C intercept sets the
/// value, allowing Rip Stream to tidy up before dying.
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
	#[must_use]
	/// # Dead?
	pub fn killed(&self) -> bool { self.0.load(Acquire) }

	/// # Kill!
	///
	/// Returns `true` if this call did the killing, `false` if it was already
	/// dead.
	pub fn kill(&self) -> bool { ! self.0.swap(true, Release) }
}
