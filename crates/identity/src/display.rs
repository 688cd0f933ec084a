//! Textual forms of [`ProcessId`].
//!
//! `Display` on a [`ProcessId`] follows the process-wide [`PidFormat`], set
//! once at startup from the runtime options. The explicit forms are always
//! available through [`ProcessId::display`] and [`ProcessId::filename_form`].

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

pub use tandem_config::PidFormat;

use crate::pid::ProcessId;

static DISPLAY_FORMAT: AtomicU8 = AtomicU8::new(0);

/// Uid digits kept by the short form.
const SHORT_UID_MASK: u128 = 0xfffff;

/// Sets the format used by `Display for ProcessId` in this process.
pub fn set_display_format(format: PidFormat) {
	let raw = match format {
		PidFormat::Short => 0,
		PidFormat::Long => 1,
		PidFormat::Full => 2,
	};
	DISPLAY_FORMAT.store(raw, Ordering::Relaxed);
}

/// Returns the process-wide display format.
pub fn display_format() -> PidFormat {
	match DISPLAY_FORMAT.load(Ordering::Relaxed) {
		1 => PidFormat::Long,
		2 => PidFormat::Full,
		_ => PidFormat::Short,
	}
}

/// [`ProcessId`] rendered in a fixed format.
#[derive(Debug, Clone, Copy)]
pub struct PidDisplay<'a> {
	pid: &'a ProcessId,
	format: PidFormat,
}

impl ProcessId {
	/// Renders this identity in `format`, ignoring the process-wide setting.
	pub fn display(&self, format: PidFormat) -> PidDisplay<'_> {
		PidDisplay { pid: self, format }
	}

	/// Filesystem-friendly form used to name log and trace files.
	///
	/// `Role-name.scope`, with the hex uid standing in for the name of an
	/// anonymous process and the scope dropped when it adds nothing.
	pub fn filename_form(&self) -> String {
		let mut out = format!("{}-", self.role());
		if self.is_anonymous() {
			out.push_str(&format!("{:x}", self.uid()));
		} else {
			out.push_str(self.name());
		}
		if self.is_scope_qualified() {
			out.push('.');
			out.push_str(self.scope());
		}
		out
	}
}

impl fmt::Display for PidDisplay<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let pid = self.pid;
		match self.format {
			PidFormat::Full => write!(
				f,
				"ProcessId(uid={:x}, seqno={}, role={}, name='{}', scope='{}', host='{}', transports={:?})",
				pid.uid(),
				pid.seqno(),
				pid.role(),
				pid.name(),
				pid.scope(),
				pid.host(),
				pid.transports(),
			),
			short_or_long => {
				write!(f, "<{}:", pid.role())?;
				if !pid.is_anonymous() {
					f.write_str(pid.name())?;
				} else if short_or_long == PidFormat::Short {
					write!(f, "{:05x}", pid.uid().as_u128() & SHORT_UID_MASK)?;
				} else {
					write!(f, "{:x}", pid.uid())?;
				}
				if pid.is_scope_qualified() {
					write!(f, "#{}", pid.scope())?;
				}
				f.write_str(">")
			}
		}
	}
}

impl fmt::Display for ProcessId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.display(display_format()).fmt(f)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use serial_test::serial;

	use super::*;
	use crate::uid::Uid;

	const UID: u128 = 0x1234_5678_9abc_def0;

	fn pid(name: &str, scope: &str) -> ProcessId {
		ProcessId::new(Uid::from_raw(UID), 1, "Proposer", name, scope, "10.0.0.1", vec![Some(4000), None])
	}

	#[rstest]
	#[case("leader", "", "<Proposer:leader>")]
	#[case("leader", "leader", "<Proposer:leader>")]
	#[case("leader", "alpha", "<Proposer:leader#alpha>")]
	#[case("", "", "<Proposer:cdef0>")]
	#[case("", "alpha", "<Proposer:cdef0#alpha>")]
	fn short_form(#[case] name: &str, #[case] scope: &str, #[case] expected: &str) {
		assert_eq!(pid(name, scope).display(PidFormat::Short).to_string(), expected);
	}

	#[rstest]
	#[case("leader", "alpha", "<Proposer:leader#alpha>")]
	#[case("", "", "<Proposer:123456789abcdef0>")]
	#[case("", "alpha", "<Proposer:123456789abcdef0#alpha>")]
	fn long_form(#[case] name: &str, #[case] scope: &str, #[case] expected: &str) {
		assert_eq!(pid(name, scope).display(PidFormat::Long).to_string(), expected);
	}

	#[rstest]
	#[case("leader", "", "Proposer-leader")]
	#[case("leader", "alpha", "Proposer-leader.alpha")]
	#[case("", "", "Proposer-123456789abcdef0")]
	#[case("", "alpha", "Proposer-123456789abcdef0.alpha")]
	fn filename_form(#[case] name: &str, #[case] scope: &str, #[case] expected: &str) {
		assert_eq!(pid(name, scope).filename_form(), expected);
	}

	#[test]
	fn full_form_lists_every_field() {
		assert_eq!(
			pid("leader", "alpha").display(PidFormat::Full).to_string(),
			"ProcessId(uid=123456789abcdef0, seqno=1, role=Proposer, name='leader', scope='alpha', host='10.0.0.1', transports=[Some(4000), None])"
		);
	}

	#[test]
	fn short_form_pads_small_uids() {
		let p = ProcessId::new(Uid::from_raw(0x2a), 1, "P", "", "", "h", vec![]);
		assert_eq!(p.display(PidFormat::Short).to_string(), "<P:0002a>");
	}

	#[test]
	#[serial]
	fn plain_display_follows_process_format() {
		let p = pid("leader", "alpha");
		assert_eq!(display_format(), PidFormat::Short);
		assert_eq!(p.to_string(), "<Proposer:leader#alpha>");

		set_display_format(PidFormat::Full);
		assert_eq!(display_format(), PidFormat::Full);
		assert!(p.to_string().starts_with("ProcessId(uid=123456789abcdef0"));

		set_display_format(PidFormat::Short);
	}
}
