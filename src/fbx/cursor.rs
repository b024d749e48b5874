use crate::fbx::{FbxError, Result};

/// Byte order of multi-byte fields in a binary FBX stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	/// Little-endian, the common case.
	Little,
	/// Big-endian, selected by the header flag byte.
	Big,
}

/// Simple bounded cursor over an immutable byte slice.
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Create a cursor starting at `offset` into `bytes`.
	pub fn at_offset(bytes: &'a [u8], offset: usize) -> Self {
		Self {
			bytes,
			pos: offset.min(bytes.len()),
		}
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Total length of the underlying slice.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Return whether the underlying slice is empty.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Move the cursor to an absolute offset within bounds.
	pub fn seek(&mut self, offset: usize) -> Result<()> {
		if offset > self.bytes.len() {
			return Err(FbxError::TruncatedFile {
				at: self.pos,
				need: offset - self.bytes.len(),
				rem: 0,
			});
		}
		self.pos = offset;
		Ok(())
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(FbxError::TruncatedFile {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	/// Read a single byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_exact(1)?[0])
	}

	/// Read a `u16` using the selected endianness.
	pub fn read_u16(&mut self, endianness: Endianness) -> Result<u16> {
		let raw = self.read_exact(2)?;
		let mut buf = [0_u8; 2];
		buf.copy_from_slice(raw);
		Ok(match endianness {
			Endianness::Little => u16::from_le_bytes(buf),
			Endianness::Big => u16::from_be_bytes(buf),
		})
	}

	/// Read a `u32` using the selected endianness.
	pub fn read_u32(&mut self, endianness: Endianness) -> Result<u32> {
		let raw = self.read_exact(4)?;
		let mut buf = [0_u8; 4];
		buf.copy_from_slice(raw);
		Ok(match endianness {
			Endianness::Little => u32::from_le_bytes(buf),
			Endianness::Big => u32::from_be_bytes(buf),
		})
	}

	/// Read a `u64` using the selected endianness.
	pub fn read_u64(&mut self, endianness: Endianness) -> Result<u64> {
		let raw = self.read_exact(8)?;
		let mut buf = [0_u8; 8];
		buf.copy_from_slice(raw);
		Ok(match endianness {
			Endianness::Little => u64::from_le_bytes(buf),
			Endianness::Big => u64::from_be_bytes(buf),
		})
	}

	/// Read an `i16` using the selected endianness.
	pub fn read_i16(&mut self, endianness: Endianness) -> Result<i16> {
		Ok(self.read_u16(endianness)? as i16)
	}

	/// Read an `i32` using the selected endianness.
	pub fn read_i32(&mut self, endianness: Endianness) -> Result<i32> {
		Ok(self.read_u32(endianness)? as i32)
	}

	/// Read an `i64` using the selected endianness.
	pub fn read_i64(&mut self, endianness: Endianness) -> Result<i64> {
		Ok(self.read_u64(endianness)? as i64)
	}

	/// Read an `f32` using the selected endianness.
	pub fn read_f32(&mut self, endianness: Endianness) -> Result<f32> {
		Ok(f32::from_bits(self.read_u32(endianness)?))
	}

	/// Read an `f64` using the selected endianness.
	pub fn read_f64(&mut self, endianness: Endianness) -> Result<f64> {
		Ok(f64::from_bits(self.read_u64(endianness)?))
	}
}

/// Byte-interval progress reporting and cooperative cancellation.
///
/// The parser calls [`ProgressTracker::update`] at record boundaries; the
/// callback fires once per configured interval of consumed bytes and aborts
/// the load with [`FbxError::Cancelled`] when it returns `false`.
pub struct ProgressTracker<'a> {
	callback: Option<&'a mut dyn FnMut(Progress) -> bool>,
	bytes_total: u64,
	interval: u64,
	next_report: u64,
	cancelled: bool,
}

/// Snapshot passed to a progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
	/// Bytes consumed so far.
	pub bytes_read: u64,
	/// Total input size.
	pub bytes_total: u64,
}

impl<'a> ProgressTracker<'a> {
	/// Create a tracker; `callback = None` disables reporting entirely.
	pub fn new(callback: Option<&'a mut dyn FnMut(Progress) -> bool>, bytes_total: u64, interval: u64) -> Self {
		Self {
			callback,
			bytes_total,
			interval: interval.max(1),
			next_report: 0,
			cancelled: false,
		}
	}

	/// Report position if an interval boundary was crossed.
	pub fn update(&mut self, bytes_read: u64) -> Result<()> {
		if self.cancelled {
			return Err(FbxError::Cancelled);
		}
		let Some(callback) = self.callback.as_mut() else {
			return Ok(());
		};

		if bytes_read < self.next_report {
			return Ok(());
		}
		self.next_report = bytes_read + self.interval;

		let keep_going = callback(Progress {
			bytes_read,
			bytes_total: self.bytes_total,
		});
		if !keep_going {
			self.cancelled = true;
			return Err(FbxError::Cancelled);
		}
		Ok(())
	}

	/// Return whether a callback already requested cancellation.
	pub fn is_cancelled(&self) -> bool {
		self.cancelled
	}
}

#[cfg(test)]
mod tests {
	use super::{Cursor, Endianness, Progress, ProgressTracker};
	use crate::fbx::FbxError;

	#[test]
	fn reads_track_position_and_bounds() {
		let bytes = [1_u8, 0, 0, 0, 0xFF];
		let mut cursor = Cursor::new(&bytes);
		assert_eq!(cursor.read_u32(Endianness::Little).unwrap(), 1);
		assert_eq!(cursor.pos(), 4);
		assert_eq!(cursor.remaining(), 1);

		let err = cursor.read_u32(Endianness::Little).unwrap_err();
		assert!(matches!(err, FbxError::TruncatedFile { at: 4, need: 4, rem: 1 }));
	}

	#[test]
	fn big_endian_reads_swap_bytes() {
		let bytes = [0_u8, 0, 0x1C, 0xE8];
		let mut cursor = Cursor::new(&bytes);
		assert_eq!(cursor.read_u32(Endianness::Big).unwrap(), 7400);
	}

	#[test]
	fn progress_fires_per_interval_and_cancels() {
		let mut calls: Vec<Progress> = Vec::new();
		let mut cancel_at = 0_usize;
		let mut callback = |progress: Progress| {
			calls.push(progress);
			cancel_at += 1;
			cancel_at < 2
		};
		let mut tracker = ProgressTracker::new(Some(&mut callback), 1000, 100);

		tracker.update(0).expect("first report continues");
		tracker.update(50).expect("below interval, no report");
		let err = tracker.update(150).unwrap_err();
		assert!(matches!(err, FbxError::Cancelled));
		assert!(tracker.is_cancelled());
		assert_eq!(calls.len(), 2);
	}
}
