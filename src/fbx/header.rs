use crate::fbx::cursor::Endianness;
use crate::fbx::{FbxError, Result};

/// Binary FBX file magic, including the trailing NUL and 0x1A marker.
pub const BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  \x00\x1a";

/// Offset of the version word, directly after magic and endianness flag.
const VERSION_OFFSET: usize = 23;

/// Container flavor detected from the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FbxFormat {
	/// Length-prefixed binary node records.
	Binary,
	/// Textual `Name: value { ... }` grammar.
	Ascii,
}

impl FbxFormat {
	/// Render the format as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Binary => "binary",
			Self::Ascii => "ascii",
		}
	}
}

/// Detected file format and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbxHeader {
	/// Container flavor.
	pub format: FbxFormat,
	/// FBX version as encoded decimal digits (for example `7400`).
	pub version: u32,
	/// Byte order for binary multi-byte fields.
	pub endianness: Endianness,
	/// Offset where node records (or ASCII text) begin.
	pub data_offset: usize,
}

impl FbxHeader {
	/// Size of the binary preamble: magic, flag byte, version word.
	pub const BINARY_SIZE: usize = VERSION_OFFSET + 4;

	/// Detect format and version from the beginning of `bytes`.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		if bytes.starts_with(BINARY_MAGIC) {
			return Self::parse_binary(bytes);
		}

		if looks_like_ascii(bytes) {
			let version = ascii_version_hint(bytes).unwrap_or(0);
			return Ok(Self {
				format: FbxFormat::Ascii,
				version,
				endianness: Endianness::Little,
				data_offset: 0,
			});
		}

		Err(FbxError::NotAnFbxFile { magic: first4(bytes) })
	}

	fn parse_binary(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < Self::BINARY_SIZE {
			return Err(FbxError::TruncatedFile {
				at: bytes.len(),
				need: Self::BINARY_SIZE - bytes.len(),
				rem: 0,
			});
		}

		let endianness = if bytes[BINARY_MAGIC.len()] == 0 {
			Endianness::Little
		} else {
			Endianness::Big
		};

		let mut word = [0_u8; 4];
		word.copy_from_slice(&bytes[VERSION_OFFSET..VERSION_OFFSET + 4]);
		let version = match endianness {
			Endianness::Little => u32::from_le_bytes(word),
			Endianness::Big => u32::from_be_bytes(word),
		};

		if !(2000..=8000).contains(&version) {
			return Err(FbxError::UnsupportedVersion { version });
		}

		Ok(Self {
			format: FbxFormat::Binary,
			version,
			endianness,
			data_offset: Self::BINARY_SIZE,
		})
	}
}

/// Size of a binary node record header and terminating sentinel in bytes.
///
/// Records grew from 32-bit to 64-bit offset fields at version 7500.
pub fn record_header_size(version: u32) -> usize {
	if version >= 7500 { 25 } else { 13 }
}

fn looks_like_ascii(bytes: &[u8]) -> bool {
	// ASCII files start with comments, whitespace, or a bare node name;
	// any early NUL or high control byte rules the text form out.
	let probe = &bytes[..bytes.len().min(256)];
	if probe.is_empty() {
		return false;
	}
	probe
		.iter()
		.all(|byte| *byte == b'\t' || *byte == b'\r' || *byte == b'\n' || (*byte >= 0x20 && *byte < 0x7F))
}

/// Extract a version hint from the leading `; FBX x.y.z project file`
/// comment, when present. The authoritative value comes from the
/// `FBXVersion` node later.
fn ascii_version_hint(bytes: &[u8]) -> Option<u32> {
	let probe = std::str::from_utf8(&bytes[..bytes.len().min(256)]).ok()?;
	let line = probe.lines().find(|line| line.trim_start().starts_with(';'))?;
	let rest = line.trim_start().trim_start_matches(';').trim_start();
	let rest = rest.strip_prefix("FBX")?.trim_start();

	let mut version = 0_u32;
	let mut digits = 0_u32;
	for ch in rest.chars() {
		if let Some(digit) = ch.to_digit(10) {
			version = version * 10 + digit;
			digits += 1;
		} else if ch != '.' {
			break;
		}
	}
	// "7.4.0" carries three digit groups; normalize 74 / 740 style hints.
	if digits == 0 {
		return None;
	}
	while version != 0 && version < 1000 {
		version *= 10;
	}
	Some(version)
}

fn first4(bytes: &[u8]) -> [u8; 4] {
	let mut magic = [0_u8; 4];
	let take = bytes.len().min(4);
	magic[..take].copy_from_slice(&bytes[..take]);
	magic
}

#[cfg(test)]
mod tests {
	use super::{BINARY_MAGIC, FbxFormat, FbxHeader, record_header_size};
	use crate::fbx::cursor::Endianness;
	use crate::fbx::FbxError;

	fn binary_prefix(version: u32) -> Vec<u8> {
		let mut bytes = BINARY_MAGIC.to_vec();
		bytes.push(0);
		bytes.extend_from_slice(&version.to_le_bytes());
		bytes
	}

	#[test]
	fn binary_magic_and_version_are_detected() {
		let header = FbxHeader::parse(&binary_prefix(7400)).expect("parse");
		assert_eq!(header.format, FbxFormat::Binary);
		assert_eq!(header.version, 7400);
		assert_eq!(header.endianness, Endianness::Little);
		assert_eq!(header.data_offset, FbxHeader::BINARY_SIZE);
	}

	#[test]
	fn out_of_range_version_is_rejected() {
		let err = FbxHeader::parse(&binary_prefix(900)).unwrap_err();
		assert!(matches!(err, FbxError::UnsupportedVersion { version: 900 }));
	}

	#[test]
	fn ascii_comment_yields_version_hint() {
		let text = b"; FBX 7.4.0 project file\nFBXHeaderExtension: {\n}\n";
		let header = FbxHeader::parse(text).expect("parse");
		assert_eq!(header.format, FbxFormat::Ascii);
		assert_eq!(header.version, 7400);
	}

	#[test]
	fn garbage_is_not_an_fbx_file() {
		let err = FbxHeader::parse(&[0_u8, 1, 2, 3, 4, 5]).unwrap_err();
		assert!(matches!(err, FbxError::NotAnFbxFile { magic: [0, 1, 2, 3] }));
	}

	#[test]
	fn record_width_switches_at_7500() {
		assert_eq!(record_header_size(7400), 13);
		assert_eq!(record_header_size(7500), 25);
	}
}
