use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, FbxError>;

/// Maximum retained context frames per error, deepest first.
pub const MAX_ERROR_FRAMES: usize = 16;

/// One recorded propagation step for a failed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorFrame {
	/// Operation label at the failure or propagation site.
	pub location: &'static str,
	/// Source line of the frame-push site.
	pub line: u32,
	/// Condition or step that was being checked.
	pub condition: &'static str,
}

/// Errors produced while reading, parsing, and linking FBX data.
#[derive(Debug, Error)]
pub enum FbxError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Leading bytes match neither the binary magic nor ASCII text.
	#[error("not an FBX file (magic={magic:?})")]
	NotAnFbxFile {
		/// First up-to-4 bytes of the stream.
		magic: [u8; 4],
	},
	/// File version is outside the supported range.
	#[error("unsupported FBX version {version}")]
	UnsupportedVersion {
		/// Parsed FBX version (for example `7400`).
		version: u32,
	},
	/// Not enough bytes remained for a requested read.
	#[error("truncated file at offset {at}, need {need} bytes, remaining {rem}")]
	TruncatedFile {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Node record declared an end offset outside the file.
	#[error("node record at {at} declares end offset {end} beyond file size {file_size}")]
	NodeEndOutOfRange {
		/// Record start offset.
		at: usize,
		/// Declared end offset.
		end: u64,
		/// Total file size.
		file_size: usize,
	},
	/// Unknown value type code inside a binary node record.
	#[error("unknown value type code {code:?} at offset {at}")]
	BadValueTypeCode {
		/// Offending type code byte.
		code: char,
		/// File offset of the code byte.
		at: usize,
	},
	/// Unknown array encoding inside a binary array sub-header.
	#[error("unknown array encoding {encoding} at offset {at}")]
	BadArrayEncoding {
		/// Offending encoding word.
		encoding: u32,
		/// File offset of the sub-header.
		at: usize,
	},
	/// Declared array bytes disagree with element count and type.
	#[error("array size mismatch: {count} elements of {elem_size} bytes in {declared} declared bytes")]
	ArraySizeMismatch {
		/// Declared element count.
		count: usize,
		/// Element byte size for the type code.
		elem_size: usize,
		/// Declared payload byte size.
		declared: usize,
	},
	/// Node nesting exceeded the depth ceiling.
	#[error("node depth exceeded (max={max_depth})")]
	DepthExceeded {
		/// Configured depth ceiling.
		max_depth: u32,
	},
	/// Embedded DEFLATE data failed to decode.
	#[error("deflate: {0}")]
	Deflate(#[from] InflateError),
	/// ASCII token stream violated the grammar.
	#[error("ascii syntax error at line {line}: {what}")]
	AsciiSyntax {
		/// 1-based source line.
		line: u32,
		/// Short description of the violation.
		what: &'static str,
	},
	/// Strict mode rejected a repairable geometry defect.
	#[error("polygon index list does not end with a terminating (bit-complemented) index")]
	BadPolygonTerminator,
	/// Strict mode rejected an out-of-bounds index.
	#[error("index {index} out of bounds for {what} of length {len}")]
	IndexOutOfBounds {
		/// Offending index value.
		index: i64,
		/// Buffer the index points into.
		what: &'static str,
		/// Buffer length.
		len: usize,
	},
	/// NURBS knot vector was not non-decreasing.
	#[error("non-monotonic knot vector at span {span}")]
	BadKnotVector {
		/// First offending knot index.
		span: usize,
	},
	/// Allocation failed at the system level.
	#[error("out of memory allocating {bytes} bytes")]
	OutOfMemory {
		/// Requested byte count.
		bytes: usize,
	},
	/// Configured memory budget exceeded.
	#[error("memory limit exceeded: {used} + {requested} > {limit} bytes")]
	MemoryLimitExceeded {
		/// Bytes charged so far.
		used: u64,
		/// Bytes requested by the failing charge.
		requested: u64,
		/// Configured ceiling.
		limit: u64,
	},
	/// Configured allocation count budget exceeded.
	#[error("allocation limit exceeded: {count} allocations, limit {limit}")]
	AllocationLimitExceeded {
		/// Allocations performed so far.
		count: u64,
		/// Configured ceiling.
		limit: u64,
	},
	/// Size computation would overflow the platform word.
	#[error("size overflow: {size} * {count}")]
	SizeOverflow {
		/// Element size operand.
		size: usize,
		/// Element count operand.
		count: usize,
	},
	/// Progress callback requested cancellation.
	#[error("cancelled by progress callback")]
	Cancelled,
	/// Context frames recorded while the error propagated, deepest first.
	#[error("{kind}")]
	Framed {
		/// Underlying error.
		kind: Box<FbxError>,
		/// Recorded frames, deepest first, bounded.
		frames: Vec<ErrorFrame>,
	},
}

impl FbxError {
	/// Return the recorded propagation frames, deepest first.
	pub fn frames(&self) -> &[ErrorFrame] {
		match self {
			Self::Framed { frames, .. } => frames,
			_ => &[],
		}
	}

	/// Return the innermost error, unwrapping frame records.
	pub fn root(&self) -> &FbxError {
		match self {
			Self::Framed { kind, .. } => kind.root(),
			other => other,
		}
	}

	/// Append a frame, keeping at most [`MAX_ERROR_FRAMES`] deepest entries.
	pub fn push_frame(self, frame: ErrorFrame) -> Self {
		match self {
			Self::Framed { kind, mut frames } => {
				if frames.len() < MAX_ERROR_FRAMES {
					frames.push(frame);
				}
				Self::Framed { kind, frames }
			}
			other => Self::Framed {
				kind: Box::new(other),
				frames: vec![frame],
			},
		}
	}
}

/// Frame-pushing extension for fallible operations.
pub trait Frames {
	/// Record `(location, line, condition)` on the error path.
	fn frame(self, location: &'static str, line: u32, condition: &'static str) -> Self;
}

impl<T> Frames for Result<T> {
	fn frame(self, location: &'static str, line: u32, condition: &'static str) -> Self {
		self.map_err(|err| err.push_frame(ErrorFrame { location, line, condition }))
	}
}

/// Failure modes of the embedded zlib/DEFLATE decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InflateError {
	/// Stream shorter than the 2-byte zlib header.
	#[error("truncated zlib header")]
	TruncatedHeader,
	/// zlib compression method nibble was not 8 (deflate).
	#[error("bad compression method {method} (expected 8)")]
	BadCompressionMethod {
		/// Parsed CM nibble.
		method: u8,
	},
	/// zlib window size exponent out of range.
	#[error("bad compression info {info} (window too large)")]
	BadCompressionInfo {
		/// Parsed CINFO nibble.
		info: u8,
	},
	/// zlib header check bits (FCHECK) were inconsistent.
	#[error("zlib header checksum mismatch")]
	BadHeaderCheck,
	/// Preset dictionaries are not used by FBX streams.
	#[error("preset dictionary not supported")]
	PresetDictionary,
	/// Reserved block type 3 encountered.
	#[error("bad deflate block type")]
	BadBlockType,
	/// Stored block length and its complement disagree.
	#[error("stored block length mismatch")]
	BadStoredLength,
	/// Input ended inside a block.
	#[error("truncated deflate stream")]
	TruncatedStream,
	/// Code length alphabet over-subscribed the code space.
	#[error("overfull huffman code set")]
	OverfullHuffman,
	/// Code length alphabet under-subscribed the code space.
	#[error("incomplete huffman code set")]
	UnderfullHuffman,
	/// No symbols had a non-zero code length.
	#[error("empty huffman code set")]
	EmptyHuffman,
	/// A decoded code had no assigned symbol.
	#[error("invalid huffman code")]
	BadHuffmanCode,
	/// Code-length repeat op had nothing to repeat.
	#[error("code length repeat without previous length")]
	BadLengthRepeat,
	/// Code-length ops produced too many lengths.
	#[error("code length count overflow")]
	TooManyCodeLengths,
	/// Literal/length symbol 286 or 287 decoded.
	#[error("invalid literal/length symbol")]
	BadLengthSymbol,
	/// Distance symbol 30 or 31 decoded.
	#[error("invalid distance symbol")]
	BadDistanceSymbol,
	/// Back-reference distance exceeds produced output.
	#[error("distance too far back")]
	DistanceTooFar,
	/// Output exceeded the destination capacity.
	#[error("destination buffer overflow")]
	OutputOverflow,
	/// Adler-32 trailer did not match the decompressed bytes.
	#[error("adler-32 checksum mismatch")]
	ChecksumMismatch,
	/// Adler-32 trailer was missing or short.
	#[error("truncated adler-32 trailer")]
	TruncatedChecksum,
	/// Progress callback requested cancellation mid-stream.
	#[error("cancelled")]
	Cancelled,
}

#[cfg(test)]
mod tests {
	use super::{ErrorFrame, FbxError, Frames, MAX_ERROR_FRAMES, Result};

	#[test]
	fn frames_accumulate_deepest_first_and_stay_bounded() {
		let mut result: Result<()> = Err(FbxError::DepthExceeded { max_depth: 64 });
		for line in 0..(MAX_ERROR_FRAMES as u32 + 4) {
			result = result.frame("parse_node", line, "child record");
		}

		let err = result.unwrap_err();
		let frames = err.frames();
		assert_eq!(frames.len(), MAX_ERROR_FRAMES);
		assert_eq!(
			frames[0],
			ErrorFrame {
				location: "parse_node",
				line: 0,
				condition: "child record",
			}
		);
		assert!(matches!(err.root(), FbxError::DepthExceeded { max_depth: 64 }));
	}

	#[test]
	fn framed_display_matches_inner_error() {
		let err: Result<()> = Err(FbxError::Cancelled);
		let err = err.frame("load", 1, "header").unwrap_err();
		assert_eq!(err.to_string(), "cancelled by progress callback");
	}
}
