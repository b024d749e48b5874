use crate::fbx::budget::MemoryBudget;
use crate::fbx::cursor::{Cursor, Endianness, ProgressTracker};
use crate::fbx::header::{FbxHeader, record_header_size};
use crate::fbx::inflate::inflate_cancellable;
use crate::fbx::node::{ArrayData, ArrayKind, GenericNode, NodeValues, Value};
use crate::fbx::schema::{ParseContext, array_spec, child_context};
use crate::fbx::strings::StringPool;
use crate::fbx::{FbxError, Frames, Result};

/// Nesting ceiling for node records; deeper files are rejected.
pub const MAX_NODE_DEPTH: u32 = 64;

/// Shared mutable parse services threaded through both readers.
pub struct ParseEnv<'a, 'p> {
	/// String interning pool for the load.
	pub pool: &'p mut StringPool,
	/// Allocation accounting for the load.
	pub budget: &'p mut MemoryBudget,
	/// Progress reporting and cancellation.
	pub progress: &'p mut ProgressTracker<'a>,
}

/// Parse the binary record stream into a synthetic root node.
///
/// Bytes after the top-level terminating sentinel are ignored, so trailing
/// garbage does not fail the load as long as declared lengths are
/// consistent.
pub fn parse_binary(bytes: &[u8], header: &FbxHeader, env: &mut ParseEnv<'_, '_>) -> Result<GenericNode> {
	let mut parser = BinaryParser {
		cursor: Cursor::at_offset(bytes, header.data_offset),
		endianness: header.endianness,
		header_size: record_header_size(header.version),
		env,
	};

	let mut root = GenericNode::named(parser.env.pool.empty());
	loop {
		if parser.cursor.remaining() < parser.header_size {
			// Writers may omit the final sentinel before the footer.
			break;
		}
		match parser.parse_node(ParseContext::Root, 0).frame("parse_binary", line!(), "top-level record")? {
			Some(node) => root.children.push(node),
			None => break,
		}
	}
	Ok(root)
}

struct BinaryParser<'a, 'b, 'cb, 'p> {
	cursor: Cursor<'a>,
	endianness: Endianness,
	header_size: usize,
	env: &'b mut ParseEnv<'cb, 'p>,
}

impl BinaryParser<'_, '_, '_, '_> {
	fn read_offset_word(&mut self) -> Result<u64> {
		if self.header_size == 25 {
			self.cursor.read_u64(self.endianness)
		} else {
			Ok(u64::from(self.cursor.read_u32(self.endianness)?))
		}
	}

	/// Parse one record; `None` is the all-zero terminating sentinel.
	fn parse_node(&mut self, context: ParseContext, depth: u32) -> Result<Option<GenericNode>> {
		if depth >= MAX_NODE_DEPTH {
			return Err(FbxError::DepthExceeded { max_depth: MAX_NODE_DEPTH });
		}

		let record_start = self.cursor.pos();
		self.env.progress.update(record_start as u64)?;

		let end_offset = self.read_offset_word()?;
		let num_values = self.read_offset_word()?;
		let values_len = self.read_offset_word()?;
		let name_len = self.cursor.read_u8()? as usize;

		if end_offset == 0 && num_values == 0 && name_len == 0 {
			return Ok(None);
		}

		let end_offset = usize::try_from(end_offset).map_err(|_| FbxError::NodeEndOutOfRange {
			at: record_start,
			end: u64::MAX,
			file_size: self.cursor.len(),
		})?;
		if end_offset > self.cursor.len() || end_offset <= record_start {
			return Err(FbxError::NodeEndOutOfRange {
				at: record_start,
				end: end_offset as u64,
				file_size: self.cursor.len(),
			});
		}

		let name_bytes = self.cursor.read_exact(name_len)?;
		let name = self.env.pool.intern_bytes(self.env.budget, name_bytes)?;

		let values_start = self.cursor.pos();
		let values_end = values_start.saturating_add(values_len as usize).min(end_offset);
		let values = self
			.parse_values(context, name.as_ref(), num_values as usize, values_end)
			.frame("parse_node", line!(), "value list")?;
		// Skip any value bytes a lenient writer left unconsumed.
		self.cursor.seek(values_end)?;

		let mut node = GenericNode {
			name,
			values,
			children: Vec::new(),
		};

		let child_ctx = child_context(context, node.name.as_ref());
		while self.cursor.pos() < end_offset {
			match self.parse_node(child_ctx, depth + 1)? {
				Some(child) => node.children.push(child),
				None => break,
			}
		}
		self.cursor.seek(end_offset)?;

		Ok(Some(node))
	}

	fn parse_values(&mut self, context: ParseContext, name: &str, num_values: usize, values_end: usize) -> Result<NodeValues> {
		if num_values == 0 {
			return Ok(NodeValues::empty());
		}

		// Peek the first type code to route array records.
		let first_code = self.cursor.read_u8()?;
		if matches!(first_code, b'b' | b'c' | b'i' | b'l' | b'f' | b'd') {
			let array = self.parse_array(first_code, array_spec(context, name))?;
			return Ok(NodeValues::Array(array));
		}

		let mut values = Vec::with_capacity(num_values.min(16));
		values.push(self.parse_scalar(first_code)?);
		for _ in 1..num_values {
			if self.cursor.pos() >= values_end {
				// Declared count overruns the declared byte region.
				return Err(FbxError::TruncatedFile {
					at: self.cursor.pos(),
					need: 1,
					rem: 0,
				});
			}
			let code = self.cursor.read_u8()?;
			if matches!(code, b'b' | b'c' | b'i' | b'l' | b'f' | b'd') {
				// Mixed scalar/array value lists are not a thing the format
				// produces; treat as corruption.
				return Err(FbxError::BadValueTypeCode {
					code: code as char,
					at: self.cursor.pos() - 1,
				});
			}
			values.push(self.parse_scalar(code)?);
		}
		Ok(NodeValues::Scalars(values))
	}

	fn parse_scalar(&mut self, code: u8) -> Result<Value> {
		let endianness = self.endianness;
		match code {
			b'C' | b'B' => Ok(Value::Bool(self.cursor.read_u8()? & 1 != 0)),
			b'Y' => Ok(Value::I64(i64::from(self.cursor.read_i16(endianness)?))),
			b'I' => Ok(Value::I64(i64::from(self.cursor.read_i32(endianness)?))),
			b'L' => Ok(Value::I64(self.cursor.read_i64(endianness)?)),
			b'F' => Ok(Value::F64(f64::from(self.cursor.read_f32(endianness)?))),
			b'D' => Ok(Value::F64(self.cursor.read_f64(endianness)?)),
			b'S' => {
				let len = self.cursor.read_u32(endianness)? as usize;
				let bytes = self.cursor.read_exact(len)?;
				Ok(Value::String(self.env.pool.intern_bytes(self.env.budget, bytes)?))
			}
			b'R' => {
				let len = self.cursor.read_u32(endianness)? as usize;
				let bytes = self.cursor.read_exact(len)?;
				self.env.budget.charge(len)?;
				Ok(Value::Bytes(bytes.to_vec()))
			}
			other => Err(FbxError::BadValueTypeCode {
				code: other as char,
				at: self.cursor.pos().saturating_sub(1),
			}),
		}
	}

	fn parse_array(&mut self, code: u8, spec: Option<crate::fbx::schema::ArraySpec>) -> Result<ArrayData> {
		let endianness = self.endianness;
		let sub_header_at = self.cursor.pos();
		let count = self.cursor.read_u32(endianness)? as usize;
		let encoding = self.cursor.read_u32(endianness)?;
		let encoded_len = self.cursor.read_u32(endianness)? as usize;

		let native_kind = match code {
			b'b' | b'c' => ArrayKind::Bool,
			b'i' => ArrayKind::I32,
			b'l' => ArrayKind::I64,
			b'f' => ArrayKind::F32,
			b'd' => ArrayKind::F64,
			_ => {
				return Err(FbxError::BadValueTypeCode {
					code: code as char,
					at: sub_header_at.saturating_sub(1),
				});
			}
		};
		let elem_size = element_size(native_kind);
		let expected_len = self.env.budget.charge_array(elem_size, count)?;

		let raw: Vec<u8>;
		let data: &[u8] = match encoding {
			0 => {
				if encoded_len < expected_len && !spec.map(|spec| spec.pad_zero).unwrap_or(false) {
					return Err(FbxError::ArraySizeMismatch {
						count,
						elem_size,
						declared: encoded_len,
					});
				}
				self.cursor.read_exact(encoded_len)?
			}
			1 => {
				let compressed = self.cursor.read_exact(encoded_len)?;
				let progress = &mut *self.env.progress;
				let base = sub_header_at as u64;
				let mut cancel = || progress.update(base).is_err() || progress.is_cancelled();
				raw = inflate_cancellable(compressed, expected_len, &mut cancel).map_err(|err| {
					if progress.is_cancelled() {
						FbxError::Cancelled
					} else {
						FbxError::from(err)
					}
				})?;
				if raw.len() < expected_len && !spec.map(|spec| spec.pad_zero).unwrap_or(false) {
					return Err(FbxError::ArraySizeMismatch {
						count,
						elem_size,
						declared: raw.len(),
					});
				}
				&raw
			}
			other => {
				return Err(FbxError::BadArrayEncoding {
					encoding: other,
					at: sub_header_at,
				});
			}
		};

		let mut bytes = data;
		let padded: Vec<u8>;
		if bytes.len() < expected_len {
			let mut grown = bytes.to_vec();
			grown.resize(expected_len, 0);
			padded = grown;
			bytes = &padded;
		}

		let native = decode_array_bytes(&bytes[..expected_len], native_kind, endianness);
		Ok(match spec {
			Some(spec) => coerce_array(native, spec.kind),
			None => native,
		})
	}
}

fn element_size(kind: ArrayKind) -> usize {
	match kind {
		ArrayKind::Bool => 1,
		ArrayKind::I32 | ArrayKind::F32 => 4,
		ArrayKind::I64 | ArrayKind::F64 => 8,
	}
}

/// Decode a packed little- or big-endian byte run into native storage.
fn decode_array_bytes(bytes: &[u8], kind: ArrayKind, endianness: Endianness) -> ArrayData {
	match kind {
		ArrayKind::Bool => ArrayData::Bool(bytes.iter().map(|byte| byte & 1 != 0).collect()),
		ArrayKind::I32 => ArrayData::I32(
			bytes
				.chunks_exact(4)
				.map(|chunk| {
					let word = [chunk[0], chunk[1], chunk[2], chunk[3]];
					match endianness {
						Endianness::Little => i32::from_le_bytes(word),
						Endianness::Big => i32::from_be_bytes(word),
					}
				})
				.collect(),
		),
		ArrayKind::I64 => ArrayData::I64(
			bytes
				.chunks_exact(8)
				.map(|chunk| {
					let mut word = [0_u8; 8];
					word.copy_from_slice(chunk);
					match endianness {
						Endianness::Little => i64::from_le_bytes(word),
						Endianness::Big => i64::from_be_bytes(word),
					}
				})
				.collect(),
		),
		ArrayKind::F32 => ArrayData::F32(
			bytes
				.chunks_exact(4)
				.map(|chunk| {
					let word = [chunk[0], chunk[1], chunk[2], chunk[3]];
					match endianness {
						Endianness::Little => f32::from_le_bytes(word),
						Endianness::Big => f32::from_be_bytes(word),
					}
				})
				.collect(),
		),
		ArrayKind::F64 => ArrayData::F64(
			bytes
				.chunks_exact(8)
				.map(|chunk| {
					let mut word = [0_u8; 8];
					word.copy_from_slice(chunk);
					match endianness {
						Endianness::Little => f64::from_le_bytes(word),
						Endianness::Big => f64::from_be_bytes(word),
					}
				})
				.collect(),
		),
	}
}

/// Convert native storage into the schema-selected canonical kind.
fn coerce_array(array: ArrayData, kind: ArrayKind) -> ArrayData {
	if array.kind() == kind {
		return array;
	}
	match kind {
		ArrayKind::Bool => ArrayData::Bool(array.to_i64_vec().into_iter().map(|value| value != 0).collect()),
		ArrayKind::I32 => ArrayData::I32(array.to_i32_vec()),
		ArrayKind::I64 => ArrayData::I64(array.to_i64_vec()),
		ArrayKind::F32 => ArrayData::F32(array.to_f64_vec().into_iter().map(|value| value as f32).collect()),
		ArrayKind::F64 => ArrayData::F64(array.to_f64_vec()),
	}
}

#[cfg(test)]
mod tests {
	use super::{MAX_NODE_DEPTH, ParseEnv, parse_binary};
	use crate::fbx::budget::MemoryBudget;
	use crate::fbx::cursor::ProgressTracker;
	use crate::fbx::header::FbxHeader;
	use crate::fbx::node::ArrayData;
	use crate::fbx::strings::StringPool;
	use crate::fbx::testdata::BinaryFbxWriter;
	use crate::fbx::{BudgetLimits, FbxError};

	fn parse(bytes: &[u8]) -> crate::fbx::Result<crate::fbx::GenericNode> {
		let header = FbxHeader::parse(bytes)?;
		let mut budget = MemoryBudget::new(BudgetLimits::default());
		let mut pool = StringPool::new(&mut budget)?;
		let mut progress = ProgressTracker::new(None, bytes.len() as u64, u64::MAX);
		let mut env = ParseEnv {
			pool: &mut pool,
			budget: &mut budget,
			progress: &mut progress,
		};
		parse_binary(bytes, &header, &mut env)
	}

	#[test]
	fn scalar_values_parse_in_order() {
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("Test");
		writer.value_i32(42);
		writer.value_str("hello");
		writer.value_f64(1.5);
		writer.end_node();
		writer.finish_top_level();

		let root = parse(&writer.into_bytes()).expect("parse");
		let node = root.child("Test").expect("node");
		assert_eq!(node.value_i64(0), Some(42));
		assert_eq!(node.value_str(1), Some("hello"));
		assert_eq!(node.value_f64(2), Some(1.5));
	}

	#[test]
	fn typed_arrays_coerce_per_schema_context() {
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("Objects");
		writer.begin_node("Geometry");
		writer.value_i64(1);
		writer.value_str("Geometry::Plane\u{0}\u{1}Geometry");
		writer.value_str("Mesh");
		writer.array_f32("Vertices", &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
		writer.end_node();
		writer.end_node();
		writer.finish_top_level();

		let root = parse(&writer.into_bytes()).expect("parse");
		let geometry = root.child("Objects").unwrap().child("Geometry").unwrap();
		// f32 payload coerced into the canonical f64 destination.
		match geometry.find_array("Vertices").expect("array") {
			ArrayData::F64(values) => assert_eq!(values.len(), 9),
			other => panic!("expected f64 array, got {other:?}"),
		}
	}

	#[test]
	fn compressed_arrays_inflate_transparently() {
		let values: Vec<i32> = (0..1024).map(|value| (value % 7) - 3).collect();
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("Objects");
		writer.begin_node("Geometry");
		writer.array_i32_deflate("PolygonVertexIndex", &values);
		writer.end_node();
		writer.end_node();
		writer.finish_top_level();

		let root = parse(&writer.into_bytes()).expect("parse");
		let geometry = root.child("Objects").unwrap().child("Geometry").unwrap();
		match geometry.find_array("PolygonVertexIndex").expect("array") {
			ArrayData::I32(parsed) => assert_eq!(*parsed, values),
			other => panic!("expected i32 array, got {other:?}"),
		}
	}

	#[test]
	fn corrupted_zlib_header_fails_with_compression_method() {
		let values = vec![0_i32; 64];
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("Objects");
		writer.begin_node("Geometry");
		let patch_pos = writer.array_i32_deflate("Vertices", &values);
		writer.end_node();
		writer.end_node();
		writer.finish_top_level();

		let mut bytes = writer.into_bytes();
		// CMF lower nibble 7: wrong compression method, checksum fixed up.
		bytes[patch_pos] = 0x77;
		bytes[patch_pos + 1] = (31 - ((u32::from(bytes[patch_pos]) * 256) % 31)) as u8;

		let err = parse(&bytes).unwrap_err();
		assert!(err.root().to_string().contains("compression method"), "got {err}");
	}

	#[test]
	fn depth_beyond_limit_is_rejected() {
		let mut writer = BinaryFbxWriter::new(7400);
		for _ in 0..=MAX_NODE_DEPTH {
			writer.begin_node("N");
		}
		for _ in 0..=MAX_NODE_DEPTH {
			writer.end_node();
		}
		writer.finish_top_level();

		let err = parse(&writer.into_bytes()).unwrap_err();
		assert!(matches!(err.root(), FbxError::DepthExceeded { max_depth: 64 }));
	}

	#[test]
	fn trailing_garbage_after_sentinel_is_ignored() {
		let mut writer = BinaryFbxWriter::new(7400);
		writer.begin_node("Objects");
		writer.end_node();
		writer.finish_top_level();
		let mut bytes = writer.into_bytes();
		bytes.extend_from_slice(&[0xAB, 0xCD]);

		let root = parse(&bytes).expect("parse ignores trailing bytes");
		assert_eq!(root.children.len(), 1);
	}

	#[test]
	fn version_7500_uses_wide_record_headers() {
		let mut writer = BinaryFbxWriter::new(7500);
		writer.begin_node("Objects");
		writer.value_i64(7);
		writer.end_node();
		writer.finish_top_level();

		let root = parse(&writer.into_bytes()).expect("parse");
		assert_eq!(root.child("Objects").unwrap().value_i64(0), Some(7));
	}
}
