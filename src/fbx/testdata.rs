use crate::fbx::header::{BINARY_MAGIC, record_header_size};
use crate::fbx::inflate::adler32;

/// Synthetic binary FBX stream writer for deterministic tests.
///
/// Produces little-endian streams in either record width. Values must be
/// added to a node before its first child. Compressed arrays use stored
/// (uncompressed) DEFLATE blocks, which every conforming inflater accepts.
pub struct BinaryFbxWriter {
	bytes: Vec<u8>,
	version: u32,
	open: Vec<OpenRecord>,
}

struct OpenRecord {
	header_pos: usize,
	values_start: usize,
	num_values: u64,
	has_children: bool,
	frozen_values_len: Option<u64>,
}

impl BinaryFbxWriter {
	/// Start a stream with magic, endianness flag, and version word.
	pub fn new(version: u32) -> Self {
		let mut bytes = BINARY_MAGIC.to_vec();
		bytes.push(0);
		bytes.extend_from_slice(&version.to_le_bytes());
		Self {
			bytes,
			version,
			open: Vec::new(),
		}
	}

	fn wide(&self) -> bool {
		self.version >= 7500
	}

	fn push_offset_word(&mut self, value: u64) {
		if self.wide() {
			self.bytes.extend_from_slice(&value.to_le_bytes());
		} else {
			self.bytes.extend_from_slice(&(value as u32).to_le_bytes());
		}
	}

	/// Open a record; close it with [`Self::end_node`].
	pub fn begin_node(&mut self, name: &str) {
		let child_start = self.bytes.len();
		if let Some(parent) = self.open.last_mut() {
			if !parent.has_children {
				parent.frozen_values_len = Some((child_start - parent.values_start) as u64);
			}
			parent.has_children = true;
		}

		let header_pos = self.bytes.len();
		self.push_offset_word(0);
		self.push_offset_word(0);
		self.push_offset_word(0);
		self.bytes.push(name.len() as u8);
		self.bytes.extend_from_slice(name.as_bytes());

		let values_start = self.bytes.len();
		self.open.push(OpenRecord {
			header_pos,
			values_start,
			num_values: 0,
			has_children: false,
			frozen_values_len: None,
		});
	}

	/// Close the current record, patching its header.
	pub fn end_node(&mut self) {
		let record = self.open.pop().expect("end_node without begin_node");
		if record.has_children {
			// Terminating all-zero sentinel for the nested list.
			let sentinel = record_header_size(self.version);
			self.bytes.extend(std::iter::repeat_n(0_u8, sentinel));
		}

		let end_offset = self.bytes.len() as u64;
		let values_len = self.values_len(&record);
		self.patch_header(&record, end_offset, values_len);
	}

	fn values_len(&self, record: &OpenRecord) -> u64 {
		// Frozen when the first child opened; values precede children.
		record
			.frozen_values_len
			.unwrap_or((self.bytes.len() - record.values_start) as u64)
	}

	fn patch_header(&mut self, record: &OpenRecord, end_offset: u64, values_len: u64) {
		let wide = self.wide();
		let word = if wide { 8 } else { 4 };
		let at = record.header_pos;
		if wide {
			self.bytes[at..at + 8].copy_from_slice(&end_offset.to_le_bytes());
			self.bytes[at + word..at + word + 8].copy_from_slice(&record.num_values.to_le_bytes());
			self.bytes[at + 2 * word..at + 2 * word + 8].copy_from_slice(&values_len.to_le_bytes());
		} else {
			self.bytes[at..at + 4].copy_from_slice(&(end_offset as u32).to_le_bytes());
			self.bytes[at + word..at + word + 4].copy_from_slice(&(record.num_values as u32).to_le_bytes());
			self.bytes[at + 2 * word..at + 2 * word + 4].copy_from_slice(&(values_len as u32).to_le_bytes());
		}
	}

	/// Terminate the top-level record list with a sentinel.
	pub fn finish_top_level(&mut self) {
		assert!(self.open.is_empty(), "unclosed records at finish");
		let sentinel = record_header_size(self.version);
		self.bytes.extend(std::iter::repeat_n(0_u8, sentinel));
	}

	/// Consume the writer, returning the stream bytes.
	pub fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}

	fn bump_value(&mut self) {
		let record = self.open.last_mut().expect("value outside a record");
		assert!(!record.has_children, "values must precede children");
		record.num_values += 1;
	}

	/// Append an `I` (i32) scalar value.
	pub fn value_i32(&mut self, value: i32) {
		self.bump_value();
		self.bytes.push(b'I');
		self.bytes.extend_from_slice(&value.to_le_bytes());
	}

	/// Append an `L` (i64) scalar value.
	pub fn value_i64(&mut self, value: i64) {
		self.bump_value();
		self.bytes.push(b'L');
		self.bytes.extend_from_slice(&value.to_le_bytes());
	}

	/// Append a `D` (f64) scalar value.
	pub fn value_f64(&mut self, value: f64) {
		self.bump_value();
		self.bytes.push(b'D');
		self.bytes.extend_from_slice(&value.to_le_bytes());
	}

	/// Append a `C` (bool) scalar value.
	pub fn value_bool(&mut self, value: bool) {
		self.bump_value();
		self.bytes.push(b'C');
		self.bytes.push(u8::from(value));
	}

	/// Append an `S` (string) scalar value.
	pub fn value_str(&mut self, value: &str) {
		self.bump_value();
		self.bytes.push(b'S');
		self.bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
		self.bytes.extend_from_slice(value.as_bytes());
	}

	/// Append an `R` (raw bytes) scalar value.
	pub fn value_bytes(&mut self, value: &[u8]) {
		self.bump_value();
		self.bytes.push(b'R');
		self.bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
		self.bytes.extend_from_slice(value);
	}

	fn raw_array(&mut self, code: u8, count: usize, payload: &[u8], deflate: bool) -> usize {
		self.bump_value();
		self.bytes.push(code);
		let (encoding, encoded): (u32, Vec<u8>) = if deflate {
			(1, zlib_stored(payload))
		} else {
			(0, payload.to_vec())
		};
		self.bytes.extend_from_slice(&(count as u32).to_le_bytes());
		self.bytes.extend_from_slice(&encoding.to_le_bytes());
		self.bytes.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
		let data_pos = self.bytes.len();
		self.bytes.extend_from_slice(&encoded);
		data_pos
	}

	/// Child node holding one raw `i` array.
	pub fn array_i32(&mut self, name: &str, values: &[i32]) {
		let payload: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
		self.begin_node(name);
		self.raw_array(b'i', values.len(), &payload, false);
		self.end_node();
	}

	/// Child node holding one zlib-compressed `i` array; returns the
	/// absolute offset of the 2-byte zlib header for corruption tests.
	pub fn array_i32_deflate(&mut self, name: &str, values: &[i32]) -> usize {
		let payload: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
		self.begin_node(name);
		let pos = self.raw_array(b'i', values.len(), &payload, true);
		self.end_node();
		pos
	}

	/// Child node holding one raw `l` array.
	pub fn array_i64(&mut self, name: &str, values: &[i64]) {
		let payload: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
		self.begin_node(name);
		self.raw_array(b'l', values.len(), &payload, false);
		self.end_node();
	}

	/// Child node holding one raw `f` array.
	pub fn array_f32(&mut self, name: &str, values: &[f32]) {
		let payload: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
		self.begin_node(name);
		self.raw_array(b'f', values.len(), &payload, false);
		self.end_node();
	}

	/// Child node holding one raw `d` array.
	pub fn array_f64(&mut self, name: &str, values: &[f64]) {
		let payload: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
		self.begin_node(name);
		self.raw_array(b'd', values.len(), &payload, false);
		self.end_node();
	}

	/// Child node with scalar values only, in one call.
	pub fn leaf_i64(&mut self, name: &str, value: i64) {
		self.begin_node(name);
		self.value_i64(value);
		self.end_node();
	}

	/// Child node with one string value, in one call.
	pub fn leaf_str(&mut self, name: &str, value: &str) {
		self.begin_node(name);
		self.value_str(value);
		self.end_node();
	}
}

/// zlib-wrap `data` using stored (uncompressed) DEFLATE blocks.
pub fn zlib_stored(data: &[u8]) -> Vec<u8> {
	let mut out = vec![0x78, 0x01];
	let mut chunks = data.chunks(0xFFFF).peekable();
	if data.is_empty() {
		out.extend_from_slice(&[0x01, 0x00, 0x00, 0xFF, 0xFF]);
	}
	while let Some(chunk) = chunks.next() {
		let last = chunks.peek().is_none();
		out.push(u8::from(last));
		out.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
		out.extend_from_slice(&(!(chunk.len() as u16)).to_le_bytes());
		out.extend_from_slice(chunk);
	}
	out.extend_from_slice(&adler32(data).to_be_bytes());
	out
}
