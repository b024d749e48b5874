use std::sync::OnceLock;

use crate::fbx::InflateError;

type Result<T> = std::result::Result<T, InflateError>;

const MAX_BITS: usize = 15;
const MAX_LITLEN_SYMBOLS: usize = 288;
const FAST_BITS: u32 = 9;

/// Decode cancellation hook, polled at bounded intervals.
pub type CancelFn<'a> = &'a mut dyn FnMut() -> bool;

/// Decompress a zlib-wrapped DEFLATE stream into at most `max_out` bytes.
///
/// `max_out` is the caller's declared uncompressed size; producing more is
/// a destination overflow, producing less is tolerated (the caller checks
/// the returned length against its own expectations). The Adler-32 trailer
/// is always verified.
pub fn inflate(src: &[u8], max_out: usize) -> Result<Vec<u8>> {
	Inflater::new(src, max_out, None).run()
}

/// [`inflate`] with a cooperative cancellation hook.
///
/// `cancel` is polled at block boundaries and on a bounded symbol interval
/// inside the decode loop; returning `true` aborts with
/// [`InflateError::Cancelled`].
pub fn inflate_cancellable(src: &[u8], max_out: usize, cancel: CancelFn<'_>) -> Result<Vec<u8>> {
	Inflater::new(src, max_out, Some(cancel)).run()
}

struct Inflater<'a, 'c> {
	reader: BitReader<'a>,
	out: Vec<u8>,
	max_out: usize,
	cancel: Option<CancelFn<'c>>,
	symbol_budget: u32,
}

impl<'a, 'c> Inflater<'a, 'c> {
	fn new(src: &'a [u8], max_out: usize, cancel: Option<CancelFn<'c>>) -> Self {
		Self {
			reader: BitReader::new(src),
			out: Vec::new(),
			max_out,
			cancel,
			symbol_budget: 0,
		}
	}

	fn run(mut self) -> Result<Vec<u8>> {
		self.zlib_header()?;

		loop {
			self.checkpoint()?;
			let last = self.reader.read_bits(1)? == 1;
			match self.reader.read_bits(2)? {
				0 => self.stored_block()?,
				1 => {
					let (litlen, dist) = fixed_trees();
					self.compressed_block(litlen, dist)?;
				}
				2 => {
					let (litlen, dist) = self.dynamic_trees()?;
					self.compressed_block(&litlen, &dist)?;
				}
				_ => return Err(InflateError::BadBlockType),
			}
			if last {
				break;
			}
		}

		self.verify_adler()?;
		Ok(self.out)
	}

	fn zlib_header(&mut self) -> Result<()> {
		if self.reader.data.len() < 2 {
			return Err(InflateError::TruncatedHeader);
		}

		let cmf = self.reader.read_bits(8)? as u8;
		let flg = self.reader.read_bits(8)? as u8;

		let method = cmf & 0x0F;
		if method != 8 {
			return Err(InflateError::BadCompressionMethod { method });
		}
		let info = cmf >> 4;
		if info > 7 {
			return Err(InflateError::BadCompressionInfo { info });
		}
		if (u32::from(cmf) * 256 + u32::from(flg)) % 31 != 0 {
			return Err(InflateError::BadHeaderCheck);
		}
		if flg & 0x20 != 0 {
			return Err(InflateError::PresetDictionary);
		}
		Ok(())
	}

	fn checkpoint(&mut self) -> Result<()> {
		if let Some(cancel) = self.cancel.as_mut()
			&& cancel()
		{
			return Err(InflateError::Cancelled);
		}
		self.symbol_budget = 4096;
		Ok(())
	}

	fn stored_block(&mut self) -> Result<()> {
		self.reader.discard_partial_byte();
		let len = self.reader.read_bits(16)? as usize;
		let nlen = self.reader.read_bits(16)? as usize;
		if len != (!nlen & 0xFFFF) {
			return Err(InflateError::BadStoredLength);
		}

		if self.out.len() + len > self.max_out {
			return Err(InflateError::OutputOverflow);
		}
		let bytes = self.reader.read_aligned_bytes(len)?;
		self.out.extend_from_slice(bytes);
		Ok(())
	}

	fn dynamic_trees(&mut self) -> Result<(HuffmanTree, HuffmanTree)> {
		let hlit = self.reader.read_bits(5)? as usize + 257;
		let hdist = self.reader.read_bits(5)? as usize + 1;
		let hclen = self.reader.read_bits(4)? as usize + 4;
		if hlit > 286 || hdist > 30 {
			return Err(InflateError::TooManyCodeLengths);
		}

		// Code-length alphabet, transmitted in its fixed permuted order.
		const ORDER: [usize; 19] = [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];
		let mut cl_lengths = [0_u8; 19];
		for slot in ORDER.iter().take(hclen) {
			cl_lengths[*slot] = self.reader.read_bits(3)? as u8;
		}
		let cl_tree = HuffmanTree::build(&cl_lengths, false)?;

		let total = hlit + hdist;
		let mut lengths = [0_u8; MAX_LITLEN_SYMBOLS + 32];
		let mut index = 0;
		while index < total {
			let symbol = cl_tree.decode(&mut self.reader)?;
			match symbol {
				0..=15 => {
					lengths[index] = symbol as u8;
					index += 1;
				}
				16 => {
					if index == 0 {
						return Err(InflateError::BadLengthRepeat);
					}
					let prev = lengths[index - 1];
					let repeat = 3 + self.reader.read_bits(2)? as usize;
					if index + repeat > total {
						return Err(InflateError::TooManyCodeLengths);
					}
					lengths[index..index + repeat].fill(prev);
					index += repeat;
				}
				17 => {
					let repeat = 3 + self.reader.read_bits(3)? as usize;
					if index + repeat > total {
						return Err(InflateError::TooManyCodeLengths);
					}
					index += repeat;
				}
				18 => {
					let repeat = 11 + self.reader.read_bits(7)? as usize;
					if index + repeat > total {
						return Err(InflateError::TooManyCodeLengths);
					}
					index += repeat;
				}
				_ => return Err(InflateError::BadHuffmanCode),
			}
		}

		let litlen = HuffmanTree::build(&lengths[..hlit], false)?;
		// A single distance code of one bit is legal and incomplete.
		let dist = HuffmanTree::build(&lengths[hlit..total], true)?;
		Ok((litlen, dist))
	}

	fn compressed_block(&mut self, litlen: &HuffmanTree, dist: &HuffmanTree) -> Result<()> {
		const LENGTH_BASE: [u16; 29] = [
			3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131, 163, 195, 227, 258,
		];
		const LENGTH_EXTRA: [u8; 29] = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0];
		const DIST_BASE: [u16; 30] = [
			1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537, 2049, 3073, 4097, 6145,
			8193, 12289, 16385, 24577,
		];
		const DIST_EXTRA: [u8; 30] = [
			0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13, 13,
		];

		loop {
			if self.symbol_budget == 0 {
				self.checkpoint()?;
			}
			self.symbol_budget -= 1;

			let symbol = litlen.decode(&mut self.reader)?;
			match symbol {
				0..=255 => {
					if self.out.len() >= self.max_out {
						return Err(InflateError::OutputOverflow);
					}
					self.out.push(symbol as u8);
				}
				256 => return Ok(()),
				257..=285 => {
					let idx = symbol as usize - 257;
					let length = LENGTH_BASE[idx] as usize + self.reader.read_bits(u32::from(LENGTH_EXTRA[idx]))? as usize;

					let dist_symbol = dist.decode(&mut self.reader)?;
					if dist_symbol >= 30 {
						return Err(InflateError::BadDistanceSymbol);
					}
					let didx = dist_symbol as usize;
					let distance = DIST_BASE[didx] as usize + self.reader.read_bits(u32::from(DIST_EXTRA[didx]))? as usize;

					self.copy_match(distance, length)?;
				}
				_ => return Err(InflateError::BadLengthSymbol),
			}
		}
	}

	fn copy_match(&mut self, distance: usize, length: usize) -> Result<()> {
		if distance > self.out.len() {
			return Err(InflateError::DistanceTooFar);
		}
		if self.out.len() + length > self.max_out {
			return Err(InflateError::OutputOverflow);
		}

		let start = self.out.len() - distance;
		if length <= distance {
			self.out.extend_from_within(start..start + length);
		} else {
			// Overlapping match replicates the trailing pattern.
			for offset in 0..length {
				let byte = self.out[start + offset];
				self.out.push(byte);
			}
		}
		Ok(())
	}

	fn verify_adler(&mut self) -> Result<()> {
		self.reader.discard_partial_byte();
		let trailer = self.reader.read_aligned_bytes(4).map_err(|_| InflateError::TruncatedChecksum)?;
		let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
		if adler32(&self.out) != expected {
			return Err(InflateError::ChecksumMismatch);
		}
		Ok(())
	}
}

/// Adler-32 over `bytes` (RFC 1950).
pub fn adler32(bytes: &[u8]) -> u32 {
	const MOD: u32 = 65521;
	// Largest n with 255n(n+1)/2 + (n+1)(MOD-1) < 2^32.
	const NMAX: usize = 5552;

	let mut a = 1_u32;
	let mut b = 0_u32;
	for chunk in bytes.chunks(NMAX) {
		for byte in chunk {
			a += u32::from(*byte);
			b += a;
		}
		a %= MOD;
		b %= MOD;
	}
	(b << 16) | a
}

/// LSB-first bit reader keeping up to 64 buffered bits.
struct BitReader<'a> {
	data: &'a [u8],
	pos: usize,
	bits: u64,
	num_bits: u32,
}

impl<'a> BitReader<'a> {
	fn new(data: &'a [u8]) -> Self {
		Self {
			data,
			pos: 0,
			bits: 0,
			num_bits: 0,
		}
	}

	fn refill(&mut self) {
		// Top up to at least 56 valid bits whenever input remains.
		while self.num_bits <= 56 && self.pos < self.data.len() {
			self.bits |= u64::from(self.data[self.pos]) << self.num_bits;
			self.pos += 1;
			self.num_bits += 8;
		}
	}

	fn read_bits(&mut self, count: u32) -> Result<u32> {
		if count == 0 {
			return Ok(0);
		}
		self.refill();
		if self.num_bits < count {
			return Err(InflateError::TruncatedStream);
		}

		let value = (self.bits & ((1_u64 << count) - 1)) as u32;
		self.bits >>= count;
		self.num_bits -= count;
		Ok(value)
	}

	fn peek_bits(&mut self, count: u32) -> (u32, u32) {
		self.refill();
		let available = self.num_bits.min(count);
		((self.bits & ((1_u64 << count) - 1)) as u32, available)
	}

	fn consume(&mut self, count: u32) {
		debug_assert!(self.num_bits >= count);
		self.bits >>= count;
		self.num_bits -= count;
	}

	fn discard_partial_byte(&mut self) {
		let partial = self.num_bits % 8;
		self.bits >>= partial;
		self.num_bits -= partial;
	}

	fn read_aligned_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
		debug_assert_eq!(self.num_bits % 8, 0);
		// Serve buffered whole bytes by rewinding the input position.
		let buffered = (self.num_bits / 8) as usize;
		let start = self.pos - buffered;
		if start + count > self.data.len() {
			return Err(InflateError::TruncatedStream);
		}

		self.bits = 0;
		self.num_bits = 0;
		self.pos = start + count;
		Ok(&self.data[start..start + count])
	}
}

/// Canonical Huffman decoding table.
///
/// Codes of up to [`FAST_BITS`] bits resolve through a direct table lookup;
/// longer codes fall back to a bit-at-a-time canonical walk.
struct HuffmanTree {
	counts: [u16; MAX_BITS + 1],
	symbols: [u16; MAX_LITLEN_SYMBOLS],
	fast: Vec<u16>,
}

impl HuffmanTree {
	/// Build from per-symbol code lengths.
	///
	/// `allow_incomplete_single` tolerates an under-subscribed code space
	/// when at most one symbol is coded (the RFC 1951 distance-tree case);
	/// decoding an unassigned code still fails at use time.
	fn build(lengths: &[u8], allow_incomplete_single: bool) -> Result<Self> {
		let mut counts = [0_u16; MAX_BITS + 1];
		for length in lengths {
			counts[usize::from(*length)] += 1;
		}

		let coded = lengths.len() - usize::from(counts[0]);
		if coded == 0 {
			if allow_incomplete_single {
				return Ok(Self {
					counts,
					symbols: [0; MAX_LITLEN_SYMBOLS],
					fast: vec![0; 1 << FAST_BITS],
				});
			}
			return Err(InflateError::EmptyHuffman);
		}

		// Prefix-code completeness: the code space must never go negative
		// and must be exactly consumed.
		let mut left = 1_i32;
		for length in 1..=MAX_BITS {
			left <<= 1;
			left -= i32::from(counts[length]);
			if left < 0 {
				return Err(InflateError::OverfullHuffman);
			}
		}
		if left > 0 && !(allow_incomplete_single && coded == 1) {
			return Err(InflateError::UnderfullHuffman);
		}

		// Symbol table sorted by (code length, symbol index).
		let mut offsets = [0_u16; MAX_BITS + 1];
		for length in 1..MAX_BITS {
			offsets[length + 1] = offsets[length] + counts[length];
		}
		let mut symbols = [0_u16; MAX_LITLEN_SYMBOLS];
		for (symbol, length) in lengths.iter().enumerate() {
			if *length != 0 {
				symbols[usize::from(offsets[usize::from(*length)])] = symbol as u16;
				offsets[usize::from(*length)] += 1;
			}
		}

		let mut tree = Self {
			counts,
			symbols,
			fast: vec![0; 1 << FAST_BITS],
		};
		tree.build_fast_table();
		Ok(tree)
	}

	fn build_fast_table(&mut self) {
		let mut code = 0_u32;
		let mut index = 0_usize;
		for length in 1..=MAX_BITS as u32 {
			for _ in 0..self.counts[length as usize] {
				let symbol = self.symbols[index];
				index += 1;
				if length <= FAST_BITS {
					let reversed = reverse_bits(code, length);
					let entry = ((length as u16) << 12) | (symbol + 1);
					// Every padding of the high bits maps to this symbol.
					let step = 1_u32 << length;
					let mut slot = reversed;
					while slot < (1 << FAST_BITS) {
						self.fast[slot as usize] = entry;
						slot += step;
					}
				}
				code += 1;
			}
			code <<= 1;
		}
	}

	fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
		let (peek, available) = reader.peek_bits(FAST_BITS);
		let entry = self.fast[peek as usize];
		if entry != 0 {
			let length = u32::from(entry >> 12);
			if length <= available {
				reader.consume(length);
				return Ok((entry & 0x0FFF) - 1);
			}
		}
		self.decode_slow(reader)
	}

	fn decode_slow(&self, reader: &mut BitReader<'_>) -> Result<u16> {
		let mut code = 0_u32;
		let mut first = 0_u32;
		let mut index = 0_u32;
		for length in 1..=MAX_BITS {
			code |= reader.read_bits(1)?;
			let count = u32::from(self.counts[length]);
			if code.wrapping_sub(first) < count {
				return Ok(self.symbols[(index + (code - first)) as usize]);
			}
			index += count;
			first = (first + count) << 1;
			code <<= 1;
		}
		Err(InflateError::BadHuffmanCode)
	}
}

fn reverse_bits(code: u32, length: u32) -> u32 {
	let mut reversed = 0_u32;
	for bit in 0..length {
		reversed |= ((code >> bit) & 1) << (length - 1 - bit);
	}
	reversed
}

/// Fixed literal/length and distance trees (RFC 1951 §3.2.6), built once.
fn fixed_trees() -> (&'static HuffmanTree, &'static HuffmanTree) {
	static TREES: OnceLock<(HuffmanTree, HuffmanTree)> = OnceLock::new();
	let (litlen, dist) = TREES.get_or_init(|| {
		let mut litlen_lengths = [0_u8; MAX_LITLEN_SYMBOLS];
		for (symbol, length) in litlen_lengths.iter_mut().enumerate() {
			*length = match symbol {
				0..=143 => 8,
				144..=255 => 9,
				256..=279 => 7,
				_ => 8,
			};
		}
		// All 32 five-bit distance codes are assigned, including the two
		// symbols that are invalid to emit; decoding them is caught later.
		let dist_lengths = [5_u8; 32];
		(
			HuffmanTree::build(&litlen_lengths, false).expect("fixed litlen tree is complete"),
			HuffmanTree::build(&dist_lengths, false).expect("fixed distance tree is complete"),
		)
	});
	(litlen, dist)
}

#[cfg(test)]
mod tests {
	use super::{adler32, inflate, inflate_cancellable};
	use crate::fbx::InflateError;

	fn deflate(data: &[u8], level: u32) -> Vec<u8> {
		use std::io::Write;
		let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level));
		encoder.write_all(data).expect("deflate write");
		encoder.finish().expect("deflate finish")
	}

	#[test]
	fn roundtrip_empty_input() {
		let compressed = deflate(&[], 6);
		assert_eq!(inflate(&compressed, 0).expect("inflate"), Vec::<u8>::new());
	}

	#[test]
	fn roundtrip_short_input() {
		let data = b"abc";
		let compressed = deflate(data, 6);
		assert_eq!(inflate(&compressed, data.len()).expect("inflate"), data);
	}

	#[test]
	fn roundtrip_single_block_repetitive() {
		let data: Vec<u8> = b"FBX vertex stream ".iter().copied().cycle().take(4096).collect();
		let compressed = deflate(&data, 6);
		assert_eq!(inflate(&compressed, data.len()).expect("inflate"), data);
	}

	#[test]
	fn roundtrip_stored_blocks() {
		// Level 0 produces stored (uncompressed) deflate blocks.
		let data: Vec<u8> = (0..100_000_u32).map(|value| (value * 7) as u8).collect();
		let compressed = deflate(&data, 0);
		assert_eq!(inflate(&compressed, data.len()).expect("inflate"), data);
	}

	#[test]
	fn roundtrip_multi_block_mixed_content() {
		// Incompressible noise then long runs: forces multiple block types.
		let mut data = Vec::new();
		let mut state = 0x12345_u32;
		for _ in 0..70_000 {
			state = state.wrapping_mul(1664525).wrapping_add(1013904223);
			data.push((state >> 24) as u8);
		}
		data.extend(std::iter::repeat_n(0x41_u8, 120_000));
		let compressed = deflate(&data, 9);
		assert_eq!(inflate(&compressed, data.len()).expect("inflate"), data);
	}

	#[test]
	fn bad_compression_method_is_reported() {
		// CM nibble 7 instead of 8; header check digits fixed up.
		let mut compressed = deflate(b"data", 6);
		compressed[0] = 0x77;
		compressed[1] = 31 - ((u32::from(compressed[0]) * 256) % 31) as u8;
		assert_eq!(
			inflate(&compressed, 4).unwrap_err(),
			InflateError::BadCompressionMethod { method: 7 }
		);
	}

	#[test]
	fn corrupt_header_check_is_reported() {
		let mut compressed = deflate(b"data", 6);
		compressed[1] ^= 0x01;
		assert_eq!(inflate(&compressed, 4).unwrap_err(), InflateError::BadHeaderCheck);
	}

	#[test]
	fn overfull_code_lengths_fail_cleanly() {
		// Dynamic block: HLIT=257, HDIST=1, HCLEN=4 with four one-bit
		// code-length codes over-subscribing the 1-bit code space.
		let mut bits = BitWriter::new();
		bits.push(0x78, 8);
		bits.push(0x9C, 8);
		bits.push(1, 1); // final
		bits.push(2, 2); // dynamic
		bits.push(0, 5); // hlit
		bits.push(0, 5); // hdist
		bits.push(0, 4); // hclen = 4 codes: 16, 17, 18, 0
		bits.push(1, 3);
		bits.push(1, 3);
		bits.push(1, 3);
		bits.push(1, 3);
		let stream = bits.finish();
		assert_eq!(inflate(&stream, 16).unwrap_err(), InflateError::OverfullHuffman);
	}

	#[test]
	fn underfull_code_lengths_fail_cleanly() {
		// Single 2-bit code for the code-length alphabet leaves half the
		// code space unused.
		let mut bits = BitWriter::new();
		bits.push(0x78, 8);
		bits.push(0x9C, 8);
		bits.push(1, 1);
		bits.push(2, 2);
		bits.push(0, 5);
		bits.push(0, 5);
		bits.push(0, 4);
		bits.push(2, 3);
		bits.push(0, 3);
		bits.push(0, 3);
		bits.push(0, 3);
		let stream = bits.finish();
		assert_eq!(inflate(&stream, 16).unwrap_err(), InflateError::UnderfullHuffman);
	}

	#[test]
	fn truncated_stream_is_reported() {
		let compressed = deflate(b"some longer payload for truncation", 6);
		let cut = &compressed[..compressed.len() / 2];
		let err = inflate(cut, 64).unwrap_err();
		assert!(matches!(err, InflateError::TruncatedStream | InflateError::TruncatedChecksum), "got {err:?}");
	}

	#[test]
	fn checksum_mismatch_is_reported() {
		let mut compressed = deflate(b"checksummed payload", 6);
		let last = compressed.len() - 1;
		compressed[last] ^= 0xFF;
		assert_eq!(inflate(&compressed, 64).unwrap_err(), InflateError::ChecksumMismatch);
	}

	#[test]
	fn output_overflow_is_reported() {
		let compressed = deflate(&[0_u8; 1000], 6);
		assert_eq!(inflate(&compressed, 999).unwrap_err(), InflateError::OutputOverflow);
	}

	#[test]
	fn cancellation_aborts_mid_stream() {
		// Incompressible input decodes mostly as literals, so the symbol
		// interval checkpoint fires many times.
		let mut state = 0x2F6E_2B1_u32;
		let data: Vec<u8> = (0..1 << 20)
			.map(|_| {
				state = state.wrapping_mul(1664525).wrapping_add(1013904223);
				(state >> 24) as u8
			})
			.collect();
		let compressed = deflate(&data, 6);
		let mut polls = 0_u32;
		let mut cancel = || {
			polls += 1;
			polls > 2
		};
		assert_eq!(
			inflate_cancellable(&compressed, data.len(), &mut cancel).unwrap_err(),
			InflateError::Cancelled
		);
		assert_eq!(polls, 3);
	}

	#[test]
	fn adler32_matches_reference_values() {
		assert_eq!(adler32(b""), 1);
		assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
	}

	struct BitWriter {
		bytes: Vec<u8>,
		bits: u32,
		num_bits: u32,
	}

	impl BitWriter {
		fn new() -> Self {
			Self {
				bytes: Vec::new(),
				bits: 0,
				num_bits: 0,
			}
		}

		fn push(&mut self, value: u32, count: u32) {
			self.bits |= value << self.num_bits;
			self.num_bits += count;
			while self.num_bits >= 8 {
				self.bytes.push((self.bits & 0xFF) as u8);
				self.bits >>= 8;
				self.num_bits -= 8;
			}
		}

		fn finish(mut self) -> Vec<u8> {
			if self.num_bits > 0 {
				self.bytes.push((self.bits & 0xFF) as u8);
			}
			// Room for the decoder to attempt the adler trailer.
			self.bytes.extend_from_slice(&[0, 0, 0, 0]);
			self.bytes
		}
	}
}
