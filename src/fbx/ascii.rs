use crate::fbx::arena::ChunkStack;
use crate::fbx::binary::{MAX_NODE_DEPTH, ParseEnv};
use crate::fbx::node::{ArrayData, ArrayKind, GenericNode, NodeValues, Value};
use crate::fbx::schema::{ParseContext, array_spec, child_context};
use crate::fbx::{FbxError, Frames, Result};

/// Parse the ASCII text form into a synthetic root node.
pub fn parse_ascii(bytes: &[u8], env: &mut ParseEnv<'_, '_>) -> Result<GenericNode> {
	let limits = *env.budget.limits();
	let mut parser = AsciiParser {
		lexer: Lexer::new(bytes),
		// Reusable scratch for long numeric lists; cleared per array.
		int_scratch: ChunkStack::new(&limits),
		float_scratch: ChunkStack::new(&limits),
		env,
	};

	let mut root = GenericNode::named(parser.env.pool.empty());
	loop {
		parser.env.progress.update(parser.lexer.pos as u64)?;
		match parser.lexer.peek()? {
			Token::End => break,
			Token::Ident(_) => {
				let node = parser.parse_node(ParseContext::Root, 0).frame("parse_ascii", line!(), "top-level node")?;
				root.children.push(node);
			}
			_ => {
				return Err(FbxError::AsciiSyntax {
					line: parser.lexer.line,
					what: "expected node name",
				});
			}
		}
	}
	Ok(root)
}

struct AsciiParser<'a, 'b, 'cb, 'p> {
	lexer: Lexer<'a>,
	int_scratch: ChunkStack<i64>,
	float_scratch: ChunkStack<f64>,
	env: &'b mut ParseEnv<'cb, 'p>,
}

impl AsciiParser<'_, '_, '_, '_> {
	fn parse_node(&mut self, context: ParseContext, depth: u32) -> Result<GenericNode> {
		if depth >= MAX_NODE_DEPTH {
			return Err(FbxError::DepthExceeded { max_depth: MAX_NODE_DEPTH });
		}

		let name = match self.lexer.next()? {
			Token::Ident(name) => self.env.pool.intern(self.env.budget, &name)?,
			_ => {
				return Err(FbxError::AsciiSyntax {
					line: self.lexer.line,
					what: "expected node name",
				});
			}
		};
		self.expect(Token::Colon, "expected ':' after node name")?;

		let mut node = GenericNode::named(name);
		node.values = self.parse_values(context, node.name.as_ref())?;

		if matches!(self.lexer.peek()?, Token::OpenBrace) {
			self.lexer.next()?;
			let child_ctx = child_context(context, node.name.as_ref());
			loop {
				self.env.progress.update(self.lexer.pos as u64)?;
				match self.lexer.peek()? {
					Token::CloseBrace => {
						self.lexer.next()?;
						break;
					}
					Token::Ident(_) => {
						let child = self.parse_node(child_ctx, depth + 1)?;
						node.children.push(child);
					}
					Token::End => {
						return Err(FbxError::AsciiSyntax {
							line: self.lexer.line,
							what: "unterminated '{' block",
						});
					}
					_ => {
						return Err(FbxError::AsciiSyntax {
							line: self.lexer.line,
							what: "expected child node or '}'",
						});
					}
				}
			}
		}

		Ok(node)
	}

	fn parse_values(&mut self, context: ParseContext, name: &str) -> Result<NodeValues> {
		if matches!(self.lexer.peek()?, Token::Star) {
			return self.parse_star_array(context, name);
		}

		let mut values: Vec<Value> = Vec::new();
		loop {
			match self.lexer.peek()? {
				Token::Int(value) => {
					values.push(Value::I64(*value));
					self.lexer.next()?;
				}
				Token::Float(value) => {
					values.push(Value::F64(*value));
					self.lexer.next()?;
				}
				Token::Str(_) => {
					if let Token::Str(text) = self.lexer.next()? {
						values.push(Value::String(self.env.pool.intern(self.env.budget, &text)?));
					}
				}
				Token::Ident(word) => {
					// Bare words inside value lists: single-letter booleans
					// from 7.x writers, anything else kept as a string.
					match word.as_str() {
						"T" | "Y" => {
							values.push(Value::Bool(true));
							self.lexer.next()?;
						}
						"F" | "N" => {
							values.push(Value::Bool(false));
							self.lexer.next()?;
						}
						_ => {
							// A bare identifier starts the next node when no
							// comma is pending; stop the value list here.
							break;
						}
					}
				}
				_ => break,
			}

			if matches!(self.lexer.peek()?, Token::Comma) {
				self.lexer.next()?;
				continue;
			}
			break;
		}

		// Long numeric lists in array contexts become typed arrays, which
		// is how pre-7000 writers emit geometry without the `*N` form.
		if let Some(spec) = array_spec(context, name)
			&& !values.is_empty()
			&& values.iter().all(|value| matches!(value, Value::I64(_) | Value::F64(_)))
		{
			return Ok(NodeValues::Array(collect_numeric(&values, spec.kind)));
		}

		Ok(NodeValues::Scalars(values))
	}

	fn parse_star_array(&mut self, context: ParseContext, name: &str) -> Result<NodeValues> {
		self.lexer.next()?;
		let declared = match self.lexer.next()? {
			Token::Int(value) if value >= 0 => value as usize,
			_ => {
				return Err(FbxError::AsciiSyntax {
					line: self.lexer.line,
					what: "expected element count after '*'",
				});
			}
		};
		self.expect(Token::OpenBrace, "expected '{' after array count")?;

		// Optional `a:` key before the element list.
		if let Token::Ident(word) = self.lexer.peek()?
			&& word == "a"
		{
			self.lexer.next()?;
			self.expect(Token::Colon, "expected ':' after 'a'")?;
		}

		// Elements accumulate in the reusable scratch stacks (both
		// widths, so integer precision survives) and pop out contiguous
		// once the count is known.
		self.int_scratch.clear();
		self.float_scratch.clear();
		let mut all_int = true;
		loop {
			match self.lexer.peek()? {
				Token::Int(value) => {
					let value = *value;
					self.int_scratch.push(self.env.budget, value)?;
					self.float_scratch.push(self.env.budget, value as f64)?;
					self.lexer.next()?;
				}
				Token::Float(value) => {
					let value = *value;
					all_int = false;
					self.int_scratch.push(self.env.budget, value as i64)?;
					self.float_scratch.push(self.env.budget, value)?;
					self.lexer.next()?;
				}
				Token::Comma => {
					self.lexer.next()?;
				}
				Token::CloseBrace => {
					self.lexer.next()?;
					break;
				}
				_ => {
					return Err(FbxError::AsciiSyntax {
						line: self.lexer.line,
						what: "expected number inside array",
					});
				}
			}
		}

		let count = self.int_scratch.num_items();
		if count != declared {
			log::debug!("array {name:?} declared {declared} elements, found {count}");
		}
		let kind = array_spec(context, name)
			.map(|spec| spec.kind)
			.unwrap_or(if all_int { ArrayKind::I64 } else { ArrayKind::F64 });

		let array = match kind {
			ArrayKind::Bool => {
				self.float_scratch.pop_discard(count);
				ArrayData::Bool(self.int_scratch.pop_vec(count).into_iter().map(|value| value != 0).collect())
			}
			ArrayKind::I32 => {
				self.float_scratch.pop_discard(count);
				ArrayData::I32(self.int_scratch.pop_vec(count).into_iter().map(|value| value as i32).collect())
			}
			ArrayKind::I64 => {
				self.float_scratch.pop_discard(count);
				ArrayData::I64(self.int_scratch.pop_vec(count))
			}
			ArrayKind::F32 => {
				self.int_scratch.pop_discard(count);
				ArrayData::F32(self.float_scratch.pop_vec(count).into_iter().map(|value| value as f32).collect())
			}
			ArrayKind::F64 => {
				self.int_scratch.pop_discard(count);
				ArrayData::F64(self.float_scratch.pop_vec(count))
			}
		};
		Ok(NodeValues::Array(array))
	}

	fn expect(&mut self, token: Token, what: &'static str) -> Result<()> {
		let next = self.lexer.next()?;
		if std::mem::discriminant(&next) != std::mem::discriminant(&token) {
			return Err(FbxError::AsciiSyntax {
				line: self.lexer.line,
				what,
			});
		}
		Ok(())
	}
}

fn collect_numeric(values: &[Value], kind: ArrayKind) -> ArrayData {
	match kind {
		ArrayKind::Bool => ArrayData::Bool(values.iter().map(|value| value.as_i64().unwrap_or(0) != 0).collect()),
		ArrayKind::I32 => ArrayData::I32(values.iter().map(|value| value.as_i64().unwrap_or(0) as i32).collect()),
		ArrayKind::I64 => ArrayData::I64(values.iter().map(|value| value.as_i64().unwrap_or(0)).collect()),
		ArrayKind::F32 => ArrayData::F32(values.iter().map(|value| value.as_f64().unwrap_or(0.0) as f32).collect()),
		ArrayKind::F64 => ArrayData::F64(values.iter().map(|value| value.as_f64().unwrap_or(0.0)).collect()),
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Ident(String),
	Str(String),
	Int(i64),
	Float(f64),
	Colon,
	Comma,
	Star,
	OpenBrace,
	CloseBrace,
	End,
}

struct Lexer<'a> {
	bytes: &'a [u8],
	pos: usize,
	line: u32,
	peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
	fn new(bytes: &'a [u8]) -> Self {
		Self {
			bytes,
			pos: 0,
			line: 1,
			peeked: None,
		}
	}

	fn peek(&mut self) -> Result<&Token> {
		if self.peeked.is_none() {
			let token = self.lex()?;
			self.peeked = Some(token);
		}
		Ok(self.peeked.get_or_insert(Token::End))
	}

	fn next(&mut self) -> Result<Token> {
		if let Some(token) = self.peeked.take() {
			return Ok(token);
		}
		self.lex()
	}

	fn lex(&mut self) -> Result<Token> {
		self.skip_whitespace_and_comments();
		let Some(byte) = self.bytes.get(self.pos).copied() else {
			return Ok(Token::End);
		};

		match byte {
			b':' => {
				self.pos += 1;
				Ok(Token::Colon)
			}
			b',' => {
				self.pos += 1;
				Ok(Token::Comma)
			}
			b'*' => {
				self.pos += 1;
				Ok(Token::Star)
			}
			b'{' => {
				self.pos += 1;
				Ok(Token::OpenBrace)
			}
			b'}' => {
				self.pos += 1;
				Ok(Token::CloseBrace)
			}
			b'"' => self.lex_string(),
			b'-' | b'+' | b'0'..=b'9' | b'.' => self.lex_number(),
			_ if is_ident_byte(byte) => Ok(self.lex_ident()),
			_ => Err(FbxError::AsciiSyntax {
				line: self.line,
				what: "unexpected character",
			}),
		}
	}

	fn skip_whitespace_and_comments(&mut self) {
		while let Some(byte) = self.bytes.get(self.pos).copied() {
			match byte {
				b'\n' => {
					self.line += 1;
					self.pos += 1;
				}
				b' ' | b'\t' | b'\r' => self.pos += 1,
				b';' => {
					while let Some(byte) = self.bytes.get(self.pos).copied() {
						self.pos += 1;
						if byte == b'\n' {
							self.line += 1;
							break;
						}
					}
				}
				_ => break,
			}
		}
	}

	fn lex_string(&mut self) -> Result<Token> {
		self.pos += 1;
		let start = self.pos;
		while let Some(byte) = self.bytes.get(self.pos).copied() {
			if byte == b'"' {
				let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
				self.pos += 1;
				return Ok(Token::Str(text));
			}
			if byte == b'\n' {
				self.line += 1;
			}
			self.pos += 1;
		}
		Err(FbxError::AsciiSyntax {
			line: self.line,
			what: "unterminated string",
		})
	}

	fn lex_number(&mut self) -> Result<Token> {
		let start = self.pos;
		let mut is_float = false;
		while let Some(byte) = self.bytes.get(self.pos).copied() {
			match byte {
				b'0'..=b'9' | b'-' | b'+' => self.pos += 1,
				b'.' | b'e' | b'E' => {
					is_float = true;
					self.pos += 1;
				}
				_ => break,
			}
		}

		let text = std::str::from_utf8(&self.bytes[start..self.pos]).map_err(|_| FbxError::AsciiSyntax {
			line: self.line,
			what: "malformed number",
		})?;

		if is_float {
			let value = text.parse::<f64>().map_err(|_| FbxError::AsciiSyntax {
				line: self.line,
				what: "malformed float",
			})?;
			Ok(Token::Float(value))
		} else {
			let value = text.parse::<i64>().map_err(|_| FbxError::AsciiSyntax {
				line: self.line,
				what: "malformed integer",
			})?;
			Ok(Token::Int(value))
		}
	}

	fn lex_ident(&mut self) -> Token {
		let start = self.pos;
		while let Some(byte) = self.bytes.get(self.pos).copied() {
			if is_ident_byte(byte) || byte.is_ascii_digit() {
				self.pos += 1;
			} else {
				break;
			}
		}
		Token::Ident(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
	}
}

fn is_ident_byte(byte: u8) -> bool {
	byte.is_ascii_alphabetic() || byte == b'_' || byte == b'|'
}
