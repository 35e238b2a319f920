/*!
# Writer for DSpace METS manifests

This is not a general purpose XML serializer. It reproduces the layout the
DSpace AIP importer is known to accept and refuses everything else:

* names are written with the fixed prefixes of [`crate::namespaces`], no
  namespace declarations are synthesized;
* attribute values and text are written as they are in the token, without
  any escaping. Values are always delimited by `"`, so a value which was
  single-quoted in the source and contains a `"` comes out malformed;
* an element without content is written as `<name></name>`, never as
  `<name/>`;
* whitespace-only text is dropped and replaced by the configured
  indentation, while any other text switches indentation off up to the next
  element boundary;
* comments and directives are rejected.
*/
use bytes::{BufMut, BytesMut};

use crate::error::EncodeError;
use crate::namespaces::qualified_name;
use crate::token::{QName, Token};

fn put_name<O: BufMut>(name: &QName, output: &mut O) -> Result<(), EncodeError> {
	output.put_slice(qualified_name(name)?.as_bytes());
	Ok(())
}

/**
Encodes manifest tokens into buffers.

Encoders are stateful. They can only be used to encode a single document and
have then to be disposed.

```rust
use metsfix::{Attribute, Encoder, QName, Token};

let mut enc = Encoder::with_indent("", "  ");
let mut buf = Vec::new();
let group = QName::unqualified("Group");
enc.encode(&Token::ElementOpen(group.clone(), vec![
	Attribute::new(QName::unqualified("Name"), "Anonymous"),
]), &mut buf).unwrap();
enc.encode(&Token::ElementClose(group), &mut buf).unwrap();
assert_eq!(&buf[..], &b"<Group Name=\"Anonymous\"></Group>"[..]);
```
*/
pub struct Encoder {
	prefix: String,
	indent: String,
	depth: usize,
	// false until the first indentation point and after text
	print_indent: bool,
	// armed by an element start, disarmed by any content
	empty_element: bool,
}

impl Encoder {
	/// Create an encoder which does not indent at all.
	pub fn new() -> Self {
		Self::with_indent("", "")
	}

	/// Create an encoder which puts each tag on a new line, prefixed with
	/// `prefix` and indented with `indent` once per nesting level.
	///
	/// If both are empty, no line breaks are written.
	pub fn with_indent<P: Into<String>, I: Into<String>>(prefix: P, indent: I) -> Self {
		Self {
			prefix: prefix.into(),
			indent: indent.into(),
			depth: 0,
			print_indent: false,
			empty_element: false,
		}
	}

	/// Current nesting depth.
	pub fn depth(&self) -> usize {
		self.depth
	}

	fn write_indent<O: BufMut>(&mut self, output: &mut O) {
		if self.prefix.is_empty() && self.indent.is_empty() {
			return;
		}
		if !self.print_indent {
			// nothing before the first tag, and nothing right after text
			self.print_indent = true;
			return;
		}
		output.put_u8(b'\n');
		output.put_slice(self.prefix.as_bytes());
		for _ in 0..self.depth {
			output.put_slice(self.indent.as_bytes());
		}
	}

	/// Encode a single token into a buffer.
	///
	/// There is no requirement for the buffer to be the same for subsequent
	/// calls to this function.
	///
	/// On error, nothing is written for the offending token, but the output
	/// of earlier tokens stays. The document as a whole should be considered
	/// lost.
	pub fn encode<O: BufMut>(&mut self, token: &Token, output: &mut O) -> Result<(), EncodeError> {
		match token {
			Token::ElementOpen(name, attrs) => {
				// format into scratch space first, so that an unknown
				// namespace does not leave half a tag behind
				let mut tag = BytesMut::new();
				tag.put_u8(b'<');
				put_name(name, &mut tag)?;
				for attr in attrs.iter() {
					tag.put_u8(b' ');
					put_name(&attr.name, &mut tag)?;
					tag.put_slice(b"=\"");
					tag.put_slice(attr.value.as_bytes());
					tag.put_u8(b'"');
				}
				tag.put_u8(b'>');

				self.write_indent(output);
				self.depth += 1;
				output.put_slice(&tag[..]);
				self.empty_element = true;
				Ok(())
			}
			Token::ElementClose(name) => {
				let mut tag = BytesMut::new();
				tag.put_slice(b"</");
				put_name(name, &mut tag)?;
				tag.put_u8(b'>');

				self.depth = self.depth.saturating_sub(1);
				if !self.empty_element {
					self.write_indent(output);
				}
				output.put_slice(&tag[..]);
				self.empty_element = false;
				Ok(())
			}
			Token::Text(text) => {
				if !text.trim().is_empty() {
					output.put_slice(text.as_bytes());
					self.empty_element = false;
					self.print_indent = false;
				}
				Ok(())
			}
			Token::ProcessingInstruction {
				target,
				instruction,
			} => {
				output.put_slice(b"<?");
				output.put_slice(target.as_bytes());
				output.put_u8(b' ');
				output.put_slice(instruction.as_bytes());
				output.put_slice(b"?>");
				Ok(())
			}
			Token::Comment(text) => Err(EncodeError::Comment(text.clone())),
			Token::Directive(text) => Err(EncodeError::Directive(text.clone())),
		}
	}

	/// Encode a single token into a BytesMut.
	pub fn encode_into_bytes(
		&mut self,
		token: &Token,
		output: &mut BytesMut,
	) -> Result<(), EncodeError> {
		self.encode(token, output)
	}
}

impl Default for Encoder {
	fn default() -> Self {
		Self::new()
	}
}

/// Encode a complete token sequence with the given indentation.
pub fn encode<'t, I: IntoIterator<Item = &'t Token>>(
	tokens: I,
	prefix: &str,
	indent: &str,
) -> Result<Vec<u8>, EncodeError> {
	let mut enc = Encoder::with_indent(prefix, indent);
	let mut out = Vec::new();
	for token in tokens {
		enc.encode(token, &mut out)?;
	}
	Ok(out)
}
