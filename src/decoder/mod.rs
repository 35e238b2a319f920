/*!
# Decoding manifests into tokens

The [`Decoder`] sits on top of the raw [`xmlparser::Tokenizer`], which reports
element heads, attributes and element ends as separate pieces with their
literal prefixes. The decoder combines those pieces into [`Token`]s and
resolves the prefixes into namespace identifiers using a stack of in-scope
declarations.

Namespace declaration attributes are *not* swallowed: the encoder writes
tokens back out without any namespace bookkeeping of its own, so the
declarations have to travel with the element. They are reported with
pseudo-names:

* `xmlns="..."` as `("", "xmlns")`
* `xmlns:p="..."` as `("xmlns", "p")`

Unprefixed attributes have the empty namespace identifier, as in Namespaces
in XML 1.0.
*/
use std::collections::HashMap;

use smartstring::alias::String as SmartString;
use xmlparser::{ElementEnd, Token as RawToken, Tokenizer};

use crate::error::DecodeError;
use crate::namespaces::NS_XMLNS;
use crate::token::{Attribute, QName, Token};

/// Namespace bound to the reserved `xml` prefix.
pub const XMLNS_XML: &'static str = "http://www.w3.org/XML/1998/namespace";

struct ElementScratchpad {
	prefix: SmartString,
	local: SmartString,
	attributes: Vec<(SmartString, SmartString, String)>,
	default_decl: Option<SmartString>,
	nsdecl: HashMap<SmartString, SmartString>,
}

impl ElementScratchpad {
	fn new(prefix: &str, local: &str) -> Self {
		Self {
			prefix: prefix.into(),
			local: local.into(),
			attributes: Vec::new(),
			default_decl: None,
			nsdecl: HashMap::new(),
		}
	}
}

struct Scope {
	// literal name, to match the end tag against
	prefix: SmartString,
	local: SmartString,
	name: QName,
	default_decl: Option<SmartString>,
	nsdecl: HashMap<SmartString, SmartString>,
}

fn literal_name(prefix: &str, local: &str) -> String {
	if prefix.is_empty() {
		local.to_string()
	} else {
		format!("{}:{}", prefix, local)
	}
}

fn declaration_body(raw: &str) -> &str {
	let body = raw.strip_prefix("<?xml").unwrap_or(raw);
	let body = body.strip_suffix("?>").unwrap_or(body);
	body.trim_start()
}

/**
# Namespace-resolving token decoder

Reads [`Token`]s from a complete in-memory document. Besides resolving
prefixes, the decoder checks that end tags match their start tags and that
the input does not end inside an element; other well-formedness constraints
are left to the tokenizer.

The first error poisons the decoder: [`Decoder::next_token`] keeps returning
it, and the [`Iterator`] implementation stops after yielding it once.

```
use metsfix::decoder::Decoder;
use metsfix::Token;

let mut tokens = Decoder::new(b"<mets><agent/></mets>").unwrap();
assert!(matches!(tokens.next_token(), Ok(Some(Token::ElementOpen(..)))));
```
*/
pub struct Decoder<'a> {
	tokenizer: Tokenizer<'a>,
	scopes: Vec<Scope>,
	scratchpad: Option<ElementScratchpad>,
	pending: Option<Token>,
	poison: Option<DecodeError>,
}

impl<'a> Decoder<'a> {
	/// Create a decoder over UTF-8 encoded bytes.
	pub fn new(data: &'a [u8]) -> Result<Self, DecodeError> {
		Ok(Self::from_text(std::str::from_utf8(data)?))
	}

	/// Create a decoder over already validated text.
	pub fn from_text(text: &'a str) -> Self {
		Self {
			tokenizer: Tokenizer::from(text),
			scopes: Vec::new(),
			scratchpad: None,
			pending: None,
			poison: None,
		}
	}

	fn lookup_prefix(&self, prefix: &str) -> Result<SmartString, DecodeError> {
		if prefix.is_empty() {
			for scope in self.scopes.iter().rev() {
				if let Some(nsuri) = scope.default_decl.as_ref() {
					return Ok(nsuri.clone());
				}
			}
			return Ok(SmartString::new());
		}
		if prefix == "xml" {
			return Ok(XMLNS_XML.into());
		}
		for scope in self.scopes.iter().rev() {
			if let Some(nsuri) = scope.nsdecl.get(prefix) {
				return Ok(nsuri.clone());
			}
		}
		Err(DecodeError::UndeclaredPrefix(prefix.to_string()))
	}

	fn push_attribute(&mut self, prefix: &str, local: &str, value: &str) {
		let scratchpad = match self.scratchpad.as_mut() {
			Some(v) => v,
			None => return,
		};
		if prefix == "xmlns" {
			scratchpad.nsdecl.insert(local.into(), value.into());
		} else if prefix.is_empty() && local == "xmlns" {
			scratchpad.default_decl = Some(value.into());
		}
		scratchpad
			.attributes
			.push((prefix.into(), local.into(), value.to_string()));
	}

	fn resolve_attribute(&self, prefix: &str, local: SmartString) -> Result<QName, DecodeError> {
		if prefix.is_empty() {
			// covers the default namespace declaration, too
			return Ok(QName::unqualified(local));
		}
		if prefix == "xmlns" {
			return Ok(QName::new(NS_XMLNS, local));
		}
		Ok(QName::new(self.lookup_prefix(prefix)?, local))
	}

	fn finish_element(&mut self) -> Result<Option<Token>, DecodeError> {
		let ElementScratchpad {
			prefix,
			local,
			attributes: mut rawattributes,
			default_decl,
			nsdecl,
		} = match self.scratchpad.take() {
			Some(v) => v,
			None => return Ok(None),
		};

		// the declarations of the element apply to its own name and attributes
		self.scopes.push(Scope {
			prefix,
			local: local.clone(),
			name: QName::unqualified(local),
			default_decl,
			nsdecl,
		});

		let mut attributes = Vec::with_capacity(rawattributes.len());
		for (prefix, local, value) in rawattributes.drain(..) {
			attributes.push(Attribute::new(
				self.resolve_attribute(&prefix, local)?,
				value,
			));
		}

		let (prefix, local) = match self.scopes.last() {
			Some(scope) => (scope.prefix.clone(), scope.local.clone()),
			None => return Ok(None),
		};
		let name = QName::new(self.lookup_prefix(&prefix)?, local);
		if let Some(scope) = self.scopes.last_mut() {
			scope.name = name.clone();
		}
		Ok(Some(Token::ElementOpen(name, attributes)))
	}

	fn close_element(&mut self, prefix: &str, local: &str) -> Result<Token, DecodeError> {
		let scope = match self.scopes.pop() {
			Some(v) => v,
			None => {
				return Err(DecodeError::ElementMismatch {
					expected: String::new(),
					found: literal_name(prefix, local),
				})
			}
		};
		if scope.prefix.as_str() != prefix || scope.local.as_str() != local {
			return Err(DecodeError::ElementMismatch {
				expected: literal_name(&scope.prefix, &scope.local),
				found: literal_name(prefix, local),
			});
		}
		Ok(Token::ElementClose(scope.name))
	}

	fn process_token(&mut self, raw: RawToken<'a>) -> Result<Option<Token>, DecodeError> {
		// returning Ok(None) does not signal EOF here, but "read more"
		match raw {
			RawToken::Declaration { span, .. } => Ok(Some(Token::ProcessingInstruction {
				target: "xml".to_string(),
				instruction: declaration_body(span.as_str()).to_string(),
			})),
			RawToken::ProcessingInstruction {
				target, content, ..
			} => Ok(Some(Token::ProcessingInstruction {
				target: target.as_str().to_string(),
				instruction: content.map(|c| c.as_str()).unwrap_or("").to_string(),
			})),
			RawToken::Comment { text, .. } => Ok(Some(Token::Comment(text.as_str().to_string()))),
			RawToken::DtdStart { span, .. }
			| RawToken::EmptyDtd { span, .. }
			| RawToken::EntityDeclaration { span, .. }
			| RawToken::DtdEnd { span } => Ok(Some(Token::Directive(span.as_str().to_string()))),
			RawToken::ElementStart { prefix, local, .. } => {
				self.scratchpad = Some(ElementScratchpad::new(prefix.as_str(), local.as_str()));
				Ok(None)
			}
			RawToken::Attribute {
				prefix,
				local,
				value,
				..
			} => {
				self.push_attribute(prefix.as_str(), local.as_str(), value.as_str());
				Ok(None)
			}
			RawToken::ElementEnd { end, .. } => match end {
				ElementEnd::Open => self.finish_element(),
				ElementEnd::Empty => {
					let open = self.finish_element()?;
					if open.is_some() {
						if let Some(scope) = self.scopes.pop() {
							self.pending = Some(Token::ElementClose(scope.name));
						}
					}
					Ok(open)
				}
				ElementEnd::Close(prefix, local) => {
					Ok(Some(self.close_element(prefix.as_str(), local.as_str())?))
				}
			},
			RawToken::Text { text } => Ok(Some(Token::Text(text.as_str().to_string()))),
			RawToken::Cdata { span, .. } => Ok(Some(Token::Text(span.as_str().to_string()))),
		}
	}

	fn advance(&mut self) -> Result<Option<Token>, DecodeError> {
		if let Some(token) = self.pending.take() {
			return Ok(Some(token));
		}
		loop {
			let raw = match self.tokenizer.next() {
				None => {
					if self.scratchpad.is_some() || !self.scopes.is_empty() {
						return Err(DecodeError::InvalidEof);
					}
					return Ok(None);
				}
				Some(raw) => raw?,
			};
			if let Some(token) = self.process_token(raw)? {
				return Ok(Some(token));
			}
		}
	}

	/// Read a single token.
	///
	/// Returns `Ok(None)` at the end of a complete document.
	pub fn next_token(&mut self) -> Result<Option<Token>, DecodeError> {
		if let Some(poison) = self.poison.as_ref() {
			return Err(poison.clone());
		}
		match self.advance() {
			Err(e) => {
				self.poison = Some(e.clone());
				Err(e)
			}
			other => other,
		}
	}
}

impl<'a> Iterator for Decoder<'a> {
	type Item = Result<Token, DecodeError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.poison.is_some() {
			return None;
		}
		self.next_token().transpose()
	}
}

/// Decode a complete document into a vector of tokens.
pub fn decode(data: &[u8]) -> Result<Vec<Token>, DecodeError> {
	Decoder::new(data)?.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::namespaces::{XMLNS_DIM, XMLNS_METS, XMLNS_XSI};

	fn decode_str(doc: &str) -> Result<Vec<Token>, DecodeError> {
		decode(doc.as_bytes())
	}

	fn open(ns: &str, local: &str, attrs: &[(&str, &str, &str)]) -> Token {
		Token::ElementOpen(
			QName::new(ns, local),
			attrs
				.iter()
				.map(|(ns, local, value)| Attribute::new(QName::new(*ns, *local), *value))
				.collect(),
		)
	}

	fn close(ns: &str, local: &str) -> Token {
		Token::ElementClose(QName::new(ns, local))
	}

	#[test]
	fn default_namespace_applies_to_elements_not_attributes() {
		let tokens =
			decode_str("<mets xmlns=\"http://www.loc.gov/METS/\" ID=\"x\"><agent/></mets>").unwrap();
		assert_eq!(
			tokens,
			vec![
				open(
					XMLNS_METS,
					"mets",
					&[("", "xmlns", XMLNS_METS), ("", "ID", "x")]
				),
				open(XMLNS_METS, "agent", &[]),
				close(XMLNS_METS, "agent"),
				close(XMLNS_METS, "mets"),
			]
		);
	}

	#[test]
	fn prefixed_names_resolve_through_declarations() {
		let tokens = decode_str(
			"<dim:dim xmlns:dim=\"http://www.dspace.org/xmlns/dspace/dim\"><dim:field mdschema=\"dc\">x</dim:field></dim:dim>",
		)
		.unwrap();
		assert_eq!(
			tokens,
			vec![
				open(XMLNS_DIM, "dim", &[(NS_XMLNS, "dim", XMLNS_DIM)]),
				open(XMLNS_DIM, "field", &[("", "mdschema", "dc")]),
				Token::Text("x".to_string()),
				close(XMLNS_DIM, "field"),
				close(XMLNS_DIM, "dim"),
			]
		);
	}

	#[test]
	fn long_namespace_identifiers_survive_resolution() {
		let tokens = decode_str(concat!(
			"<mets xmlns=\"http://www.loc.gov/METS/\" ",
			"xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" ",
			"xsi:schemaLocation=\"http://www.loc.gov/METS/ http://www.loc.gov/standards/mets/mets.xsd\">",
			"<xsi:nil/></mets>",
		))
		.unwrap();
		assert_eq!(
			tokens[0],
			open(
				XMLNS_METS,
				"mets",
				&[
					("", "xmlns", XMLNS_METS),
					(NS_XMLNS, "xsi", XMLNS_XSI),
					(
						XMLNS_XSI,
						"schemaLocation",
						"http://www.loc.gov/METS/ http://www.loc.gov/standards/mets/mets.xsd"
					),
				]
			)
		);
		assert_eq!(tokens[1], open(XMLNS_XSI, "nil", &[]));
		assert_eq!(tokens[2], close(XMLNS_XSI, "nil"));
	}

	#[test]
	fn declarations_go_out_of_scope() {
		let err = decode_str("<a><b xmlns:p=\"urn:p\"/><p:c/></a>").unwrap_err();
		assert_eq!(err, DecodeError::UndeclaredPrefix("p".to_string()));
	}

	#[test]
	fn default_namespace_can_be_undeclared() {
		let tokens = decode_str("<a xmlns=\"urn:a\"><b xmlns=\"\"/></a>").unwrap();
		assert_eq!(tokens[1], open("", "b", &[("", "xmlns", "")]));
		assert_eq!(tokens[2], close("", "b"));
	}

	#[test]
	fn xml_prefix_is_predeclared() {
		let tokens = decode_str("<a xml:lang=\"en\"/>").unwrap();
		assert_eq!(tokens[0], open("", "a", &[(XMLNS_XML, "lang", "en")]));
	}

	#[test]
	fn attribute_order_is_preserved() {
		let tokens = decode_str("<a z=\"1\" b=\"2\" m=\"3\"/>").unwrap();
		assert_eq!(
			tokens[0],
			open("", "a", &[("", "z", "1"), ("", "b", "2"), ("", "m", "3")])
		);
	}

	#[test]
	fn text_and_references_are_kept_as_written() {
		let tokens = decode_str("<a>x &amp; y<![CDATA[<z>]]></a>").unwrap();
		assert_eq!(tokens[1], Token::Text("x &amp; y".to_string()));
		assert_eq!(tokens[2], Token::Text("<![CDATA[<z>]]>".to_string()));
	}

	#[test]
	fn xml_declaration_becomes_processing_instruction() {
		let tokens = decode_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>").unwrap();
		assert_eq!(
			tokens[0],
			Token::ProcessingInstruction {
				target: "xml".to_string(),
				instruction: "version=\"1.0\" encoding=\"UTF-8\"".to_string(),
			}
		);
	}

	#[test]
	fn comments_and_doctype_are_reported() {
		let tokens = decode_str("<!DOCTYPE a><a><!-- note --></a>").unwrap();
		assert!(matches!(tokens[0], Token::Directive(_)));
		assert_eq!(tokens[2], Token::Comment(" note ".to_string()));
	}

	#[test]
	fn mismatched_end_tag_is_rejected() {
		let err = decode_str("<a><b></a></b>").unwrap_err();
		assert_eq!(
			err,
			DecodeError::ElementMismatch {
				expected: "b".to_string(),
				found: "a".to_string(),
			}
		);
	}

	#[test]
	fn truncated_document_is_rejected() {
		// depending on where the input stops, the tokenizer may notice first
		assert!(matches!(
			decode_str("<a><b></b>"),
			Err(DecodeError::InvalidEof) | Err(DecodeError::Syntax(_))
		));
	}

	#[test]
	fn invalid_utf8_is_rejected() {
		assert!(matches!(
			decode(b"<a>\xff</a>"),
			Err(DecodeError::InvalidUtf8(_))
		));
	}

	#[test]
	fn decoder_is_poisoned_by_first_error() {
		let mut decoder = Decoder::new(b"<a><p:b/></a>").unwrap();
		assert!(decoder.next_token().unwrap().is_some());
		let err = decoder.next_token().unwrap_err();
		assert_eq!(decoder.next_token().unwrap_err(), err);
	}

	#[test]
	fn iterator_stops_after_error() {
		let mut decoder = Decoder::new(b"<a></b>").unwrap();
		assert!(matches!(decoder.next(), Some(Ok(_))));
		assert!(matches!(decoder.next(), Some(Err(_))));
		assert!(decoder.next().is_none());
	}
}
