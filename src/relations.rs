/*!
# Relation extraction

DSpace records the parent of an exported object as a DIM field:

```xml
<dim:field mdschema="dc" element="relation" qualifier="isPartOf">hdl:1794/12</dim:field>
```

The values of these fields drive the discovery of the containers (collections
and communities) which have to be exported alongside an object.
*/
use crate::decoder::Decoder;
use crate::error::Result;
use crate::token::{Attribute, Token};

const FIELD: &'static str = "field";

/// URI scheme marker in front of handles in relation values.
pub const HANDLE_SCHEME: &'static str = "hdl:";

fn is_relation_field(attrs: &[Attribute]) -> bool {
	let mut has_relation = false;
	let mut has_is_part_of = false;
	for attr in attrs.iter() {
		match (attr.name.local(), attr.value.as_str()) {
			("element", "relation") => has_relation = true,
			("qualifier", "isPartOf") => has_is_part_of = true,
			_ => (),
		}
	}
	has_relation && has_is_part_of
}

/**
# Streaming relation scanner

Keeps a single flag of lookahead state: an `isPartOf` field start arms it, the
next text token is captured and disarms it. Any other element start and any
element end disarm it, too, so only text between the field start and the
next tag is ever captured.
*/
#[derive(Debug, Default)]
pub struct RelationScanner {
	capture: bool,
	relations: Vec<String>,
}

impl RelationScanner {
	pub fn new() -> Self {
		Self::default()
	}

	/// Observe the next token of the document.
	pub fn feed(&mut self, token: &Token) {
		match token {
			Token::ElementOpen(name, attrs) => {
				self.capture = name.local() == FIELD && is_relation_field(attrs);
			}
			Token::ElementClose(_) => self.capture = false,
			Token::Text(text) => {
				if self.capture {
					self.relations.push(text.clone());
				}
				self.capture = false;
			}
			_ => (),
		}
	}

	/// Relations captured so far, in document order.
	pub fn relations(&self) -> &[String] {
		&self.relations
	}

	pub fn finish(self) -> Vec<String> {
		self.relations
	}
}

/// Extract the values of all `isPartOf` relation fields.
///
/// Values are returned verbatim, in document order and including
/// duplicates. A document without relation fields yields an empty list.
pub fn extract_relations(data: &[u8]) -> Result<Vec<String>> {
	let mut scanner = RelationScanner::new();
	for token in Decoder::new(data)? {
		scanner.feed(&token?);
	}
	Ok(scanner.finish())
}

/// Strip the handle scheme marker from a relation value.
///
/// ```
/// assert_eq!(metsfix::relations::normalize_handle("hdl:1794/12"), "1794/12");
/// assert_eq!(metsfix::relations::normalize_handle("1794/12"), "1794/12");
/// ```
pub fn normalize_handle(value: &str) -> String {
	value.replacen(HANDLE_SCHEME, "", 1)
}

/// Extract the handles of all objects the document is part of.
///
/// This is [`extract_relations`] with [`normalize_handle`] applied to each
/// value.
pub fn extract_handles(data: &[u8]) -> Result<Vec<String>> {
	Ok(extract_relations(data)?
		.iter()
		.map(|value| normalize_handle(value))
		.collect())
}
