/*!
# Structural tokens

The vocabulary shared by the decoder, the encoder and the transformations
built on top of them. A manifest is handled as a flat sequence of [`Token`]s;
no document tree is ever built.
*/
use std::fmt;

use smartstring::alias::String as SmartString;

/// Pair of a namespace identifier and a localpart, used for element and
/// attribute names.
///
/// The namespace identifier is the empty string for unnamespaced names. See
/// [`crate::decoder`] for the conventions applied to namespace declaration
/// attributes.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct QName {
	/// Namespace identifier (usually a URI)
	pub namespace: SmartString,
	/// Local name
	pub local: SmartString,
}

impl QName {
	pub fn new<N: Into<SmartString>, L: Into<SmartString>>(namespace: N, local: L) -> Self {
		Self {
			namespace: namespace.into(),
			local: local.into(),
		}
	}

	/// Construct a name without namespace.
	pub fn unqualified<L: Into<SmartString>>(local: L) -> Self {
		Self::new("", local)
	}

	pub fn local(&self) -> &str {
		self.local.as_str()
	}

	pub fn namespace(&self) -> &str {
		self.namespace.as_str()
	}
}

impl fmt::Display for QName {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		if self.namespace.is_empty() {
			f.write_str(&self.local)
		} else {
			write!(f, "{{{}}}{}", self.namespace, self.local)
		}
	}
}

/// A single attribute of an element start.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Attribute {
	pub name: QName,
	/// Value as written in the source, without the surrounding quotes.
	pub value: String,
}

impl Attribute {
	pub fn new<V: Into<String>>(name: QName, value: V) -> Self {
		Self {
			name,
			value: value.into(),
		}
	}
}

/**
# One structural event of a manifest

Tokens own their data, so that they can outlive the buffer they were decoded
from (see [`crate::groups::Harvester`]).
*/
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
	/// The start of an element.
	ElementOpen(
		/// Name of the element
		QName,
		/// Attributes in document order, namespace declarations included.
		Vec<Attribute>,
	),

	/// The end of an element.
	///
	/// `<x/>` in the source is reported as an open immediately followed by a
	/// close.
	ElementClose(QName),

	/// Character data.
	///
	/// The text is kept as written: references are not expanded and CDATA
	/// sections keep their delimiters. It may be empty or consist of
	/// whitespace only.
	Text(String),

	/// A processing instruction. The XML declaration is reported with the
	/// target `xml`.
	ProcessingInstruction {
		target: String,
		instruction: String,
	},

	/// A comment. Manifests are not expected to contain any.
	Comment(String),

	/// A DOCTYPE declaration or one of its internal parts.
	Directive(String),
}

impl Token {
	/// Local name of the element opened or closed by this token.
	pub fn local_name(&self) -> Option<&str> {
		match self {
			Self::ElementOpen(name, _) | Self::ElementClose(name) => Some(name.local()),
			_ => None,
		}
	}

	/// Whether this token opens an element with the given local name.
	pub fn opens(&self, local: &str) -> bool {
		matches!(self, Self::ElementOpen(name, _) if name.local() == local)
	}

	/// Whether this token closes an element with the given local name.
	pub fn closes(&self, local: &str) -> bool {
		matches!(self, Self::ElementClose(name) if name.local() == local)
	}

	/// Value of the first attribute with the given local name, for element
	/// starts.
	///
	/// The namespace of the attribute is not considered.
	pub fn attribute(&self, local: &str) -> Option<&str> {
		match self {
			Self::ElementOpen(_, attrs) => attrs
				.iter()
				.find(|attr| attr.name.local() == local)
				.map(|attr| attr.value.as_str()),
			_ => None,
		}
	}
}
