/*!
# Error types

This module holds the error types returned by the various functions of this
crate.

Every error is fatal for the document being processed: nothing is retried and
no partial output is produced. Whether a failing document aborts a whole batch
is up to the caller.
*/
use std::error;
use std::fmt;
use std::result::Result as StdResult;
use std::str::Utf8Error;

/// The input could not be decoded into a well-formed token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
	/// The input is not valid UTF-8.
	InvalidUtf8(Utf8Error),

	/// The tokenizer rejected the input.
	Syntax(xmlparser::Error),

	/// Use of a namespace prefix which is not declared on the element or any
	/// of its ancestors.
	UndeclaredPrefix(String),

	/// An end tag does not match the innermost open element.
	ElementMismatch {
		/// Name of the innermost open element, or empty if there is none.
		expected: String,
		/// Name found in the end tag.
		found: String,
	},

	/// The input ended while elements were still open.
	InvalidEof,
}

impl error::Error for DecodeError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::InvalidUtf8(e) => Some(e),
			Self::Syntax(e) => Some(e),
			_ => None,
		}
	}
}

impl fmt::Display for DecodeError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::InvalidUtf8(e) => write!(f, "invalid utf-8: {}", e),
			Self::Syntax(e) => write!(f, "invalid syntax: {}", e),
			Self::UndeclaredPrefix(prefix) => {
				write!(f, "use of undeclared namespace prefix {:?}", prefix)
			}
			Self::ElementMismatch { expected, found } if expected.is_empty() => {
				write!(f, "end tag {:?} without open element", found)
			}
			Self::ElementMismatch { expected, found } => write!(
				f,
				"end tag {:?} does not match start tag {:?}",
				found, expected
			),
			Self::InvalidEof => f.write_str("eof with unclosed elements"),
		}
	}
}

impl From<Utf8Error> for DecodeError {
	fn from(other: Utf8Error) -> Self {
		Self::InvalidUtf8(other)
	}
}

impl From<xmlparser::Error> for DecodeError {
	fn from(other: xmlparser::Error) -> Self {
		Self::Syntax(other)
	}
}

/// A namespace identifier outside of the fixed table of
/// [`crate::namespaces`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNamespace(pub String);

impl error::Error for UnknownNamespace {}

impl fmt::Display for UnknownNamespace {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "no prefix known for namespace {:?}", self.0)
	}
}

/// The token stream contains something the encoder refuses to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
	/// Comments are not expected in manifests.
	Comment(String),

	/// DOCTYPE declarations are not expected in manifests.
	Directive(String),

	/// An element or attribute name uses a namespace without known prefix.
	UnknownNamespace(UnknownNamespace),
}

impl error::Error for EncodeError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::UnknownNamespace(e) => Some(e),
			_ => None,
		}
	}
}

impl fmt::Display for EncodeError {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Comment(text) => write!(f, "unsupported comment: {:?}", text),
			Self::Directive(text) => write!(f, "unsupported directive: {:?}", text),
			Self::UnknownNamespace(e) => fmt::Display::fmt(e, f),
		}
	}
}

impl From<UnknownNamespace> for EncodeError {
	fn from(other: UnknownNamespace) -> Self {
		Self::UnknownNamespace(other)
	}
}

/// Error type returned by the document-level functions of this crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// The input is not a well-formed document.
	Malformed(DecodeError),

	/// The input contains a construct which cannot be reproduced faithfully.
	Unsupported(EncodeError),
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::Malformed(e) => Some(e),
			Self::Unsupported(e) => Some(e),
		}
	}
}

impl fmt::Display for Error {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Malformed(e) => write!(f, "malformed manifest: {}", e),
			Self::Unsupported(e) => write!(f, "unsupported manifest content: {}", e),
		}
	}
}

impl From<DecodeError> for Error {
	fn from(other: DecodeError) -> Self {
		Self::Malformed(other)
	}
}

impl From<EncodeError> for Error {
	fn from(other: EncodeError) -> Self {
		Self::Unsupported(other)
	}
}

impl From<UnknownNamespace> for Error {
	fn from(other: UnknownNamespace) -> Self {
		Self::Unsupported(other.into())
	}
}

/// Result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;
