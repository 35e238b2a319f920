/*!
# Namespace prefixes

The DSpace importer matches on literal prefixed names, so the encoder does not
track namespace declarations at all. Each namespace identifier maps to one
fixed prefix, and anything outside the table is refused. Supporting a new
namespace means adding it here.
*/
use std::borrow::Cow;

use crate::error::UnknownNamespace;
use crate::token::QName;

/// Namespace of the METS document itself. It is written without prefix.
pub const XMLNS_METS: &'static str = "http://www.loc.gov/METS/";

/// XML Schema instance namespace, for `xsi:schemaLocation`.
pub const XMLNS_XSI: &'static str = "http://www.w3.org/2001/XMLSchema-instance";

/// MODS descriptive metadata.
pub const XMLNS_MODS: &'static str = "http://www.loc.gov/mods/v3";

/// DSpace intermediate metadata.
pub const XMLNS_DIM: &'static str = "http://www.dspace.org/xmlns/dspace/dim";

/// XLink, used by METS file locations.
pub const XMLNS_XLINK: &'static str = "http://www.w3.org/1999/xlink";

/// Pseudo namespace identifier carried by `xmlns:p="..."` declaration
/// attributes.
pub const NS_XMLNS: &'static str = "xmlns";

/// Return the prefix to write for a namespace identifier.
///
/// `Ok(None)` means the local name is written bare.
pub fn prefix_for(namespace: &str) -> Result<Option<&'static str>, UnknownNamespace> {
	match namespace {
		"" | XMLNS_METS => Ok(None),
		NS_XMLNS => Ok(Some("xmlns")),
		XMLNS_XSI => Ok(Some("xsi")),
		XMLNS_MODS => Ok(Some("mods")),
		XMLNS_DIM => Ok(Some("dim")),
		XMLNS_XLINK => Ok(Some("xlink")),
		other => Err(UnknownNamespace(other.to_string())),
	}
}

/// Format a name the way it appears in the output.
pub fn qualified_name(name: &QName) -> Result<Cow<'_, str>, UnknownNamespace> {
	Ok(match prefix_for(name.namespace())? {
		Some(prefix) => Cow::Owned(format!("{}:{}", prefix, name.local())),
		None => Cow::Borrowed(name.local()),
	})
}
