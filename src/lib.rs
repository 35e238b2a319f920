/*!
# Token-level rewriting of DSpace METS manifests

This crate reads the `mets.xml` manifests of DSpace AIP exports as a flat
stream of structural tokens and writes them back in the layout the DSpace
importer expects. On top of that it provides the two operations needed to
move a tree of exported objects between repositories:

* [`extract_relations`] lists the parents (`isPartOf` relations) of an
  object, so that the containers it lives in can be exported as well;
* [`fix_empty_groups`] copies the administrator members into every group
  without members, which the importer would otherwise reject.

## Features (some call them restrictions)

* Input must be UTF-8
* No DTDs, no comments: they are decoded, but refuse to be encoded
* Only a fixed set of namespaces, see [`namespaces`]
* Nothing is escaped or unescaped: text and attribute values go out exactly
  as they came in
* No document tree, every pass is a single forward scan

Reading and writing the manifests (usually from within zip containers) is
left to the caller.

## Example

```
let doc = br#"<Groups>
<Group ID="1" Name="Administrator"><Members><Member ID="1" Name="admin"/></Members></Group>
<Group ID="2" Name="Empty"><Members/></Group>
</Groups>"#;
let fixed = metsfix::fix_empty_groups(&doc[..]).unwrap();
let fixed = String::from_utf8(fixed).unwrap();
assert_eq!(fixed.matches("Name=\"admin\"").count(), 2);
```
*/
pub mod decoder;
pub mod error;
pub mod groups;
pub mod namespaces;
pub mod relations;
pub mod token;
pub mod writer;


#[doc(inline)]
pub use decoder::{decode, Decoder};
#[doc(inline)]
pub use error::{DecodeError, EncodeError, Error, Result, UnknownNamespace};
#[doc(inline)]
pub use groups::{
	fix_empty_groups, fix_empty_groups_with, harvest_donor_tokens, harvest_donor_tokens_named,
	FixOptions,
};
#[doc(inline)]
pub use relations::{extract_handles, extract_relations};
#[doc(inline)]
pub use token::{Attribute, QName, Token};
#[doc(inline)]
pub use writer::{encode, Encoder};

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
