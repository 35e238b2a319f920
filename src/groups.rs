/*!
# Repairing empty groups

A site AIP lists the e-person groups of the repository:

```xml
<Group ID="1" Name="Administrator">
  <Members>
    <Member ID="1" Name="admin@example.edu"></Member>
  </Members>
</Group>
<Group ID="7" Name="COLLECTION_12_SUBMIT">
  <Members></Members>
</Group>
```

The importer chokes on groups without any member. [`fix_empty_groups`] gives
each of them a copy of the members of a donor group (by default the
administrators), leaving every other byte of the layout to the [`Encoder`].

This takes two passes over the document. The first one harvests the donor
members, the second one re-encodes the document and splices them in. The
donor is not required to come before the groups it is copied into.
*/
use bytes::BufMut;
use log::{debug, trace};

use crate::decoder::Decoder;
use crate::error::Result;
use crate::token::Token;
use crate::writer::Encoder;

/// Local name of group elements.
pub const GROUP: &'static str = "Group";

/// Local name of the member list of a group.
pub const MEMBERS: &'static str = "Members";

/// Local name of a single group member.
pub const MEMBER: &'static str = "Member";

/// `Name` of the group whose members are copied by default.
pub const DEFAULT_DONOR_GROUP: &'static str = "Administrator";

/**
# Options for [`fix_empty_groups_with`]

```
use metsfix::FixOptions;

let opts = FixOptions::default().donor_group("Anonymous").indent("", "\t");
assert_eq!(opts.donor_group, "Anonymous");
```
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOptions {
	/// `Name` attribute of the group whose members are copied.
	pub donor_group: String,

	/// Written at the start of each new line.
	pub indent_prefix: String,

	/// Written once per nesting level after the prefix.
	pub indent_unit: String,
}

impl Default for FixOptions {
	fn default() -> Self {
		Self {
			donor_group: DEFAULT_DONOR_GROUP.to_string(),
			indent_prefix: String::new(),
			indent_unit: "  ".to_string(),
		}
	}
}

impl FixOptions {
	/// Set the [`FixOptions::donor_group`] value.
	pub fn donor_group<S: Into<String>>(mut self, name: S) -> Self {
		self.donor_group = name.into();
		self
	}

	/// Set the [`FixOptions::indent_prefix`] and
	/// [`FixOptions::indent_unit`] values.
	pub fn indent<P: Into<String>, U: Into<String>>(mut self, prefix: P, unit: U) -> Self {
		self.indent_prefix = prefix.into();
		self.indent_unit = unit.into();
		self
	}
}

fn is_donor(token: &Token, donor_group: &str) -> bool {
	token.opens(GROUP) && token.attribute("Name") == Some(donor_group)
}

fn is_membership(token: &Token) -> bool {
	match token.local_name() {
		Some(name) => name == MEMBERS || name == MEMBER,
		None => false,
	}
}

// Whether splicing the tokens into a group makes it count as having members.
fn yields_member(tokens: &[Token]) -> bool {
	let mut in_members = false;
	for token in tokens.iter() {
		match token {
			Token::ElementOpen(name, _) if name.local() == MEMBERS => in_members = true,
			Token::ElementClose(name) if name.local() == MEMBERS => in_members = false,
			Token::ElementOpen(name, _) if name.local() == MEMBER && in_members => return true,
			_ => (),
		}
	}
	false
}

/**
# Streaming collector for the donor members

Feed it every token of a document; afterwards, [`Harvester::finish`] returns
the open and close tokens of all `Members` and `Member` elements found in
groups named after the donor. Everything else, the donor group's own tokens
and any text included, is left out.

Groups nested inside a donor belong to the donor's subtree: their member
tokens are collected and their own `Group` tokens skipped, so the result is
always balanced.
*/
#[derive(Debug)]
pub struct Harvester<'n> {
	donor_group: &'n str,
	// open groups since entering the donor, zero outside of it
	depth: usize,
	tokens: Vec<Token>,
}

impl<'n> Harvester<'n> {
	pub fn new(donor_group: &'n str) -> Self {
		Self {
			donor_group,
			depth: 0,
			tokens: Vec::new(),
		}
	}

	pub fn feed(&mut self, token: &Token) {
		if self.depth == 0 {
			if is_donor(token, self.donor_group) {
				self.depth = 1;
			}
			return;
		}
		if token.opens(GROUP) {
			self.depth += 1;
		} else if token.closes(GROUP) {
			self.depth -= 1;
		} else if is_membership(token) {
			self.tokens.push(token.clone());
		}
	}

	pub fn finish(self) -> Vec<Token> {
		self.tokens
	}
}

/// Collect the membership tokens of the default donor group.
///
/// Returns an empty list if the document has no such group.
pub fn harvest_donor_tokens(data: &[u8]) -> Result<Vec<Token>> {
	harvest_donor_tokens_named(data, DEFAULT_DONOR_GROUP)
}

/// Collect the membership tokens of the group with the given `Name`.
pub fn harvest_donor_tokens_named(data: &[u8], donor_group: &str) -> Result<Vec<Token>> {
	let mut harvester = Harvester::new(donor_group);
	for token in Decoder::new(data)? {
		harvester.feed(&token?);
	}
	Ok(harvester.finish())
}

#[derive(Debug, Default)]
struct GroupFrame {
	name: Option<String>,
	in_members: bool,
	has_members: bool,
}

/**
# Re-encoding with donor splices

Forwards tokens to an [`Encoder`]. Right before the end of a group which has
not shown a `Member` inside its own `Members`, the donor tokens are encoded as
if they had been part of the source. Nested groups are judged on their own.
*/
pub struct GroupFixer<'d> {
	donor: &'d [Token],
	encoder: Encoder,
	groups: Vec<GroupFrame>,
	spliced: usize,
}

impl<'d> GroupFixer<'d> {
	pub fn new(donor: &'d [Token], encoder: Encoder) -> Self {
		Self {
			donor,
			encoder,
			groups: Vec::new(),
			spliced: 0,
		}
	}

	/// Number of groups which received a copy of the donor members so far.
	pub fn spliced(&self) -> usize {
		self.spliced
	}

	pub fn feed<O: BufMut>(&mut self, token: &Token, output: &mut O) -> Result<()> {
		match token {
			Token::ElementOpen(name, _) => {
				if name.local() == GROUP {
					self.groups.push(GroupFrame {
						name: token.attribute("Name").map(|v| v.to_string()),
						..GroupFrame::default()
					});
				} else if let Some(group) = self.groups.last_mut() {
					match name.local() {
						MEMBERS => group.in_members = true,
						MEMBER if group.in_members => group.has_members = true,
						_ => (),
					}
				}
			}
			Token::ElementClose(name) => match name.local() {
				GROUP => {
					if let Some(group) = self.groups.pop() {
						if !group.has_members && !self.donor.is_empty() {
							trace!(
								"splicing {} donor tokens into empty group {:?}",
								self.donor.len(),
								group.name.as_deref().unwrap_or("")
							);
							for donor_token in self.donor.iter() {
								self.encoder.encode(donor_token, output)?;
							}
							self.spliced += 1;
						}
					}
				}
				MEMBERS => {
					if let Some(group) = self.groups.last_mut() {
						group.in_members = false;
					}
				}
				_ => (),
			},
			_ => (),
		}
		self.encoder.encode(token, output)?;
		Ok(())
	}
}

/// Fill all groups without members with the members of the administrator
/// group, using the default [`FixOptions`].
pub fn fix_empty_groups(data: &[u8]) -> Result<Vec<u8>> {
	fix_empty_groups_with(data, &FixOptions::default())
}

/// Fill all groups without members with the members of the donor group and
/// re-encode the document.
///
/// If there is no donor group, or the donor has no members itself, empty
/// groups stay empty; the document is re-encoded all the same.
pub fn fix_empty_groups_with(data: &[u8], opts: &FixOptions) -> Result<Vec<u8>> {
	let mut donor = harvest_donor_tokens_named(data, &opts.donor_group)?;
	if !yields_member(&donor) {
		debug!(
			"donor group {:?} not found or without members, nothing to splice",
			opts.donor_group
		);
		donor.clear();
	}

	let encoder = Encoder::with_indent(opts.indent_prefix.as_str(), opts.indent_unit.as_str());
	let mut fixer = GroupFixer::new(&donor, encoder);
	let mut output = Vec::with_capacity(data.len());
	for token in Decoder::new(data)? {
		fixer.feed(&token?, &mut output)?;
	}
	debug!("spliced donor members into {} empty groups", fixer.spliced());
	Ok(output)
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::error::{EncodeError, Error};
	use crate::token::{Attribute, QName};

	fn group(name: &str, members: &[&str]) -> String {
		let mut out = format!("<Group ID=\"{}\" Name=\"{}\"><Members>", name.len(), name);
		for member in members {
			out.push_str(&format!("<Member ID=\"1\" Name=\"{}\"/>", member));
		}
		out.push_str("</Members></Group>");
		out
	}

	fn doc(groups: &[String]) -> Vec<u8> {
		format!("<Groups>{}</Groups>", groups.concat()).into_bytes()
	}

	fn member(name: &str) -> Token {
		Token::ElementOpen(
			QName::unqualified("Member"),
			vec![
				Attribute::new(QName::unqualified("ID"), "1"),
				Attribute::new(QName::unqualified("Name"), name),
			],
		)
	}

	fn end(local: &str) -> Token {
		Token::ElementClose(QName::unqualified(local))
	}

	#[test]
	fn harvests_only_membership_of_donor() {
		let data = doc(&[
			group("Anonymous", &["nobody"]),
			group("Administrator", &["a@x", "b@x"]),
		]);
		assert_eq!(
			harvest_donor_tokens(&data).unwrap(),
			vec![
				Token::ElementOpen(QName::unqualified("Members"), Vec::new()),
				member("a@x"),
				end("Member"),
				member("b@x"),
				end("Member"),
				end("Members"),
			]
		);
	}

	#[test]
	fn harvest_without_donor_is_empty() {
		let data = doc(&[group("Anonymous", &["nobody"])]);
		assert!(harvest_donor_tokens(&data).unwrap().is_empty());
	}

	#[test]
	fn harvest_by_other_name() {
		let data = doc(&[group("Anonymous", &["nobody"])]);
		assert_eq!(
			harvest_donor_tokens_named(&data, "Anonymous").unwrap().len(),
			4
		);
	}

	#[test]
	fn harvester_ignores_text_inside_donor() {
		let data = b"<Group Name=\"Administrator\"><Members><Member>x</Member></Members></Group>";
		let tokens = harvest_donor_tokens(data).unwrap();
		assert_eq!(tokens.len(), 4);
		assert!(tokens.iter().all(|t| !matches!(t, Token::Text(_))));
	}

	#[test]
	fn empty_group_receives_donor_members() {
		let data = doc(&[
			group("Administrator", &["a@x", "b@x"]),
			group("COLLECTION_1_SUBMIT", &[]),
		]);
		let out = String::from_utf8(fix_empty_groups(&data).unwrap()).unwrap();
		assert_eq!(
			out,
			concat!(
				"<Groups>\n",
				"  <Group ID=\"13\" Name=\"Administrator\">\n",
				"    <Members>\n",
				"      <Member ID=\"1\" Name=\"a@x\"></Member>\n",
				"      <Member ID=\"1\" Name=\"b@x\"></Member>\n",
				"    </Members>\n",
				"  </Group>\n",
				"  <Group ID=\"19\" Name=\"COLLECTION_1_SUBMIT\">\n",
				"    <Members></Members>\n",
				"    <Members>\n",
				"      <Member ID=\"1\" Name=\"a@x\"></Member>\n",
				"      <Member ID=\"1\" Name=\"b@x\"></Member>\n",
				"    </Members>\n",
				"  </Group>\n",
				"</Groups>",
			)
		);
	}

	#[test]
	fn group_without_members_element_is_filled_as_well() {
		let data = b"<Groups><Group Name=\"Administrator\"><Members><Member/></Members></Group><Group Name=\"x\"/></Groups>";
		let out = String::from_utf8(
			fix_empty_groups_with(data, &FixOptions::default().indent("", "")).unwrap(),
		)
		.unwrap();
		assert_eq!(
			out,
			"<Groups><Group Name=\"Administrator\"><Members><Member></Member></Members></Group><Group Name=\"x\"><Members><Member></Member></Members></Group></Groups>"
		);
	}

	#[test]
	fn donor_after_empty_group_is_still_used() {
		let data = doc(&[
			group("COLLECTION_1_SUBMIT", &[]),
			group("Administrator", &["a@x"]),
		]);
		let out = String::from_utf8(fix_empty_groups(&data).unwrap()).unwrap();
		assert_eq!(out.matches("Name=\"a@x\"").count(), 2);
	}

	#[test]
	fn groups_with_members_are_untouched() {
		let data = doc(&[
			group("Administrator", &["a@x", "b@x"]),
			group("Anonymous", &["nobody"]),
		]);
		let out = String::from_utf8(fix_empty_groups(&data).unwrap()).unwrap();
		assert_eq!(out.matches("<Member ").count(), 3);
		assert!(out.contains(concat!(
			"  <Group ID=\"9\" Name=\"Anonymous\">\n",
			"    <Members>\n",
			"      <Member ID=\"1\" Name=\"nobody\"></Member>\n",
			"    </Members>\n",
			"  </Group>\n",
		)));
	}

	#[test]
	fn without_donor_empty_groups_stay_empty() {
		let data = doc(&[group("COLLECTION_1_SUBMIT", &[])]);
		let out = String::from_utf8(fix_empty_groups(&data).unwrap()).unwrap();
		assert_eq!(
			out,
			concat!(
				"<Groups>\n",
				"  <Group ID=\"19\" Name=\"COLLECTION_1_SUBMIT\">\n",
				"    <Members></Members>\n",
				"  </Group>\n",
				"</Groups>",
			)
		);
	}

	#[test]
	fn donor_without_members_is_not_spliced() {
		let data = doc(&[
			group("Administrator", &[]),
			group("COLLECTION_1_SUBMIT", &[]),
		]);
		let once = fix_empty_groups(&data).unwrap();
		assert_eq!(String::from_utf8_lossy(&once).matches("<Members>").count(), 2);
		assert_eq!(fix_empty_groups(&once).unwrap(), once);
	}

	#[test]
	fn donor_members_outside_member_list_are_not_spliced() {
		let data = b"<Groups><Group Name=\"Administrator\"><Member Name=\"a\"/></Group><Group Name=\"x\"><Members/></Group></Groups>";
		let opts = FixOptions::default().indent("", "");
		let once = fix_empty_groups_with(data, &opts).unwrap();
		assert_eq!(
			String::from_utf8(once.clone()).unwrap(),
			"<Groups><Group Name=\"Administrator\"><Member Name=\"a\"></Member></Group><Group Name=\"x\"><Members></Members></Group></Groups>"
		);
		assert_eq!(fix_empty_groups_with(&once, &opts).unwrap(), once);
	}

	#[test]
	fn fixing_twice_changes_nothing() {
		let data = doc(&[
			group("Anonymous", &[]),
			group("Administrator", &["a@x", "b@x"]),
			group("COLLECTION_1_SUBMIT", &[]),
		]);
		let once = fix_empty_groups(&data).unwrap();
		let twice = fix_empty_groups(&once).unwrap();
		assert_eq!(once, twice);
	}

	#[test]
	fn member_outside_members_does_not_count() {
		let data = b"<Groups><Group Name=\"Administrator\"><Members><Member Name=\"a\"/></Members></Group><Group Name=\"x\"><Member Name=\"stray\"/></Group></Groups>";
		let out = String::from_utf8(
			fix_empty_groups_with(data, &FixOptions::default().indent("", "")).unwrap(),
		)
		.unwrap();
		assert!(out.ends_with(
			"<Group Name=\"x\"><Member Name=\"stray\"></Member><Members><Member Name=\"a\"></Member></Members></Group></Groups>"
		));
	}

	#[test]
	fn group_nested_in_donor_keeps_harvest_balanced() {
		let data =
			b"<Group Name=\"Administrator\"><Members><Group><Member/></Group></Members></Group>";
		assert_eq!(
			harvest_donor_tokens(data).unwrap(),
			vec![
				Token::ElementOpen(QName::unqualified("Members"), Vec::new()),
				Token::ElementOpen(QName::unqualified("Member"), Vec::new()),
				end("Member"),
				end("Members"),
			]
		);
		let opts = FixOptions::default().indent("", "");
		let once = fix_empty_groups_with(data, &opts).unwrap();
		assert_eq!(
			String::from_utf8(once.clone()).unwrap(),
			concat!(
				"<Group Name=\"Administrator\"><Members><Group><Member></Member>",
				"<Members><Member></Member></Members></Group></Members>",
				"<Members><Member></Member></Members></Group>",
			)
		);
		assert_eq!(fix_empty_groups_with(&once, &opts).unwrap(), once);
	}

	#[test]
	fn nested_group_does_not_hide_outer_members() {
		let data = concat!(
			"<Groups><Group Name=\"Administrator\"><Members><Member Name=\"a\"/></Members></Group>",
			"<Group Name=\"outer\"><Members><Member Name=\"b\"/></Members><Group Name=\"inner\"/></Group>",
			"</Groups>",
		);
		let out = String::from_utf8(
			fix_empty_groups_with(data.as_bytes(), &FixOptions::default().indent("", "")).unwrap(),
		)
		.unwrap();
		assert!(out.ends_with(concat!(
			"<Group Name=\"outer\"><Members><Member Name=\"b\"></Member></Members>",
			"<Group Name=\"inner\"><Members><Member Name=\"a\"></Member></Members></Group>",
			"</Group></Groups>",
		)));
	}

	#[test]
	fn comment_aborts_fixing() {
		let data = b"<Groups><!-- x --></Groups>";
		assert_eq!(
			fix_empty_groups(data).unwrap_err(),
			Error::Unsupported(EncodeError::Comment(" x ".to_string()))
		);
	}
}
