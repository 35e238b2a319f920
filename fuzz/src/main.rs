#[macro_use]
extern crate afl;
extern crate metsfix;

fn main() {
	fuzz!(|data: &[u8]| {
		let _ = metsfix::extract_relations(data);
		if let Ok(once) = metsfix::fix_empty_groups(data) {
			// see the writer docs on unescaped values
			if let Ok(twice) = metsfix::fix_empty_groups(&once) {
				assert_eq!(once, twice);
			}
		}
	});
}
