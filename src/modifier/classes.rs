use crate::charset::CharSet;
use crate::out::{Diagnostic, Kind};
use crate::syntax::{Char, Class, Grammar, Item, Range};

use super::walk_alts_mut;

/// Rebuild every character class into sorted, non-overlapping ranges.
/// Classes that denote no character at all are rejected.
pub fn normalize(grammar: &mut Grammar, diagnostics: &mut Vec<Diagnostic>) {
	for rule in &mut grammar.rules {
		walk_alts_mut(&mut rule.expr, &mut |alt| {
			for part in &mut alt.items {
				normalize_item(&mut part.item, diagnostics);
			}
		});
	}
}

fn normalize_item(item: &mut Item, diagnostics: &mut Vec<Diagnostic>) {
	use Item::*;
	match item {
		Class(class) => {
			if class.ranges.is_empty() {
				diagnostics.push(Diagnostic::error(
					Kind::Semantic,
					"empty character class",
					class.info,
				));
				return;
			}
			normalize_class(class);
		}
		ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) | And(i) | Not(i) => {
			normalize_item(i, diagnostics)
		}
		Repetition(rep) => normalize_item(&mut rep.item, diagnostics),
		_ => {}
	}
}

fn normalize_class(class: &mut Class) {
	let mut set = CharSet::new();
	for range in &class.ranges {
		let first = match range.first.as_char() {
			Some(c) => c,
			None => return,
		};
		match range.last.map(|c| c.as_char()) {
			Some(Some(last)) => set.insert(first, last),
			Some(None) => return,
			None => set.insert_char(first),
		}
	}

	class.ranges = set
		.ranges()
		.map(|(first, last)| Range {
			first: Char::new(first as u32, class.info),
			last: (first != last).then(|| Char::new(last as u32, class.info)),
			info: class.info,
		})
		.collect();
}
