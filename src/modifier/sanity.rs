use crate::out::{Diagnostic, Kind};
use crate::syntax::{Grammar, Id, Item, IGNORE};

use super::walk_alts_mut;

/// Validate ranges, repetition bounds and character codes, and strip
/// metanames from predicate parts (lookahead matches return nothing a
/// semantic action could use).
pub fn check(grammar: &mut Grammar, diagnostics: &mut Vec<Diagnostic>) {
	for rule in &mut grammar.rules {
		walk_alts_mut(&mut rule.expr, &mut |alt| {
			for part in &mut alt.items {
				if part.item.is_lookahead() {
					if let Some(name) = &part.name {
						if name.value != IGNORE {
							diagnostics.push(Diagnostic::warning(
								Kind::Semantic,
								format!("metaname `{}` on a lookahead is dropped", name),
								part.info,
							));
							part.name = Some(Id::new(IGNORE, None));
						}
					}
				}
				check_item(&part.item, diagnostics);
			}
		});
	}
}

fn check_item(item: &Item, diagnostics: &mut Vec<Diagnostic>) {
	use Item::*;
	match item {
		Class(class) => {
			for range in &class.ranges {
				if range.first.as_char().is_none() {
					diagnostics.push(Diagnostic::error(
						Kind::Lexical,
						format!("invalid character code U+{:04X}", range.first.code),
						range.info,
					));
				}
				if let Some(last) = &range.last {
					if last.as_char().is_none() {
						diagnostics.push(Diagnostic::error(
							Kind::Lexical,
							format!("invalid character code U+{:04X}", last.code),
							range.info,
						));
					} else if last.code < range.first.code {
						diagnostics.push(Diagnostic::error(
							Kind::Semantic,
							format!("reversed character range `{}`", range),
							range.info,
						));
					}
				}
			}
		}
		Repetition(rep) => {
			if let Some(last) = rep.last {
				if last < rep.first {
					diagnostics.push(Diagnostic::error(
						Kind::Semantic,
						format!("invalid repetition bounds `{{{},{}}}`", rep.first, last),
						rep.info,
					));
				}
			}
			check_item(&rep.item, diagnostics);
		}
		Literal(lit) => {
			for c in &lit.chars {
				if c.as_char().is_none() {
					diagnostics.push(Diagnostic::error(
						Kind::Lexical,
						format!("invalid character code U+{:04X}", c.code),
						c.info,
					));
				}
			}
		}
		ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) | And(i) | Not(i) => {
			check_item(i, diagnostics)
		}
		_ => {}
	}
}
