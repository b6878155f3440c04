use crate::out::{Diagnostic, Kind};
use crate::syntax::Grammar;

/// Verify cut placement.
///
/// A cut commits the choice to its alternative once the parts before it
/// matched. A later sibling that starts with the very same parts can
/// therefore never be tried: whenever its prefix would match, the cut
/// already fired.
pub fn check(grammar: &Grammar, diagnostics: &mut Vec<Diagnostic>) {
	for rule in &grammar.rules {
		let alts = &rule.expr.alts;
		for (i, alt) in alts.iter().enumerate() {
			for (at, part) in alt.items.iter().enumerate() {
				if !part.cut {
					continue;
				}
				let prefix = &alt.items[..at];
				for masked in &alts[i + 1..] {
					if masked.items.len() < prefix.len() {
						continue;
					}
					let same = prefix
						.iter()
						.zip(&masked.items)
						.all(|(a, b)| a.item == b.item);
					if same {
						diagnostics.push(
							Diagnostic::error(
								Kind::Semantic,
								"unreachable alternative after cut",
								masked.info.or(rule.info),
							)
							.note(format!(
								"a cut in a preceding alternative of `{}` commits the parser \
								 before this alternative is tried",
								rule.id
							)),
						);
					}
				}
			}
		}
	}
}
