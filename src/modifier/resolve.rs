use crate::out::{Diagnostic, Kind};
use crate::syntax::Grammar;
use std::collections::HashSet;

use super::references;

/// Verify that every reference targets exactly one rule.
pub fn check(grammar: &mut Grammar, diagnostics: &mut Vec<Diagnostic>) {
	let mut seen: HashSet<&str> = HashSet::new();
	for rule in &grammar.rules {
		if !seen.insert(rule.id.value.as_str()) {
			diagnostics.push(
				Diagnostic::error(
					Kind::Semantic,
					format!("rule `{}` defined more than once", rule.id),
					rule.info,
				)
				.note("the first definition is used for references"),
			);
		}
	}

	let names: HashSet<&str> = grammar.rules.iter().map(|r| r.id.value.as_str()).collect();
	for rule in &grammar.rules {
		for alt in &rule.expr.alts {
			for part in &alt.items {
				let mut refs = Vec::new();
				references(&part.item, &mut refs);
				for id in refs {
					if !names.contains(id.value.as_str()) {
						diagnostics.push(Diagnostic::error(
							Kind::Semantic,
							format!("undefined rule `{}`", id),
							id.info,
						));
					}
				}
			}
		}
	}
}
