use crate::out::{Diagnostic, Kind};
use crate::syntax::Grammar;
use std::collections::HashSet;

use super::references;

/// Resolve the single entry rule and warn about rules the entry can
/// never reach.
pub fn enforce(grammar: &mut Grammar, diagnostics: &mut Vec<Diagnostic>) {
	let flagged: Vec<usize> = grammar
		.rules
		.iter()
		.enumerate()
		.filter(|(_, r)| r.entry)
		.map(|(i, _)| i)
		.collect();

	match flagged.as_slice() {
		[] => {
			diagnostics.push(Diagnostic::error(
				Kind::Semantic,
				"no entry rule; mark one with `@entry`",
				None,
			));
			return;
		}
		[single] => grammar.entry = Some(*single),
		[first, rest @ ..] => {
			for &extra in rest {
				diagnostics.push(
					Diagnostic::error(
						Kind::Semantic,
						format!("rule `{}` redefines the entry", grammar.rules[extra].id),
						grammar.rules[extra].info,
					)
					.note(format!(
						"the entry was already set to `{}`",
						grammar.rules[*first].id
					)),
				);
			}
			return;
		}
	}

	let entry = match grammar.entry {
		Some(entry) => entry,
		None => return,
	};

	// Reachability over the full reference graph.
	let mut visited: HashSet<usize> = HashSet::new();
	let mut queue = vec![entry];
	while let Some(v) = queue.pop() {
		if !visited.insert(v) {
			continue;
		}
		for alt in &grammar.rules[v].expr.alts {
			for part in &alt.items {
				let mut refs = Vec::new();
				references(&part.item, &mut refs);
				for id in refs {
					if let Some(target) = grammar.rule_index(&id.value) {
						queue.push(target);
					}
				}
			}
		}
	}

	for (i, rule) in grammar.rules.iter().enumerate() {
		if !visited.contains(&i) {
			diagnostics.push(Diagnostic::warning(
				Kind::Semantic,
				format!("rule `{}` is unreachable from the entry rule", rule.id),
				rule.info,
			));
		}
	}
}
