use crate::out::{Diagnostic, Kind};
use crate::syntax::{AltMeta, Grammar, MetaRule};
use std::collections::{HashMap, HashSet};

use super::walk_alts_mut;

/// Pair every metarule reference with its definition, inlining the body
/// into the alternative. Orphan metarules, unresolved references and
/// redefinitions are errors; inline metarules already carry their body
/// and are left alone.
pub fn assign(grammar: &mut Grammar, diagnostics: &mut Vec<Diagnostic>) {
	let mut defs: HashMap<String, MetaRule> = HashMap::new();
	for metarule in std::mem::take(&mut grammar.metarules) {
		let id = match metarule.id.clone() {
			Some(id) => id,
			None => continue,
		};
		if let Some(first) = defs.get(&id.value) {
			diagnostics.push(
				Diagnostic::error(
					Kind::Semantic,
					format!("metarule `{}` defined more than once", id),
					metarule.info,
				)
				.note(first_location(first)),
			);
		} else {
			defs.insert(id.value.clone(), metarule);
		}
	}

	let mut used: HashSet<String> = HashSet::new();
	for rule in &mut grammar.rules {
		walk_alts_mut(&mut rule.expr, &mut |alt| {
			let reference = match &alt.meta {
				Some(AltMeta::Ref(r)) => r.clone(),
				_ => return,
			};
			match defs.get(&reference.name.value) {
				Some(def) => {
					used.insert(reference.name.value.clone());
					alt.meta = Some(AltMeta::Rule(MetaRule {
						id: def.id.clone(),
						body: def.body.clone(),
						info: def.info,
					}));
				}
				None => {
					diagnostics.push(Diagnostic::error(
						Kind::Semantic,
						format!("undefined metarule `{}`", reference.name),
						reference.info,
					));
				}
			}
		});
	}

	for def in defs.values() {
		let id = match def.id.as_ref() {
			Some(id) => id,
			None => continue,
		};
		if !used.contains(&id.value) {
			diagnostics.push(Diagnostic::error(
				Kind::Semantic,
				format!("metarule `{}` is never used", id),
				def.info,
			));
		}
	}
}

fn first_location(metarule: &MetaRule) -> String {
	match metarule.id.as_ref() {
		Some(id) => format!("first definition of `{}` is kept", id),
		None => "first definition is kept".to_string(),
	}
}
