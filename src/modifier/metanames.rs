use crate::out::{Diagnostic, Kind};
use crate::syntax::{Grammar, Id, Item, IGNORE};
use std::collections::{HashMap, HashSet};

use super::walk_alts_mut;

/// Mark every unnamed reference to an `@ignore` rule with the ignore
/// metaname. References keep their value when the user bound them to an
/// explicit name.
pub fn propagate_ignore(grammar: &mut Grammar) {
	let ignored: HashSet<String> = grammar
		.rules
		.iter()
		.filter(|r| r.ignore)
		.map(|r| r.id.value.clone())
		.collect();
	if ignored.is_empty() {
		return;
	}

	for rule in &mut grammar.rules {
		walk_alts_mut(&mut rule.expr, &mut |alt| {
			for part in &mut alt.items {
				if part.name.is_some() {
					continue;
				}
				let refers_ignored = match part.inner() {
					Item::Id(id) => ignored.contains(&id.value),
					_ => false,
				};
				if refers_ignored {
					part.name = Some(Id::new(IGNORE, None));
				}
			}
		});
	}
}

/// Deduce a metaname for every part that has none, so semantic actions
/// can bind every retained value.
///
/// References take the lowercased rule name, with `1, 2, …` appended on
/// repeats within the alternative; terminals and synthetic references
/// are numbered `_<n>`; predicates never bind. Names that would collide
/// with a target-language keyword get a leading underscore.
pub fn generate(grammar: &mut Grammar, keywords: &[&str], diagnostics: &mut Vec<Diagnostic>) {
	for rule in &mut grammar.rules {
		walk_alts_mut(&mut rule.expr, &mut |alt| {
			let mut index = 1u32;
			let mut names: HashSet<String> = HashSet::new();
			let mut id_counts: HashMap<String, u32> = HashMap::new();

			for part in &mut alt.items {
				if let Some(name) = &part.name {
					if name.value == IGNORE {
						continue;
					}
					if keywords.contains(&name.value.as_str()) {
						diagnostics.push(Diagnostic::error(
							Kind::Semantic,
							format!(
								"metaname `{}` is a reserved word in the target language",
								name
							),
							part.info,
						));
						continue;
					}
					if names.contains(&name.value) {
						diagnostics.push(Diagnostic::error(
							Kind::Semantic,
							format!("metaname `{}` is used twice in one alternative", name),
							part.info,
						));
					} else {
						names.insert(name.value.clone());
					}
					continue;
				}

				let metaname = if part.item.is_lookahead() {
					IGNORE.to_string()
				} else {
					match part.inner() {
						Item::Id(id) if id.value.contains("__GEN") => {
							let name = format!("_{}", index);
							index += 1;
							name
						}
						Item::Id(id) => {
							let mut name = id.value.to_lowercase();
							if keywords.contains(&name.as_str()) {
								name = format!("_{}", name);
							}
							let count = id_counts.entry(name.clone()).or_insert(0);
							let previous = *count;
							*count += 1;
							if previous > 0 {
								name = format!("{}{}", name, previous);
							}
							name
						}
						_ => {
							let name = format!("_{}", index);
							index += 1;
							name
						}
					}
				};

				if metaname != IGNORE {
					if names.contains(&metaname) {
						diagnostics.push(Diagnostic::error(
							Kind::Semantic,
							format!("deduced metaname `{}` is already taken", metaname),
							part.info,
						));
						continue;
					}
					names.insert(metaname.clone());
				}
				part.name = Some(Id::new(metaname, None));
			}
		});
	}
}
