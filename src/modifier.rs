use crate::out::{has_errors, Diagnostic};
use crate::syntax::{Alt, Expr, Grammar, Item};

mod classes;
mod cuts;
mod desugar;
mod entry;
pub mod leftrec;
mod metanames;
mod metarules;
mod resolve;
mod sanity;
mod strings;

/// Run the full pass battery over a preprocessed grammar.
///
/// Passes run in a fixed order; each accumulates diagnostics, and a pass
/// that produced a hard error stops the pipeline. On success the
/// collected warnings are returned.
///
/// `keywords` are the reserved words of the backend's target language,
/// avoided when metanames are deduced.
pub fn apply(grammar: &mut Grammar, keywords: &[&str]) -> Result<Vec<Diagnostic>, Vec<Diagnostic>> {
	let mut diagnostics = Vec::new();

	log::info!("checking ranges and repetitions");
	sanity::check(grammar, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	log::info!("resolving metarules");
	metarules::assign(grammar, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	log::info!("expanding string literals");
	strings::expand(grammar);

	log::info!("normalising character classes");
	classes::normalize(grammar, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	log::info!("replacing nested expressions");
	desugar::replace_nested(grammar);

	log::info!("propagating `@ignore`");
	metanames::propagate_ignore(grammar);

	log::info!("generating metanames");
	metanames::generate(grammar, keywords, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	log::info!("resolving rule references");
	resolve::check(grammar, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	log::info!("computing left recursion");
	leftrec::compute(grammar);

	log::info!("resolving the entry rule");
	entry::enforce(grammar, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	log::info!("checking cut placement");
	cuts::check(grammar, &mut diagnostics);
	if has_errors(&diagnostics) {
		return Err(diagnostics);
	}

	Ok(diagnostics)
}

/// Apply `f` to every alternative of an expression, including the
/// alternatives of parenthesised subexpressions.
pub(crate) fn walk_alts_mut(expr: &mut Expr, f: &mut impl FnMut(&mut Alt)) {
	for alt in &mut expr.alts {
		f(alt);
		for item in &mut alt.items {
			walk_item_alts_mut(&mut item.item, f);
		}
	}
}

fn walk_item_alts_mut(item: &mut Item, f: &mut impl FnMut(&mut Alt)) {
	use Item::*;
	match item {
		Expr(e) => walk_alts_mut(e, f),
		ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) | And(i) | Not(i) => {
			walk_item_alts_mut(i, f)
		}
		Repetition(rep) => walk_item_alts_mut(&mut rep.item, f),
		_ => {}
	}
}

/// Collect every rule reference inside an item.
pub(crate) fn references<'a>(item: &'a Item, out: &mut Vec<&'a crate::syntax::Id>) {
	use Item::*;
	match item {
		Id(id) => out.push(id),
		Expr(e) => {
			for alt in &e.alts {
				for part in &alt.items {
					references(&part.item, out);
				}
			}
		}
		ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) | And(i) | Not(i) => references(i, out),
		Repetition(rep) => references(&rep.item, out),
		_ => {}
	}
}
