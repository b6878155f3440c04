use crate::source::Info;
use crate::syntax::{Alt, Expr, Grammar, Id, Item, NamedItem, Rule};
use std::collections::{HashMap, HashSet};

/// Replace composite sub-expressions by references to fresh synthetic
/// rules.
///
/// Two shapes are hoisted:
/// - a parenthesised expression used as an item, and
/// - a quantified item inside a sequence (or under an attached
///   metarule), so that sequences end up flat.
///
/// A quantifier is allowed to remain only where the whole alternative is
/// that one quantified primary, which is exactly the shape of the rules
/// this pass synthesises. Identical sub-expressions share one synthetic
/// rule; names are `<Rule>__GEN_<n>` with a grammar-scoped counter per
/// base rule, skipping names the user already took.
pub fn replace_nested(grammar: &mut Grammar) {
	let mut state = Desugar {
		created: Vec::new(),
		counters: HashMap::new(),
		taken: grammar.rules.iter().map(|r| r.id.value.clone()).collect(),
		new_rules: Vec::new(),
	};

	for rule in &mut grammar.rules {
		let base = base_name(&rule.id.value).to_string();
		let ignore = rule.ignore;
		state.hoist_expr(&mut rule.expr, &base, ignore);
		state.promote_quantifiers(&mut rule.expr, &base);
	}

	// Synthetic rules may themselves hold sequences with quantifiers.
	let mut i = 0;
	while i < state.new_rules.len() {
		let base = base_name(&state.new_rules[i].id.value).to_string();
		let mut expr = std::mem::replace(&mut state.new_rules[i].expr, Expr::new(Vec::new(), None));
		state.promote_quantifiers(&mut expr, &base);
		state.new_rules[i].expr = expr;
		i += 1;
	}

	grammar.rules.append(&mut state.new_rules);
}

/// The user rule a synthetic name was derived from.
fn base_name(name: &str) -> &str {
	match name.find("__GEN") {
		Some(at) => &name[..at],
		None => name,
	}
}

struct Desugar {
	created: Vec<(Expr, Id)>,
	counters: HashMap<String, u32>,
	taken: HashSet<String>,
	new_rules: Vec<Rule>,
}

impl Desugar {
	fn fresh_id(&mut self, base: &str, info: Option<Info>) -> Id {
		loop {
			let counter = self.counters.entry(base.to_string()).or_insert(0);
			*counter += 1;
			let name = format!("{}__GEN_{}", base, counter);
			if self.taken.insert(name.clone()) {
				return Id::new(name, info);
			}
		}
	}

	fn synthesize(&mut self, base: &str, expr: Expr, ignore: bool) -> Id {
		if let Some((_, id)) = self.created.iter().find(|(e, _)| *e == expr) {
			return id.clone();
		}

		let info = expr.info;
		let id = self.fresh_id(base, info);
		self.created.push((expr.clone(), id.clone()));
		let mut rule = Rule::new(id.clone(), expr, info);
		rule.ignore = ignore;
		self.new_rules.push(rule);
		id
	}

	fn hoist_expr(&mut self, expr: &mut Expr, base: &str, ignore: bool) {
		for alt in &mut expr.alts {
			for part in &mut alt.items {
				self.hoist_item(&mut part.item, base, ignore);
			}
		}
	}

	/// Bottom-up replacement of parenthesised expressions by references.
	fn hoist_item(&mut self, item: &mut Item, base: &str, ignore: bool) {
		use Item::*;
		match item {
			Expr(_) => {
				let mut e = match std::mem::replace(item, Item::Id(crate::syntax::Id::new("", None))) {
					Item::Expr(e) => e,
					_ => unreachable!(),
				};
				self.hoist_expr(&mut e, base, ignore);
				let id = self.synthesize(base, e, ignore);
				*item = Item::Id(id);
			}
			ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) | And(i) | Not(i) => {
				self.hoist_item(i, base, ignore)
			}
			Repetition(rep) => self.hoist_item(&mut rep.item, base, ignore),
			_ => {}
		}
	}

	/// Hoist quantified items out of sequences. An alternative that is a
	/// single quantified primary with no attached metarule keeps its
	/// quantifier; that is the normalised shape.
	fn promote_quantifiers(&mut self, expr: &mut Expr, base: &str) {
		for alt in &mut expr.alts {
			if alt.items.len() == 1 && alt.meta.is_none() {
				continue;
			}
			for part in &mut alt.items {
				if !part.item.is_quantifier() {
					continue;
				}
				let item = std::mem::replace(&mut part.item, Item::Id(Id::new("", None)));
				let info = item.info();
				let inner = NamedItem::new(None, item, info);
				let sub = Expr::new(vec![Alt::new(vec![inner], None, info)], info);
				let id = self.synthesize(base, sub, false);
				part.item = Item::Id(id);
			}
		}
	}
}
