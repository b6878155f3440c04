use crate::syntax::{Grammar, Item, NamedItem};

use super::walk_alts_mut;

/// Expand bare multi-character literals into their character sequence and
/// turn single-character literals into plain characters.
///
/// Literals carrying an explicit metaname, and literals under a
/// quantifier or predicate, stay whole: the binding (or the wrapper)
/// needs the literal as one matchable.
pub fn expand(grammar: &mut Grammar) {
	for rule in &mut grammar.rules {
		walk_alts_mut(&mut rule.expr, &mut |alt| {
			let items = std::mem::take(&mut alt.items);
			let mut out = Vec::with_capacity(items.len());

			for mut part in items {
				singles(&mut part.item);

				let expandable = part.name.is_none()
					&& matches!(&part.item, Item::Literal(lit) if lit.chars.len() > 1);
				if expandable {
					let lit = match part.item {
						Item::Literal(lit) => lit,
						_ => unreachable!(),
					};
					for (i, c) in lit.chars.into_iter().enumerate() {
						let mut piece = NamedItem::new(None, Item::Char(c), c.info.or(lit.info));
						piece.cut = i == 0 && part.cut;
						out.push(piece);
					}
				} else {
					out.push(part);
				}
			}

			alt.items = out;
		});
	}
}

/// Rewrite one-character literals as characters, anywhere in an item.
fn singles(item: &mut Item) {
	use Item::*;
	match item {
		Literal(lit) if lit.chars.len() == 1 => {
			let mut c = lit.chars[0];
			c.info = lit.info;
			*item = Char(c);
		}
		ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) | And(i) | Not(i) => singles(i),
		Repetition(rep) => singles(&mut rep.item),
		_ => {}
	}
}
