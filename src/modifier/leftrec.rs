use crate::syntax::{Alt, Expr, Grammar, Item, LeftRec};
use std::collections::{HashMap, HashSet};

/// Left-recursion analysis.
///
/// Builds the first-reference graph (edges to the rules a rule may call
/// without consuming input first), finds its strongly connected
/// components, and marks every rule on a non-trivial component as
/// left-recursive. Components are entered through their head rules; the
/// emitter wraps heads in the seed-and-grow machinery and leaves the
/// other rules of the cycle unmemoised. An alternative of a head rule
/// that calls back into its own component is a grower, the others are
/// the seeds.
pub fn compute(grammar: &mut Grammar) {
	let nullables = compute_nullables(grammar);
	mark_nullables(grammar, &nullables);

	let index: HashMap<&str, usize> = grammar
		.rules
		.iter()
		.enumerate()
		.map(|(i, r)| (r.id.value.as_str(), i))
		.collect();

	let graph: Vec<Vec<usize>> = grammar
		.rules
		.iter()
		.map(|rule| {
			let mut edges = Vec::new();
			for alt in &rule.expr.alts {
				collect_alt(alt, &index, &nullables, &mut edges);
			}
			edges
		})
		.collect();

	let components = strongly_connected_components(&graph);

	let mut leftrec: Vec<Option<LeftRec>> = vec![None; grammar.rules.len()];
	let mut heads: HashSet<usize> = HashSet::new();
	for component in &components {
		let nontrivial = component.len() > 1
			|| component
				.iter()
				.any(|&v| graph[v].contains(&v));
		if !nontrivial {
			continue;
		}

		let members: HashSet<usize> = component.iter().copied().collect();
		let cycle: Vec<_> = component
			.iter()
			.map(|&v| grammar.rules[v].id.clone())
			.collect();
		for &v in component {
			leftrec[v] = Some(LeftRec {
				cycle: cycle.clone(),
			});
		}

		log::info!("left recursive cycle: {}", LeftRec { cycle: cycle.clone() });

		// Heads are the rules the cycle is entered through.
		let mut found = false;
		for &v in component {
			let entered = grammar.rules[v].entry
				|| graph
					.iter()
					.enumerate()
					.any(|(u, edges)| !members.contains(&u) && edges.contains(&v));
			if entered {
				heads.insert(v);
				found = true;
			}
		}
		if !found {
			heads.insert(component[0]);
		}
	}

	// Grower marking needs the graph; collect first, apply after.
	let mut growers: Vec<(usize, Vec<bool>)> = Vec::new();
	for &head in &heads {
		let members: HashSet<usize> = match &leftrec[head] {
			Some(lr) => lr
				.cycle
				.iter()
				.filter_map(|id| index.get(id.value.as_str()).copied())
				.collect(),
			None => continue,
		};
		let flags = grammar.rules[head]
			.expr
			.alts
			.iter()
			.map(|alt| {
				let mut edges = Vec::new();
				collect_alt(alt, &index, &nullables, &mut edges);
				edges.iter().any(|v| members.contains(v))
			})
			.collect();
		growers.push((head, flags));
	}

	for (i, lr) in leftrec.into_iter().enumerate() {
		grammar.rules[i].leftrec = lr;
		grammar.rules[i].head = heads.contains(&i);
	}
	for (head, flags) in growers {
		for (alt, grower) in grammar.rules[head].expr.alts.iter_mut().zip(flags) {
			alt.grower = grower;
		}
	}
}

/// Names of the rules that can match without consuming input.
pub fn compute_nullables(grammar: &Grammar) -> HashSet<String> {
	let mut nullables: HashSet<String> = HashSet::new();

	loop {
		let mut changed = false;
		for rule in &grammar.rules {
			if nullables.contains(&rule.id.value) {
				continue;
			}
			if expr_nullable(&rule.expr, &nullables) {
				nullables.insert(rule.id.value.clone());
				changed = true;
			}
		}
		if !changed {
			break;
		}
	}

	nullables
}

fn expr_nullable(expr: &Expr, nullables: &HashSet<String>) -> bool {
	expr.alts.iter().any(|alt| alt_nullable(alt, nullables))
}

fn alt_nullable(alt: &Alt, nullables: &HashSet<String>) -> bool {
	alt.items
		.iter()
		.all(|part| item_nullable(&part.item, nullables))
}

fn item_nullable(item: &Item, nullables: &HashSet<String>) -> bool {
	use Item::*;
	match item {
		Id(id) => nullables.contains(&id.value),
		Expr(e) => expr_nullable(e, nullables),
		Literal(lit) => lit.chars.is_empty(),
		Char(_) | Any(_) => false,
		Class(class) => class.ranges.is_empty(),
		ZeroOrOne(_) | ZeroOrMore(_) | And(_) | Not(_) => true,
		OneOrMore(_) => false,
		Repetition(rep) => rep.first == 0,
	}
}

fn mark_nullables(grammar: &mut Grammar, nullables: &HashSet<String>) {
	for rule in &mut grammar.rules {
		rule.nullable = nullables.contains(&rule.id.value);
		for alt in &mut rule.expr.alts {
			alt.nullable = alt_nullable_mark(alt, nullables);
		}
	}
}

fn alt_nullable_mark(alt: &mut Alt, nullables: &HashSet<String>) -> bool {
	let mut all = true;
	for part in &mut alt.items {
		part.nullable = item_nullable(&part.item, nullables);
		all = all && part.nullable;
	}
	all
}

/// First-reference edges contributed by one alternative: references of
/// its items up to and including the first item that must consume input.
fn collect_alt(
	alt: &Alt,
	index: &HashMap<&str, usize>,
	nullables: &HashSet<String>,
	edges: &mut Vec<usize>,
) {
	for part in &alt.items {
		for target in item_first_refs(&part.item, index, nullables) {
			if !edges.contains(&target) {
				edges.push(target);
			}
		}
		if !item_nullable(&part.item, nullables) {
			break;
		}
	}
}

fn item_first_refs(
	item: &Item,
	index: &HashMap<&str, usize>,
	nullables: &HashSet<String>,
) -> Vec<usize> {
	use Item::*;
	match item {
		Id(id) => index.get(id.value.as_str()).copied().into_iter().collect(),
		Expr(e) => {
			let mut edges = Vec::new();
			for alt in &e.alts {
				collect_alt(alt, index, nullables, &mut edges);
			}
			edges
		}
		ZeroOrOne(i) | ZeroOrMore(i) | OneOrMore(i) => item_first_refs(i, index, nullables),
		Repetition(rep) => item_first_refs(&rep.item, index, nullables),
		And(_) | Not(_) => Vec::new(),
		_ => Vec::new(),
	}
}

/// Tarjan's algorithm over rule indices. Components come out in reverse
/// topological order; the order is irrelevant here.
fn strongly_connected_components(graph: &[Vec<usize>]) -> Vec<Vec<usize>> {
	struct State<'g> {
		graph: &'g [Vec<usize>],
		counter: u32,
		index: Vec<Option<u32>>,
		low: Vec<u32>,
		stack: Vec<usize>,
		on_stack: Vec<bool>,
		components: Vec<Vec<usize>>,
	}

	fn connect(state: &mut State, v: usize) {
		state.index[v] = Some(state.counter);
		state.low[v] = state.counter;
		state.counter += 1;
		state.stack.push(v);
		state.on_stack[v] = true;

		let successors = state.graph[v].clone();
		for w in successors {
			match state.index[w] {
				None => {
					connect(state, w);
					state.low[v] = state.low[v].min(state.low[w]);
				}
				Some(index) if state.on_stack[w] => {
					state.low[v] = state.low[v].min(index);
				}
				_ => {}
			}
		}

		if Some(state.low[v]) == state.index[v] {
			let mut component = Vec::new();
			loop {
				let w = state.stack.pop().unwrap();
				state.on_stack[w] = false;
				component.push(w);
				if w == v {
					break;
				}
			}
			component.reverse();
			state.components.push(component);
		}
	}

	let mut state = State {
		graph,
		counter: 0,
		index: vec![None; graph.len()],
		low: vec![0; graph.len()],
		stack: Vec::new(),
		on_stack: vec![false; graph.len()],
		components: Vec::new(),
	};

	for v in 0..graph.len() {
		if state.index[v].is_none() {
			connect(&mut state, v);
		}
	}

	state.components
}
