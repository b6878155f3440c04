use super::Fragments;
use std::collections::HashSet;

/// Substitute `@backend.<name> { … }` placeholders in a skeleton with
/// the generator's fragments.
///
/// Every non-empty inserted line is prefixed with the text preceding the
/// placeholder on its line, so fragments land at the placeholder's
/// indentation. A placeholder with no matching fragment is left
/// unchanged, and each name is substituted at most once; later
/// occurrences stay verbatim.
pub fn process(skeleton: &str, fragments: &Fragments) -> String {
	let chars: Vec<char> = skeleton.chars().collect();
	let mut out = String::new();
	let mut used: HashSet<String> = HashSet::new();
	let mut i = 0;

	while i < chars.len() {
		if let Some((name, end)) = placeholder_at(&chars, i) {
			let replaceable = !used.contains(&name) && fragments.get(&name).is_some();
			if replaceable {
				let prefix: String = match out.rfind('\n') {
					Some(at) => out[at + 1..].to_string(),
					None => out.clone(),
				};
				let fragment = fragments.get(&name).unwrap();
				for (n, line) in fragment.lines().enumerate() {
					if n > 0 {
						out.push('\n');
						if !line.is_empty() {
							out.push_str(&prefix);
						}
					}
					out.push_str(line);
				}
				used.insert(name);
				i = end;
				continue;
			}
		}
		out.push(chars[i]);
		i += 1;
	}

	out
}

/// Whether the skeleton contains a placeholder for `name`.
pub fn mentions(skeleton: &str, name: &str) -> bool {
	let chars: Vec<char> = skeleton.chars().collect();
	for i in 0..chars.len() {
		if let Some((found, _)) = placeholder_at(&chars, i) {
			if found == name {
				return true;
			}
		}
	}
	false
}

const MARKER: &str = "@backend.";

/// Parse a `@backend.<name> { … }` placeholder starting at `i`,
/// returning the name and the index just past the closing brace.
fn placeholder_at(chars: &[char], i: usize) -> Option<(String, usize)> {
	let mut j = i;
	for c in MARKER.chars() {
		if chars.get(j) != Some(&c) {
			return None;
		}
		j += 1;
	}

	let name_begin = j;
	while j < chars.len() && (chars[j] == '_' || chars[j].is_ascii_alphanumeric()) {
		j += 1;
	}
	if j == name_begin {
		return None;
	}
	let name: String = chars[name_begin..j].iter().collect();

	while chars.get(j) == Some(&' ') {
		j += 1;
	}
	if chars.get(j) != Some(&'{') {
		return None;
	}
	j += 1;

	loop {
		match chars.get(j) {
			Some('}') => return Some((name, j + 1)),
			Some('\\') if chars.get(j + 1) == Some(&'}') => j += 2,
			Some(_) => j += 1,
			None => return None,
		}
	}
}
