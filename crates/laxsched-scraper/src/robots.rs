//! robots.txt parsing and evaluation.
//!
//! Groups are runs of `User-agent` lines followed by `Allow`/`Disallow`
//! rules. A crawler obeys the groups naming its product token, or the `*`
//! groups when none do. The longest matching rule wins and ties go to
//! `Allow`. Patterns support `*` wildcards and a trailing `$` anchor.

use regex::Regex;

#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    /// Pattern length, used for precedence.
    specificity: usize,
    matcher: Regex,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RobotsRules {
    groups: Vec<Group>,
}

impl RobotsRules {
    /// Parse a robots.txt body. Unknown directives and malformed lines are
    /// skipped; parsing never fails.
    pub(crate) fn parse(text: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current: Option<Group> = None;

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    let starts_new = current.as_ref().is_none_or(|g| !g.rules.is_empty());
                    if starts_new {
                        if let Some(done) = current.take() {
                            groups.push(done);
                        }
                        current = Some(Group::default());
                    }
                    if let Some(group) = current.as_mut() {
                        group.agents.push(value.to_ascii_lowercase());
                    }
                }
                "allow" | "disallow" => {
                    let Some(group) = current.as_mut() else {
                        continue;
                    };
                    // An empty pattern matches nothing.
                    if value.is_empty() {
                        continue;
                    }
                    if let Some(matcher) = compile_pattern(value) {
                        group.rules.push(Rule {
                            allow: key == "allow",
                            specificity: value.len(),
                            matcher,
                        });
                    }
                }
                _ => {}
            }
        }
        if let Some(done) = current {
            groups.push(done);
        }
        Self { groups }
    }

    /// Evaluate `path` (path plus optional `?query`) for `user_agent`.
    pub(crate) fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        let token = product_token(user_agent);
        let named: Vec<&Group> = self
            .groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && token.contains(a.as_str())))
            .collect();
        let applicable = if named.is_empty() {
            self.groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            named
        };

        let mut best: Option<&Rule> = None;
        for rule in applicable.iter().flat_map(|g| g.rules.iter()) {
            if !rule.matcher.is_match(path) {
                continue;
            }
            best = match best {
                Some(b)
                    if b.specificity > rule.specificity
                        || (b.specificity == rule.specificity && b.allow) =>
                {
                    Some(b)
                }
                _ => Some(rule),
            };
        }
        best.is_none_or(|rule| rule.allow)
    }
}

/// Lowercased user-agent up to the first `/` or whitespace.
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };
    let mut source = String::from("^");
    for (i, literal) in body.split('*').enumerate() {
        if i > 0 {
            source.push_str(".*");
        }
        source.push_str(&regex::escape(literal));
    }
    if anchored {
        source.push('$');
    }
    Regex::new(&source).ok()
}
