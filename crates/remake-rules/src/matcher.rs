//! Rule selection and pattern instantiation.

use crate::Rule;

/// Substitute `stem` for the first `%` of `pat`; patterns without a
/// placeholder are copied verbatim.
fn substitute(pat: &str, stem: &str) -> String {
    match pat.find('%') {
        Some(pos) => format!("{}{}{}", &pat[..pos], stem, &pat[pos + 1..]),
        None => pat.to_string(),
    }
}

/// Instantiate a generic rule for the given stem.
fn instantiate(rule: &Rule, stem: &str) -> Rule {
    Rule {
        generic: false,
        targets: rule.targets.iter().map(|p| substitute(p, stem)).collect(),
        deps: rule.deps.iter().map(|p| substitute(p, stem)).collect(),
        script: rule.script.clone(),
    }
}

/// Find a rule matching `target`:
/// - non-generic rules have priority,
/// - among generic rules, the shortest stem wins,
/// - among equal stems, the earliest rule wins.
pub(crate) fn find_rule(rules: &[Rule], target: &str) -> Option<Rule> {
    let mut best: Option<(usize, Rule)> = None;
    for rule in rules {
        for pat in &rule.targets {
            if !rule.generic {
                if pat == target {
                    return Some(rule.clone());
                }
                continue;
            }
            let Some(pos) = pat.find('%') else { continue };
            let prefix = &pat[..pos];
            let suffix = &pat[pos + 1..];
            if target.len() < prefix.len() + suffix.len() {
                continue;
            }
            let stem_len = target.len() - prefix.len() - suffix.len();
            if let Some((best_len, _)) = &best
                && *best_len <= stem_len
            {
                continue;
            }
            if !target.starts_with(prefix) || !target.ends_with(suffix) {
                continue;
            }
            let stem = &target[prefix.len()..prefix.len() + stem_len];
            best = Some((stem_len, instantiate(rule, stem)));
            break;
        }
    }
    best.map(|(_, rule)| rule)
}

#[cfg(test)]
mod tests {
    use crate::RuleSet;

    #[test]
    fn exact_match_returns_rule_verbatim() {
        let rules = RuleSet::parse("a : b c\n\tbuild\n").unwrap();
        let rule = rules.find("a").unwrap();
        assert_eq!(rule.targets, ["a"]);
        assert_eq!(rule.deps, ["b", "c"]);
        assert_eq!(rule.script, "build\n");
    }

    #[test]
    fn no_rule_for_unknown_target() {
        let rules = RuleSet::parse("a :\n\tx\n").unwrap();
        assert!(rules.find("zzz").is_none());
    }

    #[test]
    fn exact_match_beats_earlier_generic() {
        let rules = RuleSet::parse("%.o : %.c\n\tgeneric\nfoo.o :\n\tspecific\n").unwrap();
        let rule = rules.find("foo.o").unwrap();
        assert_eq!(rule.script, "specific\n");
    }

    #[test]
    fn generic_match_substitutes_stem() {
        let rules = RuleSet::parse("%.o : %.c\n\tcc -c $1\n").unwrap();
        let rule = rules.find("foo.o").unwrap();
        assert_eq!(rule.targets, ["foo.o"]);
        assert_eq!(rule.deps, ["foo.c"]);
        assert!(!rule.generic);
    }

    #[test]
    fn stem_substitutes_into_every_pattern() {
        let rules = RuleSet::parse("%.a %.b : %.in fixed\n\tgen $1 $2\n").unwrap();
        let rule = rules.find("x.a").unwrap();
        assert_eq!(rule.targets, ["x.a", "x.b"]);
        assert_eq!(rule.deps, ["x.in", "fixed"]);
    }

    #[test]
    fn shortest_stem_wins() {
        let rules = RuleSet::parse("%.o : %.c\n\tshort pattern\nfoo.%.o : foo.%.c\n\tlong pattern\n")
            .unwrap();
        // Stem "bar" (3) beats stem "foo.bar" (7).
        let rule = rules.find("foo.bar.o").unwrap();
        assert_eq!(rule.script, "long pattern\n");
        assert_eq!(rule.deps, ["foo.bar.c"]);
    }

    #[test]
    fn equal_stems_pick_first_rule() {
        let rules = RuleSet::parse("%.x : one\n\tfirst\n%.x : two\n\tsecond\n").unwrap();
        let rule = rules.find("a.x").unwrap();
        assert_eq!(rule.script, "first\n");
    }

    #[test]
    fn empty_stem_is_allowed() {
        let rules = RuleSet::parse("p%s :\n\tmid\n").unwrap();
        let rule = rules.find("ps").unwrap();
        assert_eq!(rule.targets, ["ps"]);
    }

    #[test]
    fn target_shorter_than_pattern_frame_does_not_match() {
        let rules = RuleSet::parse("lib%.o :\n\tx\n").unwrap();
        assert!(rules.find("a.o").is_none());
    }

    #[test]
    fn find_is_deterministic() {
        let rules =
            RuleSet::parse("%.o : %.c\n\ta\nfoo.%.o : foo.%.c\n\tb\n%.bar.o : %.bar.c\n\tc\n")
                .unwrap();
        let first = rules.find("foo.bar.o").unwrap();
        for _ in 0..8 {
            assert_eq!(rules.find("foo.bar.o").unwrap(), first);
        }
    }
}
