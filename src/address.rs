//! OSC address pattern matching.
//!
//! Patterns follow the OSC 1.0 rules:
//! - `?` matches exactly one character
//! - `*` matches zero or more characters
//! - `[abc]`, `[a-z]`, `[!a-z]` match one character from (or outside) a set
//! - `{foo,bar}` matches any of the listed literal alternatives
//!
//! Wildcards never match `/`, so they stay within a single address part.
//! A pattern consisting of a lone `*` matches every address.
//!
//! Matching is case-sensitive, covers the whole address and never allocates.

/// Check whether a concrete OSC address matches a bind pattern.
pub fn matches(pattern: &str, address: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    match_from(pattern, address)
}

/// Check whether a pattern contains any wildcard syntax.
pub fn is_pattern(address: &str) -> bool {
    address.contains(['*', '?', '[', '{'])
}

fn match_from(mut pattern: &str, mut address: &str) -> bool {
    loop {
        let mut pat = pattern.chars();
        let Some(p) = pat.next() else {
            return address.is_empty();
        };

        match p {
            '*' => {
                let rest = pat.as_str().trim_start_matches('*');
                if rest.is_empty() {
                    return !address.contains('/');
                }

                let mut candidate = address;
                loop {
                    if match_from(rest, candidate) {
                        return true;
                    }
                    let mut chars = candidate.chars();
                    match chars.next() {
                        Some(c) if c != '/' => candidate = chars.as_str(),
                        _ => return false,
                    }
                }
            }
            '?' => {
                let mut chars = address.chars();
                match chars.next() {
                    Some(c) if c != '/' => {
                        pattern = pat.as_str();
                        address = chars.as_str();
                    }
                    _ => return false,
                }
            }
            '[' => {
                let mut chars = address.chars();
                let c = match chars.next() {
                    Some(c) if c != '/' => c,
                    _ => return false,
                };
                match match_class(pat.as_str(), c) {
                    Some((true, rest)) => {
                        pattern = rest;
                        address = chars.as_str();
                    }
                    _ => return false,
                }
            }
            '{' => {
                let body = pat.as_str();
                let Some(close) = body.find('}') else {
                    return false;
                };
                let rest = &body[close + 1..];

                return body[..close].split(',').any(|alt| {
                    address
                        .strip_prefix(alt)
                        .is_some_and(|tail| match_from(rest, tail))
                });
            }
            literal => {
                let mut chars = address.chars();
                if chars.next() != Some(literal) {
                    return false;
                }
                pattern = pat.as_str();
                address = chars.as_str();
            }
        }
    }
}

/// Match one character against a `[...]` set.
///
/// `pattern` starts right after the opening bracket. Returns whether the
/// character is accepted and the pattern remaining after the closing
/// bracket, or `None` when the set is unterminated.
fn match_class(pattern: &str, c: char) -> Option<(bool, &str)> {
    let (negated, body) = match pattern.strip_prefix('!') {
        Some(body) => (true, body),
        None => (false, pattern),
    };

    let close = body.find(']')?;
    let (set, rest) = (&body[..close], &body[close + 1..]);

    let mut hit = false;
    let mut chars = set.chars();
    while let Some(lo) = chars.next() {
        // `-` at either end of the set is literal
        let mut ahead = chars.clone();
        if ahead.next() == Some('-') {
            if let Some(hi) = ahead.next() {
                chars = ahead;
                hit |= lo <= c && c <= hi;
                continue;
            }
        }
        hit |= lo == c;
    }

    Some((hit != negated, rest))
}
