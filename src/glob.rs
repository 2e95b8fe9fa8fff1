//! Redis-style glob patterns over raw key bytes.

const SPECIAL: &[u8] = b"*?[]\\";

/// Backslash-escapes every glob metacharacter in `literal` so the result
/// matches exactly `literal`.
pub(crate) fn escape(literal: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(literal.len());
    for &b in literal {
        if SPECIAL.contains(&b) {
            out.push(b'\\');
        }
        out.push(b);
    }
    out
}

/// Whether `ch` falls inside the bracket body `class` (text between `[` and
/// `]`). Handles `^`/`!` negation, `a-z` ranges and `\x` escapes.
fn class_match(class: &[u8], ch: u8) -> bool {
    let (negate, class) = match class.first() {
        Some(b'^') | Some(b'!') => (true, &class[1..]),
        _ => (false, class),
    };
    let mut found = false;
    let mut i = 0;
    while i < class.len() {
        let lo = if class[i] == b'\\' && i + 1 < class.len() {
            i += 1;
            class[i]
        } else {
            class[i]
        };
        if i + 2 < class.len() && class[i + 1] == b'-' {
            let hi = class[i + 2];
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            found |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            found |= ch == lo;
            i += 1;
        }
    }
    found != negate
}

/// End of the bracket expression starting right after `[` at `start`,
/// skipping escaped characters. `None` when unterminated.
fn class_end(pattern: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < pattern.len() {
        match pattern[i] {
            b'\\' => i += 2,
            b']' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Matches `text` against `pattern` supporting `*`, `?`, `[...]`, `[^...]`
/// and `\` escapes.
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it is currently
    // absorbing up to; used to backtrack.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => Some(p + 1),
            Some(b'[') => match class_end(pattern, p + 1) {
                Some(end) if class_match(&pattern[p + 1..end], text[t]) => Some(end + 1),
                Some(_) => None,
                // Unterminated bracket is a literal `[`.
                None => (text[t] == b'[').then_some(p + 1),
            },
            Some(b'\\') if p + 1 < pattern.len() => {
                (pattern[p + 1] == text[t]).then_some(p + 2)
            }
            Some(&c) => (c == text[t]).then_some(p + 1),
            None => None,
        };
        match step {
            Some(next) => {
                p = next;
                t += 1;
            }
            None => match star {
                Some((star_p, star_t)) => {
                    star = Some((star_p, star_t + 1));
                    p = star_p + 1;
                    t = star_t + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&b| b == b'*')
}
