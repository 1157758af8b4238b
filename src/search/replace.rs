//! Replacement text helpers for search-and-replace.

/// Expand back-references in a replacement template.
///
/// `captured[0]` is the whole match, `captured[n]` the n-th group.
///
/// | Syntax | Expands to |
/// |--------|------------|
/// | `\1`..`\9`, `$1`..`$9` | capture group (nothing if the group does not exist) |
/// | `\0`, `$&` | the whole match |
/// | `\&` | `&` |
/// | `\\`, `$$` | `\`, `$` |
/// | `\t`, `\n` | tab, newline |
///
/// Any other escape is kept as written.
///
/// ```rust
/// use devpath::expand_replacement_template;
///
/// let captured = ["whole".to_string(), "a".to_string(), "b".to_string()];
/// assert_eq!(expand_replacement_template(r"\1-\2", &captured), "a-b");
/// assert_eq!(expand_replacement_template("$&!", &captured[..1]), "whole!");
/// ```
pub fn expand_replacement_template(template: &str, captured: &[String]) -> String {
    fn group(captured: &[String], digit: char) -> &str {
        digit
            .to_digit(10)
            .and_then(|d| captured.get(d as usize))
            .map_or("", String::as_str)
    }

    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        let (escape, Some(&next)) = (c, chars.peek()) else {
            result.push(c);
            continue;
        };
        match (escape, next) {
            ('\\', '\\') => result.push('\\'),
            ('\\', '&') => result.push('&'),
            ('\\', 't') => result.push('\t'),
            ('\\', 'n') => result.push('\n'),
            ('$', '$') => result.push('$'),
            ('$', '&') => result.push_str(group(captured, '0')),
            ('\\' | '$', d) if d.is_ascii_digit() => result.push_str(group(captured, d)),
            ('\\' | '$', other) => {
                result.push(escape);
                result.push(other);
            }
            _ => {
                result.push(c);
                continue;
            }
        }
        chars.next();
    }
    result
}

fn apply_case_pattern(original: &str, replacement: &str) -> String {
    let mut orig = original.chars();
    let (Some(first), false) = (orig.next(), replacement.is_empty()) else {
        return replacement.to_string();
    };
    let rest: Vec<char> = orig.collect();
    let rest_lower = !rest.iter().any(|c| c.is_uppercase());
    let rest_upper = !rest.iter().any(|c| c.is_lowercase());

    let mut out = if rest_lower {
        replacement.to_lowercase()
    } else if rest_upper {
        replacement.to_uppercase()
    } else {
        return replacement.to_string();
    };
    let recase: Option<fn(char) -> String> = if rest_lower && first.is_uppercase() {
        Some(|c| c.to_uppercase().collect())
    } else if !rest_lower && first.is_lowercase() {
        Some(|c| c.to_lowercase().collect())
    } else {
        None
    };
    if let Some(recase) = recase {
        if let Some(head) = out.chars().next() {
            out = recase(head) + &out[head.len_utf8()..];
        }
    }
    out
}

/// Carry the capitalization of `original` over to `replacement`.
///
/// A prefix and suffix the two share (ignoring case) are taken from
/// `replacement` unchanged; the case pattern of the rest of `original`
/// (all lower, all upper, or capitalized) is applied to the rest of
/// `replacement`. Mixed case leaves the replacement alone.
///
/// ```rust
/// use devpath::match_case_replacement;
///
/// assert_eq!(match_case_replacement("HELLO", "world"), "WORLD");
/// assert_eq!(match_case_replacement("Hello", "world"), "World");
/// assert_eq!(match_case_replacement("HeLLo", "world"), "world");
/// ```
pub fn match_case_replacement(original: &str, replacement: &str) -> String {
    if original.is_empty() {
        return replacement.to_string();
    }
    let orig: Vec<char> = original.chars().collect();
    let repl: Vec<char> = replacement.chars().collect();
    let same = |a: char, b: char| a.to_lowercase().eq(b.to_lowercase());

    let mut prefix = 0;
    while prefix < orig.len() && prefix < repl.len() && same(orig[prefix], repl[prefix]) {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < orig.len() - prefix
        && suffix < repl.len() - prefix
        && same(orig[orig.len() - suffix - 1], repl[repl.len() - suffix - 1])
    {
        suffix += 1;
    }

    let head: String = repl[..prefix].iter().collect();
    let tail: String = repl[repl.len() - suffix..].iter().collect();
    let orig_mid: String = orig[prefix..orig.len() - suffix].iter().collect();
    let repl_mid: String = repl[prefix..repl.len() - suffix].iter().collect();
    head + &apply_case_pattern(&orig_mid, &repl_mid) + &tail
}
