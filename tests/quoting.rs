use tcldec::quote;

// ============================================================================
// Forms
// ============================================================================

#[test]
fn test_quote_01() {
    // The empty string renders as an empty braced word.
    assert_eq!(quote(""), "{}");
}

#[test]
fn test_quote_02() {
    // Plain words stay bare.
    assert_eq!(quote("abc"), "abc");
    assert_eq!(quote("ns::v"), "ns::v");
    assert_eq!(quote("a=1"), "a=1");
}

#[test]
fn test_quote_03() {
    // Whitespace forces brace quoting.
    assert_eq!(quote("1 2 3"), "{1 2 3}");
}

#[test]
fn test_quote_04() {
    // Newlines and tabs print literally inside braces; that reads
    // best for multiline strings.
    assert_eq!(quote("a\nb"), "{a\nb}");
    assert_eq!(quote("a\tb"), "{a\tb}");
}

#[test]
fn test_quote_05() {
    // Balanced inner braces are kept as-is.
    assert_eq!(quote("{a}"), "{{a}}");
    assert_eq!(quote("$x"), "{$x}");
    assert_eq!(quote("[cmd]"), "{[cmd]}");
}

#[test]
fn test_quote_06() {
    // Unbalanced braces force the escaped form.
    assert_eq!(quote("}"), "\"\\}\"");
    assert_eq!(quote("{a"), "\"\\{a\"");
}

#[test]
fn test_quote_07() {
    // Carriage returns (and friends) cannot print literally.
    assert_eq!(quote("x\ry"), "\"x\\ry\"");
    assert_eq!(quote("x\u{b}y"), "\"x\\vy\"");
    assert_eq!(quote("x\u{c}y"), "\"x\\fy\"");
}

#[test]
fn test_quote_08() {
    // Backslashes are escaped before anything else.
    assert_eq!(quote("a\\b\r"), "\"a\\\\b\\r\"");
}

#[test]
fn test_quote_09() {
    // All metacharacters survive the escaped form.
    assert_eq!(quote("a{$[x]\"}\rb"), "\"a\\{\\$\\[x\\]\\\"\\}\\rb\"");
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn test_quote_roundtrip() {
    let cases = [
        "",
        "abc",
        "a b",
        "{a}",
        "a\nb",
        "a\tb c",
        "}{",
        "a\"b",
        "$x",
        "[cmd]",
        "a\\b ",
        "x\ry",
        "line1\nline2\n",
    ];
    for s in cases {
        assert_eq!(unquote(&quote(s)), s, "round trip of {:?}", s);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// A tokenizer-lite for single quoted words, mirroring how the
/// language reads back each quoting form.
fn unquote(s: &str) -> String {
    if let Some(inner) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        // Brace-quoted: contents are literal.
        return inner.to_string();
    }
    if let Some(inner) = s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        // Double-quoted: process backslash escapes.
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('f') => out.push('\u{c}'),
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('v') => out.push('\u{b}'),
                Some(c) => out.push(c),
                None => {}
            }
        }
        return out;
    }
    // Bare word.
    s.to_string()
}
