//! Go string literal quoting.
//!
//! Struct tag values are Go interpreted string literals, and a whole tag may
//! itself be written as an interpreted literal instead of a raw one, so both
//! directions of the conversion are needed.

/// Decode a Go interpreted string literal (including its surrounding quotes).
///
/// Returns `None` for anything `strconv.Unquote` would reject: missing
/// quotes, a bare quote or newline inside, or an invalid escape sequence.
pub fn unquote(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' | '\n' => return None,
            '\\' => match chars.next()? {
                'a' => out.push(0x07),
                'b' => out.push(0x08),
                'f' => out.push(0x0c),
                'n' => out.push(b'\n'),
                'r' => out.push(b'\r'),
                't' => out.push(b'\t'),
                'v' => out.push(0x0b),
                '\\' => out.push(b'\\'),
                '"' => out.push(b'"'),
                'x' => out.push(u8::try_from(read_digits(&mut chars, 2, 16)?).ok()?),
                d @ '0'..='7' => {
                    let rest = read_digits(&mut chars, 2, 8)?;
                    let value = (d as u32 - '0' as u32) * 64 + rest;
                    out.push(u8::try_from(value).ok()?);
                }
                'u' => push_char(&mut out, char::from_u32(read_digits(&mut chars, 4, 16)?)?),
                'U' => push_char(&mut out, char::from_u32(read_digits(&mut chars, 8, 16)?)?),
                _ => return None,
            },
            other => push_char(&mut out, other),
        }
    }

    String::from_utf8(out).ok()
}

/// Encode `value` as a Go interpreted string literal, escaping the way
/// `strconv.Quote` does for the characters a struct tag can realistically hold.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if is_printable(c) => out.push(c),
            c if (c as u32) < 0x80 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if (c as u32) < 0x10000 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push_str(&format!("\\U{:08x}", c as u32)),
        }
    }
    out.push('"');
    out
}

fn is_printable(ch: char) -> bool {
    ch == ' ' || !(ch.is_control() || ch.is_whitespace())
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

fn read_digits(chars: &mut std::str::Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..count {
        value = value * radix + chars.next()?.to_digit(radix)?;
    }
    Some(value)
}
