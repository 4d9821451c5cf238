use std::borrow::Cow;

use memchr::memchr3;

/// Escape text content for an HTML text position.
///
/// Contract:
/// - Only `&`, `<` and `>` are replaced (`&amp;`, `&lt;`, `&gt;`).
/// - Input without any of those bytes is returned borrowed, untouched.
/// - Already escaped input is escaped again; callers that hold trusted markup
///   must pass it through as raw HTML instead of text.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let Some(first) = memchr3(b'&', b'<', b'>', bytes) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len() + 8);
    out.push_str(&s[..first]);
    let mut i = first;
    let mut copy_start = first;

    // memchr3 keeps long runs of plain text on the fast path.
    while let Some(rel) = memchr3(b'&', b'<', b'>', &bytes[i..]) {
        let pos = i + rel;
        if copy_start < pos {
            out.push_str(&s[copy_start..pos]);
        }
        out.push_str(entity_for(bytes[pos]));
        i = pos + 1;
        copy_start = i;
    }
    out.push_str(&s[copy_start..]);
    Cow::Owned(out)
}

/// Escape a value for a double-quoted attribute position.
///
/// Replaces `&`, `<`, `>`, `"` and `'`. Like [`escape_text`] it borrows when
/// nothing needs replacing.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let Some(first) = bytes.iter().position(|b| is_attr_special(*b)) else {
        return Cow::Borrowed(s);
    };

    let mut out = String::with_capacity(s.len() + 16);
    out.push_str(&s[..first]);
    let mut copy_start = first;
    for (pos, &b) in bytes.iter().enumerate().skip(first) {
        if !is_attr_special(b) {
            continue;
        }
        if copy_start < pos {
            out.push_str(&s[copy_start..pos]);
        }
        out.push_str(entity_for(b));
        copy_start = pos + 1;
    }
    out.push_str(&s[copy_start..]);
    Cow::Owned(out)
}

#[inline]
fn is_attr_special(b: u8) -> bool {
    matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'')
}

// Callers only pass bytes accepted by `is_attr_special` or the memchr3 set.
fn entity_for(b: u8) -> &'static str {
    match b {
        b'&' => "&amp;",
        b'<' => "&lt;",
        b'>' => "&gt;",
        b'"' => "&quot;",
        _ => "&#39;",
    }
}
