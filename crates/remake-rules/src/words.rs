//! Word-level lexing shared by the rule file and the dependency database.
//!
//! Both files use the same token syntax: a bare word runs until a break
//! character, a quoted word is `"`-delimited with `\` escaping the next
//! character. `escape` is the saver-side inverse of quoted parsing.

/// Characters that terminate a bare word (and may not appear in one).
pub fn is_word_break(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b':')
}

/// Characters that force a word to be quoted when written back out.
fn needs_escape(b: u8) -> bool {
    matches!(b, b'"' | b'\\' | b'$' | b'!' | b' ')
}

/// Return `s` unchanged if it contains no special characters, a quoted and
/// backslash-escaped form otherwise.
pub fn escape(s: &str) -> String {
    if !s.bytes().any(needs_escape) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c.is_ascii() && needs_escape(c as u8) {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A cursor over file contents, with one-byte lookahead.
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    /// The next byte, without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Consume and return the next byte.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Consume a run of spaces (only `' '`; tabs are structural).
    pub fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    /// Consume a run of CR/LF bytes.
    pub fn skip_eol(&mut self) {
        while matches!(self.peek(), Some(b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Consume everything up to (but not including) the next newline.
    pub fn take_line(&mut self) -> &'a str {
        let bytes = self.bytes;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        // The cursor only ever stops on ASCII bytes, so the slice sits on
        // character boundaries.
        std::str::from_utf8(&bytes[start..self.pos]).unwrap_or_default()
    }

    /// Read a (possibly quoted) word. Returns an empty string when the
    /// cursor sits on a break character or at end of input.
    pub fn read_word(&mut self) -> String {
        let mut out = Vec::new();
        let Some(first) = self.peek() else {
            return String::new();
        };
        if is_word_break(first) {
            return String::new();
        }
        self.pos += 1;
        let quoted = first == b'"';
        if !quoted {
            out.push(first);
        }
        loop {
            let Some(b) = self.bump() else {
                break;
            };
            if quoted {
                match b {
                    b'\\' => {
                        if let Some(next) = self.bump() {
                            out.push(next);
                        }
                    }
                    b'"' => break,
                    _ => out.push(b),
                }
            } else {
                if is_word_break(b) {
                    self.pos -= 1;
                    break;
                }
                out.push(b);
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(input: &str) -> String {
        Scanner::new(input).read_word()
    }

    #[test]
    fn bare_word_stops_at_breaks() {
        assert_eq!(word("hello world"), "hello");
        assert_eq!(word("a.o:"), "a.o");
        assert_eq!(word("x\tY"), "x");
        assert_eq!(word("end\n"), "end");
    }

    #[test]
    fn word_on_break_is_empty() {
        assert_eq!(word(" lead"), "");
        assert_eq!(word(":"), "");
        assert_eq!(word(""), "");
    }

    #[test]
    fn quoted_word_spans_breaks() {
        assert_eq!(word("\"a b:c\""), "a b:c");
    }

    #[test]
    fn quoted_word_backslash_escapes() {
        assert_eq!(word(r#""a\"b""#), "a\"b");
        assert_eq!(word(r#""a\\b""#), "a\\b");
    }

    #[test]
    fn scanner_continues_after_word() {
        let mut sc = Scanner::new("one two");
        assert_eq!(sc.read_word(), "one");
        sc.skip_spaces();
        assert_eq!(sc.read_word(), "two");
        assert_eq!(sc.read_word(), "");
    }

    #[test]
    fn escape_is_identity_on_plain_words() {
        assert_eq!(escape("plain.o"), "plain.o");
        assert_eq!(escape("dir/file.c"), "dir/file.c");
    }

    #[test]
    fn escape_quotes_special_characters() {
        assert_eq!(escape("a b"), "\"a\\ b\"");
        assert_eq!(escape("a$b"), "\"a\\$b\"");
        assert_eq!(escape("a!b"), "\"a\\!b\"");
        assert_eq!(escape("a\\b"), "\"a\\\\b\"");
        assert_eq!(escape("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn escape_round_trips_through_read_word() {
        for s in ["plain", "a b", "we\\ird\"$!", "  ", "a!$"] {
            assert_eq!(word(&escape(s)), s, "round-trip failed for {s:?}");
        }
    }
}
