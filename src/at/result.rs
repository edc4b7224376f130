//! AT Response Cursor
//!
//! [`AtResultIter`] walks the lines of an [`AtResponse`] field by field.
//! Every successful read advances past the field and its trailing comma, so
//! callers read a reply in the same order it is laid out on the wire:
//!
//! ```text
//! +CIND: ("service",(0,1)),("call",(0,1)),("callsetup",(0-3))
//!        ^open_list ^next_string ^open_list ^next_range ...
//! ```
//!
//! Reads that do not match the next field leave the cursor where it was.

use super::{AtLine, AtResponse};

/// Cursor over the lines of an AT response
#[derive(Debug, Clone)]
pub struct AtResultIter<'a> {
    lines: &'a [AtLine],
    next_line: usize,
    line: &'a str,
    pos: usize,
}

impl<'a> AtResultIter<'a> {
    /// Iterate over the intermediate lines of `response`
    #[must_use]
    pub fn new(response: &'a AtResponse) -> Self {
        Self::from_lines(response.lines())
    }

    /// Iterate over a single (typically unsolicited) line
    #[must_use]
    pub fn for_line(line: &'a AtLine) -> Self {
        Self::from_lines(core::slice::from_ref(line))
    }

    fn from_lines(lines: &'a [AtLine]) -> Self {
        Self {
            lines,
            next_line: 0,
            line: "",
            pos: 0,
        }
    }

    /// Advance to the next line starting with `prefix`.
    ///
    /// Lines without the prefix are skipped. An empty prefix matches any line.
    /// On success the cursor sits on the first field after the prefix.
    pub fn next(&mut self, prefix: &str) -> bool {
        while let Some(line) = self.lines.get(self.next_line) {
            self.next_line += 1;
            if line.starts_with(prefix) {
                self.line = line.as_str();
                self.pos = prefix.len();
                self.skip_spaces();
                return true;
            }
        }
        self.line = "";
        self.pos = 0;
        false
    }

    /// Read an unsigned decimal field
    pub fn next_number(&mut self) -> Option<u32> {
        let start = self.skip_spaces_from(self.pos);
        let (value, end) = self.parse_digits(start)?;
        self.pos = self.skip_to_next_field(end);
        Some(value)
    }

    /// Read a double-quoted string field; an omitted field reads as `""`
    pub fn next_string(&mut self) -> Option<&'a str> {
        let start = self.skip_spaces_from(self.pos);
        match self.byte_at(start) {
            Some(b',') => {
                self.pos = self.skip_to_next_field(start);
                Some("")
            }
            Some(b'"') => {
                let body = start + 1;
                let close = body + self.line.get(body..)?.find('"')?;
                let value = self.line.get(body..close)?;
                self.pos = self.skip_to_next_field(close + 1);
                Some(value)
            }
            _ => None,
        }
    }

    /// Read a bare token ending at `,` or `)`
    pub fn next_unquoted_string(&mut self) -> Option<&'a str> {
        let start = self.skip_spaces_from(self.pos);
        match self.byte_at(start) {
            None | Some(b'"' | b')') => None,
            Some(_) => {
                let rest = self.line.get(start..)?;
                let end = start + rest.find([',', ')']).unwrap_or(rest.len());
                let value = self.line.get(start..end)?.trim_end();
                self.pos = self.skip_to_next_field(end);
                Some(value)
            }
        }
    }

    /// Enter a parenthesised list
    pub fn open_list(&mut self) -> bool {
        let start = self.skip_spaces_from(self.pos);
        if self.byte_at(start) != Some(b'(') {
            return false;
        }
        self.pos = self.skip_spaces_from(start + 1);
        true
    }

    /// Leave a parenthesised list
    pub fn close_list(&mut self) -> bool {
        let start = self.skip_spaces_from(self.pos);
        if self.byte_at(start) != Some(b')') {
            return false;
        }
        self.pos = self.skip_to_next_field(start + 1);
        true
    }

    /// Read `min-max` or a single value `n` (returned as `(n, n)`)
    pub fn next_range(&mut self) -> Option<(u32, u32)> {
        let start = self.skip_spaces_from(self.pos);
        let (min, end) = self.parse_digits(start)?;
        if self.byte_at(end) != Some(b'-') {
            self.pos = self.skip_to_next_field(end);
            return Some((min, min));
        }
        let (max, end) = self.parse_digits(end + 1)?;
        self.pos = self.skip_to_next_field(end);
        Some((min, max))
    }

    /// Skip one field of any shape
    pub fn skip_next(&mut self) -> bool {
        let start = self.skip_spaces_from(self.pos);
        let Some(first) = self.byte_at(start) else {
            return false;
        };

        let end = match first {
            b'"' => {
                let Some(close) = self.line.get(start + 1..).and_then(|s| s.find('"')) else {
                    return false;
                };
                start + 1 + close + 1
            }
            b'(' => {
                let mut depth = 0usize;
                let mut end = None;
                for (offset, byte) in self.line.bytes().enumerate().skip(start) {
                    match byte {
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(offset + 1);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let Some(end) = end else {
                    return false;
                };
                end
            }
            _ => {
                let rest = &self.line.as_bytes()[start..];
                start
                    + rest
                        .iter()
                        .position(|&b| b == b',' || b == b')')
                        .unwrap_or(rest.len())
            }
        };

        self.pos = self.skip_to_next_field(end);
        true
    }

    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.line.as_bytes().get(pos).copied()
    }

    fn skip_spaces(&mut self) {
        self.pos = self.skip_spaces_from(self.pos);
    }

    fn skip_spaces_from(&self, mut pos: usize) -> usize {
        while self.byte_at(pos) == Some(b' ') {
            pos += 1;
        }
        pos
    }

    fn skip_to_next_field(&self, mut pos: usize) -> usize {
        if self.byte_at(pos) == Some(b',') {
            pos += 1;
        }
        self.skip_spaces_from(pos)
    }

    fn parse_digits(&self, start: usize) -> Option<(u32, usize)> {
        let mut pos = start;
        let mut value: u32 = 0;
        while let Some(byte @ b'0'..=b'9') = self.byte_at(pos) {
            value = value
                .checked_mul(10)?
                .checked_add(u32::from(byte - b'0'))?;
            pos += 1;
        }
        (pos > start).then_some((value, pos))
    }
}
