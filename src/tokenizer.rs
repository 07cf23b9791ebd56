//! Splits script source into a lazy stream of tokens.

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Eos,
    Eol,
    Str,
    Integer,
    Double,
    Hex,
}

/// A token read from the input source.
#[derive(Clone, Debug)]
pub struct Token {
    kind: TokenKind,
    string_value: String,
    uint_value: u64,
    double_value: f64,
    is_negative: bool,
}

impl Token {
    fn new(kind: TokenKind) -> Token {
        Token {
            kind,
            string_value: String::new(),
            uint_value: 0,
            double_value: 0.0,
            is_negative: false,
        }
    }

    fn string(value: impl Into<String>) -> Token {
        let mut t = Token::new(TokenKind::Str);
        t.string_value = value.into();
        t
    }

    pub fn is_hex(&self) -> bool {
        self.kind == TokenKind::Hex
    }
    pub fn is_integer(&self) -> bool {
        self.kind == TokenKind::Integer
    }
    pub fn is_double(&self) -> bool {
        self.kind == TokenKind::Double
    }
    pub fn is_string(&self) -> bool {
        self.kind == TokenKind::Str
    }
    pub fn is_eos(&self) -> bool {
        self.kind == TokenKind::Eos
    }
    pub fn is_eol(&self) -> bool {
        self.kind == TokenKind::Eol
    }

    pub fn is_comma(&self) -> bool {
        self.kind == TokenKind::Str && self.string_value == ","
    }
    pub fn is_open_bracket(&self) -> bool {
        self.kind == TokenKind::Str && self.string_value == "("
    }
    pub fn is_close_bracket(&self) -> bool {
        self.kind == TokenKind::Str && self.string_value == ")"
    }

    pub fn is_negative(&self) -> bool {
        self.is_negative
    }

    pub fn as_string(&self) -> &str {
        &self.string_value
    }

    pub fn as_u8(&self) -> u8 {
        self.uint_value as u8
    }
    pub fn as_u16(&self) -> u16 {
        self.uint_value as u16
    }
    pub fn as_u32(&self) -> u32 {
        self.uint_value as u32
    }
    pub fn as_u64(&self) -> u64 {
        self.uint_value
    }
    pub fn as_i8(&self) -> i8 {
        self.uint_value as i8
    }
    pub fn as_i16(&self) -> i16 {
        self.uint_value as i16
    }
    pub fn as_i32(&self) -> i32 {
        self.uint_value as i32
    }
    pub fn as_i64(&self) -> i64 {
        self.uint_value as i64
    }
    pub fn as_f32(&self) -> f32 {
        self.double_value as f32
    }
    pub fn as_f64(&self) -> f64 {
        self.double_value
    }

    /// Interprets a hex token's lexeme, returning the value of the longest
    /// valid hex-digit prefix after the `0x` marker.
    pub fn as_hex(&self) -> u64 {
        let digits = &self.string_value[2..];
        let end = digits
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or_else(|| digits.len());
        u64::from_str_radix(&digits[..end], 16).unwrap_or(0)
    }

    /// The unparsed lexeme of a numeric token, kept for error messages.
    pub fn to_original_string(&self) -> &str {
        &self.string_value
    }

    /// Promotes an integer or hex token to a double in place.
    pub fn convert_to_double(&mut self) -> Result<()> {
        match self.kind {
            TokenKind::Double => return Ok(()),
            TokenKind::Str | TokenKind::Eol | TokenKind::Eos => {
                return Err(Error::new("Invalid conversion to double"));
            }
            TokenKind::Integer => {
                if self.is_negative || self.uint_value <= i64::max_value() as u64 {
                    self.double_value = self.as_i64() as f64;
                } else {
                    return Err(Error::new("uint64 value too big to fit in double"));
                }
                self.uint_value = 0;
            }
            TokenKind::Hex => {
                self.double_value = self.as_hex() as f64;
                self.string_value.clear();
            }
        }
        self.kind = TokenKind::Double;
        Ok(())
    }
}

/// Splits the provided input into a stream of tokens.
pub struct Tokenizer {
    data: Vec<u8>,
    position: usize,
    line: u32,
}

fn is_space(ch: u8) -> bool {
    ch == b'\0' || ch == b'\t' || ch == b'\r' || ch == 0x0c || ch == b' '
}

fn is_separator(ch: u8) -> bool {
    ch == b' ' || ch == b'\r' || ch == b'\n' || ch == b')' || ch == b',' || ch == b'('
}

impl Tokenizer {
    pub fn new(data: &str) -> Tokenizer {
        Tokenizer {
            data: data.as_bytes().to_vec(),
            position: 0,
            line: 1,
        }
    }

    pub fn current_line(&self) -> u32 {
        self.line
    }

    pub fn set_current_line(&mut self, line: u32) {
        self.line = line;
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        if self.position >= self.data.len() {
            return Token::new(TokenKind::Eos);
        }

        if self.data[self.position] == b'#' {
            self.skip_comment();
            self.skip_whitespace();
        }
        if self.position >= self.data.len() {
            return Token::new(TokenKind::Eos);
        }

        if self.data[self.position] == b'\n' {
            self.line += 1;
            self.position += 1;
            return Token::new(TokenKind::Eol);
        }

        // `,`, `(` and `)` are tokens of their own; never consume past them.
        let ch = self.data[self.position];
        if ch == b',' || ch == b'(' || ch == b')' {
            self.position += 1;
            return Token::string((ch as char).to_string());
        }

        let start = self.position;
        let mut end = self.position;
        while end < self.data.len() && !is_separator(self.data[end]) {
            end += 1;
        }
        let tok_str = String::from_utf8_lossy(&self.data[start..end]).into_owned();
        self.position = end;

        let is_nan = tok_str.len() == 3 && tok_str.eq_ignore_ascii_case("nan");

        let bytes = tok_str.as_bytes();
        let numeric = is_nan
            || bytes[0].is_ascii_digit()
            || (bytes[0] == b'-' && bytes.len() >= 2 && bytes[1].is_ascii_digit())
            || (bytes[0] == b'.' && bytes.len() >= 2 && bytes[1].is_ascii_digit());

        if !numeric {
            // A backslash right before a line terminator is a continuation.
            if tok_str == "\\" {
                if self.position < self.data.len() && self.data[self.position] == b'\n' {
                    self.line += 1;
                    self.position += 1;
                    return self.next_token();
                } else if self.position + 1 < self.data.len()
                    && self.data[self.position] == b'\r'
                    && self.data[self.position + 1] == b'\n'
                {
                    self.line += 1;
                    self.position += 2;
                    return self.next_token();
                }
            }
            return Token::string(tok_str);
        }

        if !is_nan && tok_str.len() > 2 && bytes[0] == b'0' && bytes[1] == b'x' {
            let mut tok = Token::new(TokenKind::Hex);
            tok.string_value = tok_str;
            return tok;
        }

        let is_double = is_nan || tok_str.contains('.');

        let (mut tok, consumed) = if is_double {
            let consumed = double_prefix_len(&tok_str);
            let mut tok = Token::new(TokenKind::Double);
            tok.double_value = tok_str[..consumed].parse::<f64>().unwrap_or(0.0);
            (tok, consumed)
        } else {
            let consumed = integer_prefix_len(&tok_str);
            let mut tok = Token::new(TokenKind::Integer);
            tok.uint_value = parse_integer_prefix(&tok_str[..consumed]);
            (tok, consumed)
        };
        if tok_str.len() > 1 && bytes[0] == b'-' {
            tok.is_negative = true;
        }
        tok.string_value = tok_str[..consumed].to_owned();

        // If the number is not the whole token, rewind so the trailing
        // characters become the next token.
        if consumed > 0 {
            self.position -= tok_str.len() - consumed;
        }

        tok
    }

    /// Returns the raw substring from the current offset up to (not
    /// including) the next occurrence of `marker`, keeping the line counter
    /// in sync with any embedded newlines. Used to capture shader bodies
    /// verbatim.
    pub fn extract_to_next(&mut self, marker: &str) -> String {
        let hay = &self.data[self.position..];
        let found = find_subslice(hay, marker.as_bytes());
        let ret = match found {
            Some(rel) => {
                let s = String::from_utf8_lossy(&hay[..rel]).into_owned();
                self.position += rel;
                s
            }
            None => {
                let s = String::from_utf8_lossy(hay).into_owned();
                self.position = self.data.len();
                s
            }
        };
        self.line += ret.bytes().filter(|&b| b == b'\n').count() as u32;
        ret
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.data.len() && is_space(self.data[self.position]) {
            self.position += 1;
        }
    }

    fn skip_comment(&mut self) {
        while self.position < self.data.len() && self.data[self.position] != b'\n' {
            self.position += 1;
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Length of the longest prefix that parses as a base-10 integer, matching
/// the prefix rule of `strtoull`.
fn integer_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

/// Length of the longest prefix that parses as a floating literal, matching
/// the prefix rule of `strtod` (sign, digits, fraction, exponent, nan).
fn double_prefix_len(s: &str) -> usize {
    if s.len() >= 3 && s[..3].eq_ignore_ascii_case("nan") {
        return 3;
    }
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
        i += 1;
    }
    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
            j += 1;
        }
        let mut exp_digits = 0;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
            exp_digits += 1;
        }
        if exp_digits > 0 {
            i = j;
        }
    }
    i
}

/// Parses a decimal integer lexeme the way `strtoull` does: a leading minus
/// wraps the magnitude to its two's complement bits.
fn parse_integer_prefix(s: &str) -> u64 {
    let (neg, digits) = if s.starts_with('-') {
        (true, &s[1..])
    } else if s.starts_with('+') {
        (false, &s[1..])
    } else {
        (false, s)
    };
    let mut value: u64 = 0;
    for b in digits.bytes() {
        value = value
            .wrapping_mul(10)
            .wrapping_add(u64::from(b - b'0'));
    }
    if neg {
        value.wrapping_neg()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        let mut t = Tokenizer::new("");
        assert!(t.next_token().is_eos());
    }

    #[test]
    fn strings_and_integers() {
        let mut t = Tokenizer::new("TestString 123 -7");
        let tok = t.next_token();
        assert!(tok.is_string());
        assert_eq!("TestString", tok.as_string());

        let tok = t.next_token();
        assert!(tok.is_integer());
        assert_eq!(123, tok.as_u32());
        assert_eq!("123", tok.to_original_string());

        let tok = t.next_token();
        assert!(tok.is_integer());
        assert!(tok.is_negative());
        assert_eq!(-7, tok.as_i32());
        assert!(t.next_token().is_eos());
    }

    #[test]
    fn doubles() {
        let mut t = Tokenizer::new("12.34 -0.5 .25");
        assert_eq!(12.34, t.next_token().as_f64());
        assert_eq!(-0.5, t.next_token().as_f64());
        assert_eq!(0.25, t.next_token().as_f64());
    }

    #[test]
    fn nan_is_double() {
        let mut t = Tokenizer::new("NaN nan");
        let tok = t.next_token();
        assert!(tok.is_double());
        assert!(tok.as_f64().is_nan());
        assert!(t.next_token().is_double());
    }

    #[test]
    fn string_starting_with_number_rewinds() {
        let mut t = Tokenizer::new("1INVALID");
        let tok = t.next_token();
        assert!(tok.is_integer());
        assert_eq!(1, tok.as_u32());
        let tok = t.next_token();
        assert!(tok.is_string());
        assert_eq!("INVALID", tok.as_string());
    }

    #[test]
    fn double_then_suffix_rewinds() {
        let mut t = Tokenizer::new("3.4INVALID");
        let tok = t.next_token();
        assert!(tok.is_double());
        assert_eq!(3.4, tok.as_f64());
        assert_eq!("3.4", tok.to_original_string());
        assert_eq!("INVALID", t.next_token().as_string());
    }

    #[test]
    fn string_with_number_in_name() {
        let mut t = Tokenizer::new("vec2<float>");
        let tok = t.next_token();
        assert!(tok.is_string());
        assert_eq!("vec2<float>", tok.as_string());
    }

    #[test]
    fn newlines_count_lines() {
        let mut t = Tokenizer::new("a\nb\nc");
        assert_eq!(1, t.current_line());
        assert_eq!("a", t.next_token().as_string());
        assert!(t.next_token().is_eol());
        assert_eq!(2, t.current_line());
        assert_eq!("b", t.next_token().as_string());
        assert!(t.next_token().is_eol());
        assert_eq!("c", t.next_token().as_string());
        assert!(t.next_token().is_eos());
    }

    #[test]
    fn comments_extend_to_newline() {
        let mut t = Tokenizer::new("# comment\nvalue # trailing\nnext");
        assert!(t.next_token().is_eol());
        assert_eq!("value", t.next_token().as_string());
        assert!(t.next_token().is_eol());
        assert_eq!("next", t.next_token().as_string());
    }

    #[test]
    fn hex_values() {
        let mut t = Tokenizer::new("0xff00f0ff 0x000");
        let tok = t.next_token();
        assert!(tok.is_hex());
        assert_eq!(0xff00f0ff, tok.as_hex());
        assert_eq!(0, t.next_token().as_hex());
    }

    #[test]
    fn brackets_and_commas_are_string_tokens() {
        let mut t = Tokenizer::new("(1.0, 2)");
        assert!(t.next_token().is_open_bracket());
        assert_eq!(1.0, t.next_token().as_f64());
        assert!(t.next_token().is_comma());
        assert_eq!(2, t.next_token().as_u32());
        assert!(t.next_token().is_close_bracket());
    }

    #[test]
    fn dash_alone_is_string() {
        let mut t = Tokenizer::new("-");
        let tok = t.next_token();
        assert!(tok.is_string());
        assert_eq!("-", tok.as_string());
    }

    #[test]
    fn uint64_max_and_int64_min() {
        let mut t = Tokenizer::new("18446744073709551615 -9223372036854775808");
        let tok = t.next_token();
        assert_eq!(u64::max_value(), tok.as_u64());
        let tok = t.next_token();
        assert!(tok.is_negative());
        assert_eq!(i64::min_value(), tok.as_i64());
    }

    #[test]
    fn convert_to_double() {
        let mut t = Tokenizer::new("12 18446744073709551615 0x10 s");
        let mut tok = t.next_token();
        assert!(tok.convert_to_double().is_ok());
        assert_eq!(12.0, tok.as_f64());

        let mut tok = t.next_token();
        assert!(tok.convert_to_double().is_err());

        let mut tok = t.next_token();
        assert!(tok.convert_to_double().is_ok());
        assert_eq!(16.0, tok.as_f64());

        let mut tok = t.next_token();
        assert!(tok.convert_to_double().is_err());
    }

    #[test]
    fn continuation_skips_newline() {
        let mut t = Tokenizer::new("one \\\ntwo");
        assert_eq!("one", t.next_token().as_string());
        let tok = t.next_token();
        assert!(tok.is_string());
        assert_eq!("two", tok.as_string());
        assert_eq!(2, t.current_line());
    }

    #[test]
    fn continuation_crlf() {
        let mut t = Tokenizer::new("one \\\r\ntwo");
        assert_eq!("one", t.next_token().as_string());
        assert_eq!("two", t.next_token().as_string());
    }

    #[test]
    fn backslash_without_newline_is_string() {
        let mut t = Tokenizer::new("\\ x");
        assert_eq!("\\", t.next_token().as_string());
        assert_eq!("x", t.next_token().as_string());
    }

    #[test]
    fn extract_to_next() {
        let mut t = Tokenizer::new("this is\nsome text\nEND");
        let text = t.extract_to_next("END");
        assert_eq!("this is\nsome text\n", text);
        assert_eq!(3, t.current_line());
        assert_eq!("END", t.next_token().as_string());
    }

    #[test]
    fn extract_to_next_missing_marker() {
        let mut t = Tokenizer::new("no marker here");
        assert_eq!("no marker here", t.extract_to_next("END"));
        assert!(t.next_token().is_eos());
    }

    #[test]
    fn extract_to_next_at_marker() {
        let mut t = Tokenizer::new("END");
        assert_eq!("", t.extract_to_next("END"));
        assert_eq!("END", t.next_token().as_string());
    }
}
