use super::error::{DjvuError, DjvuResult};

/// S-expression token types returned by the Lexer.
///
/// This matches the syntax printed by djvused and accepted by the engine's
/// expression reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// End of input marker
    EOF,

    /// List start '('
    ListStart,

    /// List end ')'
    ListEnd,

    /// Dotted pair separator '.'
    Dot,

    /// Integer value (range checked by the reader)
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// String value (from "quoted text" with C escapes)
    String(String),

    /// Symbol name (bare, or from |quoted symbols|)
    Symbol(String),
}

/// Lexer for the textual S-expression syntax.
///
/// The lexer handles:
/// - Whitespace and `;` comment skipping
/// - Integer and float parsing
/// - String parsing with C escapes, including octal and hex bytes
/// - Bare and `|quoted|` symbols
pub struct Lexer<'a> {
    /// The input text
    input: &'a [u8],

    /// Offset of the current character
    pos: usize,

    /// Current character being examined, -1 at end of input
    current_char: i32,

    /// Buffer for building strings and symbols
    str_buf: Vec<u8>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let input = input.as_bytes();
        Lexer {
            input,
            pos: 0,
            current_char: input.first().map_or(-1, |&b| b as i32),
            str_buf: Vec::new(),
        }
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Advances to the next character.
    fn next_char(&mut self) -> i32 {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
        self.current_char = self.input.get(self.pos).map_or(-1, |&b| b as i32);
        self.current_char
    }

    fn syntax_error(&self, detail: impl Into<String>) -> DjvuError {
        DjvuError::Syntax {
            offset: self.pos,
            detail: detail.into(),
        }
    }

    /// Checks if a character is whitespace.
    ///
    /// Whitespace: TAB, LF, VT, FF, CR, SPACE
    fn is_whitespace(ch: i32) -> bool {
        matches!(ch, 0x09 | 0x0A | 0x0B | 0x0C | 0x0D | 0x20)
    }

    /// Checks if a character ends a bare token.
    ///
    /// Delimiters: ( ) " ; |
    fn is_delimiter(ch: i32) -> bool {
        matches!(ch, 0x28 | 0x29 | 0x22 | 0x3B | 0x7C)
    }

    /// Checks if a character is special (whitespace or delimiter).
    fn is_special(ch: i32) -> bool {
        ch < 0 || Self::is_whitespace(ch) || Self::is_delimiter(ch)
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        let mut comment = false;

        loop {
            let ch = self.current_char;

            if ch < 0 {
                break;
            }

            if comment {
                if ch == 0x0A || ch == 0x0D {
                    comment = false;
                }
            } else if ch == 0x3B {
                // ';' starts a comment
                comment = true;
            } else if !Self::is_whitespace(ch) {
                break;
            }

            self.next_char();
        }
    }

    /// Gets the next token from the input.
    pub fn get_object(&mut self) -> DjvuResult<Token> {
        self.skip_whitespace_and_comments();

        match self.current_char {
            ch if ch < 0 => Ok(Token::EOF),

            // List start: (
            0x28 => {
                self.next_char();
                Ok(Token::ListStart)
            }

            // List end: )
            0x29 => {
                self.next_char();
                Ok(Token::ListEnd)
            }

            // String: "
            0x22 => self.get_string(),

            // Quoted symbol: |
            0x7C => self.get_quoted_symbol(),

            // Numbers, symbols and the dot
            _ => self.get_atom(),
        }
    }

    /// Parses a bare token: a number, a symbol or the lone dot.
    fn get_atom(&mut self) -> DjvuResult<Token> {
        let start = self.pos;
        while !Self::is_special(self.current_char) {
            self.next_char();
        }

        // Bare tokens stop at ASCII delimiters, so the slice is valid UTF-8
        let text = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();

        if text == "." {
            return Ok(Token::Dot);
        }

        if looks_like_integer(&text) {
            return match text.parse::<i64>() {
                Ok(value) => Ok(Token::Integer(value)),
                Err(_) => Err(DjvuError::IntegerOutOfRange(if text.starts_with('-') {
                    i64::MIN
                } else {
                    i64::MAX
                })),
            };
        }

        if let Some(value) = non_finite_float(&text) {
            return Ok(Token::Float(value));
        }

        if looks_like_float(&text) {
            if let Ok(value) = text.parse::<f64>() {
                return Ok(Token::Float(value));
            }
        }

        Ok(Token::Symbol(text))
    }

    /// Parses a string token.
    ///
    /// Handles the C escapes \a \b \t \n \v \f \r \\ \" \' \?, octal
    /// `\ooo`, hex `\xHH` and backslash-newline continuation.
    fn get_string(&mut self) -> DjvuResult<Token> {
        self.str_buf.clear();
        let mut ch = self.next_char();

        loop {
            match ch {
                -1 => return Err(self.syntax_error("unterminated string")),

                // Closing quote
                0x22 => {
                    self.next_char();
                    break;
                }

                // Backslash escape
                0x5C => {
                    ch = self.next_char();
                    match ch {
                        -1 => return Err(self.syntax_error("unterminated escape")),
                        0x61 => self.str_buf.push(0x07), // \a
                        0x62 => self.str_buf.push(0x08), // \b
                        0x74 => self.str_buf.push(0x09), // \t
                        0x6E => self.str_buf.push(0x0A), // \n
                        0x76 => self.str_buf.push(0x0B), // \v
                        0x66 => self.str_buf.push(0x0C), // \f
                        0x72 => self.str_buf.push(0x0D), // \r
                        0x0A => {}                       // line continuation
                        0x30..=0x37 => {
                            let mut value = 0u32;
                            let mut digits = 0;
                            while digits < 3 && (0x30..=0x37).contains(&ch) {
                                value = value * 8 + (ch - 0x30) as u32;
                                digits += 1;
                                ch = self.next_char();
                            }
                            let Ok(byte) = u8::try_from(value) else {
                                return Err(self.syntax_error("octal escape above \\377"));
                            };
                            self.str_buf.push(byte);
                            continue;
                        }
                        0x78 => {
                            // \x followed by up to two hex digits
                            let mut value = 0u32;
                            let mut digits = 0;
                            ch = self.next_char();
                            while digits < 2 {
                                let Some(digit) = hex_value(ch) else {
                                    break;
                                };
                                value = value * 16 + digit;
                                digits += 1;
                                ch = self.next_char();
                            }
                            if digits == 0 {
                                return Err(self.syntax_error("\\x without hex digits"));
                            }
                            self.str_buf.push(value as u8);
                            continue;
                        }
                        // \\ \" \' \? and anything else stand for themselves
                        other => self.str_buf.push(other as u8),
                    }
                }

                other => self.str_buf.push(other as u8),
            }
            ch = self.next_char();
        }

        Ok(Token::String(
            String::from_utf8_lossy(&self.str_buf).into_owned(),
        ))
    }

    /// Parses a `|quoted symbol|`. Backslash escapes the next character.
    fn get_quoted_symbol(&mut self) -> DjvuResult<Token> {
        self.str_buf.clear();
        let mut ch = self.next_char();

        loop {
            match ch {
                -1 => return Err(self.syntax_error("unterminated symbol")),
                0x7C => {
                    self.next_char();
                    break;
                }
                0x5C => {
                    ch = self.next_char();
                    if ch < 0 {
                        return Err(self.syntax_error("unterminated escape"));
                    }
                    self.str_buf.push(ch as u8);
                }
                other => self.str_buf.push(other as u8),
            }
            ch = self.next_char();
        }

        Ok(Token::Symbol(
            String::from_utf8_lossy(&self.str_buf).into_owned(),
        ))
    }
}

fn hex_value(ch: i32) -> Option<u32> {
    u8::try_from(ch)
        .ok()
        .and_then(|b| (b as char).to_digit(16))
}

/// Spelling of a NaN float.
pub(crate) const NAN_SPELLING: &str = "+nan.0";
/// Spelling of positive infinity.
pub(crate) const INFINITY_SPELLING: &str = "+inf.0";
/// Spelling of negative infinity.
pub(crate) const NEG_INFINITY_SPELLING: &str = "-inf.0";

/// The float a non-finite spelling stands for.
pub(crate) fn non_finite_float(text: &str) -> Option<f64> {
    match text {
        NAN_SPELLING | "-nan.0" => Some(f64::NAN),
        INFINITY_SPELLING => Some(f64::INFINITY),
        NEG_INFINITY_SPELLING => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

/// Optional sign followed by one or more digits.
pub(crate) fn looks_like_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Sign, digits, at most one dot and an optional exponent.
pub(crate) fn looks_like_float(text: &str) -> bool {
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };

    let mut dots = 0;
    let mut digits = 0;
    for b in mantissa.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => digits += 1,
            _ => return false,
        }
    }
    if digits == 0 || dots > 1 {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => looks_like_integer(exp),
    }
}
