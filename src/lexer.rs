use crate::ast::DurationKind;
use crate::error::MusicaError;
use std::fmt;

/// Token types for the Musica language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Declaration keywords
    Tempo,     // Tempo
    Compas,    // Compas / Compás
    Tonalidad, // Tonalidad

    // Modes
    Major, // Mayor / M
    Minor, // Menor / m

    // Durations
    Blanca,      // half
    Negra,       // quarter
    Corchea,     // eighth
    Semicorchea, // sixteenth

    // Note names, key roots and anything else made of letters and '#'
    Word(String),
    Number(u32),
    Slash, // /

    // Structure
    Newline,
    Whitespace,
}

impl Token {
    /// Duration keyword carried by this token, if any
    pub fn duration_kind(&self) -> Option<DurationKind> {
        match self {
            Token::Semicorchea => Some(DurationKind::Sixteenth),
            Token::Corchea => Some(DurationKind::Eighth),
            Token::Negra => Some(DurationKind::Quarter),
            Token::Blanca => Some(DurationKind::Half),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Tempo => f.write_str("<TEMPO>"),
            Token::Compas => f.write_str("<COMPAS>"),
            Token::Tonalidad => f.write_str("<TONALIDAD>"),
            Token::Major => f.write_str("<MAYOR>"),
            Token::Minor => f.write_str("<MENOR>"),
            Token::Blanca => f.write_str("<BLANCA>"),
            Token::Negra => f.write_str("<NEGRA>"),
            Token::Corchea => f.write_str("<CORCHEA>"),
            Token::Semicorchea => f.write_str("<SEMICORCHEA>"),
            Token::Word(word) => write!(f, "<PALABRA {}>", word),
            Token::Number(n) => write!(f, "<NUMERO {}>", n),
            Token::Slash => f.write_str("<BARRA>"),
            Token::Newline => f.write_str("<NUEVA_LINEA>"),
            Token::Whitespace => f.write_str("<ESPACIO>"),
        }
    }
}

/// A token with its position in the source
#[derive(Debug, Clone)]
pub struct LocatedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Classify a word as a keyword. Long keywords ignore case; the short mode
/// markers `M` and `m` do not, since their case is the whole distinction.
fn keyword(word: &str) -> Option<Token> {
    match word {
        "M" => return Some(Token::Major),
        "m" => return Some(Token::Minor),
        _ => {}
    }

    match word.to_lowercase().as_str() {
        "tempo" => Some(Token::Tempo),
        "compas" | "compás" => Some(Token::Compas),
        "tonalidad" => Some(Token::Tonalidad),
        "mayor" => Some(Token::Major),
        "menor" => Some(Token::Minor),
        "blanca" => Some(Token::Blanca),
        "negra" => Some(Token::Negra),
        "corchea" => Some(Token::Corchea),
        "semicorchea" => Some(Token::Semicorchea),
        _ => None,
    }
}

/// Lexer for tokenizing Musica source code
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            position: 0,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn check_comment(&self) -> bool {
        self.input[self.position..].starts_with("//")
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.position;
        while let Some(&c) = self.peek() {
            if c.is_alphabetic() || c == '#' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.position].to_string()
    }

    /// Read a run of digits. Values past `u32::MAX` saturate.
    fn read_number(&mut self) -> u32 {
        let start = self.position;
        while let Some(&c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.position].parse().unwrap_or(u32::MAX)
    }

    pub fn tokenize(&mut self) -> Result<Vec<LocatedToken>, MusicaError> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.peek() {
            let line = self.line;
            let column = self.column;

            // Comments run to the end of the line; the newline itself is kept
            if self.check_comment() {
                self.skip_comment();
                continue;
            }

            let token = match c {
                '/' => {
                    self.advance();
                    Token::Slash
                }
                '\n' => {
                    self.advance();
                    Token::Newline
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                    Token::Whitespace
                }
                '0'..='9' => Token::Number(self.read_number()),
                c if c.is_alphabetic() => {
                    let word = self.read_word();
                    keyword(&word).unwrap_or(Token::Word(word))
                }
                _ => {
                    return Err(MusicaError::ParseError {
                        line,
                        column,
                        message: format!("Unexpected character: '{}'", c),
                    });
                }
            };

            tokens.push(LocatedToken {
                token,
                line,
                column,
            });
        }

        Ok(tokens)
    }
}
