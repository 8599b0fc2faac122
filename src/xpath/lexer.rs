//! Path query tokenizer.

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    DoubleColon, // ::
    Dollar,      // $
    Number(f64),
    Literal(String),
    /// NCName or prefix:local. Operator names (`and`, `div`, ...) are
    /// told apart by the parser from their position.
    Name(String),
    Eof,
}

pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Tokenize the whole input. The last token is always [`Token::Eof`].
    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '/' => {
                if self.peek_at(1) == Some('/') {
                    self.advance(2);
                    Token::DoubleSlash
                } else {
                    self.advance(1);
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Token::DoubleDot
                } else if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
                    self.read_number()?
                } else {
                    self.advance(1);
                    Token::Dot
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '=' => self.single(Token::Eq),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '$' => self.single(Token::Dollar),
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Token::NotEq
                } else {
                    return Err(format!("unexpected character '!' at {}", self.pos));
                }
            }
            '<' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Token::LtEq
                } else {
                    self.single(Token::Lt)
                }
            }
            '>' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Token::GtEq
                } else {
                    self.single(Token::Gt)
                }
            }
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Token::DoubleColon
                } else {
                    return Err(format!("unexpected character ':' at {}", self.pos));
                }
            }
            '"' | '\'' => self.read_literal(c)?,
            c if c.is_ascii_digit() => self.read_number()?,
            c if is_name_start(c) => self.read_name(),
            c => return Err(format!("unexpected character '{}' at {}", c, self.pos)),
        };
        Ok(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance(1);
        token
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, String> {
        let start = self.pos;
        self.advance(1);
        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.remaining()[..len].to_string();
                self.advance(len + 1);
                Ok(Token::Literal(value))
            }
            None => Err(format!("unterminated string literal at {}", start)),
        }
    }

    fn read_number(&mut self) -> Result<Token, String> {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance(1);
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.advance(1);
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| format!("invalid number '{}' at {}", text, start))
    }

    fn read_name(&mut self) -> Token {
        let start = self.pos;
        self.consume_name_chars();
        // prefix:local or prefix:*, but not axis::
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            match self.peek_at(1) {
                Some(c) if is_name_start(c) => {
                    self.advance(1);
                    self.consume_name_chars();
                }
                Some('*') => self.advance(2),
                _ => {}
            }
        }
        Token::Name(self.input[start..self.pos].to_string())
    }

    fn consume_name_chars(&mut self) {
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_path_tokens() {
        assert_eq!(
            lex("//item[@id = '1']/.."),
            vec![
                Token::DoubleSlash,
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::Literal("1".to_string()),
                Token::RightBracket,
                Token::Slash,
                Token::DoubleDot,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_names_and_numbers() {
        assert_eq!(
            lex("child::ns:a-b[.5 >= 1.25]"),
            vec![
                Token::Name("child".to_string()),
                Token::DoubleColon,
                Token::Name("ns:a-b".to_string()),
                Token::LeftBracket,
                Token::Number(0.5),
                Token::GtEq,
                Token::Number(1.25),
                Token::RightBracket,
                Token::Eof,
            ]
        );
        assert_eq!(lex("last()-1")[3], Token::Minus);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("a[@b='x]").tokenize().is_err());
        assert!(Lexer::new("a # b").tokenize().is_err());
        assert!(Lexer::new("a!b").tokenize().is_err());
    }
}
