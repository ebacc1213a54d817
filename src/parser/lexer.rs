use itertools::{Itertools, PeekingNext};

#[derive(PartialEq, Debug, Clone)]
pub enum Token {
    Or,
    Nonterminal(String),
    Terminal(char)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// Expects the iterator to be on the uppercase letter that starts the name
pub fn lex_nonterminal(line: &mut impl PeekingNext<Item = char>) -> Token {
    Token::Nonterminal(line.peeking_take_while(|&c| is_name_char(c)).collect())
}

// Lexes the part of a rule to the right of `->`
pub fn lex_rewrite(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '|' {
            chars.next();
            tokens.push(Token::Or);
        } else if c.is_uppercase() {
            tokens.push(lex_nonterminal(&mut chars));
        } else if !c.is_whitespace() {
            chars.next();
            tokens.push(Token::Terminal(c));
        } else {
            chars.next();
        }
    }

    tokens
}
