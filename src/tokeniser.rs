use anyhow::{Result, bail};

use crate::{error::LexError, model::Token, value::Number};

/// Characters which may make up an operator token.
const OPERATOR_CHARS: &[char] = &['+', '-', '*', '/', '%', '^', '&', '<', '>', '=', '|', '!'];

fn is_operator_char(character: char) -> bool {
    OPERATOR_CHARS.contains(&character)
}

fn is_atomic_char(character: char) -> bool {
    character.is_alphanumeric() || character == '_' || character == '.'
}

/// Parse the contents of the character buffer into a token and add it to the list of tokens, if necessary.
/// Cleans up after itself by clearing the character buffer.
fn flush_char_buf(char_buf: &mut String, tokens: &mut Vec<Token>, offset: usize) -> Result<()> {
    if char_buf.is_empty() {
        return Ok(());
    }

    let token = if char_buf.chars().all(is_operator_char) {
        Token::Operator(char_buf.clone())
    } else if let Some(number) = parse_number(char_buf) {
        Token::Number(number)
    } else if char_buf.starts_with(|c: char| c.is_ascii_digit()) {
        bail!(LexError::InvalidToken {
            text: char_buf.clone(),
            offset
        })
    } else {
        Token::Identifier(char_buf.clone())
    };

    tokens.push(token);
    char_buf.clear();
    Ok(())
}

/// Integers take priority over floats. Text without a digit is never a
/// number, which keeps `inf` and `nan` usable as names.
fn parse_number(text: &str) -> Option<Number> {
    if !text.contains(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(int) = text.parse::<i64>() {
        Some(Number::Int(int))
    } else {
        text.parse::<f64>().ok().map(Number::Float)
    }
}

/// Tokenise a program string.
pub fn tokenise(program_string: &str) -> Result<Vec<Token>> {
    let mut char_buf = String::new();
    let mut tokens = Vec::new();

    for (offset, character) in program_string.chars().enumerate() {
        let syntactic = match character {
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '\'' => Some(Token::Quote),
            ';' => Some(Token::Separator),
            _ => None,
        };

        if let Some(token) = syntactic {
            flush_char_buf(&mut char_buf, &mut tokens, offset)?;
            tokens.push(token);
        } else if character.is_whitespace() {
            flush_char_buf(&mut char_buf, &mut tokens, offset)?;
        } else if is_atomic_char(character) || is_operator_char(character) {
            char_buf.push(character);
        } else {
            bail!(LexError::UnexpectedCharacter { character, offset })
        }
    }

    flush_char_buf(&mut char_buf, &mut tokens, program_string.chars().count())?;

    Ok(tokens)
}
