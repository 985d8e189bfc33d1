//! Splits an input line into argument and operator tokens and validates the result.

use crate::command::{Command, LaunchPlan, Operator, Token};
use crate::error::ParseError;

/// Longest accepted input line, in characters.
pub const DEFAULT_MAX_LINE: usize = 80;

/// Parse a single line of user input.
///
/// Returns `Ok(None)` when the line contains no tokens at all. Malformed operator
/// sequences are rejected here so that no malformed command ever reaches the launcher.
pub fn parse_line(line: &str, max_line: usize) -> Result<Option<Command>, ParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.chars().count() > max_line {
        return Err(ParseError::LineTooLong { max: max_line });
    }

    let tokens: Vec<Token> = line.split_whitespace().map(classify).collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    for pair in tokens.windows(2) {
        if let [Token::Op(first), Token::Op(second)] = pair {
            return Err(ParseError::AdjacentOperators {
                first: *first,
                second: *second,
            });
        }
    }

    let plan = LaunchPlan::from_tokens(&tokens)?;
    Ok(Some(Command::new(line.to_string(), tokens, plan)))
}

fn classify(word: &str) -> Token {
    match Operator::from_token(word) {
        Some(op) => Token::Op(op),
        None => Token::Arg(word.to_string()),
    }
}
