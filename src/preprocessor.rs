/// Marks the start of a comment running to the end of the line.
const COMMENT_MARKER: char = '#';

/// Strip comments from every line. A backslash before the marker escapes it,
/// leaving a literal marker in the output.
pub fn remove_comments(code: &str) -> String {
    code.lines().map(strip_line).collect::<Vec<_>>().join("\n")
}

fn strip_line(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(character) = chars.next() {
        match character {
            '\\' if chars.peek() == Some(&COMMENT_MARKER) => {
                result.push(COMMENT_MARKER);
                chars.next();
            }
            COMMENT_MARKER => break,
            other => result.push(other),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_to_end_of_line() {
        assert_eq!(
            remove_comments("(+ 1 2) # add\n# whole line\n(f x)"),
            "(+ 1 2) \n\n(f x)"
        );
    }

    #[test]
    fn leaves_code_without_comments() {
        assert_eq!(remove_comments("(a ; b)"), "(a ; b)");
    }

    #[test]
    fn escaped_marker_survives() {
        assert_eq!(remove_comments(r"a \# b # c"), "a # b ");
    }
}
