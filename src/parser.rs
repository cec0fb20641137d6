use anyhow::{Result, bail};

use crate::{
    error::ParseError,
    model::{Token, TokenNode},
    value::Value,
};

/// Parse one top-level node of a desugared token tree into a `Value`.
///
/// Groups become proper lists, numbers become numbers, `true`/`false` become
/// booleans and every other name or operator becomes a string. Which strings
/// are variables and which are keywords is left to the evaluator.
pub fn parse(node: TokenNode) -> Result<Value> {
    parse_node(node, false)
}

/// `literal` groups are data, not code: quoted forms and lambda parameter
/// lists. Nothing inside them is rewritten.
fn parse_node(node: TokenNode, literal: bool) -> Result<Value> {
    match node {
        TokenNode::Leaf(token) => parse_token(token),
        TokenNode::Tree(tree) => {
            let head = match tree.children.first() {
                Some(TokenNode::Leaf(Token::Identifier(name))) => Some(name.clone()),
                _ => None,
            };

            let mut items = tree
                .children
                .into_iter()
                .enumerate()
                .map(|(position, child)| {
                    let literal = literal
                        || match head.as_deref() {
                            Some("quote") => position > 0,
                            Some("lambda") => position == 1,
                            _ => false,
                        };
                    parse_node(child, literal)
                })
                .collect::<Result<Vec<_>>>()?;

            // `(if c t)` gets an empty block as its else branch.
            if !literal && items.len() == 3 && head.as_deref() == Some("if") {
                items.push(list![Value::from("block")]);
            }

            Ok(Value::list(items))
        }
    }
}

fn parse_token(token: Token) -> Result<Value> {
    match token {
        Token::Number(num) => Ok(Value::Number(num)),
        Token::Identifier(ident) => Ok(match ident.as_str() {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::String(ident),
        }),
        Token::Operator(op) => Ok(Value::String(op)),
        other => bail!(ParseError::UnexpectedToken(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{desugarer::desugar, model::TokenTree, tokeniser::tokenise, value::Number};

    fn parse_str(prog: &str) -> Vec<Value> {
        desugar(tokenise(prog).unwrap())
            .unwrap()
            .into_iter()
            .map(|node| parse(node).unwrap())
            .collect()
    }

    fn parse_one(prog: &str) -> Value {
        let mut forms = parse_str(prog);
        assert_eq!(forms.len(), 1);
        forms.remove(0)
    }

    /// Structural comparison, since lists compare by identity.
    fn same_shape(ours: &Value, theirs: &Value) -> bool {
        match (ours, theirs) {
            (Value::Cons(_), Value::Cons(_)) => {
                let ours = ours.to_vec().unwrap();
                let theirs = theirs.to_vec().unwrap();
                ours.len() == theirs.len()
                    && ours.iter().zip(&theirs).all(|(o, t)| same_shape(o, t))
            }
            _ => ours == theirs,
        }
    }

    #[test]
    fn parse_number() {
        assert_eq!(parse_one("42"), Value::from(42));
        assert_eq!(parse_one("4.5"), Value::from(4.5));
    }

    #[test]
    fn parse_variable_and_booleans() {
        assert_eq!(parse_one("x"), Value::from("x"));
        assert_eq!(parse_one("true"), Value::from(true));
        assert_eq!(parse_one("false"), Value::from(false));
    }

    #[test]
    fn parse_operator() {
        assert_eq!(parse_one("<="), Value::from("<="));
    }

    #[test]
    fn parse_empty_group() {
        assert_eq!(parse_one("()"), Value::Nil);
    }

    #[test]
    fn parse_lambda() {
        let expected = list![
            Value::from("lambda"),
            list![Value::from("x"), Value::from("yz")],
            list![Value::from("f"), Value::from("yz"), Value::from("x")]
        ];
        assert!(same_shape(&parse_one("(lambda (x yz) (f yz x))"), &expected));
    }

    #[test]
    fn parse_quoted_list() {
        let expected = list![
            Value::from("quote"),
            list![Value::from("x"), Value::from("yz"), Value::from(99)]
        ];
        assert!(same_shape(&parse_one("'(x yz 99)"), &expected));
    }

    #[test]
    fn parse_sequence() {
        let expected = list![
            Value::from("block"),
            list![Value::from("def"), Value::from("x"), Value::from(1)],
            Value::from("x")
        ];
        assert!(same_shape(&parse_one("((def x 1) ; x)"), &expected));
    }

    #[test]
    fn parse_if_without_else() {
        let expected = list![
            Value::from("if"),
            Value::from(true),
            Value::from(1),
            list![Value::from("block")]
        ];
        assert!(same_shape(&parse_one("(if true 1)"), &expected));
    }

    #[test]
    fn parse_quoted_if_untouched() {
        let expected = list![
            Value::from("quote"),
            list![Value::from("if"), Value::from("a"), Value::from("b")]
        ];
        assert!(same_shape(&parse_one("'(if a b)"), &expected));

        let nested = list![
            Value::from("quote"),
            list![
                Value::from("f"),
                list![Value::from("if"), Value::from(true), Value::from(1)]
            ]
        ];
        assert!(same_shape(&parse_one("(quote (f (if true 1)))"), &nested));
    }

    #[test]
    fn parse_lambda_params_untouched() {
        let expected = list![
            Value::from("lambda"),
            list![Value::from("if"), Value::from("x"), Value::from("y")],
            Value::from(1)
        ];
        assert!(same_shape(&parse_one("(lambda (if x y) 1)"), &expected));
    }

    #[test]
    fn parse_if_in_lambda_body() {
        let expected = list![
            Value::from("lambda"),
            list![Value::from("x")],
            list![
                Value::from("if"),
                Value::from("x"),
                Value::from(1),
                list![Value::from("block")]
            ]
        ];
        assert!(same_shape(&parse_one("(lambda (x) (if x 1))"), &expected));
    }

    #[test]
    fn parse_several_forms() {
        let forms = parse_str("(def x 1) x");
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[1], Value::from("x"));
    }

    #[test]
    fn dont_parse_structural_tokens() {
        let err = parse(TokenNode::Leaf(Token::Quote)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::UnexpectedToken(Token::Quote))
        );
        let nested = TokenNode::Tree(TokenTree::new(vec![
            TokenNode::Leaf(Token::Number(Number::Int(1))),
            TokenNode::Leaf(Token::Separator),
        ]));
        assert!(parse(nested).is_err());
    }
}
