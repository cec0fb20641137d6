use crate::value::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftParen,
    RightParen,
    Quote,
    Separator,
    Number(Number),
    Identifier(String),
    Operator(String),
}

/// One element of a token tree: either a plain token or a nested group.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenNode {
    Leaf(Token),
    Tree(TokenTree),
}

/// A balanced parenthesised group of tokens.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenTree {
    pub children: Vec<TokenNode>,
}

impl TokenTree {
    pub fn new(children: Vec<TokenNode>) -> Self {
        Self { children }
    }

    fn contains(&self, token: &Token) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, TokenNode::Leaf(leaf) if leaf == token))
    }

    pub fn has_separator(&self) -> bool {
        self.contains(&Token::Separator)
    }

    pub fn has_quote(&self) -> bool {
        self.contains(&Token::Quote)
    }
}
