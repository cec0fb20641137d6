use anyhow::{Result, bail};
use tracing::trace;

use crate::{
    error::ParseError,
    model::{Token, TokenNode, TokenTree},
};

fn ident(name: &str) -> TokenNode {
    TokenNode::Leaf(Token::Identifier(name.to_string()))
}

/// Resolve parenthesis nesting into token trees, then expand `;` sequencing
/// into `block` forms and `'x` into `(quote x)`.
///
/// Returns one node per top-level form. A separator at the top level turns the
/// whole input into a single `block` form.
pub fn desugar(tokens: Vec<Token>) -> Result<Vec<TokenNode>> {
    let mut root = nest(tokens)?;
    let wrap_root = root.has_separator();

    let mut queue: Vec<&mut TokenTree> = vec![&mut root];
    while let Some(tree) = queue.pop() {
        expand_separators(tree);
        expand_quotes(tree)?;
        for child in &mut tree.children {
            if let TokenNode::Tree(subtree) = child {
                queue.push(subtree);
            }
        }
    }

    trace!(?root, "desugared");

    if wrap_root {
        Ok(vec![TokenNode::Tree(root)])
    } else {
        Ok(root.children)
    }
}

/// Build the bracket structure. The returned tree holds the top-level items.
fn nest(tokens: Vec<Token>) -> Result<TokenTree> {
    let mut stack = vec![TokenTree::default()];

    for token in tokens {
        match token {
            Token::LeftParen => stack.push(TokenTree::default()),
            Token::RightParen => {
                if stack.len() < 2 {
                    bail!(ParseError::UnbalancedParens)
                }
                if let (Some(child), Some(parent)) = (stack.pop(), stack.last_mut()) {
                    parent.children.push(TokenNode::Tree(child));
                }
            }
            other => {
                if let Some(current) = stack.last_mut() {
                    current.children.push(TokenNode::Leaf(other));
                }
            }
        }
    }

    match (stack.pop(), stack.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => bail!(ParseError::UnbalancedParens),
    }
}

/// `(a ; b ; c)` becomes `(block a b c)`.
fn expand_separators(tree: &mut TokenTree) {
    if !tree.has_separator() {
        return;
    }

    let children = std::mem::take(&mut tree.children);
    tree.children = std::iter::once(ident("block"))
        .chain(
            children
                .into_iter()
                .filter(|child| !matches!(child, TokenNode::Leaf(Token::Separator))),
        )
        .collect();
}

/// `'x` becomes `(quote x)`, `''x` becomes `(quote (quote x))`.
fn expand_quotes(tree: &mut TokenTree) -> Result<()> {
    if !tree.has_quote() {
        return Ok(());
    }

    let mut depth = 0;
    let mut children = Vec::with_capacity(tree.children.len());
    for child in std::mem::take(&mut tree.children) {
        if matches!(child, TokenNode::Leaf(Token::Quote)) {
            depth += 1;
            continue;
        }

        let mut node = child;
        for _ in 0..depth {
            node = TokenNode::Tree(TokenTree::new(vec![ident("quote"), node]));
        }
        depth = 0;
        children.push(node);
    }

    if depth > 0 {
        bail!(ParseError::DanglingQuote)
    }

    tree.children = children;
    Ok(())
}
