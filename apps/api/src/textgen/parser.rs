//! Builds the template tree from tokens.
//!
//! The grammar is deliberately tiny:
//!
//! ```text
//! node      := TEXT | "{{" name "}}" | if_block
//! if_block  := "{%" "if" cond "%}" node* ( "{%" "else" "%}" node* )? "{%" "endif" "%}"
//! cond      := name | "not" name
//! name      := [A-Za-z_][A-Za-z0-9_]*   (must be a recognized placeholder)
//! ```

use crate::textgen::lexer::Token;
use crate::textgen::placeholders::is_placeholder;
use crate::textgen::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Variable(String),
    If {
        condition: Condition,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub name: String,
    pub negated: bool,
}

enum Statement {
    If(Condition),
    Else,
    EndIf,
}

/// What ended a node sequence.
enum Terminator {
    Eof,
    Else(usize),
    EndIf(usize),
}

pub fn parse(tokens: Vec<Token>) -> Result<Vec<Node>, TemplateError> {
    let mut iter = tokens.into_iter();
    let (nodes, terminator) = parse_sequence(&mut iter)?;
    match terminator {
        Terminator::Eof => Ok(nodes),
        Terminator::Else(offset) => Err(syntax("'else' ohne 'if'", offset)),
        Terminator::EndIf(offset) => Err(syntax("'endif' ohne 'if'", offset)),
    }
}

fn parse_sequence(
    tokens: &mut impl Iterator<Item = Token>,
) -> Result<(Vec<Node>, Terminator), TemplateError> {
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        match token {
            Token::Text(text) => nodes.push(Node::Text(text)),
            Token::Variable { expr, offset } => {
                nodes.push(Node::Variable(parse_name(expr.trim(), offset)?));
            }
            Token::Block { stmt, offset } => match parse_statement(&stmt, offset)? {
                Statement::If(condition) => nodes.push(parse_if(condition, offset, tokens)?),
                Statement::Else => return Ok((nodes, Terminator::Else(offset))),
                Statement::EndIf => return Ok((nodes, Terminator::EndIf(offset))),
            },
        }
    }

    Ok((nodes, Terminator::Eof))
}

fn parse_if(
    condition: Condition,
    offset: usize,
    tokens: &mut impl Iterator<Item = Token>,
) -> Result<Node, TemplateError> {
    let (then_branch, terminator) = parse_sequence(tokens)?;
    let else_branch = match terminator {
        Terminator::EndIf(_) => Vec::new(),
        Terminator::Else(else_offset) => {
            let (else_branch, terminator) = parse_sequence(tokens)?;
            match terminator {
                Terminator::EndIf(_) => else_branch,
                Terminator::Else(second) => {
                    return Err(syntax("mehrfaches 'else' in einem 'if'", second))
                }
                Terminator::Eof => return Err(syntax("'endif' fehlt", else_offset)),
            }
        }
        Terminator::Eof => return Err(syntax("'endif' fehlt", offset)),
    };

    Ok(Node::If {
        condition,
        then_branch,
        else_branch,
    })
}

fn parse_statement(stmt: &str, offset: usize) -> Result<Statement, TemplateError> {
    let words: Vec<&str> = stmt.split_whitespace().collect();
    match words.as_slice() {
        ["if", name] => Ok(Statement::If(Condition {
            name: parse_name(name, offset)?,
            negated: false,
        })),
        ["if", "not", name] => Ok(Statement::If(Condition {
            name: parse_name(name, offset)?,
            negated: true,
        })),
        ["if", ..] => Err(syntax("ungültige Bedingung", offset)),
        ["else"] => Ok(Statement::Else),
        ["endif"] => Ok(Statement::EndIf),
        [] => Err(syntax("leere Anweisung", offset)),
        [keyword, ..] => Err(syntax(
            &format!("unbekannte Anweisung '{keyword}'"),
            offset,
        )),
    }
}

fn parse_name(name: &str, offset: usize) -> Result<String, TemplateError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(syntax(&format!("ungültiger Ausdruck '{name}'"), offset));
    }
    if !is_placeholder(name) {
        return Err(TemplateError::UnknownPlaceholder(name.to_string()));
    }
    Ok(name.to_string())
}

fn syntax(message: &str, offset: usize) -> TemplateError {
    TemplateError::Syntax {
        message: message.to_string(),
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textgen::lexer::tokenize;

    fn parse_src(src: &str) -> Result<Vec<Node>, TemplateError> {
        parse(tokenize(src)?)
    }

    #[test]
    fn test_parse_variable() {
        let nodes = parse_src("{{ company }}").unwrap();
        assert_eq!(nodes, vec![Node::Variable("company".to_string())]);
    }

    #[test]
    fn test_parse_if_else() {
        let nodes = parse_src("{% if contact_person %}A{% else %}B{% endif %}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::If {
                condition: Condition {
                    name: "contact_person".to_string(),
                    negated: false
                },
                then_branch: vec![Node::Text("A".to_string())],
                else_branch: vec![Node::Text("B".to_string())],
            }]
        );
    }

    #[test]
    fn test_parse_nested_if_with_not() {
        let nodes =
            parse_src("{% if not company %}{% if job_title %}x{% endif %}{% endif %}").unwrap();
        match &nodes[0] {
            Node::If {
                condition,
                then_branch,
                ..
            } => {
                assert!(condition.negated);
                assert!(matches!(then_branch[0], Node::If { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = parse_src("{{ unknown_field }}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownPlaceholder("unknown_field".to_string())
        );
    }

    #[test]
    fn test_unknown_placeholder_in_condition() {
        let err = parse_src("{% if salary %}x{% endif %}").unwrap_err();
        assert_eq!(err, TemplateError::UnknownPlaceholder("salary".to_string()));
    }

    #[test]
    fn test_expressions_beyond_names_are_rejected() {
        for src in [
            "{{ company.__class__ }}",
            "{{ company | upper }}",
            "{{ range(10) }}",
            "{{ }}",
        ] {
            assert!(
                matches!(parse_src(src), Err(TemplateError::Syntax { .. })),
                "{src} should be a syntax error"
            );
        }
    }

    #[test]
    fn test_loops_are_not_statements() {
        let err = parse_src("{% for x in company %}{% endfor %}").unwrap_err();
        assert!(err.to_string().contains("for"));
    }

    #[test]
    fn test_missing_endif() {
        assert!(matches!(
            parse_src("{% if company %}x"),
            Err(TemplateError::Syntax { .. })
        ));
        assert!(matches!(
            parse_src("{% if company %}x{% else %}y"),
            Err(TemplateError::Syntax { .. })
        ));
    }

    #[test]
    fn test_stray_else_and_endif() {
        assert!(parse_src("x{% else %}").is_err());
        assert!(parse_src("x{% endif %}").is_err());
        assert!(parse_src("{% if company %}a{% else %}b{% else %}c{% endif %}").is_err());
    }
}
