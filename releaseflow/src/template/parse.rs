//! Template scanning and parsing.
//!
//! `{{ … }}` actions are located with a regex, then each action body is lexed
//! and assembled into a small tree of text, pipelines and `if` blocks.

use super::funcs::Value;
use crate::errors::TemplateError;
use regex::Regex;
use std::sync::OnceLock;

/// One operand of a command.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// `.A.B` as path segments.
    Field(Vec<String>),
    /// A function name.
    Func(String),
    /// A literal.
    Literal(Value),
}

/// A function call or a single value; the first operand decides which.
pub(crate) type Command = Vec<Operand>;

/// Commands joined by `|`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If {
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Ident(String),
    Literal(Value),
    Pipe,
}

enum Segment<'t> {
    Text(String),
    Action { body: &'t str, offset: usize },
}

fn action_regex() -> Result<&'static Regex, TemplateError> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{(-\s)?(.*?)(\s-)?\}\}"))
        .as_ref()
        .map_err(|e| TemplateError::syntax(0, e.to_string()))
}

/// Parses a template into a node tree.
pub(crate) fn parse(template: &str) -> Result<Vec<Node>, TemplateError> {
    let segments = scan(template)?;

    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => {
                if !text.is_empty() {
                    current(&mut root, &mut stack).push(Node::Text(text));
                }
            }
            Segment::Action { body, offset } => {
                let tokens = lex(body, offset)?;
                let keyword = match tokens.first() {
                    Some(Token::Ident(kw)) if matches!(kw.as_str(), "if" | "else" | "end") => {
                        Some(kw.clone())
                    }
                    _ => None,
                };
                match keyword.as_deref() {
                    Some("if") => {
                        let cond = pipeline(tokens[1..].to_vec(), offset)?;
                        stack.push(Frame {
                            cond,
                            then: Vec::new(),
                            otherwise: Vec::new(),
                            in_else: false,
                        });
                    }
                    Some("else") => {
                        if tokens.len() != 1 {
                            return Err(TemplateError::syntax(offset, "unexpected tokens after else"));
                        }
                        match stack.last_mut() {
                            Some(frame) if !frame.in_else => frame.in_else = true,
                            _ => return Err(TemplateError::syntax(offset, "unexpected else")),
                        }
                    }
                    Some(_) => {
                        if tokens.len() != 1 {
                            return Err(TemplateError::syntax(offset, "unexpected tokens after end"));
                        }
                        let frame = stack
                            .pop()
                            .ok_or_else(|| TemplateError::syntax(offset, "unexpected end"))?;
                        let node = Node::If {
                            cond: frame.cond,
                            then: frame.then,
                            otherwise: frame.otherwise,
                        };
                        current(&mut root, &mut stack).push(node);
                    }
                    None if tokens.is_empty() => {
                        return Err(TemplateError::syntax(offset, "empty action"));
                    }
                    None => {
                        let node = Node::Action(pipeline(tokens, offset)?);
                        current(&mut root, &mut stack).push(node);
                    }
                }
            }
        }
    }

    if let Some(frame) = stack.last() {
        return Err(TemplateError::syntax(frame.cond.offset, "missing end for if"));
    }
    Ok(root)
}

struct Frame {
    cond: Pipeline,
    then: Vec<Node>,
    otherwise: Vec<Node>,
    in_else: bool,
}

fn current<'r>(root: &'r mut Vec<Node>, stack: &'r mut [Frame]) -> &'r mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) if frame.in_else => &mut frame.otherwise,
        Some(frame) => &mut frame.then,
        None => root,
    }
}

/// Splits the template into text and action bodies, applying `{{-` / `-}}` trimming.
fn scan(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let re = action_regex()?;
    let mut segments = Vec::new();
    let mut last = 0;
    let mut trim_next = false;

    for caps in re.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(body) = caps.get(2) else { continue };

        let mut text = check_text(template, last, whole.start())?;
        if trim_next {
            text = text.trim_start().to_string();
        }
        if caps.get(1).is_some() {
            text = text.trim_end().to_string();
        }
        segments.push(Segment::Text(text));
        segments.push(Segment::Action {
            body: body.as_str(),
            offset: whole.start(),
        });

        trim_next = caps.get(3).is_some();
        last = whole.end();
    }

    let mut tail = check_text(template, last, template.len())?;
    if trim_next {
        tail = tail.trim_start().to_string();
    }
    segments.push(Segment::Text(tail));
    Ok(segments)
}

fn check_text(template: &str, start: usize, end: usize) -> Result<String, TemplateError> {
    let text = &template[start..end];
    if let Some(pos) = text.find("{{") {
        return Err(TemplateError::syntax(start + pos, "unclosed action"));
    }
    Ok(text.to_string())
}

fn pipeline(tokens: Vec<Token>, offset: usize) -> Result<Pipeline, TemplateError> {
    let mut commands = Vec::new();
    let mut command: Command = Vec::new();

    for token in tokens {
        match token {
            Token::Pipe => {
                if command.is_empty() {
                    return Err(TemplateError::syntax(offset, "missing command in pipeline"));
                }
                commands.push(std::mem::take(&mut command));
            }
            Token::Field(path) => command.push(Operand::Field(path)),
            Token::Ident(name) => {
                if matches!(name.as_str(), "if" | "else" | "end") {
                    return Err(TemplateError::syntax(offset, format!("unexpected keyword '{name}'")));
                }
                command.push(Operand::Func(name));
            }
            Token::Literal(value) => command.push(Operand::Literal(value)),
        }
    }

    if command.is_empty() {
        return Err(TemplateError::syntax(offset, "missing command in pipeline"));
    }
    commands.push(command);
    Ok(Pipeline { commands, offset })
}

fn lex(body: &str, offset: usize) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        let at = offset + pos;
        if c.is_whitespace() {
            chars.next();
        } else if c == '|' {
            chars.next();
            tokens.push(Token::Pipe);
        } else if c == '"' {
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, '"')) => value.push('"'),
                        Some((_, '\\')) => value.push('\\'),
                        Some((_, other)) => {
                            return Err(TemplateError::syntax(at, format!("unknown escape '\\{other}'")));
                        }
                        None => break,
                    },
                    other => value.push(other),
                }
            }
            if !closed {
                return Err(TemplateError::syntax(at, "unterminated string"));
            }
            tokens.push(Token::Literal(Value::Str(value)));
        } else if c == '.' {
            let mut path = Vec::new();
            while let Some(&(_, '.')) = chars.peek() {
                chars.next();
                let segment = take_word(&mut chars);
                if segment.is_empty() {
                    return Err(TemplateError::syntax(at, "expected field name after '.'"));
                }
                path.push(segment);
            }
            tokens.push(Token::Field(path));
        } else if c.is_ascii_digit() || c == '-' {
            chars.next();
            let mut digits = String::from(c);
            digits.push_str(&take_word(&mut chars));
            let number = digits
                .parse::<i64>()
                .map_err(|_| TemplateError::syntax(at, format!("bad number '{digits}'")))?;
            tokens.push(Token::Literal(Value::Int(number)));
        } else if c.is_alphabetic() || c == '_' {
            let word = take_word(&mut chars);
            tokens.push(match word.as_str() {
                "true" => Token::Literal(Value::Bool(true)),
                "false" => Token::Literal(Value::Bool(false)),
                _ => Token::Ident(word),
            });
        } else {
            return Err(TemplateError::syntax(at, format!("unexpected character '{c}'")));
        }
    }

    Ok(tokens)
}

fn take_word(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut word = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    word
}
