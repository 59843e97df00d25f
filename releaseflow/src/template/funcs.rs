//! Template values and the built-in function table.
//!
//! String functions take their subject as the last argument so they compose
//! with pipes: `{{ .Tag | trimprefix "v" }}` is `trimprefix "v" .Tag`.

use crate::context::{ReleaseContext, Version};
use crate::errors::TemplateError;
use chrono::format::{Item, StrftimeItems};
use std::fmt::{self, Write as _};

/// A value flowing through a template pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    /// Template truth: empty string, `"false"`, `0` and `false` are false.
    pub(crate) fn truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty() && s != "false",
            Self::Int(i) => *i != 0,
            Self::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), TemplateError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(TemplateError::arity(name, expected.to_string(), args.len()))
    }
}

fn arity_at_least(name: &str, args: &[Value], min: usize) -> Result<(), TemplateError> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(TemplateError::arity(name, format!("at least {min}"), args.len()))
    }
}

fn str_arg(args: &[Value], idx: usize) -> String {
    args.get(idx).map(ToString::to_string).unwrap_or_default()
}

/// Returns true if `name` is a built-in function.
pub(crate) fn is_known(name: &str) -> bool {
    matches!(
        name,
        "tolower"
            | "toupper"
            | "title"
            | "trim"
            | "trimprefix"
            | "trimsuffix"
            | "replace"
            | "envOrDefault"
            | "isEnvSet"
            | "contains"
            | "eq"
            | "ne"
            | "not"
            | "and"
            | "or"
            | "incmajor"
            | "incminor"
            | "incpatch"
            | "date"
    )
}

/// Calls a built-in function.
pub(crate) fn call(ctx: &ReleaseContext, name: &str, args: &[Value]) -> Result<Value, TemplateError> {
    let value = match name {
        "tolower" => {
            arity(name, args, 1)?;
            Value::Str(str_arg(args, 0).to_lowercase())
        }
        "toupper" => {
            arity(name, args, 1)?;
            Value::Str(str_arg(args, 0).to_uppercase())
        }
        "title" => {
            arity(name, args, 1)?;
            Value::Str(title(&str_arg(args, 0)))
        }
        "trim" => {
            arity(name, args, 1)?;
            Value::Str(str_arg(args, 0).trim().to_string())
        }
        "trimprefix" => {
            arity(name, args, 2)?;
            let (prefix, s) = (str_arg(args, 0), str_arg(args, 1));
            Value::Str(s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string())
        }
        "trimsuffix" => {
            arity(name, args, 2)?;
            let (suffix, s) = (str_arg(args, 0), str_arg(args, 1));
            Value::Str(s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string())
        }
        "replace" => {
            arity(name, args, 3)?;
            let (old, new, s) = (str_arg(args, 0), str_arg(args, 1), str_arg(args, 2));
            Value::Str(s.replace(old.as_str(), new.as_str()))
        }
        "contains" => {
            arity(name, args, 2)?;
            Value::Bool(str_arg(args, 1).contains(str_arg(args, 0).as_str()))
        }
        "envOrDefault" => {
            arity(name, args, 2)?;
            let key = str_arg(args, 0);
            match ctx.env().get(&key) {
                Some(v) if !v.is_empty() => Value::Str(v.to_string()),
                _ => args[1].clone(),
            }
        }
        "isEnvSet" => {
            arity(name, args, 1)?;
            Value::Bool(ctx.env().is_set(&str_arg(args, 0)))
        }
        "eq" => {
            arity(name, args, 2)?;
            Value::Bool(args[0].to_string() == args[1].to_string())
        }
        "ne" => {
            arity(name, args, 2)?;
            Value::Bool(args[0].to_string() != args[1].to_string())
        }
        "not" => {
            arity(name, args, 1)?;
            Value::Bool(!args[0].truthy())
        }
        "and" => {
            arity_at_least(name, args, 2)?;
            Value::Bool(args.iter().all(Value::truthy))
        }
        "or" => {
            arity_at_least(name, args, 2)?;
            Value::Bool(args.iter().any(Value::truthy))
        }
        "incmajor" | "incminor" | "incpatch" => {
            arity(name, args, 1)?;
            Value::Str(increment(name, &str_arg(args, 0))?)
        }
        "date" => {
            arity(name, args, 1)?;
            Value::Str(format_date(ctx, &str_arg(args, 0))?)
        }
        other => return Err(TemplateError::UnknownFunction(other.to_string())),
    };
    Ok(value)
}

fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut start_of_word = true;
    for c in s.chars() {
        if start_of_word && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        start_of_word = c.is_whitespace() || c == '-' || c == '_';
    }
    out
}

fn increment(name: &str, raw: &str) -> Result<String, TemplateError> {
    let version =
        Version::parse(raw).map_err(|e| TemplateError::type_error(name, e.to_string()))?;
    let prefix = if raw.trim().starts_with('v') { "v" } else { "" };
    let next = match name {
        "incmajor" => version.inc_major(),
        "incminor" => version.inc_minor(),
        _ => version.inc_patch(),
    }
    .ok_or_else(|| TemplateError::type_error(name, format!("'{raw}' cannot be incremented")))?;
    Ok(format!("{prefix}{next}"))
}

fn format_date(ctx: &ReleaseContext, format: &str) -> Result<String, TemplateError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(TemplateError::type_error(
            "date",
            format!("invalid format '{format}'"),
        ));
    }

    let mut out = String::new();
    write!(out, "{}", ctx.date().format_with_items(items.into_iter()))
        .map_err(|_| TemplateError::type_error("date", format!("cannot format '{format}'")))?;
    Ok(out)
}
