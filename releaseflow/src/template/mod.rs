//! Template resolution against the release context.
//!
//! A Go-template-like subset: `{{ .Field }}` references, literals, `|` pipes,
//! built-in functions and `{{ if }} … {{ else }} … {{ end }}` blocks.
//!
//! ```rust,ignore
//! let name = TemplateResolver::new(&ctx)
//!     .with_artifact(&artifact)
//!     .apply("{{ .ProjectName }}_{{ .Version }}_{{ .Os }}_{{ .Arch }}")?;
//! ```
//!
//! Resolution reads only the context: the environment snapshot, the build date
//! and the values appended so far. The same context and template always give
//! the same output.

mod funcs;
mod parse;

use crate::artifact::Artifact;
use crate::context::ReleaseContext;
use crate::errors::TemplateError;
use funcs::Value;
use parse::{Node, Operand, Pipeline};
use std::collections::BTreeMap;

/// Resolves templates against a [`ReleaseContext`], optionally bound to one artifact.
#[derive(Debug, Clone)]
pub struct TemplateResolver<'a> {
    ctx: &'a ReleaseContext,
    artifact: Option<&'a Artifact>,
    fields: BTreeMap<String, String>,
}

impl<'a> TemplateResolver<'a> {
    /// Creates a resolver for the context.
    #[must_use]
    pub fn new(ctx: &'a ReleaseContext) -> Self {
        Self {
            ctx,
            artifact: None,
            fields: BTreeMap::new(),
        }
    }

    /// Binds an artifact, enabling `.ArtifactName`, `.Os`, `.Arch` and friends.
    #[must_use]
    pub fn with_artifact(mut self, artifact: &'a Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Adds an extra field, taking precedence over context values.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Resolves a template.
    pub fn apply(&self, template: &str) -> Result<String, TemplateError> {
        let nodes = parse::parse(template)?;
        let mut out = String::with_capacity(template.len());
        self.render(&nodes, &mut out)?;
        Ok(out)
    }

    /// Resolves a template and reads the result as a boolean.
    ///
    /// Only `true` (after trimming, case-insensitive) is true; an empty template is false.
    pub fn apply_bool(&self, template: &str) -> Result<bool, TemplateError> {
        let resolved = self.apply(template)?;
        Ok(resolved.trim().eq_ignore_ascii_case("true"))
    }

    /// Resolves each template in order.
    pub fn apply_all<S: AsRef<str>>(&self, templates: &[S]) -> Result<Vec<String>, TemplateError> {
        templates.iter().map(|t| self.apply(t.as_ref())).collect()
    }

    fn render(&self, nodes: &[Node], out: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(pipeline) => out.push_str(&self.eval(pipeline)?.to_string()),
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    if self.eval(cond)?.truthy() {
                        self.render(then, out)?;
                    } else {
                        self.render(otherwise, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&self, pipeline: &Pipeline) -> Result<Value, TemplateError> {
        let mut piped: Option<Value> = None;

        for command in &pipeline.commands {
            let value = match command.split_first() {
                Some((Operand::Func(name), rest)) => {
                    if !funcs::is_known(name) {
                        return Err(TemplateError::UnknownFunction(name.clone()));
                    }
                    let mut args = rest
                        .iter()
                        .map(|op| self.operand(op))
                        .collect::<Result<Vec<_>, _>>()?;
                    args.extend(piped.take());
                    funcs::call(self.ctx, name, &args)?
                }
                Some((operand, [])) if piped.is_none() => self.operand(operand)?,
                Some(_) => {
                    return Err(TemplateError::syntax(
                        pipeline.offset,
                        "can't give argument to non-function",
                    ));
                }
                None => return Err(TemplateError::syntax(pipeline.offset, "empty command")),
            };
            piped = Some(value);
        }

        piped.ok_or_else(|| TemplateError::syntax(pipeline.offset, "empty pipeline"))
    }

    fn operand(&self, operand: &Operand) -> Result<Value, TemplateError> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Func(name) => {
                if !funcs::is_known(name) {
                    return Err(TemplateError::UnknownFunction(name.clone()));
                }
                funcs::call(self.ctx, name, &[])
            }
            Operand::Field(path) => self.field(path),
        }
    }

    fn field(&self, path: &[String]) -> Result<Value, TemplateError> {
        let unknown = || TemplateError::UnknownField(path.join("."));

        match path {
            [env, key] if env == "Env" => self
                .ctx
                .env()
                .get(key)
                .map(Value::from)
                .ok_or_else(unknown),
            [name] => self.simple_field(name)?.ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    fn simple_field(&self, name: &str) -> Result<Option<Value>, TemplateError> {
        if let Some(value) = self.fields.get(name) {
            return Ok(Some(Value::from(value.as_str())));
        }

        let ctx = self.ctx;
        let version = ctx.version();
        let value = match name {
            "ProjectName" => Value::from(ctx.project_name()),
            "Version" => Value::Str(version.to_string()),
            "RawVersion" => Value::Str(format!(
                "{}.{}.{}",
                version.major, version.minor, version.patch
            )),
            "Major" => version_component(name, version.major)?,
            "Minor" => version_component(name, version.minor)?,
            "Patch" => version_component(name, version.patch)?,
            "Prerelease" => Value::from(version.prerelease.as_str()),
            "Tag" => Value::from(ctx.tag()),
            "PreviousTag" => Value::from(ctx.previous_tag()),
            "Commit" | "FullCommit" => Value::from(ctx.commit()),
            "ShortCommit" => Value::from(ctx.short_commit()),
            "Date" => Value::Str(ctx.date().to_rfc3339()),
            "Timestamp" => Value::Int(ctx.date().timestamp()),
            "IsSnapshot" => Value::Bool(ctx.is_snapshot()),
            "RunID" => Value::Str(ctx.identity().run_id.to_string()),
            _ => {
                return Ok(self
                    .artifact_field(name)
                    .or_else(|| ctx.values().get(name).map(Value::Str)))
            }
        };
        Ok(Some(value))
    }

    fn artifact_field(&self, name: &str) -> Option<Value> {
        let artifact = self.artifact?;
        let value = match name {
            "ArtifactName" => Value::from(artifact.name.as_str()),
            "ArtifactPath" => Value::Str(artifact.path.display().to_string()),
            "ArtifactID" => Value::from(artifact.id.as_str()),
            "ArtifactKind" => Value::Str(artifact.kind.to_string()),
            "Os" => Value::from(artifact.platform.os.as_str()),
            "Arch" => Value::from(artifact.platform.arch.as_str()),
            "Arm" => Value::Str(artifact.platform.arm.clone().unwrap_or_default()),
            "Amd64" => Value::Str(artifact.platform.amd64.clone().unwrap_or_default()),
            _ => return None,
        };
        Some(value)
    }
}

fn version_component(field: &str, n: u64) -> Result<Value, TemplateError> {
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| TemplateError::type_error(field, format!("{n} does not fit an integer")))
}
