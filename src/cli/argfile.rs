//! `@file` argument expansion
//!
//! Raw arguments starting with `@` are replaced before option parsing:
//!
//! - `@name.json` is a project manifest whose keys map to driver options; its
//!   text is then also split like a response file
//! - any other `@file` is a response file split into whitespace-separated tokens
//!
//! Expansion is one level deep; an `@token` read from a file stays literal.

use std::fs;

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value;
use thiserror::Error;

/// Manifest keys holding a list of strings, and the option each item becomes.
const LIST_KEYS: &[(&str, &str)] = &[
    ("defines", "--def="),
    ("includePath", "--inc="),
    ("hSource", "--src-h="),
    ("cSource", "--src-c="),
    ("hppSource", "--src-hpp="),
    ("cppSource", "--src-cpp="),
    ("libraryPath", "--use-lib-path="),
    ("library", "--use-lib="),
];

/// Keys of the manifest's `resources` object.
const RESOURCE_KEYS: &[(&str, &str)] = &[
    ("defines", "--rc-def="),
    ("includePath", "--rc-inc="),
    ("rcSource", "--rc-src="),
];

/// Single-string keys: `(key, prefix)`, the value is appended to the prefix.
const STRING_KEYS: &[(&str, &str)] = &[
    ("project", "--project="),
    ("type", "--"),
    ("crt", "--crt-"),
    ("linkerDefinitionsFile", "--def-file="),
];

#[derive(Debug, Error, Diagnostic)]
pub enum ArgFileError {
    #[error("file not found - {path}")]
    #[diagnostic(code(xyo_cc::argfile::not_found))]
    NotFound { path: String },

    #[error("json file load - {path}")]
    #[diagnostic(code(xyo_cc::argfile::json_read))]
    JsonRead { path: String },

    #[error("json file load - {path}")]
    #[diagnostic(code(xyo_cc::argfile::json_load))]
    JsonLoad {
        path: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("invalid JSON")]
        span: SourceSpan,
        #[help]
        reason: String,
    },

    #[error("json no info - {path}")]
    #[diagnostic(code(xyo_cc::argfile::not_an_object), help("a project manifest must be a JSON object"))]
    NotAnObject { path: String },

    #[error("json syntax - {field} - {path}")]
    #[diagnostic(code(xyo_cc::argfile::syntax))]
    Syntax { field: String, path: String },
}

impl ArgFileError {
    fn json_load(path: &str, text: &str, err: &serde_json::Error) -> Self {
        let offset = byte_offset(text, err.line(), err.column());
        let len = usize::from(offset < text.len());
        ArgFileError::JsonLoad {
            path: path.to_string(),
            src: NamedSource::new(path, text.to_string()),
            span: (offset, len).into(),
            reason: err.to_string(),
        }
    }

    fn syntax(field: impl Into<String>, path: &str) -> Self {
        ArgFileError::Syntax {
            field: field.into(),
            path: path.to_string(),
        }
    }

    /// Whether the error carries a source snippet worth rendering.
    pub fn has_snippet(&self) -> bool {
        matches!(self, ArgFileError::JsonLoad { .. })
    }
}

/// Replace every `@file` argument by the arguments it contains.
pub fn expand_arguments<I>(args: I) -> Result<Vec<String>, ArgFileError>
where
    I: IntoIterator<Item = String>,
{
    let mut expanded = Vec::new();
    for arg in args {
        let Some(file) = arg.strip_prefix('@') else {
            expanded.push(arg);
            continue;
        };

        let before = expanded.len();
        if file.ends_with(".json") {
            let text = fs::read_to_string(file).map_err(|_| ArgFileError::JsonRead { path: file.to_string() })?;
            expanded.extend(manifest_arguments(file, &text)?);
            expanded.extend(tokenize(&text));
        } else {
            let text = fs::read_to_string(file).map_err(|_| ArgFileError::NotFound { path: file.to_string() })?;
            expanded.extend(tokenize(&text));
        }
        tracing::debug!(file, arguments = expanded.len() - before, "expanded argument file");
    }
    Ok(expanded)
}

/// Split response-file text into arguments.
///
/// Whitespace separates arguments, double quotes group text and are dropped,
/// and `\"` inside quotes is a literal quote.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Translate a JSON project manifest into driver options, in key order.
///
/// Unknown top-level keys are ignored.
pub fn manifest_arguments(path: &str, text: &str) -> Result<Vec<String>, ArgFileError> {
    let root: Value = serde_json::from_str(text).map_err(|err| ArgFileError::json_load(path, text, &err))?;
    let Value::Object(info) = root else {
        return Err(ArgFileError::NotAnObject { path: path.to_string() });
    };

    let mut args = Vec::new();
    for (key, item) in &info {
        if let Some((_, prefix)) = STRING_KEYS.iter().find(|(k, _)| k == key) {
            let value = item.as_str().ok_or_else(|| ArgFileError::syntax(key.as_str(), path))?;
            args.push(format!("{}{}", prefix, value));
        } else if let Some((_, prefix)) = LIST_KEYS.iter().find(|(k, _)| k == key) {
            push_items(&mut args, item, prefix, key, path)?;
        } else if key == "resources" {
            let resources = item.as_object().ok_or_else(|| ArgFileError::syntax("resources", path))?;
            for (rc_key, rc_item) in resources {
                let (_, prefix) = RESOURCE_KEYS
                    .iter()
                    .find(|(k, _)| k == rc_key)
                    .ok_or_else(|| ArgFileError::syntax("resources/items", path))?;
                push_items(&mut args, rc_item, prefix, &format!("resources - {}", rc_key), path)?;
            }
        }
    }
    Ok(args)
}

fn push_items(args: &mut Vec<String>, item: &Value, prefix: &str, field: &str, path: &str) -> Result<(), ArgFileError> {
    let list = item.as_array().ok_or_else(|| ArgFileError::syntax(field, path))?;
    for value in list {
        let value = value
            .as_str()
            .ok_or_else(|| ArgFileError::syntax(format!("{}/items", field), path))?;
        args.push(format!("{}{}", prefix, value));
    }
    Ok(())
}

/// Byte offset of a 1-based line/column pair, clamped to the text length.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}
