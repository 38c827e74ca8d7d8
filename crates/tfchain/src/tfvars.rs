//! `terraform.tfvars` rendering and parsing
//!
//! Every stack directory gets a variable file that we generate from scratch on each run. The
//! renderer writes one `key = value` line per variable in insertion order:
//!
//! ```hcl
//! resource_group_name = "rg-airline-1a2b"
//! max_size_gb = 1
//! min_capacity = 0.5
//! zone_redundant = false
//! azuread_admin_object_id = null
//! ```
//!
//! The same files are read back to recover values that must stay stable between runs (generated
//! passwords, detected client addresses). The reader takes any HCL body made of attributes whose
//! values are literals:
//!
//! ```text
//! file  = { attribute } ;            (comments and blank lines anywhere)
//! value = null | bool | number | string | tuple | object ;
//! ```
//!
//! Blocks, references, function calls and interpolating templates are parse errors.
use crate::value::Value;
use indexmap::IndexMap;
use std::path::Path;

/// Name of the variable file inside a stack directory
pub const FILE_NAME: &str = "terraform.tfvars";

/// Ordered variables of one stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    entries: IndexMap<String, Value>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable
    ///
    /// Returns the previous value if the key was already present. The position of an existing key
    /// does not change.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = VariableSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

impl serde::Serialize for VariableSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// Render variables into variable file syntax
pub fn render(variables: &VariableSet) -> String {
    let mut out = String::new();
    for (key, value) in variables.iter() {
        out.push_str(key);
        out.push_str(" = ");
        render_value(value, &mut out);
        out.push('\n');
    }
    out
}

fn render_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Decimal(d) if !d.is_finite() => render_string(&d.to_string(), out),
        Value::Decimal(d) if d.fract() == 0.0 => out.push_str(&format!("{d:.1}")),
        Value::Decimal(d) => out.push_str(&d.to_string()),
        Value::String(s) => render_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                render_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                if hcl::Identifier::new(key.as_str()).is_ok() {
                    out.push_str(key);
                } else {
                    render_string(key, out);
                }
                out.push_str(" = ");
                render_value(item, out);
            }
            out.push_str(" }");
        }
    }
}

fn render_string(s: &str, out: &mut String) {
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                // template introducers must not be interpolated by terraform
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Write a variable file, replacing whatever was there
pub fn write(path: &Path, variables: &VariableSet) -> std::io::Result<()> {
    tracing::debug!(path=%path.display(), count = variables.len(), "writing variable file");
    std::fs::write(path, render(variables))
}

/// Read a variable file
///
/// A missing file is not an error and yields `None`.
pub fn read(path: &Path) -> Result<Option<VariableSet>, ReadError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ReadError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };

    parse(&contents).map(Some).map_err(|source| ReadError::Parse {
        path: path.to_owned(),
        source,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("Unable to read variable file {}", path.display())]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse variable file {}", path.display())]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: ParseError,
    },
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Syntax(String),
    #[error("unexpected block `{0}`")]
    Block(String),
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
    #[error("`{key}` is not a literal value ({reason})")]
    InvalidValue { key: String, reason: String },
}

/// Parse variable file contents
pub fn parse(contents: &str) -> Result<VariableSet, ParseError> {
    use hcl_edit::structure::Structure;
    use hcl_edit::Span;

    let body = hcl_edit::parser::parse_body(contents).map_err(|e| ParseError {
        line: e.location().line(),
        kind: ParseErrorKind::Syntax(e.message().to_string()),
    })?;

    let mut set = VariableSet::new();
    for structure in body.into_iter() {
        let line = structure.span().map_or(0, |span| line_at(contents, span.start));
        let err = |kind| ParseError { line, kind };

        let attr = match structure {
            Structure::Attribute(attr) => attr,
            Structure::Block(block) => {
                return Err(err(ParseErrorKind::Block(block.ident.as_str().to_string())))
            }
        };

        let key = attr.key.as_str().to_string();
        if set.get(&key).is_some() {
            return Err(err(ParseErrorKind::DuplicateKey(key)));
        }

        let value = Value::try_from(hcl::Expression::from(attr.value)).map_err(|e| {
            err(ParseErrorKind::InvalidValue {
                key: key.clone(),
                reason: e.0,
            })
        })?;

        tracing::trace!(key=%key, ?value, "parsed variable");
        set.insert(key, value);
    }

    Ok(set)
}

/// One-based line of a byte offset
fn line_at(contents: &str, offset: usize) -> usize {
    contents.as_bytes()[..offset.min(contents.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> VariableSet {
        VariableSet::from_iter([
            ("resource_group_name", Value::Null),
            ("location", Value::from("eastus2")),
            ("max_size_gb", Value::Integer(1)),
            ("min_capacity", Value::Decimal(0.5)),
            ("zone_redundant", Value::Boolean(false)),
            ("tags", Value::from(vec!["a", "b"])),
        ])
    }

    #[test]
    fn render_sample() {
        insta::assert_snapshot!(render(&sample()), @r###"
        resource_group_name = null
        location = "eastus2"
        max_size_gb = 1
        min_capacity = 0.5
        zone_redundant = false
        tags = ["a", "b"]
        "###);
    }

    #[test]
    fn render_has_trailing_newline() {
        let rendered = render(&VariableSet::from_iter([("a", 1i64)]));
        assert_eq!(rendered, "a = 1\n");
    }

    #[test]
    fn render_is_deterministic() {
        assert_eq!(render(&sample()), render(&sample()));
    }

    #[test]
    fn rendered_output_is_valid_hcl() {
        let mut set = sample();
        set.insert("tricky", r#"quote " back \ dollar ${x} percent %{y} line
break"#);
        set.insert("whole", Value::Decimal(3.0));

        let body = hcl::parse(&render(&set)).expect("rendered variables must be valid hcl");
        let attr = body
            .attributes()
            .find(|attr| attr.key.as_str() == "tricky")
            .unwrap();
        assert!(matches!(attr.expr, hcl::Expression::String(_) | hcl::Expression::TemplateExpr(_)));
    }

    #[test]
    fn decimals_keep_a_fraction() {
        let rendered = render(&VariableSet::from_iter([("d", 2.0f64)]));
        assert_eq!(rendered, "d = 2.0\n");
    }

    #[test]
    fn escape_template_introducers() {
        let rendered = render(&VariableSet::from_iter([("p", "a${b}%{c}$d")]));
        assert_eq!(rendered, "p = \"a$${b}%%{c}$d\"\n");
    }

    #[test]
    fn round_trip_scalars() {
        let mut set = sample();
        set.insert("password", r#"Ab1!"\$${}%{x}"#);
        set.insert("negative", -42i64);
        set.insert("whole", 7.0f64);
        set.insert("empty", "");
        set.insert("unicode", "größe ✓");

        let parsed = parse(&render(&set)).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn parse_comments_and_blank_lines() {
        let parsed = parse(
            r#"
            # generated
            a = "x" # trailing
            // another comment
            b = [1, 2.5, "c",]
            "#,
        )
        .unwrap();

        assert_eq!(parsed.get("a"), Some(&Value::from("x")));
        assert_eq!(
            parsed.get("b"),
            Some(&Value::Array(vec![
                Value::Integer(1),
                Value::Decimal(2.5),
                Value::from("c")
            ]))
        );
    }

    #[test]
    fn parse_object_value() {
        let parsed = parse("tags = { env = \"dev\", \"cost center\" = 7 } # note\n").unwrap();
        let Some(Value::Object(map)) = parsed.get("tags") else {
            panic!("expected object");
        };
        assert_eq!(map["env"], Value::from("dev"));
        assert_eq!(map["cost center"], Value::Integer(7));
    }

    #[test]
    fn parse_accepts_any_literal_layout() {
        let parsed = parse(
            r#"
tags = [
  "a",
  "b",
]
name = "caf\u00e9"
a = 1 /* note */
offset = -3
"#,
        )
        .unwrap();

        assert_eq!(
            parsed,
            VariableSet::from_iter([
                ("tags", Value::from(vec!["a", "b"])),
                ("name", Value::from("café")),
                ("a", Value::Integer(1)),
                ("offset", Value::Integer(-3)),
            ])
        );
    }

    #[test]
    fn parse_errors_carry_line() {
        let err = parse("a = 1\nthis is not valid\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ParseErrorKind::Syntax(_)));

        let err = parse("# generated\na = 1\n\na = 2\n").unwrap_err();
        assert_eq!(
            err,
            ParseError {
                line: 4,
                kind: ParseErrorKind::DuplicateKey("a".into())
            }
        );

        let err = parse("a = \"open\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, ParseErrorKind::Syntax(_)));

        let err = parse("a = 1 2\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Syntax(_)));
    }

    #[test]
    fn parse_rejects_non_literals() {
        let err = parse("a = 1\nb = var.other\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, ParseErrorKind::InvalidValue { key, .. } if key == "b"));

        let err = parse("c = \"${upper(x)}\"\n").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidValue { key, .. } if key == "c"));

        let err = parse("locals {\n  a = 1\n}\n").unwrap_err();
        assert_eq!(
            err,
            ParseError {
                line: 1,
                kind: ParseErrorKind::Block("locals".into())
            }
        );
    }

    #[test]
    fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read(&dir.path().join(FILE_NAME)).unwrap().is_none());
    }

    #[test]
    fn write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);

        write(&path, &sample()).unwrap();
        write(&path, &VariableSet::from_iter([("only", true)])).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "only = true\n");
    }
}
