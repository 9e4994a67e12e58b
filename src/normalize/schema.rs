//! Declarative field tables and the interpreter that applies them.
//!
//! A schema is a fixed list of output fields, each with a JSON path and a
//! coercion. Applying a schema always yields every listed field; whatever cannot
//! be found becomes [`Field::Null`].

use serde_json::Value;

use crate::core::models::{Field, Record};
use crate::core::wire;

/// How a leaf is coerced.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Kind {
    Number,
    Text,
    Bool,
    /// `{fmt}` text or an epoch rendered as `YYYY-MM-DD`.
    Date,
    /// Epoch rendered as `YYYY-MM-DD HH:MM:SS UTC+0000`.
    Time,
    /// A list of objects, each normalized with the inner schema.
    Rows(&'static [FieldSpec]),
    /// An object normalized with the inner schema.
    Nested(&'static [FieldSpec]),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) path: &'static [&'static str],
    pub(crate) kind: Kind,
}

/// Field read from the member of the same name.
pub(crate) const fn leaf(name: &'static str, kind: Kind) -> FieldSpec {
    FieldSpec {
        name,
        path: &[],
        kind,
    }
}

/// Field read from an explicit path.
pub(crate) const fn at(
    name: &'static str,
    path: &'static [&'static str],
    kind: Kind,
) -> FieldSpec {
    FieldSpec { name, path, kind }
}

/// A field computed from two already-normalized numeric fields.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Derived {
    /// `numerator / denominator`
    Ratio {
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
    },
    /// `(current - base) / base`
    Change {
        name: &'static str,
        current: &'static str,
        base: &'static str,
    },
}

fn resolve<'a>(node: &'a Value, spec: &FieldSpec) -> Option<&'a Value> {
    if spec.path.is_empty() {
        wire::lookup(node, &[spec.name])
    } else {
        wire::lookup(node, spec.path)
    }
}

fn coerce(v: &Value, kind: Kind) -> Field {
    match kind {
        Kind::Number => wire::number(v).into(),
        Kind::Text => wire::text(v).into(),
        Kind::Bool => wire::boolean(v).map_or(Field::Null, Field::Bool),
        Kind::Date => wire::date_text(v).into(),
        Kind::Time => wire::integer(v).and_then(wire::format_time).into(),
        Kind::Rows(inner) => match v {
            Value::Array(items) => Field::Rows(
                items
                    .iter()
                    .filter(|i| i.is_object())
                    .map(|i| apply(inner, i))
                    .collect(),
            ),
            _ => Field::Null,
        },
        Kind::Nested(inner) => match v {
            Value::Object(_) => Field::Nested(apply(inner, v)),
            _ => Field::Null,
        },
    }
}

/// Builds a record holding exactly the fields of `specs`.
pub(crate) fn apply(specs: &[FieldSpec], node: &Value) -> Record {
    let mut out = Record::new();
    for spec in specs {
        let field = resolve(node, spec).map_or(Field::Null, |v| coerce(v, spec.kind));
        out.insert(spec.name, field);
    }
    out
}

fn ratio(num: Option<f64>, den: Option<f64>) -> Field {
    match (num, den) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d).into(),
        _ => Field::Null,
    }
}

/// Adds derived fields; any missing input or a zero denominator yields null.
pub(crate) fn derive(record: &mut Record, derived: &[Derived]) {
    for d in derived {
        match *d {
            Derived::Ratio {
                name,
                numerator,
                denominator,
            } => {
                let v = ratio(record.number(numerator), record.number(denominator));
                record.insert(name, v);
            }
            Derived::Change {
                name,
                current,
                base,
            } => {
                let cur = record.number(current);
                let base = record.number(base);
                let v = ratio(cur.zip(base).map(|(c, b)| c - b), base);
                record.insert(name, v);
            }
        }
    }
}
