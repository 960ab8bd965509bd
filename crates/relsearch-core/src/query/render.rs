//! SQL rendering.

use super::expr::{Condition, Predicate};
use super::select::{JoinKind, Projection, SelectQuery, TableSource};
use crate::value::Value;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Check if `name` is a plain identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier for SQL text.
///
/// Plain identifiers are written as-is. Anything else is wrapped in double
/// quotes with embedded quotes doubled, so it can never end the identifier.
pub fn quote_ident(name: &str) -> Cow<'_, str> {
    if is_plain_identifier(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Rendered SQL with positional (`?`) bind parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sql {
    /// Statement text.
    pub text: String,
    /// Bind values, in placeholder order.
    pub bindings: Vec<Value>,
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

struct Renderer {
    out: String,
    bindings: Vec<Value>,
    inline: bool,
}

impl Renderer {
    fn new(inline: bool) -> Self {
        Self {
            out: String::new(),
            bindings: Vec::new(),
            inline,
        }
    }

    fn bind(&mut self, value: &Value) {
        if self.inline {
            self.out.push_str(&value.to_sql_literal());
        } else {
            self.out.push('?');
            self.bindings.push(value.clone());
        }
    }

    fn select(&mut self, query: &SelectQuery) {
        self.out.push_str("select ");
        if query.projection.is_empty() {
            self.out.push('*');
        } else {
            let columns: Vec<String> = query
                .projection
                .iter()
                .map(|p| match p {
                    Projection::All => "*".to_string(),
                    Projection::AllOf(table) => format!("{}.*", quote_ident(table)),
                })
                .collect();
            self.out.push_str(&columns.join(", "));
        }

        self.out.push_str(" from ");
        self.source(&query.from);

        for join in &query.joins {
            self.out.push_str(match join.kind {
                JoinKind::Inner => " inner join ",
                JoinKind::Left => " left join ",
            });
            self.source(&join.source);
            self.out.push_str(" on ");
            self.conditions(&join.on);
        }

        if !query.wheres.is_empty() {
            self.out.push_str(" where ");
            self.conditions(&query.wheres);
        }

        if !query.order_by.is_empty() {
            let terms: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.column, o.direction))
                .collect();
            self.out.push_str(" order by ");
            self.out.push_str(&terms.join(", "));
        }
    }

    fn source(&mut self, source: &TableSource) {
        self.out.push_str(&quote_ident(&source.table));
        if let Some(alias) = &source.alias {
            self.out.push_str(" as ");
            self.out.push_str(&quote_ident(alias));
        }
    }

    fn conditions(&mut self, conditions: &[Condition]) {
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                self.out.push(' ');
                self.out.push_str(condition.boolean.as_sql());
                self.out.push(' ');
            }
            self.predicate(&condition.predicate);
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Compare { column, op, value } => {
                self.out.push_str(&format!("{} {} ", column, op));
                self.bind(value);
            }
            Predicate::InSet {
                column,
                negated,
                values,
            } => {
                // An empty member list can never (or always) match.
                if values.is_empty() {
                    self.out.push_str(if *negated { "1 = 1" } else { "0 = 1" });
                    return;
                }
                self.out.push_str(&column.to_string());
                self.out.push_str(if *negated { " not in (" } else { " in (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.bind(value);
                }
                self.out.push(')');
            }
            Predicate::Columns { left, op, right } => {
                self.out.push_str(&format!("{} {} {}", left, op, right));
            }
            Predicate::Exists(sub) => {
                self.out.push_str("exists (");
                self.select(sub);
                self.out.push(')');
            }
        }
    }
}

impl SelectQuery {
    /// Render with `?` placeholders and collected bind values.
    pub fn to_sql(&self) -> Sql {
        let mut renderer = Renderer::new(false);
        renderer.select(self);
        Sql {
            text: renderer.out,
            bindings: renderer.bindings,
        }
    }

    /// Render with values inlined as literals. For logs and debugging only.
    pub fn to_inline_sql(&self) -> String {
        let mut renderer = Renderer::new(true);
        renderer.select(self);
        renderer.out
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql().text)
    }
}
