//! SELECT query structures and their SPARQL rendering.

use std::fmt::{self, Write as _};

/// A node in a triple pattern or expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A query variable, stored without the leading `?`.
    Var(String),
    /// An expanded IRI.
    Iri(String),
    /// A literal, optionally typed or language-tagged.
    Literal {
        lexical: String,
        datatype: Option<String>,
        lang: Option<String>,
    },
}

impl Term {
    /// Creates a variable term.
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    /// Creates an IRI term.
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    /// Creates a typed literal.
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            lang: None,
        }
    }

    /// Creates a plain literal.
    pub fn plain(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            lang: None,
        }
    }

    /// Returns the variable name when this term is a variable.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Term::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Renders the term as SPARQL.
    pub fn to_sparql(&self) -> String {
        match self {
            Term::Var(name) => format!("?{name}"),
            Term::Iri(iri) => format!("<{iri}>"),
            Term::Literal {
                lexical,
                datatype,
                lang,
            } => {
                let quoted = format!("\"{}\"", escape_literal(lexical));
                match (datatype, lang) {
                    (_, Some(lang)) => format!("{quoted}@{lang}"),
                    (Some(dt), None) => format!("{quoted}^^<{dt}>"),
                    (None, None) => quoted,
                }
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql())
    }
}

/// Escapes a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// A predicate position: either a plain IRI or a property path.
#[derive(Debug, Clone, PartialEq)]
pub enum Path {
    /// A single predicate.
    Iri(String),
    /// Zero or more repetitions of a predicate (`p*`).
    ZeroOrMore(String),
    /// A sequence of paths (`a/b`).
    Sequence(Vec<Path>),
}

impl Path {
    /// Returns true when rendering requires property path support.
    pub fn is_property_path(&self) -> bool {
        !matches!(self, Path::Iri(_))
    }

    /// Renders the path as SPARQL.
    pub fn to_sparql(&self) -> String {
        match self {
            Path::Iri(iri) => format!("<{iri}>"),
            Path::ZeroOrMore(iri) => format!("<{iri}>*"),
            Path::Sequence(parts) => parts
                .iter()
                .map(Path::to_sparql)
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

/// A triple pattern in a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    pub subject: Term,
    pub path: Path,
    pub object: Term,
}

impl TriplePattern {
    /// Creates a pattern with a plain predicate.
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            path: Path::Iri(predicate.into()),
            object,
        }
    }

    /// Creates a pattern with a property path.
    pub fn with_path(subject: Term, path: Path, object: Term) -> Self {
        Self {
            subject,
            path,
            object,
        }
    }

    /// Renders the pattern, terminated by ` .`.
    pub fn to_sparql(&self) -> String {
        format!(
            "{} {} {} .",
            self.subject.to_sparql(),
            self.path.to_sparql(),
            self.object.to_sparql()
        )
    }
}

/// A FILTER expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Eq(Term, Term),
    Lt(Term, Term),
    Le(Term, Term),
    Gt(Term, Term),
    Ge(Term, Term),
    /// `REGEX(STR(term), pattern, "i")`; the pattern is already regex-escaped.
    Regex {
        term: Term,
        pattern: String,
        case_insensitive: bool,
    },
    /// `langMatches(lang(term), range)`
    LangMatches { term: Term, range: String },
    /// `lang(term) = tag`
    LangIs { term: Term, tag: String },
    Bound(Term),
    Not(Box<Expr>),
    Or(Vec<Expr>),
    And(Vec<Expr>),
}

impl Expr {
    /// Case-insensitive substring match on the text of `term`.
    pub fn contains_ignore_case(term: Term, text: &str) -> Self {
        Expr::Regex {
            term,
            pattern: regex::escape(text),
            case_insensitive: true,
        }
    }

    /// Renders the expression as SPARQL.
    pub fn to_sparql(&self) -> String {
        match self {
            Expr::Eq(a, b) => format!("{} = {}", a, b),
            Expr::Lt(a, b) => format!("{} < {}", a, b),
            Expr::Le(a, b) => format!("{} <= {}", a, b),
            Expr::Gt(a, b) => format!("{} > {}", a, b),
            Expr::Ge(a, b) => format!("{} >= {}", a, b),
            Expr::Regex {
                term,
                pattern,
                case_insensitive,
            } => {
                let flags = if *case_insensitive { ", \"i\"" } else { "" };
                format!(
                    "REGEX(STR({}), \"{}\"{})",
                    term,
                    escape_literal(pattern),
                    flags
                )
            }
            Expr::LangMatches { term, range } => {
                format!("langMatches(lang({}), \"{}\")", term, escape_literal(range))
            }
            Expr::LangIs { term, tag } => {
                format!("lang({}) = \"{}\"", term, escape_literal(tag))
            }
            Expr::Bound(term) => format!("BOUND({})", term),
            Expr::Not(inner) => format!("!({})", inner.to_sparql()),
            Expr::Or(items) => join_exprs(items, " || "),
            Expr::And(items) => join_exprs(items, " && "),
        }
    }
}

fn join_exprs(items: &[Expr], separator: &str) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|e| format!("({})", e.to_sparql()))
        .collect();
    parts.join(separator)
}

/// Allowed values for one variable (`VALUES ?var { ... }`).
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesBlock {
    pub var: String,
    pub values: Vec<Term>,
}

impl ValuesBlock {
    /// Creates a block for the given variable.
    pub fn new(var: impl Into<String>, values: Vec<Term>) -> Self {
        Self {
            var: var.into(),
            values,
        }
    }

    /// Renders the block as SPARQL.
    pub fn to_sparql(&self) -> String {
        let values: Vec<String> = self.values.iter().map(Term::to_sparql).collect();
        format!("VALUES ?{} {{ {} }}", self.var, values.join(" "))
    }
}

/// A group graph pattern: `{ triples FILTERs OPTIONALs VALUES }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPattern {
    pub triples: Vec<TriplePattern>,
    pub filters: Vec<Expr>,
    pub optionals: Vec<GroupPattern>,
    pub values: Vec<ValuesBlock>,
}

impl GroupPattern {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triple pattern.
    pub fn triple(mut self, pattern: TriplePattern) -> Self {
        self.triples.push(pattern);
        self
    }

    /// Adds a filter.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Adds a nested OPTIONAL group.
    pub fn optional(mut self, group: GroupPattern) -> Self {
        self.optionals.push(group);
        self
    }

    /// Adds a VALUES block.
    pub fn values(mut self, block: ValuesBlock) -> Self {
        self.values.push(block);
        self
    }

    /// Returns true when the group constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
            && self.filters.is_empty()
            && self.optionals.is_empty()
            && self.values.is_empty()
    }

    /// Returns true when any pattern, nested or not, uses a property path.
    pub fn uses_property_paths(&self) -> bool {
        self.triples.iter().any(|t| t.path.is_property_path())
            || self.optionals.iter().any(GroupPattern::uses_property_paths)
    }

    fn render(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        for block in &self.values {
            let _ = writeln!(out, "{indent}{}", block.to_sparql());
        }
        for triple in &self.triples {
            let _ = writeln!(out, "{indent}{}", triple.to_sparql());
        }
        for optional in &self.optionals {
            let _ = writeln!(out, "{indent}OPTIONAL {{");
            optional.render(out, depth + 1);
            let _ = writeln!(out, "{indent}}}");
        }
        for filter in &self.filters {
            let _ = writeln!(out, "{indent}FILTER({})", filter.to_sparql());
        }
    }
}

/// A sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderCondition {
    pub var: String,
    pub descending: bool,
}

impl OrderCondition {
    /// Ascending order on a variable.
    pub fn asc(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            descending: false,
        }
    }

    /// Descending order on a variable.
    pub fn desc(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            descending: true,
        }
    }
}

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub distinct: bool,
    /// Projected variable names; empty means `*`.
    pub projection: Vec<String>,
    pub pattern: GroupPattern,
    pub order_by: Vec<OrderCondition>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Creates a query projecting the given variables.
    pub fn new<I, S>(projection: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            projection: projection.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Replaces the WHERE group.
    pub fn with_pattern(mut self, pattern: GroupPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Appends a sort key.
    pub fn order_by(mut self, condition: OrderCondition) -> Self {
        self.order_by.push(condition);
        self
    }

    /// Sets LIMIT.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets OFFSET.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Renders the full query text.
    pub fn to_sparql(&self) -> String {
        let mut out = String::from("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        if self.projection.is_empty() {
            out.push('*');
        } else {
            let vars: Vec<String> = self.projection.iter().map(|v| format!("?{v}")).collect();
            out.push_str(&vars.join(" "));
        }
        out.push_str(" WHERE {\n");
        self.pattern.render(&mut out, 1);
        out.push('}');

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    if o.descending {
                        format!("DESC(?{})", o.var)
                    } else {
                        format!("ASC(?{})", o.var)
                    }
                })
                .collect();
            let _ = write!(out, "\nORDER BY {}", keys.join(" "));
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, "\nLIMIT {limit}");
        }
        if let Some(offset) = self.offset {
            let _ = write!(out, "\nOFFSET {offset}");
        }
        out
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql())
    }
}
