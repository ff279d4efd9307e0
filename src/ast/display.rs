//! SQL rendering of the AST.
//!
//! Rendering is used for unaliased projection names and for showing expanded
//! queries; it round-trips through the parser.

use super::*;
use std::fmt::{self, Display, Formatter, Write};

fn comma_separated<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.quoted {
            f.write_char('`')?;
            f.write_str(&self.value)?;
            f.write_char('`')
        } else {
            f.write_str(&self.value)
        }
    }
}

impl Display for ObjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ns) = &self.namespace {
            write!(f, "{ns}.")?;
        }
        write!(f, "{}", self.relation)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => f.write_str(n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
            Literal::Null => f.write_str("NULL"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column { qualifier, name } => match qualifier {
                Some(q) => write!(f, "{q}.{name}"),
                None => write!(f, "{name}"),
            },
            Expr::Literal(lit, _) => write!(f, "{lit}"),
            Expr::Unary { op, expr, .. } => match op {
                UnaryOperator::Not => write!(f, "NOT {expr}"),
                UnaryOperator::Minus => write!(f, "-{expr}"),
            },
            Expr::Binary { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::Function {
                name,
                distinct,
                args,
                star,
                ..
            } => {
                write!(f, "{name}(")?;
                if *star {
                    f.write_char('*')?;
                } else {
                    if *distinct {
                        f.write_str("DISTINCT ")?;
                    }
                    comma_separated(f, args)?;
                }
                f.write_char(')')
            }
            Expr::IsNull { expr, negated } => {
                write!(f, "{expr} IS {}NULL", if *negated { "NOT " } else { "" })
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{expr} {}IN (", if *negated { "NOT " } else { "" })?;
                comma_separated(f, list)?;
                f.write_char(')')
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => write!(
                f,
                "{expr} {}IN ({subquery})",
                if *negated { "NOT " } else { "" }
            ),
            Expr::Exists {
                subquery, negated, ..
            } => write!(
                f,
                "{}EXISTS ({subquery})",
                if *negated { "NOT " } else { "" }
            ),
            Expr::Subquery(query) => write!(f, "({query})"),
            Expr::Nested(inner) => write!(f, "({inner})"),
        }
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(with) = &self.with {
            f.write_str("WITH ")?;
            comma_separated(f, &with.ctes)?;
            f.write_char(' ')?;
        }
        write!(f, "{}", self.body)?;
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            comma_separated(f, &self.order_by)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        Ok(())
    }
}

impl Display for Cte {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            comma_separated(f, &self.columns)?;
            f.write_char(')')?;
        }
        write!(f, " AS ({})", self.query)
    }
}

impl Display for OrderByItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if !self.asc {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

impl Display for SetOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetOperator::Union => "UNION",
            SetOperator::Except => "EXCEPT",
            SetOperator::Intersect => "INTERSECT",
        })
    }
}

impl Display for SetExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SetExpr::Select(select) => write!(f, "{select}"),
            SetExpr::Query(query) => write!(f, "({query})"),
            SetExpr::SetOperation {
                op,
                all,
                left,
                right,
            } => write!(f, "{left} {op}{} {right}", if *all { " ALL" } else { "" }),
        }
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        comma_separated(f, &self.projection)?;
        if !self.from.is_empty() {
            f.write_str(" FROM ")?;
            comma_separated(f, &self.from)?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " WHERE {selection}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            comma_separated(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        Ok(())
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::Wildcard(_) => f.write_char('*'),
            SelectItem::QualifiedWildcard(q) => write!(f, "{q}.*"),
            SelectItem::Expr { expr, alias } => match alias {
                Some(alias) => write!(f, "{expr} AS {alias}"),
                None => write!(f, "{expr}"),
            },
        }
    }
}

impl Display for TableWithJoins {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relation)?;
        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => "JOIN",
                JoinKind::LeftOuter => "LEFT JOIN",
                JoinKind::RightOuter => "RIGHT JOIN",
                JoinKind::FullOuter => "FULL JOIN",
                JoinKind::Cross => "CROSS JOIN",
            };
            write!(f, " {keyword} {}", join.relation)?;
            if let Some(on) = &join.constraint {
                write!(f, " ON {on}")?;
            }
        }
        Ok(())
    }
}

impl Display for TableFactor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let alias = match self {
            TableFactor::Table { name, alias } => {
                write!(f, "{name}")?;
                alias
            }
            TableFactor::Derived { subquery, alias } => {
                write!(f, "({subquery})")?;
                alias
            }
        };
        if let Some(alias) = alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

impl Display for TableAlias {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.columns.is_empty() {
            f.write_char('(')?;
            comma_separated(f, &self.columns)?;
            f.write_char(')')?;
        }
        Ok(())
    }
}
