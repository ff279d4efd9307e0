//! SQL keywords. Matching is case-insensitive.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    All,
    And,
    As,
    Asc,
    By,
    Create,
    Cross,
    Desc,
    Distinct,
    Drop,
    Except,
    Exists,
    False,
    From,
    Full,
    Global,
    Group,
    Having,
    If,
    In,
    Inner,
    Intersect,
    Is,
    Join,
    Left,
    Limit,
    Not,
    Null,
    On,
    Or,
    Order,
    Outer,
    Replace,
    Right,
    Select,
    Show,
    Table,
    Tables,
    Temp,
    Temporary,
    True,
    Union,
    Use,
    View,
    Where,
    With,
}

/// Looks up a keyword by name (case-insensitive).
pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    let keyword = match word.to_ascii_uppercase().as_str() {
        "ALL" => Keyword::All,
        "AND" => Keyword::And,
        "AS" => Keyword::As,
        "ASC" => Keyword::Asc,
        "BY" => Keyword::By,
        "CREATE" => Keyword::Create,
        "CROSS" => Keyword::Cross,
        "DESC" => Keyword::Desc,
        "DISTINCT" => Keyword::Distinct,
        "DROP" => Keyword::Drop,
        "EXCEPT" => Keyword::Except,
        "EXISTS" => Keyword::Exists,
        "FALSE" => Keyword::False,
        "FROM" => Keyword::From,
        "FULL" => Keyword::Full,
        "GLOBAL" => Keyword::Global,
        "GROUP" => Keyword::Group,
        "HAVING" => Keyword::Having,
        "IF" => Keyword::If,
        "IN" => Keyword::In,
        "INNER" => Keyword::Inner,
        "INTERSECT" => Keyword::Intersect,
        "IS" => Keyword::Is,
        "JOIN" => Keyword::Join,
        "LEFT" => Keyword::Left,
        "LIMIT" => Keyword::Limit,
        "NOT" => Keyword::Not,
        "NULL" => Keyword::Null,
        "ON" => Keyword::On,
        "OR" => Keyword::Or,
        "ORDER" => Keyword::Order,
        "OUTER" => Keyword::Outer,
        "REPLACE" => Keyword::Replace,
        "RIGHT" => Keyword::Right,
        "SELECT" => Keyword::Select,
        "SHOW" => Keyword::Show,
        "TABLE" => Keyword::Table,
        "TABLES" => Keyword::Tables,
        "TEMP" => Keyword::Temp,
        "TEMPORARY" => Keyword::Temporary,
        "TRUE" => Keyword::True,
        "UNION" => Keyword::Union,
        "USE" => Keyword::Use,
        "VIEW" => Keyword::View,
        "WHERE" => Keyword::Where,
        "WITH" => Keyword::With,
        _ => return None,
    };
    Some(keyword)
}

impl Keyword {
    /// Reserved keywords can never be used as unquoted identifiers or
    /// implicit aliases. The rest (`TEMP`, `VIEW`, `TABLES`, …) are only
    /// keywords where the grammar expects them.
    pub fn is_reserved(self) -> bool {
        !matches!(
            self,
            Keyword::By
                | Keyword::Global
                | Keyword::If
                | Keyword::Replace
                | Keyword::Show
                | Keyword::Table
                | Keyword::Tables
                | Keyword::Temp
                | Keyword::Temporary
                | Keyword::Use
                | Keyword::View
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::All => "ALL",
            Keyword::And => "AND",
            Keyword::As => "AS",
            Keyword::Asc => "ASC",
            Keyword::By => "BY",
            Keyword::Create => "CREATE",
            Keyword::Cross => "CROSS",
            Keyword::Desc => "DESC",
            Keyword::Distinct => "DISTINCT",
            Keyword::Drop => "DROP",
            Keyword::Except => "EXCEPT",
            Keyword::Exists => "EXISTS",
            Keyword::False => "FALSE",
            Keyword::From => "FROM",
            Keyword::Full => "FULL",
            Keyword::Global => "GLOBAL",
            Keyword::Group => "GROUP",
            Keyword::Having => "HAVING",
            Keyword::If => "IF",
            Keyword::In => "IN",
            Keyword::Inner => "INNER",
            Keyword::Intersect => "INTERSECT",
            Keyword::Is => "IS",
            Keyword::Join => "JOIN",
            Keyword::Left => "LEFT",
            Keyword::Limit => "LIMIT",
            Keyword::Not => "NOT",
            Keyword::Null => "NULL",
            Keyword::On => "ON",
            Keyword::Or => "OR",
            Keyword::Order => "ORDER",
            Keyword::Outer => "OUTER",
            Keyword::Replace => "REPLACE",
            Keyword::Right => "RIGHT",
            Keyword::Select => "SELECT",
            Keyword::Show => "SHOW",
            Keyword::Table => "TABLE",
            Keyword::Tables => "TABLES",
            Keyword::Temp => "TEMP",
            Keyword::Temporary => "TEMPORARY",
            Keyword::True => "TRUE",
            Keyword::Union => "UNION",
            Keyword::Use => "USE",
            Keyword::View => "VIEW",
            Keyword::Where => "WHERE",
            Keyword::With => "WITH",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup_keyword("select"), Some(Keyword::Select));
        assert_eq!(lookup_keyword("Temporary"), Some(Keyword::Temporary));
        assert_eq!(lookup_keyword("global_temp"), None);
    }

    #[test]
    fn ddl_words_are_not_reserved() {
        assert!(!Keyword::View.is_reserved());
        assert!(!Keyword::Tables.is_reserved());
        assert!(Keyword::From.is_reserved());
        assert!(Keyword::With.is_reserved());
    }

    #[test]
    fn display_round_trips_through_lookup() {
        for kw in [Keyword::Union, Keyword::Global, Keyword::Exists] {
            assert_eq!(lookup_keyword(&kw.to_string()), Some(kw));
        }
    }
}
