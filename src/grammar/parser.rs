//! Recursive-descent parser over lexer tokens
//!
//! Field markers are matched on tokens, never on raw substrings, so text such as
//! `Text("id=3")` inside a value cannot be mistaken for a row field.

use super::lexer::{Token, TokenKind};
use super::{DecodedRow, Record, TableInfo};
use crate::value::Value;

/// Decode a tokenized line into at most one record
pub(super) fn parse_tokens(line: &str, tokens: &[Token]) -> Option<Record> {
    let first = tokens.first()?;

    if let TokenKind::Ident(word) = &first.kind {
        if word == "Error" {
            return Some(Record::EngineError(error_message(line)));
        }
    }

    if let Some(record) = affected(tokens).or_else(|| table_line(tokens)) {
        return Some(record);
    }

    let start = row_start(line, tokens)?;
    let mut parser = Parser {
        line,
        tokens,
        pos: start,
    };
    parser.row()
}

fn error_message(line: &str) -> String {
    match line.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => line.trim().to_string(),
    }
}

/// `Updated 3 rows` / `Deleted 1 rows`
fn affected(tokens: &[Token]) -> Option<Record> {
    let kinds: Vec<&TokenKind> = tokens.iter().take(3).map(|t| &t.kind).collect();
    match kinds.as_slice() {
        [TokenKind::Ident(verb), TokenKind::Number(n), TokenKind::Ident(rows)]
            if (verb == "Updated" || verb == "Deleted") && rows == "rows" =>
        {
            n.parse().ok().map(|count| Record::Affected { count })
        }
        _ => None,
    }
}

/// `docs (3 rows, dim=4)`
fn table_line(tokens: &[Token]) -> Option<Record> {
    let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
    match kinds.as_slice() {
        [TokenKind::Ident(name), TokenKind::LParen, TokenKind::Number(rows), TokenKind::Ident(rows_kw), TokenKind::Comma, TokenKind::Ident(dim_kw), TokenKind::Eq, TokenKind::Number(dim), TokenKind::RParen]
            if rows_kw == "rows" && dim_kw == "dim" =>
        {
            Some(Record::Table(TableInfo {
                name: name.clone(),
                rows: rows.parse().ok()?,
                dimension: dim.parse().ok()?,
            }))
        }
        _ => None,
    }
}

/// Index of the first `id =` pair that starts a word
fn row_start(line: &str, tokens: &[Token]) -> Option<usize> {
    tokens.windows(2).position(|pair| {
        matches!(&pair[0].kind, TokenKind::Ident(word) if word == "id")
            && pair[1].kind == TokenKind::Eq
            && line[..pair[0].start]
                .chars()
                .next_back()
                .map_or(true, |c| c.is_whitespace() || c == ',')
    })
}

struct Parser<'a> {
    line: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<&'a TokenKind> {
        let kind = self.peek()?;
        self.pos += 1;
        Some(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<()> {
        if self.peek() == Some(kind) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn keyword(&mut self, word: &str) -> Option<()> {
        match self.peek() {
            Some(TokenKind::Ident(w)) if w == word => {
                self.pos += 1;
                Some(())
            }
            _ => None,
        }
    }

    fn field(&mut self, name: &str) -> Option<()> {
        self.keyword(name)?;
        self.eat(&TokenKind::Eq)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Byte offset of the current token, or end of line
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.line.len(), |t| t.start)
    }

    fn row(&mut self) -> Option<Record> {
        self.field("id")?;
        let id = self.uint()?;

        if self.eat(&TokenKind::Comma).is_none() {
            return Some(Record::RowEcho { id });
        }

        let distance = match self.peek() {
            Some(TokenKind::Ident(w)) if w == "distance" => {
                self.field("distance")?;
                let distance = self.float::<f32>()?;
                if self.at_end() {
                    return Some(Record::Row(DecodedRow {
                        id,
                        distance: Some(distance),
                        values: Vec::new(),
                    }));
                }
                let _ = self.eat(&TokenKind::Comma);
                Some(distance)
            }
            Some(TokenKind::Ident(w)) if w == "values" => None,
            // A row echo is `id=N` alone
            _ => return None,
        };

        let values = self.values_segment();
        Some(Record::Row(DecodedRow {
            id,
            distance,
            values,
        }))
    }

    /// `values=[...]` strictly, or the remainder collapsed into one Raw value
    fn values_segment(&mut self) -> Vec<Value> {
        let segment_start = self.offset();
        let checkpoint = self.pos;

        let strict = self
            .field("values")
            .and_then(|_| self.value_list())
            .filter(|_| self.at_end());
        if let Some(values) = strict {
            return values;
        }

        self.pos = checkpoint;
        let value_start = if self.field("values").is_some() {
            self.offset()
        } else {
            segment_start
        };
        let raw = self.line[value_start..].trim();
        tracing::warn!(line = self.line, "undecodable values segment kept as raw text");
        if raw.is_empty() {
            Vec::new()
        } else {
            vec![Value::Raw(raw.to_string())]
        }
    }

    fn value_list(&mut self) -> Option<Vec<Value>> {
        self.eat(&TokenKind::LBracket)?;
        let mut values = Vec::new();
        if self.eat(&TokenKind::RBracket).is_some() {
            return Some(values);
        }
        loop {
            values.push(self.value()?);
            match self.bump()? {
                TokenKind::Comma => continue,
                TokenKind::RBracket => return Some(values),
                _ => return None,
            }
        }
    }

    fn value(&mut self) -> Option<Value> {
        let start = self.pos;
        match self.peek()? {
            TokenKind::Str(s) => {
                self.pos += 1;
                Some(Value::Text(s.clone()))
            }
            TokenKind::Number(_) => self.bare_number(),
            TokenKind::Ident(tag) => {
                let tag = tag.as_str();
                self.pos += 1;
                if self.peek() != Some(&TokenKind::LParen) {
                    return match tag {
                        "true" => Some(Value::Boolean(true)),
                        "false" => Some(Value::Boolean(false)),
                        "Null" | "null" | "NULL" => Some(Value::Null),
                        _ => None,
                    };
                }
                self.pos += 1;
                let value = match tag {
                    "Vector" => Value::Vector(self.float_list()?),
                    "Text" => match self.bump()? {
                        TokenKind::Str(s) => Value::Text(s.clone()),
                        _ => return None,
                    },
                    "Integer" => Value::Integer(self.int()?),
                    "Float" => Value::Float(self.float::<f64>()?),
                    "Boolean" => match self.bump()? {
                        TokenKind::Ident(b) if b == "true" => Value::Boolean(true),
                        TokenKind::Ident(b) if b == "false" => Value::Boolean(false),
                        _ => return None,
                    },
                    _ => return self.opaque(start),
                };
                self.eat(&TokenKind::RParen)?;
                Some(value)
            }
            _ => None,
        }
    }

    /// Engine-native tagged value (e.g. `Blob([1, 2])`) kept verbatim
    fn opaque(&mut self, start: usize) -> Option<Value> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump()? {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                TokenKind::Broken => return None,
                _ => {}
            }
        }
        let from = self.tokens[start].start;
        let to = self.tokens[self.pos - 1].start + 1;
        Some(Value::Raw(self.line[from..to].to_string()))
    }

    fn float_list(&mut self) -> Option<Vec<f32>> {
        self.eat(&TokenKind::LBracket)?;
        let mut floats = Vec::new();
        if self.eat(&TokenKind::RBracket).is_some() {
            return Some(floats);
        }
        loop {
            floats.push(self.float::<f32>()?);
            match self.bump()? {
                TokenKind::Comma => continue,
                TokenKind::RBracket => return Some(floats),
                _ => return None,
            }
        }
    }

    fn bare_number(&mut self) -> Option<Value> {
        let TokenKind::Number(text) = self.bump()? else {
            return None;
        };
        if text.contains(['.', 'e', 'E']) {
            text.parse().ok().map(Value::Float)
        } else {
            text.parse::<i64>()
                .ok()
                .map(Value::Integer)
                .or_else(|| text.parse().ok().map(Value::Float))
        }
    }

    fn uint(&mut self) -> Option<u64> {
        match self.bump()? {
            TokenKind::Number(text) => text.parse().ok(),
            _ => None,
        }
    }

    fn int(&mut self) -> Option<i64> {
        match self.bump()? {
            TokenKind::Number(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Decimal literal, or the `NaN` / `inf` / `-inf` spellings
    fn float<F: std::str::FromStr>(&mut self) -> Option<F> {
        match self.bump()? {
            TokenKind::Number(text) => text.parse().ok(),
            TokenKind::Ident(word) if word == "NaN" || word == "inf" => word.parse().ok(),
            TokenKind::Other('-') => match self.bump()? {
                TokenKind::Ident(word) if word == "inf" => "-inf".parse().ok(),
                _ => None,
            },
            _ => None,
        }
    }
}
