//! Parameterised data access over the SQLite pool.
//!
//! Values only ever reach SQL through bound parameters. Callers write
//! `:name` placeholders; they are rewritten to SQLite's positional `?N` form
//! before execution. Table and column names are the only caller text that is
//! interpolated, and they are validated as plain identifiers first.

use std::fmt::Write as _;

use serde_json::{Map, Number, Value};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteQueryResult, SqliteRow},
    Column, Pool, Row as _, Sqlite, TypeInfo, ValueRef,
};
use thiserror::Error;
use tracing::debug;

/// One result row, keyed by column name.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("no value bound for parameter `:{0}`")]
    MissingParameter(String),
    #[error("write to `{0}` has no columns")]
    EmptyWrite(String),
    #[error("database query failed")]
    Query(#[from] sqlx::Error),
}

impl DbError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Query(sqlx::Error::Database(error)) => error.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result shape selector for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// First matching row, or nothing.
    One,
    /// Every matching row, possibly none.
    All,
    /// First column of the first row, e.g. a `COUNT(*)`.
    Column,
    /// Execute only; report rows affected.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    One(Option<Record>),
    All(Vec<Record>),
    Column(Option<Value>),
    Done(u64),
}

impl Fetched {
    pub fn into_one(self) -> Option<Record> {
        match self {
            Fetched::One(record) => record,
            Fetched::All(records) => records.into_iter().next(),
            _ => None,
        }
    }

    pub fn into_all(self) -> Vec<Record> {
        match self {
            Fetched::All(records) => records,
            Fetched::One(record) => record.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_column(self) -> Option<Value> {
        match self {
            Fetched::Column(value) => value,
            _ => None,
        }
    }

    pub fn rows_affected(&self) -> u64 {
        match self {
            Fetched::Done(count) => *count,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Int(i64::from(value))
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Real(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<&String> for Param {
    fn from(value: &String) -> Self {
        Param::Text(value.clone())
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Param::Null)
    }
}

/// Named values for a statement, in insertion order. A leading `:` on the
/// name is accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Param)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Param>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Param>) {
        let name = name.trim_start_matches(':');
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        let name = name.trim_start_matches(':');
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Collects the positional bind list while rewriting named placeholders.
struct Binder<'a> {
    params: &'a Params,
    slots: Vec<(Option<&'a str>, &'a Param)>,
}

impl<'a> Binder<'a> {
    fn new(params: &'a Params) -> Self {
        Self {
            params,
            slots: Vec::new(),
        }
    }

    fn value(&mut self, value: &'a Param) -> usize {
        self.slots.push((None, value));
        self.slots.len()
    }

    fn named(&mut self, name: &str) -> Result<usize, DbError> {
        if let Some(index) = self.slots.iter().position(|(slot, _)| *slot == Some(name)) {
            return Ok(index + 1);
        }
        let params: &'a Params = self.params;
        let (key, value) = params
            .entries
            .iter()
            .find(|(key, _)| key == name)
            .ok_or_else(|| DbError::MissingParameter(name.to_string()))?;
        self.slots.push((Some(key.as_str()), value));
        Ok(self.slots.len())
    }

    fn rewrite(&mut self, sql: &str) -> Result<String, DbError> {
        let mut out = String::with_capacity(sql.len());
        let mut chars = sql.char_indices().peekable();
        let mut skip = Skip::default();

        while let Some((index, ch)) = chars.next() {
            let next = chars.peek().map(|&(_, next)| next);
            if skip.step(ch, next) || ch != ':' {
                out.push(ch);
                continue;
            }

            let start = index + 1;
            let mut end = start;
            while let Some(&(next_index, next)) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    end = next_index + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if end == start {
                out.push(':');
                continue;
            }
            let slot = self.named(&sql[start..end])?;
            let _ = write!(out, "?{slot}");
        }

        Ok(out)
    }

    fn binds(&self) -> Vec<&'a Param> {
        self.slots.iter().map(|(_, value)| *value).collect()
    }
}

/// Tracks SQL text where placeholders are not recognised: `'...'` string
/// literals, `"..."` quoted identifiers and `--` comments up to end of line.
#[derive(Debug, Default)]
struct Skip {
    until: Option<char>,
}

impl Skip {
    /// Feeds one character; true when it belongs to skipped text.
    fn step(&mut self, ch: char, next: Option<char>) -> bool {
        if let Some(close) = self.until {
            if ch == close {
                self.until = None;
            }
            return true;
        }
        match ch {
            '\'' | '"' => self.until = Some(ch),
            '-' if next == Some('-') => self.until = Some('\n'),
            _ => return false,
        }
        true
    }
}

fn identifier(raw: &str) -> Result<&str, DbError> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let valid = matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(trimmed)
    } else {
        Err(DbError::InvalidIdentifier(raw.to_string()))
    }
}

fn column_expr(expr: &str) -> Result<(), DbError> {
    let expr = expr.trim();
    if expr == "*" {
        return Ok(());
    }
    if let (Some(open), true) = (expr.find('('), expr.ends_with(')')) {
        let func = expr[..open].trim();
        let inner = expr[open + 1..expr.len() - 1].trim();
        let known = ["COUNT", "MAX", "MIN", "SUM", "AVG"]
            .iter()
            .any(|name| func.eq_ignore_ascii_case(name));
        if known && (inner == "*" || identifier(inner).is_ok()) {
            return Ok(());
        }
        return Err(DbError::InvalidIdentifier(expr.to_string()));
    }
    for part in expr.split('.') {
        identifier(part).map_err(|_| DbError::InvalidIdentifier(expr.to_string()))?;
    }
    Ok(())
}

fn column_list(raw: &str) -> Result<String, DbError> {
    let mut columns = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        let lower = item.to_ascii_lowercase();
        let (expr, alias) = match lower.find(" as ") {
            Some(pos) => (&item[..pos], Some(&item[pos + 4..])),
            None => (item, None),
        };
        column_expr(expr)?;
        if let Some(alias) = alias {
            identifier(alias)?;
        }
        columns.push(item);
    }
    if columns.iter().all(|column| column.is_empty()) {
        return Err(DbError::InvalidIdentifier(raw.to_string()));
    }
    Ok(columns.join(", "))
}

fn decode_row(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in row.columns() {
        let index = column.ordinal();
        record.insert(column.name().to_string(), decode_value(row, index)?);
    }
    Ok(record)
}

fn decode_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw.type_info().name().to_ascii_uppercase();

    Ok(match kind.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" | "NUMERIC" => Number::from_f64(row.try_get_unchecked::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => Value::String(hex::encode(row.try_get_unchecked::<Vec<u8>, _>(index)?)),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    })
}

/// Typed accessors for [`Record`] columns.
pub trait RecordExt {
    fn text(&self, column: &str) -> &str;
    fn int(&self, column: &str) -> Option<i64>;
}

impl RecordExt for Record {
    fn text(&self, column: &str) -> &str {
        self.get(column).and_then(Value::as_str).unwrap_or_default()
    }

    fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }
}

#[derive(Clone)]
pub struct Db {
    pool: Pool<Sqlite>,
}

impl Db {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// `SELECT {columns} FROM {table} {clause}`. The clause carries its own
    /// keywords (`WHERE ...`, `ORDER BY ...`) and may be empty.
    pub async fn read(
        &self,
        table: &str,
        columns: &str,
        clause: &str,
        params: &Params,
        shape: QueryType,
    ) -> Result<Fetched, DbError> {
        let table = identifier(table)?;
        let columns = column_list(columns)?;
        let mut binder = Binder::new(params);
        let clause = binder.rewrite(clause.trim())?;

        let mut sql = format!("SELECT {columns} FROM {table}");
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause);
        }
        self.run(&sql, &binder.binds(), shape).await
    }

    pub async fn read_one(
        &self,
        table: &str,
        columns: &str,
        clause: &str,
        params: &Params,
    ) -> Result<Option<Record>, DbError> {
        Ok(self
            .read(table, columns, clause, params, QueryType::One)
            .await?
            .into_one())
    }

    pub async fn read_all(
        &self,
        table: &str,
        columns: &str,
        clause: &str,
        params: &Params,
    ) -> Result<Vec<Record>, DbError> {
        Ok(self
            .read(table, columns, clause, params, QueryType::All)
            .await?
            .into_all())
    }

    pub async fn read_column(
        &self,
        table: &str,
        columns: &str,
        clause: &str,
        params: &Params,
    ) -> Result<Option<Value>, DbError> {
        Ok(self
            .read(table, columns, clause, params, QueryType::Column)
            .await?
            .into_column())
    }

    /// Inserts one row and returns its auto-increment id.
    pub async fn insert(&self, table: &str, values: &Params) -> Result<i64, DbError> {
        let table = identifier(table)?;
        if values.is_empty() {
            return Err(DbError::EmptyWrite(table.to_string()));
        }
        let mut binder = Binder::new(values);
        let mut columns = Vec::with_capacity(values.len());
        let mut slots = Vec::with_capacity(values.len());
        for (name, value) in values.iter() {
            columns.push(identifier(name)?);
            slots.push(format!("?{}", binder.value(value)));
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            slots.join(", ")
        );
        let result = self.execute(&sql, &binder.binds()).await?;
        Ok(result.last_insert_rowid())
    }

    /// `UPDATE {table} SET ... {clause}`; returns rows affected.
    pub async fn update(
        &self,
        table: &str,
        set: &Params,
        clause: &str,
        params: &Params,
    ) -> Result<u64, DbError> {
        let table = identifier(table)?;
        if set.is_empty() {
            return Err(DbError::EmptyWrite(table.to_string()));
        }

        let mut set_binder = Binder::new(set);
        let mut assignments = Vec::with_capacity(set.len());
        for (name, value) in set.iter() {
            let column = identifier(name)?;
            assignments.push(format!("{column} = ?{}", set_binder.value(value)));
        }
        let mut binds = set_binder.binds();

        let mut clause_binder = Binder::new(params);
        let clause = clause_binder.rewrite(clause.trim())?;
        let clause = shift_slots(&clause, binds.len());
        binds.extend(clause_binder.binds());

        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(self.execute(&sql, &binds).await?.rows_affected())
    }

    /// `DELETE FROM {table} {clause}`; returns rows affected.
    pub async fn delete(&self, table: &str, clause: &str, params: &Params) -> Result<u64, DbError> {
        let table = identifier(table)?;
        let mut binder = Binder::new(params);
        let clause = binder.rewrite(clause.trim())?;
        let mut sql = format!("DELETE FROM {table}");
        if !clause.is_empty() {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(self.execute(&sql, &binder.binds()).await?.rows_affected())
    }

    /// Runs caller-authored SQL with named parameters.
    pub async fn qry(&self, sql: &str, params: &Params, shape: QueryType) -> Result<Fetched, DbError> {
        let mut binder = Binder::new(params);
        let sql = binder.rewrite(sql)?;
        self.run(&sql, &binder.binds(), shape).await
    }

    async fn run(&self, sql: &str, binds: &[&Param], shape: QueryType) -> Result<Fetched, DbError> {
        debug!(%sql, binds = binds.len(), ?shape, "db query");
        let query = bind_all(sqlx::query(sql), binds);

        let fetched = match shape {
            QueryType::One => Fetched::One(
                query
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|row| decode_row(&row))
                    .transpose()?,
            ),
            QueryType::All => Fetched::All(
                query
                    .fetch_all(&self.pool)
                    .await?
                    .iter()
                    .map(decode_row)
                    .collect::<Result<_, _>>()?,
            ),
            QueryType::Column => {
                let row = query.fetch_optional(&self.pool).await?;
                let value = match row {
                    Some(row) if !row.columns().is_empty() => Some(decode_value(&row, 0)?),
                    _ => None,
                };
                Fetched::Column(value)
            }
            QueryType::None => Fetched::Done(query.execute(&self.pool).await?.rows_affected()),
        };
        Ok(fetched)
    }

    async fn execute(&self, sql: &str, binds: &[&Param]) -> Result<SqliteQueryResult, DbError> {
        debug!(%sql, binds = binds.len(), "db execute");
        let query = bind_all(sqlx::query(sql), binds);
        Ok(query.execute(&self.pool).await?)
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &[&Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in binds {
        query = match value {
            Param::Null => query.bind(Option::<i64>::None),
            Param::Int(v) => query.bind(*v),
            Param::Real(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Renumbers `?N` slots produced by a second binder so they follow `offset`
/// slots already taken. Literals are left alone.
fn shift_slots(sql: &str, offset: usize) -> String {
    if offset == 0 {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut skip = Skip::default();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        if skip.step(ch, next) || ch != '?' {
            out.push(ch);
            continue;
        }
        let mut digits = String::new();
        while let Some(next) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(next);
            chars.next();
        }
        match digits.parse::<usize>() {
            Ok(slot) => {
                let _ = write!(out, "?{}", slot + offset);
            }
            Err(_) => {
                out.push('?');
                out.push_str(&digits);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/db_tests.rs"]
mod tests;
