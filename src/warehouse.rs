//! Tabular warehouse sink and its DuckDB implementation.
//!
//! Each warehouse project maps to one DuckDB database file under the
//! warehouse root (`<root>/<project>.duckdb`). A destination of the form
//! `dataset.table` maps to a schema and a table inside that file.

use duckdb::{types::Value as DuckValue, types::ValueRef, Connection as DuckDbConnection};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config;
use crate::dates::format_date;
use crate::error::{EtlError, Result};
use crate::models::{AggregatedRow, ReportKind};

// ---------------------------------------------------------------------------
// WriteMode / Destination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the table if missing, then add rows.
    Append,
    /// Drop any existing table and write the rows fresh.
    Replace,
    /// Refuse to write if the table already exists.
    FailIfExists,
}

/// Fully-qualified destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl Destination {
    /// Parse `"dataset.table"` or `"table"` (dataset defaults to `main`).
    pub fn parse(project: &str, spec: &str) -> Result<Self> {
        let (dataset, table) = match spec.split_once('.') {
            Some((d, t)) => (d, t),
            None => (config::DEFAULT_DATASET, spec),
        };
        for (what, ident) in [("project", project), ("dataset", dataset), ("table", table)] {
            validate_identifier(what, ident)?;
        }
        Ok(Self {
            project: project.to_string(),
            dataset: dataset.to_string(),
            table: table.to_string(),
        })
    }

    /// `"dataset"."table"` for use in SQL.
    pub fn qualified_name(&self) -> String {
        format!("\"{}\".\"{}\"", self.dataset, self.table)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.project, self.dataset, self.table)
    }
}

fn validate_identifier(what: &str, ident: &str) -> Result<()> {
    let ok = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(EtlError::InvalidArgument(format!(
            "invalid {} identifier '{}'",
            what, ident
        )))
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    BigInt,
    Double,
    Date,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "VARCHAR",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Date => "DATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Rows ready to hand to a [`WarehouseSink`]; values are positional by column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(EtlError::InvalidArgument(format!(
                "row has {} values for {} columns",
                bad.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Destination schema for a report kind.
    ///
    /// URL: `Address, URL_Clicks, URL_Impressions, URL_Average_Position,
    /// URL_CTR, Start_Date_Data, End_Date_Data`. Keyword tables add
    /// `Main_Keyword` after `Address` and use the `KW_` prefix.
    pub fn schema(kind: ReportKind) -> Vec<Column> {
        let p = kind.column_prefix();
        let mut cols = vec![Column::new("Address", ColumnType::Text)];
        if kind == ReportKind::Keyword {
            cols.push(Column::new("Main_Keyword", ColumnType::Text));
        }
        cols.extend([
            Column::new(format!("{}_Clicks", p), ColumnType::BigInt),
            Column::new(format!("{}_Impressions", p), ColumnType::BigInt),
            Column::new(format!("{}_Average_Position", p), ColumnType::Double),
            Column::new(format!("{}_CTR", p), ColumnType::Double),
            Column::new("Start_Date_Data", ColumnType::Date),
            Column::new("End_Date_Data", ColumnType::Date),
        ]);
        cols
    }

    /// Build the destination table for aggregated rows of `kind`.
    pub fn from_aggregated(kind: ReportKind, rows: &[AggregatedRow]) -> Result<Self> {
        let arity = kind.dimensions().len();
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            if row.keys.len() != arity {
                return Err(EtlError::Aggregation(format!(
                    "{} row has {} key(s), expected {}: {:?}",
                    kind,
                    row.keys.len(),
                    arity,
                    row.keys
                )));
            }
            let mut values: Vec<Value> = row.keys.iter().map(|k| json!(k)).collect();
            values.extend([
                json!(row.total_clicks),
                json!(row.total_impressions),
                json!(row.average_position),
                row.ctr.map(|c| json!(c)).unwrap_or(Value::Null),
                json!(format_date(row.period_start)),
                json!(format_date(row.period_end)),
            ]);
            out.push(values);
        }
        Ok(Self {
            columns: Self::schema(kind),
            rows: out,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// WarehouseSink
// ---------------------------------------------------------------------------

/// Destination for aggregated tables. Returns the number of rows written.
pub trait WarehouseSink {
    fn write(&self, destination: &Destination, table: &Table, mode: WriteMode) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// DuckDbWarehouse
// ---------------------------------------------------------------------------

/// DuckDB-backed warehouse with one database per project.
///
/// Connections are opened lazily on first use and kept for the lifetime of
/// the warehouse.
pub struct DuckDbWarehouse {
    root: Option<PathBuf>,
    connections: RefCell<HashMap<String, DuckDbConnection>>,
}

impl DuckDbWarehouse {
    /// Open a file-backed warehouse rooted at `root`, creating the directory.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: Some(root.to_path_buf()),
            connections: RefCell::new(HashMap::new()),
        })
    }

    /// Open a warehouse whose projects live only in memory.
    pub fn open_in_memory() -> Self {
        Self {
            root: None,
            connections: RefCell::new(HashMap::new()),
        }
    }

    /// Path of the database file for `project`, if file-backed.
    pub fn database_path(&self, project: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|r| r.join(format!("{}.duckdb", project)))
    }

    fn with_connection<T>(
        &self,
        project: &str,
        f: impl FnOnce(&mut DuckDbConnection) -> Result<T>,
    ) -> Result<T> {
        let mut conns = self.connections.borrow_mut();
        if !conns.contains_key(project) {
            validate_identifier("project", project)?;
            let conn = match self.database_path(project) {
                Some(path) => {
                    debug!("Opening warehouse database {}", path.display());
                    DuckDbConnection::open(&path)?
                }
                None => DuckDbConnection::open_in_memory()?,
            };
            conns.insert(project.to_string(), conn);
        }
        match conns.get_mut(project) {
            Some(conn) => f(conn),
            None => Err(EtlError::Load(format!("no connection for project {}", project))),
        }
    }

    /// Whether the destination table exists.
    pub fn table_exists(&self, destination: &Destination) -> Result<bool> {
        self.with_connection(&destination.project, |conn| {
            table_exists(conn, destination).map_err(EtlError::from)
        })
    }

    /// Number of rows in the destination table (0 if it does not exist).
    pub fn row_count(&self, destination: &Destination) -> Result<usize> {
        if !self.table_exists(destination)? {
            return Ok(0);
        }
        let sql = format!("SELECT COUNT(*) AS n FROM {}", destination.qualified_name());
        let rows = self.query(&destination.project, &sql, &[])?;
        Ok(rows
            .first()
            .and_then(|r| r.get("n"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize)
    }

    /// Run SQL against a project database and return rows as JSON maps.
    pub fn query(
        &self,
        project: &str,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, Value>>> {
        self.with_connection(project, |conn| {
            let mut stmt = conn.prepare(sql)?;
            let param_values: Vec<&dyn duckdb::ToSql> =
                params.iter().map(|p| p as &dyn duckdb::ToSql).collect();
            let mut rows = stmt.query(param_values.as_slice())?;

            // Column metadata is only available once the statement has run.
            let stmt_ref = rows
                .as_ref()
                .ok_or_else(|| EtlError::InvalidArgument("statement returned no result".into()))?;
            let column_names: Vec<String> = stmt_ref
                .column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect();

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut map = HashMap::new();
                for (i, name) in column_names.iter().enumerate() {
                    map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
                }
                out.push(map);
            }
            Ok(out)
        })
    }
}

impl WarehouseSink for DuckDbWarehouse {
    fn write(&self, destination: &Destination, table: &Table, mode: WriteMode) -> Result<usize> {
        for col in &table.columns {
            validate_identifier("column", &col.name).map_err(EtlError::load)?;
        }

        let written = self.with_connection(&destination.project, |conn| {
            write_table(conn, destination, table, mode).map_err(|e| match e {
                EtlError::Load(_) => e,
                other => EtlError::Load(format!("{}: {}", destination, other)),
            })
        })?;

        info!("Wrote {} rows to {} ({:?})", written, destination, mode);
        Ok(written)
    }
}

fn write_table(
    conn: &mut DuckDbConnection,
    destination: &Destination,
    table: &Table,
    mode: WriteMode,
) -> Result<usize> {
    let qualified = destination.qualified_name();
    let tx = conn.transaction()?;

    tx.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS \"{}\"",
        destination.dataset
    ))?;

    let exists = table_exists(&tx, destination)?;
    match mode {
        WriteMode::FailIfExists if exists => {
            return Err(EtlError::Load(format!("table {} already exists", destination)));
        }
        WriteMode::Replace if exists => {
            tx.execute_batch(&format!("DROP TABLE {}", qualified))?;
        }
        _ => {}
    }

    let col_defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\"{}\" {}", c.name, c.ty.sql()))
        .collect();
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified,
        col_defs.join(", ")
    ))?;

    let names: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect();
    let placeholders: Vec<&str> = table
        .columns
        .iter()
        .map(|c| match c.ty {
            ColumnType::Date => "CAST(? AS DATE)",
            _ => "?",
        })
        .collect();
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified,
        names.join(", "),
        placeholders.join(", ")
    );

    {
        let mut stmt = tx.prepare(&insert)?;
        for row in &table.rows {
            stmt.execute(duckdb::params_from_iter(row.iter().map(to_duck_value)))?;
        }
    }
    tx.commit()?;

    Ok(table.rows.len())
}

fn table_exists(conn: &DuckDbConnection, destination: &Destination) -> duckdb::Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = ? AND table_name = ?",
        [destination.dataset.as_str(), destination.table.as_str()],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

fn to_duck_value(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                DuckValue::BigInt(i)
            } else if let Some(u) = n.as_u64() {
                DuckValue::UBigInt(u)
            } else {
                n.as_f64().map(DuckValue::Double).unwrap_or(DuckValue::Null)
            }
        }
        Value::String(s) => DuckValue::Text(s.clone()),
        other => DuckValue::Text(other.to_string()),
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> Value {
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Number(n.into()),
        ValueRef::SmallInt(n) => Value::Number(n.into()),
        ValueRef::Int(n) => Value::Number(n.into()),
        ValueRef::BigInt(n) => Value::Number(n.into()),
        ValueRef::UBigInt(n) => Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            if let Ok(i) = i64::try_from(n) {
                Value::Number(i.into())
            } else {
                Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Date32(days) => chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days as i64)))
            .map(|d| Value::String(format_date(d)))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
