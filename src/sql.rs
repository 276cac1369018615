use sqlparser::ast::{
    self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value,
    ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::{day_from_date, Day, DATE_FORMAT};

/// Parsed command from SQL input.
///
/// Three pseudo-tables: `reservations` (the active ledger — INSERT to book,
/// UPDATE to move dates, DELETE to cancel, SELECT to list), `cancellations`
/// (read-only) and `availability` (read-only window probe).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    InsertReservation {
        start: Day,
        end: Day,
        reserved_by: String,
    },
    UpdateReservation {
        id: Ulid,
        start: Day,
        end: Day,
        reserved_by: String,
    },
    CancelReservation {
        id: Ulid,
    },
    SelectReservations {
        filter: ReservationFilter,
    },
    SelectCancelled,
    SelectAvailability {
        start: Day,
        end: Day,
    },
}

/// Optional narrowing of the `reservations` listing.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationFilter {
    All,
    ById(Ulid),
    ByGuest(String),
    ByPeriod { start: Day, end: Day },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }

    // Identifiers are never client-supplied: exactly the three payload
    // columns, positional — (start_date, end_date, reserved_by).
    let values = extract_insert_values(insert)?;
    if values.len() != 3 {
        return Err(SqlError::WrongArity("reservations", 3, values.len()));
    }
    Ok(Command::InsertReservation {
        start: parse_day(&values[0])?,
        end: parse_day(&values[1])?,
        reserved_by: parse_string(&values[2])?,
    })
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }

    let id = extract_where_id(selection)?;

    let (mut start, mut end, mut reserved_by) = (None, None, None);
    for assignment in assignments {
        let col = assignment_column(assignment)?;
        match col.as_str() {
            "start_date" => start = Some(parse_day(&assignment.value)?),
            "end_date" => end = Some(parse_day(&assignment.value)?),
            "reserved_by" => reserved_by = Some(parse_string(&assignment.value)?),
            other => return Err(SqlError::UnknownColumn(other.to_string())),
        }
    }

    Ok(Command::UpdateReservation {
        id,
        start: start.ok_or(SqlError::MissingAssignment("start_date"))?,
        end: end.ok_or(SqlError::MissingAssignment("end_date"))?,
        reserved_by: reserved_by.ok_or(SqlError::MissingAssignment("reserved_by"))?,
    })
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    if table != "reservations" {
        return Err(SqlError::UnknownTable(table));
    }
    let id = extract_where_id(&delete.selection)?;
    Ok(Command::CancelReservation { id })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    match table.as_str() {
        "reservations" => {
            let filter = match &select.selection {
                None => ReservationFilter::All,
                Some(selection) => extract_reservation_filter(selection)?,
            };
            Ok(Command::SelectReservations { filter })
        }
        "cancellations" => {
            if select.selection.is_some() {
                return Err(SqlError::Unsupported("filters on cancellations".into()));
            }
            Ok(Command::SelectCancelled)
        }
        "availability" => {
            let (mut start, mut end) = (None, None);
            if let Some(selection) = &select.selection {
                extract_window_filters(selection, &mut start, &mut end)?;
            }
            Ok(Command::SelectAvailability {
                start: start.ok_or(SqlError::MissingFilter("start_date"))?,
                end: end.ok_or(SqlError::MissingFilter("end_date"))?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn extract_reservation_filter(expr: &Expr) -> Result<ReservationFilter, SqlError> {
    let (mut id, mut guest, mut start, mut end) = (None, None, None, None);
    walk_filters(expr, &mut id, &mut guest, &mut start, &mut end)?;

    if let Some(id) = id {
        return Ok(ReservationFilter::ById(id));
    }
    if let Some(guest) = guest {
        return Ok(ReservationFilter::ByGuest(guest));
    }
    if let (Some(start), Some(end)) = (start, end) {
        return Ok(ReservationFilter::ByPeriod { start, end });
    }
    Err(SqlError::MissingFilter("id, reserved_by or period"))
}

#[allow(clippy::type_complexity)]
fn walk_filters(
    expr: &Expr,
    id: &mut Option<Ulid>,
    guest: &mut Option<String>,
    start: &mut Option<Day>,
    end: &mut Option<Day>,
) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                walk_filters(left, id, guest, start, end)?;
                walk_filters(right, id, guest, start, end)?;
            }
            ast::BinaryOperator::Eq => match expr_column_name(left).as_deref() {
                Some("id") => *id = Some(parse_ulid(right)?),
                Some("reserved_by") => *guest = Some(parse_string(right)?),
                _ => {}
            },
            ast::BinaryOperator::GtEq => {
                if expr_column_name(left).as_deref() == Some("start_date") {
                    *start = Some(parse_day(right)?);
                }
            }
            ast::BinaryOperator::LtEq => {
                if expr_column_name(left).as_deref() == Some("end_date") {
                    *end = Some(parse_day(right)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn extract_window_filters(
    expr: &Expr,
    start: &mut Option<Day>,
    end: &mut Option<Day>,
) -> Result<(), SqlError> {
    let (mut id, mut guest) = (None, None);
    walk_filters(expr, &mut id, &mut guest, start, end)?;
    if id.is_some() || guest.is_some() {
        return Err(SqlError::Unsupported("availability filters besides the window".into()));
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn assignment_column(assignment: &ast::Assignment) -> Result<String, SqlError> {
    match &assignment.target {
        ast::AssignmentTarget::ColumnName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))
        }
        _ => Err(SqlError::Parse("unsupported assignment target".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.len() != 1 {
                return Err(SqlError::Parse("expected exactly one VALUES row".into()));
            }
            Ok(values.rows[0].clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_ulid(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

/// Dates arrive as `'YYYY-MM-DD'` literals — any trailing time-of-day
/// component is truncated to the date — or as raw epoch-day integers.
fn parse_day(expr: &Expr) -> Result<Day, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => parse_day_str(s),
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad day number: {e}"))),
            _ => Err(SqlError::Parse(format!("expected date, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_day_str(s: &str) -> Result<Day, SqlError> {
    let date_part = s.get(..10).unwrap_or(s);
    time::Date::parse(date_part, DATE_FORMAT)
        .map(day_from_date)
        .map_err(|e| SqlError::Parse(format!("bad date '{s}': {e}")))
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => Ok(s.clone()),
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    MissingAssignment(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::MissingAssignment(col) => write!(f, "missing assignment: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}
