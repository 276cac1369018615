use std::fmt::Debug;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::RsvdAuthSource;
use crate::engine::{Engine, EngineError};
use crate::model::{format_day, Reservation, ReservationDraft, Stay};
use crate::observability;
use crate::sql::{self, Command, ReservationFilter};
use crate::tenant::TenantManager;

pub struct RsvdHandler {
    tenant_manager: Arc<TenantManager>,
    query_parser: Arc<RsvdQueryParser>,
}

impl RsvdHandler {
    pub fn new(tenant_manager: Arc<TenantManager>) -> Self {
        Self {
            tenant_manager,
            query_parser: Arc::new(RsvdQueryParser),
        }
    }

    fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.tenant_manager.get_or_create(&db).map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("tenant error: {e}"),
            )))
        })
    }

    /// Execute one parsed command with RED metrics around it.
    async fn run_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        let label = observability::command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(engine, cmd).await;
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        result
    }

    async fn execute_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        match cmd {
            Command::InsertReservation {
                start,
                end,
                reserved_by,
            } => {
                let draft = ReservationDraft {
                    stay: Stay::new(start, end),
                    reserved_by,
                };
                let created = engine.create_reservation(draft).await.map_err(engine_err)?;
                Ok(vec![reservation_rows(vec![created])?])
            }
            Command::UpdateReservation {
                id,
                start,
                end,
                reserved_by,
            } => {
                let draft = ReservationDraft {
                    stay: Stay::new(start, end),
                    reserved_by,
                };
                let updated = engine
                    .modify_reservation(id, draft)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![reservation_rows(vec![updated])?])
            }
            Command::CancelReservation { id } => {
                engine.cancel_reservation(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::SelectReservations { filter } => {
                let reservations = match filter {
                    ReservationFilter::All => engine.list_active().await,
                    ReservationFilter::ById(id) => {
                        engine.get_reservation(&id).await.into_iter().collect()
                    }
                    ReservationFilter::ByGuest(guest) => engine.list_by_guest(&guest).await,
                    ReservationFilter::ByPeriod { start, end } => engine
                        .list_by_period(&Stay::new(start, end))
                        .await
                        .map_err(engine_err)?,
                };
                Ok(vec![reservation_rows(reservations)?])
            }
            Command::SelectCancelled => {
                let reservations = engine.list_cancelled().await;
                Ok(vec![reservation_rows(reservations)?])
            }
            Command::SelectAvailability { start, end } => {
                let window = Stay::new(start, end);
                let available = engine
                    .check_availability(&window)
                    .await
                    .map_err(engine_err)?;

                let schema = Arc::new(availability_schema());
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&format_day(window.start))?;
                encoder.encode_field(&format_day(window.end))?;
                encoder.encode_field(&available)?;
                let rows: Vec<PgWireResult<_>> = vec![Ok(encoder.take_row())];

                Ok(vec![Response::Query(QueryResponse::new(
                    schema,
                    stream::iter(rows),
                ))])
            }
        }
    }
}

fn reservation_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("id".into(), None, None, Type::VARCHAR, FieldFormat::Text),
        FieldInfo::new(
            "start_date".into(),
            None,
            None,
            Type::DATE,
            FieldFormat::Text,
        ),
        FieldInfo::new("end_date".into(), None, None, Type::DATE, FieldFormat::Text),
        FieldInfo::new(
            "reserved_by".into(),
            None,
            None,
            Type::VARCHAR,
            FieldFormat::Text,
        ),
        FieldInfo::new("canceled".into(), None, None, Type::BOOL, FieldFormat::Text),
        FieldInfo::new(
            "created_at".into(),
            None,
            None,
            Type::INT8,
            FieldFormat::Text,
        ),
        FieldInfo::new(
            "modified_at".into(),
            None,
            None,
            Type::INT8,
            FieldFormat::Text,
        ),
    ]
}

fn availability_schema() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new(
            "start_date".into(),
            None,
            None,
            Type::DATE,
            FieldFormat::Text,
        ),
        FieldInfo::new("end_date".into(), None, None, Type::DATE, FieldFormat::Text),
        FieldInfo::new(
            "available".into(),
            None,
            None,
            Type::BOOL,
            FieldFormat::Text,
        ),
    ]
}

fn reservation_rows(reservations: Vec<Reservation>) -> PgWireResult<Response> {
    let schema = Arc::new(reservation_schema());
    let rows: Vec<PgWireResult<_>> = reservations
        .into_iter()
        .map(|r| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encoder.encode_field(&r.id.to_string())?;
            encoder.encode_field(&format_day(r.stay.start))?;
            encoder.encode_field(&format_day(r.stay.end))?;
            encoder.encode_field(&r.reserved_by)?;
            encoder.encode_field(&r.canceled)?;
            encoder.encode_field(&r.created_at)?;
            encoder.encode_field(&r.modified_at)?;
            Ok(encoder.take_row())
        })
        .collect();

    Ok(Response::Query(QueryResponse::new(
        schema,
        stream::iter(rows),
    )))
}

#[async_trait]
impl SimpleQueryHandler for RsvdHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.run_command(&engine, cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct RsvdQueryParser;

#[async_trait]
impl QueryParser for RsvdQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(statement_schema(stmt))
    }
}

/// Commands against the reservation tables answer with reservation rows —
/// including INSERT and UPDATE, which return the persisted record.
fn statement_schema(stmt: &str) -> Vec<FieldInfo> {
    let upper = stmt.to_uppercase();
    if upper.contains("AVAILABILITY") {
        availability_schema()
    } else if upper.contains("DELETE") {
        vec![]
    } else if upper.contains("RESERVATIONS") || upper.contains("CANCELLATIONS") {
        reservation_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl ExtendedQueryHandler for RsvdHandler {
    type Statement = String;
    type QueryParser = RsvdQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.run_command(&engine, cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            statement_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(statement_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start {
                if let Ok(n) = sql[start..i].parse::<usize>() {
                    if n > max {
                        max = n;
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct RsvdFactory {
    handler: Arc<RsvdHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<RsvdAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl RsvdFactory {
    pub fn new(tenant_manager: Arc<TenantManager>, password: String) -> Self {
        let auth_source = RsvdAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(RsvdHandler::new(tenant_manager)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for RsvdFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Drive one client connection to completion.
pub async fn process_connection(
    socket: TcpStream,
    tenant_manager: Arc<TenantManager>,
    password: String,
    tls_acceptor: Option<TlsAcceptor>,
) -> Result<(), io::Error> {
    let factory = RsvdFactory::new(tenant_manager, password);
    pgwire::tokio::process_socket(socket, tls_acceptor, factory).await
}

fn engine_err(e: EngineError) -> PgWireError {
    let code = match &e {
        EngineError::NotFound(_) => "P0002",
        EngineError::Conflict => "23P01",
        EngineError::Validation(_) => "23514",
        EngineError::GuestMismatch => "P0001",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "58030",
    };
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        e.to_string(),
    )))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
