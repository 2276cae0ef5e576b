//! Schema Mock CLI
//!
//! Serve a stub API from an OpenAPI document and fixtures, list its routes,
//! or print a single generated response.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schema_mock::{
    app, load_fixtures, load_spec, ExpansionLevel, Fixtures, Spec, StubServer, DEFAULT_PORT,
    VERSION,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "schema-mock")]
#[command(about = "Stub HTTP server generated from an OpenAPI document")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the stub server
    Serve {
        /// Schema document: file path or URL (http:// or https://)
        #[arg(long)]
        spec: String,

        /// Fixtures document: file path or URL
        #[arg(long)]
        fixtures: String,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, short, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Emit logs as JSON lines
        #[arg(long)]
        log_json: bool,
    },

    /// Print every route in routing order, with its operationId
    Routes {
        /// Schema document: file path or URL
        #[arg(long)]
        spec: String,
    },

    /// Print the response generated for one operation
    Generate {
        /// Schema document: file path or URL
        #[arg(long)]
        spec: String,

        /// Fixtures document: file path or URL
        #[arg(long)]
        fixtures: String,

        /// HTTP method of the operation
        #[arg(long, short, default_value = "GET")]
        method: String,

        /// Concrete request path (e.g. /v1/charges/ch_123)
        #[arg(long)]
        path: String,

        /// Field to expand; repeatable, dotted for nesting
        #[arg(long)]
        expand: Vec<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            spec,
            fixtures,
            host,
            port,
            log_json,
        } => run_serve(&spec, &fixtures, &host, port, log_json),
        Commands::Routes { spec } => run_routes(&spec),
        Commands::Generate {
            spec,
            fixtures,
            method,
            path,
            expand,
            pretty,
        } => run_generate(&spec, &fixtures, &method, &path, &expand, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

fn load_server(spec_source: &str, fixtures_source: &str) -> Result<StubServer, u8> {
    let spec = read_spec(spec_source)?;
    let fixtures = read_fixtures(fixtures_source)?;
    StubServer::new(spec, fixtures).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn read_spec(source: &str) -> Result<Spec, u8> {
    load_spec(source).map_err(|e| {
        eprintln!("Error loading spec: {}", e);
        e.exit_code() as u8
    })
}

fn read_fixtures(source: &str) -> Result<Fixtures, u8> {
    load_fixtures(source).map_err(|e| {
        eprintln!("Error loading fixtures: {}", e);
        e.exit_code() as u8
    })
}

fn run_serve(
    spec_source: &str,
    fixtures_source: &str,
    host: &str,
    port: u16,
    log_json: bool,
) -> Result<(), u8> {
    init_logging(log_json);

    // Remote documents are fetched with a blocking client, before the runtime starts.
    let server = Arc::new(load_server(spec_source, fixtures_source)?);

    let addr: SocketAddr = format!("{}:{}", host, port).parse().map_err(|e| {
        eprintln!("Error: invalid listen address {}:{}: {}", host, port, e);
        2u8
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            eprintln!("Error starting runtime: {}", e);
            3u8
        })?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            eprintln!("Error binding {}: {}", addr, e);
            3u8
        })?;
        info!(%addr, version = VERSION, routes = server.routes().len(), "listening");

        axum::serve(listener, app(server))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                eprintln!("Error: server failed: {}", e);
                3u8
            })
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn run_routes(spec_source: &str) -> Result<(), u8> {
    let server = StubServer::new(read_spec(spec_source)?, Fixtures::new()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    for route in server.routes().routes() {
        match &route.operation.operation_id {
            Some(id) => println!("{} {}\t{}", route.method, route.path, id),
            None => println!("{} {}", route.method, route.path),
        }
    }
    Ok(())
}

fn run_generate(
    spec_source: &str,
    fixtures_source: &str,
    method: &str,
    path: &str,
    expand: &[String],
    pretty: bool,
) -> Result<(), u8> {
    let server = load_server(spec_source, fixtures_source)?;
    let method = method.to_uppercase();

    let matched = server.routes().route(&method, path).ok_or_else(|| {
        eprintln!("Error: no route for {} {}", method, path);
        1u8
    })?;
    let schema = matched.route.operation.response_schema().ok_or_else(|| {
        eprintln!("Error: {} {} has no response schema", method, matched.route.path);
        2u8
    })?;

    let expansions = ExpansionLevel::parse(expand);
    let level = (!expansions.is_empty()).then_some(&expansions);
    let data = server
        .generator()
        .generate_expanded(schema, path, level)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            2u8
        })?;

    let output = if pretty {
        serde_json::to_string_pretty(&data)
    } else {
        serde_json::to_string(&data)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    println!("{}", output);
    Ok(())
}
