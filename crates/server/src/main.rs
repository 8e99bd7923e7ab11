//! Entry point (SPEC_FULL §6 expansion). With no arguments, runs the
//! single-threaded stdin command loop (§5); with `--http [addr]`, serves
//! the JSON façade instead. Mirrors the teacher's `web::main`'s
//! connect-or-die startup discipline, but against `storage::Engine`
//! instead of a database pool.

mod command;
mod dispatch;
mod http;

use std::io::{self, BufRead, Write};

use storage::{Engine, EngineConfig};

use dispatch::Dispatcher;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::from_env();
    let engine = Engine::open(config).unwrap_or_else(|err| {
        tracing::error!(%err, "could not open data directory");
        std::process::exit(1);
    });

    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("--http") {
        let addr = args.next().unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let dispatcher = Dispatcher::open(&engine).unwrap_or_else(|err| {
            tracing::error!(%err, "could not open reservation services");
            std::process::exit(1);
        });
        tracing::info!(addr, "starting HTTP façade");
        if let Err(err) = http::start(http::WebState::new(dispatcher), &addr).await {
            tracing::error!(%err, "HTTP server terminated");
            std::process::exit(1);
        }
        return;
    }

    run_command_loop(&engine);
}

/// The synchronous, single-threaded command loop (§5): a request is read,
/// dispatched to completion, and replied to before the next is read.
fn run_command_loop(engine: &Engine) {
    let mut dispatcher = Dispatcher::open(engine).unwrap_or_else(|err| {
        tracing::error!(%err, "could not open reservation services");
        std::process::exit(1);
    });

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(%err, "stdin read failed");
                std::process::exit(1);
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let parsed = match command::parse(&line) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(%err, line, "malformed command");
                continue;
            }
        };
        let is_exit = matches!(parsed.verb, command::Verb::Exit);
        let timestamp = parsed.timestamp;
        let reply = dispatcher.execute(timestamp, parsed.verb);
        let _ = writeln!(stdout, "[{timestamp}] {reply}");
        if is_exit {
            break;
        }
    }
}
