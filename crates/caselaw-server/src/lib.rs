//! Loopback-bound HTTP API over the decision store, search engine, and
//! reference graph (spec.md §6), grounded on
//! `mcp-agent-mail-server/src/lib.rs`'s routing/handler layout, adapted
//! from `asupersync`'s async `Http1Listener` to a plain
//! `std::net::TcpListener` accept loop — this surface has none of the mail
//! server's long-lived MCP/websocket state to justify the async stack.

#![forbid(unsafe_code)]

pub mod http;
pub mod routes;
pub mod state;

pub use state::AppState;

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

use http::{read_request, write_response};
use tracing::{debug, warn};

/// Bind to `addr` and serve requests until the process is terminated.
/// Spec.md §6: "bound to loopback only" — the caller is responsible for
/// passing a `127.0.0.1`/`::1` address; this function does not itself
/// restrict the bind address, matching how the CLI's `--bind` flag is the
/// single point of truth for it.
pub fn serve(addr: SocketAddr, state: Arc<AppState>) -> io::Result<()> {
    let listener = TcpListener::bind(addr)?;
    tracing::info!(%addr, "caselaw-server listening");
    for incoming in listener.incoming() {
        let mut stream = match incoming {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%err, "failed to accept connection");
                continue;
            }
        };
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let request = match read_request(&stream) {
                Ok(Some(request)) => request,
                Ok(None) => return,
                Err(err) => {
                    debug!(%err, "failed to read request");
                    return;
                }
            };
            let response = routes::dispatch(&state, &request);
            if let Err(err) = write_response(&mut stream, &response) {
                debug!(%err, "failed to write response");
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use caselaw_core::PathLayout;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    #[test]
    fn health_endpoint_reports_backend_and_graph_status() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathLayout::new(dir.path());
        caselaw_store::open_store(&paths.decisions_db()).unwrap();
        let state = Arc::new(AppState::open(&paths).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let server_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            let _ = serve(addr, server_state);
        });
        thread::sleep(Duration::from_millis(100));

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"GET /health HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let mut response = String::new();
        let _ = stream.read_to_string(&mut response);
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));

        drop(handle);
    }
}
