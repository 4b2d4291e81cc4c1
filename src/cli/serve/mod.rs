//! Preview server with live reload.
//!
//! Serves the output directory over HTTP. While watching, a [`ReloadHub`]
//! runs beside it and HTML responses get the live reload client injected.

mod content;
mod lifecycle;
mod path;
mod response;

use crate::config::SiteConfig;
use crate::embed::serve::LIVERELOAD_PATH;
use crate::reload::ReloadHub;
use crate::{debug, log};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Request, Server};

/// Number of threads answering requests.
const REQUEST_THREADS: usize = 4;

/// Running preview server.
pub struct DevServer {
    pub addr: SocketAddr,
    /// Present when watching is enabled.
    pub hub: Option<ReloadHub>,
    handle: JoinHandle<()>,
}

impl DevServer {
    /// Block until the request loop ends.
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("preview server thread panicked"))
    }
}

/// Bind the HTTP server (and the reload hub when watching) and serve in the background.
pub fn start(config: Arc<SiteConfig>) -> Result<DevServer> {
    let serve = &config.serve;
    let (server, addr) = lifecycle::bind_with_retry(serve.interface, serve.port)?;

    let (hub, ws_port) = if serve.watch {
        let hub = ReloadHub::new();
        let port = hub.start(serve.interface, serve.ws_port)?;
        debug!("reload"; "ws://{}:{}", serve.interface, port);
        (Some(hub), Some(port))
    } else {
        (None, None)
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()
        .context("failed to create request thread pool")?;

    let handle = thread::spawn(move || run_request_loop(&server, &pool, &config, ws_port));

    Ok(DevServer { addr, hub, handle })
}

fn run_request_loop(server: &Server, pool: &rayon::ThreadPool, config: &Arc<SiteConfig>, ws_port: Option<u16>) {
    for request in server.incoming_requests() {
        let config = Arc::clone(config);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &config, ws_port) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, config: &SiteConfig, ws_port: Option<u16>) -> Result<()> {
    let url = path::normalize_url(request.url());

    if let Some(port) = ws_port
        && url == LIVERELOAD_PATH.trim_start_matches('/')
    {
        return response::respond_livereload_js(request, port);
    }

    let output = config.output_dir();
    match path::resolve_path(request.url(), output) {
        Some(file) => response::respond_file(request, &file, ws_port),
        None => response::respond_not_found(request, output, ws_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use crate::task::testing::write;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_output_with_livereload() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dist/index.html", "<html><body>hi</body></html>");
        write(dir.path(), "dist/css/a.css", "a{}");
        let toml = "[serve]\ninterface = \"127.0.0.1\"\nport = 0\nws_port = 0\n";
        let config = Arc::new(test_config_at(dir.path(), toml));

        let server = start(config).unwrap();
        assert!(server.hub.is_some());

        let index = get(server.addr, "/");
        assert!(index.starts_with("HTTP/1.1 200") || index.starts_with("HTTP/1.0 200"));
        assert!(index.contains(LIVERELOAD_PATH));

        let css = get(server.addr, "/css/a.css");
        assert!(css.contains("text/css"));
        assert!(css.ends_with("a{}"));

        let js = get(server.addr, LIVERELOAD_PATH);
        assert!(js.contains("WebSocket"));

        let missing = get(server.addr, "/nope.html");
        assert!(missing.contains(" 404 "));
    }
}
