//! WebSocket hub for connected browsers.

use std::io::ErrorKind;
use std::net::{IpAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::ReloadMessage;
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval of the client reader.
const READ_INTERVAL: Duration = Duration::from_millis(100);

/// Broadcasts reload messages to every connected browser.
///
/// Cheap to clone; all clones share the client list.
#[derive(Clone, Default)]
pub struct ReloadHub {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    clients: Mutex<Vec<WebSocket<TcpStream>>>,
    /// Last unresolved error, replayed to clients that connect later.
    pending_error: Mutex<Option<ReloadMessage>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind at `base_port` (or the next free one) and accept clients in the background.
    ///
    /// Returns the port actually bound.
    pub fn start(&self, interface: IpAddr, base_port: u16) -> Result<u16> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;

        let hub = self.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => hub.add_client(stream),
                    Err(e) => log!("reload"; "accept error: {}", e),
                }
            }
        });

        let hub = self.clone();
        thread::spawn(move || hub.reader_loop());

        Ok(port)
    }

    /// Handshake and register one client.
    pub fn add_client(&self, stream: TcpStream) {
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                debug!("reload"; "handshake failed: {}", e);
                return;
            }
        };

        if let Err(e) = ws.send(text(&ReloadMessage::connected())) {
            debug!("reload"; "failed to send connected message: {}", e);
            return;
        }
        if let Some(error) = self.inner.pending_error.lock().as_ref()
            && let Err(e) = ws.send(text(error))
        {
            debug!("reload"; "failed to replay pending error: {}", e);
            return;
        }

        // non-blocking for the reader's polling
        let _ = ws.get_ref().set_nonblocking(true);

        let mut clients = self.inner.clients.lock();
        clients.push(ws);
        debug!("reload"; "client connected (total: {})", clients.len());
    }

    /// Broadcast to every client, dropping the ones that went away.
    pub fn send(&self, message: ReloadMessage) {
        match &message {
            ReloadMessage::Error { .. } => *self.inner.pending_error.lock() = Some(message.clone()),
            ReloadMessage::ClearError => *self.inner.pending_error.lock() = None,
            _ => {}
        }

        let mut clients = self.inner.clients.lock();
        if clients.is_empty() {
            return;
        }
        let frame = text(&message);
        clients.retain_mut(|ws| match ws.send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        debug!("reload"; "{} to {} clients", message.to_json(), clients.len());
    }

    #[cfg(test)]
    pub fn client_count(&self) -> usize {
        self.inner.clients.lock().len()
    }

    /// Drain incoming frames so closes are noticed between broadcasts.
    fn reader_loop(&self) {
        loop {
            thread::sleep(READ_INTERVAL);

            let mut clients = self.inner.clients.lock();
            clients.retain_mut(|ws| match ws.read() {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
                Err(_) => false,
            });
        }
    }
}

fn text(message: &ReloadMessage) -> Message {
    Message::Text(message.to_json().into())
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
