//! Test doubles shared by the unit tests of this crate.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::DuplexStream;

use crate::connection::Connector;
use crate::error::TelnetError;

#[derive(Default)]
struct State {
    servers: Mutex<Vec<DuplexStream>>,
    connects: AtomicUsize,
    unreachable: AtomicBool,
}

/// Connector handing out in-memory duplex pipes. The far ends are kept so
/// tests can play the hub.
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    state: Arc<State>,
}

impl FakeConnector {
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Far end of the oldest connection still held.
    pub fn take_server(&self) -> Option<DuplexStream> {
        let mut servers = self.state.servers.lock().unwrap();
        (!servers.is_empty()).then(|| servers.remove(0))
    }

    /// Drop the far end of every connection opened so far.
    pub fn hang_up(&self) {
        self.state.servers.lock().unwrap().clear();
    }
}

impl Connector for FakeConnector {
    type Conn = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream, TelnetError> {
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let (client, server) = tokio::io::duplex(4096);
        self.state.servers.lock().unwrap().push(server);
        Ok(client)
    }
}
