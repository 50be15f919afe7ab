//! Bounded pool of live connections to one hub.
//!
//! A semaphore bounds how many connections are handed out at once; idle
//! connections wait in a queue for reuse. A [`PooledConnection`] returns its
//! connection when dropped, so every exit path releases exactly once.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use homelink_domain::error::ValidationError;

use crate::connection::Connector;
use crate::error::TelnetError;

struct PoolInner<C: Connector> {
    connector: C,
    size: usize,
    acquire_timeout: Duration,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<C::Conn>>,
    releases: AtomicU64,
}

impl<C: Connector> PoolInner<C> {
    fn idle(&self) -> MutexGuard<'_, VecDeque<C::Conn>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    fn push_idle(&self, conn: C::Conn) {
        if self.is_closed() {
            return;
        }
        let mut idle = self.idle();
        if idle.len() < self.size {
            idle.push_back(conn);
        }
    }
}

/// Connection pool for one endpoint. Cloning shares the pool.
pub struct ConnectionPool<C: Connector> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connector> Clone for ConnectionPool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connector> ConnectionPool<C> {
    /// Create an empty pool handing out at most `size` connections.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPool`] (wrapped) when `size` is zero.
    pub fn new(connector: C, size: usize, acquire_timeout: Duration) -> Result<Self, TelnetError> {
        if size == 0 {
            return Err(TelnetError::Domain(ValidationError::EmptyPool.into()));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                connector,
                size,
                acquire_timeout,
                permits: Arc::new(Semaphore::new(size)),
                idle: Mutex::new(VecDeque::with_capacity(size)),
                releases: AtomicU64::new(0),
            }),
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    #[must_use]
    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// Number of idle connections ready for reuse.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    /// How many handed-out connections have come back, broken ones included.
    #[must_use]
    pub fn release_count(&self) -> u64 {
        self.inner.releases.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Open connections up to the pool size.
    ///
    /// Connections already handed out count against the size, so a pool
    /// filled while in use never holds more than `size` live connections.
    /// Failures are logged, not returned: the pool opens connections on
    /// demand later. Returns how many connections were opened.
    pub async fn init(&self) -> usize {
        let mut opened = 0;
        // The permit counts the connection being opened as in use.
        while let Ok(permit) = Arc::clone(&self.inner.permits).try_acquire_owned() {
            let in_use = self.inner.size - self.inner.permits.available_permits();
            if self.idle_count() + in_use > self.inner.size {
                break;
            }
            match self.inner.connector.connect().await {
                Ok(conn) => {
                    self.inner.push_idle(conn);
                    opened += 1;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "could not pre-open pooled connection");
                    break;
                }
            }
            drop(permit);
        }
        opened
    }

    /// Take a connection, opening a new one when none is idle.
    ///
    /// # Errors
    ///
    /// Returns [`TelnetError::PoolExhausted`] when every connection stays in
    /// use for the whole acquire timeout, [`TelnetError::PoolClosed`] after
    /// [`close`](Self::close), or the connector's error when opening fails.
    pub async fn acquire(&self) -> Result<PooledConnection<C>, TelnetError> {
        let permit = match timeout(
            self.inner.acquire_timeout,
            Arc::clone(&self.inner.permits).acquire_owned(),
        )
        .await
        {
            Err(_) => return Err(TelnetError::PoolExhausted(self.inner.acquire_timeout)),
            Ok(Err(_)) => return Err(TelnetError::PoolClosed),
            Ok(Ok(permit)) => permit,
        };
        let reused = self.inner.idle().pop_front();
        let conn = match reused {
            Some(conn) => conn,
            None => self.inner.connector.connect().await?,
        };
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Write `probe` to every idle connection, replacing those that fail.
    pub async fn probe_idle(&self, probe: &str) {
        let idle: Vec<_> = self.inner.idle().drain(..).collect();
        for mut conn in idle {
            match write_probe(&mut conn, probe).await {
                Ok(()) => self.inner.push_idle(conn),
                Err(err) => {
                    tracing::warn!(error = %err, "liveness probe failed, replacing connection");
                    drop(conn);
                    match self.inner.connector.connect().await {
                        Ok(fresh) => self.inner.push_idle(fresh),
                        Err(err) => tracing::warn!(error = %err, "could not replace connection"),
                    }
                }
            }
        }
    }

    /// Probe idle connections every `every` until `cancel` fires.
    pub fn start_probing(
        &self,
        every: Duration,
        probe: String,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(every) => pool.probe_idle(&probe).await,
                }
            }
        })
    }

    /// Refuse further acquisitions and drop idle connections.
    ///
    /// Connections still handed out are dropped when they come back.
    pub fn close(&self) {
        self.inner.permits.close();
        self.inner.idle().clear();
    }
}

async fn write_probe<S: AsyncWrite + Unpin>(conn: &mut S, probe: &str) -> io::Result<()> {
    conn.write_all(probe.as_bytes()).await?;
    conn.flush().await
}

/// A connection on loan from a [`ConnectionPool`].
///
/// Reads and writes go straight to the underlying connection. Dropping the
/// guard returns the connection to the pool.
pub struct PooledConnection<C: Connector> {
    conn: Option<C::Conn>,
    pool: Arc<PoolInner<C>>,
    _permit: OwnedSemaphorePermit,
}

impl<C: Connector> PooledConnection<C> {
    /// Give the connection back to the pool.
    pub fn release(self) {
        drop(self);
    }

    /// Discard a broken connection instead of returning it for reuse.
    pub fn invalidate(mut self) {
        self.conn = None;
    }

    fn conn_mut(&mut self) -> io::Result<&mut C::Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection discarded"))
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.push_idle(conn);
        }
        self.pool.releases.fetch_add(1, Ordering::Relaxed);
    }
}

impl<C: Connector> AsyncRead for PooledConnection<C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().conn_mut() {
            Ok(conn) => Pin::new(conn).poll_read(cx, buf),
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}

impl<C: Connector> AsyncWrite for PooledConnection<C> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().conn_mut() {
            Ok(conn) => Pin::new(conn).poll_write(cx, buf),
            Err(err) => Poll::Ready(Err(err)),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().conn_mut() {
            Ok(conn) => Pin::new(conn).poll_flush(cx),
            Err(err) => Poll::Ready(Err(err)),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().conn_mut() {
            Ok(conn) => Pin::new(conn).poll_shutdown(cx),
            Err(err) => Poll::Ready(Err(err)),
        }
    }
}
