//! SQL Server connection pool.
//!
//! Checked-out connections are bounded by a semaphore. Idle clients are kept
//! in a stack and reused; a client whose last query failed or timed out is
//! dropped instead of returned. Idle clients are pinged before reuse.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use tiberius::{Client, ToSql};
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tokio_util::sync::CancellationToken;

use super::value::row_to_map;
use super::{Connection, ConnectionConfig, ConnectionProvider, DbError, Row};

type MssqlClient = Client<Compat<TcpStream>>;

/// Open one physical connection, following a single routing redirect.
async fn open_client(config: &tiberius::Config) -> Result<MssqlClient, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        // Azure SQL gateways redirect to the actual node
        Err(tiberius::error::Error::Routing { host, port }) => {
            log::debug!("Server redirected connection to {host}:{port}");
            let mut routed = config.clone();
            routed.host(&host);
            routed.port(port);
            let tcp = TcpStream::connect(routed.get_addr()).await?;
            tcp.set_nodelay(true)?;
            Client::connect(routed, tcp.compat_write()).await
        }
        Err(e) => Err(e),
    }
}

/// Connect with exponential backoff retry
///
/// Attempts connection up to `max_attempts` times with exponential backoff.
/// Backoff starts at `initial_backoff` and doubles on each retry, capped at 10 seconds.
/// Each connection attempt is subject to `timeout` and can be cancelled via the shutdown token.
async fn connect_with_retry(
    config: &ConnectionConfig,
    shutdown_token: &CancellationToken,
) -> Result<MssqlClient> {
    let max_attempts = config.connect_retries.max(1);
    let timeout = config.acquire_timeout;
    let target = config.to_tiberius();
    let mut backoff = config.connect_backoff;

    for attempt in 1..=max_attempts {
        log::debug!(
            "Connection attempt {attempt}/{max_attempts} to {}:{} (timeout: {timeout:?})",
            config.host,
            config.port
        );

        // Race connection against timeout and cancellation
        let result = tokio::select! {
            res = open_client(&target) => Some(res),
            () = tokio::time::sleep(timeout) => None,
            () = shutdown_token.cancelled() => {
                log::info!("Connection attempt cancelled during shutdown");
                return Err(anyhow::anyhow!("Connection cancelled during shutdown"));
            }
        };

        match result {
            Some(Ok(client)) => {
                if attempt > 1 {
                    log::info!("Connected to SQL Server on attempt {attempt}/{max_attempts}");
                }
                return Ok(client);
            }
            Some(Err(e)) => {
                let message = config.sanitize(&e.to_string());
                if attempt == max_attempts {
                    return Err(anyhow::anyhow!(
                        "Failed to connect after {} attempt{}: {}",
                        max_attempts,
                        if max_attempts == 1 { "" } else { "s" },
                        message
                    ));
                }

                log::debug!(
                    "Connection attempt {attempt}/{max_attempts} failed: {message}. Retrying in {backoff:?}"
                );
            }
            None => {
                if attempt == max_attempts {
                    return Err(anyhow::anyhow!(
                        "Connection timeout after {} attempt{} ({}s per attempt)",
                        max_attempts,
                        if max_attempts == 1 { "" } else { "s" },
                        timeout.as_secs()
                    ));
                }

                log::debug!(
                    "Connection attempt {attempt}/{max_attempts} timed out after {timeout:?}. Retrying in {backoff:?}"
                );
            }
        }

        // Add jitter (0-25% of backoff) to prevent thundering herd
        let jitter_max = (backoff.as_millis() / 4).max(1);
        let jitter = rand::rng().random_range(0..jitter_max);
        let sleep_duration = backoff + Duration::from_millis(jitter as u64);

        tokio::select! {
            () = tokio::time::sleep(sleep_duration) => {},
            () = shutdown_token.cancelled() => {
                log::info!("Connection retry cancelled during backoff");
                return Err(anyhow::anyhow!("Connection cancelled during shutdown"));
            }
        }

        backoff = (backoff * 2).min(Duration::from_secs(10));
    }

    unreachable!()
}

/// Send a trivial batch; `None` if the client no longer answers.
async fn ping(mut client: MssqlClient, timeout: Duration) -> Option<MssqlClient> {
    let check = async {
        let stream = client.simple_query("SELECT 1").await?;
        stream.into_results().await
    };
    let alive = matches!(tokio::time::timeout(timeout, check).await, Ok(Ok(_)));
    alive.then_some(client)
}

/// Clients waiting to be reused, most recently returned first.
struct IdleSet<C> {
    clients: Mutex<Vec<C>>,
    closed: AtomicBool,
}

impl<C> IdleSet<C> {
    fn new(clients: Vec<C>) -> Self {
        Self {
            clients: Mutex::new(clients),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<C> {
        self.clients.lock().ok()?.pop()
    }

    /// Pop idle clients until one passes `check`. Clients that fail are dropped.
    async fn take_live<F, Fut>(&self, mut check: F) -> Option<C>
    where
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Option<C>>,
    {
        while let Some(client) = self.take() {
            if let Some(client) = check(client).await {
                return Some(client);
            }
            log::debug!("Discarding idle connection that failed its liveness check");
        }
        None
    }

    fn put(&self, client: C) {
        if self.is_closed() {
            return;
        }
        if let Ok(mut clients) = self.clients.lock() {
            clients.push(client);
        }
    }

    /// Mark closed and drop every idle client. Returns `None` if already closed.
    fn close(&self) -> Option<usize> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return None;
        }
        let drained = self
            .clients
            .lock()
            .map(|mut clients| clients.drain(..).count())
            .unwrap_or(0);
        Some(drained)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.clients.lock().map(|clients| clients.len()).unwrap_or(0)
    }
}

/// A client on loan from an [`IdleSet`].
///
/// The client goes back on drop only if the last operation completed. A lease
/// dropped mid-operation (cancelled future, timeout, error) still counts as
/// in flight and its client is discarded, since the stream may be half read.
struct Lease<C> {
    client: Option<C>,
    idle: Arc<IdleSet<C>>,
    in_flight: bool,
}

impl<C> Lease<C> {
    fn new(client: C, idle: Arc<IdleSet<C>>) -> Self {
        Self {
            client: Some(client),
            idle,
            in_flight: false,
        }
    }

    /// Borrow the client for one operation. Until [`Lease::finish`] is
    /// called the client is treated as unusable.
    fn start(&mut self) -> Option<&mut C> {
        self.in_flight = true;
        self.client.as_mut()
    }

    fn finish(&mut self) {
        self.in_flight = false;
    }
}

impl<C> Drop for Lease<C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if self.in_flight {
                log::debug!("Dropping interrupted or failed connection instead of pooling it");
            } else {
                self.idle.put(client);
            }
        }
    }
}

struct PoolInner {
    config: ConnectionConfig,
    idle: Arc<IdleSet<MssqlClient>>,
    permits: Arc<Semaphore>,
    shutdown_token: CancellationToken,
}

/// Pooled SQL Server connection provider.
#[derive(Clone)]
pub struct MssqlPool {
    inner: Arc<PoolInner>,
}

impl MssqlPool {
    /// Create the pool and open its first connection.
    ///
    /// Fails if the server cannot be reached within the configured retries;
    /// callers treat that as fatal at startup.
    pub async fn connect(config: ConnectionConfig, shutdown_token: CancellationToken) -> Result<Self> {
        log::info!("Connecting with config: {config:?}");

        let first = connect_with_retry(&config, &shutdown_token).await?;
        log::info!("Connected to SQL Server at {}:{}", config.host, config.port);

        Ok(Self::with_idle(config, vec![first], shutdown_token))
    }

    fn with_idle(
        config: ConnectionConfig,
        idle: Vec<MssqlClient>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let pool_size = config.pool_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                config,
                idle: Arc::new(IdleSet::new(idle)),
                permits: Arc::new(Semaphore::new(pool_size)),
                shutdown_token,
            }),
        }
    }

    /// Tear the pool down. Later `acquire` calls fail with `NotConnected`;
    /// connections currently checked out are dropped when released.
    pub fn close(&self) {
        let Some(drained) = self.inner.idle.close() else {
            return;
        };
        self.inner.permits.close();
        self.inner.shutdown_token.cancel();
        log::info!("Connection pool closed ({drained} idle connection(s) dropped)");
    }

    async fn permit(&self) -> Result<OwnedSemaphorePermit, DbError> {
        let acquire = self.inner.permits.clone().acquire_owned();
        match tokio::time::timeout(self.inner.config.acquire_timeout, acquire).await {
            Ok(Ok(permit)) => Ok(permit),
            // Semaphore closed by `close()`
            Ok(Err(_)) => Err(DbError::NotConnected),
            Err(_) => Err(DbError::Timeout(self.inner.config.acquire_timeout)),
        }
    }
}

#[async_trait]
impl ConnectionProvider for MssqlPool {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DbError> {
        if self.inner.idle.is_closed() {
            return Err(DbError::NotConnected);
        }

        let permit = self.permit().await?;

        // Idle clients may have been cut off by a server restart or failover
        let timeout = self.inner.config.query_timeout;
        let reused = self.inner.idle.take_live(|client| ping(client, timeout)).await;

        let client = match reused {
            Some(client) => client,
            None => connect_with_retry(&self.inner.config, &self.inner.shutdown_token)
                .await
                .map_err(|e| DbError::QueryFailed(self.inner.config.sanitize(&e.to_string())))?,
        };

        Ok(Box::new(PooledConnection {
            lease: Lease::new(client, Arc::clone(&self.inner.idle)),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        }))
    }
}

/// A client checked out of [`MssqlPool`]. Returned to the pool on drop.
struct PooledConnection {
    // Dropped before the permit, so the client is idle again when the slot frees
    lease: Lease<MssqlClient>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl Connection for PooledConnection {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>, DbError> {
        let timeout = self.pool.config.query_timeout;
        let client = self.lease.start().ok_or(DbError::NotConnected)?;
        let bound: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let run = async {
            let stream = client.query(sql, &bound).await?;
            Ok::<_, tiberius::error::Error>(stream.into_first_result().await?)
        };

        let outcome = tokio::time::timeout(timeout, run).await;
        match outcome {
            Ok(Ok(rows)) => {
                self.lease.finish();
                Ok(rows.into_iter().map(row_to_map).collect())
            }
            Ok(Err(e)) => Err(DbError::QueryFailed(self.pool.config.sanitize(&e.to_string()))),
            Err(_) => {
                log::warn!("Query exceeded {timeout:?}; discarding connection");
                Err(DbError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle(clients: Vec<u32>) -> Arc<IdleSet<u32>> {
        Arc::new(IdleSet::new(clients))
    }

    #[test]
    fn completed_lease_returns_client() {
        let set = idle(vec![]);
        let mut lease = Lease::new(7, Arc::clone(&set));
        assert_eq!(lease.start().copied(), Some(7));
        lease.finish();
        drop(lease);

        assert_eq!(set.take(), Some(7));
    }

    #[test]
    fn unused_lease_returns_client() {
        let set = idle(vec![]);
        drop(Lease::new(7, Arc::clone(&set)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn lease_dropped_mid_operation_discards_client() {
        let set = idle(vec![]);
        let mut lease = Lease::new(7, Arc::clone(&set));
        lease.start();
        drop(lease);

        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn cancelled_operation_discards_client() {
        let set = idle(vec![]);
        let mut lease = Lease::new(7, Arc::clone(&set));

        let pending = async {
            let _client = lease.start();
            std::future::pending::<()>().await;
        };
        let outcome = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(outcome.is_err());
        drop(lease);

        assert_eq!(set.len(), 0);
    }

    #[test]
    fn close_drains_idle_and_rejects_returns() {
        let set = idle(vec![1, 2]);
        let lease = Lease::new(3, Arc::clone(&set));

        assert_eq!(set.close(), Some(2));
        assert_eq!(set.close(), None);
        drop(lease);

        assert!(set.is_closed());
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn take_live_skips_dead_clients() {
        let set = idle(vec![1, 2, 3]);

        let live = set.take_live(|c| async move { (c != 3).then_some(c) }).await;

        assert_eq!(live, Some(2));
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn take_live_on_all_dead_yields_none() {
        let set = idle(vec![1, 2]);
        assert_eq!(set.take_live(|_| async { None }).await, None);
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn closed_pool_refuses_acquire() {
        let token = CancellationToken::new();
        let pool = MssqlPool::with_idle(ConnectionConfig::default(), Vec::new(), token.clone());

        pool.close();
        pool.close();

        assert!(token.is_cancelled());
        assert!(matches!(pool.acquire().await, Err(DbError::NotConnected)));
    }
}
