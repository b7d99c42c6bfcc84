//! HTTP listener and worker pool.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use fnrun_config::ListenEndpoint;
use tiny_http::Server;
use tracing::{debug, info, warn};

use super::{InvocationSink, SERVICE_TARGET, ServiceError};

const RECV_TIMEOUT: Duration = Duration::from_millis(50);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Bound HTTP listener that has not started serving yet.
pub struct HttpService {
    endpoint: ListenEndpoint,
    addr: SocketAddr,
    server: Arc<Server>,
}

impl HttpService {
    /// Resolves `endpoint` and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the address does not resolve or the bind
    /// fails.
    pub fn bind(endpoint: &ListenEndpoint) -> Result<Self, ServiceError> {
        let addr = resolve(endpoint)?;
        let server = Server::http(addr).map_err(|source| ServiceError::Bind { addr, source })?;
        let bound = server.server_addr().to_ip().unwrap_or(addr);
        Ok(Self {
            endpoint: endpoint.clone(),
            addr: bound,
            server: Arc::new(server),
        })
    }

    /// Address actually bound, with any ephemeral port filled in.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Spawns `workers` threads serving requests through `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NoWorkers`] for an empty pool and
    /// [`ServiceError::Spawn`] when a thread cannot be created. Workers that
    /// already started are stopped before the error is returned.
    pub fn start(self, sink: InvocationSink, workers: usize) -> Result<ServiceHandle, ServiceError> {
        if workers == 0 {
            return Err(ServiceError::NoWorkers);
        }
        let shared_sink = Arc::new(sink);
        let mut handle = ServiceHandle {
            addr: self.addr,
            server: Arc::clone(&self.server),
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Vec::with_capacity(workers),
        };
        info!(
            target: SERVICE_TARGET,
            endpoint = %self.endpoint,
            addr = %self.addr,
            workers,
            "http service active"
        );
        for index in 0..workers {
            let server = Arc::clone(&self.server);
            let worker_sink = Arc::clone(&shared_sink);
            let shutdown = Arc::clone(&handle.shutdown);
            let spawned = thread::Builder::new()
                .name(format!("fnrund-worker-{index}"))
                .spawn(move || run_worker(&server, &worker_sink, &shutdown));
            match spawned {
                Ok(worker) => handle.workers.push(worker),
                Err(source) => {
                    handle.shutdown();
                    return Err(ServiceError::Spawn { index, source });
                }
            }
        }
        Ok(handle)
    }
}

/// Handle to a running worker pool.
pub struct ServiceHandle {
    addr: SocketAddr,
    server: Arc<Server>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ServiceHandle {
    /// Address the service is listening on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting requests and unblocks idle workers.
    ///
    /// Workers finish the request they are currently serving, if any, and
    /// then exit. This call does not wait for them.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
    }

    /// Waits for every worker to exit.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::WorkerPanic`] if any worker panicked.
    pub fn join(mut self) -> Result<(), ServiceError> {
        let mut result = Ok(());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                result = Err(ServiceError::WorkerPanic);
            }
        }
        result
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_worker(server: &Server, sink: &InvocationSink, shutdown: &AtomicBool) {
    let mut last_error = None;
    while !shutdown.load(Ordering::SeqCst) {
        match server.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(request)) => {
                last_error = None;
                sink.handle(request);
            }
            Ok(None) => {}
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: SERVICE_TARGET, error = %error, "http receive error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    debug!(target: SERVICE_TARGET, "worker stopped");
}

fn resolve(endpoint: &ListenEndpoint) -> Result<SocketAddr, ServiceError> {
    let mut addrs = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| ServiceError::Resolve {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })?;
    addrs.next().ok_or_else(|| ServiceError::ResolveEmpty {
        host: endpoint.host.clone(),
        port: endpoint.port,
    })
}
