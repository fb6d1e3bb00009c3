use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use bistro_core::TenantId;
use bistro_events::{EventBus, Subscription, TenantScoped};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            if j.join().is_err() {
                warn!(worker = self.name, "projection worker panicked");
            }
        }
    }
}

/// Projection worker loop.
///
/// Subscribes to a bus and feeds every message to an idempotent handler until
/// shut down or until the bus goes away. With a `tenant_id`, messages for other
/// tenants are dropped.
#[derive(Debug)]
pub struct ProjectionWorker;

impl ProjectionWorker {
    /// Spawn a worker thread. The subscription is taken before returning, so no
    /// message published afterwards is missed.
    pub fn spawn<M, B, H, E>(
        name: &'static str,
        bus: &B,
        tenant_id: Option<TenantId>,
        mut handler: H,
    ) -> io::Result<WorkerHandle>
    where
        M: TenantScoped + Send + 'static,
        B: EventBus<M>,
        H: FnMut(M) -> Result<(), E> + Send + 'static,
        E: core::fmt::Debug + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<M> = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, tenant_id, &mut handler))?;

        Ok(WorkerHandle {
            name,
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<M, H, E>(
    name: &'static str,
    sub: Subscription<M>,
    shutdown_rx: mpsc::Receiver<()>,
    tenant_id: Option<TenantId>,
    handler: &mut H,
) where
    M: TenantScoped,
    H: FnMut(M) -> Result<(), E>,
    E: core::fmt::Debug,
{
    let tick = Duration::from_millis(100);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => {
                if let Some(t) = tenant_id {
                    if msg.tenant_id() != t {
                        continue;
                    }
                }

                if let Err(err) = handler(msg) {
                    warn!(worker = name, error = ?err, "projection worker handler failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker = name, "projection worker stopped");
}
