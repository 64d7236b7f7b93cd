//! Bounded internet reachability probe.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Network path status reported by a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
    RequiresConnection,
}

/// A running path observation. Dropping it tears the observation down.
pub struct PathObservation {
    updates: mpsc::Receiver<PathStatus>,
    task: Option<JoinHandle<()>>,
}

impl PathObservation {
    pub fn new(updates: mpsc::Receiver<PathStatus>) -> Self {
        Self {
            updates,
            task: None,
        }
    }

    /// Tie a background task to the observation's lifetime.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Next reported status, or `None` once the monitor stops reporting.
    pub async fn next(&mut self) -> Option<PathStatus> {
        self.updates.recv().await
    }

    /// Stop observing.
    pub fn cancel(self) {}
}

impl Drop for PathObservation {
    fn drop(&mut self) {
        self.updates.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Source of network path updates.
pub trait PathMonitor: Send + Sync {
    /// Begin observing. Must be called from within a Tokio runtime.
    fn start(&self) -> PathObservation;
}

/// Answers "is the device online right now?".
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn check(&self, timeout: Duration) -> bool;
}

/// First-wins race between the first path status and a timer.
pub struct InternetChecker<M> {
    monitor: M,
}

impl<M: PathMonitor> InternetChecker<M> {
    pub fn new(monitor: M) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl<M: PathMonitor> Reachability for InternetChecker<M> {
    async fn check(&self, timeout: Duration) -> bool {
        let mut observation = self.monitor.start();

        let online = match tokio::time::timeout(timeout, observation.next()).await {
            Ok(Some(PathStatus::Satisfied)) => true,
            Ok(Some(status)) => {
                tracing::debug!(?status, "Network path not satisfied");
                false
            }
            Ok(None) => {
                tracing::debug!("Path monitor stopped before reporting");
                false
            }
            Err(_) => {
                tracing::debug!(?timeout, "Reachability probe timed out");
                false
            }
        };

        observation.cancel();
        online
    }
}

/// Path monitor that reports `Satisfied` when a TCP connection to a known
/// address can be opened.
#[derive(Debug, Clone)]
pub struct ConnectPathMonitor {
    addr: String,
}

impl ConnectPathMonitor {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl PathMonitor for ConnectPathMonitor {
    fn start(&self) -> PathObservation {
        let (tx, rx) = mpsc::channel(1);
        let addr = self.addr.clone();
        let task = tokio::spawn(async move {
            let status = match tokio::net::TcpStream::connect(&addr).await {
                Ok(_) => PathStatus::Satisfied,
                Err(e) => {
                    tracing::debug!("Probe connect to {} failed: {}", addr, e);
                    PathStatus::Unsatisfied
                }
            };
            let _ = tx.send(status).await;
        });
        PathObservation::new(rx).with_task(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Reports a scripted status (or nothing) and keeps the sender so tests
    /// can check the observation was torn down.
    struct ScriptedMonitor {
        status: Option<PathStatus>,
        senders: Mutex<Vec<mpsc::Sender<PathStatus>>>,
    }

    impl ScriptedMonitor {
        fn new(status: Option<PathStatus>) -> Self {
            Self {
                status,
                senders: Mutex::new(Vec::new()),
            }
        }

        fn all_closed(&self) -> bool {
            self.senders.lock().unwrap().iter().all(|tx| tx.is_closed())
        }
    }

    impl PathMonitor for &ScriptedMonitor {
        fn start(&self) -> PathObservation {
            let (tx, rx) = mpsc::channel(4);
            if let Some(status) = self.status {
                tx.try_send(status).unwrap();
            }
            self.senders.lock().unwrap().push(tx);
            PathObservation::new(rx)
        }
    }

    #[tokio::test]
    async fn satisfied_path_is_online() {
        let monitor = ScriptedMonitor::new(Some(PathStatus::Satisfied));
        let checker = InternetChecker::new(&monitor);
        assert!(checker.check(Duration::from_secs(1)).await);
        assert!(monitor.all_closed());
    }

    #[tokio::test]
    async fn first_unsatisfied_status_is_offline() {
        let monitor = ScriptedMonitor::new(Some(PathStatus::Unsatisfied));
        let checker = InternetChecker::new(&monitor);
        assert!(!checker.check(Duration::from_secs(1)).await);
        assert!(monitor.all_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_monitor_times_out_offline() {
        let monitor = ScriptedMonitor::new(None);
        let checker = InternetChecker::new(&monitor);
        assert!(!checker.check(Duration::from_secs(3)).await);
        assert!(monitor.all_closed());
    }

    #[tokio::test]
    async fn connect_monitor_sees_listening_socket() {
        let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(_) => return,
        };
        let addr = listener.local_addr().unwrap();

        let checker = InternetChecker::new(ConnectPathMonitor::new(addr.to_string()));
        assert!(checker.check(Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn connect_monitor_reports_refused_as_offline() {
        let addr = match std::net::TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener.local_addr().unwrap(),
            Err(_) => return,
        };

        let checker = InternetChecker::new(ConnectPathMonitor::new(addr.to_string()));
        assert!(!checker.check(Duration::from_secs(2)).await);
    }
}
