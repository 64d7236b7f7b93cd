//! Boot decision flow.
//!
//! Every launch reads the persisted [`LaunchDecision`] before touching the
//! network. Only an undecided install runs the negotiation sequence
//! (reachability, push token, fingerprint, link request, strictly in that
//! order) and every branch of it ends in a permanent commit. The commit lands
//! before the route is published, so a published route always has its
//! decision on disk.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt as _;
use tokio::sync::{Mutex, watch};
use url::Url;

use crate::config::Config;
use crate::error::{Error, GateFailure};
use crate::gate::decision::{DecisionStore, LaunchDecision};
use crate::gate::fingerprint::{FingerprintCollector, HostEnvironment};
use crate::gate::negotiator::{HttpLinkNegotiator, LinkNegotiator};
use crate::gate::push::TokenSource;
use crate::gate::reachability::{ConnectPathMonitor, InternetChecker, Reachability};
use crate::prefs::Preferences;

/// Screen the UI layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Splash,
    Web(Url),
    App,
}

/// What the UI collaborator renders: a route plus the offline alert flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchView {
    pub route: Route,
    /// "No Internet Connection" prompt with Retry / Cancel.
    pub offline_alert: bool,
}

impl LaunchView {
    fn splash() -> Self {
        Self {
            route: Route::Splash,
            offline_alert: false,
        }
    }
}

/// Collaborators the orchestrator drives.
#[derive(Clone)]
pub struct GateServices {
    pub store: DecisionStore,
    pub reachability: Arc<dyn Reachability>,
    pub tokens: Arc<dyn TokenSource>,
    pub fingerprints: FingerprintCollector,
    pub negotiator: Arc<dyn LinkNegotiator>,
}

impl GateServices {
    /// Wire the host adapters from configuration. The token source is
    /// platform-specific and always supplied by the host.
    pub fn from_config(
        config: &Config,
        prefs: Arc<dyn Preferences>,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, Error> {
        let env = Arc::new(HostEnvironment::new(config.device.clone()));
        let monitor = ConnectPathMonitor::new(config.gate.probe_addr.clone());
        let negotiator = HttpLinkNegotiator::new(config.gate.header_name.clone())?;

        Ok(Self {
            store: DecisionStore::new(prefs.clone()),
            reachability: Arc::new(InternetChecker::new(monitor)),
            tokens,
            fingerprints: FingerprintCollector::new(env, prefs),
            negotiator: Arc::new(negotiator),
        })
    }
}

pub struct BootOrchestrator {
    services: GateServices,
    endpoint: Url,
    reachability_timeout: Duration,
    view: watch::Sender<LaunchView>,
    flow: Mutex<()>,
}

impl BootOrchestrator {
    pub fn new(services: GateServices, endpoint: Url, reachability_timeout: Duration) -> Self {
        let (view, _) = watch::channel(LaunchView::splash());
        Self {
            services,
            endpoint,
            reachability_timeout,
            view,
            flow: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config, services: GateServices) -> Self {
        Self::new(
            services,
            config.gate.endpoint.clone(),
            config.gate.reachability_timeout,
        )
    }

    /// Observe route and alert changes.
    pub fn subscribe(&self) -> watch::Receiver<LaunchView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> LaunchView {
        self.view.borrow().clone()
    }

    /// Run once per process launch.
    pub async fn boot(&self) -> LaunchView {
        let _flow = self.flow.lock().await;
        self.boot_locked().await
    }

    /// "Retry" on the offline alert. Re-probes a saved web decision without
    /// renegotiating; any other state re-runs boot.
    pub async fn retry(&self) -> LaunchView {
        let _flow = self.flow.lock().await;
        match self.services.store.load() {
            LaunchDecision::LockedToWeb(url) => self.open_saved_web(url).await,
            _ => self.boot_locked().await,
        }
    }

    /// "Cancel" on the offline alert: stay on the splash screen.
    pub fn cancel(&self) -> LaunchView {
        self.view.send_modify(|view| view.offline_alert = false);
        self.view()
    }

    async fn boot_locked(&self) -> LaunchView {
        match self.services.store.load() {
            LaunchDecision::LockedToApp => {
                tracing::debug!("Saved decision: main application");
                self.show(Route::App)
            }
            LaunchDecision::LockedToWeb(url) => self.open_saved_web(url).await,
            LaunchDecision::Undecided => {
                tracing::info!("No launch decision yet, negotiating");
                let route = match AssertUnwindSafe(self.first_decision()).catch_unwind().await {
                    Ok(route) => route,
                    Err(_) => {
                        tracing::error!("Negotiation aborted unexpectedly");
                        self.lock_to_app(None)
                    }
                };
                self.show(route)
            }
        }
    }

    async fn open_saved_web(&self, url: Url) -> LaunchView {
        if self.services.reachability.check(self.reachability_timeout).await {
            self.show(Route::Web(url))
        } else {
            tracing::info!(
                failure = GateFailure::NoConnectivity.as_str(),
                "Saved web target unreachable, prompting for retry"
            );
            self.view.send_replace(LaunchView {
                route: Route::Splash,
                offline_alert: true,
            });
            self.view()
        }
    }

    async fn first_decision(&self) -> Route {
        let services = &self.services;

        if !services.reachability.check(self.reachability_timeout).await {
            return self.lock_to_app(Some(GateFailure::NoConnectivity));
        }

        let token = match services.tokens.request_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!("Push token unavailable: {}", e);
                return self.lock_to_app(Some(e.failure()));
            }
        };

        let fingerprint = services.fingerprints.get_fingerprint();

        match services
            .negotiator
            .negotiate(&self.endpoint, &fingerprint, &token)
            .await
        {
            Ok(Some(target)) => self.lock_to_web(target),
            Ok(None) => self.lock_to_app(None),
            Err(e) => {
                tracing::warn!("Negotiation failed: {}", e);
                self.lock_to_app(Some(e.failure()))
            }
        }
    }

    fn lock_to_app(&self, failure: Option<GateFailure>) -> Route {
        if let Some(failure) = failure {
            tracing::info!(failure = failure.as_str(), "Falling back to main application");
        }
        if let Err(e) = self.services.store.commit_locked_to_app() {
            tracing::error!("Failed to persist main-application decision: {}", e);
        }
        Route::App
    }

    fn lock_to_web(&self, target: Url) -> Route {
        match self.services.store.commit_locked_to_web(&target) {
            Ok(()) => Route::Web(target),
            Err(e) => {
                tracing::error!("Failed to persist web decision: {}", e);
                self.lock_to_app(None)
            }
        }
    }

    fn show(&self, route: Route) -> LaunchView {
        self.view.send_replace(LaunchView {
            route,
            offline_alert: false,
        });
        self.view()
    }
}
