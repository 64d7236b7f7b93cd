//! One-time launch gate.
//!
//! On the first meaningful launch the gate negotiates with a remote endpoint
//! and permanently commits either the main application or a web target.
//! Later launches only read the committed decision.

pub mod decision;
pub mod fingerprint;
pub mod negotiator;
pub mod orchestrator;
pub mod push;
pub mod reachability;

pub use decision::{DecisionStore, LaunchDecision};
pub use fingerprint::{DeviceEnvironment, DeviceFingerprint, FingerprintCollector, HostEnvironment};
pub use negotiator::{HttpLinkNegotiator, LinkNegotiator};
pub use orchestrator::{BootOrchestrator, GateServices, LaunchView, Route};
pub use push::{AuthorizationStatus, NotificationCenter, PushToken, PushTokenProvisioner, TokenSource};
pub use reachability::{
    ConnectPathMonitor, InternetChecker, PathMonitor, PathObservation, PathStatus, Reachability,
};
