//! Push-token provisioning.
//!
//! The OS delivers the device token through a callback that is unrelated to
//! the call that asked for it. The provisioner parks the request in a
//! single-slot oneshot and the host forwards the callback into
//! [`PushTokenProvisioner::deliver_token`] or
//! [`PushTokenProvisioner::deliver_error`].
//!
//! Only one request may be pending at a time. A second concurrent call is
//! rejected with [`PushError::RequestInFlight`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;

use crate::error::PushError;

/// Notification permission state as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
    Ephemeral,
}

/// OS notification facilities the provisioner drives.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Show the system permission prompt. `Ok(false)` means the user said no.
    async fn request_authorization(&self) -> Result<bool, PushError>;

    /// Ask the OS to register; the outcome arrives via the delivery callbacks.
    fn register_for_remote_notifications(&self);
}

/// Opaque remote-notification delivery token (lowercase hex).
#[derive(Clone)]
pub struct PushToken(SecretString);

impl PushToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Hex-encode the raw device token bytes.
    pub fn from_device_token(bytes: &[u8]) -> Self {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self::new(hex)
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for PushToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PushToken([REDACTED; {} chars])", self.expose().len())
    }
}

impl PartialEq for PushToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

/// Resolves to a push token or a failure.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn request_token(&self) -> Result<PushToken, PushError>;
}

type TokenSlot = Option<oneshot::Sender<Result<PushToken, PushError>>>;

pub struct PushTokenProvisioner {
    center: Arc<dyn NotificationCenter>,
    pending: Mutex<TokenSlot>,
}

impl PushTokenProvisioner {
    pub fn new(center: Arc<dyn NotificationCenter>) -> Self {
        Self {
            center,
            pending: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, TokenSlot> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request is currently waiting for the OS callback.
    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// OS callback: registration produced a device token.
    ///
    /// Returns `false` when nothing was waiting.
    pub fn deliver_token(&self, device_token: &[u8]) -> bool {
        let token = PushToken::from_device_token(device_token);
        tracing::debug!(len = token.expose().len(), "Push token delivered");
        self.resolve(Ok(token))
    }

    /// OS callback: registration failed.
    pub fn deliver_error(&self, cause: impl fmt::Display) -> bool {
        let cause = cause.to_string();
        tracing::warn!("Remote notification registration failed: {}", cause);
        self.resolve(Err(PushError::SystemError(cause)))
    }

    fn resolve(&self, result: Result<PushToken, PushError>) -> bool {
        match self.slot().take() {
            Some(tx) => tx.send(result).is_ok(),
            None => {
                tracing::debug!("Push callback arrived with no pending request");
                false
            }
        }
    }

    async fn ensure_permission(&self) -> Result<(), PushError> {
        match self.center.authorization_status().await {
            AuthorizationStatus::NotDetermined => {
                if self.center.request_authorization().await? {
                    Ok(())
                } else {
                    Err(PushError::PermissionDenied)
                }
            }
            AuthorizationStatus::Denied => Err(PushError::PermissionDenied),
            AuthorizationStatus::Authorized
            | AuthorizationStatus::Provisional
            | AuthorizationStatus::Ephemeral => Ok(()),
        }
    }
}

#[async_trait]
impl TokenSource for PushTokenProvisioner {
    async fn request_token(&self) -> Result<PushToken, PushError> {
        // Claim the slot before the permission prompt so a concurrent caller
        // is turned away without prompting, and before registering so a
        // synchronous callback is not lost.
        let rx = {
            let mut slot = self.slot();
            if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
                return Err(PushError::RequestInFlight);
            }
            let (tx, rx) = oneshot::channel();
            *slot = Some(tx);
            rx
        };

        if let Err(e) = self.ensure_permission().await {
            self.slot().take();
            return Err(e);
        }

        self.center.register_for_remote_notifications();

        rx.await.unwrap_or(Err(PushError::NoToken))
    }
}
