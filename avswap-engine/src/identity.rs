//! Content identity normalisation and change detection
//!
//! A content identity is the page locator with the fragment removed:
//! `origin + path + ?query`. It is the join key between the running engine
//! and the persisted tracks/selections.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};

/// Normalized, fragment-stripped content locator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentIdentity(String);

impl ContentIdentity {
    /// Normalize a raw locator
    pub fn from_locator(locator: &str) -> Result<Self> {
        let mut url = Url::parse(locator.trim())
            .map_err(|e| Error::InvalidLocator(format!("{}: {}", locator, e)))?;

        let origin = url.origin();
        if !origin.is_tuple() {
            url.set_fragment(None);
            return Ok(Self(url.to_string()));
        }

        let mut normalized = origin.ascii_serialization();
        normalized.push_str(url.path());
        if let Some(query) = url.query().filter(|q| !q.is_empty()) {
            normalized.push('?');
            normalized.push_str(query);
        }
        Ok(Self(normalized))
    }

    /// Wrap an already normalized identity (e.g. read back from the store)
    pub fn from_normalized(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the host's current raw locator
pub trait LocationSource: Send + Sync {
    fn current_locator(&self) -> String;
}

/// Polls a `LocationSource` and publishes identity changes
///
/// Subscribers receive `None` until the first successful poll.
pub struct IdentityPoller {
    source: Arc<dyn LocationSource>,
    interval: Duration,
    tx: watch::Sender<Option<ContentIdentity>>,
}

impl IdentityPoller {
    pub fn new(
        source: Arc<dyn LocationSource>,
        interval: Duration,
    ) -> (Self, watch::Receiver<Option<ContentIdentity>>) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                source,
                interval,
                tx,
            },
            rx,
        )
    }

    /// Additional receiver for the same identity feed
    pub fn subscribe(&self) -> watch::Receiver<Option<ContentIdentity>> {
        self.tx.subscribe()
    }

    /// Read the locator once; returns the identity if it changed
    pub fn poll_once(&self) -> Option<ContentIdentity> {
        let locator = self.source.current_locator();
        let identity = match ContentIdentity::from_locator(&locator) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(locator = %locator, "Ignoring unparseable locator: {}", e);
                return None;
            }
        };

        let changed = self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&identity) {
                false
            } else {
                *current = Some(identity.clone());
                true
            }
        });

        if changed {
            info!(identity = %identity, "Content identity changed");
            Some(identity)
        } else {
            None
        }
    }

    /// Poll until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Identity poller cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once();
                }
            }
        }
    }
}
