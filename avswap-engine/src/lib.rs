//! # avswap Engine (avswap-engine)
//!
//! Replaces the audio of an externally controlled video element with a
//! locally supplied track and keeps the two in sync across play, pause,
//! seeks, rate and volume changes, element replacement and navigation.
//!
//! **Architecture:** host capability traits (`host`) implemented by the
//! embedding layer; `ElementLocator` → `BindingManager` → `ShadowAudioController`,
//! orchestrated by the selection state machine on `AudioSwapEngine`;
//! persistence behind the `TrackStore` trait.

pub mod binding;
pub mod driver;
pub mod engine;
pub mod error;
pub mod host;
pub mod identity;
pub mod locator;
pub mod model;
pub mod shadow;
pub mod store;

pub use binding::{BindOutcome, PlaybackSignal};
pub use driver::{DriverInputs, EngineDriver};
pub use engine::{AudioSwapEngine, PlaybackEventStream};
pub use error::{Error, Result};
pub use identity::{ContentIdentity, IdentityPoller, LocationSource};
pub use model::{AudioTrack, Payload, SelectionState, TrackId};
pub use shadow::ReconcileOutcome;
pub use store::{MemoryTrackStore, SqliteTrackStore, TrackStore};
