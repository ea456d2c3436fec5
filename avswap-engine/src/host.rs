//! Host capability traits
//!
//! The engine never talks to a concrete page or media stack. A hosting layer
//! implements these traits over whatever tree and media primitives it has
//! (a browser DOM bridge, a native player, or a test harness).
//!
//! Host objects follow DOM-style interior mutability: setters take `&self`.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Error reported by a fallible host call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Shared reference to a node of the host tree
pub type NodeRef = Arc<dyn ContainerNode>;

/// Shared reference to a live playback element
pub type ElementRef = Arc<dyn PlaybackElement>;

/// Listener invoked by the host when a playback event fires
pub type EventHandler = Box<dyn Fn() + Send + Sync>;

/// A node in a traversable container tree
///
/// `children` is the ordinary (light) tree. `nested_root` is an opaque
/// content root hosted by this node that ordinary traversal does not enter.
pub trait ContainerNode: Send + Sync {
    fn children(&self) -> Vec<NodeRef>;

    fn nested_root(&self) -> Option<NodeRef> {
        None
    }

    /// The playback element this node *is*, if any
    fn playback_element(&self) -> Option<ElementRef> {
        None
    }

    /// Whether this node is the known player wrapper component
    fn is_player_wrapper(&self) -> bool {
        false
    }
}

/// Provides the current root of the host tree
pub trait HostDocument: Send + Sync {
    fn root(&self) -> NodeRef;
}

/// Stable identity of a playback element for the lifetime of the element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Handle returned by `add_listener`, used to remove that exact listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Playback events the engine subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackEventKind {
    Play,
    Playing,
    Pause,
    Waiting,
    Stalled,
    Seeking,
    TimeUpdate,
    RateChange,
    VolumeChange,
    Ended,
    Emptied,
}

impl PlaybackEventKind {
    /// Every event a binding subscribes to
    pub const ALL: [PlaybackEventKind; 11] = [
        PlaybackEventKind::Play,
        PlaybackEventKind::Playing,
        PlaybackEventKind::Pause,
        PlaybackEventKind::Waiting,
        PlaybackEventKind::Stalled,
        PlaybackEventKind::Seeking,
        PlaybackEventKind::TimeUpdate,
        PlaybackEventKind::RateChange,
        PlaybackEventKind::VolumeChange,
        PlaybackEventKind::Ended,
        PlaybackEventKind::Emptied,
    ];

    /// Host event name
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackEventKind::Play => "play",
            PlaybackEventKind::Playing => "playing",
            PlaybackEventKind::Pause => "pause",
            PlaybackEventKind::Waiting => "waiting",
            PlaybackEventKind::Stalled => "stalled",
            PlaybackEventKind::Seeking => "seeking",
            PlaybackEventKind::TimeUpdate => "timeupdate",
            PlaybackEventKind::RateChange => "ratechange",
            PlaybackEventKind::VolumeChange => "volumechange",
            PlaybackEventKind::Ended => "ended",
            PlaybackEventKind::Emptied => "emptied",
        }
    }
}

impl fmt::Display for PlaybackEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The externally controlled video element
pub trait PlaybackElement: Send + Sync {
    fn element_id(&self) -> ElementId;

    /// Playback position in seconds
    fn current_time(&self) -> f64;
    fn is_paused(&self) -> bool;
    /// Volume in `0.0..=1.0`
    fn volume(&self) -> f64;
    fn playback_rate(&self) -> f64;
    fn is_muted(&self) -> bool;
    fn set_muted(&self, muted: bool) -> HostResult<()>;

    fn add_listener(&self, kind: PlaybackEventKind, handler: EventHandler) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
}

/// Opaque key of a playback resource allocated from a payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(pub String);

/// Platform media primitive that plays the substitute track
pub trait ShadowAudio: Send {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64) -> HostResult<()>;
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    fn is_paused(&self) -> bool;

    /// Begin playback
    ///
    /// Hosts whose primitive starts asynchronously may return `Ok` and
    /// report a later rejection by simply staying paused.
    fn play(&mut self) -> HostResult<()>;
    fn pause(&mut self);

    /// Detach the media source before the backing resource is released
    fn clear_source(&mut self);
}

/// Allocates resources from track payloads and opens audio objects on them
pub trait AudioBackend: Send + Sync {
    fn allocate(&self, payload: &[u8]) -> HostResult<ResourceKey>;
    fn release(&self, key: &ResourceKey);
    fn open(&self, key: &ResourceKey) -> HostResult<Box<dyn ShadowAudio>>;
}

/// Owner of one allocated playback resource
///
/// Not `Clone`: exactly one owner exists per key and the key is released
/// when the handle drops.
pub struct ResourceHandle {
    key: ResourceKey,
    backend: Arc<dyn AudioBackend>,
}

impl ResourceHandle {
    pub fn allocate(backend: Arc<dyn AudioBackend>, payload: &[u8]) -> HostResult<Self> {
        let key = backend.allocate(payload)?;
        Ok(Self { key, backend })
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn open(&self) -> HostResult<Box<dyn ShadowAudio>> {
        self.backend.open(&self.key)
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.backend.release(&self.key);
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle").field("key", &self.key).finish()
    }
}
