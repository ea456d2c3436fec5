//! Fake host tree, video element and audio backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use avswap_engine::host::{
    AudioBackend, ContainerNode, ElementId, ElementRef, EventHandler, HostDocument, HostError,
    HostResult, ListenerId, NodeRef, PlaybackElement, PlaybackEventKind, ResourceKey, ShadowAudio,
};

// ============================================================================
// Tree
// ============================================================================

#[derive(Default)]
pub struct FakeNode {
    pub children: Mutex<Vec<NodeRef>>,
    pub nested: Option<NodeRef>,
    pub video: Option<ElementRef>,
    pub wrapper: bool,
}

impl FakeNode {
    pub fn container(children: Vec<NodeRef>) -> NodeRef {
        Arc::new(FakeNode {
            children: Mutex::new(children),
            ..Default::default()
        })
    }

    pub fn video(video: Arc<FakeVideo>) -> NodeRef {
        Arc::new(FakeNode {
            video: Some(video),
            ..Default::default()
        })
    }

    /// Player wrapper hosting `nested` as its opaque root
    pub fn player_wrapper(nested: NodeRef) -> NodeRef {
        Arc::new(FakeNode {
            nested: Some(nested),
            wrapper: true,
            ..Default::default()
        })
    }
}

impl ContainerNode for FakeNode {
    fn children(&self) -> Vec<NodeRef> {
        self.children.lock().unwrap().clone()
    }

    fn nested_root(&self) -> Option<NodeRef> {
        self.nested.clone()
    }

    fn playback_element(&self) -> Option<ElementRef> {
        self.video.clone()
    }

    fn is_player_wrapper(&self) -> bool {
        self.wrapper
    }
}

/// Document whose root can be swapped to simulate element replacement
pub struct FakeDocument {
    root: Mutex<NodeRef>,
}

impl FakeDocument {
    pub fn new(root: NodeRef) -> Arc<Self> {
        Arc::new(Self {
            root: Mutex::new(root),
        })
    }

    /// `<body><div><vk-video-player #shadow><video/></#shadow></vk-video-player></div></body>`
    pub fn with_video(video: Arc<FakeVideo>) -> Arc<Self> {
        Self::new(FakeNode::container(vec![FakeNode::container(vec![
            FakeNode::player_wrapper(FakeNode::container(vec![FakeNode::video(video)])),
        ])]))
    }

    pub fn empty() -> Arc<Self> {
        Self::new(FakeNode::container(vec![]))
    }

    pub fn set_root(&self, root: NodeRef) {
        *self.root.lock().unwrap() = root;
    }

    pub fn show_video(&self, video: Arc<FakeVideo>) {
        self.set_root(FakeNode::container(vec![FakeNode::video(video)]));
    }

    pub fn clear(&self) {
        self.set_root(FakeNode::container(vec![]));
    }
}

impl HostDocument for FakeDocument {
    fn root(&self) -> NodeRef {
        self.root.lock().unwrap().clone()
    }
}

// ============================================================================
// Video element
// ============================================================================

#[derive(Debug, Clone)]
pub struct VideoState {
    pub current_time: f64,
    pub paused: bool,
    pub volume: f64,
    pub rate: f64,
    pub muted: bool,
}

pub struct FakeVideo {
    id: u64,
    pub state: Mutex<VideoState>,
    listeners: Mutex<HashMap<u64, (PlaybackEventKind, Arc<EventHandler>)>>,
    next_listener: AtomicU64,
}

impl FakeVideo {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(VideoState {
                current_time: 0.0,
                paused: true,
                volume: 1.0,
                rate: 1.0,
                muted: false,
            }),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        })
    }

    /// Start playing at `time` (does not fire events)
    pub fn play_at(&self, time: f64) {
        let mut state = self.state.lock().unwrap();
        state.paused = false;
        state.current_time = time;
    }

    pub fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    pub fn set_time(&self, time: f64) {
        self.state.lock().unwrap().current_time = time;
    }

    pub fn set_volume(&self, volume: f64) {
        self.state.lock().unwrap().volume = volume;
    }

    pub fn set_rate(&self, rate: f64) {
        self.state.lock().unwrap().rate = rate;
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn listener_count_for(&self, kind: PlaybackEventKind) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Invoke every listener registered for `kind`
    pub fn fire(&self, kind: PlaybackEventKind) -> usize {
        let handlers: Vec<Arc<EventHandler>> = self
            .listeners
            .lock()
            .unwrap()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in &handlers {
            (**handler)();
        }
        handlers.len()
    }
}

impl PlaybackElement for FakeVideo {
    fn element_id(&self) -> ElementId {
        ElementId(self.id)
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().current_time
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn volume(&self) -> f64 {
        self.state.lock().unwrap().volume
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn set_muted(&self, muted: bool) -> HostResult<()> {
        self.state.lock().unwrap().muted = muted;
        Ok(())
    }

    fn add_listener(&self, kind: PlaybackEventKind, handler: EventHandler) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .insert(id, (kind, Arc::new(handler)));
        ListenerId(id)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().remove(&id.0);
    }
}

// ============================================================================
// Audio backend
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FakeAudioState {
    pub current_time: f64,
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
    pub paused: bool,
    pub play_attempts: u32,
    pub has_source: bool,
}

struct FakeAudio {
    state: Arc<Mutex<FakeAudioState>>,
    reject_play: Arc<AtomicBool>,
}

impl ShadowAudio for FakeAudio {
    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().current_time
    }

    fn set_current_time(&mut self, seconds: f64) -> HostResult<()> {
        self.state.lock().unwrap().current_time = seconds;
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.lock().unwrap().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.state.lock().unwrap().rate = rate;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn play(&mut self) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        state.play_attempts += 1;
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(HostError::new("NotAllowedError: play() requires user gesture"));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().paused = true;
    }

    fn clear_source(&mut self) {
        self.state.lock().unwrap().has_source = false;
    }
}

/// Backend tracking every allocated resource and opened audio object
#[derive(Default)]
pub struct FakeBackend {
    next_key: AtomicU64,
    live: Mutex<Vec<ResourceKey>>,
    allocations: AtomicU64,
    payload_sizes: Mutex<Vec<usize>>,
    audios: Mutex<Vec<Arc<Mutex<FakeAudioState>>>>,
    pub reject_play: Arc<AtomicBool>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resources allocated and not yet released
    pub fn live_handles(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn total_allocations(&self) -> u64 {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Size of the payload behind each allocation, in order
    pub fn payload_sizes(&self) -> Vec<usize> {
        self.payload_sizes.lock().unwrap().clone()
    }

    /// State of the most recently opened audio object
    pub fn last_audio(&self) -> Option<FakeAudioState> {
        self.audios
            .lock()
            .unwrap()
            .last()
            .map(|s| s.lock().unwrap().clone())
    }

    /// Reposition the most recently opened audio object
    pub fn set_audio_time(&self, time: f64) {
        if let Some(state) = self.audios.lock().unwrap().last() {
            state.lock().unwrap().current_time = time;
        }
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }
}

impl AudioBackend for FakeBackend {
    fn allocate(&self, payload: &[u8]) -> HostResult<ResourceKey> {
        let key = ResourceKey(format!(
            "blob:fake/{}",
            self.next_key.fetch_add(1, Ordering::SeqCst)
        ));
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.payload_sizes.lock().unwrap().push(payload.len());
        self.live.lock().unwrap().push(key.clone());
        Ok(key)
    }

    fn release(&self, key: &ResourceKey) {
        let mut live = self.live.lock().unwrap();
        let before = live.len();
        live.retain(|k| k != key);
        assert_eq!(before, live.len() + 1, "released unknown or already released {:?}", key);
    }

    fn open(&self, key: &ResourceKey) -> HostResult<Box<dyn ShadowAudio>> {
        assert!(
            self.live.lock().unwrap().contains(key),
            "opened audio on released resource"
        );
        let state = Arc::new(Mutex::new(FakeAudioState {
            current_time: 0.0,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            paused: true,
            play_attempts: 0,
            has_source: true,
        }));
        self.audios.lock().unwrap().push(state.clone());
        Ok(Box::new(FakeAudio {
            state,
            reject_play: self.reject_play.clone(),
        }))
    }
}
