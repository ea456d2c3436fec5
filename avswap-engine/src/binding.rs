//! Playback element binding
//!
//! Owns the single live association between the engine and one playback
//! element. Every bind gets a fresh generation number; listeners tag the
//! signals they send with it so the engine can drop anything that was queued
//! by a binding that has since been replaced.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::host::{ElementId, ElementRef, ListenerId, NodeRef, PlaybackEventKind};
use crate::locator::ElementLocator;

/// A playback event tagged with the binding that observed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSignal {
    pub generation: u64,
    pub kind: PlaybackEventKind,
}

pub type SignalSender = mpsc::UnboundedSender<PlaybackSignal>;

/// Bound element plus the exact listeners installed on it
pub struct PlaybackBinding {
    element: ElementRef,
    generation: u64,
    listeners: Vec<ListenerId>,
}

impl PlaybackBinding {
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn element_id(&self) -> ElementId {
        self.element.element_id()
    }

    fn detach(self) {
        for id in self.listeners {
            self.element.remove_listener(id);
        }
    }
}

/// Result of a bind attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// A new element was bound; `replaced` when an older binding was torn down
    Bound { generation: u64, replaced: bool },
    /// The located element is already bound
    Unchanged { generation: u64 },
    /// Nothing to bind; any existing binding is kept
    NotFound,
}

pub struct BindingManager {
    current: Option<PlaybackBinding>,
    next_generation: u64,
    signals: SignalSender,
}

impl BindingManager {
    pub fn new(signals: SignalSender) -> Self {
        Self {
            current: None,
            next_generation: 1,
            signals,
        }
    }

    /// Locate the playback element under `root` and bind to it
    pub fn bind(&mut self, root: &NodeRef) -> BindOutcome {
        match ElementLocator::locate(root) {
            Some(element) => self.bind_element(element),
            None => {
                debug!("No playback element under root; keeping current binding");
                BindOutcome::NotFound
            }
        }
    }

    /// Bind a specific element, replacing any other binding
    pub fn bind_element(&mut self, element: ElementRef) -> BindOutcome {
        let id = element.element_id();
        if let Some(current) = &self.current {
            if current.element_id() == id {
                return BindOutcome::Unchanged {
                    generation: current.generation,
                };
            }
        }

        // Old listeners must be gone before the new set is installed
        let replaced = match self.current.take() {
            Some(old) => {
                debug!(
                    element = %old.element_id(),
                    generation = old.generation,
                    "Detaching listeners from replaced element"
                );
                old.detach();
                true
            }
            None => false,
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        let listeners = PlaybackEventKind::ALL
            .iter()
            .map(|&kind| {
                let tx = self.signals.clone();
                element.add_listener(
                    kind,
                    Box::new(move || {
                        // Receiver gone means the engine shut down
                        let _ = tx.send(PlaybackSignal { generation, kind });
                    }),
                )
            })
            .collect();

        info!(element = %id, generation, replaced, "Bound playback element");

        self.current = Some(PlaybackBinding {
            element,
            generation,
            listeners,
        });

        BindOutcome::Bound {
            generation,
            replaced,
        }
    }

    /// Remove every listener and forget the element
    pub fn unbind(&mut self) -> Option<ElementRef> {
        self.current.take().map(|binding| {
            let element = binding.element.clone();
            info!(
                element = %binding.element_id(),
                generation = binding.generation,
                "Unbound playback element"
            );
            binding.detach();
            element
        })
    }

    pub fn current_element(&self) -> Option<&ElementRef> {
        self.current.as_ref().map(|b| &b.element)
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.current.as_ref().map(|b| b.generation)
    }

    /// Whether a signal from `generation` belongs to the live binding
    pub fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == Some(generation)
    }
}

impl Drop for BindingManager {
    fn drop(&mut self) {
        self.unbind();
    }
}
