//! View-state reducer for the public listing.

use crate::{
    cache::{CacheLookup, PageResult, QueryKey},
    error::ClientError,
    ClientEvent,
};

/// Render phase for the currently active signature.
#[derive(Debug, Clone, Default)]
pub enum ListingPhase {
    #[default]
    Loading,
    Ready(PageResult),
    Failed(ClientError),
}

/// Folds cache events into a render phase, dropping results that answer a
/// signature the view has already moved past. This is the consumer half of
/// the ordering guarantee: a stale fetch completing late never becomes the
/// visible page.
#[derive(Debug, Clone, Default)]
pub struct ListingState {
    phase: ListingPhase,
}

impl ListingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &ListingPhase {
        &self.phase
    }

    /// Seed the phase from the lookup returned by a query-controller call.
    pub fn begin(&mut self, lookup: CacheLookup) {
        self.phase = match lookup {
            CacheLookup::Hit(result) => ListingPhase::Ready(result),
            CacheLookup::Loading => ListingPhase::Loading,
            CacheLookup::Failed(error) => ListingPhase::Failed(error),
        };
    }

    /// Fold one broadcast event in; events answering a key other than
    /// `current` are ignored.
    pub fn apply(&mut self, current: &QueryKey, event: &ClientEvent) {
        match event {
            ClientEvent::PageReady { result } if result.key == *current => {
                self.phase = ListingPhase::Ready(result.clone());
            }
            ClientEvent::PageFailed { key, error } if key == current => {
                // Data already on screen stays; the error only surfaces when
                // there is nothing to show.
                if !matches!(self.phase, ListingPhase::Ready(_)) {
                    self.phase = ListingPhase::Failed(error.clone());
                }
            }
            _ => {}
        }
    }
}
