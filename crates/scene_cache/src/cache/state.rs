//! Cache coherency state machine
//!
//! ```text
//! Nominal --exhausted--> Exhausted --begin--> Resolving --ok--> Nominal
//!                            ^                    |
//!                            |                    +--fail--> Unrecoverable
//!                            +-------retry---------------------+
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

/// Coherency state of the live cache generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Live caches accept registrations
    Nominal,
    /// A loader hit capacity; a rebuild is due
    Exhausted,
    /// A rebuild is in flight
    Resolving,
    /// The last rebuild could not fit active demand
    Unrecoverable,
}

impl CacheState {
    const fn to_raw(self) -> u8 {
        match self {
            Self::Nominal => 0,
            Self::Exhausted => 1,
            Self::Resolving => 2,
            Self::Unrecoverable => 3,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Nominal,
            1 => Self::Exhausted,
            2 => Self::Resolving,
            _ => Self::Unrecoverable,
        }
    }
}

/// Atomic cell holding a [`CacheState`]; every transition is a compare-and-swap
#[derive(Debug)]
pub struct CacheStateCell {
    raw: AtomicU8,
}

impl Default for CacheStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStateCell {
    /// Cell in [`CacheState::Nominal`]
    pub const fn new() -> Self {
        Self {
            raw: AtomicU8::new(CacheState::Nominal.to_raw()),
        }
    }

    /// Current state
    pub fn get(&self) -> CacheState {
        CacheState::from_raw(self.raw.load(Ordering::Acquire))
    }

    fn transition(&self, from: CacheState, to: CacheState) -> bool {
        self.raw
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `Nominal -> Exhausted`. Signals raised in any other state are dropped.
    pub fn signal_exhausted(&self) -> bool {
        self.transition(CacheState::Nominal, CacheState::Exhausted)
    }

    /// `Exhausted -> Resolving`. Only one caller wins.
    pub fn begin_resolving(&self) -> bool {
        self.transition(CacheState::Exhausted, CacheState::Resolving)
    }

    /// `Resolving -> Nominal` after a published rebuild
    pub fn finish_resolved(&self) -> bool {
        self.transition(CacheState::Resolving, CacheState::Nominal)
    }

    /// `Resolving -> Unrecoverable` after a failed rebuild
    pub fn finish_failed(&self) -> bool {
        self.transition(CacheState::Resolving, CacheState::Unrecoverable)
    }

    /// `Resolving -> Exhausted` when a rebuild could not even be started
    pub fn abandon(&self) -> bool {
        self.transition(CacheState::Resolving, CacheState::Exhausted)
    }

    /// `Unrecoverable -> Exhausted`, allowing another rebuild
    pub fn retry(&self) -> bool {
        self.transition(CacheState::Unrecoverable, CacheState::Exhausted)
    }
}
