//! Connection-quality fusion.
//!
//! Each indicator derives a coarse health signal from one source; the mixer
//! composes a fixed list of indicators into a worst-of signal. Values are
//! recomputed edge-triggered on signal changes, never polled, and callbacks
//! fire only on distinct transitions.

mod mixer;
mod room;
mod rtc;

use std::sync::{Arc, Mutex};

pub use mixer::{IndicatorFactory, QualityMixer};
pub use room::RoomQualityIndicator;
pub use rtc::RtcQualityIndicator;

use crate::transport::RoomConnection;

/// Coarse connection health. Derived, never set by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionQuality {
    #[default]
    Unknown,
    Good,
    Bad,
}

/// Invoked with the new value on every distinct quality transition.
pub type QualityCallback = Arc<dyn Fn(ConnectionQuality) + Send + Sync>;

/// One source of a connection-quality signal.
///
/// `start` while already running fully stops first (muted, so no spurious
/// callback fires into a replaced context) before re-attaching.
pub trait QualityIndicator: Send + Sync {
    fn start(&self, room: &Arc<dyn RoomConnection>);

    /// Detach from the signal source and reset to `Unknown`. When `muted`,
    /// the reset does not fire the change callback.
    fn stop(&self, muted: bool);

    fn quality(&self) -> ConnectionQuality;
}

/// Shared change-detection core: holds the current value and fires the
/// callback only when a recomputed value differs.
pub(crate) struct QualityCell {
    current: Mutex<ConnectionQuality>,
    on_change: QualityCallback,
}

impl QualityCell {
    pub(crate) fn new(on_change: QualityCallback) -> Self {
        Self {
            current: Mutex::new(ConnectionQuality::Unknown),
            on_change,
        }
    }

    pub(crate) fn get(&self) -> ConnectionQuality {
        *self.current.lock().unwrap()
    }

    pub(crate) fn update(&self, quality: ConnectionQuality) {
        let changed = {
            let mut current = self.current.lock().unwrap();
            let changed = *current != quality;
            *current = quality;
            changed
        };
        if changed {
            (self.on_change)(quality);
        }
    }

    /// Reset to `Unknown`. A muted reset swallows the callback.
    pub(crate) fn reset(&self, muted: bool) {
        *self.current.lock().unwrap() = ConnectionQuality::Unknown;
        if !muted {
            (self.on_change)(ConnectionQuality::Unknown);
        }
    }
}
