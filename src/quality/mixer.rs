//! Worst-of composition over a fixed list of quality indicators.

use std::sync::{Arc, Mutex};

use super::{
    ConnectionQuality, QualityCallback, QualityCell, QualityIndicator, RoomQualityIndicator,
    RtcQualityIndicator,
};
use crate::transport::RoomConnection;

/// Builds one child indicator bound to the mixer's change callback.
pub type IndicatorFactory = Box<dyn FnOnce(QualityCallback) -> Arc<dyn QualityIndicator>>;

struct MixerCore {
    /// Latest reported value per child, by construction index.
    slots: Mutex<Vec<ConnectionQuality>>,
    cell: QualityCell,
}

impl MixerCore {
    fn child_changed(&self, index: usize, quality: ConnectionQuality) {
        let derived = {
            let mut slots = self.slots.lock().unwrap();
            slots[index] = quality;
            derive(&slots)
        };
        self.cell.update(derived);
    }

    fn reset_slots(&self) {
        let mut slots = self.slots.lock().unwrap();
        slots.fill(ConnectionQuality::Unknown);
    }
}

/// Bad wins over everything; Unknown only when nothing has reported.
fn derive(slots: &[ConnectionQuality]) -> ConnectionQuality {
    if slots.iter().any(|q| *q == ConnectionQuality::Bad) {
        return ConnectionQuality::Bad;
    }
    if slots.iter().all(|q| *q == ConnectionQuality::Unknown) {
        return ConnectionQuality::Unknown;
    }
    ConnectionQuality::Good
}

/// Composite indicator running its children together and fusing their values.
pub struct QualityMixer {
    children: Vec<Arc<dyn QualityIndicator>>,
    core: Arc<MixerCore>,
}

impl QualityMixer {
    /// The standard composition: room-level events plus peer-connection
    /// network scores.
    pub fn new(on_change: QualityCallback) -> Self {
        Self::compose(
            on_change,
            vec![
                Box::new(|cb| Arc::new(RoomQualityIndicator::new(cb)) as Arc<dyn QualityIndicator>),
                Box::new(|cb| Arc::new(RtcQualityIndicator::new(cb)) as Arc<dyn QualityIndicator>),
            ],
        )
    }

    /// Compose an arbitrary child list. Each factory receives the callback
    /// that feeds the child's transitions back into the mixer.
    pub fn compose(on_change: QualityCallback, factories: Vec<IndicatorFactory>) -> Self {
        let core = Arc::new(MixerCore {
            slots: Mutex::new(vec![ConnectionQuality::Unknown; factories.len()]),
            cell: QualityCell::new(on_change),
        });

        let children = factories
            .into_iter()
            .enumerate()
            .map(|(index, build)| {
                let core = Arc::clone(&core);
                build(Arc::new(move |quality| core.child_changed(index, quality)))
            })
            .collect();

        Self { children, core }
    }
}

impl QualityIndicator for QualityMixer {
    fn start(&self, room: &Arc<dyn RoomConnection>) {
        self.stop(true);
        for child in &self.children {
            child.start(room);
        }
    }

    fn stop(&self, muted: bool) {
        for child in &self.children {
            child.stop(true);
        }
        self.core.reset_slots();
        self.core.cell.reset(muted);
    }

    fn quality(&self) -> ConnectionQuality {
        self.core.cell.get()
    }
}
