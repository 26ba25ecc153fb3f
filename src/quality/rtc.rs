//! Quality derived from peer-connection network scores.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::{ConnectionQuality, QualityCallback, QualityCell, QualityIndicator};
use crate::transport::{NetworkScores, RoomConnection};

/// Scores below this MOS-like threshold mark the connection bad.
const BAD_SCORE_THRESHOLD: f64 = 3.0;

/// Derives quality from aggregated inbound/outbound network scores.
pub struct RtcQualityIndicator {
    cell: Arc<QualityCell>,
    scores: Arc<Mutex<Option<NetworkScores>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RtcQualityIndicator {
    pub fn new(on_change: QualityCallback) -> Self {
        Self {
            cell: Arc::new(QualityCell::new(on_change)),
            scores: Arc::new(Mutex::new(None)),
            task: Mutex::new(None),
        }
    }

    fn calculate(scores: &Option<NetworkScores>) -> ConnectionQuality {
        let Some(scores) = scores else {
            return ConnectionQuality::Unknown;
        };
        if scores.inbound.is_none() && scores.outbound.is_none() {
            return ConnectionQuality::Unknown;
        }
        let bad = |score: Option<f64>| score.is_some_and(|s| s < BAD_SCORE_THRESHOLD);
        if bad(scores.inbound) || bad(scores.outbound) {
            return ConnectionQuality::Bad;
        }
        ConnectionQuality::Good
    }
}

impl QualityIndicator for RtcQualityIndicator {
    fn start(&self, room: &Arc<dyn RoomConnection>) {
        self.stop(true);

        let mut samples = room.subscribe_stats();
        let cell = Arc::clone(&self.cell);
        let scores = Arc::clone(&self.scores);
        let task = tokio::spawn(async move {
            loop {
                match samples.recv().await {
                    Ok(sample) => {
                        let snapshot = {
                            let mut scores = scores.lock().unwrap();
                            *scores = Some(sample);
                            *scores
                        };
                        cell.update(Self::calculate(&snapshot));
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *self.task.lock().unwrap() = Some(task);
    }

    fn stop(&self, muted: bool) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
        *self.scores.lock().unwrap() = None;
        self.cell.reset(muted);
    }

    fn quality(&self) -> ConnectionQuality {
        self.cell.get()
    }
}
