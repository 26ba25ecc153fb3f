//! Quality derived from room-level events.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::{ConnectionQuality, QualityCallback, QualityCell, QualityIndicator};
use crate::transport::{RoomConnection, RoomConnectionState, RoomEvent, RoomQualityLevel};

#[derive(Debug, Default, Clone, Copy)]
struct RoomSignal {
    level: Option<RoomQualityLevel>,
    state: Option<RoomConnectionState>,
}

/// Derives quality from the room's own quality reports and connection state.
pub struct RoomQualityIndicator {
    cell: Arc<QualityCell>,
    signal: Arc<Mutex<RoomSignal>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RoomQualityIndicator {
    pub fn new(on_change: QualityCallback) -> Self {
        Self {
            cell: Arc::new(QualityCell::new(on_change)),
            signal: Arc::new(Mutex::new(RoomSignal::default())),
            task: Mutex::new(None),
        }
    }

    fn calculate(signal: &RoomSignal) -> ConnectionQuality {
        if matches!(
            signal.level,
            Some(RoomQualityLevel::Poor) | Some(RoomQualityLevel::Lost)
        ) {
            return ConnectionQuality::Bad;
        }
        if matches!(
            signal.state,
            Some(RoomConnectionState::Disconnected)
                | Some(RoomConnectionState::Reconnecting)
                | Some(RoomConnectionState::SignalReconnecting)
        ) {
            return ConnectionQuality::Bad;
        }
        ConnectionQuality::Good
    }
}

impl QualityIndicator for RoomQualityIndicator {
    fn start(&self, room: &Arc<dyn RoomConnection>) {
        self.stop(true);

        let mut events = room.subscribe();
        let cell = Arc::clone(&self.cell);
        let signal = Arc::clone(&self.signal);
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RoomEvent::QualityChanged(level)) => {
                        let snapshot = {
                            let mut signal = signal.lock().unwrap();
                            signal.level = Some(level);
                            *signal
                        };
                        cell.update(Self::calculate(&snapshot));
                    }
                    Ok(RoomEvent::StateChanged(state)) => {
                        let snapshot = {
                            let mut signal = signal.lock().unwrap();
                            signal.state = Some(state);
                            *signal
                        };
                        cell.update(Self::calculate(&snapshot));
                    }
                    Ok(_) => {}
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
        *self.signal.lock().unwrap() = RoomSignal::default();
        self.cell.reset(muted);
    }

    fn quality(&self) -> ConnectionQuality {
        self.cell.get()
    }
}
