//! Audio input device enumeration and default-microphone resolution.
//!
//! Environments expose a synthetic "default" device entry alongside the
//! concrete devices. Resolution maps that entry back to the concrete device it
//! aliases: devices sharing its hardware group are candidates, a single
//! candidate is the exact default, multiple candidates are disambiguated by
//! label containment, and anything else is a best-effort first pick.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::MediaDevices;
use crate::error::MediaError;

/// Identifier of the synthetic default device entry.
pub const DEFAULT_DEVICE_ID: &str = "default";

/// One enumerated audio input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: String,
    pub label: String,
    pub group_id: String,
}

/// A concrete device resolved as the environment default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub device: DeviceInfo,
    /// Whether the device is known to be the default, rather than a
    /// best-effort first match.
    pub exact: bool,
}

/// A device as exposed to selection logic, with its resolved default flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInputDevice {
    pub device_id: String,
    pub label: String,
    pub group_id: String,
    pub is_default: bool,
}

/// Resolve the concrete device behind the synthetic "default" entry.
pub fn resolve_default_device(devices: &[DeviceInfo]) -> Option<ResolvedDevice> {
    let first_concrete = devices.iter().find(|d| d.device_id != DEFAULT_DEVICE_ID);

    let Some(default_entry) = devices.iter().find(|d| d.device_id == DEFAULT_DEVICE_ID) else {
        return first_concrete.map(|d| ResolvedDevice {
            device: d.clone(),
            exact: false,
        });
    };

    let group_matches: Vec<&DeviceInfo> = devices
        .iter()
        .filter(|d| d.device_id != DEFAULT_DEVICE_ID && d.group_id == default_entry.group_id)
        .collect();

    if group_matches.is_empty() {
        return first_concrete.map(|d| ResolvedDevice {
            device: d.clone(),
            exact: false,
        });
    }
    if group_matches.len() == 1 {
        return Some(ResolvedDevice {
            device: group_matches[0].clone(),
            exact: true,
        });
    }

    // The synthetic entry's label usually embeds the concrete device's label
    // ("Default - USB Mic"); use containment to disambiguate.
    let label_matches: Vec<&&DeviceInfo> = group_matches
        .iter()
        .filter(|d| !default_entry.label.is_empty() && default_entry.label.contains(&d.label))
        .collect();

    match label_matches.len() {
        0 => Some(ResolvedDevice {
            device: group_matches[0].clone(),
            exact: false,
        }),
        1 => Some(ResolvedDevice {
            device: (*label_matches[0]).clone(),
            exact: true,
        }),
        _ => Some(ResolvedDevice {
            device: (*label_matches[0]).clone(),
            exact: false,
        }),
    }
}

/// Devices with the synthetic entry filtered out, defaults sorted first, and
/// the resolved default alongside.
fn snapshot(devices: &[DeviceInfo]) -> (Vec<AudioInputDevice>, Option<AudioInputDevice>) {
    let resolved = resolve_default_device(devices);

    let mut list: Vec<AudioInputDevice> = devices
        .iter()
        .filter(|d| d.device_id != DEFAULT_DEVICE_ID)
        .map(|d| AudioInputDevice {
            device_id: d.device_id.clone(),
            label: d.label.clone(),
            group_id: d.group_id.clone(),
            is_default: resolved
                .as_ref()
                .map(|r| r.exact && r.device.device_id == d.device_id)
                .unwrap_or(false),
        })
        .collect();
    list.sort_by_key(|d| !d.is_default);

    let default = resolved.map(|r| AudioInputDevice {
        device_id: r.device.device_id,
        label: r.device.label,
        group_id: r.device.group_id,
        is_default: r.exact,
    });

    (list, default)
}

/// Keep an explicit non-default selection across re-enumeration unless the
/// device disappeared; otherwise fall back to the freshly resolved default.
fn maybe_change_selection(
    previous: Option<AudioInputDevice>,
    new_default: Option<AudioInputDevice>,
    devices: &[AudioInputDevice],
) -> Option<AudioInputDevice> {
    match previous {
        Some(prev)
            if !prev.is_default && devices.iter().any(|d| d.device_id == prev.device_id) =>
        {
            Some(prev)
        }
        _ => new_default,
    }
}

#[derive(Default)]
struct SelectionState {
    devices: Vec<AudioInputDevice>,
    current: Option<AudioInputDevice>,
}

/// Tracks the microphone selection across device hot-plug events.
pub struct AudioInputDevices {
    media: Arc<dyn MediaDevices>,
    state: Arc<Mutex<SelectionState>>,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl AudioInputDevices {
    pub fn new(media: Arc<dyn MediaDevices>) -> Self {
        Self {
            media,
            state: Arc::new(Mutex::new(SelectionState::default())),
            watch_task: Mutex::new(None),
        }
    }

    /// Enumerate devices and resolve the initial selection. Returns the
    /// selected device id, if any device is present.
    pub async fn init(&self) -> Result<Option<String>, MediaError> {
        let devices = self.media.enumerate_devices().await?;
        Self::apply(&self.state, &devices);
        Ok(self
            .state
            .lock()
            .unwrap()
            .current
            .as_ref()
            .map(|d| d.device_id.clone()))
    }

    /// Begin re-resolving on every device-change notification.
    pub fn start_watching(&self) {
        let mut task = self.watch_task.lock().unwrap();
        if task.is_some() {
            return;
        }
        let mut changes = self.media.subscribe_device_changes();
        let media = Arc::clone(&self.media);
        let state = Arc::clone(&self.state);
        *task = Some(tokio::spawn(async move {
            while changes.recv().await.is_ok() {
                match media.enumerate_devices().await {
                    Ok(devices) => Self::apply(&state, &devices),
                    Err(e) => warn!("Device re-enumeration failed: {}", e),
                }
            }
        }));
    }

    pub fn stop_watching(&self) {
        if let Some(task) = self.watch_task.lock().unwrap().take() {
            task.abort();
        }
    }

    /// All concrete input devices, defaults first.
    pub fn devices(&self) -> Vec<AudioInputDevice> {
        self.state.lock().unwrap().devices.clone()
    }

    /// The current selection.
    pub fn current(&self) -> Option<AudioInputDevice> {
        self.state.lock().unwrap().current.clone()
    }

    /// Explicitly select a device by id. Returns false when the id is not in
    /// the current enumeration.
    pub fn select(&self, device_id: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.devices.iter().find(|d| d.device_id == device_id) {
            Some(device) => {
                state.current = Some(device.clone());
                true
            }
            None => {
                debug!("Ignoring selection of unknown device {}", device_id);
                false
            }
        }
    }

    fn apply(state: &Mutex<SelectionState>, devices: &[DeviceInfo]) {
        let (list, default) = snapshot(devices);
        let mut state = state.lock().unwrap();
        state.current = maybe_change_selection(state.current.take(), default, &list);
        state.devices = list;
    }
}

impl Drop for AudioInputDevices {
    fn drop(&mut self) {
        self.stop_watching();
    }
}
