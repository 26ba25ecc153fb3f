// Tests for default-microphone resolution and hot-plug selection tracking.

mod common;

use std::sync::Arc;
use std::time::Duration;

use avatarlink::media::{resolve_default_device, AudioInputDevices, DeviceInfo};
use common::FakeMediaDevices;

fn device(id: &str, label: &str, group: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: id.to_string(),
        label: label.to_string(),
        group_id: group.to_string(),
    }
}

#[test]
fn test_single_group_match_is_exact_default() {
    let devices = vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic1", "USB Mic", "G1"),
        device("mic2", "Webcam Mic", "G2"),
    ];

    let resolved = resolve_default_device(&devices).expect("should resolve");
    assert_eq!(resolved.device.device_id, "mic1");
    assert!(resolved.exact, "single group match should be exact");
}

#[test]
fn test_two_group_matches_without_label_overlap_picks_first_non_exact() {
    let devices = vec![
        device("default", "Default", "G1"),
        device("mic1", "Front Mic", "G1"),
        device("mic2", "Rear Mic", "G1"),
    ];

    let resolved = resolve_default_device(&devices).expect("should resolve");
    assert_eq!(resolved.device.device_id, "mic1", "first match wins deterministically");
    assert!(!resolved.exact);
}

#[test]
fn test_label_substring_disambiguates_multiple_group_matches() {
    let devices = vec![
        device("default", "Default - Rear Mic", "G1"),
        device("mic1", "Front Mic", "G1"),
        device("mic2", "Rear Mic", "G1"),
    ];

    let resolved = resolve_default_device(&devices).expect("should resolve");
    assert_eq!(resolved.device.device_id, "mic2");
    assert!(resolved.exact);
}

#[test]
fn test_no_synthetic_entry_falls_back_to_first_concrete() {
    let devices = vec![device("mic1", "USB Mic", "G1"), device("mic2", "Other", "G2")];

    let resolved = resolve_default_device(&devices).expect("should resolve");
    assert_eq!(resolved.device.device_id, "mic1");
    assert!(!resolved.exact);
}

#[test]
fn test_no_devices_resolves_to_none() {
    assert!(resolve_default_device(&[]).is_none());
}

#[tokio::test]
async fn test_init_selects_default_and_filters_synthetic_entry() {
    let media = Arc::new(FakeMediaDevices::with_devices(vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic2", "Webcam Mic", "G2"),
        device("mic1", "USB Mic", "G1"),
    ]));
    let selection = AudioInputDevices::new(media);

    let selected = selection.init().await.unwrap();
    assert_eq!(selected.as_deref(), Some("mic1"));

    let devices = selection.devices();
    assert_eq!(devices.len(), 2, "synthetic entry must not be listed");
    assert_eq!(devices[0].device_id, "mic1", "default sorts first");
    assert!(devices[0].is_default);
    assert!(!devices[1].is_default);
}

#[tokio::test]
async fn test_explicit_selection_survives_reenumeration() {
    let media = Arc::new(FakeMediaDevices::with_devices(vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic1", "USB Mic", "G1"),
        device("mic2", "Webcam Mic", "G2"),
    ]));
    let selection = AudioInputDevices::new(media.clone());
    selection.init().await.unwrap();

    assert!(selection.select("mic2"));
    assert_eq!(selection.current().unwrap().device_id, "mic2");

    selection.start_watching();
    media.notify_devices_changed();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        selection.current().unwrap().device_id,
        "mic2",
        "explicit non-default selection must survive a device-change event"
    );
}

#[tokio::test]
async fn test_selection_falls_back_when_device_disappears() {
    let media = Arc::new(FakeMediaDevices::with_devices(vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic1", "USB Mic", "G1"),
        device("mic2", "Webcam Mic", "G2"),
    ]));
    let selection = AudioInputDevices::new(media.clone());
    selection.init().await.unwrap();
    selection.select("mic2");

    selection.start_watching();
    media.set_devices(vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic1", "USB Mic", "G1"),
    ]);
    media.notify_devices_changed();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        selection.current().unwrap().device_id,
        "mic1",
        "vanished selection falls back to the fresh default"
    );
}

#[tokio::test]
async fn test_default_selection_tracks_new_default() {
    let media = Arc::new(FakeMediaDevices::with_devices(vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic1", "USB Mic", "G1"),
    ]));
    let selection = AudioInputDevices::new(media.clone());
    selection.init().await.unwrap();
    assert_eq!(selection.current().unwrap().device_id, "mic1");

    // A new headset becomes the system default.
    selection.start_watching();
    media.set_devices(vec![
        device("default", "Default - Headset", "G9"),
        device("mic1", "USB Mic", "G1"),
        device("headset", "Headset", "G9"),
    ]);
    media.notify_devices_changed();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        selection.current().unwrap().device_id,
        "headset",
        "a default (non-explicit) selection follows the new default"
    );
}

#[tokio::test]
async fn test_select_unknown_device_is_rejected() {
    let media = Arc::new(FakeMediaDevices::with_devices(vec![
        device("default", "Default - USB Mic", "G1"),
        device("mic1", "USB Mic", "G1"),
    ]));
    let selection = AudioInputDevices::new(media);
    selection.init().await.unwrap();

    assert!(!selection.select("ghost"));
    assert_eq!(selection.current().unwrap().device_id, "mic1");
}
