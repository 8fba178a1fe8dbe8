//! Audio route inspection.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::device::{DeviceCategory, DeviceDescriptor};
use crate::platform::{AudioService, Platform, PlatformCapabilities, RouteFlags};
use crate::Result;

/// Summary of the active audio route.
///
/// When the platform could not be queried, `error` is set and
/// `current_device` is `Unknown`. `flags` is kept if it was read before
/// the failure. Callers should read that as "route indeterminate", not as
/// a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    #[serde(flatten)]
    pub flags: Option<RouteFlags>,
    pub current_device: DeviceCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_devices: Option<Vec<DeviceDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RouteSummary {
    fn indeterminate(error: String) -> Self {
        Self {
            flags: None,
            current_device: DeviceCategory::Unknown,
            available_devices: None,
            error: Some(error),
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        self.error.is_some()
    }
}

/// Current device from the route flags: Bluetooth wins over the
/// speakerphone, and the earpiece is the fallback.
pub fn derive_current_device(flags: &RouteFlags) -> DeviceCategory {
    if flags.bluetooth_sco_on || flags.bluetooth_a2dp_on {
        DeviceCategory::Bluetooth
    } else if flags.speakerphone_on {
        DeviceCategory::Speaker
    } else {
        DeviceCategory::Earpiece
    }
}

/// Stateless view of the platform's audio routing. Every call re-queries
/// the audio service.
#[derive(Clone)]
pub struct AudioRouteInspector {
    platform: Arc<dyn Platform>,
    capabilities: PlatformCapabilities,
}

impl AudioRouteInspector {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        let capabilities = platform.capabilities();
        Self {
            platform,
            capabilities,
        }
    }

    /// Summarize the active route. Never fails; see [`RouteSummary`].
    pub fn current_route(&self) -> RouteSummary {
        match self.query_route() {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "audio route indeterminate");
                RouteSummary::indeterminate(e.to_string())
            }
        }
    }

    /// Output devices, or an empty list when they cannot be enumerated.
    pub fn available_devices(&self) -> Vec<DeviceDescriptor> {
        match self.query_devices() {
            Ok(devices) => devices,
            Err(e) => {
                debug!(error = %e, "no output devices listed");
                Vec::new()
            }
        }
    }

    fn query_route(&self) -> Result<RouteSummary> {
        let audio = self.platform.audio_service()?;
        let flags = audio.route_flags()?;
        let mut summary = RouteSummary {
            current_device: derive_current_device(&flags),
            flags: Some(flags),
            available_devices: None,
            error: None,
        };

        if self.capabilities.device_enumeration() {
            match enumerate(audio.as_ref()) {
                Ok(devices) => summary.available_devices = Some(devices),
                // Flags already read are kept; the device is indeterminate.
                Err(e) => {
                    warn!(error = %e, "output devices could not be listed");
                    summary.current_device = DeviceCategory::Unknown;
                    summary.error = Some(e.to_string());
                }
            }
        }

        Ok(summary)
    }

    fn query_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        self.capabilities.require_device_enumeration()?;
        let audio = self.platform.audio_service()?;
        enumerate(audio.as_ref())
    }
}

fn enumerate(audio: &dyn AudioService) -> Result<Vec<DeviceDescriptor>> {
    Ok(audio
        .output_devices()?
        .into_iter()
        .map(DeviceDescriptor::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{RawOutputDevice, SimulatedPlatform};
    use crate::route::codes;

    fn inspector_on(api_level: u32) -> (Arc<SimulatedPlatform>, AudioRouteInspector) {
        let platform = Arc::new(SimulatedPlatform::new(PlatformCapabilities::new(api_level)));
        let inspector = AudioRouteInspector::new(Arc::clone(&platform) as Arc<dyn Platform>);
        (platform, inspector)
    }

    fn flags(sco: bool, a2dp: bool, speaker: bool) -> RouteFlags {
        RouteFlags {
            bluetooth_sco_on: sco,
            bluetooth_a2dp_on: a2dp,
            speakerphone_on: speaker,
        }
    }

    #[test]
    fn test_derive_current_device() {
        assert_eq!(derive_current_device(&flags(true, false, true)), DeviceCategory::Bluetooth);
        assert_eq!(derive_current_device(&flags(false, true, false)), DeviceCategory::Bluetooth);
        assert_eq!(derive_current_device(&flags(false, false, true)), DeviceCategory::Speaker);
        assert_eq!(derive_current_device(&flags(false, false, false)), DeviceCategory::Earpiece);
    }

    #[test]
    fn test_current_route_with_devices() {
        let (platform, inspector) = inspector_on(34);
        platform.audio().set_bluetooth(true, false);
        platform.audio().set_output_devices(vec![
            RawOutputDevice::new(1, codes::BUILTIN_EARPIECE, "Pixel"),
            RawOutputDevice::new(2, codes::BUILTIN_SPEAKER, "Pixel"),
            RawOutputDevice::new(9, codes::BLUETOOTH_SCO, "Headset"),
        ]);

        let route = inspector.current_route();
        assert!(!route.is_indeterminate());
        assert_eq!(route.current_device, DeviceCategory::Bluetooth);
        assert!(route.flags.unwrap().bluetooth_sco_on);

        let devices = route.available_devices.unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[2].device_type, DeviceCategory::Bluetooth);
        assert_eq!(devices[2].name, "Headset");
    }

    #[test]
    fn test_current_route_without_enumeration() {
        let (platform, inspector) = inspector_on(21);
        platform
            .audio()
            .set_output_devices(vec![RawOutputDevice::new(1, codes::BUILTIN_EARPIECE, "")]);

        let route = inspector.current_route();
        assert_eq!(route.current_device, DeviceCategory::Earpiece);
        assert!(route.available_devices.is_none());
        assert!(route.error.is_none());
    }

    #[test]
    fn test_current_route_query_failure() {
        let (platform, inspector) = inspector_on(34);
        platform.audio().set_bluetooth(true, true);
        platform.audio().set_fail_queries(true);

        let route = inspector.current_route();
        assert!(route.is_indeterminate());
        assert_eq!(route.current_device, DeviceCategory::Unknown);
        assert!(route.flags.is_none());
        assert!(route.error.unwrap().contains("query failed"));
    }

    #[test]
    fn test_current_route_enumeration_failure_keeps_flags() {
        let (platform, inspector) = inspector_on(34);
        platform.audio().set_bluetooth(true, false);
        platform
            .audio()
            .set_output_devices(vec![RawOutputDevice::new(9, codes::BLUETOOTH_SCO, "Headset")]);
        platform.audio().set_fail_enumeration(true);

        let route = inspector.current_route();
        assert!(route.is_indeterminate());
        assert_eq!(route.current_device, DeviceCategory::Unknown);
        assert!(route.flags.unwrap().bluetooth_sco_on);
        assert!(route.available_devices.is_none());

        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["isBluetoothScoOn"], true);
        assert_eq!(json["isSpeakerphoneOn"], false);
        assert_eq!(json["currentDevice"], "Unknown");
        assert!(json["error"].as_str().unwrap().contains("device list unavailable"));
    }

    #[test]
    fn test_current_route_audio_unavailable() {
        let (platform, inspector) = inspector_on(34);
        platform.set_audio_available(false);

        let route = inspector.current_route();
        assert_eq!(route.current_device, DeviceCategory::Unknown);
        assert!(route.error.unwrap().contains("unavailable"));
    }

    #[test]
    fn test_indeterminate_serialization() {
        let route = RouteSummary::indeterminate("boom".into());
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["currentDevice"], "Unknown");
        assert_eq!(json["error"], "boom");
        assert!(json.get("isSpeakerphoneOn").is_none());
        assert!(json.get("availableDevices").is_none());
    }

    #[test]
    fn test_route_serialization() {
        let (platform, inspector) = inspector_on(34);
        platform
            .audio()
            .set_output_devices(vec![RawOutputDevice::new(2, codes::BUILTIN_SPEAKER, "Pixel")]);

        let json = serde_json::to_value(inspector.current_route()).unwrap();
        assert_eq!(json["isBluetoothScoOn"], false);
        assert_eq!(json["isBluetoothA2dpOn"], false);
        assert_eq!(json["isSpeakerphoneOn"], false);
        assert_eq!(json["currentDevice"], "Earpiece");
        assert_eq!(json["availableDevices"][0]["type"], "Speaker");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_available_devices() {
        let (platform, inspector) = inspector_on(34);
        platform.audio().set_output_devices(vec![
            RawOutputDevice::new(5, codes::WIRED_HEADPHONES, "Jack"),
            RawOutputDevice::new(6, codes::USB_HEADSET, "Dongle"),
            RawOutputDevice::new(7, 42, "Mystery"),
        ]);

        let devices = inspector.available_devices();
        let types: Vec<_> = devices.iter().map(|d| d.device_type).collect();
        assert_eq!(
            types,
            vec![
                DeviceCategory::WiredHeadphones,
                DeviceCategory::UsbHeadset,
                DeviceCategory::Unknown
            ]
        );
        assert_eq!(devices[0].id, 5);
    }

    #[test]
    fn test_available_devices_on_fault_is_empty() {
        let (platform, inspector) = inspector_on(34);
        platform
            .audio()
            .set_output_devices(vec![RawOutputDevice::new(1, codes::BUILTIN_EARPIECE, "")]);
        platform.audio().set_fail_queries(true);
        assert!(inspector.available_devices().is_empty());

        platform.audio().set_fail_queries(false);
        platform.set_audio_available(false);
        assert!(inspector.available_devices().is_empty());
    }

    #[test]
    fn test_available_devices_unsupported_platform() {
        let (platform, inspector) = inspector_on(22);
        platform
            .audio()
            .set_output_devices(vec![RawOutputDevice::new(1, codes::BUILTIN_EARPIECE, "")]);
        assert!(inspector.available_devices().is_empty());
    }
}
