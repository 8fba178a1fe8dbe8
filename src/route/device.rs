//! Output device classification.

use std::fmt;

use serde::Serialize;

use crate::platform::RawOutputDevice;

/// Platform device type codes.
pub mod codes {
    pub const BUILTIN_EARPIECE: i32 = 1;
    pub const BUILTIN_SPEAKER: i32 = 2;
    pub const WIRED_HEADSET: i32 = 3;
    pub const WIRED_HEADPHONES: i32 = 4;
    pub const BLUETOOTH_SCO: i32 = 7;
    pub const BLUETOOTH_A2DP: i32 = 8;
    pub const USB_DEVICE: i32 = 11;
    pub const USB_HEADSET: i32 = 22;
}

/// Category of an audio output device.
///
/// Serializes to the display name reported over the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceCategory {
    Bluetooth,
    Speaker,
    #[serde(rename = "Wired Headset")]
    WiredHeadset,
    #[serde(rename = "Wired Headphones")]
    WiredHeadphones,
    #[serde(rename = "USB")]
    Usb,
    #[serde(rename = "USB Headset")]
    UsbHeadset,
    Earpiece,
    Unknown,
}

impl DeviceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bluetooth => "Bluetooth",
            Self::Speaker => "Speaker",
            Self::WiredHeadset => "Wired Headset",
            Self::WiredHeadphones => "Wired Headphones",
            Self::Usb => "USB",
            Self::UsbHeadset => "USB Headset",
            Self::Earpiece => "Earpiece",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a platform device type code to its category.
pub fn classify_device_type(raw_type: i32) -> DeviceCategory {
    match raw_type {
        codes::BUILTIN_EARPIECE => DeviceCategory::Earpiece,
        codes::BUILTIN_SPEAKER => DeviceCategory::Speaker,
        codes::BLUETOOTH_SCO | codes::BLUETOOTH_A2DP => DeviceCategory::Bluetooth,
        codes::WIRED_HEADSET => DeviceCategory::WiredHeadset,
        codes::WIRED_HEADPHONES => DeviceCategory::WiredHeadphones,
        codes::USB_DEVICE => DeviceCategory::Usb,
        codes::USB_HEADSET => DeviceCategory::UsbHeadset,
        _ => DeviceCategory::Unknown,
    }
}

/// A classified output device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub id: i32,
    #[serde(rename = "type")]
    pub device_type: DeviceCategory,
    pub name: String,
}

impl From<RawOutputDevice> for DeviceDescriptor {
    fn from(raw: RawOutputDevice) -> Self {
        Self {
            id: raw.id,
            device_type: classify_device_type(raw.device_type),
            name: raw.product_name,
        }
    }
}
