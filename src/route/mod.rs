//! Audio route inspection module.
//!
//! Classifies the platform's output devices and summarizes which route is
//! currently carrying call audio.

mod device;
mod inspector;

pub use device::{classify_device_type, codes, DeviceCategory, DeviceDescriptor};
pub use inspector::{derive_current_device, AudioRouteInspector, RouteSummary};
