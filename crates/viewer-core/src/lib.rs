//! Lazy-loading document viewer core.
//!
//! Classifies the device and network into a [`LoadProfile`], then drives a
//! [`LoadSession`] through fetch, parse, and an incrementally grown
//! [`PageWindow`]. Everything is headless; hosts render from the events.

pub mod controller;
pub mod device;
pub mod loader;
pub mod session;
pub mod transform;
pub mod viewport;
pub mod window;

pub use controller::{ViewerConfig, ViewerController, ViewerEvent, DEFAULT_MAX_AUTO_RETRIES};
pub use device::{
    classify_capability, classify_network, is_mobile_user_agent, CapabilityClass,
    ConnectionType, DeviceTier, EffectiveType, HardwareSignals, LoadProfile, NetworkClass,
    NetworkSignals,
};
pub use loader::{CacheNotice, DocumentLoader, LoadReport};
pub use session::{
    LoadError, LoadRequest, LoadSession, LoadTicket, LoadedDocument, SessionPhase, Step,
};
pub use transform::{Rotation, ViewTransform, MAX_SCALE, MIN_SCALE, ZOOM_STEP};
pub use viewport::{PageSlot, ScrollViewport};
pub use window::PageWindow;
