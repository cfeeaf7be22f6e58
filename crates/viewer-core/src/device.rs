//! Device and network classification feeding the load strategy.
//!
//! Every function here is pure: callers gather the signals once and memoize
//! the resulting [`LoadProfile`] for the lifetime of their session.

use std::time::Duration;

/// Layout class derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceTier {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceTier {
    pub fn from_viewport_width(width_px: u32) -> Self {
        match width_px {
            0..=768 => Self::Mobile,
            769..=1024 => Self::Tablet,
            _ => Self::Desktop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityClass {
    HighPerformance,
    Standard,
}

/// Hardware signals; `None` means the platform did not report the value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HardwareSignals {
    pub logical_cores: Option<u32>,
    pub memory_gb: Option<f32>,
    pub mobile: bool,
}

const DEFAULT_MEMORY_GB: f32 = 4.0;

pub fn classify_capability(signals: &HardwareSignals) -> CapabilityClass {
    let cores = signals.logical_cores.unwrap_or(0);
    let memory = signals.memory_gb.unwrap_or(DEFAULT_MEMORY_GB);

    let high = if signals.mobile {
        cores >= 6 && memory >= 2.0
    } else {
        cores >= 4 && memory >= 4.0
    };

    if high {
        CapabilityClass::HighPerformance
    } else {
        CapabilityClass::Standard
    }
}

const MOBILE_UA_MARKERS: [&str; 8] =
    ["android", "webos", "iphone", "ipad", "ipod", "blackberry", "iemobile", "opera mini"];

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    MOBILE_UA_MARKERS.iter().any(|marker| user_agent.contains(marker))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkClass {
    Fast,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Cellular,
    Wifi,
    Ethernet,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSignals {
    pub connection: ConnectionType,
    pub effective: EffectiveType,
}

/// Only cellular links with a 2G-class effective type count as slow.
pub fn classify_network(signals: Option<&NetworkSignals>) -> NetworkClass {
    match signals {
        Some(NetworkSignals {
            connection: ConnectionType::Cellular,
            effective: EffectiveType::Slow2g | EffectiveType::TwoG,
        }) => NetworkClass::Slow,
        _ => NetworkClass::Fast,
    }
}

/// Tunables for one viewing session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProfile {
    pub tier: DeviceTier,
    pub capability: CapabilityClass,
    pub network: NetworkClass,
    /// Pages mounted ahead of the start page.
    pub lookahead: u32,
    /// Pages added each time the scroll threshold is crossed.
    pub batch: u32,
    /// Fraction of content height at which the window grows.
    pub scroll_threshold: f32,
    /// Radius of the window materialised around a jump target.
    pub jump_radius: u32,
    pub load_timeout: Duration,
    pub initial_scale: f32,
}

impl LoadProfile {
    pub fn new(tier: DeviceTier, capability: CapabilityClass, network: NetworkClass) -> Self {
        let (lookahead, batch, scroll_threshold, jump_radius, timeout_secs, initial_scale) =
            match tier {
                DeviceTier::Mobile => (3, 2, 0.8, 1, 20, 0.7),
                DeviceTier::Tablet => (5, 3, 0.85, 2, 20, 0.9),
                DeviceTier::Desktop => (7, 5, 0.9, 2, 10, 1.2),
            };

        Self {
            tier,
            capability,
            network,
            lookahead,
            batch,
            scroll_threshold,
            jump_radius,
            load_timeout: Duration::from_secs(timeout_secs),
            initial_scale,
        }
    }

    /// Whether every page is mounted as soon as the document parses.
    pub fn eager(&self) -> bool {
        self.capability == CapabilityClass::HighPerformance && self.network == NetworkClass::Fast
    }
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self::new(DeviceTier::Desktop, CapabilityClass::Standard, NetworkClass::Fast)
    }
}
