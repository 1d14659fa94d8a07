use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

pub const FULL_HD: Resolution = Resolution::new(1920, 1080);

const STANDARD: [Resolution; 5] = [
    FULL_HD,
    Resolution::new(1280, 720),
    Resolution::new(800, 600),
    Resolution::new(640, 480),
    Resolution::new(320, 240),
];

const HIGH: [Resolution; 2] = [Resolution::new(3840, 2160), Resolution::new(2560, 1440)];

/// Resolutions offered in the selector, largest first.
pub fn available(enable_4k: bool) -> Vec<Resolution> {
    let mut list = Vec::with_capacity(HIGH.len() + STANDARD.len());
    if enable_4k {
        list.extend_from_slice(&HIGH);
    }
    list.extend_from_slice(&STANDARD);
    list
}

/// Keeps `current` selected after the list is rebuilt, or falls back to the
/// first entry when it is gone.
pub fn reselect(current: Resolution, list: &[Resolution]) -> Resolution {
    if list.contains(&current) {
        current
    } else {
        list.first().copied().unwrap_or_default()
    }
}
