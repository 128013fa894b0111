//! Categorized logging for the presentation and input paths.
//!
//! The backend runs inside a per-frame / per-tic loop, so a single broken
//! device can produce an error every poll. This module sits in front of the
//! `log` facade and adds two things the facade does not have:
//!
//! - **LogCategory**: per-subsystem levels (Video, Palette, Keyboard, Mouse,
//!   Device) that fall back to a global level when unset
//! - **rate limiting**: a one-second budget per category; messages over the
//!   budget are counted and the count is reported when the next window opens
//!
//! Messages are emitted through `log::log!` with a per-category target
//! (`fbdev::video`, `fbdev::keyboard`, ...), so whichever logger the host
//! installs (the CLI uses `env_logger`) decides where they end up.
//!
//! # Usage
//!
//! ```rust
//! use fbdev_core::logging::{log, LogCategory, LogLevel};
//!
//! // The closure only runs when the category is enabled
//! log(LogCategory::Keyboard, LogLevel::Debug, || {
//!     format!("scancode 0x{:02X} released", 0x1E)
//! });
//! ```

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    const BY_VALUE: [LogLevel; 6] = [
        LogLevel::Off,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Case-insensitive name or numeric value (`"warn"`, `"2"`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(n) = s.parse::<usize>() {
            return Self::BY_VALUE.get(n).copied();
        }
        match s.as_str() {
            "off" | "none" => Some(LogLevel::Off),
            "error" | "err" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_raw(raw: u8) -> Self {
        Self::BY_VALUE
            .get(raw as usize)
            .copied()
            .unwrap_or(LogLevel::Off)
    }

    /// The matching `log` crate level, or `None` for `Off`.
    pub fn as_log_level(self) -> Option<log::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(log::Level::Error),
            LogLevel::Warn => Some(log::Level::Warn),
            LogLevel::Info => Some(log::Level::Info),
            LogLevel::Debug => Some(log::Level::Debug),
            LogLevel::Trace => Some(log::Level::Trace),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown log level `{}`", s))
    }
}

const CATEGORY_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Format negotiation, kernel selection, frame commits
    Video,
    /// Palette and gamma changes
    Palette,
    /// Keyboard reads and translation (both backends)
    Keyboard,
    /// Relative mouse motion
    Mouse,
    /// Device discovery, terminal mode changes, shutdown
    Device,
}

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Video,
        LogCategory::Palette,
        LogCategory::Keyboard,
        LogCategory::Mouse,
        LogCategory::Device,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            LogCategory::Video => "video",
            LogCategory::Palette => "palette",
            LogCategory::Keyboard => "keyboard",
            LogCategory::Mouse => "mouse",
            LogCategory::Device => "device",
        }
    }

    /// Inverse of `name`; also accepts `kbd`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        if s == "kbd" {
            return Some(LogCategory::Keyboard);
        }
        Self::ALL.into_iter().find(|c| c.name() == s)
    }

    /// `log` target used for messages in this category
    pub fn target(self) -> &'static str {
        match self {
            LogCategory::Video => "fbdev::video",
            LogCategory::Palette => "fbdev::palette",
            LogCategory::Keyboard => "fbdev::keyboard",
            LogCategory::Mouse => "fbdev::mouse",
            LogCategory::Device => "fbdev::device",
        }
    }
}

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
struct Budget {
    opened: Option<Instant>,
    used: usize,
    dropped: usize,
}

/// Fixed one-second windows, one per category.
struct RateLimiter {
    per_window: AtomicUsize,
    budgets: Mutex<[Budget; CATEGORY_COUNT]>,
}

/// Verdict for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Admission {
    allowed: bool,
    /// Messages dropped in the window that just closed
    dropped_before: usize,
}

impl RateLimiter {
    fn new(per_window: usize) -> Self {
        Self {
            per_window: AtomicUsize::new(per_window),
            budgets: Mutex::new([Budget::default(); CATEGORY_COUNT]),
        }
    }

    fn admit(&self, category: LogCategory) -> Admission {
        self.admit_at(category, Instant::now())
    }

    fn admit_at(&self, category: LogCategory, now: Instant) -> Admission {
        let limit = self.per_window.load(Ordering::Relaxed);
        let mut budgets = self
            .budgets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let budget = &mut budgets[category.index()];

        let mut dropped_before = 0;
        let expired = budget
            .opened
            .map_or(true, |opened| now.duration_since(opened) >= WINDOW);
        if expired {
            dropped_before = budget.dropped;
            *budget = Budget {
                opened: Some(now),
                used: 0,
                dropped: 0,
            };
        }

        let allowed = budget.used < limit;
        if allowed {
            budget.used += 1;
        } else {
            budget.dropped += 1;
        }
        Admission {
            allowed,
            dropped_before,
        }
    }
}

/// Process-wide levels and rate limit.
pub struct LogConfig {
    /// Slot 0 is the global level, then one per category (`Off` = unset)
    levels: [AtomicU8; CATEGORY_COUNT + 1],
    limiter: RateLimiter,
}

impl LogConfig {
    /// Global level Warn, no category overrides, 30 messages per second per category.
    fn new() -> Self {
        let config = Self {
            levels: Default::default(),
            limiter: RateLimiter::new(30),
        };
        config.set_global_level(LogLevel::Warn);
        config
    }

    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.levels[0].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_raw(self.levels[0].load(Ordering::Relaxed))
    }

    /// Override the level for one category. `Off` removes the override.
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.levels[category.index() + 1].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_raw(self.levels[category.index() + 1].load(Ordering::Relaxed))
    }

    /// The level in force for `category`: its override, else the global level
    pub fn effective_level(&self, category: LogCategory) -> LogLevel {
        match self.get_level(category) {
            LogLevel::Off => self.get_global_level(),
            level => level,
        }
    }

    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.effective_level(category)
    }

    /// Drop every override and silence the global level
    pub fn reset(&self) {
        for slot in &self.levels {
            slot.store(LogLevel::Off as u8, Ordering::Relaxed);
        }
    }

    pub fn set_rate_limit(&self, per_second: usize) {
        self.limiter.per_window.store(per_second, Ordering::Relaxed);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.limiter.per_window.load(Ordering::Relaxed)
    }
}

/// Emit a message in `category` at `level`.
///
/// `message` only runs when the category is enabled and the rate limiter
/// lets the message through. When the previous window dropped messages, a
/// summary warning goes out on the same target first.
pub fn log<F>(category: LogCategory, level: LogLevel, message: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }
    let Some(facade_level) = level.as_log_level() else {
        return;
    };

    let admission = config.limiter.admit(category);
    if admission.dropped_before > 0 {
        log::warn!(
            target: category.target(),
            "rate limit exceeded, {} message(s) dropped in the last second",
            admission.dropped_before
        );
    }
    if admission.allowed {
        log::log!(target: category.target(), facade_level, "{}", message());
    }
}
