//! Hotkey detection module
//!
//! On Linux, provides kernel-level key event detection using evdev, which
//! works on all Wayland compositors because it operates at the input
//! subsystem level. Requires the user to be in the 'input' group.

#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::config::HotkeySettings;
use crate::error::HotkeyError;
use tokio::sync::mpsc;

/// Events emitted by the hotkey listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The hotkey was pressed
    Pressed,
    /// The hotkey was released
    Released,
}

/// Trait for hotkey detection implementations
#[async_trait::async_trait]
pub trait HotkeyListener: Send + Sync {
    /// Start listening for hotkey events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Factory function to create the hotkey listener for this platform
#[cfg(target_os = "linux")]
pub fn create_listener(settings: &HotkeySettings) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevListener::new(settings)?))
}

/// Factory function to create the hotkey listener for this platform
#[cfg(not(target_os = "linux"))]
pub fn create_listener(_settings: &HotkeySettings) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Err(HotkeyError::NotSupported(
        "Built-in hotkey detection currently requires Linux evdev.".to_string(),
    ))
}
