//! Keypad input driver
//!
//! Maps text lines read from stdin onto logical [`InputKey`]s and forwards
//! them into the controller's merged event channel, the same channel the
//! pipeline reports status on.

use crate::config::KeyBindings;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tapdeck_common::events::{ControlEvent, InputKey};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Binding from keypad text to logical input
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<String, InputKey>,
}

impl KeyMap {
    pub fn new(bindings: &KeyBindings) -> Self {
        let bindings = [
            (&bindings.play, InputKey::Play),
            (&bindings.stop, InputKey::Stop),
            (&bindings.mode, InputKey::Mode),
            (&bindings.volume_up, InputKey::VolumeUp),
            (&bindings.volume_down, InputKey::VolumeDown),
        ]
        .into_iter()
        .map(|(text, key)| (text.trim().to_string(), key))
        .collect();
        Self { bindings }
    }

    /// Logical input for one line of keypad text
    pub fn decode(&self, line: &str) -> Option<InputKey> {
        self.bindings.get(line.trim()).copied()
    }

    /// Text bound to `key`
    pub fn binding_of(&self, key: InputKey) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, bound)| **bound == key)
            .map(|(text, _)| text.as_str())
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new(&KeyBindings::default())
    }
}

/// Forward decoded lines from `reader` until EOF or until the controller
/// stops listening
pub fn forward_keys<R: BufRead>(reader: R, keymap: &KeyMap, events: &UnboundedSender<ControlEvent>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("Keypad read failed: {}", e);
                break;
            }
        };

        let Some(key) = keymap.decode(&line) else {
            debug!("Unbound keypad input {:?}", line);
            continue;
        };

        if events.send(ControlEvent::Input(key)).is_err() {
            debug!("Controller no longer listening, keypad driver exiting");
            return;
        }
    }
    info!("Keypad input closed");
}

/// Run the stdin keypad driver on its own thread
///
/// Blocking reads stay off the async runtime so shutdown never waits on
/// the terminal.
pub fn spawn_stdin_keypad(keymap: KeyMap, events: UnboundedSender<ControlEvent>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("keypad".to_string())
        .spawn(move || forward_keys(std::io::stdin().lock(), &keymap, &events))
        .map_err(|e| Error::TaskSpawn(format!("keypad driver: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_forward_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let input: &[u8] = b"p\np\n";
        forward_keys(input, &KeyMap::default(), &tx);
        assert!(tx.is_closed());
    }

    #[test]
    fn test_default_keymap() {
        let keymap = KeyMap::default();
        assert_eq!(keymap.decode("p"), Some(InputKey::Play));
        assert_eq!(keymap.decode(" s \n"), Some(InputKey::Stop));
        assert_eq!(keymap.decode("m"), Some(InputKey::Mode));
        assert_eq!(keymap.decode("+"), Some(InputKey::VolumeUp));
        assert_eq!(keymap.decode("-"), Some(InputKey::VolumeDown));
        assert_eq!(keymap.decode("x"), None);
        assert_eq!(keymap.binding_of(InputKey::Mode), Some("m"));
    }

    #[test]
    fn test_forward_keys_skips_unbound_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"p\nhello\n+\n\ns\n";

        forward_keys(input, &KeyMap::default(), &tx);

        let mut received = Vec::new();
        while let Ok(event) = rx.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                ControlEvent::Input(InputKey::Play),
                ControlEvent::Input(InputKey::VolumeUp),
                ControlEvent::Input(InputKey::Stop),
            ]
        );
    }
}
