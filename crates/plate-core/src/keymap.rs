use std::fmt;
use std::str::FromStr;

use crate::core::Editor;
use crate::plugin::CommandError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Keystroke {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub cmd: bool,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeystrokeParseError {
    #[error("empty keystroke")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
}

impl FromStr for Keystroke {
    type Err = KeystrokeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (modifiers, key) = match s.strip_suffix("--") {
            Some(rest) => (rest, "-"),
            None if s == "-" => ("", "-"),
            None => match s.rsplit_once('-') {
                Some((modifiers, key)) => (modifiers, key),
                None => ("", s),
            },
        };
        if key.is_empty() {
            return Err(KeystrokeParseError::Empty);
        }

        let mut keystroke = Keystroke {
            key: key.to_lowercase(),
            ..Keystroke::default()
        };
        for modifier in modifiers.split('-').filter(|m| !m.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => keystroke.ctrl = true,
                "alt" | "option" => keystroke.alt = true,
                "shift" => keystroke.shift = true,
                "cmd" | "meta" | "super" => keystroke.cmd = true,
                _ => return Err(KeystrokeParseError::UnknownModifier(modifier.to_string())),
            }
        }
        Ok(keystroke)
    }
}

impl fmt::Display for Keystroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, name) in [
            (self.ctrl, "ctrl"),
            (self.alt, "alt"),
            (self.shift, "shift"),
            (self.cmd, "cmd"),
        ] {
            if on {
                write!(f, "{name}-")?;
            }
        }
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub keystroke: Keystroke,
    pub command: String,
}

impl KeyBinding {
    pub fn new(keystroke: &str, command: impl Into<String>) -> Self {
        let keystroke = keystroke
            .parse()
            .unwrap_or_else(|err| panic!("invalid key binding `{keystroke}`: {err}"));
        Self {
            keystroke,
            command: command.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Keymap {
    pub fn extend(&mut self, bindings: impl IntoIterator<Item = KeyBinding>) {
        self.bindings.extend(bindings);
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn command_for(&self, keystroke: &Keystroke) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|binding| &binding.keystroke == keystroke)
            .map(|binding| binding.command.as_str())
    }
}

impl Editor {
    pub fn handle_keystroke(&mut self, keystroke: &Keystroke) -> Result<bool, CommandError> {
        let Some(command) = self.registry().keymap().command_for(keystroke) else {
            return Ok(false);
        };
        let command = command.to_string();
        tracing::debug!(%keystroke, command = %command, "key binding matched");
        self.run_command(&command, None)?;
        Ok(true)
    }
}
