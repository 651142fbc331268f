//! Colon-separated `key:value` files.
//!
//! Used for the registry config and for remote diary metadata. Lines are
//! split on the first colon so values may contain colons (URLs do). Key order
//! is preserved on rewrite.

use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueFile {
    entries: Vec<(String, String)>,
}

impl KeyValueFile {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut file = Self::default();
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| format!("line {} has no ':' separator", index + 1))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("line {} has an empty key", index + 1));
            }
            file.set(key, value.trim());
        }
        Ok(file)
    }

    pub fn read(path: &Path) -> std::io::Result<Result<Self, String>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::parse(&raw))
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.entries.iter_mut().find(|(candidate, _)| candidate == key) {
            slot.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}:{value}\n"))
            .collect()
    }
}
