//! Contrôle du volume système via `amixer` (ALSA).

use std::io;
use std::process::Command;

/// Ramène une valeur quelconque dans l'intervalle 0..=100.
pub fn clamp_volume(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Mixer ALSA adressé par le nom de son contrôle (ex: `PCM,0`, `Master`).
#[derive(Debug, Clone)]
pub struct Mixer {
    control: String,
    enabled: bool,
}

impl Mixer {
    pub fn new(control: impl Into<String>, enabled: bool) -> Self {
        Self {
            control: control.into(),
            enabled,
        }
    }

    pub fn control(&self) -> &str {
        &self.control
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Applique le volume (en pourcents) et retourne la valeur effectivement demandée.
    ///
    /// Quand le mixer est désactivé, la valeur est simplement bornée et renvoyée :
    /// cela permet de tourner sur une machine de développement sans ALSA.
    pub fn set_volume(&self, percent: i64) -> io::Result<u8> {
        let volume = clamp_volume(percent);
        if !self.enabled {
            return Ok(volume);
        }

        let output = Command::new("amixer")
            .args(["-q", "sset", &self.control, &format!("{}%", volume)])
            .output()?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "amixer sset {} failed: {}",
                self.control,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(volume)
    }

    /// Lit le volume courant du contrôle, `None` si le mixer est désactivé.
    pub fn get_volume(&self) -> io::Result<Option<u8>> {
        if !self.enabled {
            return Ok(None);
        }
        let output = Command::new("amixer")
            .args(["sget", &self.control])
            .output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "amixer sget {} failed",
                self.control
            )));
        }
        Ok(parse_amixer_percent(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Extrait le premier `[NN%]` de la sortie de `amixer sget`.
fn parse_amixer_percent(output: &str) -> Option<u8> {
    output.lines().find_map(|line| {
        let start = line.find('[')?;
        let rest = &line[start + 1..];
        let end = rest.find("%]")?;
        rest[..end].trim().parse::<i64>().ok().map(clamp_volume)
    })
}
