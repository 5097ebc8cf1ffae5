use std::fmt;
use std::net::Ipv4Addr;

use crate::errors::{CastError, DiscoveryError};

/// Un récepteur Roku confirmé par la sonde d'identité.
///
/// Invariant d'un run de découverte : une seule entrée par adresse IP.
/// `name` peut être vide, certains devices ne rapportent pas de
/// `user-device-name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RokuDevice {
    pub name: String,
    pub ip: Ipv4Addr,
}

impl fmt::Display for RokuDevice {
    // Même forme que la liste d'origine : "Living Room - 192.168.1.50"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} - {}", self.name, self.ip)
        }
    }
}

/// Contenu à lancer sur le récepteur.
///
/// Une seule variante par requête ; l'enum rend "les deux à la fois"
/// impossible à construire, et un identifiant vide est rejeté par
/// [`CastTarget::validate`] avant tout appel réseau.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastTarget {
    /// Un live : `twitch.tv/{channel}`
    Stream { channel: String },
    /// Une VOD, avec une position de reprise optionnelle en secondes
    Video { id: String, time_seconds: Option<u32> },
}

impl CastTarget {
    pub fn validate(&self) -> Result<(), CastError> {
        match self {
            CastTarget::Stream { channel } if channel.trim().is_empty() => {
                Err(CastError::InvalidTarget("empty channel name"))
            }
            CastTarget::Video { id, .. } if id.trim().is_empty() => {
                Err(CastError::InvalidTarget("empty video id"))
            }
            _ => Ok(()),
        }
    }

    /// Paramètres de lancement attendus par le channel Twitched.
    ///
    /// `time` est toujours présent, `0` en l'absence de position de reprise.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            CastTarget::Stream { channel } => vec![
                ("contentId", format!("twitch_stream_{channel}")),
                ("mediaType", "live".to_string()),
                ("time", "0".to_string()),
            ],
            CastTarget::Video { id, time_seconds } => vec![
                ("contentId", format!("twitch_video_{id}")),
                ("mediaType", "special".to_string()),
                ("time", time_seconds.unwrap_or(0).to_string()),
            ],
        }
    }
}

/// Issue terminale d'un dispatch de cast.
#[derive(Debug)]
pub enum CastOutcome {
    Success,
    Failure(CastError),
}

impl CastOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CastOutcome::Success)
    }
}

/// Événements incrémentaux d'un run de découverte.
#[derive(Debug)]
pub enum DiscoveryEvent {
    /// Un Roku vient d'être confirmé. Émis dans l'ordre de confirmation,
    /// jamais regroupé en fin de run.
    DeviceFound(RokuDevice),
    /// Fin de run avec au moins un device confirmé.
    Finished { device_count: usize },
    /// Fin de run sans aucun device : le signal "recherche échouée".
    Failed(DiscoveryError),
}
