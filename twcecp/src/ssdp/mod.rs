//! # Module SSDP - recherche des récepteurs Roku
//!
//! Implémente la moitié *control point* du protocole SSDP : envoi d'un
//! M-SEARCH multicast et collecte des réponses unicast des Roku.
//!
//! ## Fonctionnalités
//!
//! - ✅ Envoi de M-SEARCH pour le service `roku:ecp`
//! - ✅ Fenêtre d'écoute bornée (le timeout est une fin de recherche, pas une erreur)
//! - ✅ Extraction de l'hôte IPv4 du header LOCATION
//! - ✅ Les datagrammes malformés sont ignorés silencieusement
//!
//! ## Constantes SSDP
//!
//! - **Adresse multicast** : 239.255.255.250:1900
//! - **Search target Roku** : `roku:ecp`

mod client;

pub use client::{SsdpClient, SsdpResponse};

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// Search target annoncé par les récepteurs Roku
pub const ROKU_SEARCH_TARGET: &str = "roku:ecp";
