/// Utilitaires réseau pour TwitchedCast.
///
/// Ce module fournit les fonctions d'inspection des interfaces réseau
/// locales dont le control point a besoin :
///
/// - [`guess_local_ip`] : devine l'adresse IP locale utilisée pour les connexions sortantes
/// - [`local_ipv4_addresses`] : liste les adresses IPv4 non-loopback par interface
/// - [`sweep_prefixes`] : dérive les préfixes /24 à balayer quand le SSDP ne répond pas
mod ip_utils;

pub use ip_utils::{guess_local_ip, local_ipv4_addresses, sweep_prefixes};
