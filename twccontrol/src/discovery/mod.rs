//! # Moteur de découverte des Roku
//!
//! Recherche à deux phases, la moins chère d'abord :
//!
//! - ✅ **SSDP** : un M-SEARCH multicast (`ST: roku:ecp`), fenêtre d'écoute
//!   bornée, chaque réponse sondée dès son arrivée
//! - ✅ **Balayage /24** : uniquement si le SSDP n'a rien confirmé, tous les
//!   octets 1-254 des préfixes locaux, avec un timeout de sonde agressif
//! - ✅ **Sonde d'identité** partagée : `GET /query/device-info`, le device
//!   n'est retenu que si `vendor-name` vaut `ROKU`
//!
//! Le pipeline est une machine à états explicite
//! ([`SearchPhase`]`::Ssdp → Sweep → Done`) ; les deux étapes sont des seams
//! injectables ([`CandidateSearch`], [`DeviceProber`]) pour pouvoir tester le
//! moteur sans réseau. Les résultats sont émis au fil de l'eau sur un canal,
//! dédupliqués par IP, et chaque run possède son propre état : rien n'est
//! réutilisé d'un run à l'autre.

mod engine;
mod probe;
mod ssdp_search;

pub use engine::{DiscoveryConfig, DiscoveryRun};
pub use probe::{DeviceProber, EcpProber, ProbeTiming};
pub use ssdp_search::{CandidateSearch, SsdpSearch};

/// Phase courante d'un run de découverte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Ssdp,
    Sweep,
    Done,
}
