use thiserror::Error;

use twcecp::EcpError;

/// Erreur terminale d'un run de découverte.
///
/// Les erreurs par candidat (transport, XML, vendor) sont absorbées par le
/// moteur et n'apparaissent jamais ici : seul l'épuisement des deux phases
/// remonte à l'appelant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no Roku device found on the local network")]
    NoDevicesFound,
}

/// Erreurs du dispatch de cast.
#[derive(Debug, Error)]
pub enum CastError {
    /// Aucune IP sélectionnée. Précondition d'appel : aucun trafic réseau
    /// n'est émis, l'issue est synchrone.
    #[error("no Roku device configured")]
    NoDeviceConfigured,

    /// Violation du contrat d'appel sur la cible.
    #[error("invalid cast target: {0}")]
    InvalidTarget(&'static str),

    /// Échec de la commande de lancement, après épuisement du retry.
    /// L'erreur portée est celle de la dernière tentative.
    #[error("launch command failed: {0}")]
    Launch(#[from] EcpError),

    #[error("cast dispatch error: {0}")]
    Dispatch(String),
}
