//! Commande ECP `launch` : démarre un channel sur le Roku.

use tracing::info;

use crate::errors::EcpError;
use crate::transport::EcpTransport;

/// Envoie `POST /launch/{app_id}` à corps vide, avec `params` en query
/// string. Le Roku répond par un statut de succès sans corps ; le contenu
/// des paramètres est entièrement à la charge de l'appelant (ils sont
/// interprétés par le channel lancé, pas par le device).
pub fn launch(
    transport: &EcpTransport,
    ip: &str,
    port: u16,
    app_id: &str,
    params: &[(&str, String)],
) -> Result<(), EcpError> {
    let url = format!("http://{ip}:{port}/launch/{app_id}");
    info!("📤 ECP launch {url}");
    transport.post_empty(&url, params)
}
