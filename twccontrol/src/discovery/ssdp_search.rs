use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::trace;

use twcecp::ssdp::{ROKU_SEARCH_TARGET, SsdpClient};

/// Étape de recherche de candidats (la première phase du moteur).
///
/// L'implémentation appelle `on_candidate` pour chaque adresse trouvée, dans
/// l'ordre d'arrivée ; la closure retourne `false` pour interrompre la
/// recherche (annulation). Les erreurs de l'étape ne condamnent pas le run :
/// le moteur les journalise et passe au balayage.
pub trait CandidateSearch: Send {
    fn search(
        &mut self,
        on_candidate: &mut dyn FnMut(Ipv4Addr) -> bool,
    ) -> std::io::Result<()>;
}

/// Étape SSDP de production, adossée au client `twcecp`.
pub struct SsdpSearch {
    client: SsdpClient,
    window: Duration,
}

impl SsdpSearch {
    /// Ouvre le socket immédiatement : un échec de création est visible au
    /// lancement du run, pas au milieu de la recherche.
    pub fn open(window: Duration) -> std::io::Result<Self> {
        Ok(Self {
            client: SsdpClient::new()?,
            window,
        })
    }
}

impl CandidateSearch for SsdpSearch {
    fn search(
        &mut self,
        on_candidate: &mut dyn FnMut(Ipv4Addr) -> bool,
    ) -> std::io::Result<()> {
        self.client.send_msearch(ROKU_SEARCH_TARGET, 3)?;
        self.client
            .run_search(self.window, |response| match response.location_host() {
                Some(ip) => on_candidate(ip),
                None => {
                    trace!(
                        "SSDP response without an IPv4 LOCATION host, ignoring: {}",
                        response.location
                    );
                    true
                }
            })
    }
}
