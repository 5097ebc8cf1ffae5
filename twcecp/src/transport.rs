//! Transport HTTP partagé du protocole ECP.
//!
//! La sonde d'identité (`GET /query/device-info`) et la commande de lancement
//! (`POST /launch/{app_id}`) ont exactement la même forme : une requête HTTP
//! avec un timeout global et un budget de retry borné. [`EcpTransport`]
//! factorise cette forme, paramétrée par une [`RetryPolicy`].

use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::errors::EcpError;

/// Budget de retry d'une requête ECP.
///
/// `attempts` est le nombre total de tentatives (jamais plus de 2 : une
/// requête plus au plus un retry). `retry_on_status` contrôle si un statut
/// HTTP non-2xx consomme le retry ; c'est le cas pour le lancement, pas pour
/// la sonde d'identité où un statut d'erreur est un simple "miss".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub retry_on_status: bool,
}

impl RetryPolicy {
    /// Sonde d'identité sur candidat SSDP : un retry sur échec de transport.
    pub const PROBE: RetryPolicy = RetryPolicy {
        attempts: 2,
        retry_on_status: false,
    };

    /// Sonde d'identité en balayage /24 : aucune seconde chance, la plage
    /// entière doit rester bornée dans le temps.
    pub const SWEEP: RetryPolicy = RetryPolicy {
        attempts: 1,
        retry_on_status: false,
    };

    /// Commande de lancement : un retry, y compris sur statut non-2xx.
    pub const LAUNCH: RetryPolicy = RetryPolicy {
        attempts: 2,
        retry_on_status: true,
    };

    fn should_retry(&self, err: &ureq::Error) -> bool {
        match err {
            ureq::Error::StatusCode(_) => self.retry_on_status,
            _ => true,
        }
    }
}

/// Client HTTP minimal pour le port ECP d'un Roku.
#[derive(Debug, Clone)]
pub struct EcpTransport {
    timeout: Duration,
    retry: RetryPolicy,
}

impl EcpTransport {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    fn agent(&self) -> Agent {
        let config = Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        config.into()
    }

    /// GET avec retry, corps retourné sous forme de String.
    pub fn get_string(&self, url: &str) -> Result<String, EcpError> {
        let agent = self.agent();
        self.with_retry(url, || {
            let mut response = agent.get(url).call()?;
            let body = response.body_mut().read_to_string()?;
            Ok(body)
        })
    }

    /// POST à corps vide, avec les paires `query` encodées dans l'URL.
    pub fn post_empty(&self, url: &str, query: &[(&str, String)]) -> Result<(), EcpError> {
        let full_url = url::Url::parse_with_params(url, query)?;
        let agent = self.agent();
        self.with_retry(full_url.as_str(), || {
            agent.post(full_url.as_str()).send_empty()?;
            Ok(())
        })
    }

    fn with_retry<T>(
        &self,
        url: &str,
        mut request: impl FnMut() -> Result<T, ureq::Error>,
    ) -> Result<T, EcpError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match request() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt < self.retry.attempts && self.retry.should_retry(&err) {
                        debug!(
                            "ECP request to {url} failed (attempt {attempt}/{}), retrying: {err}",
                            self.retry.attempts
                        );
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}
