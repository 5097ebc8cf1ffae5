//! Dispatch d'une commande de cast vers un Roku.
//!
//! Le dispatcher traduit une [`CastTarget`] en commande de lancement ECP et
//! rapporte une issue terminale unique. Le POST part d'un thread dédié : le
//! flux appelant n'est jamais bloqué pendant connect + retry.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use tracing::{info, warn};

use twcecp::{EcpTransport, RetryPolicy};

use crate::errors::CastError;
use crate::model::{CastOutcome, CastTarget};

#[derive(Debug, Clone)]
pub struct CastDispatcher {
    port: u16,
    app_id: String,
    timeout: Duration,
}

impl CastDispatcher {
    /// `app_id` est l'identifiant du channel récepteur : une valeur de
    /// configuration opaque, jamais dérivée.
    pub fn new(port: u16, app_id: impl Into<String>) -> Self {
        Self {
            port,
            app_id: app_id.into(),
            timeout: crate::DEFAULT_LAUNCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lance le cast sur un thread dédié.
    ///
    /// Les préconditions (IP configurée, cible valide) sont vérifiées de
    /// façon synchrone et sans le moindre appel réseau ; l'issue du POST se
    /// lit sur le [`CastHandle`].
    pub fn dispatch(&self, ip: &str, target: CastTarget) -> Result<CastHandle, CastError> {
        if ip.trim().is_empty() {
            return Err(CastError::NoDeviceConfigured);
        }
        target.validate()?;

        let (tx, rx) = bounded(1);
        let dispatcher = self.clone();
        let ip = ip.to_string();
        thread::spawn(move || {
            let _ = tx.send(dispatcher.cast_blocking(&ip, &target));
        });

        Ok(CastHandle { outcome: rx })
    }

    /// Variante bloquante, utilisée par le thread de dispatch et par les
    /// tests.
    pub fn cast_blocking(&self, ip: &str, target: &CastTarget) -> CastOutcome {
        if ip.trim().is_empty() {
            return CastOutcome::Failure(CastError::NoDeviceConfigured);
        }
        if let Err(err) = target.validate() {
            return CastOutcome::Failure(err);
        }

        // Un retry puis terminé : une cible injoignable ne doit jamais
        // suspendre l'appelant au-delà de deux timeouts
        let transport = EcpTransport::new(self.timeout, RetryPolicy::LAUNCH);
        match twcecp::launch(
            &transport,
            ip,
            self.port,
            &self.app_id,
            &target.query_params(),
        ) {
            Ok(()) => {
                info!("✅ Cast accepted by {ip}");
                CastOutcome::Success
            }
            Err(err) => {
                warn!("❌ Cast to {ip} failed: {err}");
                CastOutcome::Failure(CastError::Launch(err))
            }
        }
    }
}

/// Issue différée d'un dispatch.
pub struct CastHandle {
    outcome: Receiver<CastOutcome>,
}

impl CastHandle {
    /// Attend l'issue terminale du dispatch.
    pub fn wait(self) -> CastOutcome {
        self.outcome.recv().unwrap_or_else(|_| {
            CastOutcome::Failure(CastError::Dispatch(
                "cast worker exited without reporting an outcome".to_string(),
            ))
        })
    }

    /// Canal brut, pour les appelants qui multiplexent plusieurs attentes.
    pub fn outcome(&self) -> &Receiver<CastOutcome> {
        &self.outcome
    }
}
