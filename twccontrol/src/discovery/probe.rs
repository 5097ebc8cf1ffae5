use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::{debug, trace};

use twcecp::{EcpError, EcpTransport, RetryPolicy, query_device_info};

use crate::model::RokuDevice;

/// Budget temps d'une sonde d'identité.
///
/// `Normal` pour un candidat annoncé par SSDP (le device existe, il peut
/// juste être lent) ; `Fast` pour le balayage /24, où presque toutes les
/// adresses ne répondent pas et où le timeout court borne la durée totale
/// des 254 sondes par préfixe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTiming {
    Normal,
    Fast,
}

/// Sonde d'identité d'un candidat (seam injectable du moteur).
///
/// `None` couvre tous les "miss" : échec de transport, statut HTTP non-2xx,
/// XML malformé, vendor différent de ROKU. Aucune de ces erreurs ne remonte,
/// le run continue.
pub trait DeviceProber: Send + Sync {
    fn probe(&self, ip: Ipv4Addr, timing: ProbeTiming) -> Option<RokuDevice>;
}

/// Sonde de production : `GET /query/device-info` via `twcecp`.
pub struct EcpProber {
    port: u16,
    normal: EcpTransport,
    fast: EcpTransport,
}

impl EcpProber {
    /// `probe_timeout` s'applique aux candidats SSDP (avec un retry),
    /// `sweep_timeout` au balayage (sans retry).
    pub fn new(port: u16, probe_timeout: Duration, sweep_timeout: Duration) -> Self {
        Self {
            port,
            normal: EcpTransport::new(probe_timeout, RetryPolicy::PROBE),
            fast: EcpTransport::new(sweep_timeout, RetryPolicy::SWEEP),
        }
    }
}

impl DeviceProber for EcpProber {
    fn probe(&self, ip: Ipv4Addr, timing: ProbeTiming) -> Option<RokuDevice> {
        let transport = match timing {
            ProbeTiming::Normal => &self.normal,
            ProbeTiming::Fast => &self.fast,
        };

        match query_device_info(transport, ip, self.port) {
            Ok(info) => {
                debug!(
                    "✅ Roku confirmed at {}: '{}' ({})",
                    ip, info.user_device_name, info.model_name
                );
                Some(RokuDevice {
                    name: info.user_device_name,
                    ip,
                })
            }
            Err(EcpError::NotARoku(_, vendor)) => {
                // Un device a répondu mais ce n'est pas un Roku : écarté sans
                // être compté comme une erreur
                debug!("Device at {} is not a Roku (vendor: {})", ip, vendor);
                None
            }
            Err(err) => {
                trace!("Probe miss for {}: {}", ip, err);
                None
            }
        }
    }
}
