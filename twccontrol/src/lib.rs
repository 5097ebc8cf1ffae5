//! # twccontrol - control point TwitchedCast
//!
//! Orchestration au-dessus du protocole `twcecp` :
//!
//! - [`discovery`] : le moteur de recherche à deux phases
//!   (SSDP multicast, puis balayage /24 en secours), avec émission
//!   incrémentale des Roku confirmés
//! - [`dispatcher`] : le dispatch d'une commande de cast, précondition
//!   vérifiée de façon synchrone et POST sur un thread dédié
//! - [`model`] : devices, cibles de cast, événements et issues
//! - [`errors`] : la taxonomie d'erreurs du control point

pub mod discovery;
pub mod dispatcher;
pub mod errors;
pub mod model;

pub use discovery::{
    CandidateSearch, DeviceProber, DiscoveryConfig, DiscoveryRun, EcpProber, ProbeTiming,
    SearchPhase, SsdpSearch,
};
pub use dispatcher::{CastDispatcher, CastHandle};
pub use errors::{CastError, DiscoveryError};
pub use model::{CastOutcome, CastTarget, DiscoveryEvent, RokuDevice};

use std::time::Duration;

pub(crate) const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(10);
