use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, info, warn};

use crate::discovery::probe::{DeviceProber, EcpProber, ProbeTiming};
use crate::discovery::ssdp_search::{CandidateSearch, SsdpSearch};
use crate::discovery::SearchPhase;
use crate::errors::DiscoveryError;
use crate::model::{DiscoveryEvent, RokuDevice};

/// Paramètres d'un run de découverte.
///
/// Les timeouts et le port viennent de la configuration au point d'entrée ;
/// les préfixes de balayage sont injectés pour que le moteur reste testable
/// sans interface réseau réelle.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Fenêtre d'écoute des réponses M-SEARCH.
    pub ssdp_window: Duration,
    /// Timeout de la sonde d'identité pour un candidat SSDP.
    pub probe_timeout: Duration,
    /// Timeout de la sonde pendant le balayage /24.
    pub sweep_probe_timeout: Duration,
    /// Port ECP des devices.
    pub ecp_port: u16,
    /// Préfixes /24 balayés quand le SSDP ne confirme rien.
    pub sweep_prefixes: Vec<[u8; 3]>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ssdp_window: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
            sweep_probe_timeout: Duration::from_millis(50),
            ecp_port: twcecp::DEFAULT_ECP_PORT,
            sweep_prefixes: twcutils::sweep_prefixes(),
        }
    }
}

/// Un run de découverte en cours.
///
/// Le moteur tourne sur son propre thread ; les [`DiscoveryEvent`] sont lus
/// sur [`DiscoveryRun::events`]. Chaque run possède son état (candidats
/// sondés, devices confirmés) : en relancer un repart de zéro.
pub struct DiscoveryRun {
    events: Receiver<DiscoveryEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryRun {
    /// Lance un run de production : étape SSDP réelle + sonde ECP.
    ///
    /// Le socket SSDP est créé avant de démarrer le thread pour que l'échec
    /// soit visible immédiatement.
    pub fn spawn(config: DiscoveryConfig) -> std::io::Result<Self> {
        let searcher = SsdpSearch::open(config.ssdp_window)?;
        let prober = EcpProber::new(
            config.ecp_port,
            config.probe_timeout,
            config.sweep_probe_timeout,
        );
        Ok(Self::spawn_with(searcher, prober, config))
    }

    /// Lance un run avec des étapes injectées. C'est le seam de test du
    /// moteur ; `spawn` ne fait que le brancher sur les implémentations de
    /// production.
    pub fn spawn_with<S, P>(mut searcher: S, prober: P, config: DiscoveryConfig) -> Self
    where
        S: CandidateSearch + 'static,
        P: DeviceProber + 'static,
    {
        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut engine = Engine::new(prober, config, tx, stop_thread);
            engine.run(&mut searcher);
        });

        Self {
            events: rx,
            stop,
            handle: Some(handle),
        }
    }

    /// Canal des événements du run, dans l'ordre de confirmation.
    pub fn events(&self) -> &Receiver<DiscoveryEvent> {
        &self.events
    }

    /// Demande l'arrêt du run. Les sondes déjà en vol se terminent et leurs
    /// résultats sont jetés ; aucun événement terminal n'est émis.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Attend la fin du thread de découverte.
    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Engine<P: DeviceProber> {
    prober: P,
    config: DiscoveryConfig,
    events: Sender<DiscoveryEvent>,
    stop: Arc<AtomicBool>,
    phase: SearchPhase,
    probed: HashSet<Ipv4Addr>,
    confirmed: HashSet<Ipv4Addr>,
}

impl<P: DeviceProber> Engine<P> {
    fn new(
        prober: P,
        config: DiscoveryConfig,
        events: Sender<DiscoveryEvent>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            prober,
            config,
            events,
            stop,
            phase: SearchPhase::Ssdp,
            probed: HashSet::new(),
            confirmed: HashSet::new(),
        }
    }

    fn run(&mut self, searcher: &mut dyn CandidateSearch) {
        info!("🔍 Roku discovery started (SSDP phase)");

        let result = searcher.search(&mut |ip| {
            if self.stopped() {
                return false;
            }
            self.handle_candidate(ip, ProbeTiming::Normal);
            !self.stopped()
        });
        if let Err(err) = result {
            // Un socket SSDP en échec n'est pas fatal, le balayage reste possible
            warn!("SSDP search error: {err}");
        }

        if self.confirmed.is_empty() && !self.stopped() {
            self.set_phase(SearchPhase::Sweep);
            info!("🔍 No Roku confirmed by SSDP, sweeping local /24 ranges");
            self.sweep();
        }

        self.set_phase(SearchPhase::Done);

        if self.stopped() {
            debug!("Discovery run cancelled");
            return;
        }
        if self.confirmed.is_empty() {
            warn!("❌ Discovery finished without finding any Roku");
            self.emit(DiscoveryEvent::Failed(DiscoveryError::NoDevicesFound));
        } else {
            info!(
                "✅ Discovery finished: {} Roku(s) confirmed",
                self.confirmed.len()
            );
            self.emit(DiscoveryEvent::Finished {
                device_count: self.confirmed.len(),
            });
        }
    }

    fn sweep(&mut self) {
        let prefixes = self.config.sweep_prefixes.clone();
        if prefixes.is_empty() {
            warn!("No usable IPv4 interface for the sweep phase");
            return;
        }

        for prefix in prefixes {
            debug!(
                "Sweeping {}.{}.{}.1-254",
                prefix[0], prefix[1], prefix[2]
            );
            for octet in 1..=254u8 {
                if self.stopped() {
                    return;
                }
                let ip = Ipv4Addr::new(prefix[0], prefix[1], prefix[2], octet);
                self.handle_candidate(ip, ProbeTiming::Fast);
            }
        }
    }

    fn handle_candidate(&mut self, ip: Ipv4Addr, timing: ProbeTiming) {
        // Un device peut répondre plusieurs fois au M-SEARCH : un candidat
        // déjà sondé dans ce run n'est pas re-sondé
        if !self.probed.insert(ip) {
            return;
        }

        let Some(device) = self.prober.probe(ip, timing) else {
            return;
        };

        // Dédup par IP avant émission
        if self.confirmed.insert(ip) {
            self.emit(DiscoveryEvent::DeviceFound(device));
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        // Le récepteur a pu abandonner le run : dans ce cas on arrête de
        // travailler au lieu d'accumuler des résultats que personne ne lira
        if self.events.send(event).is_err() {
            self.stop.store(true, Ordering::Relaxed);
        }
    }

    fn set_phase(&mut self, next: SearchPhase) {
        debug!("Discovery phase: {:?} → {:?}", self.phase, next);
        self.phase = next;
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
        Ipv4Addr::new(a, b, c, d)
    }

    fn test_config(prefixes: Vec<[u8; 3]>) -> DiscoveryConfig {
        DiscoveryConfig {
            ssdp_window: Duration::from_millis(10),
            probe_timeout: Duration::from_millis(10),
            sweep_probe_timeout: Duration::from_millis(1),
            ecp_port: 8060,
            sweep_prefixes: prefixes,
        }
    }

    /// Étape de recherche factice : rejoue une liste de candidats.
    struct FakeSearch {
        candidates: Vec<Ipv4Addr>,
    }

    impl CandidateSearch for FakeSearch {
        fn search(
            &mut self,
            on_candidate: &mut dyn FnMut(Ipv4Addr) -> bool,
        ) -> std::io::Result<()> {
            for candidate in &self.candidates {
                if !on_candidate(*candidate) {
                    break;
                }
            }
            Ok(())
        }
    }

    /// Étape SSDP en échec (socket injoignable).
    struct FailingSearch;

    impl CandidateSearch for FailingSearch {
        fn search(
            &mut self,
            _on_candidate: &mut dyn FnMut(Ipv4Addr) -> bool,
        ) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "no multicast route",
            ))
        }
    }

    /// Étape qui produit des candidats sans fin, jusqu'à l'annulation.
    struct EndlessSearch;

    impl CandidateSearch for EndlessSearch {
        fn search(
            &mut self,
            on_candidate: &mut dyn FnMut(Ipv4Addr) -> bool,
        ) -> std::io::Result<()> {
            let mut n: u32 = u32::from(Ipv4Addr::new(10, 0, 0, 1));
            loop {
                if !on_candidate(Ipv4Addr::from(n)) {
                    return Ok(());
                }
                n = n.wrapping_add(1);
            }
        }
    }

    /// Sonde factice : confirme les adresses connues et journalise chaque
    /// sonde pour les assertions.
    struct FakeProber {
        devices: HashMap<Ipv4Addr, String>,
        log: Arc<Mutex<Vec<(Ipv4Addr, ProbeTiming)>>>,
    }

    impl FakeProber {
        fn new(devices: &[(Ipv4Addr, &str)]) -> (Self, Arc<Mutex<Vec<(Ipv4Addr, ProbeTiming)>>>) {
            let log = Arc::new(Mutex::new(Vec::new()));
            let prober = Self {
                devices: devices
                    .iter()
                    .map(|(ip, name)| (*ip, name.to_string()))
                    .collect(),
                log: Arc::clone(&log),
            };
            (prober, log)
        }
    }

    impl DeviceProber for FakeProber {
        fn probe(&self, ip: Ipv4Addr, timing: ProbeTiming) -> Option<RokuDevice> {
            self.log.lock().unwrap().push((ip, timing));
            self.devices.get(&ip).map(|name| RokuDevice {
                name: name.clone(),
                ip,
            })
        }
    }

    /// Sonde qui confirme tout (pour les tests d'annulation).
    struct ConfirmAllProber;

    impl DeviceProber for ConfirmAllProber {
        fn probe(&self, ip: Ipv4Addr, _timing: ProbeTiming) -> Option<RokuDevice> {
            Some(RokuDevice {
                name: String::new(),
                ip,
            })
        }
    }

    /// Consomme les événements jusqu'au signal terminal inclus.
    fn collect_events(run: DiscoveryRun) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        for event in run.events().iter() {
            let terminal = matches!(
                event,
                DiscoveryEvent::Finished { .. } | DiscoveryEvent::Failed(_)
            );
            events.push(event);
            if terminal {
                break;
            }
        }
        run.wait();
        events
    }

    fn found_devices(events: &[DiscoveryEvent]) -> Vec<&RokuDevice> {
        events
            .iter()
            .filter_map(|event| match event {
                DiscoveryEvent::DeviceFound(device) => Some(device),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_ssdp_device_short_circuits_the_sweep() {
        let living_room = ip(192, 168, 1, 50);
        let (prober, log) = FakeProber::new(&[(living_room, "Living Room")]);
        let search = FakeSearch {
            candidates: vec![living_room],
        };

        let run = DiscoveryRun::spawn_with(search, prober, test_config(vec![[192, 168, 1]]));
        let events = collect_events(run);

        let devices = found_devices(&events);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Living Room");
        assert_eq!(devices[0].ip, living_room);
        assert!(matches!(
            events.last(),
            Some(DiscoveryEvent::Finished { device_count: 1 })
        ));

        // Dès qu'un device est confirmé en phase SSDP, aucune sonde de
        // balayage ne doit partir
        let log = log.lock().unwrap();
        assert!(log.iter().all(|(_, timing)| *timing == ProbeTiming::Normal));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_empty_ssdp_sweeps_every_prefix_address() {
        let (prober, log) = FakeProber::new(&[]);
        let search = FakeSearch { candidates: vec![] };
        let prefixes = vec![[192, 168, 1], [10, 0, 0]];

        let run = DiscoveryRun::spawn_with(search, prober, test_config(prefixes));
        let events = collect_events(run);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            DiscoveryEvent::Failed(DiscoveryError::NoDevicesFound)
        ));

        // 254 candidats par préfixe /24 qualifiant, tous en sonde rapide
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 254 * 2);
        assert!(log.iter().all(|(_, timing)| *timing == ProbeTiming::Fast));
        let unique: HashSet<Ipv4Addr> = log.iter().map(|(ip, _)| *ip).collect();
        assert_eq!(unique.len(), 254 * 2);
    }

    #[test]
    fn test_sweep_confirms_devices() {
        let bedroom = ip(10, 0, 0, 42);
        let (prober, _log) = FakeProber::new(&[(bedroom, "Bedroom")]);
        let search = FakeSearch { candidates: vec![] };

        let run = DiscoveryRun::spawn_with(search, prober, test_config(vec![[10, 0, 0]]));
        let events = collect_events(run);

        let devices = found_devices(&events);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Bedroom");
        assert!(matches!(
            events.last(),
            Some(DiscoveryEvent::Finished { device_count: 1 })
        ));
    }

    #[test]
    fn test_duplicate_candidates_are_probed_and_emitted_once() {
        let a = ip(192, 168, 1, 50);
        let b = ip(192, 168, 1, 51);
        let (prober, log) = FakeProber::new(&[(a, "A"), (b, "B")]);
        // Un Roku répond typiquement plusieurs fois au même M-SEARCH
        let search = FakeSearch {
            candidates: vec![a, a, b, a],
        };

        let run = DiscoveryRun::spawn_with(search, prober, test_config(vec![]));
        let events = collect_events(run);

        let devices = found_devices(&events);
        let ips: Vec<Ipv4Addr> = devices.iter().map(|d| d.ip).collect();
        assert_eq!(ips, vec![a, b]);

        assert_eq!(log.lock().unwrap().len(), 2, "one probe per unique address");
    }

    #[test]
    fn test_probe_misses_do_not_abort_the_run() {
        let good = ip(192, 168, 1, 50);
        let (prober, _log) = FakeProber::new(&[(good, "Living Room")]);
        let search = FakeSearch {
            candidates: vec![ip(192, 168, 1, 10), good, ip(192, 168, 1, 99)],
        };

        let run = DiscoveryRun::spawn_with(search, prober, test_config(vec![]));
        let events = collect_events(run);

        let devices = found_devices(&events);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].ip, good);
        assert!(matches!(
            events.last(),
            Some(DiscoveryEvent::Finished { device_count: 1 })
        ));
    }

    #[test]
    fn test_devices_are_emitted_in_confirmation_order() {
        let c = ip(192, 168, 1, 30);
        let b = ip(192, 168, 1, 20);
        let a = ip(192, 168, 1, 10);
        let (prober, _log) = FakeProber::new(&[(a, "A"), (b, "B"), (c, "C")]);
        let search = FakeSearch {
            candidates: vec![c, b, a],
        };

        let run = DiscoveryRun::spawn_with(search, prober, test_config(vec![]));
        let events = collect_events(run);

        let names: Vec<&str> = found_devices(&events)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_fully_empty_run_signals_search_failed() {
        let (prober, _log) = FakeProber::new(&[]);
        let search = FakeSearch { candidates: vec![] };

        let run = DiscoveryRun::spawn_with(search, prober, test_config(vec![]));
        let events = collect_events(run);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            DiscoveryEvent::Failed(DiscoveryError::NoDevicesFound)
        ));
    }

    #[test]
    fn test_ssdp_error_falls_back_to_sweep() {
        let bedroom = ip(10, 0, 0, 42);
        let (prober, _log) = FakeProber::new(&[(bedroom, "Bedroom")]);

        let run =
            DiscoveryRun::spawn_with(FailingSearch, prober, test_config(vec![[10, 0, 0]]));
        let events = collect_events(run);

        let devices = found_devices(&events);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].ip, bedroom);
    }

    #[test]
    fn test_stop_unblocks_an_endless_search() {
        let run = DiscoveryRun::spawn_with(EndlessSearch, ConfirmAllProber, test_config(vec![]));

        // Attendre que le run produise quelque chose, puis l'annuler
        let first = run
            .events()
            .recv_timeout(Duration::from_secs(5))
            .expect("the endless search should emit at least one device");
        assert!(matches!(first, DiscoveryEvent::DeviceFound(_)));

        run.stop();
        // wait() ne rend la main que si l'annulation a bien débloqué l'étape
        run.wait();
    }
}
