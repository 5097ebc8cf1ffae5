//! Scénario de bout en bout contre un faux Roku HTTP local :
//! découverte (candidat SSDP simulé → sonde d'identité réelle) puis cast.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use twccontrol::{
    CandidateSearch, CastDispatcher, CastTarget, DiscoveryConfig, DiscoveryError, DiscoveryEvent,
    DiscoveryRun, EcpProber,
};
use twcecp::ssdp::SsdpResponse;

/// Démarre un faux device ECP sur 127.0.0.1.
///
/// Répond au `GET /query/device-info` avec le XML fourni et accepte les
/// `POST /launch/...`. Chaque ligne de requête reçue est enregistrée pour
/// les assertions.
fn spawn_fake_device(device_info_xml: String) -> (u16, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake device");
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let requests_thread = Arc::clone(&requests);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { return };
            let mut buf = [0u8; 2048];
            let n = stream.read(&mut buf).unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            requests_thread.lock().unwrap().push(request_line.clone());

            let response = if request_line.contains("/query/device-info") {
                format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    device_info_xml.len(),
                    device_info_xml
                )
            } else if request_line.starts_with("POST /launch/") {
                "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
            } else {
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string()
            };
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (port, requests)
}

fn roku_device_info(name: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <device-info>\
         <vendor-name>ROKU</vendor-name>\
         <model-name>Roku 3</model-name>\
         <user-device-name>{name}</user-device-name>\
         </device-info>"
    )
}

/// Étape SSDP simulée : rejoue la réponse M-SEARCH d'un device et passe au
/// moteur l'hôte extrait de son header LOCATION, comme en production.
struct ReplaySearch {
    responses: Vec<SsdpResponse>,
}

impl CandidateSearch for ReplaySearch {
    fn search(&mut self, on_candidate: &mut dyn FnMut(Ipv4Addr) -> bool) -> std::io::Result<()> {
        for response in &self.responses {
            if let Some(ip) = response.location_host() {
                if !on_candidate(ip) {
                    break;
                }
            }
        }
        Ok(())
    }
}

fn ssdp_answer(port: u16) -> SsdpResponse {
    SsdpResponse {
        location: format!("http://127.0.0.1:{port}/"),
        st: Some("roku:ecp".to_string()),
        usn: None,
        from: format!("127.0.0.1:{port}").parse().unwrap(),
    }
}

fn test_config(port: u16) -> DiscoveryConfig {
    DiscoveryConfig {
        ssdp_window: Duration::from_millis(10),
        probe_timeout: Duration::from_secs(2),
        sweep_probe_timeout: Duration::from_millis(20),
        ecp_port: port,
        sweep_prefixes: vec![],
    }
}

#[test]
fn discovery_confirms_a_simulated_roku() {
    let (port, requests) = spawn_fake_device(roku_device_info("Living Room"));

    let search = ReplaySearch {
        responses: vec![ssdp_answer(port)],
    };
    let prober = EcpProber::new(port, Duration::from_secs(2), Duration::from_millis(20));
    let run = DiscoveryRun::spawn_with(search, prober, test_config(port));

    let mut devices = Vec::new();
    for event in run.events().iter() {
        match event {
            DiscoveryEvent::DeviceFound(device) => devices.push(device),
            DiscoveryEvent::Finished { device_count } => {
                assert_eq!(device_count, 1);
                break;
            }
            DiscoveryEvent::Failed(err) => panic!("discovery failed: {err}"),
        }
    }
    run.wait();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Living Room");
    assert_eq!(devices[0].ip, Ipv4Addr::new(127, 0, 0, 1));

    let requests = requests.lock().unwrap();
    assert!(requests.iter().any(|r| r.contains("/query/device-info")));
}

#[test]
fn non_roku_vendor_is_excluded() {
    let xml = "<device-info>\
               <vendor-name>Apple</vendor-name>\
               <user-device-name>Apple TV</user-device-name>\
               </device-info>"
        .to_string();
    let (port, requests) = spawn_fake_device(xml);

    let search = ReplaySearch {
        responses: vec![ssdp_answer(port)],
    };
    let prober = EcpProber::new(port, Duration::from_secs(2), Duration::from_millis(20));
    let run = DiscoveryRun::spawn_with(search, prober, test_config(port));

    let events: Vec<DiscoveryEvent> = run.events().iter().collect();
    run.wait();

    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        DiscoveryEvent::Failed(DiscoveryError::NoDevicesFound)
    ));

    // Le device a bien été interrogé avant d'être écarté
    let requests = requests.lock().unwrap();
    assert!(requests.iter().any(|r| r.contains("/query/device-info")));
}

#[test]
fn cast_launches_the_channel_on_the_device() {
    let (port, requests) = spawn_fake_device(roku_device_info("Living Room"));

    let dispatcher = CastDispatcher::new(port, "206723");
    let handle = dispatcher
        .dispatch(
            "127.0.0.1",
            CastTarget::Stream {
                channel: "shroud".to_string(),
            },
        )
        .expect("preconditions hold");

    assert!(handle.wait().is_success());

    let requests = requests.lock().unwrap();
    let launch = requests
        .iter()
        .find(|r| r.starts_with("POST /launch/"))
        .expect("a launch request reached the device");
    assert!(
        launch.starts_with(
            "POST /launch/206723?contentId=twitch_stream_shroud&mediaType=live&time=0"
        ),
        "unexpected launch request: {launch}"
    );
}

#[test]
fn cast_resumes_a_video_at_the_given_time() {
    let (port, requests) = spawn_fake_device(roku_device_info("Living Room"));

    let dispatcher = CastDispatcher::new(port, "206723");
    let outcome = dispatcher.cast_blocking(
        "127.0.0.1",
        &CastTarget::Video {
            id: "12345".to_string(),
            time_seconds: Some(90),
        },
    );
    assert!(outcome.is_success());

    let requests = requests.lock().unwrap();
    let launch = requests
        .iter()
        .find(|r| r.starts_with("POST /launch/"))
        .expect("a launch request reached the device");
    assert!(
        launch.starts_with(
            "POST /launch/206723?contentId=twitch_video_12345&mediaType=special&time=90"
        ),
        "unexpected launch request: {launch}"
    );
}
