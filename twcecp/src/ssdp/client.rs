/*!
The TwitchedCast SSDP client is a pure *control point*.
It must **not** bind to UDP port 1900.

Reason:

* Only SSDP *servers* (device mode) listen on 0.0.0.0:1900 for M-SEARCH.
* A search client only needs to send M-SEARCH and receive the unicast
  HTTP/200 replies on its ephemeral source port.
* Roku receivers answer M-SEARCH directly; NOTIFY announcements are not
  needed here, so the client does not join the multicast group either.
*/
//! Client SSDP pour la recherche des récepteurs Roku

use super::{SSDP_MULTICAST_ADDR, SSDP_PORT};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Réponse unicast à un M-SEARCH.
///
/// Seul `location` est indispensable ; `st` et `usn` sont conservés pour le
/// diagnostic quand le device les fournit.
#[derive(Debug, Clone)]
pub struct SsdpResponse {
    pub location: String,
    pub st: Option<String>,
    pub usn: Option<String>,
    pub from: SocketAddr,
}

impl SsdpResponse {
    /// Extrait l'hôte IPv4 de l'URL LOCATION
    /// (`http://192.168.1.50:8060/` → `192.168.1.50`).
    pub fn location_host(&self) -> Option<Ipv4Addr> {
        let (_, rest) = self.location.split_once("://")?;
        let authority = rest.split('/').next()?;
        let host = authority.split(':').next()?;
        host.parse().ok()
    }
}

/// Client SSDP : envoie un M-SEARCH et écoute les réponses pendant une
/// fenêtre bornée.
pub struct SsdpClient {
    socket: UdpSocket,
}

impl SsdpClient {
    /// Crée un nouveau client SSDP sur un port éphémère.
    pub fn new() -> std::io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_read_timeout(Some(Duration::from_secs(1)))?;

        debug!("SSDP client bound on {}", socket.local_addr()?);

        Ok(Self { socket })
    }

    /// Envoie un M-SEARCH pour un type donné
    pub fn send_msearch(&self, st: &str, mx: u32) -> std::io::Result<()> {
        let mx = mx.max(1); // MX doit être >= 1
        let msg = format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {}:{}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: {}\r\n\
             ST: {}\r\n\
             USER-AGENT: TwitchedCast SSDP Client\r\n\
             \r\n",
            SSDP_MULTICAST_ADDR, SSDP_PORT, mx, st
        );

        let addr: SocketAddr = format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT)
            .parse()
            .unwrap();

        match self.socket.send_to(msg.as_bytes(), addr) {
            Ok(_) => {
                info!("📤 M-SEARCH sent (ST={}, MX={})", st, mx);
                Ok(())
            }
            Err(e) => {
                warn!("❌ Failed to send M-SEARCH: {}", e);
                Err(e)
            }
        }
    }

    /// Boucle de réception bornée par `window`.
    ///
    /// Chaque réponse parsable est passée à `on_response` ; la closure
    /// retourne `false` pour arrêter la recherche avant la fin de la fenêtre
    /// (annulation). L'expiration de la fenêtre est une fin de recherche
    /// normale, pas une erreur.
    pub fn run_search<F>(&self, window: Duration, mut on_response: F) -> std::io::Result<()>
    where
        F: FnMut(SsdpResponse) -> bool,
    {
        let deadline = Instant::now() + window;
        let mut buf = [0u8; 8192];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            // Timeout court pour rester réactif à l'annulation même quand
            // la fenêtre est longue
            self.socket
                .set_read_timeout(Some(remaining.min(Duration::from_secs(1))))?;

            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => {
                    let data = String::from_utf8_lossy(&buf[..n]);
                    if let Some(response) = parse_search_response(&data, from) {
                        debug!("📥 SSDP response from {}: {}", from, response.location);
                        if !on_response(response) {
                            debug!("SSDP search stopped by caller");
                            return Ok(());
                        }
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    warn!("❌ SSDP client read error: {}", e);
                    return Err(e);
                }
            }
        }

        debug!("SSDP search window elapsed");
        Ok(())
    }
}

fn parse_search_response(data: &str, from: SocketAddr) -> Option<SsdpResponse> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim();
    let upper = first_line.to_ascii_uppercase();

    if !(upper.starts_with("HTTP/") && upper.contains(" 200 ")) {
        trace!("Ignoring non-200 SSDP message from {}: {}", from, first_line);
        return None;
    }

    let headers = parse_headers(lines);

    let location = match headers.get("LOCATION") {
        Some(loc) => loc.to_string(),
        None => {
            trace!(
                "M-SEARCH response from {} missing LOCATION header, ignoring",
                from
            );
            return None;
        }
    };

    Some(SsdpResponse {
        location,
        st: headers.get("ST").cloned(),
        usn: headers.get("USN").cloned(),
        from,
    })
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();

        // Empty line marks end of headers
        if line.is_empty() {
            break;
        }

        // Split on first ':' only (values may contain ':')
        if let Some(colon_pos) = line.find(':') {
            let (name, value_with_colon) = line.split_at(colon_pos);
            let value = &value_with_colon[1..]; // Skip the ':'

            let name = name.trim().to_ascii_uppercase();
            let value = value.trim().to_string();

            if !name.is_empty() && !value.is_empty() {
                headers.insert(name, value);
            } else {
                trace!("Skipping malformed header: '{}'", line);
            }
        } else {
            trace!("Skipping line without colon: '{}'", line);
        }
    }
    headers
}
