use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use get_if_addrs::get_if_addrs;

/// Devine l'adresse IP locale de la machine.
///
/// Crée un socket UDP lié à `0.0.0.0:0` puis demande une "connexion" vers un
/// serveur DNS public (8.8.8.8). Aucun datagramme n'est émis : le système
/// d'exploitation choisit simplement l'interface qui serait utilisée pour
/// joindre Internet, et on lit l'adresse locale du socket.
///
/// # Returns
///
/// L'adresse IP locale sous forme de `String`, ou `"127.0.0.1"` si aucune
/// interface ne peut être déterminée.
pub fn guess_local_ip() -> String {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    return local_addr.ip().to_string();
                }
            }
            "127.0.0.1".to_string()
        }
        Err(_) => "127.0.0.1".to_string(),
    }
}

/// Liste les adresses IPv4 non-loopback des interfaces réseau.
///
/// Parcourt toutes les interfaces de la machine et retourne les couples
/// `(nom d'interface, adresse IPv4)`. Les adresses de loopback et les
/// adresses IPv6 sont filtrées.
///
/// En cas d'erreur d'énumération, retourne une liste vide : l'appelant
/// traite "aucune interface" et "échec d'énumération" de la même façon.
pub fn local_ipv4_addresses() -> Vec<(String, Ipv4Addr)> {
    let mut result = Vec::new();

    if let Ok(interfaces) = get_if_addrs() {
        for iface in interfaces {
            match iface.ip() {
                IpAddr::V4(ipv4) if !ipv4.is_loopback() => {
                    result.push((iface.name, ipv4));
                }
                _ => {}
            }
        }
    }

    result
}

/// Dérive les préfixes /24 des interfaces locales, sans doublon.
///
/// Pour chaque adresse IPv4 non-loopback, on garde les trois premiers
/// octets. C'est la plage balayée par la découverte quand la recherche
/// multicast ne donne rien : une interface en `192.168.1.42` produit le
/// préfixe `[192, 168, 1]`, soit les candidats `192.168.1.1` à
/// `192.168.1.254`.
///
/// L'ordre d'apparition des interfaces est conservé.
pub fn sweep_prefixes() -> Vec<[u8; 3]> {
    prefixes_of(local_ipv4_addresses().iter().map(|(_, ip)| *ip))
}

fn prefixes_of<I>(addresses: I) -> Vec<[u8; 3]>
where
    I: Iterator<Item = Ipv4Addr>,
{
    let mut prefixes: Vec<[u8; 3]> = Vec::new();
    for ip in addresses {
        let octets = ip.octets();
        let prefix = [octets[0], octets[1], octets[2]];
        if !prefixes.contains(&prefix) {
            prefixes.push(prefix);
        }
    }
    prefixes
}
