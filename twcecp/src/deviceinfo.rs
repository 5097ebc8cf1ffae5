//! Sonde d'identité ECP : `GET /query/device-info`.
//!
//! Tous les devices qui écoutent sur le port ECP ne sont pas des Roku ; la
//! sonde confirme le vendor et récupère le nom d'affichage choisi par
//! l'utilisateur.

use quick_xml::{Error as XmlError, Reader, events::Event};
use std::net::Ipv4Addr;
use tracing::debug;

use crate::errors::EcpError;
use crate::transport::EcpTransport;

/// Champs utiles de la réponse `<device-info>`.
///
/// Seuls `vendor_name` et `user_device_name` pilotent la découverte ;
/// `model_name` et `serial_number` sont conservés pour l'affichage et les
/// logs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_name: String,
    pub user_device_name: String,
    pub model_name: String,
    pub serial_number: String,
}

impl DeviceInfo {
    /// Le device est un Roku si le vendor correspond, sans tenir compte de
    /// la casse. `user_device_name` peut être vide, certains Roku n'en
    /// rapportent pas.
    pub fn is_roku(&self) -> bool {
        self.vendor_name.eq_ignore_ascii_case("ROKU")
    }
}

/// Interroge `http://{ip}:{port}/query/device-info` et vérifie l'identité.
///
/// Retourne [`EcpError::NotARoku`] si le device répond correctement mais
/// n'est pas un Roku ; toute autre erreur (transport, statut HTTP, XML) est
/// traitée par l'appelant comme un "miss" non fatal.
pub fn query_device_info(
    transport: &EcpTransport,
    ip: Ipv4Addr,
    port: u16,
) -> Result<DeviceInfo, EcpError> {
    let url = format!("http://{ip}:{port}/query/device-info");
    debug!("Fetching device-info at {url}");

    let body = transport.get_string(&url)?;
    let info = parse_device_info(&body)?;

    if !info.is_roku() {
        return Err(EcpError::NotARoku(ip.to_string(), info.vendor_name));
    }

    Ok(info)
}

/// Parse le XML `<device-info>` et extrait les champs des enfants directs.
pub fn parse_device_info(xml: &str) -> Result<DeviceInfo, EcpError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut info = DeviceInfo::default();
    let mut seen_root = false;
    let mut vendor_seen = false;

    let mut in_device_info = false;
    let mut current_tag: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "device-info" {
                    in_device_info = true;
                    seen_root = true;
                    current_tag = None;
                } else if in_device_info {
                    current_tag = Some(name);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "device-info" {
                    in_device_info = false;
                }
                current_tag = None;
            }
            Event::Text(e) => {
                if in_device_info {
                    if let Some(tag) = &current_tag {
                        let text = e.decode().map_err(XmlError::Encoding)?.into_owned();

                        match tag.as_str() {
                            "vendor-name" => {
                                info.vendor_name = text;
                                vendor_seen = true;
                            }
                            "user-device-name" => {
                                info.user_device_name = text;
                            }
                            "model-name" => {
                                info.model_name = text;
                            }
                            "serial-number" => {
                                info.serial_number = text;
                            }
                            _ => {}
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(EcpError::MissingField("device-info"));
    }
    if !vendor_seen {
        return Err(EcpError::MissingField("vendor-name"));
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROKU_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<device-info>
    <udn>29380007-0000-1000-8000-001234567890</udn>
    <serial-number>1GU48T017973</serial-number>
    <vendor-name>Roku</vendor-name>
    <model-name>Roku 3</model-name>
    <user-device-name>Living Room</user-device-name>
    <supports-private-listening>true</supports-private-listening>
</device-info>"#;

    #[test]
    fn test_parse_roku_device_info() {
        let info = parse_device_info(ROKU_XML).expect("well-formed device-info");
        assert_eq!(info.vendor_name, "Roku");
        assert_eq!(info.user_device_name, "Living Room");
        assert_eq!(info.model_name, "Roku 3");
        assert_eq!(info.serial_number, "1GU48T017973");
        assert!(info.is_roku());
    }

    #[test]
    fn test_vendor_match_is_case_insensitive() {
        let xml = "<device-info><vendor-name>ROKU</vendor-name></device-info>";
        let info = parse_device_info(xml).unwrap();
        assert!(info.is_roku());
        // Et le nom d'affichage peut être absent
        assert_eq!(info.user_device_name, "");
    }

    #[test]
    fn test_other_vendor_is_not_a_roku() {
        let xml = "<device-info>\
                   <vendor-name>Apple</vendor-name>\
                   <user-device-name>Apple TV</user-device-name>\
                   </device-info>";
        let info = parse_device_info(xml).unwrap();
        assert!(!info.is_roku());
    }

    #[test]
    fn test_missing_vendor_name_is_rejected() {
        let xml = "<device-info><user-device-name>Mystery</user-device-name></device-info>";
        match parse_device_info(xml) {
            Err(EcpError::MissingField("vendor-name")) => {}
            other => panic!("expected MissingField(vendor-name), got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let xml = "<html><body>This is not a Roku</body></html>";
        match parse_device_info(xml) {
            Err(EcpError::MissingField("device-info")) => {}
            other => panic!("expected MissingField(device-info), got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let xml = "<device-info><vendor-name>Roku</device-info>";
        assert!(parse_device_info(xml).is_err());
    }
}
