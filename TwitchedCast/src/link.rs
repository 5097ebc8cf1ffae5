//! Extraction d'une cible de cast depuis un texte partagé.
//!
//! Deux formes d'URL Twitch sont reconnues, les mêmes que l'app d'origine :
//!
//! - `https://www.twitch.tv/{channel}` → un live
//! - `https://www.twitch.tv/{channel}/v/{id}?t={secondes}` → une VOD,
//!   avec une position de reprise optionnelle
//!
//! Tout le reste du texte est ignoré ; sans URL Twitch, pas de cible.

use twccontrol::CastTarget;

const TWITCH_HOST_MARKER: &str = "twitch.tv/";

/// Cherche une URL Twitch dans le texte et en déduit la cible.
pub fn extract_cast_target(text: &str) -> Option<CastTarget> {
    text.split_whitespace().find_map(parse_twitch_url)
}

fn parse_twitch_url(token: &str) -> Option<CastTarget> {
    // Un schéma HTTP doit précéder l'hôte dans le même token
    if !(token.contains("http://") || token.contains("https://")) {
        return None;
    }
    let idx = token.find(TWITCH_HOST_MARKER)?;
    let rest = &token[idx + TWITCH_HOST_MARKER.len()..];

    // Couper le fragment, puis la query string
    let rest = rest.split('#').next().unwrap_or("");
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    // Un '&' hors query termine aussi le chemin
    let path = path.split('&').next().unwrap_or("");

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [_, "v", id, ..] => Some(CastTarget::Video {
            id: (*id).to_string(),
            time_seconds: query.and_then(time_offset),
        }),
        [channel, ..] => Some(CastTarget::Stream {
            channel: (*channel).to_string(),
        }),
        [] => None,
    }
}

/// Extrait le paramètre `t=` de la query string (position en secondes).
fn time_offset(query: &str) -> Option<u32> {
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("t=") {
            let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                return digits.parse().ok();
            }
        }
    }
    None
}
