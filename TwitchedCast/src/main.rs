//! Point d'entrée TwitchedCast : découverte des Roku du réseau local et
//! envoi d'un cast Twitch vers le device sélectionné.
//!
//! Deux commandes :
//!
//! - `twitchedcast discover [--save]` — recherche les Roku et les affiche au
//!   fil de l'eau ; `--save` retient le premier confirmé comme device
//!   sélectionné
//! - `twitchedcast cast <texte partagé>` — extrait une URL Twitch du texte
//!   et lance le contenu sur le device sélectionné

mod link;

use std::env;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use link::extract_cast_target;
use twccontrol::{
    CastDispatcher, CastError, CastOutcome, DiscoveryConfig, DiscoveryEvent, DiscoveryRun,
};
use twcconfig::get_config;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("discover") => discover(args.iter().any(|arg| arg == "--save")),
        Some("cast") => {
            let text = args[1..].join(" ");
            if text.trim().is_empty() {
                return Err(anyhow!("usage: twitchedcast cast <shared text or twitch url>"));
            }
            cast(&text)
        }
        Some(other) => Err(anyhow!("unknown command '{other}' (expected: discover, cast)")),
    }
}

/// Lance un run de découverte et affiche les devices au fil de l'eau.
fn discover(save: bool) -> Result<()> {
    let config = get_config();
    info!("📡 Searching for Rokus from {}", twcutils::guess_local_ip());

    let run = DiscoveryRun::spawn(DiscoveryConfig {
        ssdp_window: Duration::from_secs(config.get_ssdp_window_secs()),
        probe_timeout: Duration::from_millis(config.get_probe_timeout_ms()),
        sweep_probe_timeout: Duration::from_millis(config.get_sweep_timeout_ms()),
        ecp_port: config.get_ecp_port(),
        sweep_prefixes: twcutils::sweep_prefixes(),
    })?;

    let mut saved = false;
    for event in run.events().iter() {
        match event {
            DiscoveryEvent::DeviceFound(device) => {
                println!("{device}");
                if save && !saved {
                    config.set_roku_ip(&device.ip.to_string())?;
                    info!("💾 Saved {} as the selected Roku", device.ip);
                    saved = true;
                }
            }
            DiscoveryEvent::Finished { device_count } => {
                info!("✅ Search finished: {device_count} Roku(s) found");
            }
            DiscoveryEvent::Failed(err) => {
                warn!("❌ {err}");
                println!("Search failed: no Roku found on the local network");
            }
        }
    }
    run.wait();
    Ok(())
}

/// Extrait une cible du texte partagé et la lance sur le device sélectionné.
fn cast(text: &str) -> Result<()> {
    let config = get_config();

    let Some(target) = extract_cast_target(text) else {
        return Err(anyhow!("no Twitch URL found in the shared text"));
    };
    info!("🎯 Cast target: {target:?}");

    let ip = config.get_roku_ip();
    let dispatcher = CastDispatcher::new(config.get_ecp_port(), config.get_app_id());

    match dispatcher.dispatch(&ip, target) {
        Ok(handle) => match handle.wait() {
            CastOutcome::Success => {
                println!("Cast sent to {ip}");
                Ok(())
            }
            CastOutcome::Failure(err) => Err(anyhow!("cast failed: {err}")),
        },
        Err(CastError::NoDeviceConfigured) => Err(anyhow!(
            "no device configured - run 'twitchedcast discover --save' first"
        )),
        Err(err) => Err(err.into()),
    }
}
