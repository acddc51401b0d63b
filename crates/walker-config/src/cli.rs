//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// ShadowWalker command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "shadow-walker", about = "Terminal client for BMMO servers")]
pub struct CliArgs {
    /// Host of the local bridge.
    #[arg(long)]
    pub local_host: Option<String>,

    /// Port of the local bridge.
    #[arg(short = 'p', long)]
    pub local_port: Option<u16>,

    /// Game server as `host:port`.
    #[arg(short = 'u', long, value_parser = parse_server_url)]
    pub server_url: Option<String>,

    /// Display name.
    #[arg(short = 'n', long, value_parser = parse_username)]
    pub username: Option<String>,

    /// Player UUID, e.g. `0123abcd-0000-4000-8000-00000000beef`.
    #[arg(short = 'i', long, value_parser = parse_uuid)]
    pub uuid: Option<[u8; 16]>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref host) = args.local_host {
            self.network.local_host = host.clone();
        }
        if let Some(port) = args.local_port {
            self.network.local_port = port;
        }
        if let Some(ref url) = args.server_url {
            self.network.remote_url = url.clone();
        }
        if let Some(ref name) = args.username {
            self.profile.username = name.clone();
        }
        if let Some(uuid) = args.uuid {
            self.profile.uuid = uuid;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

/// Accept `host:port` with a non-empty host and a numeric port.
pub fn parse_server_url(s: &str) -> Result<String, String> {
    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("`{s}` is not host:port"))?;
    if host.is_empty() {
        return Err(format!("`{s}` has no host"));
    }
    port.parse::<u16>()
        .map_err(|_| format!("`{port}` is not a valid port"))?;
    Ok(s.to_string())
}

/// Accept names made of ASCII letters, digits and underscores.
pub fn parse_username(s: &str) -> Result<String, String> {
    if !s.is_empty() && s.bytes().all(|b| b == b'_' || b.is_ascii_alphanumeric()) {
        Ok(s.to_string())
    } else {
        Err(format!("`{s}` may only contain letters, digits and underscores"))
    }
}

/// Parse a lowercase 8-4-4-4-12 hex UUID into its 16 bytes.
pub fn parse_uuid(s: &str) -> Result<[u8; 16], String> {
    let groups: Vec<&str> = s.split('-').collect();
    let shape_ok = groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len);
    let hex: String = groups.concat();
    if !shape_ok || !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(format!("`{s}` is not a lowercase 8-4-4-4-12 uuid"));
    }

    let mut uuid = [0u8; 16];
    for (i, byte) in uuid.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| format!("`{s}`: {e}"))?;
    }
    Ok(uuid)
}
