//! Conversion from the on-disk config to the values the core consumes.

use std::time::Duration;

use walker_config::{Config, ProfileConfig};
use walker_net::{ClientParams, FRAME_SIZE_LIMIT, FrameConfig, SocketConfig};
use walker_proto::{BmmoMessage, BmmoVersion, LoginRequestV3};

pub fn client_params(config: &Config) -> ClientParams {
    let net = &config.network;
    ClientParams {
        local_host: net.local_host.clone(),
        local_port: net.local_port,
        remote_url: net.remote_url.clone(),
        // A zero interval would turn every wait into a busy loop.
        spin_interval: Duration::from_millis(config.client.spin_interval_ms.max(1)),
        queue_warning_level: config.client.queue_warning_level,
        frame: FrameConfig {
            max_frame_size: capped_frame_size(net.max_frame_size),
        },
        socket: SocketConfig {
            tcp_nodelay: net.tcp_nodelay,
            keepalive_enabled: net.keepalive,
            keepalive_idle: Duration::from_secs(net.keepalive_idle_secs),
            keepalive_interval: Duration::from_secs(net.keepalive_interval_secs),
        },
    }
}

fn capped_frame_size(configured: u32) -> u32 {
    if configured > FRAME_SIZE_LIMIT {
        tracing::warn!(
            "max_frame_size {configured} exceeds {FRAME_SIZE_LIMIT}, using {FRAME_SIZE_LIMIT}"
        );
        return FRAME_SIZE_LIMIT;
    }
    configured
}

pub fn login_request(profile: &ProfileConfig) -> BmmoMessage {
    BmmoMessage::LoginRequestV3(LoginRequestV3 {
        version: BmmoVersion::default(),
        nickname: profile.username.clone(),
        cheated: profile.cheated,
        uuid: profile.uuid,
    })
}
