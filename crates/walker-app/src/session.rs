//! Drive a started client: log in, then log everything the server says.

use walker_net::{ConnectionState, WalkerClient};
use walker_proto::BmmoMessage;

/// Block until the client stops.
pub fn run(client: &WalkerClient<BmmoMessage>, login: BmmoMessage) {
    client.spin_until(ConnectionState::Running | ConnectionState::Stopped);
    if client.is_in_state(ConnectionState::Stopped) {
        tracing::warn!("Client stopped before it could log in");
        return;
    }

    client.send(login);

    let interval = client.params().spin_interval;
    let mut inbox = Vec::new();
    while !client.is_in_state(ConnectionState::Stopped) {
        std::thread::sleep(interval);
        client.recv(&mut inbox);
        for msg in inbox.drain(..) {
            tracing::info!(opcode = ?msg.tag(), "{}", describe(&msg));
        }
    }
}

/// One human-readable line per message.
pub fn describe(msg: &BmmoMessage) -> String {
    match msg {
        BmmoMessage::LoginRequestV3(m) => format!("Login request from {}", m.nickname),
        BmmoMessage::LoginAcceptedV3(m) => {
            let names: Vec<&str> = m.players.iter().map(|p| p.name.as_str()).collect();
            format!("Logged in. {} online: {}", names.len(), names.join(", "))
        }
        BmmoMessage::SimpleAction(m) => format!("Server action {}", m.action),
        BmmoMessage::Chat(m) if m.player_id == 0 => format!("[Server]: {}", m.content),
        BmmoMessage::Chat(m) => format!("[#{}]: {}", m.player_id, m.content),
        BmmoMessage::PlayerConnectedV2(m) if m.cheated => {
            format!("{} joined the game (cheat on)", m.name)
        }
        BmmoMessage::PlayerConnectedV2(m) => format!("{} joined the game", m.name),
        BmmoMessage::PlayerDisconnected(m) => format!("#{} left the game", m.player_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use walker_net::message::peek_opcode;
    use walker_net::{ClientParams, Frame, FrameConfig, Message, read_frame};
    use walker_proto::{Chat, PlayerConnectedV2, PlayerDisconnected, PlayerInfo};
    use walker_proto::{LoginAcceptedV3, LoginRequestV3, dialect};

    fn chat(player_id: u64, content: &str) -> BmmoMessage {
        BmmoMessage::Chat(Chat {
            player_id,
            content: content.to_string(),
        })
    }

    #[test]
    fn test_describe_chat() {
        assert_eq!(describe(&chat(0, "welcome")), "[Server]: welcome");
        assert_eq!(describe(&chat(5, "hi")), "[#5]: hi");
    }

    #[test]
    fn test_describe_roster() {
        let msg = BmmoMessage::LoginAcceptedV3(LoginAcceptedV3 {
            players: vec![
                PlayerInfo {
                    player_id: 1,
                    name: "Alice".to_string(),
                    cheated: false,
                },
                PlayerInfo {
                    player_id: 2,
                    name: "Bob".to_string(),
                    cheated: false,
                },
            ],
        });
        assert_eq!(describe(&msg), "Logged in. 2 online: Alice, Bob");
    }

    #[test]
    fn test_describe_joins_and_leaves() {
        let join = BmmoMessage::PlayerConnectedV2(PlayerConnectedV2 {
            player_id: 3,
            name: "Carol".to_string(),
            cheated: true,
        });
        let leave = BmmoMessage::PlayerDisconnected(PlayerDisconnected { player_id: 3 });
        assert_eq!(describe(&join), "Carol joined the game (cheat on)");
        assert_eq!(describe(&leave), "#3 left the game");
    }

    #[test]
    fn test_session_logs_in_and_ends_when_bridge_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let bridge = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let config = FrameConfig::default();
            let handshake = read_frame(&mut stream, &config).unwrap();
            let Frame::Data { body, reliable } = read_frame(&mut stream, &config).unwrap() else {
                panic!("expected the login data frame");
            };

            let mut reply = 10u32.to_le_bytes().to_vec();
            let mut local = Vec::new();
            chat(0, "welcome").serialize(&mut local).unwrap();
            reply.extend_from_slice(&local[4..]);
            stream
                .write_all(&Frame::data(reply, true).encode(&config).unwrap())
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(100));
            (handshake, peek_opcode(&body), reliable)
        });

        let params = ClientParams::new("127.0.0.1", port, "bmmo.example.net:26676");
        let client = WalkerClient::new(params, dialect().unwrap());
        client.start();
        let login = BmmoMessage::LoginRequestV3(LoginRequestV3 {
            version: Default::default(),
            nickname: "SwungMoe".to_string(),
            cheated: false,
            uuid: [0; 16],
        });
        run(&client, login);

        let (handshake, login_opcode, reliable) = bridge.join().unwrap();
        assert_eq!(handshake, Frame::command("bmmo.example.net:26676"));
        assert_eq!(login_opcode, Some(22));
        assert!(reliable);
        assert_eq!(client.state(), ConnectionState::Stopped);
    }
}
