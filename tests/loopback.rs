//! End-to-end scenarios that need an actual socket: registration handshake,
//! PING/PONG, and the post-MOTD NickServ/JOIN sequence. A loopback
//! `TcpListener` stands in for the IRC server.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use cogbot::{Bot, BotConfig};

#[tokio::test(flavor = "current_thread")]
async fn scenario_1_ping_pong_roundtrip() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();

            let bot = Bot::new(BotConfig {
                host: "127.0.0.1".into(),
                port,
                nick: "cogbot".into(),
                ..Default::default()
            });

            tokio::task::spawn_local(async move {
                bot.start().await;
            });

            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            // USER, NICK (no server password configured, so no PASS).
            let mut line = String::new();
            for _ in 0..2 {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
            }

            write_half.write_all(b"PING :abc123\r\n").await.unwrap();

            line.clear();
            reader.read_line(&mut line).await.unwrap();
            assert_eq!(line.trim_end(), "PONG :abc123");

            drop(write_half);
            drop(reader);
        })
        .await;
}

#[tokio::test(flavor = "current_thread")]
async fn scenario_4_registration_identify_and_join_order() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();

            let bot = Bot::new(BotConfig {
                host: "127.0.0.1".into(),
                port,
                nick: "cogbot".into(),
                password: Some("pw".into()),
                channel_map: vec![
                    ("#x".to_owned(), None),
                    ("#y".to_owned(), Some("key".to_owned())),
                ],
                ..Default::default()
            });

            tokio::task::spawn_local(async move {
                bot.start().await;
            });

            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            // PASS, USER, NICK.
            let mut line = String::new();
            for _ in 0..3 {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
            }

            write_half
                .write_all(b":server 376 cogbot :End of /MOTD\r\n")
                .await
                .unwrap();

            let mut got = Vec::new();
            for _ in 0..3 {
                line.clear();
                reader.read_line(&mut line).await.unwrap();
                got.push(line.trim_end().to_owned());
            }

            assert_eq!(
                got,
                vec![
                    "PRIVMSG NickServ :IDENTIFY pw".to_owned(),
                    "JOIN #x".to_owned(),
                    "JOIN #y key".to_owned(),
                ]
            );

            drop(write_half);
            drop(reader);
        })
        .await;
}
