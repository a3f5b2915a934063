//! SMTP transport against scripted and loopback servers.

#![allow(clippy::unwrap_used)]

use mailbridge_core::config::keys;
use mailbridge_core::{
    Environment, Error, Mailer, MemoryConfig, Recipients, Session, SmtpSession, SmtpTransport,
    Transport, build_message,
};
use mailbridge_smtp::SmtpStream;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_test::io::Builder;

const GREETING: &[u8] = b"220 webmail.bob.com ESMTP\r\n";

/// Minimal SMTP server that accepts one connection and records every line
/// it receives. Recipients listed in `reject` get a 550.
async fn loopback_server(reject: &'static [&'static str]) -> (u16, tokio::task::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();
        write.write_all(GREETING).await.unwrap();

        let mut transcript = Vec::new();
        let mut in_data = false;
        while let Some(line) = lines.next_line().await.unwrap() {
            transcript.push(line.clone());
            if in_data {
                if line == "." {
                    in_data = false;
                    write.write_all(b"250 2.0.0 Queued\r\n").await.unwrap();
                }
                continue;
            }

            let verb = line
                .split([' ', ':'])
                .next()
                .unwrap_or_default()
                .to_ascii_uppercase();
            let reply: &[u8] = match verb.as_str() {
                "EHLO" => b"250-webmail.bob.com\r\n250-SIZE 1000000\r\n250 AUTH PLAIN LOGIN\r\n",
                "AUTH" => b"235 2.7.0 Authentication successful\r\n",
                "MAIL" => b"250 OK\r\n",
                "RCPT" if reject.iter().any(|r| line.contains(r)) => {
                    b"550 5.1.1 Mailbox unavailable\r\n"
                }
                "RCPT" => b"250 OK\r\n",
                "DATA" => {
                    in_data = true;
                    b"354 End data with <CR><LF>.<CR><LF>\r\n"
                }
                "QUIT" => {
                    write.write_all(b"221 Bye\r\n").await.unwrap();
                    break;
                }
                _ => b"502 Command not implemented\r\n",
            };
            write.write_all(reply).await.unwrap();
        }

        transcript
    });

    (port, handle)
}

fn config(port: u16) -> Arc<MemoryConfig> {
    Arc::new(MemoryConfig::from_iter([
        (keys::SMTP_SERVER, "127.0.0.1".to_string()),
        (keys::PORT, port.to_string()),
        (keys::USERNAME, "John".to_string()),
        (keys::PASSWORD, "1234Password".to_string()),
        (keys::EMAIL_FROM_ADDRESS, "noreply@bob.com".to_string()),
        (keys::ENVIRONMENT, "LocalDev".to_string()),
    ]))
}

fn recipients() -> Recipients {
    Recipients::List {
        to: vec!["john@bob.com".to_string()],
        cc: vec!["bob@bob.com".to_string()],
    }
}

#[tokio::test]
async fn mailer_delivers_over_loopback() {
    let (port, server) = loopback_server(&[]).await;
    let transport = SmtpTransport::new().with_timeout(Duration::from_secs(5));

    Mailer::new(config(port), transport)
        .send("Email Test", "<p>This is a test.</p>", recipients(), vec![])
        .await
        .unwrap();

    let transcript = server.await.unwrap();
    assert_eq!(transcript[0], "EHLO localhost");
    assert_eq!(transcript[1], "AUTH PLAIN AEpvaG4AMTIzNFBhc3N3b3Jk");
    assert!(transcript[2].starts_with("MAIL FROM:<noreply@bob.com> SIZE="));
    assert_eq!(transcript[3], "RCPT TO:<john@bob.com>");
    assert_eq!(transcript[4], "RCPT TO:<bob@bob.com>");
    assert_eq!(transcript[5], "DATA");
    assert!(transcript.contains(&"Subject: Email Test on LocalDev".to_string()));
    assert!(transcript.contains(&"Content-Type: text/html; charset=utf-8".to_string()));
    assert!(transcript.contains(&".".to_string()));
    assert_eq!(transcript.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn rejected_recipient_surfaces_server_error() {
    let (port, server) = loopback_server(&["bob@bob.com"]).await;

    let err = Mailer::new(config(port), SmtpTransport::new())
        .send("Email Test", "body", recipients(), vec![])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(mailbridge_smtp::Error::SmtpError { code: 550, .. })
    ));

    let transcript = server.await.unwrap();
    assert!(!transcript.contains(&"DATA".to_string()));
}

#[tokio::test]
async fn custom_client_hostname_is_announced() {
    let (port, server) = loopback_server(&[]).await;
    let transport = SmtpTransport::new().with_client_hostname("reports.bob.com");

    let session = transport.open("127.0.0.1", port).await.unwrap();
    session.close().await.unwrap();

    let transcript = server.await.unwrap();
    assert_eq!(transcript, ["EHLO reports.bob.com", "QUIT"]);
}

#[tokio::test]
async fn session_rejects_message_without_recipients() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250 webmail.bob.com\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();

    let mut session = SmtpSession::from_stream(SmtpStream::new(mock), "localhost")
        .await
        .unwrap();
    let message = build_message(
        "s",
        "b",
        vec![],
        vec![],
        vec![],
        "noreply@bob.com",
        Environment::Production,
    );

    let err = session.send(&message).await.unwrap_err();
    assert!(matches!(err, mailbridge_smtp::Error::InvalidAddress(_)));
    session.close().await.unwrap();
}

#[tokio::test]
async fn session_enforces_advertised_size() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250-webmail.bob.com\r\n250 SIZE 64\r\n")
        .build();

    let mut session = SmtpSession::from_stream(SmtpStream::new(mock), "localhost")
        .await
        .unwrap();
    let message = build_message(
        "s",
        "a body long enough to push the rendered message past the limit",
        vec!["john@bob.com".to_string()],
        vec![],
        vec![],
        "noreply@bob.com",
        Environment::Production,
    );

    let err = session.send(&message).await.unwrap_err();
    assert!(matches!(err, mailbridge_smtp::Error::MessageTooLarge(_)));
}

#[tokio::test]
async fn session_rejects_invalid_envelope_address() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250 webmail.bob.com\r\n")
        .build();

    let mut session = SmtpSession::from_stream(SmtpStream::new(mock), "localhost")
        .await
        .unwrap();
    let message = build_message(
        "s",
        "b",
        vec!["not-an-address".to_string()],
        vec![],
        vec![],
        "noreply@bob.com",
        Environment::Production,
    );

    let err = session.send(&message).await.unwrap_err();
    assert!(matches!(err, mailbridge_smtp::Error::InvalidAddress(_)));
}

#[tokio::test]
async fn failed_authentication_leaves_nothing_to_close() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250-webmail.bob.com\r\n250 AUTH PLAIN\r\n")
        .write(b"AUTH PLAIN AEpvaG4Ad3Jvbmc=\r\n")
        .read(b"535 5.7.8 Authentication credentials invalid\r\n")
        .build();

    let mut session = SmtpSession::from_stream(SmtpStream::new(mock), "localhost")
        .await
        .unwrap();

    let err = session.authenticate("John", "wrong").await.unwrap_err();
    assert!(err.is_permanent());
    session.close().await.unwrap();
}

#[tokio::test]
async fn second_authentication_is_a_protocol_error() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250-webmail.bob.com\r\n250 AUTH PLAIN\r\n")
        .write(b"AUTH PLAIN AEpvaG4AMTIzNFBhc3N3b3Jk\r\n")
        .read(b"235 2.7.0 Authentication successful\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();

    let mut session = SmtpSession::from_stream(SmtpStream::new(mock), "localhost")
        .await
        .unwrap();

    session.authenticate("John", "1234Password").await.unwrap();
    let err = session
        .authenticate("John", "1234Password")
        .await
        .unwrap_err();
    assert!(matches!(err, mailbridge_smtp::Error::Protocol(_)));
    session.close().await.unwrap();
}

#[tokio::test]
async fn relay_without_auth_skips_authentication() {
    let mock = Builder::new()
        .read(GREETING)
        .write(b"EHLO localhost\r\n")
        .read(b"250-webmail.bob.com\r\n250 SIZE 1000000\r\n")
        .write(b"QUIT\r\n")
        .read(b"221 Bye\r\n")
        .build();

    let mut session = SmtpSession::from_stream(SmtpStream::new(mock), "localhost")
        .await
        .unwrap();

    session.authenticate("John", "1234Password").await.unwrap();
    session.close().await.unwrap();
}
