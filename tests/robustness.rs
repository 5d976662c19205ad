//! Robustness tests for edge cases and error handling.

use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use voipbl_rtbh::address::{normalize_list, FilterPolicy};
use voipbl_rtbh::config::Config;
use voipbl_rtbh::parse_address;
use voipbl_rtbh::reconciler::{diff, reconcile};
use voipbl_rtbh::session::{PeerSession, Reply, Response, SessionState};
use voipbl_rtbh::ControllerError;

#[test]
fn test_ip_parsing_edge_cases() {
    let invalid = [
        "256.1.1.1",
        "1.1.1",
        "1.1.1.1.1",
        "1.1.1.1/0",
        "1.1.1.1/33",
        "1.1.1.1/",
        "1.1.1.1/+8",
        "-1.1.1.1",
        "::1",
        "",
        " ",
        "a.b.c.d",
    ];
    for input in invalid {
        let result = parse_address(input);
        assert!(
            matches!(result, Err(ControllerError::InvalidAddress(_))),
            "{:?} should be rejected",
            input
        );
    }

    assert_eq!(parse_address("0.0.0.0").unwrap().to_string(), "0.0.0.0/32");
    assert_eq!(
        parse_address("255.255.255.255/1").unwrap().to_string(),
        "255.255.255.255/1"
    );
}

#[test]
fn test_large_input_handling() {
    let content: String = (0..50_000u32)
        .map(|i| format!("{}.{}.{}.{}\n", 11 + (i >> 16) % 100, (i >> 8) & 0xff, i & 0xff, 1))
        .collect();
    let set = normalize_list(&content, FilterPolicy::default());
    assert_eq!(set.len(), 50_000);
}

#[test]
fn test_unicode_and_garbage_lines() {
    let content = "1.2.3.4\n１.２.３.４\n1.2.3.4 # comment\n\u{feff}5.6.7.8\n\0\n9.9.9.9\r\n";
    let set = normalize_list(content, FilterPolicy::default());
    let entries: Vec<String> = set.iter().map(|a| a.to_string()).collect();
    assert_eq!(entries, ["1.2.3.4/32", "9.9.9.9/32"]);
}

#[test]
fn test_empty_and_whitespace() {
    assert!(normalize_list("", FilterPolicy::default()).is_empty());
    assert!(normalize_list("\n\n   \n\t\n", FilterPolicy::default()).is_empty());
}

#[test]
fn test_reserved_always_dropped_private_per_policy() {
    let content = "0.1.2.3\n224.0.0.1\n240.0.0.0/4\n10.1.2.3\n127.0.0.1\n8.8.8.8\n";
    let open = normalize_list(content, FilterPolicy::default());
    let strict = normalize_list(content, FilterPolicy { exclude_private: true });

    assert_eq!(open.len(), 3);
    assert_eq!(strict.len(), 1);
}

#[test]
fn test_diff_against_empty_target_withdraws_everything() {
    let advertised = normalize_list("1.1.1.1\n2.2.2.2\n", FilterPolicy::default());
    let empty = reconcile(std::iter::empty());
    let delta = diff(&empty, &advertised);
    assert!(delta.advertise.is_empty());
    assert_eq!(delta.withdraw.len(), 2);
}

#[test]
fn test_yaml_malformed_input() {
    let dir = tempfile::TempDir::new().unwrap();
    let cases = [
        "",
        "voipbl: [",
        "voipbl: 1\nlocalbl: 2\nexabgp: 3\n",
        "\0\0\0",
        "voipbl:\n  remote: !!binary aGVsbG8=\n",
    ];
    for yaml in cases {
        assert!(Config::from_yaml(yaml, dir.path()).is_err(), "{:?}", yaml);
    }
}

#[tokio::test]
async fn test_blank_reply_is_protocol_error() {
    let mut s = PeerSession::new(BufReader::new(&b"exabgp 4.2.1\n\n"[..]), Vec::new(), true);
    s.handshake().await.unwrap();
    let err = s.send_command("announce route 1.2.3.4/32", false).await.unwrap_err();
    assert!(matches!(err, ControllerError::Protocol(_)));
    assert_eq!(s.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_crlf_replies_are_accepted() {
    let mut s = PeerSession::new(
        BufReader::new(&b"exabgp 4.2.1\r\ndone\r\n"[..]),
        Vec::new(),
        true,
    );
    s.handshake().await.unwrap();
    assert_eq!(s.version(), Some("4.2.1"));
    assert_eq!(s.send_command("announce x", false).await.unwrap(), Reply::Done);
}

#[tokio::test]
async fn test_json_without_notification_kind_returned_raw() {
    let mut s = PeerSession::new(
        BufReader::new(&b"exabgp 4.2.1\n{\"type\":\"notification\",\"notification\":\"neighbor up\"}\n"[..]),
        Vec::new(),
        true,
    );
    s.handshake().await.unwrap();
    match s.send_command("show neighbor", true).await.unwrap() {
        Reply::Response(Response::Message(v)) => assert_eq!(v["notification"], "neighbor up"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(s.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_truncated_json_is_protocol_error() {
    let mut s = PeerSession::new(
        BufReader::new(&b"exabgp 4.2.1\n{\"type\":\"notifica\n"[..]),
        Vec::new(),
        true,
    );
    s.handshake().await.unwrap();
    assert!(s.send_command("announce x", false).await.is_err());
}

#[tokio::test]
async fn test_session_over_duplex_pipe() {
    // Peer side on the other end of an in-memory pipe
    let (ours, theirs) = tokio::io::duplex(1024);
    let (our_read, our_write) = tokio::io::split(ours);
    let (their_read, mut their_write) = tokio::io::split(theirs);

    let peer = tokio::spawn(async move {
        use tokio::io::AsyncBufReadExt;
        let mut lines = BufReader::new(their_read).lines();
        let mut seen = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            let reply: &[u8] = match line.as_str() {
                "version" => b"exabgp 4.2.1\n",
                l if l.starts_with("announce") => b"done\n",
                _ => b"shutdown\n",
            };
            their_write.write_all(reply).await.unwrap();
            seen.push(line);
        }
        seen
    });

    let mut s = PeerSession::new(BufReader::new(our_read), our_write, true);
    s.handshake().await.unwrap();
    assert_eq!(s.send_command("announce route 1.2.3.4/32", false).await.unwrap(), Reply::Done);
    assert_eq!(s.send_command("withdraw route 1.2.3.4/32", false).await.unwrap(), Reply::Shutdown);
    assert_eq!(s.state(), SessionState::Closed);
    drop(s);

    let seen = tokio::time::timeout(Duration::from_secs(5), peer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(seen, ["version", "announce route 1.2.3.4/32", "withdraw route 1.2.3.4/32"]);
}
