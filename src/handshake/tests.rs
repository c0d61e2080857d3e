//! Handshake Module Tests
//!
//! Real TCP on loopback. Each test binds its own `127.0.1.x` addresses so the
//! fixed port pair never collides between tests.
//!
//! ## Test Scopes
//! - **Wire**: payload parsing, bounded reads, read timeouts.
//! - **Listeners**: registration triggers an acknowledgment, malformed input
//!   is dropped, the accept loop survives bad clients.
//! - **Eviction**: connect failures are reported as unreachable.
//! - **Address policy**: spoofed claims under both policies.

#[cfg(test)]
mod tests {
    use crate::config::MeshConfig;
    use crate::error::HandshakeError;
    use crate::handshake::protocol::HandshakeProtocol;
    use crate::handshake::types::{AddressPolicy, HandshakeRole, PeerSink};
    use crate::handshake::wire::{parse_payload, read_address, send_address};
    use crate::testing::{RecordingSink, SinkEvent, eventually, test_config};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpSocket, TcpStream};

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(127, 0, 1, last)
    }

    fn node(
        last: u8,
        config: MeshConfig,
    ) -> (Arc<HandshakeProtocol>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let as_sink: Arc<dyn PeerSink> = sink.clone();
        (HandshakeProtocol::new(addr(last), config, as_sink), sink)
    }

    /// Connects from `from` so the listener sees that source address.
    async fn connect_from(from: Ipv4Addr, to: SocketAddr) -> TcpStream {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind(SocketAddr::from((from, 0))).unwrap();
        socket.connect(to).await.unwrap()
    }

    // ============================================================
    // WIRE TESTS
    // ============================================================

    #[test]
    fn test_parse_payload_accepts_dotted_quad() {
        assert_eq!(
            parse_payload(b"192.168.1.10").unwrap(),
            Ipv4Addr::new(192, 168, 1, 10)
        );
        assert_eq!(
            parse_payload(b"  10.0.0.1\n").unwrap(),
            Ipv4Addr::new(10, 0, 0, 1)
        );
    }

    #[test]
    fn test_parse_payload_rejects_bad_input() {
        assert!(matches!(parse_payload(b""), Err(HandshakeError::EmptyPayload)));
        assert!(matches!(parse_payload(b"   "), Err(HandshakeError::EmptyPayload)));
        assert!(matches!(
            parse_payload(&[0xff, 0xfe, 0x00]),
            Err(HandshakeError::InvalidUtf8)
        ));
        assert!(matches!(
            parse_payload(b"hello"),
            Err(HandshakeError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_payload(b"10.0.0.1:22333"),
            Err(HandshakeError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_payload(b"0.0.0.0"),
            Err(HandshakeError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_read_address_stops_at_buffer_limit() {
        let mut padded = b"10.0.0.1".to_vec();
        padded.extend(std::iter::repeat_n(b' ', 4096));
        let mut reader = &padded[..];

        let parsed = read_address(&mut reader, 1024, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(parsed, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(reader.len(), padded.len() - 1024);
    }

    #[tokio::test]
    async fn test_read_address_oversized_garbage_is_invalid() {
        let garbage = "1".repeat(4096);
        let mut reader = garbage.as_bytes();

        let result = read_address(&mut reader, 1024, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(HandshakeError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_read_address_times_out_on_silent_writer() {
        let (mut reader, _writer) = tokio::io::duplex(64);

        let result = read_address(&mut reader, 1024, Duration::from_millis(100)).await;

        assert!(matches!(result, Err(HandshakeError::ReadTimeout(_))));
    }

    #[tokio::test]
    async fn test_send_address_writes_own_address_and_closes() {
        let listener = TcpListener::bind((addr(1), 0)).await.unwrap();
        let target = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut stream, remote) = listener.accept().await.unwrap();
            let mut received = String::new();
            stream.read_to_string(&mut received).await.unwrap();
            (received, remote)
        });

        send_address(target, addr(2), Duration::from_secs(1))
            .await
            .unwrap();

        let (received, remote) = accept.await.unwrap();
        assert_eq!(received, "127.0.1.2");
        assert_eq!(remote.ip(), addr(2));
    }

    #[tokio::test]
    async fn test_send_address_to_closed_port_is_unreachable() {
        let target = SocketAddr::from((addr(3), 42333));

        let err = send_address(target, addr(4), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(err.is_unreachable());
    }

    // ============================================================
    // LISTENER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_registration_is_recorded_and_acknowledged() {
        let config = test_config();
        let (protocol, sink) = node(10, config.clone());
        protocol
            .start_listener(HandshakeRole::Register)
            .await
            .expect("registration listener binds");

        // Stand-in for the registering peer's acknowledgment listener
        let ack_listener = TcpListener::bind((addr(11), config.acknowledgment_port))
            .await
            .unwrap();

        send_address(
            SocketAddr::from((addr(10), config.registration_port)),
            addr(11),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let (mut stream, _) = tokio::time::timeout(Duration::from_secs(3), ack_listener.accept())
            .await
            .expect("acknowledgment arrives")
            .unwrap();
        let mut ack = String::new();
        stream.read_to_string(&mut ack).await.unwrap();

        assert_eq!(ack, "127.0.1.10");
        assert!(sink.contains(SinkEvent::Confirmed(addr(11))).await);
    }

    #[tokio::test]
    async fn test_acknowledgment_is_recorded_without_reply() {
        let config = test_config();
        let (protocol, sink) = node(12, config.clone());
        protocol
            .start_listener(HandshakeRole::Acknowledge)
            .await
            .expect("acknowledgment listener binds");

        send_address(
            SocketAddr::from((addr(12), config.acknowledgment_port)),
            addr(13),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(eventually(|| sink.contains(SinkEvent::Confirmed(addr(13)))).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.events().await, vec![SinkEvent::Confirmed(addr(13))]);
    }

    #[tokio::test]
    async fn test_failed_acknowledgment_evicts_registrant() {
        let config = test_config();
        let (protocol, sink) = node(14, config.clone());
        protocol.start_listener(HandshakeRole::Register).await.unwrap();

        // Nobody listens on 127.0.1.15's acknowledgment port
        send_address(
            SocketAddr::from((addr(14), config.registration_port)),
            addr(15),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(eventually(|| sink.contains(SinkEvent::Unreachable(addr(15)))).await);
        assert_eq!(
            sink.events().await,
            vec![
                SinkEvent::Confirmed(addr(15)),
                SinkEvent::Unreachable(addr(15))
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_connections_are_dropped() {
        let config = test_config();
        let (protocol, sink) = node(16, config.clone());
        protocol
            .start_listener(HandshakeRole::Acknowledge)
            .await
            .unwrap();
        let target = SocketAddr::from((addr(16), config.acknowledgment_port));

        // Zero-length payload
        drop(TcpStream::connect(target).await.unwrap());

        // Not an address
        let mut garbage = TcpStream::connect(target).await.unwrap();
        garbage.write_all(b"definitely not an ip").await.unwrap();
        garbage.shutdown().await.unwrap();

        // Invalid UTF-8
        let mut binary = TcpStream::connect(target).await.unwrap();
        binary.write_all(&[0xc3, 0x28, 0xa0, 0xa1]).await.unwrap();
        binary.shutdown().await.unwrap();

        // Listener still serves well-formed messages afterwards
        send_address(target, addr(17), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(eventually(|| sink.contains(SinkEvent::Confirmed(addr(17)))).await);
        assert_eq!(sink.events().await, vec![SinkEvent::Confirmed(addr(17))]);
    }

    #[tokio::test]
    async fn test_own_address_payload_is_ignored() {
        let config = test_config();
        let (protocol, sink) = node(18, config.clone());
        protocol
            .start_listener(HandshakeRole::Acknowledge)
            .await
            .unwrap();

        let mut stream =
            TcpStream::connect(SocketAddr::from((addr(18), config.acknowledgment_port)))
                .await
                .unwrap();
        stream.write_all(b"127.0.1.18").await.unwrap();
        stream.shutdown().await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(sink.events().await.is_empty());
    }

    // ============================================================
    // OUTBOUND / EVICTION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_register_with_unreachable_peer_reports_it() {
        let (protocol, sink) = node(20, test_config());

        let err = protocol.register_with(addr(21)).await.unwrap_err();

        assert!(err.is_unreachable());
        assert_eq!(sink.events().await, vec![SinkEvent::Unreachable(addr(21))]);
    }

    #[tokio::test]
    async fn test_register_with_listening_peer_does_not_evict() {
        let config = test_config();
        let (protocol, sink) = node(22, config.clone());
        let listener = TcpListener::bind((addr(23), config.registration_port))
            .await
            .unwrap();

        protocol.register_with(addr(23)).await.unwrap();

        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        stream.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "127.0.1.22");
        assert!(sink.events().await.is_empty());
    }

    // ============================================================
    // ADDRESS POLICY TESTS
    // ============================================================

    async fn spoofed_acknowledgment(policy: AddressPolicy, last: u8) -> Vec<SinkEvent> {
        let config = MeshConfig {
            address_policy: policy,
            ..test_config()
        };
        let (protocol, sink) = node(last, config.clone());
        protocol
            .start_listener(HandshakeRole::Acknowledge)
            .await
            .unwrap();

        // Sent from 127.0.1.99 while claiming to be 127.0.1.77
        let mut stream = connect_from(
            addr(99),
            SocketAddr::from((addr(last), config.acknowledgment_port)),
        )
        .await;
        stream.write_all(b"127.0.1.77").await.unwrap();
        stream.shutdown().await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        sink.events().await
    }

    #[tokio::test]
    async fn test_trust_policy_accepts_spoofed_claim() {
        let events = spoofed_acknowledgment(AddressPolicy::TrustPayload, 30).await;

        assert_eq!(events, vec![SinkEvent::Confirmed(addr(77))]);
    }

    #[tokio::test]
    async fn test_transport_match_policy_rejects_spoofed_claim() {
        let events = spoofed_acknowledgment(AddressPolicy::RequireTransportMatch, 31).await;

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_transport_match_policy_accepts_honest_claim() {
        let config = MeshConfig {
            address_policy: AddressPolicy::RequireTransportMatch,
            ..test_config()
        };
        let (protocol, sink) = node(32, config.clone());
        protocol
            .start_listener(HandshakeRole::Acknowledge)
            .await
            .unwrap();

        send_address(
            SocketAddr::from((addr(32), config.acknowledgment_port)),
            addr(33),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(eventually(|| sink.contains(SinkEvent::Confirmed(addr(33)))).await);
    }

    // ============================================================
    // LISTENER LIFECYCLE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_bind_failure_returns_none() {
        let config = test_config();
        let _occupied = TcpListener::bind((addr(40), config.registration_port))
            .await
            .unwrap();
        let (protocol, _sink) = node(40, config);

        assert!(protocol.start_listener(HandshakeRole::Register).await.is_none());
        assert!(
            protocol
                .start_listener(HandshakeRole::Acknowledge)
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_inbound_limit_still_serves_everyone() {
        let config = MeshConfig {
            max_inbound_connections: Some(1),
            ..test_config()
        };
        let (protocol, sink) = node(41, config.clone());
        protocol
            .start_listener(HandshakeRole::Acknowledge)
            .await
            .unwrap();
        let target = SocketAddr::from((addr(41), config.acknowledgment_port));

        // Holds the only slot until the read timeout frees it
        let _stalled = TcpStream::connect(target).await.unwrap();

        send_address(target, addr(42), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(eventually(|| sink.contains(SinkEvent::Confirmed(addr(42)))).await);
    }
}
