//! Handshake wire format.
//!
//! A message is the sender's dotted-quad address as UTF-8, nothing else. The
//! message ends when the writer closes its side or the reader's buffer fills.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};

use crate::error::{HandshakeError, HandshakeResult};

/// Connects to `target`, writes `own` and closes.
///
/// The connection is made from `own` when possible so the receiver sees the
/// same address on the socket as in the payload.
pub async fn send_address(
    target: SocketAddr,
    own: Ipv4Addr,
    connect_timeout: Duration,
) -> HandshakeResult<()> {
    let mut stream = match tokio::time::timeout(connect_timeout, connect_from(own, target)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(HandshakeError::Connect {
                addr: target,
                source,
            });
        }
        Err(_) => {
            return Err(HandshakeError::ConnectTimeout {
                addr: target,
                timeout: connect_timeout,
            });
        }
    };

    stream.write_all(own.to_string().as_bytes()).await?;
    stream.shutdown().await?;

    Ok(())
}

async fn connect_from(own: Ipv4Addr, target: SocketAddr) -> io::Result<TcpStream> {
    if own.is_unspecified() {
        return TcpStream::connect(target).await;
    }

    let socket = TcpSocket::new_v4()?;
    if let Err(e) = socket.bind(SocketAddr::from((own, 0))) {
        tracing::debug!("Cannot bind outbound socket to {}: {}", own, e);
        return TcpStream::connect(target).await;
    }

    socket.connect(target).await
}

/// Reads one message and parses the address in it.
pub async fn read_address<R>(
    reader: &mut R,
    max_payload: usize,
    read_timeout: Duration,
) -> HandshakeResult<Ipv4Addr>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(max_payload.min(64));
    let mut limited = reader.take(max_payload as u64);

    match tokio::time::timeout(read_timeout, limited.read_to_end(&mut buf)).await {
        Ok(result) => {
            result?;
        }
        Err(_) => return Err(HandshakeError::ReadTimeout(read_timeout)),
    }

    parse_payload(&buf)
}

pub fn parse_payload(payload: &[u8]) -> HandshakeResult<Ipv4Addr> {
    let text = std::str::from_utf8(payload).map_err(|_| HandshakeError::InvalidUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(HandshakeError::EmptyPayload);
    }

    match text.parse::<Ipv4Addr>() {
        Ok(addr) if !addr.is_unspecified() && !addr.is_broadcast() => Ok(addr),
        _ => Err(HandshakeError::InvalidAddress(text.to_string())),
    }
}
