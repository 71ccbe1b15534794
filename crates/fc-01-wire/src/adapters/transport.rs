//! # Wire Transport
//!
//! One bidirectional peer connection carrying parcels. Every call runs under
//! its own deadline: a slow peer makes individual sends and receives fail
//! with [`TransportError::Timeout`] instead of parking the caller.
//!
//! The stream is split so a read task and a write task can own one half
//! each. Both halves observe a shared close signal; closing wakes any call
//! blocked on either half and every later call fails with
//! [`TransportError::Closed`].

use crate::adapters::KoopmanChecksum;
use crate::domain::{Parcel, TransportError, TransportResult};
use crate::ports::ChecksumProvider;
use crate::service::{check_frame_length, ParcelCodec};
use fc_04_messages::Message;
use serde::{Deserialize, Serialize};
use shared_types::NetworkId;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub network: NetworkId,
    /// Stamped into every outgoing parcel header.
    pub node_id: u64,
    /// Our listening port, advertised in outgoing headers.
    pub listen_port: String,
    /// Deadline for each receive call.
    pub read_timeout: Duration,
    /// Deadline for each send call.
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::LOCAL,
            node_id: 0,
            listen_port: String::new(),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Closes both halves of a transport from any task.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseHandle {
    pub fn close(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }
}

fn deadline_after(timeout: Duration) -> TransportResult<Instant> {
    if timeout.is_zero() {
        return Err(TransportError::Timeout);
    }
    Ok(Instant::now() + timeout)
}

async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Reading half: pulls frames off the stream and decodes them.
pub struct WireReader<R, C: ChecksumProvider = KoopmanChecksum> {
    io: R,
    codec: Arc<ParcelCodec<C>>,
    config: Arc<TransportConfig>,
    closed: watch::Receiver<bool>,
    handle: CloseHandle,
}

impl<R, C> WireReader<R, C>
where
    R: AsyncRead + Unpin + Send,
    C: ChecksumProvider,
{
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.handle.clone()
    }

    /// Receive one message. An empty payload is a heartbeat and yields `None`.
    pub async fn receive(&mut self) -> TransportResult<Option<Message>> {
        let parcel = self.receive_parcel().await?;
        if parcel.payload.is_empty() {
            trace!(parcel = %parcel, "Empty parcel");
            return Ok(None);
        }
        let msg = Message::decode(&parcel.payload, parcel.header.version)?;
        Ok(Some(msg))
    }

    /// Receive one parcel, verifying framing, checksum and network.
    pub async fn receive_parcel(&mut self) -> TransportResult<Parcel> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        let deadline = deadline_after(self.config.read_timeout)?;
        let frame = {
            let closed = &mut self.closed;
            let io = &mut self.io;
            tokio::select! {
                biased;
                () = wait_closed(closed) => return Err(TransportError::Closed),
                res = tokio::time::timeout_at(deadline, read_frame(io)) => {
                    res.map_err(|_| TransportError::Timeout)??
                }
            }
        };
        let (parcel, _) = self.codec.decode(&frame)?;
        if parcel.header.network != self.config.network {
            return Err(TransportError::WrongNetwork {
                expected: self.config.network,
                found: parcel.header.network,
            });
        }
        trace!(parcel = %parcel, "Parcel received");
        Ok(parcel)
    }
}

async fn read_frame<R: AsyncRead + Unpin>(io: &mut R) -> TransportResult<Vec<u8>> {
    let mut prefix = [0u8; 4];
    if let Err(e) = io.read_exact(&mut prefix).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => TransportError::Disconnected,
            _ => TransportError::Io(e),
        });
    }
    let total = u32::from_be_bytes(prefix) as usize;
    check_frame_length(total)?;
    let mut frame = vec![0u8; total];
    frame[..4].copy_from_slice(&prefix);
    io.read_exact(&mut frame[4..]).await?;
    Ok(frame)
}

/// Writing half: encodes messages into parcels and pushes them out.
pub struct WireWriter<W, C: ChecksumProvider = KoopmanChecksum> {
    io: W,
    codec: Arc<ParcelCodec<C>>,
    config: Arc<TransportConfig>,
    closed: watch::Receiver<bool>,
    handle: CloseHandle,
}

impl<W, C> WireWriter<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: ChecksumProvider,
{
    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.handle.clone()
    }

    /// Send `msg` under the configured write deadline. Returns the bytes
    /// written; zero means the message encoded to nothing and no parcel
    /// was sent.
    pub async fn send(&mut self, msg: &Message) -> TransportResult<usize> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        let deadline = deadline_after(self.config.write_timeout)?;
        self.send_before(msg, deadline).await
    }

    /// Send `msg`, failing with `Timeout` if `deadline` passes first.
    pub async fn send_before(&mut self, msg: &Message, deadline: Instant) -> TransportResult<usize> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        if deadline <= Instant::now() {
            return Err(TransportError::Timeout);
        }
        let payload = msg.encode()?;
        if payload.is_empty() {
            return Ok(0);
        }
        let parcel = Parcel::new(self.config.network, payload)
            .with_node_id(self.config.node_id)
            .with_port(self.config.listen_port.clone());
        self.send_parcel_before(&parcel, deadline).await
    }

    /// Send a prepared parcel under the configured write deadline.
    pub async fn send_parcel(&mut self, parcel: &Parcel) -> TransportResult<usize> {
        if *self.closed.borrow() {
            return Err(TransportError::Closed);
        }
        let deadline = deadline_after(self.config.write_timeout)?;
        self.send_parcel_before(parcel, deadline).await
    }

    async fn send_parcel_before(&mut self, parcel: &Parcel, deadline: Instant) -> TransportResult<usize> {
        let bytes = self.codec.encode(parcel)?;
        let closed = &mut self.closed;
        let io = &mut self.io;
        let write = async {
            io.write_all(&bytes).await?;
            io.flush().await?;
            Ok::<_, std::io::Error>(())
        };
        tokio::select! {
            biased;
            () = wait_closed(closed) => return Err(TransportError::Closed),
            res = tokio::time::timeout_at(deadline, write) => {
                res.map_err(|_| TransportError::Timeout)??;
            }
        }
        trace!(parcel = %parcel, bytes = bytes.len(), "Parcel sent");
        Ok(bytes.len())
    }

    /// Signal close to both halves and shut the write side down.
    pub async fn close(&mut self) {
        self.handle.close();
        if let Err(e) = self.io.shutdown().await {
            debug!(error = %e, "Shutdown after close failed");
        }
    }
}

/// A full connection. Use [`WireTransport::split`] to hand each half to
/// its own task.
pub struct WireTransport<S, C: ChecksumProvider = KoopmanChecksum> {
    reader: WireReader<ReadHalf<S>, C>,
    writer: WireWriter<WriteHalf<S>, C>,
}

impl<S> WireTransport<S, KoopmanChecksum>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub fn new(stream: S, config: TransportConfig) -> Self {
        Self::with_codec(stream, config, ParcelCodec::default())
    }
}

impl<S, C> WireTransport<S, C>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    C: ChecksumProvider,
{
    pub fn with_codec(stream: S, config: TransportConfig, codec: ParcelCodec<C>) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = watch::channel(false);
        let handle = CloseHandle { tx: Arc::new(tx) };
        let codec = Arc::new(codec);
        let config = Arc::new(config);
        Self {
            reader: WireReader {
                io: read_half,
                codec: Arc::clone(&codec),
                config: Arc::clone(&config),
                closed: rx.clone(),
                handle: handle.clone(),
            },
            writer: WireWriter {
                io: write_half,
                codec,
                config,
                closed: rx,
                handle,
            },
        }
    }

    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.writer.handle.clone()
    }

    pub async fn send(&mut self, msg: &Message) -> TransportResult<usize> {
        self.writer.send(msg).await
    }

    pub async fn send_before(&mut self, msg: &Message, deadline: Instant) -> TransportResult<usize> {
        self.writer.send_before(msg, deadline).await
    }

    pub async fn receive(&mut self) -> TransportResult<Option<Message>> {
        self.reader.receive().await
    }

    pub async fn close(&mut self) {
        self.writer.close().await;
    }

    pub fn split(self) -> (WireReader<ReadHalf<S>, C>, WireWriter<WriteHalf<S>, C>) {
        (self.reader, self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParcelError;
    use fc_02_signatures::Ed25519Signer;
    use fc_04_messages::{EndOfBlockMsg, MessageVariant, RejectCode, RejectMsg};
    use shared_types::{ChainId, Timestamp};
    use tokio::io::{duplex, DuplexStream};
    use tokio::time::timeout;

    fn pair(config: TransportConfig) -> (WireTransport<DuplexStream>, WireTransport<DuplexStream>) {
        let (a, b) = duplex(64 * 1024);
        (
            WireTransport::new(a, config.clone()),
            WireTransport::new(b, config),
        )
    }

    fn eob(height: u64) -> Message {
        let mut msg = EndOfBlockMsg::new(ChainId::new([1; 32]), height, Timestamp::from_millis(5));
        msg.sign(&Ed25519Signer::from_seed([1; 32])).unwrap();
        msg.into()
    }

    #[tokio::test]
    async fn test_send_receive_message() {
        let (mut a, mut b) = pair(TransportConfig::default());
        let msg = eob(3);
        let written = a.send(&msg).await.unwrap();
        assert!(written > 0);

        let received = b.receive().await.unwrap().unwrap();
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn test_parcel_header_stamped_from_config() {
        let config = TransportConfig {
            node_id: 77,
            listen_port: "8108".to_string(),
            ..TransportConfig::default()
        };
        let (a, b) = pair(config);
        let (_, mut writer) = a.split();
        let (mut reader, _keep) = b.split();

        writer.send(&eob(1)).await.unwrap();
        let parcel = reader.receive_parcel().await.unwrap();
        assert_eq!(parcel.header.node_id, 77);
        assert_eq!(parcel.header.peer_port, "8108");
        assert_eq!(parcel.message_type(), "[Message]");
    }

    #[tokio::test]
    async fn test_heartbeat_yields_none() {
        let (a, mut b) = pair(TransportConfig::default());
        let (_, mut writer) = a.split();
        writer
            .send_parcel(&Parcel::heartbeat(NetworkId::LOCAL))
            .await
            .unwrap();
        assert!(b.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_order_preserved() {
        let (mut a, mut b) = pair(TransportConfig::default());
        let msgs: Vec<Message> = (0..3).map(eob).collect();
        for m in &msgs {
            a.send(m).await.unwrap();
        }
        for m in &msgs {
            assert_eq!(&b.receive().await.unwrap().unwrap(), m);
        }
    }

    #[tokio::test]
    async fn test_elapsed_deadline_times_out() {
        let (mut a, _b) = pair(TransportConfig::default());
        let past = Instant::now();
        let res = timeout(Duration::from_millis(100), a.send_before(&eob(0), past))
            .await
            .expect("send must not block");
        assert!(matches!(res, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_zero_timeout_fails_immediately() {
        let config = TransportConfig {
            write_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            ..TransportConfig::default()
        };
        let (mut a, _b) = pair(config);
        assert!(matches!(a.send(&eob(0)).await, Err(TransportError::Timeout)));
        assert!(matches!(a.receive().await, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_read_deadline_on_silent_peer() {
        let config = TransportConfig {
            read_timeout: Duration::from_millis(20),
            ..TransportConfig::default()
        };
        let (mut a, _b) = pair(config);
        assert!(matches!(a.receive().await, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_write_deadline_when_peer_stops_reading() {
        let config = TransportConfig {
            write_timeout: Duration::from_millis(20),
            ..TransportConfig::default()
        };
        let (a, b) = duplex(64);
        let mut a = WireTransport::new(a, config.clone());
        let _b = WireTransport::new(b, config);
        assert!(matches!(a.send(&eob(0)).await, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_close_fails_later_calls() {
        let (mut a, _b) = pair(TransportConfig::default());
        a.close().await;
        assert!(matches!(a.send(&eob(0)).await, Err(TransportError::Closed)));
        assert!(matches!(a.receive().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_close_wakes_blocked_receive() {
        let (a, _b) = pair(TransportConfig::default());
        let handle = a.close_handle();
        let (mut reader, _writer) = a.split();
        let task = tokio::spawn(async move { reader.receive().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.close();
        let res = timeout(Duration::from_secs(1), task)
            .await
            .expect("receive must return after close")
            .unwrap();
        assert!(matches!(res, Err(TransportError::Closed)));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_peer_drop_is_disconnect() {
        let (mut a, b) = pair(TransportConfig::default());
        drop(b);
        assert!(matches!(a.receive().await, Err(TransportError::Disconnected)));
    }

    #[tokio::test]
    async fn test_wrong_network_rejected() {
        let (a, b) = duplex(64 * 1024);
        let mut sender = WireTransport::new(
            a,
            TransportConfig {
                network: NetworkId::TEST,
                ..TransportConfig::default()
            },
        );
        let mut receiver = WireTransport::new(b, TransportConfig::default());
        sender.send(&eob(0)).await.unwrap();
        assert!(matches!(
            receiver.receive().await,
            Err(TransportError::WrongNetwork { found: NetworkId::TEST, .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_payload_reported() {
        let (mut raw, b) = duplex(64 * 1024);
        let mut receiver = WireTransport::new(b, TransportConfig::default());
        let codec: ParcelCodec = ParcelCodec::default();
        let msg = Message::from(RejectMsg::new("ping", RejectCode::DUST, "x", None).unwrap());
        let mut bytes = codec
            .encode(&Parcel::new(NetworkId::LOCAL, msg.encode().unwrap()))
            .unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        raw.write_all(&bytes).await.unwrap();

        assert!(matches!(
            receiver.receive().await,
            Err(TransportError::Parcel(ParcelError::ChecksumMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_payload_reported() {
        let (mut raw, b) = duplex(64 * 1024);
        let mut receiver = WireTransport::new(b, TransportConfig::default());
        let bytes = ParcelCodec::<KoopmanChecksum>::default()
            .encode(&Parcel::new(NetworkId::LOCAL, vec![0x42, 0, 0]))
            .unwrap();
        raw.write_all(&bytes).await.unwrap();
        assert!(matches!(
            receiver.receive().await,
            Err(TransportError::Message(_))
        ));
    }
}
