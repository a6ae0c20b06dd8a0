//! Unix domain socket transport adapters: a 4-byte little-endian length
//! prefix followed by exactly that many payload bytes, over a
//! single-peer `AF_UNIX` stream socket.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::messages::BboUpdate;
use crate::transport::{Egress, Ingress};

const INSTRUMENT_NAME_LEN: usize = 32;
/// instrument_name (32) + best_bid (8) + best_ask (8) + sequence_number (8)
/// + timestamp_micros (8).
pub const BBO_RECORD_LEN: usize = INSTRUMENT_NAME_LEN + 8 * 4;

/// Encodes a [`BboUpdate`] into the fixed-layout record that crosses the
/// IPC boundary. Host byte order — this is a same-host transport.
pub fn encode_bbo_update(update: &BboUpdate) -> anyhow::Result<[u8; BBO_RECORD_LEN]> {
    let name = update.instrument.as_bytes();
    if name.len() > INSTRUMENT_NAME_LEN {
        anyhow::bail!(
            "instrument name {:?} exceeds {} bytes",
            update.instrument,
            INSTRUMENT_NAME_LEN
        );
    }

    let mut buf = [0u8; BBO_RECORD_LEN];
    buf[..name.len()].copy_from_slice(name);
    buf[INSTRUMENT_NAME_LEN..INSTRUMENT_NAME_LEN + 8].copy_from_slice(&update.best_bid.to_ne_bytes());
    buf[INSTRUMENT_NAME_LEN + 8..INSTRUMENT_NAME_LEN + 16]
        .copy_from_slice(&update.best_ask.to_ne_bytes());
    buf[INSTRUMENT_NAME_LEN + 16..INSTRUMENT_NAME_LEN + 24]
        .copy_from_slice(&update.sequence_number.to_ne_bytes());
    buf[INSTRUMENT_NAME_LEN + 24..INSTRUMENT_NAME_LEN + 32]
        .copy_from_slice(&update.timestamp_micros.to_ne_bytes());
    Ok(buf)
}

/// Inverse of [`encode_bbo_update`], used by tests and by any in-process
/// consumer reading the same record layout.
pub fn decode_bbo_update(buf: &[u8]) -> Option<BboUpdate> {
    if buf.len() != BBO_RECORD_LEN {
        return None;
    }
    let name_end = buf[..INSTRUMENT_NAME_LEN]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(INSTRUMENT_NAME_LEN);
    let instrument = String::from_utf8(buf[..name_end].to_vec()).ok()?;

    let read_f64 = |start: usize| f64::from_ne_bytes(buf[start..start + 8].try_into().unwrap());
    let read_u64 = |start: usize| u64::from_ne_bytes(buf[start..start + 8].try_into().unwrap());

    Some(BboUpdate {
        instrument,
        best_bid: read_f64(INSTRUMENT_NAME_LEN),
        best_ask: read_f64(INSTRUMENT_NAME_LEN + 8),
        sequence_number: read_u64(INSTRUMENT_NAME_LEN + 16),
        timestamp_micros: read_u64(INSTRUMENT_NAME_LEN + 24),
    })
}

async fn write_frame(stream: &mut UnixStream, payload: &[u8]) -> std::io::Result<()> {
    stream.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    stream.write_all(payload).await
}

/// A client of a bound [`IpcIngress`] socket: connects lazily and
/// reconnects on the next send after a write failure, same discipline
/// as [`IpcEgress`]. Used by the websocket reactor binary to push raw
/// frames into the feed engine's ingress socket.
pub struct IngressFeeder {
    path: PathBuf,
    stream: Option<UnixStream>,
}

impl IngressFeeder {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
        }
    }

    pub async fn send(&mut self, payload: &[u8]) -> std::io::Result<()> {
        if self.stream.is_none() {
            self.stream = Some(UnixStream::connect(&self.path).await?);
        }
        let stream = self.stream.as_mut().expect("just populated");
        if let Err(e) = write_frame(stream, payload).await {
            self.stream = None;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::exchange::FrameSink for IngressFeeder {
    async fn push(&mut self, payload: Vec<u8>) {
        if let Err(e) = self.send(&payload).await {
            log::error!("ingress feed failed: {e}");
        }
    }
}

async fn read_frame(stream: &mut UnixStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = stream.read_exact(&mut len_buf).await {
        return match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Ok(None),
            _ => Err(e),
        };
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    match stream.read_exact(&mut payload).await {
        Ok(()) => Ok(Some(payload)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Ingress endpoint: binds a named Unix domain socket, accepts a single
/// peer, and reads framed JSON payloads from it.
pub struct IpcIngress {
    path: PathBuf,
    listener: UnixListener,
    peer: Option<UnixStream>,
}

impl IpcIngress {
    /// Deletes any stale socket file before binding.
    pub fn bind(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        log::info!("ingress socket listening on {}", path.display());
        Ok(Self {
            path,
            listener,
            peer: None,
        })
    }
}

#[async_trait::async_trait]
impl Ingress for IpcIngress {
    async fn recv(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.peer.is_none() {
            let (stream, _addr) = self.listener.accept().await?;
            log::info!("ingress peer connected on {}", self.path.display());
            self.peer = Some(stream);
        }

        let stream = self.peer.as_mut().expect("just populated");
        match read_frame(stream).await? {
            Some(payload) => Ok(Some(payload)),
            None => {
                log::info!("ingress peer disconnected on {}", self.path.display());
                self.peer = None;
                Ok(None)
            }
        }
    }
}

impl Drop for IpcIngress {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Egress endpoint: connects once to a peer-bound socket and sends
/// length-prefixed BBO records. No internal retry — a failed connect or
/// send is reported to the caller.
pub struct IpcEgress {
    path: PathBuf,
    stream: Option<UnixStream>,
}

impl IpcEgress {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
        }
    }

    async fn connection(&mut self) -> anyhow::Result<&mut UnixStream> {
        if self.stream.is_none() {
            let stream = UnixStream::connect(&self.path).await?;
            log::info!("egress connected to {}", self.path.display());
            self.stream = Some(stream);
        }
        Ok(self.stream.as_mut().expect("just populated"))
    }
}

#[async_trait::async_trait]
impl Egress for IpcEgress {
    async fn send(&mut self, update: &BboUpdate) -> anyhow::Result<()> {
        let record = encode_bbo_update(update)?;
        let stream = self.connection().await?;
        if let Err(e) = write_frame(stream, &record).await {
            // Drop the connection so the next send attempts a fresh
            // connect rather than writing into a dead socket.
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }
}
