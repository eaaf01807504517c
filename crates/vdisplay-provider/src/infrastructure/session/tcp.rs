//! TCP transport for the display-server session.
//!
//! Architecture, mirroring one connection per display:
//! - `TcpDisplaySession` owns the write half behind a request lock; a
//!   request is "write one frame, then await the next reply", so replies
//!   pair with requests by order.
//! - A spawned reader task decodes inbound frames and routes them: ordinary
//!   replies flow to the pending request, `Terminated` notices flow out of
//!   band to the termination stream claimed by the display.
//! - When the connection dies, dropping the reader's senders unblocks any
//!   pending request with `Closed` and ends the display's lifecycle
//!   monitor.

use std::net::SocketAddr;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vdisplay_core::protocol::codec::{HEADER_SIZE, MAX_PAYLOAD_SIZE};
use vdisplay_core::{
    decode_frame, encode_frame, DisplayId, DisplayMode, ProtocolError, ProviderMessage,
    RegistrationGrant, RegistrationRequest, ServerMessage, SessionId, TerminationReason,
};

use super::{DisplaySession, SessionError, TerminationStream};

/// Writes one framed message to `writer`.
///
/// Shared by the session and by display-server implementations and tests.
pub async fn write_frame<T, W>(writer: &mut W, msg: &T) -> Result<(), SessionError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let bytes = encode_frame(msg)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed message from `reader`.
///
/// # Errors
///
/// Returns [`SessionError::Closed`] on a clean EOF at a frame boundary,
/// [`SessionError::Io`] for other I/O failures, and
/// [`SessionError::Protocol`] for malformed frames.
pub async fn read_frame<T, R>(reader: &mut R) -> Result<T, SessionError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(SessionError::Closed)
        }
        Err(e) => return Err(SessionError::Io(e)),
    }

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(SessionError::Protocol(ProtocolError::FrameTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD_SIZE,
        }));
    }

    let mut buf = vec![0u8; HEADER_SIZE + payload_len];
    buf[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut buf[HEADER_SIZE..]).await?;

    // Version and framing are re-checked on the assembled buffer.
    let (msg, _) = decode_frame(&buf)?;
    Ok(msg)
}

/// Write half plus the reply stream, locked together for the duration of
/// one request round-trip.
struct RequestIo {
    writer: OwnedWriteHalf,
    replies: mpsc::UnboundedReceiver<ServerMessage>,
}

/// A display-server session over one TCP connection.
pub struct TcpDisplaySession {
    id: SessionId,
    server_addr: SocketAddr,
    io: Mutex<RequestIo>,
    termination_rx: StdMutex<Option<TerminationStream>>,
}

impl TcpDisplaySession {
    /// Connects to a display server and spawns the frame reader.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectFailed`] if the TCP connection could
    /// not be established.
    pub async fn connect(addr: SocketAddr) -> Result<Self, SessionError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| SessionError::ConnectFailed { addr, source })?;

        let (read_half, writer) = stream.into_split();
        let (reply_tx, replies) = mpsc::unbounded_channel();
        let (termination_tx, termination_rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        tokio::spawn(read_loop(id, read_half, reply_tx, termination_tx));
        info!(session = %id, server = %addr, "display server session opened");

        Ok(Self {
            id,
            server_addr: addr,
            io: Mutex::new(RequestIo { writer, replies }),
            termination_rx: StdMutex::new(Some(termination_rx)),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Sends one request and waits for the next reply. The lock pairs
    /// replies with requests by order.
    async fn round_trip(&self, request: &ProviderMessage) -> Result<ServerMessage, SessionError> {
        let mut io = self.io.lock().await;
        write_frame(&mut io.writer, request).await?;
        io.replies.recv().await.ok_or(SessionError::Closed)
    }
}

#[async_trait]
impl DisplaySession for TcpDisplaySession {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationGrant, SessionError> {
        match self
            .round_trip(&ProviderMessage::Register(request))
            .await?
        {
            ServerMessage::Registered(grant) => {
                info!(session = %self.id, display = %grant.display_id, "registration granted");
                Ok(grant)
            }
            ServerMessage::Rejected { reason } => Err(SessionError::Rejected(reason)),
            other => {
                warn!(session = %self.id, ?other, "unexpected reply to registration");
                Err(SessionError::UnexpectedReply)
            }
        }
    }

    async fn push_settings(
        &self,
        display_id: DisplayId,
        modes: Vec<DisplayMode>,
        hi_dpi: bool,
    ) -> Result<(), SessionError> {
        let request = ProviderMessage::PushSettings {
            display_id,
            modes,
            hi_dpi,
        };
        match self.round_trip(&request).await? {
            ServerMessage::SettingsAck { .. } => Ok(()),
            ServerMessage::Rejected { reason } => Err(SessionError::Rejected(reason)),
            other => {
                warn!(session = %self.id, ?other, "unexpected reply to settings push");
                Err(SessionError::UnexpectedReply)
            }
        }
    }

    async fn deregister(&self, display_id: DisplayId) -> Result<(), SessionError> {
        match self
            .round_trip(&ProviderMessage::Deregister { display_id })
            .await?
        {
            ServerMessage::DeregisterAck { .. } => Ok(()),
            ServerMessage::Rejected { reason } => Err(SessionError::Rejected(reason)),
            other => {
                warn!(session = %self.id, ?other, "unexpected reply to deregister");
                Err(SessionError::UnexpectedReply)
            }
        }
    }

    fn take_terminations(&self) -> Option<TerminationStream> {
        self.termination_rx
            .lock()
            .expect("termination stream lock poisoned")
            .take()
    }
}

/// Decodes inbound frames and routes them until the connection dies.
async fn read_loop(
    session: SessionId,
    mut reader: OwnedReadHalf,
    reply_tx: mpsc::UnboundedSender<ServerMessage>,
    termination_tx: mpsc::UnboundedSender<TerminationReason>,
) {
    loop {
        match read_frame::<ServerMessage, _>(&mut reader).await {
            Ok(ServerMessage::Terminated { display_id, reason }) => {
                debug!(%session, display = %display_id, %reason, "termination notice received");
                if termination_tx.send(reason).is_err() {
                    // Nobody left to notify; the session is finished.
                    break;
                }
            }
            Ok(reply) => {
                if reply_tx.send(reply).is_err() {
                    break;
                }
            }
            Err(SessionError::Closed) => {
                debug!(%session, "display server closed the connection");
                break;
            }
            Err(e) => {
                warn!(%session, error = %e, "session read failed");
                let _ = termination_tx.send(TerminationReason::SessionFailure(e.to_string()));
                break;
            }
        }
    }
    // Dropping the senders here unblocks any pending round trip with
    // `Closed` and ends the display's lifecycle monitor.
}
