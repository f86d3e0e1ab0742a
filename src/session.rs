//! Device session: handshake and register access RPCs.
//!
//! A [`DeviceSession`] binds one server-assigned device id on one
//! connection. Construction pings the server and resolves a list of
//! [`CompatSpec`]s through a `Query`; afterwards reads and writes address
//! the bound device until [`DeviceSession::bye`] is sent.
//!
//! The protocol is half-duplex: every request that expects an answer is
//! followed by exactly one read of the response before anything else is
//! sent. Methods take `&mut self`, so sharing a session across tasks needs
//! external locking around each call.

use std::io;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::protocol::{
    Command, DeviceMatch, ErrorMessage, Frame, ReadRequest, WriteRequest, decode_query_response,
    decode_read_response, encode_query, read_frame, write_frame,
};
use crate::transport::ByteStream;
use crate::types::CompatSpec;

/// Session configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Which entry of the query response to bind (0 = first).
    pub device_index: usize,
    /// Limit on each response read. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Creates a new session configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query response entry to bind.
    #[must_use]
    pub const fn device_index(mut self, index: usize) -> Self {
        self.device_index = index;
        self
    }

    /// Sets the response read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

/// A device bound on an HWIO server.
///
/// The session borrows the connection in spirit: it never closes it, and
/// [`bye`](Self::bye) hands the stream back. Pass `&mut stream` to keep
/// ownership outright.
#[derive(Debug)]
pub struct DeviceSession<S> {
    stream: S,
    device: DeviceMatch,
    matches: Vec<DeviceMatch>,
    read_timeout: Option<Duration>,
    poisoned: bool,
}

impl<S: ByteStream> DeviceSession<S> {
    /// Binds the first device matching any of `specs`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Handshake` if the server fails the echo check or
    /// reports no matching device, `Error::InvalidArgument` if a
    /// descriptor cannot be encoded, and `Error::Transport` if the stream
    /// fails.
    pub async fn connect(stream: S, specs: &[CompatSpec]) -> Result<Self> {
        Self::connect_with_config(stream, specs, SessionConfig::default()).await
    }

    /// Binds a device with custom configuration.
    pub async fn connect_with_config(
        mut stream: S,
        specs: &[CompatSpec],
        config: SessionConfig,
    ) -> Result<Self> {
        let query = Frame::new(Command::Query, encode_query(specs)?)?;
        let timeout = config.read_timeout;

        tracing::debug!("checking server with echo");
        let reply = exchange(&mut stream, timeout, &Frame::empty(Command::EchoRequest)).await?;
        if !reply.is_empty_of(Command::EchoReply) {
            return Err(Error::handshake(format!(
                "server not responding: {}",
                describe(&reply)
            )));
        }

        tracing::debug!("querying {} compatibility descriptors", specs.len());
        let reply = exchange(&mut stream, timeout, &query).await?;
        if reply.kind() != Some(Command::QueryResp) {
            return Err(Error::handshake(format!(
                "wrong query response: {}",
                describe(&reply)
            )));
        }

        let matches = decode_query_response(reply.body())
            .map_err(|e| Error::handshake(format!("malformed query response: {e}")))?;
        tracing::debug!("found {} devices", matches.len());
        if matches.is_empty() {
            return Err(Error::handshake("no matching device"));
        }

        let device = *matches.get(config.device_index).ok_or_else(|| {
            Error::handshake(format!(
                "device index {} out of range, server found {}",
                config.device_index,
                matches.len()
            ))
        })?;
        tracing::debug!(
            "bound device id {} (type index {})",
            device.device_id,
            device.type_index
        );

        Ok(Self {
            stream,
            device,
            matches,
            read_timeout: timeout,
            poisoned: false,
        })
    }
}

impl<S> DeviceSession<S> {
    /// Bound device id.
    #[must_use]
    pub const fn device_id(&self) -> u8 {
        self.device.device_id
    }

    /// Server type index of the bound device.
    #[must_use]
    pub const fn device_type_index(&self) -> u8 {
        self.device.type_index
    }

    /// Every device the server returned for the query, in server order.
    #[must_use]
    pub fn matches(&self) -> &[DeviceMatch] {
        &self.matches
    }

    /// Returns true once a transport or protocol failure has left the
    /// stream at an unknown frame boundary.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Returns the stream without sending `Bye`.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: ByteStream> DeviceSession<S> {
    /// Checks that the server answers an echo.
    ///
    /// Returns `true` on success; any other outcome is an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` unless the reply is an empty `EchoReply`.
    pub async fn ping(&mut self) -> Result<bool> {
        let reply = self.request(&Frame::empty(Command::EchoRequest)).await?;
        if reply.is_empty_of(Command::EchoReply) {
            Ok(true)
        } else {
            Err(self.poison(unexpected("wrong response on ping", reply)))
        }
    }

    /// Reads a register.
    ///
    /// `size` is the requested access width. The server always answers
    /// with one 32-bit word, so the result is a `u32` regardless.
    pub async fn read(&mut self, offset: u32, size: u16) -> Result<u32> {
        let request = ReadRequest {
            device_id: self.device.device_id,
            addr: offset,
            size,
        };
        let reply = self
            .request(&Frame::new(Command::Read, request.encode())?)
            .await?;
        if reply.kind() != Some(Command::ReadResp) {
            return Err(self.poison(unexpected("wrong response type", reply)));
        }
        let decoded = decode_read_response(reply.body());
        match decoded {
            Ok(value) => Ok(value),
            Err(Error::Protocol { message, .. }) => Err(self.poison(Error::Protocol {
                message,
                frame: Some(Box::new(reply)),
            })),
            Err(e) => Err(self.poison(e)),
        }
    }

    /// Reads with a 1-byte access width.
    pub async fn read8(&mut self, offset: u32) -> Result<u32> {
        self.read(offset, 1).await
    }

    /// Reads with a 2-byte access width.
    pub async fn read16(&mut self, offset: u32) -> Result<u32> {
        self.read(offset, 2).await
    }

    /// Reads with a 4-byte access width.
    pub async fn read32(&mut self, offset: u32) -> Result<u32> {
        self.read(offset, 4).await
    }

    /// Reads with an 8-byte access width. Still yields a single 32-bit word.
    pub async fn read64(&mut self, offset: u32) -> Result<u32> {
        self.read(offset, 8).await
    }

    /// Writes raw bytes at `offset`.
    ///
    /// Writes are not acknowledged; this returns once the frame is sent.
    pub async fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let request = WriteRequest {
            device_id: self.device.device_id,
            addr: offset,
            data: Bytes::copy_from_slice(data),
        };
        let frame = Frame::new(Command::Write, request.encode()?)?;
        self.send(&frame).await
    }

    /// Writes one byte.
    pub async fn write8(&mut self, offset: u32, value: u8) -> Result<()> {
        self.write(offset, &value.to_le_bytes()).await
    }

    /// Writes a little-endian 16-bit value.
    pub async fn write16(&mut self, offset: u32, value: u16) -> Result<()> {
        self.write(offset, &value.to_le_bytes()).await
    }

    /// Writes a little-endian 32-bit value.
    pub async fn write32(&mut self, offset: u32, value: u32) -> Result<()> {
        self.write(offset, &value.to_le_bytes()).await
    }

    /// Writes a little-endian 64-bit value.
    pub async fn write64(&mut self, offset: u32, value: u64) -> Result<()> {
        self.write(offset, &value.to_le_bytes()).await
    }

    /// Writes a pre-encoded 1-byte value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `data` is not exactly 1 byte.
    pub async fn write8_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.write_exact(offset, 1, data).await
    }

    /// Writes a pre-encoded 2-byte value.
    pub async fn write16_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.write_exact(offset, 2, data).await
    }

    /// Writes a pre-encoded 4-byte value.
    pub async fn write32_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.write_exact(offset, 4, data).await
    }

    /// Writes a pre-encoded 8-byte value.
    pub async fn write64_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.write_exact(offset, 8, data).await
    }

    async fn write_exact(&mut self, offset: u32, width: usize, data: &[u8]) -> Result<()> {
        if data.len() != width {
            return Err(Error::invalid_argument(format!(
                "{}-bit write needs {width} bytes, got {}",
                width * 8,
                data.len()
            )));
        }
        self.write(offset, data).await
    }

    /// Ends the session and returns the stream, still open.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the session is poisoned and
    /// `Error::Transport` if sending fails.
    pub async fn bye(mut self) -> Result<S> {
        self.send(&Frame::empty(Command::Bye)).await?;
        tracing::debug!("session for device {} closed", self.device.device_id);
        Ok(self.stream)
    }

    /// Sends a frame and reads the single response.
    async fn request(&mut self, frame: &Frame) -> Result<Frame> {
        self.check()?;
        let result = exchange(&mut self.stream, self.read_timeout, frame).await;
        result.map_err(|e| self.poison(e))
    }

    /// Sends a frame that has no response.
    async fn send(&mut self, frame: &Frame) -> Result<()> {
        self.check()?;
        let result = write_frame(&mut self.stream, frame).await;
        result.map_err(|e| self.poison(e))
    }

    fn check(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::protocol(
                "session is desynchronized by an earlier failure",
            ));
        }
        Ok(())
    }

    fn poison(&mut self, error: Error) -> Error {
        if error.is_transport() || error.is_protocol() {
            tracing::warn!(
                "session for device {} poisoned: {}",
                self.device.device_id,
                error
            );
            self.poisoned = true;
        }
        error
    }
}

/// Writes `frame` and reads one response, honouring the read timeout.
async fn exchange<S>(stream: &mut S, timeout: Option<Duration>, frame: &Frame) -> Result<Frame>
where
    S: ByteStream + ?Sized,
{
    write_frame(stream, frame).await?;
    match timeout {
        Some(limit) => tokio::time::timeout(limit, read_frame(stream))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no response within {}ms", limit.as_millis()),
                )
            })?,
        None => read_frame(stream).await,
    }
}

/// Summarizes a frame for error messages, decoding server error reports.
fn describe(frame: &Frame) -> String {
    if frame.kind() == Some(Command::ErrorMsg) {
        if let Ok(report) = ErrorMessage::decode(frame.body()) {
            tracing::warn!("server reported error {}", report);
            return format!("server error {report}");
        }
    }
    frame.to_string()
}

fn unexpected(context: &str, frame: Frame) -> Error {
    Error::Protocol {
        message: format!("{context}: {}", describe(&frame)),
        frame: Some(Box::new(frame)),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::protocol::{ServerErrorCode, decode_query, encode_query_response};
    use crate::types::Version;

    fn tsu_spec() -> CompatSpec {
        CompatSpec::new("ug4-150", "axi_tsu", Version::ANY)
    }

    fn echo_reply() -> Option<Frame> {
        Some(Frame::empty(Command::EchoReply))
    }

    fn query_resp(body: &[u8]) -> Option<Frame> {
        Some(Frame::new(Command::QueryResp, body.to_vec()).unwrap())
    }

    fn read_resp(value: u32) -> Option<Frame> {
        Some(Frame::new(Command::ReadResp, value.to_le_bytes().to_vec()).unwrap())
    }

    /// Scripted server: reads one frame per entry and answers with the
    /// entry, if any. Returns every frame it received.
    fn spawn_server(
        mut server: DuplexStream,
        replies: Vec<Option<Frame>>,
    ) -> JoinHandle<(DuplexStream, Vec<Frame>)> {
        tokio::spawn(async move {
            let mut received = Vec::new();
            for reply in replies {
                let Ok(frame) = read_frame(&mut server).await else {
                    break;
                };
                received.push(frame);
                if let Some(reply) = reply {
                    write_frame(&mut server, &reply).await.unwrap();
                }
            }
            (server, received)
        })
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn bound_session(
        extra: Vec<Option<Frame>>,
    ) -> (
        DeviceSession<DuplexStream>,
        JoinHandle<(DuplexStream, Vec<Frame>)>,
    ) {
        init_tracing();
        let (client, server) = tokio::io::duplex(4096);
        let mut replies = vec![echo_reply(), query_resp(&[0x00, 0x05])];
        replies.extend(extra);
        let server = spawn_server(server, replies);
        let session = DeviceSession::connect(client, &[tsu_spec()]).await.unwrap();
        (session, server)
    }

    #[tokio::test]
    async fn test_end_to_end_query_and_read() {
        let (mut session, server) = bound_session(vec![read_resp(42)]).await;
        assert_eq!(session.device_id(), 5);
        assert_eq!(session.device_type_index(), 0);

        assert_eq!(session.read32(0x10).await.unwrap(), 42);

        let (_, received) = server.await.unwrap();
        assert_eq!(received.len(), 3);
        assert!(received[0].is_empty_of(Command::EchoRequest));

        assert_eq!(received[1].kind(), Some(Command::Query));
        assert_eq!(received[1].body().len(), CompatSpec::SIZE);
        assert_eq!(decode_query(received[1].body()).unwrap(), vec![tsu_spec()]);

        assert_eq!(received[2].kind(), Some(Command::Read));
        assert_eq!(
            ReadRequest::decode(received[2].body()).unwrap(),
            ReadRequest {
                device_id: 5,
                addr: 0x10,
                size: 4
            }
        );
    }

    #[tokio::test]
    async fn test_query_carries_every_descriptor() {
        let (client, server) = tokio::io::duplex(4096);
        let specs = vec![
            tsu_spec(),
            CompatSpec::new("xlnx", "microblaze", Version::new(9, 5, -1)).with_name("cpu"),
        ];
        let server = spawn_server(server, vec![echo_reply(), query_resp(&[1, 9])]);

        let session = DeviceSession::connect(client, &specs).await.unwrap();
        assert_eq!(session.device_id(), 9);

        let (_, received) = server.await.unwrap();
        assert_eq!(received[1].body().len(), 2 * CompatSpec::SIZE);
        assert_eq!(decode_query(received[1].body()).unwrap(), specs);
    }

    #[tokio::test]
    async fn test_empty_query_response_fails_handshake() {
        let (client, server) = tokio::io::duplex(4096);
        let _server = spawn_server(server, vec![echo_reply(), query_resp(&[])]);

        let err = DeviceSession::connect(client, &[tsu_spec()])
            .await
            .unwrap_err();
        assert!(err.is_handshake());
        assert_eq!(err.to_string(), "handshake error: no matching device");
    }

    #[tokio::test]
    async fn test_wrong_echo_fails_handshake() {
        let (client, server) = tokio::io::duplex(4096);
        let _server = spawn_server(server, vec![read_resp(0)]);

        let err = DeviceSession::connect(client, &[tsu_spec()])
            .await
            .unwrap_err();
        assert!(err.is_handshake());
        assert!(err.to_string().contains("server not responding"));
    }

    #[tokio::test]
    async fn test_echo_with_body_fails_handshake() {
        let (client, server) = tokio::io::duplex(4096);
        let reply = Frame::new(Command::EchoReply, vec![1]).unwrap();
        let _server = spawn_server(server, vec![Some(reply)]);

        let err = DeviceSession::connect(client, &[tsu_spec()])
            .await
            .unwrap_err();
        assert!(err.is_handshake());
    }

    #[tokio::test]
    async fn test_wrong_query_response_fails_handshake() {
        let (client, server) = tokio::io::duplex(4096);
        let error = ErrorMessage {
            code: ServerErrorCode::DeviceCountExceeded as i32,
            message: "too many devices".into(),
        };
        let reply = Frame::new(Command::ErrorMsg, error.encode()).unwrap();
        let _server = spawn_server(server, vec![echo_reply(), Some(reply)]);

        let err = DeviceSession::connect(client, &[tsu_spec()])
            .await
            .unwrap_err();
        assert!(err.is_handshake());
        assert!(err.to_string().contains("too many devices"));
    }

    #[tokio::test]
    async fn test_handshake_on_closed_stream_is_transport_error() {
        let (client, server) = tokio::io::duplex(4096);
        drop(server);

        let err = DeviceSession::connect(client, &[tsu_spec()])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_oversized_descriptor_is_rejected_before_sending() {
        let (client, server) = tokio::io::duplex(4096);
        let server = spawn_server(server, vec![echo_reply()]);
        let spec = CompatSpec::new("x".repeat(200), "axi_tsu", Version::ANY);

        let err = DeviceSession::connect(client, &[spec]).await.unwrap_err();
        assert!(err.is_invalid_argument());

        let (_, received) = server.await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_device_index_selects_match() {
        let (client, server) = tokio::io::duplex(4096);
        let _server = spawn_server(server, vec![echo_reply(), query_resp(&[0, 5, 1, 7])]);

        let config = SessionConfig::new().device_index(1);
        let session = DeviceSession::connect_with_config(client, &[tsu_spec()], config)
            .await
            .unwrap();
        assert_eq!(session.device_id(), 7);
        assert_eq!(session.device_type_index(), 1);
        assert_eq!(
            session.matches(),
            &[
                DeviceMatch {
                    type_index: 0,
                    device_id: 5
                },
                DeviceMatch {
                    type_index: 1,
                    device_id: 7
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_device_index_out_of_range() {
        let (client, server) = tokio::io::duplex(4096);
        let _server = spawn_server(server, vec![echo_reply(), query_resp(&[0, 5])]);

        let config = SessionConfig::new().device_index(1);
        let err = DeviceSession::connect_with_config(client, &[tsu_spec()], config)
            .await
            .unwrap_err();
        assert!(err.is_handshake());
    }

    #[tokio::test]
    async fn test_ping() {
        let (mut session, _server) = bound_session(vec![echo_reply()]).await;
        assert!(session.ping().await.unwrap());
        assert!(!session.is_poisoned());
    }

    #[tokio::test]
    async fn test_ping_wrong_reply_is_protocol_error() {
        let reply = Frame::new(Command::EchoReply, vec![0xAB]).unwrap();
        let (mut session, _server) = bound_session(vec![Some(reply)]).await;

        let err = session.ping().await.unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(err.frame().map(Frame::command), Some(Command::EchoReply as u8));
        assert!(session.is_poisoned());
    }

    #[tokio::test]
    async fn test_read_widths_share_word_response() {
        let (mut session, server) =
            bound_session(vec![read_resp(1), read_resp(2), read_resp(0xDEAD_BEEF)]).await;

        assert_eq!(session.read8(0x00).await.unwrap(), 1);
        assert_eq!(session.read16(0x04).await.unwrap(), 2);
        assert_eq!(session.read64(0x08).await.unwrap(), 0xDEAD_BEEF);

        let (_, received) = server.await.unwrap();
        let sizes: Vec<u16> = received[2..]
            .iter()
            .map(|f| ReadRequest::decode(f.body()).unwrap().size)
            .collect();
        assert_eq!(sizes, vec![1, 2, 8]);
    }

    #[tokio::test]
    async fn test_read_wrong_response_type() {
        let (mut session, _server) = bound_session(vec![echo_reply()]).await;

        let err = session.read32(0x10).await.unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("wrong response type"));
        assert!(session.is_poisoned());

        let again = session.read32(0x10).await.unwrap_err();
        assert!(again.is_protocol());
        assert!(again.to_string().contains("desynchronized"));
    }

    #[tokio::test]
    async fn test_read_server_error_is_reported() {
        let error = ErrorMessage {
            code: ServerErrorCode::AccessDenied as i32,
            message: "device 5 not associated".into(),
        };
        let reply = Frame::new(Command::ErrorMsg, error.encode()).unwrap();
        let (mut session, _server) = bound_session(vec![Some(reply)]).await;

        let err = session.read32(0x10).await.unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("AccessDenied"));
        assert_eq!(err.frame().and_then(Frame::kind), Some(Command::ErrorMsg));
    }

    #[tokio::test]
    async fn test_read_short_body_is_protocol_error() {
        let reply = Frame::new(Command::ReadResp, vec![0x2A, 0x00]).unwrap();
        let (mut session, _server) = bound_session(vec![Some(reply)]).await;

        let err = session.read32(0x10).await.unwrap_err();
        assert!(err.is_protocol());
        assert!(err.frame().is_some());
    }

    #[tokio::test]
    async fn test_read_after_peer_closed_is_transport_error() {
        let (mut session, server) = bound_session(vec![]).await;
        drop(server.await.unwrap());

        let err = session.read32(0x10).await.unwrap_err();
        assert!(err.is_transport());
        assert!(session.is_poisoned());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let (client, mut server) = tokio::io::duplex(4096);
        let peer = tokio::spawn(async move {
            read_frame(&mut server).await.unwrap();
            write_frame(&mut server, &Frame::empty(Command::EchoReply))
                .await
                .unwrap();
            read_frame(&mut server).await.unwrap();
            let resp = Frame::new(Command::QueryResp, vec![0, 5]).unwrap();
            write_frame(&mut server, &resp).await.unwrap();
            // Swallow the read request and never answer.
            read_frame(&mut server).await.unwrap();
            std::future::pending::<()>().await;
        });

        let config = SessionConfig::new().read_timeout(Duration::from_secs(1));
        let mut session = DeviceSession::connect_with_config(client, &[tsu_spec()], config)
            .await
            .unwrap();

        let err = session.read32(0x10).await.unwrap_err();
        match &err {
            Error::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(session.is_poisoned());
        peer.abort();
    }

    #[tokio::test]
    async fn test_write_layout() {
        let (mut session, server) = bound_session(vec![None, None, None]).await;

        session.write16(0x20, 0x1234).await.unwrap();
        session.write32(0x24, 1).await.unwrap();
        session.write(0x28, b"abc").await.unwrap();

        let (_, received) = server.await.unwrap();
        assert_eq!(received[2].kind(), Some(Command::Write));
        assert_eq!(
            &received[2].body()[..],
            &[5, 0x20, 0, 0, 0, 2, 0, 0x34, 0x12]
        );

        let write32 = WriteRequest::decode(received[3].body()).unwrap();
        assert_eq!(write32.addr, 0x24);
        assert_eq!(&write32.data[..], &[1, 0, 0, 0]);

        let raw = WriteRequest::decode(received[4].body()).unwrap();
        assert_eq!(&raw.data[..], b"abc");
    }

    #[tokio::test]
    async fn test_write_pre_encoded_widths() {
        let (mut session, server) = bound_session(vec![None, None, None]).await;

        session.write8_bytes(0x0, &[0xFF]).await.unwrap();
        session.write32_bytes(0x4, &[1, 2, 3, 4]).await.unwrap();
        session.write64(0x8, u64::MAX).await.unwrap();

        let (_, received) = server.await.unwrap();
        let widths: Vec<usize> = received[2..]
            .iter()
            .map(|f| WriteRequest::decode(f.body()).unwrap().data.len())
            .collect();
        assert_eq!(widths, vec![1, 4, 8]);
    }

    #[tokio::test]
    async fn test_write_wrong_width_is_invalid_argument() {
        let (mut session, server) = bound_session(vec![echo_reply()]).await;

        let err = session.write16_bytes(0x20, &[1, 2, 3]).await.unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(session.write64_bytes(0x20, &[0; 4]).await.is_err());
        assert!(!session.is_poisoned());

        // Nothing went on the wire; the next exchange is still in sync.
        assert!(session.ping().await.unwrap());
        let (_, received) = server.await.unwrap();
        assert!(received[2].is_empty_of(Command::EchoRequest));
    }

    #[tokio::test]
    async fn test_bye_returns_open_stream() {
        let (session, server) = bound_session(vec![None]).await;

        let mut stream = session.bye().await.unwrap();
        let (mut server, received) = server.await.unwrap();
        assert!(received[2].is_empty_of(Command::Bye));

        // Stream is still usable by the caller.
        write_frame(&mut server, &Frame::empty(Command::EchoReply))
            .await
            .unwrap();
        let frame = read_frame(&mut stream).await.unwrap();
        assert!(frame.is_empty_of(Command::EchoReply));
    }

    #[tokio::test]
    async fn test_session_over_borrowed_stream() {
        let (mut client, server) = tokio::io::duplex(4096);
        let server = spawn_server(
            server,
            vec![
                echo_reply(),
                Some(
                    Frame::new(
                        Command::QueryResp,
                        encode_query_response(&[DeviceMatch {
                            type_index: 2,
                            device_id: 3,
                        }]),
                    )
                    .unwrap(),
                ),
                None,
            ],
        );

        let session = DeviceSession::connect(&mut client, &[tsu_spec()])
            .await
            .unwrap();
        assert_eq!(session.device_id(), 3);
        session.bye().await.unwrap();

        let (_, received) = server.await.unwrap();
        assert_eq!(received.len(), 3);
        drop(client);
    }
}
