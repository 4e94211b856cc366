//! `Drive`: lifecycle facade that owns the session, the cyclic sender, the
//! listener, the current-payload store, and the input snapshot.

use crate::command::{CommandEngine, Keep, ProgressFn};
use crate::config::DriveConfig;
use crate::error::{Error, Result};
use crate::listener::{LatestInput, UdpListener};
use crate::sender::{handshake, ConnState, CyclicSender};
use socket2::{Domain, Socket, Type};
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Packet-count / freshness snapshot of the T->O listener, for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerStats {
    pub packets: u64,
    pub last_len: usize,
    pub last_recv: Option<Instant>,
}

/// Builds a [`Drive`] from a [`DriveConfig`] before any I/O happens.
pub struct DriveBuilder {
    config: DriveConfig,
}

impl DriveBuilder {
    pub fn new(config: DriveConfig) -> Self {
        Self { config }
    }

    /// Perform the ENIP handshake and start the cyclic sender + listener.
    pub fn connect(self) -> Result<Drive> {
        Drive::connect(self.config)
    }
}

/// A live connection to one motor drive.
///
/// Owns the shared UDP socket, the connection state (behind a mutex shared
/// with the cyclic sender's reconnect path), the current O->T payload
/// store, the listener's published input snapshot, and the command engine.
pub struct Drive {
    config: DriveConfig,
    udp: Arc<UdpSocket>,
    conn: Arc<Mutex<Option<ConnState>>>,
    payload: Arc<Mutex<Vec<u8>>>,
    latest_input: Arc<Mutex<LatestInput>>,
    sender: Option<CyclicSender>,
    listener: Option<UdpListener>,
    engine: CommandEngine,
}

impl Drive {
    /// Perform the ENIP handshake against `config.drive_ip` and start the
    /// cyclic sender and UDP listener. The current payload starts at STOP.
    pub fn connect(config: DriveConfig) -> Result<Self> {
        let udp = Arc::new(bind_udp_socket(config.listen_port)?);

        let conn_state = handshake(&config, &udp)?;
        let conn = Arc::new(Mutex::new(Some(conn_state)));

        let payload = Arc::new(Mutex::new(crate::payloads::stop().to_vec()));
        let (listener, latest_input) = UdpListener::spawn(Arc::clone(&udp));
        let sender = CyclicSender::spawn(
            config.clone(),
            Arc::clone(&udp),
            Arc::clone(&conn),
            Arc::clone(&payload),
        );

        let engine = CommandEngine::new(
            Arc::clone(&payload),
            Arc::clone(&latest_input),
            config.rpi,
            config.fixed_out_offset,
        );

        Ok(Self {
            config,
            udp,
            conn,
            payload,
            latest_input,
            sender: Some(sender),
            listener: Some(listener),
            engine,
        })
    }

    /// Stop the cyclic sender and listener and drop the session. The UDP
    /// socket closes once the last `Arc` referencing it (this one) drops.
    pub fn close(&mut self) {
        if let Some(mut sender) = self.sender.take() {
            sender.stop();
        }
        if let Some(mut listener) = self.listener.take() {
            listener.stop();
        }
        *self.conn.lock().unwrap() = None;
    }

    pub fn jog(&mut self, duration: Duration, progress: Option<&mut ProgressFn<'_>>) {
        self.engine.jog(duration, progress);
    }

    pub fn stop(&mut self, progress: Option<&mut ProgressFn<'_>>) {
        self.engine.stop(progress);
    }

    pub fn operation_1(&mut self, timeout: Duration, progress: Option<&mut ProgressFn<'_>>) -> bool {
        self.engine.operation_1(timeout, progress)
    }

    pub fn operation_2(&mut self, timeout: Duration, progress: Option<&mut ProgressFn<'_>>) -> bool {
        self.engine.operation_2(timeout, progress)
    }

    pub fn pause(&mut self, seconds: Duration, keep: Keep, progress: Option<&mut ProgressFn<'_>>) -> Result<()> {
        self.engine.pause(seconds, keep, progress)
    }

    pub fn trigger(&mut self) {
        self.engine.trigger();
    }

    pub fn de_trigger(&mut self) {
        self.engine.de_trigger();
    }

    pub fn free(&mut self) {
        self.engine.free();
    }

    pub fn no_op(&mut self) {
        self.engine.no_op();
    }

    /// Poll the input snapshot once without issuing any command, updating
    /// the status decoder in place.
    pub fn poll_status(&mut self) {
        self.engine.poll();
    }

    pub fn is_ready(&self) -> bool {
        self.engine.status().ready()
    }

    pub fn is_in_pos(&self) -> bool {
        self.engine.status().in_pos()
    }

    /// The Fixed-I/O offset the status decoder has locked in, if any.
    pub fn fixed_out_offset(&self) -> Option<usize> {
        self.engine.status().offset()
    }

    /// The most recently parsed T->O application bytes.
    pub fn last_input_app(&self) -> Vec<u8> {
        self.latest_input.lock().unwrap().app.clone()
    }

    /// The raw bytes of the most recently received T->O datagram.
    pub fn last_input_packet(&self) -> Vec<u8> {
        self.latest_input.lock().unwrap().raw.clone()
    }

    /// The O->T payload currently being streamed by the cyclic sender.
    pub fn current_payload(&self) -> Vec<u8> {
        self.payload.lock().unwrap().clone()
    }

    pub fn listener_stats(&self) -> ListenerStats {
        let guard = self.latest_input.lock().unwrap();
        ListenerStats {
            packets: guard.packets,
            last_len: guard.raw.len(),
            last_recv: guard.last_recv,
        }
    }

    /// Human-friendly one-liner showing app length, hex, Fixed I/O word and
    /// bits -- the app length and app hex reflect what the status decoder
    /// last saw, not merely the latest raw datagram.
    pub fn debug_snapshot(&self) -> String {
        let app = self.last_input_app();
        let status = self.engine.status();
        let fixed = status.fixed_out();
        format!(
            "app_len={} off={} fixed_out=0x{:04X} bits(MSB->LSB)={} app_hex={}",
            status.last_app().len(),
            status.effective_offset(),
            fixed.raw,
            fixed.bit_string(),
            crate::wire::to_hex(&app),
        )
    }
}

impl Drop for Drive {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build the shared UDP socket: address reuse, bound to `0.0.0.0:port`.
/// Left unconnected here -- `handshake` connects it to the drive once
/// ForwardOpen succeeds (spec's Open Question: this restricts inbound
/// datagrams to that one peer, unconditionally).
fn bind_udp_socket(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, None).map_err(Error::Io)?;
    socket.set_reuse_address(true).map_err(Error::Io)?;
    let bind_addr: SocketAddr = ([0, 0, 0, 0], port).into();
    socket.bind(&bind_addr.into()).map_err(Error::Io)?;
    Ok(socket.into())
}
