//! Fake drive fixture shared by the end-to-end scenario tests.
//!
//! Answers the ENIP handshake over TCP and emits a T->O CPF stream over UDP
//! on demand: just enough protocol to exercise the driver, nothing
//! conformant.

#![allow(dead_code)]

use enip_motion::cpf;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

static LOG_INIT: Once = Once::new();

/// Initialize `env_logger` once so `RUST_LOG=debug` surfaces the crate's
/// handshake/reconnect/listener tracing while an integration test runs.
pub fn init_test_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::try_init();
    });
}

#[derive(Debug, Clone, Copy)]
pub struct FakeDriveConfig {
    pub session_handle: u32,
    pub conn_id: u32,
    /// Offset (4 or 8) at which the fake T->O frames carry the Fixed-I/O word.
    pub fixed_io_offset: usize,
    /// If set, the T->O stream reports IN-POS only after this much time has
    /// elapsed since the first O->T frame was observed.
    pub in_pos_after: Option<Duration>,
    /// If set, the TCP connection is dropped this long after ForwardOpen
    /// replies, to exercise the sender's reconnect path.
    pub close_tcp_after: Option<Duration>,
    /// Reply to ForwardOpen with a non-zero CIP general status (handshake
    /// failure) instead of a connection id.
    pub fail_forward_open: bool,
}

impl Default for FakeDriveConfig {
    fn default() -> Self {
        Self {
            session_handle: 0x1122_3344,
            conn_id: 0x0A0B_0C0D,
            fixed_io_offset: 4,
            in_pos_after: None,
            close_tcp_after: None,
            fail_forward_open: false,
        }
    }
}

pub struct FakeDrive {
    pub tcp_port: u16,
    pub udp_port: u16,
}

impl FakeDrive {
    /// Bind TCP and UDP listeners on ephemeral loopback ports and spawn the
    /// handler threads. Threads run for the lifetime of the test process;
    /// they exit quietly once their sockets are dropped by the test or the
    /// process ends.
    pub fn spawn(cfg: FakeDriveConfig) -> Self {
        init_test_logging();

        let tcp_listener = TcpListener::bind("127.0.0.1:0").expect("bind fake tcp listener");
        let tcp_port = tcp_listener.local_addr().unwrap().port();

        let udp_socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake udp socket");
        let udp_port = udp_socket.local_addr().unwrap().port();

        thread::spawn(move || accept_loop(tcp_listener, cfg));
        thread::spawn(move || udp_loop(udp_socket, cfg));

        Self { tcp_port, udp_port }
    }
}

fn accept_loop(listener: TcpListener, cfg: FakeDriveConfig) {
    for stream in listener.incoming() {
        let Ok(stream) = stream else { break };
        thread::spawn(move || handle_connection(stream, cfg));
    }
}

fn handle_connection(mut stream: TcpStream, cfg: FakeDriveConfig) {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    let mut buf = [0u8; 8192];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        if n < 2 {
            continue;
        }
        let command = u16::from_le_bytes([buf[0], buf[1]]);
        match command {
            0x0065 => {
                let reply = register_session_reply(cfg.session_handle);
                if stream.write_all(&reply).is_err() {
                    return;
                }
            }
            0x006f => {
                let reply = forward_open_reply(cfg.conn_id, cfg.fail_forward_open);
                if stream.write_all(&reply).is_err() {
                    return;
                }
                if let Some(delay) = cfg.close_tcp_after {
                    thread::sleep(delay);
                    return;
                }
            }
            _ => {
                // SendUnitData mirror frames and anything else: no reply expected.
            }
        }
    }
}

fn register_session_reply(session: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(28);
    out.extend_from_slice(&0x0065u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&session.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

fn forward_open_reply(conn_id: u32, fail: bool) -> Vec<u8> {
    let general_status: u8 = if fail { 0x08 } else { 0x00 };
    let mut cip_reply = vec![0xCBu8, 0x00, general_status, 0x00];
    cip_reply.extend_from_slice(&conn_id.to_le_bytes());

    let mut body = Vec::new();
    body.extend_from_slice(&[0u8; 6]);
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend_from_slice(&0x00B2u16.to_le_bytes());
    body.extend_from_slice(&(cip_reply.len() as u16).to_le_bytes());
    body.extend_from_slice(&cip_reply);

    let mut out = Vec::new();
    out.extend_from_slice(&0x006fu16.to_le_bytes());
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(&0x1122_3344u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&body);
    out
}

fn udp_loop(socket: UdpSocket, cfg: FakeDriveConfig) {
    socket.set_read_timeout(Some(Duration::from_millis(200))).ok();
    let mut buf = [0u8; 2048];
    let mut peer: Option<SocketAddr> = None;
    let mut first_seen: Option<Instant> = None;

    loop {
        if let Ok((_, addr)) = socket.recv_from(&mut buf) {
            peer = Some(addr);
            first_seen.get_or_insert_with(Instant::now);
        }

        let Some(addr) = peer else { continue };
        let elapsed_since_first = first_seen.map(|t| t.elapsed()).unwrap_or_default();
        let in_pos = cfg
            .in_pos_after
            .is_some_and(|threshold| elapsed_since_first >= threshold);

        let app = fake_input_app(cfg.fixed_io_offset, in_pos);
        let frame = cpf::build_o2t_frame(cfg.conn_id, 1, 1, &app);
        let _ = socket.send_to(&frame, addr);
    }
}

/// Build 44 input-application bytes with the Fixed-I/O word (bit2 = IN-POS
/// when `in_pos`) at `offset`.
pub fn fake_input_app(offset: usize, in_pos: bool) -> Vec<u8> {
    let mut app = vec![0u8; 44];
    if in_pos {
        app[offset..offset + 2].copy_from_slice(&0x0004u16.to_le_bytes());
    }
    app
}
