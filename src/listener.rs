//! Background UDP listener for the T->O (drive -> host) input stream.
//!
//! Receives on a shared or dedicated socket, keeps the latest parsed
//! application bytes and raw packet around for the command engine and
//! diagnostics to read, and counts packets for `listener_stats`.

use crate::config::LISTENER_RECV_TIMEOUT;
use crate::cpf;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Snapshot of the most recently received T->O frame, published by the
/// listener thread and read by the caller thread on each poll.
#[derive(Debug, Clone, Default)]
pub struct LatestInput {
    /// Parsed application bytes (CPF Connected-Data payload, CTP sequence
    /// stripped). Empty until the first frame arrives.
    pub app: Vec<u8>,
    /// Raw packet bytes exactly as received, for `last_input_packet`.
    pub raw: Vec<u8>,
    pub packets: u64,
    pub last_recv: Option<Instant>,
}

/// Background receive loop for the T->O stream.
///
/// `stop()` (or `Drop`) signals the thread and joins it. The socket itself
/// is never closed here -- the listener only ever borrows it (shared with
/// the cyclic sender, or owned solely by the caller). Exactly one side
/// closes the socket: whoever holds the last `Arc`, never the listener.
pub struct UdpListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl UdpListener {
    /// Spawn the listener on `socket`, publishing snapshots into a shared
    /// `LatestInput`. Returns the listener handle and the shared state.
    pub fn spawn(socket: Arc<UdpSocket>) -> (Self, Arc<Mutex<LatestInput>>) {
        let latest = Arc::new(Mutex::new(LatestInput::default()));
        let latest_clone = Arc::clone(&latest);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        if let Err(err) = socket.set_read_timeout(Some(LISTENER_RECV_TIMEOUT)) {
            log::warn!("udp listener: failed to set read timeout: {err}");
        }

        let handle = thread::Builder::new()
            .name("enip-motion-listener".into())
            .spawn(move || receive_loop(&socket, &latest_clone, &stop_clone))
            .expect("failed to spawn listener thread");

        (
            Self {
                stop,
                handle: Some(handle),
            },
            latest,
        )
    }

    /// Signal the receive loop to stop and wait for it to exit. Bounded by
    /// the listener's own receive timeout, so this returns within one
    /// `LISTENER_RECV_TIMEOUT` period.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for UdpListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: &UdpSocket, latest: &Mutex<LatestInput>, stop: &AtomicBool) {
    let mut buf = [0u8; 2048];
    while !stop.load(Ordering::Acquire) {
        match socket.recv(&mut buf) {
            Ok(n) => {
                let raw = buf[..n].to_vec();
                let app = cpf::parse_t2o_frame(&raw);
                let mut guard = latest.lock().unwrap();
                if let Some(app) = app {
                    guard.app = app;
                } else {
                    log::debug!("udp listener: dropped unparseable {n}-byte packet");
                }
                guard.raw = raw;
                guard.packets += 1;
                guard.last_recv = Some(Instant::now());
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue;
            }
            Err(err) => {
                log::debug!("udp listener: recv error (ignored): {err}");
            }
        }
    }
}
