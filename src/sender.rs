//! Cyclic O->T sender thread and reconnect loop.

use crate::config::{DriveConfig, RECONNECT_BACKOFF_INITIAL, RECONNECT_BACKOFF_MAX};
use crate::cpf;
use crate::encap;
use crate::error::{Error, Result};
use crate::wire::fit_exact;
use std::net::{TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Live ENIP session state: the TCP connection used for the handshake and
/// (optionally) mirrored SendUnitData frames, plus the O->T connection id
/// ForwardOpen returned.
pub struct ConnState {
    pub tcp: TcpStream,
    pub session_handle: u32,
    pub conn_id: u32,
}

/// Perform RegisterSession + ForwardOpen against `config.drive_ip` and
/// associate `udp` with the drive as its default peer.
///
/// Used both for the initial connect (`Drive::connect`, where failure is
/// fatal) and by the cyclic sender's reconnect loop (where failure is
/// logged and retried with backoff).
pub fn handshake(config: &DriveConfig, udp: &UdpSocket) -> Result<ConnState> {
    let mut tcp = TcpStream::connect((config.drive_ip, config.tcp_port))?;
    tcp.set_read_timeout(Some(Duration::from_secs(5)))?;
    tcp.set_nodelay(true)?;

    let session_handle = encap::register_session(&mut tcp)?;
    let conn_id = encap::forward_open(&mut tcp, session_handle)?;
    udp.connect((config.drive_ip, config.udp_port))?;

    Ok(ConnState {
        tcp,
        session_handle,
        conn_id,
    })
}

/// Background thread that streams the current O->T payload every RPI and
/// reconnects (with exponential backoff) whenever a send fails.
///
/// Uses an `AtomicBool` shutdown flag checked between short sleeps rather
/// than a channel, since the sender has its own variable-length sleep (RPI,
/// then backoff) to interleave the check with.
pub struct CyclicSender {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CyclicSender {
    /// Spawn the cyclic sender. `conn` is shared with `Drive` so `close`
    /// can observe/replace the live connection and the reconnect loop can
    /// install a new one without the caller's involvement.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        config: DriveConfig,
        udp: Arc<UdpSocket>,
        conn: Arc<Mutex<Option<ConnState>>>,
        payload: Arc<Mutex<Vec<u8>>>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("enip-motion-sender".into())
            .spawn(move || send_loop(&config, &udp, &conn, &payload, &stop_clone))
            .expect("failed to spawn cyclic sender thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and wait for it to exit. Bounded in
    /// practice by `RECONNECT_BACKOFF_MAX`, since the send loop checks the
    /// stop flag between every sleep chunk (see `interruptible_sleep`).
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CyclicSender {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep `dur`, checking `stop` every 50ms so a shutdown request is
/// observed promptly even mid-backoff.
fn interruptible_sleep(dur: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = dur;
    while remaining > Duration::ZERO {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let chunk = remaining.min(SLICE);
        thread::sleep(chunk);
        remaining -= chunk;
    }
}

fn send_loop(
    config: &DriveConfig,
    udp: &UdpSocket,
    conn: &Mutex<Option<ConnState>>,
    payload: &Mutex<Vec<u8>>,
    stop: &AtomicBool,
) {
    let mut seq_ctp: u16 = 1;
    let mut seq_sai: u16 = 1;

    while !stop.load(Ordering::Acquire) {
        let app = fit_exact(&payload.lock().unwrap(), crate::config::O2T_APP_SIZE);

        match send_one(udp, conn, &app, seq_ctp, seq_sai, config.mirror_over_tcp) {
            Ok(()) => {
                seq_ctp = seq_ctp.wrapping_add(1);
                seq_sai = seq_sai.wrapping_add(1);
            }
            Err(err) => {
                log::warn!("cyclic send failed, reconnecting: {err}");
                drop_conn(conn);
                reconnect(config, udp, conn, stop);
            }
        }

        interruptible_sleep(config.rpi, stop);
    }
}

fn send_one(
    udp: &UdpSocket,
    conn: &Mutex<Option<ConnState>>,
    app: &[u8],
    seq_ctp: u16,
    seq_sai: u16,
    mirror: bool,
) -> Result<()> {
    let conn_id = {
        let guard = conn.lock().unwrap();
        guard.as_ref().ok_or(Error::NotConnected)?.conn_id
    };
    let frame = cpf::build_o2t_frame(conn_id, seq_ctp, seq_sai, app);
    udp.send(&frame)?;

    if mirror {
        let mut guard = conn.lock().unwrap();
        if let Some(state) = guard.as_mut() {
            encap::send_unit_data(&mut state.tcp, state.session_handle, &frame)?;
        }
    }
    Ok(())
}

fn drop_conn(conn: &Mutex<Option<ConnState>>) {
    let mut guard = conn.lock().unwrap();
    *guard = None;
}

fn reconnect(config: &DriveConfig, udp: &UdpSocket, conn: &Mutex<Option<ConnState>>, stop: &AtomicBool) {
    let mut backoff = RECONNECT_BACKOFF_INITIAL;
    while !stop.load(Ordering::Acquire) {
        match handshake(config, udp) {
            Ok(new_conn) => {
                log::info!("reconnected to drive at {}", config.drive_ip);
                *conn.lock().unwrap() = Some(new_conn);
                return;
            }
            Err(err) => {
                log::warn!("reconnect attempt failed: {err}");
                interruptible_sleep(backoff, stop);
                backoff = (backoff * 2).min(RECONNECT_BACKOFF_MAX);
            }
        }
    }
}
