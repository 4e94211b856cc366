//! Driver configuration - compile-time constants and per-session options.
//!
//! Split in two levels: a table of protocol-fixed constants (static, never
//! overridden) plus a small runtime struct for the handful of options a
//! caller can actually vary. There is only ever one session, so there is no
//! lock-free multi-entity config store here -- `DriveConfig` is plain data.

use std::net::Ipv4Addr;
use std::time::Duration;

/// ENIP encapsulation TCP port (RegisterSession, ForwardOpen, mirrored
/// SendUnitData).
pub const ENIP_TCP_PORT: u16 = 44818;

/// Class-1 implicit I/O UDP port.
pub const ENIP_UDP_PORT: u16 = 2222;

/// Size in bytes of the O->T application assembly this driver streams.
pub const O2T_APP_SIZE: usize = 44;

/// Default Requested Packet Interval, in milliseconds.
pub const DEFAULT_RPI_MS: u64 = 10;

/// Minimum allowed RPI, in milliseconds (spec: RPI >= 0.001s).
pub const MIN_RPI_MS: u64 = 1;

/// Initial backoff before the first reconnect attempt.
pub const RECONNECT_BACKOFF_INITIAL: Duration = Duration::from_millis(200);

/// Reconnect backoff ceiling.
pub const RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(2);

/// Receive timeout used by the UDP listener's blocking `recv_from` loop.
pub const LISTENER_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Candidate Fixed-I/O offsets tried during auto-detection, in probe order.
pub const FIXED_IO_OFFSET_CANDIDATES: [usize; 2] = [4, 8];

/// Either side of the Fixed-I/O offset is legal; this is the fallback used
/// for reads while auto-detection has not yet locked one in.
pub const DEFAULT_FIXED_IO_OFFSET: usize = FIXED_IO_OFFSET_CANDIDATES[0];

/// Per-session configuration supplied by the caller of [`crate::Drive::connect`].
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// IPv4 address of the drive.
    pub drive_ip: Ipv4Addr,
    /// ENIP encapsulation TCP port. Defaults to [`ENIP_TCP_PORT`]; overridable
    /// mainly so tests can point at a fake drive on an ephemeral port.
    pub tcp_port: u16,
    /// Class-1 implicit I/O UDP port, both bound locally and dialed as the
    /// drive's peer port. Defaults to [`ENIP_UDP_PORT`]; see `tcp_port`.
    pub udp_port: u16,
    /// Requested Packet Interval for the cyclic sender.
    pub rpi: Duration,
    /// Fixed I/O (OUT) word offset within the input application bytes.
    /// `None` means auto-detect on the first populated input (see
    /// [`crate::status::StatusDecoder`]).
    pub fixed_out_offset: Option<usize>,
    /// Also emit every cyclic frame as an ENIP SendUnitData encapsulation
    /// over TCP, for diagnostics.
    pub mirror_over_tcp: bool,
    /// UDP port to bind when the caller does not want the listener to share
    /// the transport's socket. Unused when sharing (the common case).
    pub listen_port: u16,
}

impl DriveConfig {
    /// Start building a configuration for the drive at `drive_ip`, with all
    /// other options at their documented default.
    pub fn new(drive_ip: Ipv4Addr) -> Self {
        Self {
            drive_ip,
            tcp_port: ENIP_TCP_PORT,
            udp_port: ENIP_UDP_PORT,
            rpi: Duration::from_millis(DEFAULT_RPI_MS),
            fixed_out_offset: None,
            mirror_over_tcp: false,
            listen_port: ENIP_UDP_PORT,
        }
    }

    /// Point the handshake and cyclic stream at non-default TCP/UDP ports
    /// (a fake drive in tests, or a forwarder in production).
    pub fn with_ports(mut self, tcp_port: u16, udp_port: u16) -> Self {
        self.tcp_port = tcp_port;
        self.udp_port = udp_port;
        self.listen_port = udp_port;
        self
    }

    /// Set the Requested Packet Interval from a millisecond count.
    ///
    /// Clamped upward to [`MIN_RPI_MS`] -- the cyclic sender does not
    /// tolerate a zero-length sleep.
    pub fn with_rpi_ms(mut self, rpi_ms: u64) -> Self {
        self.rpi = Duration::from_millis(rpi_ms.max(MIN_RPI_MS));
        self
    }

    /// Pin the Fixed-I/O offset instead of auto-detecting it.
    pub fn with_fixed_out_offset(mut self, offset: usize) -> Self {
        self.fixed_out_offset = Some(offset);
        self
    }

    /// Enable mirroring every cyclic frame over TCP as well as UDP.
    pub fn with_mirror_over_tcp(mut self, mirror: bool) -> Self {
        self.mirror_over_tcp = mirror;
        self
    }
}
