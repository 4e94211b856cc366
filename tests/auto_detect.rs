#![allow(clippy::unwrap_used)]

#[path = "support/mod.rs"]
mod support;

use enip_motion::DriveConfig;
use std::net::Ipv4Addr;
use std::time::Duration;
use support::{FakeDrive, FakeDriveConfig};

#[test]
fn locks_onto_offset_8_when_only_it_qualifies() {
    let fake = FakeDrive::spawn(FakeDriveConfig {
        fixed_io_offset: 8,
        in_pos_after: Some(Duration::ZERO),
        ..Default::default()
    });

    // fixed_out_offset left unset: the status decoder must auto-detect.
    let config = DriveConfig::new(Ipv4Addr::LOCALHOST)
        .with_ports(fake.tcp_port, fake.udp_port)
        .with_rpi_ms(10);

    let mut drive = enip_motion::Drive::connect(config).expect("handshake should succeed");

    let mut locked = None;
    for _ in 0..100 {
        drive.poll_status();
        if let Some(offset) = drive.fixed_out_offset() {
            locked = Some(offset);
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(locked, Some(8));
    assert!(drive.is_in_pos());

    drive.close();
}
