//! High-level command engine: jog, stop, numbered operations, pause, and
//! one-shot assertions, composed over the current-payload store and the
//! status decoder.

use crate::config::O2T_APP_SIZE;
use crate::error::{Error, Result};
use crate::listener::LatestInput;
use crate::payloads;
use crate::status::StatusDecoder;
use crate::wire::fit_exact;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// What to assert on the wire while [`CommandEngine::pause`] holds the
/// stream open.
#[derive(Debug, Clone)]
pub enum Keep {
    /// Assert the STOP payload for the duration of the pause.
    Stop,
    /// Leave whatever payload is already current untouched.
    Hold,
    /// Assert a caller-supplied 44-byte payload.
    Custom(Vec<u8>),
}

/// One poll's worth of observable state, handed to an optional progress
/// callback. Not part of the engine's return value -- purely a capability
/// for a caller that wants to watch an operation run.
#[derive(Debug, Clone)]
pub struct ProgressRecord {
    pub ts: Instant,
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
    pub offset: usize,
    pub raw_status: u16,
    pub in_pos: bool,
    pub move_: bool,
    pub ready: bool,
    pub app_len: usize,
}

/// Trait-object alias for the progress callback, so call sites don't spell
/// out `dyn FnMut(&ProgressRecord) + 'a` every time.
pub type ProgressFn<'a> = dyn FnMut(&ProgressRecord) + 'a;

/// Drives the drive: owns the status decoder (touched only from the
/// caller's thread, so it needs no lock of its own) and writes the shared
/// current-payload store the cyclic sender reads.
pub struct CommandEngine {
    payload: Arc<Mutex<Vec<u8>>>,
    latest_input: Arc<Mutex<LatestInput>>,
    status: StatusDecoder,
    rpi: Duration,
}

impl CommandEngine {
    pub fn new(
        payload: Arc<Mutex<Vec<u8>>>,
        latest_input: Arc<Mutex<LatestInput>>,
        rpi: Duration,
        fixed_out_offset: Option<usize>,
    ) -> Self {
        let status = match fixed_out_offset {
            Some(offset) => StatusDecoder::with_offset(offset),
            None => StatusDecoder::new(),
        };
        Self {
            payload,
            latest_input,
            status,
            rpi,
        }
    }

    pub fn status(&self) -> &StatusDecoder {
        &self.status
    }

    /// Refresh the status decoder from the latest input snapshot without
    /// asserting any payload.
    pub fn poll(&mut self) {
        self.poll_input();
    }

    fn set_payload(&self, bytes: &[u8]) {
        *self.payload.lock().unwrap() = fit_exact(bytes, O2T_APP_SIZE);
    }

    fn poll_input(&mut self) {
        let app = self.latest_input.lock().unwrap().app.clone();
        if !app.is_empty() {
            self.status.update(&app);
        }
    }

    fn poll_and_report(&mut self, elapsed: Duration, remaining: Option<Duration>, progress: &mut Option<&mut ProgressFn<'_>>) {
        self.poll_input();
        if let Some(cb) = progress.as_deref_mut() {
            let fixed = self.status.fixed_out();
            cb(&ProgressRecord {
                ts: Instant::now(),
                elapsed,
                remaining,
                offset: self.status.effective_offset(),
                raw_status: fixed.raw,
                in_pos: fixed.in_pos(),
                move_: fixed.move_(),
                ready: fixed.ready(),
                app_len: self.status.last_app().len(),
            });
        }
    }

    /// Forward-jog for `duration`, then stop.
    pub fn jog(&mut self, duration: Duration, mut progress: Option<&mut ProgressFn<'_>>) {
        self.set_payload(&payloads::jog());
        let start = Instant::now();
        while start.elapsed() < duration {
            thread::sleep(self.rpi);
            let elapsed = start.elapsed();
            let remaining = duration.checked_sub(elapsed);
            self.poll_and_report(elapsed, remaining, &mut progress);
        }
        self.stop(None);
    }

    /// Assert STOP and poll input for 3 RPI cycles -- the baseline every
    /// other waiting operation restores before returning.
    pub fn stop(&mut self, mut progress: Option<&mut ProgressFn<'_>>) {
        self.set_payload(&payloads::stop());
        let start = Instant::now();
        for _ in 0..3 {
            thread::sleep(self.rpi);
            let elapsed = start.elapsed();
            self.poll_and_report(elapsed, None, &mut progress);
        }
    }

    /// Assert `start_payload`, poll once per RPI until IN-POS asserts or
    /// `timeout` elapses, then stop. Returns whether IN-POS was observed.
    ///
    /// Does not wait for IN-POS to clear before starting: a drive already
    /// sitting in-position from a previous move reports success immediately.
    pub fn operation(&mut self, start_payload: &[u8], timeout: Duration, mut progress: Option<&mut ProgressFn<'_>>) -> bool {
        self.set_payload(start_payload);
        let start = Instant::now();
        loop {
            thread::sleep(self.rpi);
            let elapsed = start.elapsed();
            let remaining = timeout.checked_sub(elapsed);
            self.poll_and_report(elapsed, remaining, &mut progress);

            if self.status.in_pos() {
                self.stop(None);
                return true;
            }
            if remaining.is_none() {
                self.stop(None);
                return false;
            }
        }
    }

    pub fn operation_1(&mut self, timeout: Duration, progress: Option<&mut ProgressFn<'_>>) -> bool {
        self.operation(&payloads::op_1(), timeout, progress)
    }

    pub fn operation_2(&mut self, timeout: Duration, progress: Option<&mut ProgressFn<'_>>) -> bool {
        self.operation(&payloads::op_2(), timeout, progress)
    }

    /// Hold the cyclic stream open for `seconds` without disrupting cadence,
    /// asserting whatever `keep` names. Unlike jog/operation, does not
    /// assert STOP on return -- `Keep::Hold` exists precisely so a pause can
    /// ride out a brief interruption in an ongoing stream without clobbering
    /// it.
    pub fn pause(&mut self, seconds: Duration, keep: Keep, mut progress: Option<&mut ProgressFn<'_>>) -> Result<()> {
        match keep {
            Keep::Stop => self.set_payload(&payloads::stop()),
            Keep::Hold => {}
            Keep::Custom(bytes) => {
                if bytes.len() != O2T_APP_SIZE {
                    return Err(Error::Config(format!(
                        "pause keep payload must be {O2T_APP_SIZE} bytes, got {}",
                        bytes.len()
                    )));
                }
                self.set_payload(&bytes);
            }
        }

        let granularity = self.rpi.max(Duration::from_millis(5));
        let start = Instant::now();
        while start.elapsed() < seconds {
            thread::sleep(granularity);
            let elapsed = start.elapsed();
            let remaining = seconds.checked_sub(elapsed);
            self.poll_and_report(elapsed, remaining, &mut progress);
        }
        Ok(())
    }

    /// One-shot strobe: assert TRIGGER and return immediately.
    pub fn trigger(&self) {
        self.set_payload(&payloads::trigger());
    }

    /// One-shot strobe: assert DE-TRIGGER and return immediately.
    pub fn de_trigger(&self) {
        self.set_payload(&payloads::de_trigger());
    }

    /// One-shot: assert FREE (servo-off) and return immediately.
    pub fn free(&self) {
        self.set_payload(&payloads::free());
    }

    /// One-shot: assert NO-OP and return immediately.
    pub fn no_op(&self) {
        self.set_payload(&payloads::no_op());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(rpi_ms: u64) -> CommandEngine {
        CommandEngine::new(
            Arc::new(Mutex::new(vec![0u8; O2T_APP_SIZE])),
            Arc::new(Mutex::new(LatestInput::default())),
            Duration::from_millis(rpi_ms),
            None,
        )
    }

    #[test]
    fn operation_times_out_when_in_pos_never_asserts() {
        let mut eng = engine(5);
        let ok = eng.operation_1(Duration::from_millis(30), None);
        assert!(!ok);
        assert_eq!(eng.payload.lock().unwrap().as_slice(), &payloads::stop()[..]);
    }

    #[test]
    fn operation_succeeds_when_latest_input_reports_in_pos() {
        let latest = Arc::new(Mutex::new(LatestInput::default()));
        let mut app = vec![0u8; 44];
        app[4..6].copy_from_slice(&4u16.to_le_bytes()); // bit2 = IN-POS at offset 4
        latest.lock().unwrap().app = app;

        let mut eng = CommandEngine::new(
            Arc::new(Mutex::new(vec![0u8; O2T_APP_SIZE])),
            latest,
            Duration::from_millis(5),
            None,
        );
        let ok = eng.operation_1(Duration::from_millis(200), None);
        assert!(ok);
    }

    #[test]
    fn pause_rejects_wrong_length_custom_payload() {
        let mut eng = engine(5);
        let err = eng
            .pause(Duration::from_millis(5), Keep::Custom(vec![0u8; 10]), None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn pause_with_keep_hold_leaves_the_current_stream_untouched() {
        let mut eng = engine(5);
        eng.set_payload(&payloads::jog());
        eng.pause(Duration::from_millis(20), Keep::Hold, None).unwrap();
        assert_eq!(eng.payload.lock().unwrap().as_slice(), &payloads::jog()[..]);
    }

    #[test]
    fn stop_leaves_stop_payload_asserted() {
        let mut eng = engine(5);
        eng.stop(None);
        assert_eq!(eng.payload.lock().unwrap().as_slice(), &payloads::stop()[..]);
    }

    #[test]
    fn progress_callback_observes_elapsed_time() {
        let mut eng = engine(5);
        let mut calls = 0usize;
        let mut cb = |record: &ProgressRecord| {
            calls += 1;
            assert!(record.app_len == 0 || record.app_len == 44);
        };
        let ok = eng.operation_1(Duration::from_millis(20), Some(&mut cb));
        assert!(!ok);
        assert!(calls > 0);
    }
}
