//! Acquisition loop
//!
//! Single flow of control for the whole process. At startup the storage
//! target is opened once; the result fixes the operating mode for good.
//!
//! Storage mode, every cycle:
//! green, build frame, write + flush, off, sleep one interval.
//!
//! Radio mode: advertise, wait for a peer, stop advertising, then while the
//! peer stays connected: blue, build frame, send, sleep half an interval,
//! off, sleep the other half. The split sleep makes the pixel pulse once
//! per sample. When the peer leaves, advertising starts over.
//!
//! There is no shutdown path. The loop runs until the board is reset, or
//! until a storage write fails after a successful open, which is returned
//! to the caller as fatal.

use datalogger_hal::{IndicatorState, SensorSuite, StatusIndicator, StorageVolume, StreamingRadio};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorType, Write};

use crate::config::LoggerConfig;
use crate::frame::FrameBuilder;
use crate::mode::{self, Startup};
use crate::radio::{RadioSink, RadioSinkError};
use crate::storage::{StorageHandle, StorageWriteError};

/// The acquisition-and-egress orchestrator
///
/// Owns every capability it drives; boards construct the handles once and
/// move them in.
pub struct Acquisition<S, I, D> {
    frames: FrameBuilder<S>,
    indicator: I,
    delay: D,
    config: LoggerConfig,
}

impl<S, I, D> Acquisition<S, I, D>
where
    S: SensorSuite,
    I: StatusIndicator,
    D: DelayNs,
{
    pub fn new(sensors: S, indicator: I, delay: D, config: LoggerConfig) -> Self {
        Self {
            frames: FrameBuilder::new(sensors),
            indicator,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Run for the lifetime of the process
    ///
    /// Only returns if a storage write fails after the target was opened.
    /// In radio mode it never returns.
    pub async fn run<V, R>(
        &mut self,
        volume: &mut V,
        radio: R,
    ) -> StorageWriteError<<V::File as ErrorType>::Error>
    where
        V: StorageVolume,
        R: StreamingRadio,
    {
        match mode::select_mode(volume, &self.config).await {
            Startup::Storage(handle) => self.run_storage(handle).await,
            Startup::Radio { interval_ms, .. } => {
                let mut sink = RadioSink::new(radio);
                self.run_radio(&mut sink, interval_ms).await
            }
        }
    }

    /// Storage mode until the first write failure
    pub async fn run_storage<F: Write>(
        &mut self,
        mut handle: StorageHandle<F>,
    ) -> StorageWriteError<F::Error> {
        loop {
            if let Err(e) = self.storage_cycle(&mut handle).await {
                error!("Storage write failed, stopping acquisition");
                return e;
            }
        }
    }

    /// One storage-mode sample
    pub async fn storage_cycle<F: Write>(
        &mut self,
        handle: &mut StorageHandle<F>,
    ) -> Result<(), StorageWriteError<F::Error>> {
        self.indicator.set_state(IndicatorState::SamplingStorage);
        let frame = self.frames.build();
        handle.write(&frame).await?;
        self.indicator.set_state(IndicatorState::Off);
        self.delay.delay_ms(self.config.sample_interval_ms).await;
        Ok(())
    }

    /// Radio mode forever
    pub async fn run_radio<R: StreamingRadio>(&mut self, sink: &mut RadioSink<R>, interval_ms: u32) -> ! {
        loop {
            self.radio_session(sink, interval_ms).await;
        }
    }

    /// One advertise, connect, stream, disconnect cycle
    ///
    /// Blocks with no timeout until a peer connects, then returns once that
    /// peer has gone.
    pub async fn radio_session<R: StreamingRadio>(&mut self, sink: &mut RadioSink<R>, interval_ms: u32) {
        sink.connect().await;
        while sink.is_connected() {
            self.radio_cycle(sink, interval_ms).await;
        }
    }

    /// One radio-mode sample
    ///
    /// A sample the link refuses is dropped, never retried.
    pub async fn radio_cycle<R: StreamingRadio>(&mut self, sink: &mut RadioSink<R>, interval_ms: u32) {
        let half = interval_ms / 2;

        self.indicator.set_state(IndicatorState::SamplingRadio);
        let frame = self.frames.build();
        match sink.write(&frame).await {
            Ok(()) => {}
            Err(RadioSinkError::NotConnected) => debug!("Peer gone before send, sample dropped"),
            Err(RadioSinkError::Encode(e)) => warn!("Sample dropped: {}", e),
            Err(RadioSinkError::Link(_)) => warn!("Radio send failed, sample dropped"),
        }
        self.delay.delay_ms(half).await;
        self.indicator.set_state(IndicatorState::Off);
        self.delay.delay_ms(half).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SensorFrame;
    use crate::radio::RadioState;
    use crate::storage;
    use crate::testing::{Event, FixedSensors, Journal, MockDelay, MockIndicator, MockIoError, MockRadio, MockVolume};
    use datalogger_hal::StorageErrorKind;
    use embassy_futures::block_on;

    const LINE: &str = "$,25.43,998.42,124.39,50.40,0.29,-0.12,10.00\n";

    fn acquisition(journal: &Journal) -> Acquisition<FixedSensors, MockIndicator, MockDelay> {
        Acquisition::new(
            FixedSensors::new(25.434, 998.42, 124.39, 50.4, [0.29, -0.12, 10.0]),
            MockIndicator::new(journal),
            MockDelay::new(journal),
            LoggerConfig::default(),
        )
    }

    fn storage_cycle_events() -> [Event; 5] {
        [
            Event::Indicator(IndicatorState::SamplingStorage),
            Event::Write(LINE.into()),
            Event::Flush,
            Event::Indicator(IndicatorState::Off),
            Event::Sleep(500),
        ]
    }

    fn radio_cycle_events(half_ms: u32) -> [Event; 5] {
        [
            Event::Indicator(IndicatorState::SamplingRadio),
            Event::Send(LINE.into()),
            Event::Sleep(half_ms),
            Event::Indicator(IndicatorState::Off),
            Event::Sleep(half_ms),
        ]
    }

    #[test]
    fn test_storage_cycle_order() {
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut volume = MockVolume::writable(&journal);
        let mut handle = block_on(storage::open(&mut volume, "DATA.CSV")).unwrap();
        journal.clear();

        block_on(acq.storage_cycle(&mut handle)).unwrap();
        assert_eq!(journal.events(), storage_cycle_events());
    }

    #[test]
    fn test_storage_mode_end_to_end() {
        // Storage opens; three good cycles, then the medium fails on write
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut volume = MockVolume::writable(&journal).fail_writes_after(3);
        let radio = MockRadio::new(&journal, &[]);

        let err = block_on(acq.run(&mut volume, radio));
        assert_eq!(err, StorageWriteError::Io(MockIoError));

        let events = journal.events();
        assert_eq!(events[0], Event::CreateTruncated("DATA.CSV".into()));
        for cycle in events[1..16].chunks(5) {
            assert_eq!(cycle, storage_cycle_events());
        }
        // Fatal write: pixel left green, no flush, no sleep, nothing after
        assert_eq!(
            events[16..],
            [
                Event::Indicator(IndicatorState::SamplingStorage),
                Event::WriteFailed,
            ]
        );
        assert_eq!(volume.contents(), LINE.repeat(3));
        // The radio is never touched in storage mode
        assert!(!events.iter().any(|e| matches!(
            e,
            Event::StartAdvertising | Event::Send(_)
        )));
    }

    #[test]
    fn test_storage_lines_are_well_formed() {
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut volume = MockVolume::writable(&journal).fail_writes_after(4);
        block_on(acq.run(&mut volume, MockRadio::new(&journal, &[])));

        let contents = volume.contents();
        let lines: Vec<&str> = contents.split_inclusive('\n').collect();
        assert_eq!(lines.len(), 4);
        for line in lines {
            let body = line.strip_prefix("$,").unwrap().strip_suffix('\n').unwrap();
            let fields: Vec<&str> = body.split(',').collect();
            assert_eq!(fields.len(), SensorFrame::FIELD_COUNT);
            for field in fields {
                let (int, dec) = field.split_once('.').unwrap();
                assert!(!int.is_empty());
                assert_eq!(dec.len(), 2);
                assert!(field.parse::<f32>().is_ok());
            }
        }
    }

    #[test]
    fn test_radio_session_full_storage_cadence() {
        // Storage full: 250 ms period, split into two 125 ms halves
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut sink = RadioSink::new(MockRadio::new(&journal, &[2]));

        block_on(acq.radio_session(&mut sink, 250));

        let events = journal.events();
        // Nothing lights up and nothing is sent until the peer connects
        assert_eq!(
            events[..3],
            [
                Event::StartAdvertising,
                Event::PeerConnected,
                Event::StopAdvertising,
            ]
        );
        assert_eq!(events[3..8], radio_cycle_events(125));
        assert_eq!(events[8..13], radio_cycle_events(125));
        assert_eq!(events.len(), 13);
        assert_eq!(sink.state(), RadioState::Idle);
    }

    #[test]
    fn test_radio_session_base_cadence() {
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut sink = RadioSink::new(MockRadio::new(&journal, &[1]));

        block_on(acq.radio_session(&mut sink, 500));
        assert_eq!(journal.events()[3..], radio_cycle_events(250));
    }

    #[test]
    fn test_radio_reconnect_after_disconnect() {
        // Peer streams two samples, leaves, a new peer takes one more
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut sink = RadioSink::new(MockRadio::new(&journal, &[2, 1]));

        block_on(acq.radio_session(&mut sink, 250));
        let first_session = journal.events().len();
        block_on(acq.radio_session(&mut sink, 250));

        let events = journal.events();
        // The gap between sessions contains only the re-advertising steps
        assert_eq!(
            events[first_session..first_session + 3],
            [
                Event::StartAdvertising,
                Event::PeerConnected,
                Event::StopAdvertising,
            ]
        );
        assert_eq!(events[first_session + 3..], radio_cycle_events(125));
        assert_eq!(journal.count(|e| matches!(e, Event::Send(_))), 3);
        assert_eq!(journal.count(|e| *e == Event::StartAdvertising), 2);
    }

    #[test]
    fn test_radio_send_failure_drops_sample() {
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut sink = RadioSink::new(MockRadio::new(&journal, &[2]).fail_sends());

        block_on(acq.radio_session(&mut sink, 500));

        // Each failed sample still pulses the pixel and keeps cadence
        assert_eq!(journal.count(|e| *e == Event::SendFailed), 2);
        assert_eq!(journal.count(|e| *e == Event::Sleep(250)), 4);
        assert_eq!(journal.count(|e| matches!(e, Event::Send(_))), 0);
    }

    #[test]
    fn test_run_falls_back_to_radio_on_full_storage() {
        // One peer takes a single sample; the mock panics once the loop
        // advertises again with no peer left, which ends the run
        let journal = Journal::new();
        let mut acq = acquisition(&journal);
        let mut volume = MockVolume::failing(&journal, StorageErrorKind::Full);
        let radio = MockRadio::new(&journal, &[1]);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            block_on(acq.run(&mut volume, radio))
        }));
        assert!(outcome.is_err());

        let events = journal.events();
        assert_eq!(events[0], Event::CreateTruncated("DATA.CSV".into()));
        assert_eq!(
            events[1..4],
            [
                Event::StartAdvertising,
                Event::PeerConnected,
                Event::StopAdvertising,
            ]
        );
        assert_eq!(events[4..9], radio_cycle_events(125));
        assert_eq!(events[9..], [Event::StartAdvertising]);
        assert_eq!(journal.count(|e| *e == Event::Sleep(500)), 0);
    }

    #[test]
    fn test_radio_mode_selected_on_full_storage() {
        let journal = Journal::new();
        let acq = acquisition(&journal);
        let mut volume = MockVolume::failing(&journal, StorageErrorKind::Full);
        match block_on(mode::select_mode(&mut volume, acq.config())) {
            Startup::Radio { interval_ms, .. } => assert_eq!(interval_ms, 250),
            Startup::Storage(_) => panic!("storage should be unavailable"),
        }
        // Failed open leaves the pixel alone
        assert!(!journal
            .events()
            .iter()
            .any(|e| matches!(e, Event::Indicator(_))));
    }
}
