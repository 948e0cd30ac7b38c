//! End-to-end tests of a simulator session driven through the mock serial
//! port: reads, writes, the deferred baud switch and session shutdown.

use iec62056_sim::constants::{IDENTIFICATION_RESPONSE, OBIS_REQUEST_FRAME};
use iec62056_sim::iec62056::response::obis_response_frame;
use iec62056_sim::{
    shutdown_on, MemorySink, MeterSimError, MeterSimulator, MockSerialPort, ProtocolState,
    SessionEnd, SessionSummary, SimulatorConfig,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const ACK_050: &[u8] = b"\x06050\r\n";

type SharedSink = Arc<Mutex<MemorySink>>;

struct Harness {
    port: MockSerialPort,
    sink: SharedSink,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<SessionSummary, MeterSimError>>,
}

impl Harness {
    fn start(settle_delay_ms: u64) -> Self {
        let port = MockSerialPort::new();
        let sink: SharedSink = Arc::new(Mutex::new(MemorySink::new()));
        let config = SimulatorConfig {
            settle_delay_ms,
            ..SimulatorConfig::default()
        };
        let (tx, rx) = oneshot::channel::<()>();

        let simulator = MeterSimulator::new(port.clone(), config, sink.clone());
        let task = tokio::spawn(simulator.run(async move {
            let _ = rx.await;
        }));

        Harness {
            port,
            sink,
            shutdown: Some(tx),
            task,
        }
    }

    async fn send_and_expect(&self, request: &[u8], expected: &[u8]) {
        self.port.queue_rx_data(request);
        let port = self.port.clone();
        let len = expected.len();
        wait_until(|| port.get_tx_data().len() >= len).await;
        assert_eq!(self.port.take_tx_data(), expected);
    }

    async fn close(mut self) -> SessionSummary {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.unwrap().unwrap()
    }

    fn traced(&self, needle: &str) -> bool {
        self.sink.lock().unwrap().contains(needle)
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// The full sign-on, ACK, baud switch and readout sequence.
#[tokio::test]
async fn test_full_readout_session() {
    let h = Harness::start(10);

    h.send_and_expect(b"/?!\r\n", IDENTIFICATION_RESPONSE).await;
    h.send_and_expect(ACK_050, &[0x06]).await;

    let port = h.port.clone();
    wait_until(|| port.baud_rate() == 9600).await;
    assert_eq!(h.port.flush_count(), 1);

    h.send_and_expect(OBIS_REQUEST_FRAME, &obis_response_frame()).await;
    assert!(h.traced("OBIS 1.8.0 request received"));
    assert!(h.traced("Baud rate set to 9600"));

    let summary = h.close().await;
    assert_eq!(summary.end, SessionEnd::Closed);
    assert_eq!(summary.state, ProtocolState::Switched9600);
    assert_eq!(summary.final_baud_rate, Some(9600));
    assert_eq!(summary.stats.identifications_sent, 1);
    assert_eq!(summary.stats.acks_sent, 1);
    assert_eq!(summary.stats.obis_responses_sent, 1);
    assert!(!summary.baud_switch_failed);
    assert!(!summary.baud_switch_cancelled);
}

/// Bytes arriving during the settle window are answered before the switch.
#[tokio::test]
async fn test_input_served_during_settle_window() {
    let h = Harness::start(300);

    h.send_and_expect(ACK_050, &[0x06]).await;
    h.send_and_expect(b"/?!\r\n", IDENTIFICATION_RESPONSE).await;
    assert_eq!(h.port.baud_rate(), 300);

    let port = h.port.clone();
    wait_until(|| port.baud_rate() == 9600).await;
    assert_eq!(h.port.baud_history(), vec![9600]);

    h.close().await;
}

/// A readout sent during the settle window is only answered after the switch.
#[tokio::test]
async fn test_readout_held_until_switch() {
    let h = Harness::start(200);

    h.send_and_expect(ACK_050, &[0x06]).await;
    h.port.queue_rx_data(OBIS_REQUEST_FRAME);
    let port = h.port.clone();
    wait_until(|| port.pending_rx() == 0).await;
    assert!(h.port.get_tx_data().is_empty());
    assert_eq!(h.port.baud_rate(), 300);
    assert!(h.traced("baud switch still settling"));

    let port = h.port.clone();
    wait_until(|| port.baud_rate() == 9600).await;
    h.send_and_expect(OBIS_REQUEST_FRAME, &obis_response_frame()).await;

    let summary = h.close().await;
    assert_eq!(summary.stats.obis_responses_sent, 1);
    assert_eq!(summary.state, ProtocolState::Switched9600);
}

/// A repeated ACK line does not produce a second ACK or baud change.
#[tokio::test]
async fn test_second_ack_ignored() {
    let h = Harness::start(5);

    h.send_and_expect(ACK_050, &[0x06]).await;
    let port = h.port.clone();
    wait_until(|| port.baud_rate() == 9600).await;

    h.port.queue_rx_data(ACK_050);
    let port = h.port.clone();
    wait_until(|| port.pending_rx() == 0).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert!(h.port.get_tx_data().is_empty());
    assert_eq!(h.port.baud_history(), vec![9600]);
    h.close().await;
}

/// Closing during the settle window cancels the switch.
#[tokio::test]
async fn test_close_cancels_pending_switch() {
    let h = Harness::start(60_000);

    h.send_and_expect(ACK_050, &[0x06]).await;
    let summary = h.close().await;

    assert!(summary.baud_switch_cancelled);
    assert_eq!(summary.final_baud_rate, Some(300));
    assert_eq!(summary.state, ProtocolState::SwitchPending);
}

/// A refused baud change is traced, the speed stays, and the session goes on.
#[tokio::test]
async fn test_failed_baud_change() {
    let h = Harness::start(5);
    h.port.fail_next_baud_change();

    h.send_and_expect(ACK_050, &[0x06]).await;
    let sink = h.sink.clone();
    wait_until(|| sink.lock().unwrap().contains("could not be changed")).await;
    assert_eq!(h.port.baud_rate(), 300);

    h.send_and_expect(OBIS_REQUEST_FRAME, &obis_response_frame()).await;

    let summary = h.close().await;
    assert!(summary.baud_switch_failed);
    assert_eq!(summary.final_baud_rate, Some(300));
}

/// The OBIS request is not answered at the opening speed.
#[tokio::test]
async fn test_obis_request_before_switch_ignored() {
    let h = Harness::start(5);

    h.port.queue_rx_data(OBIS_REQUEST_FRAME);
    let port = h.port.clone();
    wait_until(|| port.pending_rx() == 0).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.port.get_tx_data().is_empty());

    let summary = h.close().await;
    assert_eq!(summary.stats.obis_responses_sent, 0);
    assert_eq!(summary.state, ProtocolState::AwaitingHandshake);
}

/// End of stream ends the session.
#[tokio::test]
async fn test_eof_ends_session() {
    let h = Harness::start(5);
    h.send_and_expect(b"/?!\r\n", IDENTIFICATION_RESPONSE).await;

    h.port.close();
    let summary = h.task.await.unwrap().unwrap();
    assert_eq!(summary.end, SessionEnd::Eof);
    assert_eq!(summary.stats.bytes_received, 5);
}

/// A transport read error ends the session with a serial port error.
#[tokio::test]
async fn test_read_error_propagates() {
    let h = Harness::start(5);
    h.port.set_next_error(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "unplugged",
    ));
    h.port.queue_rx_data(b"x");

    let result = h.task.await.unwrap();
    assert!(matches!(result, Err(MeterSimError::SerialPortError(_))));
}

/// Sessions are independent: a new simulator starts at the opening speed.
#[tokio::test]
async fn test_sessions_do_not_share_state() {
    let first = Harness::start(5);
    first.send_and_expect(ACK_050, &[0x06]).await;
    first.close().await;

    let second = Harness::start(5);
    second.send_and_expect(ACK_050, &[0x06]).await;
    let summary = second.close().await;
    assert_eq!(summary.stats.acks_sent, 1);
}

/// Tests a single chunk driven without a runtime-managed session.
#[test]
fn test_handle_chunk_blocking() {
    let port = MockSerialPort::new();
    let mut simulator = MeterSimulator::new(port.clone(), SimulatorConfig::default(), MemorySink::new());

    tokio_test::block_on(simulator.handle_chunk(b"/?!\r\n")).unwrap();

    assert_eq!(port.get_tx_data(), IDENTIFICATION_RESPONSE);
    assert!(!simulator.baud_switch_pending());
}

/// A shutdown signal that fired ends the wait.
#[tokio::test]
async fn test_shutdown_on_signal() {
    let waited = tokio::time::timeout(
        Duration::from_millis(100),
        shutdown_on(std::future::ready(Ok(()))),
    )
    .await;
    assert!(waited.is_ok());
}

/// A signal that cannot be installed must not end the session.
#[tokio::test]
async fn test_shutdown_on_failed_signal_keeps_running() {
    let failed = std::future::ready(Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no signal handler",
    )));
    let waited = tokio::time::timeout(Duration::from_millis(50), shutdown_on(failed)).await;
    assert!(waited.is_err());
}
