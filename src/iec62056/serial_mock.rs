//! Mock serial port implementation for testing
//!
//! This module provides a mock serial port that can be used to drive the
//! simulator without a physical line. Bytes queued with
//! [`MockSerialPort::queue_rx_data`] are delivered to the reader; everything
//! the simulator writes is captured, as are flushes and baud changes.

use crate::constants::INITIAL_BAUD_RATE;
use crate::iec62056::serial::MeterPort;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug)]
struct MockState {
    /// Data written to the port (outgoing)
    tx: Vec<u8>,
    /// Data to be read from the port (incoming)
    rx: VecDeque<u8>,
    /// Reader parked on an empty rx queue
    read_waker: Option<Waker>,
    /// Once closed and drained, reads return EOF
    closed: bool,
    baud_rate: u32,
    /// Every successful baud change, in order
    baud_history: Vec<u32>,
    fail_next_baud_change: bool,
    flush_count: usize,
    /// Simulated error for the next read or write
    next_error: Option<io::Error>,
}

/// Mock serial port that simulates bidirectional communication.
///
/// Clones share the same state, so a test keeps one clone to inspect the
/// port while the simulator owns another.
#[derive(Clone, Debug)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSerialPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSerialPort {
    pub fn new() -> Self {
        MockSerialPort {
            state: Arc::new(Mutex::new(MockState {
                tx: Vec::new(),
                rx: VecDeque::new(),
                read_waker: None,
                closed: false,
                baud_rate: INITIAL_BAUD_RATE,
                baud_history: Vec::new(),
                fail_next_baud_change: false,
                flush_count: 0,
                next_error: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the port from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue data to be read from the port
    pub fn queue_rx_data(&self, data: &[u8]) {
        let mut state = self.lock();
        state.rx.extend(data);
        if let Some(waker) = state.read_waker.take() {
            waker.wake();
        }
    }

    /// Get data that was written to the port
    pub fn get_tx_data(&self) -> Vec<u8> {
        self.lock().tx.clone()
    }

    /// Returns and clears the captured outgoing data
    pub fn take_tx_data(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().tx)
    }

    /// Marks the line as closed; pending and future reads see EOF once the
    /// queued data is consumed.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        if let Some(waker) = state.read_waker.take() {
            waker.wake();
        }
    }

    /// Makes the next baud change fail
    pub fn fail_next_baud_change(&self) {
        self.lock().fail_next_baud_change = true;
    }

    /// Set an error to be returned on the next read or write
    pub fn set_next_error(&self, error: io::Error) {
        self.lock().next_error = Some(error);
    }

    pub fn baud_rate(&self) -> u32 {
        self.lock().baud_rate
    }

    pub fn baud_history(&self) -> Vec<u32> {
        self.lock().baud_history.clone()
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flush_count
    }

    pub fn pending_rx(&self) -> usize {
        self.lock().rx.len()
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = self.lock();

        if let Some(error) = state.next_error.take() {
            return Poll::Ready(Err(error));
        }

        let available = state.rx.len().min(buf.remaining());
        if available > 0 {
            let data: Vec<u8> = state.rx.drain(..available).collect();
            buf.put_slice(&data);
            return Poll::Ready(Ok(()));
        }

        if state.closed {
            return Poll::Ready(Ok(()));
        }

        state.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.lock();

        if let Some(error) = state.next_error.take() {
            return Poll::Ready(Err(error));
        }

        state.tx.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.lock().flush_count += 1;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait::async_trait]
impl MeterPort for MockSerialPort {
    async fn reconfigure_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        let mut state = self.lock();
        if state.fail_next_baud_change {
            state.fail_next_baud_change = false;
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("mock port rejected {baud_rate} baud"),
            ));
        }
        state.baud_rate = baud_rate;
        state.baud_history.push(baud_rate);
        Ok(())
    }

    fn current_baud_rate(&self) -> io::Result<u32> {
        Ok(self.lock().baud_rate)
    }
}
