//! The iec62056 module contains the device side of the IEC 62056-21 readout
//! handshake: the block check, line framing, request scanning, reply
//! generation, the protocol interpreter, and the serial transports it runs on.

pub mod bcc;
pub mod interpreter;
pub mod line;
pub mod response;
pub mod scanner;
pub mod serial;
pub mod serial_mock;

pub use bcc::{bcc, verify_bcc};
pub use interpreter::{Action, BufferPolicy, Interpreter, InterpreterConfig, ProtocolState, Session};
pub use line::{Line, LineFramer};
pub use response::Response;
pub use scanner::{contains_obis_frame, FrameScanner};
pub use serial::{MeterPort, SerialConfig};
