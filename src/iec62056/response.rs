//! # Response Generator
//!
//! Builds the three replies the simulated meter knows: the identification
//! message, the single ACK confirming the baud switch, and the OBIS 1.8.0
//! readout with its BCC.

use crate::constants::{ACK, ETX, IDENTIFICATION_RESPONSE, OBIS_RESPONSE_DATA, STX};
use crate::iec62056::bcc::bcc;
use bytes::{BufMut, Bytes, BytesMut};

/// A reply the meter sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// `/SAT6EM72000656621\r\n`
    Identification,
    /// Single ACK byte preceding the baud change
    Acknowledge,
    /// `STX 1.8.0(000123.456*kWh) ETX BCC`
    ObisReading,
}

impl Response {
    /// Wire bytes of this reply.
    pub fn to_bytes(self) -> Bytes {
        match self {
            Response::Identification => Bytes::from_static(IDENTIFICATION_RESPONSE),
            Response::Acknowledge => Bytes::from_static(&[ACK]),
            Response::ObisReading => obis_response_frame(),
        }
    }

    /// Trace line logged once the reply has been queued.
    pub fn sent_message(self) -> String {
        match self {
            Response::Identification => format!(
                "<- Identification sent: {}",
                String::from_utf8_lossy(IDENTIFICATION_RESPONSE).trim_end()
            ),
            Response::Acknowledge => "<- ACK sent, baud rate switch scheduled".to_string(),
            Response::ObisReading => "<- OBIS 1.8.0 consumption response sent".to_string(),
        }
    }
}

/// The OBIS data block: `STX data ETX`, without BCC.
pub fn obis_response_payload() -> BytesMut {
    let mut payload = BytesMut::with_capacity(OBIS_RESPONSE_DATA.len() + 3);
    payload.put_u8(STX);
    payload.put_slice(OBIS_RESPONSE_DATA);
    payload.put_u8(ETX);
    payload
}

/// The complete OBIS reply: payload followed by the BCC over the payload.
pub fn obis_response_frame() -> Bytes {
    let mut frame = obis_response_payload();
    let check = bcc(&frame);
    frame.put_u8(check);
    frame.freeze()
}
