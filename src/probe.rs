//! Serial parameter auto-probing
//!
//! Iterates the cross-product of baud rate, byte size, parity, stop bits
//! and flow control, opening the port with each candidate, soliciting with
//! CR LF and listening for any response within a bounded timeout. The
//! first configuration that yields a response wins; "no settings matched"
//! is a distinct outcome, not an error.
//!
//! Parameter combinations the serial backend cannot open (mark/space
//! parity, 1.5 stop bits) are part of the candidate domain but skipped
//! with a trace entry.

use crate::config::{FlowControl, Parity, SerialSettings, StopBits};
use crate::error::{PortScopeError, Result};
use crate::transport::{SerialTransport, Transport};
use std::time::Duration;

/// Baud rates tried during probing, most common first
pub const PROBE_BAUD_RATES: &[u32] = &[
    115_200, 9_600, 57_600, 38_400, 19_200, 230_400, 4_800, 2_400, 1_200,
];

/// Payload written to solicit a response from the device
const SOLICIT_PAYLOAD: &[u8] = b"\r\n";

/// Enumerate every candidate parameter set, in probe order
fn candidates() -> impl Iterator<Item = SerialSettings> {
    PROBE_BAUD_RATES.iter().flat_map(|&baud| {
        [8u8, 7, 6, 5].into_iter().flat_map(move |data_bits| {
            [
                Parity::None,
                Parity::Even,
                Parity::Odd,
                Parity::Mark,
                Parity::Space,
            ]
            .into_iter()
            .flat_map(move |parity| {
                [StopBits::One, StopBits::OnePointFive, StopBits::Two]
                    .into_iter()
                    .flat_map(move |stop_bits| {
                        [
                            FlowControl::default(),
                            FlowControl {
                                software: true,
                                ..Default::default()
                            },
                            FlowControl {
                                rts_cts: true,
                                ..Default::default()
                            },
                        ]
                        .into_iter()
                        .map(move |flow| SerialSettings {
                            baud: Some(baud),
                            data_bits,
                            parity,
                            stop_bits,
                            flow,
                        })
                    })
            })
        })
    })
}

/// Try one candidate: open, solicit, listen
fn try_settings(path: &str, settings: &SerialSettings, timeout: Duration) -> Result<bool> {
    let transport = Box::new(SerialTransport::open(path, settings, timeout)?);
    let (mut read, mut write) = transport.split()?;

    let mut offset = 0;
    while offset < SOLICIT_PAYLOAD.len() {
        let n = write.write(&SOLICIT_PAYLOAD[offset..])?;
        if n == 0 {
            break;
        }
        offset += n;
    }

    Ok(!read.read(timeout)?.is_empty())
}

/// Search for a parameter set the device responds to
///
/// Returns `Ok(Some(settings))` for the first match, `Ok(None)` when the
/// whole cross-product yielded nothing, and `Err` only for failures that
/// make further probing pointless (the device cannot be opened at all).
pub fn find_settings(path: &str, timeout: Duration) -> Result<Option<SerialSettings>> {
    let mut attempted = 0usize;

    for settings in candidates() {
        match try_settings(path, &settings, timeout) {
            Ok(true) => {
                tracing::info!("{}: response at {}", path, settings);
                return Ok(Some(settings));
            }
            Ok(false) => attempted += 1,
            Err(PortScopeError::Config(reason)) => {
                tracing::trace!("{}: skipping {}: {}", path, settings, reason);
            }
            Err(PortScopeError::DeviceUnavailable { port, message }) => {
                return Err(PortScopeError::DeviceUnavailable { port, message });
            }
            Err(e) => {
                tracing::debug!("{}: {} failed: {}", path, settings, e);
                attempted += 1;
            }
        }
    }

    tracing::info!("{}: no settings matched ({} attempted)", path, attempted);
    Ok(None)
}
