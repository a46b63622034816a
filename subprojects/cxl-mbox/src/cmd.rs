//! The mailbox command envelope.

use cxl_proto::{Opcode, ReturnCode};

/// A single request/response exchange with the device.
///
/// Everything outside the payload area of the protocol's command/response
/// framing lives here: the opcode, the input payload and its length, the
/// requested and minimum acceptable output lengths, and the status code the
/// device returned. The backend fills `payload_out` (at most
/// `size_out` bytes) and `return_code`.
#[derive(Debug)]
pub struct MboxCmd {
    /// Command set and command submitted to hardware.
    pub opcode: Opcode,
    /// Input payload bytes.
    pub payload_in: Vec<u8>,
    /// Output payload produced by the device. Length is the actual number
    /// of bytes the device generated, never more than `size_out`.
    pub payload_out: Vec<u8>,
    /// Maximum number of bytes the caller will accept back.
    pub size_out: usize,
    /// Minimum output length for the response to be considered well formed
    /// when the device reports success.
    pub min_out: usize,
    /// Raw status code returned from hardware.
    pub return_code: u16,
}

impl MboxCmd {
    /// An exchange with neither input nor expected output.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            payload_in: Vec::new(),
            payload_out: Vec::new(),
            size_out: 0,
            min_out: 0,
            return_code: 0,
        }
    }

    /// Attach an input payload.
    pub fn with_input(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload_in = payload.into();
        self
    }

    /// Request up to `size` bytes of output.
    pub fn with_output(mut self, size: usize) -> Self {
        self.size_out = size;
        self
    }

    /// Require at least `min` output bytes on success. Defaults to the
    /// requested output size via [`MboxCmd::with_fixed_output`] for
    /// fixed-size commands.
    pub fn with_min_output(mut self, min: usize) -> Self {
        self.min_out = min;
        self
    }

    /// Request exactly `size` bytes of output: fixed-size commands must
    /// produce their full payload.
    pub fn with_fixed_output(self, size: usize) -> Self {
        self.with_output(size).with_min_output(size)
    }

    /// The device's status code for the completed exchange.
    pub fn return_code(&self) -> ReturnCode {
        ReturnCode::from_raw(self.return_code)
    }
}
