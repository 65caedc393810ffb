//! Simulated ECU: answers built parameter frames with synthetic raw
//! frames.
//!
//! Reply headers come from each message's expected-header template (bytes
//! under a zero mask stay zero, which the cleaner accepts by definition);
//! payloads are the declared prefix followed by random bytes from a
//! seeded RNG, so a failing test reproduces byte for byte from its seed.

use obdframe_core::message::{MessageData, ParameterFrame};
use obdframe_proto::kwp;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Header layout a simulated ISO 14230 ECU replies with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KwpHeader {
    /// `[format]` with the length embedded in the format byte.
    FormatOnly,
    /// `[format] [length]`.
    WithLengthByte,
    /// `[format] [target] [source]` with the length embedded.
    WithAddressing,
    /// `[format] [target] [source] [length]`.
    Full,
}

/// Deterministic vehicle stand-in.
#[derive(Debug)]
pub struct SimEcu {
    rng: ChaCha8Rng,
}

impl SimEcu {
    /// Create an ECU whose replies derive from `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn payload(&mut self, msg: &MessageData) -> Vec<u8> {
        let count = msg.expected_data_count.map_or(4, |c| c as usize);
        let mut data = msg.expected_data_prefix.clone();
        for _ in 0..count {
            data.push(self.rng.r#gen());
        }
        data
    }

    /// Reply to every message of a legacy (SAE J1850 / ISO 9141-2) frame
    /// with `frames` raw frames each.
    pub fn legacy_reply(&mut self, frame: &mut ParameterFrame, frames: usize) {
        for msg in &mut frame.messages {
            let header = msg.expected_header.clone();
            for _ in 0..frames {
                let count = msg.expected_data_count.map_or(4, |c| c as usize);
                let mut raw = header.clone();
                raw.extend_from_slice(&msg.expected_data_prefix);
                for _ in 0..count {
                    raw.push(self.rng.r#gen());
                }
                msg.push_raw_frame(raw);
            }
        }
    }

    /// Reply to every message of an ISO 14230 frame using the given
    /// header layout.
    ///
    /// The short layouts ([`KwpHeader::FormatOnly`],
    /// [`KwpHeader::WithLengthByte`]) carry no addressing bits; a frame
    /// built from a response descriptor that anchors the format byte will
    /// reject them unless the caller clears
    /// `expected_header_mask[0]` first.
    pub fn kwp_reply(&mut self, frame: &mut ParameterFrame, frames: usize, layout: KwpHeader) {
        for msg in &mut frame.messages {
            let data = self.payload(msg);
            let data_len = data.len() as u8;

            let header = match layout {
                KwpHeader::FormatOnly => vec![data_len & kwp::LENGTH_MASK],
                KwpHeader::WithLengthByte => vec![0x00, data_len],
                KwpHeader::WithAddressing => vec![
                    0x80 | (data_len & kwp::LENGTH_MASK),
                    msg.expected_header[1],
                    msg.expected_header[2],
                ],
                KwpHeader::Full => vec![
                    (msg.expected_header[0] | 0x80) & kwp::ADDRESSING_MASK,
                    msg.expected_header[1],
                    msg.expected_header[2],
                    data_len,
                ],
            };

            for _ in 0..frames {
                let data = self.refresh(msg, &data);
                let mut raw = header.clone();
                raw.extend_from_slice(&data);
                msg.push_raw_frame(raw);
            }
        }
    }

    /// Reply to every message of an ISO 15765 frame. `frames == 1` sends
    /// a full single frame; larger counts send a first frame plus
    /// consecutive frames carrying `frames * 7 - 1` payload bytes total.
    pub fn isotp_reply(&mut self, frame: &mut ParameterFrame, frames: usize) {
        for msg in &mut frame.messages {
            let header = msg.expected_header.clone();

            if frames <= 1 {
                // One full single frame: PCI 0x07 plus seven payload
                // bytes starting with the prefix.
                let mut data = vec![0x07];
                data.extend_from_slice(&msg.expected_data_prefix);
                while data.len() < 8 {
                    data.push(self.rng.r#gen());
                }
                let mut raw = header.clone();
                raw.extend_from_slice(&data);
                msg.push_raw_frame(raw);
                continue;
            }

            let total = frames * 7 - 1;
            let mut payload = msg.expected_data_prefix.clone();
            while payload.len() < total {
                payload.push(self.rng.r#gen());
            }

            let mut raw = header.clone();
            raw.push(0x10 | (((total >> 8) & 0x0F) as u8));
            raw.push((total & 0xFF) as u8);
            raw.extend_from_slice(&payload[..6]);
            msg.push_raw_frame(raw);

            for (index, chunk) in payload[6..].chunks(7).enumerate() {
                let mut raw = header.clone();
                raw.push(0x20 | (((index + 1) % 0x10) as u8));
                raw.extend_from_slice(chunk);
                msg.push_raw_frame(raw);
            }
        }
    }

    /// Same prefix, fresh random payload bytes.
    fn refresh(&mut self, msg: &MessageData, template: &[u8]) -> Vec<u8> {
        let prefix_len = msg.expected_data_prefix.len();
        let mut data = template.to_vec();
        for byte in data.iter_mut().skip(prefix_len) {
            *byte = self.rng.r#gen();
        }
        data
    }
}
