//! Response frame cleaning.
//!
//! Reads a message's raw frames and produces its accepted replies. Frames
//! that fail the masked header compare or the declared prefix are dropped
//! with a warning and cleaning continues; a message that ends up with no
//! replies at all is a hard error.
//!
//! Three strategies exist: legacy (fixed 3-byte header), ISO 14230 (header
//! layout decoded from each frame's own format byte), and ISO 15765
//! (fixed 2- or 4-byte header plus multi-frame reassembly).

use obdframe_proto::frame::{CleanedMessage, mask_match, strip_prefix};
use obdframe_proto::isotp::{self, PciKind};
use obdframe_proto::kwp;
use obdframe_proto::link::LinkProtocol;

use crate::diag::DiagLog;
use crate::error::{EngineError, Result};
use crate::message::MessageData;

/// Clean one message's raw frames in place.
pub(crate) fn clean_frames(
    link: LinkProtocol,
    msg: &mut MessageData,
    diag: &mut DiagLog,
) -> Result<()> {
    msg.cleaned.clear();
    match link {
        LinkProtocol::SaeJ1850 | LinkProtocol::Iso9141 => clean_legacy(msg, diag)?,
        LinkProtocol::Iso14230 => clean_kwp(msg, diag)?,
        LinkProtocol::Iso15765Standard | LinkProtocol::Iso15765Extended => {
            clean_isotp(msg, link.response_header_len(), diag)?;
        }
    }
    advise_expected_count(msg, diag);
    Ok(())
}

const LEGACY_HEADER_LEN: usize = 3;

fn clean_legacy(msg: &mut MessageData, diag: &mut DiagLog) -> Result<()> {
    for raw in &msg.raw_frames {
        let Some((header, data)) = raw.split(LEGACY_HEADER_LEN) else {
            diag.warn(format!("legacy: frame shorter than {LEGACY_HEADER_LEN} header bytes"));
            continue;
        };

        if !mask_match(&msg.expected_header, &msg.expected_header_mask, header) {
            diag.warn("legacy: header bytes mismatch");
            continue;
        }

        let mut data = data.to_vec();
        if !strip_prefix(&msg.expected_data_prefix, &mut data) {
            diag.warn("legacy: data prefix mismatch");
            continue;
        }

        msg.cleaned.push(CleanedMessage {
            header: header.to_vec(),
            data,
        });
    }

    if msg.cleaned.is_empty() {
        return Err(EngineError::NoValidFrames);
    }
    Ok(())
}

fn clean_kwp(msg: &mut MessageData, diag: &mut DiagLog) -> Result<()> {
    for raw in &msg.raw_frames {
        let bytes = raw.as_bytes();
        let Some(&format) = bytes.first() else {
            diag.warn("ISO 14230: empty frame");
            continue;
        };

        let header_len = kwp::header_len(format);
        let Some((header, rest)) = raw.split(header_len) else {
            diag.warn("ISO 14230: frame shorter than its declared header");
            continue;
        };

        // The length byte, when present, is the last header byte.
        let data_len = if kwp::has_length_byte(format) {
            usize::from(header[header_len - 1])
        } else {
            usize::from(format & kwp::LENGTH_MASK)
        };
        let Some(data) = rest.get(..data_len) else {
            diag.warn("ISO 14230: frame shorter than its declared data length");
            continue;
        };

        // Rebuild the expected template to match this frame's layout:
        // non-present fields get a zero-mask placeholder.
        let (expected, mask) = kwp_expected_for(
            &msg.expected_header,
            &msg.expected_header_mask,
            header_len,
        );
        if !mask_match(&expected, &mask, header) {
            diag.warn("ISO 14230: header bytes mismatch");
            continue;
        }

        let mut data = data.to_vec();
        if !strip_prefix(&msg.expected_data_prefix, &mut data) {
            diag.warn("ISO 14230: data prefix mismatch");
            continue;
        }

        msg.cleaned.push(CleanedMessage {
            header: header.to_vec(),
            data,
        });
    }

    if msg.cleaned.is_empty() {
        return Err(EngineError::NoValidFrames);
    }
    Ok(())
}

/// Adapt the `[format] [target] [source]` template to an actual header
/// layout of 1–4 bytes. The format byte always anchors position 0; length
/// bytes and absent address bytes are mask-zero placeholders.
fn kwp_expected_for(expected: &[u8], mask: &[u8], header_len: usize) -> (Vec<u8>, Vec<u8>) {
    let mut exp = vec![expected[0]];
    let mut msk = vec![mask[0]];
    match header_len {
        2 => {
            // [format] [length]
            exp.push(0x00);
            msk.push(0x00);
        }
        3 => {
            // [format] [target] [source]
            exp.extend_from_slice(&expected[1..3]);
            msk.extend_from_slice(&mask[1..3]);
        }
        4 => {
            // [format] [target] [source] [length]
            exp.extend_from_slice(&expected[1..3]);
            msk.extend_from_slice(&mask[1..3]);
            exp.push(0x00);
            msk.push(0x00);
        }
        _ => {}
    }
    (exp, msk)
}

fn clean_isotp(msg: &mut MessageData, header_len: usize, diag: &mut DiagLog) -> Result<()> {
    let mut entries: Vec<CleanedMessage> = Vec::new();

    for raw in &msg.raw_frames {
        let Some((header, data)) = raw.split(header_len) else {
            diag.warn(format!("ISO 15765: frame shorter than {header_len} header bytes"));
            continue;
        };

        if !mask_match(&msg.expected_header, &msg.expected_header_mask, header) {
            diag.warn("ISO 15765: header bytes mismatch");
            continue;
        }
        if data.is_empty() {
            diag.warn("ISO 15765: frame carries no PCI byte");
            continue;
        }

        entries.push(CleanedMessage {
            header: header.to_vec(),
            data: data.to_vec(),
        });
    }

    // Merge multi-frame messages: for every first frame, walk forward once
    // over arrival order collecting consecutive frames with the same
    // header and the expected cycling PCI, until the advertised length is
    // reached. Consecutive frames may precede their first frame; their
    // relative order within one message is preserved.
    let mut merged = vec![false; entries.len()];
    for j in 0..entries.len() {
        if merged[j] || isotp::pci_kind(entries[j].data[0]) != PciKind::First {
            continue;
        }

        let Some(&length_low) = entries[j].data.get(1) else {
            diag.warn("ISO 15765: truncated first frame");
            merged[j] = true;
            continue;
        };
        let total_len = isotp::first_frame_len(entries[j].data[0], length_low);
        let mut seen = entries[j].data.len() - 2;
        let mut next_pci = 0x21u8;

        for k in 0..entries.len() {
            if seen >= total_len {
                break;
            }
            if merged[k] || k == j {
                continue;
            }
            if entries[k].data.first() == Some(&next_pci) && entries[k].header == entries[j].header
            {
                let chunk: Vec<u8> = entries[k].data[1..].to_vec();
                seen += chunk.len();
                entries[j].data.extend_from_slice(&chunk);
                merged[k] = true;
                next_pci = isotp::next_consecutive(next_pci);
            }
        }
    }

    // Strip PCI bytes and the declared prefix from the surviving entries.
    for (mut entry, was_merged) in entries.into_iter().zip(merged) {
        if was_merged {
            continue;
        }
        match isotp::pci_kind(entry.data[0]) {
            PciKind::Single => {
                entry.data.remove(0);
            }
            PciKind::First => {
                entry.data.drain(..2);
            }
            PciKind::Consecutive => {
                diag.warn("ISO 15765: consecutive frame without a first frame");
                continue;
            }
            PciKind::FlowControl | PciKind::Unknown => {
                diag.warn("ISO 15765: unexpected PCI byte");
                continue;
            }
        }

        if !strip_prefix(&msg.expected_data_prefix, &mut entry.data) {
            diag.warn("ISO 15765: data prefix mismatch");
            continue;
        }
        msg.cleaned.push(entry);
    }

    if msg.cleaned.is_empty() {
        return Err(EngineError::NoValidFrames);
    }
    Ok(())
}

/// `response.bytes` declarations are advisory; flag replies that disagree
/// but keep them.
fn advise_expected_count(msg: &MessageData, diag: &mut DiagLog) {
    let Some(count) = msg.expected_data_count else {
        return;
    };
    for entry in &msg.cleaned {
        if entry.data.len() != count as usize {
            diag.warn(format!(
                "reply carries {} data bytes where {count} were declared",
                entry.data.len()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_msg() -> MessageData {
        MessageData {
            expected_header: vec![0x48, 0x6B, 0x00],
            expected_header_mask: vec![0xFF, 0xFF, 0x00],
            expected_data_prefix: vec![0x41, 0x0C],
            ..MessageData::default()
        }
    }

    #[test]
    fn legacy_accepts_and_strips() {
        let mut msg = legacy_msg();
        msg.push_raw_frame(hex::decode("486B10410C2ABC").unwrap());

        clean_frames(LinkProtocol::Iso9141, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].header, vec![0x48, 0x6B, 0x10]);
        assert_eq!(msg.cleaned[0].data, vec![0x2A, 0xBC]);
    }

    #[test]
    fn legacy_drops_mismatched_frames_but_keeps_good_ones() {
        let mut msg = legacy_msg();
        // Wrong header.
        msg.push_raw_frame(vec![0x49, 0x6B, 0x10, 0x41, 0x0C, 0x00]);
        // Wrong prefix; must be rejected whole, nothing consumed.
        msg.push_raw_frame(vec![0x48, 0x6B, 0x10, 0x41, 0x0D, 0x00]);
        // Good.
        msg.push_raw_frame(vec![0x48, 0x6B, 0x10, 0x41, 0x0C, 0x2A, 0xBC]);

        let mut diag = DiagLog::default();
        clean_frames(LinkProtocol::Iso9141, &mut msg, &mut diag).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(diag.drain().len(), 2);
    }

    #[test]
    fn legacy_all_rejected_is_fatal() {
        let mut msg = legacy_msg();
        msg.push_raw_frame(vec![0x49, 0x6B, 0x10, 0x41, 0x0C, 0x00]);

        let err =
            clean_frames(LinkProtocol::Iso9141, &mut msg, &mut DiagLog::default()).unwrap_err();
        assert_eq!(err, EngineError::NoValidFrames);
    }

    fn kwp_msg() -> MessageData {
        MessageData {
            expected_header: vec![0x80, 0xF1, 0x33],
            expected_header_mask: vec![0xC0, 0xFF, 0xFF],
            expected_data_prefix: vec![0x41],
            ..MessageData::default()
        }
    }

    #[test]
    fn kwp_header_layouts_decode_from_format_byte() {
        // [F][T][S] with embedded length 3: prefix + two data bytes.
        let mut msg = kwp_msg();
        msg.push_raw_frame(vec![0x83, 0xF1, 0x33, 0x41, 0x0C, 0x2A]);
        clean_frames(LinkProtocol::Iso14230, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned[0].header, vec![0x83, 0xF1, 0x33]);
        assert_eq!(msg.cleaned[0].data, vec![0x0C, 0x2A]);

        // [F][T][S][L]: explicit length byte, trailing junk ignored.
        let mut msg = kwp_msg();
        msg.push_raw_frame(vec![0x80, 0xF1, 0x33, 0x03, 0x41, 0x0C, 0x2A, 0x99, 0x99]);
        clean_frames(LinkProtocol::Iso14230, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned[0].header, vec![0x80, 0xF1, 0x33, 0x03]);
        assert_eq!(msg.cleaned[0].data, vec![0x0C, 0x2A]);
    }

    #[test]
    fn kwp_short_headers_need_a_cleared_format_mask() {
        // [F] only and [F][L] layouts carry no addressing; the format byte
        // has addressing bits zero, so an anchored 0x80 template rejects
        // them unless the caller clears the mask.
        let mut msg = kwp_msg();
        msg.expected_header_mask[0] = 0x00;

        // [F] with embedded length 2.
        msg.push_raw_frame(vec![0x02, 0x41, 0x0C]);
        // [F][L] with explicit length 2.
        msg.push_raw_frame(vec![0x00, 0x02, 0x41, 0x0C]);

        clean_frames(LinkProtocol::Iso14230, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 2);
        assert_eq!(msg.cleaned[0].header, vec![0x02]);
        assert_eq!(msg.cleaned[0].data, vec![0x0C]);
        assert_eq!(msg.cleaned[1].header, vec![0x00, 0x02]);
        assert_eq!(msg.cleaned[1].data, vec![0x0C]);
    }

    #[test]
    fn kwp_recovered_length_matches_encoding() {
        // Embedded length takes exactly that many bytes even with junk
        // after them.
        let mut msg = kwp_msg();
        msg.push_raw_frame(vec![0x82, 0xF1, 0x33, 0x41, 0x0C, 0xFF, 0xFF]);
        clean_frames(LinkProtocol::Iso14230, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned[0].data.len(), 1);
    }

    fn isotp_msg() -> MessageData {
        MessageData {
            expected_header: vec![0x07, 0xE8],
            expected_header_mask: vec![0xFF, 0xFF],
            ..MessageData::default()
        }
    }

    const H: [u8; 2] = [0x07, 0xE8];

    fn ff(payload: &[u8], total: usize) -> Vec<u8> {
        let mut frame = H.to_vec();
        frame.push(0x10 | ((total >> 8) & 0x0F) as u8);
        frame.push((total & 0xFF) as u8);
        frame.extend_from_slice(payload);
        frame
    }

    fn cf(seq: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = H.to_vec();
        frame.push(seq);
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn single_frame_strips_pci() {
        let mut msg = isotp_msg();
        msg.expected_data_prefix = vec![0x41, 0x0C];
        msg.push_raw_frame(vec![0x07, 0xE8, 0x04, 0x41, 0x0C, 0x2A, 0xBC]);

        clean_frames(LinkProtocol::Iso15765Standard, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].data, vec![0x2A, 0xBC]);
    }

    #[test]
    fn multi_frame_reassembles_in_order() {
        let payload: Vec<u8> = (0..20).collect();
        let mut msg = isotp_msg();
        msg.push_raw_frame(ff(&payload[..6], 20));
        msg.push_raw_frame(cf(0x21, &payload[6..13]));
        msg.push_raw_frame(cf(0x22, &payload[13..20]));

        clean_frames(LinkProtocol::Iso15765Standard, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].data, payload);
    }

    #[test]
    fn consecutive_frames_may_precede_the_first_frame() {
        let payload: Vec<u8> = (0..20).collect();
        let mut msg = isotp_msg();
        msg.push_raw_frame(cf(0x21, &payload[6..13]));
        msg.push_raw_frame(cf(0x22, &payload[13..20]));
        msg.push_raw_frame(ff(&payload[..6], 20));

        clean_frames(LinkProtocol::Iso15765Standard, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].data, payload);
    }

    #[test]
    fn sequence_numbers_wrap_past_0x2f() {
        // 6 + 16 * 7 = 118 bytes: sixteen consecutive frames, the last
        // wrapping to PCI 0x20.
        let payload: Vec<u8> = (0..118).map(|i| (i % 251) as u8).collect();
        let mut msg = isotp_msg();
        msg.push_raw_frame(ff(&payload[..6], payload.len()));
        let mut seq = 0x20u8;
        for chunk in payload[6..].chunks(7) {
            seq = isotp::next_consecutive(seq);
            msg.push_raw_frame(cf(seq, chunk));
        }
        assert_eq!(msg.raw_frames.len(), 17);

        clean_frames(LinkProtocol::Iso15765Standard, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].data, payload);
    }

    #[test]
    fn interleaved_single_frames_survive_a_merge() {
        let payload: Vec<u8> = (0..20).collect();
        let mut msg = isotp_msg();
        msg.push_raw_frame(ff(&payload[..6], 20));
        msg.push_raw_frame(vec![0x07, 0xE8, 0x02, 0x99, 0x98]);
        msg.push_raw_frame(cf(0x21, &payload[6..13]));
        msg.push_raw_frame(cf(0x22, &payload[13..20]));

        clean_frames(LinkProtocol::Iso15765Standard, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 2);
        assert_eq!(msg.cleaned[0].data, payload);
        assert_eq!(msg.cleaned[1].data, vec![0x99, 0x98]);
    }

    #[test]
    fn orphan_consecutive_frame_is_dropped() {
        let mut msg = isotp_msg();
        msg.push_raw_frame(vec![0x07, 0xE8, 0x02, 0x41, 0x00]);
        msg.push_raw_frame(cf(0x21, &[1, 2, 3]));

        let mut diag = DiagLog::default();
        clean_frames(LinkProtocol::Iso15765Standard, &mut msg, &mut diag).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].data, vec![0x41, 0x00]);
        assert!(!diag.is_empty());
    }

    #[test]
    fn extended_id_uses_four_header_bytes() {
        let mut msg = MessageData {
            expected_header: vec![0x18, 0xDA, 0xF1, 0x00],
            expected_header_mask: vec![0xFF, 0xFF, 0xFF, 0x00],
            ..MessageData::default()
        };
        msg.push_raw_frame(vec![0x18, 0xDA, 0xF1, 0x10, 0x02, 0x41, 0x00]);

        clean_frames(LinkProtocol::Iso15765Extended, &mut msg, &mut DiagLog::default()).unwrap();
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(msg.cleaned[0].header, vec![0x18, 0xDA, 0xF1, 0x10]);
        assert_eq!(msg.cleaned[0].data, vec![0x41, 0x00]);
    }

    #[test]
    fn expected_count_mismatch_is_advisory() {
        let mut msg = legacy_msg();
        msg.expected_data_count = Some(4);
        msg.push_raw_frame(vec![0x48, 0x6B, 0x10, 0x41, 0x0C, 0x2A, 0xBC]);

        let mut diag = DiagLog::default();
        clean_frames(LinkProtocol::Iso9141, &mut msg, &mut diag).unwrap();
        // Kept, but flagged.
        assert_eq!(msg.cleaned.len(), 1);
        assert_eq!(diag.drain().len(), 1);
    }
}
