//! Request construction.
//!
//! Turns a resolved catalog entry into request headers and payload frames.
//! Header layout is per protocol family; payloads come from the
//! parameter's `request` attributes and then get protocol formatting:
//! ISO 15765 splitting plus PCI bytes, ISO 14230 length encoding.

use obdframe_proto::errors::WireError;
use obdframe_proto::link::LinkProtocol;
use obdframe_proto::{hex, isotp, kwp};

use crate::catalog::{AddressEntry, Catalog, ParameterEntry};
use crate::diag::DiagLog;
use crate::error::{EngineError, Result};
use crate::eval::ScriptHandle;
use crate::message::{MessageData, ParameterFrame, ProtocolOptions};

const LEGACY: &str = "SAE J1850/ISO 9141-2";
const KWP: &str = "ISO 14230";
const CAN_STD: &str = "ISO 15765 (11-bit)";
const CAN_EXT: &str = "ISO 15765 (29-bit)";

/// Resolve `frame`'s selection against the catalog and populate its
/// request messages.
pub(crate) fn build_frame(
    catalog: &Catalog,
    frame: &mut ParameterFrame,
    diag: &mut DiagLog,
) -> Result<()> {
    let resolved = catalog.resolve(&frame.spec, &frame.protocol, &frame.address, &frame.name)?;

    let link = LinkProtocol::classify(&resolved.protocol.name).map_err(|_| {
        EngineError::UnsupportedProtocol {
            name: resolved.protocol.name.clone(),
        }
    })?;
    let options = resolved.protocol.options;

    frame.messages.clear();
    let first = match link {
        LinkProtocol::SaeJ1850 | LinkProtocol::Iso9141 => {
            build_header_legacy(resolved.address, diag)?
        }
        LinkProtocol::Iso14230 => build_header_kwp(resolved.address, diag)?,
        LinkProtocol::Iso15765Standard => build_header_can_std(resolved.address, diag)?,
        LinkProtocol::Iso15765Extended => build_header_can_ext(resolved.address, diag)?,
    };
    frame.messages.push(first);

    build_data(resolved.parameter, frame, link, options)?;

    let script = select_script(resolved.parameter, &frame.protocol, &frame.key())?;
    frame.set_resolved(link, options, resolved.parameter.parse_mode, script);

    tracing::debug!(
        target: "obdframe",
        key = %frame.key(),
        protocol = %frame.protocol,
        messages = frame.messages.len(),
        "built parameter frame"
    );
    Ok(())
}

fn header_byte(protocol: &'static str, field: &str, value: &str) -> Result<u8> {
    hex::parse_byte(value).map_err(|_| EngineError::MalformedHeader {
        protocol,
        detail: format!("bad {field} byte {value:?}"),
    })
}

/// Legacy 3-byte header `[prio] [target] [source]`. All three request
/// attributes are required; response attributes each anchor their byte in
/// the mask when present.
fn build_header_legacy(address: &AddressEntry, diag: &mut DiagLog) -> Result<MessageData> {
    let mut msg = MessageData::default();

    if let Some(req) = &address.request {
        let (Some(prio), Some(target), Some(source)) =
            (req.prio.as_deref(), req.target.as_deref(), req.source.as_deref())
        else {
            return Err(EngineError::MalformedHeader {
                protocol: LEGACY,
                detail: "request header needs prio, target and source".to_string(),
            });
        };
        msg.request_header.push(header_byte(LEGACY, "prio", prio)?);
        msg.request_header.push(header_byte(LEGACY, "target", target)?);
        msg.request_header.push(header_byte(LEGACY, "source", source)?);
    } else {
        diag.warn(format!("{LEGACY}: no request header declared"));
    }

    msg.expected_header = vec![0x00; 3];
    msg.expected_header_mask = vec![0x00; 3];

    if let Some(resp) = &address.response {
        if let Some(prio) = resp.prio.as_deref() {
            msg.expected_header[0] = header_byte(LEGACY, "prio", prio)?;
            msg.expected_header_mask[0] = 0xFF;
        }
        if let Some(target) = resp.target.as_deref() {
            msg.expected_header[1] = header_byte(LEGACY, "target", target)?;
            msg.expected_header_mask[1] = 0xFF;
        }
        if let Some(source) = resp.source.as_deref() {
            msg.expected_header[2] = header_byte(LEGACY, "source", source)?;
            msg.expected_header_mask[2] = 0xFF;
        }
    }

    Ok(msg)
}

/// ISO 14230 variable header. The request's format byte is required; its
/// addressing bits decide whether target and source must follow. The
/// response template is always `[format] [target] [source]` with the
/// format byte masked to its addressing bits, so the length bits never
/// reject a reply.
fn build_header_kwp(address: &AddressEntry, diag: &mut DiagLog) -> Result<MessageData> {
    let mut msg = MessageData::default();

    if let Some(req) = &address.request {
        let Some(format) = req.format.as_deref() else {
            return Err(EngineError::MalformedHeader {
                protocol: KWP,
                detail: "request header is missing its format byte".to_string(),
            });
        };
        let format_byte = header_byte(KWP, "format", format)?;
        msg.request_header.push(format_byte);

        if kwp::has_addressing(format_byte) {
            let (Some(target), Some(source)) = (req.target.as_deref(), req.source.as_deref())
            else {
                return Err(EngineError::MalformedHeader {
                    protocol: KWP,
                    detail: "addressing mode requires target and source".to_string(),
                });
            };
            msg.request_header.push(header_byte(KWP, "target", target)?);
            msg.request_header.push(header_byte(KWP, "source", source)?);
        }
    } else {
        diag.warn(format!("{KWP}: no request header declared"));
    }

    msg.expected_header = vec![0x00; 3];
    msg.expected_header_mask = vec![0x00; 3];

    if let Some(resp) = &address.response {
        if let Some(format) = resp.format.as_deref() {
            msg.expected_header[0] = header_byte(KWP, "format", format)?;
            msg.expected_header_mask[0] = kwp::ADDRESSING_MASK;
        }
        if let Some(target) = resp.target.as_deref() {
            msg.expected_header[1] = header_byte(KWP, "target", target)?;
            msg.expected_header_mask[1] = 0xFF;
        }
        if let Some(source) = resp.source.as_deref() {
            msg.expected_header[2] = header_byte(KWP, "source", source)?;
            msg.expected_header_mask[2] = 0xFF;
        }
    }

    Ok(msg)
}

fn identifier_bytes(protocol: &'static str, value: &str) -> Result<[u8; 2]> {
    let id = hex::parse_uint(value).map_err(|_| EngineError::MalformedHeader {
        protocol,
        detail: format!("bad identifier {value:?}"),
    })?;
    Ok([((id >> 8) & 0x0F) as u8, (id & 0xFF) as u8])
}

/// ISO 15765 with 11-bit identifiers: a single identifier attribute per
/// direction, stored as two bytes. A declared response identifier anchors
/// both bytes.
fn build_header_can_std(address: &AddressEntry, diag: &mut DiagLog) -> Result<MessageData> {
    let mut msg = MessageData::default();

    if let Some(req) = &address.request {
        let Some(identifier) = req.identifier.as_deref() else {
            return Err(EngineError::MalformedHeader {
                protocol: CAN_STD,
                detail: "request header is missing its identifier".to_string(),
            });
        };
        msg.request_header = identifier_bytes(CAN_STD, identifier)?.to_vec();
    } else {
        diag.warn(format!("{CAN_STD}: no request header declared"));
    }

    msg.expected_header = vec![0x00; 2];
    msg.expected_header_mask = vec![0x00; 2];

    if let Some(resp) = &address.response {
        let Some(identifier) = resp.identifier.as_deref() else {
            return Err(EngineError::MalformedHeader {
                protocol: CAN_STD,
                detail: "response header is missing its identifier".to_string(),
            });
        };
        msg.expected_header = identifier_bytes(CAN_STD, identifier)?.to_vec();
        msg.expected_header_mask = vec![0xFF; 2];
    }

    Ok(msg)
}

/// ISO 15765 with 29-bit identifiers: a 4-byte
/// `[prio] [format] [target] [source]` header. All four request attributes
/// are required; response attributes each anchor their own byte.
fn build_header_can_ext(address: &AddressEntry, diag: &mut DiagLog) -> Result<MessageData> {
    let mut msg = MessageData::default();

    if let Some(req) = &address.request {
        let (Some(prio), Some(format), Some(target), Some(source)) = (
            req.prio.as_deref(),
            req.format.as_deref(),
            req.target.as_deref(),
            req.source.as_deref(),
        ) else {
            return Err(EngineError::MalformedHeader {
                protocol: CAN_EXT,
                detail: "request header needs prio, format, target and source".to_string(),
            });
        };
        msg.request_header.push(header_byte(CAN_EXT, "prio", prio)?);
        msg.request_header.push(header_byte(CAN_EXT, "format", format)?);
        msg.request_header.push(header_byte(CAN_EXT, "target", target)?);
        msg.request_header.push(header_byte(CAN_EXT, "source", source)?);
    } else {
        diag.warn(format!("{CAN_EXT}: no request header declared"));
    }

    msg.expected_header = vec![0x00; 4];
    msg.expected_header_mask = vec![0x00; 4];

    if let Some(resp) = &address.response {
        if let Some(prio) = resp.prio.as_deref() {
            msg.expected_header[0] = header_byte(CAN_EXT, "prio", prio)?;
            msg.expected_header_mask[0] = 0xFF;
        }
        if let Some(format) = resp.format.as_deref() {
            msg.expected_header[1] = header_byte(CAN_EXT, "format", format)?;
            msg.expected_header_mask[1] = 0xFF;
        }
        if let Some(target) = resp.target.as_deref() {
            msg.expected_header[2] = header_byte(CAN_EXT, "target", target)?;
            msg.expected_header_mask[2] = 0xFF;
        }
        if let Some(source) = resp.source.as_deref() {
            msg.expected_header[3] = header_byte(CAN_EXT, "source", source)?;
            msg.expected_header_mask[3] = 0xFF;
        }
    }

    Ok(msg)
}

/// Fill request payloads from the parameter's data attributes.
///
/// Two declarative shapes exist: a single `request` (with `request.delay`,
/// `response.prefix`, `response.bytes`) or numbered `request0`,
/// `request1`, … with analogous per-index attributes. Numbering is
/// contiguous from zero; the first gap ends the list. A parameter with
/// neither shape is passive (parse-only) and keeps just the header
/// message.
fn build_data(
    parameter: &ParameterEntry,
    frame: &mut ParameterFrame,
    link: LinkProtocol,
    options: ProtocolOptions,
) -> Result<()> {
    let attrs = &parameter.attributes;
    let single = non_empty(attrs, "request");
    let multi = non_empty(attrs, "request0");

    match (single, multi) {
        (None, None) => return Ok(()),
        (Some(_), Some(_)) => {
            return Err(EngineError::MalformedData {
                name: parameter.name.clone(),
                detail: "mixes single and numbered request forms".to_string(),
            });
        }
        _ => {}
    }

    if let Some(request) = single {
        fill_message(
            &mut frame.messages[0],
            &parameter.name,
            request,
            non_empty(attrs, "request.delay"),
            non_empty(attrs, "response.prefix"),
            non_empty(attrs, "response.bytes"),
        )?;
    } else {
        let mut index = 0usize;
        while let Some(request) = non_empty(attrs, &format!("request{index}")) {
            if index > 0 {
                frame.messages.push(MessageData::default());
            }
            let last = frame.messages.len() - 1;
            fill_message(
                &mut frame.messages[last],
                &parameter.name,
                request,
                non_empty(attrs, &format!("request{index}.delay")),
                non_empty(attrs, &format!("response{index}.prefix")),
                non_empty(attrs, &format!("response{index}.bytes")),
            )?;
            index += 1;
        }
    }

    // Numbered requests share the header template built for the address.
    if frame.messages.len() > 1 {
        let request_header = frame.messages[0].request_header.clone();
        let expected_header = frame.messages[0].expected_header.clone();
        let expected_header_mask = frame.messages[0].expected_header_mask.clone();
        for msg in frame.messages.iter_mut().skip(1) {
            msg.request_header = request_header.clone();
            msg.expected_header = expected_header.clone();
            msg.expected_header_mask = expected_header_mask.clone();
        }
    }

    if link.is_iso15765() {
        let split = frame.iso15765_split_req_into_frames;
        let add_pci = frame.iso15765_add_pci_byte;
        for msg in &mut frame.messages {
            if msg.request_data.first().is_none_or(Vec::is_empty) {
                continue;
            }
            if split && msg.request_data[0].len() > isotp::MAX_SINGLE_FRAME_DATA {
                let payload = msg.request_data.remove(0);
                msg.request_data = isotp::split_into_frames(payload);
            }
            if add_pci {
                isotp::add_pci_bytes(&mut msg.request_data);
            }
        }
    }

    if link == LinkProtocol::Iso14230 {
        for msg in &mut frame.messages {
            let Some(first) = msg.request_data.first() else {
                continue;
            };
            if msg.request_header.is_empty() {
                return Err(EngineError::MalformedHeader {
                    protocol: KWP,
                    detail: "request data declared without a request header".to_string(),
                });
            }
            let len = first.len();
            kwp::encode_length(&mut msg.request_header, len, options.length_byte).map_err(
                |err| match err {
                    WireError::LengthOverflow { len, max } => {
                        EngineError::LengthOverflow { len, max }
                    }
                    other => EngineError::MalformedData {
                        name: parameter.name.clone(),
                        detail: other.to_string(),
                    },
                },
            )?;
        }
    }

    Ok(())
}

fn non_empty<'a>(
    attrs: &'a std::collections::BTreeMap<String, String>,
    key: &str,
) -> Option<&'a str> {
    attrs.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn fill_message(
    msg: &mut MessageData,
    name: &str,
    request: &str,
    delay: Option<&str>,
    prefix: Option<&str>,
    count: Option<&str>,
) -> Result<()> {
    let bad_token = |token: &str| EngineError::MalformedData {
        name: name.to_string(),
        detail: format!("bad byte token {token:?}"),
    };

    let mut payload = Vec::new();
    for token in request.split_whitespace() {
        payload.push(hex::parse_byte(token).map_err(|_| bad_token(token))?);
    }
    if payload.is_empty() {
        return Err(EngineError::MalformedData {
            name: name.to_string(),
            detail: "empty request byte list".to_string(),
        });
    }
    msg.request_data.push(payload);

    if let Some(delay) = delay {
        msg.request_delay_ms = hex::parse_uint(delay).map_err(|_| bad_token(delay))?;
    }
    if let Some(prefix) = prefix {
        for token in prefix.split_whitespace() {
            msg.expected_data_prefix
                .push(hex::parse_byte(token).map_err(|_| bad_token(token))?);
        }
    }
    if let Some(count) = count {
        msg.expected_data_count = Some(hex::parse_uint(count).map_err(|_| bad_token(count))?);
    }
    Ok(())
}

/// Pick the evaluator script for the runtime protocol. Explicit protocol
/// patterns are substring matches against the protocol name; if any script
/// declares a pattern, one of them must match. Without explicit patterns
/// the first (default) script applies.
fn select_script(
    parameter: &ParameterEntry,
    protocol: &str,
    key: &str,
) -> Result<ScriptHandle> {
    let unbound = || EngineError::ScriptUnbound {
        key: key.to_string(),
    };

    if parameter.scripts.iter().any(|s| !s.protocols.is_empty()) {
        parameter
            .scripts
            .iter()
            .find(|s| s.protocols.contains(protocol))
            .map(|s| s.handle)
            .ok_or_else(unbound)
    } else {
        parameter.scripts.first().map(|s| s.handle).ok_or_else(unbound)
    }
}
