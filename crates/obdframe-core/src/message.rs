//! Parameter frames and per-request message data.
//!
//! A [`ParameterFrame`] is the working object for one build/parse attempt:
//! the caller names a parameter, [`crate::engine::Engine::build`] resolves
//! it and fills in the request messages, the caller ferries the request to
//! the vehicle and loads the received frames back into each message, and
//! [`crate::engine::Engine::parse`] turns them into values. Frames are
//! cheap; create one per attempt and drop it afterwards.

use bytes::{BufMut, Bytes, BytesMut};
use obdframe_proto::frame::{CleanedMessage, RawFrame};
use obdframe_proto::link::LinkProtocol;

use crate::eval::ScriptHandle;

/// How the parse script consumes cleaned replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Run the script once per cleaned reply (the default).
    #[default]
    Separately,
    /// Run the script once for the whole parameter frame, with every
    /// message's replies staged together.
    Combined,
}

/// Boolean protocol options declared in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolOptions {
    /// ISO 14230: encode the request length as an explicit trailing header
    /// byte instead of the format byte's low six bits.
    pub length_byte: bool,
    /// ISO 15765: extended addressing. Recorded but not acted on; extended
    /// and mixed addressing are outside this engine's scope.
    pub extended_address: bool,
}

/// Request and response data for a single message exchange.
///
/// Multi-request parameters own one of these per numbered request; most
/// parameters have exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageData {
    /// Built request header bytes (0–4 bytes depending on protocol).
    pub request_header: Vec<u8>,

    /// Built request payload, one entry per frame after any ISO 15765
    /// splitting and PCI formatting.
    pub request_data: Vec<Vec<u8>>,

    /// Delay to honor before sending this request, in milliseconds.
    pub request_delay_ms: u32,

    /// Expected response header template. Same length as
    /// [`Self::expected_header_mask`].
    pub expected_header: Vec<u8>,

    /// Per-byte significance mask for [`Self::expected_header`]; a zero
    /// byte accepts anything at that position.
    pub expected_header_mask: Vec<u8>,

    /// Bytes every reply's payload must start with; stripped during
    /// cleaning. May be empty.
    pub expected_data_prefix: Vec<u8>,

    /// Declared payload byte count after the prefix. Advisory only;
    /// `None` when the catalog leaves it unspecified.
    pub expected_data_count: Option<u32>,

    /// Received frames, loaded by the caller before parsing. Each frame is
    /// `[header bytes ‖ data bytes]` with checksums already removed.
    pub raw_frames: Vec<RawFrame>,

    /// Accepted replies produced by cleaning, multi-frame messages merged.
    pub cleaned: Vec<CleanedMessage>,
}

impl MessageData {
    /// The request as it goes on the wire: `[header ‖ data]` per frame, in
    /// send order.
    #[must_use]
    pub fn wire_frames(&self) -> Vec<Bytes> {
        self.request_data
            .iter()
            .map(|data| {
                let mut wire = BytesMut::with_capacity(self.request_header.len() + data.len());
                wire.put_slice(&self.request_header);
                wire.put_slice(data);
                wire.freeze()
            })
            .collect()
    }

    /// Append a received frame for later parsing.
    pub fn push_raw_frame(&mut self, frame: impl Into<RawFrame>) {
        self.raw_frames.push(frame.into());
    }
}

/// Working object for one parameter build/parse attempt.
#[derive(Debug, Clone)]
pub struct ParameterFrame {
    /// Spec (namespace) name to resolve under.
    pub spec: String,
    /// Protocol name to resolve under.
    pub protocol: String,
    /// Address name to resolve under.
    pub address: String,
    /// Parameter name.
    pub name: String,

    /// ISO 15765: prepend PCI bytes to built request frames. On by
    /// default.
    pub iso15765_add_pci_byte: bool,

    /// ISO 15765: split request payloads above seven bytes into
    /// first/consecutive frames. On by default.
    pub iso15765_split_req_into_frames: bool,

    /// Request/response data, one entry per request. Populated by the
    /// builder; the caller loads raw frames into each entry.
    pub messages: Vec<MessageData>,

    link: Option<LinkProtocol>,
    options: ProtocolOptions,
    parse_mode: ParseMode,
    script: Option<ScriptHandle>,
}

impl ParameterFrame {
    /// Select a parameter by its four catalog coordinates.
    #[must_use]
    pub fn new(
        spec: impl Into<String>,
        protocol: impl Into<String>,
        address: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            spec: spec.into(),
            protocol: protocol.into(),
            address: address.into(),
            name: name.into(),
            iso15765_add_pci_byte: true,
            iso15765_split_req_into_frames: true,
            messages: Vec::new(),
            link: None,
            options: ProtocolOptions::default(),
            parse_mode: ParseMode::default(),
            script: None,
        }
    }

    /// Resolved link protocol. `None` until built.
    #[must_use]
    pub fn link(&self) -> Option<LinkProtocol> {
        self.link
    }

    /// Resolved protocol options. Defaults until built.
    #[must_use]
    pub fn options(&self) -> ProtocolOptions {
        self.options
    }

    /// Resolved parse mode. Defaults until built.
    #[must_use]
    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    /// Handle of the evaluator script selected for this parameter.
    /// `None` until built; parsing without one is a hard error.
    #[must_use]
    pub fn script(&self) -> Option<ScriptHandle> {
        self.script
    }

    /// `spec:address:name`, the identity used in diagnostics.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.spec, self.address, self.name)
    }

    pub(crate) fn set_resolved(
        &mut self,
        link: LinkProtocol,
        options: ProtocolOptions,
        parse_mode: ParseMode,
        script: ScriptHandle,
    ) {
        self.link = Some(link);
        self.options = options;
        self.parse_mode = parse_mode;
        self.script = Some(script);
    }
}
