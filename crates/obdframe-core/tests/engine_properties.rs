//! Properties of the build/clean pipeline driven through the public
//! façade: cleaner idempotence on the engine's own output, full-prefix
//! stripping, and robustness against arbitrary garbage frames.

use obdframe_core::engine::Engine;
use obdframe_core::eval::{EvalError, Evaluator, LiteralValue, NumericalValue, ScriptHandle};
use obdframe_core::message::ParameterFrame;
use obdframe_core::catalog::Node;
use obdframe_proto::hex;
use proptest::prelude::*;

/// Evaluator that accepts every script and produces no values; these
/// tests only inspect the cleaning stage.
#[derive(Debug, Default)]
struct InertEvaluator {
    scripts: usize,
}

impl Evaluator for InertEvaluator {
    fn register(&mut self, _key: &str, _body: &str) -> Result<ScriptHandle, EvalError> {
        let handle = ScriptHandle::new(self.scripts);
        self.scripts += 1;
        Ok(handle)
    }

    fn clear_all_data(&mut self) {}

    fn add_list_databytes(&mut self, _data: &[Vec<u8>]) {}

    fn add_msg_data(&mut self, _headers: &[Vec<u8>], _data: &[Vec<u8>]) {}

    fn invoke(&mut self, _script: ScriptHandle) -> Result<(), EvalError> {
        Ok(())
    }

    fn num_data(&self) -> Vec<NumericalValue> {
        Vec::new()
    }

    fn lit_data(&self) -> Vec<LiteralValue> {
        Vec::new()
    }
}

fn token_list(bytes: &[u8]) -> String {
    let tokens: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
    tokens.join(" ")
}

/// A one-parameter catalog whose request payload is `payload` and whose
/// declared response prefix is the payload's first two bytes.
fn echo_catalog(payload: &[u8]) -> Node {
    Node::new("definitions").child(
        Node::new("spec")
            .attr("name", "PROP")
            .child(
                Node::new("protocol")
                    .attr("name", "ISO 15765 Standard Id")
                    .child(
                        Node::new("address")
                            .attr("name", "Default")
                            .child(Node::new("request").attr("identifier", "0x7DF"))
                            .child(Node::new("response").attr("identifier", "0x7E8")),
                    ),
            )
            .child(
                Node::new("protocol")
                    .attr("name", "ISO 9141-2")
                    .child(
                        Node::new("address")
                            .attr("name", "Default")
                            .child(
                                Node::new("request")
                                    .attr("prio", "0x68")
                                    .attr("target", "0x6A")
                                    .attr("source", "0xF1"),
                            )
                            .child(Node::new("response").attr("prio", "0x48")),
                    ),
            )
            .child(
                Node::new("parameters")
                    .attr("address", "Default")
                    .child(
                        Node::new("parameter")
                            .attr("name", "Echo")
                            .attr("request", token_list(payload).as_str())
                            .attr("response.prefix", token_list(&payload[..2]).as_str())
                            .child(Node::new("script").with_text("echo")),
                    ),
            ),
    )
}

proptest! {
    // Feeding a built ISO 15765 request back as raw frames (under the
    // expected response header) yields exactly one cleaned reply equal to
    // the original payload minus its prefix.
    #[test]
    fn cleaner_inverts_builder_output(
        payload in prop::collection::vec(any::<u8>(), 3..300)
    ) {
        let mut engine =
            Engine::new(&echo_catalog(&payload), InertEvaluator::default()).unwrap();
        let mut frame =
            ParameterFrame::new("PROP", "ISO 15765 Standard Id", "Default", "Echo");
        engine.build(&mut frame).unwrap();

        let reply_header = frame.messages[0].expected_header.clone();
        for data in frame.messages[0].request_data.clone() {
            let mut raw = reply_header.clone();
            raw.extend_from_slice(&data);
            frame.messages[0].push_raw_frame(raw);
        }

        engine.parse(&mut frame).unwrap();
        prop_assert_eq!(frame.messages[0].cleaned.len(), 1);
        prop_assert_eq!(&frame.messages[0].cleaned[0].data, &payload[2..]);
    }

    // Legacy cleaning strips the declared prefix in full; replies keep
    // everything after it.
    #[test]
    fn legacy_prefix_is_fully_stripped(
        payload in prop::collection::vec(1u8..=u8::MAX, 3..32)
    ) {
        let mut engine =
            Engine::new(&echo_catalog(&payload), InertEvaluator::default()).unwrap();
        let mut frame = ParameterFrame::new("PROP", "ISO 9141-2", "Default", "Echo");
        engine.build(&mut frame).unwrap();

        let mut raw = vec![0x48, 0x00, 0x00];
        raw.extend_from_slice(&payload);
        frame.messages[0].push_raw_frame(raw);

        engine.parse(&mut frame).unwrap();
        let cleaned = &frame.messages[0].cleaned[0];
        prop_assert_eq!(&cleaned.data, &payload[2..]);
        prop_assert_eq!(
            hex::render(&cleaned.header),
            "48 00 00".to_string()
        );
    }

    // Arbitrary garbage frames never panic the engine; cleaning either
    // keeps something or fails with a clean error.
    #[test]
    fn garbage_frames_never_panic(
        frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 1..8)
    ) {
        let payload = vec![0x49u8, 0x04, 0x01];
        let mut engine =
            Engine::new(&echo_catalog(&payload), InertEvaluator::default()).unwrap();

        for protocol in ["ISO 15765 Standard Id", "ISO 9141-2"] {
            let mut frame = ParameterFrame::new("PROP", protocol, "Default", "Echo");
            engine.build(&mut frame).unwrap();
            for raw in &frames {
                frame.messages[0].push_raw_frame(raw.clone());
            }
            let _ = engine.parse(&mut frame);
            let _ = engine.diagnostics();
        }
    }
}
