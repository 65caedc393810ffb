//! Shared fixtures for unit tests: a recording evaluator stub and a small
//! catalog tree covering every protocol family.

use crate::catalog::Node;
use crate::eval::{EvalError, Evaluator, LiteralValue, NumericalValue, ScriptHandle};

/// Evaluator stub that records every call and returns canned results.
#[derive(Debug, Default)]
pub(crate) struct NullEvaluator {
    pub(crate) keys: Vec<String>,
    pub(crate) clears: usize,
    pub(crate) separate_calls: Vec<Vec<Vec<u8>>>,
    pub(crate) msg_calls: Vec<(Vec<Vec<u8>>, Vec<Vec<u8>>)>,
    pub(crate) invocations: Vec<ScriptHandle>,
    pub(crate) num_results: Vec<NumericalValue>,
    pub(crate) lit_results: Vec<LiteralValue>,
}

impl Evaluator for NullEvaluator {
    fn register(&mut self, key: &str, _body: &str) -> Result<ScriptHandle, EvalError> {
        self.keys.push(key.to_string());
        Ok(ScriptHandle::new(self.keys.len() - 1))
    }

    fn clear_all_data(&mut self) {
        self.clears += 1;
    }

    fn add_list_databytes(&mut self, data: &[Vec<u8>]) {
        self.separate_calls.push(data.to_vec());
    }

    fn add_msg_data(&mut self, headers: &[Vec<u8>], data: &[Vec<u8>]) {
        self.msg_calls.push((headers.to_vec(), data.to_vec()));
    }

    fn invoke(&mut self, script: ScriptHandle) -> Result<(), EvalError> {
        self.invocations.push(script);
        Ok(())
    }

    fn num_data(&self) -> Vec<NumericalValue> {
        self.num_results.clone()
    }

    fn lit_data(&self) -> Vec<LiteralValue> {
        self.lit_results.clone()
    }
}

fn default_address() -> Node {
    Node::new("address")
        .attr("name", "Default")
        .child(
            Node::new("request")
                .attr("prio", "0x68")
                .attr("target", "0x6A")
                .attr("source", "0xF1"),
        )
        .child(
            Node::new("response")
                .attr("prio", "0x48")
                .attr("target", "0x6B"),
        )
}

fn kwp_address() -> Node {
    Node::new("address")
        .attr("name", "Default")
        .child(
            Node::new("request")
                .attr("format", "0xC0")
                .attr("target", "0x33")
                .attr("source", "0xF1"),
        )
        .child(
            Node::new("response")
                .attr("format", "0x80")
                .attr("target", "0xF1")
                .attr("source", "0x33"),
        )
}

fn script(body: &str) -> Node {
    Node::new("script").with_text(body)
}

fn parameters() -> Node {
    let long_request = "0x09 0x04 ".to_string() + &"0x00 ".repeat(13);
    let oversized_request = "0x3B ".to_string() + &"0x00 ".repeat(63);

    Node::new("parameters")
        .attr("address", "Default")
        .child(
            Node::new("parameter")
                .attr("name", "Engine RPM")
                .attr("request", "0x01 0x0C")
                .attr("response.prefix", "0x41 0x0C")
                .attr("response.bytes", "2")
                .child(script("num rpm")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Coolant Temperature")
                .attr("request", "0x01 0x05")
                .attr("request.delay", "50")
                .attr("response.prefix", "0x41 0x05")
                .attr("response.bytes", "1")
                .child(script("num coolant")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Stored Trouble Codes")
                .attr("parse", "combined")
                .attr("request0", "0x03")
                .attr("response0.prefix", "0x43")
                .attr("request1", "0x07")
                .attr("response1.prefix", "0x47")
                .child(script("num codes")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Calibration ID")
                .attr("request", long_request.as_str())
                .attr("response.prefix", "0x49 0x04")
                .child(script("num calid")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Oversized Request")
                .attr("request", oversized_request.as_str())
                .child(script("num oversized")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Bus Monitor")
                .child(script("num monitor")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Broken Mix")
                .attr("request", "0x01 0x0C")
                .attr("request0", "0x01 0x0C")
                .child(script("num broken")),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Engine Load")
                .attr("request", "0x01 0x04")
                .attr("response.prefix", "0x41 0x04")
                .child(
                    script("num load legacy")
                        .attr("protocols", "SAE J1850 VPW,ISO 9141-2"),
                )
                .child(
                    script("num load can")
                        .attr("protocols", "ISO 15765 Standard Id,ISO 15765 Extended Id"),
                ),
        )
}

/// A catalog tree exercising every protocol family, one spec without the
/// ISO 14230 length byte and one with it.
pub(crate) fn test_root() -> Node {
    Node::new("definitions")
        .child(
            Node::new("spec")
                .attr("name", "TEST")
                .child(
                    Node::new("protocol")
                        .attr("name", "SAE J1850 VPW")
                        .child(default_address()),
                )
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 9141-2")
                        .child(default_address()),
                )
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 14230")
                        .child(kwp_address()),
                )
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
                        .attr("name", "ISO 15765 Extended Id")
                        .child(
                            Node::new("address")
                                .attr("name", "Default")
                                .child(
                                    Node::new("request")
                                        .attr("prio", "0x18")
                                        .attr("format", "0xDB")
                                        .attr("target", "0x33")
                                        .attr("source", "0xF1"),
                                )
                                .child(
                                    Node::new("response")
                                        .attr("prio", "0x18")
                                        .attr("format", "0xDA")
                                        .attr("target", "0xF1")
                                        .attr("source", "0x00"),
                                ),
                        ),
                )
                .child(parameters()),
        )
        .child(
            Node::new("spec")
                .attr("name", "TEST-LB")
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 14230")
                        .child(
                            Node::new("option")
                                .attr("name", "Length Byte")
                                .attr("value", "true"),
                        )
                        .child(kwp_address()),
                )
                .child(parameters()),
        )
}
