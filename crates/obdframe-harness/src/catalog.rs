//! Built-in catalog fixture.
//!
//! One spec (`TEST`) carries every protocol family over a shared
//! `Default` address and a parameter set covering the request shapes:
//! plain single request, delayed request, numbered multi-request with
//! combined parsing, an oversized request that must split on ISO 15765,
//! and a passive parse-only parameter. A second spec (`TEST-LB`) flips
//! the ISO 14230 length-byte option.

use obdframe_core::catalog::Node;

const RPM_SCRIPT: &str = r#"num "Engine RPM", "rpm", 0, 16383.75, (BYTE(0)*256 + BYTE(1))/4"#;

const COOLANT_SCRIPT: &str = r#"num "Coolant Temperature", "°C", -40, 215, BYTE(0) - 40"#;

const SPEED_SCRIPT: &str = r#"num "Vehicle Speed", "km/h", 0, 255, BYTE(0)"#;

const FUEL_STATUS_SCRIPT: &str = r#"lit "Closed Loop", BYTE(0) == 2, "yes", "no""#;

const TROUBLE_CODES_SCRIPT: &str = r#"
# one reply expected per request; sum what came back
num "Reply Count", "replies", 0, 99, DATA_COUNT(0) + DATA_COUNT(1)
num "First Mode Byte", "", 0, 255, REQ(0).DATA(0).BYTE(0)
"#;

const CALIBRATION_SCRIPT: &str = r#"num "Calibration Marker", "", 0, 255, BYTE(0)"#;

const MONITOR_SCRIPT: &str = r#"lit "Bus Active", BYTE(0) >= 0, "active", "idle""#;

fn legacy_address() -> Node {
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

fn can_std_address() -> Node {
    Node::new("address")
        .attr("name", "Default")
        .child(Node::new("request").attr("identifier", "0x7DF"))
        .child(Node::new("response").attr("identifier", "0x7E8"))
}

fn can_ext_address() -> Node {
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
                .attr("target", "0xF1"),
        )
}

fn script(body: &str) -> Node {
    Node::new("script").with_text(body)
}

fn parameters() -> Node {
    let calibration_request = "0x09 0x04 ".to_string() + &"0x00 ".repeat(13);

    Node::new("parameters")
        .attr("address", "Default")
        .child(
            Node::new("parameter")
                .attr("name", "Engine RPM")
                .attr("request", "0x01 0x0C")
                .attr("response.prefix", "0x41 0x0C")
                .attr("response.bytes", "2")
                .child(script(RPM_SCRIPT)),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Coolant Temperature")
                .attr("request", "0x01 0x05")
                .attr("request.delay", "50")
                .attr("response.prefix", "0x41 0x05")
                .attr("response.bytes", "1")
                .child(script(COOLANT_SCRIPT)),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Vehicle Speed")
                .attr("request", "0x01 0x0D")
                .attr("response.prefix", "0x41 0x0D")
                .attr("response.bytes", "1")
                .child(script(SPEED_SCRIPT)),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Fuel System Status")
                .attr("request", "0x01 0x03")
                .attr("response.prefix", "0x41 0x03")
                .attr("response.bytes", "2")
                .child(script(FUEL_STATUS_SCRIPT)),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Trouble Code Count")
                .attr("parse", "combined")
                .attr("request0", "0x03")
                .attr("response0.prefix", "0x43")
                .attr("request1", "0x07")
                .attr("response1.prefix", "0x47")
                .child(script(TROUBLE_CODES_SCRIPT)),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Calibration ID")
                .attr("request", calibration_request.as_str())
                .attr("response.prefix", "0x49 0x04")
                .child(script(CALIBRATION_SCRIPT)),
        )
        .child(
            Node::new("parameter")
                .attr("name", "Bus Monitor")
                .child(script(MONITOR_SCRIPT)),
        )
}

/// The harness catalog tree. See the module docs for its layout.
#[must_use]
pub fn test_catalog() -> Node {
    Node::new("definitions")
        .child(
            Node::new("spec")
                .attr("name", "TEST")
                .child(
                    Node::new("protocol")
                        .attr("name", "SAE J1850 VPW")
                        .child(legacy_address()),
                )
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 9141-2")
                        .child(legacy_address()),
                )
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 14230")
                        .child(kwp_address()),
                )
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 15765 Standard Id")
                        .child(can_std_address()),
                )
                .child(
                    Node::new("protocol")
                        .attr("name", "ISO 15765 Extended Id")
                        .child(can_ext_address()),
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
