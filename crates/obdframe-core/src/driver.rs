//! Parse driver: feeds cleaned replies to the evaluator sandbox.
//!
//! Separate mode runs the parameter's script once per cleaned reply;
//! combined mode stages every message's replies and runs the script once.
//! Either way the driver only moves bytes in and records out; all
//! byte-to-value math lives in the script.

use obdframe_proto::hex;

use crate::error::Result;
use crate::eval::{Evaluator, LiteralValue, ParsedData, ScriptHandle};
use crate::message::{MessageData, ParameterFrame, ParseMode};

/// Property name of the synthetic literal carrying a reply's header bytes.
pub const SOURCE_ADDRESS_PROPERTY: &str = "Source Address";

/// Run the parameter's script over the frame's cleaned replies.
///
/// Separate-mode results are ordered by message, then by reply within the
/// message; combined mode yields exactly one record.
pub(crate) fn parse_frame<E: Evaluator>(
    frame: &ParameterFrame,
    script: ScriptHandle,
    evaluator: &mut E,
) -> Result<Vec<ParsedData>> {
    match frame.parse_mode() {
        ParseMode::Separately => parse_separately(frame, script, evaluator),
        ParseMode::Combined => parse_combined(frame, script, evaluator),
    }
}

fn parse_separately<E: Evaluator>(
    frame: &ParameterFrame,
    script: ScriptHandle,
    evaluator: &mut E,
) -> Result<Vec<ParsedData>> {
    let mut results = Vec::new();

    for msg in &frame.messages {
        for reply in &msg.cleaned {
            evaluator.clear_all_data();
            evaluator.add_list_databytes(std::slice::from_ref(&reply.data));
            evaluator.invoke(script)?;

            let mut record = harvest(frame, evaluator);
            record.literal.push(LiteralValue {
                property: SOURCE_ADDRESS_PROPERTY.to_string(),
                value: true,
                value_if_true: hex::render(&reply.header),
                value_if_false: String::new(),
            });
            results.push(record);
        }
    }

    Ok(results)
}

fn parse_combined<E: Evaluator>(
    frame: &ParameterFrame,
    script: ScriptHandle,
    evaluator: &mut E,
) -> Result<Vec<ParsedData>> {
    evaluator.clear_all_data();
    for msg in &frame.messages {
        let (headers, data) = split_cleaned(msg);
        evaluator.add_msg_data(&headers, &data);
    }
    evaluator.invoke(script)?;

    Ok(vec![harvest(frame, evaluator)])
}

fn split_cleaned(msg: &MessageData) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
    msg.cleaned
        .iter()
        .map(|reply| (reply.header.clone(), reply.data.clone()))
        .unzip()
}

fn harvest<E: Evaluator>(frame: &ParameterFrame, evaluator: &E) -> ParsedData {
    ParsedData {
        parameter: frame.name.clone(),
        address: frame.address.clone(),
        numerical: evaluator.num_data(),
        literal: evaluator.lit_data(),
    }
}
