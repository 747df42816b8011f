//! Compact wire stage codes
//!
//! Interaction type and stage are packed into a single byte on the wire.
//! The table spans the 22 defined (pattern, stage) pairs from SEND through
//! PUBSUB's tenth stage and is bijective over that range.
//!
//! Known quirk, preserved for wire compatibility: codes outside the table
//! decode as PUBSUB with a derived stage (the historical lookup fell through
//! to the PUBSUB branch). Decoders must not rely on this; header validation
//! rejects the resulting out-of-range stage anyway.

use crate::error::{CodecError, CodecResult};
use mal_types::interaction::stage;
use mal_types::InteractionType;

const SEND_BASE: u8 = 0;
const SUBMIT_BASE: u8 = 1;
const REQUEST_BASE: u8 = 3;
const INVOKE_BASE: u8 = 5;
const PROGRESS_BASE: u8 = 8;
const PUBSUB_BASE: u8 = 12;

/// Number of defined stage codes
pub const STAGE_CODE_COUNT: u8 = 22;

/// Pack an interaction type and stage into the one-byte wire code
pub fn encode_stage_code(interaction: InteractionType, stage: u8) -> CodecResult<u8> {
    if !interaction.is_valid_stage(stage) {
        return Err(CodecError::invalid_stage(interaction_name(interaction), stage));
    }
    Ok(match interaction {
        InteractionType::Send => SEND_BASE,
        InteractionType::Submit => SUBMIT_BASE + (stage - stage::SUBMIT),
        InteractionType::Request => REQUEST_BASE + (stage - stage::REQUEST),
        InteractionType::Invoke => INVOKE_BASE + (stage - stage::INVOKE),
        InteractionType::Progress => PROGRESS_BASE + (stage - stage::PROGRESS),
        InteractionType::PubSub => PUBSUB_BASE + (stage - stage::REGISTER),
    })
}

/// Unpack a wire code into interaction type and stage
///
/// Total function: out-of-range codes take the PUBSUB fallthrough (see
/// module docs) and yield a stage number that fails header validation.
pub fn decode_stage_code(code: u8) -> (InteractionType, u8) {
    match code {
        SEND_BASE => (InteractionType::Send, stage::SEND),
        SUBMIT_BASE..=2 => (InteractionType::Submit, stage::SUBMIT + (code - SUBMIT_BASE)),
        REQUEST_BASE..=4 => (
            InteractionType::Request,
            stage::REQUEST + (code - REQUEST_BASE),
        ),
        INVOKE_BASE..=7 => (InteractionType::Invoke, stage::INVOKE + (code - INVOKE_BASE)),
        PROGRESS_BASE..=11 => (
            InteractionType::Progress,
            stage::PROGRESS + (code - PROGRESS_BASE),
        ),
        _ => (
            InteractionType::PubSub,
            stage::REGISTER + (code - PUBSUB_BASE),
        ),
    }
}

fn interaction_name(interaction: InteractionType) -> &'static str {
    match interaction {
        InteractionType::Send => "SEND",
        InteractionType::Submit => "SUBMIT",
        InteractionType::Request => "REQUEST",
        InteractionType::Invoke => "INVOKE",
        InteractionType::Progress => "PROGRESS",
        InteractionType::PubSub => "PUBSUB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bijection_over_all_defined_pairs() {
        let mut seen = [false; STAGE_CODE_COUNT as usize];
        let mut total = 0;

        for interaction in InteractionType::ALL {
            for &stage in interaction.stages() {
                let code = encode_stage_code(interaction, stage).unwrap();
                assert!(code < STAGE_CODE_COUNT, "code {code} out of table");
                assert!(!seen[code as usize], "code {code} assigned twice");
                seen[code as usize] = true;

                assert_eq!(decode_stage_code(code), (interaction, stage));
                total += 1;
            }
        }

        assert_eq!(total, 22);
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_invalid_stage_rejected_on_encode() {
        assert!(encode_stage_code(InteractionType::Send, 1).is_err());
        assert!(encode_stage_code(InteractionType::Request, 3).is_err());
        assert!(encode_stage_code(InteractionType::PubSub, 0).is_err());
        assert!(encode_stage_code(InteractionType::PubSub, 11).is_err());
    }

    #[test]
    fn test_unknown_codes_take_pubsub_fallthrough() {
        // Historical quirk: out-of-table codes decode as PUBSUB
        let (interaction, stage) = decode_stage_code(22);
        assert_eq!(interaction, InteractionType::PubSub);
        assert_eq!(stage, 11);
        // The derived stage is invalid for PUBSUB, so validation catches it
        assert!(!interaction.is_valid_stage(stage));

        let (interaction, _) = decode_stage_code(200);
        assert_eq!(interaction, InteractionType::PubSub);
    }
}
