//! Interaction patterns and their stage tables
//!
//! The six MAL interaction patterns each define a fixed, ordered set of
//! stages. The tables here are the single authority for which stages exist,
//! which stage opens a pattern (and therefore which inbound failures get an
//! automatic error reply), and what the error reply's stage is. Messages are
//! stateless with respect to prior messages; correlation is the transaction
//! id and belongs to consumer-side layers above this core.

use crate::element::ElementError;

/// The six MAL interaction patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    Send = 0,
    Submit = 1,
    Request = 2,
    Invoke = 3,
    Progress = 4,
    PubSub = 5,
}

impl InteractionType {
    pub const ALL: [InteractionType; 6] = [
        InteractionType::Send,
        InteractionType::Submit,
        InteractionType::Request,
        InteractionType::Invoke,
        InteractionType::Progress,
        InteractionType::PubSub,
    ];

    pub fn from_ordinal(v: u8) -> Result<Self, ElementError> {
        match v {
            0 => Ok(InteractionType::Send),
            1 => Ok(InteractionType::Submit),
            2 => Ok(InteractionType::Request),
            3 => Ok(InteractionType::Invoke),
            4 => Ok(InteractionType::Progress),
            5 => Ok(InteractionType::PubSub),
            other => Err(ElementError::malformed(format!(
                "invalid InteractionType ordinal {other}"
            ))),
        }
    }

    /// The valid stage numbers of this pattern, in sequence order
    pub fn stages(self) -> &'static [u8] {
        match self {
            InteractionType::Send => &[stage::SEND],
            InteractionType::Submit => &[stage::SUBMIT, stage::SUBMIT_ACK],
            InteractionType::Request => &[stage::REQUEST, stage::REQUEST_RESPONSE],
            InteractionType::Invoke => {
                &[stage::INVOKE, stage::INVOKE_ACK, stage::INVOKE_RESPONSE]
            }
            InteractionType::Progress => &[
                stage::PROGRESS,
                stage::PROGRESS_ACK,
                stage::PROGRESS_UPDATE,
                stage::PROGRESS_RESPONSE,
            ],
            InteractionType::PubSub => &[
                stage::REGISTER,
                stage::REGISTER_ACK,
                stage::PUBLISH_REGISTER,
                stage::PUBLISH_REGISTER_ACK,
                stage::PUBLISH,
                stage::NOTIFY,
                stage::DEREGISTER,
                stage::DEREGISTER_ACK,
                stage::PUBLISH_DEREGISTER,
                stage::PUBLISH_DEREGISTER_ACK,
            ],
        }
    }

    /// Whether `stage` is a defined stage of this pattern
    pub fn is_valid_stage(self, stage: u8) -> bool {
        self.stages().contains(&stage)
    }

    /// Whether `stage` opens an exchange that the peer must answer
    ///
    /// SEND has no reply at all; PUBLISH and NOTIFY are one-way within an
    /// established registration and do not qualify either.
    pub fn is_initiating_stage(self, stage: u8) -> bool {
        match self {
            InteractionType::Send => false,
            InteractionType::Submit => stage == stage::SUBMIT,
            InteractionType::Request => stage == stage::REQUEST,
            InteractionType::Invoke => stage == stage::INVOKE,
            InteractionType::Progress => stage == stage::PROGRESS,
            InteractionType::PubSub => matches!(
                stage,
                stage::REGISTER
                    | stage::PUBLISH_REGISTER
                    | stage::DEREGISTER
                    | stage::PUBLISH_DEREGISTER
            ),
        }
    }

    /// Stage of the automatic error reply to a failed initiating message
    ///
    /// `None` when the pattern/stage never gets a reflected error.
    pub fn error_stage_for(self, stage: u8) -> Option<u8> {
        if self.is_initiating_stage(stage) {
            Some(stage + 1)
        } else {
            None
        }
    }
}

/// Stage numbers per pattern
///
/// Stages are 1-based within each pattern; SEND's single fire-and-forget
/// stage is 0.
pub mod stage {
    pub const SEND: u8 = 0;

    pub const SUBMIT: u8 = 1;
    pub const SUBMIT_ACK: u8 = 2;

    pub const REQUEST: u8 = 1;
    pub const REQUEST_RESPONSE: u8 = 2;

    pub const INVOKE: u8 = 1;
    pub const INVOKE_ACK: u8 = 2;
    pub const INVOKE_RESPONSE: u8 = 3;

    pub const PROGRESS: u8 = 1;
    pub const PROGRESS_ACK: u8 = 2;
    pub const PROGRESS_UPDATE: u8 = 3;
    pub const PROGRESS_RESPONSE: u8 = 4;

    pub const REGISTER: u8 = 1;
    pub const REGISTER_ACK: u8 = 2;
    pub const PUBLISH_REGISTER: u8 = 3;
    pub const PUBLISH_REGISTER_ACK: u8 = 4;
    pub const PUBLISH: u8 = 5;
    pub const NOTIFY: u8 = 6;
    pub const DEREGISTER: u8 = 7;
    pub const DEREGISTER_ACK: u8 = 8;
    pub const PUBLISH_DEREGISTER: u8 = 9;
    pub const PUBLISH_DEREGISTER_ACK: u8 = 10;
}

/// Delivery quality-of-service level carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QosLevel {
    #[default]
    BestEffort = 1,
    Assured = 2,
    Queued = 3,
    Timely = 4,
}

impl QosLevel {
    pub fn from_ordinal(v: u8) -> Result<Self, ElementError> {
        match v {
            1 => Ok(QosLevel::BestEffort),
            2 => Ok(QosLevel::Assured),
            3 => Ok(QosLevel::Queued),
            4 => Ok(QosLevel::Timely),
            other => Err(ElementError::malformed(format!(
                "invalid QosLevel ordinal {other}"
            ))),
        }
    }
}

/// Session type carried in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionType {
    #[default]
    Live = 1,
    Simulation = 2,
    Replay = 3,
}

impl SessionType {
    pub fn from_ordinal(v: u8) -> Result<Self, ElementError> {
        match v {
            1 => Ok(SessionType::Live),
            2 => Ok(SessionType::Simulation),
            3 => Ok(SessionType::Replay),
            other => Err(ElementError::malformed(format!(
                "invalid SessionType ordinal {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_counts_per_pattern() {
        assert_eq!(InteractionType::Send.stages().len(), 1);
        assert_eq!(InteractionType::Submit.stages().len(), 2);
        assert_eq!(InteractionType::Request.stages().len(), 2);
        assert_eq!(InteractionType::Invoke.stages().len(), 3);
        assert_eq!(InteractionType::Progress.stages().len(), 4);
        assert_eq!(InteractionType::PubSub.stages().len(), 10);

        let total: usize = InteractionType::ALL.iter().map(|it| it.stages().len()).sum();
        assert_eq!(total, 22);
    }

    #[test]
    fn test_stage_validity() {
        assert!(InteractionType::Send.is_valid_stage(stage::SEND));
        assert!(!InteractionType::Send.is_valid_stage(1));
        assert!(InteractionType::Progress.is_valid_stage(stage::PROGRESS_UPDATE));
        assert!(!InteractionType::Request.is_valid_stage(3));
        assert!(InteractionType::PubSub.is_valid_stage(stage::PUBLISH_DEREGISTER_ACK));
        assert!(!InteractionType::PubSub.is_valid_stage(11));
    }

    #[test]
    fn test_initiating_stages() {
        assert!(!InteractionType::Send.is_initiating_stage(stage::SEND));
        assert!(InteractionType::Submit.is_initiating_stage(stage::SUBMIT));
        assert!(!InteractionType::Submit.is_initiating_stage(stage::SUBMIT_ACK));
        assert!(InteractionType::PubSub.is_initiating_stage(stage::REGISTER));
        assert!(InteractionType::PubSub.is_initiating_stage(stage::PUBLISH_DEREGISTER));
        // PUBLISH and NOTIFY never get a reflected error reply
        assert!(!InteractionType::PubSub.is_initiating_stage(stage::PUBLISH));
        assert!(!InteractionType::PubSub.is_initiating_stage(stage::NOTIFY));
    }

    #[test]
    fn test_error_stage_is_ack_stage() {
        assert_eq!(
            InteractionType::Submit.error_stage_for(stage::SUBMIT),
            Some(stage::SUBMIT_ACK)
        );
        assert_eq!(
            InteractionType::PubSub.error_stage_for(stage::REGISTER),
            Some(stage::REGISTER_ACK)
        );
        assert_eq!(InteractionType::Send.error_stage_for(stage::SEND), None);
        assert_eq!(
            InteractionType::Request.error_stage_for(stage::REQUEST_RESPONSE),
            None
        );
    }

    #[test]
    fn test_enum_ordinal_roundtrip() {
        for it in InteractionType::ALL {
            assert_eq!(InteractionType::from_ordinal(it as u8).unwrap(), it);
        }
        assert!(InteractionType::from_ordinal(6).is_err());
        assert!(QosLevel::from_ordinal(0).is_err());
        assert!(SessionType::from_ordinal(4).is_err());
    }
}
