use crate::types::MessageTag;

// Tags of the messages every Protocol registers. User tags must not collide
// with these.

pub const RPC_MESSAGE_TAG: MessageTag = 0;
pub const VARIABLE_DELTA_TAG: MessageTag = 1;
pub const VARIABLE_SNAPSHOT_TAG: MessageTag = 2;
pub const NAMED_MESSAGE_TAG: MessageTag = 3;

/// First tag available to application messages.
pub const FIRST_USER_TAG: MessageTag = 16;
