//! Ambient state of a service invocation.

use crate::{PrimitiveError, SessionId, UserName};
use serde::{Deserialize, Serialize};

/// Session and user a service call executes under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvokeState {
    /// Session identifier.
    pub session: SessionId,
    /// Authenticated user name.
    pub user: UserName,
}

impl InvokeState {
    /// Build an invoke state from raw strings.
    pub fn parse(session: impl AsRef<str>, user: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        Ok(Self {
            session: SessionId::parse(session)?,
            user: UserName::parse(user)?,
        })
    }
}
