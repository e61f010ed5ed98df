//! Resolved caller identity.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{CommerceError, Result};

/// An authenticated caller, as resolved by the access-control layer.
///
/// The core never parses credentials; it trusts whatever produced this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Caller {
    /// A regular customer.
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// An administrator.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Fails with [`CommerceError::Forbidden`] unless the caller is an admin.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(CommerceError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_pass_the_admin_check() {
        assert!(Caller::admin(UserId::new(1)).require_admin().is_ok());
        assert!(matches!(
            Caller::customer(UserId::new(2)).require_admin(),
            Err(CommerceError::Forbidden)
        ));
    }
}
