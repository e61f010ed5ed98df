use common::UserId;

/// Filter for listing orders.
///
/// Orders are always returned newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    /// Restrict to orders placed by this user.
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    /// Creates a filter matching every order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter for a single user's orders.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Returns true if the order belongs to the filtered set.
    pub fn matches(&self, owner: UserId) -> bool {
        self.user_id.is_none_or(|user_id| user_id == owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_matches_any_owner() {
        assert!(OrderFilter::all().matches(UserId::new(1)));
        assert!(OrderFilter::all().matches(UserId::new(2)));
    }

    #[test]
    fn for_user_matches_only_that_owner() {
        let filter = OrderFilter::for_user(UserId::new(1));
        assert!(filter.matches(UserId::new(1)));
        assert!(!filter.matches(UserId::new(2)));
    }
}
