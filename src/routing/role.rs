//! Connection role of the current task.
//!
//! While the router serves a statement from the replica it runs the call
//! inside [`connected_to`]`(Role::Reading, ..)`. Code running under that scope
//! (including code that knows nothing about routing) can ask
//! [`current_role`] which side of the pair it should use.

use std::future::Future;

tokio::task_local! {
    static CURRENT_ROLE: Role;
}

/// The role a task is connected as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Default: the primary connection.
    #[default]
    Writing,
    /// The replica connection.
    Reading,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Writing => "writing",
            Self::Reading => "reading",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the current task. Outside any [`connected_to`] scope this is
/// [`Role::Writing`].
pub fn current_role() -> Role {
    CURRENT_ROLE.try_with(|role| *role).unwrap_or_default()
}

/// Run `future` with `role` as the current role. Scopes nest; the outer role
/// is visible again once `future` completes.
pub async fn connected_to<F: Future>(role: Role, future: F) -> F::Output {
    CURRENT_ROLE.scope(role, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_role_is_writing() {
        assert_eq!(current_role(), Role::Writing);
    }

    #[tokio::test]
    async fn test_connected_to_sets_role_for_the_future() {
        let inside = connected_to(Role::Reading, async { current_role() }).await;
        assert_eq!(inside, Role::Reading);
        assert_eq!(current_role(), Role::Writing);
    }

    #[tokio::test]
    async fn test_connected_to_nests() {
        let roles = connected_to(Role::Reading, async {
            let inner = connected_to(Role::Writing, async { current_role() }).await;
            (inner, current_role())
        })
        .await;
        assert_eq!(roles, (Role::Writing, Role::Reading));
    }
}
