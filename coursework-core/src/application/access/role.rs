use crate::domain::access::GateDecision;
use crate::domain::auth::{AuthenticatedIdentity, UserRole};

/// `Allowed` only when the caller holds exactly `required`
pub fn require_role(identity: &AuthenticatedIdentity, required: UserRole) -> GateDecision {
    if identity.role == required {
        GateDecision::Allowed
    } else {
        GateDecision::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::UserId;

    #[test]
    fn test_require_role() {
        let admin = AuthenticatedIdentity::new(UserId(1), UserRole::Admin);
        let instructor = AuthenticatedIdentity::new(UserId(2), UserRole::Instructor);

        assert_eq!(require_role(&admin, UserRole::Admin), GateDecision::Allowed);
        assert_eq!(
            require_role(&instructor, UserRole::Admin),
            GateDecision::Denied
        );
        // Roles are not hierarchical
        assert_eq!(
            require_role(&admin, UserRole::Instructor),
            GateDecision::Denied
        );
    }
}
