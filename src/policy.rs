//! Access policy: who may invoke which operation, and which borrowings
//! a caller can see.
//!
//! Rules live in a single table ([`POLICY`]) mapping every [`Operation`] to
//! the [`Requirement`] an [`Actor`] must satisfy.

use crate::{
    error::{AppError, AppResult},
    models::user::UserClaims,
};

/// An authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<&UserClaims> for Principal {
    fn from(claims: &UserClaims) -> Self {
        Self {
            user_id: claims.user_id,
            is_staff: claims.is_staff,
            is_superuser: claims.is_superuser,
        }
    }
}

/// Caller identity passed explicitly to every service operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(Principal),
}

impl Actor {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Actor::Anonymous => None,
            Actor::User(principal) => Some(principal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListBooks,
    RetrieveBook,
    CreateBook,
    UpdateBook,
    DeleteBook,
    ListBorrowings,
    RetrieveBorrowing,
    CreateBorrowing,
    ReturnBorrowing,
    ManageProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    Authenticated,
    /// Staff member or superuser
    Staff,
}

pub const POLICY: &[(Operation, Requirement)] = &[
    (Operation::ListBooks, Requirement::Anyone),
    (Operation::RetrieveBook, Requirement::Anyone),
    (Operation::CreateBook, Requirement::Staff),
    (Operation::UpdateBook, Requirement::Staff),
    (Operation::DeleteBook, Requirement::Staff),
    (Operation::ListBorrowings, Requirement::Authenticated),
    (Operation::RetrieveBorrowing, Requirement::Authenticated),
    (Operation::CreateBorrowing, Requirement::Authenticated),
    (Operation::ReturnBorrowing, Requirement::Authenticated),
    (Operation::ManageProfile, Requirement::Authenticated),
];

/// Requirement for an operation; operations missing from the table need staff
pub fn requirement(operation: Operation) -> Requirement {
    POLICY
        .iter()
        .find(|(op, _)| *op == operation)
        .map(|(_, req)| *req)
        .unwrap_or(Requirement::Staff)
}

/// Result of a policy check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Caller must authenticate first
    Unauthenticated,
    /// Caller is known but lacks the role
    Forbidden,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn check(actor: &Actor, operation: Operation) -> Decision {
    match (requirement(operation), actor) {
        (Requirement::Anyone, _) => Decision::Allow,
        (_, Actor::Anonymous) => Decision::Unauthenticated,
        (Requirement::Authenticated, Actor::User(_)) => Decision::Allow,
        (Requirement::Staff, Actor::User(p)) if p.is_staff || p.is_superuser => Decision::Allow,
        (Requirement::Staff, Actor::User(_)) => Decision::Forbidden,
    }
}

/// Check the policy and turn a denial into the matching error
pub fn authorize(actor: &Actor, operation: Operation) -> AppResult<()> {
    match check(actor, operation) {
        Decision::Allow => Ok(()),
        Decision::Unauthenticated => Err(AppError::Authentication(
            "Authentication credentials were not provided".to_string(),
        )),
        Decision::Forbidden => Err(AppError::Authorization(format!(
            "You do not have permission to perform {:?}",
            operation
        ))),
    }
}

/// Like [`authorize`], for operations that need to know who the caller is
pub fn authorize_principal(actor: &Actor, operation: Operation) -> AppResult<Principal> {
    authorize(actor, operation)?;
    actor.principal().copied().ok_or_else(|| {
        AppError::Authentication("Authentication credentials were not provided".to_string())
    })
}

/// Borrowing rows visible to a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingScope {
    All,
    Owner(i32),
}

impl BorrowingScope {
    pub fn allows(&self, owner_id: i32) -> bool {
        match self {
            BorrowingScope::All => true,
            BorrowingScope::Owner(user_id) => *user_id == owner_id,
        }
    }
}

pub fn borrowing_scope(principal: &Principal) -> BorrowingScope {
    if principal.is_staff {
        BorrowingScope::All
    } else {
        BorrowingScope::Owner(principal.user_id)
    }
}
