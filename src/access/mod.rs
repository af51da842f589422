//! Submission access control.
//!
//! Three cooperating pieces decide what a caller may do to a form and a
//! submission:
//!
//! - [`capability`]: stateless signed tokens that carry a small permission
//!   set for one submission, verifiable without a database lookup.
//! - [`continuation`]: opaque database-resident tokens that let an
//!   anonymous respondent resume their own submission, under tenant policy.
//! - [`resolver`]: the permission-resolution engine merging platform-admin
//!   override, form visibility, role grants, and continuation tokens into
//!   one minimal [`resolver::AccessDecision`].
//!
//! Endpoints that hand out or consume capability tokens call
//! [`capability::CapabilityTokenService`] directly; everything answering
//! "what can I do here" goes through [`resolver::AccessResolver`].

pub mod capability;
pub mod codec;
pub mod continuation;
pub mod perms;
pub mod resolver;

pub use capability::{CapabilityTokenService, SigningKey, TokenError};
pub use continuation::{ContinuationError, ContinuationTokenStore};
pub use perms::{Action, Actions, FormPermissions, SubmissionPermissions};
pub use resolver::{
    AccessDecision, AccessError, AccessRequest, AccessResolver, AuthorizationContext,
};
