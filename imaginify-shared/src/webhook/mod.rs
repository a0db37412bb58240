/// Identity provider webhook handling
///
/// - `signature`: Svix signature verification over the raw body
/// - `event`: typed event payloads
/// - `dispatch`: applies events to the account store
///
/// A request is verified first, then parsed, then dispatched. Nothing is
/// parsed or persisted for a request whose signature does not check out.

pub mod dispatch;
pub mod event;
pub mod signature;

pub use dispatch::{
    AccountStore, DispatchError, DispatchOutcome, PgAccountStore, WebhookDispatcher,
};
pub use event::WebhookEvent;
pub use signature::{SvixHeaders, VerifyError, WebhookVerifier};
