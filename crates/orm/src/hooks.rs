//! Lifecycle hooks for dynamic models
//!
//! Every hook has a permissive default, so an implementation overrides only
//! what it cares about. `before_*` hooks veto the operation by returning
//! `false`; a vetoed operation is not an error.

use async_trait::async_trait;

use crate::attributes::AttributeBag;
use crate::validation::ValidationErrors;

#[async_trait]
pub trait ModelHooks: Send + Sync {
    /// Append validation failures for `record` to `errors`
    fn validate(&self, _record: &AttributeBag, _errors: &mut ValidationErrors) {}

    /// Runs before an insert or update; may adjust the record
    async fn before_save(&self, _record: &mut AttributeBag) -> bool {
        true
    }

    /// Runs after an insert; the record carries the generated key
    async fn inserted(&self, _record: &AttributeBag) {}

    async fn updated(&self, _record: &AttributeBag) {}

    /// Runs before a delete with the row about to be removed, when one was found
    async fn before_delete(&self, _record: Option<&AttributeBag>) -> bool {
        true
    }

    async fn deleted(&self, _record: Option<&AttributeBag>) {}
}

/// Hooks that accept everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ModelHooks for NoHooks {}
