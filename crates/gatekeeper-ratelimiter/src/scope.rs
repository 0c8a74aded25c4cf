//! Scoping: which bucket a request's permit is checked against.

use std::sync::Arc;

/// Borrowed request context a [`Scope`] resolves into a bucket key.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitContext<'a> {
    /// The caller's user id, if the request carries one.
    pub user_id: Option<&'a str>,
    /// The command type being rate limited, if known.
    pub command_type: Option<&'a str>,
}

/// How requests are bucketed into independent rate-limit counters.
#[derive(Clone)]
pub enum Scope {
    /// A single shared bucket for every request.
    Global,
    /// One bucket per `user_id`. Requests without a user id share an
    /// `"anonymous"` bucket.
    PerUser,
    /// One bucket per `command_type`. Requests without a command type share
    /// an `"unknown"` bucket.
    PerCommand,
    /// A caller-supplied function resolves the bucket key.
    Custom(Arc<dyn Fn(&RateLimitContext) -> String + Send + Sync>),
}

impl Scope {
    pub(crate) fn resolve(&self, ctx: &RateLimitContext) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::PerUser => ctx.user_id.unwrap_or("anonymous").to_string(),
            Scope::PerCommand => ctx.command_type.unwrap_or("unknown").to_string(),
            Scope::Custom(f) => f(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_ignores_context() {
        let ctx = RateLimitContext {
            user_id: Some("alice"),
            command_type: Some("orders.create"),
        };
        assert_eq!(Scope::Global.resolve(&ctx), "global");
    }

    #[test]
    fn per_user_falls_back_to_anonymous() {
        let ctx = RateLimitContext::default();
        assert_eq!(Scope::PerUser.resolve(&ctx), "anonymous");
    }

    #[test]
    fn per_user_uses_user_id() {
        let ctx = RateLimitContext {
            user_id: Some("alice"),
            command_type: None,
        };
        assert_eq!(Scope::PerUser.resolve(&ctx), "alice");
    }

    #[test]
    fn per_command_falls_back_to_unknown() {
        let ctx = RateLimitContext::default();
        assert_eq!(Scope::PerCommand.resolve(&ctx), "unknown");
    }

    #[test]
    fn custom_resolves_via_closure() {
        let scope = Scope::Custom(Arc::new(|ctx: &RateLimitContext| {
            format!(
                "{}:{}",
                ctx.user_id.unwrap_or("-"),
                ctx.command_type.unwrap_or("-")
            )
        }));
        let ctx = RateLimitContext {
            user_id: Some("alice"),
            command_type: Some("orders.create"),
        };
        assert_eq!(scope.resolve(&ctx), "alice:orders.create");
    }
}
