//! Tests for the context module.

#[cfg(test)]
mod tests {
    use crate::config::ReleaseConfig;
    use crate::context::{ContextValues, Env, ReleaseContext, RunIdentity, Version};
    use crate::errors::ConfigError;
    use crate::events::CollectingEventSink;
    use std::sync::Arc;

    #[test]
    fn test_run_identity_is_unique() {
        assert_ne!(RunIdentity::new().run_id, RunIdentity::new().run_id);
    }

    #[test]
    fn test_context_values_conflict() {
        let values = ContextValues::new();
        values.set("ReleaseURL", "https://example.com/v1").unwrap();

        let err = values.set("ReleaseURL", "other").unwrap_err();
        assert_eq!(err.key, "ReleaseURL");
        assert_eq!(values.get("ReleaseURL").as_deref(), Some("https://example.com/v1"));
    }

    #[test]
    fn test_invalid_env_override_rejected() {
        let config = ReleaseConfig::new("app").with_env("BROKEN");
        let err = ReleaseContext::new(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv(_)));
    }

    #[test]
    fn test_overrides_apply_over_base_env() {
        let config = ReleaseConfig::new("app").with_env("TOKEN=from-config");
        let ctx = ReleaseContext::new(config)
            .unwrap()
            .with_env(Env::new().with_var("TOKEN", "from-base").with_var("OTHER", "1"));

        assert_eq!(ctx.env().get("TOKEN"), Some("from-config"));
        assert_eq!(ctx.env().get("OTHER"), Some("1"));
    }

    #[test]
    fn test_short_commit() {
        let ctx = ReleaseContext::new(ReleaseConfig::new("app"))
            .unwrap()
            .with_commit("0123456789abcdef");
        assert_eq!(ctx.short_commit(), "0123456");

        let ctx = ReleaseContext::new(ReleaseConfig::new("app"))
            .unwrap()
            .with_commit("abc");
        assert_eq!(ctx.short_commit(), "abc");
    }

    #[test]
    fn test_cancel_first_reason_wins() {
        let ctx = ReleaseContext::new(ReleaseConfig::new("app")).unwrap();
        assert!(!ctx.is_cancelled());

        ctx.cancel("interrupted");
        ctx.cancel("later");
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.cancellation().reason().as_deref(), Some("interrupted"));
    }

    #[test]
    fn test_emit_enriches_with_run_id() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = ReleaseContext::new(ReleaseConfig::new("app"))
            .unwrap()
            .with_event_sink(sink.clone());

        ctx.emit("custom.event", Some(serde_json::json!({"k": "v"})));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let data = events[0].1.as_ref().unwrap();
        assert_eq!(data["run_id"], ctx.identity().run_id.to_string());
        assert_eq!(data["project"], "app");
        assert_eq!(data["k"], "v");
    }

    #[test]
    fn test_with_version() {
        let ctx = ReleaseContext::new(ReleaseConfig::new("app"))
            .unwrap()
            .with_version(Version::parse("v2.0.1").unwrap())
            .with_tag("v2.0.1");
        assert_eq!(ctx.version().to_string(), "2.0.1");
        assert_eq!(ctx.tag(), "v2.0.1");
    }
}
