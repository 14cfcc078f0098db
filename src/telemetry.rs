//! Tracing span constructors.

/// Standardized span constructors for client observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one connection attempt, from connect to disconnect.
    pub fn connection(server: &str, host: &str) -> Span {
        info_span!("connection", server = %server, host = %host)
    }

    /// Span for one outbound command issued through a handle.
    pub fn command(name: &str, target: Option<&str>) -> Span {
        if let Some(target) = target {
            info_span!("command", name = %name, target = %target)
        } else {
            info_span!("command", name = %name)
        }
    }
}
