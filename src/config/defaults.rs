//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_nick() -> String {
    "slirc".to_string()
}

pub fn default_username() -> String {
    "slirc".to_string()
}

pub fn default_realname() -> String {
    "Straylight IRC client".to_string()
}

pub fn default_quit_message() -> String {
    "Leaving".to_string()
}

pub fn default_identify_pattern() -> String {
    "PRIVMSG NickServ :IDENTIFY {password}".to_string()
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

pub fn default_connect_timeout() -> u64 {
    30
}

// =============================================================================
// Encoding / Keep-alive Defaults
// =============================================================================

pub fn default_encoding() -> String {
    "utf-8".to_string()
}

/// Keep-alive ticks (10 s each) of silence before a probe PING.
pub fn default_probe_ticks() -> u32 {
    10
}

/// Probe ticks used by servers marked `frequent_keepalive`.
pub fn default_frequent_probe_ticks() -> u32 {
    3
}
