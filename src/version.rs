//! Version strings reported by `-version` and the `X-App-Version` header

/// Program name used in the human-readable version string
pub const NAME: &str = "http-echo";

/// Package version, sent as `X-App-Version` on every response
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit baked in at build time, if the build environment provides one
const GIT_COMMIT: Option<&str> = option_env!("HTTP_ECHO_GIT_COMMIT");

/// Human-readable version, e.g. `http-echo v0.1.0 (abc1234)`
pub fn human_version() -> String {
    match GIT_COMMIT.filter(|c| !c.is_empty()) {
        Some(commit) => format!("{} v{} ({})", NAME, VERSION, commit),
        None => format!("{} v{}", NAME, VERSION),
    }
}
