//! Build identification, stamped at compile time.
//!
//! `GIT_SHA` and `BUILD_TIME` are read from the build environment; unset
//! values fall back to `dev` and `unknown`.

use std::sync::LazyLock;

pub const APP_NAME: &str = "MAT Bot webhook tool";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn git_sha() -> &'static str {
    match option_env!("GIT_SHA").map(str::trim) {
        Some(sha) if !sha.is_empty() => sha.get(..7).unwrap_or(sha),
        _ => "dev",
    }
}

pub fn build_time() -> &'static str {
    option_env!("BUILD_TIME").unwrap_or("unknown")
}

/// One-line description, e.g. `MAT Bot webhook tool v0.1.0 (commit dev, build unknown)`.
pub fn as_text() -> &'static str {
    static TEXT: LazyLock<String> = LazyLock::new(|| {
        format!(
            "{APP_NAME} v{VERSION} (commit {}, build {})",
            git_sha(),
            build_time()
        )
    });
    TEXT.as_str()
}
