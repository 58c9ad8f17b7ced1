//! Command: print version information.

/// Version string baked in at build time, or the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("LINUX_SETUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the linux-setup version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("linux-setup {}", version());
}
