//! lfsforge CLI binary.
//!
//! All logic lives in the `lfsforge-cli` crate; this entrypoint only
//! maps its [`lfsforge::ExitCode`] onto a process exit status.

fn main() {
    let code = lfsforge::run();
    std::process::exit(code.as_i32());
}
