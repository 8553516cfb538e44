#![forbid(unsafe_code)]

fn main() {
    std::process::exit(caselaw_cli::run());
}
