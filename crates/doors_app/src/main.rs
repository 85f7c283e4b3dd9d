mod platform;

fn main() -> std::process::ExitCode {
    platform::run()
}
