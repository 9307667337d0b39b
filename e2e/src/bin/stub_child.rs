//! Stand-in for the front-proxy child process in the readiness smoke test:
//! ignores every flag it's spawned with and just stays alive.

fn main() {
    std::thread::sleep(std::time::Duration::from_secs(30));
}
