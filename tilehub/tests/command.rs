
use assert_cmd::{Command, cargo};
use predicates::str;
use rstest::rstest;
use test_utilities::BINARY_NAME;

#[test]
fn command() {
	Command::new(cargo::cargo_bin!())
		.assert()
		.failure()
		.code(2)
		.stdout(str::is_empty())
		.stderr(str::contains(format!("Usage: {BINARY_NAME} [OPTIONS] <COMMAND>")));
}

#[rstest]
#[case("flush", "[OPTIONS] <LAYER>")]
fn subcommand(#[case] sub_command: &str, #[case] usage: &str) {
	Command::new(cargo::cargo_bin!())
		.args(sub_command.split(' '))
		.assert()
		.failure()
		.code(2)
		.stdout(str::is_empty())
		.stderr(str::contains(format!("Usage: {BINARY_NAME} {sub_command} {usage}")));
}

#[test]
fn serve_help() {
	Command::new(cargo::cargo_bin!())
		.args(["serve", "--help"])
		.assert()
		.success()
		.stdout(str::contains("--public-url"))
		.stdout(str::contains("--disable-admin"));
}

#[test]
fn serve_and_shut_down() {
	let dir = tempfile::TempDir::new().unwrap();
	let config = dir.path().join("tilehub.yaml");
	std::fs::write(&config, "server:\n  ip: 127.0.0.1\n  port: 0\n").unwrap();
	Command::new(cargo::cargo_bin!())
		.args(["serve", "-c", config.to_str().unwrap(), "--auto-shutdown", "200"])
		.assert()
		.success();
}
