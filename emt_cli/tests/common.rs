use assert_cmd::Command;

pub fn emt_cmd() -> Command {
	let mut cmd = Command::cargo_bin("emt").expect("emt binary builds");
	cmd.env("NO_COLOR", "1");
	cmd
}
