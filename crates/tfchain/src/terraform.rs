//! terraform command wrappers
use crate::process::{Cmd, CommandRunner};
use crate::Error;
use std::path::Path;

#[derive(derive_new::new, Clone, Copy)]
pub struct Terraform<'r> {
    runner: &'r dyn CommandRunner,
    bin: &'r str,
}

impl<'r> Terraform<'r> {
    fn cmd(&self, dir: &Path) -> Cmd {
        Cmd::new(self.bin).arg(format!("-chdir={}", dir.display()))
    }

    pub fn init(&self, dir: &Path) -> Result<(), Error> {
        self.runner.run(&self.cmd(dir).arg("init"))
    }

    /// `apply -auto-approve`, limited to `target` when given
    pub fn apply(&self, dir: &Path, target: Option<&str>) -> Result<(), Error> {
        let mut cmd = self.cmd(dir).arg("apply");
        if let Some(target) = target {
            cmd = cmd.arg(format!("-target={target}"));
        }
        self.runner.run(&cmd.arg("-auto-approve"))
    }

    pub fn destroy(&self, dir: &Path) -> Result<(), Error> {
        self.runner.run(&self.cmd(dir).args(["destroy", "-auto-approve"]))
    }

    /// `output -raw <name>`; failure or empty output is `None`
    pub fn output_raw(&self, dir: &Path, name: &str) -> Option<String> {
        self.runner
            .capture_optional(&self.cmd(dir).args(["output", "-no-color", "-raw", name]))
    }

    /// Currently selected workspace
    pub fn workspace(&self, dir: &Path) -> Option<String> {
        self.runner
            .capture_optional(&self.cmd(dir).args(["workspace", "show"]))
    }
}
