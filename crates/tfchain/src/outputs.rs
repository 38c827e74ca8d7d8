//! reading outputs of applied stacks
//!
//! A live `terraform output` only works once a stack has been initialized in the current
//! checkout. The state file is always readable, so it serves as fallback.
use crate::terraform::Terraform;
use crate::value::Value;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "terraform.tfstate";
const WORKSPACE_DIR: &str = "terraform.tfstate.d";

#[derive(derive_new::new)]
pub struct OutputReader<'t> {
    terraform: Terraform<'t>,
}

impl<'t> OutputReader<'t> {
    /// Output `name` of the stack in `dir`
    ///
    /// Null outputs count as absent. Lists and objects are returned as compact JSON.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn read(&self, dir: &Path, name: &str) -> Option<String> {
        if let Some(value) = self.terraform.output_raw(dir, name) {
            if value != "null" {
                return Some(value);
            }
        }

        let state = self.state_path(dir)?;
        tracing::debug!(state=%state.display(), "falling back to state file");
        output_from_state(&state, name)
    }

    /// State file of the active workspace, or the default one
    pub fn state_path(&self, dir: &Path) -> Option<PathBuf> {
        if let Some(workspace) = self.terraform.workspace(dir) {
            if workspace != "default" {
                let path = dir.join(WORKSPACE_DIR).join(&workspace).join(STATE_FILE);
                if path.is_file() {
                    return Some(path);
                }
            }
        }

        let path = dir.join(STATE_FILE);
        path.is_file().then_some(path)
    }
}

/// Extract `outputs.<name>.value` from a state file
pub fn output_from_state(state: &Path, name: &str) -> Option<String> {
    let contents = std::fs::read_to_string(state).ok()?;
    let mut state: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(path=%state.display(), %err, "state file is not valid json");
            return None;
        }
    };

    let value: Value = state
        .get_mut("outputs")?
        .get_mut(name)?
        .get_mut("value")?
        .take()
        .into();

    match value {
        Value::String(s) if s == "null" => None,
        value => value.to_plain_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::process::{Cmd, CommandRunner};
    use crate::Error;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Answers `capture` calls by their last argument
    #[derive(Default)]
    struct Answers(HashMap<String, String>);

    impl CommandRunner for Answers {
        fn run(&self, _cmd: &Cmd) -> Result<(), Error> {
            Ok(())
        }

        fn capture(&self, cmd: &Cmd) -> Result<String, Error> {
            let last = cmd.args.last().cloned().unwrap_or_default();
            self.0.get(&last).cloned().ok_or(Error::CommandFailed {
                command: cmd.to_string(),
                code: 1,
            })
        }
    }

    fn write_state(path: &Path, json: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }

    #[test]
    fn live_output_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_state(
            &dir.path().join(STATE_FILE),
            r#"{"outputs": {"x": {"value": "from-state"}}}"#,
        );
        let runner = Answers(HashMap::from([("x".into(), "live".into())]));
        let terraform = Terraform::new(&runner, "terraform");

        assert_eq!(
            OutputReader::new(terraform).read(dir.path(), "x").as_deref(),
            Some("live")
        );
    }

    #[test]
    fn empty_live_output_falls_back_to_state() {
        let dir = tempfile::tempdir().unwrap();
        write_state(
            &dir.path().join(STATE_FILE),
            r#"{"outputs": {"x": {"value": "v"}}}"#,
        );
        let runner = Answers(HashMap::from([("x".into(), "".into())]));
        let terraform = Terraform::new(&runner, "terraform");

        assert_eq!(
            OutputReader::new(terraform).read(dir.path(), "x").as_deref(),
            Some("v")
        );
    }

    #[test]
    fn workspace_state_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        write_state(
            &dir.path().join(STATE_FILE),
            r#"{"outputs": {"x": {"value": "default"}}}"#,
        );
        write_state(
            &dir.path().join(WORKSPACE_DIR).join("dev").join(STATE_FILE),
            r#"{"outputs": {"x": {"value": "dev"}}}"#,
        );
        let runner = Answers(HashMap::from([("show".into(), "dev".into())]));
        let terraform = Terraform::new(&runner, "terraform");

        assert_eq!(
            OutputReader::new(terraform).read(dir.path(), "x").as_deref(),
            Some("dev")
        );
    }

    #[test]
    fn missing_workspace_state_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        write_state(
            &dir.path().join(STATE_FILE),
            r#"{"outputs": {"x": {"value": "default"}}}"#,
        );
        let runner = Answers(HashMap::from([("show".into(), "staging".into())]));
        let terraform = Terraform::new(&runner, "terraform");

        assert_eq!(
            OutputReader::new(terraform).read(dir.path(), "x").as_deref(),
            Some("default")
        );
    }

    #[test]
    fn state_value_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        write_state(
            &path,
            r#"{"outputs": {
                "list": {"value": ["a", "b"]},
                "object": {"value": {"k": 1}},
                "number": {"value": 42},
                "null": {"value": null},
                "null_string": {"value": "null"}
            }}"#,
        );

        assert_eq!(output_from_state(&path, "list").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(output_from_state(&path, "object").as_deref(), Some(r#"{"k":1}"#));
        assert_eq!(output_from_state(&path, "number").as_deref(), Some("42"));
        assert_eq!(output_from_state(&path, "null"), None);
        assert_eq!(output_from_state(&path, "null_string"), None);
        assert_eq!(output_from_state(&path, "absent"), None);
    }

    #[test]
    fn invalid_state_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STATE_FILE);
        write_state(&path, "{ not json");
        assert_eq!(output_from_state(&path, "x"), None);
    }
}
