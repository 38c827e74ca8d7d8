//! database initialization script
use crate::process::{Cmd, CommandRunner};
use crate::Error;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const WINDOWS_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Microsoft SQL Server\Client SDK\ODBC\180\Tools\Binn\sqlcmd.exe",
    r"C:\Program Files\Microsoft SQL Server\Client SDK\ODBC\170\Tools\Binn\sqlcmd.exe",
    r"C:\Program Files (x86)\Microsoft SQL Server\Client SDK\ODBC\180\Tools\Binn\sqlcmd.exe",
    r"C:\Program Files (x86)\Microsoft SQL Server\Client SDK\ODBC\170\Tools\Binn\sqlcmd.exe",
];

const INSTALL_HINT: &str = "Install Microsoft sqlcmd or re-run with --skip-sql-init.";

/// Connection details for running a script
#[derive(Debug, Clone, derive_new::new)]
pub struct SqlTarget {
    pub server_fqdn: String,
    pub database: String,
    pub login: String,
    pub password: String,
}

/// Locate `sqlcmd` on `PATH`, then in the usual Windows install locations
pub fn find() -> Result<PathBuf, Error> {
    find_in(std::env::var_os("PATH").as_deref(), WINDOWS_LOCATIONS)
}

fn find_in(path: Option<&OsStr>, fallbacks: &[&str]) -> Result<PathBuf, Error> {
    let exe = if cfg!(windows) { "sqlcmd.exe" } else { "sqlcmd" };
    let on_path = path.and_then(|path| {
        std::env::split_paths(path)
            .map(|dir| dir.join(exe))
            .find(|candidate| candidate.is_file())
    });

    on_path
        .or_else(|| {
            fallbacks
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.is_file())
        })
        .ok_or(Error::MissingTool {
            tool: "sqlcmd",
            hint: INSTALL_HINT,
        })
}

/// A located `sqlcmd` together with the script it runs
#[derive(Debug, Clone)]
pub struct SqlInit {
    sqlcmd: PathBuf,
    script: PathBuf,
}

impl SqlInit {
    /// Check the script exists, then locate `sqlcmd` unless a path is given
    pub fn locate(script: &Path, sqlcmd: Option<&Path>) -> Result<Self, Error> {
        if !script.is_file() {
            return Err(Error::MissingSqlScript(script.to_owned()));
        }
        let sqlcmd = match sqlcmd {
            Some(path) => path.to_owned(),
            None => find()?,
        };
        Ok(Self {
            sqlcmd,
            script: script.to_owned(),
        })
    }

    /// Run the script against `target`, failing on the first failing statement
    #[tracing::instrument(level = "debug", skip_all, fields(server = %target.server_fqdn))]
    pub fn run(&self, runner: &dyn CommandRunner, target: &SqlTarget) -> Result<(), Error> {
        let cmd = Cmd::new(self.sqlcmd.display().to_string())
            .args(["-b", "-S", target.server_fqdn.as_str()])
            .args(["-d", target.database.as_str()])
            .args(["-U", target.login.as_str(), "-P"])
            .secret_arg(&target.password)
            .arg("-i")
            .arg(self.script.display().to_string());

        tracing::info!(script=%self.script.display(), database=%target.database, "running sql script");
        runner.run(&cmd)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Cmd>>);

    impl CommandRunner for Recorder {
        fn run(&self, cmd: &Cmd) -> Result<(), Error> {
            self.0.borrow_mut().push(cmd.clone());
            Ok(())
        }

        fn capture(&self, cmd: &Cmd) -> Result<String, Error> {
            self.run(cmd).map(|_| String::new())
        }
    }

    fn target() -> SqlTarget {
        SqlTarget::new(
            "sql-airline.database.windows.net".into(),
            "airline-dev".into(),
            "sqladmin".into(),
            "s3cret!".into(),
        )
    }

    #[test]
    fn password_is_passed_but_not_displayed() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("init.sql");
        std::fs::write(&script, "SELECT 1;").unwrap();
        let recorder = Recorder::default();

        SqlInit::locate(&script, Some(Path::new("sqlcmd")))
            .unwrap()
            .run(&recorder, &target())
            .unwrap();

        let cmd = recorder.0.borrow()[0].clone();
        assert!(cmd.args.contains(&"s3cret!".to_string()));
        assert_eq!(
            cmd.to_string(),
            format!(
                "sqlcmd -b -S sql-airline.database.windows.net -d airline-dev -U sqladmin -P *** -i {}",
                script.display()
            )
        );
    }

    #[test]
    fn sqlcmd_is_searched_on_path_then_fallbacks() {
        let empty = tempfile::tempdir().unwrap();
        let tools = tempfile::tempdir().unwrap();
        let exe = if cfg!(windows) { "sqlcmd.exe" } else { "sqlcmd" };
        let on_path = tools.path().join(exe);
        std::fs::write(&on_path, "").unwrap();
        let fallback = empty.path().join("fallback-sqlcmd");
        std::fs::write(&fallback, "").unwrap();

        let path = std::env::join_paths([empty.path(), tools.path()]).unwrap();
        assert_eq!(find_in(Some(path.as_os_str()), &[]).unwrap(), on_path);

        let fallbacks = [fallback.to_str().unwrap()];
        let path = empty.path().as_os_str();
        assert_eq!(find_in(Some(path), &fallbacks).unwrap(), fallback);
    }

    #[test]
    fn missing_sqlcmd_names_the_remedy() {
        let empty = tempfile::tempdir().unwrap();

        let err = find_in(Some(empty.path().as_os_str()), &[]).unwrap_err();

        assert!(matches!(err, Error::MissingTool { tool: "sqlcmd", .. }));
        assert_eq!(
            err.to_string(),
            "`sqlcmd` not found. Install Microsoft sqlcmd or re-run with --skip-sql-init."
        );
        assert!(matches!(find_in(None, &[]), Err(Error::MissingTool { .. })));
    }

    #[test]
    fn missing_script_is_reported_before_sqlcmd() {
        let err = SqlInit::locate(Path::new("/nonexistent/init.sql"), None).unwrap_err();
        assert!(matches!(err, Error::MissingSqlScript(_)));
    }
}
