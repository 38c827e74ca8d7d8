//! environment variable overrides
use std::collections::HashMap;
use std::path::Path;

/// Snapshot of the environment taken once per run
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Load `env_file` into the process environment (existing variables win), then snapshot it
    ///
    /// Malformed lines are skipped, the rest of the file still applies.
    pub fn load(env_file: &Path) -> Self {
        match dotenvy::from_path_iter(env_file) {
            Ok(entries) => {
                let mut loaded = 0;
                for entry in entries {
                    match entry {
                        Ok((key, value)) => {
                            if std::env::var_os(&key).is_none() {
                                std::env::set_var(&key, value);
                                loaded += 1;
                            }
                        }
                        Err(dotenvy::Error::LineParse(line, index)) => {
                            tracing::warn!(path=%env_file.display(), line=%line, index, "skipping malformed line")
                        }
                        Err(err) => {
                            tracing::warn!(path=%env_file.display(), %err, "stopped reading environment file");
                            break;
                        }
                    }
                }
                tracing::info!(path=%env_file.display(), loaded, "loaded environment file");
            }
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(path=%env_file.display(), %err, "ignoring environment file"),
        }

        Self::from_process()
    }

    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Value of `name`; empty values count as unset
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// First set variable out of `names`
    pub fn first_of<'n>(&self, names: &[&'n str]) -> Option<(&'n str, &str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_counts_as_unset() {
        let env = Environment::from_iter([("A", ""), ("B", "b")]);
        assert_eq!(env.get("A"), None);
        assert_eq!(env.first_of(&["A", "B"]), Some(("B", "b")));
        assert_eq!(env.first_of(&["C"]), None);
    }

    #[test]
    fn env_file_does_not_override_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# comment\n\nTFCHAIN_TEST_FROM_FILE=file\nTFCHAIN_TEST_PRESET=file\n",
        )
        .unwrap();
        std::env::set_var("TFCHAIN_TEST_PRESET", "process");

        let env = Environment::load(&path);

        assert_eq!(env.get("TFCHAIN_TEST_FROM_FILE"), Some("file"));
        assert_eq!(env.get("TFCHAIN_TEST_PRESET"), Some("process"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "TFCHAIN_TEST_BEFORE=1\nthis line is broken\nTFCHAIN_TEST_AFTER=2\n",
        )
        .unwrap();

        let env = Environment::load(&path);

        assert_eq!(env.get("TFCHAIN_TEST_BEFORE"), Some("1"));
        assert_eq!(env.get("TFCHAIN_TEST_AFTER"), Some("2"));
    }

    #[test]
    fn missing_env_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::load(&dir.path().join(".env"));
        assert!(env.get("PATH").is_some());
    }
}
