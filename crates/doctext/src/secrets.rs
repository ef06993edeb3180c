//! OCR credentials from config values, mounted files or the environment.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret configured: set a value, a file or an environment variable")]
    NotConfigured,

    #[error("Cannot read secret file {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{0}' is not set")]
    EnvMissing(String),

    #[error("Environment variable '{0}' is not valid UTF-8")]
    EnvNotUnicode(String),
}

/// Where a secret comes from. Blank config strings count as unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source<'a> {
    Inline(&'a str),
    File(&'a str),
    Env(&'a str),
}

impl<'a> Source<'a> {
    /// Picks the first configured source: inline, then file, then env.
    fn select(inline: Option<&'a str>, file: Option<&'a str>, env: Option<&'a str>) -> Option<Self> {
        let set = |value: Option<&'a str>| value.filter(|v| !v.trim().is_empty());
        set(inline)
            .map(Source::Inline)
            .or_else(|| set(file).map(Source::File))
            .or_else(|| set(env).map(Source::Env))
    }

    fn read(self) -> Result<String, SecretError> {
        match self {
            Source::Inline(value) => Ok(value.to_string()),
            Source::File(path) => {
                let path = expand_home(path);
                std::fs::read_to_string(&path)
                    .map(|content| content.trim().to_string())
                    .map_err(|source| SecretError::ReadFile { path, source })
            }
            Source::Env(name) => match std::env::var(name) {
                Ok(value) => Ok(value.trim().to_string()),
                Err(std::env::VarError::NotPresent) => {
                    Err(SecretError::EnvMissing(name.to_string()))
                }
                Err(std::env::VarError::NotUnicode(_)) => {
                    Err(SecretError::EnvNotUnicode(name.to_string()))
                }
            },
        }
    }
}

/// Reads the secret from the first configured source.
///
/// A configured source that cannot be read is an error even when a
/// lower-priority source is also set.
pub fn resolve_secret(
    inline: Option<&str>,
    file: Option<&str>,
    env: Option<&str>,
) -> Result<SecretString, SecretError> {
    resolve_secret_optional(inline, file, env)?.ok_or(SecretError::NotConfigured)
}

/// Like [`resolve_secret`] but `None` when nothing is configured.
pub fn resolve_secret_optional(
    inline: Option<&str>,
    file: Option<&str>,
    env: Option<&str>,
) -> Result<Option<SecretString>, SecretError> {
    Source::select(inline, file, env)
        .map(|source| source.read().map(SecretString::from))
        .transpose()
}

/// Replaces a leading `~` or `~/` with the home directory.
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    fn test_source_priority() {
        assert_eq!(
            Source::select(Some("a"), Some("/f"), Some("E")),
            Some(Source::Inline("a"))
        );
        assert_eq!(
            Source::select(Some(" "), Some("/f"), Some("E")),
            Some(Source::File("/f"))
        );
        assert_eq!(Source::select(None, Some(""), Some("E")), Some(Source::Env("E")));
        assert_eq!(Source::select(None, None, None), None);
    }

    #[test]
    fn test_file_contents_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "s3cret\n").unwrap();

        let secret = resolve_secret(None, path.to_str(), None).unwrap();
        assert_eq!(secret.expose_secret(), "s3cret");
    }

    #[test]
    #[serial]
    fn test_env_source() {
        std::env::set_var("DOCTEXT_TEST_SECRET", " from-env ");
        let secret = resolve_secret(None, None, Some("DOCTEXT_TEST_SECRET")).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("DOCTEXT_TEST_SECRET");

        let err = resolve_secret(None, None, Some("DOCTEXT_TEST_SECRET")).unwrap_err();
        assert!(matches!(err, SecretError::EnvMissing(name) if name == "DOCTEXT_TEST_SECRET"));
    }

    #[test]
    fn test_unreadable_file_does_not_fall_back_to_env() {
        let err = resolve_secret(None, Some("/nonexistent/doctext/token"), Some("PATH")).unwrap_err();
        assert!(matches!(err, SecretError::ReadFile { .. }));
    }

    #[test]
    fn test_nothing_configured() {
        assert!(matches!(
            resolve_secret(None, None, None),
            Err(SecretError::NotConfigured)
        ));
        assert!(resolve_secret_optional(Some(""), None, None).unwrap().is_none());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/token"), home.join("token"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
