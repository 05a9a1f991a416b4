//! Askpass helper scripts
//!
//! `ssh` reads a key passphrase from the program named by `SSH_ASKPASS` when
//! it has no terminal. The generated script only prints the passphrase, so
//! it never appears on a command line.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Environment variable naming the askpass program
pub const SSH_ASKPASS: &str = "SSH_ASKPASS";

/// Makes `ssh` use the askpass program even with a display or terminal around
pub const SSH_ASKPASS_REQUIRE: &str = "SSH_ASKPASS_REQUIRE";

/// Write an askpass script for `passphrase` into `dir`
///
/// The file is owner-only; on Unix it is also executable.
pub fn write_script(dir: &Path, passphrase: &str) -> io::Result<PathBuf> {
    let (suffix, content) = if cfg!(windows) {
        (".bat", windows_script(passphrase))
    } else {
        (".sh", unix_script(passphrase))
    };

    let mut file = tempfile::Builder::new()
        .prefix("askpass")
        .suffix(suffix)
        .tempfile_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    let (file, path) = file.keep().map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o700))?;
    }
    drop(file);

    Ok(path)
}

fn unix_script(passphrase: &str) -> String {
    format!(
        "#!/bin/sh\nprintf '%s\\n' '{}'\n",
        passphrase.replace('\'', r"'\''")
    )
}

fn windows_script(passphrase: &str) -> String {
    let mut escaped = String::with_capacity(passphrase.len());
    for c in passphrase.chars() {
        match c {
            '%' => escaped.push_str("%%"),
            '^' | '&' | '<' | '>' | '|' | '(' | ')' | '!' | '"' => {
                escaped.push('^');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    format!("@echo off\r\necho {}\r\n", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_script_quotes_passphrase() {
        assert_eq!(
            unix_script("it's $HOME"),
            "#!/bin/sh\nprintf '%s\\n' 'it'\\''s $HOME'\n"
        );
    }

    #[test]
    fn test_windows_script_escapes_passphrase() {
        assert_eq!(
            windows_script("a&b%c"),
            "@echo off\r\necho a^&b%%c\r\n"
        );
    }

    #[test]
    fn test_write_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), "secret").unwrap();
        assert!(path.starts_with(dir.path()));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("secret"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_script_prints_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let passphrase = "p@ss 'word' \"x\" $y `z`";
        let path = write_script(dir.path(), passphrase).unwrap();

        let output = tokio::process::Command::new(&path).output().await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout), format!("{passphrase}\n"));
    }
}
