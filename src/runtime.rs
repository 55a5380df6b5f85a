use anyhow::{Context, Result};
use async_trait::async_trait;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, env::VarError>;
    fn current_dir(&self) -> Result<PathBuf>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>>;
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    // Processes
    fn probe_program(&self, program: &str, arg: &str) -> bool;
    fn run_program(&self, program: &str, file: &Path) -> Result<i32>;
}

pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    #[tracing::instrument(skip(self))]
    fn env_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    #[tracing::instrument(skip(self))]
    fn current_dir(&self) -> Result<PathBuf> {
        env::current_dir().context("Failed to determine the current directory")
    }

    #[tracing::instrument(skip(self, contents))]
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).context("Failed to write to file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).context("Failed to read file to string")
    }

    #[tracing::instrument(skip(self))]
    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).context("Failed to rename file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove_dir(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).context("Failed to remove directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).context("Failed to remove directory and its contents")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    #[tracing::instrument(skip(self))]
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)?.map(|entry| Ok(entry?.path())).collect()
    }

    #[tracing::instrument(skip(self))]
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        let file = fs::File::create(path).context("Failed to create file")?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    fn open(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
        let file = fs::File::open(path).context("Failed to open file")?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(mode);
            fs::set_permissions(path, permissions).context("Failed to set permissions")?;
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode); // Suppress unused warnings on non-Unix
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn probe_program(&self, program: &str, arg: &str) -> bool {
        Command::new(program)
            .arg(arg)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    fn run_program(&self, program: &str, file: &Path) -> Result<i32> {
        let status = Command::new(program)
            .arg(file)
            .status()
            .with_context(|| format!("Failed to launch {}", program))?;
        // A child killed by a signal has no exit code; report generic failure
        Ok(status.code().unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_ops() {
        let rt = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");

        // Write
        rt.write(&file_path, b"hello").unwrap();
        assert!(rt.exists(&file_path));
        assert!(rt.is_file(&file_path));
        assert!(!rt.is_dir(&file_path));

        // Read
        let content = rt.read_to_string(&file_path).unwrap();
        assert_eq!(content, "hello");

        // Open
        let mut reader = rt.open(&file_path).unwrap();
        let mut buf = String::new();
        reader.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");

        // Rename
        let new_path = dir.path().join("test_new.txt");
        rt.rename(&file_path, &new_path).unwrap();
        assert!(!rt.exists(&file_path));
        assert!(rt.exists(&new_path));

        // Create file using write stream
        let file_path2 = dir.path().join("test2.txt");
        {
            let mut writer = rt.create_file(&file_path2).unwrap();
            writer.write_all(b"world").unwrap();
        }
        assert_eq!(rt.read_to_string(&file_path2).unwrap(), "world");

        // Remove
        rt.remove_file(&new_path).unwrap();
        assert!(!rt.exists(&new_path));
    }

    #[test]
    fn test_real_runtime_dir_ops() {
        let rt = RealRuntime;
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("a/b/c");

        // Create
        rt.create_dir_all(&sub_dir).unwrap();
        assert!(rt.exists(&sub_dir));
        assert!(rt.is_dir(&sub_dir));
        assert!(!rt.is_file(&sub_dir));

        // Read dir
        let parent = sub_dir.parent().unwrap();
        let entries = rt.read_dir(parent).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], sub_dir);

        // Remove dir
        rt.remove_dir(&sub_dir).unwrap();
        assert!(!rt.exists(&sub_dir));

        // Remove dir all
        let sub_dir_full = dir.path().join("x/y/z");
        rt.create_dir_all(&sub_dir_full).unwrap();
        rt.write(&sub_dir_full.join("file.txt"), b"data").unwrap();
        rt.remove_dir_all(&dir.path().join("x")).unwrap();
        assert!(!rt.exists(&dir.path().join("x")));
    }

    #[test]
    fn test_real_runtime_env() {
        let rt = RealRuntime;
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(rt.env_var("PATH").unwrap(), path);
        }

        assert!(rt.current_dir().is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn test_real_runtime_set_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let rt = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("script.wsx");
        rt.write(&file_path, b"print(1)").unwrap();

        rt.set_permissions(&file_path, 0o755).unwrap();
        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_real_runtime_probe_program() {
        let rt = RealRuntime;
        assert!(!rt.probe_program("definitely-not-a-real-program-xyz", "--version"));
    }

    #[test]
    #[cfg(unix)]
    fn test_real_runtime_run_program_forwards_exit_code() {
        let rt = RealRuntime;
        let dir = tempdir().unwrap();
        let script = dir.path().join("exit7.sh");
        rt.write(&script, b"exit 7\n").unwrap();

        let code = rt.run_program("sh", &script).unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn test_real_runtime_errors() {
        let rt = RealRuntime;
        let dir = tempdir().unwrap();
        let non_existent = dir.path().join("non_existent");

        assert!(rt.read_to_string(&non_existent).is_err());
        assert!(rt.open(&non_existent).is_err());
        assert!(rt.rename(&non_existent, &dir.path().join("new")).is_err());
        assert!(rt.remove_file(&non_existent).is_err());
        assert!(rt.remove_dir(&non_existent).is_err());
    }
}
