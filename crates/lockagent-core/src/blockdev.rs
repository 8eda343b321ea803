//! Reverse lookup from device paths to stable block identities and config dirs.
//!
//! Device names such as `/dev/sda1` are not stable across boots; the kernel's
//! `<major>:<minor>` entries under `/dev/block` are. Lookups therefore resolve
//! symlinks on both sides and compare canonical targets instead of comparing
//! paths directly.

use crate::config::{AgentPaths, VolumeConfig};
use crate::devpath;
use crate::error::{LockagentError, LockagentResult};
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Resolves device paths against `/dev/block` and the device config tree.
#[derive(Debug, Clone)]
pub struct BlockdevResolver {
    dev_block_dir: PathBuf,
    dev_config_dir: PathBuf,
}

impl BlockdevResolver {
    pub fn new(paths: &AgentPaths) -> Self {
        Self {
            dev_block_dir: paths.dev_block_dir.clone(),
            dev_config_dir: paths.dev_config_dir.clone(),
        }
    }

    /// Translate a block device path into its `/dev/block` entry.
    ///
    /// Resolves all symlinks behind `path` and returns the first block-dir
    /// entry whose resolved target matches.
    pub fn resolve_block_device(&self, path: &Path) -> LockagentResult<PathBuf> {
        debug!("looking up block device for {}", path.display());
        if path.as_os_str().is_empty() {
            return Err(LockagentError::InvalidInput("empty path to lookup".into()));
        }

        let real = fs::canonicalize(path).map_err(|err| resolve_error(path, err))?;

        let entries = fs::read_dir(&self.dev_block_dir)?;
        for entry in entries {
            let candidate = entry?.path();
            if let Ok(resolved) = fs::canonicalize(&candidate) {
                if resolved == real {
                    return Ok(candidate);
                }
            }
        }

        Err(LockagentError::NotFound(format!(
            "no {} entry for {}",
            self.dev_block_dir.display(),
            path.display()
        )))
    }

    /// Translate a device path into its configuration directory.
    ///
    /// Every subdirectory name under the config base is an escaped device
    /// path; each is unescaped, resolved, and compared against the target's
    /// block identity.
    pub fn resolve_config_dir(&self, path: &Path) -> LockagentResult<PathBuf> {
        if path.as_os_str().is_empty() {
            return Err(LockagentError::InvalidInput("empty device id".into()));
        }

        let dev = if path.starts_with(&self.dev_block_dir) {
            path.to_path_buf()
        } else {
            self.resolve_block_device(path)?
        };

        let entries = fs::read_dir(&self.dev_config_dir)?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let plain = devpath::unescape_path(&entry.file_name().to_string_lossy());
            let plain_dev = self.resolve_block_device(&plain)?;
            if plain_dev == dev {
                let found = entry.path();
                debug!(
                    "found config directory {} for {}",
                    found.display(),
                    dev.display()
                );
                return Ok(found);
            }
        }

        Err(LockagentError::NotFound(format!(
            "no config directory found for {}",
            dev.display()
        )))
    }

    /// Translate a device path into its configured LUKS volume name.
    pub fn resolve_volume_name(&self, path: &Path) -> LockagentResult<String> {
        debug!("looking up volume name for device {}", path.display());
        let conf_dir = self.resolve_config_dir(path)?;

        let file = File::open(conf_dir.join("volume.json"))?;
        let VolumeConfig::CryptsetupLuks1V1(luks) =
            VolumeConfig::from_reader(BufReader::new(file))?;
        if luks.name.is_empty() {
            return Err(LockagentError::InvalidConfig(
                "empty volume name in configuration".into(),
            ));
        }
        Ok(luks.name)
    }
}

fn resolve_error(path: &Path, err: io::Error) -> LockagentError {
    if err.kind() == io::ErrorKind::NotFound {
        LockagentError::NotFound(format!("unable to resolve {}", path.display()))
    } else {
        LockagentError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CryptsetupLuks1V1;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    /// Fake system layout: a "device" file, a block dir with a `7:0` entry
    /// pointing at it, and a config base dir keyed by escaped device path.
    struct Fixture {
        _root: tempfile::TempDir,
        paths: AgentPaths,
        device: PathBuf,
        block_entry: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let device = root.path().join("loop0");
        fs::write(&device, b"").unwrap();

        let block_dir = root.path().join("block");
        fs::create_dir(&block_dir).unwrap();
        let block_entry = block_dir.join("7:0");
        symlink(&device, &block_entry).unwrap();

        let config_dir = root.path().join("dev");
        fs::create_dir(&config_dir).unwrap();

        Fixture {
            paths: AgentPaths {
                ask_dir: root.path().join("ask"),
                dev_block_dir: block_dir,
                dev_config_dir: config_dir,
            },
            _root: root,
            device,
            block_entry,
        }
    }

    fn write_volume_config(fix: &Fixture, name: &str) -> PathBuf {
        let escaped = devpath::escape_path(&fix.device);
        let dev_dir = fix.paths.dev_config_dir.join(escaped);
        fs::create_dir_all(&dev_dir).unwrap();
        let cfg = VolumeConfig::CryptsetupLuks1V1(CryptsetupLuks1V1 {
            name: name.into(),
            device: fix.device.display().to_string(),
            disable_discard: None,
        });
        fs::write(
            dev_dir.join("volume.json"),
            serde_json::to_vec(&cfg).unwrap(),
        )
        .unwrap();
        dev_dir
    }

    #[test]
    fn resolves_device_through_symlink_chain() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);

        // A second alias pointing at the same device must resolve to the
        // same block entry.
        let alias = fix.device.parent().unwrap().join("disk-by-alias");
        symlink(&fix.device, &alias).unwrap();

        assert_eq!(
            resolver.resolve_block_device(&alias).unwrap(),
            fix.block_entry
        );
        assert_eq!(
            resolver.resolve_block_device(&fix.device).unwrap(),
            fix.block_entry
        );
    }

    #[test]
    fn rejects_empty_and_unresolvable_paths() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);

        let err = resolver.resolve_block_device(Path::new("")).unwrap_err();
        assert!(matches!(err, LockagentError::InvalidInput(_)));

        let err = resolver
            .resolve_block_device(Path::new("/non-existing"))
            .unwrap_err();
        assert!(matches!(err, LockagentError::NotFound(_)));
    }

    #[test]
    fn reports_not_found_for_unmanaged_device() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);

        // A real file that is not listed under the block dir.
        let other = fix.device.parent().unwrap().join("other");
        fs::write(&other, b"").unwrap();
        let err = resolver.resolve_block_device(&other).unwrap_err();
        assert!(matches!(err, LockagentError::NotFound(_)));
    }

    #[test]
    fn finds_config_dir_by_escaped_device_name() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);
        let dev_dir = write_volume_config(&fix, "luks_vol");

        assert_eq!(resolver.resolve_config_dir(&fix.device).unwrap(), dev_dir);
        // A path already rooted at the block dir skips re-resolution.
        assert_eq!(
            resolver.resolve_config_dir(&fix.block_entry).unwrap(),
            dev_dir
        );
    }

    #[test]
    fn missing_config_dir_is_not_found() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);
        let err = resolver.resolve_config_dir(&fix.device).unwrap_err();
        assert!(matches!(err, LockagentError::NotFound(_)));
    }

    #[test]
    fn resolves_volume_name() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);
        write_volume_config(&fix, "luks_vol");

        assert_eq!(resolver.resolve_volume_name(&fix.device).unwrap(), "luks_vol");
    }

    #[test]
    fn empty_volume_name_is_invalid_config() {
        let fix = fixture();
        let resolver = BlockdevResolver::new(&fix.paths);
        write_volume_config(&fix, "");

        let err = resolver.resolve_volume_name(&fix.device).unwrap_err();
        assert!(matches!(err, LockagentError::InvalidConfig(_)));
    }
}
