//! systemd unit-name style path escaping.
//!
//! Device config directories are named after the device path they describe,
//! escaped the same way systemd escapes paths into unit names. The transform
//! must stay injective: `unescape_path(escape_path(p)) == p` for any
//! normalised absolute path, including ones with bytes outside the safe set.

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Escape an absolute path into a config-directory name.
///
/// Leading and trailing slashes are dropped, `/` becomes `-`, and any byte
/// outside `[a-zA-Z0-9:_.]` (plus a leading `.`) is emitted as `\xNN`. The
/// root path escapes to `-`.
pub fn escape_path(path: &Path) -> String {
    let bytes = path.as_os_str().as_bytes();
    let start = bytes.iter().position(|&b| b != b'/').unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != b'/').map_or(0, |i| i + 1);
    let trimmed = &bytes[start..end.max(start)];
    if trimmed.is_empty() {
        return "-".to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    for (idx, &byte) in trimmed.iter().enumerate() {
        if byte == b'/' {
            out.push('-');
        } else if is_plain(byte, idx == 0) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("\\x{byte:02x}"));
        }
    }
    out
}

/// Reverse [`escape_path`], recovering the absolute device path.
///
/// Malformed `\x` sequences are passed through verbatim rather than rejected,
/// matching systemd's lenient unescaping.
pub fn unescape_path(name: &str) -> PathBuf {
    if name == "-" {
        return PathBuf::from("/");
    }

    let raw = name.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len() + 1);
    bytes.push(b'/');
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'-' => {
                bytes.push(b'/');
                i += 1;
            }
            b'\\' if i + 4 <= raw.len() && raw[i + 1] == b'x' => {
                let decoded = std::str::from_utf8(&raw[i + 2..i + 4])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(byte) => {
                        bytes.push(byte);
                        i += 4;
                    }
                    None => {
                        bytes.push(raw[i]);
                        i += 1;
                    }
                }
            }
            other => {
                bytes.push(other);
                i += 1;
            }
        }
    }

    PathBuf::from(OsString::from_vec(bytes))
}

fn is_plain(byte: u8, first: bool) -> bool {
    match byte {
        b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b':' | b'_' => true,
        b'.' => !first,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_simple_device_path() {
        assert_eq!(escape_path(Path::new("/dev/loop0")), "dev-loop0");
    }

    #[test]
    fn escapes_root_to_dash() {
        assert_eq!(escape_path(Path::new("/")), "-");
        assert_eq!(unescape_path("-"), PathBuf::from("/"));
    }

    #[test]
    fn escapes_dash_and_leading_dot() {
        assert_eq!(escape_path(Path::new("/dev/md-0")), "dev-md\\x2d0");
        assert_eq!(escape_path(Path::new("/.hidden")), "\\x2ehidden");
    }

    #[test]
    fn round_trips_arbitrary_absolute_paths() {
        let paths = [
            "/dev/loop0",
            "/dev/disk/by-uuid/3f1b-00aa",
            "/dev/disk/by-label/My Disk",
            "/dev/md-0",
            "/.hidden/dir",
            "/dev/mapper/vg0-root_crypt",
            "/run/media/usb\\stick",
        ];
        for path in paths {
            let escaped = escape_path(Path::new(path));
            assert_eq!(
                unescape_path(&escaped),
                PathBuf::from(path),
                "round-trip failed for {path} via {escaped}"
            );
        }
    }

    #[test]
    fn unescape_tolerates_malformed_sequences() {
        assert_eq!(unescape_path("dev-bad\\xzz"), PathBuf::from("/dev/bad\\xzz"));
        assert_eq!(unescape_path("dev-tail\\x"), PathBuf::from("/dev/tail\\x"));
    }
}
