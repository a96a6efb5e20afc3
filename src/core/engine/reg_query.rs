// ─── reg.exe Store ───
// Registry access through `reg query`, for hosts without a native binding.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::registry::{
    RegistryError, RegistryKey, RegistryListing, RegistryStore, RegistryValue,
};

const VALUE_INDENT: &str = "    ";
const KEY_NOT_FOUND_MARKER: &str = "unable to find the specified registry key";
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// Queries the Windows registry through `reg.exe`, 64-bit view.
#[derive(Debug, Clone)]
pub struct RegQueryStore {
    program: String,
}

impl Default for RegQueryStore {
    fn default() -> Self {
        Self {
            program: "reg".to_string(),
        }
    }
}

impl RegQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable in place of `reg`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl RegistryStore for RegQueryStore {
    #[instrument(skip(self))]
    async fn list(&self, key: &str) -> Result<RegistryListing, RegistryError> {
        let output = Command::new(&self.program)
            .args(["query", key, "/reg:64"])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("reg query {} failed: {}", key, stderr.trim());
            if stderr.to_ascii_lowercase().contains(KEY_NOT_FOUND_MARKER) {
                return Err(RegistryError::KeyNotFound(key.to_string()));
            }
            return Err(RegistryError::Query {
                key: key.to_string(),
                message: stderr.trim().to_string(),
            });
        }

        let stdout = decode_output(key, &output.stdout)?;
        let entry = parse_query_output(key, &stdout);
        Ok(HashMap::from([(key.to_string(), entry)]))
    }
}

/// Decode `reg query` stdout without losing characters.
///
/// UTF-16LE (with BOM) and UTF-8 are accepted. Anything else, such as a
/// legacy console code page, is an error rather than a mangled path.
pub fn decode_output(key: &str, bytes: &[u8]) -> Result<String, RegistryError> {
    let undecodable = |encoding: &str| RegistryError::Query {
        key: key.to_string(),
        message: format!("output is not valid {}", encoding),
    };

    if let Some(wide) = bytes.strip_prefix(&UTF16LE_BOM) {
        if wide.len() % 2 != 0 {
            return Err(undecodable("UTF-16"));
        }
        let units: Vec<u16> = wide
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).map_err(|_| undecodable("UTF-16"));
    }

    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| undecodable("UTF-8"))
}

/// Parse `reg query` text output for `key`.
///
/// ```text
/// HKEY_CURRENT_USER\SOFTWARE\Epic Games\Unreal Engine\Builds
///     {2A5F...}    REG_SZ    D:/Source/UnrealEngine
///
/// HKEY_CURRENT_USER\SOFTWARE\Epic Games\Unreal Engine\Builds\Child
/// ```
pub fn parse_query_output(key: &str, output: &str) -> RegistryKey {
    let mut entry = RegistryKey {
        path: key.to_string(),
        ..Default::default()
    };
    let mut seen_header = false;

    for line in output.lines().map(|l| l.trim_end_matches('\r')) {
        if let Some(rest) = line.strip_prefix(VALUE_INDENT) {
            if let Some((name, value)) = parse_value_line(rest) {
                entry.values.insert(name, value);
            }
            continue;
        }

        let line = line.trim();
        if !line.starts_with("HKEY_") {
            continue;
        }
        if seen_header {
            entry.keys.push(line.to_string());
        } else {
            seen_header = true;
        }
    }

    entry
}

fn parse_value_line(line: &str) -> Option<(String, RegistryValue)> {
    let mut parts = line.splitn(3, VALUE_INDENT);
    let name = parts.next()?.trim();
    let kind = parts.next()?.trim();
    if !kind.starts_with("REG_") {
        return None;
    }
    let value = parts.next().unwrap_or_default().trim();

    Some((
        name.to_string(),
        RegistryValue {
            kind: kind.to_string(),
            value: value.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTALL_OUTPUT: &str = concat!(
        "\r\n",
        "HKEY_LOCAL_MACHINE\\SOFTWARE\\EpicGames\\Unreal Engine\\5.3\r\n",
        "    InstalledDirectory    REG_SZ    C:\\Program Files\\Epic Games\\UE_5.3\r\n",
        "    (Default)    REG_SZ    \r\n",
        "\r\n",
    );

    const BUILDS_OUTPUT: &str = "
HKEY_CURRENT_USER\\SOFTWARE\\Epic Games\\Unreal Engine\\Builds
    {2A5F1B4C-0000-4E5F-9C1D-1234567890AB}    REG_SZ    D:/Source/UnrealEngine
    My Fork    REG_SZ    E:/Forks/UE5

HKEY_CURRENT_USER\\SOFTWARE\\Epic Games\\Unreal Engine\\Builds\\Archived
";

    #[test]
    fn parses_values_with_spaces_in_data() {
        let key = r"HKLM\SOFTWARE\EpicGames\Unreal Engine\5.3";
        let entry = parse_query_output(key, INSTALL_OUTPUT);
        assert_eq!(entry.path, key);
        assert_eq!(
            entry.values["InstalledDirectory"].value,
            r"C:\Program Files\Epic Games\UE_5.3"
        );
        assert_eq!(entry.values["(Default)"].value, "");
        assert!(entry.keys.is_empty());
    }

    #[test]
    fn parses_value_names_with_spaces_and_subkeys() {
        let entry = parse_query_output(
            r"HKCU\SOFTWARE\Epic Games\Unreal Engine\Builds",
            BUILDS_OUTPUT,
        );
        assert_eq!(entry.values["My Fork"].value, "E:/Forks/UE5");
        assert_eq!(entry.values["My Fork"].kind, "REG_SZ");
        let archived = r"HKEY_CURRENT_USER\SOFTWARE\Epic Games\Unreal Engine\Builds\Archived";
        assert_eq!(entry.keys, vec![archived.to_string()]);
    }

    #[test]
    fn ignores_noise_lines() {
        let entry = parse_query_output("HKCU\\X", "End of search: 0 match(es) found.\n");
        assert!(entry.values.is_empty());
        assert!(entry.keys.is_empty());
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let store = RegQueryStore::with_program("uproject-definitely-not-a-real-binary");
        let err = store.list(r"HKCU\Anything").await.unwrap_err();
        assert!(matches!(err, RegistryError::Io(_)));
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = UTF16LE_BOM.to_vec();
        for unit in "C:\\Users\\Jörg".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_output("HKCU\\X", &bytes).unwrap(), r"C:\Users\Jörg");
    }

    #[test]
    fn rejects_code_page_bytes() {
        let err = decode_output("HKCU\\X", b"C:\\Users\\J\xE4rg").unwrap_err();
        assert!(matches!(err, RegistryError::Query { .. }));
    }

    #[cfg(unix)]
    fn fake_reg(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("reg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_ascii_install_dir_survives_utf8_output() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_reg(
            dir.path(),
            concat!(
                r"printf 'HKEY_LOCAL_MACHINE\\X\r\n",
                r"    InstalledDirectory    REG_SZ    C:\\Users\\Jörg\r\n'",
            ),
        );

        let listing = RegQueryStore::with_program(program).list(r"HKLM\X").await.unwrap();
        assert_eq!(
            listing[r"HKLM\X"].values["InstalledDirectory"].value,
            r"C:\Users\Jörg"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn code_page_output_is_an_error_not_a_mangled_path() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_reg(
            dir.path(),
            concat!(
                r"printf 'HKEY_LOCAL_MACHINE\\X\r\n",
                r"    InstalledDirectory    REG_SZ    C:\\Users\\J\344rg\r\n'",
            ),
        );

        let err = RegQueryStore::with_program(program).list(r"HKLM\X").await.unwrap_err();
        assert!(matches!(err, RegistryError::Query { .. }));
    }
}
