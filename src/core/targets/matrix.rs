// ─── Target Matrix ───
// Project name × platform × configuration, per host platform family.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{UProjectError, UProjectResult};

/// Host platform family, as seen by the target generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    Windows,
    Linux,
    Darwin,
    /// Anything else, by name.
    Other(String),
}

impl HostPlatform {
    /// Family of the OS this binary was built for.
    pub fn current() -> Self {
        std::env::consts::OS
            .parse()
            .unwrap_or_else(|_| HostPlatform::Other(std::env::consts::OS.to_string()))
    }
}

impl FromStr for HostPlatform {
    type Err = std::convert::Infallible;

    /// Accepts both `std::env::consts::OS` spellings and `win32` / `darwin`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "windows" | "win32" => HostPlatform::Windows,
            "linux" => HostPlatform::Linux,
            "macos" | "darwin" => HostPlatform::Darwin,
            other => HostPlatform::Other(other.to_string()),
        })
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlatform::Windows => write!(f, "Windows"),
            HostPlatform::Linux => write!(f, "Linux"),
            HostPlatform::Darwin => write!(f, "Darwin"),
            HostPlatform::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Platform a target is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPlatform {
    Win64,
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPlatform::Win64 => write!(f, "Win64"),
        }
    }
}

/// Build profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Configuration {
    Debug,
    Development,
    Shipping,
}

impl Configuration {
    /// Emission order of the target matrix.
    pub const ALL: [Configuration; 3] = [
        Configuration::Debug,
        Configuration::Development,
        Configuration::Shipping,
    ];
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Configuration::Debug => write!(f, "Debug"),
            Configuration::Development => write!(f, "Development"),
            Configuration::Shipping => write!(f, "Shipping"),
        }
    }
}

/// Role of a target relative to the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    Game,
    Editor,
    Server,
}

impl TargetRole {
    pub const ALL: [TargetRole; 3] = [TargetRole::Game, TargetRole::Editor, TargetRole::Server];

    /// Suffix appended to the project name.
    pub fn suffix(self) -> &'static str {
        match self {
            TargetRole::Game => "",
            TargetRole::Editor => "Editor",
            TargetRole::Server => "Server",
        }
    }
}

/// A buildable unit: `<name> <platform> <configuration>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub name: String,
    pub platform: TargetPlatform,
    pub configuration: Configuration,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.platform, self.configuration)
    }
}

/// Targets available for `project_name` on `platform`.
///
/// Deterministic; the order is part of the contract: for each
/// configuration, the base target, then `Editor`, then `Server`.
pub fn available_targets(
    project_name: &str,
    platform: &HostPlatform,
) -> UProjectResult<Vec<Target>> {
    match platform {
        HostPlatform::Windows => Ok(windows_targets(project_name)),
        HostPlatform::Linux | HostPlatform::Darwin => Err(UProjectError::NotImplemented {
            platform: platform.to_string(),
        }),
        HostPlatform::Other(name) => Err(UProjectError::UnsupportedPlatform {
            platform: name.clone(),
        }),
    }
}

fn windows_targets(project_name: &str) -> Vec<Target> {
    // TODO: branch on host bit-width and add a Win32 platform for 32-bit Windows.
    let platform = TargetPlatform::Win64;

    let mut targets = Vec::with_capacity(Configuration::ALL.len() * TargetRole::ALL.len());
    for configuration in Configuration::ALL {
        for role in TargetRole::ALL {
            targets.push(Target {
                name: format!("{}{}", project_name, role.suffix()),
                platform,
                configuration,
            });
        }
    }
    targets
}
