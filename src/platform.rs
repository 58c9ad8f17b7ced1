//! Host environment detection used to pick a preset.
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::exec::Executor;

/// Value reported for fields that could not be probed.
pub const UNKNOWN: &str = "Unknown";

/// Identity of the host the tool is running on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    /// Kernel name from `uname -s` (e.g. `Linux`).
    pub os: String,
    /// Distribution display name (`NAME` in `/etc/os-release`).
    pub distribution: String,
    /// Distribution version (`VERSION_ID`).
    pub version: String,
    /// Machine architecture from `uname -m`.
    pub architecture: String,
    /// `Raspberry Pi` or `Generic`.
    pub hardware: String,
    /// Kernel release from `uname -r`.
    pub kernel: String,
    /// Whether the board identifies as a Raspberry Pi.
    pub is_raspberry_pi: bool,
    /// Distribution identifier (`ID`), lowercase.
    pub id: String,
    /// Unparsed `/etc/os-release` text the distribution fields came from.
    pub raw: String,
}

/// Raw text gathered from the host, parsed by [`Environment::from_sources`].
#[derive(Debug, Clone, Default)]
pub struct Sources {
    /// Contents of `/etc/os-release`.
    pub os_release: Option<String>,
    /// Output of `uname -s`.
    pub kernel_name: Option<String>,
    /// Output of `uname -m`.
    pub machine: Option<String>,
    /// Output of `uname -r`.
    pub kernel_release: Option<String>,
    /// Contents of `/proc/cpuinfo`.
    pub cpuinfo: Option<String>,
    /// Contents of `/proc/device-tree/model`.
    pub device_model: Option<String>,
}

impl Environment {
    /// Probe the running host.
    ///
    /// Every probe is best-effort; fields that cannot be read are reported
    /// as [`UNKNOWN`].
    #[must_use]
    pub fn detect(executor: &dyn Executor) -> Self {
        let uname = |flag: &str| {
            executor
                .run("uname", &[flag])
                .ok()
                .map(|r| r.stdout.trim().to_string())
        };
        Self::from_sources(&Sources {
            os_release: read("/etc/os-release"),
            kernel_name: uname("-s"),
            machine: uname("-m"),
            kernel_release: uname("-r"),
            cpuinfo: read("/proc/cpuinfo"),
            device_model: read("/proc/device-tree/model"),
        })
    }

    /// Build an environment from already-gathered probe output.
    #[must_use]
    pub fn from_sources(sources: &Sources) -> Self {
        let release = sources.os_release.as_deref().unwrap_or_default();
        let field = |key: &str| os_release_value(release, key);

        let is_raspberry_pi = [&sources.cpuinfo, &sources.device_model]
            .into_iter()
            .flatten()
            .any(|text| {
                let text = text.to_lowercase();
                text.contains("raspberry") || text.contains("bcm")
            });

        let or_unknown = |v: Option<String>| {
            v.filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        Self {
            os: or_unknown(sources.kernel_name.clone()),
            distribution: or_unknown(field("NAME")),
            version: or_unknown(field("VERSION_ID")),
            architecture: or_unknown(sources.machine.clone()),
            hardware: if is_raspberry_pi {
                "Raspberry Pi".to_string()
            } else {
                "Generic".to_string()
            },
            kernel: or_unknown(sources.kernel_release.clone()),
            is_raspberry_pi,
            id: field("ID").unwrap_or_default().to_lowercase(),
            raw: release.to_string(),
        }
    }

    fn id_or_name_contains(&self, needle: &str) -> bool {
        self.id.contains(needle) || self.distribution.to_lowercase().contains(needle)
    }

    /// Kali Linux.
    #[must_use]
    pub fn is_kali(&self) -> bool {
        self.id_or_name_contains("kali")
    }

    /// Ubuntu (checked before the wider Debian family).
    #[must_use]
    pub fn is_ubuntu(&self) -> bool {
        self.id_or_name_contains("ubuntu")
    }

    /// Debian or a Debian derivative.
    #[must_use]
    pub fn is_debian_family(&self) -> bool {
        ["debian", "ubuntu", "raspbian", "kali"]
            .iter()
            .any(|d| self.id_or_name_contains(d))
    }

    /// Arch Linux or a derivative.
    #[must_use]
    pub fn is_arch(&self) -> bool {
        ["arch", "manjaro", "endeavouros"]
            .iter()
            .any(|d| self.id_or_name_contains(d))
            || (self.id.is_empty() && Path::new("/etc/arch-release").exists())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OS:           {}", self.os)?;
        writeln!(f, "Distribution: {}", self.distribution)?;
        writeln!(f, "Version:      {}", self.version)?;
        writeln!(f, "Architecture: {}", self.architecture)?;
        writeln!(f, "Hardware:     {}", self.hardware)?;
        write!(f, "Kernel:       {}", self.kernel)
    }
}

fn read(path: &str) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Look up `key` in `os-release` text, stripping optional quotes.
fn os_release_value(text: &str, key: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim().trim_matches(['"', '\'']).to_string())
    })
}
