//! Preset catalogue: presets embedded in the binary, presets loaded from
//! disk, and selection of the preset matching a detected environment.
use std::path::Path;

use crate::error::PresetError;
use crate::platform::Environment;
use crate::tasks::{Preset, Task, TaskKind};

/// Embedded preset files, in catalogue order.
const EMBEDDED: &[(&str, &str)] = &[
    (
        "kali-raspberry-pi.toml",
        include_str!("../presets/kali-raspberry-pi.toml"),
    ),
    ("ubuntu.toml", include_str!("../presets/ubuntu.toml")),
    ("debian.toml", include_str!("../presets/debian.toml")),
    ("arch.toml", include_str!("../presets/arch.toml")),
];

/// Parse preset TOML, naming `source_name` in any error.
///
/// # Errors
///
/// Returns [`PresetError::Parse`] if the text is not a valid preset,
/// including any task that fails to decode.
pub fn parse(source_name: &str, text: &str) -> Result<Preset, PresetError> {
    toml::from_str(text).map_err(|e| PresetError::Parse {
        source_name: source_name.to_string(),
        message: e.message().to_string(),
    })
}

/// Load one embedded preset by file name.
///
/// # Errors
///
/// Returns [`PresetError::NotFound`] for an unknown name, or
/// [`PresetError::Parse`] if the embedded file is malformed.
pub fn embedded(file_name: &str) -> Result<Preset, PresetError> {
    let (_, text) = EMBEDDED
        .iter()
        .find(|(name, _)| *name == file_name)
        .ok_or_else(|| PresetError::NotFound(file_name.to_string()))?;
    parse(file_name, text)
}

/// Load a preset from a TOML file on disk.
///
/// # Errors
///
/// Returns [`PresetError::Io`] if the file cannot be read, or
/// [`PresetError::Parse`] if it is not a valid preset.
pub fn load_file(path: &Path) -> Result<Preset, PresetError> {
    let text = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&path.display().to_string(), &text)
}

/// Generic preset for hosts no embedded preset matches.
///
/// Tries each common package manager in turn, so its steps are scripts
/// rather than single command lines.
#[must_use]
pub fn fallback() -> Preset {
    let script = |name: &str, description: &str, body: &str| Task {
        name: name.to_string(),
        description: Some(description.to_string()),
        kind: TaskKind::Script {
            body: body.to_string(),
        },
        elevated: true,
        optional: false,
    };
    Preset {
        name: "Basic Linux Setup".to_string(),
        environment: "Generic Linux".to_string(),
        description: "Basic setup tasks for generic Linux systems".to_string(),
        tasks: vec![
            script(
                "Update Package List",
                "Update the package manager cache",
                "#!/bin/sh\n\
                 if command -v apt-get >/dev/null; then sudo apt-get update\n\
                 elif command -v yum >/dev/null; then sudo yum makecache\n\
                 elif command -v pacman >/dev/null; then sudo pacman -Sy\n\
                 else echo \"no supported package manager found\" >&2; exit 1\n\
                 fi\n",
            ),
            script(
                "Install Basic Tools",
                "Install essential development tools",
                "#!/bin/sh\n\
                 if command -v apt-get >/dev/null; then sudo apt-get install -y curl wget git\n\
                 elif command -v yum >/dev/null; then sudo yum install -y curl wget git\n\
                 elif command -v pacman >/dev/null; then sudo pacman -S --noconfirm curl wget git\n\
                 else echo \"no supported package manager found\" >&2; exit 1\n\
                 fi\n",
            ),
        ],
    }
}

/// Every preset in the catalogue, fallback last.
///
/// # Errors
///
/// Returns the first embedded preset that fails to parse.
pub fn all_presets() -> Result<Vec<Preset>, PresetError> {
    let mut presets = EMBEDDED
        .iter()
        .map(|(name, text)| parse(name, text))
        .collect::<Result<Vec<_>, _>>()?;
    presets.push(fallback());
    Ok(presets)
}

/// Pick the preset for `env`.
///
/// Kali on a Raspberry Pi first, then Ubuntu, then the rest of the Debian
/// family, then Arch; anything else gets [`fallback`].
///
/// # Errors
///
/// Returns an error if the matching embedded preset fails to parse.
pub fn select(env: &Environment) -> Result<Preset, PresetError> {
    if env.is_kali() && env.is_raspberry_pi {
        embedded("kali-raspberry-pi.toml")
    } else if env.is_ubuntu() {
        embedded("ubuntu.toml")
    } else if env.is_debian_family() {
        embedded("debian.toml")
    } else if env.is_arch() {
        embedded("arch.toml")
    } else {
        Ok(fallback())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::platform::Sources;
    use crate::tasks::ServiceAction;

    fn env(id: &str, name: &str, pi: bool) -> Environment {
        Environment::from_sources(&Sources {
            os_release: Some(format!("NAME=\"{name}\"\nID={id}\n")),
            device_model: pi.then(|| "Raspberry Pi 4 Model B".to_string()),
            ..Sources::default()
        })
    }

    #[test]
    fn every_embedded_preset_parses() {
        let presets = all_presets().unwrap();
        assert_eq!(presets.len(), EMBEDDED.len() + 1);
        assert!(presets.iter().all(|p| !p.tasks.is_empty()));
    }

    #[test]
    fn embedded_scripts_start_with_shebang() {
        for preset in all_presets().unwrap() {
            for task in &preset.tasks {
                if let TaskKind::Script { body } = &task.kind {
                    assert!(
                        body.starts_with("#!"),
                        "{} / {} must start with a shebang",
                        preset.name,
                        task.name
                    );
                }
            }
        }
    }

    #[test]
    fn kali_on_pi_gets_kali_preset() {
        let preset = select(&env("kali", "Kali GNU/Linux", true)).unwrap();
        assert_eq!(preset.name, "Kali Linux - Raspberry Pi");
    }

    #[test]
    fn kali_without_pi_gets_debian_preset() {
        let preset = select(&env("kali", "Kali GNU/Linux", false)).unwrap();
        assert_eq!(preset.name, "Debian Base");
    }

    #[test]
    fn ubuntu_gets_ubuntu_preset() {
        let preset = select(&env("ubuntu", "Ubuntu", false)).unwrap();
        assert_eq!(preset.name, "Ubuntu Setup");
    }

    #[test]
    fn debian_gets_debian_preset() {
        let preset = select(&env("debian", "Debian GNU/Linux", false)).unwrap();
        assert_eq!(preset.name, "Debian Base");
    }

    #[test]
    fn arch_gets_arch_preset() {
        let preset = select(&env("arch", "Arch Linux", false)).unwrap();
        assert_eq!(preset.name, "Arch Linux Setup");
    }

    #[test]
    fn unknown_distribution_gets_fallback() {
        let preset = select(&env("fedora", "Fedora Linux", false)).unwrap();
        assert_eq!(preset, fallback());
    }

    #[test]
    fn unknown_embedded_name_is_not_found() {
        let err = embedded("gentoo.toml").unwrap_err();
        assert_eq!(err.to_string(), "embedded preset file not found: gentoo.toml");
    }

    #[test]
    fn invalid_task_in_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "name = \"x\"\nenvironment = \"y\"\n[[tasks]]\nname = \"svc\"\ntype = \"service\"\ncommands = [\"nginx\", \"banana\"]\n",
        )
        .unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, PresetError::Parse { .. }));
        assert!(err.to_string().contains("banana"), "{err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/preset.toml")).unwrap_err();
        assert!(matches!(err, PresetError::Io { .. }));
    }

    #[test]
    fn kali_preset_enables_and_starts_docker() {
        let preset = embedded("kali-raspberry-pi.toml").unwrap();
        let docker_actions: Vec<ServiceAction> = preset
            .tasks
            .iter()
            .filter_map(|t| match &t.kind {
                TaskKind::Service(s) if s.name == "docker" => Some(s.action),
                _ => None,
            })
            .collect();
        assert_eq!(docker_actions, vec![ServiceAction::Enable, ServiceAction::Start]);
        assert!(preset.tasks.last().unwrap().optional);
    }
}
