//! Where user content lives, and process-wide state the engine shares.

use crate::{error::Error, settings::Settings};
use std::path::{Path, PathBuf};

pub const LEVEL_EXTENSION: &str = ".level";
pub const DOODAD_EXTENSION: &str = ".doodad";
pub const LEVELPACK_EXTENSION: &str = ".levelpack";

#[derive(Debug)]
pub struct Environment {
    profile: PathBuf,
    system: Option<PathBuf>,
    pub settings: Settings,
    /// Held while a screenshot renders. Screenshots of big levels are slow, one at a time is plenty.
    screenshot_lock: parking_lot::Mutex<()>,
}

impl Environment {
    /// An environment rooted at `profile`. Nothing is created until [`Environment::init`].
    #[must_use]
    pub fn new(profile: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            profile: profile.into(),
            system: None,
            settings,
            screenshot_lock: parking_lot::Mutex::new(()),
        }
    }
    /// Rooted in the platform's user data dir, e.g. `~/.local/share/doodle`.
    #[must_use]
    pub fn from_user_dirs(settings: Settings) -> Option<Self> {
        let mut profile = dirs::data_dir()?;
        profile.push(crate::settings::APP_NAME);
        Some(Self::new(profile, settings))
    }
    /// Read-only built-in levels and doodads, searched after the user's own.
    #[must_use]
    pub fn with_system_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.system = Some(dir.into());
        self
    }
    /// Create the user directories.
    pub fn init(&self) -> Result<(), Error> {
        for dir in [
            self.levels_dir(),
            self.doodads_dir(),
            self.levelpacks_dir(),
            self.screenshots_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        log::debug!("user directory: {}", self.profile.display());
        Ok(())
    }

    #[must_use]
    pub fn profile(&self) -> &Path {
        &self.profile
    }
    #[must_use]
    pub fn system_dir(&self) -> Option<&Path> {
        self.system.as_deref()
    }
    #[must_use]
    pub fn levels_dir(&self) -> PathBuf {
        self.profile.join("levels")
    }
    #[must_use]
    pub fn doodads_dir(&self) -> PathBuf {
        self.profile.join("doodads")
    }
    #[must_use]
    pub fn levelpacks_dir(&self) -> PathBuf {
        self.profile.join("levelpacks")
    }
    #[must_use]
    pub fn screenshots_dir(&self) -> PathBuf {
        self.profile.join("screenshots")
    }

    /// A bare level name as a path in the user's levels, with the extension added if missing. Names with a
    /// path separator are taken as paths already.
    #[must_use]
    pub fn level_path(&self, name: &str) -> PathBuf {
        resolve(&self.levels_dir(), name, LEVEL_EXTENSION)
    }
    #[must_use]
    pub fn doodad_path(&self, name: &str) -> PathBuf {
        resolve(&self.doodads_dir(), name, DOODAD_EXTENSION)
    }
    #[must_use]
    pub fn levelpack_path(&self, name: &str) -> PathBuf {
        resolve(&self.levelpacks_dir(), name, LEVELPACK_EXTENSION)
    }

    /// Find a level or doodad by name: as given, then in the user's directories, then the system's.
    ///
    /// Names without an extension are tried as a level, then as a doodad.
    pub fn find_file(&self, name: &str) -> Result<PathBuf, Error> {
        let given = Path::new(name);
        if given.is_file() {
            return Ok(given.to_owned());
        }
        let lower = name.to_ascii_lowercase();
        let candidates: Vec<(&str, String)> = if lower.ends_with(LEVEL_EXTENSION) {
            vec![("levels", name.to_owned())]
        } else if lower.ends_with(DOODAD_EXTENSION) {
            vec![("doodads", name.to_owned())]
        } else {
            vec![
                ("levels", format!("{name}{LEVEL_EXTENSION}")),
                ("doodads", format!("{name}{DOODAD_EXTENSION}")),
            ]
        };
        let roots = std::iter::once(self.profile.as_path()).chain(self.system.as_deref());
        for root in roots {
            for (dir, file) in &candidates {
                let path = root.join(dir).join(file);
                if path.is_file() {
                    return Ok(path);
                }
            }
        }
        Err(Error::not_found(format_args!("file {name:?}")))
    }

    /// File names of the user's levels, sorted.
    pub fn list_levels(&self) -> Result<Vec<String>, Error> {
        list(&self.levels_dir(), LEVEL_EXTENSION)
    }
    /// File names of the user's doodads, sorted.
    pub fn list_doodads(&self) -> Result<Vec<String>, Error> {
        list(&self.doodads_dir(), DOODAD_EXTENSION)
    }

    /// Take the screenshot lock, or [`Error::Busy`] if a screenshot is already rendering.
    pub fn screenshot_lock(&self) -> Result<parking_lot::MutexGuard<'_, ()>, Error> {
        self.screenshot_lock.try_lock().ok_or(Error::Busy("screenshot"))
    }
}

fn resolve(dir: &Path, name: &str, extension: &str) -> PathBuf {
    if name.contains(std::path::MAIN_SEPARATOR) || name.contains('/') {
        return PathBuf::from(name);
    }
    if name.to_ascii_lowercase().ends_with(extension) {
        dir.join(name)
    } else {
        dir.join(format!("{name}{extension}"))
    }
}

fn list(dir: &Path, extension: &str) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.to_ascii_lowercase().ends_with(extension) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn paths() {
        let env = Environment::new("/home/me/doodle", Settings::default());
        assert_eq!(env.level_path("castle"), Path::new("/home/me/doodle/levels/castle.level"));
        assert_eq!(env.level_path("castle.LEVEL"), Path::new("/home/me/doodle/levels/castle.LEVEL"));
        assert_eq!(env.doodad_path("door"), Path::new("/home/me/doodle/doodads/door.doodad"));
        assert_eq!(env.level_path("./here/castle"), Path::new("./here/castle"));
    }
    #[test]
    fn init_and_find() {
        let profile = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        let env = Environment::new(profile.path(), Settings::default()).with_system_dir(system.path());
        env.init().unwrap();
        assert!(env.screenshots_dir().is_dir());
        assert!(env.levelpacks_dir().is_dir());

        std::fs::create_dir_all(system.path().join("doodads")).unwrap();
        std::fs::write(system.path().join("doodads/door.doodad"), b"{}").unwrap();
        std::fs::write(env.level_path("door"), b"{}").unwrap();

        // Levels before doodads, user before system.
        assert_eq!(env.find_file("door").unwrap(), env.level_path("door"));
        assert_eq!(
            env.find_file("door.doodad").unwrap(),
            system.path().join("doodads/door.doodad")
        );
        assert!(env.find_file("window").unwrap_err().is_not_found());

        std::fs::write(env.levels_dir().join("notes.txt"), b"").unwrap();
        assert_eq!(env.list_levels().unwrap(), ["door.level"]);
        assert!(env.list_doodads().unwrap().is_empty());
    }
    #[test]
    fn one_screenshot_at_a_time() {
        let env = Environment::new("unused", Settings::default());
        let guard = env.screenshot_lock().unwrap();
        assert_eq!(env.screenshot_lock().unwrap_err().kind(), crate::ErrorKind::Busy);
        drop(guard);
        assert!(env.screenshot_lock().is_ok());
    }
}
