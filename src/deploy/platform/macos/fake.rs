//! Text-file stand-ins for Mach-O binaries, used by unit tests.
//!
//! A fake binary is a text file whose first line is `fake-macho`, followed by
//! `arch`, `id` and `lib` lines. Because the description lives in the file it
//! survives being copied into a bundle, like a real binary would.

use super::MachOTools;
use crate::deploy::{Error, Result};
use std::path::Path;

const MAGIC: &str = "fake-macho";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FakeBinary {
    pub archs: Vec<String>,
    pub id: Option<String>,
    pub libs: Vec<String>,
}

impl FakeBinary {
    pub fn new(archs: &[&str], id: Option<&str>, libs: &[&str]) -> Self {
        Self {
            archs: archs.iter().map(|s| s.to_string()).collect(),
            id: id.map(str::to_string),
            libs: libs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn write(&self, path: &Path) {
        let mut text = String::from(MAGIC);
        for arch in &self.archs {
            text.push_str(&format!("\narch {arch}"));
        }
        if let Some(id) = &self.id {
            text.push_str(&format!("\nid {id}"));
        }
        for lib in &self.libs {
            text.push_str(&format!("\nlib {lib}"));
        }
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    pub fn read(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        let mut lines = text.lines();
        if lines.next()? != MAGIC {
            return None;
        }
        let mut binary = Self::default();
        for line in lines {
            match line.split_once(' ') {
                Some(("arch", v)) => binary.archs.push(v.into()),
                Some(("id", v)) => binary.id = Some(v.into()),
                Some(("lib", v)) => binary.libs.push(v.into()),
                _ => {}
            }
        }
        Some(binary)
    }
}

/// [`MachOTools`] over fake binaries.
///
/// `fail_rewrites` makes every rewrite fail, as a broken `install_name_tool` would.
/// `unavailable` fails the preflight check, as a missing one would.
#[derive(Debug, Default)]
pub struct FakeTools {
    pub fail_rewrites: bool,
    pub unavailable: bool,
}

impl FakeTools {
    fn rewrite(&self, binary: &Path, f: impl FnOnce(&mut FakeBinary)) -> Result<()> {
        let Some(mut fake) = FakeBinary::read(binary) else {
            return Err(Error::CommandFailed {
                command: format!("install_name_tool {}", binary.display()),
                status: "exit status: 1".into(),
                stderr: "not a Mach-O file".into(),
            });
        };
        if self.fail_rewrites {
            return Err(Error::CommandFailed {
                command: format!("install_name_tool {}", binary.display()),
                status: "exit status: 1".into(),
                stderr: "simulated failure".into(),
            });
        }
        f(&mut fake);
        fake.write(binary);
        Ok(())
    }
}

impl MachOTools for FakeTools {
    fn preflight(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::Configuration("install_name_tool not found".into()));
        }
        Ok(())
    }

    async fn architectures(&self, binary: &Path) -> Result<Vec<String>> {
        Ok(FakeBinary::read(binary).map(|b| b.archs).unwrap_or_default())
    }

    async fn linked_libraries(&self, binary: &Path) -> Result<Vec<String>> {
        Ok(FakeBinary::read(binary).map(|b| b.libs).unwrap_or_default())
    }

    async fn identity(&self, binary: &Path) -> Result<Option<String>> {
        Ok(FakeBinary::read(binary).and_then(|b| b.id))
    }

    async fn change_reference(&self, binary: &Path, old: &str, new: &str) -> Result<()> {
        self.rewrite(binary, |fake| {
            for lib in fake.libs.iter_mut().filter(|l| l.as_str() == old) {
                *lib = new.to_string();
            }
        })
    }

    async fn change_identity(&self, binary: &Path, new: &str) -> Result<()> {
        self.rewrite(binary, |fake| fake.id = Some(new.to_string()))
    }
}
