//! Filesystem destination for rendered pages.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    application::build::PageWriter,
    infra::assets::{copy_extra_assets, install_theme, link_assets, link_root_entry},
};

/// Writes pages below an output root. The theme and extra assets are
/// installed once, before the first page lands.
#[derive(Debug, Clone)]
pub struct FsPageWriter {
    root: PathBuf,
    extra_theme: Option<PathBuf>,
    extra_assets: Vec<PathBuf>,
    installed: bool,
    /// Extra asset names copied into the root, linked into nested page directories.
    linked: Vec<String>,
}

impl FsPageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extra_theme: None,
            extra_assets: Vec::new(),
            installed: false,
            linked: Vec::new(),
        }
    }

    pub fn with_theme(mut self, extra_theme: Option<PathBuf>) -> Self {
        self.extra_theme = extra_theme;
        self
    }

    pub fn with_assets(mut self, extra_assets: Vec<PathBuf>) -> Self {
        self.extra_assets = extra_assets;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn install(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        install_theme(&self.root, self.extra_theme.as_deref())?;
        self.linked = copy_extra_assets(&self.root, &self.extra_assets)?;
        self.installed = true;
        Ok(())
    }
}

impl PageWriter for FsPageWriter {
    fn write_page(&mut self, reference: &str, markup: &str) -> io::Result<PathBuf> {
        if !self.installed {
            self.install()?;
        }

        let relative = Path::new(reference);
        if let Some(dir) = relative.parent() {
            fs::create_dir_all(self.root.join(dir))?;
            link_assets(&self.root, dir)?;
            for name in &self.linked {
                link_root_entry(&self.root, dir, name)?;
            }
        }

        let path = self.root.join(relative);
        fs::write(&path, markup)?;
        debug!(path = %path.display(), bytes = markup.len(), "page file written");
        Ok(path)
    }
}
