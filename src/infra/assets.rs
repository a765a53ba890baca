//! Theme assets: the embedded default theme plus optional on-disk extras.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use include_dir::{Dir, include_dir};
use tracing::debug;
use walkdir::WalkDir;

static DEFAULT_THEME: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static/theme");

/// Directory below the output root holding every theme asset.
pub const ASSETS_DIR: &str = "assets";

/// Scripts and stylesheets an extra theme contributes, by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeListing {
    pub scripts: Vec<String>,
    pub stylesheets: Vec<String>,
}

/// List `js/*.js` and `css/*.css` of an extra theme, sorted by name.
pub fn discover_theme(extra_theme: Option<&Path>) -> io::Result<ThemeListing> {
    let Some(theme) = extra_theme else {
        return Ok(ThemeListing::default());
    };

    Ok(ThemeListing {
        scripts: list_files(&theme.join("js"), "js")?,
        stylesheets: list_files(&theme.join("css"), "css")?,
    })
}

fn list_files(dir: &Path, extension: &str) -> io::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(extension)
            && let Some(name) = path.file_name().and_then(|name| name.to_str())
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Write the embedded theme, then the extra theme over it, into
/// `<output_root>/assets`.
pub fn install_theme(output_root: &Path, extra_theme: Option<&Path>) -> io::Result<PathBuf> {
    let assets = output_root.join(ASSETS_DIR);
    fs::create_dir_all(&assets)?;
    write_embedded(&DEFAULT_THEME, &assets)?;

    if let Some(theme) = extra_theme {
        copy_tree(theme, &assets)?;
    }

    debug!(path = %assets.display(), "theme assets installed");
    Ok(assets)
}

fn write_embedded(dir: &Dir<'_>, target: &Path) -> io::Result<()> {
    for file in dir.files() {
        let dest = target.join(file.path());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, file.contents())?;
    }
    for sub in dir.dirs() {
        write_embedded(sub, target)?;
    }
    Ok(())
}

/// Copy every extra asset directory (or file) into the output root under
/// its own name. Returns the names it was copied under.
pub fn copy_extra_assets(output_root: &Path, extra_assets: &[PathBuf]) -> io::Result<Vec<String>> {
    let mut names = Vec::with_capacity(extra_assets.len());
    for source in extra_assets {
        let Some(name) = source.file_name() else {
            continue;
        };
        let dest = output_root.join(name);
        if source.is_dir() {
            copy_tree(source, &dest)?;
        } else {
            fs::copy(source, &dest)?;
        }
        names.push(name.to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Recursively copy `source` into `target`, following symlinks.
pub fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| io::Error::other(err.to_string()))?;
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// Make `<output_root>/assets` reachable as `assets` from a nested page
/// directory. The root directory itself needs nothing.
pub fn link_assets(output_root: &Path, page_dir: &Path) -> io::Result<()> {
    link_root_entry(output_root, page_dir, ASSETS_DIR)
}

/// Make the output root entry `name` reachable under the same name from a
/// nested page directory.
pub fn link_root_entry(output_root: &Path, page_dir: &Path, name: &str) -> io::Result<()> {
    if page_dir.as_os_str().is_empty() {
        return Ok(());
    }

    let link = output_root.join(page_dir).join(name);
    if link.symlink_metadata().is_ok() {
        return Ok(());
    }
    fs::create_dir_all(output_root.join(page_dir))?;

    let depth = page_dir.components().count();
    let mut target = PathBuf::new();
    for _ in 0..depth {
        target.push("..");
    }
    target.push(name);

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, &link)
    }
    #[cfg(not(unix))]
    {
        let source = output_root.join(name);
        if source.is_dir() {
            copy_tree(&source, &link)
        } else {
            fs::copy(&source, &link).map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_theme_is_installed() {
        let out = tempfile::tempdir().expect("tempdir");
        let assets = install_theme(out.path(), None).expect("installed");

        assert!(assets.join("css/docweave.css").is_file());
        assert!(assets.join("js/anchors.js").is_file());
        assert!(assets.join("js/css.escape.js").is_file());
    }

    #[test]
    fn extra_theme_files_are_listed_and_copied() {
        let theme = tempfile::tempdir().expect("theme");
        fs::create_dir_all(theme.path().join("js")).expect("js dir");
        fs::create_dir_all(theme.path().join("css")).expect("css dir");
        fs::write(theme.path().join("js/search.js"), "//").expect("write");
        fs::write(theme.path().join("js/notes.txt"), "-").expect("write");
        fs::write(theme.path().join("css/dark.css"), "body{}").expect("write");

        let listing = discover_theme(Some(theme.path())).expect("listed");
        assert_eq!(listing.scripts, vec!["search.js".to_string()]);
        assert_eq!(listing.stylesheets, vec!["dark.css".to_string()]);

        let out = tempfile::tempdir().expect("out");
        install_theme(out.path(), Some(theme.path())).expect("installed");
        assert!(out.path().join("assets/js/search.js").is_file());
        assert!(out.path().join("assets/css/docweave.css").is_file());
    }

    #[test]
    fn nested_page_directories_reach_the_shared_assets() {
        let out = tempfile::tempdir().expect("out");
        install_theme(out.path(), None).expect("installed");

        link_assets(out.path(), Path::new("api/widgets")).expect("linked");
        link_assets(out.path(), Path::new("api/widgets")).expect("idempotent");

        assert!(
            out.path()
                .join("api/widgets/assets/css/docweave.css")
                .is_file()
        );
    }

    #[test]
    fn extra_assets_land_in_the_output_root() {
        let source = tempfile::tempdir().expect("source");
        let images = source.path().join("images");
        fs::create_dir_all(&images).expect("images");
        fs::write(images.join("logo.png"), b"png").expect("write");

        let out = tempfile::tempdir().expect("out");
        let names = copy_extra_assets(out.path(), &[images]).expect("copied");

        assert_eq!(names, vec!["images".to_string()]);
        assert!(out.path().join("images/logo.png").is_file());

        link_root_entry(out.path(), Path::new("api"), "images").expect("linked");
        assert!(out.path().join("api/images/logo.png").is_file());
    }
}
