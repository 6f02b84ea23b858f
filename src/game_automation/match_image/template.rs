//! Named template images, held in both color and intensity form

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateLoadError {
    #[error("Template directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read template directory {}: {description}", path.display())]
    DirectoryUnreadable { path: PathBuf, description: String },
}

/// One template. Both variants always share the same dimensions.
#[derive(Debug, Clone)]
pub struct Template {
    pub key: String,
    pub color: RgbImage,
    pub gray: GrayImage,
}

impl Template {
    pub fn from_image(key: impl Into<String>, image: &DynamicImage) -> Self {
        Self {
            key: key.into(),
            color: image.to_rgb8(),
            gray: image.to_luma8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }
}

/// Templates keyed by file stem.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: HashMap<String, Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every decodable image directly inside `directory` (no recursion).
    ///
    /// Files whose extension `image` does not recognise are ignored and files
    /// that fail to decode are skipped. Returns how many templates were loaded
    /// by this call.
    pub fn load(&mut self, directory: &Path) -> Result<usize, TemplateLoadError> {
        if !directory.is_dir() {
            return Err(TemplateLoadError::DirectoryNotFound {
                path: directory.to_path_buf(),
            });
        }

        let entries =
            std::fs::read_dir(directory).map_err(|e| TemplateLoadError::DirectoryUnreadable {
                path: directory.to_path_buf(),
                description: e.to_string(),
            })?;

        // Sorted so duplicate stems resolve the same way on every platform
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match image::open(&path) {
                Ok(image) => {
                    self.insert(key, image);
                    loaded += 1;
                }
                Err(e) => log::debug!("Skipping template {}: {e}", path.display()),
            }
        }

        log::debug!("Loaded {loaded} templates from {}", directory.display());
        Ok(loaded)
    }

    /// Normalize and store one template, replacing any previous one with the
    /// same key.
    pub fn insert(&mut self, key: impl Into<String>, image: DynamicImage) {
        let template = Template::from_image(key, &image);
        self.templates.insert(template.key.clone(), template);
    }

    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Check that the templates a state is about to use are present. Missing
    /// names are logged, nothing is loaded or changed.
    pub fn warmup(&self, names: &[&str]) -> usize {
        let mut present = 0;
        for name in names {
            if self.contains(name) {
                present += 1;
            } else {
                log::debug!("Template '{name}' not loaded");
            }
        }
        present
    }
}
