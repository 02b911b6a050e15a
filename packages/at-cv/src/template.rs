use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::GrayImage;
use parking_lot::Mutex;
use tracing::debug;

use crate::{MatchError, MatchResult, luma::rgba_to_luma};

/// A grayscale reference image loaded from disk.
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    image: GrayImage,
}

impl Template {
    /// Load and convert to grayscale with the same weights used for captures.
    pub fn load(path: impl AsRef<Path>) -> MatchResult<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| MatchError::TemplateLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            image: rgba_to_luma(&image.to_rgba8()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Templates cached by path, loaded on first use.
///
/// Templates are treated as immutable: edits to a file after it was loaded
/// are not picked up until [`TemplateStore::clear`].
#[derive(Default)]
pub struct TemplateStore {
    cache: Mutex<HashMap<PathBuf, Arc<Template>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> MatchResult<Arc<Template>> {
        let path = path.as_ref();
        let mut cache = self.cache.lock();
        if let Some(template) = cache.get(path) {
            return Ok(Arc::clone(template));
        }
        let template = Arc::new(Template::load(path)?);
        debug!(
            "[TemplateStore] loaded {} ({}x{})",
            path.display(),
            template.width(),
            template.height()
        );
        cache.insert(path.to_path_buf(), Arc::clone(&template));
        Ok(template)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}
