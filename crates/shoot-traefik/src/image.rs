//! Resolution of container images from an image vector.
//!
//! The image vector is the YAML document shipped with the extension which
//! lists the images it deploys:
//!
//! ```yaml
//! images:
//!   - name: traefik
//!     sourceRepository: github.com/traefik/traefik
//!     repository: docker.io/library/traefik
//!     tag: v3.6.7
//! ```
use std::{fmt::Display, path::Path};

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu};

/// The image vector name of the Traefik image.
pub const TRAEFIK_IMAGE_NAME: &str = "traefik";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("image {name:?} not found in image vector"))]
    ImageNotFound { name: String },

    #[snafu(display("image {name:?} has no repository"))]
    MissingRepository { name: String },

    #[snafu(display("failed to read image vector from {path:?}"))]
    ReadImageVector {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to parse image vector"))]
    ParseImageVector { source: serde_yaml::Error },
}

/// Looks up container images by name.
pub trait ImageResolver: Send + Sync {
    fn find_image(&self, name: &str) -> Result<ImageReference>;
}

/// A fully qualified reference to a container image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(digest) = &self.digest {
            return write!(f, "@{digest}");
        }
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// A list of named [`ImageSource`]s.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ImageVector {
    #[serde(default)]
    pub images: Vec<ImageSource>,
}

impl ImageVector {
    pub fn new(images: impl IntoIterator<Item = ImageSource>) -> Self {
        Self {
            images: images.into_iter().collect(),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context(ParseImageVectorSnafu)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).context(ReadImageVectorSnafu { path })?;
        Self::from_yaml(&yaml)
    }
}

impl ImageResolver for ImageVector {
    fn find_image(&self, name: &str) -> Result<ImageReference> {
        let source = self
            .images
            .iter()
            .find(|image| image.name == name)
            .context(ImageNotFoundSnafu { name })?;

        let repository = source
            .repository
            .clone()
            .context(MissingRepositorySnafu { name })?;

        Ok(ImageReference {
            repository,
            tag: source.tag.clone(),
            digest: source.digest.clone(),
        })
    }
}
