//! Command line arguments of a binary hosting the extension.
use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use snafu::{ResultExt, Snafu};

use crate::{
    actuator::{Actuator, FINALIZER_SUFFIX},
    client::{Client, Store},
    image::{self, ImageVector},
};

/// The environment variable the log filter is read from, see
/// [`initialize_logging`](crate::logging::initialize_logging).
pub const LOG_ENV: &str = "SHOOT_TRAEFIK_LOG";
pub const APP_NAME: &str = "gardener-extension-shoot-traefik";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load the image vector"))]
    LoadImageVector { source: image::Error },
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(long_about = "")]
pub struct RunArguments {
    /// Path of the image vector file listing the images to deploy
    #[arg(long, short = 'i', value_name = "FILE", env = "IMAGEVECTOR_OVERWRITE")]
    pub image_vector: PathBuf,

    /// Name of the field manager for all objects written to the seed
    #[arg(long, env, default_value = FINALIZER_SUFFIX)]
    pub field_manager: String,
}

impl RunArguments {
    pub fn load_image_vector(&self) -> Result<ImageVector, Error> {
        ImageVector::from_file(&self.image_vector).context(LoadImageVectorSnafu)
    }

    /// A store [`Client`] writing with the configured field manager.
    pub fn client(&self, client: kube::Client) -> Client {
        Client::new(client, Some(self.field_manager.clone()))
    }

    /// An [`Actuator`] using `store` and the image vector.
    pub fn actuator<S: Store>(&self, store: S) -> Result<Actuator<S>, Error> {
        let image_vector = self.load_image_vector()?;
        Ok(Actuator::new(store, Arc::new(image_vector)))
    }
}
