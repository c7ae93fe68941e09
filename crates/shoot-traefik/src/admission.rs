//! Admission checks keeping the extension off shoots it is not meant for.
//!
//! Traefik replaces the nginx ingress controller and is only supported for
//! evaluation clusters. [`validate_admission`] is meant to be called by a
//! validating webhook for `Shoot` objects, the actuator repeats the purpose
//! check on every reconcile.
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use snafu::{Snafu, ensure};
use tracing::{debug, instrument};

use crate::{
    actuator::EXTENSION_TYPE,
    crd::{PURPOSE_EVALUATION, Shoot},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "traefik extension can only be enabled for shoots with purpose {PURPOSE_EVALUATION:?}. \
        Current purpose: {purpose}. Traefik acts as a replacement for the nginx ingress controller \
        and is only supported for evaluation clusters"
    ))]
    PurposeNotAllowed { purpose: String },
}

/// Whether a shoot with `purpose` may use the extension.
pub fn is_allowed_context(purpose: Option<&str>) -> bool {
    purpose == Some(PURPOSE_EVALUATION)
}

/// Passes shoots which do not enable the `traefik` extension and shoots
/// with an allowed purpose.
pub fn validate_shoot(shoot: &Shoot) -> Result<()> {
    if !shoot.spec.has_extension(EXTENSION_TYPE) {
        return Ok(());
    }

    let purpose = shoot.spec.purpose.as_deref();
    ensure!(is_allowed_context(purpose), PurposeNotAllowedSnafu {
        purpose: purpose.unwrap_or("nil"),
    });
    Ok(())
}

/// Validates the `Shoot` of an admission request. Requests without an
/// object, e.g. deletions, are allowed.
#[instrument(skip(request), fields(uid = %request.uid, name = %request.name))]
pub fn validate_admission(request: &AdmissionRequest<Shoot>) -> AdmissionResponse {
    let response = AdmissionResponse::from(request);

    let Some(shoot) = &request.object else {
        return response;
    };

    match validate_shoot(shoot) {
        Ok(()) => response,
        Err(err) => {
            debug!(error = &err as &dyn std::error::Error, "denying shoot");
            response.deny(err.to_string())
        }
    }
}
