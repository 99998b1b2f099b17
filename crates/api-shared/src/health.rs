use crate::dto::HealthRes;

/// Simple health service shared by the REST API and the CLI
///
/// Liveness only: it does not touch the upload root or any collaborator.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Returns a `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Media service is alive".into(),
        }
    }
}
