use serde::Serialize;

/// Health check payload returned by the REST API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Simple health service
///
/// Provides a standardised way to check the health status of the patient service.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Patient service is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_health_reports_ok() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert_eq!(res.message, "Patient service is alive");
    }
}
