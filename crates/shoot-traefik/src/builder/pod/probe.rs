use std::time::Duration;

use k8s_openapi::{
    api::core::v1::{HTTPGetAction, Probe},
    apimachinery::pkg::util::intstr::IntOrString,
};

/// A builder for [`Probe`]s. The action and the period are mandatory and
/// tracked in the type parameters.
#[derive(Debug)]
pub struct ProbeBuilder<Action, Period> {
    action: Action,
    period: Period,

    failure_threshold: i32,
    timeout: Duration,
    initial_delay: Duration,
}

impl Default for ProbeBuilder<(), ()> {
    fn default() -> Self {
        Self {
            action: (),
            period: (),
            // The following values match the Kubernetes default
            failure_threshold: 3,
            timeout: Duration::from_secs(1),
            initial_delay: Duration::from_secs(0),
        }
    }
}

impl<Period> ProbeBuilder<(), Period> {
    /// This probe action does an HTTP GET request to `path` on the given port.
    pub fn with_http_get_action_helper(
        self,
        port: u16,
        path: impl Into<String>,
    ) -> ProbeBuilder<HTTPGetAction, Period> {
        let Self {
            action: (),
            period,
            failure_threshold,
            timeout,
            initial_delay,
        } = self;

        ProbeBuilder {
            action: HTTPGetAction {
                path: Some(path.into()),
                port: IntOrString::Int(port.into()),
                ..HTTPGetAction::default()
            },
            period,
            failure_threshold,
            timeout,
            initial_delay,
        }
    }
}

impl ProbeBuilder<HTTPGetAction, ()> {
    /// The period/interval in which the probe should be executed.
    pub fn with_period(self, period: Duration) -> ProbeBuilder<HTTPGetAction, Duration> {
        let Self {
            action,
            period: (),
            failure_threshold,
            timeout,
            initial_delay,
        } = self;

        ProbeBuilder {
            action,
            period,
            failure_threshold,
            timeout,
            initial_delay,
        }
    }
}

impl ProbeBuilder<HTTPGetAction, Duration> {
    /// How often the probe must fail before being considered failed.
    pub fn with_failure_threshold(mut self, failure_threshold: i32) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn build(self) -> Probe {
        Probe {
            http_get: Some(self.action),
            period_seconds: Some(seconds(self.period)),
            failure_threshold: Some(self.failure_threshold),
            timeout_seconds: Some(seconds(self.timeout)),
            initial_delay_seconds: (!self.initial_delay.is_zero())
                .then(|| seconds(self.initial_delay)),
            ..Probe::default()
        }
    }
}

impl ProbeBuilder<(), ()> {
    pub fn new() -> Self {
        Self::default()
    }
}

// Probe timings are a few seconds, saturating is fine.
fn seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_probe() {
        let probe = ProbeBuilder::new()
            .with_http_get_action_helper(8000, "/ping")
            .with_period(Duration::from_secs(5))
            .with_initial_delay(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(3))
            .with_failure_threshold(12)
            .build();

        assert_eq!(
            probe,
            Probe {
                http_get: Some(HTTPGetAction {
                    path: Some("/ping".to_owned()),
                    port: IntOrString::Int(8000),
                    ..HTTPGetAction::default()
                }),
                initial_delay_seconds: Some(5),
                period_seconds: Some(5),
                timeout_seconds: Some(3),
                failure_threshold: Some(12),
                ..Probe::default()
            }
        );
    }

    #[test]
    fn zero_initial_delay_is_omitted() {
        let probe = ProbeBuilder::new()
            .with_http_get_action_helper(8000, "/ping")
            .with_period(Duration::from_secs(10))
            .build();

        assert_eq!(probe.initial_delay_seconds, None);
        assert_eq!(probe.failure_threshold, Some(3));
        assert_eq!(probe.timeout_seconds, Some(1));
    }
}
