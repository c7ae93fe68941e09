//! OpenTelemetry instruments of the extension.
//!
//! The instruments are created from the global meter unless a [`Meter`] is
//! passed explicitly. A hosting binary which never installs a meter provider
//! records into the no-op provider.
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Meter},
};

use crate::actuator::Operation;

pub const METER_NAME: &str = "gardener-extension-shoot-traefik";

/// Counts every actuator call, labelled with `cluster` and `operation`.
pub const OPERATIONS_TOTAL: &str = "shoot_traefik_actuator_operations_total";

/// The instruments of an [`Actuator`](crate::actuator::Actuator).
#[derive(Clone)]
pub struct ActuatorMetrics {
    operations_total: Counter<u64>,
}

impl ActuatorMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            operations_total: meter
                .u64_counter(OPERATIONS_TOTAL)
                .with_description("Total number of operations performed by the actuator")
                .with_unit("{operations}")
                .build(),
        }
    }

    /// Records one `operation` for the shoot whose control plane lives in
    /// `namespace`.
    pub fn record_operation(&self, namespace: &str, operation: Operation) {
        self.operations_total.add(1, &[
            KeyValue::new("cluster", namespace.to_owned()),
            KeyValue::new("operation", operation.as_ref().to_owned()),
        ]);
    }
}

impl Default for ActuatorMetrics {
    fn default() -> Self {
        Self::new(&global::meter(METER_NAME))
    }
}
