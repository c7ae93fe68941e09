use std::{collections::BTreeMap, time::Duration};

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            Capabilities, PodSecurityContext, PodSpec, PodTemplateSpec, Probe,
            ResourceRequirements, SecurityContext, TopologySpreadConstraint,
        },
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::LabelSelector},
};

use crate::{
    builder::{
        meta::ObjectMetaBuilder,
        pod::{ContainerBuilder, ProbeBuilder},
    },
    config::ResolvedConfig,
    kvp,
    resources::{DEPLOYMENT_NAME, NAMESPACE, SERVICE_ACCOUNT_NAME},
    variant::ProviderPolicy,
};

pub const CONTAINER_NAME: &str = "traefik";

pub const WEB_PORT_NAME: &str = "web";
pub const WEB_PORT: u16 = 8000;
pub const WEBSECURE_PORT_NAME: &str = "websecure";
pub const WEBSECURE_PORT: u16 = 8443;
pub const METRICS_PORT_NAME: &str = "metrics";
pub const METRICS_PORT: u16 = 9100;

const PING_PATH: &str = "/ping";
const NON_ROOT_ID: i64 = 65532;

/// The arguments every Traefik container runs with, independent of the
/// ingress provider.
pub fn baseline_args() -> Vec<String> {
    [
        "--api.insecure=false",
        "--api.dashboard=false",
        "--ping=true",
        "--ping.entrypoint=web",
        "--metrics.prometheus=true",
        "--metrics.prometheus.entrypoint=metrics",
    ]
    .into_iter()
    .map(String::from)
    .chain([
        format!("--entrypoints.web.address=:{WEB_PORT}"),
        format!("--entrypoints.websecure.address=:{WEBSECURE_PORT}"),
        format!("--entrypoints.metrics.address=:{METRICS_PORT}"),
        "--log.level=INFO".to_owned(),
    ])
    .collect()
}

pub fn deployment(config: &ResolvedConfig, image: &str, policy: &ProviderPolicy) -> Deployment {
    let labels = kvp::workload_labels();

    let mut args = baseline_args();
    args.extend(policy.args.iter().cloned());

    let container = ContainerBuilder::new(CONTAINER_NAME)
        .image(image)
        .args(args)
        .add_container_port(WEB_PORT_NAME, WEB_PORT.into())
        .add_container_port(WEBSECURE_PORT_NAME, WEBSECURE_PORT.into())
        .add_container_port(METRICS_PORT_NAME, METRICS_PORT.into())
        // Allow up to 60 seconds for startup
        .startup_probe(ping_probe(
            Duration::from_secs(5),
            Duration::from_secs(3),
            12,
            Some(Duration::from_secs(5)),
        ))
        .liveness_probe(ping_probe(
            Duration::from_secs(10),
            Duration::from_secs(5),
            3,
            None,
        ))
        .readiness_probe(ping_probe(
            Duration::from_secs(5),
            Duration::from_secs(3),
            3,
            None,
        ))
        .resources(resources())
        .security_context(SecurityContext {
            allow_privilege_escalation: Some(false),
            read_only_root_filesystem: Some(true),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_owned()]),
                ..Capabilities::default()
            }),
            ..SecurityContext::default()
        })
        .add_env_var("KUBERNETES_SERVICE_HOST", "kubernetes.default.svc.cluster.local")
        .add_env_var("KUBERNETES_SERVICE_PORT", "443")
        .build();

    Deployment {
        metadata: ObjectMetaBuilder::new()
            .name(DEPLOYMENT_NAME)
            .namespace(NAMESPACE)
            .with_labels(labels.clone())
            .build(),
        spec: Some(DeploymentSpec {
            // Resolved replicas always come from a positive i32.
            replicas: Some(i32::try_from(config.replicas.get()).unwrap_or(i32::MAX)),
            selector: selector(),
            template: PodTemplateSpec {
                metadata: Some(
                    ObjectMetaBuilder::new()
                        .with_labels(labels)
                        .with_annotation(kvp::PROMETHEUS_SCRAPE_ANNOTATION, "true")
                        .with_annotation(
                            kvp::PROMETHEUS_PORT_ANNOTATION,
                            METRICS_PORT.to_string(),
                        )
                        .build(),
                ),
                spec: Some(PodSpec {
                    service_account_name: Some(SERVICE_ACCOUNT_NAME.to_owned()),
                    security_context: Some(PodSecurityContext {
                        run_as_non_root: Some(true),
                        run_as_user: Some(NON_ROOT_ID),
                        run_as_group: Some(NON_ROOT_ID),
                        fs_group: Some(NON_ROOT_ID),
                        ..PodSecurityContext::default()
                    }),
                    containers: vec![container],
                    topology_spread_constraints: Some(vec![TopologySpreadConstraint {
                        max_skew: 1,
                        topology_key: "kubernetes.io/hostname".to_owned(),
                        when_unsatisfiable: "ScheduleAnyway".to_owned(),
                        label_selector: Some(selector()),
                        ..TopologySpreadConstraint::default()
                    }]),
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

pub(crate) fn selector() -> LabelSelector {
    LabelSelector {
        match_labels: Some(kvp::selector_labels()),
        ..LabelSelector::default()
    }
}

fn ping_probe(
    period: Duration,
    timeout: Duration,
    failure_threshold: i32,
    initial_delay: Option<Duration>,
) -> Probe {
    ProbeBuilder::new()
        .with_http_get_action_helper(WEB_PORT, PING_PATH)
        .with_period(period)
        .with_timeout(timeout)
        .with_failure_threshold(failure_threshold)
        .with_initial_delay(initial_delay.unwrap_or_default())
        .build()
}

fn resources() -> ResourceRequirements {
    let quantities = |cpu: &str, memory: &str| {
        BTreeMap::from([
            ("cpu".to_owned(), Quantity(cpu.to_owned())),
            ("memory".to_owned(), Quantity(memory.to_owned())),
        ])
    };

    ResourceRequirements {
        requests: Some(quantities("100m", "128Mi")),
        limits: Some(quantities("500m", "512Mi")),
        ..ResourceRequirements::default()
    }
}
