use k8s_openapi::api::{
    core::v1::ServiceAccount,
    rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject},
};

use crate::{
    builder::meta::ObjectMetaBuilder,
    kvp,
    resources::{CLUSTER_ROLE_NAME, NAMESPACE, SERVICE_ACCOUNT_NAME},
    variant::{ProviderPolicy, read_verbs},
};

pub fn service_account() -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMetaBuilder::new()
            .name(SERVICE_ACCOUNT_NAME)
            .namespace(NAMESPACE)
            .with_labels(kvp::component_labels())
            .build(),
        ..ServiceAccount::default()
    }
}

/// The ClusterRole grants read access to everything Traefik routes to, plus
/// the [`ProviderPolicy::extra_rules`] of the configured provider.
pub fn cluster_role(policy: &ProviderPolicy) -> ClusterRole {
    let mut rules = base_rules();
    rules.extend(policy.extra_rules.iter().cloned());

    ClusterRole {
        metadata: ObjectMetaBuilder::new()
            .name(CLUSTER_ROLE_NAME)
            .with_labels(kvp::recommended_labels())
            .build(),
        rules: Some(rules),
        ..ClusterRole::default()
    }
}

pub fn cluster_role_binding() -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMetaBuilder::new()
            .name(CLUSTER_ROLE_NAME)
            .with_labels(kvp::recommended_labels())
            .build(),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_owned(),
            kind: "ClusterRole".to_owned(),
            name: CLUSTER_ROLE_NAME.to_owned(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_owned(),
            name: SERVICE_ACCOUNT_NAME.to_owned(),
            namespace: Some(NAMESPACE.to_owned()),
            ..Subject::default()
        }]),
    }
}

fn base_rules() -> Vec<PolicyRule> {
    vec![
        rule(&[""], &["services", "endpoints", "secrets", "nodes"], read_verbs()),
        rule(&["discovery.k8s.io"], &["endpointslices"], read_verbs()),
        rule(
            &["extensions", "networking.k8s.io"],
            &["ingresses", "ingressclasses"],
            read_verbs(),
        ),
        rule(
            &["extensions", "networking.k8s.io"],
            &["ingresses/status"],
            vec!["update".to_owned()],
        ),
        rule(&["traefik.io"], &["*"], read_verbs()),
    ]
}

fn rule(api_groups: &[&str], resources: &[&str], verbs: Vec<String>) -> PolicyRule {
    PolicyRule {
        api_groups: Some(api_groups.iter().map(|g| (*g).to_owned()).collect()),
        resources: Some(resources.iter().map(|r| (*r).to_owned()).collect()),
        verbs,
        ..PolicyRule::default()
    }
}
