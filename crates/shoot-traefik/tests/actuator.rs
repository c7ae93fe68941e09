use std::sync::Arc;

use indoc::{formatdoc, indoc};
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::Secret,
    networking::v1::IngressClass,
    rbac::v1::ClusterRole,
};
use shoot_traefik::{
    actuator::{Actuator, Target},
    bundle::Fingerprint,
    client::{MemoryStore, Operation, Store},
    converge::MANAGED_RESOURCE_NAME,
    crd::{Extension, ManagedResource, Shoot},
    image::ImageVector,
    kvp::DATA_CHECKSUM_ANNOTATION,
    resources::{CLUSTER_ROLE_KEY, DEPLOYMENT_KEY, INGRESS_CLASS_KEY},
};

const NAMESPACE: &str = "shoot--dev--test";

fn actuator() -> Actuator<MemoryStore> {
    let image_vector = ImageVector::from_yaml(indoc! {"
        images:
        - name: traefik
          sourceRepository: github.com/traefik/traefik
          repository: docker.io/library/traefik
          tag: v3.6.7
    "})
    .expect("image vector must parse");

    Actuator::new(MemoryStore::new(), Arc::new(image_vector))
}

fn shoot() -> Shoot {
    serde_yaml::from_str(indoc! {"
        apiVersion: core.gardener.cloud/v1beta1
        kind: Shoot
        metadata:
          name: test
          namespace: garden-dev
        spec:
          purpose: evaluation
          extensions:
          - type: traefik
    "})
    .expect("shoot must parse")
}

fn extension(replicas: u16) -> Extension {
    serde_yaml::from_str(&formatdoc! {"
        apiVersion: extensions.gardener.cloud/v1alpha1
        kind: Extension
        metadata:
          name: traefik
          namespace: {NAMESPACE}
        spec:
          type: traefik
          providerConfig:
            apiVersion: traefik.extensions.gardener.cloud/v1alpha1
            kind: TraefikConfig
            spec:
              replicas: {replicas}
              ingressClass: nginx
              ingressProvider: KubernetesIngressNGINX
    "})
    .expect("extension must parse")
}

async fn bundle_secret(store: &MemoryStore) -> Secret {
    store
        .get(NAMESPACE, MANAGED_RESOURCE_NAME)
        .await
        .expect("bundle secret must exist")
}

fn entry<T: serde::de::DeserializeOwned>(secret: &Secret, key: &str) -> T {
    let data = secret.data.as_ref().expect("secret must have data");
    let value = data.get(key).expect("bundle entry must exist");
    serde_yaml::from_slice(&value.0).expect("bundle entry must deserialize")
}

#[tokio::test]
async fn reconcile_deploys_compatibility_mode() {
    let actuator = actuator();

    actuator
        .reconcile_extension(&extension(3), &shoot())
        .await
        .expect("reconcile must succeed");

    let secret = bundle_secret(actuator.store()).await;
    let checksum = secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(DATA_CHECKSUM_ANNOTATION))
        .expect("checksum annotation must be set");
    assert_eq!(
        checksum,
        Fingerprint::of_secret_data(secret.data.as_ref().expect("secret must have data")).as_str()
    );

    let deployment: Deployment = entry(&secret, DEPLOYMENT_KEY);
    let spec = deployment.spec.expect("deployment must have a spec");
    assert_eq!(spec.replicas, Some(3));
    let pod = spec.template.spec.expect("pod spec must be set");
    let container = &pod.containers[0];
    assert_eq!(
        container.image.as_deref(),
        Some("docker.io/library/traefik:v3.6.7")
    );
    let args = container.args.clone().unwrap_or_default();
    assert!(args.contains(&"--providers.kubernetesingressnginx.ingressclass=nginx".to_owned()));
    assert!(!args.contains(&"--providers.kubernetesingress=true".to_owned()));

    let role: ClusterRole = entry(&secret, CLUSTER_ROLE_KEY);
    assert!(role.rules.unwrap_or_default().iter().any(|rule| {
        rule.resources
            .as_ref()
            .is_some_and(|resources| resources.iter().any(|resource| resource == "namespaces"))
    }));

    let ingress_class: IngressClass = entry(&secret, INGRESS_CLASS_KEY);
    assert_eq!(ingress_class.metadata.name.as_deref(), Some("nginx"));

    assert!(actuator
        .store()
        .contains::<ManagedResource>(NAMESPACE, MANAGED_RESOURCE_NAME));
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let actuator = actuator();
    actuator
        .reconcile_extension(&extension(3), &shoot())
        .await
        .expect("first reconcile must succeed");
    let before = bundle_secret(actuator.store()).await;
    actuator.store().clear_operations();

    actuator
        .reconcile_extension(&extension(3), &shoot())
        .await
        .expect("second reconcile must succeed");

    assert_eq!(bundle_secret(actuator.store()).await, before);
    assert!(
        actuator
            .store()
            .operations()
            .iter()
            .all(|op| op.operation != Operation::Update)
    );
}

#[tokio::test]
async fn changed_provider_config_updates_bundle() {
    let actuator = actuator();
    actuator
        .reconcile_extension(&extension(3), &shoot())
        .await
        .expect("first reconcile must succeed");
    let before = bundle_secret(actuator.store()).await;

    actuator
        .reconcile_extension(&extension(5), &shoot())
        .await
        .expect("second reconcile must succeed");

    let after = bundle_secret(actuator.store()).await;
    assert_ne!(
        before.metadata.annotations.as_ref().and_then(|a| a.get(DATA_CHECKSUM_ANNOTATION)),
        after.metadata.annotations.as_ref().and_then(|a| a.get(DATA_CHECKSUM_ANNOTATION))
    );
    let deployment: Deployment = entry(&after, DEPLOYMENT_KEY);
    assert_eq!(deployment.spec.and_then(|spec| spec.replicas), Some(5));
}

#[tokio::test]
async fn delete_is_repeatable() {
    let actuator = actuator();
    let target = Target::from_shoot(NAMESPACE, &shoot());

    actuator
        .delete(&target)
        .await
        .expect("delete of nothing must succeed");

    actuator
        .reconcile(&target, None)
        .await
        .expect("reconcile must succeed");
    actuator.delete(&target).await.expect("delete must succeed");
    actuator
        .force_delete(&target)
        .await
        .expect("force delete must succeed");

    assert!(actuator.store().is_empty());
}
