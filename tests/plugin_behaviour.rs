//! Behavioural tests for the Deadline plugin surface driven through the
//! in-memory provider.

#[path = "common/test_constants.rs"]
mod test_constants;

use std::collections::BTreeSet;

use qarnot_deadline::test_support::{FAKE_CLUSTER, FakeConnector, FakeProvider, fake_credentials};
use qarnot_deadline::{
    CredentialError, Credentials, DeadlinePlugin, EnvironmentSettings, FailureKind, Instance,
    InstanceStatus, LifecycleOptions, PluginConfig, PluginError,
};
use rstest::{fixture, rstest};

use test_constants::{FOREIGN_PROFILE, LINUX_PROFILE};

#[fixture]
fn environment() -> EnvironmentSettings {
    EnvironmentSettings {
        repository: String::from("/mnt/deadline/repo"),
        ssl: String::from("true"),
        license_mode: String::from("LicenseFree"),
        license_server: String::from("27008@licence"),
        proxy_certificate: String::from("-----BEGIN-----\nabc\n-----END-----\n"),
    }
}

fn plugin_with(
    provider: &FakeProvider,
    credentials: Credentials,
    environment: EnvironmentSettings,
) -> (DeadlinePlugin<FakeConnector>, FakeConnector) {
    let connector = FakeConnector::new(provider.clone());
    let plugin = DeadlinePlugin::new(
        connector.clone(),
        credentials,
        environment,
        LifecycleOptions::default(),
    );
    (plugin, connector)
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[rstest]
#[tokio::test]
async fn empty_token_fails_before_any_connection(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let credentials = Credentials {
        token: String::new(),
        ..fake_credentials()
    };
    let (plugin, connector) = plugin_with(&provider, credentials, environment);

    let err = plugin
        .create_instances("hardware", LINUX_PROFILE, 1)
        .await
        .expect_err("blank token should be rejected");

    assert_eq!(err, PluginError::Credential(CredentialError::MissingToken));
    assert!(err.to_string().contains("Invalid credential"));
    assert_eq!(connector.connects(), 0);
    assert_eq!(provider.calls().total(), 0);
}

#[rstest]
#[tokio::test]
async fn verify_with_empty_token_is_a_credential_error(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let credentials = Credentials {
        token: String::new(),
        cluster: String::from("https://x"),
        cluster_unsafe: false,
    };
    let (plugin, connector) = plugin_with(&provider, credentials, environment);

    let err = plugin
        .verify_access()
        .await
        .expect_err("blank token should be rejected");

    assert_eq!(err, PluginError::Credential(CredentialError::MissingToken));
    assert_eq!(connector.connects(), 0);
    assert_eq!(provider.calls().total(), 0);
}

#[rstest]
#[tokio::test]
async fn repeated_ids_share_the_confirmed_outcome(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.seed_task("id-1", "deadline-linux-000001", LINUX_PROFILE, "Success");
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let report = plugin
        .terminate_instances(&ids(&["id-1", "id-1", "id-unknown"]))
        .await
        .expect("credentials are valid");

    assert_eq!(report.flags(), vec![true, true, false]);
    assert_eq!(provider.deleted(), ids(&["id-1"]));
}

#[rstest]
#[tokio::test]
async fn blank_cluster_is_reported_as_invalid_cluster(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let credentials = Credentials {
        cluster: String::from("   "),
        ..fake_credentials()
    };
    let (plugin, connector) = plugin_with(&provider, credentials, environment);

    let err = plugin
        .verify_access()
        .await
        .expect_err("blank cluster should be rejected");

    assert_eq!(err, PluginError::Credential(CredentialError::MissingCluster));
    assert!(err.to_string().contains("Invalid cluster"));
    assert_eq!(connector.connects(), 0);
}

#[rstest]
#[tokio::test]
async fn empty_batches_touch_nothing(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let (plugin, connector) = plugin_with(&provider, fake_credentials(), environment);

    assert!(plugin.terminate_instances(&[]).await.expect("ok").is_empty());
    assert!(plugin.stop_instances(&[]).await.expect("ok").is_empty());
    assert!(plugin.start_instances(&[]).await.expect("ok").is_empty());
    assert!(plugin.reboot_instances(&[]).await.expect("ok").is_empty());
    assert!(
        plugin
            .create_instances("hardware", LINUX_PROFILE, 0)
            .await
            .expect("ok")
            .is_empty()
    );
    let source = Instance {
        id: String::from("id-1"),
        image_id: String::from(LINUX_PROFILE),
        ..Instance::default()
    };
    assert!(plugin.clone_instance(&source, 0).await.expect("ok").is_empty());

    assert_eq!(connector.connects(), 0);
    assert_eq!(provider.calls().total(), 0);
}

#[rstest]
#[tokio::test]
async fn create_three_instances(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let report = plugin
        .create_instances("hardware", LINUX_PROFILE, 3)
        .await
        .expect("credentials are valid");

    assert_eq!(report.flags(), vec![true, true, true]);
    let instances = report.into_successes();
    let names: BTreeSet<_> = instances.iter().map(|instance| instance.name.clone()).collect();
    assert_eq!(names.len(), 3);
    for instance in &instances {
        assert!(instance.name.starts_with("deadline-linux-"));
        assert_eq!(instance.image_id, LINUX_PROFILE);
        assert_eq!(instance.status, InstanceStatus::Pending);
        assert_eq!(instance.hostname, FAKE_CLUSTER);
    }
    assert_eq!(
        provider.bucket_names(),
        vec![String::from("deadline-input"), String::from("deadline-output")]
    );
    assert!(provider.submitted().iter().all(|draft| {
        draft.constants().get("DEADLINE_CRT").map(String::as_str)
            == Some("-----BEGIN-----abc-----END-----")
    }));
    assert_eq!(plugin.started_instances(), instances);
}

#[rstest]
#[tokio::test]
async fn stop_reports_per_item_flags(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.seed_task("id-1", "deadline-linux-000001", LINUX_PROFILE, "FullyExecuting");
    provider.seed_task("id-2", "deadline-linux-000002", LINUX_PROFILE, "Submitted");
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let report = plugin
        .stop_instances(&ids(&["id-1", "id-missing", "id-2"]))
        .await
        .expect("credentials are valid");

    assert_eq!(report.flags(), vec![true, false, true]);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(failures.iter().all(|failure| failure.kind == FailureKind::Lookup));
    assert_eq!(provider.aborted(), ids(&["id-1", "id-2"]));
}

#[rstest]
#[tokio::test]
async fn rejected_credentials_fail_verification_and_operations(
    environment: EnvironmentSettings,
) {
    let provider = FakeProvider::new();
    provider.reject_credentials();
    provider.seed_task("id-1", "deadline-linux-000001", LINUX_PROFILE, "FullyExecuting");
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    assert!(!plugin.verify_access().await.expect("verify reports rejection"));

    let err = plugin
        .terminate_instances(&ids(&["id-1"]))
        .await
        .expect_err("rejected token should fail the batch");
    assert!(matches!(
        err,
        PluginError::Credential(CredentialError::Rejected { .. })
    ));
    assert_eq!(provider.calls().delete_task, 0);
    assert!(provider.task("id-1").is_some());
}

#[rstest]
#[tokio::test]
async fn valid_credentials_verify(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let (plugin, connector) = plugin_with(&provider, fake_credentials(), environment);

    assert!(plugin.verify_access().await.expect("verify succeeds"));
    assert_eq!(connector.connects(), 1);
    assert_eq!(provider.calls().user_info, 1);
}

#[rstest]
#[tokio::test]
async fn os_images_follow_plugin_profiles(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.add_profiles(&[LINUX_PROFILE, FOREIGN_PROFILE, "deadline-blender"]);
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let images = plugin.available_os_images().await.expect("profiles listed");

    let image_ids: Vec<_> = images.iter().map(|image| image.id.as_str()).collect();
    assert_eq!(image_ids, vec![LINUX_PROFILE, "deadline-blender"]);
    assert!(images.iter().all(|image| image.bitness == 64));
}

#[rstest]
#[tokio::test]
async fn profile_listing_failure_is_a_configuration_error(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.fail_profile_listing();
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let err = plugin
        .available_os_images()
        .await
        .expect_err("listing failure should surface");

    assert!(matches!(err, PluginError::Configuration { .. }));
}

#[rstest]
fn one_hardware_type_is_offered(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    let (plugin, connector) = plugin_with(&provider, fake_credentials(), environment);

    let hardware = plugin.available_hardware_types();

    assert_eq!(hardware.len(), 1);
    assert!(hardware.iter().all(|entry| entry.id == "hardware"));
    assert_eq!(connector.connects(), 0);
}

#[rstest]
#[tokio::test]
async fn active_instances_skip_verification(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.seed_task("id-1", "deadline-linux-000001", LINUX_PROFILE, "FullyExecuting");
    provider.seed_task("id-2", "nightly-build", FOREIGN_PROFILE, "FullyExecuting");
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let instances = plugin.active_instances().await.expect("listing succeeds");

    assert_eq!(instances.len(), 1);
    assert!(instances.iter().all(|instance| instance.id == "id-1"));
    assert_eq!(provider.calls().user_info, 0);
}

#[rstest]
#[tokio::test]
async fn start_resubmits_under_a_new_id(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.seed_task("id-1", "deadline-linux-0A0A0A", LINUX_PROFILE, "Cancelled");
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let report = plugin
        .start_instances(&ids(&["id-1"]))
        .await
        .expect("credentials are valid");

    let started = report.into_successes();
    assert_eq!(started.len(), 1);
    assert!(started.iter().all(|instance| instance.id != "id-1"
        && instance.name == "deadline-linux-0A0A0A"));
    assert!(provider.task("id-1").is_none());
    assert_eq!(provider.deleted(), ids(&["id-1"]));
}

#[rstest]
#[tokio::test]
async fn clone_reports_new_ids_and_records_them(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.seed_task("id-1", "deadline-linux-0A0A0A", LINUX_PROFILE, "FullyExecuting");
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);
    let source = plugin
        .active_instances()
        .await
        .expect("listing succeeds")
        .into_iter()
        .find(|instance| instance.id == "id-1")
        .expect("seeded task is listed");

    let report = plugin
        .clone_instance(&source, 2)
        .await
        .expect("credentials are valid");

    let clone_ids = report.into_successes();
    assert_eq!(clone_ids.len(), 2);
    assert!(clone_ids.iter().all(|id| provider.task(id).is_some()));
    let started: Vec<_> = plugin
        .started_instances()
        .into_iter()
        .map(|instance| instance.id)
        .collect();
    assert_eq!(started, clone_ids);
}

#[rstest]
#[tokio::test]
async fn cleanup_forgets_started_instances(environment: EnvironmentSettings) {
    let provider = FakeProvider::new();
    provider.fail_submission(2);
    let (plugin, _connector) = plugin_with(&provider, fake_credentials(), environment);

    let report = plugin
        .create_instances("hardware", LINUX_PROFILE, 2)
        .await
        .expect("credentials are valid");

    assert_eq!(report.flags(), vec![true, false]);
    assert_eq!(plugin.started_instances().len(), 1);
    plugin.cleanup();
    assert!(plugin.started_instances().is_empty());
}

#[test]
fn plugin_builds_from_configuration() {
    let provider = FakeProvider::new();
    let connector = FakeConnector::new(provider);
    let config = PluginConfig {
        token: String::from("token"),
        cluster: String::from(FAKE_CLUSTER),
        cluster_unsafe: false,
        repository: String::new(),
        license_server: String::new(),
        license_mode: String::new(),
        proxy_certificate: String::new(),
        ssl: String::new(),
        call_timeout_secs: 30,
        concurrency: 2,
    };

    let plugin = DeadlinePlugin::from_config(connector.clone(), &config);

    assert!(plugin.started_instances().is_empty());
    assert_eq!(connector.connects(), 0);
}
