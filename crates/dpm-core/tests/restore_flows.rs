//! Restore workers against a scripted console.

use std::sync::Arc;

use dpm_config::ConfigDocument;
use dpm_core::resources::cpc::CpcRef;
use dpm_core::{
    restore_partition, restore_partitions, restore_storage_groups, HmcSession, ProvisionConfig,
    Stage, StageTracker,
};
use hmc_rest::fakes::{Reply, ScriptedTransport};
use hmc_rest::{ApiVersion, Method};
use serde_json::{json, Value};

const PARTITION: &str = "/api/partitions/p1";

fn session(transport: &Arc<ScriptedTransport>) -> HmcSession {
    HmcSession::new(
        transport.clone(),
        ApiVersion::new(2, 25),
        CpcRef {
            name: "CPC1".to_string(),
            uri: "/api/cpcs/c1".to_string(),
            status: "active".to_string(),
        },
    )
}

fn section(document: &ConfigDocument, name: &str) -> std::collections::BTreeMap<String, String> {
    document.section(name).unwrap().flat()
}

async fn script_adapters(transport: &ScriptedTransport) {
    transport
        .on(
            Method::Get,
            "/api/cpcs/c1/adapters",
            Reply::ok(json!({"adapters": [
                {"name": "OSD 0140", "object-uri": "/api/adapters/a1", "status": "active", "type": "osd"},
                {"name": "ZEDC 01", "object-uri": "/api/adapters/a2", "status": "active", "type": "zedc"},
                {"name": "CRYPTO 01", "object-uri": "/api/adapters/a3", "status": "active", "type": "crypto"}
            ]})),
        )
        .await
        .on(
            Method::Get,
            "/api/cpcs/c1/virtual-switches",
            Reply::ok(json!({"virtual-switches": [
                {"object-uri": "/api/virtual-switches/v0"},
                {"object-uri": "/api/virtual-switches/v1"}
            ]})),
        )
        .await
        .on(
            Method::Get,
            "/api/virtual-switches/v0",
            Reply::ok(json!({"backing-adapter-uri": "/api/adapters/a1", "port": 0})),
        )
        .await
        .on(
            Method::Get,
            "/api/virtual-switches/v1",
            Reply::ok(json!({"backing-adapter-uri": "/api/adapters/a1", "port": 1})),
        )
        .await;
}

const FULL_PARTITION: &str = "\
[PAR1]
par_type = linux
proc_type = ifl
proc_num = 2
vNIC1_name = eth0
vNIC1_devNum = 1000
vNIC1_adapName = OSD 0140
vNIC1_adapPort = 1
sgDevNum = ['SG_A:0100', 'SG_A:0101']
zAccelerators = [{'name': 'zedc1', 'device-number': '0900', 'adapter-name': 'ZEDC 01'}]
zCryptos = {'crypto-adapter-names': ['CRYPTO 01'], 'crypto-domain-configurations': [{'domain-index': 3, 'access-mode': 'control-usage'}]}
zzBootOpt = {'boot_device': 'storage-volume', 'boot-timeout': 60, 'storage_group_name': 'SG_A', 'storage_group_type': 'fcp', 'fcp-volume-uuid': 'ABC', 'fcp-boot-configuration-selector': 0}
";

#[tokio::test]
async fn partition_is_rebuilt_with_all_sub_resources() {
    let transport = Arc::new(ScriptedTransport::new());
    script_adapters(&transport).await;
    transport
        .on(
            Method::Post,
            "/api/cpcs/c1/partitions",
            Reply::created(json!({"object-uri": PARTITION})),
        )
        .await
        .on(
            Method::Post,
            "/api/partitions/p1/nics",
            Reply::created(json!({"element-uri": "/api/partitions/p1/nics/n1"})),
        )
        .await
        .on(
            Method::Get,
            "/api/storage-groups",
            Reply::ok(json!({"storage-groups": [
                {"name": "SG_A", "object-uri": "/api/storage-groups/sa"}
            ]})),
        )
        .await
        .on(
            Method::Post,
            "/api/partitions/p1/operations/attach-storage-group",
            Reply::no_content(),
        )
        .await
        .on(
            Method::Get,
            "/api/storage-groups/sa/virtual-storage-resources",
            Reply::ok(json!({"virtual-storage-resources": [
                {"element-uri": "/api/storage-groups/sa/virtual-storage-resources/r1", "partition-uri": PARTITION},
                {"element-uri": "/api/storage-groups/sa/virtual-storage-resources/r2", "partition-uri": "/api/partitions/other"},
                {"element-uri": "/api/storage-groups/sa/virtual-storage-resources/r3", "partition-uri": PARTITION}
            ]})),
        )
        .await
        .on(
            Method::Post,
            "/api/storage-groups/sa/virtual-storage-resources/r1",
            Reply::no_content(),
        )
        .await
        .on(
            Method::Post,
            "/api/storage-groups/sa/virtual-storage-resources/r3",
            Reply::no_content(),
        )
        .await
        .on(
            Method::Post,
            "/api/partitions/p1/virtual-functions",
            Reply::created(json!({"element-uri": "/api/partitions/p1/virtual-functions/f1"})),
        )
        .await
        .on(
            Method::Post,
            "/api/partitions/p1/operations/increase-crypto-configuration",
            Reply::no_content(),
        )
        .await
        .on(
            Method::Get,
            "/api/storage-groups/sa",
            Reply::ok(json!({
                "name": "SG_A",
                "type": "fcp",
                "fulfillment-state": "complete",
                "storage-volume-uris": [
                    "/api/storage-groups/sa/storage-volumes/d1",
                    "/api/storage-groups/sa/storage-volumes/b1"
                ]
            })),
        )
        .await
        .on(
            Method::Get,
            "/api/storage-groups/sa/storage-volumes/d1",
            Reply::ok(json!({"usage": "data", "uuid": "XYZ"})),
        )
        .await
        .on(
            Method::Get,
            "/api/storage-groups/sa/storage-volumes/b1",
            Reply::ok(json!({"usage": "boot", "uuid": "ABC"})),
        )
        .await
        .on(Method::Post, PARTITION, Reply::no_content())
        .await;

    let document = ConfigDocument::parse(FULL_PARTITION).unwrap();
    let tracker = StageTracker::detached();
    let outcome = restore_partition(&session(&transport), "PAR1", &section(&document, "PAR1"), &tracker)
        .await
        .unwrap();

    assert_eq!(outcome.uri, PARTITION);
    assert!(outcome.issues.is_empty(), "unexpected issues: {:?}", outcome.issues);
    assert!(outcome.boot_configured);
    assert_eq!(tracker.current(), Stage::Done);

    let created = transport.posted_bodies("/api/cpcs/c1/partitions").await;
    assert_eq!(created[0]["name"], "PAR1");
    assert_eq!(created[0]["ifl-processors"], 2);

    let nic = &transport.posted_bodies("/api/partitions/p1/nics").await[0];
    assert_eq!(nic["virtual-switch-uri"], "/api/virtual-switches/v1");
    assert_eq!(nic["device-number"], "1000");

    // Saved device numbers are handed out last first.
    let r1 = transport
        .posted_bodies("/api/storage-groups/sa/virtual-storage-resources/r1")
        .await;
    let r3 = transport
        .posted_bodies("/api/storage-groups/sa/virtual-storage-resources/r3")
        .await;
    assert_eq!(r1, vec![json!({"device-number": "0101"})]);
    assert_eq!(r3, vec![json!({"device-number": "0100"})]);

    let vf = &transport.posted_bodies("/api/partitions/p1/virtual-functions").await[0];
    assert_eq!(vf["adapter-uri"], "/api/adapters/a2");
    assert_eq!(vf["device-number"], "0900");

    let crypto = &transport
        .posted_bodies("/api/partitions/p1/operations/increase-crypto-configuration")
        .await[0];
    assert_eq!(crypto["crypto-adapter-uris"], json!(["/api/adapters/a3"]));

    let updates = transport.posted_bodies(PARTITION).await;
    assert_eq!(
        updates,
        vec![
            json!({
                "boot-timeout": 60,
                "boot-storage-volume": "/api/storage-groups/sa/storage-volumes/b1",
                "boot-configuration-selector": 0
            }),
            json!({"boot-device": "storage-volume"}),
        ]
    );
}

#[tokio::test]
async fn failing_sub_resources_become_issues() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .on(
            Method::Post,
            "/api/cpcs/c1/partitions",
            Reply::created(json!({"object-uri": PARTITION})),
        )
        .await
        .on(
            Method::Get,
            "/api/storage-groups",
            Reply::ok(json!({"storage-groups": []})),
        )
        .await;

    let document = ConfigDocument::parse(
        "[PAR2]\n\
         vNIC1_name = hipersocket\n\
         vNIC1_devNum = 7000\n\
         sgFICON = ['FICON_1']\n\
         zzBootOpt = {'boot_device': 'none'}\n",
    )
    .unwrap();
    let outcome = restore_partition(
        &session(&transport),
        "PAR2",
        &section(&document, "PAR2"),
        &StageTracker::detached(),
    )
    .await
    .unwrap();

    let steps: Vec<&str> = outcome.issues.iter().map(|i| i.step).collect();
    assert_eq!(steps, vec!["create_nic", "attach_storage_group"]);
    assert_eq!(outcome.issues[0].subject, "hipersocket");
    assert_eq!(outcome.issues[1].subject, "FICON_1");
    assert!(!outcome.boot_configured);
    assert!(transport.requests_to(Method::Post, PARTITION).await.is_empty());
}

#[tokio::test]
async fn one_rejected_partition_does_not_stop_the_other() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .on_request(Method::Post, "/api/cpcs/c1/partitions", |request| {
            let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}")).unwrap();
            if body["name"] == "A" {
                Reply::created(json!({"object-uri": "/api/partitions/a"}))
            } else {
                Reply::error(409, "The name is already in use")
            }
        })
        .await;

    let document = ConfigDocument::parse("[A]\nproc_num = 1\n\n[B]\nproc_num = 1\n").unwrap();
    let report = restore_partitions(&session(&transport), &document, &ProvisionConfig::default()).await;

    assert_eq!(report.succeeded_names(), vec!["A"]);
    assert_eq!(report.failed_names(), vec!["B"]);
    assert_eq!(report.succeeded[0].1.uri, "/api/partitions/a");

    let failure = &report.failed[0].1;
    assert_eq!(failure.stage, Stage::TemplateBuilt);
    assert!(failure.error.contains("status=409"), "{}", failure.error);
    assert_eq!(failure.trail[0], "restore_partition");
    assert!(failure.trail.iter().any(|step| step == "create_partition"));
}

#[tokio::test]
async fn invalid_section_fails_before_any_request() {
    let transport = Arc::new(ScriptedTransport::new());
    let document = ConfigDocument::parse("[BAD]\nproc_type = zIIP\nproc_num = 1\n").unwrap();
    let report = restore_partitions(&session(&transport), &document, &ProvisionConfig::default()).await;

    assert_eq!(report.failed_names(), vec!["BAD"]);
    assert_eq!(report.failed[0].1.stage, Stage::Pending);
    assert!(transport.requests().await.is_empty());
}

#[tokio::test]
async fn storage_groups_are_created_with_notification_addresses() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .on(
            Method::Post,
            "/api/storage-groups",
            Reply::created(json!({"object-uri": "/api/storage-groups/new"})),
        )
        .await;

    let document = ConfigDocument::parse(
        "[SG_DATA]\n\
         sgDesc = database volumes\n\
         storType = fcp\n\
         sgShared = False\n\
         numOfPaths = 2\n\
         maxNumOfPars = 1\n\
         sgStorVolsCfg = [{'storVolUse': 'data', 'storVolSize': 16.0}]\n",
    )
    .unwrap();
    let emails = vec!["ops@example.com".to_string(), "storage@example.com".to_string()];
    let report = restore_storage_groups(
        &session(&transport),
        &document,
        &emails,
        &ProvisionConfig { max_concurrent: Some(1) },
    )
    .await;

    assert!(report.all_succeeded());
    assert_eq!(report.succeeded[0].1, "/api/storage-groups/new");
    let body = &transport.posted_bodies("/api/storage-groups").await[0];
    assert_eq!(body["cpc-uri"], "/api/cpcs/c1");
    assert_eq!(body["description"], "database volumes");
    assert_eq!(body["email-to-addresses"], json!(emails));
    assert_eq!(body["storage-volumes"][0]["usage"], "data");
}
