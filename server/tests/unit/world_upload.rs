//! World archive uploads through the real zip storage.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use mchost_common::{CreateServerRequest, ServerRecord};
use mchost_server::application::services::Actor;
use mchost_server::domain::{LifecycleError, WorldUploadError};

use crate::common::{MAX_UNPACKED, MAX_UPLOAD, TestHost, zip_bytes};

async fn java_server(host: &TestHost) -> ServerRecord {
    host.intake
        .create_for_operator(&CreateServerRequest {
            owner: 1,
            plan_type: "java".into(),
            cpu: None,
            ram: None,
            storage: None,
            backup: None,
        })
        .await
        .expect("create")
}

#[tokio::test]
async fn accepted_world_is_mounted_on_next_start() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;
    let archive = zip_bytes(&[
        ("MyWorld/level.dat", b"nbt"),
        ("MyWorld/region/r.0.0.mca", b"mca"),
    ]);

    let report = host
        .worlds
        .upload(Actor::Tenant(1), server.id, "MyWorld.zip", archive)
        .await
        .expect("upload");
    assert!(report.success);

    let expected = host
        .dir
        .path()
        .join("worlds")
        .join(server.id.to_string())
        .join("MyWorld");
    assert!(expected.join("level.dat").is_file());

    host.lifecycle.start(Actor::Operator, server.id).await.expect("start");
    let spec = host.engine.running().remove(0);
    let volume = spec.volume.expect("world volume");
    assert_eq!(volume.host_path, expected);
    assert_eq!(spec.env.get("WORLD").map(String::as_str), Some("/data/world"));
}

#[tokio::test]
async fn archive_without_level_dat_is_discarded() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;

    let err = host
        .worlds
        .upload(
            Actor::Operator,
            server.id,
            "world.zip",
            zip_bytes(&[("readme.txt", b"hello")]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::World(WorldUploadError::MarkerMissing { .. })
    ));
    let worlds = host.dir.path().join("worlds");
    assert!(!worlds.join(server.id.to_string()).exists());
    assert!(!worlds.join(format!("{}.upload", server.id)).exists());
}

#[tokio::test]
async fn rejected_upload_leaves_accepted_world_mounted() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;
    host.worlds
        .upload(
            Actor::Operator,
            server.id,
            "good.zip",
            zip_bytes(&[("Good/level.dat", b"nbt")]),
        )
        .await
        .expect("first upload");

    let missing = host
        .worlds
        .upload(
            Actor::Operator,
            server.id,
            "bad.zip",
            zip_bytes(&[("readme.txt", b"hello")]),
        )
        .await;
    assert!(missing.is_err());
    let corrupt = host
        .worlds
        .upload(Actor::Operator, server.id, "bad.zip", b"not a zip".to_vec())
        .await;
    assert!(corrupt.is_err());

    let world = host
        .dir
        .path()
        .join("worlds")
        .join(server.id.to_string())
        .join("Good");
    assert!(world.join("level.dat").is_file());

    host.lifecycle.start(Actor::Operator, server.id).await.expect("start");
    let spec = host.engine.running().remove(0);
    assert_eq!(spec.volume.expect("world volume").host_path, world);
}

#[tokio::test]
async fn archive_unpacking_past_limit_is_rejected() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;
    let zeros = vec![0_u8; 1024 * 1024];
    let archive = zip_bytes(&[("World/level.dat", b"nbt"), ("World/filler.bin", &zeros)]);
    assert!(archive.len() <= MAX_UPLOAD);

    let err = host
        .worlds
        .upload(Actor::Operator, server.id, "world.zip", archive)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::World(WorldUploadError::Expanded { limit: MAX_UNPACKED })
    ));
    let worlds = host.dir.path().join("worlds");
    assert!(!worlds.join(format!("{}.upload", server.id)).exists());
}

#[tokio::test]
async fn rejected_upload_keeps_previous_world_path_unset() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;

    let err = host
        .worlds
        .upload(Actor::Operator, server.id, "world.zip", b"not a zip".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::World(WorldUploadError::Corrupt)));

    let stored = host
        .lifecycle
        .list(Actor::Operator)
        .await
        .expect("list")
        .remove(0);
    assert!(stored.world_data_path.is_none());
}

#[tokio::test]
async fn non_zip_name_and_oversize_are_rejected() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;
    let archive = zip_bytes(&[("level.dat", b"nbt")]);

    let err = host
        .worlds
        .upload(Actor::Operator, server.id, "world.rar", archive)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::World(WorldUploadError::NotZip)));

    let err = host
        .worlds
        .upload(Actor::Operator, server.id, "big.zip", vec![0; MAX_UPLOAD + 1])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::World(WorldUploadError::TooLarge { .. })
    ));
}

#[tokio::test]
async fn foreign_tenant_cannot_upload() {
    let host = TestHost::new().await;
    let server = java_server(&host).await;

    let err = host
        .worlds
        .upload(
            Actor::Tenant(99),
            server.id,
            "world.zip",
            zip_bytes(&[("level.dat", b"nbt")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}
