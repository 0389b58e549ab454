//! End-to-end scenarios exercising the protocol engine through its public
//! facade. Two [`FileTransferModule`]s are built against independent
//! [`MockBus`]es; actions one side would transmit are relayed by hand to
//! the other's inbound entry points, the way a concrete transport adapter
//! would after decoding bytes off the wire.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use file_transfer_core::bus::{MockBus, SessionBus};
use file_transfer_core::config::CoreConfig;
use file_transfer_core::facade::FileTransferModule;
use file_transfer_core::status::StatusCode;
use file_transfer_core::FileId;

fn new_module(
    name: &str,
    save_dir: Option<PathBuf>,
    chunk_size: u32,
    offer_timeout_ms: u64,
) -> (Arc<FileTransferModule>, Arc<MockBus>) {
    let bus = Arc::new(MockBus::new());
    let bus_dyn: Arc<dyn SessionBus> = bus.clone();
    let config = CoreConfig {
        default_chunk_size: chunk_size,
        default_save_directory: save_dir,
        default_offer_timeout_ms: offer_timeout_ms,
        ..CoreConfig::default()
    };
    (FileTransferModule::new(bus_dyn, name.to_string(), config), bus)
}

async fn relay_chunks(contents: &[u8], chunk_size: usize, file_id: FileId, receiver: &FileTransferModule) {
    let mut offset = 0usize;
    while offset < contents.len() {
        let end = (offset + chunk_size).min(contents.len());
        receiver
            .inbound_data_chunk(file_id, offset as u64, contents[offset..end].to_vec(), "peerA")
            .await;
        offset = end;
    }
}

#[tokio::test]
async fn announce_request_and_chunked_transfer_round_trip() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    let source = dir_a.path().join("notes.txt");
    let contents = b"the quick brown fox jumps over the lazy dog".to_vec();
    std::fs::write(&source, &contents).unwrap();

    let (a, _bus_a) = new_module("peerA", None, 8, 5000);
    let (b, _bus_b) = new_module("peerB", Some(dir_b.path().to_path_buf()), 8, 5000);

    a.announce(vec![source]);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let descriptors = a.local_announced_files();
    assert_eq!(descriptors.len(), 1);
    b.inbound_announce(descriptors.clone(), false, "peerA").await;

    let file_id = descriptors[0].file_id;
    let status = b.request_file("peerA", file_id, "notes.txt", None);
    assert_eq!(status, StatusCode::Ok);

    // A's request_data method handler, called directly the way a real
    // bus adapter would after decoding B's request off the wire.
    let accepted = a.inbound_request_data("peerB", file_id, 0, contents.len() as u64, 8);
    assert_eq!(accepted, StatusCode::Ok);

    relay_chunks(&contents, 8, file_id, &b).await;

    let written = std::fs::read(dir_b.path().join("notes.txt")).unwrap();
    assert_eq!(written, contents);
}

#[tokio::test]
async fn stop_announce_removes_file_from_local_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secret.txt");
    std::fs::write(&path, b"shh").unwrap();

    let (a, _bus) = new_module("peerA", None, 1024, 5000);
    a.announce(vec![path.clone()]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(a.local_announced_files().len(), 1);

    let failed = a.stop_announce(&[path]);
    assert!(failed.is_empty());
    assert!(a.local_announced_files().is_empty());
}

#[tokio::test]
async fn offer_accepted_then_fulfilled_by_request_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gift.bin");
    std::fs::write(&path, vec![9u8; 20]).unwrap();

    let (a, bus_a) = new_module("peerA", None, 1024, 5000);
    bus_a.set_status_to_return(StatusCode::OfferAccepted);

    let a2 = a.clone();
    let path2 = path.clone();
    let offer_task = tokio::spawn(async move { a2.offer_file("peerB", &path2, 5000).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let offered = a.local_offered_files();
    assert_eq!(offered.len(), 1);
    let file_id = offered[0].file_id;

    let status = a.inbound_request_data("peerB", file_id, 0, 20, 1024);
    assert_eq!(status, StatusCode::Ok);

    let offer_result = offer_task.await.unwrap();
    assert_eq!(offer_result, StatusCode::Ok);
}

#[tokio::test]
async fn offer_times_out_without_a_follow_up_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unwanted.bin");
    std::fs::write(&path, b"data").unwrap();

    let (a, bus_a) = new_module("peerA", None, 1024, 150);
    bus_a.set_status_to_return(StatusCode::OfferAccepted);

    let started = std::time::Instant::now();
    let status = a.offer_file("peerB", &path, 0).await;
    assert_eq!(status, StatusCode::OfferTimeout);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn receiver_pause_then_cancel_deletes_partial_file() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let source = dir_a.path().join("movie.bin");
    std::fs::write(&source, vec![3u8; 32]).unwrap();

    let (a, _bus_a) = new_module("peerA", None, 8, 5000);
    let (b, _bus_b) = new_module("peerB", Some(dir_b.path().to_path_buf()), 8, 5000);

    a.announce(vec![source]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let descriptors = a.local_announced_files();
    let file_id = descriptors[0].file_id;
    b.inbound_announce(descriptors, false, "peerA").await;

    b.request_file("peerA", file_id, "movie.bin", None);
    b.inbound_data_chunk(file_id, 0, vec![3u8; 8], "peerA").await;

    assert_eq!(b.pause_receiving(file_id), StatusCode::Ok);
    assert!(dir_b.path().join("movie.bin").exists());

    assert_eq!(b.cancel_receiving(file_id), StatusCode::Ok);
    assert!(!dir_b.path().join("movie.bin").exists());
}

#[tokio::test]
async fn unannounced_file_request_is_allowed_when_delegate_accepts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("on_demand.bin");
    std::fs::write(&path, b"served on request").unwrap();

    let (a, _bus) = new_module("peerA", None, 1024, 5000);
    a.on_unannounced_file_request(Arc::new(|_path: &str| true));

    let status = a.inbound_request_offer(path.to_str().unwrap(), "peerB");
    assert_eq!(status, StatusCode::Ok);
}

#[tokio::test]
async fn unannounced_file_request_is_denied_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("private.bin");
    std::fs::write(&path, b"no").unwrap();

    let (a, _bus) = new_module("peerA", None, 1024, 5000);
    let status = a.inbound_request_offer(path.to_str().unwrap(), "peerB");
    assert_eq!(status, StatusCode::RequestDenied);
}
