mod common;

use chunkzip::{ChunkRequest, DecodeEvent, DecodeWorker, Dimension};
use common::{ZipBuilder, config, png_frame};

#[tokio::test]
async fn concurrent_requests_complete_independently() {
    let (worker, join) = DecodeWorker::spawn(config(2));

    let images = ZipBuilder::new()
        .stored("0.png", &png_frame(3, 3, [10, 20, 30]))
        .stored("1.png", &png_frame(3, 3, [40, 50, 60]))
        .finish();
    let clouds = ZipBuilder::new()
        .deflated("0.pcd", b"VERSION .7\nPOINTS 0\n")
        .deflated("1.pcd", b"VERSION .7\nPOINTS 1\n")
        .deflated("2.pcd", b"VERSION .7\nPOINTS 2\n")
        .finish();

    let first = worker
        .submit(ChunkRequest::new(images, 0, 1, Dimension::TwoD))
        .await
        .unwrap();
    let second = worker
        .submit(ChunkRequest::new(clouds, 36, 38, Dimension::ThreeD))
        .await
        .unwrap();

    let (first, second) = tokio::join!(first.collect(), second.collect());
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.entries.len(), 2);
    assert!(first.entries.iter().all(|e| e.payload.as_bitmap().is_some()));

    let indices: Vec<u64> = second.entries.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![36, 37, 38]);
    assert_eq!(
        second.entries[2].payload.as_blob().unwrap().as_ref(),
        b"VERSION .7\nPOINTS 2\n"
    );

    worker.shutdown();
    join.await.unwrap();
}

#[tokio::test]
async fn failed_request_does_not_disturb_the_worker() {
    let (worker, _join) = DecodeWorker::spawn(config(1));

    let mut broken = worker
        .submit(ChunkRequest::new(&b"garbage"[..], 0, 0, Dimension::TwoD))
        .await
        .unwrap();
    assert!(matches!(broken.next().await, Some(DecodeEvent::Failed(_))));
    assert!(broken.next().await.is_none());

    let archive = ZipBuilder::new().stored("a.bin", b"a").finish();
    let chunk = worker
        .submit(ChunkRequest::new(archive, 5, 5, Dimension::ThreeD))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(chunk.entries[0].index, 5);
}

#[tokio::test]
async fn submit_after_shutdown_is_rejected() {
    let (worker, join) = DecodeWorker::spawn(config(1));
    worker.shutdown();
    join.await.unwrap();

    let archive = ZipBuilder::new().stored("a.bin", b"a").finish();
    assert!(worker
        .submit(ChunkRequest::new(archive, 0, 0, Dimension::ThreeD))
        .await
        .is_err());
}

#[tokio::test]
async fn worker_exits_when_every_handle_is_dropped() {
    let (worker, join) = DecodeWorker::spawn(config(1));
    let other = worker.clone();
    drop(worker);
    drop(other);
    join.await.unwrap();
}
