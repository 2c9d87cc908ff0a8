//! End-to-end pool behavior: dispatch, correlation, timeouts, and
//! teardown.

use std::time::Duration;

use btx_primitives::hash::sha256d;
use btx_script::Script;
use btx_transaction::verify::flags::STANDARD;
use btx_transaction::{Coin, CoinView, Input, KeyRing, MutableTransaction, Outpoint, Output};
use btx_workers::packets::{self, Packet};
use btx_workers::{Worker, WorkerError, WorkerPool};

fn funded_mtx(ring: &KeyRing) -> MutableTransaction {
    let coin = Coin {
        version: 1,
        height: 100,
        value: 100_000,
        script: Script::p2pkh(&ring.key_hash()),
        coinbase: false,
        hash: [7u8; 32],
        index: 0,
    };
    let mut mtx = MutableTransaction::new();
    mtx.inputs.push(Input::from_outpoint(Outpoint::new([7u8; 32], 0)));
    mtx.outputs.push(Output::new(90_000, Script::p2pkh(&[1u8; 20])));
    mtx.view.add(coin);
    mtx
}

fn view_for(ring: &KeyRing) -> CoinView {
    let mut view = CoinView::new();
    view.add(Coin {
        version: 1,
        height: 100,
        value: 100_000,
        script: Script::p2pkh(&ring.key_hash()),
        coinbase: false,
        hash: [7u8; 32],
        index: 0,
    });
    view
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_and_check_through_pool() {
    let pool = WorkerPool::with_size(2);
    assert_eq!(pool.spawned(), 0);
    let ring = KeyRing::generate(false);
    let mut mtx = funded_mtx(&ring);

    let total = pool
        .sign(&mut mtx, std::slice::from_ref(&ring), 0x01)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(pool.spawned(), 1);
    assert!(!mtx.inputs[0].script.is_empty());

    let tx = mtx.to_tx();
    let view = view_for(&ring);
    pool.check(&tx, &view, STANDARD).await.unwrap();
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn check_rejects_unsigned_input() {
    let pool = WorkerPool::with_size(1);
    let ring = KeyRing::generate(false);
    let tx = funded_mtx(&ring).to_tx();
    let view = view_for(&ring);

    let err = pool.check(&tx, &view, STANDARD).await.unwrap_err();
    assert!(matches!(err, WorkerError::Job(_)));
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn sign_input_writes_back_one_input() {
    let pool = WorkerPool::with_size(1);
    let ring = KeyRing::generate(false);
    let mut mtx = funded_mtx(&ring);

    let signed = pool.sign_input(&mut mtx, 0, &ring, 0x01).await.unwrap();
    assert!(signed);
    assert!(mtx.is_signed());
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn check_input_verifies_single_input() {
    let pool = WorkerPool::with_size(1);
    let ring = KeyRing::generate(false);
    let mut mtx = funded_mtx(&ring);
    mtx.sign_all(&ring).unwrap();
    let tx = mtx.to_tx();

    let coin = Coin {
        version: 1,
        height: 100,
        value: 100_000,
        script: Script::p2pkh(&ring.key_hash()),
        coinbase: false,
        hash: [7u8; 32],
        index: 0,
    };
    pool.check_input(&tx, 0, &coin, STANDARD).await.unwrap();
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn ec_jobs_roundtrip() {
    let pool = WorkerPool::with_size(2);
    let key = btx_primitives::ec::PrivateKey::generate();
    let hash = sha256d(b"pool ec job");

    let signature = pool.ec_sign(&hash, &key).await.unwrap();
    let valid = pool
        .ec_verify(&hash, &signature, &key.public_key().to_compressed())
        .await
        .unwrap();
    assert!(valid);

    let tampered = pool
        .ec_verify(&sha256d(b"other"), &signature, &key.public_key().to_compressed())
        .await
        .unwrap();
    assert!(!tampered);
    pool.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn mine_and_scrypt_through_pool() {
    let pool = WorkerPool::with_size(2);

    let nonce = pool.mine(&[0u8; 80], &[0xff; 32], 3, 20).await.unwrap();
    assert_eq!(nonce, Some(3));

    let exhausted = pool.mine(&[0u8; 80], &[0x00; 32], 0, 8).await.unwrap();
    assert_eq!(exhausted, None);

    let key = pool.scrypt(b"", b"", 16, 1, 1, 64).await.unwrap();
    assert_eq!(
        hex::encode(&key[..32]),
        "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442"
    );

    pool.shutdown();
    let refused = pool.mine(&[0u8; 80], &[0xff; 32], 0, 1).await;
    assert!(matches!(refused, Err(WorkerError::Destroyed)));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_pool_falls_back_in_process() {
    let pool = WorkerPool::with_size(0);
    let ring = KeyRing::generate(false);
    let mut mtx = funded_mtx(&ring);

    let total = pool
        .sign(&mut mtx, std::slice::from_ref(&ring), 0x01)
        .await
        .unwrap();
    assert_eq!(total, 1);

    let tx = mtx.to_tx();
    let view = view_for(&ring);
    pool.check(&tx, &view, STANDARD).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_rejects_exactly_once() {
    let worker = Worker::spawn(0);
    // Event packets are control traffic: the worker never replies, so a
    // deadline must fire.
    let packet = Packet::Event { items: Vec::new() };
    let result = worker
        .execute(packets::cmd::EVENT, &packet.encode(), Some(Duration::from_millis(50)))
        .await;
    assert!(matches!(result, Err(WorkerError::Timeout)));
    worker.destroy();
}

#[tokio::test(flavor = "multi_thread")]
async fn destroy_rejects_outstanding_jobs() {
    let worker = Worker::spawn(0);
    let packet = Packet::Event { items: Vec::new() };
    let payload = packet.encode();

    let pending = worker.execute(packets::cmd::EVENT, &payload, None);
    let teardown = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        worker.destroy();
    };
    let (rejected, ()) = tokio::join!(pending, teardown);
    assert!(matches!(rejected, Err(WorkerError::Destroyed)));

    // A destroyed worker refuses new jobs outright.
    let refused = worker.execute(packets::cmd::EVENT, &payload, None).await;
    assert!(matches!(refused, Err(WorkerError::Destroyed)));
}

#[tokio::test(flavor = "multi_thread")]
async fn many_jobs_correlate_correctly() {
    let pool = WorkerPool::with_size(3);
    // An all-ones target accepts the first nonce tried, so each reply
    // carries its own range start and misrouted replies would show up
    // as a wrong nonce.
    for tag in 0u32..12 {
        let nonce = pool
            .mine(&[0u8; 80], &[0xff; 32], tag, tag + 1)
            .await
            .unwrap();
        assert_eq!(nonce, Some(tag));
    }
    pool.shutdown();
}
