//! # FedChain Wire Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | fc-01 Wire | Koopman CRC, parcel encode/decode |
//! | fc-04 Messages | message encode/decode |
//! | fc-02 Signatures | Ed25519 sign |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fc_01_wire::{koopman_crc32, KoopmanChecksum, Parcel, ParcelCodec};
use fc_02_signatures::{Ed25519Signer, MessageSigner};
use fc_04_messages::{AddServerMsg, EndOfBlockMsg, Message, PROTOCOL_VERSION};
use shared_types::{AuthorityRole, ChainId, NetworkId, Timestamp};
use std::time::Duration;

// ============================================================================
// FC-01: Wire
// ============================================================================

fn bench_koopman_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("fc-01-crc");
    group.measurement_time(Duration::from_secs(5));

    for size in [64usize, 4 * 1024, 512 * 1024] {
        let data = vec![0x5Au8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("koopman_crc32", size), &data, |b, data| {
            b.iter(|| black_box(koopman_crc32(data)))
        });
    }
    group.finish();
}

fn bench_parcel_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("fc-01-parcel");
    let codec: ParcelCodec<KoopmanChecksum> = ParcelCodec::default();

    for size in [128usize, 16 * 1024] {
        let parcel = Parcel::new(NetworkId::LOCAL, vec![0x11; size])
            .with_node_id(7)
            .with_port("8108");
        let frame = codec.encode(&parcel).unwrap();

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &parcel, |b, parcel| {
            b.iter(|| black_box(codec.encode(parcel).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &frame, |b, frame| {
            b.iter(|| black_box(codec.decode(frame).unwrap()))
        });
    }
    group.finish();
}

// ============================================================================
// FC-04: Messages
// ============================================================================

fn bench_message_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("fc-04-messages");
    let signer = Ed25519Signer::from_seed([1; 32]);

    let mut eob = Message::from(EndOfBlockMsg::new(ChainId::new([1; 32]), 42, Timestamp::now()));
    eob.sign(&signer).unwrap();
    let eob_bytes = eob.encode().unwrap();

    let mut add = Message::from(AddServerMsg::new(
        ChainId::new([2; 32]),
        AuthorityRole::Federated,
        signer.public_key(),
        Timestamp::now(),
    ));
    add.sign(&signer).unwrap();
    let add_bytes = add.encode().unwrap();

    group.bench_function("endofblock_decode", |b| {
        b.iter(|| black_box(Message::decode(&eob_bytes, PROTOCOL_VERSION).unwrap()))
    });
    group.bench_function("addserver_decode", |b| {
        b.iter(|| black_box(Message::decode(&add_bytes, PROTOCOL_VERSION).unwrap()))
    });
    group.bench_function("endofblock_sign", |b| {
        b.iter(|| {
            let mut msg = Message::from(EndOfBlockMsg::new(
                ChainId::new([1; 32]),
                black_box(42),
                Timestamp::from_millis(1),
            ));
            msg.sign(&signer).unwrap();
            black_box(msg)
        })
    });
    group.finish();
}

criterion_group!(wire, bench_koopman_crc, bench_parcel_codec);
criterion_group!(messages, bench_message_codec);
criterion_main!(wire, messages);
