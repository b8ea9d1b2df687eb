use super::*;
use crate::utils::PopsubError;

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn test_chunk_sizes_and_order() {
    let payload = sample(10_000);
    let fragments = chunk(&payload);

    assert_eq!(fragments.len(), 3);
    assert_eq!(fragments.len(), fragment_count(payload.len()));
    for (i, fragment) in fragments.iter().enumerate() {
        assert!(fragment.len() <= FRAGMENT_SIZE);
        assert_eq!(fragment_index(fragment).unwrap(), i as u32);
    }
    assert_eq!(fragments[0].len(), FRAGMENT_SIZE);
    assert_eq!(fragments[2].len(), INDEX_LEN + 10_000 - 2 * CHUNK_SIZE);
}

#[test]
fn test_chunk_boundaries() {
    assert!(chunk(&[]).is_empty());
    assert_eq!(chunk(&sample(1)).len(), 1);
    assert_eq!(chunk(&sample(CHUNK_SIZE)).len(), 1);
    assert_eq!(chunk(&sample(CHUNK_SIZE + 1)).len(), 2);
}

#[test]
fn test_reconstruct_empty() {
    assert!(reconstruct(chunk(&[])).unwrap().is_empty());
}

#[test]
fn test_reconstruct_any_order() {
    let payload = sample(5 * CHUNK_SIZE + 17);
    let mut fragments = chunk(&payload);

    fragments.reverse();
    assert_eq!(reconstruct(fragments.clone()).unwrap(), payload);

    // interleave odd and even indices
    let (even, odd): (Vec<_>, Vec<_>) = fragments
        .into_iter()
        .enumerate()
        .partition(|(i, _)| i % 2 == 0);
    let shuffled = odd.into_iter().chain(even).map(|(_, f)| f);
    assert_eq!(reconstruct(shuffled).unwrap(), payload);
}

#[test]
fn test_reconstruct_rejects_fragment_without_index() {
    match reconstruct(vec![vec![0, 0]]) {
        Err(PopsubError::Protocol(_)) => {}
        other => panic!("Expected protocol error, got {other:?}"),
    }
}

#[test]
fn test_compression_round_trip() {
    for payload in [Vec::new(), b"hello".to_vec(), sample(50_000), vec![0u8; 20_000]] {
        let compressed = compress(&payload).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), payload);
    }
}

#[test]
fn test_compression_shrinks_repetitive_payload() {
    let payload = vec![b'a'; 100_000];
    assert!(compress(&payload).unwrap().len() < payload.len() / 10);
}

#[test]
fn test_decompress_garbage_fails() {
    match decompress(b"definitely not gzip") {
        Err(PopsubError::Compression(_)) => {}
        other => panic!("Expected compression error, got {other:?}"),
    }
}

#[test]
fn test_assembly_buffer_completion() {
    let payload = sample(3 * CHUNK_SIZE);
    let fragments = chunk(&payload);
    let mut buffer = AssemblyBuffer::new(3, false);

    assert!(!buffer.insert(fragments[2].clone()).unwrap());
    assert!(!buffer.insert(fragments[0].clone()).unwrap());
    // duplicate overwrites and does not count twice
    assert!(!buffer.insert(fragments[0].clone()).unwrap());
    assert_eq!(buffer.received(), 2);
    assert!(buffer.insert(fragments[1].clone()).unwrap());

    assert_eq!(buffer.into_payload().unwrap(), payload);
}

#[test]
fn test_assembly_buffer_rejects_out_of_range_index() {
    let fragments = chunk(&sample(2 * CHUNK_SIZE));
    let mut buffer = AssemblyBuffer::new(1, false);
    assert!(buffer.insert(fragments[1].clone()).is_err());
    assert_eq!(buffer.received(), 0);
}

#[test]
fn test_assembler_keys_by_topic_and_sequence() {
    let mut assembler = Assembler::new();
    let first = sample(CHUNK_SIZE + 10);
    let second: Vec<u8> = first.iter().rev().copied().collect();
    let a = chunk(&first);
    let b = chunk(&second);

    assert!(assembler.accept("t", 1, 2, false, a[1].clone()).unwrap().is_none());
    assert!(assembler.accept("t", 2, 2, false, b[0].clone()).unwrap().is_none());
    assert!(assembler.accept("u", 1, 2, false, b[1].clone()).unwrap().is_none());
    assert_eq!(assembler.pending(), 3);
    assert_eq!(assembler.get("t", 1).unwrap().received(), 1);

    let done = assembler.accept("t", 1, 2, false, a[0].clone()).unwrap();
    assert_eq!(done, Some(first));
    assert!(assembler.get("t", 1).is_none());
    assert_eq!(assembler.pending(), 2);

    let done = assembler.accept("t", 2, 2, false, b[1].clone()).unwrap();
    assert_eq!(done, Some(second));
    assert_eq!(assembler.pending(), 1);
}

#[test]
fn test_assembler_decompresses_whole_payload() {
    let payload = sample(30_000);
    let compressed = compress(&payload).unwrap();
    let fragments = chunk(&compressed);
    let count = fragments.len() as u32;

    let mut assembler = Assembler::new();
    let mut result = None;
    for fragment in fragments.into_iter().rev() {
        result = assembler.accept("z", 9, count, true, fragment).unwrap();
    }
    assert_eq!(result, Some(payload));
    assert_eq!(assembler.pending(), 0);
}

#[test]
fn test_assembler_rejects_bad_fragments_without_creating_buffers() {
    let mut assembler = Assembler::new();
    let fragments = chunk(&sample(10));

    assert!(assembler.accept("t", 1, 0, false, fragments[0].clone()).is_err());
    assert!(assembler.accept("t", 1, 1, false, vec![1]).is_err());
    assert!(
        assembler
            .accept("t", 1, 1, false, 5u32.to_be_bytes().to_vec())
            .is_err()
    );
    assert_eq!(assembler.pending(), 0);
}
