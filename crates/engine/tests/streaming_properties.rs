//! Property tests for the streaming laws: chunk boundaries never change
//! the bytes a job produces, and the pipeline reconstructs arbitrary
//! edits exactly.

use engine::whole::{BufSizes, delta_file, loadsig_file, patch_file, signature_file};
use engine::{Buffers, DeltaJob, JobStatus, LoadSigJob, SigJob, StreamJob};
use proptest::prelude::*;
use protocol::SigMagic;
use signature::{Signature, StrongLen};

fn build_signature(basis: &[u8], block_len: usize) -> Signature {
    let mut sig_bytes = Vec::new();
    signature_file(
        &mut &basis[..],
        &mut sig_bytes,
        Some(basis.len() as u64),
        Some(SigMagic::Blake2RabinKarp),
        Some(block_len),
        StrongLen::Max,
        BufSizes::default(),
    )
    .unwrap();
    let (mut sig, _) = loadsig_file(&mut &sig_bytes[..], None, BufSizes::default()).unwrap();
    sig.build_hash_table().unwrap();
    sig
}

/// Feeds `input` to a job in the given chunk sizes, collecting all output.
fn drive_chunked<J: StreamJob>(job: &mut J, input: &[u8], chunks: &[usize]) -> Vec<u8> {
    let mut produced = Vec::new();
    let mut fed = 0;
    let mut chunk_iter = chunks.iter().cycle();
    loop {
        let offered = (*chunk_iter.next().unwrap()).clamp(1, (input.len() - fed).max(1));
        let offered = offered.min(input.len() - fed);
        let eof = fed + offered == input.len();
        let mut out = [0u8; 97];
        let mut buffers = Buffers::new(&input[fed..fed + offered], &mut out, eof);
        let status = job.iter(&mut buffers).unwrap();
        fed += buffers.consumed();
        let n = buffers.produced();
        produced.extend_from_slice(&out[..n]);
        if status == JobStatus::Done {
            return produced;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn delta_output_is_chunking_invariant(
        basis in proptest::collection::vec(any::<u8>(), 256..4096),
        edit in proptest::collection::vec(any::<u8>(), 0..200),
        splice_at in any::<proptest::sample::Index>(),
        chunks in proptest::collection::vec(1usize..700, 1..8),
    ) {
        let mut new = basis.clone();
        let at = splice_at.index(new.len());
        new.splice(at..at, edit);

        let sig = build_signature(&basis, 128);
        let mut reference = Vec::new();
        delta_file(&sig, &mut &new[..], &mut reference, BufSizes::default()).unwrap();

        let mut job = DeltaJob::new(Some(&sig)).unwrap();
        let chunked = drive_chunked(&mut job, &new, &chunks);
        prop_assert_eq!(&chunked, &reference);

        let mut rebuilt = Vec::new();
        patch_file(&basis[..], &mut &chunked[..], &mut rebuilt, BufSizes::default()).unwrap();
        prop_assert_eq!(rebuilt, new);
    }

    #[test]
    fn signature_output_is_chunking_invariant(
        basis in proptest::collection::vec(any::<u8>(), 0..3000),
        chunks in proptest::collection::vec(1usize..500, 1..6),
    ) {
        let make_job = || {
            SigJob::new(Some(SigMagic::Md4RabinKarp), Some(256), StrongLen::Min).unwrap()
        };
        let mut reference_job = make_job();
        let reference = drive_chunked(&mut reference_job, &basis, &[basis.len().max(1)]);
        let mut chunked_job = make_job();
        let chunked = drive_chunked(&mut chunked_job, &basis, &chunks);
        prop_assert_eq!(chunked, reference);
    }

    #[test]
    fn loadsig_accepts_any_chunking(
        basis in proptest::collection::vec(any::<u8>(), 1..2000),
        chunks in proptest::collection::vec(1usize..64, 1..6),
    ) {
        let mut sig_bytes = Vec::new();
        signature_file(
            &mut &basis[..],
            &mut sig_bytes,
            Some(basis.len() as u64),
            None,
            Some(64),
            StrongLen::Min,
            BufSizes::default(),
        )
        .unwrap();

        let mut job = LoadSigJob::new(None);
        drive_chunked(&mut job, &sig_bytes, &chunks);
        let sig = job.into_signature().unwrap();
        prop_assert_eq!(sig.len(), basis.len().div_ceil(64));
    }
}
