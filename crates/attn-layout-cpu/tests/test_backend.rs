/// Global thread pool configuration
///
/// Lives in its own test binary: rayon's global pool can be built only once
/// per process, and any earlier parallel kernel call would build it implicitly.
use attn_layout_core::{Error, SplitDims};
use attn_layout_cpu::CpuBackend;

#[test]
fn test_init_sets_global_pool_once() {
    let backend = CpuBackend::new().with_threads(2).with_parallel_threshold(0);
    backend.init().unwrap();
    assert_eq!(rayon::current_num_threads(), 2);

    // A second global pool is refused
    let err = CpuBackend::new().with_threads(4).init().unwrap_err();
    assert!(matches!(err, Error::BackendError(_)));

    // Kernels still run on the configured pool
    let dims = SplitDims::new(3, 2, 4, 2, 3);
    let input: Vec<f32> = (0..dims.numel()).map(|i| i as f32).collect();
    let bias = vec![1.0f32; dims.bias_len()];
    let mut output = vec![0.0f32; dims.numel()];
    backend.split_add_bias_transpose_slice(&mut output, &input, &bias, dims).unwrap();

    let mut sorted = output.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let expected: Vec<f32> = (0..dims.numel()).map(|i| i as f32 + 1.0).collect();
    assert_eq!(sorted, expected);
}
