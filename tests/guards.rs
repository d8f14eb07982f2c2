// tests/guards.rs -- Resource guards and independent contexts.

use arraygate::prelude::*;
use std::sync::Arc;
use std::thread;

// ===== Median window =====

#[test]
fn oversized_median_window_fails_before_any_work() {
    let backend = Arc::new(ReferenceBackend::with_recording(true));
    let ctx = ComputeContext::with_backend(backend.clone(), ContextConfig::default());
    let shape = Shape::new_3d(16, 16, 16);
    let src = ctx.create_image(shape, ElementType::U8).unwrap();
    let dst = ctx.create_image(shape, ElementType::U8).unwrap();

    // 11 x 11 x 11 = 1331 window elements
    let error = ctx.kernels().median_box(&src, &dst, [5, 5, 5]).unwrap_err();

    match &error {
        DispatchError::UnsupportedElementCount { requested, maximum, .. } => {
            assert_eq!(*requested, 1331);
            assert_eq!(*maximum, 1000);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(error.suggested_fix().is_some());
    assert_eq!(ctx.live_allocations(), 2);
    assert!(backend.invocations().is_empty());
}

#[test]
fn median_window_limit_is_configurable() {
    let ctx = ComputeContext::reference_with_config(ContextConfig::new().with_max_local_array_size(2000));
    let shape = Shape::new_3d(4, 4, 4);
    let src = ctx.create_buffer(shape, ElementType::F32).unwrap();
    let dst = ctx.create_buffer(shape, ElementType::F32).unwrap();

    ctx.kernels().median_box(&src, &dst, [5, 5, 5]).unwrap();
    assert!(ctx.kernels().median_box(&src, &dst, [6, 6, 6]).is_err());
}

// ===== Stack splitting =====

#[test]
fn split_stack_member_limits() {
    let ctx = ComputeContext::reference();
    let src = ctx.create_buffer(Shape::new_3d(2, 2, 26), ElementType::U8).unwrap();
    let member = |depth| ctx.create_buffer(Shape::new_3d(2, 2, depth), ElementType::U8).unwrap();

    assert!(matches!(
        ctx.kernels().split_stack(&src, &[]),
        Err(DispatchError::EmptyStack { .. })
    ));

    let thirteen: Vec<DeviceArray> = (0..13).map(|_| member(2)).collect();
    assert!(matches!(
        ctx.kernels().split_stack(&src, &thirteen),
        Err(DispatchError::TooManyStackMembers { requested: 13, maximum: 12, .. })
    ));

    let twelve_member_src = ctx.create_buffer(Shape::new_3d(2, 2, 24), ElementType::U8).unwrap();
    ctx.kernels().split_stack(&twelve_member_src, &thirteen[..12]).unwrap();
}

#[test]
fn split_stack_distributes_round_robin() {
    let ctx = ComputeContext::reference();
    let shape = Shape::new_3d(1, 1, 6);
    let src = ctx
        .transfer()
        .push_buffer(&HostArray::from_vec(shape, vec![0u16, 1, 2, 3, 4, 5]).unwrap())
        .unwrap();
    let outputs: Vec<DeviceArray> = (0..3)
        .map(|_| ctx.create_buffer(Shape::new_3d(1, 1, 2), ElementType::U16).unwrap())
        .collect();

    ctx.kernels().split_stack(&src, &outputs).unwrap();

    let pulled: Vec<Vec<u16>> = outputs
        .iter()
        .map(|o| ctx.transfer().pull_values::<u16>(o).unwrap())
        .collect();
    assert_eq!(pulled, [vec![0, 3], vec![1, 4], vec![2, 5]]);
}

#[test]
fn single_member_split_is_a_copy() {
    let backend = Arc::new(ReferenceBackend::with_recording(true));
    let ctx = ComputeContext::with_backend(backend.clone(), ContextConfig::default());
    let shape = Shape::new_3d(2, 2, 2);
    let src = ctx
        .transfer()
        .push_buffer(&HostArray::from_vec(shape, vec![9u8; 8]).unwrap())
        .unwrap();
    let only = ctx.create_like(&src).unwrap();

    ctx.kernels().split_stack(&src, std::slice::from_ref(&only)).unwrap();

    assert_eq!(ctx.kernels().sum_pixels(&only).unwrap(), 72.0);
    let symbols: Vec<String> = backend.invocations().into_iter().map(|r| r.symbol).collect();
    assert_eq!(symbols, ["copy_3d"]);
}

// ===== Contexts =====

#[test]
fn contexts_on_separate_threads_are_independent() {
    let handles: Vec<_> = (0..4u8)
        .map(|worker| {
            thread::spawn(move || {
                let ctx = ComputeContext::reference();
                let shape = Shape::new_3d(8, 8, 4);
                let host = HostArray::from_vec(shape, vec![worker; 256]).unwrap();
                let src = ctx.transfer().push_image(&host).unwrap();
                let dst = ctx.create_like_with_type(&src, ElementType::F32).unwrap();

                ctx.kernels().mean_box(&src, &dst, [1, 1, 1]).unwrap();
                let sum = ctx.kernels().sum_pixels(&dst).unwrap();
                (ctx.live_allocations(), sum)
            })
        })
        .collect();

    for (worker, handle) in handles.into_iter().enumerate() {
        let (live, sum) = handle.join().unwrap();
        assert_eq!(live, 2);
        assert!((sum - 256.0 * worker as f64).abs() < 1e-3);
    }
}

#[test]
fn arrays_from_another_context_are_unknown() {
    let first = ComputeContext::reference();
    let second = ComputeContext::reference();
    let array = first.create_buffer(Shape::new_2d(2, 2), ElementType::U8).unwrap();

    assert!(matches!(
        second.transfer().pull(&array),
        Err(DispatchError::Backend(BackendError::ArrayNotFound(_)))
    ));
    assert!(second.release(&array).is_err());
    first.release(&array).unwrap();
}
