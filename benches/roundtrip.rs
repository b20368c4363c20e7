use std::hint::black_box;
use std::mem::{offset_of, size_of};

use criterion::{criterion_group, criterion_main, Criterion};
use typescope::prelude::*;

#[repr(C)]
struct Node {
    next: *mut Node,
    val: i64,
}

unsafe impl Reflected for Node {
    const TYPE_NAME: &'static str = "Node";
}

fn node_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry
        .add_type(Type::pointer(
            "Node*",
            size_of::<usize>() as u32,
            TypeTag::from_name("Node"),
        ))
        .unwrap();
    ClassBuilder::new("Node", size_of::<Node>() as u32)
        .field("next", "Node*", offset_of!(Node, next) as u16)
        .field("val", "i64", offset_of!(Node, val) as u16)
        .register(&registry)
        .unwrap();
    registry.post_init().unwrap();
    registry
}

/// A leaked linked chain of `len` nodes, the last pointing back at the first.
fn build_cycle(len: usize) -> *mut Node {
    let mut nodes: Vec<*mut Node> = (0..len)
        .map(|i| {
            Box::into_raw(Box::new(Node {
                next: std::ptr::null_mut(),
                val: i as i64,
            }))
        })
        .collect();
    for i in 0..len {
        let next = nodes[(i + 1) % len];
        unsafe { (*nodes[i]).next = next };
    }
    nodes.swap_remove(0)
}

fn bench_roundtrip(c: &mut Criterion) {
    let registry = node_registry();
    let engine = LipEngine::new(&registry);
    let root = build_cycle(64);

    c.bench_function("save_cycle_64", |b| {
        let mut image = Vec::with_capacity(4096);
        b.iter(|| {
            image.clear();
            unsafe {
                engine
                    .save_raw(
                        black_box(root as *const u8),
                        TypeTag::from_name("Node"),
                        1,
                        &mut image,
                    )
                    .unwrap();
            }
            black_box(image.len())
        });
    });

    let mut image = Vec::new();
    unsafe {
        engine
            .save_raw(root as *const u8, TypeTag::from_name("Node"), 1, &mut image)
            .unwrap();
    }

    c.bench_function("load_cycle_64", |b| {
        b.iter(|| {
            let loaded = engine.load_raw(&mut black_box(&image[..]), 1).unwrap();
            black_box(loaded.as_ptr());
        });
    });
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
